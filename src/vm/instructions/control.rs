use crate::vm::bytecode::op::Control;
use crate::vm::error::Result;
use crate::vm::frame::Frame;
use crate::vm::sig::Type;
use crate::vm::value::Value;

use super::Action;

pub fn execute(op: Control, frame: &mut Frame) -> Result<Action> {
    match op {
        Control::Goto { offset } => frame.next_pc = frame.branch_target(offset)?,
        Control::Jsr { offset } => jump_subroutine(frame, offset)?,
        Control::Ret { index } =>
            frame.next_pc = frame.local_variables.get_return_address(index as usize)?,
        Control::Tableswitch { default, low, high, offsets } => {
            let index = frame.operand_stack.pop_int()?;
            let offset = if index < low || index > high {
                default
            } else {
                offsets[(index as i64 - low as i64) as usize]
            };
            frame.next_pc = frame.branch_target(offset)?;
        },
        Control::Lookupswitch { default, pairs } => {
            let key = frame.operand_stack.pop_int()?;
            let offset = pairs.iter()
                .find(|&&(candidate, _)| candidate == key)
                .map_or(default, |&(_, offset)| offset);
            frame.next_pc = frame.branch_target(offset)?;
        },
        Control::Ireturn => {
            let value = frame.operand_stack.pop_int()?;
            // values returned as boolean, byte, char or short are narrowed to the declared type
            let value = match frame.get_method().symref.sig.return_ty {
                Some(Type::Boolean) => value & 1,
                Some(Type::Byte) => value as i8 as i32,
                Some(Type::Char) => value as u16 as i32,
                Some(Type::Short) => value as i16 as i32,
                _ => value,
            };
            return Ok(Action::Return(Some(Value::Int(value))));
        },
        Control::Lreturn =>
            return Ok(Action::Return(Some(Value::Long(frame.operand_stack.pop_long()?)))),
        Control::Freturn =>
            return Ok(Action::Return(Some(Value::Float(frame.operand_stack.pop_float()?)))),
        Control::Dreturn =>
            return Ok(Action::Return(Some(Value::Double(frame.operand_stack.pop_double()?)))),
        Control::Areturn =>
            return Ok(Action::Return(Some(Value::Reference(frame.operand_stack.pop_reference()?)))),
        Control::Return => return Ok(Action::Return(None)),
    }
    Ok(Action::Continue)
}

/// Pushes the address of the instruction following the `jsr` and branches to the subroutine.
pub fn jump_subroutine(frame: &mut Frame, offset: i32) -> Result<()> {
    let target = frame.branch_target(offset)?;
    frame.operand_stack.push(Value::ReturnAddress(frame.next_pc))?;
    frame.next_pc = target;
    Ok(())
}
