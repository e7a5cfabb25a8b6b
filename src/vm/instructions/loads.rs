use crate::vm::bytecode::op::Load;
use crate::vm::error::Result;
use crate::vm::frame::Frame;
use crate::vm::heap::ArrayType;

use super::{base_type_array, pop_array_index, reference_array, Action};

pub fn execute(op: Load, frame: &mut Frame) -> Result<Action> {
    match op {
        Load::Iload { index } => {
            let value = frame.local_variables.get_int(index as usize)?;
            frame.operand_stack.push_int(value)?;
        },
        Load::Lload { index } => {
            let value = frame.local_variables.get_long(index as usize)?;
            frame.operand_stack.push_long(value)?;
        },
        Load::Fload { index } => {
            let value = frame.local_variables.get_float(index as usize)?;
            frame.operand_stack.push_float(value)?;
        },
        Load::Dload { index } => {
            let value = frame.local_variables.get_double(index as usize)?;
            frame.operand_stack.push_double(value)?;
        },
        Load::Aload { index } => {
            let value = frame.local_variables.get_reference(index as usize)?;
            frame.operand_stack.push_reference(value)?;
        },
        Load::Iaload => {
            let (index, array) = pop_array_index(frame)?;
            let value = base_type_array(array)?.borrow().get_int(index)?;
            frame.operand_stack.push_int(value)?;
        },
        Load::Laload => {
            let (index, array) = pop_array_index(frame)?;
            let value = base_type_array(array)?.borrow().get_long(index)?;
            frame.operand_stack.push_long(value)?;
        },
        Load::Faload => {
            let (index, array) = pop_array_index(frame)?;
            let value = base_type_array(array)?.borrow().get_float(index)?;
            frame.operand_stack.push_float(value)?;
        },
        Load::Daload => {
            let (index, array) = pop_array_index(frame)?;
            let value = base_type_array(array)?.borrow().get_double(index)?;
            frame.operand_stack.push_double(value)?;
        },
        Load::Aaload => {
            let (index, array) = pop_array_index(frame)?;
            let value = reference_array(array)?.borrow().get(index)?;
            frame.operand_stack.push_reference(value)?;
        },
        Load::Baload => {
            // shared by byte[] and boolean[]
            let (index, array) = pop_array_index(frame)?;
            let array = base_type_array(array)?;
            let array = array.borrow();
            let value = if array.array_type() == ArrayType::Boolean {
                array.get_boolean(index)? as i32
            } else {
                array.get_byte(index)? as i32
            };
            frame.operand_stack.push_int(value)?;
        },
        Load::Caload => {
            let (index, array) = pop_array_index(frame)?;
            let value = base_type_array(array)?.borrow().get_char(index)?;
            frame.operand_stack.push_char(value)?;
        },
        Load::Saload => {
            let (index, array) = pop_array_index(frame)?;
            let value = base_type_array(array)?.borrow().get_short(index)?;
            frame.operand_stack.push_short(value)?;
        },
    }
    Ok(Action::Continue)
}
