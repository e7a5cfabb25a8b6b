use crate::vm::bytecode::op::Constant;
use crate::vm::constant_pool::{ConstantPoolIndex, RuntimeConstantPoolEntry};
use crate::vm::error::{Error, Result};
use crate::vm::frame::Frame;
use crate::vm::value::{Reference, Value};

use super::{Action, Env};

pub fn execute(op: Constant, frame: &mut Frame, env: &mut Env) -> Result<Action> {
    match op {
        Constant::Nop => (),
        Constant::Aconst_null => frame.operand_stack.push_reference(Reference::Null)?,
        Constant::Ipush { value } => frame.operand_stack.push_int(value)?,
        Constant::Lconst_0 => frame.operand_stack.push_long(0)?,
        Constant::Lconst_1 => frame.operand_stack.push_long(1)?,
        Constant::Fconst_0 => frame.operand_stack.push_float(0.0)?,
        Constant::Fconst_1 => frame.operand_stack.push_float(1.0)?,
        Constant::Fconst_2 => frame.operand_stack.push_float(2.0)?,
        Constant::Dconst_0 => frame.operand_stack.push_double(0.0)?,
        Constant::Dconst_1 => frame.operand_stack.push_double(1.0)?,
        Constant::Ldc { index } => {
            let value = resolve_literal(frame, env, index, false)?;
            frame.operand_stack.push(value)?;
        },
        Constant::Ldc2_w { index } => {
            let value = resolve_literal(frame, env, index, true)?;
            frame.operand_stack.push(value)?;
        },
    }
    Ok(Action::Continue)
}

/// Resolves a loadable constant: `int`, `float`, `String` and class constants for `ldc`, `long`
/// and `double` constants for `ldc2_w`.
fn resolve_literal(frame: &Frame, env: &mut Env, index: ConstantPoolIndex, wide: bool)
        -> Result<Value> {
    let class = frame.get_class().clone();
    let entry = class.get_constant_pool().get(index);
    match (entry, wide) {
        (Some(&RuntimeConstantPoolEntry::Integer(value)), false) => Ok(Value::Int(value)),
        (Some(&RuntimeConstantPoolEntry::Float(value)), false) => Ok(Value::Float(value)),
        (Some(&RuntimeConstantPoolEntry::String(ref value)), false) =>
            env.loader.intern_string(value).map(Value::Reference),
        (Some(&RuntimeConstantPoolEntry::ClassRef(ref symref)), false) => {
            let resolved = env.loader.resolve_class(symref)?;
            env.loader.class_object(&resolved).map(Value::Reference)
        },
        (Some(&RuntimeConstantPoolEntry::Long(value)), true) => Ok(Value::Long(value)),
        (Some(&RuntimeConstantPoolEntry::Double(value)), true) => Ok(Value::Double(value)),
        _ => Err(Error::ConstantPool {
            index: index,
            expected: if wide { "long or double constant" } else { "loadable constant" },
        }),
    }
}
