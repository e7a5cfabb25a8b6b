use crate::vm::bytecode::op::Store;
use crate::vm::error::{Error, Result};
use crate::vm::frame::Frame;
use crate::vm::heap::ArrayType;
use crate::vm::value::Value;

use super::{base_type_array, pop_array_index, reference_array, Action};

pub fn execute(op: Store, frame: &mut Frame) -> Result<Action> {
    match op {
        Store::Istore { index } => {
            let value = frame.operand_stack.pop_int()?;
            frame.local_variables.set_int(index as usize, value)?;
        },
        Store::Lstore { index } => {
            let value = frame.operand_stack.pop_long()?;
            frame.local_variables.set_long(index as usize, value)?;
        },
        Store::Fstore { index } => {
            let value = frame.operand_stack.pop_float()?;
            frame.local_variables.set_float(index as usize, value)?;
        },
        Store::Dstore { index } => {
            let value = frame.operand_stack.pop_double()?;
            frame.local_variables.set_double(index as usize, value)?;
        },
        Store::Astore { index } => {
            // astore also stores the return addresses pushed by jsr
            match frame.operand_stack.pop()? {
                value @ Value::Reference(_) | value @ Value::ReturnAddress(_) =>
                    frame.local_variables.set(index as usize, value)?,
                other => return Err(other.mismatch("reference or returnAddress")),
            }
        },
        Store::Iastore => {
            let value = frame.operand_stack.pop_int()?;
            let (index, array) = pop_array_index(frame)?;
            base_type_array(array)?.borrow_mut().set_int(index, value)?;
        },
        Store::Lastore => {
            let value = frame.operand_stack.pop_long()?;
            let (index, array) = pop_array_index(frame)?;
            base_type_array(array)?.borrow_mut().set_long(index, value)?;
        },
        Store::Fastore => {
            let value = frame.operand_stack.pop_float()?;
            let (index, array) = pop_array_index(frame)?;
            base_type_array(array)?.borrow_mut().set_float(index, value)?;
        },
        Store::Dastore => {
            let value = frame.operand_stack.pop_double()?;
            let (index, array) = pop_array_index(frame)?;
            base_type_array(array)?.borrow_mut().set_double(index, value)?;
        },
        Store::Aastore => {
            let value = frame.operand_stack.pop_reference()?;
            let (index, array) = pop_array_index(frame)?;
            let array = reference_array(array)?;
            let (array_class, length) = {
                let array = array.borrow();
                (array.get_class(), array.len())
            };
            if index < 0 || index as usize >= length {
                return Err(Error::ArrayIndexOutOfBounds { index: index, length: length });
            }
            // the value may be the array itself, so it is not borrowed until the store
            if let Some(value_class) = value.get_class() {
                if let Some(component_class) = array_class.component_class() {
                    if !value_class.is_assignable_to(component_class) {
                        return Err(Error::ArrayStore {
                            from: value_class.symref.sig.java_name(),
                            to: component_class.symref.sig.java_name(),
                        });
                    }
                }
            }
            array.borrow_mut().put(index, value)?;
        },
        Store::Bastore => {
            // shared by byte[] and boolean[]
            let value = frame.operand_stack.pop_int()?;
            let (index, array) = pop_array_index(frame)?;
            let array = base_type_array(array)?;
            let mut array = array.borrow_mut();
            if array.array_type() == ArrayType::Boolean {
                array.set_boolean(index, value & 1 != 0)?;
            } else {
                array.set_byte(index, value as i8)?;
            }
        },
        Store::Castore => {
            let value = frame.operand_stack.pop_char()?;
            let (index, array) = pop_array_index(frame)?;
            base_type_array(array)?.borrow_mut().set_char(index, value)?;
        },
        Store::Sastore => {
            let value = frame.operand_stack.pop_short()?;
            let (index, array) = pop_array_index(frame)?;
            base_type_array(array)?.borrow_mut().set_short(index, value)?;
        },
    }
    Ok(Action::Continue)
}
