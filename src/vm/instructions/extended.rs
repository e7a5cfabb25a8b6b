use std::rc::Rc;

use crate::vm::bytecode::op::Extended;
use crate::vm::class::Class;
use crate::vm::class_loader::ClassLoader;
use crate::vm::error::{Error, Result};
use crate::vm::frame::Frame;
use crate::vm::heap::{Array, ArrayType, BaseTypeArray};
use crate::vm::sig;
use crate::vm::value::Reference;

use super::comparisons::branch_if;
use super::control::jump_subroutine;
use super::{Action, Env};

pub fn execute(op: Extended, frame: &mut Frame, env: &mut Env) -> Result<Action> {
    match op {
        Extended::Multianewarray { index, dimensions } => {
            let symref = frame.get_class().get_constant_pool().class_ref(index)?.clone();
            let class = env.loader.resolve_class(&symref)?;
            let mut counts = vec![0; dimensions as usize];
            for count in counts.iter_mut().rev() {
                *count = frame.operand_stack.pop_int()?;
            }
            // every count is checked before anything is allocated
            if let Some(&negative) = counts.iter().find(|&&count| count < 0) {
                return Err(Error::NegativeArraySize(negative));
            }
            let array = new_multi_array(env.loader, &class, &counts)?;
            frame.operand_stack.push_reference(array)?;
        },
        Extended::Ifnull { offset } => {
            let taken = frame.operand_stack.pop_reference()?.is_null();
            branch_if(frame, taken, offset)?;
        },
        Extended::Ifnonnull { offset } => {
            let taken = !frame.operand_stack.pop_reference()?.is_null();
            branch_if(frame, taken, offset)?;
        },
        Extended::Goto_w { offset } => frame.next_pc = frame.branch_target(offset)?,
        Extended::Jsr_w { offset } => jump_subroutine(frame, offset)?,
    }
    Ok(Action::Continue)
}

/// Allocates an array of the given array class whose first dimension has `counts[0]` elements,
/// recursively allocating the remaining dimensions. Dimensions without a count are left `null`.
pub fn new_multi_array(loader: &mut ClassLoader, class: &Rc<Class>, counts: &[i32])
        -> Result<Reference> {
    let component_type = match class.symref.sig {
        sig::Class::Array(ref component_type) => (**component_type).clone(),
        ref scalar => return Err(Error::TypeMismatch {
            expected: "array class",
            found: scalar.to_string(),
        }),
    };
    let length = counts.first().cloned().unwrap_or(0);
    if let Some(array_type) = ArrayType::from_type(&component_type) {
        let array = BaseTypeArray::new(class.clone(), array_type, length)?;
        return Ok(Reference::new_base_type_array(array));
    }
    if counts.len() <= 1 {
        return Ok(Reference::new_array(Array::new(class.clone(), length)?));
    }
    let component_class = loader.type_class(&component_type)?;
    let mut elements = Vec::with_capacity(length.max(0) as usize);
    for _ in 0..length {
        elements.push(new_multi_array(loader, &component_class, &counts[1..])?);
    }
    Ok(Reference::new_array(Array::from_elements(class.clone(), elements)))
}
