use std::rc::Rc;

use crate::vm::bytecode::op::Reference as Op;
use crate::vm::class::{class_access_flags, Class, Method};
use crate::vm::error::{Error, Result};
use crate::vm::frame::Frame;
use crate::vm::heap::{Array, ArrayType, BaseTypeArray, Object};
use crate::vm::sig;
use crate::vm::symref;
use crate::vm::value::{Reference, Value};

use super::{initialize, invoke, Action, Env};

pub fn execute(op: Op, frame: &mut Frame, env: &mut Env) -> Result<Action> {
    match op {
        Op::Getstatic { index } => {
            let symref = frame.get_class().get_constant_pool().field_ref(index)?.clone();
            let class = resolve_static_field(env, &symref)?;
            if let Some(clinit) = initialize(frame, &class)? {
                return Ok(Action::Initialize(clinit));
            }
            let value = class.get_static(&symref.sig.name).ok_or_else(|| no_such_field(&symref))?;
            frame.operand_stack.push(value)?;
        },
        Op::Putstatic { index } => {
            let symref = frame.get_class().get_constant_pool().field_ref(index)?.clone();
            let class = resolve_static_field(env, &symref)?;
            if let Some(clinit) = initialize(frame, &class)? {
                return Ok(Action::Initialize(clinit));
            }
            let value = frame.operand_stack.pop_typed(&symref.sig.ty)?;
            if !class.put_static(&symref.sig.name, value) {
                return Err(no_such_field(&symref));
            }
        },
        Op::Getfield { index } => {
            let symref = frame.get_class().get_constant_pool().field_ref(index)?.clone();
            let value = match frame.operand_stack.pop_reference()?.non_null()? {
                Reference::Object(object) => object.borrow().get_field(&symref.sig.name)?,
                _ => return Err(no_such_field(&symref)),
            };
            frame.operand_stack.push(value)?;
        },
        Op::Putfield { index } => {
            let symref = frame.get_class().get_constant_pool().field_ref(index)?.clone();
            let value = frame.operand_stack.pop_typed(&symref.sig.ty)?;
            match frame.operand_stack.pop_reference()?.non_null()? {
                Reference::Object(object) =>
                    object.borrow_mut().put_field(&symref.sig.name, value)?,
                _ => return Err(no_such_field(&symref)),
            }
        },
        Op::Invokevirtual { index } | Op::Invokeinterface { index, .. } => {
            let symref = frame.get_class().get_constant_pool().method_ref(index)?.clone();
            let class = env.loader.resolve_class(&symref.class)?;
            let (_, resolved) = find_method(&class, &symref)?;
            let args = frame.operand_stack.pop_arguments(&symref.sig.params, true)?;
            let runtime_class = receiver_class(&args)?;
            let selected = Class::dispatch_method(&runtime_class, &resolved)
                .filter(|&(_, ref method)| !method.is_abstract())
                .or_else(|| Class::find_method(&runtime_class, &symref.sig)
                         .filter(|&(_, ref method)| !method.is_abstract()));
            let (class, method) = selected.ok_or_else(|| Error::AbstractMethod {
                class: runtime_class.name(),
                name: symref.sig.name.clone(),
            })?;
            return invoke(frame, env, class, method, args);
        },
        Op::Invokespecial { index } => {
            let symref = frame.get_class().get_constant_pool().method_ref(index)?.clone();
            let class = env.loader.resolve_class(&symref.class)?;
            let current_class = frame.get_class().clone();
            // a call through `super` starts its lookup at the direct superclass of the current
            // class; constructors, private methods and interface targets use the resolved method
            let is_super_call = symref.sig.name != "<init>" && !class.is_interface()
                && current_class.access_flags & class_access_flags::ACC_SUPER != 0
                && current_class.superclass.as_ref()
                    .map_or(false, |superclass| superclass.is_descendant(&class));
            let (class, method) = match current_class.superclass {
                Some(ref superclass) if is_super_call => find_method(superclass, &symref)?,
                _ => find_method(&class, &symref)?,
            };
            let args = frame.operand_stack.pop_arguments(&symref.sig.params, true)?;
            receiver_class(&args)?;
            return invoke(frame, env, class, method, args);
        },
        Op::Invokestatic { index } => {
            let symref = frame.get_class().get_constant_pool().method_ref(index)?.clone();
            let class = env.loader.resolve_class(&symref.class)?;
            let (class, method) = find_method(&class, &symref)?;
            if let Some(clinit) = initialize(frame, &class)? {
                return Ok(Action::Initialize(clinit));
            }
            let args = frame.operand_stack.pop_arguments(&symref.sig.params, false)?;
            return invoke(frame, env, class, method, args);
        },
        Op::Invokedynamic { .. } => return Err(Error::Unsupported("invokedynamic")),
        Op::New { index } => {
            let symref = frame.get_class().get_constant_pool().class_ref(index)?.clone();
            let class = env.loader.resolve_class(&symref)?;
            if let Some(clinit) = initialize(frame, &class)? {
                return Ok(Action::Initialize(clinit));
            }
            frame.operand_stack.push_reference(Reference::new_object(Object::new(class)))?;
        },
        Op::Newarray { atype } => {
            let array_type = ArrayType::from_tag(atype)?;
            let length = frame.operand_stack.pop_int()?;
            let class = env.loader.primitive_array_class(array_type)?;
            let array = BaseTypeArray::new(class, array_type, length)?;
            frame.operand_stack.push_reference(Reference::new_base_type_array(array))?;
        },
        Op::Anewarray { index } => {
            let symref = frame.get_class().get_constant_pool().class_ref(index)?.clone();
            let component_class = env.loader.resolve_class(&symref)?;
            let length = frame.operand_stack.pop_int()?;
            let component_type = sig::Type::Reference(component_class.symref.sig.clone());
            let class = env.loader.load_class(&sig::Class::Array(Box::new(component_type)))?;
            let array = Array::new(class, length)?;
            frame.operand_stack.push_reference(Reference::new_array(array))?;
        },
        Op::Arraylength => {
            let length = frame.operand_stack.pop_reference()?.array_length()?;
            frame.operand_stack.push_int(length as i32)?;
        },
        Op::Athrow => {
            let exception = frame.operand_stack.pop_reference()?.non_null()?;
            return Ok(Action::Throw(exception));
        },
        Op::Checkcast { index } => {
            let symref = frame.get_class().get_constant_pool().class_ref(index)?.clone();
            let reference = frame.operand_stack.pop_reference()?;
            if let Some(runtime_class) = reference.get_class() {
                let class = env.loader.resolve_class(&symref)?;
                if !runtime_class.is_assignable_to(&class) {
                    return Err(Error::ClassCast {
                        from: runtime_class.symref.sig.java_name(),
                        to: class.symref.sig.java_name(),
                    });
                }
            }
            frame.operand_stack.push_reference(reference)?;
        },
        Op::Instanceof { index } => {
            let symref = frame.get_class().get_constant_pool().class_ref(index)?.clone();
            let reference = frame.operand_stack.pop_reference()?;
            let result = match reference.get_class() {
                Some(runtime_class) => {
                    let class = env.loader.resolve_class(&symref)?;
                    runtime_class.is_assignable_to(&class)
                },
                None => false,
            };
            frame.operand_stack.push_boolean(result)?;
        },
        // there is only one guest thread, so monitors never contend
        Op::Monitorenter | Op::Monitorexit => {
            frame.operand_stack.pop_reference()?.non_null()?;
        },
    }
    Ok(Action::Continue)
}

fn no_such_field(symref: &symref::Field) -> Error {
    Error::NoSuchField {
        class: symref.class.sig.to_string(),
        name: symref.sig.name.clone(),
    }
}

/// Finds the class that declares the static field, which is the class that gets initialized.
fn resolve_static_field(env: &mut Env, symref: &symref::Field) -> Result<Rc<Class>> {
    let class = env.loader.resolve_class(&symref.class)?;
    Class::resolve_static_field(&class, &symref.sig.name).ok_or_else(|| no_such_field(symref))
}

fn find_method(class: &Rc<Class>, symref: &symref::Method)
        -> Result<(Rc<Class>, Rc<Method>)> {
    Class::find_method(class, &symref.sig).ok_or_else(|| Error::NoSuchMethod {
        class: symref.class.sig.to_string(),
        name: symref.sig.name.clone(),
        descriptor: symref.sig.descriptor(),
    })
}

/// The run-time class of the receiver, which comes first among the arguments.
fn receiver_class(args: &[Value]) -> Result<Rc<Class>> {
    match args.first() {
        Some(&Value::Reference(ref reference)) => reference.get_class().ok_or(Error::NullPointer),
        Some(other) => Err(other.mismatch("receiver reference")),
        None => Err(Error::OperandStackUnderflow),
    }
}
