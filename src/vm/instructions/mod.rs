//! The execute step of every instruction family.
//!
//! Each family reads and mutates the executing frame and reports what the thread should do next
//! through an `Action`. Instructions whose successor is not the next sequential instruction
//! overwrite `Frame::next_pc`.

mod comparisons;
mod constants;
mod control;
mod conversions;
mod extended;
mod loads;
mod math;
mod references;
mod stack;
mod stores;

use std::cell::RefCell;
use std::rc::Rc;

use crate::vm::bytecode::Instruction;
use crate::vm::class::{Class, Method};
use crate::vm::class_loader::ClassLoader;
use crate::vm::error::{Error, Result};
use crate::vm::frame::Frame;
use crate::vm::heap::{Array, BaseTypeArray};
use crate::vm::local_variables::LocalVariables;
use crate::vm::native::{self, Console, NativeRegistry};
use crate::vm::sig;
use crate::vm::value::{Reference, Value};

pub use self::comparisons::compare;
pub use self::math::{ishl, ishr, iushr, lshl, lshr, lushr};

/// Everything outside the executing frame that an instruction may touch.
pub struct Env<'a> {
    pub loader: &'a mut ClassLoader,
    pub natives: &'a NativeRegistry,
    pub console: &'a mut Console,
    /// The frames below the executing one, outermost first.
    pub callers: &'a [Frame],
}

/// What the thread does once an instruction has executed.
#[derive(Debug)]
pub enum Action {
    /// Move on to the frame's `next_pc`.
    Continue,
    /// Push the frame of a callee.
    Invoke(Frame),
    /// Push the `<clinit>` frame of a class and mark the class initialized once the frame is on
    /// the stack. The current instruction runs again after the initializer returns.
    Initialize(Frame),
    /// Pop the executing frame, handing the value (if any) to the caller.
    Return(Option<Value>),
    /// Unwind to the nearest matching exception handler.
    Throw(Reference),
}

pub fn execute(instruction: Instruction, frame: &mut Frame, env: &mut Env) -> Result<Action> {
    match instruction {
        Instruction::Constant(op) => constants::execute(op, frame, env),
        Instruction::Load(op) => loads::execute(op, frame),
        Instruction::Store(op) => stores::execute(op, frame),
        Instruction::Stack(op) => stack::execute(op, frame),
        Instruction::Math(op) => math::execute(op, frame),
        Instruction::Conversion(op) => conversions::execute(op, frame),
        Instruction::Comparison(op) => comparisons::execute(op, frame),
        Instruction::Control(op) => control::execute(op, frame),
        Instruction::Reference(op) => references::execute(op, frame, env),
        Instruction::Extended(op) => extended::execute(op, frame, env),
    }
}

/// Begins initialization of `class` if it has not begun yet, superclasses first. Returns the
/// frame of the first `<clinit>` that has to run; in that case the current instruction is set up
/// to execute again once the initializer returns. The class owning that frame stays
/// uninitialized until the frame is pushed.
fn initialize(frame: &mut Frame, class: &Rc<Class>) -> Result<Option<Frame>> {
    let mut pending = vec![];
    let mut current = Some(class.clone());
    while let Some(class) = current {
        if class.is_initialized() {
            break;
        }
        current = class.superclass.clone();
        pending.push(class);
    }
    let clinit_sig = sig::Method {
        name: String::from("<clinit>"),
        params: vec![],
        return_ty: None,
    };
    for class in pending.into_iter().rev() {
        debug!("initializing class {}", class.name());
        match class.get_method(&clinit_sig).cloned() {
            Some(clinit) => {
                let max_locals = clinit.method_code.as_ref()
                    .map_or(0, |method_code| method_code.max_locals as usize);
                let clinit_frame = Frame::new(class.clone(), clinit,
                                              LocalVariables::new(max_locals))?;
                frame.next_pc = frame.pc;
                return Ok(Some(clinit_frame));
            },
            None => class.mark_initialized(),
        }
    }
    Ok(None)
}

/// Transfers control to a selected method: natives and hooked methods go through the native
/// bridge, whose result lands on the caller's operand stack; anything else gets a new frame.
fn invoke(frame: &mut Frame, env: &mut Env, class: Rc<Class>, method: Rc<Method>,
          args: Vec<Value>) -> Result<Action> {
    if method.is_native() || native::is_hooked(&class) {
        debug!("native dispatch to {}.{}", class.name(), method.symref.sig);
        let locals = LocalVariables::with_arguments(method.arg_slots(), args)?;
        let caller = frame.location();
        native::invoke(env, &class, &method, &locals, &mut frame.operand_stack, Some(caller))?;
        Ok(Action::Continue)
    } else {
        debug!("invoking {}.{}", class.name(), method.symref.sig);
        Ok(Action::Invoke(Frame::with_arguments(class, method, args)?))
    }
}

/// Pops an `int` index and an array reference, in that order.
fn pop_array_index(frame: &mut Frame) -> Result<(i32, Reference)> {
    let index = frame.operand_stack.pop_int()?;
    let array = frame.operand_stack.pop_reference()?.non_null()?;
    Ok((index, array))
}

fn base_type_array(reference: Reference) -> Result<Rc<RefCell<BaseTypeArray>>> {
    match reference {
        Reference::Null => Err(Error::NullPointer),
        Reference::BaseTypeArray(array) => Ok(array),
        other => Err(Error::TypeMismatch {
            expected: "array of primitives",
            found: format!("{:?}", other),
        }),
    }
}

fn reference_array(reference: Reference) -> Result<Rc<RefCell<Array>>> {
    match reference {
        Reference::Null => Err(Error::NullPointer),
        Reference::Array(array) => Ok(array),
        other => Err(Error::TypeMismatch {
            expected: "array of references",
            found: format!("{:?}", other),
        }),
    }
}
