use std::fmt;
use std::rc::Rc;

use crate::vm::class::{Class, ExceptionTableEntry, Method};
use crate::vm::error::{Error, Result};
use crate::vm::local_variables::LocalVariables;
use crate::vm::operand_stack::OperandStack;
use crate::vm::value::Value;

/// A frame is used to store data and partial results, as well as to perform dynamic linking,
/// return values for methods, and dispatch exceptions.
#[derive(Debug)]
pub struct Frame {
    /// The class containing the currently executing method.
    class: Rc<Class>,
    /// The method being executed. It always has a bytecode body.
    method: Rc<Method>,
    /// The offset of the instruction currently executing.
    pub pc: usize,
    /// The offset the dispatch loop adopts once the current instruction completes. Sequential
    /// instructions leave it just past their immediates; branches overwrite it.
    pub next_pc: usize,
    /// The local variables of the current method.
    pub local_variables: LocalVariables,
    /// The operand stack manipulated by the instructions of the current method.
    pub operand_stack: OperandStack,
}

impl Frame {
    pub fn new(class: Rc<Class>, method: Rc<Method>, local_variables: LocalVariables)
            -> Result<Self> {
        let max_stack = match method.method_code {
            Some(ref method_code) => method_code.max_stack as usize,
            None if method.is_native() =>
                return Err(Error::Unsupported("native methods do not run in a bytecode frame")),
            None => return Err(Error::AbstractMethod {
                class: class.name(),
                name: String::from(method.name()),
            }),
        };
        Ok(Frame {
            class: class,
            method: method,
            pc: 0,
            next_pc: 0,
            local_variables: local_variables,
            operand_stack: OperandStack::new(max_stack),
        })
    }

    /// Creates a frame whose local variables are seeded from the given arguments, receiver first.
    pub fn with_arguments(class: Rc<Class>, method: Rc<Method>, args: Vec<Value>)
            -> Result<Self> {
        let max_locals = method.method_code.as_ref()
            .map_or(0, |method_code| method_code.max_locals as usize);
        let local_variables = LocalVariables::with_arguments(max_locals, args)?;
        Frame::new(class, method, local_variables)
    }

    pub fn get_class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn get_method(&self) -> &Rc<Method> {
        &self.method
    }

    pub fn code(&self) -> &[u8] {
        self.method.method_code.as_ref().map_or(&[][..], |method_code| &method_code.code[..])
    }

    pub fn exception_table(&self) -> &[ExceptionTableEntry] {
        self.method.method_code.as_ref()
            .map_or(&[][..], |method_code| &method_code.exception_table[..])
    }

    /// Computes `pc + offset` for a branch, failing if the target lies outside the method.
    pub fn branch_target(&self, offset: i32) -> Result<usize> {
        let target = self.pc as i64 + offset as i64;
        if target < 0 || target as usize >= self.code().len() {
            Err(Error::InvalidBranchTarget { pc: self.pc, offset: offset as i64 })
        } else {
            Ok(target as usize)
        }
    }

    pub fn location(&self) -> Location {
        Location {
            class: self.class.name(),
            method: String::from(self.method.name()),
            pc: self.pc,
        }
    }
}

/// Where a frame is executing, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub class: String,
    pub method: String,
    pub pc: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}(pc {})", self.class, self.method, self.pc)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vm::class::{ClassBuilder, MethodCode, method_access_flags};
    use crate::vm::sig;

    fn frame(code: Vec<u8>) -> Frame {
        let sig = sig::Method::new("run", "(I)V").unwrap();
        let class = Rc::new(ClassBuilder::new("Main")
            .method(sig.clone(), method_access_flags::ACC_STATIC,
                    Some(MethodCode::new(2, 2, code)))
            .build());
        let method = class.get_method(&sig).unwrap().clone();
        Frame::with_arguments(class, method, vec![Value::Int(9)]).unwrap()
    }

    #[test]
    fn test_new_frame() {
        let frame = frame(vec![0x00, 0x00, 0xb1]);
        assert_eq!(frame.local_variables.get_int(0).unwrap(), 9);
        assert_eq!(frame.operand_stack.max_stack(), 2);
        assert_eq!(frame.location().to_string(), "Main.run(pc 0)");
    }

    #[test]
    fn test_branch_target() {
        let mut frame = frame(vec![0x00, 0x00, 0xb1]);
        frame.pc = 1;
        assert_eq!(frame.branch_target(1).unwrap(), 2);
        assert_eq!(frame.branch_target(-1).unwrap(), 0);
        assert!(frame.branch_target(2).is_err());
        assert!(frame.branch_target(-2).is_err());
    }

    #[test]
    fn test_frame_requires_code() {
        let sig = sig::Method::new("run", "()V").unwrap();
        let class = Rc::new(ClassBuilder::new("Main")
            .method(sig.clone(), method_access_flags::ACC_ABSTRACT, None)
            .build());
        let method = class.get_method(&sig).unwrap().clone();
        match Frame::new(class, method, LocalVariables::new(0)) {
            Err(Error::AbstractMethod { class, name }) => {
                assert_eq!(class, "Main");
                assert_eq!(name, "run");
            },
            other => panic!("unexpected result {:?}", other.map(|frame| frame.location())),
        }
    }
}
