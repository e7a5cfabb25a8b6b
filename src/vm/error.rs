//! Failures raised while executing bytecode.
//!
//! There are two classes of failure. _Guest-visible_ conditions (null dereference, array bounds,
//! failed casts, ...) are ones a Java program can be written to expect; the thread turns them into
//! exception objects when the corresponding class is loaded. Everything else is an
//! _internal-consistency_ failure: malformed input or an interpreter bug, which always aborts the
//! run.

use std::error;
use std::fmt;
use std::io;
use std::result;

use crate::vm::frame::Location;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// A `null` reference was dereferenced.
    NullPointer,
    /// An array was indexed outside `[0, length)`.
    ArrayIndexOutOfBounds { index: i32, length: usize },
    /// An array was created with a negative length.
    NegativeArraySize(i32),
    /// Integer division or remainder by zero.
    ArithmeticDivideByZero,
    /// `checkcast` failed.
    ClassCast { from: String, to: String },
    /// A reference was stored into an array whose component type it is not assignable to.
    ArrayStore { from: String, to: String },
    /// An invoked method has neither bytecode nor a native implementation.
    AbstractMethod { class: String, name: String },
    /// The thread's call stack grew past its configured depth.
    StackOverflow { depth: usize },
    /// A guest exception propagated past the last frame.
    UncaughtException { class: String, message: Option<String> },

    /// Popping from an empty operand stack.
    OperandStackUnderflow,
    /// Pushing past the method's declared `max_stack`.
    OperandStackOverflow { max_stack: usize },
    /// A slot held a value of a different kind than the instruction requires.
    TypeMismatch { expected: &'static str, found: String },
    /// A local variable index beyond `max_locals`, or an unusable slot.
    InvalidLocalIndex { index: usize, max_locals: usize },
    UnknownOpcode(u8),
    UnknownTypeTag(u8),
    /// The instruction stream ended in the middle of an instruction.
    TruncatedInstruction { pc: usize },
    InvalidBranchTarget { pc: usize, offset: i64 },
    MalformedDescriptor(String),
    /// A constant pool index was empty or held an entry of the wrong kind.
    ConstantPool { index: u16, expected: &'static str },
    ClassNotFound(String),
    NoSuchMethod { class: String, name: String, descriptor: String },
    NoSuchField { class: String, name: String },
    /// No native implementation is registered for a method without bytecode.
    NativeNotFound { class: String, name: String, descriptor: String },
    Unsupported(&'static str),
    /// Writing to a console sink failed.
    Io(io::Error),

    /// Attaches the executing instruction and the call stack to an underlying failure.
    Execution {
        opcode: Option<u8>,
        location: Location,
        backtrace: Vec<Location>,
        cause: Box<Error>,
    },
}

impl Error {
    /// Returns the innermost failure, looking through any `Execution` context.
    pub fn root(&self) -> &Error {
        match *self {
            Error::Execution { ref cause, .. } => cause.root(),
            ref e => e,
        }
    }

    /// Returns the binary name of the Java class a guest would observe for this failure, or
    /// `None` for internal-consistency failures.
    pub fn guest_class_name(&self) -> Option<&'static str> {
        match *self.root() {
            Error::NullPointer => Some("java/lang/NullPointerException"),
            Error::ArrayIndexOutOfBounds { .. } =>
                Some("java/lang/ArrayIndexOutOfBoundsException"),
            Error::NegativeArraySize(_) => Some("java/lang/NegativeArraySizeException"),
            Error::ArithmeticDivideByZero => Some("java/lang/ArithmeticException"),
            Error::ClassCast { .. } => Some("java/lang/ClassCastException"),
            Error::ArrayStore { .. } => Some("java/lang/ArrayStoreException"),
            Error::AbstractMethod { .. } => Some("java/lang/AbstractMethodError"),
            Error::StackOverflow { .. } => Some("java/lang/StackOverflowError"),
            _ => None,
        }
    }

    pub fn is_guest_visible(&self) -> bool {
        match *self.root() {
            Error::UncaughtException { .. } => true,
            ref e => e.guest_class_name().is_some(),
        }
    }

    /// The message a guest exception object carries for this failure, if any.
    pub fn guest_message(&self) -> Option<String> {
        match *self.root() {
            Error::ArrayIndexOutOfBounds { index, length } =>
                Some(format!("Index {} out of bounds for length {}", index, length)),
            Error::NegativeArraySize(length) => Some(length.to_string()),
            Error::ArithmeticDivideByZero => Some(String::from("/ by zero")),
            Error::ClassCast { ref from, ref to } =>
                Some(format!("class {} cannot be cast to class {}", from, to)),
            Error::ArrayStore { ref from, .. } => Some(from.clone()),
            Error::AbstractMethod { ref class, ref name } => Some(format!("{}.{}", class, name)),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::NullPointer => write!(f, "NullPointerException"),
            Error::ArrayIndexOutOfBounds { index, length } =>
                write!(f, "ArrayIndexOutOfBoundsException: index {} out of bounds for length {}",
                       index, length),
            Error::NegativeArraySize(length) => write!(f, "NegativeArraySizeException: {}", length),
            Error::ArithmeticDivideByZero => write!(f, "ArithmeticException: / by zero"),
            Error::ClassCast { ref from, ref to } =>
                write!(f, "ClassCastException: {} cannot be cast to {}", from, to),
            Error::ArrayStore { ref from, ref to } =>
                write!(f, "ArrayStoreException: {} into array of {}", from, to),
            Error::AbstractMethod { ref class, ref name } =>
                write!(f, "AbstractMethodError: {}.{}", class, name),
            Error::StackOverflow { depth } => write!(f, "StackOverflowError at depth {}", depth),
            Error::UncaughtException { ref class, message: Some(ref message) } =>
                write!(f, "uncaught exception {}: {}", class, message),
            Error::UncaughtException { ref class, message: None } =>
                write!(f, "uncaught exception {}", class),
            Error::OperandStackUnderflow => write!(f, "operand stack underflow"),
            Error::OperandStackOverflow { max_stack } =>
                write!(f, "operand stack overflow (max_stack = {})", max_stack),
            Error::TypeMismatch { expected, ref found } =>
                write!(f, "expected {} but found {}", expected, found),
            Error::InvalidLocalIndex { index, max_locals } =>
                write!(f, "invalid local variable index {} (max_locals = {})", index, max_locals),
            Error::UnknownOpcode(opcode) =>
                write!(f, "unknown or reserved opcode 0x{:02x}", opcode),
            Error::UnknownTypeTag(tag) => write!(f, "unknown array type tag {}", tag),
            Error::TruncatedInstruction { pc } => write!(f, "truncated instruction at pc {}", pc),
            Error::InvalidBranchTarget { pc, offset } =>
                write!(f, "branch from pc {} by {} leaves the method", pc, offset),
            Error::MalformedDescriptor(ref descriptor) =>
                write!(f, "malformed descriptor {:?}", descriptor),
            Error::ConstantPool { index, expected } =>
                write!(f, "constant pool entry {} is not a {}", index, expected),
            Error::ClassNotFound(ref name) => write!(f, "class {} not found", name),
            Error::NoSuchMethod { ref class, ref name, ref descriptor } =>
                write!(f, "no method {}.{}{}", class, name, descriptor),
            Error::NoSuchField { ref class, ref name } =>
                write!(f, "no field {}.{}", class, name),
            Error::NativeNotFound { ref class, ref name, ref descriptor } =>
                write!(f, "no native implementation for {}.{}{}", class, name, descriptor),
            Error::Unsupported(what) => write!(f, "unsupported: {}", what),
            Error::Io(ref error) => write!(f, "I/O error: {}", error),
            Error::Execution { opcode, ref location, ref backtrace, ref cause } => {
                match opcode {
                    Some(opcode) => write!(f, "{} (opcode 0x{:02x}) at {}", cause, opcode,
                                           location)?,
                    None => write!(f, "{} at {}", cause, location)?,
                }
                for caller in backtrace {
                    write!(f, "\n    at {}", caller)?;
                }
                Ok(())
            },
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Execution { ref cause, .. } => Some(cause.as_ref()),
            Error::Io(ref error) => Some(error),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn location(pc: usize) -> Location {
        Location { class: String::from("Foo"), method: String::from("bar"), pc: pc }
    }

    #[test]
    fn test_classification_looks_through_context() {
        let error = Error::Execution {
            opcode: Some(0x2e),
            location: location(3),
            backtrace: vec![location(3), location(9)],
            cause: Box::new(Error::ArrayIndexOutOfBounds { index: 5, length: 2 }),
        };
        assert!(error.is_guest_visible());
        assert_eq!(error.guest_class_name(), Some("java/lang/ArrayIndexOutOfBoundsException"));
        assert!(!Error::UnknownOpcode(0xca).is_guest_visible());
        assert!(!Error::OperandStackUnderflow.is_guest_visible());
    }

    #[test]
    fn test_display_includes_location() {
        let error = Error::Execution {
            opcode: Some(0xca),
            location: location(7),
            backtrace: vec![],
            cause: Box::new(Error::UnknownOpcode(0xca)),
        };
        assert_eq!(error.to_string(),
                   "unknown or reserved opcode 0xca (opcode 0xca) at Foo.bar(pc 7)");
    }
}
