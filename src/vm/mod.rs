//! The runtime: data areas, the instruction set, the native bridge and the thread that drives
//! them.

pub mod bytecode;
pub mod class;
pub mod class_loader;
pub mod constant_pool;
pub mod error;
pub mod frame;
pub mod heap;
pub mod instructions;
pub mod local_variables;
pub mod native;
pub mod operand_stack;
pub mod sig;
pub mod symref;
pub mod thread;
pub mod value;

pub use self::class::{Class, ClassBuilder, ExceptionTableEntry, Method, MethodCode};
pub use self::class_loader::ClassLoader;
pub use self::constant_pool::{RuntimeConstantPool, RuntimeConstantPoolEntry};
pub use self::error::{Error, Result};
pub use self::frame::{Frame, Location};
pub use self::native::{Console, NativeRegistry, NativeValue};
pub use self::thread::{Options, Thread};
pub use self::value::{Reference, Value};
