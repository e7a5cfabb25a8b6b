#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

pub use rust_jvm_engine::vm::class::MethodCode;
use rust_jvm_engine::vm::class::{method_access_flags, Class, ClassBuilder};
use rust_jvm_engine::vm::constant_pool::{ConstantPoolIndex, RuntimeConstantPool,
                                         RuntimeConstantPoolEntry};
use rust_jvm_engine::vm::native::{Console, NativeRegistry};
use rust_jvm_engine::vm::{sig, symref, ClassLoader, Reference, Result, Thread, Value};

pub const PUBLIC_STATIC: u16 = method_access_flags::ACC_PUBLIC | method_access_flags::ACC_STATIC;
pub const PUBLIC: u16 = method_access_flags::ACC_PUBLIC;

/// An in-memory console sink whose contents stay readable after it is handed to a `Console`.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A thread with the default natives whose console output is captured.
pub fn thread() -> (Thread, SharedBuffer, SharedBuffer) {
    let out = SharedBuffer::default();
    let err = SharedBuffer::default();
    let console = Console::new(Box::new(out.clone()), Box::new(err.clone()));
    (Thread::new(NativeRegistry::with_defaults(), console), out, err)
}

pub fn method_sig(name: &str, descriptor: &str) -> sig::Method {
    sig::Method::new(name, descriptor).unwrap()
}

pub fn object_class(loader: &ClassLoader) -> Rc<Class> {
    loader.find_class("java/lang/Object").unwrap()
}

/// Builds a constant pool entry by entry, remembering nothing but the indices it hands out.
#[derive(Default)]
pub struct Pool(RuntimeConstantPool);

impl Pool {
    pub fn class(&mut self, name: &str) -> ConstantPoolIndex {
        self.0.push(RuntimeConstantPoolEntry::ClassRef(symref::Class::new(name)))
    }

    pub fn method(&mut self, class: &str, name: &str, descriptor: &str) -> ConstantPoolIndex {
        self.0.push(RuntimeConstantPoolEntry::MethodRef(symref::Method {
            class: symref::Class::new(class),
            sig: method_sig(name, descriptor),
        }))
    }

    pub fn field(&mut self, class: &str, name: &str, descriptor: &str) -> ConstantPoolIndex {
        self.0.push(RuntimeConstantPoolEntry::FieldRef(symref::Field {
            class: symref::Class::new(class),
            sig: sig::Field {
                name: String::from(name),
                ty: sig::Type::new(descriptor).unwrap(),
            },
        }))
    }

    pub fn string(&mut self, value: &str) -> ConstantPoolIndex {
        self.0.push(RuntimeConstantPoolEntry::String(String::from(value)))
    }

    pub fn entry(&mut self, entry: RuntimeConstantPoolEntry) -> ConstantPoolIndex {
        self.0.push(entry)
    }

    pub fn build(self) -> RuntimeConstantPool {
        self.0
    }
}

/// The two bytes of a constant pool index or branch offset, high byte first.
pub fn u16_bytes(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

pub fn i16_bytes(value: i16) -> [u8; 2] {
    value.to_be_bytes()
}

pub fn i32_bytes(value: i32) -> [u8; 4] {
    value.to_be_bytes()
}

pub fn code(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Option<MethodCode> {
    Some(MethodCode::new(max_stack, max_locals, code))
}

/// A public class extending `java/lang/Object` with a single static method.
pub fn define_static(loader: &mut ClassLoader, class: &str, pool: Pool, name: &str,
                     descriptor: &str, method_code: MethodCode) -> Rc<Class> {
    let object = object_class(loader);
    loader.define(ClassBuilder::new(class)
        .superclass(object)
        .constant_pool(pool.build())
        .method(method_sig(name, descriptor), PUBLIC_STATIC, Some(method_code))
        .build())
}

pub fn int_result(value: Option<Value>) -> i32 {
    match value {
        Some(Value::Int(v)) => v,
        other => panic!("expected an int result, found {:?}", other),
    }
}

pub fn reference_result(value: Option<Value>) -> Reference {
    match value {
        Some(Value::Reference(reference)) => reference,
        other => panic!("expected a reference result, found {:?}", other),
    }
}

/// Runs the named static method of `class` on a fresh thread.
pub fn run_static(loader: &mut ClassLoader, class: &Rc<Class>, name: &str, descriptor: &str,
                  args: Vec<Value>) -> Result<Option<Value>> {
    let (mut thread, _, _) = thread();
    let method = class.get_method(&method_sig(name, descriptor)).unwrap().clone();
    thread.invoke(loader, class, &method, args)
}
