//! The run-time constant pool of a class, with symbolic references already resolved to
//! signatures by the class-loading collaborator.

use crate::util::OneIndexedVec;
use crate::vm::error::{Error, Result};
use crate::vm::symref;

/// An index into the constant pool. Index 0 is never valid.
pub type ConstantPoolIndex = u16;

#[derive(Debug, Clone)]
pub enum RuntimeConstantPoolEntry {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    ClassRef(symref::Class),
    MethodRef(symref::Method),
    InterfaceMethodRef(symref::Method),
    FieldRef(symref::Field),
}

/// The run-time constant pool. As in the class file, `long` and `double` constants take up two
/// indices; the second is left empty.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConstantPool {
    entries: OneIndexedVec<Option<RuntimeConstantPoolEntry>>,
}

impl RuntimeConstantPool {
    pub fn new() -> Self {
        RuntimeConstantPool { entries: OneIndexedVec::new() }
    }

    /// Appends an entry and returns its index.
    pub fn push(&mut self, entry: RuntimeConstantPoolEntry) -> ConstantPoolIndex {
        let wide = match entry {
            RuntimeConstantPoolEntry::Long(_) | RuntimeConstantPoolEntry::Double(_) => true,
            _ => false,
        };
        let index = self.entries.push(Some(entry));
        if wide {
            self.entries.push(None);
        }
        index as ConstantPoolIndex
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: ConstantPoolIndex) -> Option<&RuntimeConstantPoolEntry> {
        self.entries.get(index as usize).and_then(Option::as_ref)
    }

    pub fn class_ref(&self, index: ConstantPoolIndex) -> Result<&symref::Class> {
        match self.get(index) {
            Some(&RuntimeConstantPoolEntry::ClassRef(ref symref)) => Ok(symref),
            _ => Err(Error::ConstantPool { index: index, expected: "class reference" }),
        }
    }

    /// Looks up a method reference, accepting both class and interface method entries.
    pub fn method_ref(&self, index: ConstantPoolIndex) -> Result<&symref::Method> {
        match self.get(index) {
            Some(&RuntimeConstantPoolEntry::MethodRef(ref symref))
                | Some(&RuntimeConstantPoolEntry::InterfaceMethodRef(ref symref)) => Ok(symref),
            _ => Err(Error::ConstantPool { index: index, expected: "method reference" }),
        }
    }

    pub fn field_ref(&self, index: ConstantPoolIndex) -> Result<&symref::Field> {
        match self.get(index) {
            Some(&RuntimeConstantPoolEntry::FieldRef(ref symref)) => Ok(symref),
            _ => Err(Error::ConstantPool { index: index, expected: "field reference" }),
        }
    }
}
