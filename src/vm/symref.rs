//! Symbolic references to classes, methods and fields, as resolved from the constant pool.

use crate::vm::sig;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Class {
    pub sig: sig::Class,
}

impl Class {
    pub fn new(name: &str) -> Self {
        Class { sig: sig::Class::new(name) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Method {
    pub class: Class,
    pub sig: sig::Method,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub class: Class,
    pub sig: sig::Field,
}
