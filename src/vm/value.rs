//! Internal JVM representations of Java values.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::vm::class::Class;
use crate::vm::error::{Error, Result};
use crate::vm::heap::{Array, BaseTypeArray, ClassObject, Object, Storage};

/// A value in the Java virtual machine.
#[derive(Debug, Clone)]
pub enum Value {
    /// A 32-bit signed integral type, representing the Java types `byte`, `char`, `short`, `int`,
    /// and `boolean`.
    Int(i32),
    /// A 32-bit floating-point type, representing the Java type `float`.
    Float(f32),
    /// A 64-bit signed integral type, representing the Java type `long`.
    Long(i64),
    /// A 64-bit floating-point type, representing the Java type `double`.
    Double(f64),
    /// A reference to a heap object, or `null`.
    Reference(Reference),
    /// The address of the instruction following a `jsr`, consumed by `ret`.
    ReturnAddress(usize),
}

impl Value {
    /// The number of slots the value occupies on the operand stack or in the local variables.
    pub fn category(&self) -> usize {
        match *self {
            Value::Long(_) | Value::Double(_) => 2,
            _ => 1,
        }
    }

    pub fn kind(&self) -> &'static str {
        match *self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::Reference(_) => "reference",
            Value::ReturnAddress(_) => "returnAddress",
        }
    }

    pub fn mismatch(&self, expected: &'static str) -> Error {
        Error::TypeMismatch { expected: expected, found: format!("{:?}", self) }
    }
}

/// A typed handle to a heap entity. Every variant except `Null` fixes the element or field layout
/// of its target at construction time. Equality is identity of the target, never structure.
#[derive(Clone)]
pub enum Reference {
    Null,
    /// An instance of a non-array class.
    Object(Rc<RefCell<Object>>),
    /// An array whose elements are references.
    Array(Rc<RefCell<Array>>),
    /// An array whose elements are one of the eight primitive types.
    BaseTypeArray(Rc<RefCell<BaseTypeArray>>),
    /// A `java.lang.Class` instance standing for a loaded class.
    ClassObject(Rc<ClassObject>),
}

impl Reference {
    pub fn new_object(object: Object) -> Self {
        Reference::Object(Rc::new(RefCell::new(object)))
    }

    pub fn new_array(array: Array) -> Self {
        Reference::Array(Rc::new(RefCell::new(array)))
    }

    pub fn new_base_type_array(array: BaseTypeArray) -> Self {
        Reference::BaseTypeArray(Rc::new(RefCell::new(array)))
    }

    pub fn is_null(&self) -> bool {
        match *self {
            Reference::Null => true,
            _ => false,
        }
    }

    /// Fails with a guest-visible `NullPointer` condition for `null`.
    pub fn non_null(self) -> Result<Reference> {
        match self {
            Reference::Null => Err(Error::NullPointer),
            reference => Ok(reference),
        }
    }

    /// The run-time class of the referenced entity; `None` for `null`.
    pub fn get_class(&self) -> Option<Rc<Class>> {
        match *self {
            Reference::Null => None,
            Reference::Object(ref object) => Some(object.borrow().get_class()),
            Reference::Array(ref array) => Some(array.borrow().get_class()),
            Reference::BaseTypeArray(ref array) => Some(array.borrow().get_class()),
            Reference::ClassObject(ref class_object) => Some(class_object.get_class()),
        }
    }

    /// The length of an array reference.
    pub fn array_length(&self) -> Result<usize> {
        match *self {
            Reference::Null => Err(Error::NullPointer),
            Reference::Array(ref array) => Ok(array.borrow().len()),
            Reference::BaseTypeArray(ref array) => Ok(array.borrow().len()),
            ref other => Err(Error::TypeMismatch {
                expected: "array reference",
                found: format!("{:?}", other),
            }),
        }
    }

    /// A hash derived from the identity of the referenced entity, stable for its lifetime.
    pub fn identity_hash(&self) -> i32 {
        let address = match *self {
            Reference::Null => return 0,
            Reference::Object(ref rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Reference::Array(ref rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Reference::BaseTypeArray(ref rc) => Rc::as_ptr(rc) as *const u8 as usize,
            Reference::ClassObject(ref rc) => Rc::as_ptr(rc) as *const u8 as usize,
        };
        let address = address as u64;
        ((address >> 3) ^ (address >> 35)) as i32 & 0x7fff_ffff
    }

    /// Reads the contents of a `java.lang.String` through its `value` character array. Returns
    /// `None` if this is not a string object.
    pub fn as_rust_string(&self) -> Option<String> {
        if let Reference::Object(ref object) = *self {
            let object = object.borrow();
            if object.get_class().name() != "java/lang/String" {
                return None;
            }
            if let Ok(Value::Reference(Reference::BaseTypeArray(chars))) =
                    object.get_field("value") {
                if let Storage::Chars(ref units) = *chars.borrow().storage() {
                    return Some(String::from_utf16_lossy(units));
                }
            }
        }
        None
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Reference) -> bool {
        match (self, other) {
            (&Reference::Null, &Reference::Null) => true,
            (&Reference::Object(ref a), &Reference::Object(ref b)) => Rc::ptr_eq(a, b),
            (&Reference::Array(ref a), &Reference::Array(ref b)) => Rc::ptr_eq(a, b),
            (&Reference::BaseTypeArray(ref a), &Reference::BaseTypeArray(ref b)) =>
                Rc::ptr_eq(a, b),
            (&Reference::ClassObject(ref a), &Reference::ClassObject(ref b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Reference {}

// Objects can refer to themselves, so never recurse into the target.
impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let class = match *self {
            Reference::Null => return write!(f, "null"),
            Reference::Object(ref rc) => rc.try_borrow().ok().map(|o| o.get_class()),
            Reference::Array(ref rc) => rc.try_borrow().ok().map(|a| a.get_class()),
            Reference::BaseTypeArray(ref rc) => rc.try_borrow().ok().map(|a| a.get_class()),
            Reference::ClassObject(ref rc) => Some(rc.get_class()),
        };
        match class {
            Some(class) => write!(f, "{}@{:x}", class.name(), self.identity_hash()),
            None => write!(f, "<borrowed>@{:x}", self.identity_hash()),
        }
    }
}
