//! Heap entities: scalar objects, arrays of references, arrays of primitives, and class objects.

use std::collections::HashMap;
use std::rc::Rc;

use crate::vm::class::Class;
use crate::vm::error::{Error, Result};
use crate::vm::sig;
use crate::vm::value::{Reference, Value};

/// Array type codes used by the `newarray` instruction.
pub mod array_type {
    pub const T_BOOLEAN: u8 = 4;
    pub const T_CHAR: u8 = 5;
    pub const T_FLOAT: u8 = 6;
    pub const T_DOUBLE: u8 = 7;
    pub const T_BYTE: u8 = 8;
    pub const T_SHORT: u8 = 9;
    pub const T_INT: u8 = 10;
    pub const T_LONG: u8 = 11;
}

/// The element type of a `BaseTypeArray`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayType {
    Boolean,
    Char,
    Float,
    Double,
    Byte,
    Short,
    Int,
    Long,
}

impl ArrayType {
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            array_type::T_BOOLEAN => Ok(ArrayType::Boolean),
            array_type::T_CHAR => Ok(ArrayType::Char),
            array_type::T_FLOAT => Ok(ArrayType::Float),
            array_type::T_DOUBLE => Ok(ArrayType::Double),
            array_type::T_BYTE => Ok(ArrayType::Byte),
            array_type::T_SHORT => Ok(ArrayType::Short),
            array_type::T_INT => Ok(ArrayType::Int),
            array_type::T_LONG => Ok(ArrayType::Long),
            _ => Err(Error::UnknownTypeTag(tag)),
        }
    }

    pub fn from_type(ty: &sig::Type) -> Option<Self> {
        match *ty {
            sig::Type::Boolean => Some(ArrayType::Boolean),
            sig::Type::Char => Some(ArrayType::Char),
            sig::Type::Float => Some(ArrayType::Float),
            sig::Type::Double => Some(ArrayType::Double),
            sig::Type::Byte => Some(ArrayType::Byte),
            sig::Type::Short => Some(ArrayType::Short),
            sig::Type::Int => Some(ArrayType::Int),
            sig::Type::Long => Some(ArrayType::Long),
            sig::Type::Reference(_) => None,
        }
    }

    pub fn tag(&self) -> u8 {
        match *self {
            ArrayType::Boolean => array_type::T_BOOLEAN,
            ArrayType::Char => array_type::T_CHAR,
            ArrayType::Float => array_type::T_FLOAT,
            ArrayType::Double => array_type::T_DOUBLE,
            ArrayType::Byte => array_type::T_BYTE,
            ArrayType::Short => array_type::T_SHORT,
            ArrayType::Int => array_type::T_INT,
            ArrayType::Long => array_type::T_LONG,
        }
    }

    pub fn element_type(&self) -> sig::Type {
        match *self {
            ArrayType::Boolean => sig::Type::Boolean,
            ArrayType::Char => sig::Type::Char,
            ArrayType::Float => sig::Type::Float,
            ArrayType::Double => sig::Type::Double,
            ArrayType::Byte => sig::Type::Byte,
            ArrayType::Short => sig::Type::Short,
            ArrayType::Int => sig::Type::Int,
            ArrayType::Long => sig::Type::Long,
        }
    }
}

fn check_index(index: i32, length: usize) -> Result<usize> {
    if index < 0 || index as usize >= length {
        Err(Error::ArrayIndexOutOfBounds { index: index, length: length })
    } else {
        Ok(index as usize)
    }
}

fn check_length(length: i32) -> Result<usize> {
    if length < 0 {
        Err(Error::NegativeArraySize(length))
    } else {
        Ok(length as usize)
    }
}

#[derive(Debug)]
/// An instance of a non-array object.
pub struct Object {
    /// A reference to the object's creating class.
    class: Rc<Class>,
    /// The instance (non-`static`) fields of the object, including inherited ones, keyed by name.
    fields: HashMap<String, Value>,
}

impl Object {
    pub fn new(class: Rc<Class>) -> Self {
        let mut fields = HashMap::new();
        for sig in class.collect_instance_fields() {
            let value = sig.ty.default_value();
            fields.insert(sig.name, value);
        }
        Object {
            class: class,
            fields: fields,
        }
    }

    pub fn get_class(&self) -> Rc<Class> {
        self.class.clone()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn get_field(&self, name: &str) -> Result<Value> {
        self.fields.get(name).cloned().ok_or_else(|| self.no_such_field(name))
    }

    pub fn put_field(&mut self, name: &str, value: Value) -> Result<()> {
        match self.fields.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            },
            None => Err(self.no_such_field(name)),
        }
    }

    fn no_such_field(&self, name: &str) -> Error {
        Error::NoSuchField { class: self.class.name(), name: String::from(name) }
    }
}

#[derive(Debug)]
/// An array whose elements are references.
pub struct Array {
    /// A reference to the (synthetic) array class.
    class: Rc<Class>,
    /// The array data.
    array: Vec<Reference>,
}

impl Array {
    pub fn new(class: Rc<Class>, length: i32) -> Result<Self> {
        let length = check_length(length)?;
        Ok(Array {
            class: class,
            array: vec![Reference::Null; length],
        })
    }

    pub fn from_elements(class: Rc<Class>, elements: Vec<Reference>) -> Self {
        Array {
            class: class,
            array: elements,
        }
    }

    pub fn get_class(&self) -> Rc<Class> {
        self.class.clone()
    }

    pub fn get(&self, index: i32) -> Result<Reference> {
        let index = check_index(index, self.array.len())?;
        Ok(self.array[index].clone())
    }

    /// Stores without checking the element's type; callers enforce assignability.
    pub fn put(&mut self, index: i32, value: Reference) -> Result<()> {
        let index = check_index(index, self.array.len())?;
        self.array[index] = value;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    pub fn elements(&self) -> &[Reference] {
        &self.array
    }

    pub fn elements_mut(&mut self) -> &mut [Reference] {
        &mut self.array
    }
}

/// The backing store of a `BaseTypeArray`: exactly one homogeneous vector.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    Booleans(Vec<bool>),
    Bytes(Vec<i8>),
    Chars(Vec<u16>),
    Shorts(Vec<i16>),
    Ints(Vec<i32>),
    Longs(Vec<i64>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
}

impl Storage {
    pub fn new(array_type: ArrayType, length: usize) -> Self {
        match array_type {
            ArrayType::Boolean => Storage::Booleans(vec![false; length]),
            ArrayType::Byte => Storage::Bytes(vec![0; length]),
            ArrayType::Char => Storage::Chars(vec![0; length]),
            ArrayType::Short => Storage::Shorts(vec![0; length]),
            ArrayType::Int => Storage::Ints(vec![0; length]),
            ArrayType::Long => Storage::Longs(vec![0; length]),
            ArrayType::Float => Storage::Floats(vec![0.0; length]),
            ArrayType::Double => Storage::Doubles(vec![0.0; length]),
        }
    }

    pub fn array_type(&self) -> ArrayType {
        match *self {
            Storage::Booleans(_) => ArrayType::Boolean,
            Storage::Bytes(_) => ArrayType::Byte,
            Storage::Chars(_) => ArrayType::Char,
            Storage::Shorts(_) => ArrayType::Short,
            Storage::Ints(_) => ArrayType::Int,
            Storage::Longs(_) => ArrayType::Long,
            Storage::Floats(_) => ArrayType::Float,
            Storage::Doubles(_) => ArrayType::Double,
        }
    }

    pub fn len(&self) -> usize {
        match *self {
            Storage::Booleans(ref v) => v.len(),
            Storage::Bytes(ref v) => v.len(),
            Storage::Chars(ref v) => v.len(),
            Storage::Shorts(ref v) => v.len(),
            Storage::Ints(ref v) => v.len(),
            Storage::Longs(ref v) => v.len(),
            Storage::Floats(ref v) => v.len(),
            Storage::Doubles(ref v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
/// An array of one of the eight primitive types, tagged by its element type.
pub struct BaseTypeArray {
    class: Rc<Class>,
    storage: Storage,
}

macro_rules! accessors {
    ($($get: ident, $set: ident, $variant: ident, $ty: ty, $name: expr;)*) => {
        $(
            pub fn $get(&self, index: i32) -> Result<$ty> {
                match self.storage {
                    Storage::$variant(ref values) => {
                        let index = check_index(index, values.len())?;
                        Ok(values[index])
                    },
                    ref other => Err(Self::mismatch($name, other)),
                }
            }

            pub fn $set(&mut self, index: i32, value: $ty) -> Result<()> {
                match self.storage {
                    Storage::$variant(ref mut values) => {
                        let index = check_index(index, values.len())?;
                        values[index] = value;
                        Ok(())
                    },
                    ref other => Err(Self::mismatch($name, other)),
                }
            }
        )*
    };
}

impl BaseTypeArray {
    /// Allocates a zeroed array. `class` must be the array class for `array_type`.
    pub fn new(class: Rc<Class>, array_type: ArrayType, length: i32) -> Result<Self> {
        let length = check_length(length)?;
        trace!("allocating {:?} array of length {}", array_type, length);
        Ok(BaseTypeArray {
            class: class,
            storage: Storage::new(array_type, length),
        })
    }

    /// Wraps a pre-populated store. `class` must be the array class for its element type.
    pub fn from_storage(class: Rc<Class>, storage: Storage) -> Self {
        BaseTypeArray {
            class: class,
            storage: storage,
        }
    }

    pub fn get_class(&self) -> Rc<Class> {
        self.class.clone()
    }

    pub fn array_type(&self) -> ArrayType {
        self.storage.array_type()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    fn mismatch(expected: &'static str, storage: &Storage) -> Error {
        Error::TypeMismatch {
            expected: expected,
            found: format!("{:?} array", storage.array_type()),
        }
    }

    accessors! {
        get_boolean, set_boolean, Booleans, bool, "boolean array";
        get_byte, set_byte, Bytes, i8, "byte array";
        get_char, set_char, Chars, u16, "char array";
        get_short, set_short, Shorts, i16, "short array";
        get_int, set_int, Ints, i32, "int array";
        get_long, set_long, Longs, i64, "long array";
        get_float, set_float, Floats, f32, "float array";
        get_double, set_double, Doubles, f64, "double array";
    }
}

#[derive(Debug)]
/// The `java.lang.Class` instance for a loaded class.
pub struct ClassObject {
    /// The class `java/lang/Class` itself.
    class: Rc<Class>,
    /// The class this object stands for.
    represents: Rc<Class>,
    /// The class object of the component type, present only for array classes.
    component_type: Option<Reference>,
}

impl ClassObject {
    pub fn new(class: Rc<Class>, represents: Rc<Class>, component_type: Option<Reference>)
            -> Self {
        ClassObject {
            class: class,
            represents: represents,
            component_type: component_type,
        }
    }

    pub fn get_class(&self) -> Rc<Class> {
        self.class.clone()
    }

    pub fn represents(&self) -> &Rc<Class> {
        &self.represents
    }

    /// The component type's class object, or `null` if the represented class is not an array.
    pub fn get_component_type(&self) -> Reference {
        self.component_type.clone().unwrap_or(Reference::Null)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vm::class_loader::ClassLoader;

    fn int_array(loader: &mut ClassLoader, length: i32) -> BaseTypeArray {
        let class = loader.primitive_array_class(ArrayType::Int).unwrap();
        BaseTypeArray::new(class, ArrayType::Int, length).unwrap()
    }

    #[test]
    fn test_storage_matches_tag() {
        for tag in 4..12 {
            let array_type = ArrayType::from_tag(tag).unwrap();
            assert_eq!(array_type.tag(), tag);
            let storage = Storage::new(array_type, 3);
            assert_eq!(storage.array_type(), array_type);
            assert_eq!(storage.len(), 3);
        }
        assert!(ArrayType::from_tag(3).is_err());
        assert!(ArrayType::from_tag(12).is_err());
    }

    #[test]
    fn test_accessor_must_match_tag() {
        let mut loader = ClassLoader::new().unwrap();
        let mut array = int_array(&mut loader, 2);
        array.set_int(1, 42).unwrap();
        assert_eq!(array.get_int(1).unwrap(), 42);
        match array.get_long(1) {
            Err(Error::TypeMismatch { .. }) => (),
            other => panic!("expected a type mismatch, got {:?}", other),
        }
        match array.set_float(0, 1.0) {
            Err(Error::TypeMismatch { .. }) => (),
            other => panic!("expected a type mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_bounds() {
        let mut loader = ClassLoader::new().unwrap();
        let mut array = int_array(&mut loader, 2);
        match array.get_int(2) {
            Err(Error::ArrayIndexOutOfBounds { index: 2, length: 2 }) => (),
            other => panic!("expected out of bounds, got {:?}", other),
        }
        assert!(array.set_int(-1, 0).is_err());
        let class = loader.primitive_array_class(ArrayType::Int).unwrap();
        match BaseTypeArray::new(class, ArrayType::Int, -1) {
            Err(Error::NegativeArraySize(-1)) => (),
            other => panic!("expected negative size, got {:?}", other),
        }
    }

    #[test]
    fn test_from_storage() {
        let mut loader = ClassLoader::new().unwrap();
        let class = loader.primitive_array_class(ArrayType::Char).unwrap();
        let array = BaseTypeArray::from_storage(class, Storage::Chars(vec![104, 105]));
        assert_eq!(array.array_type(), ArrayType::Char);
        assert_eq!(array.len(), 2);
        assert_eq!(array.get_char(1).unwrap(), 105);
    }
}
