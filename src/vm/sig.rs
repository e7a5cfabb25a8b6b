//! Signatures of types, classes, methods and fields, as named by descriptors in the class file.

use std::fmt;

use nom::branch::alt;
use nom::bytes::complete::is_not;
use nom::character::complete::char;
use nom::combinator::{all_consuming, map, value};
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::IResult;

use crate::vm::error::{Error, Result};
use crate::vm::value::{Reference, Value};

/// The type of a field, parameter, local variable or value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    Reference(Class),
}

impl Type {
    /// Parses a field descriptor such as `I`, `Ljava/lang/String;` or `[[D`.
    pub fn new(descriptor: &str) -> Result<Self> {
        all_consuming(field_type)(descriptor)
            .map(|(_, ty)| ty)
            .map_err(|_| Error::MalformedDescriptor(String::from(descriptor)))
    }

    /// The number of local variable or operand stack slots a value of this type occupies.
    pub fn category(&self) -> usize {
        match *self {
            Type::Long | Type::Double => 2,
            _ => 1,
        }
    }

    pub fn is_primitive(&self) -> bool {
        match *self {
            Type::Reference(_) => false,
            _ => true,
        }
    }

    /// The value a field or array element of this type holds before it is first assigned.
    pub fn default_value(&self) -> Value {
        match *self {
            Type::Byte | Type::Char | Type::Int | Type::Short | Type::Boolean => Value::Int(0),
            Type::Double => Value::Double(0.0),
            Type::Float => Value::Float(0.0),
            Type::Long => Value::Long(0),
            Type::Reference(_) => Value::Reference(Reference::Null),
        }
    }

    /// The Java language keyword for a primitive type, or the dotted binary name of a class.
    pub fn java_name(&self) -> String {
        match *self {
            Type::Byte => String::from("byte"),
            Type::Char => String::from("char"),
            Type::Double => String::from("double"),
            Type::Float => String::from("float"),
            Type::Int => String::from("int"),
            Type::Long => String::from("long"),
            Type::Short => String::from("short"),
            Type::Boolean => String::from("boolean"),
            Type::Reference(ref class) => class.java_name(),
        }
    }
}

impl fmt::Display for Type {
    /// Writes the field descriptor of this type.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Type::Byte => write!(f, "B"),
            Type::Char => write!(f, "C"),
            Type::Double => write!(f, "D"),
            Type::Float => write!(f, "F"),
            Type::Int => write!(f, "I"),
            Type::Long => write!(f, "J"),
            Type::Short => write!(f, "S"),
            Type::Boolean => write!(f, "Z"),
            Type::Reference(Class::Scalar(ref name)) => write!(f, "L{};", name),
            Type::Reference(Class::Array(ref component)) => write!(f, "[{}", component),
        }
    }
}

/// The signature of a class: either a named (scalar) class or an array class with the given
/// component type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Class {
    Scalar(String),
    Array(Box<Type>),
}

impl Class {
    /// Creates a class signature from a binary name as it appears in a `CONSTANT_Class` entry:
    /// `java/lang/Object`, or an array descriptor such as `[I`.
    pub fn new(name: &str) -> Self {
        if name.starts_with('[') {
            match Type::new(name) {
                Ok(Type::Reference(class)) => class,
                _ => Class::Scalar(String::from(name)),
            }
        } else {
            Class::Scalar(String::from(name))
        }
    }

    /// Returns the package portion of a scalar class name (empty for the unnamed package). Array
    /// classes belong to the package of their innermost element type.
    pub fn get_package(&self) -> String {
        match *self {
            Class::Scalar(ref name) => match name.rfind('/') {
                Some(index) => String::from(&name[..index]),
                None => String::new(),
            },
            Class::Array(ref component) => match **component {
                Type::Reference(ref class) => class.get_package(),
                _ => String::from("java/lang"),
            },
        }
    }

    /// The name `Class.getName()` would report: dots for scalars, descriptors for arrays.
    pub fn java_name(&self) -> String {
        match *self {
            Class::Scalar(ref name) => name.replace('/', "."),
            Class::Array(_) => self.to_string().replace('/', "."),
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Class::Scalar(ref name) => write!(f, "{}", name),
            Class::Array(ref component) => write!(f, "[{}", component),
        }
    }
}

/// The signature of a method: its name, parameter types and return type (`None` for `void`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Method {
    pub name: String,
    pub params: Vec<Type>,
    pub return_ty: Option<Type>,
}

impl Method {
    /// Creates a method signature from a name and a method descriptor such as
    /// `(ILjava/lang/String;)V`.
    pub fn new(name: &str, descriptor: &str) -> Result<Self> {
        let (params, return_ty) = all_consuming(method_descriptor)(descriptor)
            .map(|(_, parsed)| parsed)
            .map_err(|_| Error::MalformedDescriptor(String::from(descriptor)))?;
        Ok(Method {
            name: String::from(name),
            params: params,
            return_ty: return_ty,
        })
    }

    /// The number of local variable slots the parameters occupy, not counting `this`.
    pub fn arg_slots(&self) -> usize {
        self.params.iter().map(Type::category).sum()
    }

    pub fn descriptor(&self) -> String {
        let mut descriptor = String::from("(");
        for param in &self.params {
            descriptor.push_str(&param.to_string());
        }
        descriptor.push(')');
        match self.return_ty {
            Some(ref ty) => descriptor.push_str(&ty.to_string()),
            None => descriptor.push('V'),
        }
        descriptor
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.name, self.descriptor())
    }
}

/// The signature of a field. Fields are identified by name alone within a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

fn field_type(input: &str) -> IResult<&str, Type> {
    alt((
        value(Type::Byte, char('B')),
        value(Type::Char, char('C')),
        value(Type::Double, char('D')),
        value(Type::Float, char('F')),
        value(Type::Int, char('I')),
        value(Type::Long, char('J')),
        value(Type::Short, char('S')),
        value(Type::Boolean, char('Z')),
        map(delimited(char('L'), is_not(";"), char(';')),
            |name: &str| Type::Reference(Class::Scalar(String::from(name)))),
        map(preceded(char('['), field_type),
            |component| Type::Reference(Class::Array(Box::new(component)))),
    ))(input)
}

fn return_type(input: &str) -> IResult<&str, Option<Type>> {
    alt((value(None, char('V')), map(field_type, Some)))(input)
}

fn method_descriptor(input: &str) -> IResult<&str, (Vec<Type>, Option<Type>)> {
    pair(preceded(char('('), terminated(many0(field_type), char(')'))), return_type)(input)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_field_descriptors() {
        assert_eq!(Type::new("I").unwrap(), Type::Int);
        assert_eq!(Type::new("Ljava/lang/String;").unwrap(),
                   Type::Reference(Class::Scalar(String::from("java/lang/String"))));
        assert_eq!(Type::new("[[J").unwrap(),
                   Type::Reference(Class::Array(Box::new(
                       Type::Reference(Class::Array(Box::new(Type::Long)))))));
        assert!(Type::new("Q").is_err());
        assert!(Type::new("II").is_err());
        assert!(Type::new("Ljava/lang/String").is_err());
    }

    #[test]
    fn test_method_descriptors() {
        let sig = Method::new("arraycopy", "(Ljava/lang/Object;ILjava/lang/Object;II)V").unwrap();
        assert_eq!(sig.params.len(), 5);
        assert_eq!(sig.return_ty, None);
        assert_eq!(sig.arg_slots(), 5);

        let sig = Method::new("f", "(JDI)[Ljava/lang/String;").unwrap();
        assert_eq!(sig.arg_slots(), 5);
        assert_eq!(sig.descriptor(), "(JDI)[Ljava/lang/String;");
        assert!(Method::new("g", "(I").is_err());
        assert!(Method::new("g", "()").is_err());
    }

    #[test]
    fn test_class_names() {
        let string = Class::new("java/lang/String");
        assert_eq!(string.get_package(), "java/lang");
        assert_eq!(string.java_name(), "java.lang.String");
        let matrix = Class::new("[[Ljava/lang/String;");
        assert_eq!(matrix.to_string(), "[[Ljava/lang/String;");
        assert_eq!(matrix.java_name(), "[[Ljava.lang.String;");
        assert_eq!(matrix.get_package(), "java/lang");
        assert_eq!(Class::new("Main").get_package(), "");
    }
}
