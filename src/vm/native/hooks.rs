//! Native behaviors that need the engine's own state rather than just their arguments.

use std::rc::Rc;

use crate::vm::class::{Class, Method};
use crate::vm::class_loader::{CLASS, PRINT_STREAM, SYSTEM, THROWABLE};
use crate::vm::error::{Error, Result};
use crate::vm::frame::Location;
use crate::vm::heap::{Array, Storage};
use crate::vm::instructions::Env;
use crate::vm::sig;
use crate::vm::value::{Reference, Value};

use super::{arg, NativeValue};

/// The public `fillInStackTrace()` and the private `fillInStackTrace(int)` it delegates to.
const FILL_IN_STACK_TRACE_DESCRIPTORS: [&str; 2] =
    ["()Ljava/lang/Throwable;", "(I)Ljava/lang/Throwable;"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// `PrintStream.print` and `PrintStream.println`, written to the stream's console sink.
    Print { newline: bool },
    /// `System.arraycopy(Object, int, Object, int, int)`.
    ArrayCopy,
    /// `Throwable.fillInStackTrace`, capturing the frames alive at the call. Any other class's
    /// `fillInStackTrace` goes through the registry.
    FillInStackTrace,
    /// `Class.getComponentType()`.
    GetComponentType,
}

impl Hook {
    pub fn select(class: &Rc<Class>, method: &Method) -> Option<Hook> {
        match (class.name().as_str(), method.name()) {
            (PRINT_STREAM, "print") => Some(Hook::Print { newline: false }),
            (PRINT_STREAM, "println") => Some(Hook::Print { newline: true }),
            (SYSTEM, "arraycopy") => Some(Hook::ArrayCopy),
            (CLASS, "getComponentType") => Some(Hook::GetComponentType),
            (THROWABLE, "fillInStackTrace") => {
                let descriptor = method.symref.sig.descriptor();
                if FILL_IN_STACK_TRACE_DESCRIPTORS.contains(&descriptor.as_str()) {
                    Some(Hook::FillInStackTrace)
                } else {
                    None
                }
            },
            _ => None,
        }
    }

    pub fn run(&self, env: &mut Env, args: &[NativeValue], caller: Option<Location>)
            -> Result<Option<NativeValue>> {
        match *self {
            Hook::Print { newline } => {
                let stream = arg(args, 0)?.as_reference()?;
                let fd = stream_fd(&stream)?;
                let mut text = match args.get(1) {
                    Some(value) => to_java_string(value)?,
                    None => String::new(),
                };
                if newline {
                    text.push('\n');
                }
                env.console.write(fd, &text)?;
                Ok(None)
            },
            Hook::ArrayCopy => {
                array_copy(arg(args, 0)?.as_reference()?, arg(args, 1)?.as_int()?,
                           arg(args, 2)?.as_reference()?, arg(args, 3)?.as_int()?,
                           arg(args, 4)?.as_int()?)?;
                Ok(None)
            },
            Hook::FillInStackTrace => {
                let throwable = arg(args, 0)?.as_reference()?;
                fill_in_stack_trace(env, &throwable, caller)?;
                Ok(Some(NativeValue::Reference(throwable)))
            },
            Hook::GetComponentType => match arg(args, 0)?.as_reference()? {
                Reference::ClassObject(class_object) =>
                    Ok(Some(NativeValue::Reference(class_object.get_component_type()))),
                other => Err(Error::TypeMismatch {
                    expected: "class object",
                    found: format!("{:?}", other),
                }),
            },
        }
    }
}

fn stream_fd(stream: &Reference) -> Result<i32> {
    match *stream {
        Reference::Null => Err(Error::NullPointer),
        Reference::Object(ref object) => match object.borrow().get_field("fd")? {
            Value::Int(fd) => Ok(fd),
            other => Err(other.mismatch("int")),
        },
        ref other => Err(Error::TypeMismatch {
            expected: "print stream",
            found: format!("{:?}", other),
        }),
    }
}

/// Converts a value to text the way `String.valueOf` does.
fn to_java_string(value: &NativeValue) -> Result<String> {
    Ok(match *value {
        NativeValue::Boolean(v) => v.to_string(),
        NativeValue::Byte(v) => v.to_string(),
        NativeValue::Char(v) => String::from_utf16_lossy(&[v]),
        NativeValue::Short(v) => v.to_string(),
        NativeValue::Int(v) => v.to_string(),
        NativeValue::Long(v) => v.to_string(),
        NativeValue::Float(v) => format_float(v),
        NativeValue::Double(v) => format_double(v),
        NativeValue::Str(ref text) => text.clone(),
        NativeValue::Reference(ref reference) => reference_to_string(reference),
    })
}

fn reference_to_string(reference: &Reference) -> String {
    if let Some(text) = reference.as_rust_string() {
        return text;
    }
    match *reference {
        Reference::Null => String::from("null"),
        Reference::BaseTypeArray(ref array) => match *array.borrow().storage() {
            // `print(char[])` writes the characters themselves
            Storage::Chars(ref units) => String::from_utf16_lossy(units),
            _ => identity_string(reference),
        },
        Reference::ClassObject(ref class_object) => {
            let class = class_object.represents();
            let name = class.symref.sig.java_name();
            if class.is_interface() {
                format!("interface {}", name)
            } else if class.superclass.is_none() && class.name() != "java/lang/Object"
                    && !class.is_array() {
                name
            } else {
                format!("class {}", name)
            }
        },
        _ => identity_string(reference),
    }
}

fn identity_string(reference: &Reference) -> String {
    let name = reference.get_class()
        .map_or_else(|| String::from("null"), |class| class.symref.sig.java_name());
    format!("{}@{:x}", name, reference.identity_hash())
}

/// Formats a `float` the way `Float.toString` does.
pub fn format_float(value: f32) -> String {
    java_decimal(value as f64, &format!("{:e}", value))
}

/// Formats a `double` the way `Double.toString` does.
pub fn format_double(value: f64) -> String {
    java_decimal(value, &format!("{:e}", value))
}

/// Lays out the shortest round-trip digits in `scientific` (as produced by `{:e}`): plain
/// decimal notation for magnitudes in `[10^-3, 10^7)`, computerized scientific notation
/// otherwise, always with at least one digit after the point.
fn java_decimal(value: f64, scientific: &str) -> String {
    if value.is_nan() {
        return String::from("NaN");
    }
    if value.is_infinite() {
        return String::from(if value > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if value == 0.0 {
        return String::from(if value.is_sign_negative() { "-0.0" } else { "0.0" });
    }
    let (sign, unsigned) = match scientific.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", scientific),
    };
    let (mantissa, exponent) = match unsigned.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (unsigned, 0),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    if (-3..7).contains(&exponent) {
        if exponent < 0 {
            let zeros = "0".repeat((-exponent - 1) as usize);
            format!("{}0.{}{}", sign, zeros, digits)
        } else {
            let point = exponent as usize + 1;
            if digits.len() > point {
                format!("{}{}.{}", sign, &digits[..point], &digits[point..])
            } else {
                let zeros = "0".repeat(point - digits.len());
                format!("{}{}{}.0", sign, digits, zeros)
            }
        }
    } else {
        let (first, rest) = digits.split_at(1);
        let rest = if rest.is_empty() { "0" } else { rest };
        format!("{}{}.{}E{}", sign, first, rest, exponent)
    }
}

fn array_store_mismatch(src: &Reference, dest: &Reference) -> Error {
    let name = |reference: &Reference| reference.get_class()
        .map_or_else(String::new, |class| class.symref.sig.java_name());
    Error::ArrayStore { from: name(src), to: name(dest) }
}

/// Checks `[position, position + length)` against an array of `array_length` elements.
fn check_range(position: i32, length: i32, array_length: usize) -> Result<usize> {
    let end = position as i64 + length as i64;
    if position < 0 {
        Err(Error::ArrayIndexOutOfBounds { index: position, length: array_length })
    } else if end > array_length as i64 {
        Err(Error::ArrayIndexOutOfBounds {
            index: end.min(i32::MAX as i64) as i32,
            length: array_length,
        })
    } else {
        Ok(position as usize)
    }
}

macro_rules! copy_storage {
    ($src: expr, $dest: expr, $from: expr, $to: expr, $length: expr,
     $($variant: ident),*) => {
        match ($src, $dest) {
            $(
                (Storage::$variant(ref src), &mut Storage::$variant(ref mut dest)) => {
                    dest[$to..$to + $length].copy_from_slice(&src[$from..$from + $length]);
                    true
                },
            )*
            _ => false,
        }
    };
}

/// Copies `length` elements as `System.arraycopy` does. Overlapping ranges of one array behave
/// as if the source range were first copied to a temporary array. Reference elements that are
/// not assignable to the destination's component type stop the copy at that element.
fn array_copy(src: Reference, src_pos: i32, dest: Reference, dest_pos: i32, length: i32)
        -> Result<()> {
    let src = src.non_null()?;
    let dest = dest.non_null()?;
    match (&src, &dest) {
        (&Reference::BaseTypeArray(ref src_array), &Reference::BaseTypeArray(ref dest_array)) => {
            // snapshot the source first: `src` and `dest` may be the same array
            let source = src_array.borrow().storage().clone();
            if source.array_type() != dest_array.borrow().array_type() {
                return Err(array_store_mismatch(&src, &dest));
            }
            if length < 0 {
                return Err(Error::ArrayIndexOutOfBounds { index: length, length: source.len() });
            }
            let from = check_range(src_pos, length, source.len())?;
            let to = check_range(dest_pos, length, dest_array.borrow().len())?;
            let length = length as usize;
            let copied = copy_storage!(source, dest_array.borrow_mut().storage_mut(), from, to,
                                       length, Booleans, Bytes, Chars, Shorts, Ints, Longs,
                                       Floats, Doubles);
            if copied { Ok(()) } else { Err(array_store_mismatch(&src, &dest)) }
        },
        (&Reference::Array(ref src_array), &Reference::Array(ref dest_array)) => {
            let source = src_array.borrow().elements().to_vec();
            if length < 0 {
                return Err(Error::ArrayIndexOutOfBounds { index: length, length: source.len() });
            }
            let dest_class = dest_array.borrow().get_class();
            let from = check_range(src_pos, length, source.len())?;
            let to = check_range(dest_pos, length, dest_array.borrow().len())?;
            let component = dest_class.component_class().cloned();
            for (offset, element) in source[from..from + length as usize].iter().enumerate() {
                // an element may be the destination array itself, so its class is read before
                // the destination is borrowed for writing
                let element_class = element.get_class();
                let assignable = match (&element_class, &component) {
                    (&Some(ref class), &Some(ref component)) => class.is_assignable_to(component),
                    _ => true,
                };
                if !assignable {
                    return Err(Error::ArrayStore {
                        from: element_class
                            .map_or_else(String::new, |class| class.symref.sig.java_name()),
                        to: dest_class.symref.sig.java_name(),
                    });
                }
                dest_array.borrow_mut().elements_mut()[to + offset] = element.clone();
            }
            Ok(())
        },
        _ => Err(array_store_mismatch(&src, &dest)),
    }
}

/// Records `class.method` for every frame alive at the call, innermost first, in the
/// throwable's `stackTrace` field when it declares one.
fn fill_in_stack_trace(env: &mut Env, throwable: &Reference, caller: Option<Location>)
        -> Result<()> {
    let object = match *throwable {
        Reference::Object(ref object) => object.clone(),
        _ => return Ok(()),
    };
    if !object.borrow().has_field("stackTrace") {
        return Ok(());
    }
    let locations = caller.into_iter()
        .chain(env.callers.iter().rev().map(|frame| frame.location()));
    let mut elements = vec![];
    for location in locations {
        let text = format!("{}.{}", location.class.replace('/', "."), location.method);
        elements.push(env.loader.new_string(&text)?);
    }
    debug!("captured {} stack trace elements", elements.len());
    let string_array = sig::Class::Array(Box::new(sig::Type::Reference(
        sig::Class::new("java/lang/String"))));
    let class = env.loader.load_class(&string_array)?;
    let trace = Reference::new_array(Array::from_elements(class, elements));
    object.borrow_mut().put_field("stackTrace", Value::Reference(trace))?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vm::class_loader::ClassLoader;
    use crate::vm::heap::{ArrayType, BaseTypeArray, Object};

    #[test]
    fn test_select_fill_in_stack_trace() {
        use crate::vm::class::{method_access_flags, ClassBuilder};

        let native = method_access_flags::ACC_PUBLIC | method_access_flags::ACC_NATIVE;
        let sigs = vec![
            sig::Method::new("fillInStackTrace", "()Ljava/lang/Throwable;").unwrap(),
            sig::Method::new("fillInStackTrace", "(I)Ljava/lang/Throwable;").unwrap(),
            sig::Method::new("fillInStackTrace", "(J)V").unwrap(),
        ];
        let mut throwable = ClassBuilder::new(THROWABLE);
        let mut widget = ClassBuilder::new("Widget");
        for method_sig in &sigs {
            throwable = throwable.method(method_sig.clone(), native, None);
            widget = widget.method(method_sig.clone(), native, None);
        }
        let throwable = Rc::new(throwable.build());
        let widget = Rc::new(widget.build());
        let selected = |class: &Rc<Class>, method_sig: &sig::Method| {
            Hook::select(class, class.get_method(method_sig).unwrap())
        };
        assert_eq!(selected(&throwable, &sigs[0]), Some(Hook::FillInStackTrace));
        assert_eq!(selected(&throwable, &sigs[1]), Some(Hook::FillInStackTrace));
        assert_eq!(selected(&throwable, &sigs[2]), None);
        for method_sig in &sigs {
            assert_eq!(selected(&widget, method_sig), None);
        }
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.5), "1.5");
        assert_eq!(format_float(100.0), "100.0");
        assert_eq!(format_float(0.001), "0.001");
        assert_eq!(format_float(1.0e7), "1.0E7");
        assert_eq!(format_float(-2.5e-4), "-2.5E-4");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(-0.0), "-0.0");
        assert_eq!(format_float(f32::NAN), "NaN");
        assert_eq!(format_float(f32::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_format_double() {
        assert_eq!(format_double(3.0), "3.0");
        assert_eq!(format_double(12345678.9), "1.23456789E7");
        assert_eq!(format_double(1234567.0), "1234567.0");
        assert_eq!(format_double(0.25), "0.25");
        assert_eq!(format_double(1.0e-10), "1.0E-10");
    }

    #[test]
    fn test_to_java_string() {
        let mut loader = ClassLoader::new().unwrap();
        assert_eq!(to_java_string(&NativeValue::Boolean(true)).unwrap(), "true");
        assert_eq!(to_java_string(&NativeValue::Char(0x41)).unwrap(), "A");
        assert_eq!(to_java_string(&NativeValue::Long(-7)).unwrap(), "-7");
        let hi = loader.intern_string("hi").unwrap();
        assert_eq!(to_java_string(&NativeValue::Reference(hi)).unwrap(), "hi");
        assert_eq!(to_java_string(&NativeValue::Reference(Reference::Null)).unwrap(), "null");

        let object_class = loader.find_class("java/lang/Object").unwrap();
        let object = Reference::new_object(Object::new(object_class.clone()));
        let text = to_java_string(&NativeValue::Reference(object.clone())).unwrap();
        assert_eq!(text, format!("java.lang.Object@{:x}", object.identity_hash()));
        let class_object = loader.class_object(&object_class).unwrap();
        assert_eq!(to_java_string(&NativeValue::Reference(class_object)).unwrap(),
                   "class java.lang.Object");
    }

    fn int_array(loader: &mut ClassLoader, values: Vec<i32>) -> Reference {
        let class = loader.primitive_array_class(ArrayType::Int).unwrap();
        Reference::new_base_type_array(BaseTypeArray::from_storage(class, Storage::Ints(values)))
    }

    fn ints(reference: &Reference) -> Vec<i32> {
        match *reference {
            Reference::BaseTypeArray(ref array) => match *array.borrow().storage() {
                Storage::Ints(ref values) => values.clone(),
                ref other => panic!("unexpected storage {:?}", other),
            },
            ref other => panic!("unexpected reference {:?}", other),
        }
    }

    #[test]
    fn test_array_copy_overlapping() {
        let mut loader = ClassLoader::new().unwrap();
        let array = int_array(&mut loader, vec![1, 2, 3, 4, 5]);
        array_copy(array.clone(), 0, array.clone(), 1, 4).unwrap();
        assert_eq!(ints(&array), vec![1, 1, 2, 3, 4]);
    }

    #[test]
    fn test_array_copy_failures() {
        let mut loader = ClassLoader::new().unwrap();
        let src = int_array(&mut loader, vec![1, 2, 3]);
        let dest = int_array(&mut loader, vec![0; 2]);
        match array_copy(src.clone(), 1, dest.clone(), 0, 3) {
            Err(Error::ArrayIndexOutOfBounds { index: 4, length: 3 }) => {},
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(ints(&dest), vec![0, 0]);

        let longs_class = loader.primitive_array_class(ArrayType::Long).unwrap();
        let longs = Reference::new_base_type_array(
            BaseTypeArray::new(longs_class, ArrayType::Long, 3).unwrap());
        match array_copy(src.clone(), 0, longs, 0, 1) {
            Err(Error::ArrayStore { .. }) => {},
            other => panic!("unexpected result {:?}", other),
        }
        match array_copy(Reference::Null, 0, dest, 0, 1) {
            Err(Error::NullPointer) => {},
            other => panic!("unexpected result {:?}", other),
        }
    }
}
