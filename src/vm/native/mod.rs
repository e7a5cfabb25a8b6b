//! The bridge to methods that have no bytecode body.
//!
//! A native method's arguments arrive in a `LocalVariables` laid out exactly as a bytecode callee
//! would see them. They are converted to `NativeValue`s following the method descriptor, handed
//! to an implementation, and the result (if any) is pushed onto the caller's operand stack; no
//! frame is ever created for the native method itself.
//!
//! Implementations come from two places. A few behaviors that need access to the engine's own
//! state (the console, the call stack, array internals) are _hooks_, selected ahead of everything
//! else. Everything else is looked up in a `NativeRegistry` by owning class, name and descriptor.

mod builtins;
mod console;
mod hooks;

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::vm::class::{Class, Method};
use crate::vm::class_loader::{ClassLoader, PRINT_STREAM};
use crate::vm::error::{Error, Result};
use crate::vm::frame::Location;
use crate::vm::instructions::Env;
use crate::vm::local_variables::LocalVariables;
use crate::vm::operand_stack::OperandStack;
use crate::vm::sig::Type;
use crate::vm::value::Reference;

pub use self::console::{Console, STDERR_FD};
pub use self::hooks::{format_double, format_float, Hook};

/// A value crossing the native boundary, typed by the method descriptor rather than by the
/// operand stack's 32-bit widening.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Reference(Reference),
    /// Host text to be returned as a freshly allocated `java.lang.String`.
    Str(String),
}

macro_rules! accessors {
    ($($name: ident, $variant: ident, $ty: ty, $expected: expr;)*) => {
        $(
            pub fn $name(&self) -> Result<$ty> {
                match *self {
                    NativeValue::$variant(ref v) => Ok(v.clone()),
                    ref other => Err(Error::TypeMismatch {
                        expected: $expected,
                        found: format!("{:?}", other),
                    }),
                }
            }
        )*
    };
}

impl NativeValue {
    accessors! {
        as_boolean, Boolean, bool, "native boolean";
        as_byte, Byte, i8, "native byte";
        as_char, Char, u16, "native char";
        as_short, Short, i16, "native short";
        as_int, Int, i32, "native int";
        as_long, Long, i64, "native long";
        as_float, Float, f32, "native float";
        as_double, Double, f64, "native double";
        as_reference, Reference, Reference, "native reference";
    }

    /// Reads the argument of type `ty` starting at local variable `index`.
    fn from_local(ty: &Type, locals: &LocalVariables, index: usize) -> Result<Self> {
        Ok(match *ty {
            Type::Boolean => NativeValue::Boolean(locals.get_boolean(index)?),
            Type::Byte => NativeValue::Byte(locals.get_byte(index)?),
            Type::Char => NativeValue::Char(locals.get_char(index)?),
            Type::Short => NativeValue::Short(locals.get_short(index)?),
            Type::Int => NativeValue::Int(locals.get_int(index)?),
            Type::Long => NativeValue::Long(locals.get_long(index)?),
            Type::Float => NativeValue::Float(locals.get_float(index)?),
            Type::Double => NativeValue::Double(locals.get_double(index)?),
            Type::Reference(_) => NativeValue::Reference(locals.get_reference(index)?),
        })
    }
}

/// Returns the argument at `index`, or an internal error if the implementation was registered
/// under a descriptor with fewer parameters.
pub fn arg(args: &[NativeValue], index: usize) -> Result<&NativeValue> {
    args.get(index).ok_or(Error::TypeMismatch {
        expected: "native argument",
        found: format!("{} arguments", args.len()),
    })
}

/// The signature of a registered native implementation. Instance methods receive their receiver
/// as the first argument.
pub type NativeMethod =
    Box<dyn Fn(&mut ClassLoader, &[NativeValue]) -> Result<Option<NativeValue>>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NativeKey {
    class: String,
    name: String,
    descriptor: String,
}

/// Statically registered native implementations, keyed by owning class, name and descriptor.
pub struct NativeRegistry {
    methods: HashMap<NativeKey, NativeMethod>,
}

impl NativeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        NativeRegistry { methods: HashMap::new() }
    }

    /// A registry holding the built-in implementations for the bootstrap classes and a few
    /// `java/lang` intrinsics.
    pub fn with_defaults() -> Self {
        let mut registry = NativeRegistry::new();
        builtins::register(&mut registry);
        registry
    }

    /// Adds (or replaces) the implementation of `class.name descriptor`.
    pub fn register<F>(&mut self, class: &str, name: &str, descriptor: &str, method: F)
            where F: Fn(&mut ClassLoader, &[NativeValue]) -> Result<Option<NativeValue>> + 'static {
        let key = NativeKey {
            class: String::from(class),
            name: String::from(name),
            descriptor: String::from(descriptor),
        };
        self.methods.insert(key, Box::new(method));
    }

    pub fn lookup(&self, class: &str, name: &str, descriptor: &str) -> Option<&NativeMethod> {
        let key = NativeKey {
            class: String::from(class),
            name: String::from(name),
            descriptor: String::from(descriptor),
        };
        self.methods.get(&key)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl Default for NativeRegistry {
    fn default() -> Self {
        NativeRegistry::with_defaults()
    }
}

impl fmt::Debug for NativeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NativeRegistry({} methods)", self.methods.len())
    }
}

/// Returns true if every method of the class goes through the bridge, whether or not it is
/// declared `native`.
pub fn is_hooked(class: &Class) -> bool {
    class.name() == PRINT_STREAM
}

/// Runs a native (or hooked) method whose marshalled arguments are in `locals`, pushing its
/// result onto the caller's `stack`. `caller` is the location of the invoking frame, if any.
pub fn invoke(env: &mut Env, class: &Rc<Class>, method: &Method, locals: &LocalVariables,
              stack: &mut OperandStack, caller: Option<Location>) -> Result<()> {
    let args = marshal_arguments(method, locals)?;
    let result = match Hook::select(class, method) {
        Some(hook) => {
            debug!("selected {:?} hook for {}.{}", hook, class.name(), method.symref.sig);
            hook.run(env, &args, caller)?
        },
        None => {
            let descriptor = method.symref.sig.descriptor();
            let implementation = env.natives.lookup(&class.name(), method.name(), &descriptor)
                .ok_or_else(|| Error::NativeNotFound {
                    class: class.name(),
                    name: String::from(method.name()),
                    descriptor: descriptor.clone(),
                })?;
            implementation(env.loader, &args)?
        },
    };
    push_result(env.loader, &method.symref.sig.return_ty, result, stack)
}

/// Converts the local variables to arguments in descriptor order. A `long` or `double` argument
/// takes two local variable indices.
fn marshal_arguments(method: &Method, locals: &LocalVariables) -> Result<Vec<NativeValue>> {
    let mut args = vec![];
    let mut index = 0;
    if !method.is_static() {
        args.push(NativeValue::Reference(locals.get_reference(0)?));
        index = 1;
    }
    for ty in &method.symref.sig.params {
        args.push(NativeValue::from_local(ty, locals, index)?);
        index += ty.category();
    }
    Ok(args)
}

fn push_result(loader: &mut ClassLoader, return_ty: &Option<Type>, result: Option<NativeValue>,
               stack: &mut OperandStack) -> Result<()> {
    let value = match (return_ty, result) {
        (&None, _) => return Ok(()),
        (&Some(_), Some(value)) => value,
        (&Some(ref ty), None) => return Err(Error::TypeMismatch {
            expected: "native result",
            found: format!("no value for return type {}", ty),
        }),
    };
    match value {
        NativeValue::Boolean(v) => stack.push_boolean(v),
        NativeValue::Byte(v) => stack.push_byte(v),
        NativeValue::Char(v) => stack.push_char(v),
        NativeValue::Short(v) => stack.push_short(v),
        NativeValue::Int(v) => stack.push_int(v),
        NativeValue::Long(v) => stack.push_long(v),
        NativeValue::Float(v) => stack.push_float(v),
        NativeValue::Double(v) => stack.push_double(v),
        NativeValue::Reference(v) => stack.push_reference(v),
        NativeValue::Str(text) => {
            let string = loader.new_string(&text)?;
            stack.push_reference(string)
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vm::class::{method_access_flags, ClassBuilder};
    use crate::vm::sig;
    use crate::vm::value::Value;

    const NATIVE_STATIC: u16 = method_access_flags::ACC_PUBLIC | method_access_flags::ACC_NATIVE
        | method_access_flags::ACC_STATIC;

    fn native_class(loader: &mut ClassLoader, name: &str, descriptor: &str) -> Rc<Class> {
        let object = loader.find_class("java/lang/Object").unwrap();
        loader.define(ClassBuilder::new("Natives")
            .superclass(object)
            .method(sig::Method::new(name, descriptor).unwrap(), NATIVE_STATIC, None)
            .build())
    }

    fn call(natives: &NativeRegistry, loader: &mut ClassLoader, class: &Rc<Class>, name: &str,
            descriptor: &str, args: Vec<Value>) -> Result<OperandStack> {
        let method = class.get_method(&sig::Method::new(name, descriptor).unwrap())
            .unwrap().clone();
        let locals = LocalVariables::with_arguments(method.arg_slots(), args).unwrap();
        let mut console = Console::new(Box::new(Vec::new()), Box::new(Vec::new()));
        let mut stack = OperandStack::new(2);
        let mut env = Env {
            loader: loader,
            natives: natives,
            console: &mut console,
            callers: &[],
        };
        invoke(&mut env, class, &method, &locals, &mut stack, None)?;
        Ok(stack)
    }

    #[test]
    fn test_marshals_wide_arguments_by_descriptor() {
        let mut loader = ClassLoader::new().unwrap();
        let class = native_class(&mut loader, "mix", "(JIDZ)J");
        let mut natives = NativeRegistry::new();
        natives.register("Natives", "mix", "(JIDZ)J", |_, args| {
            let long = arg(args, 0)?.as_long()?;
            let int = arg(args, 1)?.as_int()?;
            let double = arg(args, 2)?.as_double()?;
            let flag = arg(args, 3)?.as_boolean()?;
            Ok(Some(NativeValue::Long(long + int as i64 + double as i64 + flag as i64)))
        });
        let args = vec![Value::Long(100), Value::Int(20), Value::Double(3.0), Value::Int(1)];
        let mut stack = call(&natives, &mut loader, &class, "mix", "(JIDZ)J", args).unwrap();
        assert_eq!(stack.pop_long().unwrap(), 124);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_string_result_is_wrapped() {
        let mut loader = ClassLoader::new().unwrap();
        let class = native_class(&mut loader, "greeting", "()Ljava/lang/String;");
        let mut natives = NativeRegistry::new();
        natives.register("Natives", "greeting", "()Ljava/lang/String;",
                         |_, _| Ok(Some(NativeValue::Str(String::from("hello")))));
        let mut stack = call(&natives, &mut loader, &class, "greeting", "()Ljava/lang/String;",
                             vec![]).unwrap();
        let string = stack.pop_reference().unwrap();
        assert_eq!(string.as_rust_string().unwrap(), "hello");
    }

    #[test]
    fn test_missing_implementation() {
        let mut loader = ClassLoader::new().unwrap();
        let class = native_class(&mut loader, "absent", "(I)V");
        let natives = NativeRegistry::with_defaults();
        match call(&natives, &mut loader, &class, "absent", "(I)V", vec![Value::Int(1)]) {
            Err(Error::NativeNotFound { class, name, descriptor }) => {
                assert_eq!(class, "Natives");
                assert_eq!(name, "absent");
                assert_eq!(descriptor, "(I)V");
            },
            other => panic!("unexpected result {:?}", other.map(|stack| stack.size())),
        }
    }

    #[test]
    fn test_fill_in_stack_trace_outside_throwable_uses_registry() {
        let mut loader = ClassLoader::new().unwrap();
        let class = native_class(&mut loader, "fillInStackTrace", "(I)I");
        let mut natives = NativeRegistry::new();
        natives.register("Natives", "fillInStackTrace", "(I)I",
                         |_, args| Ok(Some(NativeValue::Int(arg(args, 0)?.as_int()? + 1))));
        let mut stack = call(&natives, &mut loader, &class, "fillInStackTrace", "(I)I",
                             vec![Value::Int(41)]).unwrap();
        assert_eq!(stack.pop_int().unwrap(), 42);
    }

    #[test]
    fn test_builtin_bit_conversions() {
        let mut loader = ClassLoader::new().unwrap();
        let natives = NativeRegistry::with_defaults();
        let float_bits = natives.lookup("java/lang/Float", "floatToRawIntBits", "(F)I").unwrap();
        let result = float_bits(&mut loader, &[NativeValue::Float(1.0)]).unwrap();
        assert_eq!(result, Some(NativeValue::Int(0x3f80_0000)));
        let sqrt = natives.lookup("java/lang/StrictMath", "sqrt", "(D)D").unwrap();
        assert_eq!(sqrt(&mut loader, &[NativeValue::Double(16.0)]).unwrap(),
                   Some(NativeValue::Double(4.0)));
    }
}
