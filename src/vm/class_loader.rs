//! The boundary with the class-loading collaborator: an in-memory registry of resolved classes.
//!
//! Classes arrive fully resolved through `define`. Array classes and primitive pseudo-classes are
//! synthesized on demand, and a handful of `java/lang` and `java/io` classes the engine itself
//! relies on are present from construction.

use std::collections::HashMap;
use std::rc::Rc;

use crate::vm::class::{Class, ClassBuilder, MethodCode, field_access_flags, method_access_flags};
use crate::vm::bytecode::opcode;
use crate::vm::error::{Error, Result};
use crate::vm::heap::{ArrayType, BaseTypeArray, ClassObject, Object, Storage};
use crate::vm::value::{Reference, Value};
use crate::vm::{sig, symref};

pub const OBJECT: &str = "java/lang/Object";
pub const STRING: &str = "java/lang/String";
pub const CLASS: &str = "java/lang/Class";
pub const SYSTEM: &str = "java/lang/System";
pub const PRINT_STREAM: &str = "java/io/PrintStream";
pub const THROWABLE: &str = "java/lang/Throwable";

#[derive(Debug)]
pub struct ClassLoader {
    classes: HashMap<sig::Class, Rc<Class>>,
    primitives: HashMap<sig::Type, Rc<Class>>,
    class_objects: HashMap<sig::Class, Reference>,
    strings: HashMap<String, Reference>,
}

fn reference_type(name: &str) -> sig::Type {
    sig::Type::Reference(sig::Class::new(name))
}

fn method_sig(name: &str, params: Vec<sig::Type>, return_ty: Option<sig::Type>) -> sig::Method {
    sig::Method {
        name: String::from(name),
        params: params,
        return_ty: return_ty,
    }
}

impl ClassLoader {
    /// Creates a loader holding the bootstrap classes.
    pub fn new() -> Result<ClassLoader> {
        let mut loader = ClassLoader {
            classes: HashMap::new(),
            primitives: HashMap::new(),
            class_objects: HashMap::new(),
            strings: HashMap::new(),
        };
        loader.bootstrap()?;
        Ok(loader)
    }

    fn bootstrap(&mut self) -> Result<()> {
        let native = method_access_flags::ACC_PUBLIC | method_access_flags::ACC_NATIVE;
        let static_native = native | method_access_flags::ACC_STATIC;

        let object = self.define(ClassBuilder::new(OBJECT)
            .method(method_sig("<init>", vec![], None), method_access_flags::ACC_PUBLIC,
                    Some(MethodCode::new(0, 1, vec![opcode::RETURN])))
            .method(method_sig("registerNatives", vec![], None),
                    static_native | method_access_flags::ACC_PRIVATE, None)
            .method(method_sig("hashCode", vec![], Some(sig::Type::Int)), native, None)
            .method(method_sig("getClass", vec![], Some(reference_type(CLASS))), native, None)
            .build());

        self.define(ClassBuilder::new(STRING)
            .superclass(object.clone())
            .field("value", reference_type("[C"),
                   field_access_flags::ACC_PRIVATE | field_access_flags::ACC_FINAL)
            .method(method_sig("intern", vec![], Some(reference_type(STRING))), native, None)
            .build());

        self.define(ClassBuilder::new(CLASS)
            .superclass(object.clone())
            .method(method_sig("getComponentType", vec![], Some(reference_type(CLASS))),
                    native, None)
            .build());

        let mut print_stream = ClassBuilder::new(PRINT_STREAM)
            .superclass(object.clone())
            .field("fd", sig::Type::Int, field_access_flags::ACC_PRIVATE)
            .method(method_sig("println", vec![], None), native, None);
        let printable = vec![sig::Type::Boolean, sig::Type::Char, sig::Type::Int, sig::Type::Long,
                             sig::Type::Float, sig::Type::Double, reference_type("[C"),
                             reference_type(STRING), reference_type(OBJECT)];
        for ty in printable {
            print_stream = print_stream
                .method(method_sig("print", vec![ty.clone()], None), native, None)
                .method(method_sig("println", vec![ty], None), native, None);
        }
        let print_stream = self.define(print_stream.build());

        let object_type = reference_type(OBJECT);
        let system = self.define(ClassBuilder::new(SYSTEM)
            .superclass(object)
            .field("out", reference_type(PRINT_STREAM),
                   field_access_flags::ACC_PUBLIC | field_access_flags::ACC_STATIC)
            .field("err", reference_type(PRINT_STREAM),
                   field_access_flags::ACC_PUBLIC | field_access_flags::ACC_STATIC)
            .method(method_sig("registerNatives", vec![], None),
                    static_native | method_access_flags::ACC_PRIVATE, None)
            .method(method_sig("arraycopy", vec![object_type.clone(), sig::Type::Int,
                                                 object_type.clone(), sig::Type::Int,
                                                 sig::Type::Int], None),
                    static_native, None)
            .method(method_sig("identityHashCode", vec![object_type], Some(sig::Type::Int)),
                    static_native, None)
            .method(method_sig("currentTimeMillis", vec![], Some(sig::Type::Long)),
                    static_native, None)
            .method(method_sig("nanoTime", vec![], Some(sig::Type::Long)), static_native, None)
            .build());

        for (name, fd) in &[("out", 1), ("err", 2)] {
            let mut stream = Object::new(print_stream.clone());
            stream.put_field("fd", Value::Int(*fd))?;
            if !system.put_static(name, Value::Reference(Reference::new_object(stream))) {
                return Err(Error::NoSuchField {
                    class: String::from(SYSTEM),
                    name: String::from(*name),
                });
            }
        }
        for class in self.classes.values() {
            class.mark_initialized();
        }
        Ok(())
    }

    /// Registers a class handed over by the collaborator, replacing any class of the same name.
    pub fn define(&mut self, class: Class) -> Rc<Class> {
        debug!("defining class {}", class.name());
        let rc = Rc::new(class);
        self.classes.insert(rc.symref.sig.clone(), rc.clone());
        rc
    }

    /// Looks up a class that has been defined or synthesized, without synthesizing anything.
    pub fn find_class(&self, name: &str) -> Option<Rc<Class>> {
        self.classes.get(&sig::Class::new(name)).cloned()
    }

    pub fn resolve_class(&mut self, symref: &symref::Class) -> Result<Rc<Class>> {
        self.load_class(&symref.sig)
    }

    /// Returns the class with the given signature. Scalar classes must have been defined; array
    /// classes are created the first time they are requested, after loading their component
    /// class so that a missing element class is reported here.
    pub fn load_class(&mut self, sig: &sig::Class) -> Result<Rc<Class>> {
        if let Some(class) = self.classes.get(sig) {
            return Ok(class.clone());
        }
        match *sig {
            sig::Class::Scalar(ref name) => Err(Error::ClassNotFound(name.clone())),
            sig::Class::Array(ref component_type) => {
                let component_class = self.type_class(component_type)?;
                let object_class = self.load_class(&sig::Class::new(OBJECT))?;
                let class = Class::new_array(object_class, component_class,
                                             (**component_type).clone());
                trace!("synthesized array class {}", sig);
                let rc = Rc::new(class);
                self.classes.insert(sig.clone(), rc.clone());
                Ok(rc)
            },
        }
    }

    /// The class standing for a type: a primitive pseudo-class or a loaded reference class.
    pub fn type_class(&mut self, ty: &sig::Type) -> Result<Rc<Class>> {
        match *ty {
            sig::Type::Reference(ref class_sig) => self.load_class(class_sig),
            ref primitive => Ok(self.primitive_class(primitive)),
        }
    }

    fn primitive_class(&mut self, ty: &sig::Type) -> Rc<Class> {
        self.primitives.entry(ty.clone())
            .or_insert_with(|| Rc::new(Class::new_primitive(ty)))
            .clone()
    }

    /// The array class whose elements have the primitive type of the given `newarray` tag.
    pub fn primitive_array_class(&mut self, array_type: ArrayType) -> Result<Rc<Class>> {
        self.load_class(&sig::Class::Array(Box::new(array_type.element_type())))
    }

    /// Returns the canonical `java.lang.Class` instance for a class.
    pub fn class_object(&mut self, class: &Rc<Class>) -> Result<Reference> {
        if let Some(class_object) = self.class_objects.get(&class.symref.sig) {
            return Ok(class_object.clone());
        }
        let component_type = match class.component_class() {
            Some(component_class) => {
                let component_class = component_class.clone();
                Some(self.class_object(&component_class)?)
            },
            None => None,
        };
        let class_class = self.load_class(&sig::Class::new(CLASS))?;
        let class_object = Reference::ClassObject(
            Rc::new(ClassObject::new(class_class, class.clone(), component_type)));
        self.class_objects.insert(class.symref.sig.clone(), class_object.clone());
        Ok(class_object)
    }

    /// Allocates a new `java.lang.String` holding the given text.
    pub fn new_string(&mut self, value: &str) -> Result<Reference> {
        let string_class = self.load_class(&sig::Class::new(STRING))?;
        let chars_class = self.primitive_array_class(ArrayType::Char)?;
        let chars = BaseTypeArray::from_storage(chars_class,
                                                Storage::Chars(value.encode_utf16().collect()));
        let mut string = Object::new(string_class);
        string.put_field("value", Value::Reference(Reference::new_base_type_array(chars)))?;
        Ok(Reference::new_object(string))
    }

    /// Returns the single shared string instance for the given text, as used by `ldc`.
    pub fn intern_string(&mut self, value: &str) -> Result<Reference> {
        if let Some(string) = self.strings.get(value) {
            return Ok(string.clone());
        }
        let string = self.new_string(value)?;
        self.strings.insert(String::from(value), string.clone());
        Ok(string)
    }
}
