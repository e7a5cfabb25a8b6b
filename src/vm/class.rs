//! Internal JVM representations of classes and methods.
//!
//! These are supplied by the class-loading collaborator fully resolved, and are read-only to the
//! interpreter apart from static field values and the initialization flag.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::vm::constant_pool::{ConstantPoolIndex, RuntimeConstantPool};
use crate::vm::{sig, symref};
use crate::vm::value::Value;

pub mod class_access_flags {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_FINAL: u16 = 0x0010;
    pub const ACC_SUPER: u16 = 0x0020;
    pub const ACC_INTERFACE: u16 = 0x0200;
    pub const ACC_ABSTRACT: u16 = 0x0400;
    pub const ACC_SYNTHETIC: u16 = 0x1000;
}

pub mod field_access_flags {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_PRIVATE: u16 = 0x0002;
    pub const ACC_PROTECTED: u16 = 0x0004;
    pub const ACC_STATIC: u16 = 0x0008;
    pub const ACC_FINAL: u16 = 0x0010;
}

pub mod method_access_flags {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_PRIVATE: u16 = 0x0002;
    pub const ACC_PROTECTED: u16 = 0x0004;
    pub const ACC_STATIC: u16 = 0x0008;
    pub const ACC_FINAL: u16 = 0x0010;
    pub const ACC_SYNCHRONIZED: u16 = 0x0020;
    pub const ACC_NATIVE: u16 = 0x0100;
    pub const ACC_ABSTRACT: u16 = 0x0400;
}

/// The interfaces every array class implements.
const ARRAY_INTERFACES: [&str; 2] = ["java/lang/Cloneable", "java/io/Serializable"];

/// A JVM representation of a class that has been loaded.
#[derive(Debug)]
pub struct Class {
    /// A symbolic reference to the class, comprised of its name (if a scalar type) or element type
    /// (if an array class).
    pub symref: symref::Class,
    /// The access flags for the class.
    pub access_flags: u16,
    /// The superclass extended by the class. If the class is `java/lang/Object` or a primitive
    /// pseudo-class, this is `None`.
    pub superclass: Option<Rc<Class>>,
    /// The direct superinterfaces.
    interfaces: Vec<Rc<Class>>,
    /// For array classes, the class of the component type (a primitive pseudo-class for arrays
    /// of primitives).
    component_class: Option<Rc<Class>>,
    /// The runtime constant pool of the class.
    constant_pool: RuntimeConstantPool,
    /// The fields declared by this class mapped to their access flags, both `static` and not.
    fields: HashMap<sig::Field, u16>,
    /// The methods declared by this class.
    methods: HashMap<sig::Method, Rc<Method>>,
    /// The values of the static fields declared by this class, keyed by name. They hold their
    /// default values from preparation until `<clinit>` or the program assigns them.
    field_values: RefCell<HashMap<String, Value>>,
    /// Whether initialization (running `<clinit>`) has begun. Set before the initializer runs so
    /// that recursive requests from inside it see the class as initialized.
    initialized: Cell<bool>,
}

impl Class {
    /// Create a new array class for a given component type.
    pub fn new_array(object_class: Rc<Class>, component_class: Rc<Class>,
                     component_type: sig::Type) -> Self {
        let access_flags = (component_class.access_flags & class_access_flags::ACC_PUBLIC)
            | class_access_flags::ACC_FINAL | class_access_flags::ACC_ABSTRACT
            | class_access_flags::ACC_SYNTHETIC;
        Class {
            symref: symref::Class { sig: sig::Class::Array(Box::new(component_type)) },
            access_flags: access_flags,
            superclass: Some(object_class),
            interfaces: vec![],
            component_class: Some(component_class),
            constant_pool: RuntimeConstantPool::new(),
            fields: HashMap::new(),
            methods: HashMap::new(),
            field_values: RefCell::new(HashMap::new()),
            initialized: Cell::new(true),
        }
    }

    /// Create the pseudo-class standing for a primitive type, such as `int`.
    pub fn new_primitive(ty: &sig::Type) -> Self {
        Class {
            symref: symref::Class { sig: sig::Class::Scalar(ty.java_name()) },
            access_flags: class_access_flags::ACC_PUBLIC | class_access_flags::ACC_FINAL
                | class_access_flags::ACC_ABSTRACT,
            superclass: None,
            interfaces: vec![],
            component_class: None,
            constant_pool: RuntimeConstantPool::new(),
            fields: HashMap::new(),
            methods: HashMap::new(),
            field_values: RefCell::new(HashMap::new()),
            initialized: Cell::new(true),
        }
    }

    /// The binary name, e.g. `java/lang/String` or `[I`.
    pub fn name(&self) -> String {
        self.symref.sig.to_string()
    }

    pub fn get_constant_pool(&self) -> &RuntimeConstantPool {
        &self.constant_pool
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags & class_access_flags::ACC_INTERFACE != 0
    }

    pub fn is_array(&self) -> bool {
        match self.symref.sig {
            sig::Class::Array(_) => true,
            sig::Class::Scalar(_) => false,
        }
    }

    pub fn component_class(&self) -> Option<&Rc<Class>> {
        self.component_class.as_ref()
    }

    pub fn interfaces(&self) -> &[Rc<Class>] {
        &self.interfaces
    }

    /// Looks up a method declared directly by this class.
    pub fn get_method(&self, sig: &sig::Method) -> Option<&Rc<Method>> {
        self.methods.get(sig)
    }

    /// Implements lookup of a method's signature starting at the given class. If no method with
    /// the given signature is found, then recursively searches the superclasses, and finally the
    /// superinterfaces (for default methods). Returns the declaring class along with the method.
    pub fn find_method(class: &Rc<Class>, method_sig: &sig::Method)
            -> Option<(Rc<Class>, Rc<Method>)> {
        Self::find_in_superclasses(class, method_sig)
            .or_else(|| Self::find_in_interfaces(class, method_sig))
    }

    fn find_in_superclasses(class: &Rc<Class>, method_sig: &sig::Method)
            -> Option<(Rc<Class>, Rc<Method>)> {
        match class.methods.get(method_sig) {
            Some(method) => Some((class.clone(), method.clone())),
            None => class.superclass.as_ref()
                .and_then(|superclass| Self::find_in_superclasses(superclass, method_sig)),
        }
    }

    fn find_in_interfaces(class: &Rc<Class>, method_sig: &sig::Method)
            -> Option<(Rc<Class>, Rc<Method>)> {
        for interface in &class.interfaces {
            if let Some(found) = Self::find_method(interface, method_sig) {
                return Some(found);
            }
        }
        class.superclass.as_ref()
            .and_then(|superclass| Self::find_in_interfaces(superclass, method_sig))
    }

    /// Implements dynamic dispatch of a resolved method according to the lookup procedure
    /// specified for the `invokevirtual` instruction: the first override found walking up from
    /// `class`, skipping private and static methods, and package-private methods from another
    /// package.
    pub fn dispatch_method(class: &Rc<Class>, resolved_method: &Method)
            -> Option<(Rc<Class>, Rc<Method>)> {
        let own = class.methods.get(&resolved_method.symref.sig).and_then(|our_method| {
            if our_method.is_private() || our_method.is_static() {
                None
            } else if resolved_method.is_package_private() {
                let package = resolved_method.symref.class.sig.get_package();
                if class.symref.sig.get_package() == package {
                    Some(our_method)
                } else {
                    None
                }
            } else {
                Some(our_method)
            }
        });
        match own {
            Some(method) => Some((class.clone(), method.clone())),
            None => class.superclass.as_ref()
                .and_then(|superclass| Self::dispatch_method(superclass, resolved_method)),
        }
    }

    /// Returns true if this class is a descendant (direct or indirect subclass) of another class.
    pub fn is_descendant(&self, other: &Class) -> bool {
        if self.symref.sig == other.symref.sig {
            true
        } else {
            self.superclass.as_ref().map_or(false, |superclass| superclass.is_descendant(other))
        }
    }

    /// Returns true if this class or any of its superclasses implements the given interface.
    pub fn implements(&self, interface: &Class) -> bool {
        self.interfaces.iter().any(|own| {
            own.symref.sig == interface.symref.sig || own.implements(interface)
        }) || self.superclass.as_ref().map_or(false, |superclass| superclass.implements(interface))
    }

    /// Whether a reference to an instance of this class may be stored in a variable of type
    /// `other` (the rules of `checkcast` and `instanceof`).
    pub fn is_assignable_to(&self, other: &Class) -> bool {
        if self.symref.sig == other.symref.sig {
            return true;
        }
        if let (Some(ours), Some(theirs)) = (&self.component_class, &other.component_class) {
            // both are arrays; primitive components only match themselves
            return ours.superclass.is_some() && ours.is_assignable_to(theirs);
        }
        if self.is_array() && ARRAY_INTERFACES.contains(&other.name().as_str()) {
            return true;
        }
        if other.is_interface() {
            self.implements(other)
        } else {
            self.is_descendant(other)
        }
    }

    /// Returns a list of the signatures of the fields of an instance of this class, including
    /// inherited ones.
    pub fn collect_instance_fields(&self) -> Vec<sig::Field> {
        let mut instance_fields = self.superclass.as_ref()
            .map(|superclass| superclass.collect_instance_fields())
            .unwrap_or_default();
        for (sig, access_flags) in &self.fields {
            if access_flags & field_access_flags::ACC_STATIC == 0 {
                instance_fields.push(sig.clone());
            }
        }
        instance_fields
    }

    /// Finds the class that declares the static field with the given name, searching this class,
    /// its superinterfaces, then its superclasses.
    pub fn resolve_static_field(class: &Rc<Class>, name: &str) -> Option<Rc<Class>> {
        if class.field_values.borrow().contains_key(name) {
            return Some(class.clone());
        }
        for interface in &class.interfaces {
            if let Some(found) = Self::resolve_static_field(interface, name) {
                return Some(found);
            }
        }
        class.superclass.as_ref()
            .and_then(|superclass| Self::resolve_static_field(superclass, name))
    }

    /// Reads a static field declared by this class.
    pub fn get_static(&self, name: &str) -> Option<Value> {
        self.field_values.borrow().get(name).cloned()
    }

    /// Writes a static field declared by this class. Returns false if no such field exists.
    pub fn put_static(&self, name: &str, value: Value) -> bool {
        match self.field_values.borrow_mut().get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            },
            None => false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    pub fn mark_initialized(&self) {
        self.initialized.set(true);
    }
}

#[derive(Debug)]
/// A JVM representation of a method in a loaded class.
pub struct Method {
    /// The method's signature, comprised of its name and argument and return types.
    pub symref: symref::Method,
    /// The method's access flags.
    pub access_flags: u16,
    /// An optional MethodCode structure. Not present for abstract and native methods.
    pub method_code: Option<MethodCode>,
}

impl Method {
    pub fn name(&self) -> &str {
        &self.symref.sig.name
    }

    pub fn is_static(&self) -> bool {
        self.access_flags & method_access_flags::ACC_STATIC != 0
    }

    pub fn is_native(&self) -> bool {
        self.access_flags & method_access_flags::ACC_NATIVE != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags & method_access_flags::ACC_ABSTRACT != 0
    }

    pub fn is_private(&self) -> bool {
        self.access_flags & method_access_flags::ACC_PRIVATE != 0
    }

    pub fn is_package_private(&self) -> bool {
        self.access_flags & (method_access_flags::ACC_PUBLIC | method_access_flags::ACC_PROTECTED
                             | method_access_flags::ACC_PRIVATE) == 0
    }

    /// The number of local variable slots taken by the arguments, including `this`.
    pub fn arg_slots(&self) -> usize {
        let this_slot = if self.is_static() { 0 } else { 1 };
        self.symref.sig.arg_slots() + this_slot
    }
}

#[derive(Debug)]
/// Code associated with a JVM method struct.
pub struct MethodCode {
    /// The maximum depth of the operand stack, in slots.
    pub max_stack: u16,
    /// The number of local variable slots, including those taken by arguments.
    pub max_locals: u16,
    /// The method's bytecode instructions.
    pub code: Vec<u8>,
    /// The method's exception table, used for catching `Throwable`s. Order is significant.
    pub exception_table: Vec<ExceptionTableEntry>,
}

impl MethodCode {
    pub fn new(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        MethodCode {
            max_stack: max_stack,
            max_locals: max_locals,
            code: code,
            exception_table: vec![],
        }
    }

    pub fn with_exception_table(mut self, exception_table: Vec<ExceptionTableEntry>) -> Self {
        self.exception_table = exception_table;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ExceptionTableEntry {
    /// Start of the covered range, inclusive.
    pub start_pc: u16,
    /// End of the covered range, exclusive.
    pub end_pc: u16,
    pub handler_pc: u16,
    /// A class reference in the constant pool, or 0 to catch everything.
    pub catch_type: ConstantPoolIndex,
}

/// Assembles a `Class` the way the class-loading collaborator hands it to the interpreter.
pub struct ClassBuilder {
    sig: sig::Class,
    access_flags: u16,
    superclass: Option<Rc<Class>>,
    interfaces: Vec<Rc<Class>>,
    constant_pool: RuntimeConstantPool,
    fields: HashMap<sig::Field, u16>,
    methods: Vec<(sig::Method, u16, Option<MethodCode>)>,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        ClassBuilder {
            sig: sig::Class::new(name),
            access_flags: class_access_flags::ACC_PUBLIC | class_access_flags::ACC_SUPER,
            superclass: None,
            interfaces: vec![],
            constant_pool: RuntimeConstantPool::new(),
            fields: HashMap::new(),
            methods: vec![],
        }
    }

    pub fn access_flags(mut self, access_flags: u16) -> Self {
        self.access_flags = access_flags;
        self
    }

    pub fn superclass(mut self, superclass: Rc<Class>) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn interface(mut self, interface: Rc<Class>) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn constant_pool(mut self, constant_pool: RuntimeConstantPool) -> Self {
        self.constant_pool = constant_pool;
        self
    }

    pub fn field(mut self, name: &str, ty: sig::Type, access_flags: u16) -> Self {
        self.fields.insert(sig::Field { name: String::from(name), ty: ty }, access_flags);
        self
    }

    /// Adds a method. `code` is `None` for native and abstract methods.
    pub fn method(mut self, sig: sig::Method, access_flags: u16, code: Option<MethodCode>)
            -> Self {
        self.methods.push((sig, access_flags, code));
        self
    }

    pub fn build(self) -> Class {
        let class_symref = symref::Class { sig: self.sig };
        let mut field_values = HashMap::new();
        for (sig, access_flags) in &self.fields {
            if access_flags & field_access_flags::ACC_STATIC != 0 {
                field_values.insert(sig.name.clone(), sig.ty.default_value());
            }
        }
        let mut methods = HashMap::new();
        for (sig, access_flags, method_code) in self.methods {
            let method = Method {
                symref: symref::Method { class: class_symref.clone(), sig: sig.clone() },
                access_flags: access_flags,
                method_code: method_code,
            };
            methods.insert(sig, Rc::new(method));
        }
        Class {
            symref: class_symref,
            access_flags: self.access_flags,
            superclass: self.superclass,
            interfaces: self.interfaces,
            component_class: None,
            constant_pool: self.constant_pool,
            fields: self.fields,
            methods: methods,
            field_values: RefCell::new(field_values),
            initialized: Cell::new(false),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vm::sig::Type;

    fn object() -> Rc<Class> {
        Rc::new(ClassBuilder::new("java/lang/Object").build())
    }

    #[test]
    fn test_find_and_dispatch() {
        let object = object();
        let to_string = sig::Method::new("toString", "()Ljava/lang/String;").unwrap();
        let code = || Some(MethodCode::new(1, 1, vec![0x01, 0xb0]));
        let base = Rc::new(ClassBuilder::new("a/Base").superclass(object.clone())
            .method(to_string.clone(), method_access_flags::ACC_PUBLIC, code())
            .build());
        let derived = Rc::new(ClassBuilder::new("a/Derived").superclass(base.clone())
            .method(to_string.clone(), method_access_flags::ACC_PUBLIC, code())
            .build());
        let leaf = Rc::new(ClassBuilder::new("b/Leaf").superclass(derived.clone()).build());

        let (declaring, resolved) = Class::find_method(&leaf, &to_string).unwrap();
        assert_eq!(declaring.name(), "a/Derived");
        let (declaring, _) = Class::dispatch_method(&leaf, &base.get_method(&to_string).unwrap())
            .unwrap();
        assert_eq!(declaring.name(), "a/Derived");
        assert_eq!(resolved.arg_slots(), 1);
    }

    #[test]
    fn test_assignability() {
        let object = object();
        let runnable = Rc::new(ClassBuilder::new("java/lang/Runnable")
            .access_flags(class_access_flags::ACC_INTERFACE | class_access_flags::ACC_ABSTRACT)
            .build());
        let task = Rc::new(ClassBuilder::new("Task").superclass(object.clone())
            .interface(runnable.clone()).build());
        let sub = Rc::new(ClassBuilder::new("SubTask").superclass(task.clone()).build());
        assert!(sub.is_assignable_to(&task));
        assert!(sub.is_assignable_to(&runnable));
        assert!(sub.is_assignable_to(&object));
        assert!(!task.is_assignable_to(&sub));

        let int = Rc::new(Class::new_primitive(&Type::Int));
        let ints = Class::new_array(object.clone(), int.clone(), Type::Int);
        let subs = Class::new_array(object.clone(), sub.clone(), Type::new("LSubTask;").unwrap());
        let tasks = Class::new_array(object.clone(), task.clone(), Type::new("LTask;").unwrap());
        let objects = Class::new_array(object.clone(), object.clone(),
                                       Type::new("Ljava/lang/Object;").unwrap());
        assert!(subs.is_assignable_to(&tasks));
        assert!(!tasks.is_assignable_to(&subs));
        assert!(ints.is_assignable_to(&object));
        assert!(!ints.is_assignable_to(&objects));

        let interface = |name: &str| Rc::new(ClassBuilder::new(name)
            .access_flags(class_access_flags::ACC_INTERFACE | class_access_flags::ACC_ABSTRACT)
            .build());
        let cloneable = interface("java/lang/Cloneable");
        let serializable = interface("java/io/Serializable");
        for array in &[&ints, &subs, &objects] {
            assert!(array.is_assignable_to(&cloneable));
            assert!(array.is_assignable_to(&serializable));
        }
        assert!(!ints.is_assignable_to(&runnable));
        assert!(!sub.is_assignable_to(&cloneable));
    }

    #[test]
    fn test_fields() {
        let object = object();
        let base = Rc::new(ClassBuilder::new("Base").superclass(object)
            .field("count", Type::Int, field_access_flags::ACC_STATIC)
            .field("x", Type::Long, field_access_flags::ACC_PRIVATE)
            .build());
        let derived = Rc::new(ClassBuilder::new("Derived").superclass(base.clone())
            .field("y", Type::Double, 0)
            .build());
        let mut names: Vec<String> = derived.collect_instance_fields().into_iter()
            .map(|field| field.name).collect();
        names.sort();
        assert_eq!(names, vec!["x", "y"]);

        let declaring = Class::resolve_static_field(&derived, "count").unwrap();
        assert_eq!(declaring.name(), "Base");
        assert!(declaring.put_static("count", Value::Int(3)));
        match base.get_static("count") {
            Some(Value::Int(3)) => (),
            other => panic!("unexpected static value {:?}", other),
        }
        assert!(Class::resolve_static_field(&derived, "missing").is_none());
    }
}
