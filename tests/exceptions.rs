extern crate rust_jvm_engine;

mod common;

use std::rc::Rc;

use rust_jvm_engine::vm::bytecode::opcode::*;
use rust_jvm_engine::vm::class::{field_access_flags, method_access_flags};
use rust_jvm_engine::vm::sig::Type;
use rust_jvm_engine::vm::{Class, ClassBuilder, ClassLoader, Error, ExceptionTableEntry,
                          Reference, Value};

use common::*;

/// Defines `Throwable`, `RuntimeException` and the two engine-raised exceptions these tests use.
fn define_exceptions(loader: &mut ClassLoader) -> Rc<Class> {
    let object = object_class(loader);
    let throwable = loader.define(ClassBuilder::new("java/lang/Throwable")
        .superclass(object)
        .field("detailMessage", Type::new("Ljava/lang/String;").unwrap(),
               field_access_flags::ACC_PRIVATE)
        .field("stackTrace", Type::new("[Ljava/lang/String;").unwrap(),
               field_access_flags::ACC_PRIVATE)
        .method(method_sig("fillInStackTrace", "()Ljava/lang/Throwable;"),
                method_access_flags::ACC_PUBLIC | method_access_flags::ACC_NATIVE, None)
        .build());
    let runtime = loader.define(ClassBuilder::new("java/lang/RuntimeException")
        .superclass(throwable.clone())
        .build());
    for name in &["java/lang/ArithmeticException", "java/lang/NullPointerException"] {
        loader.define(ClassBuilder::new(name).superclass(runtime.clone()).build());
    }
    throwable
}

fn divide(loader: &mut ClassLoader, handlers: Vec<ExceptionTableEntry>, pool: Pool)
        -> Rc<Class> {
    let method_code = MethodCode::new(2, 1, vec![
        ICONST_1,
        ICONST_0,
        IDIV,
        IRETURN,
        ASTORE_0,
        ICONST_M1,
        IRETURN,
    ]).with_exception_table(handlers);
    define_static(loader, "Main", pool, "divide", "()I", method_code)
}

#[test]
fn test_caught_division_by_zero() {
    let mut loader = ClassLoader::new().unwrap();
    define_exceptions(&mut loader);
    let mut pool = Pool::default();
    let arithmetic = pool.class("java/lang/ArithmeticException");
    let handlers = vec![ExceptionTableEntry {
        start_pc: 0,
        end_pc: 4,
        handler_pc: 4,
        catch_type: arithmetic,
    }];
    let main = divide(&mut loader, handlers, pool);
    assert_eq!(int_result(run_static(&mut loader, &main, "divide", "()I", vec![]).unwrap()), -1);
}

#[test]
fn test_uncaught_exception() {
    let mut loader = ClassLoader::new().unwrap();
    define_exceptions(&mut loader);
    let mut pool = Pool::default();
    // a handler for a class that was never loaded matches nothing
    let missing = pool.class("com/example/MissingException");
    let handlers = vec![ExceptionTableEntry {
        start_pc: 0,
        end_pc: 4,
        handler_pc: 4,
        catch_type: missing,
    }];
    let main = divide(&mut loader, handlers, pool);
    match run_static(&mut loader, &main, "divide", "()I", vec![]) {
        Err(Error::Execution { ref location, ref cause, .. }) => {
            assert_eq!(location.method, "divide");
            assert_eq!(location.pc, 2);
            match **cause {
                Error::UncaughtException { ref class, ref message } => {
                    assert_eq!(class, "java.lang.ArithmeticException");
                    assert_eq!(message.as_ref().map(String::as_str), Some("/ by zero"));
                },
                ref other => panic!("unexpected cause {:?}", other),
            }
        },
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_condition_without_exception_classes() {
    let mut loader = ClassLoader::new().unwrap();
    let main = divide(&mut loader, vec![], Pool::default());
    let (mut thread, _, _) = thread();
    let method = main.get_method(&method_sig("divide", "()I")).unwrap().clone();
    match thread.invoke(&mut loader, &main, &method, vec![]) {
        Err(Error::Execution { opcode, ref location, ref cause, .. }) => {
            assert_eq!(opcode, Some(IDIV));
            assert_eq!(location.pc, 2);
            match **cause {
                Error::ArithmeticDivideByZero => {},
                ref other => panic!("unexpected cause {:?}", other),
            }
        },
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(thread.depth(), 0);
}

#[test]
fn test_athrow_unwinds_to_caller() {
    let mut loader = ClassLoader::new().unwrap();
    define_exceptions(&mut loader);
    let mut thrower_pool = Pool::default();
    let [runtime_hi, runtime_lo] = u16_bytes(thrower_pool.class("java/lang/RuntimeException"));
    define_static(&mut loader, "Thrower", thrower_pool, "boom", "()V",
                  MethodCode::new(1, 0, vec![NEW, runtime_hi, runtime_lo, ATHROW]));

    let mut pool = Pool::default();
    let [boom_hi, boom_lo] = u16_bytes(pool.method("Thrower", "boom", "()V"));
    let throwable = pool.class("java/lang/Throwable");
    let method_code = MethodCode::new(1, 0, vec![
        INVOKESTATIC, boom_hi, boom_lo,
        ICONST_0,
        IRETURN,
        POP,
        ICONST_5,
        IRETURN,
    ]).with_exception_table(vec![ExceptionTableEntry {
        start_pc: 0,
        end_pc: 3,
        handler_pc: 5,
        catch_type: throwable,
    }]);
    let main = define_static(&mut loader, "Main", pool, "run", "()I", method_code);
    assert_eq!(int_result(run_static(&mut loader, &main, "run", "()I", vec![]).unwrap()), 5);
}

#[test]
fn test_catch_all_handler_for_null_pointer() {
    let mut loader = ClassLoader::new().unwrap();
    define_exceptions(&mut loader);
    let method_code = MethodCode::new(1, 0, vec![
        ACONST_NULL,
        ARRAYLENGTH,
        IRETURN,
        POP,
        BIPUSH, 7,
        IRETURN,
    ]).with_exception_table(vec![ExceptionTableEntry {
        start_pc: 0,
        end_pc: 3,
        handler_pc: 3,
        catch_type: 0,
    }]);
    let main = define_static(&mut loader, "Main", Pool::default(), "run", "()I", method_code);
    assert_eq!(int_result(run_static(&mut loader, &main, "run", "()I", vec![]).unwrap()), 7);
}

#[test]
fn test_fill_in_stack_trace() {
    let mut loader = ClassLoader::new().unwrap();
    define_exceptions(&mut loader);
    let mut inner_pool = Pool::default();
    let [throwable_hi, throwable_lo] = u16_bytes(inner_pool.class("java/lang/Throwable"));
    let [fill_hi, fill_lo] = u16_bytes(inner_pool.method("java/lang/Throwable",
                                                         "fillInStackTrace",
                                                         "()Ljava/lang/Throwable;"));
    define_static(&mut loader, "Inner", inner_pool, "make", "()Ljava/lang/Throwable;",
                  MethodCode::new(1, 0, vec![
        NEW, throwable_hi, throwable_lo,
        INVOKEVIRTUAL, fill_hi, fill_lo,
        ARETURN,
    ]));
    let mut pool = Pool::default();
    let [make_hi, make_lo] = u16_bytes(pool.method("Inner", "make", "()Ljava/lang/Throwable;"));
    let outer = define_static(&mut loader, "Outer", pool, "run", "()Ljava/lang/Throwable;",
                              MethodCode::new(1, 0, vec![INVOKESTATIC, make_hi, make_lo,
                                                         ARETURN]));

    let throwable = reference_result(run_static(&mut loader, &outer, "run",
                                                "()Ljava/lang/Throwable;", vec![]).unwrap());
    let trace = match throwable {
        Reference::Object(ref object) => object.borrow().get_field("stackTrace").unwrap(),
        ref other => panic!("unexpected reference {:?}", other),
    };
    let elements: Vec<String> = match trace {
        Value::Reference(Reference::Array(ref array)) => array.borrow().elements().iter()
            .map(|element| element.as_rust_string().unwrap())
            .collect(),
        ref other => panic!("unexpected stack trace {:?}", other),
    };
    assert_eq!(elements, vec!["Inner.make", "Outer.run"]);
}

#[test]
fn test_stack_overflow() {
    use rust_jvm_engine::vm::native::{Console, NativeRegistry};
    use rust_jvm_engine::vm::{Options, Thread};

    let mut loader = ClassLoader::new().unwrap();
    let mut pool = Pool::default();
    let [hi, lo] = u16_bytes(pool.method("Recurse", "down", "()V"));
    let recurse = define_static(&mut loader, "Recurse", pool, "down", "()V",
                                MethodCode::new(0, 0, vec![INVOKESTATIC, hi, lo, RETURN]));
    let console = Console::new(Box::new(SharedBuffer::default()),
                               Box::new(SharedBuffer::default()));
    let mut thread = Thread::with_options(NativeRegistry::with_defaults(), console,
                                          Options { max_call_depth: 8 });
    let method = recurse.get_method(&method_sig("down", "()V")).unwrap().clone();
    match thread.invoke(&mut loader, &recurse, &method, vec![]) {
        Err(ref error) => match *error.root() {
            Error::StackOverflow { depth } => assert_eq!(depth, 8),
            ref other => panic!("unexpected error {:?}", other),
        },
        Ok(value) => panic!("unexpected result {:?}", value),
    }
    assert_eq!(thread.depth(), 0);
}
