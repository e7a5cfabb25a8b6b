extern crate rust_jvm_engine;

mod common;

use rust_jvm_engine::vm::bytecode::opcode::*;
use rust_jvm_engine::vm::class_loader::{PRINT_STREAM, SYSTEM};
use rust_jvm_engine::vm::constant_pool::RuntimeConstantPoolEntry;
use rust_jvm_engine::vm::{ClassLoader, Value};

use common::*;

fn system_stream(loader: &ClassLoader, name: &str) -> Value {
    loader.find_class(SYSTEM).unwrap().get_static(name).unwrap()
}

fn print(name: &str, stream: &str, text: &str) -> (String, String) {
    let mut loader = ClassLoader::new().unwrap();
    let (mut thread, out, err) = thread();
    let print_stream = loader.find_class(PRINT_STREAM).unwrap();
    let method = print_stream.get_method(&method_sig(name, "(Ljava/lang/String;)V"))
        .unwrap().clone();
    let receiver = system_stream(&loader, stream);
    let string = loader.intern_string(text).unwrap();
    let result = thread.invoke(&mut loader, &print_stream, &method,
                               vec![receiver, Value::Reference(string)]).unwrap();
    assert!(result.is_none());
    (out.contents(), err.contents())
}

#[test]
fn test_print_has_no_newline() {
    assert_eq!(print("print", "out", "hi"), (String::from("hi"), String::new()));
}

#[test]
fn test_println_appends_one_newline() {
    assert_eq!(print("println", "out", "hi"), (String::from("hi\n"), String::new()));
}

#[test]
fn test_err_stream() {
    assert_eq!(print("println", "err", "oops"), (String::new(), String::from("oops\n")));
}

#[test]
fn test_println_from_bytecode() {
    let mut loader = ClassLoader::new().unwrap();
    let mut pool = Pool::default();
    let [out_hi, out_lo] = u16_bytes(pool.field(SYSTEM, "out", "Ljava/io/PrintStream;"));
    let hi = pool.string("hi");
    let [string_hi, string_lo] = u16_bytes(pool.method(PRINT_STREAM, "println",
                                                       "(Ljava/lang/String;)V"));
    let [int_hi, int_lo] = u16_bytes(pool.method(PRINT_STREAM, "println", "(I)V"));
    let [half_hi, half_lo] = u16_bytes(pool.entry(RuntimeConstantPoolEntry::Double(2.5)));
    let [double_hi, double_lo] = u16_bytes(pool.method(PRINT_STREAM, "println", "(D)V"));
    let [char_hi, char_lo] = u16_bytes(pool.method(PRINT_STREAM, "print", "(C)V"));
    let [bool_hi, bool_lo] = u16_bytes(pool.method(PRINT_STREAM, "println", "(Z)V"));
    let main = define_static(&mut loader, "Main", pool, "main", "()V", MethodCode::new(3, 0, vec![
        GETSTATIC, out_hi, out_lo,
        LDC, hi as u8,
        INVOKEVIRTUAL, string_hi, string_lo,
        GETSTATIC, out_hi, out_lo,
        SIPUSH, 0xff, 0x85,
        INVOKEVIRTUAL, int_hi, int_lo,
        GETSTATIC, out_hi, out_lo,
        LDC2_W, half_hi, half_lo,
        INVOKEVIRTUAL, double_hi, double_lo,
        GETSTATIC, out_hi, out_lo,
        BIPUSH, 0x41,
        INVOKEVIRTUAL, char_hi, char_lo,
        GETSTATIC, out_hi, out_lo,
        ICONST_1,
        INVOKEVIRTUAL, bool_hi, bool_lo,
        RETURN,
    ]));

    let (mut thread, out, _) = thread();
    let method = main.get_method(&method_sig("main", "()V")).unwrap().clone();
    assert!(thread.invoke(&mut loader, &main, &method, vec![]).unwrap().is_none());
    assert_eq!(out.contents(), "hi\n-123\n2.5\nAtrue\n");
    assert_eq!(thread.depth(), 0);
}
