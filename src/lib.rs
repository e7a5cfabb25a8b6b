#![doc(html_root_url = "https://maxmcc.github.io/rust-jvm/")]

//! An execution engine for resolved Java methods: runtime data areas, the instruction set,
//! and a bridge to host-supplied native methods.

#[macro_use]
extern crate log;

pub mod logging;
pub mod util;
pub mod vm;
