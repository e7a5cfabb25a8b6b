//! The process-wide output the `java/io/PrintStream` hooks write to.

use std::fmt;
use std::io::{self, Write};

use crate::vm::error::Result;

/// File descriptor of `System.err`; every other descriptor writes to the standard output sink.
pub const STDERR_FD: i32 = 2;

pub struct Console {
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl Console {
    pub fn new(out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Console { out: out, err: err }
    }

    /// A console writing to the host process's standard output and standard error.
    pub fn stdio() -> Self {
        Console::new(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Writes the text verbatim and flushes, so that output interleaves with the host's own.
    pub fn write(&mut self, fd: i32, text: &str) -> Result<()> {
        let sink = if fd == STDERR_FD { &mut self.err } else { &mut self.out };
        sink.write_all(text.as_bytes())?;
        sink.flush()?;
        Ok(())
    }
}

impl Default for Console {
    fn default() -> Self {
        Console::stdio()
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<console>")
    }
}
