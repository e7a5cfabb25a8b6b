use nom::multi::count;
use nom::number::complete::{be_i16, be_i32, be_i8, be_u16, be_u8};
use nom::IResult;

use crate::vm::error::{Error, Result};

/// Reads instructions and their immediates out of a method's code, tracking the offset from the
/// start of the code.
#[derive(Debug)]
pub struct BytecodeReader<'a> {
    code: &'a [u8],
    position: usize,
}

impl<'a> BytecodeReader<'a> {
    pub fn new(code: &'a [u8], position: usize) -> Self {
        BytecodeReader {
            code: code,
            position: position,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn remaining(&self) -> &'a [u8] {
        self.code.get(self.position..).unwrap_or(&[])
    }

    fn parse<T, P>(&mut self, mut parser: P) -> Result<T>
            where P: FnMut(&'a [u8]) -> IResult<&'a [u8], T> {
        match parser(self.remaining()) {
            Ok((rest, value)) => {
                self.position = self.code.len() - rest.len();
                Ok(value)
            },
            Err(_) => Err(Error::TruncatedInstruction { pc: self.position }),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.parse(be_u8)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.parse(be_i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.parse(be_u16)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.parse(be_i16)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.parse(be_i32)
    }

    /// Reads `n` consecutive big-endian 32-bit values, as found in switch tables.
    pub fn read_i32s(&mut self, n: usize) -> Result<Vec<i32>> {
        // guard against absurd counts before allocating
        if n > self.remaining().len() / 4 {
            return Err(Error::TruncatedInstruction { pc: self.position });
        }
        self.parse(count(be_i32, n))
    }

    /// Skips the 0-3 padding bytes that align switch operands to a multiple of four from the
    /// start of the code.
    pub fn align(&mut self) -> Result<()> {
        let padding = (4 - self.position % 4) % 4;
        if padding > self.remaining().len() {
            return Err(Error::TruncatedInstruction { pc: self.position });
        }
        self.position += padding;
        Ok(())
    }
}
