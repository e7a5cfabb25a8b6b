//! Decoding of the instruction stream of a method's `Code` attribute.

pub mod opcode;
mod reader;

pub use self::reader::BytecodeReader;

use crate::vm::error::{Error, Result};

/// A bytecode instruction in the Java virtual machine, with its immediate operands decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Constant(op::Constant),
    Load(op::Load),
    Store(op::Store),
    Stack(op::Stack),
    Math(op::Math),
    Conversion(op::Conversion),
    Comparison(op::Comparison),
    Control(op::Control),
    Reference(op::Reference),
    Extended(op::Extended),
}

pub mod op {
    use crate::vm::constant_pool::ConstantPoolIndex;

    pub type LocalVariableIndex = u16;
    pub type BranchOffset = i32;

    /// Push a constant value onto the operand stack.
    #[derive(Debug, Clone, PartialEq)]
    #[allow(non_camel_case_types)]
    pub enum Constant {
        Nop,
        Aconst_null,
        /// `iconst_<i>`, `bipush` and `sipush`.
        Ipush { value: i32 },
        Lconst_0,
        Lconst_1,
        Fconst_0,
        Fconst_1,
        Fconst_2,
        Dconst_0,
        Dconst_1,
        /// `ldc` and `ldc_w`.
        Ldc { index: ConstantPoolIndex },
        Ldc2_w { index: ConstantPoolIndex },
    }

    /// Load a value from a local variable or array onto the operand stack.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Load {
        Iload { index: LocalVariableIndex },
        Lload { index: LocalVariableIndex },
        Fload { index: LocalVariableIndex },
        Dload { index: LocalVariableIndex },
        Aload { index: LocalVariableIndex },
        Iaload,
        Laload,
        Faload,
        Daload,
        Aaload,
        Baload,
        Caload,
        Saload,
    }

    /// Store a value on the operand stack into a local variable or array.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Store {
        Istore { index: LocalVariableIndex },
        Lstore { index: LocalVariableIndex },
        Fstore { index: LocalVariableIndex },
        Dstore { index: LocalVariableIndex },
        Astore { index: LocalVariableIndex },
        Iastore,
        Lastore,
        Fastore,
        Dastore,
        Aastore,
        Bastore,
        Castore,
        Sastore,
    }

    /// Manipulate values on the operand stack.
    #[derive(Debug, Clone, PartialEq)]
    #[allow(non_camel_case_types)]
    pub enum Stack {
        Pop,
        Pop2,
        Dup,
        Dup_x1,
        Dup_x2,
        Dup2,
        Dup2_x1,
        Dup2_x2,
        Swap,
    }

    /// Perform mathematical operations on stack values.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Math {
        Iadd,
        Ladd,
        Fadd,
        Dadd,
        Isub,
        Lsub,
        Fsub,
        Dsub,
        Imul,
        Lmul,
        Fmul,
        Dmul,
        Idiv,
        Ldiv,
        Fdiv,
        Ddiv,
        Irem,
        Lrem,
        Frem,
        Drem,
        Ineg,
        Lneg,
        Fneg,
        Dneg,
        Ishl,
        Lshl,
        Ishr,
        Lshr,
        Iushr,
        Lushr,
        Iand,
        Land,
        Ior,
        Lor,
        Ixor,
        Lxor,
        Iinc { index: LocalVariableIndex, constant: i16 },
    }

    /// Convert stack values between JVM types.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Conversion {
        I2l,
        I2f,
        I2d,
        L2i,
        L2f,
        L2d,
        F2i,
        F2l,
        F2d,
        D2i,
        D2l,
        D2f,
        I2b,
        I2c,
        I2s,
    }

    /// Compare stack values conditionally alter control flow.
    #[derive(Debug, Clone, PartialEq)]
    #[allow(non_camel_case_types)]
    pub enum Comparison {
        Lcmp,
        Fcmpl,
        Fcmpg,
        Dcmpl,
        Dcmpg,
        Ifeq { offset: BranchOffset },
        Ifne { offset: BranchOffset },
        Iflt { offset: BranchOffset },
        Ifge { offset: BranchOffset },
        Ifgt { offset: BranchOffset },
        Ifle { offset: BranchOffset },
        If_icmpeq { offset: BranchOffset },
        If_icmpne { offset: BranchOffset },
        If_icmplt { offset: BranchOffset },
        If_icmpge { offset: BranchOffset },
        If_icmpgt { offset: BranchOffset },
        If_icmple { offset: BranchOffset },
        If_acmpeq { offset: BranchOffset },
        If_acmpne { offset: BranchOffset },
    }

    /// Unconditionally modify control flow.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Control {
        Goto { offset: BranchOffset },
        Jsr { offset: BranchOffset },
        Ret { index: LocalVariableIndex },
        Tableswitch { default: BranchOffset, low: i32, high: i32, offsets: Vec<BranchOffset> },
        Lookupswitch { default: BranchOffset, pairs: Vec<(i32, BranchOffset)> },
        Ireturn,
        Lreturn,
        Freturn,
        Dreturn,
        Areturn,
        Return,
    }

    /// Operations on reference types (objects and arrays).
    #[derive(Debug, Clone, PartialEq)]
    pub enum Reference {
        Getstatic { index: ConstantPoolIndex },
        Putstatic { index: ConstantPoolIndex },
        Getfield { index: ConstantPoolIndex },
        Putfield { index: ConstantPoolIndex },
        Invokevirtual { index: ConstantPoolIndex },
        Invokespecial { index: ConstantPoolIndex },
        Invokestatic { index: ConstantPoolIndex },
        Invokeinterface { index: ConstantPoolIndex, count: u8 },
        Invokedynamic { index: ConstantPoolIndex },
        New { index: ConstantPoolIndex },
        Newarray { atype: u8 },
        Anewarray { index: ConstantPoolIndex },
        Arraylength,
        Athrow,
        Checkcast { index: ConstantPoolIndex },
        Instanceof { index: ConstantPoolIndex },
        Monitorenter,
        Monitorexit,
    }

    /// Extended instructions supported by the JVM. The `wide` prefix is folded into the 16-bit
    /// indices of the instructions it modifies.
    #[derive(Debug, Clone, PartialEq)]
    #[allow(non_camel_case_types)]
    pub enum Extended {
        Multianewarray { index: ConstantPoolIndex, dimensions: u8 },
        Ifnull { offset: BranchOffset },
        Ifnonnull { offset: BranchOffset },
        Goto_w { offset: BranchOffset },
        Jsr_w { offset: BranchOffset },
    }
}

impl Instruction {
    /// Decodes the instruction at the reader's position, consuming the opcode and all of its
    /// immediates. Returns the opcode byte along with the instruction.
    pub fn fetch(reader: &mut BytecodeReader) -> Result<(u8, Instruction)> {
        use self::op::*;

        let code = reader.read_u8()?;
        let instruction = match code {
            opcode::NOP => Instruction::Constant(Constant::Nop),
            opcode::ACONST_NULL => Instruction::Constant(Constant::Aconst_null),
            opcode::ICONST_M1 ..= opcode::ICONST_5 =>
                Instruction::Constant(Constant::Ipush { value: code as i32 - 3 }),
            opcode::LCONST_0 => Instruction::Constant(Constant::Lconst_0),
            opcode::LCONST_1 => Instruction::Constant(Constant::Lconst_1),
            opcode::FCONST_0 => Instruction::Constant(Constant::Fconst_0),
            opcode::FCONST_1 => Instruction::Constant(Constant::Fconst_1),
            opcode::FCONST_2 => Instruction::Constant(Constant::Fconst_2),
            opcode::DCONST_0 => Instruction::Constant(Constant::Dconst_0),
            opcode::DCONST_1 => Instruction::Constant(Constant::Dconst_1),
            opcode::BIPUSH =>
                Instruction::Constant(Constant::Ipush { value: reader.read_i8()? as i32 }),
            opcode::SIPUSH =>
                Instruction::Constant(Constant::Ipush { value: reader.read_i16()? as i32 }),
            opcode::LDC =>
                Instruction::Constant(Constant::Ldc { index: reader.read_u8()? as u16 }),
            opcode::LDC_W => Instruction::Constant(Constant::Ldc { index: reader.read_u16()? }),
            opcode::LDC2_W => Instruction::Constant(Constant::Ldc2_w { index: reader.read_u16()? }),

            opcode::ILOAD ..= opcode::ALOAD => {
                let index = reader.read_u8()? as u16;
                Self::load(code - opcode::ILOAD, index)
            },
            opcode::ILOAD_0 ..= opcode::ALOAD_3 => {
                let offset = code - opcode::ILOAD_0;
                Self::load(offset / 4, (offset % 4) as u16)
            },
            opcode::IALOAD => Instruction::Load(Load::Iaload),
            opcode::LALOAD => Instruction::Load(Load::Laload),
            opcode::FALOAD => Instruction::Load(Load::Faload),
            opcode::DALOAD => Instruction::Load(Load::Daload),
            opcode::AALOAD => Instruction::Load(Load::Aaload),
            opcode::BALOAD => Instruction::Load(Load::Baload),
            opcode::CALOAD => Instruction::Load(Load::Caload),
            opcode::SALOAD => Instruction::Load(Load::Saload),

            opcode::ISTORE ..= opcode::ASTORE => {
                let index = reader.read_u8()? as u16;
                Self::store(code - opcode::ISTORE, index)
            },
            opcode::ISTORE_0 ..= opcode::ASTORE_3 => {
                let offset = code - opcode::ISTORE_0;
                Self::store(offset / 4, (offset % 4) as u16)
            },
            opcode::IASTORE => Instruction::Store(Store::Iastore),
            opcode::LASTORE => Instruction::Store(Store::Lastore),
            opcode::FASTORE => Instruction::Store(Store::Fastore),
            opcode::DASTORE => Instruction::Store(Store::Dastore),
            opcode::AASTORE => Instruction::Store(Store::Aastore),
            opcode::BASTORE => Instruction::Store(Store::Bastore),
            opcode::CASTORE => Instruction::Store(Store::Castore),
            opcode::SASTORE => Instruction::Store(Store::Sastore),

            opcode::POP => Instruction::Stack(Stack::Pop),
            opcode::POP2 => Instruction::Stack(Stack::Pop2),
            opcode::DUP => Instruction::Stack(Stack::Dup),
            opcode::DUP_X1 => Instruction::Stack(Stack::Dup_x1),
            opcode::DUP_X2 => Instruction::Stack(Stack::Dup_x2),
            opcode::DUP2 => Instruction::Stack(Stack::Dup2),
            opcode::DUP2_X1 => Instruction::Stack(Stack::Dup2_x1),
            opcode::DUP2_X2 => Instruction::Stack(Stack::Dup2_x2),
            opcode::SWAP => Instruction::Stack(Stack::Swap),

            opcode::IADD => Instruction::Math(Math::Iadd),
            opcode::LADD => Instruction::Math(Math::Ladd),
            opcode::FADD => Instruction::Math(Math::Fadd),
            opcode::DADD => Instruction::Math(Math::Dadd),
            opcode::ISUB => Instruction::Math(Math::Isub),
            opcode::LSUB => Instruction::Math(Math::Lsub),
            opcode::FSUB => Instruction::Math(Math::Fsub),
            opcode::DSUB => Instruction::Math(Math::Dsub),
            opcode::IMUL => Instruction::Math(Math::Imul),
            opcode::LMUL => Instruction::Math(Math::Lmul),
            opcode::FMUL => Instruction::Math(Math::Fmul),
            opcode::DMUL => Instruction::Math(Math::Dmul),
            opcode::IDIV => Instruction::Math(Math::Idiv),
            opcode::LDIV => Instruction::Math(Math::Ldiv),
            opcode::FDIV => Instruction::Math(Math::Fdiv),
            opcode::DDIV => Instruction::Math(Math::Ddiv),
            opcode::IREM => Instruction::Math(Math::Irem),
            opcode::LREM => Instruction::Math(Math::Lrem),
            opcode::FREM => Instruction::Math(Math::Frem),
            opcode::DREM => Instruction::Math(Math::Drem),
            opcode::INEG => Instruction::Math(Math::Ineg),
            opcode::LNEG => Instruction::Math(Math::Lneg),
            opcode::FNEG => Instruction::Math(Math::Fneg),
            opcode::DNEG => Instruction::Math(Math::Dneg),
            opcode::ISHL => Instruction::Math(Math::Ishl),
            opcode::LSHL => Instruction::Math(Math::Lshl),
            opcode::ISHR => Instruction::Math(Math::Ishr),
            opcode::LSHR => Instruction::Math(Math::Lshr),
            opcode::IUSHR => Instruction::Math(Math::Iushr),
            opcode::LUSHR => Instruction::Math(Math::Lushr),
            opcode::IAND => Instruction::Math(Math::Iand),
            opcode::LAND => Instruction::Math(Math::Land),
            opcode::IOR => Instruction::Math(Math::Ior),
            opcode::LOR => Instruction::Math(Math::Lor),
            opcode::IXOR => Instruction::Math(Math::Ixor),
            opcode::LXOR => Instruction::Math(Math::Lxor),
            opcode::IINC => {
                let index = reader.read_u8()? as u16;
                let constant = reader.read_i8()? as i16;
                Instruction::Math(Math::Iinc { index: index, constant: constant })
            },

            opcode::I2L => Instruction::Conversion(Conversion::I2l),
            opcode::I2F => Instruction::Conversion(Conversion::I2f),
            opcode::I2D => Instruction::Conversion(Conversion::I2d),
            opcode::L2I => Instruction::Conversion(Conversion::L2i),
            opcode::L2F => Instruction::Conversion(Conversion::L2f),
            opcode::L2D => Instruction::Conversion(Conversion::L2d),
            opcode::F2I => Instruction::Conversion(Conversion::F2i),
            opcode::F2L => Instruction::Conversion(Conversion::F2l),
            opcode::F2D => Instruction::Conversion(Conversion::F2d),
            opcode::D2I => Instruction::Conversion(Conversion::D2i),
            opcode::D2L => Instruction::Conversion(Conversion::D2l),
            opcode::D2F => Instruction::Conversion(Conversion::D2f),
            opcode::I2B => Instruction::Conversion(Conversion::I2b),
            opcode::I2C => Instruction::Conversion(Conversion::I2c),
            opcode::I2S => Instruction::Conversion(Conversion::I2s),

            opcode::LCMP => Instruction::Comparison(Comparison::Lcmp),
            opcode::FCMPL => Instruction::Comparison(Comparison::Fcmpl),
            opcode::FCMPG => Instruction::Comparison(Comparison::Fcmpg),
            opcode::DCMPL => Instruction::Comparison(Comparison::Dcmpl),
            opcode::DCMPG => Instruction::Comparison(Comparison::Dcmpg),
            opcode::IFEQ ..= opcode::IF_ACMPNE => {
                let offset = reader.read_i16()? as i32;
                Instruction::Comparison(match code {
                    opcode::IFEQ => Comparison::Ifeq { offset: offset },
                    opcode::IFNE => Comparison::Ifne { offset: offset },
                    opcode::IFLT => Comparison::Iflt { offset: offset },
                    opcode::IFGE => Comparison::Ifge { offset: offset },
                    opcode::IFGT => Comparison::Ifgt { offset: offset },
                    opcode::IFLE => Comparison::Ifle { offset: offset },
                    opcode::IF_ICMPEQ => Comparison::If_icmpeq { offset: offset },
                    opcode::IF_ICMPNE => Comparison::If_icmpne { offset: offset },
                    opcode::IF_ICMPLT => Comparison::If_icmplt { offset: offset },
                    opcode::IF_ICMPGE => Comparison::If_icmpge { offset: offset },
                    opcode::IF_ICMPGT => Comparison::If_icmpgt { offset: offset },
                    opcode::IF_ICMPLE => Comparison::If_icmple { offset: offset },
                    opcode::IF_ACMPEQ => Comparison::If_acmpeq { offset: offset },
                    _ => Comparison::If_acmpne { offset: offset },
                })
            },

            opcode::GOTO =>
                Instruction::Control(Control::Goto { offset: reader.read_i16()? as i32 }),
            opcode::JSR => Instruction::Control(Control::Jsr { offset: reader.read_i16()? as i32 }),
            opcode::RET => Instruction::Control(Control::Ret { index: reader.read_u8()? as u16 }),
            opcode::TABLESWITCH => {
                reader.align()?;
                let default = reader.read_i32()?;
                let low = reader.read_i32()?;
                let high = reader.read_i32()?;
                if high < low {
                    return Err(Error::TruncatedInstruction { pc: reader.position() });
                }
                let offsets = reader.read_i32s((high as i64 - low as i64 + 1) as usize)?;
                Instruction::Control(Control::Tableswitch {
                    default: default,
                    low: low,
                    high: high,
                    offsets: offsets,
                })
            },
            opcode::LOOKUPSWITCH => {
                reader.align()?;
                let default = reader.read_i32()?;
                let npairs = reader.read_i32()?;
                if npairs < 0 {
                    return Err(Error::TruncatedInstruction { pc: reader.position() });
                }
                let flat = reader.read_i32s(npairs as usize * 2)?;
                let pairs = flat.chunks(2).map(|pair| (pair[0], pair[1])).collect();
                Instruction::Control(Control::Lookupswitch { default: default, pairs: pairs })
            },
            opcode::IRETURN => Instruction::Control(Control::Ireturn),
            opcode::LRETURN => Instruction::Control(Control::Lreturn),
            opcode::FRETURN => Instruction::Control(Control::Freturn),
            opcode::DRETURN => Instruction::Control(Control::Dreturn),
            opcode::ARETURN => Instruction::Control(Control::Areturn),
            opcode::RETURN => Instruction::Control(Control::Return),

            opcode::GETSTATIC =>
                Instruction::Reference(Reference::Getstatic { index: reader.read_u16()? }),
            opcode::PUTSTATIC =>
                Instruction::Reference(Reference::Putstatic { index: reader.read_u16()? }),
            opcode::GETFIELD =>
                Instruction::Reference(Reference::Getfield { index: reader.read_u16()? }),
            opcode::PUTFIELD =>
                Instruction::Reference(Reference::Putfield { index: reader.read_u16()? }),
            opcode::INVOKEVIRTUAL =>
                Instruction::Reference(Reference::Invokevirtual { index: reader.read_u16()? }),
            opcode::INVOKESPECIAL =>
                Instruction::Reference(Reference::Invokespecial { index: reader.read_u16()? }),
            opcode::INVOKESTATIC =>
                Instruction::Reference(Reference::Invokestatic { index: reader.read_u16()? }),
            opcode::INVOKEINTERFACE => {
                let index = reader.read_u16()?;
                let count = reader.read_u8()?;
                // the fourth byte is always zero
                reader.read_u8()?;
                Instruction::Reference(Reference::Invokeinterface { index: index, count: count })
            },
            opcode::INVOKEDYNAMIC => {
                let index = reader.read_u16()?;
                reader.read_u16()?;
                Instruction::Reference(Reference::Invokedynamic { index: index })
            },
            opcode::NEW => Instruction::Reference(Reference::New { index: reader.read_u16()? }),
            opcode::NEWARRAY =>
                Instruction::Reference(Reference::Newarray { atype: reader.read_u8()? }),
            opcode::ANEWARRAY =>
                Instruction::Reference(Reference::Anewarray { index: reader.read_u16()? }),
            opcode::ARRAYLENGTH => Instruction::Reference(Reference::Arraylength),
            opcode::ATHROW => Instruction::Reference(Reference::Athrow),
            opcode::CHECKCAST =>
                Instruction::Reference(Reference::Checkcast { index: reader.read_u16()? }),
            opcode::INSTANCEOF =>
                Instruction::Reference(Reference::Instanceof { index: reader.read_u16()? }),
            opcode::MONITORENTER => Instruction::Reference(Reference::Monitorenter),
            opcode::MONITOREXIT => Instruction::Reference(Reference::Monitorexit),

            opcode::WIDE => Self::fetch_wide(reader)?,
            opcode::MULTIANEWARRAY => {
                let index = reader.read_u16()?;
                let dimensions = reader.read_u8()?;
                Instruction::Extended(Extended::Multianewarray {
                    index: index,
                    dimensions: dimensions,
                })
            },
            opcode::IFNULL =>
                Instruction::Extended(Extended::Ifnull { offset: reader.read_i16()? as i32 }),
            opcode::IFNONNULL =>
                Instruction::Extended(Extended::Ifnonnull { offset: reader.read_i16()? as i32 }),
            opcode::GOTO_W =>
                Instruction::Extended(Extended::Goto_w { offset: reader.read_i32()? }),
            opcode::JSR_W => Instruction::Extended(Extended::Jsr_w { offset: reader.read_i32()? }),

            _ => return Err(Error::UnknownOpcode(code)),
        };
        Ok((code, instruction))
    }

    /// `kind` is 0 through 4 for int, long, float, double and reference.
    fn load(kind: u8, index: u16) -> Instruction {
        use self::op::Load;
        Instruction::Load(match kind {
            0 => Load::Iload { index: index },
            1 => Load::Lload { index: index },
            2 => Load::Fload { index: index },
            3 => Load::Dload { index: index },
            _ => Load::Aload { index: index },
        })
    }

    fn store(kind: u8, index: u16) -> Instruction {
        use self::op::Store;
        Instruction::Store(match kind {
            0 => Store::Istore { index: index },
            1 => Store::Lstore { index: index },
            2 => Store::Fstore { index: index },
            3 => Store::Dstore { index: index },
            _ => Store::Astore { index: index },
        })
    }

    fn fetch_wide(reader: &mut BytecodeReader) -> Result<Instruction> {
        let code = reader.read_u8()?;
        match code {
            opcode::ILOAD ..= opcode::ALOAD =>
                Ok(Self::load(code - opcode::ILOAD, reader.read_u16()?)),
            opcode::ISTORE ..= opcode::ASTORE =>
                Ok(Self::store(code - opcode::ISTORE, reader.read_u16()?)),
            opcode::RET => Ok(Instruction::Control(op::Control::Ret { index: reader.read_u16()? })),
            opcode::IINC => {
                let index = reader.read_u16()?;
                let constant = reader.read_i16()?;
                Ok(Instruction::Math(op::Math::Iinc { index: index, constant: constant }))
            },
            _ => Err(Error::UnknownOpcode(code)),
        }
    }
}
