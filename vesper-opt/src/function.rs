use core::fmt;
use std::fmt::Write;

use vesper_asm::{AddressKind, DecodeError, DefUse, Instruction, Opcode};

/// A constant in a function's constant table.
///
/// The optimizer never reads constant values; they exist for diagnostics
/// and offline tooling.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Constant {
    /// The nil value.
    #[default]
    Nil,
    /// Boolean constant.
    Bool(bool),
    /// Integer constant.
    Int(i64),
    /// Real constant.
    Real(f64),
    /// String constant.
    Str(String),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Nil => f.write_str("nil"),
            Constant::Bool(value) => write!(f, "{value}"),
            Constant::Int(value) => write!(f, "{value}"),
            Constant::Real(value) => write!(f, "{value}"),
            Constant::Str(value) => write!(f, "{value:?}"),
        }
    }
}

/// A compiled function body as handed over by the compiler and consumed by
/// the interpreter.
///
/// The optimizer reads `code` when it begins and writes it back once on
/// commit; everything else is read-only context. Every offset in
/// `default_argument_addresses` except the largest is preserved exactly by
/// the optimizer; the largest is patched on commit if its block moved.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Function {
    /// Function name, used in diagnostics.
    pub name: String,
    /// The bytecode stream.
    pub code: Vec<i32>,
    /// Entry offsets of the default-argument assignment blocks, one per
    /// defaulted parameter.
    pub default_argument_addresses: Vec<i32>,
    /// Slot count of the evaluation stack frame.
    pub stack_size: u32,
    /// Number of declared parameters.
    pub argument_count: u32,
    /// Constant table referenced by `LocalConstant` addresses.
    pub constants: Vec<Constant>,
    /// Name table referenced by named access and call instructions.
    pub global_names: Vec<String>,
}

impl Function {
    /// Function with the given name and bytecode and no other context.
    pub fn new(name: impl Into<String>, code: Vec<i32>) -> Function {
        Function {
            name: name.into(),
            code,
            ..Function::default()
        }
    }

    /// Number of defaulted parameters.
    pub fn default_argument_count(&self) -> usize {
        self.default_argument_addresses.len()
    }

    /// Constant table lookup.
    pub fn get_constant(&self, index: usize) -> Option<&Constant> {
        self.constants.get(index)
    }

    /// Name table lookup.
    pub fn get_global_name(&self, index: usize) -> Option<&str> {
        self.global_names.get(index).map(String::as_str)
    }

    /// Pretty-print the linear bytecode, one instruction per line with its
    /// slot offset, resolving name and constant operands where the tables
    /// allow.
    pub fn disassembly(&self) -> Result<String, DecodeError> {
        let mut out = String::new();
        let mut ip = 0;
        while ip < self.code.len() {
            let inst = Instruction::parse(&self.code, ip, self.default_argument_count())?;
            let _ = write!(out, "{ip}: {inst}");
            if let Some(note) = self.annotate(&inst) {
                let _ = write!(out, " ; {note}");
            }
            out.push('\n');
            ip += inst.stride;
        }
        Ok(out)
    }

    fn annotate(&self, inst: &Instruction) -> Option<String> {
        match inst.opcode {
            Opcode::GetNamed
            | Opcode::SetNamed
            | Opcode::GetMember
            | Opcode::SetMember
            | Opcode::YieldSignal
            | Opcode::Call
            | Opcode::CallReturn => {
                let name = self.get_global_name(usize::try_from(inst.index_arg).ok()?)?;
                Some(name.to_string())
            }
            _ => {
                if !inst.defuse.contains(DefUse::SOURCE0)
                    || inst.source0.kind() != Some(AddressKind::LocalConstant)
                {
                    return None;
                }
                let index = inst.source0.index() as usize;
                let constant = self.get_constant(index)?;
                Some(format!("const {index} = {constant}"))
            }
        }
    }
}
