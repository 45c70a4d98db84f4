use core::fmt;

use bitflags::bitflags;

use crate::{Address, DecodeError, Opcode, Operator};

bitflags! {
    /// Which operand slots of an [`Instruction`] are semantically meaningful,
    /// and how they participate in def/use analysis: `TARGET` is a write,
    /// every other flag is a read.
    pub struct DefUse: u32 {
        /// The instruction writes `target`.
        const TARGET = 0b00000001;
        /// The instruction reads `source0`.
        const SOURCE0 = 0b00000010;
        /// The instruction reads `source1`.
        const SOURCE1 = 0b00000100;
        /// The instruction reads every address in `varargs`.
        const VARARGS = 0b00001000;
        /// The instruction reads the subscript index slot (`source1`).
        const INDEX = 0b00010000;
        /// The instruction reads the `self` receiver.
        const SELF = 0b00100000;
    }
}

/// One decoded bytecode instruction.
///
/// Operand fields are only meaningful when the matching [`DefUse`] bit is
/// set (or, for `operator`, when the opcode is [`Opcode::Operator`]); the
/// remaining fields keep their inert defaults. `source1` doubles as the
/// subscript index slot of `SET`/`GET`, flagged by [`DefUse::INDEX`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Opcode of the instruction.
    pub opcode: Opcode,
    /// Variant operator, meaningful only for [`Opcode::Operator`].
    pub operator: Operator,
    /// Destination address.
    pub target: Address,
    /// First source address.
    pub source0: Address,
    /// Second source address, or the subscript index.
    pub source1: Address,
    /// Immediate index operand (name index, builtin function index, line
    /// number, reserved slot), never an address.
    pub index_arg: i32,
    /// Immediate type tag operand.
    pub type_arg: i32,
    /// Trailing address operands of variadic opcodes. For
    /// [`Opcode::JumpToDefArgument`] the entries are raw code offsets
    /// mirroring the function's default-argument table, not value
    /// addresses, and [`DefUse::VARARGS`] is not set.
    pub varargs: Vec<Address>,
    /// Branch target as a code offset, meaningful for branch opcodes.
    pub branch_ip: i32,
    /// Number of slots the instruction occupies in the stream.
    pub stride: usize,
    /// Assembly hint: skip this instruction during emission.
    pub omit: bool,
    /// Slot usage mask.
    pub defuse: DefUse,
}

impl Default for Instruction {
    fn default() -> Self {
        Instruction {
            opcode: Opcode::End,
            operator: Operator::Equal,
            target: Address::SELF,
            source0: Address::SELF,
            source1: Address::SELF,
            index_arg: 0,
            type_arg: 0,
            varargs: Vec::new(),
            branch_ip: 0,
            stride: 1,
            omit: false,
            defuse: DefUse::empty(),
        }
    }
}

fn ensure(code: &[i32], offset: usize, needed: usize) -> Result<(), DecodeError> {
    if offset + needed > code.len() {
        return Err(DecodeError::OutOfBounds {
            offset,
            needed,
            len: code.len(),
        });
    }
    Ok(())
}

fn slot_count(code: &[i32], offset: usize, slot: usize) -> Result<usize, DecodeError> {
    usize::try_from(code[offset + slot]).map_err(|_| DecodeError::OutOfBounds {
        offset,
        needed: slot + 1,
        len: code.len(),
    })
}

impl Instruction {
    /// Decode the instruction starting at `code[offset]`.
    ///
    /// `default_argument_count` supplies the length of the target table
    /// that trails [`Opcode::JumpToDefArgument`]; it is not recoverable
    /// from the stream itself.
    pub fn parse(
        code: &[i32],
        offset: usize,
        default_argument_count: usize,
    ) -> Result<Instruction, DecodeError> {
        ensure(code, offset, 1)?;
        let opcode = Opcode::from_raw(code[offset], offset)?;

        let mut inst = Instruction {
            opcode,
            ..Instruction::default()
        };

        let addr = |slot: usize| Address::from_raw(code[offset + slot]);

        let stride = match opcode {
            Opcode::Operator => {
                ensure(code, offset, 5)?;
                let raw = code[offset + 1];
                inst.operator = Operator::from_code(raw).ok_or(DecodeError::UnknownOperator {
                    value: raw,
                    offset: offset + 1,
                })?;
                inst.source0 = addr(2);
                inst.source1 = addr(3);
                inst.target = addr(4);
                inst.defuse = DefUse::TARGET | DefUse::SOURCE0 | DefUse::SOURCE1;
                5
            }
            Opcode::ExtendsTest => {
                ensure(code, offset, 4)?;
                inst.source0 = addr(1); // instance
                inst.source1 = addr(2); // type
                inst.target = addr(3);
                inst.defuse = DefUse::TARGET | DefUse::SOURCE0 | DefUse::SOURCE1;
                4
            }
            Opcode::IsBuiltin => {
                ensure(code, offset, 4)?;
                inst.source0 = addr(1);
                inst.type_arg = code[offset + 2];
                inst.target = addr(3);
                inst.defuse = DefUse::TARGET | DefUse::SOURCE0;
                4
            }
            Opcode::Set => {
                ensure(code, offset, 4)?;
                inst.target = addr(1);
                inst.source1 = addr(2); // index
                inst.source0 = addr(3); // value
                inst.defuse = DefUse::SOURCE0 | DefUse::INDEX | DefUse::TARGET;
                4
            }
            Opcode::Get => {
                // Source before index before target; the outlier of the
                // GET family.
                ensure(code, offset, 4)?;
                inst.source0 = addr(1); // value
                inst.source1 = addr(2); // index
                inst.target = addr(3);
                inst.defuse = DefUse::SOURCE0 | DefUse::INDEX | DefUse::TARGET;
                4
            }
            Opcode::SetNamed => {
                ensure(code, offset, 4)?;
                inst.source0 = addr(1); // value
                inst.index_arg = code[offset + 2]; // name index
                inst.target = addr(3);
                inst.defuse = DefUse::SOURCE0 | DefUse::TARGET;
                4
            }
            Opcode::GetNamed => {
                ensure(code, offset, 4)?;
                inst.target = addr(1);
                inst.index_arg = code[offset + 2]; // name index
                inst.source0 = addr(3); // value
                inst.defuse = DefUse::SOURCE0 | DefUse::TARGET;
                4
            }
            Opcode::SetMember => {
                ensure(code, offset, 3)?;
                inst.index_arg = code[offset + 1]; // name index
                inst.source0 = addr(2); // value
                inst.defuse = DefUse::SOURCE0 | DefUse::SELF;
                3
            }
            Opcode::GetMember => {
                ensure(code, offset, 3)?;
                inst.index_arg = code[offset + 1]; // name index
                inst.target = addr(2);
                inst.defuse = DefUse::TARGET | DefUse::SELF;
                3
            }
            Opcode::Assign => {
                ensure(code, offset, 3)?;
                inst.target = addr(1);
                inst.source0 = addr(2);
                inst.defuse = DefUse::SOURCE0 | DefUse::TARGET;
                3
            }
            Opcode::AssignTrue | Opcode::AssignFalse => {
                ensure(code, offset, 2)?;
                inst.target = addr(1);
                inst.defuse = DefUse::TARGET;
                2
            }
            Opcode::AssignTypedBuiltin => {
                ensure(code, offset, 4)?;
                inst.type_arg = code[offset + 1];
                inst.target = addr(2);
                inst.source0 = addr(3);
                inst.defuse = DefUse::SOURCE0 | DefUse::TARGET;
                4
            }
            Opcode::AssignTypedNative | Opcode::AssignTypedScript => {
                ensure(code, offset, 4)?;
                inst.source0 = addr(1); // type
                inst.target = addr(2);
                inst.source1 = addr(3); // value
                inst.defuse = DefUse::SOURCE0 | DefUse::SOURCE1 | DefUse::TARGET;
                4
            }
            Opcode::CastToBuiltin => {
                ensure(code, offset, 4)?;
                inst.type_arg = code[offset + 1];
                inst.source0 = addr(2);
                inst.target = addr(3);
                inst.defuse = DefUse::SOURCE0 | DefUse::TARGET;
                4
            }
            Opcode::CastToNative | Opcode::CastToScript => {
                ensure(code, offset, 4)?;
                inst.source0 = addr(1); // type
                inst.source1 = addr(2); // value
                inst.target = addr(3);
                inst.defuse = DefUse::SOURCE0 | DefUse::SOURCE1 | DefUse::TARGET;
                4
            }
            Opcode::Construct => {
                ensure(code, offset, 3)?;
                inst.type_arg = code[offset + 1];
                let argc = slot_count(code, offset, 2)?;
                ensure(code, offset, 4 + argc)?;
                for i in 0..argc {
                    inst.varargs.push(addr(3 + i));
                }
                inst.target = addr(3 + argc);
                inst.defuse = DefUse::VARARGS | DefUse::TARGET;
                4 + argc
            }
            Opcode::ConstructArray => {
                ensure(code, offset, 2)?;
                let argc = slot_count(code, offset, 1)?;
                ensure(code, offset, 3 + argc)?;
                for i in 0..argc {
                    inst.varargs.push(addr(2 + i));
                }
                inst.target = addr(2 + argc);
                inst.defuse = DefUse::VARARGS | DefUse::TARGET;
                3 + argc
            }
            Opcode::ConstructDictionary => {
                // The count slot holds key/value pairs; twice that many
                // address slots follow.
                ensure(code, offset, 2)?;
                let pairs = slot_count(code, offset, 1)?;
                ensure(code, offset, 3 + pairs * 2)?;
                for i in 0..pairs * 2 {
                    inst.varargs.push(addr(2 + i));
                }
                inst.target = addr(2 + pairs * 2);
                inst.defuse = DefUse::VARARGS | DefUse::TARGET;
                3 + pairs * 2
            }
            Opcode::Call | Opcode::CallReturn => {
                ensure(code, offset, 4)?;
                let argc = slot_count(code, offset, 1)?;
                ensure(code, offset, 5 + argc)?;
                inst.source0 = addr(2); // call base
                inst.index_arg = code[offset + 3]; // method name index
                for i in 0..argc {
                    inst.varargs.push(addr(4 + i));
                }
                // A dummy slot for CALL, the result location for
                // CALL_RETURN.
                inst.target = addr(4 + argc);
                inst.defuse = DefUse::VARARGS | DefUse::SOURCE0;
                if opcode == Opcode::CallReturn {
                    inst.defuse |= DefUse::TARGET;
                }
                5 + argc
            }
            Opcode::CallBuiltIn => {
                ensure(code, offset, 3)?;
                inst.index_arg = code[offset + 1]; // builtin function index
                let argc = slot_count(code, offset, 2)?;
                ensure(code, offset, 4 + argc)?;
                for i in 0..argc {
                    inst.varargs.push(addr(3 + i));
                }
                inst.target = addr(3 + argc);
                inst.defuse = DefUse::VARARGS | DefUse::TARGET;
                4 + argc
            }
            Opcode::CallSelf => {
                // The compiler does not currently emit this opcode; it is
                // kept opaque so no pass reorders or drops it.
                1
            }
            Opcode::CallSelfBase => {
                ensure(code, offset, 3)?;
                inst.index_arg = code[offset + 1];
                let argc = slot_count(code, offset, 2)?;
                ensure(code, offset, 4 + argc)?;
                for i in 0..argc {
                    inst.varargs.push(addr(3 + i));
                }
                inst.target = addr(3 + argc);
                inst.defuse = DefUse::VARARGS | DefUse::TARGET | DefUse::SELF;
                4 + argc
            }
            Opcode::Yield => {
                ensure(code, offset, 2)?;
                inst.index_arg = code[offset + 1]; // reserved
                2
            }
            Opcode::YieldSignal => {
                ensure(code, offset, 3)?;
                inst.source0 = addr(1);
                inst.index_arg = code[offset + 2]; // signal name index
                inst.defuse = DefUse::SOURCE0;
                3
            }
            Opcode::YieldResume => {
                ensure(code, offset, 2)?;
                inst.target = addr(1);
                inst.defuse = DefUse::TARGET;
                2
            }
            Opcode::Jump => {
                ensure(code, offset, 2)?;
                inst.branch_ip = code[offset + 1];
                2
            }
            Opcode::JumpIf | Opcode::JumpIfNot => {
                ensure(code, offset, 3)?;
                inst.source0 = addr(1);
                inst.branch_ip = code[offset + 2];
                inst.defuse = DefUse::SOURCE0;
                3
            }
            Opcode::JumpToDefArgument => {
                ensure(code, offset, 1 + default_argument_count)?;
                for i in 0..default_argument_count {
                    inst.varargs.push(addr(1 + i));
                }
                1 + default_argument_count
            }
            Opcode::Return => {
                ensure(code, offset, 2)?;
                inst.source0 = addr(1);
                inst.defuse = DefUse::SOURCE0;
                2
            }
            Opcode::IterateBegin | Opcode::Iterate => {
                ensure(code, offset, 5)?;
                inst.source0 = addr(1); // counter
                inst.source1 = addr(2); // container
                inst.branch_ip = code[offset + 3];
                inst.target = addr(4); // iterator value
                inst.defuse = DefUse::SOURCE0 | DefUse::SOURCE1 | DefUse::TARGET;
                5
            }
            Opcode::Assert => {
                ensure(code, offset, 3)?;
                inst.source0 = addr(1); // test
                inst.source1 = addr(2); // message
                inst.defuse = DefUse::SOURCE0 | DefUse::SOURCE1;
                3
            }
            Opcode::Breakpoint => 1,
            Opcode::Line => {
                ensure(code, offset, 2)?;
                inst.index_arg = code[offset + 1]; // line number
                2
            }
            Opcode::End => 1,
            Opcode::BoxInt | Opcode::BoxReal | Opcode::UnboxInt | Opcode::UnboxReal => {
                ensure(code, offset, 3)?;
                inst.source0 = addr(1);
                inst.target = addr(2);
                inst.defuse = DefUse::SOURCE0 | DefUse::TARGET;
                3
            }
        };

        inst.stride = stride;
        Ok(inst)
    }

    /// Append the wire representation to `out`, the exact inverse of
    /// [`Instruction::parse`].
    pub fn encode(&self, out: &mut Vec<i32>) {
        out.push(self.opcode as i32);

        match self.opcode {
            Opcode::Operator => {
                out.push(self.operator as i32);
                out.push(self.source0.raw());
                out.push(self.source1.raw());
                out.push(self.target.raw());
            }
            Opcode::ExtendsTest => {
                out.push(self.source0.raw());
                out.push(self.source1.raw());
                out.push(self.target.raw());
            }
            Opcode::IsBuiltin => {
                out.push(self.source0.raw());
                out.push(self.type_arg);
                out.push(self.target.raw());
            }
            Opcode::Set => {
                out.push(self.target.raw());
                out.push(self.source1.raw());
                out.push(self.source0.raw());
            }
            Opcode::Get => {
                out.push(self.source0.raw());
                out.push(self.source1.raw());
                out.push(self.target.raw());
            }
            Opcode::SetNamed => {
                out.push(self.source0.raw());
                out.push(self.index_arg);
                out.push(self.target.raw());
            }
            Opcode::GetNamed => {
                out.push(self.target.raw());
                out.push(self.index_arg);
                out.push(self.source0.raw());
            }
            Opcode::SetMember => {
                out.push(self.index_arg);
                out.push(self.source0.raw());
            }
            Opcode::GetMember => {
                out.push(self.index_arg);
                out.push(self.target.raw());
            }
            Opcode::Assign => {
                out.push(self.target.raw());
                out.push(self.source0.raw());
            }
            Opcode::AssignTrue | Opcode::AssignFalse => {
                out.push(self.target.raw());
            }
            Opcode::AssignTypedBuiltin => {
                out.push(self.type_arg);
                out.push(self.target.raw());
                out.push(self.source0.raw());
            }
            Opcode::AssignTypedNative | Opcode::AssignTypedScript => {
                out.push(self.source0.raw());
                out.push(self.target.raw());
                out.push(self.source1.raw());
            }
            Opcode::CastToBuiltin => {
                out.push(self.type_arg);
                out.push(self.source0.raw());
                out.push(self.target.raw());
            }
            Opcode::CastToNative | Opcode::CastToScript => {
                out.push(self.source0.raw());
                out.push(self.source1.raw());
                out.push(self.target.raw());
            }
            Opcode::Construct => {
                out.push(self.type_arg);
                out.push(self.varargs.len() as i32);
                out.extend(self.varargs.iter().map(|a| a.raw()));
                out.push(self.target.raw());
            }
            Opcode::ConstructArray => {
                out.push(self.varargs.len() as i32);
                out.extend(self.varargs.iter().map(|a| a.raw()));
                out.push(self.target.raw());
            }
            Opcode::ConstructDictionary => {
                out.push((self.varargs.len() / 2) as i32);
                out.extend(self.varargs.iter().map(|a| a.raw()));
                out.push(self.target.raw());
            }
            Opcode::Call | Opcode::CallReturn => {
                out.push(self.varargs.len() as i32);
                out.push(self.source0.raw());
                out.push(self.index_arg);
                out.extend(self.varargs.iter().map(|a| a.raw()));
                out.push(self.target.raw());
            }
            Opcode::CallBuiltIn | Opcode::CallSelfBase => {
                out.push(self.index_arg);
                out.push(self.varargs.len() as i32);
                out.extend(self.varargs.iter().map(|a| a.raw()));
                out.push(self.target.raw());
            }
            Opcode::CallSelf => {}
            Opcode::Yield => {
                out.push(self.index_arg);
            }
            Opcode::YieldSignal => {
                out.push(self.source0.raw());
                out.push(self.index_arg);
            }
            Opcode::YieldResume => {
                out.push(self.target.raw());
            }
            Opcode::Jump => {
                out.push(self.branch_ip);
            }
            Opcode::JumpIf | Opcode::JumpIfNot => {
                out.push(self.source0.raw());
                out.push(self.branch_ip);
            }
            Opcode::JumpToDefArgument => {
                out.extend(self.varargs.iter().map(|a| a.raw()));
            }
            Opcode::Return => {
                out.push(self.source0.raw());
            }
            Opcode::IterateBegin | Opcode::Iterate => {
                out.push(self.source0.raw());
                out.push(self.source1.raw());
                out.push(self.branch_ip);
                out.push(self.target.raw());
            }
            Opcode::Assert => {
                out.push(self.source0.raw());
                out.push(self.source1.raw());
            }
            Opcode::Line => {
                out.push(self.index_arg);
            }
            Opcode::Breakpoint | Opcode::End => {}
            Opcode::BoxInt | Opcode::BoxReal | Opcode::UnboxInt | Opcode::UnboxReal => {
                out.push(self.source0.raw());
                out.push(self.target.raw());
            }
        }
    }

    /// Copy assignment `target <- source`.
    pub fn assign(target: Address, source: Address) -> Instruction {
        Instruction {
            opcode: Opcode::Assign,
            target,
            source0: source,
            stride: 3,
            defuse: DefUse::SOURCE0 | DefUse::TARGET,
            ..Instruction::default()
        }
    }

    /// Operator application `target <- source0 op source1`.
    pub fn operation(
        operator: Operator,
        target: Address,
        source0: Address,
        source1: Address,
    ) -> Instruction {
        Instruction {
            opcode: Opcode::Operator,
            operator,
            target,
            source0,
            source1,
            stride: 5,
            defuse: DefUse::TARGET | DefUse::SOURCE0 | DefUse::SOURCE1,
            ..Instruction::default()
        }
    }

    /// Unconditional branch to `branch_ip`.
    pub fn jump(branch_ip: i32) -> Instruction {
        Instruction {
            opcode: Opcode::Jump,
            branch_ip,
            stride: 2,
            ..Instruction::default()
        }
    }

    /// Branch to `branch_ip` when `condition` is falsy.
    pub fn jump_if_not(condition: Address, branch_ip: i32) -> Instruction {
        Instruction {
            opcode: Opcode::JumpIfNot,
            source0: condition,
            branch_ip,
            stride: 3,
            defuse: DefUse::SOURCE0,
            ..Instruction::default()
        }
    }

    /// Iteration step reading `counter` and `container`, writing `value`,
    /// escaping to `branch_ip` when exhausted.
    pub fn iterate(
        opcode: Opcode,
        counter: Address,
        container: Address,
        value: Address,
        branch_ip: i32,
    ) -> Instruction {
        debug_assert!(matches!(opcode, Opcode::Iterate | Opcode::IterateBegin));
        Instruction {
            opcode,
            source0: counter,
            source1: container,
            target: value,
            branch_ip,
            stride: 5,
            defuse: DefUse::SOURCE0 | DefUse::SOURCE1 | DefUse::TARGET,
            ..Instruction::default()
        }
    }

    /// The subscript index slot (an alias of `source1`).
    pub fn index_address(&self) -> Address {
        self.source1
    }

    /// The operand count as it appears on the wire: dictionary
    /// construction counts key/value pairs, everything else counts slots.
    pub fn vararg_count(&self) -> usize {
        match self.opcode {
            Opcode::ConstructDictionary => self.varargs.len() / 2,
            _ => self.varargs.len(),
        }
    }

    /// Whether the instruction transfers control within the function
    /// body. A return is not a branch: it keeps its value operand in the
    /// block body while the transfer to the exit lives in the graph.
    pub const fn is_branch(&self) -> bool {
        matches!(
            self.opcode,
            Opcode::Jump
                | Opcode::JumpIf
                | Opcode::JumpIfNot
                | Opcode::Iterate
                | Opcode::IterateBegin
                | Opcode::JumpToDefArgument
        )
    }

    /// Whether executing the instruction can be observed beyond the write
    /// to its target. Instructions that may have side effects are never
    /// removed or reordered by the optimizer.
    pub fn may_have_side_effects(&self) -> bool {
        !matches!(
            self.opcode,
            Opcode::Operator
                | Opcode::ExtendsTest
                | Opcode::IsBuiltin
                | Opcode::Get
                | Opcode::GetNamed
                | Opcode::GetMember
                | Opcode::Assign
                | Opcode::AssignTrue
                | Opcode::AssignFalse
                | Opcode::AssignTypedBuiltin
                | Opcode::AssignTypedNative
                | Opcode::AssignTypedScript
                | Opcode::CastToBuiltin
                | Opcode::CastToNative
                | Opcode::CastToScript
                | Opcode::BoxInt
                | Opcode::BoxReal
                | Opcode::UnboxInt
                | Opcode::UnboxReal
                | Opcode::Line
                | Opcode::Breakpoint
        )
    }

    /// Put commutative operands into canonical order.
    pub fn sort_operands(&mut self) {
        if self.opcode == Opcode::Operator
            && self.operator.is_commutative()
            && self.source1 < self.source0
        {
            core::mem::swap(&mut self.source0, &mut self.source1);
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode {
            Opcode::Operator => write!(
                f,
                "OPERATOR {} = ({}, {}, {})",
                self.target, self.operator, self.source0, self.source1
            ),
            Opcode::Assign => write!(f, "ASSIGN {} = {}", self.target, self.source0),
            Opcode::AssignTrue => write!(f, "ASSIGN {} = true", self.target),
            Opcode::AssignFalse => write!(f, "ASSIGN {} = false", self.target),
            Opcode::Jump => write!(f, "JUMP {}", self.branch_ip),
            Opcode::JumpIf => write!(f, "JUMP_IF {} {}", self.source0, self.branch_ip),
            Opcode::JumpIfNot => write!(f, "JUMP_IF_NOT {} {}", self.source0, self.branch_ip),
            Opcode::Iterate | Opcode::IterateBegin => {
                write!(f, "{} (ESCAPE {})", self.opcode, self.branch_ip)
            }
            Opcode::Return => write!(f, "RETURN {}", self.source0),
            Opcode::Line => write!(f, "LINE {}", self.index_arg),
            Opcode::Get => write!(
                f,
                "GET {} = {}[{}]",
                self.target, self.source0, self.source1
            ),
            Opcode::Set => write!(
                f,
                "SET {}[{}] = {}",
                self.target, self.source1, self.source0
            ),
            Opcode::BoxInt | Opcode::BoxReal | Opcode::UnboxInt | Opcode::UnboxReal => {
                write!(f, "{} {} into {}", self.opcode, self.source0, self.target)
            }
            Opcode::Call | Opcode::CallReturn | Opcode::CallBuiltIn | Opcode::CallSelfBase => {
                write!(f, "{} {}(", self.opcode, self.index_arg)?;
                for (i, arg) in self.varargs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Opcode::JumpToDefArgument => {
                write!(f, "JUMP_TO_DEF_ARGUMENT")?;
                for target in &self.varargs {
                    write!(f, " {}", target.raw())?;
                }
                Ok(())
            }
            _ => write!(f, "{}", self.opcode),
        }
    }
}
