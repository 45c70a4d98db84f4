use core::fmt;

/// Number of low bits of an encoded address that hold the index; the kind
/// tag lives in the bits above.
pub const ADDR_BITS: u32 = 24;

const INDEX_MASK: u32 = (1 << ADDR_BITS) - 1;

/// Kind tag of an [`Address`], stored in the bits above [`ADDR_BITS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum AddressKind {
    /// The `self` receiver of the executing function.
    SelfRef = 0,
    /// Stack slot of the executing frame.
    Stack = 1,
    /// Function argument slot.
    Argument = 2,
    /// Constant local to the function.
    LocalConstant = 3,
    /// Member variable of the enclosing class instance.
    Member = 4,
    /// Constant of the enclosing class.
    ClassConstant = 5,
    /// Global constant.
    Global = 6,
    /// Typed integer register.
    IntRegister = 7,
    /// Typed real register.
    RealRegister = 8,
}

impl AddressKind {
    fn from_tag(tag: u32) -> Option<Self> {
        use AddressKind::*;
        Some(match tag {
            0 => SelfRef,
            1 => Stack,
            2 => Argument,
            3 => LocalConstant,
            4 => Member,
            5 => ClassConstant,
            6 => Global,
            7 => IntRegister,
            8 => RealRegister,
            _ => return None,
        })
    }
}

/// Encoded reference to a slot in the runtime's addressable value store.
///
/// Two addresses refer to the same value iff their encoded integers are
/// equal; the optimizer compares addresses, never the values behind them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Address(u32);

impl Address {
    /// The distinguished `self` pseudo-address.
    pub const SELF: Self = Self::new(AddressKind::SelfRef, 0);

    /// Compose an address from a kind tag and an index.
    pub const fn new(kind: AddressKind, index: u32) -> Self {
        Address(((kind as u32) << ADDR_BITS) | (index & INDEX_MASK))
    }

    /// Stack slot address.
    pub const fn stack(index: u32) -> Self {
        Self::new(AddressKind::Stack, index)
    }

    /// Function argument address.
    pub const fn argument(index: u32) -> Self {
        Self::new(AddressKind::Argument, index)
    }

    /// Function-local constant address.
    pub const fn local_constant(index: u32) -> Self {
        Self::new(AddressKind::LocalConstant, index)
    }

    /// Class member address.
    pub const fn member(index: u32) -> Self {
        Self::new(AddressKind::Member, index)
    }

    /// Class constant address.
    pub const fn class_constant(index: u32) -> Self {
        Self::new(AddressKind::ClassConstant, index)
    }

    /// Global constant address.
    pub const fn global(index: u32) -> Self {
        Self::new(AddressKind::Global, index)
    }

    /// Typed integer register address.
    pub const fn int_register(index: u32) -> Self {
        Self::new(AddressKind::IntRegister, index)
    }

    /// Typed real register address.
    pub const fn real_register(index: u32) -> Self {
        Self::new(AddressKind::RealRegister, index)
    }

    /// Reinterpret a raw bytecode slot as an address.
    pub const fn from_raw(raw: i32) -> Self {
        Address(raw as u32)
    }

    /// The wire representation of this address.
    pub const fn raw(self) -> i32 {
        self.0 as i32
    }

    /// Kind tag, if the tag bits name a known kind.
    pub fn kind(self) -> Option<AddressKind> {
        AddressKind::from_tag(self.0 >> ADDR_BITS)
    }

    /// Index portion of the address.
    pub const fn index(self) -> u32 {
        self.0 & INDEX_MASK
    }
}

impl From<i32> for Address {
    fn from(raw: i32) -> Self {
        Self::from_raw(raw)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(AddressKind::SelfRef) => write!(f, "self"),
            Some(AddressKind::Stack) => write!(f, "stack({})", self.index()),
            Some(AddressKind::Argument) => write!(f, "arg({})", self.index()),
            Some(AddressKind::LocalConstant) => write!(f, "const({})", self.index()),
            Some(AddressKind::Member) => write!(f, "member({})", self.index()),
            Some(AddressKind::ClassConstant) => write!(f, "classconst({})", self.index()),
            Some(AddressKind::Global) => write!(f, "global({})", self.index()),
            Some(AddressKind::IntRegister) => write!(f, "ireg({})", self.index()),
            Some(AddressKind::RealRegister) => write!(f, "rreg({})", self.index()),
            None => write!(f, "addr({:#x})", self.0),
        }
    }
}
