//! Area annotations attached to faces and islands

use std::fmt;

/// Number of distinct area types an annotation can carry
pub const MAX_AREA_TYPES: usize = 64;

const AREA_TYPE_BITS: u32 = 6;
const AREA_TYPE_MASK: u32 = (1 << AREA_TYPE_BITS) - 1;

/// Flag bits used for include/exclude filtering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct AreaFlags(pub u32);

impl AreaFlags {
    pub const NONE: AreaFlags = AreaFlags(0);
    pub const WALK: AreaFlags = AreaFlags(0x01);
    pub const SWIM: AreaFlags = AreaFlags(0x02);
    pub const DOOR: AreaFlags = AreaFlags(0x04);
    pub const JUMP: AreaFlags = AreaFlags(0x08);
    pub const LADDER: AreaFlags = AreaFlags(0x10);
    pub const DISABLED: AreaFlags = AreaFlags(0x20);
    pub const ALL: AreaFlags = AreaFlags(0x03ff_ffff);

    pub fn contains(&self, other: AreaFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(&self, other: AreaFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: AreaFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: AreaFlags) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for AreaFlags {
    type Output = AreaFlags;

    fn bitor(self, rhs: AreaFlags) -> AreaFlags {
        AreaFlags(self.0 | rhs.0)
    }
}

/// Area classification packed into one word: the low bits hold the area
/// type, the remaining bits hold [`AreaFlags`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct AreaAnnotation(pub u32);

impl AreaAnnotation {
    /// Creates an annotation from an area type and flags
    pub const fn new(area_type: u8, flags: AreaFlags) -> Self {
        Self((area_type as u32 & AREA_TYPE_MASK) | ((flags.0 & (u32::MAX >> AREA_TYPE_BITS)) << AREA_TYPE_BITS))
    }

    /// Plain walkable ground of area type 0
    pub const fn walkable() -> Self {
        Self::new(0, AreaFlags::WALK)
    }

    pub const fn area_type(self) -> u8 {
        (self.0 & AREA_TYPE_MASK) as u8
    }

    pub const fn flags(self) -> AreaFlags {
        AreaFlags(self.0 >> AREA_TYPE_BITS)
    }
}

impl fmt::Display for AreaAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "area {} flags {:#x}", self.area_type(), self.flags().0)
    }
}
