//! Identifier types for meshes, tiles, faces, islands and transitions
//!
//! Every identifier reserves zero as its invalid value.

use std::fmt;

/// Number of bits for the face index inside a tile
const FACE_INDEX_BITS: u32 = 16;
/// Number of bits for the tile id
const TILE_ID_BITS: u32 = 16;

const FACE_INDEX_MASK: u32 = (1 << FACE_INDEX_BITS) - 1;
const TILE_ID_MASK: u32 = (1 << TILE_ID_BITS) - 1;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(
            feature = "serialization",
            derive(serde::Serialize, serde::Deserialize)
        )]
        pub struct $name(pub u32);

        impl $name {
            /// The reserved invalid value
            pub const INVALID: $name = $name(0);

            /// Creates a new identifier
            #[inline]
            pub const fn new(id: u32) -> Self {
                Self(id)
            }

            /// Gets the raw value
            #[inline]
            pub const fn id(self) -> u32 {
                self.0
            }

            /// Returns true unless this is the reserved invalid value
            #[inline]
            pub const fn is_valid(self) -> bool {
                self.0 != 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identifies one navigation mesh instance
    MeshId
);
define_id!(
    /// Identifies a tile inside a navigation mesh (1-based)
    TileId
);
define_id!(
    /// Local island id, unique inside one navigation mesh
    IslandId
);
define_id!(
    /// Identifies an off-mesh transition (jump, ladder, ...)
    TransitionId
);
define_id!(
    /// External object owning an off-mesh transition
    ObjectId
);
define_id!(
    /// Agent or other entity on whose behalf a query runs
    RequesterId
);

/// Reference to a face of the navigation mesh.
///
/// The tile id lives in the upper bits so the owning tile can be recovered
/// from the face alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct FaceId(pub u32);

impl FaceId {
    /// The reserved invalid value
    pub const INVALID: FaceId = FaceId(0);

    /// Creates a face reference from a tile id and a face index inside it
    #[inline]
    pub const fn new(tile: TileId, index: u16) -> Self {
        Self(((tile.0 & TILE_ID_MASK) << FACE_INDEX_BITS) | (index as u32 & FACE_INDEX_MASK))
    }

    /// Creates a face reference from its raw encoding
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Gets the raw encoding
    #[inline]
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Tile that stores this face
    #[inline]
    pub const fn tile(self) -> TileId {
        TileId((self.0 >> FACE_INDEX_BITS) & TILE_ID_MASK)
    }

    /// Index of the face inside its tile
    #[inline]
    pub const fn index(self) -> u16 {
        (self.0 & FACE_INDEX_MASK) as u16
    }

    /// A face is valid when it belongs to a valid tile
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.tile().is_valid()
    }
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tile().0, self.index())
    }
}

/// Island reference that is unique across all navigation meshes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct GlobalIslandId {
    pub mesh: MeshId,
    pub island: IslandId,
}

impl GlobalIslandId {
    pub const INVALID: GlobalIslandId = GlobalIslandId::new(MeshId::INVALID, IslandId::INVALID);

    /// Creates a new global island reference
    #[inline]
    pub const fn new(mesh: MeshId, island: IslandId) -> Self {
        Self { mesh, island }
    }

    /// Both the mesh and the local island must be valid
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.mesh.is_valid() && self.island.is_valid()
    }
}

impl fmt::Display for GlobalIslandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.mesh, self.island)
    }
}
