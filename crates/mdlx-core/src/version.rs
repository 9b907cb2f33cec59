// Format revision constants.
//
// Two on-disk revisions exist. They are told apart by the two routine
// sentinels stored at the start of every geometry header, and they differ in
// the size of the mesh header (revision B appends an 8-byte field set).

// =============================================================================
// Geometry header sentinels
// =============================================================================

/// Sentinel pair written into the root geometry header by revision A.
pub const REVISION_A_MODEL_SENTINELS: (u32, u32) = (4_273_776, 4_216_096);

/// Sentinel pair written into animation geometry headers by revision A.
pub const REVISION_A_ANIMATION_SENTINELS: (u32, u32) = (4_273_392, 4_451_552);

/// Sentinel pair written into the root geometry header by revision B.
pub const REVISION_B_MODEL_SENTINELS: (u32, u32) = (4_285_200, 4_216_320);

/// Sentinel pair written into animation geometry headers by revision B.
pub const REVISION_B_ANIMATION_SENTINELS: (u32, u32) = (4_284_976, 4_216_480);

// =============================================================================
// Payload routine sentinels (written on encode, ignored on decode)
// =============================================================================

const REVISION_A_MESH_SENTINELS: (u32, u32) = (4_216_656, 4_216_672);
const REVISION_B_MESH_SENTINELS: (u32, u32) = (4_216_880, 4_216_896);
const REVISION_A_SKIN_SENTINELS: (u32, u32) = (4_216_592, 4_216_608);
const REVISION_B_SKIN_SENTINELS: (u32, u32) = (4_216_816, 4_216_832);
const REVISION_A_DANGLY_SENTINELS: (u32, u32) = (4_216_640, 4_216_624);
const REVISION_B_DANGLY_SENTINELS: (u32, u32) = (4_216_864, 4_216_848);

// =============================================================================
// Revision-dependent sizes
// =============================================================================

/// Mesh header size shared by both revisions.
pub const MESH_HEADER_BASE_SIZE: usize = 332;

/// Bytes revision B appends to the mesh header.
pub const MESH_HEADER_REVISION_B_EXTENSION: usize = 8;

/// On-disk format revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Revision {
    /// The original layout.
    A,
    /// The newer layout with the extended mesh header.
    #[default]
    B,
}

impl Revision {
    /// Resolves a revision from a geometry header sentinel pair.
    ///
    /// Both the model and the animation pairs of each revision are recognized.
    /// Anything else resolves to the newer revision.
    pub fn detect(sentinels: (u32, u32)) -> Self {
        if sentinels == REVISION_A_MODEL_SENTINELS || sentinels == REVISION_A_ANIMATION_SENTINELS {
            Revision::A
        } else {
            Revision::B
        }
    }

    /// Returns true when `sentinels` is one of the four known pairs.
    pub fn is_known_sentinel_pair(sentinels: (u32, u32)) -> bool {
        [
            REVISION_A_MODEL_SENTINELS,
            REVISION_A_ANIMATION_SENTINELS,
            REVISION_B_MODEL_SENTINELS,
            REVISION_B_ANIMATION_SENTINELS,
        ]
        .contains(&sentinels)
    }

    pub fn model_sentinels(self) -> (u32, u32) {
        match self {
            Revision::A => REVISION_A_MODEL_SENTINELS,
            Revision::B => REVISION_B_MODEL_SENTINELS,
        }
    }

    pub fn animation_sentinels(self) -> (u32, u32) {
        match self {
            Revision::A => REVISION_A_ANIMATION_SENTINELS,
            Revision::B => REVISION_B_ANIMATION_SENTINELS,
        }
    }

    pub fn mesh_sentinels(self) -> (u32, u32) {
        match self {
            Revision::A => REVISION_A_MESH_SENTINELS,
            Revision::B => REVISION_B_MESH_SENTINELS,
        }
    }

    pub fn skin_sentinels(self) -> (u32, u32) {
        match self {
            Revision::A => REVISION_A_SKIN_SENTINELS,
            Revision::B => REVISION_B_SKIN_SENTINELS,
        }
    }

    pub fn dangly_sentinels(self) -> (u32, u32) {
        match self {
            Revision::A => REVISION_A_DANGLY_SENTINELS,
            Revision::B => REVISION_B_DANGLY_SENTINELS,
        }
    }

    /// Whether the mesh header carries the revision B field set.
    #[inline]
    pub fn has_mesh_extension(self) -> bool {
        self == Revision::B
    }

    /// Size in bytes of the mesh header for this revision.
    #[inline]
    pub fn mesh_header_size(self) -> usize {
        if self.has_mesh_extension() {
            MESH_HEADER_BASE_SIZE + MESH_HEADER_REVISION_B_EXTENSION
        } else {
            MESH_HEADER_BASE_SIZE
        }
    }
}
