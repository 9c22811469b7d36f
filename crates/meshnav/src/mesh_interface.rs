//! Boundaries to the collaborators that own the fine mesh and the objects
//! registering off-mesh transitions

use meshnav_common::{AreaAnnotation, FaceId, ObjectId, RequesterId, TransitionId, Vec3};

/// Plain-adjacency neighbour of a face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceNeighbour {
    /// The neighbouring face
    pub face: FaceId,
    /// Annotation of the neighbouring face
    pub annotation: AreaAnnotation,
    /// Sample location where a route enters the neighbour
    pub entry: Vec3,
}

/// Read access to the fine face graph of one navigation mesh
pub trait FaceAdjacency {
    /// Appends every plain-adjacency neighbour of `face` to `out`
    fn collect_neighbours(&self, face: FaceId, out: &mut Vec<FaceNeighbour>);

    /// Annotation of a face, `None` if the face does not exist
    fn face_annotation(&self, face: FaceId) -> Option<AreaAnnotation>;

    /// Representative sample location of a face
    fn face_location(&self, face: FaceId) -> Option<Vec3>;

    /// Start of the face's run in its tile's off-mesh bucket, if it has exits
    fn off_mesh_exit_index(&self, face: FaceId) -> Option<u16>;

    fn is_valid_face(&self, face: FaceId) -> bool {
        self.face_annotation(face).is_some()
    }
}

/// Write access used by the off-mesh link table to keep each face's exit
/// index current
pub trait FaceExitIndex {
    /// Records that `face` has off-mesh exits starting at `first_index`
    fn set_off_mesh_exit(&mut self, face: FaceId, first_index: u16);

    /// Records that `face` no longer has off-mesh exits
    fn clear_off_mesh_exit(&mut self, face: FaceId);
}

/// Resolves the external objects that own off-mesh transitions
pub trait TransitionOwners {
    /// Capability check on the owning object.
    ///
    /// Returns `None` when the object no longer resolves.
    fn can_requester_use(&self, owner: ObjectId, requester: RequesterId) -> Option<bool>;
}

/// Owner lookup that treats every object as live and permissive
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllOwners;

impl TransitionOwners for AcceptAllOwners {
    fn can_requester_use(&self, _owner: ObjectId, _requester: RequesterId) -> Option<bool> {
        Some(true)
    }
}

/// Outcome of checking one off-mesh transition for one requester
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAccess {
    /// The transition may be taken
    Usable,
    /// The owner exists but refuses this requester
    Rejected,
    /// No record or owner resolves any more
    Unresolved,
}

impl TransitionAccess {
    pub fn is_usable(self) -> bool {
        self == TransitionAccess::Usable
    }
}

/// Decides whether a requester may take an off-mesh transition
pub trait TransitionResolver {
    fn resolve(&self, transition: TransitionId, requester: RequesterId) -> TransitionAccess;
}

/// Resolver that accepts every transition
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllTransitions;

impl TransitionResolver for AcceptAllTransitions {
    fn resolve(&self, _transition: TransitionId, _requester: RequesterId) -> TransitionAccess {
        TransitionAccess::Usable
    }
}
