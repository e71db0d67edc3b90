//! Scene graph: hierarchical transform entities and their arena
//!
//! Nodes live in a keyed arena owned by [`SceneGraph`]. Children are
//! owned lists of keys; the parent link is a non-owning key used for
//! upward traversal and detachment, which breaks the parent/child
//! reference cycle while keeping O(depth) ancestor walks.

pub mod graph;
pub mod node;

pub use graph::{NodeKey, SceneGraph};
pub use node::{CameraHandle, MassClass, MeshHandle, Node, NodeDesc, ShapeClass, Tag};

use thiserror::Error;

/// Fatal scene-setup errors surfaced to the caller at startup
///
/// Missing required scene elements are propagated, never silently
/// swallowed; routine tree edits (removing a non-child, destroying a
/// detached node) are defensive no-ops instead and never reach here.
#[derive(Debug, Error)]
pub enum SceneError {
    /// A required named node is absent from the imported scene.
    #[error("scene has no node named `{0}`")]
    MissingNode(String),

    /// The named node exists but carries no camera reference.
    #[error("node `{0}` does not contain a camera reference")]
    MissingCamera(String),

    /// The imported file did not provide a default scene.
    #[error("no default scene present")]
    MissingDefaultScene,
}
