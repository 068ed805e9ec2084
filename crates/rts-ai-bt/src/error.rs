use thiserror::Error;

/// A [`crate::TreeSnapshot`] does not describe the tree it is being restored into.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("snapshot is for tree type `{found}`, expected `{expected}`")]
    TreeTypeMismatch { expected: String, found: String },
    #[error("snapshot has {found} nodes, tree has {expected}")]
    ShapeMismatch { expected: usize, found: usize },
    #[error("node {index} is `{expected}` in the tree but `{found}` in the snapshot")]
    NodeMismatch {
        index: usize,
        expected: String,
        found: String,
    },
}
