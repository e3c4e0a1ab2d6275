use thiserror::Error;

use crate::target::NodeId;

/// Failure reported by a [`RenderTarget`](crate::RenderTarget).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("node {id} missing")]
    Missing { id: NodeId },
    #[error("node {id} cannot hold children")]
    NotAContainer { id: NodeId },
    #[error("node {child} is not a child of node {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("target rejected mutation: {0}")]
    Rejected(String),
}

/// Fatal error of a render pass.
///
/// The failing pass is abandoned; the last committed tree stays current.
/// Passes are never retried automatically because hook state has already
/// advanced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("invalid element: {reason}")]
    InvalidElement { reason: &'static str },
    #[error("state update requested a render before any root was committed")]
    NoActiveRoot,
    #[error("render target rejected a mutation: {0}")]
    TargetMutation(#[from] TargetError),
}
