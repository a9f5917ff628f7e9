use gradviz_nn::NnError;
use thiserror::Error;

/// Errors raised while recording a forward pass.
///
/// Nothing here is retried: a failed trace is abandoned, after hook teardown
/// has run.
#[derive(Error, Debug)]
pub enum RecordError {
    /// The entity matches none of the recordable shapes.
    #[error("cannot create a node for {what}")]
    UnrecordableEntity { what: String },

    /// The identity is already registered; callers check membership first.
    #[error("identity already registered for {what}")]
    DuplicateNode { what: String },

    /// An edge referenced the root context sentinel.
    #[error("cannot draw an edge involving the root context")]
    InvalidEdge,

    /// A traversal referenced an identity that was never recorded.
    #[error("identity was never recorded: {what}")]
    MissingNode { what: String },

    /// The traced forward pass itself failed.
    #[error("forward pass failed")]
    Forward(#[from] NnError),
}

/// Errors raised while rendering a recorded graph to an artifact.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("failed to write diagram output")]
    Io(#[from] std::io::Error),

    #[error("could not launch the graphviz `dot` executable")]
    GraphvizLaunch(#[source] std::io::Error),

    #[error("graphviz failed: {stderr}")]
    GraphvizFailed { stderr: String },
}
