use thiserror::Error;

/// Custom error type for the gradviz substrate.
#[derive(Error, Debug)]
pub enum NnError {
    #[error("shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: &'static str,
    },

    #[error("incompatible shapes for operation {operation}: {shape1:?} and {shape2:?}")]
    IncompatibleShapes {
        shape1: Vec<usize>,
        shape2: Vec<usize>,
        operation: &'static str,
    },

    #[error("tensor creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreation { data_len: usize, shape: Vec<usize> },

    #[error("invalid axis {axis} for tensor of rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    #[error("cannot concatenate an empty list of tensors")]
    EmptyTensorList,

    #[error("{layer} expects {expected} input tensor(s), got {actual}")]
    InvalidArity {
        layer: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("forward hook failed: {0}")]
    Hook(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl NnError {
    /// Wraps an error raised inside a forward hook so it can propagate
    /// through the layer-call machinery.
    pub fn hook(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        NnError::Hook(Box::new(err))
    }
}
