use std::fmt;
use std::ops::Deref;

use crate::tensor::Tensor;

/// A wrapper around a [`Tensor`] indicating it is a learnable parameter of a
/// module. Parameters automatically have `requires_grad` set to `true`.
pub struct Parameter(Tensor);

impl Parameter {
    /// Creates a new parameter from a tensor, enabling gradient tracking.
    pub fn new(tensor: Tensor) -> Self {
        tensor.set_requires_grad(true);
        Parameter(tensor)
    }

    /// Consumes the parameter and returns the underlying tensor.
    pub fn into_inner(self) -> Tensor {
        self.0
    }
}

// Allow accessing the underlying tensor immutably via Deref.
impl Deref for Parameter {
    type Target = Tensor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parameter({:?})", self.0)
    }
}

impl Clone for Parameter {
    /// Cloning a parameter clones the underlying tensor handle (shallow).
    fn clone(&self) -> Self {
        Parameter(self.0.clone())
    }
}
