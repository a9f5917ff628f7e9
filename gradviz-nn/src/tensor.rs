use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rand::Rng;
use rand_distr::StandardNormal;

use crate::autograd::GradFn;
use crate::error::NnError;

/// Holds the actual data and metadata for a tensor.
///
/// Shared behind `Rc<RefCell<...>>` so that clones of a [`Tensor`] are cheap
/// handles onto the same cell. The cell address is the tensor's identity for
/// the lifetime of the handle.
pub(crate) struct TensorData {
    pub(crate) data: Vec<f32>,
    pub(crate) shape: Vec<usize>,
    pub(crate) requires_grad: bool,
    pub(crate) grad_fn: Option<Rc<GradFn>>,
    /// Cached terminal chain step handed to operations that consume this
    /// tensor as a tracked leaf. Created at most once so its identity is
    /// stable across chain walks.
    pub(crate) accumulator: Option<Rc<GradFn>>,
}

impl fmt::Debug for TensorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorData")
            .field("shape", &self.shape)
            .field("requires_grad", &self.requires_grad)
            .field("grad_fn_defined", &self.grad_fn.is_some())
            .finish()
    }
}

/// The public, user-facing tensor type: a cheaply clonable handle onto a
/// shared [`TensorData`] cell.
#[derive(Clone)]
pub struct Tensor(pub(crate) Rc<RefCell<TensorData>>);

impl Tensor {
    /// Creates a new tensor from raw data and shape.
    /// Gradient tracking is disabled by default.
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Result<Tensor, NnError> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(NnError::TensorCreation {
                data_len: data.len(),
                shape,
            });
        }
        Ok(Tensor::from_parts(data, shape, false))
    }

    pub(crate) fn from_parts(data: Vec<f32>, shape: Vec<usize>, requires_grad: bool) -> Tensor {
        Tensor(Rc::new(RefCell::new(TensorData {
            data,
            shape,
            requires_grad,
            grad_fn: None,
            accumulator: None,
        })))
    }

    /// Returns the shape of the tensor (cloned).
    pub fn shape(&self) -> Vec<usize> {
        self.0.borrow().shape.clone()
    }

    /// Returns the total number of elements.
    pub fn numel(&self) -> usize {
        self.0.borrow().data.len()
    }

    /// Returns a clone of the underlying data buffer.
    pub fn data(&self) -> Vec<f32> {
        self.0.borrow().data.clone()
    }

    pub fn requires_grad(&self) -> bool {
        self.0.borrow().requires_grad
    }

    /// Enables or disables gradient tracking through interior mutability.
    pub fn set_requires_grad(&self, requires_grad: bool) {
        self.0.borrow_mut().requires_grad = requires_grad;
    }

    /// Returns the chain step that produced this tensor, if any.
    pub fn grad_fn(&self) -> Option<Rc<GradFn>> {
        self.0.borrow().grad_fn.clone()
    }

    /// The tensor's identity: the address of its shared cell. Stable for as
    /// long as any handle to the cell is alive.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// Returns a new tensor with the same data and the same tracking flag
    /// but an empty computation history: no producing step, no cached leaf
    /// terminal. Operations applied afterwards start a fresh chain.
    pub fn detach(&self) -> Tensor {
        let td = self.0.borrow();
        Tensor::from_parts(td.data.clone(), td.shape.clone(), td.requires_grad)
    }

    pub(crate) fn is_tracked(&self) -> bool {
        let td = self.0.borrow();
        td.requires_grad || td.grad_fn.is_some()
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let td = self.0.borrow();
        f.debug_struct("Tensor")
            .field("shape", &td.shape)
            .field("requires_grad", &td.requires_grad)
            .field("grad_fn_defined", &td.grad_fn.is_some())
            .finish()
    }
}

/// Creates a new tensor filled with zeros with the specified shape.
pub fn zeros(shape: &[usize]) -> Result<Tensor, NnError> {
    let numel = shape.iter().product();
    Tensor::new(vec![0.0; numel], shape.to_vec())
}

/// Creates a new tensor filled with ones with the specified shape.
pub fn ones(shape: &[usize]) -> Result<Tensor, NnError> {
    let numel = shape.iter().product();
    Tensor::new(vec![1.0; numel], shape.to_vec())
}

/// Creates a new tensor drawn from the standard normal distribution.
pub fn randn(shape: &[usize]) -> Result<Tensor, NnError> {
    let mut rng = rand::thread_rng();
    let numel = shape.iter().product();
    let data = (0..numel).map(|_| rng.sample(StandardNormal)).collect();
    Tensor::new(data, shape.to_vec())
}
