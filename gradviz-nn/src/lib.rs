//! Minimal single-threaded tensor/module substrate for gradviz.
//!
//! The crate provides exactly what execution tracing needs to observe:
//! tensors carrying a backward-operation chain ([`GradFn`]), modules
//! enumerating their direct children and parameters ([`Module`]), and a
//! before/after interception seam around every layer call
//! ([`Forward`]/[`ForwardHooks`]). No gradients are ever computed; the chain
//! records structure only.

pub mod autograd;
pub mod error;
pub mod forward;
pub mod layers;
pub mod module;
pub mod ops;
pub mod parameter;
pub mod tensor;

pub use autograd::{step_id, GradFn};
pub use error::NnError;
pub use forward::{Forward, ForwardHooks};
pub use layers::{Activation, ActivationKind, Linear, Sequential};
pub use module::Module;
pub use parameter::Parameter;
pub use tensor::{ones, randn, zeros, Tensor};
