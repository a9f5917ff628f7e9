use std::any::Any;
use std::fmt::Debug;

use crate::error::NnError;
use crate::forward::Forward;
use crate::parameter::Parameter;
use crate::tensor::Tensor;

/// The base trait for all network modules (layers, containers, networks).
///
/// A module's `forward` receives the call context threaded through the whole
/// pass; nested layer invocations must go through [`Forward::call`] so the
/// interception machinery observes them. Enumeration methods expose only the
/// *direct* children and parameters: recursion over the hierarchy is the
/// caller's job, which lets each level be attributed to its own scope.
///
/// The [`Any`] supertrait exposes the concrete type of a `dyn Module`, which
/// instrumentation pairs with the module's address to form a stable identity
/// (a struct and its first field can share an address).
pub trait Module: Any + Debug {
    /// Performs a forward pass of the module.
    fn forward(&self, cx: &mut Forward<'_>, inputs: &[Tensor]) -> Result<Vec<Tensor>, NnError>;

    /// Direct child modules with their field names.
    fn named_children(&self) -> Vec<(String, &dyn Module)> {
        Vec::new()
    }

    /// Directly owned parameters with their declared names.
    fn named_parameters(&self) -> Vec<(String, &Parameter)> {
        Vec::new()
    }

    /// Display name of the module type.
    fn type_name(&self) -> &'static str;
}
