use crate::error::NnError;
use crate::module::Module;
use crate::tensor::Tensor;

/// Observer of layer invocations.
///
/// A hook sink is consulted immediately before and immediately after each
/// layer body runs. Both callbacks may substitute the tensors flowing
/// through the layer; the substituted values are what the layer (and the
/// caller) actually see, so the instrumentation stays transparent.
pub trait ForwardHooks {
    /// Invoked before `layer` runs with the tensors about to flow in.
    /// Returns the (possibly substituted) inputs handed to the layer body.
    fn before_forward(
        &mut self,
        layer: &dyn Module,
        inputs: Vec<Tensor>,
    ) -> Result<Vec<Tensor>, NnError>;

    /// Invoked after `layer` returned, with the inputs it actually received
    /// and the outputs it produced. Returns the (possibly substituted)
    /// outputs handed back to the caller.
    fn after_forward(
        &mut self,
        layer: &dyn Module,
        inputs: &[Tensor],
        outputs: Vec<Tensor>,
    ) -> Result<Vec<Tensor>, NnError>;
}

/// The call context threaded through a forward pass.
///
/// Every nested layer invocation goes through [`Forward::call`], which is
/// the single dispatch point for the before/after interception: when a hook
/// sink is installed it brackets the layer body, otherwise the call is a
/// plain `forward`. Hook callbacks run strictly within the dynamic extent of
/// the enclosing layer's call, so nested callbacks complete before their
/// enclosing one fires.
pub struct Forward<'h> {
    hooks: Option<&'h mut dyn ForwardHooks>,
}

impl Forward<'static> {
    /// A context without instrumentation.
    pub fn new() -> Forward<'static> {
        Forward { hooks: None }
    }
}

impl Default for Forward<'static> {
    fn default() -> Self {
        Forward::new()
    }
}

impl<'h> Forward<'h> {
    /// A context that routes every layer call through `sink`.
    pub fn with_hooks(sink: &'h mut dyn ForwardHooks) -> Forward<'h> {
        Forward { hooks: Some(sink) }
    }

    /// Invokes `layer` on `inputs`, bracketing the body with the installed
    /// hooks.
    pub fn call(&mut self, layer: &dyn Module, inputs: &[Tensor]) -> Result<Vec<Tensor>, NnError> {
        let staged = match self.hooks.as_deref_mut() {
            Some(sink) => {
                log::trace!("entering {}", layer.type_name());
                sink.before_forward(layer, inputs.to_vec())?
            }
            None => return layer.forward(self, inputs),
        };
        let outputs = layer.forward(self, &staged)?;
        match self.hooks.as_deref_mut() {
            Some(sink) => {
                log::trace!("leaving {}", layer.type_name());
                sink.after_forward(layer, &staged, outputs)
            }
            None => Ok(outputs),
        }
    }
}
