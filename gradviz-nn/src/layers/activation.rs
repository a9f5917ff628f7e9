use crate::error::NnError;
use crate::forward::Forward;
use crate::module::Module;
use crate::ops;
use crate::tensor::Tensor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationKind {
    Relu,
    Tanh,
}

/// Layer that applies an elementwise activation function.
///
/// Carries its kind as data, so two activation instances are distinct
/// allocations with distinct addresses (a zero-sized layer would give every
/// instance the same identity).
#[derive(Debug, Clone)]
pub struct Activation {
    kind: ActivationKind,
}

impl Activation {
    pub fn relu() -> Self {
        Activation {
            kind: ActivationKind::Relu,
        }
    }

    pub fn tanh() -> Self {
        Activation {
            kind: ActivationKind::Tanh,
        }
    }

    pub fn kind(&self) -> ActivationKind {
        self.kind
    }
}

impl Module for Activation {
    fn forward(&self, _cx: &mut Forward<'_>, inputs: &[Tensor]) -> Result<Vec<Tensor>, NnError> {
        let [x] = inputs else {
            return Err(NnError::InvalidArity {
                layer: self.type_name(),
                expected: 1,
                actual: inputs.len(),
            });
        };
        let y = match self.kind {
            ActivationKind::Relu => ops::relu(x)?,
            ActivationKind::Tanh => ops::tanh(x)?,
        };
        Ok(vec![y])
    }

    fn type_name(&self) -> &'static str {
        match self.kind {
            ActivationKind::Relu => "ReLU",
            ActivationKind::Tanh => "Tanh",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_forward() {
        let act = Activation::relu();
        let x = Tensor::new(vec![-1.0, 2.0], vec![2]).unwrap();
        let y = Forward::new().call(&act, &[x]).unwrap();
        assert_eq!(y[0].data(), vec![0.0, 2.0]);
        assert_eq!(act.type_name(), "ReLU");
        assert_eq!(Activation::tanh().type_name(), "Tanh");
    }
}
