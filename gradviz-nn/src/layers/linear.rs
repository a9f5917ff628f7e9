use crate::error::NnError;
use crate::forward::Forward;
use crate::module::Module;
use crate::ops;
use crate::parameter::Parameter;
use crate::tensor::{randn, zeros, Tensor};

/// Applies a linear transformation to the incoming data: `y = x W + b`.
///
/// The weight is stored as `[in_features, out_features]` so the forward pass
/// is a plain matrix product followed by a broadcast bias addition.
#[derive(Debug)]
pub struct Linear {
    weight: Parameter,
    bias: Option<Parameter>,
    in_features: usize,
    out_features: usize,
}

impl Linear {
    /// Creates a new linear layer with randomly initialized weight and a
    /// zero bias when `with_bias` is set.
    pub fn new(in_features: usize, out_features: usize, with_bias: bool) -> Result<Self, NnError> {
        let weight = Parameter::new(randn(&[in_features, out_features])?);
        let bias = if with_bias {
            Some(Parameter::new(zeros(&[out_features])?))
        } else {
            None
        };
        Ok(Linear {
            weight,
            bias,
            in_features,
            out_features,
        })
    }

    /// Builds a layer around explicit weight (rank 2) and bias tensors.
    pub fn with_parameters(weight: Tensor, bias: Option<Tensor>) -> Result<Self, NnError> {
        let shape = weight.shape();
        if shape.len() != 2 {
            return Err(NnError::ShapeMismatch {
                expected: vec![0, 0],
                actual: shape,
                operation: "Linear::with_parameters",
            });
        }
        let (in_features, out_features) = (shape[0], shape[1]);
        if let Some(b) = &bias {
            if b.shape() != [out_features] {
                return Err(NnError::ShapeMismatch {
                    expected: vec![out_features],
                    actual: b.shape(),
                    operation: "Linear::with_parameters",
                });
            }
        }
        Ok(Linear {
            weight: Parameter::new(weight),
            bias: bias.map(Parameter::new),
            in_features,
            out_features,
        })
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }
}

impl Module for Linear {
    fn forward(&self, _cx: &mut Forward<'_>, inputs: &[Tensor]) -> Result<Vec<Tensor>, NnError> {
        let [x] = inputs else {
            return Err(NnError::InvalidArity {
                layer: "Linear",
                expected: 1,
                actual: inputs.len(),
            });
        };
        let mut y = ops::matmul(x, &self.weight)?;
        if let Some(bias) = &self.bias {
            y = ops::add(&y, bias)?;
        }
        Ok(vec![y])
    }

    fn named_parameters(&self) -> Vec<(String, &Parameter)> {
        let mut params = vec![("weight".to_string(), &self.weight)];
        if let Some(bias) = &self.bias {
            params.push(("bias".to_string(), bias));
        }
        params
    }

    fn type_name(&self) -> &'static str {
        "Linear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_creation() {
        let fc = Linear::new(10, 5, true).unwrap();
        assert_eq!(fc.weight.shape(), vec![10, 5]);
        assert!(fc.weight.requires_grad());
        assert_eq!(fc.bias.as_ref().unwrap().shape(), vec![5]);
        assert_eq!(fc.in_features(), 10);
        assert_eq!(fc.out_features(), 5);

        let no_bias = Linear::new(20, 30, false).unwrap();
        assert!(no_bias.bias.is_none());
        assert_eq!(no_bias.named_parameters().len(), 1);
    }

    #[test]
    fn test_linear_forward_values() {
        // [10, 20, 30] @ [[1, 4], [2, 5], [3, 6]] + [0.1, 0.2] = [140.1, 320.2]
        let weight = Tensor::new(vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0], vec![3, 2]).unwrap();
        let bias = Tensor::new(vec![0.1, 0.2], vec![2]).unwrap();
        let fc = Linear::with_parameters(weight, Some(bias)).unwrap();

        let x = Tensor::new(vec![10.0, 20.0, 30.0], vec![1, 3]).unwrap();
        let y = Forward::new().call(&fc, &[x]).unwrap();
        assert_eq!(y.len(), 1);
        let data = y[0].data();
        assert_relative_eq!(data[0], 140.1);
        assert_relative_eq!(data[1], 320.2);
        // Output requires grad because the parameters do.
        assert!(y[0].requires_grad());
    }

    #[test]
    fn test_linear_rejects_bad_arity() {
        let fc = Linear::new(2, 2, false).unwrap();
        let x = Tensor::new(vec![0.0; 2], vec![1, 2]).unwrap();
        let result = Forward::new().call(&fc, &[x.clone(), x]);
        assert!(matches!(
            result,
            Err(NnError::InvalidArity { layer: "Linear", .. })
        ));
    }

    #[test]
    fn test_with_parameters_validates_shapes() {
        let weight = Tensor::new(vec![0.0; 6], vec![6]).unwrap();
        assert!(Linear::with_parameters(weight, None).is_err());

        let weight = Tensor::new(vec![0.0; 6], vec![3, 2]).unwrap();
        let bias = Tensor::new(vec![0.0; 3], vec![3]).unwrap();
        assert!(Linear::with_parameters(weight, Some(bias)).is_err());
    }
}
