//! Drives one instrumented forward pass.

use gradviz_nn::{randn, Forward, Module, Tensor};

use crate::error::RecordError;
use crate::node::{Entity, NodeId, TraceKey};
use crate::recorder::Recorder;

/// Where the traced pass gets its input tensors.
pub enum InputSource {
    /// Synthesize one standard-normal input of this shape.
    Shape(Vec<usize>),
    /// Synthesize one standard-normal input per shape.
    Shapes(Vec<Vec<usize>>),
    /// Feed externally supplied tensors (normalized inputs, say).
    Data(Vec<Tensor>),
}

/// Records the execution graph of a single forward pass of `net`.
///
/// Hooks are registered over the whole layer tree, the inputs are recorded
/// at depth 0 under the root (named `Input`, or `Input-i` when there are
/// several), the network runs exactly once, and the resulting tensors are
/// labelled `Output`/`Output-i`. Hook teardown is unconditional: it runs
/// before a failed pass propagates its error.
pub fn record(net: &dyn Module, name: &str, inputs: InputSource) -> Result<Recorder, RecordError> {
    let mut rec = Recorder::new();
    rec.register_hooks(net, 0, NodeId::ROOT, Some(name))?;

    let data = match inputs {
        InputSource::Shape(shape) => vec![randn(&shape)?],
        InputSource::Shapes(shapes) => shapes
            .iter()
            .map(|shape| randn(shape))
            .collect::<Result<Vec<_>, _>>()?,
        InputSource::Data(tensors) => tensors,
    };
    let single_input = data.len() == 1;
    for (i, tensor) in data.iter().enumerate() {
        tensor.set_requires_grad(true);
        let label = if single_input {
            "Input".to_string()
        } else {
            format!("Input-{}", i + 1)
        };
        rec.add_node(Entity::Tensor(tensor), 0, NodeId::ROOT, Some(&label))?;
    }

    let outcome = Forward::with_hooks(&mut rec).call(net, &data);
    rec.remove_hooks();
    let outputs = outcome?;

    let single_output = outputs.len() == 1;
    for (i, tensor) in outputs.iter().enumerate() {
        let label = if single_output {
            "Output".to_string()
        } else {
            format!("Output-{}", i + 1)
        };
        rec.rename(TraceKey::of_tensor(tensor), &label)?;
    }
    log::debug!(
        "recorded {} with {} nodes and {} edges",
        name,
        rec.len() - 1,
        rec.edges().len()
    );
    Ok(rec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use gradviz_nn::{ones, Activation, Linear, NnError, Sequential};

    fn small_net() -> Sequential {
        let mut net = Sequential::new();
        net.add_module("fc", Box::new(Linear::new(3, 2, true).unwrap()));
        net.add_module("act", Box::new(Activation::relu()));
        net
    }

    fn find<'a>(rec: &'a Recorder, name: &str) -> Option<(NodeId, &'a crate::node::Node)> {
        rec.nodes().find(|(_, node)| node.name == name)
    }

    #[test]
    fn test_record_labels_input_and_output() {
        let net = small_net();
        let rec = record(&net, "SmallNet", InputSource::Shape(vec![1, 3])).unwrap();

        let (_, input) = find(&rec, "Input").expect("input node");
        assert_eq!(input.depth, 0);
        assert_eq!(input.parent, NodeId::ROOT);
        assert_eq!(input.shape(), Some(vec![1, 3]));

        let (out_id, output) = find(&rec, "Output").expect("output node");
        // The output was lifted out of the network's scope by the top-level
        // post callback.
        assert_eq!(output.depth, 0);
        assert_eq!(output.parent, NodeId::ROOT);
        assert!(rec.node(NodeId::ROOT).subnets().unwrap().contains(&out_id));

        let (_, top) = find(&rec, "SmallNet").expect("network node");
        assert_eq!(top.depth, 0);
        assert!(top.is_layer());
    }

    #[test]
    fn test_record_tears_hooks_down() {
        let net = small_net();
        let rec = record(&net, "SmallNet", InputSource::Shape(vec![1, 3])).unwrap();
        assert!(rec
            .nodes()
            .filter_map(|(_, node)| node.as_layer())
            .all(|layer| !layer.hooks_attached()));
    }

    #[test]
    fn test_record_accepts_supplied_data() {
        let net = small_net();
        let x = ones(&[2, 3]).unwrap();
        let rec = record(&net, "SmallNet", InputSource::Data(vec![x.clone()])).unwrap();
        assert!(x.requires_grad());
        let (_, input) = find(&rec, "Input").expect("input node");
        assert_eq!(input.shape(), Some(vec![2, 3]));
    }

    #[test]
    fn test_record_numbers_multiple_inputs() {
        // A bare activation accepts only one tensor, so feed a net that
        // consumes two through concatenation.
        #[derive(Debug)]
        struct PairNet {
            fc: Linear,
        }

        impl Module for PairNet {
            fn forward(
                &self,
                cx: &mut Forward<'_>,
                inputs: &[Tensor],
            ) -> Result<Vec<Tensor>, NnError> {
                let joined = gradviz_nn::ops::cat(inputs, 1)?;
                cx.call(&self.fc, &[joined])
            }

            fn named_children(&self) -> Vec<(String, &dyn Module)> {
                vec![("fc".to_string(), &self.fc as &dyn Module)]
            }

            fn type_name(&self) -> &'static str {
                "PairNet"
            }
        }

        let net = PairNet {
            fc: Linear::new(4, 1, false).unwrap(),
        };
        let rec = record(
            &net,
            "PairNet",
            InputSource::Shapes(vec![vec![1, 2], vec![1, 2]]),
        )
        .unwrap();
        assert!(find(&rec, "Input-1").is_some());
        assert!(find(&rec, "Input-2").is_some());
        assert!(find(&rec, "Output").is_some());
        // Parameters of the only linear layer were attributed to it.
        let params = rec
            .nodes()
            .filter(|(_, node)| matches!(node.kind, NodeKind::Param { .. }))
            .count();
        assert_eq!(params, 1);
    }

    #[test]
    fn test_forward_failure_propagates_after_teardown() {
        let net = small_net();
        // Rank-1 input cannot be matrix-multiplied; the pass fails inside
        // the first layer.
        let result = record(&net, "SmallNet", InputSource::Shape(vec![3]));
        assert!(matches!(result, Err(RecordError::Forward(_))));
    }
}
