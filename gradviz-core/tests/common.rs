//! Shared fixtures for the integration suites.

use gradviz_core::{NodeId, StyleMap, Surface};
use gradviz_nn::{ops, Activation, Forward, Linear, Module, NnError, Tensor};

/// Two parallel linear branches over the same input, joined by a
/// concatenation, then a third linear layer and an activation.
#[derive(Debug)]
pub struct BranchNet {
    linear_1: Linear,
    linear_2: Linear,
    linear_3: Linear,
    my_special_relu: Activation,
}

impl BranchNet {
    #[allow(dead_code)]
    pub fn new() -> BranchNet {
        BranchNet {
            linear_1: Linear::new(3, 3, true).unwrap(),
            linear_2: Linear::new(3, 3, true).unwrap(),
            linear_3: Linear::new(6, 1, true).unwrap(),
            my_special_relu: Activation::relu(),
        }
    }
}

impl Module for BranchNet {
    fn forward(&self, cx: &mut Forward<'_>, inputs: &[Tensor]) -> Result<Vec<Tensor>, NnError> {
        let x = cx.call(&self.linear_1, inputs)?;
        let y = cx.call(&self.linear_2, inputs)?;
        let z = ops::cat(&[x[0].clone(), y[0].clone()], 1)?;
        let z = cx.call(&self.linear_3, &[z])?;
        cx.call(&self.my_special_relu, &z)
    }

    fn named_children(&self) -> Vec<(String, &dyn Module)> {
        vec![
            ("linear_1".to_string(), &self.linear_1 as &dyn Module),
            ("linear_2".to_string(), &self.linear_2 as &dyn Module),
            ("linear_3".to_string(), &self.linear_3 as &dyn Module),
            (
                "my_special_relu".to_string(),
                &self.my_special_relu as &dyn Module,
            ),
        ]
    }

    fn type_name(&self) -> &'static str {
        "BranchNet"
    }
}

/// A network whose body hands its sublayer's output back untouched.
#[derive(Debug)]
pub struct WrapperNet {
    inner: Linear,
}

impl WrapperNet {
    #[allow(dead_code)]
    pub fn new() -> WrapperNet {
        WrapperNet {
            inner: Linear::new(2, 2, true).unwrap(),
        }
    }
}

impl Module for WrapperNet {
    fn forward(&self, cx: &mut Forward<'_>, inputs: &[Tensor]) -> Result<Vec<Tensor>, NnError> {
        cx.call(&self.inner, inputs)
    }

    fn named_children(&self) -> Vec<(String, &dyn Module)> {
        vec![("inner".to_string(), &self.inner as &dyn Module)]
    }

    fn type_name(&self) -> &'static str {
        "WrapperNet"
    }
}

/// One shared linear layer invoked once per input.
#[derive(Debug)]
pub struct SiameseNet {
    shared: Linear,
}

impl SiameseNet {
    #[allow(dead_code)]
    pub fn new() -> SiameseNet {
        SiameseNet {
            shared: Linear::new(2, 2, true).unwrap(),
        }
    }
}

impl Module for SiameseNet {
    fn forward(&self, cx: &mut Forward<'_>, inputs: &[Tensor]) -> Result<Vec<Tensor>, NnError> {
        let left = cx.call(&self.shared, &inputs[..1])?;
        let right = cx.call(&self.shared, &inputs[1..])?;
        Ok(vec![left[0].clone(), right[0].clone()])
    }

    fn named_children(&self) -> Vec<(String, &dyn Module)> {
        vec![("shared".to_string(), &self.shared as &dyn Module)]
    }

    fn type_name(&self) -> &'static str {
        "SiameseNet"
    }
}

/// Records the renderer's command stream for inspection.
#[derive(Debug, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Command {
    Node(NodeId),
    Edge {
        from: NodeId,
        to: NodeId,
        up: usize,
    },
    Open(NodeId),
    Close,
}

#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingSurface {
    pub commands: Vec<Command>,
}

impl RecordingSurface {
    #[allow(dead_code)]
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                Command::Edge { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    #[allow(dead_code)]
    pub fn emitted_nodes(&self) -> Vec<NodeId> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                Command::Node(id) | Command::Open(id) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn node(&mut self, id: NodeId, _style: &StyleMap) {
        self.commands.push(Command::Node(id));
    }

    fn edge(&mut self, from: NodeId, to: NodeId, _style: &StyleMap, ancestors_up: usize) {
        self.commands.push(Command::Edge {
            from,
            to,
            up: ancestors_up,
        });
    }

    fn open_group(&mut self, id: NodeId, _style: &StyleMap, _defaults: &StyleMap) {
        self.commands.push(Command::Open(id));
    }

    fn close_group(&mut self) {
        self.commands.push(Command::Close);
    }
}
