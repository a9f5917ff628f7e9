//! Nodes of the recording graph.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use gradviz_nn::{step_id, GradFn, Module, Parameter, Tensor};

/// Object identity of a traced entity.
///
/// Pairs the entity's address with a tag for its role (and, for layers, the
/// concrete type): a struct and its first field share an address in Rust, so
/// a network and its first sub-layer would collide on the address alone.
/// The distinguished root context uses the null sentinel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TraceKey {
    addr: usize,
    tag: KeyTag,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum KeyTag {
    Root,
    Module(TypeId),
    Tensor,
    Step,
}

impl TraceKey {
    /// The none-sentinel identity of the root context.
    pub fn root() -> TraceKey {
        TraceKey {
            addr: 0,
            tag: KeyTag::Root,
        }
    }

    pub fn of_module(module: &dyn Module) -> TraceKey {
        TraceKey {
            addr: module as *const dyn Module as *const () as usize,
            tag: KeyTag::Module(module.type_id()),
        }
    }

    pub fn of_tensor(tensor: &Tensor) -> TraceKey {
        TraceKey {
            addr: tensor.id(),
            tag: KeyTag::Tensor,
        }
    }

    pub fn of_step(step: &Rc<GradFn>) -> TraceKey {
        TraceKey {
            addr: step_id(step),
            tag: KeyTag::Step,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self.tag, KeyTag::Root)
    }
}

/// Integer handle into the recorder's node arena. Handles are assigned in
/// insertion order, so ordering by handle is ordering by registration time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The root context node, always arena slot 0.
    pub const ROOT: NodeId = NodeId(0);

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Token for one live interception registration on a layer. Present while
/// the layer's callbacks are installed, taken at teardown.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct HookHandle(pub(crate) u32);

/// A traced entity handed to the recorder, dispatched by role.
pub enum Entity<'a> {
    Layer(&'a dyn Module),
    Tensor(&'a Tensor),
    Param(&'a Parameter),
    Op(&'a Rc<GradFn>),
}

impl Entity<'_> {
    pub fn key(&self) -> TraceKey {
        match self {
            Entity::Layer(module) => TraceKey::of_module(*module),
            Entity::Tensor(tensor) => TraceKey::of_tensor(tensor),
            Entity::Param(param) => TraceKey::of_tensor(param),
            Entity::Op(step) => TraceKey::of_step(step),
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Entity::Layer(module) => format!("layer {}", module.type_name()),
            Entity::Tensor(tensor) => format!("tensor of shape {:?}", tensor.shape()),
            Entity::Param(param) => format!("parameter of shape {:?}", param.shape()),
            Entity::Op(step) => format!("operation {}", step.name()),
        }
    }
}

/// Extra state carried by a layer's node.
pub struct LayerNode {
    pub type_name: &'static str,
    /// Handles of the entities whose scope is this layer, in registration
    /// order.
    pub subnets: Vec<NodeId>,
    pub(crate) pre: Option<HookHandle>,
    pub(crate) post: Option<HookHandle>,
}

impl LayerNode {
    pub fn hooks_attached(&self) -> bool {
        self.pre.is_some() || self.post.is_some()
    }
}

pub enum NodeKind {
    /// The distinguished context seeding the hierarchy: depth −1, its own
    /// parent.
    Root { subnets: Vec<NodeId> },
    Layer(LayerNode),
    Tensor { tensor: Tensor },
    /// A learned parameter; tensor-like for styling purposes.
    Param { tensor: Tensor },
    Op { step: Rc<GradFn> },
}

/// One traced entity and its place in the scope hierarchy.
///
/// Tensor-like and operation nodes own a handle to the traced object, which
/// both pins its address for the lifetime of the recorder and supplies the
/// shape for labels.
pub struct Node {
    pub name: String,
    pub depth: i32,
    pub parent: NodeId,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_layer(&self) -> bool {
        matches!(self.kind, NodeKind::Layer(_))
    }

    pub fn is_tensor_like(&self) -> bool {
        matches!(self.kind, NodeKind::Tensor { .. } | NodeKind::Param { .. })
    }

    pub fn as_layer(&self) -> Option<&LayerNode> {
        match &self.kind {
            NodeKind::Layer(layer) => Some(layer),
            _ => None,
        }
    }

    /// Shape of the wrapped tensor, for tensor-like nodes.
    pub fn shape(&self) -> Option<Vec<usize>> {
        match &self.kind {
            NodeKind::Tensor { tensor } | NodeKind::Param { tensor } => Some(tensor.shape()),
            _ => None,
        }
    }

    /// The scope members of a root or layer node.
    pub fn subnets(&self) -> Option<&[NodeId]> {
        match &self.kind {
            NodeKind::Root { subnets } => Some(subnets),
            NodeKind::Layer(layer) => Some(&layer.subnets),
            _ => None,
        }
    }

    pub(crate) fn subnets_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match &mut self.kind {
            NodeKind::Root { subnets } => Some(subnets),
            NodeKind::Layer(layer) => Some(&mut layer.subnets),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Root { .. } => "Root",
            NodeKind::Layer(_) => "Layer",
            NodeKind::Tensor { .. } => "Tensor",
            NodeKind::Param { .. } => "Param",
            NodeKind::Op { .. } => "Op",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(depth={}, kind={}, parent=n{})",
            self.name.replace('\n', " "),
            self.depth,
            self.kind_name(),
            self.parent.as_u32()
        )
    }
}
