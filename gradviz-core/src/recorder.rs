//! Uses forward hooks to record the traversal of the execution graph.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::{Duration, Instant};

use gradviz_nn::{ForwardHooks, GradFn, Module, NnError, Tensor};

use crate::error::RecordError;
use crate::node::{Entity, HookHandle, LayerNode, Node, NodeId, NodeKind, TraceKey};

/// A recorded data-flow edge: data produced by `from` was consumed to
/// produce `to`. `at` is the elapsed time since the first edge of the trace,
/// for stable chronological ordering.
#[derive(Clone, Copy, Debug)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub at: Duration,
}

/// Objects whose identities were aliased onto existing nodes. Holding them
/// keeps their addresses from being recycled while the recorder lives.
enum Pinned {
    Tensor(Tensor),
    Step(Rc<GradFn>),
}

/// Records and stores execution graph information for one forward pass.
///
/// The recorder owns the node arena, the identity index, the edge set and
/// the hook dispatch table. It is populated exclusively by the interception
/// callbacks and the recording driver; once the pass completes it is only
/// read from.
pub struct Recorder {
    arena: Vec<Node>,
    index: HashMap<TraceKey, NodeId>,
    /// Occurrence count per type name, for default-name disambiguation.
    type_counts: HashMap<String, usize>,
    edges: Vec<Edge>,
    edge_set: HashSet<(NodeId, NodeId)>,
    /// Live interception registrations: layer identity → layer node.
    hooks: HashMap<TraceKey, NodeId>,
    next_handle: u32,
    /// Armed by the first edge; defines t = 0 for edge timestamps.
    epoch: Option<Instant>,
    pins: Vec<Pinned>,
}

impl Recorder {
    /// Creates an empty recorder seeded with the root context node.
    pub fn new() -> Recorder {
        let mut rec = Recorder {
            arena: Vec::new(),
            index: HashMap::new(),
            type_counts: HashMap::new(),
            edges: Vec::new(),
            edge_set: HashSet::new(),
            hooks: HashMap::new(),
            next_handle: 0,
            epoch: None,
            pins: Vec::new(),
        };
        rec.arena.push(Node {
            name: "Context".to_string(),
            depth: -1,
            parent: NodeId::ROOT,
            kind: NodeKind::Root {
                subnets: Vec::new(),
            },
        });
        rec.index.insert(TraceKey::root(), NodeId::ROOT);
        rec
    }

    pub fn contains(&self, key: TraceKey) -> bool {
        self.index.contains_key(&key)
    }

    pub fn lookup(&self, key: TraceKey) -> Option<NodeId> {
        self.index.get(&key).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.arena[id.index()]
    }

    /// Nodes in insertion order, root included.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.arena
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        // The root context is always present.
        self.arena.len() <= 1
    }

    /// Recorded edges in chronological order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Constructs a node of the recording graph for `entity`.
    ///
    /// The node variant is chosen by the entity's role. The default name is
    /// the entity's type name, suffixed with a running occurrence counter
    /// when that type name recurs and no explicit name is given; an
    /// explicitly named layer below the top level keeps its type name as a
    /// sub-label. If `parent` is a scope node, it gains this node as a
    /// subnet member.
    ///
    /// Idempotency is the caller's responsibility: re-registering a known
    /// identity is rejected, never silently duplicated.
    pub fn add_node(
        &mut self,
        entity: Entity<'_>,
        depth: i32,
        parent: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, RecordError> {
        let key = entity.key();
        if self.index.contains_key(&key) {
            return Err(RecordError::DuplicateNode {
                what: entity.describe(),
            });
        }
        let type_name = match &entity {
            Entity::Layer(module) => module.type_name().to_string(),
            Entity::Tensor(_) => "Tensor".to_string(),
            Entity::Param(_) => "Parameter".to_string(),
            Entity::Op(step) => {
                if step.is_accumulate() {
                    // A pass-through terminal is not a computational step;
                    // it must be aliased via `add_dummy`, never recorded.
                    return Err(RecordError::UnrecordableEntity {
                        what: entity.describe(),
                    });
                }
                step.name().to_string()
            }
        };
        let count = self.type_counts.entry(type_name.clone()).or_insert(0);
        *count += 1;
        let node_name = match name {
            Some(given) if depth > 0 && matches!(entity, Entity::Layer(_)) => {
                format!("{given}\n({type_name})")
            }
            Some(given) => given.to_string(),
            None if *count > 1 => format!("{type_name}-{count}"),
            None => type_name,
        };
        let kind = match &entity {
            Entity::Layer(module) => NodeKind::Layer(LayerNode {
                type_name: module.type_name(),
                subnets: Vec::new(),
                pre: None,
                post: None,
            }),
            Entity::Tensor(tensor) => NodeKind::Tensor {
                tensor: (*tensor).clone(),
            },
            Entity::Param(param) => {
                let tensor: &Tensor = param;
                NodeKind::Param {
                    tensor: tensor.clone(),
                }
            }
            Entity::Op(step) => NodeKind::Op {
                step: (*step).clone(),
            },
        };
        let id = NodeId(self.arena.len() as u32);
        self.arena.push(Node {
            name: node_name,
            depth,
            parent,
            kind,
        });
        self.index.insert(key, id);
        self.scope_mut(parent).push(id);
        if matches!(entity, Entity::Layer(_)) {
            self.attach_hooks(id, key);
        }
        Ok(id)
    }

    /// Points a throwaway identity at the node of an already-recorded one.
    ///
    /// Used for entities that exist only to preserve a reference trail
    /// (detached stand-ins and accumulate terminals) and must not appear as
    /// distinct nodes.
    pub fn add_dummy(&mut self, dummy: Entity<'_>, real: TraceKey) -> Result<(), RecordError> {
        let id = self.lookup(real).ok_or_else(|| RecordError::MissingNode {
            what: format!("{real:?}"),
        })?;
        match &dummy {
            Entity::Tensor(tensor) => self.pins.push(Pinned::Tensor((*tensor).clone())),
            Entity::Param(param) => {
                let tensor: &Tensor = param;
                self.pins.push(Pinned::Tensor(tensor.clone()));
            }
            Entity::Op(step) => self.pins.push(Pinned::Step((*step).clone())),
            Entity::Layer(_) => {}
        }
        self.index.insert(dummy.key(), id);
        Ok(())
    }

    /// Constructs an edge of the recording graph.
    ///
    /// Fails fast when an endpoint is the root sentinel; re-adding an
    /// existing pair is a no-op. The first edge arms the trace clock.
    pub fn add_edge(&mut self, from: TraceKey, to: TraceKey) -> Result<(), RecordError> {
        if from.is_root() || to.is_root() {
            return Err(RecordError::InvalidEdge);
        }
        let from = self.lookup(from).ok_or_else(|| RecordError::MissingNode {
            what: format!("{from:?}"),
        })?;
        let to = self.lookup(to).ok_or_else(|| RecordError::MissingNode {
            what: format!("{to:?}"),
        })?;
        if !self.edge_set.insert((from, to)) {
            return Ok(());
        }
        let at = match self.epoch {
            Some(epoch) => epoch.elapsed(),
            None => {
                self.epoch = Some(Instant::now());
                Duration::ZERO
            }
        };
        self.edges.push(Edge { from, to, at });
        Ok(())
    }

    /// Registers interception recursively over a layer hierarchy.
    ///
    /// Every layer gets a node at its nesting depth and a pre/post
    /// registration record in the dispatch table. A layer whose identity is
    /// already known (a module shared between two parents) is skipped.
    pub fn register_hooks(
        &mut self,
        net: &dyn Module,
        depth: i32,
        parent: NodeId,
        name: Option<&str>,
    ) -> Result<(), RecordError> {
        let key = TraceKey::of_module(net);
        if self.index.contains_key(&key) {
            log::warn!(
                "layer {} already registered, skipping re-registration",
                net.type_name()
            );
            return Ok(());
        }
        let id = self.add_node(Entity::Layer(net), depth, parent, name)?;
        for (child_name, child) in net.named_children() {
            self.register_hooks(child, depth + 1, id, Some(&child_name))?;
        }
        Ok(())
    }

    /// Detaches every live interception handle. Called exactly once, after
    /// the traced pass, whether or not the pass succeeded.
    pub fn remove_hooks(&mut self) {
        let mut released = 0;
        for node in &mut self.arena {
            if let NodeKind::Layer(layer) = &mut node.kind {
                if layer.pre.take().is_some() {
                    released += 1;
                }
                if layer.post.take().is_some() {
                    released += 1;
                }
            }
        }
        self.hooks.clear();
        log::debug!("released {released} forward hook handles");
    }

    /// Renames the node recorded for `key` (the driver labels inputs and
    /// outputs through this).
    pub fn rename(&mut self, key: TraceKey, name: &str) -> Result<(), RecordError> {
        let id = self.lookup(key).ok_or_else(|| RecordError::MissingNode {
            what: format!("{key:?}"),
        })?;
        self.arena[id.index()].name = name.to_string();
        Ok(())
    }

    fn scope_mut(&mut self, id: NodeId) -> &mut Vec<NodeId> {
        match self.arena[id.index()].subnets_mut() {
            Some(subnets) => subnets,
            None => panic!("node n{} cannot own a scope", id.as_u32()),
        }
    }

    fn attach_hooks(&mut self, id: NodeId, key: TraceKey) {
        let pre = HookHandle(self.next_handle);
        let post = HookHandle(self.next_handle + 1);
        self.next_handle += 2;
        self.hooks.insert(key, id);
        if let NodeKind::Layer(layer) = &mut self.arena[id.index()].kind {
            layer.pre = Some(pre);
            layer.post = Some(post);
        }
    }

    /// Moves a node into a new scope: depth, parent and both subnet sets
    /// change together, never separately.
    fn reparent(&mut self, id: NodeId, new_parent: NodeId) {
        let old_parent = self.arena[id.index()].parent;
        if let Some(subnets) = self.arena[old_parent.index()].subnets_mut() {
            subnets.retain(|&member| member != id);
        }
        self.scope_mut(new_parent).push(id);
        let node = &mut self.arena[id.index()];
        node.parent = new_parent;
        node.depth -= 1;
        log::debug!(
            "re-parented {} from n{} into n{}",
            node.name.replace('\n', " "),
            old_parent.as_u32(),
            new_parent.as_u32()
        );
    }

    /// Records the chain rooted at `step` into `scope`, memoized by the
    /// identity index.
    ///
    /// Accumulate terminals alias onto the tensor they wrap; interior steps
    /// become operation nodes one level below the scope, with edges added
    /// post-order so every upstream node exists before an edge references
    /// it.
    fn accumulate_ops(&mut self, step: &Rc<GradFn>, scope: NodeId) -> Result<(), RecordError> {
        let key = TraceKey::of_step(step);
        if self.contains(key) {
            return Ok(());
        }
        if step.is_accumulate() {
            let source = step
                .source()
                .ok_or_else(|| RecordError::UnrecordableEntity {
                    what: format!("expired {} terminal", step.name()),
                })?;
            return self.add_dummy(Entity::Op(step), TraceKey::of_tensor(&source));
        }
        let depth = self.node(scope).depth + 1;
        self.add_node(Entity::Op(step), depth, scope, None)?;
        for link in step.upstream() {
            if let Some(upstream) = link {
                self.accumulate_ops(upstream, scope)?;
                self.add_edge(TraceKey::of_step(upstream), key)?;
            }
        }
        Ok(())
    }

    /// The pre-callback body: runs immediately before a registered layer.
    ///
    /// Records the layer's own parameters, attributes whatever ran since the
    /// enclosing scope began to the parent, records the incoming tensors
    /// into the enclosing scope, and hands the layer detached stand-ins so
    /// operations inside it start a fresh chain.
    fn prehook(
        &mut self,
        id: NodeId,
        layer: &dyn Module,
        inputs: Vec<Tensor>,
    ) -> Result<Vec<Tensor>, RecordError> {
        let (depth, parent) = {
            let node = self.node(id);
            (node.depth, node.parent)
        };
        for (name, param) in layer.named_parameters() {
            if self.contains(TraceKey::of_tensor(param)) {
                continue;
            }
            let label = if name.is_empty() {
                None
            } else {
                Some(name.as_str())
            };
            self.add_node(Entity::Param(param), depth + 1, id, label)?;
        }

        let mut staged = Vec::with_capacity(inputs.len());
        for tensor in inputs {
            let key = TraceKey::of_tensor(&tensor);
            let step = tensor.grad_fn();
            if let Some(chain) = &step {
                // The chain predates this layer's scope.
                self.accumulate_ops(chain, parent)?;
            }
            if !self.contains(key) {
                // An input belongs to the enclosing scope, not to the layer
                // about to consume it.
                self.add_node(Entity::Tensor(&tensor), depth, parent, None)?;
            }
            if let Some(chain) = &step {
                self.add_edge(TraceKey::of_step(chain), key)?;
            }
            let leaf = tensor.detach();
            self.add_dummy(Entity::Tensor(&leaf), key)?;
            staged.push(leaf);
        }
        Ok(staged)
    }

    /// The post-callback body: runs immediately after a registered layer.
    ///
    /// A fresh output is recorded into this layer's scope along with the
    /// chain of operations that produced it. An output already claimed by a
    /// nested sub-layer (whose post callback ran first) is lifted back into
    /// the enclosing scope instead.
    fn posthook(&mut self, id: NodeId, outputs: Vec<Tensor>) -> Result<Vec<Tensor>, RecordError> {
        let (depth, parent) = {
            let node = self.node(id);
            (node.depth, node.parent)
        };
        let mut replaced = Vec::with_capacity(outputs.len());
        for tensor in outputs {
            let key = TraceKey::of_tensor(&tensor);
            if let Some(existing) = self.lookup(key) {
                if self.node(existing).parent == id {
                    self.reparent(existing, parent);
                }
                replaced.push(tensor);
                continue;
            }
            let step = tensor.grad_fn();
            self.add_node(Entity::Tensor(&tensor), depth, parent, None)?;
            if let Some(chain) = &step {
                self.accumulate_ops(chain, id)?;
                self.add_edge(TraceKey::of_step(chain), key)?;
            }
            let leaf = tensor.detach();
            self.add_dummy(Entity::Tensor(&leaf), key)?;
            replaced.push(leaf);
        }
        Ok(replaced)
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Recorder::new()
    }
}

impl ForwardHooks for Recorder {
    fn before_forward(
        &mut self,
        layer: &dyn Module,
        inputs: Vec<Tensor>,
    ) -> Result<Vec<Tensor>, NnError> {
        let Some(&id) = self.hooks.get(&TraceKey::of_module(layer)) else {
            return Ok(inputs);
        };
        self.prehook(id, layer, inputs).map_err(NnError::hook)
    }

    fn after_forward(
        &mut self,
        layer: &dyn Module,
        _inputs: &[Tensor],
        outputs: Vec<Tensor>,
    ) -> Result<Vec<Tensor>, NnError> {
        let Some(&id) = self.hooks.get(&TraceKey::of_module(layer)) else {
            return Ok(outputs);
        };
        self.posthook(id, outputs).map_err(NnError::hook)
    }
}
