//! Collapses a recorded graph to a requested depth and emits a diagram.
//!
//! The [`Renderer`] selects every node whose depth does not exceed the
//! render depth, lifts edges that cross the collapse boundary up to their
//! nearest retained ancestors, and drives a pluggable [`Surface`] with an
//! ordered stream of node/edge/group commands. [`DotSurface`] receives that
//! stream for graphviz output, [`Styler`] supplies the visual attributes.

mod dot;
mod style;

pub use dot::{
    make_dot, render_network, DotGraph, DotSurface, OutputFormat, RenderOptions,
};
pub use style::{GraphvizStyler, StyleMap, Styler};

use std::collections::{BTreeMap, HashSet};

use crate::node::NodeId;
use crate::recorder::Recorder;

/// Receiver of the renderer's emission stream.
///
/// Commands arrive in emission order: a group's member nodes are emitted
/// between its `open_group` and `close_group`, member edges after the member
/// nodes. An edge's `ancestors_up` names the diagram context it belongs to:
/// 0 is the innermost open group, each step walks one enclosing group out.
pub trait Surface {
    fn node(&mut self, id: NodeId, style: &StyleMap);

    fn edge(&mut self, from: NodeId, to: NodeId, style: &StyleMap, ancestors_up: usize);

    /// Opens a nested sub-diagram for a collapsed layer scope.
    /// `node_defaults` are attributes applied to every node in the group.
    fn open_group(&mut self, id: NodeId, style: &StyleMap, node_defaults: &StyleMap);

    fn close_group(&mut self);
}

/// Drives one render pass over a completed [`Recorder`].
///
/// Single-shot: `render` consumes the renderer. Nodes are processed in
/// insertion order through a pending map; a node is removed once it and all
/// its outgoing edges are emitted, so nothing is emitted twice.
pub struct Renderer<'a> {
    rec: &'a Recorder,
    render_depth: i32,
    styler: &'a dyn Styler,
    /// Retained node → lifted edge targets, keyed in insertion order.
    pending: BTreeMap<NodeId, Vec<NodeId>>,
}

impl<'a> Renderer<'a> {
    pub fn new(rec: &'a Recorder, render_depth: i32, styler: &'a dyn Styler) -> Renderer<'a> {
        Renderer {
            rec,
            // The root context sits at depth -1 and never renders.
            render_depth: render_depth.max(0),
            styler,
            pending: BTreeMap::new(),
        }
    }

    pub fn render(mut self, surface: &mut dyn Surface) {
        self.select_nodes();
        self.lift_edges();
        log::debug!(
            "rendering {} of {} nodes at depth {}",
            self.pending.len(),
            self.rec.len() - 1,
            self.render_depth
        );
        while let Some(&id) = self.pending.keys().next() {
            self.emit(surface, id);
            let targets = self
                .pending
                .remove(&id)
                .expect("node emitted from the pending map twice");
            for target in targets {
                let style = self.styler.style_edge(self.rec.node(id), self.rec.node(target));
                surface.edge(id, target, &style, 0);
            }
        }
    }

    /// Retains every non-root node whose depth does not exceed the render
    /// depth, in insertion order.
    fn select_nodes(&mut self) {
        for (id, node) in self.rec.nodes() {
            if id != NodeId::ROOT && node.depth <= self.render_depth {
                self.pending.insert(id, Vec::new());
            }
        }
    }

    /// Replaces each edge endpoint by its nearest retained ancestor, drops
    /// edges whose lifted endpoints coincide, and attaches the surviving
    /// pairs (deduplicated, chronological order preserved) to the lifted
    /// source's emission list.
    fn lift_edges(&mut self) {
        let mut seen = HashSet::new();
        for edge in self.rec.edges() {
            let from = self.lift(edge.from);
            let to = self.lift(edge.to);
            if from == to || !seen.insert((from, to)) {
                continue;
            }
            self.pending
                .get_mut(&from)
                .expect("lifted edge source was not retained")
                .push(to);
        }
    }

    fn lift(&self, mut id: NodeId) -> NodeId {
        while self.rec.node(id).depth > self.render_depth {
            id = self.rec.node(id).parent;
        }
        id
    }

    fn emit(&mut self, surface: &mut dyn Surface, id: NodeId) {
        let node = self.rec.node(id);
        if node.is_layer() && node.depth < self.render_depth {
            self.emit_scope(surface, id);
        } else {
            surface.node(id, &self.styler.style_node(node));
        }
    }

    /// Emits a layer strictly below the render depth as a nested
    /// sub-diagram holding its subnets.
    ///
    /// Member nodes are emitted first, then each member's edges: an edge
    /// whose endpoints share a depth stays in this group, one crossing into
    /// another scope is delegated to the context the depth difference walks
    /// out to. Members are popped as they complete; the layer itself stays
    /// pending for the caller to pop.
    fn emit_scope(&mut self, surface: &mut dyn Surface, id: NodeId) {
        let node = self.rec.node(id);
        let mut style = self.styler.style_node(node);
        style.insert("fillcolor".to_string(), "white".to_string());
        let mut node_defaults = StyleMap::new();
        node_defaults.insert("group".to_string(), node.depth.to_string());
        surface.open_group(id, &style, &node_defaults);

        let members = node.subnets().expect("layer node owns a scope").to_vec();
        for &member in &members {
            self.emit(surface, member);
        }
        for &member in &members {
            let targets = self
                .pending
                .remove(&member)
                .expect("scope member missing from the pending map");
            for target in targets {
                let from_depth = self.rec.node(member).depth;
                let to_depth = self.rec.node(target).depth;
                let style = self
                    .styler
                    .style_edge(self.rec.node(member), self.rec.node(target));
                let up = (from_depth - to_depth).unsigned_abs() as usize;
                surface.edge(member, target, &style, up);
            }
        }
        surface.close_group();
    }
}
