use std::collections::BTreeMap;

use crate::node::{Node, NodeKind};

/// Visual attributes attached to one node, edge or group, keyed by graphviz
/// attribute name. Sorted so emitted documents are deterministic.
pub type StyleMap = BTreeMap<String, String>;

/// Maps nodes and edges to visual attributes.
///
/// Implementations can key off the node variant, name or tensor shape; the
/// returned map is handed to the surface verbatim.
pub trait Styler {
    fn style_node(&self, node: &Node) -> StyleMap;

    fn style_edge(&self, _from: &Node, _to: &Node) -> StyleMap {
        StyleMap::new()
    }
}

/// The default styling: filled nodes with one fill color per node variant,
/// boxes for operations and layers, labels carrying the node name (tensors
/// and parameters append their shape).
pub struct GraphvizStyler {
    base: StyleMap,
}

impl GraphvizStyler {
    pub fn new() -> GraphvizStyler {
        GraphvizStyler::with_attrs(&StyleMap::new())
    }

    /// A styler whose base attributes are extended (and overridden) by
    /// `attrs`, applied uniformly to every node.
    pub fn with_attrs(attrs: &StyleMap) -> GraphvizStyler {
        let mut base = StyleMap::new();
        base.insert("style".to_string(), "filled".to_string());
        base.insert("color".to_string(), "black".to_string());
        for (key, value) in attrs {
            base.insert(key.clone(), value.clone());
        }
        GraphvizStyler { base }
    }
}

impl Default for GraphvizStyler {
    fn default() -> Self {
        GraphvizStyler::new()
    }
}

impl Styler for GraphvizStyler {
    fn style_node(&self, node: &Node) -> StyleMap {
        let mut style = self.base.clone();
        let (fill, shape) = match &node.kind {
            NodeKind::Tensor { .. } => (Some("lightblue"), None),
            NodeKind::Param { .. } => (Some("darkolivegreen"), None),
            NodeKind::Op { .. } => (Some("orange"), Some("box")),
            NodeKind::Layer(_) => (Some("lightgrey"), Some("box")),
            NodeKind::Root { .. } => (None, None),
        };
        if let Some(fill) = fill {
            style.insert("fillcolor".to_string(), fill.to_string());
        }
        if let Some(shape) = shape {
            style.insert("shape".to_string(), shape.to_string());
        }
        let label = match node.shape() {
            Some(dims) => format!("{}\n{:?}", node.name, dims),
            None => node.name.clone(),
        };
        style.insert("label".to_string(), label);
        style
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;
    use gradviz_nn::zeros;

    fn tensor_node(name: &str) -> Node {
        Node {
            name: name.to_string(),
            depth: 0,
            parent: NodeId::ROOT,
            kind: NodeKind::Tensor {
                tensor: zeros(&[1, 3]).unwrap(),
            },
        }
    }

    #[test]
    fn test_tensor_label_appends_shape() {
        let styler = GraphvizStyler::new();
        let style = styler.style_node(&tensor_node("Input"));
        assert_eq!(style.get("label").unwrap(), "Input\n[1, 3]");
        assert_eq!(style.get("fillcolor").unwrap(), "lightblue");
        assert_eq!(style.get("style").unwrap(), "filled");
        assert_eq!(style.get("shape"), None);
    }

    #[test]
    fn test_param_and_op_colors_differ() {
        let styler = GraphvizStyler::new();
        let t = zeros(&[2]).unwrap();
        let param = Node {
            name: "weight".to_string(),
            depth: 2,
            parent: NodeId::ROOT,
            kind: NodeKind::Param { tensor: t },
        };
        let style = styler.style_node(&param);
        assert_eq!(style.get("fillcolor").unwrap(), "darkolivegreen");
        assert_eq!(style.get("label").unwrap(), "weight\n[2]");
    }

    #[test]
    fn test_uniform_attrs_apply_to_every_node() {
        let mut attrs = StyleMap::new();
        attrs.insert("penwidth".to_string(), "2.0".to_string());
        let styler = GraphvizStyler::with_attrs(&attrs);
        let style = styler.style_node(&tensor_node("Tensor"));
        assert_eq!(style.get("penwidth").unwrap(), "2.0");
    }

    #[test]
    fn test_default_edge_style_is_empty() {
        let styler = GraphvizStyler::new();
        let a = tensor_node("a");
        let b = tensor_node("b");
        assert!(styler.style_edge(&a, &b).is_empty());
    }
}
