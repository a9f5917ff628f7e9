//! Styles a diagram with a user-defined styler: linear layers get a heavy
//! border, edges out of operations get colored.

use gradviz_core::{
    make_dot, record, GraphvizStyler, InputSource, Node, NodeKind, OutputFormat, RenderOptions,
    StyleMap, Styler,
};
use gradviz_nn::{Activation, Linear, NnError, Sequential};

struct BoldLinears {
    base: GraphvizStyler,
}

impl Styler for BoldLinears {
    fn style_node(&self, node: &Node) -> StyleMap {
        let mut style = self.base.style_node(node);
        if let NodeKind::Layer(layer) = &node.kind {
            if layer.type_name == "Linear" {
                style.insert("penwidth".to_string(), "2.4".to_string());
            }
        }
        style
    }

    fn style_edge(&self, from: &Node, to: &Node) -> StyleMap {
        let mut style = self.base.style_edge(from, to);
        if matches!(from.kind, NodeKind::Op { .. }) && to.is_tensor_like() {
            style.insert("penwidth".to_string(), "4.8".to_string());
            style.insert("color".to_string(), "#ee8800".to_string());
        }
        style
    }
}

fn build_net() -> Result<Sequential, NnError> {
    let mut net = Sequential::new();
    net.add_module("fc1", Box::new(Linear::new(4, 8, true)?));
    net.add_module("act1", Box::new(Activation::relu()));
    net.add_module("fc2", Box::new(Linear::new(8, 2, true)?));
    net.add_module("act2", Box::new(Activation::tanh()));
    Ok(net)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let net = build_net()?;
    let rec = record(&net, "MlpNet", InputSource::Shape(vec![1, 4]))?;

    let styler = BoldLinears {
        base: GraphvizStyler::new(),
    };
    let options = RenderOptions::new().depth(1).fontname("Lato");
    let mut g = make_dot(&rec, &options, &styler);
    g.attr("label", "Custom Styler");
    let path = g.render("renders".as_ref(), "CustomStyler-1", OutputFormat::Dot)?;
    println!("wrote {}", path.display());
    Ok(())
}
