//! Applies a global font and uniform node attributes through the options
//! surface alone, without a custom styler.

use gradviz_core::{render_network, InputSource, OutputFormat, RenderOptions};
use gradviz_nn::{Activation, Linear, Sequential};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut net = Sequential::new();
    net.add_module("fc1", Box::new(Linear::new(3, 5, true)?));
    net.add_module("act", Box::new(Activation::relu()));
    net.add_module("fc2", Box::new(Linear::new(5, 1, false)?));

    let options = RenderOptions::new()
        .depth(1)
        .format(OutputFormat::Dot)
        .directory("renders")
        .file_stem("StyleArgs-1")
        .fontname("Lato")
        .node_attr("penwidth", "1.6")
        .node_attr("margin", "0.15");
    let path = render_network(&net, "StyleArgs", InputSource::Shape(vec![1, 3]), &options)?;
    println!("wrote {}", path.display());
    Ok(())
}
