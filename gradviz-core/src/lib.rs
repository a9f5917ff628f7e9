//! Records the execution graph of one neural-network forward pass and
//! renders it as a depth-collapsible graphviz diagram.
//!
//! A [`Recorder`] hooks into every layer call of a [`gradviz_nn::Module`],
//! intercepts the tensors flowing through and their backward-operation
//! chains, and incrementally builds a typed, scoped graph while the network
//! runs forward exactly once. The completed graph is then collapsed to a
//! requested depth and emitted through a pluggable surface.
//!
//! ```no_run
//! use gradviz_core::{render_network, InputSource, OutputFormat, RenderOptions};
//! use gradviz_nn::{Activation, Linear, Sequential};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut net = Sequential::new();
//! net.add_module("fc", Box::new(Linear::new(3, 2, true)?));
//! net.add_module("act", Box::new(Activation::relu()));
//!
//! let options = RenderOptions::new()
//!     .depth(1)
//!     .format(OutputFormat::Dot)
//!     .directory("renders");
//! render_network(&net, "TinyNet", InputSource::Shape(vec![1, 3]), &options)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod node;
pub mod record;
pub mod recorder;
pub mod render;

pub use error::{RecordError, RenderError};
pub use node::{Entity, LayerNode, Node, NodeId, NodeKind, TraceKey};
pub use record::{record, InputSource};
pub use recorder::{Edge, Recorder};
pub use render::{
    make_dot, render_network, DotGraph, DotSurface, GraphvizStyler, OutputFormat, RenderOptions,
    Renderer, StyleMap, Styler, Surface,
};
