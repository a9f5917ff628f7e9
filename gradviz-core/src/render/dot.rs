//! Graphviz surface and output pipeline.
//!
//! [`DotSurface`] receives the renderer's command stream and builds nested
//! `subgraph cluster_*` blocks; [`DotGraph`] is the assembled document,
//! writable as DOT source or handed to the `dot` executable for image
//! formats.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use gradviz_nn::Module;

use crate::error::RenderError;
use crate::node::NodeId;
use crate::record::{record, InputSource};
use crate::recorder::Recorder;
use crate::render::style::{GraphvizStyler, StyleMap, Styler};
use crate::render::{Renderer, Surface};

/// Target artifact of a render.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OutputFormat {
    /// Write the DOT source only; needs no graphviz installation.
    Dot,
    Svg,
    Png,
    Pdf,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Dot => "dot",
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::Pdf => "pdf",
        }
    }
}

/// Configuration of one render call.
#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Nodes deeper than this are collapsed into their enclosing layer.
    pub render_depth: i32,
    pub format: OutputFormat,
    pub directory: PathBuf,
    /// Output file name without extension; defaults to `{name}-{depth}`.
    pub file_stem: Option<String>,
    /// Font applied to the graph and every node.
    pub fontname: Option<String>,
    /// Attributes applied uniformly to every node by the default styler.
    pub node_attrs: StyleMap,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            render_depth: 256,
            format: OutputFormat::Svg,
            directory: PathBuf::from("."),
            file_stem: None,
            fontname: None,
            node_attrs: StyleMap::new(),
        }
    }
}

impl RenderOptions {
    pub fn new() -> RenderOptions {
        RenderOptions::default()
    }

    pub fn depth(mut self, depth: i32) -> RenderOptions {
        self.render_depth = depth;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> RenderOptions {
        self.format = format;
        self
    }

    pub fn directory(mut self, directory: impl Into<PathBuf>) -> RenderOptions {
        self.directory = directory.into();
        self
    }

    pub fn file_stem(mut self, stem: &str) -> RenderOptions {
        self.file_stem = Some(stem.to_string());
        self
    }

    pub fn fontname(mut self, font: &str) -> RenderOptions {
        self.fontname = Some(font.to_string());
        self
    }

    pub fn node_attr(mut self, key: &str, value: &str) -> RenderOptions {
        self.node_attrs.insert(key.to_string(), value.to_string());
        self
    }
}

fn escape_label(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn write_indent(buf: &mut String, level: usize) {
    for _ in 0..level {
        buf.push_str("  ");
    }
}

fn write_attr_list(buf: &mut String, attrs: &StyleMap) {
    for (i, (key, value)) in attrs.iter().enumerate() {
        if i > 0 {
            buf.push_str(", ");
        }
        let _ = write!(buf, "{}=\"{}\"", key, escape_label(value));
    }
}

struct Context {
    buf: String,
    indent: usize,
}

/// Builds the body of a DOT document from the renderer's command stream.
///
/// Groups become `subgraph cluster_*` blocks. Each open group buffers its
/// statements separately so a delegated edge can still land in an enclosing
/// context; closing a group splices its text into the parent.
pub struct DotSurface {
    contexts: Vec<Context>,
}

impl DotSurface {
    pub fn new() -> DotSurface {
        DotSurface {
            contexts: vec![Context {
                buf: String::new(),
                indent: 1,
            }],
        }
    }

    /// The finished document body. All groups must be closed.
    pub fn finish(mut self) -> String {
        let root = self.contexts.pop().expect("root context present");
        debug_assert!(self.contexts.is_empty(), "unclosed group at finish");
        root.buf
    }
}

impl Default for DotSurface {
    fn default() -> Self {
        DotSurface::new()
    }
}

impl Surface for DotSurface {
    fn node(&mut self, id: NodeId, style: &StyleMap) {
        let ctx = self.contexts.last_mut().expect("root context present");
        write_indent(&mut ctx.buf, ctx.indent);
        let _ = write!(ctx.buf, "n{}", id.as_u32());
        if !style.is_empty() {
            ctx.buf.push_str(" [");
            write_attr_list(&mut ctx.buf, style);
            ctx.buf.push(']');
        }
        ctx.buf.push_str(";\n");
    }

    fn edge(&mut self, from: NodeId, to: NodeId, style: &StyleMap, ancestors_up: usize) {
        let idx = self
            .contexts
            .len()
            .checked_sub(1 + ancestors_up)
            .expect("edge delegated past the outermost context");
        let ctx = &mut self.contexts[idx];
        write_indent(&mut ctx.buf, ctx.indent);
        let _ = write!(ctx.buf, "n{} -> n{}", from.as_u32(), to.as_u32());
        if !style.is_empty() {
            ctx.buf.push_str(" [");
            write_attr_list(&mut ctx.buf, style);
            ctx.buf.push(']');
        }
        ctx.buf.push_str(";\n");
    }

    fn open_group(&mut self, id: NodeId, style: &StyleMap, node_defaults: &StyleMap) {
        let indent = self.contexts.last().expect("root context present").indent;
        let mut buf = String::new();
        write_indent(&mut buf, indent);
        let _ = writeln!(buf, "subgraph cluster_n{} {{", id.as_u32());
        for (key, value) in style {
            write_indent(&mut buf, indent + 1);
            let _ = writeln!(buf, "{}=\"{}\";", key, escape_label(value));
        }
        if !node_defaults.is_empty() {
            write_indent(&mut buf, indent + 1);
            buf.push_str("node [");
            write_attr_list(&mut buf, node_defaults);
            buf.push_str("];\n");
        }
        self.contexts.push(Context {
            buf,
            indent: indent + 1,
        });
    }

    fn close_group(&mut self) {
        let child = self.contexts.pop().expect("a group is open");
        let parent = self
            .contexts
            .last_mut()
            .expect("cannot close the root context");
        parent.buf.push_str(&child.buf);
        write_indent(&mut parent.buf, child.indent - 1);
        parent.buf.push_str("}\n");
    }
}

/// An assembled DOT document.
pub struct DotGraph {
    graph_attrs: StyleMap,
    node_attrs: StyleMap,
    body: String,
}

impl DotGraph {
    /// Sets a graph-level attribute (the caption label, for instance).
    pub fn attr(&mut self, key: &str, value: &str) {
        self.graph_attrs.insert(key.to_string(), value.to_string());
    }

    /// The DOT source text.
    pub fn source(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 256);
        out.push_str("digraph {\n");
        for (key, value) in &self.graph_attrs {
            let _ = writeln!(out, "  {}=\"{}\";", key, escape_label(value));
        }
        if !self.node_attrs.is_empty() {
            out.push_str("  node [");
            write_attr_list(&mut out, &self.node_attrs);
            out.push_str("];\n");
        }
        out.push_str(&self.body);
        out.push_str("}\n");
        out
    }

    /// Writes the document under `directory` as `{stem}.{ext}`.
    ///
    /// Image formats hand the DOT source to the `dot` executable and clean
    /// the source file up afterwards; [`OutputFormat::Dot`] writes the
    /// source alone. Returns the path of the artifact.
    pub fn render(
        &self,
        directory: &Path,
        stem: &str,
        format: OutputFormat,
    ) -> Result<PathBuf, RenderError> {
        fs::create_dir_all(directory)?;
        let dot_path = directory.join(format!("{stem}.dot"));
        fs::write(&dot_path, self.source())?;
        if format == OutputFormat::Dot {
            return Ok(dot_path);
        }

        let artifact = directory.join(format!("{}.{}", stem, format.extension()));
        let output = Command::new("dot")
            .arg(format!("-T{}", format.extension()))
            .arg("-o")
            .arg(&artifact)
            .arg(&dot_path)
            .output()
            .map_err(RenderError::GraphvizLaunch)?;
        if !output.status.success() {
            return Err(RenderError::GraphvizFailed {
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        fs::remove_file(&dot_path)?;
        Ok(artifact)
    }
}

/// Renders a completed recording into an in-memory DOT document.
pub fn make_dot(rec: &Recorder, options: &RenderOptions, styler: &dyn Styler) -> DotGraph {
    let mut graph_attrs = StyleMap::new();
    graph_attrs.insert("compound".to_string(), "true".to_string());
    graph_attrs.insert("ranksep".to_string(), "0.5".to_string());
    graph_attrs.insert("fontsize".to_string(), "24".to_string());
    let mut node_attrs = StyleMap::new();
    node_attrs.insert("fontsize".to_string(), "20".to_string());
    if let Some(font) = &options.fontname {
        graph_attrs.insert("fontname".to_string(), font.clone());
        node_attrs.insert("fontname".to_string(), font.clone());
    }

    let mut surface = DotSurface::new();
    Renderer::new(rec, options.render_depth, styler).render(&mut surface);
    DotGraph {
        graph_attrs,
        node_attrs,
        body: surface.finish(),
    }
}

/// Records one forward pass of `net` and writes the rendered diagram,
/// captioned with the network name and the render depth. Returns the path
/// of the artifact.
pub fn render_network(
    net: &dyn Module,
    name: &str,
    inputs: InputSource,
    options: &RenderOptions,
) -> Result<PathBuf, RenderError> {
    let rec = record(net, name, inputs)?;
    let styler = GraphvizStyler::with_attrs(&options.node_attrs);
    let mut g = make_dot(&rec, options, &styler);
    g.attr("label", &format!("{} at depth = {}", name, options.render_depth));
    let stem = match &options.file_stem {
        Some(stem) => stem.clone(),
        None => format!("{}-{}", name, options.render_depth),
    };
    g.render(&options.directory, &stem, options.format)
}
