//! Loading a dashboard view from a JSON description.

use super::tree::{NodeId, ViewNode, ViewTree};
use crate::error::{ReportError, Result};

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Canvas content of a fixture node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CanvasSpec {
    /// A uniformly filled canvas.
    Solid {
        width: u32,
        height: u32,
        rgba: [u8; 4],
    },
    /// A PNG file, relative to the fixture file.
    File { path: PathBuf },
}

/// One node of a fixture view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub style: BTreeMap<String, String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub canvas: Option<CanvasSpec>,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

fn default_tag() -> String {
    "div".to_string()
}

impl NodeSpec {
    fn to_node(&self, base_dir: &Path) -> Result<ViewNode> {
        let mut node = ViewNode::new(&self.tag);
        for class in &self.classes {
            node = node.with_class(class);
        }
        for (name, value) in &self.attrs {
            node = node.with_attr(name, value);
        }
        for (key, value) in &self.style {
            node = node.with_style(key, value);
        }
        if let Some(text) = &self.text {
            node = node.with_text(text);
        }
        if let Some(canvas) = &self.canvas {
            node = node.with_canvas(load_canvas(canvas, base_dir)?);
        }
        Ok(node)
    }
}

fn load_canvas(spec: &CanvasSpec, base_dir: &Path) -> Result<RgbaImage> {
    match spec {
        CanvasSpec::Solid {
            width,
            height,
            rgba,
        } => {
            if *width == 0 || *height == 0 {
                return Err(ReportError::InvalidConfig(
                    "fixture canvas must have non-zero size".to_string(),
                ));
            }
            Ok(RgbaImage::from_pixel(*width, *height, Rgba(*rgba)))
        }
        CanvasSpec::File { path } => {
            let full = base_dir.join(path);
            let bytes = std::fs::read(&full).map_err(|e| {
                ReportError::Io(std::io::Error::new(
                    e.kind(),
                    format!("{}: {}", full.display(), e),
                ))
            })?;
            Ok(image::load_from_memory(&bytes)?.to_rgba8())
        }
    }
}

/// Build a view from a fixture whose relative canvas paths resolve against
/// `base_dir`.
pub fn view_from_spec(spec: &NodeSpec, base_dir: &Path) -> Result<ViewTree> {
    let mut tree = ViewTree::with_root(spec.to_node(base_dir)?);
    let root = tree.root();
    append_children(&mut tree, root, spec, base_dir)?;
    Ok(tree)
}

fn append_children(
    tree: &mut ViewTree,
    parent: NodeId,
    spec: &NodeSpec,
    base_dir: &Path,
) -> Result<()> {
    for child in &spec.children {
        let id = tree.append(parent, child.to_node(base_dir)?);
        append_children(tree, id, child, base_dir)?;
    }
    Ok(())
}

/// Parse a fixture from JSON text.
pub fn view_from_json(json: &str, base_dir: &Path) -> Result<ViewTree> {
    let spec: NodeSpec = serde_json::from_str(json)?;
    view_from_spec(&spec, base_dir)
}

/// Load a fixture file.
pub fn load_view(path: &Path) -> Result<ViewTree> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        ReportError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    view_from_json(&json, base_dir)
}
