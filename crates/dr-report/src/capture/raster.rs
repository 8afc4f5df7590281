//! Rasterizer seam and the built-in canvas compositor.

use crate::error::{ReportError, Result};
use crate::view::{names, NodeId, SharedView, ViewTree};

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Channels above this value are snapped to pure white.
pub const NEAR_WHITE_THRESHOLD: u8 = 240;

/// Largest edge the compositor will allocate.
pub const MAX_DIMENSION: u32 = 8192;

/// How one element is rasterized.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterOptions {
    pub scale: f32,
    /// Fill behind the element; transparent when absent.
    pub background: Option<Rgba<u8>>,
    /// Fixed viewport, overriding the element's own box.
    pub window: Option<(u32, u32)>,
    /// Use the content height instead of the declared height.
    pub auto_height: bool,
    pub foreign_object_rendering: bool,
    pub z_index: Option<i32>,
    /// Subtrees carrying these classes are not painted.
    pub ignore_classes: Vec<&'static str>,
    /// Decorative classes dropped at paint time, including nodes that
    /// appeared after the element was staged.
    pub strip_classes: Vec<&'static str>,
}

impl RasterOptions {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            background: None,
            window: None,
            auto_height: false,
            foreign_object_rendering: true,
            z_index: None,
            ignore_classes: Vec::new(),
            strip_classes: names::DECORATIVE.to_vec(),
        }
    }
}

/// Turns a node of the view into pixels.
#[async_trait(?Send)]
pub trait Rasterizer {
    async fn rasterize(
        &self,
        view: &SharedView,
        node: NodeId,
        options: &RasterOptions,
    ) -> Result<RgbaImage>;
}

/// Composites the canvases under a node, top to bottom.
///
/// The box is the node's declared `width`/`height`, falling back to the
/// content extent. Hidden nodes and ignored or stripped subtrees are skipped.
/// Text is not painted; a subtree with no visible canvas is a capture
/// failure.
#[derive(Debug, Clone, Copy)]
pub struct CanvasRasterizer {
    max_dimension: u32,
}

impl Default for CanvasRasterizer {
    fn default() -> Self {
        Self {
            max_dimension: MAX_DIMENSION,
        }
    }
}

impl CanvasRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }

    fn compose(&self, tree: &ViewTree, node: NodeId, options: &RasterOptions) -> Result<RgbaImage> {
        if !options.scale.is_finite() || options.scale <= 0.0 {
            return Err(ReportError::capture(
                node.to_string(),
                format!("invalid scale {}", options.scale),
            ));
        }

        let layers = paint_layers(tree, node, options);
        if layers.is_empty() {
            return Err(ReportError::capture(node.to_string(), "no paintable content"));
        }
        let content_width = layers.iter().map(|l| l.width()).max().unwrap_or(0);
        let content_height: u32 = layers.iter().map(|l| l.height()).sum();

        let style = tree.node(node).style();
        let (width, mut height) = options.window.unwrap_or_else(|| {
            (
                style.pixels("width").unwrap_or(content_width),
                style.pixels("height").unwrap_or(content_height),
            )
        });
        if options.auto_height && content_height > 0 {
            height = content_height;
        }
        let width = width.clamp(1, self.max_dimension);
        let height = height.clamp(1, self.max_dimension);

        let background = options.background.unwrap_or(Rgba([0, 0, 0, 0]));
        let mut out = RgbaImage::from_pixel(width, height, background);
        let mut y: i64 = 0;
        for layer in layers {
            imageops::overlay(&mut out, layer, 0, y);
            y += i64::from(layer.height());
        }

        if (options.scale - 1.0).abs() > f32::EPSILON {
            let scaled = |edge: u32| {
                ((edge as f32 * options.scale).round() as u32).clamp(1, self.max_dimension)
            };
            out = imageops::resize(&out, scaled(width), scaled(height), FilterType::Nearest);
        }
        Ok(out)
    }
}

#[async_trait(?Send)]
impl Rasterizer for CanvasRasterizer {
    async fn rasterize(
        &self,
        view: &SharedView,
        node: NodeId,
        options: &RasterOptions,
    ) -> Result<RgbaImage> {
        let tree = view.borrow();
        self.compose(&tree, node, options)
    }
}

fn paint_layers<'t>(tree: &'t ViewTree, node: NodeId, options: &RasterOptions) -> Vec<&'t RgbaImage> {
    let mut layers = Vec::new();
    let mut stack = vec![node];
    while let Some(id) = stack.pop() {
        let current = tree.node(id);
        let style = current.style();
        let hidden = style.get("visibility") == Some("hidden") || style.get("display") == Some("none");
        let skipped = options
            .ignore_classes
            .iter()
            .chain(options.strip_classes.iter())
            .any(|class| current.has_class(class));
        if hidden || skipped {
            continue;
        }
        if let Some(canvas) = &current.canvas {
            layers.push(canvas);
        }
        stack.extend(current.children().iter().rev().copied());
    }
    layers
}

/// Snap near-white pixels to pure white. Returns the number of pixels changed.
pub fn snap_near_white(image: &mut RgbaImage) -> usize {
    let mut changed = 0;
    for pixel in image.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        let near_white = r > NEAR_WHITE_THRESHOLD && g > NEAR_WHITE_THRESHOLD && b > NEAR_WHITE_THRESHOLD;
        if near_white && (r, g, b) != (255, 255, 255) {
            pixel.0[..3].copy_from_slice(&[255, 255, 255]);
            changed += 1;
        }
    }
    changed
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

pub fn decode_png(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ViewNode;

    const RED: Rgba<u8> = Rgba([200, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 200, 255]);

    fn stacked() -> (SharedView, NodeId) {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let panel = tree.append(root, ViewNode::new("div"));
        tree.append(panel, ViewNode::new("canvas").with_canvas(RgbaImage::from_pixel(4, 2, RED)));
        tree.append(panel, ViewNode::new("canvas").with_canvas(RgbaImage::from_pixel(3, 3, BLUE)));
        (tree.into_shared(), panel)
    }

    #[tokio::test]
    async fn test_layers_stack_vertically() {
        let (view, panel) = stacked();
        let image = CanvasRasterizer::new()
            .rasterize(&view, panel, &RasterOptions::new(1.0))
            .await
            .unwrap();
        assert_eq!(image.dimensions(), (4, 5));
        assert_eq!(image.get_pixel(0, 0), &RED);
        assert_eq!(image.get_pixel(0, 2), &BLUE);
        assert_eq!(image.get_pixel(3, 4), &Rgba([0, 0, 0, 0]));
    }

    #[tokio::test]
    async fn test_declared_box_background_and_scale() {
        let (view, panel) = stacked();
        view.borrow_mut().set_style(panel, "width", "10px");
        view.borrow_mut().set_style(panel, "height", "8px");
        let options = RasterOptions {
            background: Some(Rgba([255, 255, 255, 255])),
            ..RasterOptions::new(2.0)
        };
        let image = CanvasRasterizer::new().rasterize(&view, panel, &options).await.unwrap();
        assert_eq!(image.dimensions(), (20, 16));
        assert_eq!(image.get_pixel(19, 15), &Rgba([255, 255, 255, 255]));
    }

    #[tokio::test]
    async fn test_hidden_ignored_and_stripped_are_not_painted() {
        let (view, panel) = stacked();
        {
            let mut tree = view.borrow_mut();
            let children = tree.node(panel).children().to_vec();
            tree.node_mut(children[0]).classes.insert("brush-layer".to_string());
            tree.node_mut(children[1]).classes.insert("legend-toggle".to_string());
        }
        let options = RasterOptions {
            ignore_classes: vec!["brush-layer"],
            ..RasterOptions::new(1.0)
        };
        let err = CanvasRasterizer::new().rasterize(&view, panel, &options).await.unwrap_err();
        assert!(matches!(err, ReportError::CaptureFailure { .. }));

        let (view, panel) = stacked();
        view.borrow_mut().set_style(panel, "visibility", "hidden");
        let err = CanvasRasterizer::new()
            .rasterize(&view, panel, &RasterOptions::new(1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::CaptureFailure { .. }));
    }

    #[tokio::test]
    async fn test_auto_height_uses_content() {
        let (view, panel) = stacked();
        view.borrow_mut().set_style(panel, "height", "100px");
        let options = RasterOptions {
            auto_height: true,
            ..RasterOptions::new(1.0)
        };
        let image = CanvasRasterizer::new().rasterize(&view, panel, &options).await.unwrap();
        assert_eq!(image.height(), 5);
    }

    #[tokio::test]
    async fn test_invalid_scale_is_capture_failure() {
        let (view, panel) = stacked();
        let err = CanvasRasterizer::new()
            .rasterize(&view, panel, &RasterOptions::new(0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::CaptureFailure { .. }));
    }

    #[test]
    fn test_snap_near_white() {
        let mut image = RgbaImage::from_pixel(2, 1, Rgba([241, 250, 245, 128]));
        image.put_pixel(1, 0, Rgba([240, 255, 255, 255]));
        assert_eq!(snap_near_white(&mut image), 1);
        assert_eq!(image.get_pixel(0, 0), &Rgba([255, 255, 255, 128]));
        assert_eq!(image.get_pixel(1, 0), &Rgba([240, 255, 255, 255]));
    }

    #[test]
    fn test_png_encode_decode() {
        let image = RgbaImage::from_pixel(3, 2, BLUE);
        let png = encode_png(&image).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert_eq!(decode_png(&png).unwrap(), image);
    }
}
