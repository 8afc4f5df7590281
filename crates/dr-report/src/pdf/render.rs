//! Content document rendering.
//!
//! Turns the ordered entry sequence into A4 pages: an optional contents page,
//! then content pages holding up to two visualization pairs each. The first
//! content page also carries the title and time-range banners. Every page gets the footer at slot
//! `page_number + 1`, where `page_number` is 1-based within this document.

use super::text::{approx_text_width, embed_standard_font, text_operations};
use super::{A4_HEIGHT, A4_WIDTH};
use crate::capture::decode_png;
use crate::entry::{EntryType, VisualizationEntry};
use crate::error::Result;
use crate::pagination::{TocEntry, CONTENTS_TITLE};

use async_trait::async_trait;
use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

pub const MARGIN: f32 = 36.0;
pub const FOOTER_HEIGHT: f32 = 28.0;
pub const LOGO_BOX: (f32, f32) = (100.0, 40.0);

const BOLD: &str = "F1";
const REGULAR: &str = "F2";
const GAP: f32 = 8.0;
const PAIR_TITLE_HEIGHT: f32 = 18.0;
const PAIRS_PER_PAGE: usize = 2;

/// Inputs to content rendering besides the entries themselves.
#[derive(Debug, Clone, Default)]
pub struct ContentLayout {
    pub table_of_contents: bool,
    /// Contents lines, drawn as text when the contents capture is empty.
    pub toc: Vec<TocEntry>,
    pub logo: Option<Vec<u8>>,
}

/// Renders the entry sequence into a standalone PDF.
#[async_trait(?Send)]
pub trait ContentRenderer {
    async fn render(&self, entries: &[VisualizationEntry], layout: &ContentLayout) -> Result<Vec<u8>>;
}

/// A panel's title entry and its visualization.
#[derive(Debug, Clone, Copy)]
pub struct Pair<'a> {
    pub title: Option<&'a VisualizationEntry>,
    pub visualization: &'a VisualizationEntry,
}

/// Entries sorted into the slots the layout needs.
#[derive(Debug, Default)]
pub struct ContentPlan<'a> {
    pub toc: Option<&'a VisualizationEntry>,
    pub footers: Vec<&'a VisualizationEntry>,
    pub title: Option<&'a VisualizationEntry>,
    pub header: Option<&'a VisualizationEntry>,
    pub pages: Vec<Vec<Pair<'a>>>,
}

/// Group entries into pages by counting pairs. Page-break markers do not
/// affect grouping.
pub fn group_entries(entries: &[VisualizationEntry]) -> ContentPlan<'_> {
    let mut plan = ContentPlan::default();
    let mut pending_title = None;
    let mut pairs = Vec::new();
    for entry in entries {
        match entry.kind {
            EntryType::TableOfContents => plan.toc = Some(entry),
            EntryType::PageFooter => plan.footers.push(entry),
            EntryType::DashboardTitle => plan.title = Some(entry),
            EntryType::Header => plan.header = Some(entry),
            EntryType::VisualizationTitle => pending_title = Some(entry),
            EntryType::Visualization => pairs.push(Pair {
                title: pending_title.take(),
                visualization: entry,
            }),
            EntryType::PageBreak => {}
        }
    }

    plan.pages = pairs.chunks(PAIRS_PER_PAGE).map(<[Pair<'_>]>::to_vec).collect();
    plan
}

/// Built-in A4 layout renderer using standard fonts.
#[derive(Debug, Clone)]
pub struct PageLayoutRenderer {
    bold_font: String,
    regular_font: String,
}

impl Default for PageLayoutRenderer {
    fn default() -> Self {
        Self {
            bold_font: "Helvetica-Bold".to_string(),
            regular_font: "Helvetica".to_string(),
        }
    }
}

impl PageLayoutRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fonts(mut self, bold: impl Into<String>, regular: impl Into<String>) -> Self {
        self.bold_font = bold.into();
        self.regular_font = regular.into();
        self
    }

    pub fn render_document(&self, entries: &[VisualizationEntry], layout: &ContentLayout) -> Result<Vec<u8>> {
        let plan = group_entries(entries);
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let fonts = dictionary! {
            BOLD => embed_standard_font(&mut doc, &self.bold_font)?,
            REGULAR => embed_standard_font(&mut doc, &self.regular_font)?,
        };

        let mut kids = Vec::new();
        let mut page_number = 0;
        let mut logo = layout.logo.as_deref();

        if layout.table_of_contents {
            page_number += 1;
            let mut page = PageCanvas::new();
            let top = page.logo(&mut doc, logo.take())?;
            match plan.toc.filter(|entry| entry.has_image()) {
                Some(entry) => {
                    page.image(&mut doc, entry, MARGIN, MARGIN + FOOTER_HEIGHT, content_width(), top - MARGIN - FOOTER_HEIGHT)?;
                }
                None => page.toc_text(top, &layout.toc),
            }
            page.footer(&mut doc, plan.footers.get(page_number + 1).copied())?;
            kids.push(page.finish(&mut doc, pages_id, &fonts)?);
        }

        for (index, pairs) in plan.pages.iter().enumerate() {
            page_number += 1;
            let mut page = PageCanvas::new();
            let mut cursor = page.logo(&mut doc, logo.take())?;
            if index == 0 {
                cursor = page.banner(&mut doc, plan.title, 20.0, 60.0, cursor)?;
                cursor = page.banner(&mut doc, plan.header, 11.0, 32.0, cursor)?;
            }
            let bottom = MARGIN + FOOTER_HEIGHT;
            let slot_height = ((cursor - bottom) / PAIRS_PER_PAGE as f32).max(0.0);
            for pair in pairs {
                page.pair(&mut doc, pair, cursor, slot_height)?;
                cursor -= slot_height;
            }
            page.footer(&mut doc, plan.footers.get(page_number + 1).copied())?;
            kids.push(page.finish(&mut doc, pages_id, &fonts)?);
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
                "Count" => Object::Integer(count),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        debug!(pages = count, bytes = bytes.len(), "Content document rendered");
        Ok(bytes)
    }
}

#[async_trait(?Send)]
impl ContentRenderer for PageLayoutRenderer {
    async fn render(&self, entries: &[VisualizationEntry], layout: &ContentLayout) -> Result<Vec<u8>> {
        self.render_document(entries, layout)
    }
}

fn content_width() -> f32 {
    A4_WIDTH - 2.0 * MARGIN
}

/// Operators and image resources of one page under construction.
struct PageCanvas {
    operations: Vec<Operation>,
    images: Dictionary,
}

impl PageCanvas {
    fn new() -> Self {
        Self {
            operations: Vec::new(),
            images: Dictionary::new(),
        }
    }

    /// Draw the logo top-right when given. Returns the y below it.
    fn logo(&mut self, doc: &mut Document, logo: Option<&[u8]>) -> Result<f32> {
        let top = A4_HEIGHT - MARGIN;
        let Some(bytes) = logo else {
            return Ok(top);
        };
        match decode_png(bytes) {
            Ok(pixels) => {
                let (w, h) = fit(&pixels, LOGO_BOX.0, LOGO_BOX.1);
                self.place(doc, &pixels, A4_WIDTH - MARGIN - w, top - h, w, h);
                Ok(top - LOGO_BOX.1 - GAP)
            }
            Err(err) => {
                warn!(error = %err, "Logo is not a readable PNG; skipped");
                Ok(top)
            }
        }
    }

    /// Image or text band centred across the page. Returns the y below it.
    fn banner(
        &mut self,
        doc: &mut Document,
        entry: Option<&VisualizationEntry>,
        font_size: f32,
        height: f32,
        top: f32,
    ) -> Result<f32> {
        let Some(entry) = entry else {
            return Ok(top);
        };
        if entry.has_image() {
            self.image(doc, entry, MARGIN, top - height, content_width(), height)?;
        } else if !entry.title.is_empty() {
            let x = (A4_WIDTH - approx_text_width(&entry.title, font_size)) / 2.0;
            self.text(BOLD, font_size, x.max(MARGIN), top - font_size, &entry.title);
        }
        Ok(top - height - GAP)
    }

    fn pair(&mut self, doc: &mut Document, pair: &Pair<'_>, top: f32, height: f32) -> Result<()> {
        let mut cursor = top;
        if let Some(title) = pair.title {
            if title.has_image() {
                self.image(doc, title, MARGIN, cursor - PAIR_TITLE_HEIGHT, content_width(), PAIR_TITLE_HEIGHT)?;
            } else {
                self.text(BOLD, 12.0, MARGIN, cursor - 12.0, &title.title);
            }
            cursor -= PAIR_TITLE_HEIGHT + GAP / 2.0;
        }
        let available = height - (top - cursor) - GAP;
        if pair.visualization.has_image() && available > 0.0 {
            self.image(doc, pair.visualization, MARGIN, cursor - available, content_width(), available)?;
        }
        Ok(())
    }

    fn toc_text(&mut self, top: f32, toc: &[TocEntry]) {
        let mut y = top - 18.0;
        self.text(BOLD, 18.0, MARGIN, y, CONTENTS_TITLE);
        y -= 30.0;
        for line in toc {
            if y < MARGIN + FOOTER_HEIGHT {
                break;
            }
            let page = line.page.to_string();
            self.text(REGULAR, 11.0, MARGIN, y, &line.title);
            let x = A4_WIDTH - MARGIN - approx_text_width(&page, 11.0);
            self.text(REGULAR, 11.0, x, y, &page);
            y -= 18.0;
        }
    }

    fn footer(&mut self, doc: &mut Document, entry: Option<&VisualizationEntry>) -> Result<()> {
        let Some(entry) = entry else {
            return Ok(());
        };
        let bottom = MARGIN / 2.0;
        if entry.has_image() {
            self.image(doc, entry, MARGIN, bottom, content_width(), FOOTER_HEIGHT)?;
        } else if !entry.title.is_empty() {
            let x = (A4_WIDTH - approx_text_width(&entry.title, 9.0)) / 2.0;
            self.text(REGULAR, 9.0, x.max(MARGIN), bottom + 8.0, &entry.title);
        }
        Ok(())
    }

    fn text(&mut self, font: &str, size: f32, x: f32, y: f32, text: &str) {
        self.operations.extend(text_operations(font, size, x, y, text));
    }

    /// Fit the entry's image into the box, centred horizontally and aligned
    /// to the top of the box. Undecodable images are skipped.
    fn image(
        &mut self,
        doc: &mut Document,
        entry: &VisualizationEntry,
        x: f32,
        y: f32,
        max_width: f32,
        max_height: f32,
    ) -> Result<()> {
        let pixels = match decode_png(&entry.data) {
            Ok(pixels) => pixels,
            Err(err) => {
                warn!(entry = %entry.id, error = %err, "Entry image is unreadable; slot left empty");
                return Ok(());
            }
        };
        let (w, h) = fit(&pixels, max_width, max_height);
        let left = x + (max_width - w) / 2.0;
        let bottom = y + max_height - h;
        self.place(doc, &pixels, left, bottom, w, h);
        Ok(())
    }

    fn place(&mut self, doc: &mut Document, pixels: &RgbaImage, x: f32, y: f32, w: f32, h: f32) {
        let name = format!("Im{}", self.images.len());
        let id = doc.add_object(image_xobject(pixels));
        self.images.set(name.clone(), id);
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(w),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(h),
                    Object::Real(x),
                    Object::Real(y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn finish(self, doc: &mut Document, parent: ObjectId, fonts: &Dictionary) -> Result<ObjectId> {
        let content = Content {
            operations: self.operations,
        };
        let contents_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));
        let resources = dictionary! {
            "Font" => fonts.clone(),
            "XObject" => self.images,
        };
        Ok(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => parent,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(A4_WIDTH),
                Object::Real(A4_HEIGHT),
            ],
            "Resources" => resources,
            "Contents" => contents_id,
        }))
    }
}

/// Largest size with the image's aspect ratio inside the box.
fn fit(pixels: &RgbaImage, max_width: f32, max_height: f32) -> (f32, f32) {
    let (w, h) = (pixels.width().max(1) as f32, pixels.height().max(1) as f32);
    let scale = (max_width / w).min(max_height / h).max(0.0);
    (w * scale, h * scale)
}

/// RGB image XObject with alpha flattened onto white.
fn image_xobject(pixels: &RgbaImage) -> Stream {
    let mut rgb = Vec::with_capacity(pixels.width() as usize * pixels.height() as usize * 3);
    for pixel in pixels.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        for channel in [r, g, b] {
            let blended = (u16::from(channel) * alpha + 255 * (255 - alpha)) / 255;
            rgb.push(blended as u8);
        }
    }
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(i64::from(pixels.width())),
            "Height" => Object::Integer(i64::from(pixels.height())),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => Object::Integer(8),
        },
        rgb,
    )
}
