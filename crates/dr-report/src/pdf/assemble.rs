//! Final document assembly: template cover, content pages, template back page.

use super::mm_to_pt;
use super::text::{embed_standard_font, text_operations};
use crate::config::{FontFaces, ReportConfig, TextPosition, TextPositions};
use crate::error::{ReportError, Result};

use lopdf::content::Content;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use tracing::{debug, info};

/// Font resource names added to the cover page.
pub const COVER_BOLD: &str = "DRBold";
pub const COVER_REGULAR: &str = "DRRegular";

/// Page attributes a page may inherit from its page-tree ancestors.
const INHERITABLE: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];
const MAX_TREE_DEPTH: usize = 32;

/// Strings stamped on the cover page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverText {
    pub tenant: String,
    pub dashboard: String,
    pub timestamp: String,
}

/// Merges the template and the content document into the final report.
#[derive(Debug, Clone, Default)]
pub struct DocumentAssembler {
    positions: TextPositions,
    fonts: FontFaces,
}

impl DocumentAssembler {
    pub fn new(positions: TextPositions, fonts: FontFaces) -> Self {
        Self { positions, fonts }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(config.text_positions, config.fonts.clone())
    }

    /// Cover (template page 0) with overlaid text, every content page in
    /// order, then the back page (template page 1).
    pub fn assemble(&self, template: &[u8], content: &[u8], cover: &CoverText) -> Result<Vec<u8>> {
        let mut template = Document::load_mem(template)?;
        let pages = template.get_pages().len();
        if pages < 2 {
            return Err(ReportError::InvalidTemplate { pages });
        }
        let mut content = Document::load_mem(content)?;

        template.renumber_objects_with(1);
        let template_max = highest_id(&template);
        content.renumber_objects_with(template_max + 1);

        let template_pages: Vec<ObjectId> = template.get_pages().into_values().collect();
        let content_pages: Vec<ObjectId> = content.get_pages().into_values().collect();
        flatten_inherited(&mut template, &template_pages)?;
        flatten_inherited(&mut content, &content_pages)?;

        let mut output = Document::with_version("1.5");
        output.max_id = highest_id(&content).max(template_max);
        output.objects.extend(template.objects);
        output.objects.extend(content.objects);

        let (cover_page, back_page) = (template_pages[0], template_pages[1]);
        self.overlay_cover(&mut output, cover_page, cover)?;

        let pages_id = output.new_object_id();
        let kids: Vec<ObjectId> = std::iter::once(cover_page)
            .chain(content_pages.iter().copied())
            .chain(std::iter::once(back_page))
            .collect();
        for kid in &kids {
            output
                .get_object_mut(*kid)?
                .as_dict_mut()?
                .set("Parent", pages_id);
        }
        output.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids.iter().copied().map(Object::Reference).collect::<Vec<_>>(),
                "Count" => Object::Integer(kids.len() as i64),
            }),
        );
        let catalog_id = output.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        output.trailer.set("Root", catalog_id);

        let pruned = output.prune_objects().len();
        output.compress();
        let mut bytes = Vec::new();
        output.save_to(&mut bytes)?;
        info!(
            pages = kids.len(),
            content_pages = content_pages.len(),
            pruned,
            bytes = bytes.len(),
            "Report assembled"
        );
        Ok(bytes)
    }

    fn overlay_cover(&self, doc: &mut Document, page: ObjectId, cover: &CoverText) -> Result<()> {
        let bold = embed_standard_font(doc, &self.fonts.bold)?;
        let regular = embed_standard_font(doc, &self.fonts.regular)?;

        let page_dict = doc.get_dictionary(page)?;
        let mut resources = owned_dictionary(doc, page_dict.get(b"Resources").ok())?;
        let mut fonts = owned_dictionary(doc, resources.get(b"Font").ok())?;
        fonts.set(COVER_BOLD, bold);
        fonts.set(COVER_REGULAR, regular);
        resources.set("Font", fonts);

        let existing = match page_dict.get(b"Contents") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(Object::Reference(id)) => match doc.get_object(*id)? {
                Object::Array(items) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(other) => vec![other.clone()],
            Err(_) => Vec::new(),
        };

        let mut operations = Vec::new();
        let lines = [
            (COVER_BOLD, &self.positions.tenant_name, &cover.tenant),
            (COVER_BOLD, &self.positions.dashboard_name, &cover.dashboard),
            (COVER_REGULAR, &self.positions.timestamp, &cover.timestamp),
        ];
        for (font, position, text) in lines {
            let TextPosition { x, y, size } = *position;
            operations.extend(text_operations(font, size, mm_to_pt(x), mm_to_pt(y), text));
        }
        let overlay = Content { operations }.encode()?;

        // Wrap the template's own drawing so its graphics state cannot leak
        // into the overlay.
        let save = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let restore = doc.add_object(Stream::new(
            Dictionary::new(),
            [b"Q\n".as_slice(), overlay.as_slice()].concat(),
        ));
        let mut contents = vec![Object::Reference(save)];
        contents.extend(existing);
        contents.push(Object::Reference(restore));

        let page_dict = doc.get_object_mut(page)?.as_dict_mut()?;
        page_dict.set("Resources", resources);
        page_dict.set("Contents", contents);
        debug!(page = ?page, "Cover text drawn");
        Ok(())
    }
}

fn highest_id(doc: &Document) -> u32 {
    doc.objects
        .keys()
        .map(|(id, _)| *id)
        .max()
        .unwrap_or(0)
        .max(doc.max_id)
}

/// Resolve an inline or referenced dictionary into an owned copy.
fn owned_dictionary(doc: &Document, object: Option<&Object>) -> Result<Dictionary> {
    Ok(match object {
        Some(Object::Dictionary(dict)) => dict.clone(),
        Some(Object::Reference(id)) => doc.get_dictionary(*id)?.clone(),
        _ => Dictionary::new(),
    })
}

/// Copy inherited page attributes onto each page so pages can be moved to a
/// new page tree.
fn flatten_inherited(doc: &mut Document, pages: &[ObjectId]) -> Result<()> {
    for &page in pages {
        let mut inherited = Vec::new();
        {
            let dict = doc.get_dictionary(page)?;
            for key in INHERITABLE {
                if dict.has(key.as_bytes()) {
                    continue;
                }
                let mut parent = dict.get(b"Parent").and_then(Object::as_reference).ok();
                let mut depth = 0;
                while let Some(id) = parent {
                    depth += 1;
                    if depth > MAX_TREE_DEPTH {
                        return Err(ReportError::MergeFailure("page tree is too deep".to_string()));
                    }
                    let ancestor = doc.get_dictionary(id)?;
                    if let Ok(value) = ancestor.get(key.as_bytes()) {
                        inherited.push((key, value.clone()));
                        break;
                    }
                    parent = ancestor.get(b"Parent").and_then(Object::as_reference).ok();
                }
            }
        }
        let dict = doc.get_object_mut(page)?.as_dict_mut()?;
        for (key, value) in inherited {
            dict.set(key, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::render::{ContentLayout, PageLayoutRenderer};

    /// Template whose pages inherit MediaBox and Resources from the tree.
    fn template(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Times-Roman",
        });
        let kids: Vec<Object> = (0..pages)
            .map(|i| {
                let body = Content {
                    operations: text_operations("F0", 14.0, 50.0, 700.0, &format!("Template page {i}")),
                };
                let contents = doc.add_object(Stream::new(Dictionary::new(), body.encode().unwrap()));
                Object::Reference(doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "Contents" => contents,
                }))
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(pages as i64),
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(595), Object::Integer(842)],
                "Resources" => dictionary! { "Font" => dictionary! { "F0" => font } },
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn content(pages: usize) -> Vec<u8> {
        use crate::entry::{EntryType, VisualizationEntry};
        let entries: Vec<VisualizationEntry> = (0..pages.saturating_sub(1) * 2 + usize::from(pages > 0))
            .map(|i| VisualizationEntry::new(format!("v{i}"), "", EntryType::Visualization, vec![]))
            .collect();
        PageLayoutRenderer::new()
            .render_document(&entries, &ContentLayout::default())
            .unwrap()
    }

    fn cover() -> CoverText {
        CoverText {
            tenant: "Acme".to_string(),
            dashboard: "Ops".to_string(),
            timestamp: "2024-01-01 00:00 UTC".to_string(),
        }
    }

    fn page_text(doc: &Document, page: ObjectId) -> String {
        String::from_utf8_lossy(&doc.get_page_content(page).unwrap()).into_owned()
    }

    #[test]
    fn test_cover_content_back_order() {
        let bytes = DocumentAssembler::default()
            .assemble(&template(3), &content(3), &cover())
            .unwrap();
        let mut doc = Document::load_mem(&bytes).unwrap();
        doc.decompress();
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        assert_eq!(pages.len(), 5);
        assert!(page_text(&doc, pages[0]).contains("Template page 0"));
        assert!(page_text(&doc, pages[4]).contains("Template page 1"));

        // Inherited attributes survived the move to the new page tree.
        let cover_dict = doc.get_dictionary(pages[0]).unwrap();
        assert!(cover_dict.has(b"MediaBox"));
        let back_dict = doc.get_dictionary(pages[4]).unwrap();
        assert!(back_dict.has(b"Resources"));
    }

    #[test]
    fn test_cover_text_overlay() {
        let bytes = DocumentAssembler::default()
            .assemble(&template(2), &content(1), &cover())
            .unwrap();
        let mut doc = Document::load_mem(&bytes).unwrap();
        doc.decompress();
        let cover_page = doc.get_pages()[&1];
        let text = page_text(&doc, cover_page);
        assert!(text.contains("(Acme)"));
        assert!(text.contains("(2024-01-01 00:00 UTC)"));
        assert!(text.contains(COVER_BOLD));

        let fonts = doc
            .get_dictionary(cover_page)
            .and_then(|page| page.get(b"Resources"))
            .and_then(Object::as_dict)
            .and_then(|resources| resources.get(b"Font"))
            .and_then(Object::as_dict)
            .unwrap();
        assert!(fonts.has(COVER_BOLD.as_bytes()));
        assert!(fonts.has(COVER_REGULAR.as_bytes()));
        assert!(fonts.has(b"F0"));
    }

    #[test]
    fn test_empty_content_keeps_cover_and_back() {
        let bytes = DocumentAssembler::default()
            .assemble(&template(2), &content(0), &cover())
            .unwrap();
        assert_eq!(Document::load_mem(&bytes).unwrap().get_pages().len(), 2);
    }

    #[test]
    fn test_single_page_template_rejected() {
        let err = DocumentAssembler::default()
            .assemble(&template(1), &content(1), &cover())
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidTemplate { pages: 1 }));
    }

    #[test]
    fn test_unknown_font_is_merge_failure() {
        let fonts = FontFaces {
            bold: "Wingdings".to_string(),
            regular: "Helvetica".to_string(),
        };
        let err = DocumentAssembler::new(TextPositions::default(), fonts)
            .assemble(&template(2), &content(1), &cover())
            .unwrap_err();
        assert!(matches!(err, ReportError::MergeFailure(_)));
    }

    #[test]
    fn test_garbage_template_is_merge_failure() {
        let err = DocumentAssembler::default()
            .assemble(b"not a pdf", &content(1), &cover())
            .unwrap_err();
        assert!(matches!(err, ReportError::MergeFailure(_)));
    }
}
