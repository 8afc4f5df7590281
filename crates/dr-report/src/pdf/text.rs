//! Standard-14 fonts and WinAnsi text encoding.

use crate::error::{ReportError, Result};

use lopdf::content::Operation;
use lopdf::{dictionary, Document, Object, ObjectId, StringFormat};

/// The fonts every PDF reader provides without embedding glyph data.
pub const STANDARD_14: [&str; 14] = [
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Helvetica-BoldOblique",
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Symbol",
    "ZapfDingbats",
];

pub fn is_standard_font(name: &str) -> bool {
    STANDARD_14.contains(&name)
}

/// Add a Type1 font dictionary for `base_font`.
pub fn embed_standard_font(doc: &mut Document, base_font: &str) -> Result<ObjectId> {
    if !is_standard_font(base_font) {
        return Err(ReportError::MergeFailure(format!(
            "font face '{base_font}' is not a standard PDF font"
        )));
    }
    Ok(doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    }))
}

/// Encode `text` as WinAnsi bytes, replacing unsupported characters with `?`.
pub fn win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => code as u8,
        _ => match c {
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        },
    }
}

/// Operators drawing `text` with font resource `font` at `(x, y)` points.
pub fn text_operations(font: &str, size: f32, x: f32, y: f32, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("g", vec![Object::Integer(0)]),
        Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), Object::Real(size)]),
        Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
        Operation::new("Tj", vec![Object::String(win_ansi(text), StringFormat::Literal)]),
        Operation::new("ET", vec![]),
    ]
}

/// Rough Helvetica advance width, for centring and truncation.
pub fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_ansi() {
        assert_eq!(win_ansi("Acme · Page 1"), b"Acme \xB7 Page 1".to_vec());
        assert_eq!(win_ansi("café €5"), b"caf\xE9 \x805".to_vec());
        assert_eq!(win_ansi("日本"), b"??".to_vec());
        assert_eq!(win_ansi("tab\there"), b"tab?here".to_vec());
    }

    #[test]
    fn test_text_operations_encode() {
        let ops = text_operations("F1", 12.0, 10.0, 20.0, "Hi (x)");
        let bytes = lopdf::content::Content { operations: ops }.encode().unwrap();
        let rendered = String::from_utf8_lossy(&bytes);
        assert!(rendered.contains("/F1"));
        assert!(rendered.contains("Tf"));
        assert!(rendered.contains("Tj"));
    }

    #[test]
    fn test_unknown_font_is_merge_failure() {
        let mut doc = Document::with_version("1.5");
        assert!(embed_standard_font(&mut doc, "Helvetica-Bold").is_ok());
        let err = embed_standard_font(&mut doc, "Comic Sans").unwrap_err();
        assert!(matches!(err, ReportError::MergeFailure(_)));
    }
}
