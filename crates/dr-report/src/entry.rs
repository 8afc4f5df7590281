//! Visualization entries: the ordered sequence a report is laid out from.

use serde::{Deserialize, Serialize};

/// Role of one entry in the report sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    TableOfContents,
    DashboardTitle,
    Header,
    Visualization,
    #[serde(rename = "visualizationTitle")]
    VisualizationTitle,
    PageBreak,
    PageFooter,
}

/// One captured (or placeholder) element of the report.
///
/// `data` holds PNG bytes, or nothing when the capture failed or the entry
/// is a marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationEntry {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: EntryType,
    #[serde(with = "base64_data")]
    pub data: Vec<u8>,
}

impl VisualizationEntry {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        kind: EntryType,
        data: Vec<u8>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind,
            data,
        }
    }

    /// Page-break marker number `index`.
    pub fn page_break(index: usize) -> Self {
        Self::new(
            format!("page-break-{index}"),
            String::new(),
            EntryType::PageBreak,
            Vec::new(),
        )
    }

    pub fn has_image(&self) -> bool {
        !self.data.is_empty()
    }
}

mod base64_data {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
