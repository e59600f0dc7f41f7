use serde::{Deserialize, Serialize};

/// A file attached to a message, already ingested by the (external) file
/// handling layer. Text content and image data URLs are carried inline so a
/// conversation file is self-contained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub size: u64,
    #[serde(flatten)]
    pub kind: AttachmentKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttachmentKind {
    Image { data_url: String },
    Text { content: String },
    Pdf,
    Document,
    Unsupported,
}

impl Attachment {
    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            size: content.len() as u64,
            kind: AttachmentKind::Text { content },
        }
    }

    pub fn image(name: impl Into<String>, data_url: impl Into<String>) -> Self {
        let data_url = data_url.into();
        Self {
            name: name.into(),
            size: data_url.len() as u64,
            kind: AttachmentKind::Image { data_url },
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, AttachmentKind::Image { .. })
    }

    /// Human-readable size, e.g. "1.5 KB".
    pub fn size_formatted(&self) -> String {
        format_size(self.size)
    }
}

pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let exponent = (bytes as f64).log(1024.0).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    format!("{} {}", (value * 100.0).round() / 100.0, UNITS[exponent])
}
