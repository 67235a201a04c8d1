//! Text content extraction from a part tree.

use std::collections::BTreeMap;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::error::GmailError;
use crate::part::{Part, TEXT_HTML, TEXT_PLAIN};

/// Key used for a single non-text body that is not split into parts.
pub const ALTERNATIVE: &str = "multipart/alternative";

/// Gmail emits base64url both with and without padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub fn decode_base64url(data: &str) -> Result<Vec<u8>, GmailError> {
    URL_SAFE_LENIENT
        .decode(data.trim())
        .map_err(|e| GmailError::Decode(e.to_string()))
}

pub fn decode_text(data: &str) -> Result<String, GmailError> {
    String::from_utf8(decode_base64url(data)?).map_err(|e| GmailError::Decode(e.to_string()))
}

/// Decoded text bodies keyed by mime type, in tree order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Content {
    sections: BTreeMap<String, Vec<String>>,
}

impl Content {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn get(&self, mime_type: &str) -> Option<&[String]> {
        self.sections.get(mime_type).map(Vec::as_slice)
    }

    pub fn contains(&self, mime_type: &str) -> bool {
        self.sections.contains_key(mime_type)
    }

    pub fn mime_types(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Space-joined sections of `mime_type`, empty when absent.
    pub fn joined(&self, mime_type: &str) -> String {
        self.get(mime_type).map(|s| s.join(" ")).unwrap_or_default()
    }

    pub fn html(&self) -> String {
        self.joined(TEXT_HTML)
    }

    pub fn plain(&self) -> String {
        self.joined(TEXT_PLAIN)
    }

    pub fn alternative(&self) -> String {
        self.joined(ALTERNATIVE)
    }

    /// HTML when present, plain text otherwise.
    pub fn body(&self) -> String {
        let html = self.html();
        if html.is_empty() {
            self.plain()
        } else {
            html
        }
    }

    fn section(&mut self, mime_type: &str) -> &mut Vec<String> {
        self.sections.entry(mime_type.to_string()).or_default()
    }
}

/// Walk `root` and collect every text/plain and text/html body.
///
/// A childless root is a single body: text types land under their own key,
/// anything else under [`ALTERNATIVE`]. With children, containers are
/// unwrapped depth-first and each text part registers its key even when it
/// carries no data.
pub fn extract_content(root: &Part) -> Result<Content, GmailError> {
    let mut content = Content::default();

    if root.parts.is_empty() {
        if let Some(data) = root.data() {
            let key = if root.is_text() { root.mime_type.as_str() } else { ALTERNATIVE };
            let text = decode_text(data)?;
            content.section(key).push(text);
        }
        return Ok(content);
    }

    for part in &root.parts {
        collect(part, &mut content)?;
    }
    Ok(content)
}

fn collect(part: &Part, content: &mut Content) -> Result<(), GmailError> {
    if !part.is_text() {
        for child in &part.parts {
            collect(child, content)?;
        }
        return Ok(());
    }

    let section = content.section(&part.mime_type);
    if let Some(data) = part.data() {
        section.push(decode_text(data)?);
    }
    Ok(())
}
