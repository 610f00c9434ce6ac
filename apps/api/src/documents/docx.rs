//! Minimal DOCX reader: paragraph text from `word/document.xml`.

use std::io::{Cursor, Read};

const DOCUMENT_PART: &str = "word/document.xml";

/// Reads the document body, refusing one that decompresses to more than `max_xml_bytes`.
pub fn extract_text(bytes: &[u8], max_xml_bytes: usize) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| format!("{DOCUMENT_PART}: {e}"))?;

    let mut xml = String::new();
    part.take(max_xml_bytes as u64 + 1)
        .read_to_string(&mut xml)
        .map_err(|e| e.to_string())?;
    if xml.len() > max_xml_bytes {
        return Err(format!("{DOCUMENT_PART} exceeds {max_xml_bytes} bytes"));
    }
    Ok(paragraphs_from_xml(&xml).join("\n"))
}

/// Collects the `<w:t>` runs of each `<w:p>` paragraph. Tabs and breaks become whitespace.
fn paragraphs_from_xml(xml: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut rest = xml;

    while let Some(start) = rest.find('<') {
        let Some(end) = rest[start..].find('>').map(|e| start + e) else {
            break;
        };
        let tag = &rest[start + 1..end];
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");
        let closing = tag.starts_with('/');
        let self_closing = tag.ends_with('/');
        rest = &rest[end + 1..];

        match name {
            "w:t" if !closing && !self_closing => {
                let text_end = rest.find("</w:t>").unwrap_or(rest.len());
                current.push_str(&unescape(&rest[..text_end]));
                rest = &rest[text_end..];
            }
            "w:tab" => current.push('\t'),
            "w:br" | "w:cr" => current.push('\n'),
            "w:p" if closing => paragraphs.push(std::mem::take(&mut current)),
            _ => {}
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
