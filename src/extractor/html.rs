use super::{decode_text, has_extension, read_bytes, Extractor};
use crate::cancel::CancellationSignal;
use crate::error::{ExtractError, Result};
use async_trait::async_trait;
use regex::{Captures, Regex};
use std::path::Path;

const HTML_EXTENSIONS: &[&str] = &["html", "htm", "xhtml"];

/// Strips markup from HTML documents, keeping block structure as line breaks.
pub struct HtmlExtractor {
    invisible: Regex,
    block_tags: Regex,
    any_tag: Regex,
    entity: Regex,
    spaces: Regex,
    blank_lines: Regex,
}

impl HtmlExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            invisible: Regex::new(
                r"(?is)<!--.*?-->|<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<head\b[^>]*>.*?</head\s*>",
            )?,
            block_tags: Regex::new(
                r"(?i)</?(?:p|div|br|hr|li|ul|ol|tr|table|h[1-6]|section|article|header|footer|nav|blockquote|pre|title)\b[^>]*>",
            )?,
            any_tag: Regex::new(r"(?s)<[^>]*>")?,
            entity: Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);")?,
            spaces: Regex::new(r"[ \t\r\x0C\u{00A0}]+")?,
            blank_lines: Regex::new(r"\n[ ]*(?:\n[ ]*)+")?,
        })
    }

    pub fn html_to_text(&self, html: &str) -> String {
        let text = self.invisible.replace_all(html, " ");
        let text = self.block_tags.replace_all(&text, "\n");
        let text = self.any_tag.replace_all(&text, "");
        let text = self
            .entity
            .replace_all(&text, |caps: &Captures| decode_entity(&caps[0], &caps[1]));
        let text = self.spaces.replace_all(&text, " ");
        let text = self.blank_lines.replace_all(&text, "\n\n");

        text.lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

fn decode_entity(whole: &str, name: &str) -> String {
    let numeric = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok()
    } else {
        None
    };

    if let Some(code) = numeric {
        return char::from_u32(code)
            .map(String::from)
            .unwrap_or_else(|| whole.to_string());
    }

    let named = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "copy" => "©",
        "reg" => "®",
        "trade" => "™",
        "hellip" => "…",
        "mdash" => "—",
        "ndash" => "–",
        "lsquo" => "‘",
        "rsquo" => "’",
        "ldquo" => "“",
        "rdquo" => "”",
        "euro" => "€",
        _ => return whole.to_string(),
    };
    named.to_string()
}

#[async_trait]
impl Extractor for HtmlExtractor {
    fn name(&self) -> &str {
        "html"
    }

    fn can_handle(&self, path: &Path) -> bool {
        has_extension(path, HTML_EXTENSIONS)
    }

    async fn extract(
        &self,
        path: &Path,
        cancel: &CancellationSignal,
    ) -> std::result::Result<String, ExtractError> {
        cancel.check()?;
        let bytes = read_bytes(path).await?;
        cancel.check()?;

        let decoded = decode_text(&bytes);
        Ok(self.html_to_text(&decoded.text))
    }
}
