//! Office Open XML documents (DOCX, PPTX): zip containers of XML parts.

use super::{has_extension, run_blocking, Extractor};
use crate::cancel::CancellationSignal;
use crate::error::ExtractError;
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use zip::ZipArchive;

const DOCX_BODY: &str = "word/document.xml";

/// Word documents: text runs of the main document part.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxExtractor;

impl DocxExtractor {
    pub fn new() -> Self {
        Self
    }
}

/// PowerPoint decks: text of every slide, in slide order.
#[derive(Debug, Default, Clone, Copy)]
pub struct PptxExtractor;

impl PptxExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for DocxExtractor {
    fn name(&self) -> &str {
        "docx"
    }

    fn can_handle(&self, path: &Path) -> bool {
        has_extension(path, &["docx", "docm"])
    }

    async fn extract(
        &self,
        path: &Path,
        cancel: &CancellationSignal,
    ) -> Result<String, ExtractError> {
        cancel.check()?;
        let cancel = cancel.clone();

        run_blocking(path, move |path| {
            let mut archive = open_archive(&path)?;
            cancel.check()?;
            let part = archive
                .by_name(DOCX_BODY)
                .map_err(|e| ExtractError::decode(&path, format!("missing {}: {}", DOCX_BODY, e)))?;
            xml_part_text(&path, part)
        })
        .await
    }
}

#[async_trait]
impl Extractor for PptxExtractor {
    fn name(&self) -> &str {
        "pptx"
    }

    fn can_handle(&self, path: &Path) -> bool {
        has_extension(path, &["pptx", "pptm"])
    }

    async fn extract(
        &self,
        path: &Path,
        cancel: &CancellationSignal,
    ) -> Result<String, ExtractError> {
        cancel.check()?;
        let cancel = cancel.clone();

        run_blocking(path, move |path| {
            let mut archive = open_archive(&path)?;
            let slides = slide_parts(&archive);
            let mut sections = Vec::with_capacity(slides.len());

            for (number, name) in slides {
                cancel.check()?;
                let part = archive
                    .by_name(&name)
                    .map_err(|e| ExtractError::decode_with_source(&path, e))?;
                let text = xml_part_text(&path, part)?;
                if !text.is_empty() {
                    sections.push(format!("--- Slide {} ---\n{}", number, text));
                }
            }

            Ok(sections.join("\n\n"))
        })
        .await
    }
}

fn open_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>, ExtractError> {
    let file = File::open(path).map_err(|e| ExtractError::from_io(path, e))?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| ExtractError::decode_with_source(path, e))
}

/// `ppt/slides/slideN.xml` entries sorted by N.
fn slide_parts<R>(archive: &ZipArchive<R>) -> Vec<(u32, String)>
where
    R: Read + std::io::Seek,
{
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort();
    slides
}

/// Concatenates `<*:t>` runs; paragraphs become lines, tabs and breaks are kept.
fn xml_part_text<R: Read>(path: &Path, part: R) -> Result<String, ExtractError> {
    let mut reader = Reader::from_reader(BufReader::new(part));
    let mut buf = Vec::new();
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| ExtractError::decode_with_source(path, e))?
        {
            Event::Start(e) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => lines.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text_run => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractError::decode_with_source(path, e))?;
                current.push_str(&text);
            }
            Event::CData(t) if in_text_run => {
                current.push_str(&String::from_utf8_lossy(&t.into_inner()));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !current.is_empty() {
        lines.push(current);
    }

    let text = lines
        .iter()
        .map(|line| line.trim_end())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(text)
}
