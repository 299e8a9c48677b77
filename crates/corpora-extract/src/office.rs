//! Office document extractors (docx, odt, pptx).
//!
//! All three formats are zip containers holding XML parts. Each extractor
//! describes its markup with a [`Markup`] table and shares one streaming
//! quick-xml pass that collects paragraph text.

use async_trait::async_trait;
use corpora_core::{ContentExtractor, ContentMetadataInfo, ExtractError, ExtractedContent};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt::Display;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

use crate::run_blocking;

type Archive = ZipArchive<Cursor<Vec<u8>>>;

// ============================================================================
// Markup tables
// ============================================================================

/// Element names that drive paragraph collection for one format.
struct Markup {
    /// Elements that delimit a paragraph
    paragraphs: &'static [&'static [u8]],
    /// Element grouping paragraphs into one block, if any
    group: Option<&'static [u8]>,
    /// Element holding literal text; `None` keeps all text inside a paragraph
    text: Option<&'static [u8]>,
    /// Elements rendered as `\t`
    tabs: &'static [&'static [u8]],
    /// Elements rendered as `\n`
    breaks: &'static [&'static [u8]],
    /// Element rendered as `text:c` spaces (ODF)
    space: Option<&'static [u8]>,
    /// Subtrees whose content is dropped
    ignore: &'static [&'static [u8]],
    /// Whether paragraphs with no text are kept
    keep_empty: bool,
}

const DOCX: Markup = Markup {
    paragraphs: &[b"w:p"],
    group: None,
    text: Some(b"w:t".as_slice()),
    tabs: &[b"w:tab"],
    breaks: &[b"w:br", b"w:cr"],
    space: None,
    // Tab stops live in w:pPr; table cells are not body paragraphs
    ignore: &[b"w:pPr", b"w:tbl"],
    keep_empty: true,
};

const ODT: Markup = Markup {
    // text:h headings are collected alongside text:p
    paragraphs: &[b"text:p", b"text:h"],
    group: None,
    text: None,
    tabs: &[b"text:tab"],
    breaks: &[b"text:line-break"],
    space: Some(b"text:s".as_slice()),
    ignore: &[b"office:annotation"],
    keep_empty: false,
};

const PPTX: Markup = Markup {
    paragraphs: &[b"a:p"],
    group: Some(b"p:txBody".as_slice()),
    text: Some(b"a:t".as_slice()),
    tabs: &[],
    // a:br becomes \n, not a vertical tab
    breaks: &[b"a:br"],
    space: None,
    ignore: &[],
    keep_empty: true,
};

// ============================================================================
// Collector
// ============================================================================

/// Streaming state for one XML part.
struct Collector<'m> {
    markup: &'m Markup,
    blocks: Vec<Vec<String>>,
    flat: Vec<String>,
    block: Option<Vec<String>>,
    paragraph: Option<String>,
    paragraph_depth: usize,
    text_depth: usize,
    ignore_depth: usize,
}

impl<'m> Collector<'m> {
    fn new(markup: &'m Markup) -> Self {
        Self {
            markup,
            blocks: Vec::new(),
            flat: Vec::new(),
            block: None,
            paragraph: None,
            paragraph_depth: 0,
            text_depth: 0,
            ignore_depth: 0,
        }
    }

    fn open(&mut self, element: &BytesStart<'_>) {
        let name = element.name();
        let name = name.as_ref();
        let m = self.markup;

        if self.ignore_depth > 0 || m.ignore.contains(&name) {
            self.ignore_depth += 1;
        } else if m.group == Some(name) {
            self.block = Some(Vec::new());
        } else if m.paragraphs.contains(&name) {
            self.paragraph_depth += 1;
            if self.paragraph_depth == 1 {
                self.paragraph = Some(String::new());
            }
        } else if m.text == Some(name) {
            self.text_depth += 1;
        } else if m.tabs.contains(&name) {
            self.push("\t");
        } else if m.breaks.contains(&name) {
            self.push("\n");
        } else if m.space == Some(name) {
            let count = space_count(element);
            self.push(&" ".repeat(count));
        }
    }

    fn close(&mut self, name: &[u8]) {
        let m = self.markup;

        if self.ignore_depth > 0 {
            self.ignore_depth -= 1;
        } else if m.group == Some(name) {
            if let Some(block) = self.block.take() {
                self.blocks.push(block);
            }
        } else if m.paragraphs.contains(&name) {
            if self.paragraph_depth == 1 {
                if let Some(paragraph) = self.paragraph.take() {
                    self.finish_paragraph(paragraph);
                }
            }
            self.paragraph_depth = self.paragraph_depth.saturating_sub(1);
        } else if m.text == Some(name) {
            self.text_depth = self.text_depth.saturating_sub(1);
        }
    }

    fn text(&mut self, text: &str) {
        if self.ignore_depth > 0 || (self.markup.text.is_some() && self.text_depth == 0) {
            return;
        }
        self.push(text);
    }

    fn push(&mut self, text: &str) {
        if self.ignore_depth > 0 {
            return;
        }
        if let Some(paragraph) = self.paragraph.as_mut() {
            paragraph.push_str(text);
        }
    }

    fn finish_paragraph(&mut self, paragraph: String) {
        if paragraph.is_empty() && !self.markup.keep_empty {
            return;
        }
        if self.markup.group.is_none() {
            self.flat.push(paragraph);
        } else if let Some(block) = self.block.as_mut() {
            block.push(paragraph);
        }
    }

    fn finish(self) -> Vec<Vec<String>> {
        if self.markup.group.is_none() {
            vec![self.flat]
        } else {
            self.blocks
        }
    }
}

/// Number of spaces a `text:s` element stands for.
fn space_count(element: &BytesStart<'_>) -> usize {
    element
        .try_get_attribute("text:c")
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok()?.parse().ok())
        .unwrap_or(1)
}

/// Collect paragraph text from one XML part.
fn collect(xml: &str, markup: &Markup) -> Result<Vec<Vec<String>>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut collector = Collector::new(markup);

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => collector.open(&e),
            Event::Empty(e) => {
                collector.open(&e);
                collector.close(e.name().as_ref());
            }
            Event::End(e) => collector.close(e.name().as_ref()),
            Event::Text(t) => {
                let text = t.unescape().map_err(xml_error)?;
                collector.text(&text);
            }
            Event::CData(c) => collector.text(&String::from_utf8_lossy(&c)),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(collector.finish())
}

fn paragraphs(xml: &str, markup: &Markup) -> Result<Vec<String>, ExtractError> {
    Ok(collect(xml, markup)?.into_iter().flatten().collect())
}

fn xml_error(e: impl Display) -> ExtractError {
    ExtractError::Parse(format!("Malformed XML: {e}"))
}

// ============================================================================
// Containers
// ============================================================================

fn open_archive(bytes: Vec<u8>) -> Result<Archive, ExtractError> {
    ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::Parse(format!("Invalid document container: {e}")))
}

fn read_part(archive: &mut Archive, name: &str) -> Result<String, ExtractError> {
    let mut part = archive
        .by_name(name)
        .map_err(|e| ExtractError::Parse(format!("Missing part {name}: {e}")))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}

fn extract_docx(bytes: Vec<u8>) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let xml = read_part(&mut archive, "word/document.xml")?;
    Ok(paragraphs(&xml, &DOCX)?.join("\n"))
}

fn extract_odt(bytes: Vec<u8>) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let xml = read_part(&mut archive, "content.xml")?;
    Ok(paragraphs(&xml, &ODT)?.join("\n"))
}

/// Slide parts sorted by slide number.
fn slide_parts(archive: &Archive) -> Vec<String> {
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort_unstable();
    slides.into_iter().map(|(_, name)| name).collect()
}

fn extract_pptx(bytes: Vec<u8>) -> Result<(String, u32), ExtractError> {
    let mut archive = open_archive(bytes)?;
    let slides = slide_parts(&archive);

    let mut shapes = Vec::new();
    for name in &slides {
        let xml = read_part(&mut archive, name)?;
        for block in collect(&xml, &PPTX)? {
            shapes.push(block.join("\n"));
        }
    }

    debug!("Read {} shape(s) from {} slide(s)", shapes.len(), slides.len());
    let slide_count = u32::try_from(slides.len()).unwrap_or(u32::MAX);
    Ok((shapes.join("\n"), slide_count))
}

// ============================================================================
// Extractors
// ============================================================================

/// Extractor for Word `.docx` documents.
pub struct DocxExtractor;

impl DocxExtractor {
    /// Create a new docx extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for DocxExtractor {
    fn name(&self) -> &str {
        "docx"
    }

    fn extensions(&self) -> &[&str] {
        &["docx"]
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        let bytes = tokio::fs::read(path).await?;
        let text = run_blocking(move || extract_docx(bytes)).await?;
        Ok(ExtractedContent::from_text(text))
    }
}

/// Extractor for OpenDocument `.odt` text documents.
pub struct OdtExtractor;

impl OdtExtractor {
    /// Create a new odt extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for OdtExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for OdtExtractor {
    fn name(&self) -> &str {
        "odt"
    }

    fn extensions(&self) -> &[&str] {
        &["odt"]
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        let bytes = tokio::fs::read(path).await?;
        let text = run_blocking(move || extract_odt(bytes)).await?;
        Ok(ExtractedContent::from_text(text))
    }
}

/// Extractor for PowerPoint `.pptx` presentations.
pub struct PptxExtractor;

impl PptxExtractor {
    /// Create a new pptx extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for PptxExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for PptxExtractor {
    fn name(&self) -> &str {
        "pptx"
    }

    fn extensions(&self) -> &[&str] {
        &["pptx"]
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        let bytes = tokio::fs::read(path).await?;
        let (text, slides) = run_blocking(move || extract_pptx(bytes)).await?;
        Ok(ExtractedContent {
            text,
            metadata: ContentMetadataInfo {
                page_count: Some(slides),
                ..Default::default()
            },
        })
    }
}
