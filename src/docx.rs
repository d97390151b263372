//! .docx container and WordprocessingML body model.

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::document::{EditableDocument, ParagraphSource, ParagraphText, RunFormat, TextRun};
use crate::error::{DocumentError, ReplacementError};
use crate::locator::ParagraphPath;
use crate::xml::{parse_document, write_document, XmlElement, XmlNode};

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const DOCUMENT_PART: &str = "word/document.xml";

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

fn content_types_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#
}

fn rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#
}

fn word_rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
</Relationships>"#
}

/// Wrap body markup (`<w:p>`, `<w:tbl>` ...) in a `w:document` root.
pub fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{NS_W}"><w:body>{body}</w:body></w:document>"#
    )
}

#[derive(Clone, Debug)]
struct Entry {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

/// Every zip entry of a .docx, in archive order. Entries nobody touches are
/// written back with the same bytes.
#[derive(Clone, Debug)]
pub struct DocxPackage {
    entries: Vec<Entry>,
}

impl DocxPackage {
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        let bytes = std::fs::read(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let is_dir = entry.is_dir();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).map_err(ZipError::from)?;
            entries.push(Entry { name, data, is_dir });
        }

        let package = Self { entries };
        for required in [CONTENT_TYPES_PART, DOCUMENT_PART] {
            if package.part(required).is_none() {
                return Err(DocumentError::MissingPart(required));
            }
        }
        Ok(package)
    }

    /// Minimal single-part package around `document_xml`.
    pub fn from_document_xml(document_xml: &str) -> Self {
        let file = |name: &str, data: &str| Entry {
            name: name.to_string(),
            data: data.as_bytes().to_vec(),
            is_dir: false,
        };
        Self {
            entries: vec![
                file(CONTENT_TYPES_PART, content_types_xml()),
                file("_rels/.rels", rels_xml()),
                file(DOCUMENT_PART, document_xml),
                file("word/_rels/document.xml.rels", word_rels_xml()),
            ],
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| !e.is_dir && e.name == name)
            .map(|e| e.data.as_slice())
    }

    /// Replace a part in place, or append it if it does not exist yet.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.data = data,
            None => self.entries.push(Entry {
                name: name.to_string(),
                data,
                is_dir: false,
            }),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        // Images are already compressed.
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        for entry in &self.entries {
            if entry.is_dir {
                zip.add_directory(entry.name.as_str(), deflated)?;
                continue;
            }
            let opt = if entry.name.starts_with("word/media/") { stored } else { deflated };
            zip.start_file(entry.name.as_str(), opt)?;
            zip.write_all(&entry.data).map_err(ZipError::from)?;
        }
        Ok(zip.finish()?.into_inner())
    }

    /// Write through a temp file in the target directory, so a failed save
    /// never leaves a partial file at `path`.
    pub fn save(&self, path: &Path) -> Result<(), ReplacementError> {
        let bytes = self.to_bytes()?;
        persist(path, &bytes)
    }
}

pub(crate) fn persist(path: &Path, bytes: &[u8]) -> Result<(), ReplacementError> {
    let write_err = |source: std::io::Error| ReplacementError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir: PathBuf = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

fn on_off(el: &XmlElement) -> bool {
    !matches!(el.attr("val"), Some("0" | "false" | "off"))
}

fn run_format(run: &XmlElement) -> RunFormat {
    let Some(rpr) = run.child("rPr") else {
        return RunFormat::default();
    };
    RunFormat {
        bold: rpr.child("b").map(on_off),
        italic: rpr.child("i").map(on_off),
        underline: rpr
            .child("u")
            .map(|u| u.attr("val").unwrap_or("single").to_string()),
        font_name: rpr
            .child("rFonts")
            .and_then(|f| f.attr("ascii").or_else(|| f.attr("hAnsi")))
            .map(str::to_string),
        font_size_half_points: rpr
            .child("sz")
            .and_then(|s| s.attr("val"))
            .and_then(|v| v.parse().ok()),
    }
}

fn run_text(run: &XmlElement) -> String {
    let mut out = String::new();
    for child in run.elements() {
        match child.local_name() {
            "t" => out.push_str(&child.text()),
            "tab" => out.push('\t'),
            "br" | "cr" => out.push('\n'),
            _ => {}
        }
    }
    out
}

fn paragraph_runs(p: &XmlElement) -> Vec<TextRun> {
    let mut runs = Vec::new();
    for child in p.elements() {
        match child.local_name() {
            "r" => runs.push(TextRun::new(run_text(child), run_format(child))),
            "hyperlink" => runs.extend(
                child
                    .children_named("r")
                    .map(|r| TextRun::new(run_text(r), run_format(r))),
            ),
            _ => {}
        }
    }
    runs
}

fn build_run(p: &XmlElement, text: &str, format: &RunFormat) -> XmlElement {
    let q = |local: &str| p.qualify(local);
    let toggle = |local: &str, on: bool| {
        let el = XmlElement::new(q(local));
        if on {
            el
        } else {
            el.with_attr(q("val"), "0")
        }
    };

    let mut rpr = XmlElement::new(q("rPr"));
    if let Some(font) = &format.font_name {
        rpr = rpr.with_child(
            XmlElement::new(q("rFonts"))
                .with_attr(q("ascii"), font.as_str())
                .with_attr(q("hAnsi"), font.as_str())
                .with_attr(q("cs"), font.as_str()),
        );
    }
    if let Some(b) = format.bold {
        rpr = rpr.with_child(toggle("b", b));
    }
    if let Some(i) = format.italic {
        rpr = rpr.with_child(toggle("i", i));
    }
    if let Some(sz) = format.font_size_half_points {
        rpr = rpr.with_child(XmlElement::new(q("sz")).with_attr(q("val"), sz.to_string()));
    }
    if let Some(u) = &format.underline {
        rpr = rpr.with_child(XmlElement::new(q("u")).with_attr(q("val"), u.as_str()));
    }

    let mut run = XmlElement::new(q("r"));
    if !rpr.children.is_empty() {
        run = run.with_child(rpr);
    }

    let mut buf = String::new();
    let flush = |run: XmlElement, buf: &mut String| {
        if buf.is_empty() {
            return run;
        }
        let t = XmlElement::new(q("t"))
            .with_attr("xml:space", "preserve")
            .with_text(std::mem::take(buf));
        run.with_child(t)
    };
    for ch in text.chars() {
        match ch {
            '\t' => run = flush(run, &mut buf).with_child(XmlElement::new(q("tab"))),
            '\n' => run = flush(run, &mut buf).with_child(XmlElement::new(q("br"))),
            _ => buf.push(ch),
        }
    }
    flush(run, &mut buf)
}

/// A .docx whose main part is held as an editable XML tree.
#[derive(Clone, Debug)]
pub struct WordDocument {
    package: DocxPackage,
    root: XmlElement,
}

impl WordDocument {
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        Self::from_package(DocxPackage::open(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        Self::from_package(DocxPackage::from_bytes(bytes)?)
    }

    pub fn from_package(package: DocxPackage) -> Result<Self, DocumentError> {
        let raw = package
            .part(DOCUMENT_PART)
            .ok_or(DocumentError::MissingPart(DOCUMENT_PART))?;
        let xml = std::str::from_utf8(raw).map_err(|_| DocumentError::Utf8 {
            part: DOCUMENT_PART.to_string(),
        })?;
        let root = parse_document(xml)?;
        if root.child("body").is_none() {
            return Err(DocumentError::Malformed("w:document has no w:body".into()));
        }
        Ok(Self { package, root })
    }

    /// The package with the current main part written into it.
    pub fn to_package(&self) -> Result<DocxPackage, DocumentError> {
        let mut package = self.package.clone();
        package.set_part(DOCUMENT_PART, write_document(&self.root)?);
        Ok(package)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        self.to_package()?.to_bytes()
    }

    pub fn save(&self, path: &Path) -> Result<(), ReplacementError> {
        self.to_package()?.save(path)
    }

    fn body(&self) -> Option<&XmlElement> {
        self.root.child("body")
    }

    fn paragraph_mut(&mut self, path: &ParagraphPath) -> Option<&mut XmlElement> {
        let body = self.root.nth_child_mut("body", 0)?;
        match *path {
            ParagraphPath::Body { paragraph } => body.nth_child_mut("p", paragraph),
            ParagraphPath::Cell {
                table,
                row,
                cell,
                paragraph,
            } => body
                .nth_child_mut("tbl", table)?
                .nth_child_mut("tr", row)?
                .nth_child_mut("tc", cell)?
                .nth_child_mut("p", paragraph),
        }
    }
}

impl ParagraphSource for WordDocument {
    fn paragraphs(&self) -> Vec<ParagraphText> {
        let Some(body) = self.body() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (i, p) in body.children_named("p").enumerate() {
            out.push(ParagraphText::from_runs(
                ParagraphPath::Body { paragraph: i },
                paragraph_runs(p),
            ));
        }
        for (t, tbl) in body.children_named("tbl").enumerate() {
            for (r, tr) in tbl.children_named("tr").enumerate() {
                for (c, tc) in tr.children_named("tc").enumerate() {
                    for (pi, p) in tc.children_named("p").enumerate() {
                        let path = ParagraphPath::Cell {
                            table: t,
                            row: r,
                            cell: c,
                            paragraph: pi,
                        };
                        out.push(ParagraphText::from_runs(path, paragraph_runs(p)));
                    }
                }
            }
        }
        out
    }
}

impl EditableDocument for WordDocument {
    fn rewrite_paragraph(
        &mut self,
        path: &ParagraphPath,
        text: &str,
        format: &RunFormat,
    ) -> Result<(), ReplacementError> {
        let p = self
            .paragraph_mut(path)
            .ok_or(ReplacementError::UnknownParagraph(*path))?;

        let is_run =
            |n: &XmlNode| matches!(n, XmlNode::Element(e) if e.is("r") || e.is("hyperlink"));
        let at = p
            .children
            .iter()
            .position(is_run)
            .unwrap_or(p.children.len());
        let run = build_run(p, text, format);
        p.children.retain(|n| !is_run(n));
        let at = at.min(p.children.len());
        p.children.insert(at, XmlNode::Element(run));
        Ok(())
    }
}
