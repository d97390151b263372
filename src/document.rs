//! The paragraph capability surface the engine needs from a document
//! backend, plus a plain in-memory backend.

use serde::{Deserialize, Serialize};

use crate::error::ReplacementError;
use crate::locator::ParagraphPath;

/// Character formatting carried by a run. `None` means inherited from the
/// paragraph or style, which is different from explicitly off.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFormat {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    /// Underline style as stored in the document, e.g. `single`.
    pub underline: Option<String>,
    pub font_name: Option<String>,
    pub font_size_half_points: Option<u32>,
}

impl RunFormat {
    pub fn is_underlined(&self) -> bool {
        matches!(self.underline.as_deref(), Some(u) if u != "none")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub format: RunFormat,
}

impl TextRun {
    pub fn new(text: impl Into<String>, format: RunFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, RunFormat::default())
    }
}

/// One paragraph as seen by matching: its flattened text plus the runs it
/// was built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParagraphText {
    pub path: ParagraphPath,
    pub text: String,
    pub runs: Vec<TextRun>,
}

impl ParagraphText {
    pub fn from_runs(path: ParagraphPath, runs: Vec<TextRun>) -> Self {
        let text = runs.iter().map(|r| r.text.as_str()).collect();
        Self { path, text, runs }
    }

    /// Formatting of the first run, applied to the whole paragraph when it
    /// is rewritten.
    pub fn lead_format(&self) -> RunFormat {
        self.runs.first().map(|r| r.format.clone()).unwrap_or_default()
    }
}

/// Read access: every paragraph in reading order, body paragraphs first,
/// then each table by row, cell and paragraph.
pub trait ParagraphSource {
    fn paragraphs(&self) -> Vec<ParagraphText>;
}

/// Write access used by fill. Implementations replace the paragraph's runs
/// with a single run of `text` carrying `format`.
pub trait EditableDocument: ParagraphSource + Clone {
    fn rewrite_paragraph(
        &mut self,
        path: &ParagraphPath,
        text: &str,
        format: &RunFormat,
    ) -> Result<(), ReplacementError>;
}

type Cell = Vec<Vec<TextRun>>;

/// Documents built in memory, without a file format behind them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextDocument {
    body: Vec<Vec<TextRun>>,
    tables: Vec<Vec<Vec<Cell>>>,
}

impl TextDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paragraph(self, text: &str) -> Self {
        self.with_runs(vec![TextRun::plain(text)])
    }

    pub fn with_runs(mut self, runs: Vec<TextRun>) -> Self {
        self.body.push(runs);
        self
    }

    /// A table given as rows of cells of paragraph texts.
    pub fn with_table(mut self, rows: &[&[&[&str]]]) -> Self {
        let table = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.iter().map(|p| vec![TextRun::plain(*p)]).collect())
                    .collect()
            })
            .collect();
        self.tables.push(table);
        self
    }

    fn runs_mut(&mut self, path: &ParagraphPath) -> Option<&mut Vec<TextRun>> {
        match *path {
            ParagraphPath::Body { paragraph } => self.body.get_mut(paragraph),
            ParagraphPath::Cell {
                table,
                row,
                cell,
                paragraph,
            } => self
                .tables
                .get_mut(table)?
                .get_mut(row)?
                .get_mut(cell)?
                .get_mut(paragraph),
        }
    }
}

impl ParagraphSource for TextDocument {
    fn paragraphs(&self) -> Vec<ParagraphText> {
        let mut out = Vec::new();
        for (i, runs) in self.body.iter().enumerate() {
            out.push(ParagraphText::from_runs(ParagraphPath::Body { paragraph: i }, runs.clone()));
        }
        for (t, table) in self.tables.iter().enumerate() {
            for (r, row) in table.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    for (p, runs) in cell.iter().enumerate() {
                        let path = ParagraphPath::Cell {
                            table: t,
                            row: r,
                            cell: c,
                            paragraph: p,
                        };
                        out.push(ParagraphText::from_runs(path, runs.clone()));
                    }
                }
            }
        }
        out
    }
}

impl EditableDocument for TextDocument {
    fn rewrite_paragraph(
        &mut self,
        path: &ParagraphPath,
        text: &str,
        format: &RunFormat,
    ) -> Result<(), ReplacementError> {
        let runs = self
            .runs_mut(path)
            .ok_or(ReplacementError::UnknownParagraph(*path))?;
        *runs = vec![TextRun::new(text, format.clone())];
        Ok(())
    }
}
