//! Plain HTML preview of a document's paragraphs and tables.

use crate::document::{ParagraphSource, ParagraphText, TextRun};
use crate::locator::ParagraphPath;

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Document Preview</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: 'Calibri', 'Arial', sans-serif;
            font-size: 11pt;
            line-height: 1.6;
            color: #000000;
            background-color: #ffffff;
            padding: 2rem;
            max-width: 8.5in;
            margin: 0 auto;
        }
        p { margin-bottom: 0.5rem; text-align: justify; }
        table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
        table, td { border: 1px solid #000000; }
        td { padding: 0.5rem; text-align: left; vertical-align: top; }
        strong, b { font-weight: bold; }
        em, i { font-style: italic; }
        u { text-decoration: underline; }
    </style>
</head>
<body>
"#;

const PAGE_TAIL: &str = "</body>\n</html>\n";

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn render_run(run: &TextRun, out: &mut String) {
    if run.text.is_empty() {
        return;
    }
    let mut open = String::new();
    let mut close = String::new();
    for (on, tag) in [
        (run.format.bold == Some(true), "b"),
        (run.format.italic == Some(true), "i"),
        (run.format.is_underlined(), "u"),
    ] {
        if on {
            open.push_str(&format!("<{tag}>"));
            close.insert_str(0, &format!("</{tag}>"));
        }
    }
    let body = escape_html(&run.text)
        .replace('\n', "<br/>")
        .replace('\t', "&emsp;");
    out.push_str(&open);
    out.push_str(&body);
    out.push_str(&close);
}

fn render_paragraph(p: &ParagraphText, out: &mut String) {
    out.push_str("<p>");
    for run in &p.runs {
        render_run(run, out);
    }
    out.push_str("</p>");
}

/// Cell position of a paragraph, without its paragraph index.
fn cell_of(path: &ParagraphPath) -> Option<(usize, usize, usize)> {
    match *path {
        ParagraphPath::Body { .. } => None,
        ParagraphPath::Cell { table, row, cell, .. } => Some((table, row, cell)),
    }
}

/// Body paragraphs followed by tables, each paragraph rendered with its own
/// run formatting.
pub fn render_fragment<D: ParagraphSource + ?Sized>(doc: &D) -> String {
    let mut out = String::new();
    let mut current: Option<(usize, usize, usize)> = None;

    for p in doc.paragraphs() {
        let Some((t, r, c)) = cell_of(&p.path) else {
            render_paragraph(&p, &mut out);
            out.push('\n');
            continue;
        };
        match current {
            Some((ct, cr, cc)) if ct == t && cr == r && cc == c => {}
            Some((ct, cr, _)) if ct == t && cr == r => out.push_str("</td><td>"),
            Some((ct, _, _)) if ct == t => out.push_str("</td></tr>\n<tr><td>"),
            Some(_) => out.push_str("</td></tr>\n</table>\n<table>\n<tr><td>"),
            None => out.push_str("<table>\n<tr><td>"),
        }
        current = Some((t, r, c));
        render_paragraph(&p, &mut out);
    }
    if current.is_some() {
        out.push_str("</td></tr>\n</table>\n");
    }
    out
}

/// A complete standalone HTML page for `doc`.
pub fn render_html<D: ParagraphSource + ?Sized>(doc: &D) -> String {
    let mut html = String::from(PAGE_HEAD);
    html.push_str(&render_fragment(doc));
    html.push_str(PAGE_TAIL);
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{RunFormat, TextDocument};

    #[test]
    fn escapes_text() {
        assert_eq!(escape_html("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }

    #[test]
    fn renders_run_formatting() {
        let fmt = RunFormat {
            bold: Some(true),
            italic: Some(false),
            underline: Some("single".into()),
            ..RunFormat::default()
        };
        let doc = TextDocument::new()
            .with_runs(vec![TextRun::new("Jane", fmt), TextRun::plain(" & co\nnext")]);
        assert_eq!(render_fragment(&doc), "<p><b><u>Jane</u></b> &amp; co<br/>next</p>\n");
    }

    #[test]
    fn renders_tables_by_row_and_cell() {
        let doc = TextDocument::new()
            .with_paragraph("intro")
            .with_table(&[&[&["a"], &["b1", "b2"]], &[&["c"]]])
            .with_table(&[&[&["d"]]]);
        assert_eq!(
            render_fragment(&doc),
            concat!(
                "<p>intro</p>\n",
                "<table>\n<tr><td><p>a</p></td><td><p>b1</p><p>b2</p></td></tr>\n",
                "<tr><td><p>c</p></td></tr>\n</table>\n",
                "<table>\n<tr><td><p>d</p></td></tr>\n</table>\n",
            )
        );
    }

    #[test]
    fn wraps_in_a_page() {
        let html = render_html(&TextDocument::new().with_paragraph("x"));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<p>x</p>"));
        assert!(html.trim_end().ends_with("</html>"));
    }
}
