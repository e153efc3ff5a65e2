// src/pdf.rs
//! Article PDF export: A4 pages, wrapped text, optional embedded TTF for
//! non-Latin scripts, best-effort right-to-left rendering by reversing each
//! visual line. Renders to bytes; writing them anywhere is the caller's job.

use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use printpdf::{BuiltinFont, Mm, PdfDocument};

use crate::config::PdfSection;

const TITLE_WRAP: usize = 55;
const BODY_WRAP: usize = 90;

#[derive(Debug, Clone, Default)]
pub struct PdfOptions {
    /// TTF to embed; without one a builtin Latin font is used.
    pub font_path: Option<PathBuf>,
    /// Reverse each rendered line (right-to-left scripts).
    pub rtl: bool,
}

impl From<&PdfSection> for PdfOptions {
    fn from(s: &PdfSection) -> Self {
        Self {
            font_path: s.font_path.as_ref().map(PathBuf::from),
            rtl: s.rtl,
        }
    }
}

/// Render `title` and `body` into a single PDF document.
pub fn render_pdf(title: &str, body: &str, opts: &PdfOptions) -> anyhow::Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(title, Mm(210.0), Mm(297.0), "layer 1");

    let font = match &opts.font_path {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("open pdf font {}", path.display()))?;
            doc.add_external_font(file).context("embed pdf font")?
        }
        None => doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .context("builtin pdf font")?,
    };

    let mut layer_ref = doc.get_page(page).get_layer(layer);
    let mut y = 277.0;

    for line in wrap_text(title, TITLE_WRAP) {
        if y < 20.0 {
            let (p, l) = doc.add_page(Mm(210.0), Mm(297.0), "layer 1");
            layer_ref = doc.get_page(p).get_layer(l);
            y = 277.0;
        }
        if !line.is_empty() {
            layer_ref.use_text(visual_line(&line, opts.rtl), 16.0, Mm(15.0), Mm(y), &font);
        }
        y -= 8.0;
    }
    y -= 4.0;

    for line in wrap_text(body, BODY_WRAP) {
        if y < 20.0 {
            let (p, l) = doc.add_page(Mm(210.0), Mm(297.0), "layer 1");
            layer_ref = doc.get_page(p).get_layer(l);
            y = 277.0;
        }
        if !line.is_empty() {
            layer_ref.use_text(visual_line(&line, opts.rtl), 11.0, Mm(15.0), Mm(y), &font);
        }
        y -= 6.0;
    }

    doc.save_to_bytes().context("serialize pdf")
}

/// Reversing the characters of each finished line approximates RTL layout
/// well enough for print; proper bidi shaping is out of scope.
fn visual_line(line: &str, rtl: bool) -> String {
    if rtl {
        line.chars().rev().collect()
    } else {
        line.to_string()
    }
}

/// Greedy word wrap; an overlong word is hard-split. Blank source lines
/// survive as paragraph gaps, trailing gaps are dropped.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        if paragraph.trim().is_empty() {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            continue;
        }
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word = word;
            while word.chars().count() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let split_at = word
                    .char_indices()
                    .nth(max_chars)
                    .map(|(i, _)| i)
                    .unwrap_or(word.len());
                lines.push(word[..split_at].to_string());
                word = &word[split_at..];
            }
            if current.is_empty() {
                current.push_str(word);
            } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/* ----------------------------
Tests
---------------------------- */
