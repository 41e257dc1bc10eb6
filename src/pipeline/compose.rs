//! Document composer: typeset recognised text into a new PDF.
//!
//! The model is deliberately plain. The accumulated text is split on every
//! `'\n'` and each piece becomes one paragraph flowable, followed by a fixed
//! 0.2 inch spacer. One style everywhere: Helvetica 10 pt on 12 pt leading,
//! A4 pages with one-inch margins. Blank lines therefore turn into empty
//! paragraphs (spacer only) and multi-line paragraphs stay fragmented.
//!
//! OCR output is arbitrary text, so every paragraph goes through
//! [`sanitize_text`] before layout. printpdf emits built-in font text as
//! raw UTF-8, which the font reads as WinAnsi, so anything beyond printable
//! ASCII is folded or replaced first.
//!
//! Output is generated with `printpdf` 0.8, which builds pages from
//! `Vec<Op>` operation lists and serialises them via `PdfDocument::save()`.

use crate::error::OcrPdfError;
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, TextItem,
};
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, info, warn};

const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// Page geometry and the single paragraph style.
#[derive(Debug, Clone, PartialEq)]
pub struct PageStyle {
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pub margin_pt: f32,
    pub font_size_pt: f32,
    pub leading_pt: f32,
    /// Vertical gap inserted after every paragraph.
    pub spacer_pt: f32,
}

impl Default for PageStyle {
    /// A4, 1 inch margins, Helvetica 10/12, 0.2 inch paragraph spacer.
    fn default() -> Self {
        Self {
            page_width_pt: 210.0 * POINTS_PER_MM,
            page_height_pt: 297.0 * POINTS_PER_MM,
            margin_pt: 72.0,
            font_size_pt: 10.0,
            leading_pt: 12.0,
            spacer_pt: 0.2 * 72.0,
        }
    }
}

impl PageStyle {
    pub fn frame_width(&self) -> f32 {
        self.page_width_pt - 2.0 * self.margin_pt
    }

    fn frame_top(&self) -> f32 {
        self.page_height_pt - self.margin_pt
    }
}

/// One line of text placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    /// Index of the paragraph this line belongs to.
    pub paragraph: usize,
    pub x: f32,
    /// Baseline, measured from the bottom of the page.
    pub y: f32,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub lines: Vec<PlacedLine>,
}

/// Result of flowing paragraphs onto pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub pages: Vec<PageLayout>,
    pub paragraph_count: usize,
}

/// A fully serialised output document.
#[derive(Debug, Clone)]
pub struct ComposedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub paragraph_count: usize,
}

/// Split accumulated text into paragraph units, one per line.
///
/// `"a\n\nb"` gives `["a", "", "b"]`; nothing is merged or dropped.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

/// Make arbitrary OCR text safe for a built-in PDF font.
///
/// printpdf writes built-in font text as raw UTF-8 bytes, so only printable
/// ASCII survives intact. Tabs become spaces, control characters are
/// dropped, Latin-1 letters and common typographic punctuation are folded to
/// ASCII and anything else becomes `?`. Returns the input unchanged when
/// nothing needed fixing.
pub fn sanitize_text(text: &str) -> Cow<'_, str> {
    let clean = |c: char| (' '..='~').contains(&c);
    if text.chars().all(clean) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            c if clean(c) => out.push(c),
            '\t' => out.push(' '),
            c if c.is_control() => {}
            '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{2032}' => out.push('\''),
            '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{2033}' => out.push('"'),
            '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
            '\u{2022}' | '\u{2023}' | '\u{25cf}' => out.push('*'),
            '\u{2026}' => out.push_str("..."),
            '\u{a0}'..='\u{ff}' => out.push_str(fold_latin1(c)),
            '\u{fb01}' => out.push_str("fi"),
            '\u{fb02}' => out.push_str("fl"),
            // Zero-width characters and the BOM.
            '\u{200b}'..='\u{200d}' | '\u{2060}' | '\u{feff}' => {}
            c if c.is_whitespace() => out.push(' '),
            _ => out.push('?'),
        }
    }
    Cow::Owned(out)
}

/// ASCII spelling of a Latin-1 supplement character.
fn fold_latin1(c: char) -> &'static str {
    match c {
        '\u{a0}' => " ",
        '\u{ad}' => "",
        '\u{a9}' => "(c)",
        '\u{ae}' => "(R)",
        '\u{ab}' => "<<",
        '\u{bb}' => ">>",
        '\u{b4}' => "'",
        '\u{b7}' => "*",
        '\u{d7}' => "x",
        '\u{f7}' => "/",
        '\u{c0}'..='\u{c5}' => "A",
        '\u{c6}' => "AE",
        '\u{c7}' => "C",
        '\u{c8}'..='\u{cb}' => "E",
        '\u{cc}'..='\u{cf}' => "I",
        '\u{d0}' => "D",
        '\u{d1}' => "N",
        '\u{d2}'..='\u{d6}' | '\u{d8}' => "O",
        '\u{d9}'..='\u{dc}' => "U",
        '\u{dd}' => "Y",
        '\u{de}' => "Th",
        '\u{df}' => "ss",
        '\u{e0}'..='\u{e5}' => "a",
        '\u{e6}' => "ae",
        '\u{e7}' => "c",
        '\u{e8}'..='\u{eb}' => "e",
        '\u{ec}'..='\u{ef}' => "i",
        '\u{f0}' => "d",
        '\u{f1}' => "n",
        '\u{f2}'..='\u{f6}' | '\u{f8}' => "o",
        '\u{f9}'..='\u{fc}' => "u",
        '\u{fd}' | '\u{ff}' => "y",
        '\u{fe}' => "th",
        _ => "?",
    }
}

/// Helvetica advance widths (1/1000 em) for printable ASCII, from the
/// standard AFM metrics.
const HELVETICA_ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

fn char_width(c: char, font_size: f32) -> f32 {
    let units = match c {
        ' '..='~' => HELVETICA_ASCII_WIDTHS[c as usize - 0x20],
        _ => 556,
    };
    units as f32 * font_size / 1000.0
}

/// Rendered width of `text` in points.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(|c| char_width(c, font_size)).sum()
}

/// Greedy word wrap to `max_width` points. Words wider than a line are
/// broken between characters. An empty or all-space paragraph yields no
/// lines.
pub fn wrap_paragraph(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let space = char_width(' ', font_size);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0_f32;

    for word in text.split_whitespace() {
        let word_width = text_width(word, font_size);

        if word_width > max_width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }
            for c in word.chars() {
                let w = char_width(c, font_size);
                if current_width + w > max_width && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0.0;
                }
                current.push(c);
                current_width += w;
            }
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_width = word_width;
        } else if current_width + space + word_width <= max_width {
            current.push(' ');
            current.push_str(word);
            current_width += space + word_width;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
            current_width = word_width;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Flow paragraphs top to bottom, breaking pages when a line or spacer no
/// longer fits. Always produces at least one page.
pub fn layout(paragraphs: &[&str], style: &PageStyle) -> Layout {
    let frame_top = style.frame_top();
    let frame_bottom = style.margin_pt;
    let mut pages = vec![PageLayout::default()];
    // Top of the remaining free space on the current page.
    let mut cursor = frame_top;

    for (index, paragraph) in paragraphs.iter().enumerate() {
        let text = sanitize_text(paragraph);
        for line in wrap_paragraph(&text, style.frame_width(), style.font_size_pt) {
            if cursor - style.leading_pt < frame_bottom && cursor < frame_top {
                pages.push(PageLayout::default());
                cursor = frame_top;
            }
            cursor -= style.leading_pt;
            // Baseline sits a descender's depth above the bottom of the line box.
            let baseline = cursor + (style.leading_pt - style.font_size_pt);
            if let Some(page) = pages.last_mut() {
                page.lines.push(PlacedLine {
                    paragraph: index,
                    x: style.margin_pt,
                    y: baseline,
                    text: line,
                });
            }
        }

        // A spacer that does not fit is swallowed by the page break.
        cursor = if cursor - style.spacer_pt < frame_bottom {
            frame_bottom
        } else {
            cursor - style.spacer_pt
        };
    }

    Layout {
        pages,
        paragraph_count: paragraphs.len(),
    }
}

/// Serialise a layout to PDF bytes.
pub fn render_pdf(layout: &Layout, style: &PageStyle, title: &str) -> Vec<u8> {
    let page_w = Mm(style.page_width_pt / POINTS_PER_MM);
    let page_h = Mm(style.page_height_pt / POINTS_PER_MM);

    let mut doc = PdfDocument::new(title);
    let pages: Vec<PdfPage> = layout
        .pages
        .iter()
        .map(|page| {
            let mut ops: Vec<Op> = Vec::with_capacity(page.lines.len() * 5);
            for line in &page.lines {
                ops.push(Op::StartTextSection);
                ops.push(Op::SetTextCursor {
                    pos: Point {
                        x: Pt(line.x),
                        y: Pt(line.y),
                    },
                });
                ops.push(Op::SetFontSizeBuiltinFont {
                    size: Pt(style.font_size_pt),
                    font: BuiltinFont::Helvetica,
                });
                ops.push(Op::WriteTextBuiltinFont {
                    items: vec![TextItem::Text(line.text.clone())],
                    font: BuiltinFont::Helvetica,
                });
                ops.push(Op::EndTextSection);
            }
            PdfPage::new(page_w, page_h, ops)
        })
        .collect();

    doc.with_pages(pages);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        warn!("printpdf reported {} warnings while saving", warnings.len());
    }
    bytes
}

/// Split, lay out and serialise `text` in one go.
pub fn compose(text: &str, title: &str) -> Result<ComposedPdf, OcrPdfError> {
    let style = PageStyle::default();
    let paragraphs = split_paragraphs(text);
    let layout = layout(&paragraphs, &style);
    let bytes = render_pdf(&layout, &style, title);

    if !bytes.starts_with(b"%PDF") {
        return Err(OcrPdfError::ComposeFailed(
            "PDF writer produced no PDF header".into(),
        ));
    }

    debug!(
        paragraphs = layout.paragraph_count,
        pages = layout.pages.len(),
        bytes = bytes.len(),
        "Layout complete"
    );

    Ok(ComposedPdf {
        bytes,
        page_count: layout.pages.len(),
        paragraph_count: layout.paragraph_count,
    })
}

/// Write PDF bytes to `path`, replacing any existing file.
///
/// Atomic write: the bytes go to a sibling temp file which is then renamed
/// over the target, so a failed run never leaves a truncated PDF behind.
pub async fn write_pdf(path: &Path, bytes: &[u8]) -> Result<(), OcrPdfError> {
    let write_err = |source: std::io::Error| OcrPdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_blank_lines_as_empty_paragraphs() {
        assert_eq!(
            split_paragraphs("HELLO\n\nWORLD\n\n"),
            vec!["HELLO", "", "WORLD", "", ""]
        );
        assert_eq!(split_paragraphs(""), vec![""]);
    }

    #[test]
    fn sanitize_borrows_clean_text() {
        assert!(matches!(
            sanitize_text("Plain <b>text</b> & more"),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn sanitize_folds_and_replaces() {
        assert_eq!(
            sanitize_text("\u{201c}Quote\u{201d}\tand\u{2014}dash\u{2026}"),
            "\"Quote\" and-dash..."
        );
        assert_eq!(sanitize_text("a\u{c}b\rc"), "abc");
        assert_eq!(sanitize_text("caf\u{e9} na\u{ef}ve"), "cafe naive");
        assert_eq!(sanitize_text("Stra\u{df}e \u{c6}gir \u{a9}"), "Strasse AEgir (c)");
        assert_eq!(sanitize_text("50\u{b0}"), "50?");
        assert_eq!(sanitize_text("\u{4e2d}\u{6587}"), "??");
        assert_eq!(sanitize_text("\u{feff}\u{fb01}le"), "file");
    }

    #[test]
    fn text_width_uses_helvetica_metrics() {
        // "Hi" = H (722) + i (222) at 10 pt.
        assert!((text_width("Hi", 10.0) - 9.44).abs() < 1e-4);
    }

    #[test]
    fn wrap_respects_width() {
        let style = PageStyle::default();
        let para = "lorem ipsum dolor sit amet ".repeat(40);
        let lines = wrap_paragraph(&para, style.frame_width(), style.font_size_pt);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, style.font_size_pt) <= style.frame_width());
        }
        assert_eq!(
            lines.join(" "),
            para.split_whitespace().collect::<Vec<_>>().join(" ")
        );
    }

    #[test]
    fn wrap_breaks_oversized_words() {
        let word = "W".repeat(200);
        let lines = wrap_paragraph(&word, 100.0, 10.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn wrap_of_blank_paragraph_is_empty() {
        assert!(wrap_paragraph("", 400.0, 10.0).is_empty());
        assert!(wrap_paragraph("   ", 400.0, 10.0).is_empty());
    }

    #[test]
    fn layout_keeps_paragraph_order_on_one_page() {
        let style = PageStyle::default();
        let laid = layout(&["HELLO", "", "WORLD"], &style);
        assert_eq!(laid.paragraph_count, 3);
        assert_eq!(laid.pages.len(), 1);
        let lines = &laid.pages[0].lines;
        assert_eq!(lines.len(), 2);
        assert_eq!((lines[0].paragraph, lines[0].text.as_str()), (0, "HELLO"));
        assert_eq!((lines[1].paragraph, lines[1].text.as_str()), (2, "WORLD"));
        // Two spacers and one empty paragraph separate them, plus one line.
        let gap = lines[0].y - lines[1].y;
        assert!((gap - (style.leading_pt + 2.0 * style.spacer_pt)).abs() < 1e-3);
    }

    #[test]
    fn layout_breaks_pages() {
        let style = PageStyle::default();
        let paragraphs: Vec<String> = (1..=200).map(|i| format!("line {i}")).collect();
        let refs: Vec<&str> = paragraphs.iter().map(String::as_str).collect();
        let laid = layout(&refs, &style);
        assert!(laid.pages.len() > 1);
        for page in &laid.pages {
            for line in &page.lines {
                assert!(line.y >= style.margin_pt);
                assert!(line.y <= style.page_height_pt - style.margin_pt);
            }
        }
        let all: Vec<&str> = laid
            .pages
            .iter()
            .flat_map(|p| p.lines.iter().map(|l| l.text.as_str()))
            .collect();
        assert_eq!(all, refs);
    }

    #[test]
    fn empty_text_still_yields_one_page() {
        let composed = compose("", "empty").unwrap();
        assert_eq!(composed.page_count, 1);
        assert_eq!(composed.paragraph_count, 1);
    }

    #[test]
    fn compose_produces_readable_pdf() {
        let composed = compose("HELLO\n\nWORLD\n\n\n\n", "fixture").unwrap();
        assert!(composed.bytes.starts_with(b"%PDF"));
        let doc = lopdf::Document::load_mem(&composed.bytes).expect("lopdf parses output");
        assert_eq!(doc.get_pages().len(), composed.page_count);
    }

    #[test]
    fn composed_text_survives_extraction() {
        let composed = compose("a (b) \\c <d>\ncaf\u{e9} na\u{ef}ve", "accents").unwrap();
        let doc = lopdf::Document::load_mem(&composed.bytes).unwrap();
        let text = doc.extract_text(&[1]).unwrap();
        assert!(text.contains("a (b) \\c <d>"), "extracted: {text:?}");
        assert!(text.contains("cafe naive"), "extracted: {text:?}");
        assert!(!text.contains('\u{c3}'), "UTF-8 bytes leaked: {text:?}");
    }

    #[tokio::test]
    async fn write_pdf_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.pdf");
        write_pdf(&path, b"%PDF-first").await.unwrap();
        write_pdf(&path, b"%PDF-second").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-second");
        assert!(!path.with_extension("pdf.tmp").exists());
    }
}
