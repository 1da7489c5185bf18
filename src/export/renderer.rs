//! Document rendering
//!
//! Renderers collect content blocks while the export runs and lay them out
//! in `finish`. The PDF renderer writes A4 pages with printpdf; content that
//! overflows a page continues on an extra page.

use super::ExportError;
use crate::text::wrap_words;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const LAYER: &str = "Konten";

/// A unit of document content
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    PageBreak,
    Heading { text: String, level: u8 },
    Text(String),
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Vertical space in millimetres
    Spacer(f32),
}

/// Page, text and table primitives used by the report export.
///
/// A document starts with one open page; `start_page` begins another.
pub trait DocumentRenderer: Send {
    fn start_page(&mut self);
    /// Level 1 is the page title, higher levels are section headings
    fn heading(&mut self, text: &str, level: u8);
    fn text(&mut self, text: &str);
    fn table(&mut self, headers: &[&str], rows: Vec<Vec<String>>);
    fn spacer(&mut self, height_mm: f32);
    /// Produce the document bytes
    fn finish(&mut self) -> Result<Vec<u8>, ExportError>;
}

/// Renders blocks to an A4 PDF
#[derive(Debug, Default)]
pub struct PdfRenderer {
    title: String,
    blocks: Vec<Block>,
    pages: usize,
}

impl PdfRenderer {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    /// Pages written by the last `finish`
    pub fn page_count(&self) -> usize {
        self.pages
    }
}

impl DocumentRenderer for PdfRenderer {
    fn start_page(&mut self) {
        self.blocks.push(Block::PageBreak);
    }

    fn heading(&mut self, text: &str, level: u8) {
        self.blocks.push(Block::Heading {
            text: text.to_string(),
            level,
        });
    }

    fn text(&mut self, text: &str) {
        self.blocks.push(Block::Text(text.to_string()));
    }

    fn table(&mut self, headers: &[&str], rows: Vec<Vec<String>>) {
        self.blocks.push(Block::Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        });
    }

    fn spacer(&mut self, height_mm: f32) {
        self.blocks.push(Block::Spacer(height_mm));
    }

    fn finish(&mut self) -> Result<Vec<u8>, ExportError> {
        let (doc, page, layer) =
            PdfDocument::new(self.title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(render_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(render_error)?;

        let mut cursor = Cursor {
            layer: doc.get_page(page).get_layer(layer),
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        };
        let new_page = |cursor: &mut Cursor| {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
            cursor.layer = doc.get_page(page).get_layer(layer);
            cursor.y = PAGE_HEIGHT - MARGIN;
            cursor.pages += 1;
        };

        for block in std::mem::take(&mut self.blocks) {
            match block {
                Block::PageBreak => new_page(&mut cursor),
                Block::Heading { text, level } => {
                    let (size, height) = if level <= 1 { (16.0, 9.0) } else { (12.0, 7.0) };
                    if !cursor.fits(height) {
                        new_page(&mut cursor);
                    }
                    cursor.write(&text, size, MARGIN, &bold);
                    cursor.y -= height;
                }
                Block::Text(text) => {
                    for line in wrap_words(&text, chars_for_width(PAGE_WIDTH - 2.0 * MARGIN)) {
                        if !cursor.fits(TEXT_LINE) {
                            new_page(&mut cursor);
                        }
                        cursor.write(&line, 10.0, MARGIN, &regular);
                        cursor.y -= TEXT_LINE;
                    }
                }
                Block::Table { headers, rows } => {
                    let columns = headers.len().max(1);
                    let width = (PAGE_WIDTH - 2.0 * MARGIN) / columns as f32;
                    if !cursor.fits(TABLE_ROW * 2.0) {
                        new_page(&mut cursor);
                    }
                    cursor.row(&headers, width, &bold);
                    for row in &rows {
                        if !cursor.fits(TABLE_ROW) {
                            new_page(&mut cursor);
                            cursor.row(&headers, width, &bold);
                        }
                        cursor.row(row, width, &regular);
                    }
                }
                Block::Spacer(height) => {
                    cursor.y -= height;
                }
            }
        }

        self.pages = cursor.pages;
        doc.save_to_bytes().map_err(render_error)
    }
}

const TEXT_LINE: f32 = 5.5;
const TABLE_ROW: f32 = 6.0;

struct Cursor {
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl Cursor {
    fn fits(&self, height: f32) -> bool {
        self.y - height >= MARGIN
    }

    fn write(&self, text: &str, size: f32, x: f32, font: &IndirectFontRef) {
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn row(&mut self, cells: &[String], width: f32, font: &IndirectFontRef) {
        let budget = chars_for_width(width - 2.0);
        for (i, cell) in cells.iter().enumerate() {
            let x = MARGIN + width * i as f32;
            self.write(&truncate(cell, budget), 10.0, x, font);
        }
        self.y -= TABLE_ROW;
    }
}

/// Rough character budget for 10pt Helvetica
fn chars_for_width(width_mm: f32) -> usize {
    ((width_mm / 1.9) as usize).max(1)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn render_error(e: impl std::fmt::Debug) -> ExportError {
    ExportError::Render(format!("{e:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truncate_marks_cut_text() {
        assert_eq!(truncate("Matematika", 20), "Matematika");
        assert_eq!(truncate("Matematika", 6), "Mat...");
    }

    #[test]
    fn test_pdf_output_and_page_count() {
        let mut renderer = PdfRenderer::new("Rapor");
        renderer.heading("Siswa 1", 1);
        renderer.text("Catatan wali kelas");
        renderer.start_page();
        renderer.heading("Siswa 2", 1);
        renderer.table(&["Mapel", "Nilai"], vec![vec!["IPA".to_string(), "90".to_string()]]);

        let bytes = renderer.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(renderer.page_count(), 2);
    }

    #[test]
    fn test_long_table_continues_on_new_page() {
        let mut renderer = PdfRenderer::new("Rapor");
        let rows = (0..100).map(|i| vec![i.to_string()]).collect();
        renderer.table(&["No"], rows);

        renderer.finish().unwrap();
        assert_eq!(renderer.page_count(), 3);
    }
}
