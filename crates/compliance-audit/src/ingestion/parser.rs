//! Multi-format text extraction

use calamine::Reader;

use super::layout;
use crate::config::IngestionConfig;
use crate::error::{Error, Result};
use crate::types::SourceKind;

/// Text extracted from one file
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Format tag
    pub kind: SourceKind,
    /// Extracted text content
    pub content: String,
    /// Pages processed (PDF only)
    pub pages_processed: Option<u32>,
}

/// Multi-format file parser
pub struct FileParser;

impl FileParser {
    /// Extract text based on the file's extension
    ///
    /// Images are not text sources; callers route them elsewhere before parsing.
    pub fn parse(filename: &str, data: &[u8], config: &IngestionConfig) -> Result<ParsedDocument> {
        let kind = SourceKind::from_filename(filename);

        let (content, pages_processed) = match kind {
            SourceKind::Pdf => {
                let (text, pages) =
                    Self::parse_pdf(filename, data, config.max_pdf_pages, config.line_tolerance)?;
                (text, Some(pages))
            }
            SourceKind::Xlsx | SourceKind::Xls => (Self::parse_workbook(filename, data)?, None),
            SourceKind::Csv => (Self::parse_csv(filename, data)?, None),
            SourceKind::Docx => (Self::parse_docx(filename, data)?, None),
            SourceKind::Image => {
                return Err(Error::file_parse(filename, "Images are not regulation text"));
            }
            SourceKind::Text | SourceKind::Unknown => (Self::parse_text(data), None),
        };

        Ok(ParsedDocument {
            kind,
            content,
            pages_processed,
        })
    }

    /// Parse PDF pages 1..=max_pages into `--- Page N ---` blocks
    fn parse_pdf(
        filename: &str,
        data: &[u8],
        max_pages: u32,
        tolerance: f32,
    ) -> Result<(String, u32)> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let pages = doc.get_pages();
        if pages.len() > max_pages as usize {
            tracing::debug!(
                "{} has {} pages, processing the first {}",
                filename,
                pages.len(),
                max_pages
            );
        }

        let mut content = String::new();
        let mut processed = 0u32;

        for (page_number, page_id) in pages.into_iter().take(max_pages as usize) {
            let fragments = layout::page_fragments(&doc, page_id)
                .map_err(|e| Error::file_parse(filename, format!("Page {}: {}", page_number, e)))?;

            content.push_str(&format!("--- Page {} ---\n", page_number));
            content.push_str(&layout::reflow(fragments, tolerance));
            content.push_str("\n\n");
            processed += 1;
        }

        Ok((content, processed))
    }

    /// Convert every sheet to CSV headed by its name, in workbook order
    fn parse_workbook(filename: &str, data: &[u8]) -> Result<String> {
        let cursor = std::io::Cursor::new(data);
        let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut sheets = Vec::new();
        for sheet_name in workbook.sheet_names().to_vec() {
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| Error::file_parse(filename, format!("Sheet '{}': {}", sheet_name, e)))?;

            // Ranges start at the first used cell; pad back to A1
            let (first_row, first_col) = range.start().unwrap_or((0, 0));
            let width = first_col as usize + range.width();
            let leading = (0..first_row).map(|_| vec![String::new(); width]);
            let rows = leading.chain(range.rows().map(|row| {
                std::iter::repeat_with(String::new)
                    .take(first_col as usize)
                    .chain(row.iter().map(cell_text))
                    .collect::<Vec<_>>()
            }));

            sheets.push((sheet_name, rows_to_csv(filename, rows)?));
        }

        Ok(format_sheets(&sheets))
    }

    /// A CSV file is a workbook with one sheet
    fn parse_csv(filename: &str, data: &[u8]) -> Result<String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data);

        let mut rows = Vec::new();
        for record in reader.byte_records() {
            let record = record.map_err(|e| Error::file_parse(filename, e.to_string()))?;
            rows.push(
                record
                    .iter()
                    .map(|field| String::from_utf8_lossy(field).into_owned())
                    .collect::<Vec<_>>(),
            );
        }

        let csv = rows_to_csv(filename, rows)?;
        Ok(format_sheets(&[("Sheet1".to_string(), csv)]))
    }

    /// Raw DOCX text: paragraphs (including those in table cells) separated by blank lines
    fn parse_docx(filename: &str, data: &[u8]) -> Result<String> {
        let doc = docx_rs::read_docx(data)
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut paragraphs = Vec::new();
        for child in &doc.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(p) => paragraphs.push(paragraph_text(p)),
                docx_rs::DocumentChild::Table(table) => table_paragraphs(table, &mut paragraphs),
                _ => {}
            }
        }

        Ok(paragraphs.join("\n\n"))
    }

    /// Decode bytes as UTF-8, replacing invalid sequences and dropping a leading BOM
    fn parse_text(data: &[u8]) -> String {
        let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
        String::from_utf8_lossy(data).into_owned()
    }
}

/// Readable text of one spreadsheet cell
fn cell_text(cell: &calamine::Data) -> String {
    match cell {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(s) => s.clone(),
        calamine::Data::Float(f) => f.to_string(),
        calamine::Data::Int(i) => i.to_string(),
        calamine::Data::Bool(b) => b.to_string().to_uppercase(),
        calamine::Data::DateTime(dt) => excel_datetime_text(dt),
        calamine::Data::DateTimeIso(s) | calamine::Data::DurationIso(s) => s.clone(),
        _ => String::new(),
    }
}

/// Date cells as `YYYY-MM-DD`, with the time appended when it is not midnight
fn excel_datetime_text(dt: &calamine::ExcelDateTime) -> String {
    if dt.is_duration() {
        return dt.as_f64().to_string();
    }
    match dt.as_datetime() {
        Some(value) if value.time() == chrono::NaiveTime::MIN => value.format("%Y-%m-%d").to_string(),
        Some(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => dt.as_f64().to_string(),
    }
}

/// Rows to CSV text; blank rows stay as bare separators
fn rows_to_csv<I>(filename: &str, rows: I) -> Result<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut lines = Vec::new();

    for row in rows {
        if row.iter().all(|cell| cell.is_empty()) {
            lines.push(",".repeat(row.len().saturating_sub(1)));
            continue;
        }

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        writer
            .write_record(&row)
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;
        let line =
            String::from_utf8(bytes).map_err(|e| Error::file_parse(filename, e.to_string()))?;
        lines.push(line.trim_end_matches(['\r', '\n']).to_string());
    }

    Ok(lines.join("\n"))
}

fn format_sheets(sheets: &[(String, String)]) -> String {
    sheets
        .iter()
        .map(|(name, csv)| format!("--- Sheet: {} ---\n{}\n\n", name, csv))
        .collect()
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                    docx_rs::RunChild::Tab(_) => text.push('\t'),
                    docx_rs::RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }
    text
}

fn table_paragraphs(table: &docx_rs::Table, out: &mut Vec<String>) {
    for row in &table.rows {
        let docx_rs::TableChild::TableRow(row) = row;
        for cell in &row.cells {
            let docx_rs::TableRowChild::TableCell(cell) = cell;
            for content in &cell.children {
                match content {
                    docx_rs::TableCellContent::Paragraph(p) => out.push(paragraph_text(p)),
                    docx_rs::TableCellContent::Table(inner) => table_paragraphs(inner, out),
                    _ => {}
                }
            }
        }
    }
}
