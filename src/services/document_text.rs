use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

#[derive(Debug, thiserror::Error)]
pub(crate) enum DocumentError {
    #[error("Unsupported file format '{extension}'. Please upload XLSX, XLS, XLSM, ODS, DOCX, PDF or TXT.")]
    UnsupportedFormat { extension: String },
    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(String),
    #[error("Failed to read DOCX document: {0}")]
    Docx(String),
    #[error("Failed to read PDF document: {0}")]
    Pdf(String),
    #[error("Text document is not valid UTF-8")]
    Encoding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DocumentFormat {
    Spreadsheet,
    Docx,
    Pdf,
    PlainText,
}

impl DocumentFormat {
    /// Picks the adapter from the file extension (case-insensitive).
    pub(crate) fn detect(file_name: &str) -> Result<Self, DocumentError> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" | "xls" | "xlsm" | "ods" => Ok(DocumentFormat::Spreadsheet),
            "docx" => Ok(DocumentFormat::Docx),
            "pdf" => Ok(DocumentFormat::Pdf),
            "txt" => Ok(DocumentFormat::PlainText),
            _ => Err(DocumentError::UnsupportedFormat {
                extension: if extension.is_empty() { "<none>".to_string() } else { extension },
            }),
        }
    }

    pub(crate) fn source_label(self) -> &'static str {
        match self {
            DocumentFormat::Spreadsheet => "spreadsheet",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::PlainText => "text",
        }
    }
}

/// One data row of a sheet keyed by the header row's column names.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SheetRow {
    cells: HashMap<String, String>,
}

impl SheetRow {
    pub(crate) fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let cells = pairs
            .into_iter()
            .map(|(key, value)| (key.into().trim().to_string(), value.into().trim().to_string()))
            .filter(|(key, value)| !key.is_empty() && !value.is_empty())
            .collect();
        Self { cells }
    }

    /// First non-empty cell among `aliases`, tried in order.
    pub(crate) fn first_of(&self, aliases: &[&str]) -> Option<&str> {
        aliases
            .iter()
            .filter_map(|alias| self.cells.get(*alias))
            .map(String::as_str)
            .find(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SheetTable {
    pub(crate) name: String,
    pub(crate) rows: Vec<SheetRow>,
}

/// Reads every sheet (or only `only_sheet`) into header-keyed rows.
pub(crate) fn read_workbook(
    bytes: &[u8],
    only_sheet: Option<&str>,
) -> Result<Vec<SheetTable>, DocumentError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|err| DocumentError::Spreadsheet(err.to_string()))?;

    let sheet_names: Vec<String> = match only_sheet.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => vec![name.to_string()],
        None => workbook.sheet_names().to_vec(),
    };

    let mut tables = Vec::with_capacity(sheet_names.len());
    for name in sheet_names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|err| DocumentError::Spreadsheet(format!("sheet '{name}': {err}")))?;

        let mut rows_iter = range.rows();
        let headers: Vec<String> = match rows_iter.next() {
            Some(header_row) => header_row.iter().map(cell_to_string).collect(),
            None => {
                tables.push(SheetTable { name, rows: Vec::new() });
                continue;
            }
        };

        let rows = rows_iter
            .map(|row| {
                SheetRow::from_pairs(
                    headers.iter().zip(row.iter()).map(|(h, cell)| (h.clone(), cell_to_string(cell))),
                )
            })
            .collect();
        tables.push(SheetTable { name, rows });
    }

    Ok(tables)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{f:.0}")
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

/// Flattens a DOCX body into lines: one per paragraph, one per table row with
/// its cells separated by spaces.
pub(crate) fn docx_to_text(bytes: &[u8]) -> Result<String, DocumentError> {
    let docx = docx_rs::read_docx(bytes).map_err(|err| DocumentError::Docx(err.to_string()))?;

    let mut out = String::with_capacity(8192);
    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(para) => {
                out.push_str(&paragraph_text(para));
                out.push('\n');
            }
            docx_rs::DocumentChild::Table(table) => table_text(table, &mut out),
            _ => {}
        }
    }
    Ok(out)
}

fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut line = String::new();
    for child in &para.children {
        match child {
            docx_rs::ParagraphChild::Run(run) => run_text(run, &mut line),
            docx_rs::ParagraphChild::Hyperlink(hyperlink) => {
                for inner in &hyperlink.children {
                    if let docx_rs::ParagraphChild::Run(run) = inner {
                        run_text(run, &mut line);
                    }
                }
            }
            docx_rs::ParagraphChild::Insert(insert) => {
                for inner in &insert.children {
                    if let docx_rs::InsertChild::Run(run) = inner {
                        run_text(run, &mut line);
                    }
                }
            }
            _ => {}
        }
    }
    line
}

fn run_text(run: &docx_rs::Run, out: &mut String) {
    for child in &run.children {
        match child {
            docx_rs::RunChild::Text(text) => out.push_str(&text.text),
            docx_rs::RunChild::Tab(_) => out.push(' '),
            docx_rs::RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}

#[allow(irrefutable_let_patterns)]
fn table_text(table: &docx_rs::Table, out: &mut String) {
    for row in &table.rows {
        let docx_rs::TableChild::TableRow(row) = row else { continue };
        let mut cells = Vec::new();
        for cell in &row.cells {
            let docx_rs::TableRowChild::TableCell(cell) = cell else { continue };
            let mut cell_text = String::new();
            for content in &cell.children {
                if let docx_rs::TableCellContent::Paragraph(para) = content {
                    let text = paragraph_text(para);
                    if !text.trim().is_empty() {
                        if !cell_text.is_empty() {
                            cell_text.push('\n');
                        }
                        cell_text.push_str(text.trim());
                    }
                }
            }
            if !cell_text.is_empty() {
                cells.push(cell_text);
            }
        }
        if !cells.is_empty() {
            out.push_str(&cells.join(" "));
            out.push('\n');
        }
    }
}

/// Text layer of a PDF in reading order. Scanned pages without a text layer
/// come back empty.
pub(crate) fn pdf_to_text(bytes: &[u8]) -> Result<String, DocumentError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|err| DocumentError::Pdf(err.to_string()))
}

pub(crate) fn plain_text(bytes: &[u8]) -> Result<String, DocumentError> {
    let text = std::str::from_utf8(bytes).map_err(|_| DocumentError::Encoding)?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// Canonical text for the marker parser: ASCII quotes and dashes, single
/// spaces, no leading/trailing blanks on lines, no empty lines.
pub(crate) fn normalize_text(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .map(|ch| match ch {
            '\u{00a0}' | '\t' => ' ',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .collect();

    let mut out = String::with_capacity(mapped.len());
    for line in mapped.lines() {
        let collapsed = line.split(' ').filter(|part| !part.is_empty()).collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&collapsed);
    }
    out
}
