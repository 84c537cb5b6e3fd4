//! `.xlsx` workbook adapter.
//!
//! Reads the parts of a SpreadsheetML package the order pipeline needs:
//! sheet lookup (`xl/workbook.xml` + relationships), shared strings, cell
//! values with their formulas, and cell fills from `xl/styles.xml` and the
//! theme. The archive handle lives as long as the [`XlsxWorkbook`].

mod formula;
mod sheet;
mod styles;

pub use sheet::XlsxSheet;
pub use styles::StyleTable;

use crate::domain::ports::WorkbookSource;
use crate::utils::error::{EtlError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use zip::result::ZipError;
use zip::ZipArchive;

const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm"];

static CELL_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\$?)([A-Za-z]{1,3})(\$?)([0-9]{1,7})$").expect("valid cell reference pattern")
});

/// An `A1` style reference, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
    pub row_absolute: bool,
    pub col_absolute: bool,
}

pub fn parse_cell_ref(text: &str) -> Option<CellRef> {
    let caps = CELL_REF.captures(text)?;
    let col = caps[2]
        .bytes()
        .fold(0u32, |acc, b| acc * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1));
    let row: u32 = caps[4].parse().ok()?;
    if row == 0 || col > 16_384 {
        return None;
    }
    Some(CellRef {
        row,
        col,
        col_absolute: !caps[1].is_empty(),
        row_absolute: !caps[3].is_empty(),
    })
}

pub struct XlsxWorkbook {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
    shared_strings: Vec<String>,
    styles: StyleTable,
}

impl std::fmt::Debug for XlsxWorkbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XlsxWorkbook")
            .field("path", &self.path)
            .field("shared_strings", &self.shared_strings.len())
            .finish()
    }
}

impl XlsxWorkbook {
    fn sheet_entries(&mut self) -> Result<Vec<(String, String)>> {
        let xml = read_part(&mut self.archive, "xl/workbook.xml")?.ok_or_else(|| {
            EtlError::WorkbookError {
                message: "xl/workbook.xml is missing".to_string(),
            }
        })?;

        let mut entries = Vec::new();
        let mut reader = Reader::from_str(&xml);
        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                    let name = attr_value(&e, b"name")?.unwrap_or_default();
                    let rid = attr_value(&e, b"id")?.unwrap_or_default();
                    entries.push((name, rid));
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(entries)
    }

    fn sheet_part(&mut self, rid: &str) -> Result<Option<String>> {
        let Some(xml) = read_part(&mut self.archive, "xl/_rels/workbook.xml.rels")? else {
            return Ok(None);
        };

        let mut reader = Reader::from_str(&xml);
        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                    if attr_value(&e, b"Id")?.as_deref() == Some(rid) {
                        return Ok(attr_value(&e, b"Target")?.map(|t| resolve_target(&t)));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(None)
    }
}

impl WorkbookSource for XlsxWorkbook {
    type Sheet = XlsxSheet;

    fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EtlError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !supported {
            return Err(EtlError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path)?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;
        tracing::debug!("Opened {} ({} parts)", path.display(), archive.len());

        let shared_strings = match read_part(&mut archive, "xl/sharedStrings.xml")? {
            Some(xml) => sheet::parse_shared_strings(&xml)?,
            None => Vec::new(),
        };
        let theme = read_part(&mut archive, "xl/theme/theme1.xml")?;
        let styles = match read_part(&mut archive, "xl/styles.xml")? {
            Some(xml) => StyleTable::parse(&xml, theme.as_deref())?,
            None => StyleTable::default(),
        };

        Ok(Self {
            path: path.to_path_buf(),
            archive,
            shared_strings,
            styles,
        })
    }

    fn sheet(&mut self, name: &str) -> Result<XlsxSheet> {
        let entries = self.sheet_entries()?;
        let Some((_, rid)) = entries.iter().find(|(sheet_name, _)| sheet_name == name) else {
            let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
            tracing::debug!("Workbook sheets: {}", names.join(", "));
            return Err(EtlError::SheetNotFound {
                sheet: name.to_string(),
            });
        };

        let part = self.sheet_part(rid)?.ok_or_else(|| EtlError::WorkbookError {
            message: format!("relationship '{}' for sheet '{}' not found", rid, name),
        })?;
        let xml = read_part(&mut self.archive, &part)?.ok_or_else(|| EtlError::WorkbookError {
            message: format!("{} is missing", part),
        })?;

        XlsxSheet::parse(name, &xml, &self.shared_strings, &self.styles)
    }
}

/// Reads a package part as text, `None` when the part does not exist.
fn read_part(archive: &mut ZipArchive<BufReader<File>>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

/// Relationship targets are relative to `xl/` unless they start with `/`.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
