use super::formula::{self, CellLookup, FormulaSource};
use super::{attr_value, parse_cell_ref, StyleTable};
use crate::domain::model::{CellScalar, FillColor, ResolvedCell};
use crate::domain::ports::SheetSource;
use crate::utils::error::{EtlError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

/// Nested formula evaluation stops here; deeper chains are treated as cycles.
const MAX_FORMULA_DEPTH: usize = 64;
/// Last row number a worksheet can hold.
const MAX_ROWS: u32 = 1_048_576;
const MAX_COLUMNS: u32 = 16_384;

/// Memo entry for a formula cell evaluated during this run.
#[derive(Debug, Clone)]
enum Evaluation {
    /// On the current evaluation path; reaching it again is a cycle.
    Pending,
    Done(CellScalar),
}

#[derive(Debug, Clone)]
struct RawCell {
    style: Option<u32>,
    value: CellScalar,
    cached: bool,
    formula: Option<FormulaSource>,
}

/// A parsed worksheet: cell values, formulas and style indices.
#[derive(Debug, Clone)]
pub struct XlsxSheet {
    name: String,
    cells: HashMap<(u32, u32), RawCell>,
    row_styles: BTreeMap<u32, Option<u32>>,
    styles: StyleTable,
    evaluated: RefCell<HashMap<(u32, u32), Evaluation>>,
}

#[derive(Default)]
struct CellState {
    row: u32,
    col: u32,
    kind: String,
    style: Option<u32>,
    value: Option<String>,
    inline: Option<String>,
    formula: Option<String>,
    shared_index: Option<u32>,
    shared_master: bool,
}

impl XlsxSheet {
    pub fn parse(name: &str, xml: &str, shared_strings: &[String], styles: &StyleTable) -> Result<Self> {
        let mut cells = HashMap::new();
        let mut row_styles = BTreeMap::new();
        let mut shared: HashMap<u32, FormulaSource> = HashMap::new();

        let mut current_row = 0u32;
        let mut current_col = 0u32;
        let mut cell: Option<CellState> = None;
        let mut text_target: Option<&'static str> = None;

        let mut reader = Reader::from_str(xml);
        loop {
            let event = reader.read_event()?;
            let is_empty = matches!(event, Event::Empty(_));
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"row" => {
                        current_row = match attr_value(e, b"r")? {
                            Some(v) => v.trim().parse().map_err(|_| {
                                EtlError::WorkbookError {
                                    message: format!("Sheet '{}' has invalid row number '{}'", name, v),
                                }
                            })?,
                            None => current_row.saturating_add(1),
                        };
                        check_position(name, current_row, 1)?;
                        current_col = 0;
                        let custom = attr_value(e, b"customFormat")?
                            .map(|v| v == "1" || v == "true")
                            .unwrap_or(false);
                        let style = if custom {
                            attr_value(e, b"s")?.and_then(|v| v.parse().ok())
                        } else {
                            None
                        };
                        row_styles.insert(current_row, style);
                    }
                    b"c" => {
                        let (row, col) = match attr_value(e, b"r")?.as_deref().and_then(parse_cell_ref) {
                            Some(r) => (r.row, r.col),
                            None => (current_row, current_col.saturating_add(1)),
                        };
                        check_position(name, row, col)?;
                        current_col = col;
                        row_styles.entry(row).or_insert(None);
                        let state = CellState {
                            row,
                            col,
                            kind: attr_value(e, b"t")?.unwrap_or_else(|| "n".to_string()),
                            style: attr_value(e, b"s")?.and_then(|v| v.parse().ok()),
                            ..CellState::default()
                        };
                        if is_empty {
                            let raw = finish_cell(state, shared_strings, &mut shared);
                            cells.insert((row, col), raw);
                        } else {
                            cell = Some(state);
                        }
                    }
                    b"v" if cell.is_some() && !is_empty => text_target = Some("v"),
                    b"f" => {
                        if let Some(state) = cell.as_mut() {
                            let shared_kind = attr_value(e, b"t")?.as_deref() == Some("shared");
                            if shared_kind {
                                state.shared_index = attr_value(e, b"si")?.and_then(|v| v.parse().ok());
                                state.shared_master = attr_value(e, b"ref")?.is_some();
                            }
                            if !is_empty {
                                text_target = Some("f");
                            }
                        }
                    }
                    b"t" if cell.is_some() && !is_empty => text_target = Some("is"),
                    _ => {}
                },
                Event::Text(ref t) => {
                    if let (Some(target), Some(state)) = (text_target, cell.as_mut()) {
                        let text = t.unescape()?;
                        let slot = match target {
                            "v" => &mut state.value,
                            "f" => &mut state.formula,
                            _ => &mut state.inline,
                        };
                        slot.get_or_insert_with(String::new).push_str(&text);
                    }
                }
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"v" | b"f" | b"t" => text_target = None,
                    b"c" => {
                        if let Some(state) = cell.take() {
                            let key = (state.row, state.col);
                            let raw = finish_cell(state, shared_strings, &mut shared);
                            cells.insert(key, raw);
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        tracing::debug!(
            "Parsed sheet '{}': {} rows, {} cells",
            name,
            row_styles.len(),
            cells.len()
        );

        Ok(Self {
            name: name.to_string(),
            cells,
            row_styles,
            styles: styles.clone(),
            evaluated: RefCell::new(HashMap::new()),
        })
    }
}

fn check_position(sheet: &str, row: u32, col: u32) -> Result<()> {
    if row == 0 || row > MAX_ROWS || col == 0 || col > MAX_COLUMNS {
        return Err(EtlError::WorkbookError {
            message: format!(
                "Sheet '{}' has a cell outside the worksheet grid (row {}, column {})",
                sheet, row, col
            ),
        });
    }
    Ok(())
}

fn finish_cell(
    state: CellState,
    shared_strings: &[String],
    shared: &mut HashMap<u32, FormulaSource>,
) -> RawCell {
    let origin = (state.row, state.col);

    let formula = match (state.formula.filter(|f| !f.is_empty()), state.shared_index) {
        (Some(text), Some(si)) if state.shared_master => {
            let source = FormulaSource::new(text, origin);
            shared.insert(si, source.clone());
            Some(source)
        }
        (Some(text), _) => Some(FormulaSource::new(text, origin)),
        (None, Some(si)) => shared.get(&si).cloned(),
        (None, None) => None,
    };

    let cached = state.value.is_some() || (state.kind == "inlineStr" && state.inline.is_some());
    let value = match (state.kind.as_str(), state.value) {
        ("inlineStr", _) => state.inline.map(CellScalar::Text).unwrap_or(CellScalar::Blank),
        (_, None) => CellScalar::Blank,
        ("s", Some(v)) => v
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|idx| shared_strings.get(idx))
            .map(|s| CellScalar::Text(s.clone()))
            .unwrap_or(CellScalar::Blank),
        ("b", Some(v)) => CellScalar::Bool(v.trim() == "1" || v.trim() == "true"),
        ("e", Some(v)) => CellScalar::Error(v),
        ("str", Some(v)) | ("d", Some(v)) => CellScalar::Text(v),
        (_, Some(v)) => match v.trim().parse::<f64>() {
            Ok(n) => CellScalar::Number(n),
            Err(_) => CellScalar::Text(v),
        },
    };

    RawCell {
        style: state.style,
        value,
        cached,
        formula,
    }
}

pub(super) fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    // 注音 (rPh) 的文字不屬於儲存格內容
    let mut in_phonetic = false;

    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(ref t) if in_text && !in_phonetic => current.push_str(&t.unescape()?),
            Event::End(ref e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                b"si" => strings.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

impl XlsxSheet {
    fn scalar_at(&self, row: u32, col: u32, depth: usize) -> CellScalar {
        let Some(cell) = self.cells.get(&(row, col)) else {
            return CellScalar::Blank;
        };
        match &cell.formula {
            Some(source) if !cell.cached => {
                let memo = self.evaluated.borrow().get(&(row, col)).cloned();
                match memo {
                    Some(Evaluation::Done(value)) => return value,
                    Some(Evaluation::Pending) => return CellScalar::Error("#REF!".to_string()),
                    None => {}
                }
                if depth >= MAX_FORMULA_DEPTH {
                    return CellScalar::Error("#REF!".to_string());
                }
                self.evaluated.borrow_mut().insert((row, col), Evaluation::Pending);
                let value = formula::evaluate(self, source, (row, col), depth + 1);
                self.evaluated
                    .borrow_mut()
                    .insert((row, col), Evaluation::Done(value.clone()));
                value
            }
            _ => cell.value.clone(),
        }
    }
}

impl CellLookup for XlsxSheet {
    fn value_at(&self, row: u32, col: u32, depth: usize) -> CellScalar {
        self.scalar_at(row, col, depth)
    }
}

impl SheetSource for XlsxSheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn last_row(&self) -> u32 {
        self.row_styles.keys().next_back().copied().unwrap_or(0)
    }

    fn resolve(&self, row: u32, col: u32) -> Option<ResolvedCell> {
        let cell = self.cells.get(&(row, col))?;
        if cell.formula.is_some() {
            Some(ResolvedCell::formula(self.scalar_at(row, col, 0)))
        } else {
            Some(ResolvedCell::literal(cell.value.clone()))
        }
    }

    fn fill_color(&self, row: u32, col: u32) -> Option<FillColor> {
        let style = match self.cells.get(&(row, col)) {
            Some(cell) => cell.style.unwrap_or(0),
            None => self.row_styles.get(&row).copied().flatten()?,
        };
        self.styles.fill_for_style(style)
    }
}
