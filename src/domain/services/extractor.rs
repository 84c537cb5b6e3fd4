use crate::domain::model::{CellScalar, ResolvedCell, SalesRow};
use crate::domain::ports::SheetSource;
use crate::utils::error::RowError;
use chrono::{Days, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

// 欄位順序固定 (1-based)
pub const COL_ID: u32 = 1;
pub const COL_DATE: u32 = 2;
pub const COL_CITY: u32 = 3;
pub const COL_CATEGORY: u32 = 4;
pub const COL_PRODUCT: u32 = 5;
pub const COL_QUANTITY: u32 = 6;
pub const COL_CONTACT: u32 = 7;
pub const COL_UNIT_PRICE: u32 = 8;
pub const COL_TOTAL: u32 = 9;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%b-%Y", "%Y/%m/%d", "%d %B %Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
];

/// Reads the fixed column set of one row into typed values.
pub fn extract_row<S: SheetSource + ?Sized>(sheet: &S, row: u32) -> Result<SalesRow, RowError> {
    let cell = |col: u32| sheet.resolve(row, col);

    Ok(SalesRow {
        row_number: row,
        id: text_value(cell(COL_ID)),
        date: date_value(cell(COL_DATE))?,
        city: text_value(cell(COL_CITY)),
        category: text_value(cell(COL_CATEGORY)),
        product: text_value(cell(COL_PRODUCT)),
        quantity: quantity_value(cell(COL_QUANTITY))?,
        contact: text_value(cell(COL_CONTACT)),
        unit_price: price_value(cell(COL_UNIT_PRICE))?,
        total: total_value(cell(COL_TOTAL))?,
    })
}

pub fn scalar_to_text(scalar: &CellScalar) -> String {
    match scalar {
        CellScalar::Blank => String::new(),
        CellScalar::Text(s) => s.clone(),
        CellScalar::Number(n) => format_number(*n),
        CellScalar::Bool(true) => "TRUE".to_string(),
        CellScalar::Bool(false) => "FALSE".to_string(),
        CellScalar::Error(e) => e.clone(),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn text_value(cell: Option<ResolvedCell>) -> String {
    cell.map(|c| scalar_to_text(&c.scalar)).unwrap_or_default()
}

fn date_value(cell: Option<ResolvedCell>) -> Result<NaiveDate, RowError> {
    let missing = RowError::MissingField { column: "date" };
    let Some(cell) = cell else {
        return Err(missing);
    };

    match cell.scalar {
        ref s if s.is_blank() => Err(missing),
        CellScalar::Number(serial) => {
            excel_serial_to_date(serial).ok_or_else(|| RowError::InvalidDate {
                value: format_number(serial),
            })
        }
        CellScalar::Text(text) => parse_date_text(&text).ok_or(RowError::InvalidDate { value: text }),
        other => Err(RowError::UnexpectedCell {
            column: "date",
            detail: format!("{:?}", other),
        }),
    }
}

/// Converts a 1900-system serial day number, honouring the fictitious
/// 1900-02-29 at serial 60.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    let days = serial.floor() as u64;
    let base = if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    base.checked_add_days(Days::new(days))
}

pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn quantity_value(cell: Option<ResolvedCell>) -> Result<i32, RowError> {
    let Some(cell) = cell else {
        return Ok(0);
    };

    match cell.scalar {
        ref s if s.is_blank() => Ok(0),
        CellScalar::Number(n) => {
            if n.fract() != 0.0 || n < f64::from(i32::MIN) || n > f64::from(i32::MAX) {
                Err(RowError::InvalidNumber {
                    column: "quantity",
                    value: format_number(n),
                })
            } else {
                Ok(n as i32)
            }
        }
        CellScalar::Text(text) => text.trim().parse::<i32>().map_err(|_| RowError::InvalidNumber {
            column: "quantity",
            value: text,
        }),
        other => Err(RowError::UnexpectedCell {
            column: "quantity",
            detail: format!("{:?}", other),
        }),
    }
}

fn price_value(cell: Option<ResolvedCell>) -> Result<Decimal, RowError> {
    let Some(cell) = cell else {
        return Ok(Decimal::ZERO);
    };

    match cell.scalar {
        ref s if s.is_blank() => Ok(Decimal::ZERO),
        CellScalar::Number(n) => number_to_decimal("unit price", n),
        CellScalar::Text(text) => {
            Decimal::from_str(&text.trim().replace(',', "")).map_err(|_| RowError::InvalidNumber {
                column: "unit price",
                value: text,
            })
        }
        other => Err(RowError::UnexpectedCell {
            column: "unit price",
            detail: format!("{:?}", other),
        }),
    }
}

/// Formula results that are not numbers count as zero; a literal text total
/// is rejected.
fn total_value(cell: Option<ResolvedCell>) -> Result<Decimal, RowError> {
    let Some(cell) = cell else {
        return Ok(Decimal::ZERO);
    };

    if cell.from_formula {
        return match cell.scalar {
            CellScalar::Number(n) => number_to_decimal("total", n),
            other => {
                tracing::debug!("Total formula produced {:?}, using 0", other);
                Ok(Decimal::ZERO)
            }
        };
    }

    match cell.scalar {
        CellScalar::Blank => Ok(Decimal::ZERO),
        CellScalar::Number(n) => number_to_decimal("total", n),
        other => Err(RowError::UnexpectedCell {
            column: "total",
            detail: format!("expected a number, found {:?}", other),
        }),
    }
}

fn number_to_decimal(column: &'static str, n: f64) -> Result<Decimal, RowError> {
    Decimal::from_f64(n)
        .map(|d| d.normalize())
        .ok_or_else(|| RowError::InvalidNumber {
            column,
            value: n.to_string(),
        })
}
