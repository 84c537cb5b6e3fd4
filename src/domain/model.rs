use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Fixed `orderperson` value written on every order.
pub const ORDER_PERSON: &str = "Food Sales System";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactInfo {
    pub name: String,
    pub address: String,
    pub city: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemData {
    pub title: String,
    pub note: String,
    pub quantity: i32,
    pub price: Decimal,
    pub total: Decimal,
}

/// One logical shipment. Header fields are set by the first row that maps to
/// `unique_identity`; later rows only append to `items`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderData {
    pub unique_identity: String,
    pub order_id: String,
    pub order_date: NaiveDate,
    pub order_person: String,
    pub ship_to_name: String,
    pub ship_to_address: String,
    pub ship_to_city: String,
    pub ship_to_region: String,
    pub items: Vec<ItemData>,
}

/// Typed values read from one highlighted row.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRow {
    pub row_number: u32,
    pub id: String,
    pub date: NaiveDate,
    pub city: String,
    pub category: String,
    pub product: String,
    pub quantity: i32,
    pub contact: String,
    pub unit_price: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellScalar {
    Blank,
    Text(String),
    Number(f64),
    Bool(bool),
    Error(String),
}

impl CellScalar {
    pub fn is_blank(&self) -> bool {
        match self {
            CellScalar::Blank => true,
            CellScalar::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

/// A cell reduced to a scalar. `from_formula` is set when the value is the
/// result of a formula rather than a literal.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCell {
    pub scalar: CellScalar,
    pub from_formula: bool,
}

impl ResolvedCell {
    pub fn literal(scalar: CellScalar) -> Self {
        Self {
            scalar,
            from_formula: false,
        }
    }

    pub fn formula(scalar: CellScalar) -> Self {
        Self {
            scalar,
            from_formula: true,
        }
    }
}

/// Background fill color as ARGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FillColor(pub u32);

impl FillColor {
    pub const TRANSPARENT: FillColor = FillColor(0x00FF_FFFF);

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        FillColor(0xFF00_0000 | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b))
    }

    /// Parses `RRGGBB` or `AARRGGBB` hex.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        let value = u32::from_str_radix(hex, 16).ok()?;
        match hex.len() {
            6 => Some(FillColor(0xFF00_0000 | value)),
            8 => Some(FillColor(value)),
            _ => None,
        }
    }

    pub fn rgb(self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    pub fn channels(self) -> (u8, u8, u8) {
        let rgb = self.rgb();
        ((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    pub fn is_transparent(self) -> bool {
        self == Self::TRANSPARENT
    }

    pub fn is_white(self) -> bool {
        self.rgb() == 0x00FF_FFFF
    }

    pub fn is_black(self) -> bool {
        self.rgb() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rows_scanned: usize,
    pub highlighted_rows: usize,
    pub rows_skipped: usize,
    pub orders: usize,
    pub written: Vec<String>,
}
