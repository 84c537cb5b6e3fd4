#![allow(dead_code)]

use shiporder_etl::AppConfig;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Fill applied to a row's first cell through `styles.xml`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Marker {
    None,
    Yellow,
    White,
    /// Accent color from the theme with a tint.
    ThemeAccent,
}

impl Marker {
    fn style(self) -> u32 {
        match self {
            Marker::None => 0,
            Marker::Yellow => 1,
            Marker::White => 2,
            Marker::ThemeAccent => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    /// Formula without a cached value.
    Formula(String),
    /// Formula saved with a cached string result.
    FormulaText(String, String),
}

pub fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

pub struct Row {
    pub marker: Marker,
    pub cells: Vec<Cell>,
}

/// A data row in the fixed column order. The total is `F*H` as a formula.
#[allow(clippy::too_many_arguments)]
pub fn sales_row(
    marker: Marker,
    id: &str,
    date: Cell,
    city: &str,
    category: &str,
    product: &str,
    quantity: f64,
    contact: &str,
    price: f64,
) -> Row {
    Row {
        marker,
        cells: vec![
            text(id),
            date,
            text(city),
            text(category),
            text(product),
            Cell::Number(quantity),
            text(contact),
            Cell::Number(price),
            Cell::Empty,
        ],
    }
}

pub fn header_row() -> Row {
    Row {
        marker: Marker::None,
        cells: [
            "Id", "Date", "City", "Category", "Product", "Quantity", "Contact", "UnitPrice", "Total",
        ]
        .iter()
        .map(|s| text(s))
        .collect(),
    }
}

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fills count="5">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFFFF"/><bgColor indexed="64"/></patternFill></fill>
    <fill><patternFill patternType="solid"><fgColor theme="5" tint="0.3999755851924192"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="0" fontId="0" fillId="2" borderId="0" xfId="0" applyFill="1"/>
    <xf numFmtId="0" fontId="0" fillId="3" borderId="0" xfId="0" applyFill="1"/>
    <xf numFmtId="0" fontId="0" fillId="4" borderId="0" xfId="0" applyFill="1"/>
  </cellXfs>
</styleSheet>"#;

const THEME: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme">
  <a:themeElements><a:clrScheme name="Office">
    <a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
    <a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>
    <a:dk2><a:srgbClr val="44546A"/></a:dk2>
    <a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>
    <a:accent1><a:srgbClr val="4472C4"/></a:accent1>
    <a:accent2><a:srgbClr val="ED7D31"/></a:accent2>
  </a:clrScheme></a:themeElements>
</a:theme>"#;

/// Writes a minimal but valid `.xlsx` with the given sheets.
pub fn write_xlsx(path: &Path, sheets: &[(&str, &[Row])]) {
    let mut shared: Vec<String> = Vec::new();
    let mut sheet_parts = Vec::new();
    for (_, rows) in sheets {
        sheet_parts.push(sheet_xml(rows, &mut shared));
    }

    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    let mut put = |name: &str, body: &str| {
        zip.start_file(name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    };

    let mut overrides = String::new();
    let mut workbook_sheets = String::new();
    let mut rels = String::new();
    for (i, (name, _)) in sheets.iter().enumerate() {
        let n = i + 1;
        overrides.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
        workbook_sheets.push_str(&format!(
            r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#,
            escape(name)
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        ));
    }
    let base = sheets.len();
    rels.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        base + 1
    ));
    rels.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
        base + 2
    ));

    put(
        "[Content_Types].xml",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{overrides}</Types>"#
        ),
    );
    put(
        "_rels/.rels",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
    );
    put(
        "xl/workbook.xml",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{workbook_sheets}</sheets></workbook>"#
        ),
    );
    put(
        "xl/_rels/workbook.xml.rels",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
        ),
    );
    for (i, part) in sheet_parts.iter().enumerate() {
        put(&format!("xl/worksheets/sheet{}.xml", i + 1), part);
    }

    let strings: String = shared
        .iter()
        .map(|s| format!("<si><t>{}</t></si>", escape(s)))
        .collect();
    put(
        "xl/sharedStrings.xml",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">{1}</sst>"#,
            shared.len(),
            strings
        ),
    );
    put("xl/styles.xml", STYLES);
    put("xl/theme/theme1.xml", THEME);

    zip.finish().unwrap();
}

fn sheet_xml(rows: &[Row], shared: &mut Vec<String>) -> String {
    let mut body = String::new();
    for (i, row) in rows.iter().enumerate() {
        let r = i + 1;
        body.push_str(&format!(r#"<row r="{r}">"#));
        for (c, cell) in row.cells.iter().enumerate() {
            let reference = format!("{}{}", (b'A' + c as u8) as char, r);
            let style = if c == 0 && row.marker != Marker::None {
                format!(r#" s="{}""#, row.marker.style())
            } else {
                String::new()
            };
            let formula_total = c == 8 && matches!(cell, Cell::Empty);
            match cell {
                Cell::Empty if formula_total => body.push_str(&format!(
                    r#"<c r="{reference}"{style}><f>F{r}*H{r}</f></c>"#
                )),
                Cell::Empty if !style.is_empty() => {
                    body.push_str(&format!(r#"<c r="{reference}"{style}/>"#))
                }
                Cell::Empty => {}
                Cell::Text(s) => {
                    let index = match shared.iter().position(|x| x == s) {
                        Some(index) => index,
                        None => {
                            shared.push(s.clone());
                            shared.len() - 1
                        }
                    };
                    body.push_str(&format!(
                        r#"<c r="{reference}"{style} t="s"><v>{index}</v></c>"#
                    ));
                }
                Cell::Number(n) => {
                    body.push_str(&format!(r#"<c r="{reference}"{style}><v>{n}</v></c>"#))
                }
                Cell::Formula(f) => body.push_str(&format!(
                    r#"<c r="{reference}"{style}><f>{}</f></c>"#,
                    escape(f)
                )),
                Cell::FormulaText(f, cached) => body.push_str(&format!(
                    r#"<c r="{reference}"{style} t="str"><f>{}</f><v>{}</v></c>"#,
                    escape(f),
                    escape(cached)
                )),
            }
        }
        body.push_str("</row>");
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{body}</sheetData></worksheet>"#
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn config(dir: &Path, excel_name: &str, sheet: &str) -> AppConfig {
    AppConfig {
        excel_path: dir.display().to_string(),
        excel_name: excel_name.to_string(),
        sheet_name: sheet.to_string(),
        xml_output_path: dir.join("xml").display().to_string(),
    }
}

/// Sorted file names in a directory.
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
