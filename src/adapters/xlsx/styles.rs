use super::attr_value;
use crate::domain::model::FillColor;
use crate::utils::error::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Legacy indexed palette. Entries 64 and 65 are the system foreground and
/// background and have no fixed value.
const DEFAULT_PALETTE: [u32; 64] = [
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF,
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF,
    0x800000, 0x008000, 0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080,
    0x9999FF, 0x993366, 0xFFFFCC, 0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF,
    0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF, 0x800080, 0x800000, 0x008080, 0x0000FF,
    0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF, 0xFF99CC, 0xCC99FF, 0xFFCC99,
    0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600, 0x666699, 0x969696,
    0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993366, 0x333399, 0x333333,
];

// Excel 的 theme 索引: 0/1 與 2/3 和 clrScheme 文件順序相反
const THEME_SLOTS: [&str; 12] = [
    "lt1", "dk1", "lt2", "dk2", "accent1", "accent2", "accent3", "accent4", "accent5",
    "accent6", "hlink", "folHlink",
];

#[derive(Debug, Clone, PartialEq)]
enum ColorKind {
    Rgb(FillColor),
    Indexed(usize),
    Theme(usize),
    Auto,
}

#[derive(Debug, Clone, PartialEq)]
struct ColorSpec {
    kind: ColorKind,
    tint: f64,
}

#[derive(Debug, Clone, PartialEq)]
enum FillSpec {
    Pattern {
        pattern: String,
        fg: Option<ColorSpec>,
        bg: Option<ColorSpec>,
    },
    Gradient,
}

/// Cell fill per `cellXfs` index, already resolved to colors.
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    xf_fills: Vec<Option<FillColor>>,
}

impl StyleTable {
    pub fn parse(styles_xml: &str, theme_xml: Option<&str>) -> Result<Self> {
        let theme = match theme_xml {
            Some(xml) => parse_theme(xml)?,
            None => Vec::new(),
        };

        let mut palette: Vec<u32> = DEFAULT_PALETTE.to_vec();
        let mut custom_palette: Vec<u32> = Vec::new();
        let mut fills: Vec<FillSpec> = Vec::new();
        let mut xf_fill_ids: Vec<usize> = Vec::new();

        let mut in_fills = false;
        let mut in_cell_xfs = false;
        let mut current: Option<FillSpec> = None;
        let mut fill_start = 0usize;

        let mut reader = Reader::from_str(styles_xml);
        loop {
            let event = reader.read_event()?;
            let is_empty = matches!(event, Event::Empty(_));
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"rgbColor" => {
                        if let Some(color) = attr_value(e, b"rgb")?.and_then(|v| FillColor::from_hex(&v)) {
                            custom_palette.push(color.rgb());
                        }
                    }
                    b"fills" => in_fills = !is_empty,
                    b"fill" if in_fills => {
                        fill_start = fills.len();
                        if is_empty {
                            fills.push(FillSpec::Pattern {
                                pattern: "none".to_string(),
                                fg: None,
                                bg: None,
                            });
                        }
                    }
                    b"patternFill" if in_fills => {
                        let spec = FillSpec::Pattern {
                            pattern: attr_value(e, b"patternType")?.unwrap_or_else(|| "none".to_string()),
                            fg: None,
                            bg: None,
                        };
                        if is_empty {
                            fills.push(spec);
                        } else {
                            current = Some(spec);
                        }
                    }
                    b"gradientFill" if in_fills => {
                        current = None;
                        fills.push(FillSpec::Gradient);
                    }
                    b"fgColor" | b"bgColor" => {
                        if let Some(FillSpec::Pattern { fg, bg, .. }) = current.as_mut() {
                            let color = parse_color(e)?;
                            if e.local_name().as_ref() == b"fgColor" {
                                *fg = color;
                            } else {
                                *bg = color;
                            }
                        }
                    }
                    b"cellXfs" => in_cell_xfs = !is_empty,
                    b"xf" if in_cell_xfs => {
                        let fill_id = attr_value(e, b"fillId")?
                            .and_then(|v| v.parse::<usize>().ok())
                            .unwrap_or(0);
                        xf_fill_ids.push(fill_id);
                    }
                    _ => {}
                },
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"patternFill" => {
                        if let Some(spec) = current.take() {
                            fills.push(spec);
                        }
                    }
                    // 沒有 patternFill 的 <fill> 也要佔一個位置
                    b"fill" if in_fills && fills.len() == fill_start => {
                        fills.push(FillSpec::Pattern {
                            pattern: "none".to_string(),
                            fg: None,
                            bg: None,
                        });
                    }
                    b"fills" => in_fills = false,
                    b"cellXfs" => in_cell_xfs = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        if !custom_palette.is_empty() {
            for (slot, rgb) in custom_palette.into_iter().enumerate().take(palette.len()) {
                palette[slot] = rgb;
            }
        }

        let xf_fills = xf_fill_ids
            .iter()
            .map(|&fill_id| {
                fills
                    .get(fill_id)
                    .and_then(|spec| resolve_fill(spec, &palette, &theme))
            })
            .collect();

        Ok(Self { xf_fills })
    }

    /// Fill color of a `cellXfs` entry.
    pub fn fill_for_style(&self, xf: u32) -> Option<FillColor> {
        self.xf_fills.get(xf as usize).copied().flatten()
    }
}

fn parse_color(e: &BytesStart<'_>) -> Result<Option<ColorSpec>> {
    let tint = attr_value(e, b"tint")?
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(0.0);

    let kind = if let Some(rgb) = attr_value(e, b"rgb")? {
        match FillColor::from_hex(&rgb) {
            Some(color) => ColorKind::Rgb(color),
            None => return Ok(None),
        }
    } else if let Some(theme) = attr_value(e, b"theme")?.and_then(|v| v.parse().ok()) {
        ColorKind::Theme(theme)
    } else if let Some(indexed) = attr_value(e, b"indexed")?.and_then(|v| v.parse().ok()) {
        ColorKind::Indexed(indexed)
    } else if attr_value(e, b"auto")?.is_some() {
        ColorKind::Auto
    } else {
        return Ok(None);
    };

    Ok(Some(ColorSpec { kind, tint }))
}

fn resolve_fill(spec: &FillSpec, palette: &[u32], theme: &[u32]) -> Option<FillColor> {
    match spec {
        FillSpec::Gradient => None,
        FillSpec::Pattern { pattern, fg, bg } => match pattern.as_str() {
            "none" => Some(FillColor::TRANSPARENT),
            "solid" => fg.as_ref().and_then(|c| resolve_color(c, palette, theme)),
            _ => bg
                .as_ref()
                .and_then(|c| resolve_color(c, palette, theme))
                .or_else(|| fg.as_ref().and_then(|c| resolve_color(c, palette, theme))),
        },
    }
}

fn resolve_color(spec: &ColorSpec, palette: &[u32], theme: &[u32]) -> Option<FillColor> {
    let base = match spec.kind {
        ColorKind::Rgb(color) => color,
        ColorKind::Indexed(index) => FillColor(0xFF00_0000 | palette.get(index).copied()?),
        ColorKind::Theme(index) => FillColor(0xFF00_0000 | theme.get(index).copied()?),
        ColorKind::Auto => return None,
    };
    Some(apply_tint(base, spec.tint))
}

/// Lightens (positive) or darkens (negative) each channel.
fn apply_tint(color: FillColor, tint: f64) -> FillColor {
    if tint == 0.0 {
        return color;
    }
    let tint = tint.clamp(-1.0, 1.0);
    let shade = |c: u8| -> u8 {
        let c = f64::from(c);
        let v = if tint < 0.0 {
            c * (1.0 + tint)
        } else {
            c + (255.0 - c) * tint
        };
        v.round().clamp(0.0, 255.0) as u8
    };
    let (r, g, b) = color.channels();
    let alpha = color.0 & 0xFF00_0000;
    FillColor(alpha | (u32::from(shade(r)) << 16) | (u32::from(shade(g)) << 8) | u32::from(shade(b)))
}

/// Theme colors in Excel index order.
fn parse_theme(xml: &str) -> Result<Vec<u32>> {
    let mut found: Vec<(String, u32)> = Vec::new();
    let mut in_scheme = false;
    let mut slot: Option<String> = None;

    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = e.local_name();
                let name = String::from_utf8_lossy(name.as_ref()).into_owned();
                match name.as_str() {
                    "clrScheme" => in_scheme = true,
                    "srgbClr" | "sysClr" if in_scheme => {
                        let key: &[u8] = if name == "srgbClr" { b"val" } else { b"lastClr" };
                        if let (Some(slot), Some(rgb)) = (slot.take(), attr_value(e, key)?) {
                            if let Some(color) = FillColor::from_hex(&rgb) {
                                found.push((slot, color.rgb()));
                            }
                        }
                    }
                    other if in_scheme && THEME_SLOTS.contains(&other) => {
                        slot = Some(other.to_string());
                    }
                    _ => {}
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"clrScheme" => in_scheme = false,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(THEME_SLOTS
        .iter()
        .map(|slot| {
            found
                .iter()
                .find(|(name, _)| name == slot)
                .map(|(_, rgb)| *rgb)
                .unwrap_or(0)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fills count="6">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
    <fill><patternFill patternType="solid"><fgColor theme="0"/><bgColor indexed="64"/></patternFill></fill>
    <fill><patternFill patternType="solid"><fgColor theme="0" tint="-0.249977111117893"/></patternFill></fill>
    <fill><patternFill patternType="solid"><fgColor indexed="13"/></patternFill></fill>
  </fills>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="2" borderId="0"/></cellStyleXfs>
  <cellXfs count="5">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="0" fontId="0" fillId="2" borderId="0" xfId="0" applyFill="1"/>
    <xf numFmtId="0" fontId="0" fillId="3" borderId="0" xfId="0" applyFill="1"/>
    <xf numFmtId="0" fontId="0" fillId="4" borderId="0" xfId="0" applyFill="1"/>
    <xf numFmtId="0" fontId="0" fillId="5" borderId="0" xfId="0" applyFill="1"/>
  </cellXfs>
</styleSheet>"#;

    const THEME: &str = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme">
  <a:themeElements><a:clrScheme name="Office">
    <a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
    <a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>
    <a:dk2><a:srgbClr val="44546A"/></a:dk2>
    <a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>
    <a:accent1><a:srgbClr val="4472C4"/></a:accent1>
  </a:clrScheme></a:themeElements>
</a:theme>"#;

    #[test]
    fn test_resolves_fills_per_cell_xf() {
        let table = StyleTable::parse(STYLES, Some(THEME)).unwrap();
        assert_eq!(table.fill_for_style(0), Some(FillColor::TRANSPARENT));
        assert_eq!(table.fill_for_style(1), FillColor::from_hex("FFFFFF00"));
        // theme 0 是 lt1 (白色)
        assert_eq!(table.fill_for_style(2), Some(FillColor::from_rgb(0xFF, 0xFF, 0xFF)));
        assert_eq!(table.fill_for_style(3), Some(FillColor::from_rgb(0xBF, 0xBF, 0xBF)));
        assert_eq!(table.fill_for_style(4), Some(FillColor::from_rgb(0xFF, 0x00, 0xFF)));
        assert_eq!(table.fill_for_style(9), None);
    }

    #[test]
    fn test_theme_without_part_is_undetermined() {
        let table = StyleTable::parse(STYLES, None).unwrap();
        assert_eq!(table.fill_for_style(2), None);
    }

    #[test]
    fn test_parse_theme_order() {
        let theme = parse_theme(THEME).unwrap();
        assert_eq!(&theme[..5], &[0xFFFFFF, 0x000000, 0xE7E6E6, 0x44546A, 0x4472C4]);
    }
}
