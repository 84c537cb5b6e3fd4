//! `shiporder` XML rendering.

use crate::domain::model::OrderData;
use crate::utils::error::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use rust_decimal::{Decimal, RoundingStrategy};
use std::io::{Cursor, Write};

const INDENT: usize = 2;

/// Renders one order as a UTF-8 `shiporder` document.
pub fn render_order(order: &OrderData) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', INDENT);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let order_date = order.order_date.format("%Y-%m-%d").to_string();
    let mut root = BytesStart::new("shiporder");
    root.push_attribute(("orderid", order.order_id.as_str()));
    root.push_attribute(("orderdate", order_date.as_str()));
    writer.write_event(Event::Start(root))?;

    text_element(&mut writer, "orderperson", &order.order_person)?;

    writer.write_event(Event::Start(BytesStart::new("shipto")))?;
    text_element(&mut writer, "name", &order.ship_to_name)?;
    text_element(&mut writer, "address", &order.ship_to_address)?;
    text_element(&mut writer, "city", &order.ship_to_city)?;
    text_element(&mut writer, "region", &order.ship_to_region)?;
    writer.write_event(Event::End(BytesEnd::new("shipto")))?;

    for item in &order.items {
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        text_element(&mut writer, "title", &item.title)?;
        if !item.note.is_empty() {
            text_element(&mut writer, "note", &item.note)?;
        }
        text_element(&mut writer, "quantity", &item.quantity.to_string())?;
        text_element(&mut writer, "price", &format_money(item.price))?;
        text_element(&mut writer, "total", &format_money(item.total))?;
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("shiporder")))?;

    let mut bytes = writer.into_inner().into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

/// Output file name for an order identity. Characters that are not allowed
/// in file names become `_`.
pub fn file_name_for(identity: &str) -> String {
    let safe: String = identity
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{}.xml", safe)
}

/// Two decimals, midpoint away from zero.
pub fn format_money(value: Decimal) -> String {
    format!(
        "{:.2}",
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ItemData, ORDER_PERSON};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn order() -> OrderData {
        OrderData {
            unique_identity: "1001-Ann-Boston-MA-20240305".to_string(),
            order_id: "1001".to_string(),
            order_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            order_person: ORDER_PERSON.to_string(),
            ship_to_name: "Ann".to_string(),
            ship_to_address: "1 Main St, Boston".to_string(),
            ship_to_city: "Boston".to_string(),
            ship_to_region: "MA".to_string(),
            items: vec![
                ItemData {
                    title: "Cookies - Chip".to_string(),
                    note: "Category: Cookies".to_string(),
                    quantity: 2,
                    price: dec!(1.875),
                    total: dec!(3.75),
                },
                ItemData {
                    title: "Bars & Co - Bran".to_string(),
                    note: String::new(),
                    quantity: 1,
                    price: dec!(2),
                    total: dec!(2),
                },
            ],
        }
    }

    #[test]
    fn test_render_order_document() {
        let xml = String::from_utf8(render_order(&order()).unwrap()).unwrap();
        let expected = r#"<?xml version="1.0" encoding="utf-8"?>
<shiporder orderid="1001" orderdate="2024-03-05">
  <orderperson>Food Sales System</orderperson>
  <shipto>
    <name>Ann</name>
    <address>1 Main St, Boston</address>
    <city>Boston</city>
    <region>MA</region>
  </shipto>
  <item>
    <title>Cookies - Chip</title>
    <note>Category: Cookies</note>
    <quantity>2</quantity>
    <price>1.88</price>
    <total>3.75</total>
  </item>
  <item>
    <title>Bars &amp; Co - Bran</title>
    <quantity>1</quantity>
    <price>2.00</price>
    <total>2.00</total>
  </item>
</shiporder>
"#;
        assert_eq!(xml, expected);
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(dec!(1.005)), "1.01");
        assert_eq!(format_money(dec!(-1.005)), "-1.01");
        assert_eq!(format_money(dec!(3)), "3.00");
        assert_eq!(format_money(dec!(0.1)), "0.10");
    }

    #[test]
    fn test_file_name_for() {
        assert_eq!(file_name_for("1001-Ann-Boston-MA-20240305"), "1001-Ann-Boston-MA-20240305.xml");
        assert_eq!(file_name_for("A/B-C:D"), "A_B-C_D.xml");
    }
}
