use crate::domain::model::{ContactInfo, ItemData, OrderData, SalesRow, ORDER_PERSON};
use crate::domain::services::contact::parse_contact;
use std::collections::HashMap;

/// Builds the grouping key for a row.
///
/// Rows without an id fall back to `ORD-<city>`, so two unrelated id-less
/// orders for the same city, recipient, region and date collapse into one
/// order. That collision is accepted behaviour, not something to repair here.
pub fn order_identity(row: &SalesRow, contact: &ContactInfo) -> String {
    let base_id = if row.id.is_empty() {
        format!("ORD-{}", row.city.replace(' ', ""))
    } else {
        row.id.clone()
    };

    let ship_name = if contact.name.is_empty() {
        "User"
    } else {
        contact.name.as_str()
    };

    let shipping_key = format!("{}-{}", row.city, contact.region)
        .replace(' ', "")
        .replace(',', "");

    format!(
        "{}-{}-{}-{}",
        base_id,
        ship_name,
        shipping_key,
        row.date.format("%Y%m%d")
    )
}

/// Accumulates rows into orders keyed by identity, keeping first-seen order.
#[derive(Debug, Default)]
pub struct OrderBook {
    index: HashMap<String, usize>,
    orders: Vec<OrderData>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a row and returns the identity of the order it landed in.
    pub fn add_row(&mut self, row: &SalesRow) -> &str {
        let contact = parse_contact(&row.contact);
        let identity = order_identity(row, &contact);

        let slot = match self.index.get(&identity) {
            Some(&slot) => slot,
            None => {
                tracing::debug!("New order {} (row {})", identity, row.row_number);
                self.orders.push(OrderData {
                    unique_identity: identity.clone(),
                    order_id: row.id.clone(),
                    order_date: row.date,
                    order_person: ORDER_PERSON.to_string(),
                    ship_to_name: contact.name,
                    ship_to_address: contact.address,
                    ship_to_city: row.city.clone(),
                    ship_to_region: contact.region,
                    items: Vec::new(),
                });
                let slot = self.orders.len() - 1;
                self.index.insert(identity, slot);
                slot
            }
        };

        let order = &mut self.orders[slot];
        order.items.push(ItemData {
            title: format!("{} - {}", row.category, row.product),
            note: format!("Category: {}", row.category),
            quantity: row.quantity,
            price: row.unit_price,
            total: row.total,
        });

        &order.unique_identity
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Hands the finished orders over in first-seen order.
    pub fn finish(self) -> Vec<OrderData> {
        self.orders
    }
}
