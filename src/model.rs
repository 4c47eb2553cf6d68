//! Invoice data model.
//!
//! Plain records filled by an [`InvoiceSource`](crate::datasource::InvoiceSource)
//! and handed to [`InvoiceDocument`](crate::invoice::InvoiceDocument) for
//! composition.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// A complete invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceModel {
    pub invoice_number: u32,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub seller_address: Address,
    pub customer_address: Address,
    pub items: Vec<OrderItem>,
    pub comments: String,
}

/// One invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    pub quantity: u32,
}

/// Postal and contact details of a party. Every field is optional display text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub company_name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl OrderItem {
    pub fn new(name: impl Into<String>, unit_price: u64, quantity: u32) -> Self {
        Self {
            name: name.into(),
            unit_price,
            quantity,
        }
    }

    /// `unit_price × quantity`, saturating at `u64::MAX`.
    pub fn line_total(&self) -> u64 {
        self.unit_price.saturating_mul(u64::from(self.quantity))
    }
}

impl Address {
    /// The lines that are present, in display order.
    pub fn display_lines(&self) -> Vec<&str> {
        [
            &self.company_name,
            &self.street,
            &self.city,
            &self.state,
            &self.email,
            &self.phone,
        ]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .filter(|line| !line.trim().is_empty())
        .collect()
    }
}

impl InvoiceModel {
    /// Check the model invariants.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.due_date < self.issue_date {
            return Err(ModelError::DueBeforeIssue {
                issue: self.issue_date.to_string(),
                due: self.due_date.to_string(),
            });
        }
        for (index, item) in self.items.iter().enumerate() {
            if item.name.trim().is_empty() {
                return Err(ModelError::EmptyItemName { index });
            }
            if item.quantity == 0 {
                return Err(ModelError::ZeroQuantity { index });
            }
        }
        Ok(())
    }

    /// Sum of all line totals, saturating.
    pub fn subtotal(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |acc, item| acc.saturating_add(item.line_total()))
    }
}

/// Format an amount in minor units as `$1,234.56`.
pub fn format_money(cents: u64) -> String {
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${grouped}.{:02}", cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> InvoiceModel {
        InvoiceModel {
            invoice_number: 1234,
            issue_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            seller_address: Address::default(),
            customer_address: Address::default(),
            items: vec![OrderItem::new("Widget", 1250, 3), OrderItem::new("Gadget", 99, 1)],
            comments: String::new(),
        }
    }

    #[test]
    fn line_total_and_subtotal() {
        let m = model();
        assert_eq!(m.items[0].line_total(), 3750);
        assert_eq!(m.subtotal(), 3849);
    }

    #[test]
    fn validate_accepts_same_day_due_date() {
        let mut m = model();
        m.due_date = m.issue_date;
        assert!(m.validate().is_ok());
    }

    #[test]
    fn validate_rejects_due_before_issue() {
        let mut m = model();
        m.due_date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert!(matches!(m.validate(), Err(ModelError::DueBeforeIssue { .. })));
    }

    #[test]
    fn validate_rejects_bad_items() {
        let mut m = model();
        m.items[1].name = "  ".into();
        assert_eq!(m.validate(), Err(ModelError::EmptyItemName { index: 1 }));

        let mut m = model();
        m.items[0].quantity = 0;
        assert_eq!(m.validate(), Err(ModelError::ZeroQuantity { index: 0 }));
    }

    #[test]
    fn address_lines_skip_missing_fields() {
        let addr = Address {
            company_name: Some("Acme".into()),
            city: Some("Springfield".into()),
            phone: Some(String::new()),
            ..Address::default()
        };
        assert_eq!(addr.display_lines(), vec!["Acme", "Springfield"]);
    }

    #[test]
    fn money_formatting() {
        assert_eq!(format_money(0), "$0.00");
        assert_eq!(format_money(5), "$0.05");
        assert_eq!(format_money(123456789), "$1,234,567.89");
    }
}
