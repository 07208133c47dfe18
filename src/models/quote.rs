use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::error::FieldErrors;

pub const QUOTE_STATUSES: [&str; 5] = ["pending", "processing", "sent", "completed", "cancelled"];

pub fn validate_status(status: &str) -> Result<(), FieldErrors> {
    if QUOTE_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(FieldErrors::single(
            "status",
            format!("must be one of: {}", QUOTE_STATUSES.join(", ")),
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuoteRequest {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: Option<String>,
    pub message: Option<String>,
    pub status: String,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Quote line joined with the product it references.
#[derive(Debug, Clone, FromRow)]
pub struct QuoteItemRow {
    pub id: Uuid,
    pub quote_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    pub product_name: String,
    pub product_sku: String,
}

impl QuoteItemRow {
    pub fn subtotal(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

// ---------------------------------------------------------------------------
// Write-side inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuoteRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    pub company: Option<String>,
    pub message: Option<String>,
    #[validate(length(min = 1, message = "at least one item is required"))]
    pub items: Vec<QuoteItemInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteItemInput {
    pub product: Uuid,
    pub quantity: i32,
}

impl CreateQuoteRequest {
    /// Shape checks that run before the transaction opens.
    pub fn validated(&self) -> Result<(), FieldErrors> {
        let mut errors: FieldErrors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };
        for (index, item) in self.items.iter().enumerate() {
            if item.quantity < 1 {
                errors.add(
                    "items",
                    format!("item {}: quantity must be at least 1", index),
                );
            }
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateQuoteRequest {
    pub status: Option<String>,
    pub admin_notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Read-side payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct QuoteItemPayload {
    pub id: Uuid,
    pub product: Uuid,
    pub product_name: String,
    pub product_sku: String,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

impl From<QuoteItemRow> for QuoteItemPayload {
    fn from(row: QuoteItemRow) -> Self {
        let subtotal = row.subtotal();
        Self {
            id: row.id,
            product: row.product_id,
            product_name: row.product_name,
            product_sku: row.product_sku,
            quantity: row.quantity,
            price: row.price,
            subtotal,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuotePayload {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: Option<String>,
    pub message: Option<String>,
    pub status: String,
    pub admin_notes: Option<String>,
    pub items: Vec<QuoteItemPayload>,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl QuotePayload {
    pub fn from_parts(quote: QuoteRequest, items: Vec<QuoteItemPayload>) -> Self {
        let total_amount = items.iter().map(|i| i.subtotal).sum();
        Self {
            id: quote.id,
            name: quote.name,
            email: quote.email,
            phone: quote.phone,
            company: quote.company,
            message: quote.message,
            status: quote.status,
            admin_notes: quote.admin_notes,
            items,
            total_amount,
            created_at: quote.created_at,
        }
    }
}

/// Compact shape for the admin quote list.
#[derive(Debug, Serialize)]
pub struct QuoteSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: Option<String>,
    pub status: String,
    pub item_count: i64,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(price: &str, quantity: i32) -> QuoteItemRow {
        QuoteItemRow {
            id: Uuid::new_v4(),
            quote_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity,
            price: dec(price),
            product_name: "HP LaserJet Pro M404n".to_string(),
            product_sku: "PRN-HP-M404N".to_string(),
        }
    }

    fn request(items: Vec<QuoteItemInput>) -> CreateQuoteRequest {
        CreateQuoteRequest {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "+971501234567".to_string(),
            company: None,
            message: None,
            items,
        }
    }

    #[test]
    fn subtotal_is_price_times_quantity() {
        assert_eq!(item("45.00", 3).subtotal(), dec("135.00"));
    }

    #[test]
    fn total_amount_sums_line_subtotals() {
        let quote = QuoteRequest {
            id: Uuid::new_v4(),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "+971501234567".to_string(),
            company: None,
            message: None,
            status: "pending".to_string(),
            admin_notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let items = vec![
            QuoteItemPayload::from(item("45.00", 2)),
            QuoteItemPayload::from(item("10.50", 4)),
        ];
        let payload = QuotePayload::from_parts(quote, items);
        assert_eq!(payload.total_amount, dec("132.00"));
    }

    #[test]
    fn empty_items_fail_shape_validation() {
        let errors = request(vec![]).validated().unwrap_err();
        let body = serde_json::to_value(&errors).unwrap();
        assert!(body.get("items").is_some());
    }

    #[test]
    fn invalid_email_fails_shape_validation() {
        let mut req = request(vec![QuoteItemInput {
            product: Uuid::new_v4(),
            quantity: 1,
        }]);
        req.email = "not-an-email".to_string();
        let errors = req.validated().unwrap_err();
        let body = serde_json::to_value(&errors).unwrap();
        assert!(body.get("email").is_some());
    }

    #[test]
    fn zero_quantity_fails_shape_validation() {
        let req = request(vec![QuoteItemInput {
            product: Uuid::new_v4(),
            quantity: 0,
        }]);
        let errors = req.validated().unwrap_err();
        let body = serde_json::to_value(&errors).unwrap();
        assert!(body.get("items").is_some());
    }

    #[test]
    fn status_labels_are_enumerated() {
        assert!(validate_status("pending").is_ok());
        assert!(validate_status("cancelled").is_ok());
        assert!(validate_status("archived").is_err());
    }
}
