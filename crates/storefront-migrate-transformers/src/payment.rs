// crates/storefront-migrate-transformers/src/payment.rs
// ============================================================================
// Module: Legacy Payment View
// Description: Typed accessors over a legacy payment object and its blob.
// Purpose: Share fallback rules between the order and customer transformers.
// Dependencies: serde_json, storefront-migrate-core
// ============================================================================

//! ## Overview
//! A legacy payment spreads its data across dedicated metadata keys and a
//! catch-all `_edd_payment_meta` blob. [`Payment`] resolves each field from
//! the dedicated key first and falls back to the blob. A blob that is not a
//! JSON object reads as empty.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use storefront_migrate_core::LegacyObject;
use storefront_migrate_core::core::records::value_as_f64;
use storefront_migrate_core::core::records::value_as_i64;
use storefront_migrate_core::core::records::value_as_string;

use crate::legacy::legacy_date;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Legacy statuses that count as a purchase.
pub const VALID_PURCHASE_STATUSES: &[&str] = &["publish", "complete", "revoked"];
/// Statuses that carry a completion date.
const COMPLETED_STATUSES: &[&str] = &["complete", "revoked", "refunded", "partially_refunded"];
/// Statuses that carry a refund date.
const REFUNDED_STATUSES: &[&str] = &["refunded", "partially_refunded"];

// ============================================================================
// SECTION: Types
// ============================================================================

/// Billing address from a payment blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    /// First address line.
    pub line1: String,
    /// Second address line.
    pub line2: String,
    /// City.
    pub city: String,
    /// State or region.
    pub region: String,
    /// Postal code.
    pub postal_code: String,
    /// Country code.
    pub country: String,
}

impl Address {
    /// Returns true when every field is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [&self.line1, &self.line2, &self.city, &self.region, &self.postal_code, &self.country]
            .iter()
            .all(|field| field.is_empty())
    }
}

/// One cart line from a payment blob.
#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    /// Product identifier.
    pub product_id: i64,
    /// Product name at purchase time.
    pub name: String,
    /// Variable price identifier.
    pub price_id: Option<i64>,
    /// Quantity, at least one.
    pub quantity: i64,
    /// Unit price.
    pub amount: f64,
    /// Line subtotal.
    pub subtotal: f64,
    /// Line discount.
    pub discount: f64,
    /// Line tax.
    pub tax: f64,
    /// Line total.
    pub total: f64,
}

/// Read-only view of a legacy payment.
pub struct Payment<'a> {
    /// Underlying legacy object.
    object: &'a LegacyObject,
    /// Decoded `_edd_payment_meta` blob.
    blob: Map<String, Value>,
}

// ============================================================================
// SECTION: Payment
// ============================================================================

impl<'a> Payment<'a> {
    /// Wraps a legacy payment object.
    #[must_use]
    pub fn new(object: &'a LegacyObject) -> Self {
        Self {
            object,
            blob: object.meta_object("_edd_payment_meta"),
        }
    }

    /// Legacy payment id.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.object.id
    }

    /// Raw legacy status.
    #[must_use]
    pub fn legacy_status(&self) -> &str {
        self.object.status.as_str()
    }

    /// Normalized order status.
    #[must_use]
    pub fn status(&self) -> String {
        match self.object.status.as_str() {
            "publish" => "complete".to_string(),
            "" => "pending".to_string(),
            other => other.to_string(),
        }
    }

    /// Returns true when the payment counts toward customer stats.
    #[must_use]
    pub fn is_valid_purchase(&self) -> bool {
        VALID_PURCHASE_STATUSES.contains(&self.legacy_status())
    }

    /// `user_info` object from the blob.
    fn user_info(&self) -> Map<String, Value> {
        match self.blob.get("user_info") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }

    /// Text field from the blob.
    fn blob_str(&self, key: &str) -> Option<String> {
        self.blob.get(key).and_then(value_as_string)
    }

    /// Purchase email, lowercased.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        self.object
            .meta_str("_edd_payment_user_email")
            .or_else(|| self.user_info_email())
            .or_else(|| self.blob_str("email"))
            .map(|email| email.to_ascii_lowercase())
    }

    /// Email recorded in `user_info`, lowercased.
    #[must_use]
    pub fn user_info_email(&self) -> Option<String> {
        self.user_info()
            .get("email")
            .and_then(value_as_string)
            .map(|email| email.to_ascii_lowercase())
    }

    /// Customer display name.
    #[must_use]
    pub fn name(&self) -> String {
        let info = self.user_info();
        let first = info.get("first_name").and_then(value_as_string).unwrap_or_default();
        let last = info.get("last_name").and_then(value_as_string).unwrap_or_default();
        format!("{first} {last}").trim().to_string()
    }

    /// Platform user id, zero for guests.
    #[must_use]
    pub fn user_id(&self) -> i64 {
        self.object
            .meta_i64("_edd_payment_user_id")
            .or_else(|| self.user_info().get("id").and_then(value_as_i64))
            .unwrap_or(0)
            .max(0)
    }

    /// Payment total.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.object
            .meta_f64("_edd_payment_total")
            .or_else(|| self.blob.get("amount").and_then(value_as_f64))
            .or_else(|| self.blob.get("total").and_then(value_as_f64))
            .unwrap_or(0.0)
    }

    /// Payment tax.
    #[must_use]
    pub fn tax(&self) -> f64 {
        self.object
            .meta_f64("_edd_payment_tax")
            .or_else(|| self.blob.get("tax").and_then(value_as_f64))
            .unwrap_or(0.0)
    }

    /// Tax rate as a percentage.
    #[must_use]
    pub fn tax_rate(&self) -> f64 {
        normalize_tax_rate(self.object.meta_f64("_edd_payment_tax_rate").unwrap_or(0.0))
    }

    /// Currency code.
    #[must_use]
    pub fn currency(&self) -> String {
        self.object
            .meta_str("_edd_payment_currency")
            .or_else(|| self.blob_str("currency"))
            .unwrap_or_default()
    }

    /// Customer IP address.
    #[must_use]
    pub fn ip(&self) -> String {
        self.object
            .meta_str("_edd_payment_user_ip")
            .or_else(|| self.blob_str("ip"))
            .unwrap_or_default()
    }

    /// Payment gateway.
    #[must_use]
    pub fn gateway(&self) -> String {
        self.object.meta_str("_edd_payment_gateway").unwrap_or_default()
    }

    /// Payment mode (`live` or `test`).
    #[must_use]
    pub fn mode(&self) -> String {
        self.object.meta_str("_edd_payment_mode").unwrap_or_default()
    }

    /// Purchase key.
    #[must_use]
    pub fn payment_key(&self) -> String {
        self.object
            .meta_str("_edd_payment_purchase_key")
            .or_else(|| self.blob_str("key"))
            .unwrap_or_default()
    }

    /// Sequential order number, falling back to the legacy id.
    #[must_use]
    pub fn order_number(&self) -> String {
        self.object.meta_str("_edd_payment_number").unwrap_or_else(|| self.object.id.to_string())
    }

    /// Creation date.
    #[must_use]
    pub fn date_created(&self) -> Option<String> {
        legacy_date(&self.object.created_at)
    }

    /// Modification date.
    #[must_use]
    pub fn date_modified(&self) -> Option<String> {
        legacy_date(&self.object.modified_at)
    }

    /// Completion date for completed-like statuses.
    #[must_use]
    pub fn date_completed(&self) -> Option<String> {
        if !COMPLETED_STATUSES.contains(&self.status().as_str()) {
            return None;
        }
        self.object
            .meta_str("_edd_completed_date")
            .and_then(|text| legacy_date(&text))
            .or_else(|| self.date_created())
    }

    /// Refund date for refunded statuses.
    #[must_use]
    pub fn date_refunded(&self) -> Option<String> {
        if !REFUNDED_STATUSES.contains(&self.status().as_str()) {
            return None;
        }
        self.object
            .meta_str("_edd_refunded_date")
            .and_then(|text| legacy_date(&text))
            .or_else(|| self.date_modified())
    }

    /// Billing address from `user_info.address`.
    #[must_use]
    pub fn address(&self) -> Address {
        let info = self.user_info();
        let Some(Value::Object(address)) = info.get("address") else {
            return Address::default();
        };
        let field =
            |key: &str| address.get(key).and_then(value_as_string).unwrap_or_default();
        Address {
            line1: field("line1"),
            line2: field("line2"),
            city: field("city"),
            region: field("state"),
            postal_code: field("zip"),
            country: field("country"),
        }
    }

    /// Cart lines from `cart_details`; non-object entries are ignored.
    #[must_use]
    pub fn cart_items(&self) -> Vec<CartItem> {
        let Some(Value::Array(lines)) = self.blob.get("cart_details") else {
            return Vec::new();
        };
        lines
            .iter()
            .filter_map(Value::as_object)
            .map(|line| {
                let number = |key: &str| line.get(key).and_then(value_as_f64);
                let quantity =
                    line.get("quantity").and_then(value_as_i64).unwrap_or(1).max(1);
                let amount = number("item_price").unwrap_or(0.0);
                let subtotal = number("subtotal").unwrap_or_else(|| amount * quantity_f64(quantity));
                let discount = number("discount").unwrap_or(0.0);
                let tax = number("tax").unwrap_or(0.0);
                let total = number("price").unwrap_or(subtotal - discount + tax);
                CartItem {
                    product_id: line.get("id").and_then(value_as_i64).unwrap_or(0),
                    name: line.get("name").and_then(value_as_string).unwrap_or_default(),
                    price_id: line.get("price_id").and_then(value_as_i64),
                    quantity,
                    amount,
                    subtotal,
                    discount,
                    tax,
                    total,
                }
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Normalizes a stored tax rate to a percentage in `[0, 100]`.
///
/// Fractions strictly between 0 and 1 are scaled by 100; a rate of exactly
/// 1 stays 1%.
#[must_use]
pub fn normalize_tax_rate(rate: f64) -> f64 {
    if !rate.is_finite() {
        return 0.0;
    }
    let scaled = if rate > 0.0 && rate < 1.0 { rate * 100.0 } else { rate };
    scaled.clamp(0.0, 100.0)
}

/// Converts a quantity for price arithmetic.
fn quantity_f64(quantity: i64) -> f64 {
    i32::try_from(quantity).map_or(f64::from(i32::MAX), f64::from)
}
