// crates/storefront-migrate-transformers/src/orders.rs
// ============================================================================
// Module: Order Transformer
// Description: Converts legacy payments into orders and order items.
// Purpose: Populate `orders` and `order_items` keyed by legacy payment id.
// Dependencies: rusqlite, storefront-migrate-core, storefront-migrate-store-sqlite
// ============================================================================

//! ## Overview
//! One order per payment, plus one item per cart line. Status `publish`
//! becomes `complete`; completion and refund dates only apply to the
//! statuses that imply them. The customer is resolved by email from rows
//! the customer step already wrote, so this step runs after it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::OptionalExtension;
use rusqlite::params;
use storefront_migrate_core::LegacyRecord;
use storefront_migrate_core::StepOutcome;
use storefront_migrate_core::TransformError;
use storefront_migrate_core::Transformer;
use storefront_migrate_store_sqlite::SqliteDatabase;

use crate::legacy::PAYMENT_TYPE;
use crate::legacy::count_objects;
use crate::legacy::expect_object;
use crate::legacy::fetch_objects;
use crate::legacy::record_failure;
use crate::legacy::require_tables;
use crate::payment::Payment;

// ============================================================================
// SECTION: Transformer
// ============================================================================

/// Orders and order items derived from legacy payments.
pub struct OrderTransformer {
    /// Shared migration database.
    db: SqliteDatabase,
}

impl OrderTransformer {
    /// Creates the transformer.
    #[must_use]
    pub const fn new(db: SqliteDatabase) -> Self {
        Self {
            db,
        }
    }
}

impl Transformer for OrderTransformer {
    fn prepare(&self) -> Result<(), TransformError> {
        require_tables(&self.db, &["orders", "order_items", "customers"])
    }

    fn count_estimate(&self) -> Result<u64, TransformError> {
        count_objects(&self.db, PAYMENT_TYPE)
    }

    fn fetch_page(&self, offset: u64, page_size: u64) -> Result<Vec<LegacyRecord>, TransformError> {
        fetch_objects(&self.db, PAYMENT_TYPE, offset, page_size)
    }

    fn migrate_one(&self, record: &LegacyRecord) -> Result<StepOutcome, TransformError> {
        let payment = Payment::new(expect_object(record)?);
        let status = payment.status();
        let items = payment.cart_items();
        let total = payment.total();
        let tax = payment.tax();
        let subtotal = if items.is_empty() {
            (total - tax).max(0.0)
        } else {
            items.iter().map(|item| item.subtotal).sum()
        };
        let discount: f64 = items.iter().map(|item| item.discount).sum();
        let email = payment.email().unwrap_or_default();

        self.db
            .with_connection(|connection| {
                let tx = connection.transaction()?;
                let exists: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM orders WHERE legacy_id = ?1",
                        params![payment.id()],
                        |row| row.get(0),
                    )
                    .optional()?;
                if exists.is_some() {
                    return Ok(StepOutcome::Skipped);
                }
                let customer_id: i64 = if email.is_empty() {
                    0
                } else {
                    tx.query_row(
                        "SELECT id FROM customers WHERE email = ?1",
                        params![email],
                        |row| row.get(0),
                    )
                    .optional()?
                    .unwrap_or(0)
                };
                tx.execute(
                    "INSERT INTO orders (legacy_id, order_number, status, user_id, customer_id, \
                     email, ip, gateway, mode, currency, payment_key, subtotal, tax, discount, \
                     total, tax_rate, date_created, date_modified, date_completed, date_refunded) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, \
                     ?16, ?17, ?18, ?19, ?20)",
                    params![
                        payment.id(),
                        payment.order_number(),
                        status,
                        payment.user_id(),
                        customer_id,
                        email,
                        payment.ip(),
                        payment.gateway(),
                        payment.mode(),
                        payment.currency(),
                        payment.payment_key(),
                        subtotal,
                        tax,
                        discount,
                        total,
                        payment.tax_rate(),
                        payment.date_created(),
                        payment.date_modified(),
                        payment.date_completed(),
                        payment.date_refunded()
                    ],
                )?;
                let order_id = tx.last_insert_rowid();
                for (index, item) in items.iter().enumerate() {
                    let cart_index = i64::try_from(index).unwrap_or(i64::MAX);
                    tx.execute(
                        "INSERT INTO order_items (order_id, cart_index, product_id, \
                         product_name, price_id, quantity, amount, subtotal, discount, tax, \
                         total, status) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                        params![
                            order_id,
                            cart_index,
                            item.product_id,
                            item.name,
                            item.price_id,
                            item.quantity,
                            item.amount,
                            item.subtotal,
                            item.discount,
                            item.tax,
                            item.total,
                            status
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(StepOutcome::Migrated)
            })
            .map_err(record_failure(record))
    }
}
