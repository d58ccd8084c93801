// crates/storefront-migrate-store-sqlite/src/schema.rs
// ============================================================================
// Module: Storefront Schemas
// Description: DDL for the legacy storage model and the normalized tables.
// Purpose: Keep every table definition the migration touches in one place.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The legacy schema mirrors a generic object table with attached metadata
//! and an options table. Each normalized table carries a UNIQUE natural key
//! back to its legacy record so repeated inserts are detectable.

/// Legacy tables.
pub const LEGACY_TABLES: &[&str] = &["legacy_objects", "legacy_meta", "legacy_options"];

/// Normalized tables written by the migration.
pub const TARGET_TABLES: &[&str] = &[
    "orders",
    "order_items",
    "customers",
    "customer_addresses",
    "customer_email_addresses",
    "discounts",
    "logs",
    "notes",
    "tax_rates",
];

/// Legacy storage DDL.
pub const LEGACY_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS legacy_objects (
    id INTEGER PRIMARY KEY,
    object_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    parent_id INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT '',
    modified_at TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_legacy_objects_type ON legacy_objects (object_type, id);
CREATE TABLE IF NOT EXISTS legacy_meta (
    meta_id INTEGER PRIMARY KEY,
    object_id INTEGER NOT NULL,
    meta_key TEXT NOT NULL,
    meta_value TEXT
);
CREATE INDEX IF NOT EXISTS idx_legacy_meta_object ON legacy_meta (object_id);
CREATE TABLE IF NOT EXISTS legacy_options (
    option_name TEXT PRIMARY KEY,
    option_value TEXT
);
";

/// Normalized schema DDL.
pub const TARGET_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS customers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    user_id INTEGER NOT NULL DEFAULT 0,
    name TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'active',
    purchase_count INTEGER NOT NULL DEFAULT 0,
    purchase_value REAL NOT NULL DEFAULT 0,
    payment_ids TEXT NOT NULL DEFAULT '',
    date_created TEXT
);
CREATE TABLE IF NOT EXISTS customer_email_addresses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id INTEGER NOT NULL,
    type TEXT NOT NULL,
    email TEXT NOT NULL,
    date_created TEXT,
    UNIQUE (customer_id, email)
);
CREATE TABLE IF NOT EXISTS customer_addresses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id INTEGER NOT NULL,
    type TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    address TEXT NOT NULL DEFAULT '',
    address2 TEXT NOT NULL DEFAULT '',
    city TEXT NOT NULL DEFAULT '',
    region TEXT NOT NULL DEFAULT '',
    postal_code TEXT NOT NULL DEFAULT '',
    country TEXT NOT NULL DEFAULT '',
    date_created TEXT,
    UNIQUE (customer_id, type, address, address2, city, region, postal_code, country)
);
CREATE TABLE IF NOT EXISTS orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    legacy_id INTEGER NOT NULL UNIQUE,
    order_number TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL,
    user_id INTEGER NOT NULL DEFAULT 0,
    customer_id INTEGER NOT NULL DEFAULT 0,
    email TEXT NOT NULL DEFAULT '',
    ip TEXT NOT NULL DEFAULT '',
    gateway TEXT NOT NULL DEFAULT '',
    mode TEXT NOT NULL DEFAULT '',
    currency TEXT NOT NULL DEFAULT '',
    payment_key TEXT NOT NULL DEFAULT '',
    subtotal REAL NOT NULL DEFAULT 0,
    tax REAL NOT NULL DEFAULT 0,
    discount REAL NOT NULL DEFAULT 0,
    total REAL NOT NULL DEFAULT 0,
    tax_rate REAL NOT NULL DEFAULT 0,
    date_created TEXT,
    date_modified TEXT,
    date_completed TEXT,
    date_refunded TEXT
);
CREATE TABLE IF NOT EXISTS order_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id INTEGER NOT NULL,
    cart_index INTEGER NOT NULL,
    product_id INTEGER NOT NULL DEFAULT 0,
    product_name TEXT NOT NULL DEFAULT '',
    price_id INTEGER,
    quantity INTEGER NOT NULL DEFAULT 1,
    amount REAL NOT NULL DEFAULT 0,
    subtotal REAL NOT NULL DEFAULT 0,
    discount REAL NOT NULL DEFAULT 0,
    tax REAL NOT NULL DEFAULT 0,
    total REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT '',
    UNIQUE (order_id, cart_index)
);
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    legacy_id INTEGER NOT NULL UNIQUE,
    object_id INTEGER NOT NULL,
    object_type TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    date_created TEXT
);
CREATE TABLE IF NOT EXISTS discounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    legacy_id INTEGER,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT '',
    amount REAL NOT NULL DEFAULT 0,
    amount_type TEXT NOT NULL DEFAULT '',
    use_count INTEGER NOT NULL DEFAULT 0,
    max_uses INTEGER NOT NULL DEFAULT 0,
    min_charge_amount REAL NOT NULL DEFAULT 0,
    once_per_customer INTEGER NOT NULL DEFAULT 0,
    product_reqs TEXT NOT NULL DEFAULT '[]',
    excluded_products TEXT NOT NULL DEFAULT '[]',
    start_date TEXT,
    end_date TEXT
);
CREATE TABLE IF NOT EXISTS tax_rates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    country TEXT NOT NULL,
    region TEXT NOT NULL DEFAULT '',
    scope TEXT NOT NULL,
    rate REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'active',
    UNIQUE (country, region, scope)
);
CREATE TABLE IF NOT EXISTS logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    legacy_id INTEGER NOT NULL UNIQUE,
    object_id INTEGER NOT NULL DEFAULT 0,
    object_type TEXT NOT NULL DEFAULT '',
    type TEXT NOT NULL DEFAULT 'event',
    title TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    user_id INTEGER NOT NULL DEFAULT 0,
    ip TEXT NOT NULL DEFAULT '',
    date_created TEXT
);
";
