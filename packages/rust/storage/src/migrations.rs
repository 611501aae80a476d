//! SQL migration definitions for the stockscraper database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: products keyed by variant and extraction time",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per variant per snapshot. Unstamped rows use extracted_at = ''.
CREATE TABLE IF NOT EXISTS products (
    product_url       TEXT NOT NULL,
    model_parent      TEXT NOT NULL,
    variant_name      TEXT NOT NULL,
    variant_sku       TEXT NOT NULL,
    stock_units       INTEGER,
    reserved_units    INTEGER NOT NULL DEFAULT 0,
    next_arrival_date TEXT,
    next_arrival_qty  INTEGER,
    extracted_at      TEXT NOT NULL DEFAULT '',
    created_at        TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at        TEXT,
    PRIMARY KEY (product_url, model_parent, variant_name, variant_sku, extracted_at)
);

CREATE INDEX IF NOT EXISTS idx_products_sku ON products(variant_sku);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
    ]
}
