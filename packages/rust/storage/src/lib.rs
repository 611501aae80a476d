//! libSQL storage layer for scraped stock snapshots.
//!
//! The [`Storage`] struct wraps a local libSQL database holding the
//! `products` table. Rows are keyed by
//! `(product_url, model_parent, variant_name, variant_sku, extracted_at)`,
//! so re-running an unstamped scrape overwrites the previous values while a
//! stamped scrape adds a new snapshot.

mod migrations;

use std::path::Path;

use libsql::{Connection, Database, params};
use stockscraper_shared::{Result, ScraperError, VariantRecord};

/// Insert-or-update statement for one variant row.
const UPSERT_PRODUCT_SQL: &str = "INSERT INTO products (
        product_url, model_parent, variant_name, variant_sku,
        stock_units, reserved_units, next_arrival_date, next_arrival_qty,
        extracted_at, updated_at
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, datetime('now'))
    ON CONFLICT(product_url, model_parent, variant_name, variant_sku, extracted_at) DO UPDATE SET
        stock_units = excluded.stock_units,
        reserved_units = excluded.reserved_units,
        next_arrival_date = excluded.next_arrival_date,
        next_arrival_qty = excluded.next_arrival_qty,
        updated_at = excluded.updated_at";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// A `products` row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProduct {
    pub product_url: String,
    pub model_parent: String,
    pub variant_name: String,
    pub variant_sku: String,
    pub stock_units: Option<i64>,
    pub reserved_units: i64,
    pub next_arrival_date: Option<String>,
    pub next_arrival_qty: Option<i64>,
    /// Empty for unstamped rows.
    pub extracted_at: String,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ScraperError::io(parent, e))?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;

        let conn = db.connect().map_err(db_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` without migrating or writing.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ScraperError::Storage(format!(
                "database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;

        let conn = db.connect().map_err(db_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    ScraperError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    pub async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(ScraperError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    /// Round-trip a trivial query to prove the connection works.
    pub async fn ping(&self) -> Result<()> {
        let mut rows = self.conn.query("SELECT 1", params![]).await.map_err(db_err)?;
        match rows.next().await.map_err(db_err)? {
            Some(_) => Ok(()),
            None => Err(ScraperError::Storage("ping returned no row".into())),
        }
    }

    // -----------------------------------------------------------------------
    // Product operations
    // -----------------------------------------------------------------------

    /// Upsert all records in one transaction. Returns the number of rows written.
    ///
    /// Idempotent: writing the same records twice leaves the same rows.
    pub async fn upsert_products(&self, records: &[VariantRecord]) -> Result<u64> {
        self.check_writable()?;

        let tx = self.conn.transaction().await.map_err(db_err)?;
        let mut written = 0;

        for record in records {
            let next = record.next_arrival();
            let next_date = next.map(|a| a.date.as_str()).filter(|d| !d.is_empty());
            let next_qty = next.and_then(|a| a.quantity);
            let extracted_at = record.extracted_at_string();

            written += tx
                .execute(
                    UPSERT_PRODUCT_SQL,
                    params![
                        record.product_url.as_str(),
                        record.model_parent.as_str(),
                        record.variant_name.as_str(),
                        record.variant_sku.as_str(),
                        record.stock_units,
                        record.reserved_units,
                        next_date,
                        next_qty,
                        extracted_at.as_str(),
                    ],
                )
                .await
                .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        tracing::debug!(written, "products upserted");
        Ok(written)
    }

    /// Number of rows in `products`.
    pub async fn count_products(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM products", params![])
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(db_err)?.max(0) as u64),
            None => Ok(0),
        }
    }

    /// All rows, ordered by key.
    pub async fn list_products(&self) -> Result<Vec<StoredProduct>> {
        let mut rows = self
            .conn
            .query(
                "SELECT product_url, model_parent, variant_name, variant_sku,
                        stock_units, reserved_units, next_arrival_date, next_arrival_qty,
                        extracted_at
                 FROM products
                 ORDER BY product_url, model_parent, variant_name, variant_sku, extracted_at",
                params![],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_product(&row)?);
        }
        Ok(results)
    }
}

/// Convert a database row to a [`StoredProduct`].
fn row_to_product(row: &libsql::Row) -> Result<StoredProduct> {
    Ok(StoredProduct {
        product_url: row.get::<String>(0).map_err(db_err)?,
        model_parent: row.get::<String>(1).map_err(db_err)?,
        variant_name: row.get::<String>(2).map_err(db_err)?,
        variant_sku: row.get::<String>(3).map_err(db_err)?,
        stock_units: row.get::<i64>(4).ok(),
        reserved_units: row.get::<i64>(5).map_err(db_err)?,
        next_arrival_date: row.get::<String>(6).ok(),
        next_arrival_qty: row.get::<i64>(7).ok(),
        extracted_at: row.get::<String>(8).map_err(db_err)?,
    })
}

fn db_err(e: libsql::Error) -> ScraperError {
    ScraperError::Storage(e.to_string())
}
