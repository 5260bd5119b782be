//! Database migrations for shopsync.
//!
//! Each migration is a function that upgrades the schema by one version.
//! Migrations are run automatically when the database is opened.

use rusqlite::Connection;

use crate::error::ShopSyncError;

/// Current schema version.
const CURRENT_VERSION: i32 = 1;

/// Get the current schema version from the database.
///
/// Returns 0 if no version has been set (new database).
pub fn get_version(conn: &Connection) -> Result<i32, ShopSyncError> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| ShopSyncError::Database(format!("Failed to get schema version: {e}")))?;

    Ok(version)
}

/// Set the schema version in the database.
fn set_version(conn: &Connection, version: i32) -> Result<(), ShopSyncError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| ShopSyncError::Database(format!("Failed to set schema version: {e}")))
}

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<(), ShopSyncError> {
    let current = get_version(conn)?;

    if current >= CURRENT_VERSION {
        return Ok(());
    }

    for version in (current + 1)..=CURRENT_VERSION {
        run_migration(conn, version)?;
        set_version(conn, version)?;
    }

    Ok(())
}

/// Run a specific migration.
fn run_migration(conn: &Connection, version: i32) -> Result<(), ShopSyncError> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(ShopSyncError::Database(format!(
            "Unknown migration version: {version}"
        ))),
    }
}

/// Columns every syncable table carries, after its entity columns.
macro_rules! sync_columns {
    () => {
        r"
            remote_id TEXT,
            dirty INTEGER NOT NULL DEFAULT 1,
            last_error TEXT,
            last_synced_at TEXT,
            version INTEGER NOT NULL DEFAULT 1,
            claim_token TEXT,
            claimed_at TEXT,
            create_issued_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        "
    };
}

/// Migration v1: Initial schema.
///
/// Creates the syncable tables (`customers`, `addresses`, `products`,
/// `inventory_levels`, `selling_plans`) and the `selling_plan_products`
/// junction table. `local_id` uses AUTOINCREMENT so ids are never reused.
fn migrate_v1(conn: &Connection) -> Result<(), ShopSyncError> {
    let sql = concat!(
        r"
        CREATE TABLE IF NOT EXISTS customers (
            local_id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL DEFAULT '',
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            note TEXT NOT NULL DEFAULT '',
            tags TEXT NOT NULL DEFAULT '',
        ",
        sync_columns!(),
        r"
        );

        CREATE TABLE IF NOT EXISTS addresses (
            local_id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_id INTEGER NOT NULL REFERENCES customers(local_id) ON DELETE CASCADE,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            company TEXT NOT NULL DEFAULT '',
            address1 TEXT NOT NULL DEFAULT '',
            address2 TEXT NOT NULL DEFAULT '',
            city TEXT NOT NULL DEFAULT '',
            province_code TEXT NOT NULL DEFAULT '',
            zip TEXT NOT NULL DEFAULT '',
            country_code TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            is_default INTEGER NOT NULL DEFAULT 0,
        ",
        sync_columns!(),
        r"
        );

        CREATE INDEX IF NOT EXISTS idx_addresses_customer
        ON addresses(customer_id);

        CREATE TABLE IF NOT EXISTS products (
            local_id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL DEFAULT '',
            handle TEXT NOT NULL DEFAULT '',
            description_html TEXT NOT NULL DEFAULT '',
            vendor TEXT NOT NULL DEFAULT '',
            product_type TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'DRAFT',
            tags TEXT NOT NULL DEFAULT '',
        ",
        sync_columns!(),
        r"
        );

        CREATE TABLE IF NOT EXISTS inventory_levels (
            local_id INTEGER PRIMARY KEY AUTOINCREMENT,
            inventory_item_id TEXT NOT NULL,
            location_id TEXT NOT NULL,
            sku TEXT NOT NULL DEFAULT '',
            quantity INTEGER NOT NULL DEFAULT 0,
        ",
        sync_columns!(),
        r",
            UNIQUE (inventory_item_id, location_id)
        );

        CREATE TABLE IF NOT EXISTS selling_plans (
            local_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL DEFAULT '',
            merchant_code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            billing_interval TEXT NOT NULL DEFAULT 'MONTH',
            interval_count INTEGER NOT NULL DEFAULT 1,
            discount_percentage REAL NOT NULL DEFAULT 0,
            plan_remote_id TEXT,
        ",
        sync_columns!(),
        r"
        );

        CREATE TABLE IF NOT EXISTS selling_plan_products (
            selling_plan_id INTEGER NOT NULL REFERENCES selling_plans(local_id) ON DELETE CASCADE,
            product_id INTEGER NOT NULL REFERENCES products(local_id) ON DELETE CASCADE,
            PRIMARY KEY (selling_plan_id, product_id)
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_customers_remote ON customers(remote_id);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_addresses_remote ON addresses(remote_id);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_products_remote ON products(remote_id);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_inventory_levels_remote ON inventory_levels(remote_id);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_selling_plans_remote ON selling_plans(remote_id);

        CREATE INDEX IF NOT EXISTS idx_customers_dirty ON customers(dirty);
        CREATE INDEX IF NOT EXISTS idx_addresses_dirty ON addresses(dirty);
        CREATE INDEX IF NOT EXISTS idx_products_dirty ON products(dirty);
        CREATE INDEX IF NOT EXISTS idx_inventory_levels_dirty ON inventory_levels(dirty);
        CREATE INDEX IF NOT EXISTS idx_selling_plans_dirty ON selling_plans(dirty);
        "
    );

    conn.execute_batch(sql)
        .map_err(|e| ShopSyncError::Database(format!("Migration v1 failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_v1() {
        let conn = Connection::open_in_memory().unwrap();

        run(&conn).unwrap();

        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);

        conn.execute(
            "INSERT INTO customers (email, created_at, updated_at)
             VALUES ('a@example.com', '2024-01-01T10:00:00Z', '2024-01-01T10:00:00Z')",
            [],
        )
        .unwrap();

        conn.execute(
            "INSERT INTO addresses (customer_id, address1, created_at, updated_at)
             VALUES (1, '1 Main St', '2024-01-01T10:00:00Z', '2024-01-01T10:00:00Z')",
            [],
        )
        .unwrap();

        conn.execute(
            "INSERT INTO inventory_levels (inventory_item_id, location_id, quantity, created_at, updated_at)
             VALUES ('gid://shopify/InventoryItem/1', 'gid://shopify/Location/1', 5,
                     '2024-01-01T10:00:00Z', '2024-01-01T10:00:00Z')",
            [],
        )
        .unwrap();

        let dirty: i64 = conn
            .query_row("SELECT dirty FROM customers WHERE local_id = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(dirty, 1);
    }

    #[test]
    fn test_inventory_level_pair_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();

        let insert = "INSERT INTO inventory_levels (inventory_item_id, location_id, created_at, updated_at)
                      VALUES ('gid://shopify/InventoryItem/1', 'gid://shopify/Location/1', 'x', 'x')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }

    #[test]
    fn test_migration_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run(&conn).unwrap();
        run(&conn).unwrap();

        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_get_version_new_database() {
        let conn = Connection::open_in_memory().unwrap();

        assert_eq!(get_version(&conn).unwrap(), 0);
    }
}
