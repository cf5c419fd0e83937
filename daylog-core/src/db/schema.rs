//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: metric definitions and daily values
    r#"
    -- One row per metric definition, scoped to an owner
    CREATE TABLE IF NOT EXISTS config (
        owner_id          TEXT NOT NULL,
        metric_id         TEXT NOT NULL,
        metric_name       TEXT NOT NULL,
        type              TEXT NOT NULL,      -- 'checkbox', 'number', 'time', 'hhmm'
        active            INTEGER NOT NULL DEFAULT 1,
        private           INTEGER NOT NULL DEFAULT 0,
        required          INTEGER NOT NULL DEFAULT 0,
        required_since    TEXT,               -- YYYY-MM-DD
        start_date        TEXT,               -- YYYY-MM-DD, set on first save if absent
        default_value     REAL,
        min_value         REAL,
        max_value         REAL,
        disallowed_values TEXT,               -- comma-separated numbers
        show_ma           INTEGER NOT NULL DEFAULT 0,
        ma_periods_csv    TEXT,

        PRIMARY KEY (owner_id, metric_id)
    );

    -- Sparse daily values: no row means "not logged"
    CREATE TABLE IF NOT EXISTS log (
        owner_id          TEXT NOT NULL,
        date              TEXT NOT NULL,      -- YYYY-MM-DD
        metric_id         TEXT NOT NULL,
        value             REAL NOT NULL,

        PRIMARY KEY (owner_id, date, metric_id)
    );

    CREATE INDEX IF NOT EXISTS idx_log_owner_metric_date ON log(owner_id, metric_id, date);
    "#,
    // Version 2: display grouping and calculated metrics
    r#"
    ALTER TABLE config ADD COLUMN "group" TEXT;
    ALTER TABLE config ADD COLUMN group_order INTEGER;
    ALTER TABLE config ADD COLUMN metric_order INTEGER;
    ALTER TABLE config ADD COLUMN is_calculated INTEGER NOT NULL DEFAULT 0;
    ALTER TABLE config ADD COLUMN calc_expr TEXT;

    CREATE INDEX IF NOT EXISTS idx_config_owner_order
        ON config(owner_id, group_order, "group", metric_order, metric_id);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
