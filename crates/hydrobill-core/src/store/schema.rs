use rusqlite::Connection;

/// Fixed three-table layout. Every statement is create-if-absent, so this is
/// safe to run on each startup.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS subscribers (
    id             TEXT PRIMARY KEY,
    full_name      TEXT NOT NULL,
    address        TEXT NOT NULL,
    phone          TEXT NOT NULL,
    household_size INTEGER NOT NULL,
    building_type  TEXT NOT NULL,
    tariff_mode    TEXT NOT NULL,
    status         TEXT NOT NULL,
    balance        REAL NOT NULL,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS payments (
    id            TEXT PRIMARY KEY,
    subscriber_id TEXT NOT NULL,
    amount        REAL NOT NULL,
    date          TEXT NOT NULL,
    method        TEXT NOT NULL,
    comment       TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS meter_readings (
    id            TEXT PRIMARY KEY,
    subscriber_id TEXT NOT NULL,
    date          TEXT NOT NULL,
    value         REAL NOT NULL,
    abnormal      INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_payments_subscriber ON payments(subscriber_id);
CREATE INDEX IF NOT EXISTS idx_meter_readings_subscriber ON meter_readings(subscriber_id);
";

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
