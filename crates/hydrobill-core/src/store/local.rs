use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, Row};
use tracing::{debug, info};

use super::error::{Result, StoreError};
use super::schema;
use crate::models::{MeterReading, Payment, Subscriber};

/// Where the desktop shell keeps its local database, relative to the
/// working directory.
pub const DEFAULT_DB_PATH: &str = "data/hydrobill.db";

const SUBSCRIBER_COLUMNS: &str = "id, full_name, address, phone, household_size, \
     building_type, tariff_mode, status, balance, created_at";

const PAYMENT_COLUMNS: &str = "id, subscriber_id, amount, date, method, comment";

const METER_READING_COLUMNS: &str = "id, subscriber_id, date, value, abnormal";

/// Synchronous, file-backed store with a fixed schema.
///
/// Each operation is a single statement; there is no batching and no
/// transaction spans more than one insert.
pub struct LocalStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl LocalStore {
    /// Open (creating if needed) the database at `path` and make sure the
    /// schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.init_schema()?;
        info!(path = %path.display(), "Opened local store");
        Ok(store)
    }

    pub fn open_default() -> Result<Self> {
        Self::open(DEFAULT_DB_PATH)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create any missing tables and indexes. Safe to call on every startup.
    pub fn init_schema(&self) -> Result<()> {
        schema::init_schema(&self.conn)?;
        Ok(())
    }

    /// `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ===== Subscribers =====

    pub fn add_subscriber(&self, subscriber: &Subscriber) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO subscribers ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    SUBSCRIBER_COLUMNS
                ),
                params![
                    subscriber.id,
                    subscriber.full_name,
                    subscriber.address,
                    subscriber.phone,
                    subscriber.household_size,
                    subscriber.building_type,
                    subscriber.tariff_mode,
                    subscriber.status,
                    subscriber.balance,
                    subscriber.created_at,
                ],
            )
            .map_err(|e| StoreError::from_insert("subscriber", &subscriber.id, e))?;
        debug!(id = %subscriber.id, "Inserted subscriber");
        Ok(())
    }

    pub fn get_subscribers(&self) -> Result<Vec<Subscriber>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM subscribers", SUBSCRIBER_COLUMNS))?;
        let rows = stmt.query_map([], subscriber_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_subscriber(&self, id: &str) -> Result<Option<Subscriber>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM subscribers WHERE id = ?1",
            SUBSCRIBER_COLUMNS
        ))?;
        let mut rows = stmt.query_map([id], subscriber_from_row)?;
        Ok(rows.next().transpose()?)
    }

    // ===== Payments =====

    pub fn add_payment(&self, payment: &Payment) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO payments ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    PAYMENT_COLUMNS
                ),
                params![
                    payment.id,
                    payment.subscriber_id,
                    payment.amount,
                    payment.date,
                    payment.method,
                    payment.comment,
                ],
            )
            .map_err(|e| StoreError::from_insert("payment", &payment.id, e))?;
        debug!(id = %payment.id, subscriber = %payment.subscriber_id, "Inserted payment");
        Ok(())
    }

    pub fn get_payments(&self) -> Result<Vec<Payment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM payments", PAYMENT_COLUMNS))?;
        let rows = stmt.query_map([], payment_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_payments_for(&self, subscriber_id: &str) -> Result<Vec<Payment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM payments WHERE subscriber_id = ?1",
            PAYMENT_COLUMNS
        ))?;
        let rows = stmt.query_map([subscriber_id], payment_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ===== Meter Readings =====

    pub fn add_meter_reading(&self, reading: &MeterReading) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO meter_readings ({}) VALUES (?1, ?2, ?3, ?4, ?5)",
                    METER_READING_COLUMNS
                ),
                params![
                    reading.id,
                    reading.subscriber_id,
                    reading.date,
                    reading.value,
                    i64::from(reading.abnormal),
                ],
            )
            .map_err(|e| StoreError::from_insert("meter reading", &reading.id, e))?;
        debug!(id = %reading.id, subscriber = %reading.subscriber_id, "Inserted meter reading");
        Ok(())
    }

    /// Readings for one subscriber, in no guaranteed order. Empty when the
    /// subscriber has none (or doesn't exist).
    pub fn get_meter_readings(&self, subscriber_id: &str) -> Result<Vec<MeterReading>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM meter_readings WHERE subscriber_id = ?1",
            METER_READING_COLUMNS
        ))?;
        let rows = stmt.query_map([subscriber_id], meter_reading_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn subscriber_from_row(row: &Row<'_>) -> rusqlite::Result<Subscriber> {
    Ok(Subscriber {
        id: row.get(0)?,
        full_name: row.get(1)?,
        address: row.get(2)?,
        phone: row.get(3)?,
        household_size: row.get(4)?,
        building_type: row.get(5)?,
        tariff_mode: row.get(6)?,
        status: row.get(7)?,
        balance: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: row.get(0)?,
        subscriber_id: row.get(1)?,
        amount: row.get(2)?,
        date: row.get(3)?,
        method: row.get(4)?,
        comment: row.get(5)?,
    })
}

fn meter_reading_from_row(row: &Row<'_>) -> rusqlite::Result<MeterReading> {
    let abnormal: i64 = row.get(4)?;
    Ok(MeterReading {
        id: row.get(0)?,
        subscriber_id: row.get(1)?,
        date: row.get(2)?,
        value: row.get(3)?,
        abnormal: abnormal != 0,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, Utc};

    fn subscriber(id: &str, balance: f64) -> Subscriber {
        Subscriber {
            id: id.to_string(),
            full_name: "Amina Yusupova".to_string(),
            address: "12 Riverside St, apt 4".to_string(),
            phone: "+998 90 123 45 67".to_string(),
            household_size: 5,
            building_type: "apartment".to_string(),
            tariff_mode: "metered".to_string(),
            status: "active".to_string(),
            balance,
            created_at: DateTime::<Utc>::from_timestamp(1_704_067_200, 0).unwrap(),
        }
    }

    fn reading(id: &str, subscriber_id: &str, value: f64, abnormal: bool) -> MeterReading {
        MeterReading {
            id: id.to_string(),
            subscriber_id: subscriber_id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            value,
            abnormal,
        }
    }

    #[test]
    fn test_subscriber_roundtrip() {
        let store = LocalStore::open_in_memory().unwrap();
        let s1 = subscriber("s1", -125.5);

        store.add_subscriber(&s1).unwrap();

        let all = store.get_subscribers().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], s1);
        assert!(all[0].in_debt());
        assert_eq!(store.get_subscriber("s1").unwrap(), Some(s1));
        assert_eq!(store.get_subscriber("nobody").unwrap(), None);
    }

    #[test]
    fn test_duplicate_subscriber_is_rejected() {
        let store = LocalStore::open_in_memory().unwrap();
        store.add_subscriber(&subscriber("s1", 0.0)).unwrap();

        let mut replacement = subscriber("s1", 999.0);
        replacement.full_name = "Someone Else".to_string();
        let err = store.add_subscriber(&replacement).unwrap_err();

        assert!(
            matches!(err, StoreError::Duplicate { table: "subscriber", ref id } if id == "s1"),
            "unexpected error: {err}"
        );
        let all = store.get_subscribers().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].full_name, "Amina Yusupova");
        assert_eq!(all[0].balance, 0.0);
    }

    #[test]
    fn test_payment_for_unknown_subscriber_is_accepted() {
        let store = LocalStore::open_in_memory().unwrap();
        let payment = Payment {
            id: "p1".to_string(),
            subscriber_id: "ghost".to_string(),
            amount: 42.75,
            date: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
            method: "cash".to_string(),
            comment: String::new(),
        };

        store.add_payment(&payment).unwrap();

        assert_eq!(store.get_payments().unwrap(), vec![payment.clone()]);
        assert_eq!(store.get_payments_for("ghost").unwrap(), vec![payment]);
        assert!(store.get_payments_for("s1").unwrap().is_empty());
    }

    #[test]
    fn test_meter_readings_filtered_by_subscriber() {
        let store = LocalStore::open_in_memory().unwrap();
        store.add_meter_reading(&reading("r1", "s1", 120.0, false)).unwrap();
        store.add_meter_reading(&reading("r2", "s2", 80.0, false)).unwrap();
        store.add_meter_reading(&reading("r3", "s1", 410.0, true)).unwrap();

        let mut readings = store.get_meter_readings("s1").unwrap();
        readings.sort_by(|a, b| a.id.cmp(&b.id));

        assert_eq!(
            readings,
            vec![reading("r1", "s1", 120.0, false), reading("r3", "s1", 410.0, true)]
        );
        assert!(store.get_meter_readings("s3").unwrap().is_empty());
    }

    #[test]
    fn test_abnormal_flag_stored_as_integer() {
        let store = LocalStore::open_in_memory().unwrap();
        store.add_meter_reading(&reading("r1", "s1", 1.0, true)).unwrap();
        store.add_meter_reading(&reading("r2", "s1", 2.0, false)).unwrap();

        let mut stmt = store
            .conn
            .prepare("SELECT id, abnormal FROM meter_readings ORDER BY id")
            .unwrap();
        let raw: Vec<(String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();

        assert_eq!(raw, vec![("r1".to_string(), 1), ("r2".to_string(), 0)]);
    }

    #[test]
    fn test_init_schema_is_idempotent() {
        let store = LocalStore::open_in_memory().unwrap();
        store.add_subscriber(&subscriber("s1", 0.0)).unwrap();

        store.init_schema().unwrap();
        store.init_schema().unwrap();

        assert_eq!(store.get_subscribers().unwrap().len(), 1);
    }

    #[test]
    fn test_file_store_created_and_reopened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("hydrobill.db");

        {
            let store = LocalStore::open(&path).unwrap();
            assert_eq!(store.path(), Some(path.as_path()));
            store.add_subscriber(&subscriber("s1", 10.0)).unwrap();
        }
        assert!(path.exists());

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.get_subscribers().unwrap(), vec![subscriber("s1", 10.0)]);
    }
}
