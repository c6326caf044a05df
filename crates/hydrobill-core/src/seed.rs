//! Demo records for the local store.
//!
//! Gives a fresh desktop install something to show before it has ever talked
//! to the remote store. Seeding is repeatable: rows that already exist are
//! skipped.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::models::{MeterReading, Payment, Subscriber};
use crate::store::{LocalStore, Result, StoreError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
}

pub fn seed_demo(store: &LocalStore) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for subscriber in demo_subscribers() {
        tally(&mut report, store.add_subscriber(&subscriber))?;
    }
    for payment in demo_payments() {
        tally(&mut report, store.add_payment(&payment))?;
    }
    for reading in demo_readings() {
        tally(&mut report, store.add_meter_reading(&reading))?;
    }

    debug!(inserted = report.inserted, skipped = report.skipped, "Seeded demo data");
    Ok(report)
}

fn tally(report: &mut SeedReport, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => report.inserted += 1,
        Err(StoreError::Duplicate { .. }) => report.skipped += 1,
        Err(e) => return Err(e),
    }
    Ok(())
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn created(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap_or_default()
}

pub fn demo_subscribers() -> Vec<Subscriber> {
    vec![
        Subscriber {
            id: "demo-001".to_string(),
            full_name: "Dilnoza Karimova".to_string(),
            address: "14 Navoi St".to_string(),
            phone: "+998 90 111 22 33".to_string(),
            household_size: 4,
            building_type: "private house".to_string(),
            tariff_mode: "metered".to_string(),
            status: "active".to_string(),
            balance: 12.5,
            created_at: created(1_704_067_200),
        },
        Subscriber {
            id: "demo-002".to_string(),
            full_name: "Rustam Aliev".to_string(),
            address: "3 Mustaqillik Ave, apt 27".to_string(),
            phone: "+998 91 444 55 66".to_string(),
            household_size: 6,
            building_type: "apartment".to_string(),
            tariff_mode: "per person".to_string(),
            status: "active".to_string(),
            balance: -48.0,
            created_at: created(1_706_745_600),
        },
        Subscriber {
            id: "demo-003".to_string(),
            full_name: "Gulnora Tashkentova".to_string(),
            address: "88 Bog'bon St".to_string(),
            phone: "+998 93 777 88 99".to_string(),
            household_size: 2,
            building_type: "private house".to_string(),
            tariff_mode: "metered".to_string(),
            status: "suspended".to_string(),
            balance: -210.75,
            created_at: created(1_709_251_200),
        },
    ]
}

pub fn demo_payments() -> Vec<Payment> {
    vec![
        Payment {
            id: "demo-pay-001".to_string(),
            subscriber_id: "demo-001".to_string(),
            amount: 35.0,
            date: date(2024, 2, 5),
            method: "cash".to_string(),
            comment: "January invoice".to_string(),
        },
        Payment {
            id: "demo-pay-002".to_string(),
            subscriber_id: "demo-002".to_string(),
            amount: 20.0,
            date: date(2024, 2, 12),
            method: "card".to_string(),
            comment: String::new(),
        },
    ]
}

pub fn demo_readings() -> Vec<MeterReading> {
    vec![
        MeterReading {
            id: "demo-read-001".to_string(),
            subscriber_id: "demo-001".to_string(),
            date: date(2024, 1, 31),
            value: 1204.0,
            abnormal: false,
        },
        MeterReading {
            id: "demo-read-002".to_string(),
            subscriber_id: "demo-001".to_string(),
            date: date(2024, 2, 29),
            value: 1219.5,
            abnormal: false,
        },
        MeterReading {
            id: "demo-read-003".to_string(),
            subscriber_id: "demo-003".to_string(),
            date: date(2024, 2, 29),
            value: 3950.0,
            abnormal: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_twice_skips_existing_rows() {
        let store = LocalStore::open_in_memory().unwrap();

        let first = seed_demo(&store).unwrap();
        assert_eq!(first, SeedReport { inserted: 8, skipped: 0 });

        let second = seed_demo(&store).unwrap();
        assert_eq!(second, SeedReport { inserted: 0, skipped: 8 });

        assert_eq!(store.get_subscribers().unwrap().len(), 3);
        assert_eq!(store.get_payments().unwrap().len(), 2);
        assert_eq!(store.get_meter_readings("demo-001").unwrap().len(), 2);
    }

    #[test]
    fn test_demo_abnormal_reading_survives_store() {
        let store = LocalStore::open_in_memory().unwrap();
        seed_demo(&store).unwrap();

        let readings = store.get_meter_readings("demo-003").unwrap();
        assert_eq!(readings.len(), 1);
        assert!(readings[0].abnormal);
    }
}
