use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A utility account. `id` is assigned by the remote store and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Subscriber {
    pub id: String,
    pub full_name: String,
    pub address: String,
    pub phone: String,
    pub household_size: u32,
    pub building_type: String,
    pub tariff_mode: String,
    pub status: String,
    /// Negative means the account owes money, positive is prepaid credit.
    pub balance: f64,
    pub created_at: DateTime<Utc>,
}

impl Subscriber {
    pub fn in_debt(&self) -> bool {
        self.balance < 0.0
    }
}
