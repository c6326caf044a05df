use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Payment {
    pub id: String,
    /// Not checked against the subscribers table.
    pub subscriber_id: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub method: String,
    #[serde(default)]
    pub comment: String,
}
