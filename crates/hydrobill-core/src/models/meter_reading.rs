use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct MeterReading {
    pub id: String,
    pub subscriber_id: String,
    pub date: NaiveDate,
    pub value: f64,
    /// Flagged by the reader as implausible (leak, tampering, misread).
    #[serde(default)]
    pub abnormal: bool,
}
