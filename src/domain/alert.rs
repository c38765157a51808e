//! Alert events emitted by the BBWidthMonitor and carried through the
//! AlertService's dedup/cooldown/playback pipeline (spec.md §3, §4.11).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertType {
    BbWidthSqueeze,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub symbol: String,
    pub instrument_key: String,
    pub alert_type: AlertType,
    pub bb_width: f64,
    pub lowest_bb_width: f64,
    pub pattern_length: usize,
    /// Close time of the 5-minute bar the alert fired on, seconds since epoch.
    pub timestamp: i64,
    pub message: String,
}

impl AlertEvent {
    /// Dedup bucket: alerts for the same instrument/type within the same
    /// `cooldown_seconds` bucket collapse to one key.
    pub fn dedup_key(&self, cooldown_seconds: i64) -> (String, AlertType, i64) {
        let bucket = if cooldown_seconds > 0 {
            self.timestamp - self.timestamp.rem_euclid(cooldown_seconds)
        } else {
            self.timestamp
        };
        (self.instrument_key.clone(), self.alert_type, bucket)
    }
}
