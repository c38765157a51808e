//! Strategy output: a trade signal ready for the order router (spec.md §4.8).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

/// Which strategy produced the signal, kept on the signal itself so the
/// order router and alert service can log/tag without a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    ImmediateBreakout,
    TimeOfDayBreakout,
    BbRangeEntry,
}

/// Free-form diagnostic snapshot carried alongside a signal: the indicator
/// readings that justified it, for audit/alert display. Not interpreted by
/// the order router.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub notes: Vec<String>,
}

impl AnalysisContext {
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub instrument_key: String,
    pub kind: SignalKind,
    pub direction: Direction,
    /// Bar-close timestamp the signal fired on (seconds since epoch).
    pub timestamp: i64,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub context: AnalysisContext,
}
