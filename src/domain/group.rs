//! Stock groups: the unit the GroupExecutionScheduler dispatches work to
//! (spec.md §3, §4.7).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    ImmediateBreakout,
    TimeOfDayBreakout,
    BbRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

/// Maximum number of groups that may be SELECTED (i.e. `Executing`) for
/// live execution at once (spec.md §3, §6 `groups.max_active`).
pub const MAX_ACTIVE_GROUPS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockGroup {
    pub id: String,
    pub name: String,
    pub entry_type: EntryType,
    pub status: GroupStatus,
    pub instrument_keys: Vec<String>,
}

impl StockGroup {
    pub fn is_active(&self) -> bool {
        self.status == GroupStatus::Executing
    }
}
