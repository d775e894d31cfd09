//! Execution-type vocabulary (FIX tag 150).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecType {
    New,
    PartialFill,
    Fill,
    DoneForDay,
    Canceled,
    Replaced,
    PendingCancel,
    Stopped,
    Rejected,
    Suspended,
    PendingNew,
    Calculated,
    Expired,
    Restated,
    PendingReplace,
    Unknown,
}

impl ExecType {
    /// Unrecognized codes map to [`ExecType::Unknown`].
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "0" => ExecType::New,
            "1" => ExecType::PartialFill,
            "2" => ExecType::Fill,
            "3" => ExecType::DoneForDay,
            "4" => ExecType::Canceled,
            "5" => ExecType::Replaced,
            "6" => ExecType::PendingCancel,
            "7" => ExecType::Stopped,
            "8" => ExecType::Rejected,
            "9" => ExecType::Suspended,
            "A" => ExecType::PendingNew,
            "B" => ExecType::Calculated,
            "C" => ExecType::Expired,
            "D" => ExecType::Restated,
            "E" => ExecType::PendingReplace,
            _ => ExecType::Unknown,
        }
    }

    pub fn code(&self) -> Option<&'static str> {
        Some(match self {
            ExecType::New => "0",
            ExecType::PartialFill => "1",
            ExecType::Fill => "2",
            ExecType::DoneForDay => "3",
            ExecType::Canceled => "4",
            ExecType::Replaced => "5",
            ExecType::PendingCancel => "6",
            ExecType::Stopped => "7",
            ExecType::Rejected => "8",
            ExecType::Suspended => "9",
            ExecType::PendingNew => "A",
            ExecType::Calculated => "B",
            ExecType::Expired => "C",
            ExecType::Restated => "D",
            ExecType::PendingReplace => "E",
            ExecType::Unknown => return None,
        })
    }

    pub fn description(&self) -> &'static str {
        match self {
            ExecType::New => "new",
            ExecType::PartialFill => "partial fill",
            ExecType::Fill => "fill",
            ExecType::DoneForDay => "done for day",
            ExecType::Canceled => "canceled",
            ExecType::Replaced => "replaced",
            ExecType::PendingCancel => "pending cancel",
            ExecType::Stopped => "stopped",
            ExecType::Rejected => "rejected",
            ExecType::Suspended => "suspended",
            ExecType::PendingNew => "pending new",
            ExecType::Calculated => "calculated",
            ExecType::Expired => "expired",
            ExecType::Restated => "restated",
            ExecType::PendingReplace => "pending replace",
            ExecType::Unknown => "unknown",
        }
    }

    /// Fill or cancel of the guarded limit order. A stop paired with it is moot.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecType::Fill | ExecType::Canceled)
    }
}

impl fmt::Display for ExecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
