//! Request and notification kind enumerations (components F and J).

use serde::{Deserialize, Serialize};

/// Fixed set of operations the dispatcher's handler table is indexed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    Open,
    Close,
    Echo,
    New,
    Find,
    Get,
    Print,
    Set,
    Type,
    Name,
    Length,
    Notify,
    NotifyCancel,
    GetValidationRequest,
    SendValidationResponse,
    OpenPrintSession,
    ClosePrintSession,
    GetFirst,
    GetNext,
    Alias,
    SetFlags,
    ClearFlags,
    GetFlags,
    GetInfo,
    GetAliases,
    SetTags,
}

/// Notification kinds. CALC, VALIDATE and PRINT are exclusive-intent: at
/// most one client may hold a registration of that kind against a given
/// variable. MODIFIED and MODIFIED_QUEUE fan out to every registered
/// subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    Modified,
    ModifiedQueue,
    Calc,
    Validate,
    Print,
}

impl NotificationKind {
    /// CALC/VALIDATE/PRINT grant exclusive ownership of the variable's
    /// intent; only one client may register for one of these at a time.
    pub fn is_exclusive(self) -> bool {
        matches!(
            self,
            NotificationKind::Calc | NotificationKind::Validate | NotificationKind::Print
        )
    }
}
