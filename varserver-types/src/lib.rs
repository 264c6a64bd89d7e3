pub mod constants;
pub mod errors;
pub mod error;
pub mod ids;
pub mod permission;
pub mod tags;
pub mod flags;
pub mod value;
pub mod kinds;
pub mod descriptor;
pub mod notification;

pub use error::{VarError, VarResult, WriteOutcome};
pub use errors::ConfigError;
pub use flags::VariableFlags;
pub use ids::{ClientId, Handle, SearchContextId, StorageRef, TransactionId};
pub use kinds::{NotificationKind, RequestKind};
pub use notification::NotifyQueueRecord;
pub use permission::Permissions;
pub use tags::TagSet;
pub use value::{Value, ValueType};
