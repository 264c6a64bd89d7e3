//! Small newtype identifiers used across the broker's request/response surface.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! dense_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn new(v: u32) -> Self {
                Self(v)
            }

            pub fn get(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

dense_id!(Handle, "Stable, dense identifier for a registered variable.");
dense_id!(ClientId, "Identifier assigned to a client session at registration.");
dense_id!(TransactionId, "Identifier correlating a deferred CALC/VALIDATE/PRINT round trip.");
dense_id!(SearchContextId, "Identifier for a client's open GET_FIRST/GET_NEXT search cursor.");
dense_id!(StorageRef, "Identifier for the underlying storage slot an alias chain resolves to.");
