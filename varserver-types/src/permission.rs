//! Per-variable read/write ACLs.

use serde::{Deserialize, Serialize};

/// Read and write UID lists for a variable. An empty list grants access to
/// every credential, matching the convention that a variable with no ACL
/// entries is world-accessible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub read_uids: Vec<u32>,
    pub write_uids: Vec<u32>,
}

impl Permissions {
    pub fn can_read(&self, credentials: &[u32]) -> bool {
        Self::allows(&self.read_uids, credentials)
    }

    pub fn can_write(&self, credentials: &[u32]) -> bool {
        Self::allows(&self.write_uids, credentials)
    }

    fn allows(acl: &[u32], credentials: &[u32]) -> bool {
        acl.is_empty() || credentials.iter().any(|c| acl.contains(c))
    }
}
