//! Wire schema for a variable's descriptor (component §6.3).

use crate::flags::VariableFlags;
use crate::ids::{Handle, StorageRef};
use crate::permission::Permissions;
use crate::tags::TagSet;
use crate::value::Value;

/// Full description of a variable as exchanged between a client and the
/// broker on NEW/FIND/GET/alias operations.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    pub handle: Option<Handle>,
    pub instance_id: u32,
    pub name: String,
    pub flags: VariableFlags,
    pub tags: TagSet,
    pub format_spec: Option<String>,
    pub permissions: Permissions,
    /// Slot the variable's storage currently resolves to, following any
    /// alias chain. `None` until the variable has been registered.
    pub storage_ref: Option<StorageRef>,
    pub value: Value,
}

impl VariableInfo {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        VariableInfo {
            handle: None,
            instance_id: 0,
            name: name.into(),
            flags: VariableFlags::empty(),
            tags: TagSet::default(),
            format_spec: None,
            permissions: Permissions::default(),
            storage_ref: None,
            value,
        }
    }
}
