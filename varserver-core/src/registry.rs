//! Variable registry: name/handle index, alias graph and backing storage
//! (components D and E).

use rustc_hash::FxHashMap;

use varserver_types::{
    Handle, Permissions, StorageRef, TagSet, Value, VariableFlags, VariableInfo, VarError, VarResult,
    WriteOutcome,
};

/// Backing storage slot. Multiple names can alias the same slot; `refs`
/// counts how many [`VariableEntry`] records currently resolve to it.
#[derive(Debug, Clone)]
pub struct Storage {
    pub value: Value,
    pub flags: VariableFlags,
    pub tags: TagSet,
    pub format_spec: Option<String>,
    pub permissions: Permissions,
    pub capacity: usize,
    refs: u32,
}

impl Storage {
    fn new(value: Value, capacity: usize) -> Self {
        Storage {
            value,
            flags: VariableFlags::empty(),
            tags: TagSet::default(),
            format_spec: None,
            permissions: Permissions::default(),
            capacity,
            refs: 1,
        }
    }
}

/// A registered name binding. `storage_ref` is the slot it currently
/// resolves to; `is_alias` is true for every binding after the first one
/// created against a given slot.
#[derive(Debug, Clone)]
pub struct VariableEntry {
    pub handle: Handle,
    pub name: String,
    pub instance_id: u32,
    pub storage_ref: StorageRef,
    pub is_alias: bool,
}

pub struct Registry {
    by_handle: FxHashMap<Handle, VariableEntry>,
    by_name: FxHashMap<String, Handle>,
    storage: FxHashMap<StorageRef, Storage>,
    next_handle: u32,
    next_storage: u32,
    max_variables: usize,
}

impl Registry {
    pub fn new(max_variables: usize) -> Self {
        Registry {
            by_handle: FxHashMap::default(),
            by_name: FxHashMap::default(),
            storage: FxHashMap::default(),
            next_handle: 1,
            next_storage: 1,
            max_variables,
        }
    }

    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    fn qualified_name(name: &str, instance_id: u32) -> String {
        if instance_id == 0 {
            name.to_string()
        } else {
            format!("[{instance_id}]{name}")
        }
    }

    /// NEW: register a fresh name bound to its own storage slot.
    pub fn new_variable(
        &mut self,
        name: &str,
        instance_id: u32,
        initial: Value,
        capacity: usize,
    ) -> VarResult<Handle> {
        let qname = Self::qualified_name(name, instance_id);
        if self.by_name.contains_key(&qname) {
            return Err(VarError::NotSupported);
        }
        if self.by_handle.len() >= self.max_variables {
            return Err(VarError::NoSpace);
        }

        let storage_ref = StorageRef::new(self.next_storage);
        self.next_storage += 1;
        self.storage.insert(storage_ref, Storage::new(initial, capacity));

        let handle = Handle::new(self.next_handle);
        self.next_handle += 1;
        self.by_handle.insert(
            handle,
            VariableEntry {
                handle,
                name: qname.clone(),
                instance_id,
                storage_ref,
                is_alias: false,
            },
        );
        self.by_name.insert(qname, handle);
        Ok(handle)
    }

    /// FIND: resolve a name to a handle without any access check.
    pub fn find(&self, name: &str, instance_id: u32) -> Option<Handle> {
        self.by_name.get(&Self::qualified_name(name, instance_id)).copied()
    }

    pub fn entry(&self, handle: Handle) -> VarResult<&VariableEntry> {
        self.by_handle.get(&handle).ok_or(VarError::NotFound)
    }

    pub fn storage(&self, handle: Handle) -> VarResult<&Storage> {
        let entry = self.entry(handle)?;
        self.storage.get(&entry.storage_ref).ok_or(VarError::NotFound)
    }

    /// Resolved flags for a handle, with ALIAS set for non-primary bindings.
    pub fn flags_of(&self, handle: Handle) -> VarResult<VariableFlags> {
        let entry = self.entry(handle)?;
        let storage = self.storage(handle)?;
        let mut flags = storage.flags;
        if entry.is_alias {
            flags.insert(VariableFlags::ALIAS);
        } else {
            flags.remove(VariableFlags::ALIAS);
        }
        Ok(flags)
    }

    /// The Storage slot a handle currently resolves to, following any alias.
    pub fn storage_ref_of(&self, handle: Handle) -> VarResult<StorageRef> {
        Ok(self.entry(handle)?.storage_ref)
    }

    /// READ permission check, independent of actually reading the value —
    /// used by the dispatcher to gate deferral decisions the same way a
    /// direct read is gated.
    pub fn check_read(&self, handle: Handle, credentials: &[u32]) -> VarResult<()> {
        let storage = self.storage(handle)?;
        if !storage.permissions.can_read(credentials) {
            return Err(VarError::AccessDenied);
        }
        Ok(())
    }

    /// WRITE permission check (READONLY or ACL failure), independent of
    /// actually writing — used by the dispatcher to gate deferral decisions
    /// the same way a direct write is gated.
    pub fn check_write(&self, handle: Handle, credentials: &[u32]) -> VarResult<()> {
        let storage = self.storage(handle)?;
        if storage.flags.contains(VariableFlags::READONLY) {
            return Err(VarError::AccessDenied);
        }
        if !storage.permissions.can_write(credentials) {
            return Err(VarError::AccessDenied);
        }
        Ok(())
    }

    /// Full descriptor for GET_INFO: everything a client needs without a
    /// separate round trip per field (type/name/length/flags/tags/...).
    pub fn info_of(&self, handle: Handle) -> VarResult<VariableInfo> {
        let entry = self.entry(handle)?;
        let storage = self.storage(handle)?;
        let mut flags = storage.flags;
        if entry.is_alias {
            flags.insert(VariableFlags::ALIAS);
        } else {
            flags.remove(VariableFlags::ALIAS);
        }
        Ok(VariableInfo {
            handle: Some(handle),
            instance_id: entry.instance_id,
            name: entry.name.clone(),
            flags,
            tags: storage.tags.clone(),
            format_spec: storage.format_spec.clone(),
            permissions: storage.permissions.clone(),
            storage_ref: Some(entry.storage_ref),
            value: storage.value.clone(),
        })
    }

    /// Replace a variable's tag set (parsed tagSpec from AddNew, or a later
    /// retag). Not gated on write permission: tags are metadata, not the
    /// value itself, matching SET_FLAGS/CLEAR_FLAGS.
    pub fn set_tags(&mut self, handle: Handle, tags: TagSet) -> VarResult<()> {
        let storage_ref = self.entry(handle)?.storage_ref;
        let storage = self.storage.get_mut(&storage_ref).ok_or(VarError::NotFound)?;
        storage.tags = tags;
        Ok(())
    }

    /// ALIAS: bind a new name to the storage slot an existing handle resolves to.
    pub fn alias(&mut self, existing: Handle, alias_name: &str, instance_id: u32) -> VarResult<Handle> {
        let storage_ref = self.entry(existing)?.storage_ref;
        let qname = Self::qualified_name(alias_name, instance_id);
        if self.by_name.contains_key(&qname) {
            return Err(VarError::NotSupported);
        }
        if self.by_handle.len() >= self.max_variables {
            return Err(VarError::NoSpace);
        }

        let handle = Handle::new(self.next_handle);
        self.next_handle += 1;
        self.by_handle.insert(
            handle,
            VariableEntry {
                handle,
                name: qname.clone(),
                instance_id,
                storage_ref,
                is_alias: true,
            },
        );
        self.by_name.insert(qname, handle);
        if let Some(storage) = self.storage.get_mut(&storage_ref) {
            storage.refs += 1;
        }
        Ok(handle)
    }

    /// SET: apply a coerced write, returning whether it actually changed state.
    pub fn set(&mut self, handle: Handle, incoming: Value, credentials: &[u32]) -> VarResult<WriteOutcome> {
        self.check_write(handle, credentials)?;
        let entry = self.entry(handle)?;
        let storage_ref = entry.storage_ref;
        let storage = self.storage.get_mut(&storage_ref).ok_or(VarError::NotFound)?;

        let coerced = if storage.flags.contains(VariableFlags::METRIC) {
            match metric_coerce(&incoming, &storage.value) {
                Some(v) => v,
                None => incoming.coerce_to(&storage.value)?,
            }
        } else {
            incoming.coerce_to(&storage.value)?
        };
        if coerced.byte_len() > storage.capacity {
            return Err(VarError::TooBig);
        }
        if coerced == storage.value {
            return Ok(WriteOutcome::Already);
        }
        storage.value = coerced;
        if !storage.flags.contains(VariableFlags::VOLATILE) {
            storage.flags.insert(VariableFlags::DIRTY);
        }
        Ok(WriteOutcome::Written)
    }

    /// TRIGGER path: always performs the write and never sets DIRTY,
    /// matching a TRIGGER variable's event-channel semantics rather than
    /// persistent-state semantics.
    pub fn force_set(&mut self, handle: Handle, incoming: Value, credentials: &[u32]) -> VarResult<()> {
        self.check_write(handle, credentials)?;
        let entry = self.entry(handle)?;
        let storage_ref = entry.storage_ref;
        let storage = self.storage.get_mut(&storage_ref).ok_or(VarError::NotFound)?;
        let coerced = incoming.coerce_to(&storage.value)?;
        if coerced.byte_len() > storage.capacity {
            return Err(VarError::TooBig);
        }
        storage.value = coerced;
        Ok(())
    }

    pub fn get(&self, handle: Handle, credentials: &[u32]) -> VarResult<Value> {
        self.check_read(handle, credentials)?;
        Ok(self.storage(handle)?.value.clone())
    }

    /// All handles sharing a storage slot, original binding first
    /// (ascending handle order), satisfying `refCount == len()`.
    pub fn aliases_of(&self, handle: Handle) -> VarResult<Vec<Handle>> {
        let storage_ref = self.entry(handle)?.storage_ref;
        let mut handles: Vec<Handle> = self
            .by_handle
            .values()
            .filter(|e| e.storage_ref == storage_ref)
            .map(|e| e.handle)
            .collect();
        handles.sort_by_key(|h| h.get());
        Ok(handles)
    }

    /// ALIAS move: reassign an existing VariableIdentifier to a different
    /// Storage. Refuses to orphan the old Storage (its last reference) and
    /// refuses a no-op move onto the same Storage; the notification-conflict
    /// half of the check lives in the dispatcher, which is the layer that
    /// owns subscriber state.
    pub fn move_alias(&mut self, alias_handle: Handle, target_handle: Handle) -> VarResult<()> {
        let old_ref = self.entry(alias_handle)?.storage_ref;
        let new_ref = self.entry(target_handle)?.storage_ref;
        if old_ref == new_ref {
            return Err(VarError::NotSupported);
        }
        let old_storage = self.storage.get(&old_ref).ok_or(VarError::NotFound)?;
        if old_storage.refs <= 1 {
            return Err(VarError::NotSupported);
        }

        if let Some(old) = self.storage.get_mut(&old_ref) {
            old.refs -= 1;
        }
        if let Some(new) = self.storage.get_mut(&new_ref) {
            new.refs += 1;
        }
        let entry = self.by_handle.get_mut(&alias_handle).ok_or(VarError::NotFound)?;
        entry.storage_ref = new_ref;
        entry.is_alias = true;
        Ok(())
    }

    pub fn set_flags(&mut self, handle: Handle, add: VariableFlags) -> VarResult<()> {
        let storage_ref = self.entry(handle)?.storage_ref;
        let storage = self.storage.get_mut(&storage_ref).ok_or(VarError::NotFound)?;
        storage.flags.insert(add & VariableFlags::user_settable());
        Ok(())
    }

    pub fn clear_flags(&mut self, handle: Handle, remove: VariableFlags) -> VarResult<()> {
        let storage_ref = self.entry(handle)?.storage_ref;
        let storage = self.storage.get_mut(&storage_ref).ok_or(VarError::NotFound)?;
        storage.flags.remove(remove & VariableFlags::user_settable());
        Ok(())
    }

    pub fn name_of(&self, handle: Handle) -> VarResult<&str> {
        Ok(&self.entry(handle)?.name)
    }

    pub fn instance_of(&self, handle: Handle) -> VarResult<u32> {
        Ok(self.entry(handle)?.instance_id)
    }

    pub fn tags_of(&self, handle: Handle) -> VarResult<&TagSet> {
        Ok(&self.storage(handle)?.tags)
    }

    /// Iterate handles in ascending ascending order, the order the search
    /// engine's GET_FIRST/GET_NEXT cursors walk.
    pub fn handles_ascending(&self) -> Vec<Handle> {
        let mut handles: Vec<Handle> = self.by_handle.keys().copied().collect();
        handles.sort_by_key(|h| h.get());
        handles
    }
}

/// METRIC semantics: a zero write clears the counter, any non-zero write
/// increments it by one. Only defined for unsigned integer storage; `None`
/// means the caller should fall back to an ordinary typed write.
fn metric_coerce(incoming: &Value, current: &Value) -> Option<Value> {
    let is_zero = match incoming {
        Value::U16(v) => *v == 0,
        Value::U32(v) => *v == 0,
        Value::U64(v) => *v == 0,
        Value::I16(v) => *v == 0,
        Value::I32(v) => *v == 0,
        Value::I64(v) => *v == 0,
        Value::F32(v) => *v == 0.0,
        _ => return None,
    };
    match current {
        Value::U16(v) => Some(Value::U16(if is_zero { 0 } else { v.saturating_add(1) })),
        Value::U32(v) => Some(Value::U32(if is_zero { 0 } else { v.saturating_add(1) })),
        Value::U64(v) => Some(Value::U64(if is_zero { 0 } else { v.saturating_add(1) })),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg() -> Registry {
        Registry::new(16)
    }

    #[test]
    fn new_and_find() {
        let mut r = reg();
        let h = r.new_variable("/sys/temp", 0, Value::I32(0), 16).unwrap();
        assert_eq!(r.find("/sys/temp", 0), Some(h));
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut r = reg();
        r.new_variable("/sys/temp", 0, Value::I32(0), 16).unwrap();
        assert_eq!(
            r.new_variable("/sys/temp", 0, Value::I32(1), 16),
            Err(VarError::NotSupported)
        );
    }

    #[test]
    fn set_already_short_circuits() {
        let mut r = reg();
        let h = r.new_variable("/sys/temp", 0, Value::I32(0), 16).unwrap();
        assert_eq!(r.set(h, Value::I32(0), &[]), Ok(WriteOutcome::Already));
        assert_eq!(r.set(h, Value::I32(1), &[]), Ok(WriteOutcome::Written));
    }

    #[test]
    fn readonly_rejects_write() {
        let mut r = reg();
        let h = r.new_variable("/sys/temp", 0, Value::I32(0), 16).unwrap();
        r.set_flags(h, VariableFlags::READONLY).unwrap();
        assert_eq!(r.set(h, Value::I32(1), &[]), Err(VarError::AccessDenied));
    }

    #[test]
    fn alias_shares_storage() {
        let mut r = reg();
        let h = r.new_variable("/sys/temp", 0, Value::I32(0), 16).unwrap();
        let a = r.alias(h, "/sys/temp_alias", 0).unwrap();
        r.set(h, Value::I32(42), &[]).unwrap();
        assert_eq!(r.get(a, &[]), Ok(Value::I32(42)));
        assert!(r.flags_of(a).unwrap().contains(VariableFlags::ALIAS));
        assert!(!r.flags_of(h).unwrap().contains(VariableFlags::ALIAS));

        let mut aliases = r.aliases_of(h).unwrap();
        aliases.sort_by_key(|x| x.get());
        let mut expected = vec![h, a];
        expected.sort_by_key(|x| x.get());
        assert_eq!(aliases, expected);
    }

    #[test]
    fn metric_clears_on_zero_and_increments_on_nonzero() {
        let mut r = reg();
        let h = r.new_variable("/sys/counter", 0, Value::U32(0), 4).unwrap();
        r.set_flags(h, VariableFlags::METRIC).unwrap();
        assert_eq!(r.set(h, Value::U32(1), &[]), Ok(WriteOutcome::Written));
        assert_eq!(r.get(h, &[]), Ok(Value::U32(1)));
        assert_eq!(r.set(h, Value::U32(99), &[]), Ok(WriteOutcome::Written));
        assert_eq!(r.get(h, &[]), Ok(Value::U32(2)));
        assert_eq!(r.set(h, Value::U32(0), &[]), Ok(WriteOutcome::Written));
        assert_eq!(r.get(h, &[]), Ok(Value::U32(0)));
    }
}
