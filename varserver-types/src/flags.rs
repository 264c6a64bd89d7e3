//! Per-variable behavioral flags.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VariableFlags: u16 {
        /// Not persisted; reset to its default on every server restart.
        const VOLATILE = 1 << 0;
        /// Rejects SET from any client.
        const READONLY = 1 << 1;
        /// Excluded from unfiltered search/enumeration results.
        const HIDDEN   = 1 << 2;
        /// Has been written at least once since registration.
        const DIRTY    = 1 << 3;
        /// Value is redacted (e.g. in PRINT/search output) unless the caller has read access.
        const PASSWORD = 1 << 4;
        /// Writes are recorded to the audit trail.
        const AUDIT    = 1 << 5;
        /// Forces a MODIFIED/MODIFIED_QUEUE notification on every write,
        /// even when the written value is unchanged from the stored one.
        const TRIGGER  = 1 << 6;
        /// Participates in metrics collection.
        const METRIC   = 1 << 7;
        /// Derived: set automatically when the descriptor resolves through an alias chain.
        const ALIAS    = 1 << 8;
    }
}

impl VariableFlags {
    /// Flags a client may toggle directly via SET_FLAGS/CLEAR_FLAGS. `ALIAS`
    /// is server-derived and excluded.
    pub fn user_settable() -> VariableFlags {
        VariableFlags::all().difference(VariableFlags::ALIAS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_is_not_user_settable() {
        assert!(!VariableFlags::user_settable().contains(VariableFlags::ALIAS));
        assert!(VariableFlags::user_settable().contains(VariableFlags::READONLY));
    }
}
