//! Query combinators over the registry and the GET_FIRST/GET_NEXT cursor
//! (component I).
//!
//! Search contexts are per-client exclusive: opening a new GET_FIRST
//! replaces any context already open for that client. The distilled spec
//! leaves this unspecified; the reference client library's single implicit
//! cursor per connection is the simplest behavior a client channel can rely on.

use regex::Regex;
use rustc_hash::FxHashMap;

use varserver_types::{ClientId, Handle, TagSet, VariableFlags, VarError, VarResult};

use crate::registry::Registry;

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Case-sensitive substring match (MATCH).
    pub name_match: Option<String>,
    /// Case-insensitive substring match (IMATCH).
    pub name_imatch: Option<String>,
    pub name_regex: Option<String>,
    pub instance_id: Option<u32>,
    pub flags_mask: Option<VariableFlags>,
    /// When set, the flag-mask predicate is inverted: matches variables with
    /// none of `flags_mask`'s bits set instead of at least one.
    pub flags_negate: bool,
    pub tags: Option<TagSet>,
}

impl SearchQuery {
    fn matches(&self, registry: &Registry, handle: Handle) -> VarResult<bool> {
        // HIDDEN variables are skipped unconditionally, regardless of the
        // rest of the query.
        if registry.flags_of(handle)?.contains(VariableFlags::HIDDEN) {
            return Ok(false);
        }
        if let Some(want) = self.instance_id {
            if registry.instance_of(handle)? != want {
                return Ok(false);
            }
        }
        if let Some(sub) = &self.name_match {
            if !registry.name_of(handle)?.contains(sub.as_str()) {
                return Ok(false);
            }
        }
        if let Some(sub) = &self.name_imatch {
            let name = registry.name_of(handle)?.to_lowercase();
            if !name.contains(&sub.to_lowercase()) {
                return Ok(false);
            }
        }
        if let Some(pattern) = &self.name_regex {
            let re = Regex::new(pattern).map_err(|_| VarError::NotSupported)?;
            if !re.is_match(registry.name_of(handle)?) {
                return Ok(false);
            }
        }
        if let Some(mask) = self.flags_mask {
            let intersects = registry.flags_of(handle)?.intersects(mask);
            if self.flags_negate == intersects {
                return Ok(false);
            }
        }
        if let Some(query_tags) = &self.tags {
            if !registry.tags_of(handle)?.contains_all(query_tags) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

struct SearchContext {
    query: SearchQuery,
    cursor: usize,
}

#[derive(Default)]
pub struct SearchEngine {
    contexts: FxHashMap<ClientId, SearchContext>,
}

impl SearchEngine {
    pub fn new() -> Self {
        SearchEngine::default()
    }

    pub fn get_first(
        &mut self,
        client: ClientId,
        query: SearchQuery,
        registry: &Registry,
    ) -> VarResult<Option<Handle>> {
        let mut ctx = SearchContext { query, cursor: 0 };
        let found = Self::advance(&mut ctx, registry)?;
        self.contexts.insert(client, ctx);
        Ok(found)
    }

    pub fn get_next(&mut self, client: ClientId, registry: &Registry) -> VarResult<Option<Handle>> {
        let ctx = self.contexts.get_mut(&client).ok_or(VarError::NotFound)?;
        Self::advance(ctx, registry)
    }

    pub fn cancel(&mut self, client: ClientId) {
        self.contexts.remove(&client);
    }

    fn advance(ctx: &mut SearchContext, registry: &Registry) -> VarResult<Option<Handle>> {
        let handles = registry.handles_ascending();
        while ctx.cursor < handles.len() {
            let handle = handles[ctx.cursor];
            ctx.cursor += 1;
            if ctx.query.matches(registry, handle)? {
                return Ok(Some(handle));
            }
        }
        Ok(None)
    }
}
