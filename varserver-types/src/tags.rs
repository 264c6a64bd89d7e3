//! Tag parsing and subset-match semantics (component C).
//!
//! Tags are represented directly as a bounded set of case-sensitive strings
//! rather than mapped through an integer-id table: the distilled spec names
//! no authority for assigning such ids, and the search scenarios only ever
//! need set membership.

use crate::constants::MAX_TAGS;
use crate::error::VarError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn parse(spec: &str) -> Result<Self, VarError> {
        let mut tags: Vec<String> = Vec::new();
        for raw in spec.split(',') {
            let tag = raw.trim();
            if tag.is_empty() {
                continue;
            }
            if tags.iter().any(|t| t == tag) {
                continue;
            }
            if tags.len() >= MAX_TAGS {
                return Err(VarError::TooBig);
            }
            tags.push(tag.to_string());
        }
        Ok(TagSet(tags))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// True if `self` carries every tag present in `query`.
    pub fn contains_all(&self, query: &TagSet) -> bool {
        query.0.iter().all(|t| self.0.iter().any(|s| s == t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dedupes_and_trims() {
        let tags = TagSet::parse(" net, stat ,net").unwrap();
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["net", "stat"]);
    }

    #[test]
    fn parse_rejects_too_many() {
        let spec = (0..=MAX_TAGS).map(|n| format!("t{n}")).collect::<Vec<_>>().join(",");
        assert_eq!(TagSet::parse(&spec), Err(VarError::TooBig));
    }

    #[test]
    fn subset_match() {
        let var_tags = TagSet::parse("net,stat,io").unwrap();
        let query = TagSet::parse("net,stat").unwrap();
        assert!(var_tags.contains_all(&query));
        let miss = TagSet::parse("net,gpu").unwrap();
        assert!(!var_tags.contains_all(&miss));
    }
}
