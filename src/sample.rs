//! Sample records and their categorical identifiers.
//!
//! Samples are contig-level records loaded once per dataset selection. The
//! index never mutates them; only filter state and derived aggregates change.

use serde::{Deserialize, Serialize};

/// Identifier of a bin (a user-curated genome draft).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BinId(pub u32);

/// Identifier of a taxonomy node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonomyId(pub u32);

/// Sorted, de-duplicated set of taxonomy memberships.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<TaxonomyId>", into = "Vec<TaxonomyId>")]
pub struct TaxonomySet(Vec<TaxonomyId>);

impl TaxonomySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check membership.
    pub fn contains(&self, id: TaxonomyId) -> bool {
        self.0.binary_search(&id).is_ok()
    }

    /// Check whether any of the given ids is a member.
    pub fn contains_any<'a>(&self, ids: impl IntoIterator<Item = &'a TaxonomyId>) -> bool {
        ids.into_iter().any(|id| self.contains(*id))
    }
}

impl From<Vec<TaxonomyId>> for TaxonomySet {
    fn from(mut ids: Vec<TaxonomyId>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self(ids)
    }
}

impl From<TaxonomySet> for Vec<TaxonomyId> {
    fn from(set: TaxonomySet) -> Self {
        set.0
    }
}

impl FromIterator<TaxonomyId> for TaxonomySet {
    fn from_iter<I: IntoIterator<Item = TaxonomyId>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

/// A sequence fragment with its numeric attributes and memberships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// GC content in percent.
    pub gc: f64,
    /// Mean read coverage.
    pub coverage: f64,
    /// Length in bases.
    pub length: f64,
    /// Assigned bin, if any.
    #[serde(default)]
    pub bin: Option<BinId>,
    /// Taxonomy memberships.
    #[serde(default)]
    pub taxonomies: TaxonomySet,
}

impl Sample {
    /// Create an unbinned sample without taxonomy memberships.
    pub fn new(gc: f64, coverage: f64, length: f64) -> Self {
        Self {
            gc,
            coverage,
            length,
            bin: None,
            taxonomies: TaxonomySet::new(),
        }
    }

    /// Assign a bin.
    pub fn with_bin(mut self, bin: BinId) -> Self {
        self.bin = Some(bin);
        self
    }

    /// Replace the taxonomy memberships.
    pub fn with_taxonomies(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.taxonomies = ids.into_iter().map(TaxonomyId).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_set_is_sorted_and_unique() {
        let set: TaxonomySet = vec![TaxonomyId(5), TaxonomyId(3), TaxonomyId(5)].into();
        assert_eq!(Vec::from(set.clone()), vec![TaxonomyId(3), TaxonomyId(5)]);
        assert!(set.contains(TaxonomyId(5)));
        assert!(!set.contains(TaxonomyId(4)));
    }

    #[test]
    fn sample_deserializes_with_defaults() {
        let sample: Sample =
            serde_json::from_str(r#"{"gc": 41.5, "coverage": 120.0, "length": 2000}"#)
                .expect("valid sample");
        assert_eq!(sample.bin, None);
        assert_eq!(sample.taxonomies, TaxonomySet::new());

        let binned: Sample = serde_json::from_str(
            r#"{"gc": 40, "coverage": 10, "length": 5, "bin": 7, "taxonomies": [9, 2, 9]}"#,
        )
        .expect("valid sample");
        assert_eq!(binned.bin, Some(BinId(7)));
        assert_eq!(
            Vec::from(binned.taxonomies),
            vec![TaxonomyId(2), TaxonomyId(9)]
        );
    }
}
