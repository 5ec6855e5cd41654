//! Name index over one symbol table.
//!
//! Names are hashed with a fixed-seed foldhash hasher into a hashbrown
//! [`HashTable`] holding symbol indices, so the index borrows names from the
//! symbols instead of copying them.

use super::Symbol;
use core::hash::{Hash, Hasher};
use foldhash::{SharedSeed, fast::FoldHasher};
use hashbrown::HashTable;

#[inline]
fn hash(name: &str) -> u64 {
    let mut hasher = FoldHasher::with_seed(0, SharedSeed::global_fixed());
    name.as_bytes().hash(&mut hasher);
    hasher.finish()
}

/// Maps symbol names to the lowest index carrying that name.
#[derive(Clone, Debug, Default)]
pub(crate) struct NameIndex {
    map: HashTable<usize>,
}

impl NameIndex {
    /// Indexes every named symbol of `symbols`.
    pub(crate) fn build(symbols: &[Symbol]) -> Self {
        let mut map: HashTable<usize> = HashTable::with_capacity(symbols.len());
        for sym in symbols.iter().filter(|sym| !sym.name().is_empty()) {
            let name = sym.name();
            let entry = map.entry(
                hash(name),
                |&idx| symbols[idx].name() == name,
                |&idx| hash(symbols[idx].name()),
            );
            // Later duplicates never replace the first index.
            if let hashbrown::hash_table::Entry::Vacant(slot) = entry {
                slot.insert(sym.index());
            }
        }
        Self { map }
    }

    /// Index of the first symbol named `name`.
    pub(crate) fn find(&self, symbols: &[Symbol], name: &str) -> Option<usize> {
        self.map
            .find(hash(name), |&idx| symbols[idx].name() == name)
            .copied()
    }

    /// Number of distinct names.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}
