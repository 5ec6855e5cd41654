//! Address lookups over one symbol table.

use super::Symbol;
use alloc::vec::Vec;
use elf::abi::{STT_FILE, STT_SECTION};

/// Value-sorted views of a symbol table.
///
/// Both views hold symbol indices ordered by `(value, index)`, so equal values
/// keep table order and binary searches land on the lowest index first.
#[derive(Clone, Debug, Default)]
pub(crate) struct AddrIndex {
    /// Defined symbols other than section and file symbols.
    nearest: Vec<usize>,
    /// Defined symbols with a non-zero size.
    ranged: Vec<usize>,
    /// `max_end[i]` is the largest `value + size` among `ranged[..=i]`.
    max_end: Vec<u64>,
}

impl AddrIndex {
    pub(crate) fn build(symbols: &[Symbol]) -> Self {
        let defined = || {
            symbols
                .iter()
                .filter(|sym| !sym.section_index().is_undefined())
        };
        let by_value = |a: &usize, b: &usize| {
            (symbols[*a].value(), *a).cmp(&(symbols[*b].value(), *b))
        };

        let mut nearest: Vec<usize> = defined()
            .filter(|sym| !matches!(sym.sym_type(), STT_SECTION | STT_FILE))
            .map(Symbol::index)
            .collect();
        nearest.sort_unstable_by(by_value);

        let mut ranged: Vec<usize> = defined()
            .filter(|sym| sym.size() > 0)
            .map(Symbol::index)
            .collect();
        ranged.sort_unstable_by(by_value);

        let mut max_end = Vec::with_capacity(ranged.len());
        let mut running = 0u64;
        for &idx in &ranged {
            running = running.max(symbols[idx].end());
            max_end.push(running);
        }

        Self {
            nearest,
            ranged,
            max_end,
        }
    }

    /// The symbol with the largest value not above `addr`; lowest index on
    /// ties.
    pub(crate) fn nearest_preceding(&self, symbols: &[Symbol], addr: u64) -> Option<usize> {
        let upto = self
            .nearest
            .partition_point(|&idx| symbols[idx].value() <= addr);
        let best = symbols[*self.nearest.get(upto.checked_sub(1)?)?].value();
        let first = self
            .nearest
            .partition_point(|&idx| symbols[idx].value() < best);
        self.nearest.get(first).copied()
    }

    /// The smallest symbol whose `[value, value + size)` contains `addr`;
    /// lowest index on ties.
    pub(crate) fn containing(&self, symbols: &[Symbol], addr: u64) -> Option<usize> {
        let upto = self
            .ranged
            .partition_point(|&idx| symbols[idx].value() <= addr);
        let mut best: Option<(u64, usize)> = None;
        for pos in (0..upto).rev() {
            if self.max_end[pos] <= addr {
                // Nothing at or before this position reaches `addr`.
                break;
            }
            let sym = &symbols[self.ranged[pos]];
            if sym.end() <= addr {
                continue;
            }
            let key = (sym.size(), sym.index());
            if best.is_none_or(|cur| key < cur) {
                best = Some(key);
            }
        }
        best.map(|(_, idx)| idx)
    }
}
