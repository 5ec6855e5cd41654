//! Relocation entries (`SHT_REL` / `SHT_RELA`).
//!
//! Entries are only decoded, never applied.

use crate::{
    Result,
    elf::Layout,
    image::{ByteImage, Cursor},
};
use alloc::vec::Vec;

/// One relocation entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relocation {
    index: usize,
    offset: u64,
    info: u64,
    sym: u32,
    r_type: u32,
    addend: Option<i64>,
}

impl Relocation {
    fn decode(cur: &mut Cursor<'_>, index: usize, rela: bool) -> Result<Self> {
        let class = cur.layout().class;
        let offset = cur.read_word()?;
        let info = cur.read_word()?;
        let addend = if rela { Some(cur.read_sword()?) } else { None };
        let (sym, r_type) = class.split_r_info(info);
        Ok(Self {
            index,
            offset,
            info,
            sym,
            r_type,
            addend,
        })
    }

    /// Position in its relocation table.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// `r_offset`: the address of the patched location.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Raw `r_info`.
    #[inline]
    pub fn info(&self) -> u64 {
        self.info
    }

    /// Symbol table index from `r_info`.
    #[inline]
    pub fn sym(&self) -> u32 {
        self.sym
    }

    /// Relocation type from `r_info`.
    #[inline]
    pub fn r_type(&self) -> u32 {
        self.r_type
    }

    /// `r_addend`; `None` for `Rel` entries.
    #[inline]
    pub fn addend(&self) -> Option<i64> {
        self.addend
    }
}

/// Decodes a table of `size` bytes at `offset`.
///
/// The entry size comes from `entsize` when it is at least the native record
/// size. Entries that do not fit in the image end the table.
pub(crate) fn decode_table(
    image: &ByteImage,
    layout: Layout,
    offset: u64,
    size: u64,
    entsize: u64,
    rela: bool,
) -> Result<Vec<Relocation>> {
    let record = if rela {
        layout.class.rela_size()
    } else {
        layout.class.rel_size()
    } as u64;
    let stride = if entsize >= record { entsize } else { record };
    let count = size / stride;
    let fitting = (image.len() as u64).saturating_sub(offset) / stride;
    let mut relocs = Vec::with_capacity(count.min(fitting) as usize);
    for index in 0..count {
        let at = offset.saturating_add(index * stride);
        if !image.contains(at, record) {
            break;
        }
        let mut cur = image.cursor_at(at, layout)?;
        relocs.push(Relocation::decode(&mut cur, index as usize, rela)?);
    }
    Ok(relocs)
}
