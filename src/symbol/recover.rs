//! Rebuilding the dynamic symbol table from `PT_DYNAMIC`.
//!
//! Stripped or tampered objects may have no section headers at all, while the
//! dynamic array still describes where the loader finds the dynamic symbols.
//! The table size is not recorded there, so it is taken from the hash tables
//! or, failing that, from the distance between `DT_SYMTAB` and `DT_STRTAB`.

use super::{SymbolTable, SymbolTableKind, decode_entries};
use crate::{
    Result, dynamic::DynamicInfo, elf::Layout, image::ByteImage, segment::SegmentTable,
};
use elf::abi::{DT_GNU_HASH, DT_HASH, DT_STRSZ, DT_STRTAB, DT_SYMENT, DT_SYMTAB};

/// Number of symbols described by a SysV hash table (`nchain`).
fn sysv_count(image: &ByteImage, layout: Layout, offset: u64) -> Option<u64> {
    let mut cur = image.cursor_at(offset, layout).ok()?;
    let _nbucket = cur.read_u32().ok()?;
    cur.read_u32().ok().map(u64::from)
}

/// Number of symbols described by a GNU hash table.
///
/// The highest bucket value is the start of the last chain; the table ends at
/// the entry of that chain whose low bit is set.
fn gnu_count(image: &ByteImage, layout: Layout, offset: u64) -> Option<u64> {
    let mut cur = image.cursor_at(offset, layout).ok()?;
    let nbucket = cur.read_u32().ok()? as usize;
    let symbias = cur.read_u32().ok()? as u64;
    let nbloom = cur.read_u32().ok()? as usize;
    let _nshift = cur.read_u32().ok()?;
    cur.skip(nbloom.checked_mul(layout.class.word_size())?).ok()?;

    let mut last = 0u64;
    for _ in 0..nbucket {
        last = last.max(u64::from(cur.read_u32().ok()?));
    }
    if last < symbias {
        return Some(symbias);
    }
    let chains = cur.offset();
    let mut cur = image
        .cursor_at(chains.checked_add((last - symbias) * 4)?, layout)
        .ok()?;
    loop {
        let hash = cur.read_u32().ok()?;
        if hash & 1 != 0 {
            return Some(last + 1);
        }
        last += 1;
    }
}

/// Reconstructs `.dynsym` from the dynamic array.
///
/// Returns `Ok(None)` when the dynamic array does not locate a usable table.
pub(crate) fn recover_dynsym(
    image: &ByteImage,
    layout: Layout,
    segments: &SegmentTable,
    dynamic: &DynamicInfo,
) -> Result<Option<SymbolTable>> {
    let (Some(symtab_addr), Some(strtab_addr)) =
        (dynamic.find(DT_SYMTAB), dynamic.find(DT_STRTAB))
    else {
        return Ok(None);
    };
    let (Some(symtab), Some(strtab)) = (
        segments.vaddr_to_offset(symtab_addr),
        segments.vaddr_to_offset(strtab_addr),
    ) else {
        return Ok(None);
    };

    let native = layout.class.sym_size() as u64;
    let stride = dynamic
        .find(DT_SYMENT)
        .filter(|&ent| ent >= native)
        .unwrap_or(native);

    let count = dynamic
        .find(DT_HASH)
        .and_then(|addr| segments.vaddr_to_offset(addr))
        .and_then(|off| sysv_count(image, layout, off))
        .or_else(|| {
            dynamic
                .find(DT_GNU_HASH)
                .and_then(|addr| segments.vaddr_to_offset(addr))
                .and_then(|off| gnu_count(image, layout, off))
        })
        .or_else(|| {
            (strtab_addr > symtab_addr).then(|| (strtab_addr - symtab_addr) / stride)
        });
    let Some(count) = count else {
        return Ok(None);
    };

    let avail = (image.len() as u64).saturating_sub(strtab);
    let strsz = dynamic.find(DT_STRSZ).map_or(avail, |size| size.min(avail));
    let strings = image.get(strtab, strsz);

    let symbols = decode_entries(
        image,
        layout,
        SymbolTableKind::Dynsym,
        symtab,
        count,
        stride,
        strings,
    )?;

    #[cfg(feature = "log")]
    log::info!(
        "[{}] reconstructed .dynsym from PT_DYNAMIC: {} symbols",
        image.name(),
        symbols.len()
    );
    Ok(Some(SymbolTable::new(SymbolTableKind::Dynsym, None, symbols)))
}
