//! Symbol tables and their lookup structures.
//!
//! An object has up to two symbol tables, `.symtab` and `.dynsym`. They are
//! separate namespaces: names and indices are always relative to one
//! [`SymbolTable`].

mod addr;
mod hash;
mod recover;

pub(crate) use recover::recover_dynsym;

use crate::{
    Result,
    elf::{ElfClass, Layout, SectionIndex},
    error::parse_symbol_error,
    flags::ParsePolicy,
    image::{ByteImage, Cursor, cstr_from},
    section::{Section, SectionTable},
};
use addr::AddrIndex;
use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};
use elf::abi::{STB_GLOBAL, STB_WEAK, STT_FUNC, STT_OBJECT};
use hash::NameIndex;

/// Which symbol table a [`Symbol`] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolTableKind {
    /// The static symbol table (`SHT_SYMTAB`).
    Symtab,
    /// The dynamic symbol table (`SHT_DYNSYM`).
    Dynsym,
}

impl SymbolTableKind {
    /// Conventional section name of the table.
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolTableKind::Symtab => ".symtab",
            SymbolTableKind::Dynsym => ".dynsym",
        }
    }
}

/// One decoded symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    name: String,
    value: u64,
    size: u64,
    section_index: SectionIndex,
    info: u8,
    other: u8,
    index: usize,
    table: SymbolTableKind,
}

impl Symbol {
    /// Decodes one entry; returns the symbol and its `st_name`.
    fn decode(cur: &mut Cursor<'_>, index: usize, table: SymbolTableKind) -> Result<(Self, u32)> {
        let st_name = cur.read_u32()?;
        let (value, size, info, other, shndx);
        match cur.layout().class {
            ElfClass::Elf32 => {
                value = cur.read_word()?;
                size = cur.read_word()?;
                info = cur.read_u8()?;
                other = cur.read_u8()?;
                shndx = cur.read_u16()?;
            }
            ElfClass::Elf64 => {
                info = cur.read_u8()?;
                other = cur.read_u8()?;
                shndx = cur.read_u16()?;
                value = cur.read_word()?;
                size = cur.read_word()?;
            }
        }
        let sym = Self {
            name: String::new(),
            value,
            size,
            section_index: SectionIndex::from_raw(shndx),
            info,
            other,
            index,
            table,
        };
        Ok((sym, st_name))
    }

    /// Name of the symbol; empty for unnamed symbols.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `st_value`
    #[inline]
    pub fn value(&self) -> u64 {
        self.value
    }

    /// `st_size`
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The section the symbol is defined in, or a reserved sentinel.
    #[inline]
    pub fn section_index(&self) -> SectionIndex {
        self.section_index
    }

    /// `st_info`
    #[inline]
    pub fn info(&self) -> u8 {
        self.info
    }

    /// `st_other`
    #[inline]
    pub fn other(&self) -> u8 {
        self.other
    }

    /// Binding (`STB_*`).
    #[inline]
    pub fn bind(&self) -> u8 {
        self.info >> 4
    }

    /// Type (`STT_*`).
    #[inline]
    pub fn sym_type(&self) -> u8 {
        self.info & 0xf
    }

    /// Visibility (`STV_*`).
    #[inline]
    pub fn visibility(&self) -> u8 {
        self.other & 0x3
    }

    /// Position in its table.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The table the symbol belongs to.
    #[inline]
    pub fn table(&self) -> SymbolTableKind {
        self.table
    }

    /// Whether the symbol is defined in this object.
    #[inline]
    pub fn is_defined(&self) -> bool {
        !self.section_index.is_undefined()
    }

    #[inline]
    pub fn is_function(&self) -> bool {
        self.sym_type() == STT_FUNC
    }

    #[inline]
    pub fn is_object(&self) -> bool {
        self.sym_type() == STT_OBJECT
    }

    /// Whether the binding is global or weak.
    #[inline]
    pub fn is_external(&self) -> bool {
        matches!(self.bind(), STB_GLOBAL | STB_WEAK)
    }

    /// Whether `addr` lies in `[value, value + size)`.
    #[inline]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.value && addr < self.end()
    }

    #[inline]
    pub(crate) fn end(&self) -> u64 {
        self.value.saturating_add(self.size)
    }
}

/// One decoded symbol table with its lookup structures.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    kind: SymbolTableKind,
    section: Option<usize>,
    symbols: Vec<Symbol>,
    names: NameIndex,
    addrs: AddrIndex,
}

/// Decodes `count` entries of `stride` bytes at `offset` and names them from
/// `strtab`. Entries that do not fit in the image end the table.
pub(crate) fn decode_entries(
    image: &ByteImage,
    layout: Layout,
    kind: SymbolTableKind,
    offset: u64,
    count: u64,
    stride: u64,
    strtab: Option<&[u8]>,
) -> Result<Vec<Symbol>> {
    let record = layout.class.sym_size() as u64;
    let fitting = (image.len() as u64).saturating_sub(offset) / stride.max(1);
    let mut symbols = Vec::with_capacity(count.min(fitting) as usize);
    for index in 0..count {
        let at = index
            .checked_mul(stride)
            .and_then(|rel| offset.checked_add(rel))
            .filter(|&at| image.contains(at, record));
        let Some(at) = at else {
            #[cfg(feature = "log")]
            log::warn!(
                "[{}] {} truncated to {} of {} entries",
                image.name(),
                kind.as_str(),
                index,
                count
            );
            break;
        };
        let (mut sym, st_name) =
            Symbol::decode(&mut image.cursor_at(at, layout)?, index as usize, kind)?;
        if let Some(strtab) = strtab {
            sym.name = strtab
                .get(st_name as usize..)
                .and_then(cstr_from)
                .map(ToString::to_string)
                .unwrap_or_default();
        }
        symbols.push(sym);
    }
    Ok(symbols)
}

impl SymbolTable {
    pub(crate) fn new(kind: SymbolTableKind, section: Option<usize>, symbols: Vec<Symbol>) -> Self {
        let names = NameIndex::build(&symbols);
        let addrs = AddrIndex::build(&symbols);
        Self {
            kind,
            section,
            symbols,
            names,
            addrs,
        }
    }

    /// Decodes the symbol table described by `section`.
    pub(crate) fn parse(
        image: &ByteImage,
        layout: Layout,
        sections: &SectionTable,
        section: &Section,
        kind: SymbolTableKind,
        policy: ParsePolicy,
    ) -> Result<Self> {
        let native = layout.class.sym_size() as u64;
        let stride = if section.entsize() == native {
            native
        } else {
            policy.anomaly(parse_symbol_error(format!(
                "{} entry size {} does not match {}",
                kind.as_str(),
                section.entsize(),
                native
            )))?;
            native
        };
        if !image.contains(section.offset(), section.size()) {
            policy.anomaly(parse_symbol_error(format!(
                "{} contents lie outside the file",
                kind.as_str()
            )))?;
        }

        let strtab = sections
            .by_index(section.link() as usize)
            .and_then(|strtab| strtab.data(image));
        if strtab.is_none() {
            policy.anomaly(parse_symbol_error(format!(
                "{} string table (section {}) is not readable",
                kind.as_str(),
                section.link()
            )))?;
        }

        let count = section.size() / stride;
        let mut symbols = decode_entries(
            image,
            layout,
            kind,
            section.offset(),
            count,
            stride,
            strtab,
        )?;

        for sym in symbols.iter_mut() {
            if let SectionIndex::Section(idx) = sym.section_index {
                if idx >= sections.len() {
                    policy.anomaly(parse_symbol_error(format!(
                        "{} symbol {} refers to missing section {}",
                        kind.as_str(),
                        sym.index,
                        idx
                    )))?;
                    sym.section_index = SectionIndex::Dangling(idx as u16);
                }
            }
        }

        #[cfg(feature = "log")]
        log::debug!(
            "[{}] {}: {} symbols",
            image.name(),
            kind.as_str(),
            symbols.len()
        );
        Ok(Self::new(kind, Some(section.index()), symbols))
    }

    /// Which table this is.
    #[inline]
    pub fn kind(&self) -> SymbolTableKind {
        self.kind
    }

    /// Index of the section the table was decoded from; `None` when it was
    /// reconstructed from dynamic-linking metadata.
    #[inline]
    pub fn section_index(&self) -> Option<usize> {
        self.section
    }

    /// Number of symbols, including the null symbol.
    #[inline]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Every symbol in index order.
    #[inline]
    pub fn all(&self) -> &[Symbol] {
        &self.symbols
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, Symbol> {
        self.symbols.iter()
    }

    /// The symbol at `index`.
    #[inline]
    pub fn by_index(&self, index: usize) -> Option<&Symbol> {
        self.symbols.get(index)
    }

    /// The symbol named `name` with the lowest index.
    pub fn by_name(&self, name: &str) -> Option<&Symbol> {
        self.names
            .find(&self.symbols, name)
            .map(|idx| &self.symbols[idx])
    }

    /// The defined symbol whose `[value, value + size)` contains `addr`.
    ///
    /// When several symbols contain the address, the smallest one wins, then
    /// the one with the lowest index. Zero-sized symbols never match.
    pub fn by_range(&self, addr: u64) -> Option<&Symbol> {
        self.addrs
            .containing(&self.symbols, addr)
            .map(|idx| &self.symbols[idx])
    }

    /// The defined symbol with the largest value not above `addr`, regardless
    /// of its size.
    ///
    /// Section and file symbols are skipped. Equal values resolve to the
    /// lowest index.
    pub fn by_value(&self, addr: u64) -> Option<&Symbol> {
        self.addrs
            .nearest_preceding(&self.symbols, addr)
            .map(|idx| &self.symbols[idx])
    }

    /// Number of distinct non-empty names.
    #[inline]
    pub fn distinct_names(&self) -> usize {
        self.names.len()
    }
}

impl<'a> IntoIterator for &'a SymbolTable {
    type Item = &'a Symbol;
    type IntoIter = core::slice::Iter<'a, Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.iter()
    }
}
