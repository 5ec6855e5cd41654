//! Procedure linkage table resolution.
//!
//! A PLT stub is not described by any record of its own. Its address follows
//! from the position of its jump-slot relocation in `.rela.plt`/`.rel.plt`
//! and the stub layout of the machine; its name is the name of the dynamic
//! symbol that relocation refers to.

use crate::{
    Result,
    arch::{PltLayout, plt_layout, rel_type_to_str},
    dynamic::DynamicInfo,
    elf::Layout,
    image::ByteImage,
    relocation::{Relocation, decode_table},
    section::SectionTable,
    segment::SegmentTable,
    symbol::SymbolTable,
};
use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use elf::abi::{DT_JMPREL, DT_PLTREL, DT_PLTRELSZ, DT_RELA, SHT_REL, SHT_RELA};
use hashbrown::HashMap;

/// What a PLT relocation binds its stub to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PltSlotKind {
    /// A jump slot resolved to an imported symbol.
    JumpSlot,
    /// An indirect function resolved by calling a local resolver.
    Irelative,
    /// Any other relocation type found in the PLT relocation table.
    Other,
}

impl PltSlotKind {
    fn classify(layout: &PltLayout, r_type: u32) -> Self {
        if r_type == layout.jump_slot {
            PltSlotKind::JumpSlot
        } else if r_type == layout.irelative {
            PltSlotKind::Irelative
        } else {
            PltSlotKind::Other
        }
    }
}

/// One resolved PLT stub.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PltEntry {
    symbol_name: String,
    address: u64,
    relocation_index: usize,
    got_offset: u64,
    r_type: u32,
    kind: PltSlotKind,
}

impl PltEntry {
    /// Name of the imported symbol; empty for relocations without a symbol.
    #[inline]
    pub fn symbol_name(&self) -> &str {
        &self.symbol_name
    }

    /// Virtual address of the stub.
    #[inline]
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Position of the relocation in the PLT relocation table.
    #[inline]
    pub fn relocation_index(&self) -> usize {
        self.relocation_index
    }

    /// Address of the GOT slot the stub jumps through (`r_offset`).
    #[inline]
    pub fn got_offset(&self) -> u64 {
        self.got_offset
    }

    /// Relocation type.
    #[inline]
    pub fn r_type(&self) -> u32 {
        self.r_type
    }

    /// Whether the stub is a jump slot or an indirect function.
    #[inline]
    pub fn kind(&self) -> PltSlotKind {
        self.kind
    }
}

/// Every resolvable PLT stub of an object.
#[derive(Clone, Debug, Default)]
pub struct PltTable {
    layout: Option<PltLayout>,
    entries: Vec<PltEntry>,
    names: HashMap<String, usize>,
}

/// The PLT relocations, found by section name, by `DT_JMPREL` address, or
/// through the dynamic array alone.
fn plt_relocations(
    image: &ByteImage,
    layout: Layout,
    sections: &SectionTable,
    segments: &SegmentTable,
    dynamic: Option<&DynamicInfo>,
) -> Result<Vec<Relocation>> {
    let jmprel = dynamic.and_then(|dynamic| dynamic.find(DT_JMPREL));
    let section = sections.iter().find(|sec| {
        matches!(sec.sh_type(), SHT_RELA | SHT_REL)
            && (matches!(sec.name(), ".rela.plt" | ".rel.plt")
                || jmprel.is_some_and(|addr| addr != 0 && sec.addr() == addr))
    });
    if let Some(sec) = section {
        return decode_table(
            image,
            layout,
            sec.offset(),
            sec.size(),
            sec.entsize(),
            sec.sh_type() == SHT_RELA,
        );
    }

    let Some(dynamic) = dynamic else {
        return Ok(Vec::new());
    };
    let located = jmprel
        .and_then(|addr| segments.vaddr_to_offset(addr))
        .zip(dynamic.find(DT_PLTRELSZ));
    match located {
        Some((offset, size)) => {
            let rela = dynamic.find(DT_PLTREL) == Some(DT_RELA as u64);
            #[cfg(feature = "log")]
            log::debug!(
                "[{}] PLT relocations located through DT_JMPREL at 0x{:x}",
                image.name(),
                offset
            );
            decode_table(image, layout, offset, size, 0, rela)
        }
        None => Ok(Vec::new()),
    }
}

impl PltTable {
    pub(crate) fn resolve(
        image: &ByteImage,
        layout: Layout,
        machine: u16,
        sections: &SectionTable,
        segments: &SegmentTable,
        dynsym: Option<&SymbolTable>,
        dynamic: Option<&DynamicInfo>,
    ) -> Result<Self> {
        let Some(plt) = plt_layout(machine) else {
            #[cfg(feature = "log")]
            log::debug!("[{}] no PLT layout for machine {}", image.name(), machine);
            return Ok(Self::default());
        };
        let (base, separate) = match sections.by_name(".plt.sec") {
            Some(sec) => (sec.addr(), true),
            None => match sections.by_name(".plt") {
                Some(sec) => (sec.addr(), false),
                None => return Ok(Self::default()),
            },
        };

        let relocs = plt_relocations(image, layout, sections, segments, dynamic)?;
        let mut entries = Vec::with_capacity(relocs.len());
        let mut names = HashMap::with_capacity(relocs.len());
        for (slot, reloc) in relocs.iter().enumerate() {
            let symbol_name = match reloc.sym() {
                0 => String::new(),
                sym => dynsym
                    .and_then(|table| table.by_index(sym as usize))
                    .map(|sym| sym.name().to_string())
                    .unwrap_or_default(),
            };
            let address = plt.stub_address(base, slot as u64, separate);
            let kind = PltSlotKind::classify(plt, reloc.r_type());
            if kind == PltSlotKind::Other {
                #[cfg(feature = "log")]
                log::warn!(
                    "[{}] unexpected {} in PLT relocation {}",
                    image.name(),
                    rel_type_to_str(machine, reloc.r_type()),
                    reloc.index()
                );
            }
            #[cfg(feature = "log")]
            log::trace!(
                "[{}] plt stub 0x{:x} {} ({})",
                image.name(),
                address,
                symbol_name,
                rel_type_to_str(machine, reloc.r_type())
            );
            if !symbol_name.is_empty() {
                names.entry(symbol_name.clone()).or_insert(entries.len());
            }
            entries.push(PltEntry {
                symbol_name,
                address,
                relocation_index: reloc.index(),
                got_offset: reloc.offset(),
                r_type: reloc.r_type(),
                kind,
            });
        }
        Ok(Self {
            layout: Some(*plt),
            entries,
            names,
        })
    }

    /// The stub layout used, or `None` for machines without a known layout.
    #[inline]
    pub fn layout(&self) -> Option<&PltLayout> {
        self.layout.as_ref()
    }

    /// Human readable name of the relocation type of `entry`.
    pub fn type_name(&self, entry: &PltEntry) -> &'static str {
        self.layout
            .map_or("UNKNOWN", |plt| rel_type_to_str(plt.machine, entry.r_type))
    }

    /// The stub of the first relocation naming `name`.
    pub fn by_name(&self, name: &str) -> Option<&PltEntry> {
        self.names.get(name).map(|&idx| &self.entries[idx])
    }

    /// Every stub, in relocation order.
    #[inline]
    pub fn entries(&self) -> &[PltEntry] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, PltEntry> {
        self.entries.iter()
    }
}
