//! The root handle over one parsed ELF object.

use crate::{
    Result,
    dynamic::DynamicInfo,
    elf::{Arch, ElfClass, ElfHeader, Endian, ObjectType},
    flags::{LoadFlags, ParsePolicy},
    image::{Backing, ByteImage, Cursor, cstr_from},
    os,
    plt::{PltEntry, PltTable},
    section::{Section, SectionTable},
    segment::{Segment, SegmentTable},
    symbol::{Symbol, SymbolTable, SymbolTableKind, recover_dynsym},
};
use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use delegate::delegate;
use elf::abi::{PT_DYNAMIC, SHT_DYNAMIC, SHT_DYNSYM, SHT_SYMTAB};

/// How an object is linked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkingType {
    /// Has a `PT_INTERP` segment.
    Dynamic,
    /// No interpreter and no dynamic array.
    Static,
    /// No interpreter, but a dynamic array: a self-relocating executable.
    StaticPie,
    /// Neither an executable nor a shared object.
    Undefined,
}

impl LinkingType {
    /// Short lowercase name, e.g. `static-pie`.
    pub fn as_str(self) -> &'static str {
        match self {
            LinkingType::Dynamic => "dynamic",
            LinkingType::Static => "static",
            LinkingType::StaticPie => "static-pie",
            LinkingType::Undefined => "undefined",
        }
    }
}

/// A parsed ELF object.
///
/// Every table is decoded when the object is opened, so all queries take
/// `&self`, never fail because of earlier queries and never touch the file
/// again. Lookups that find nothing return `None`.
///
/// # Examples
/// ```no_run
/// use elf_inspect::{LoadFlags, Object};
///
/// let obj = Object::open("/bin/ls", LoadFlags::FORENSICS).unwrap();
/// if let Some(entry) = obj.plt_by_name("printf") {
///     println!("printf@plt = {:#x}", entry.address());
/// }
/// obj.close();
/// ```
pub struct Object {
    image: ByteImage,
    flags: LoadFlags,
    header: ElfHeader,
    segments: SegmentTable,
    sections: SectionTable,
    symtab: Option<SymbolTable>,
    dynsym: Option<SymbolTable>,
    dynamic: Option<DynamicInfo>,
    plt: PltTable,
    interp: Option<String>,
}

impl core::fmt::Debug for Object {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Object")
            .field("name", &self.image.name())
            .field("class", &self.class())
            .field("machine", &self.machine())
            .field("object_type", &self.object_type())
            .field("flags", &self.flags)
            .finish()
    }
}

impl Object {
    /// Opens and parses the file at `path`.
    ///
    /// The flags decide both how anomalies are treated (see
    /// [`LoadFlags::policy`]) and how the bytes are held (see
    /// [`LoadFlags::backing_mode`]).
    pub fn open(path: &str, flags: LoadFlags) -> Result<Self> {
        let backing = os::load(path, flags.backing_mode())?;
        Self::parse(ByteImage::new(path.to_string(), backing), flags)
    }

    /// Parses an object held in memory. `name` is only used for diagnostics.
    pub fn from_bytes(name: &str, bytes: impl Into<Vec<u8>>, flags: LoadFlags) -> Result<Self> {
        let image = ByteImage::new(name.to_string(), Backing::Heap(bytes.into()));
        Self::parse(image, flags)
    }

    fn parse(image: ByteImage, flags: LoadFlags) -> Result<Self> {
        let policy = flags.policy();
        #[cfg(feature = "log")]
        log::info!(
            "[{}] parsing {} bytes, policy {:?}, backing {:?}",
            image.name(),
            image.len(),
            policy,
            image.backing()
        );
        let header = ElfHeader::parse(&image, policy)?;
        let layout = header.layout();
        let segments = SegmentTable::parse(&image, &header, policy)?;
        let sections = SectionTable::parse(&image, &header, policy)?;
        let dynamic = DynamicInfo::parse(&image, layout, &sections, &segments, policy)?;

        let table = |sh_type: u32, kind: SymbolTableKind| {
            sections
                .find_by_type(sh_type)
                .map(|sec| SymbolTable::parse(&image, layout, &sections, sec, kind, policy))
                .transpose()
        };
        let symtab = table(SHT_SYMTAB, SymbolTableKind::Symtab)?;
        let mut dynsym = table(SHT_DYNSYM, SymbolTableKind::Dynsym)?;
        // Only an object without usable section headers gets a rebuilt table;
        // with headers present, a missing SHT_DYNSYM means there is none.
        if dynsym.is_none() && sections.is_empty() && policy.reconstructs() {
            if let Some(dynamic) = &dynamic {
                dynsym = recover_dynsym(&image, layout, &segments, dynamic)?;
            }
        }

        let plt = PltTable::resolve(
            &image,
            layout,
            header.machine(),
            &sections,
            &segments,
            dynsym.as_ref(),
            dynamic.as_ref(),
        )?;
        let interp = Self::find_interp(&image, &sections, &segments);

        Ok(Self {
            image,
            flags,
            header,
            segments,
            sections,
            symtab,
            dynsym,
            dynamic,
            plt,
            interp,
        })
    }

    /// `.interp` contents, or the `PT_INTERP` file range when the section is
    /// missing or unreadable.
    fn find_interp(
        image: &ByteImage,
        sections: &SectionTable,
        segments: &SegmentTable,
    ) -> Option<String> {
        let bytes = sections
            .by_name(".interp")
            .and_then(|sec| sec.data(image))
            .or_else(|| {
                let seg = segments.interp()?;
                image.get(seg.offset(), seg.filesz())
            })?;
        cstr_from(bytes)
            .or_else(|| core::str::from_utf8(bytes).ok())
            .map(ToString::to_string)
    }

    /// Releases the object and its byte image.
    ///
    /// Equivalent to dropping it; taking `self` makes any later use a compile
    /// error.
    #[inline]
    pub fn close(self) {
        #[cfg(feature = "log")]
        log::debug!("[{}] closed", self.image.name());
    }

    delegate! {
        to self.image {
            /// Name of the object, usually the path it was opened from.
            pub fn name(&self) -> &str;
        }
        to self.header {
            /// Architecture classification.
            pub fn arch(&self) -> Arch;
            /// ELF class.
            pub fn class(&self) -> ElfClass;
            /// Byte order.
            pub fn endian(&self) -> Endian;
            /// Raw `e_machine`.
            pub fn machine(&self) -> u16;
            /// Raw `e_type`.
            pub fn e_type(&self) -> u16;
            /// Object type.
            pub fn object_type(&self) -> ObjectType;
            /// Entry point virtual address.
            #[call(entry)]
            pub fn entry_point(&self) -> u64;
            /// `e_ehsize`
            pub fn ehdr_size(&self) -> u16;
            /// `e_phentsize * e_phnum`
            pub fn phdr_table_size(&self) -> u64;
            /// `e_shentsize * e_shnum`
            pub fn shdr_table_size(&self) -> u64;
        }
        to self.segments {
            /// The segment at `index`.
            #[call(by_index)]
            pub fn segment_by_index(&self, index: usize) -> Option<&Segment>;
        }
        to self.sections {
            /// The section at `index`.
            #[call(by_index)]
            pub fn section_by_index(&self, index: usize) -> Option<&Section>;
            /// The section named `name`; the lowest index wins on duplicates.
            #[call(by_name)]
            pub fn section_by_name(&self, name: &str) -> Option<&Section>;
            /// Index of the section named `name`.
            #[call(index_of)]
            pub fn section_index_by_name(&self, name: &str) -> Option<usize>;
        }
        to self.plt {
            /// The PLT stub importing `name`.
            #[call(by_name)]
            pub fn plt_by_name(&self, name: &str) -> Option<&PltEntry>;
        }
    }

    /// The load flags the object was opened with.
    #[inline]
    pub fn flags(&self) -> LoadFlags {
        self.flags
    }

    /// The parse policy derived from the load flags.
    #[inline]
    pub fn policy(&self) -> ParsePolicy {
        self.flags.policy()
    }

    /// The byte image.
    #[inline]
    pub fn image(&self) -> &ByteImage {
        &self.image
    }

    /// The ELF header.
    #[inline]
    pub fn header(&self) -> &ElfHeader {
        &self.header
    }

    /// How the object is linked.
    pub fn linking_type(&self) -> LinkingType {
        if !matches!(
            self.object_type(),
            ObjectType::Executable | ObjectType::Shared
        ) {
            return LinkingType::Undefined;
        }
        if self.segments.interp().is_some() {
            LinkingType::Dynamic
        } else if self.segments.contains_type(PT_DYNAMIC)
            || self.sections.find_by_type(SHT_DYNAMIC).is_some()
        {
            LinkingType::StaticPie
        } else {
            LinkingType::Static
        }
    }

    /// Size of the file: the larger of the size covered by the header, the
    /// header tables, the segments and the sections, and the real length of
    /// the image.
    pub fn file_size(&self) -> u64 {
        let ehdr = self.class().ehdr_size() as u64;
        let phdrs = match self.header.phdr_range() {
            Some((_, end)) if self.header.phnum() != 0 => end,
            _ => 0,
        };
        let shdrs = match self.header.shdr_range() {
            Some((_, end)) if self.header.shoff() != 0 => end,
            _ => 0,
        };
        let declared = ehdr
            .max(phdrs)
            .max(shdrs)
            .max(self.segments.file_extent())
            .max(self.sections.file_extent());
        declared.max(self.image.len() as u64)
    }

    /// File size of the first writable `PT_LOAD` segment.
    pub fn data_filesz(&self) -> Option<u64> {
        self.segments.data().map(Segment::filesz)
    }

    /// File size of the first executable `PT_LOAD` segment.
    pub fn text_filesz(&self) -> Option<u64> {
        self.segments.text().map(Segment::filesz)
    }

    /// `len` raw bytes at file offset `offset`.
    #[inline]
    pub fn offset_slice(&self, offset: u64, len: u64) -> Result<&[u8]> {
        self.image.read_at(offset, len)
    }

    /// A validated cursor at file offset `offset`, decoding in the object's
    /// layout.
    #[inline]
    pub fn offset_pointer(&self, offset: u64) -> Result<Cursor<'_>> {
        self.image.cursor_at(offset, self.header.layout())
    }

    /// The program header table.
    #[inline]
    pub fn segments(&self) -> &SegmentTable {
        &self.segments
    }

    /// The file contents of `segment`, if they lie inside the image.
    #[inline]
    pub fn segment_data(&self, segment: &Segment) -> Option<&[u8]> {
        self.image.get(segment.offset(), segment.filesz())
    }

    /// The section header table.
    #[inline]
    pub fn sections(&self) -> &SectionTable {
        &self.sections
    }

    /// The file contents of `section`.
    #[inline]
    pub fn section_data(&self, section: &Section) -> Option<&[u8]> {
        section.data(&self.image)
    }

    /// `.symtab`, if present.
    #[inline]
    pub fn symtab(&self) -> Option<&SymbolTable> {
        self.symtab.as_ref()
    }

    /// `.dynsym`, if present or reconstructed.
    #[inline]
    pub fn dynsym(&self) -> Option<&SymbolTable> {
        self.dynsym.as_ref()
    }

    /// The table of kind `kind`.
    #[inline]
    pub fn symbol_table(&self, kind: SymbolTableKind) -> Option<&SymbolTable> {
        match kind {
            SymbolTableKind::Symtab => self.symtab(),
            SymbolTableKind::Dynsym => self.dynsym(),
        }
    }

    /// Number of `.symtab` entries; `None` when the table is absent.
    #[inline]
    pub fn symtab_count(&self) -> Option<usize> {
        self.symtab.as_ref().map(SymbolTable::len)
    }

    /// Number of `.dynsym` entries; `None` when the table is absent.
    #[inline]
    pub fn dynsym_count(&self) -> Option<usize> {
        self.dynsym.as_ref().map(SymbolTable::len)
    }

    fn tables(&self) -> impl Iterator<Item = &SymbolTable> {
        self.symtab.iter().chain(self.dynsym.iter())
    }

    /// The symbol named `name`, searched in `.symtab` first, then `.dynsym`.
    pub fn symbol_by_name(&self, name: &str) -> Option<&Symbol> {
        self.tables().find_map(|table| table.by_name(name))
    }

    /// The symbol at `index` of table `kind`.
    pub fn symbol_by_index(&self, index: usize, kind: SymbolTableKind) -> Option<&Symbol> {
        self.symbol_table(kind)?.by_index(index)
    }

    /// The symbol whose `[value, value + size)` contains `addr`; see
    /// [`SymbolTable::by_range`].
    pub fn symbol_by_range(&self, addr: u64) -> Option<&Symbol> {
        self.tables().find_map(|table| table.by_range(addr))
    }

    /// The symbol with the largest value not above `addr`; see
    /// [`SymbolTable::by_value`].
    pub fn symbol_by_value_lookup(&self, addr: u64) -> Option<&Symbol> {
        self.tables().find_map(|table| table.by_value(addr))
    }

    /// The resolved PLT stubs.
    #[inline]
    pub fn plt(&self) -> &PltTable {
        &self.plt
    }

    /// The dynamic array, if present.
    #[inline]
    pub fn dynamic(&self) -> Option<&DynamicInfo> {
        self.dynamic.as_ref()
    }

    /// Number of dynamic entries before `DT_NULL`; zero without a dynamic
    /// array.
    #[inline]
    pub fn dynamic_tag_count(&self) -> usize {
        self.dynamic.as_ref().map_or(0, DynamicInfo::count)
    }

    /// DT_NEEDED names.
    #[inline]
    pub fn needed_libraries(&self) -> &[String] {
        self.dynamic
            .as_ref()
            .map(DynamicInfo::needed)
            .unwrap_or_default()
    }

    /// The program interpreter, e.g. `/lib64/ld-linux-x86-64.so.2`.
    #[inline]
    pub fn interpreter_path(&self) -> Option<&str> {
        self.interp.as_deref()
    }
}
