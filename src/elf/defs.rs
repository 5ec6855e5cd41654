//! ELF format definitions shared by every decoder.
//!
//! The on-disk records of an ELF file exist in a 32-bit and a 64-bit flavour,
//! each of which may be stored little or big endian. [`Layout`] captures both
//! choices for one object, and every decoder in the crate reads through it, so
//! no class-specific record escapes the decode step.

use elf::abi::{ELFCLASS32, ELFCLASS64, ELFDATA2LSB, ELFDATA2MSB};

/// ELF file class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElfClass {
    /// `ELFCLASS32`
    Elf32,
    /// `ELFCLASS64`
    Elf64,
}

impl ElfClass {
    /// Decodes the `EI_CLASS` identification byte.
    pub fn from_ident(byte: u8) -> Option<Self> {
        match byte {
            ELFCLASS32 => Some(ElfClass::Elf32),
            ELFCLASS64 => Some(ElfClass::Elf64),
            _ => None,
        }
    }

    /// The `EI_CLASS` value for this class.
    #[inline]
    pub fn ident(self) -> u8 {
        match self {
            ElfClass::Elf32 => ELFCLASS32,
            ElfClass::Elf64 => ELFCLASS64,
        }
    }

    /// Short lowercase name, e.g. `elfclass64`.
    pub fn as_str(self) -> &'static str {
        match self {
            ElfClass::Elf32 => "elfclass32",
            ElfClass::Elf64 => "elfclass64",
        }
    }

    /// Size of an address-sized word.
    #[inline]
    pub fn word_size(self) -> usize {
        match self {
            ElfClass::Elf32 => 4,
            ElfClass::Elf64 => 8,
        }
    }

    /// Size of the ELF header.
    #[inline]
    pub fn ehdr_size(self) -> usize {
        match self {
            ElfClass::Elf32 => EHDR_SIZE_32,
            ElfClass::Elf64 => EHDR_SIZE_64,
        }
    }

    /// Size of one program header.
    #[inline]
    pub fn phdr_size(self) -> usize {
        match self {
            ElfClass::Elf32 => 32,
            ElfClass::Elf64 => 56,
        }
    }

    /// Size of one section header.
    #[inline]
    pub fn shdr_size(self) -> usize {
        match self {
            ElfClass::Elf32 => 40,
            ElfClass::Elf64 => 64,
        }
    }

    /// Size of one symbol table entry.
    #[inline]
    pub fn sym_size(self) -> usize {
        match self {
            ElfClass::Elf32 => 16,
            ElfClass::Elf64 => 24,
        }
    }

    /// Size of one `Rel` entry.
    #[inline]
    pub fn rel_size(self) -> usize {
        match self {
            ElfClass::Elf32 => 8,
            ElfClass::Elf64 => 16,
        }
    }

    /// Size of one `Rela` entry.
    #[inline]
    pub fn rela_size(self) -> usize {
        match self {
            ElfClass::Elf32 => 12,
            ElfClass::Elf64 => 24,
        }
    }

    /// Size of one dynamic entry.
    #[inline]
    pub fn dyn_size(self) -> usize {
        match self {
            ElfClass::Elf32 => 8,
            ElfClass::Elf64 => 16,
        }
    }

    /// Splits `r_info` into `(symbol index, relocation type)`.
    #[inline]
    pub fn split_r_info(self, info: u64) -> (u32, u32) {
        match self {
            ElfClass::Elf32 => ((info >> 8) as u32, (info & 0xff) as u32),
            ElfClass::Elf64 => ((info >> 32) as u32, (info & 0xffff_ffff) as u32),
        }
    }
}

/// Byte order of an ELF file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endian {
    /// `ELFDATA2LSB`
    Little,
    /// `ELFDATA2MSB`
    Big,
}

impl Endian {
    /// Decodes the `EI_DATA` identification byte.
    pub fn from_ident(byte: u8) -> Option<Self> {
        match byte {
            ELFDATA2LSB => Some(Endian::Little),
            ELFDATA2MSB => Some(Endian::Big),
            _ => None,
        }
    }
}

/// The record layout of one object: its class and byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Layout {
    /// File class.
    pub class: ElfClass,
    /// Byte order.
    pub endian: Endian,
}

impl Layout {
    /// Creates a layout.
    #[inline]
    pub const fn new(class: ElfClass, endian: Endian) -> Self {
        Self { class, endian }
    }
}

/// Size of the `e_ident` array.
pub(crate) const IDENT_SIZE: usize = 16;
/// Size of the 32-bit ELF header.
pub(crate) const EHDR_SIZE_32: usize = 52;
/// Size of the 64-bit ELF header.
pub(crate) const EHDR_SIZE_64: usize = 64;

/// `DT_FLAGS_1` bit marking a position-independent executable.
pub(crate) const DF_1_PIE: u64 = 0x0800_0000;

/// Where a symbol's `st_shndx` points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SectionIndex {
    /// `SHN_UNDEF`: the symbol is not defined in this object.
    Undefined,
    /// `SHN_ABS`: the value is absolute.
    Absolute,
    /// `SHN_COMMON`: an unallocated common block.
    Common,
    /// Another value in the reserved range, kept raw.
    Reserved(u16),
    /// A regular-looking index that names no section of this object.
    Dangling(u16),
    /// A regular section index.
    Section(usize),
}

impl SectionIndex {
    /// Classifies a raw `st_shndx` value.
    pub fn from_raw(shndx: u16) -> Self {
        use elf::abi::{SHN_ABS, SHN_COMMON, SHN_LORESERVE, SHN_UNDEF};
        match shndx {
            SHN_UNDEF => SectionIndex::Undefined,
            SHN_ABS => SectionIndex::Absolute,
            SHN_COMMON => SectionIndex::Common,
            x if x >= SHN_LORESERVE => SectionIndex::Reserved(x),
            x => SectionIndex::Section(x as usize),
        }
    }

    /// The index of the section, if this is a regular index.
    #[inline]
    pub fn section(self) -> Option<usize> {
        match self {
            SectionIndex::Section(idx) => Some(idx),
            _ => None,
        }
    }

    /// Whether the symbol is undefined.
    #[inline]
    pub fn is_undefined(self) -> bool {
        self == SectionIndex::Undefined
    }
}
