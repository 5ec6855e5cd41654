//! ELF header parsing and validation
//!
//! This module decodes the identification bytes and the class-specific part of
//! the ELF header into a single [`ElfHeader`], and validates the header tables
//! it declares against the size of the image.

use crate::{
    Result,
    elf::{ElfClass, Endian, IDENT_SIZE, Layout},
    error::parse_ehdr_error,
    flags::ParsePolicy,
    image::ByteImage,
};
use alloc::format;
use elf::abi::{
    EI_ABIVERSION, EI_CLASS, EI_DATA, EI_OSABI, EI_VERSION, ELFMAGIC, EM_386, EM_X86_64, ET_CORE,
    ET_DYN, ET_EXEC, ET_NONE, ET_REL, EV_CURRENT,
};

/// Architecture classification of an object.
///
/// Only the machines this crate fully understands get their own variant; the
/// raw `e_machine` value of every object stays available through
/// [`ElfHeader::machine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arch {
    /// Any machine other than the ones below.
    Unsupported,
    /// `EM_386`
    I386,
    /// `EM_X86_64`
    X64,
}

impl Arch {
    /// Classifies a raw `e_machine` value.
    pub fn from_machine(machine: u16) -> Self {
        match machine {
            EM_386 => Arch::I386,
            EM_X86_64 => Arch::X64,
            _ => Arch::Unsupported,
        }
    }

    /// Short lowercase name, e.g. `x64`.
    pub fn as_str(self) -> &'static str {
        match self {
            Arch::Unsupported => "unsupported",
            Arch::I386 => "i386",
            Arch::X64 => "x64",
        }
    }
}

/// Object file type, decoded from `e_type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// `ET_NONE`
    None,
    /// `ET_REL`
    Relocatable,
    /// `ET_EXEC`
    Executable,
    /// `ET_DYN`
    Shared,
    /// `ET_CORE`
    Core,
    /// An OS- or processor-specific value, kept raw.
    Other(u16),
}

impl ObjectType {
    /// Classifies a raw `e_type` value.
    pub fn from_raw(e_type: u16) -> Self {
        match e_type {
            ET_NONE => ObjectType::None,
            ET_REL => ObjectType::Relocatable,
            ET_EXEC => ObjectType::Executable,
            ET_DYN => ObjectType::Shared,
            ET_CORE => ObjectType::Core,
            other => ObjectType::Other(other),
        }
    }

    /// Name of the corresponding `ET_*` constant.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::None => "ET_NONE",
            ObjectType::Relocatable => "ET_REL",
            ObjectType::Executable => "ET_EXEC",
            ObjectType::Shared => "ET_DYN",
            ObjectType::Core => "ET_CORE",
            ObjectType::Other(_) => "ET_OTHER",
        }
    }
}

/// The decoded ELF header of an object.
///
/// Fields are widened to their 64-bit form at decode time, so the header of an
/// ELF32 object looks exactly like the header of an ELF64 one apart from
/// [`class`](Self::class).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElfHeader {
    ident: [u8; IDENT_SIZE],
    layout: Layout,
    e_type: u16,
    e_machine: u16,
    e_version: u32,
    e_entry: u64,
    e_phoff: u64,
    e_shoff: u64,
    e_flags: u32,
    e_ehsize: u16,
    e_phentsize: u16,
    e_phnum: u16,
    e_shentsize: u16,
    e_shnum: u16,
    e_shstrndx: u16,
}

impl ElfHeader {
    /// Parses the ELF header at the start of `image`
    ///
    /// Identification problems (magic, class, data encoding, a truncated
    /// header) are always fatal. Version and entry-size anomalies are fatal only
    /// under [`ParsePolicy::Strict`]. Header tables extending past the image are
    /// fatal unless the policy tolerates truncation.
    ///
    /// # Arguments
    /// * `image` - The byte image of the object
    /// * `policy` - How anomalies are treated
    ///
    /// # Returns
    /// * `Ok(ElfHeader)` - The decoded header
    /// * `Err(Error)` - A [`ParseEhdr`](crate::Error::ParseEhdr) error describing the defect
    pub(crate) fn parse(image: &ByteImage, policy: ParsePolicy) -> Result<Self> {
        let bytes = image.as_bytes();
        if bytes.len() < ELFMAGIC.len() || bytes[..ELFMAGIC.len()] != ELFMAGIC {
            return Err(parse_ehdr_error("invalid ELF magic"));
        }
        if bytes.len() < IDENT_SIZE {
            return Err(parse_ehdr_error("truncated ELF identification"));
        }
        let mut ident = [0u8; IDENT_SIZE];
        ident.copy_from_slice(&bytes[..IDENT_SIZE]);

        let class = ElfClass::from_ident(ident[EI_CLASS]).ok_or_else(|| {
            parse_ehdr_error(format!("invalid ELF class {}", ident[EI_CLASS]))
        })?;
        let endian = Endian::from_ident(ident[EI_DATA]).ok_or_else(|| {
            parse_ehdr_error(format!("invalid ELF data encoding {}", ident[EI_DATA]))
        })?;
        if bytes.len() < class.ehdr_size() {
            return Err(parse_ehdr_error(format!(
                "truncated ELF header: {} bytes, {} required",
                bytes.len(),
                class.ehdr_size()
            )));
        }
        let layout = Layout::new(class, endian);

        // The identification has been checked above, so every read below is in bounds.
        let mut cur = image.cursor_at(IDENT_SIZE as u64, layout)?;
        let e_type = cur.read_u16()?;
        let e_machine = cur.read_u16()?;
        let e_version = cur.read_u32()?;
        let e_entry = cur.read_word()?;
        let e_phoff = cur.read_word()?;
        let e_shoff = cur.read_word()?;
        let e_flags = cur.read_u32()?;
        let e_ehsize = cur.read_u16()?;
        let e_phentsize = cur.read_u16()?;
        let e_phnum = cur.read_u16()?;
        let e_shentsize = cur.read_u16()?;
        let e_shnum = cur.read_u16()?;
        let e_shstrndx = cur.read_u16()?;

        let header = Self {
            ident,
            layout,
            e_type,
            e_machine,
            e_version,
            e_entry,
            e_phoff,
            e_shoff,
            e_flags,
            e_ehsize,
            e_phentsize,
            e_phnum,
            e_shentsize,
            e_shnum,
            e_shstrndx,
        };
        header.validate(image.len() as u64, policy)?;

        #[cfg(feature = "log")]
        log::debug!(
            "[{}] {} {:?} {} machine {} entry 0x{:x}",
            image.name(),
            class.as_str(),
            endian,
            header.object_type().as_str(),
            e_machine,
            e_entry
        );
        Ok(header)
    }

    fn validate(&self, image_len: u64, policy: ParsePolicy) -> Result<()> {
        let class = self.layout.class;
        if self.ident[EI_VERSION] != EV_CURRENT {
            policy.anomaly(parse_ehdr_error(format!(
                "invalid identification version {}",
                self.ident[EI_VERSION]
            )))?;
        }
        if self.e_version != EV_CURRENT as u32 {
            policy.anomaly(parse_ehdr_error(format!(
                "invalid ELF version {}",
                self.e_version
            )))?;
        }
        if (self.e_ehsize as usize) < class.ehdr_size() {
            policy.anomaly(parse_ehdr_error(format!(
                "e_ehsize {} is smaller than {}",
                self.e_ehsize,
                class.ehdr_size()
            )))?;
        }
        if self.e_phnum != 0 && (self.e_phentsize as usize) < class.phdr_size() {
            policy.anomaly(parse_ehdr_error(format!(
                "e_phentsize {} is smaller than {}",
                self.e_phentsize,
                class.phdr_size()
            )))?;
        }
        if self.e_shnum != 0 && (self.e_shentsize as usize) < class.shdr_size() {
            policy.anomaly(parse_ehdr_error(format!(
                "e_shentsize {} is smaller than {}",
                self.e_shentsize,
                class.shdr_size()
            )))?;
        }

        let phdr_fits = self
            .phdr_range()
            .is_some_and(|(_, end)| end <= image_len);
        if self.e_phnum != 0 && !phdr_fits {
            policy.truncation(parse_ehdr_error(format!(
                "program header table at 0x{:x} ({} entries) exceeds file size 0x{:x}",
                self.e_phoff, self.e_phnum, image_len
            )))?;
        }
        let shdr_fits = self
            .shdr_range()
            .is_some_and(|(_, end)| end <= image_len);
        if self.e_shoff != 0 && self.e_shnum != 0 && !shdr_fits {
            policy.truncation(parse_ehdr_error(format!(
                "section header table at 0x{:x} ({} entries) exceeds file size 0x{:x}",
                self.e_shoff, self.e_shnum, image_len
            )))?;
        }
        Ok(())
    }

    /// The identification bytes.
    #[inline]
    pub fn ident(&self) -> &[u8; IDENT_SIZE] {
        &self.ident
    }

    /// Class and byte order of the object.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// The ELF class.
    #[inline]
    pub fn class(&self) -> ElfClass {
        self.layout.class
    }

    /// The byte order.
    #[inline]
    pub fn endian(&self) -> Endian {
        self.layout.endian
    }

    /// `EI_OSABI`
    #[inline]
    pub fn osabi(&self) -> u8 {
        self.ident[EI_OSABI]
    }

    /// `EI_ABIVERSION`
    #[inline]
    pub fn abi_version(&self) -> u8 {
        self.ident[EI_ABIVERSION]
    }

    /// Raw `e_type`.
    #[inline]
    pub fn e_type(&self) -> u16 {
        self.e_type
    }

    /// The object type.
    #[inline]
    pub fn object_type(&self) -> ObjectType {
        ObjectType::from_raw(self.e_type)
    }

    /// Raw `e_machine`.
    #[inline]
    pub fn machine(&self) -> u16 {
        self.e_machine
    }

    /// The architecture classification of `e_machine`.
    #[inline]
    pub fn arch(&self) -> Arch {
        Arch::from_machine(self.e_machine)
    }

    /// `e_version`
    #[inline]
    pub fn version(&self) -> u32 {
        self.e_version
    }

    /// Entry point virtual address.
    #[inline]
    pub fn entry(&self) -> u64 {
        self.e_entry
    }

    /// Processor-specific flags.
    #[inline]
    pub fn flags(&self) -> u32 {
        self.e_flags
    }

    /// Declared size of the ELF header (`e_ehsize`).
    #[inline]
    pub fn ehdr_size(&self) -> u16 {
        self.e_ehsize
    }

    /// File offset of the program header table.
    #[inline]
    pub fn phoff(&self) -> u64 {
        self.e_phoff
    }

    /// Declared size of one program header.
    #[inline]
    pub fn phentsize(&self) -> u16 {
        self.e_phentsize
    }

    /// Number of program headers.
    #[inline]
    pub fn phnum(&self) -> u16 {
        self.e_phnum
    }

    /// File offset of the section header table.
    #[inline]
    pub fn shoff(&self) -> u64 {
        self.e_shoff
    }

    /// Declared size of one section header.
    #[inline]
    pub fn shentsize(&self) -> u16 {
        self.e_shentsize
    }

    /// Number of section headers as declared; zero when extended numbering is
    /// in use.
    #[inline]
    pub fn shnum(&self) -> u16 {
        self.e_shnum
    }

    /// Raw `e_shstrndx`.
    #[inline]
    pub fn shstrndx(&self) -> u16 {
        self.e_shstrndx
    }

    /// `e_phentsize * e_phnum`
    #[inline]
    pub fn phdr_table_size(&self) -> u64 {
        self.e_phentsize as u64 * self.e_phnum as u64
    }

    /// `e_shentsize * e_shnum`
    #[inline]
    pub fn shdr_table_size(&self) -> u64 {
        self.e_shentsize as u64 * self.e_shnum as u64
    }

    /// Distance between two program headers.
    ///
    /// A declared entry size smaller than the class's record is replaced by the
    /// record size, since records can never overlap.
    #[inline]
    pub(crate) fn phdr_stride(&self) -> usize {
        (self.e_phentsize as usize).max(self.layout.class.phdr_size())
    }

    /// Distance between two section headers.
    #[inline]
    pub(crate) fn shdr_stride(&self) -> usize {
        (self.e_shentsize as usize).max(self.layout.class.shdr_size())
    }

    /// Calculates the byte range of the program header table
    ///
    /// # Returns
    /// The start and end offsets, or `None` if the end overflows.
    pub fn phdr_range(&self) -> Option<(u64, u64)> {
        let size = (self.phdr_stride() as u64).checked_mul(self.e_phnum as u64)?;
        Some((self.e_phoff, self.e_phoff.checked_add(size)?))
    }

    /// Calculates the byte range of the section header table, using the
    /// declared `e_shnum`
    ///
    /// # Returns
    /// The start and end offsets, or `None` if the end overflows.
    pub fn shdr_range(&self) -> Option<(u64, u64)> {
        let size = (self.shdr_stride() as u64).checked_mul(self.e_shnum as u64)?;
        Some((self.e_shoff, self.e_shoff.checked_add(size)?))
    }
}
