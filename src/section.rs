//! Section headers and the section name map.

use crate::{
    Result,
    elf::ElfHeader,
    error::parse_shdr_error,
    flags::ParsePolicy,
    image::{ByteImage, Cursor, cstr_from},
};
use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};
use bitflags::bitflags;
use elf::abi::{
    SHF_ALLOC, SHF_COMPRESSED, SHF_EXECINSTR, SHF_GROUP, SHF_INFO_LINK, SHF_LINK_ORDER,
    SHF_MERGE, SHF_OS_NONCONFORMING, SHF_STRINGS, SHF_TLS, SHF_WRITE, SHN_UNDEF, SHN_XINDEX,
    SHT_NOBITS, SHT_NULL,
};
use hashbrown::HashMap;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    /// Section attribute bits (`sh_flags`).
    pub struct SectionFlags: u64 {
        const WRITE = SHF_WRITE as u64;
        const ALLOC = SHF_ALLOC as u64;
        const EXECINSTR = SHF_EXECINSTR as u64;
        const MERGE = SHF_MERGE as u64;
        const STRINGS = SHF_STRINGS as u64;
        const INFO_LINK = SHF_INFO_LINK as u64;
        const LINK_ORDER = SHF_LINK_ORDER as u64;
        const OS_NONCONFORMING = SHF_OS_NONCONFORMING as u64;
        const GROUP = SHF_GROUP as u64;
        const TLS = SHF_TLS as u64;
        const COMPRESSED = SHF_COMPRESSED as u64;
    }
}

/// One decoded section header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    index: usize,
    name: String,
    name_offset: u32,
    sh_type: u32,
    flags: SectionFlags,
    addr: u64,
    offset: u64,
    size: u64,
    link: u32,
    info: u32,
    addralign: u64,
    entsize: u64,
}

impl Section {
    fn decode(cur: &mut Cursor<'_>, index: usize) -> Result<Self> {
        // Both classes share the field order; only the word size differs.
        Ok(Self {
            index,
            name: String::new(),
            name_offset: cur.read_u32()?,
            sh_type: cur.read_u32()?,
            flags: SectionFlags::from_bits_retain(cur.read_word()?),
            addr: cur.read_word()?,
            offset: cur.read_word()?,
            size: cur.read_word()?,
            link: cur.read_u32()?,
            info: cur.read_u32()?,
            addralign: cur.read_word()?,
            entsize: cur.read_word()?,
        })
    }

    /// Position in the section header table.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Name resolved through the section header string table; empty when it
    /// cannot be resolved.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Offset of the name in the section header string table.
    #[inline]
    pub fn name_offset(&self) -> u32 {
        self.name_offset
    }

    /// `sh_type`
    #[inline]
    pub fn sh_type(&self) -> u32 {
        self.sh_type
    }

    /// `sh_flags`
    #[inline]
    pub fn flags(&self) -> SectionFlags {
        self.flags
    }

    /// Virtual address.
    #[inline]
    pub fn addr(&self) -> u64 {
        self.addr
    }

    /// File offset of the contents.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Size in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// `sh_link`
    #[inline]
    pub fn link(&self) -> u32 {
        self.link
    }

    /// `sh_info`
    #[inline]
    pub fn info(&self) -> u32 {
        self.info
    }

    /// `sh_addralign`
    #[inline]
    pub fn addralign(&self) -> u64 {
        self.addralign
    }

    /// `sh_entsize`
    #[inline]
    pub fn entsize(&self) -> u64 {
        self.entsize
    }

    /// Whether the section occupies bytes in the file.
    #[inline]
    pub fn has_file_data(&self) -> bool {
        self.sh_type != SHT_NOBITS && self.sh_type != SHT_NULL
    }

    /// The file contents, or `None` for `SHT_NOBITS` and out-of-bounds
    /// sections.
    pub fn data<'image>(&self, image: &'image ByteImage) -> Option<&'image [u8]> {
        if !self.has_file_data() {
            return None;
        }
        image.get(self.offset, self.size)
    }

    pub(crate) fn file_end(&self) -> u64 {
        if self.has_file_data() {
            self.offset.saturating_add(self.size)
        } else {
            0
        }
    }
}

/// The section header table.
///
/// Section names are indexed in a hash map. The format allows duplicate names;
/// a name always resolves to the section with the lowest index.
#[derive(Clone, Debug, Default)]
pub struct SectionTable {
    sections: Vec<Section>,
    names: HashMap<String, usize>,
    shstrndx: Option<usize>,
    table_end: u64,
}

impl SectionTable {
    pub(crate) fn parse(
        image: &ByteImage,
        header: &ElfHeader,
        policy: ParsePolicy,
    ) -> Result<Self> {
        if header.shoff() == 0 {
            return Ok(Self::default());
        }
        let layout = header.layout();
        let record = header.class().shdr_size() as u64;
        let stride = header.shdr_stride() as u64;
        let at = |index: usize| {
            (index as u64)
                .checked_mul(stride)
                .and_then(|rel| header.shoff().checked_add(rel))
                .filter(|&at| image.contains(at, record))
        };

        let Some(first) = at(0) else {
            // The header already decided whether an unreadable table is fatal.
            return Ok(Self::default());
        };
        let null = Section::decode(&mut image.cursor_at(first, layout)?, 0)?;

        let count = if header.shnum() == 0 {
            #[cfg(feature = "log")]
            log::debug!(
                "[{}] extended section numbering: {} sections",
                image.name(),
                null.size
            );
            let count = usize::try_from(null.size).unwrap_or(usize::MAX);
            let end = stride
                .checked_mul(null.size)
                .and_then(|size| header.shoff().checked_add(size));
            if !end.is_some_and(|end| end <= image.len() as u64) {
                policy.truncation(parse_shdr_error(format!(
                    "extended section count {} exceeds file size",
                    null.size
                )))?;
            }
            count
        } else {
            header.shnum() as usize
        };

        let fitting = (image.len() as u64).saturating_sub(header.shoff()) / stride;
        let mut sections = Vec::with_capacity(count.min(fitting as usize));
        sections.push(null);
        for index in 1..count {
            let Some(at) = at(index) else {
                #[cfg(feature = "log")]
                log::warn!(
                    "[{}] section header table truncated to {} of {} entries",
                    image.name(),
                    index,
                    count
                );
                break;
            };
            sections.push(Section::decode(&mut image.cursor_at(at, layout)?, index)?);
        }
        let table_end = header
            .shoff()
            .saturating_add(stride.saturating_mul(sections.len() as u64));

        let shstrndx = match header.shstrndx() {
            SHN_UNDEF => None,
            SHN_XINDEX => Some(sections[0].link as usize),
            raw => Some(raw as usize),
        };
        let shstrndx = match shstrndx {
            Some(idx) if idx >= sections.len() => {
                policy.anomaly(parse_shdr_error(format!(
                    "e_shstrndx {} is out of range ({} sections)",
                    idx,
                    sections.len()
                )))?;
                None
            }
            other => other,
        };

        let strtab = shstrndx.and_then(|idx| sections[idx].data(image));
        if shstrndx.is_some() && strtab.is_none() {
            policy.anomaly(parse_shdr_error(
                "section header string table is not readable",
            ))?;
        }
        if let Some(strtab) = strtab {
            for section in sections.iter_mut() {
                section.name = strtab
                    .get(section.name_offset as usize..)
                    .and_then(cstr_from)
                    .map(ToString::to_string)
                    .unwrap_or_default();
            }
        }

        Self::check_contents(image, &sections, policy)?;

        let mut names = HashMap::with_capacity(sections.len());
        for section in sections.iter().skip(1) {
            names
                .entry(section.name.clone())
                .or_insert(section.index);
        }

        #[cfg(feature = "log")]
        log::debug!(
            "[{}] {} sections, shstrndx {:?}",
            image.name(),
            sections.len(),
            shstrndx
        );
        Ok(Self {
            sections,
            names,
            shstrndx,
            table_end,
        })
    }

    /// Reports sections whose contents lie outside the image or overlap
    /// another section.
    fn check_contents(image: &ByteImage, sections: &[Section], policy: ParsePolicy) -> Result<()> {
        let mut ranges = Vec::new();
        for section in sections {
            if !section.has_file_data() || section.size == 0 {
                continue;
            }
            if !image.contains(section.offset, section.size) {
                policy.anomaly(parse_shdr_error(format!(
                    "section {} ({}) contents [0x{:x}; 0x{:x}) lie outside the file",
                    section.index, section.name, section.offset, section.size
                )))?;
                continue;
            }
            ranges.push((section.offset, section.offset + section.size, section.index));
        }
        ranges.sort_unstable();
        let mut prev: Option<(u64, usize)> = None;
        for (start, end, index) in ranges {
            if let Some((prev_end, prev_index)) = prev {
                if start < prev_end {
                    policy.anomaly(parse_shdr_error(format!(
                        "sections {} and {} overlap",
                        prev_index, index
                    )))?;
                }
                if end <= prev_end {
                    continue;
                }
            }
            prev = Some((end, index));
        }
        Ok(())
    }

    /// Number of decoded sections, including the null section.
    #[inline]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether the object has no section headers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// The section at `index`, or `None` when out of range.
    #[inline]
    pub fn by_index(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    /// The section named `name` with the lowest index.
    #[inline]
    pub fn by_name(&self, name: &str) -> Option<&Section> {
        self.index_of(name).map(|idx| &self.sections[idx])
    }

    /// Index of the section named `name` with the lowest index.
    #[inline]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Every section in index order, starting with the null section.
    #[inline]
    pub fn all(&self) -> &[Section] {
        &self.sections
    }

    /// Iterates over the sections in index order.
    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, Section> {
        self.sections.iter()
    }

    /// The first section of type `sh_type`.
    pub fn find_by_type(&self, sh_type: u32) -> Option<&Section> {
        self.sections.iter().find(|sec| sec.sh_type == sh_type)
    }

    /// Every section of type `sh_type`.
    pub fn by_type(&self, sh_type: u32) -> impl Iterator<Item = &Section> {
        self.sections
            .iter()
            .filter(move |sec| sec.sh_type == sh_type)
    }

    /// Index of the section header string table, if usable.
    #[inline]
    pub fn shstrndx(&self) -> Option<usize> {
        self.shstrndx
    }

    /// The file contents of `section`.
    #[inline]
    pub fn data<'image>(&self, section: &Section, image: &'image ByteImage) -> Option<&'image [u8]> {
        section.data(image)
    }

    pub(crate) fn file_extent(&self) -> u64 {
        let contents = self
            .sections
            .iter()
            .map(Section::file_end)
            .max()
            .unwrap_or(0);
        if self.sections.is_empty() {
            contents
        } else {
            contents.max(self.table_end)
        }
    }
}

impl<'a> IntoIterator for &'a SectionTable {
    type Item = &'a Section;
    type IntoIter = core::slice::Iter<'a, Section>;

    fn into_iter(self) -> Self::IntoIter {
        self.sections.iter()
    }
}
