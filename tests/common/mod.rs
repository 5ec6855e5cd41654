//! In-memory ELF writer for the integration tests.
//!
//! [`ElfBuilder`] lays out sections one after another behind the ELF header
//! and the program header table, gives every `SHF_ALLOC` section the address
//! `base + offset`, and encodes symbols, dynamic entries and relocations in
//! the requested class and byte order. Cross references (symbol values,
//! dynamic addresses, string offsets, section links) are given by section
//! name and resolved once the layout is known.
#![allow(dead_code)]

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use elf_inspect::abi::*;
use std::collections::HashMap;

pub const BASE_EXEC: u64 = 0x400000;

pub const X86_64_INTERP: &str = "/lib64/ld-linux-x86-64.so.2";
pub const I386_INTERP: &str = "/lib/ld-linux.so.2";

/// Output encoder for one class and byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Flavor {
    pub is64: bool,
    pub big: bool,
}

pub const LE64: Flavor = Flavor {
    is64: true,
    big: false,
};
pub const LE32: Flavor = Flavor {
    is64: false,
    big: false,
};
pub const BE64: Flavor = Flavor {
    is64: true,
    big: true,
};
pub const BE32: Flavor = Flavor {
    is64: false,
    big: true,
};

impl Flavor {
    pub fn ehdr_size(self) -> u64 {
        if self.is64 { 64 } else { 52 }
    }
    pub fn phdr_size(self) -> u64 {
        if self.is64 { 56 } else { 32 }
    }
    pub fn shdr_size(self) -> u64 {
        if self.is64 { 64 } else { 40 }
    }
    pub fn sym_size(self) -> u64 {
        if self.is64 { 24 } else { 16 }
    }
    pub fn dyn_size(self) -> u64 {
        if self.is64 { 16 } else { 8 }
    }
    pub fn rel_size(self, rela: bool) -> u64 {
        match (self.is64, rela) {
            (true, true) => 24,
            (true, false) => 16,
            (false, true) => 12,
            (false, false) => 8,
        }
    }
    pub fn word(self) -> u64 {
        if self.is64 { 8 } else { 4 }
    }
}

/// Appends values to a buffer in the byte order of a [`Flavor`].
pub struct Enc {
    pub flavor: Flavor,
    pub out: Vec<u8>,
}

impl Enc {
    pub fn new(flavor: Flavor) -> Self {
        Self {
            flavor,
            out: Vec::new(),
        }
    }
    pub fn u8(&mut self, v: u8) {
        self.out.push(v);
    }
    pub fn u16(&mut self, v: u16) {
        if self.flavor.big {
            self.out.write_u16::<BigEndian>(v).unwrap();
        } else {
            self.out.write_u16::<LittleEndian>(v).unwrap();
        }
    }
    pub fn u32(&mut self, v: u32) {
        if self.flavor.big {
            self.out.write_u32::<BigEndian>(v).unwrap();
        } else {
            self.out.write_u32::<LittleEndian>(v).unwrap();
        }
    }
    pub fn u64(&mut self, v: u64) {
        if self.flavor.big {
            self.out.write_u64::<BigEndian>(v).unwrap();
        } else {
            self.out.write_u64::<LittleEndian>(v).unwrap();
        }
    }
    pub fn word(&mut self, v: u64) {
        if self.flavor.is64 {
            self.u64(v);
        } else {
            self.u32(v as u32);
        }
    }
}

/// Overwrites a value of `width` bytes at `offset`.
pub fn patch(bytes: &mut [u8], flavor: Flavor, offset: usize, width: usize, value: u64) {
    let mut enc = Enc::new(flavor);
    match width {
        1 => enc.u8(value as u8),
        2 => enc.u16(value as u16),
        4 => enc.u32(value as u32),
        8 => enc.u64(value),
        _ => panic!("bad width {width}"),
    }
    bytes[offset..offset + width].copy_from_slice(&enc.out);
}

/// ELF header field offsets for one class.
pub struct EhdrFields {
    pub e_version: usize,
    pub e_entry: usize,
    pub e_phoff: usize,
    pub e_shoff: usize,
    pub e_ehsize: usize,
    pub e_phentsize: usize,
    pub e_phnum: usize,
    pub e_shentsize: usize,
    pub e_shnum: usize,
    pub e_shstrndx: usize,
}

pub fn ehdr_fields(flavor: Flavor) -> EhdrFields {
    if flavor.is64 {
        EhdrFields {
            e_version: 20,
            e_entry: 24,
            e_phoff: 32,
            e_shoff: 40,
            e_ehsize: 52,
            e_phentsize: 54,
            e_phnum: 56,
            e_shentsize: 58,
            e_shnum: 60,
            e_shstrndx: 62,
        }
    } else {
        EhdrFields {
            e_version: 20,
            e_entry: 24,
            e_phoff: 28,
            e_shoff: 32,
            e_ehsize: 40,
            e_phentsize: 42,
            e_phnum: 44,
            e_shentsize: 46,
            e_shnum: 48,
            e_shstrndx: 50,
        }
    }
}

/// Reads the raw `e_shoff` of an image.
pub fn read_shoff(bytes: &[u8], flavor: Flavor) -> u64 {
    let f = ehdr_fields(flavor);
    let width = flavor.word() as usize;
    let raw = &bytes[f.e_shoff..f.e_shoff + width];
    raw_to_u64(raw, flavor.big)
}

pub fn raw_to_u64(raw: &[u8], big: bool) -> u64 {
    let mut value = 0u64;
    if big {
        for &b in raw {
            value = (value << 8) | b as u64;
        }
    } else {
        for &b in raw.iter().rev() {
            value = (value << 8) | b as u64;
        }
    }
    value
}

/// A value that may depend on the final layout.
#[derive(Clone, Debug)]
pub enum Val {
    Abs(u64),
    /// Address of a section plus an offset.
    At(&'static str, u64),
}

/// A section index given by name or raw value.
#[derive(Clone, Debug)]
pub enum Ndx {
    Sec(&'static str),
    Raw(u16),
}

#[derive(Clone, Debug)]
pub struct Sym {
    pub name: &'static str,
    pub value: Val,
    pub size: u64,
    pub info: u8,
    pub other: u8,
    pub shndx: Ndx,
}

impl Sym {
    pub fn new(name: &'static str, bind: u8, ty: u8, value: Val, size: u64, shndx: Ndx) -> Self {
        Self {
            name,
            value,
            size,
            info: (bind << 4) | ty,
            other: 0,
            shndx,
        }
    }

    pub fn undef(name: &'static str, ty: u8) -> Self {
        Self::new(name, STB_GLOBAL, ty, Val::Abs(0), 0, Ndx::Raw(SHN_UNDEF))
    }
}

#[derive(Clone, Debug)]
pub enum DynVal {
    Raw(u64),
    Addr(&'static str),
    Size(&'static str),
    Str(&'static str),
}

#[derive(Clone, Debug)]
pub struct Rel {
    pub offset: Val,
    pub sym: u32,
    pub r_type: u32,
    pub addend: i64,
}

#[derive(Clone, Debug)]
pub enum Content {
    Bytes(Vec<u8>),
    NoBits(u64),
    /// Filled with every string referenced by sections linking to it.
    Strtab,
    /// The null symbol is added in front.
    Symbols(Vec<Sym>),
    /// `DT_NULL` is added at the end.
    Dynamic(Vec<(i64, DynVal)>),
    Relocs { rela: bool, entries: Vec<Rel> },
}

#[derive(Clone, Debug)]
pub struct SectionDesc {
    pub name: &'static str,
    pub sh_type: u32,
    pub flags: u64,
    pub link: Option<&'static str>,
    pub info: u32,
    pub align: u64,
    pub entsize: Option<u64>,
    pub content: Content,
}

impl SectionDesc {
    pub fn new(name: &'static str, sh_type: u32, flags: u64, content: Content) -> Self {
        Self {
            name,
            sh_type,
            flags,
            link: None,
            info: 0,
            align: 1,
            entsize: None,
            content,
        }
    }
    pub fn link(mut self, name: &'static str) -> Self {
        self.link = Some(name);
        self
    }
    pub fn info(mut self, info: u32) -> Self {
        self.info = info;
        self
    }
    pub fn align(mut self, align: u64) -> Self {
        self.align = align;
        self
    }
    pub fn entsize(mut self, entsize: u64) -> Self {
        self.entsize = Some(entsize);
        self
    }
}

#[derive(Clone, Debug)]
pub struct SegmentDesc {
    pub p_type: u32,
    pub flags: u32,
    pub first: &'static str,
    pub last: &'static str,
    pub from_start: bool,
}

#[derive(Clone, Copy, Debug, Default)]
struct Placed {
    offset: u64,
    addr: u64,
    size: u64,
}

pub struct ElfBuilder {
    pub flavor: Flavor,
    pub e_type: u16,
    pub machine: u16,
    pub base: u64,
    pub entry: Option<Val>,
    pub sections: Vec<SectionDesc>,
    pub segments: Vec<SegmentDesc>,
}

fn align_up(value: u64, align: u64) -> u64 {
    let align = align.max(1);
    value.div_ceil(align) * align
}

impl ElfBuilder {
    pub fn new(flavor: Flavor, e_type: u16, machine: u16) -> Self {
        Self {
            flavor,
            e_type,
            machine,
            base: if e_type == ET_EXEC { BASE_EXEC } else { 0 },
            entry: None,
            sections: Vec::new(),
            segments: Vec::new(),
        }
    }

    pub fn section(&mut self, desc: SectionDesc) -> &mut Self {
        self.sections.push(desc);
        self
    }

    pub fn segment(&mut self, p_type: u32, flags: u32, first: &'static str, last: &'static str) -> &mut Self {
        self.segments.push(SegmentDesc {
            p_type,
            flags,
            first,
            last,
            from_start: false,
        });
        self
    }

    /// A segment starting at file offset 0, covering the headers.
    pub fn segment_from_start(&mut self, p_type: u32, flags: u32, last: &'static str) -> &mut Self {
        self.segments.push(SegmentDesc {
            p_type,
            flags,
            first: last,
            last,
            from_start: true,
        });
        self
    }

    /// 1-based index of the first section named `name`.
    fn index_of(&self, name: &str) -> u32 {
        self.sections
            .iter()
            .position(|s| s.name == name)
            .map(|i| i as u32 + 1)
            .unwrap_or_else(|| panic!("no section {name}"))
    }

    pub fn build(&self) -> Vec<u8> {
        let flavor = self.flavor;

        // Strings for every string table, keyed by section name.
        let mut strings: HashMap<&'static str, (Vec<u8>, HashMap<&'static str, u32>)> =
            HashMap::new();
        for sec in &self.sections {
            if let Content::Strtab = sec.content {
                strings.insert(sec.name, (vec![0u8], HashMap::new()));
            }
        }
        for sec in &self.sections {
            let Some(link) = sec.link else { continue };
            let names: Vec<&'static str> = match &sec.content {
                Content::Symbols(syms) => syms.iter().map(|s| s.name).collect(),
                Content::Dynamic(entries) => entries
                    .iter()
                    .filter_map(|(_, v)| match v {
                        DynVal::Str(s) => Some(*s),
                        _ => None,
                    })
                    .collect(),
                _ => continue,
            };
            let Some((bytes, map)) = strings.get_mut(link) else {
                continue;
            };
            for name in names {
                if name.is_empty() || map.contains_key(name) {
                    continue;
                }
                map.insert(name, bytes.len() as u32);
                bytes.extend_from_slice(name.as_bytes());
                bytes.push(0);
            }
        }

        // Section header string table, always last.
        let mut shstrtab = vec![0u8];
        let mut name_offsets = Vec::new();
        for sec in &self.sections {
            name_offsets.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(sec.name.as_bytes());
            shstrtab.push(0);
        }
        let shstrtab_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".shstrtab\0");

        let size_of = |sec: &SectionDesc| -> u64 {
            match &sec.content {
                Content::Bytes(b) => b.len() as u64,
                Content::NoBits(n) => *n,
                Content::Strtab => strings[sec.name].0.len() as u64,
                Content::Symbols(s) => (s.len() as u64 + 1) * flavor.sym_size(),
                Content::Dynamic(d) => (d.len() as u64 + 1) * flavor.dyn_size(),
                Content::Relocs { rela, entries } => entries.len() as u64 * flavor.rel_size(*rela),
            }
        };

        // Layout.
        let phoff = flavor.ehdr_size();
        let mut cursor = phoff + self.segments.len() as u64 * flavor.phdr_size();
        let mut placed = Vec::new();
        for sec in &self.sections {
            let offset = align_up(cursor, sec.align);
            let size = size_of(sec);
            let addr = if sec.flags & SHF_ALLOC as u64 != 0 {
                self.base + offset
            } else {
                0
            };
            if sec.sh_type != SHT_NOBITS {
                cursor = offset + size;
            }
            placed.push(Placed { offset, addr, size });
        }
        let shstrtab_off = cursor;
        cursor += shstrtab.len() as u64;
        let shoff = align_up(cursor, flavor.word());
        let shnum = self.sections.len() as u64 + 2;
        let total = shoff + shnum * flavor.shdr_size();

        let by_name = |name: &str| -> Placed { placed[self.index_of(name) as usize - 1] };
        let resolve = |v: &Val| -> u64 {
            match v {
                Val::Abs(x) => *x,
                Val::At(name, off) => by_name(name).addr + off,
            }
        };

        let mut out = vec![0u8; total as usize];

        // Section contents.
        for (sec, place) in self.sections.iter().zip(&placed) {
            let mut enc = Enc::new(flavor);
            match &sec.content {
                Content::Bytes(b) => enc.out.extend_from_slice(b),
                Content::NoBits(_) => {}
                Content::Strtab => enc.out.extend_from_slice(&strings[sec.name].0),
                Content::Symbols(syms) => {
                    let names = &strings[sec.link.expect("symbol table without link")].1;
                    let null = Sym::new("", 0, 0, Val::Abs(0), 0, Ndx::Raw(0));
                    for sym in std::iter::once(&null).chain(syms) {
                        let st_name = if sym.name.is_empty() { 0 } else { names[sym.name] };
                        let shndx = match sym.shndx {
                            Ndx::Sec(name) => self.index_of(name) as u16,
                            Ndx::Raw(raw) => raw,
                        };
                        let value = resolve(&sym.value);
                        enc.u32(st_name);
                        if flavor.is64 {
                            enc.u8(sym.info);
                            enc.u8(sym.other);
                            enc.u16(shndx);
                            enc.u64(value);
                            enc.u64(sym.size);
                        } else {
                            enc.u32(value as u32);
                            enc.u32(sym.size as u32);
                            enc.u8(sym.info);
                            enc.u8(sym.other);
                            enc.u16(shndx);
                        }
                    }
                }
                Content::Dynamic(entries) => {
                    for (tag, val) in entries {
                        let value = match val {
                            DynVal::Raw(x) => *x,
                            DynVal::Addr(name) => by_name(name).addr,
                            DynVal::Size(name) => by_name(name).size,
                            DynVal::Str(s) => {
                                strings[sec.link.expect("dynamic without link")].1[*s] as u64
                            }
                        };
                        enc.word(*tag as u64);
                        enc.word(value);
                    }
                    enc.word(DT_NULL as u64);
                    enc.word(0);
                }
                Content::Relocs { rela, entries } => {
                    for rel in entries {
                        enc.word(resolve(&rel.offset));
                        let info = if flavor.is64 {
                            ((rel.sym as u64) << 32) | rel.r_type as u64
                        } else {
                            ((rel.sym as u64) << 8) | (rel.r_type as u64 & 0xff)
                        };
                        enc.word(info);
                        if *rela {
                            enc.word(rel.addend as u64);
                        }
                    }
                }
            }
            let start = place.offset as usize;
            out[start..start + enc.out.len()].copy_from_slice(&enc.out);
        }
        out[shstrtab_off as usize..shstrtab_off as usize + shstrtab.len()].copy_from_slice(&shstrtab);

        // Section headers.
        let mut enc = Enc::new(flavor);
        let shdr = |enc: &mut Enc,
                        name: u32,
                        ty: u32,
                        flags: u64,
                        addr: u64,
                        offset: u64,
                        size: u64,
                        link: u32,
                        info: u32,
                        align: u64,
                        entsize: u64| {
            enc.u32(name);
            enc.u32(ty);
            enc.word(flags);
            enc.word(addr);
            enc.word(offset);
            enc.word(size);
            enc.u32(link);
            enc.u32(info);
            enc.word(align);
            enc.word(entsize);
        };
        shdr(&mut enc, 0, SHT_NULL, 0, 0, 0, 0, 0, 0, 0, 0);
        for ((sec, place), name) in self.sections.iter().zip(&placed).zip(&name_offsets) {
            let link = sec.link.map_or(0, |l| self.index_of(l));
            let entsize = sec.entsize.unwrap_or(match sec.content {
                Content::Symbols(_) => flavor.sym_size(),
                Content::Dynamic(_) => flavor.dyn_size(),
                Content::Relocs { rela, .. } => flavor.rel_size(rela),
                _ => 0,
            });
            shdr(
                &mut enc,
                *name,
                sec.sh_type,
                sec.flags,
                place.addr,
                place.offset,
                place.size,
                link,
                sec.info,
                sec.align,
                entsize,
            );
        }
        shdr(
            &mut enc,
            shstrtab_name,
            SHT_STRTAB,
            0,
            0,
            shstrtab_off,
            shstrtab.len() as u64,
            0,
            0,
            1,
            0,
        );
        out[shoff as usize..total as usize].copy_from_slice(&enc.out);

        // Program headers.
        let mut enc = Enc::new(flavor);
        for seg in &self.segments {
            let first = self.index_of(seg.first) as usize - 1;
            let last = self.index_of(seg.last) as usize - 1;
            let offset = if seg.from_start { 0 } else { placed[first].offset };
            let lo = if seg.from_start { 0 } else { first };
            let mut file_end = offset;
            let mut mem_end = offset;
            for i in lo..=last {
                let end = placed[i].offset + placed[i].size;
                if self.sections[i].sh_type != SHT_NOBITS {
                    file_end = file_end.max(end);
                }
                mem_end = mem_end.max(end);
            }
            let vaddr = self.base + offset;
            let align = if seg.p_type == PT_LOAD { 0x1000 } else { flavor.word() };
            enc.u32(seg.p_type);
            if flavor.is64 {
                enc.u32(seg.flags);
                enc.u64(offset);
                enc.u64(vaddr);
                enc.u64(vaddr);
                enc.u64(file_end - offset);
                enc.u64(mem_end - offset);
                enc.u64(align);
            } else {
                enc.u32(offset as u32);
                enc.u32(vaddr as u32);
                enc.u32(vaddr as u32);
                enc.u32((file_end - offset) as u32);
                enc.u32((mem_end - offset) as u32);
                enc.u32(seg.flags);
                enc.u32(align as u32);
            }
        }
        out[phoff as usize..phoff as usize + enc.out.len()].copy_from_slice(&enc.out);

        // ELF header.
        let mut enc = Enc::new(flavor);
        enc.out.extend_from_slice(&ELFMAGIC);
        enc.u8(if flavor.is64 { ELFCLASS64 } else { ELFCLASS32 });
        enc.u8(if flavor.big { ELFDATA2MSB } else { ELFDATA2LSB });
        enc.u8(EV_CURRENT);
        enc.u8(ELFOSABI_SYSV);
        enc.out.resize(16, 0);
        enc.u16(self.e_type);
        enc.u16(self.machine);
        enc.u32(EV_CURRENT as u32);
        enc.word(self.entry.as_ref().map_or(0, |v| resolve(v)));
        enc.word(if self.segments.is_empty() { 0 } else { phoff });
        enc.word(shoff);
        enc.u32(0);
        enc.u16(flavor.ehdr_size() as u16);
        enc.u16(flavor.phdr_size() as u16);
        enc.u16(self.segments.len() as u16);
        enc.u16(flavor.shdr_size() as u16);
        enc.u16(shnum as u16);
        enc.u16(shnum as u16 - 1);
        out[..enc.out.len()].copy_from_slice(&enc.out);
        out
    }
}

/// A SysV hash table with a single bucket covering `nsyms` symbols.
pub fn sysv_hash(flavor: Flavor, nsyms: u32) -> Vec<u8> {
    let mut enc = Enc::new(flavor);
    enc.u32(1);
    enc.u32(nsyms);
    enc.u32(if nsyms > 1 { nsyms - 1 } else { 0 });
    for i in 0..nsyms {
        enc.u32(if i == 0 { 0 } else { i - 1 });
    }
    enc.out
}

/// A GNU hash table with one bucket whose chain covers symbols
/// `1..nsyms`.
pub fn gnu_hash(flavor: Flavor, nsyms: u32) -> Vec<u8> {
    let mut enc = Enc::new(flavor);
    enc.u32(1); // nbucket
    enc.u32(1); // symbias
    enc.u32(1); // nbloom
    enc.u32(6); // nshift
    enc.word(u64::MAX);
    enc.u32(1);
    for i in 1..nsyms {
        enc.u32(if i == nsyms - 1 { 0x1001 } else { 0x1000 });
    }
    enc.out
}

/// How the dynamic fixtures describe the symbol count to the loader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashStyle {
    Sysv,
    Gnu,
    None,
}

pub fn symtab_entries() -> Vec<Sym> {
    vec![
        Sym::new("hello.c", STB_LOCAL, STT_FILE, Val::Abs(0), 0, Ndx::Raw(SHN_ABS)),
        Sym::new("", STB_LOCAL, STT_SECTION, Val::At(".text", 0), 0, Ndx::Sec(".text")),
        Sym::new("helper", STB_LOCAL, STT_FUNC, Val::At(".text", 16), 8, Ndx::Sec(".text")),
        Sym::new("helper_alias", STB_LOCAL, STT_FUNC, Val::At(".text", 16), 8, Ndx::Sec(".text")),
        Sym::new("_start", STB_GLOBAL, STT_FUNC, Val::At(".text", 0), 16, Ndx::Sec(".text")),
        Sym::new("main", STB_GLOBAL, STT_FUNC, Val::At(".text", 16), 32, Ndx::Sec(".text")),
        Sym::new("marker", STB_GLOBAL, STT_NOTYPE, Val::At(".text", 48), 0, Ndx::Sec(".text")),
        Sym::new("counter", STB_GLOBAL, STT_OBJECT, Val::At(".data", 0), 8, Ndx::Sec(".data")),
        Sym::new("dup", STB_GLOBAL, STT_NOTYPE, Val::Abs(0x10), 0, Ndx::Raw(SHN_ABS)),
        Sym::new("dup", STB_GLOBAL, STT_NOTYPE, Val::Abs(0x20), 0, Ndx::Raw(SHN_ABS)),
        Sym::undef("puts", STT_FUNC),
    ]
}

/// Index of the first global symbol in [`symtab_entries`], counting the null
/// symbol.
pub const SYMTAB_FIRST_GLOBAL: u32 = 5;

fn text() -> SectionDesc {
    SectionDesc::new(
        ".text",
        SHT_PROGBITS,
        (SHF_ALLOC | SHF_EXECINSTR) as u64,
        Content::Bytes(vec![0x90; 64]),
    )
    .align(16)
}

fn data() -> SectionDesc {
    SectionDesc::new(
        ".data",
        SHT_PROGBITS,
        (SHF_ALLOC | SHF_WRITE) as u64,
        Content::Bytes(vec![0xaa; 16]),
    )
    .align(8)
}

fn bss() -> SectionDesc {
    SectionDesc::new(
        ".bss",
        SHT_NOBITS,
        (SHF_ALLOC | SHF_WRITE) as u64,
        Content::NoBits(32),
    )
    .align(8)
}

fn symtab(flavor: Flavor) -> [SectionDesc; 2] {
    [
        SectionDesc::new(".symtab", SHT_SYMTAB, 0, Content::Symbols(symtab_entries()))
            .link(".strtab")
            .info(SYMTAB_FIRST_GLOBAL)
            .align(flavor.word()),
        SectionDesc::new(".strtab", SHT_STRTAB, 0, Content::Strtab),
    ]
}

/// Imports of the dynamic fixtures, in `.dynsym` order after the null symbol.
pub const DYNSYM_IMPORTS: [&str; 3] = ["puts", "printf", "exit"];

/// Options of [`dynamic_exe`].
#[derive(Clone, Copy, Debug)]
pub struct DynOptions {
    pub machine: u16,
    pub plt_sec: bool,
    pub hash: HashStyle,
    pub with_symtab: bool,
}

impl DynOptions {
    pub fn x86_64() -> Self {
        Self {
            machine: EM_X86_64,
            plt_sec: false,
            hash: HashStyle::Sysv,
            with_symtab: true,
        }
    }
    pub fn i386() -> Self {
        Self {
            machine: EM_386,
            ..Self::x86_64()
        }
    }
}

/// Jump-slot and irelative relocation types for the supported fixture
/// machines.
pub fn plt_reloc_types(machine: u16) -> (u32, u32) {
    match machine {
        EM_X86_64 => (object::elf::R_X86_64_JUMP_SLOT, object::elf::R_X86_64_IRELATIVE),
        EM_386 => (object::elf::R_386_JMP_SLOT, object::elf::R_386_IRELATIVE),
        EM_AARCH64 => (object::elf::R_AARCH64_JUMP_SLOT, object::elf::R_AARCH64_IRELATIVE),
        EM_ARM => (object::elf::R_ARM_JUMP_SLOT, object::elf::R_ARM_IRELATIVE),
        EM_RISCV => (object::elf::R_RISCV_JUMP_SLOT, object::elf::R_RISCV_IRELATIVE),
        _ => (7, 42),
    }
}

/// A dynamically linked executable importing `puts`, `printf` and `exit`.
///
/// `.rela.plt` (or `.rel.plt` for 32-bit) holds, in order: `puts`, `printf`,
/// an IRELATIVE entry without a symbol, and `exit`.
pub fn dynamic_exe(flavor: Flavor, opts: DynOptions) -> Vec<u8> {
    let rela = flavor.is64;
    let word = flavor.word();
    let (jump_slot, irelative) = plt_reloc_types(opts.machine);
    let interp = if flavor.is64 { X86_64_INTERP } else { I386_INTERP };
    let nsyms = DYNSYM_IMPORTS.len() as u32 + 1;

    let mut b = ElfBuilder::new(flavor, ET_EXEC, opts.machine);
    b.entry = Some(Val::At(".text", 0));
    let mut interp_bytes = interp.as_bytes().to_vec();
    interp_bytes.push(0);
    b.section(SectionDesc::new(
        ".interp",
        SHT_PROGBITS,
        SHF_ALLOC as u64,
        Content::Bytes(interp_bytes),
    ));
    match opts.hash {
        HashStyle::Sysv => {
            b.section(
                SectionDesc::new(
                    ".hash",
                    SHT_HASH,
                    SHF_ALLOC as u64,
                    Content::Bytes(sysv_hash(flavor, nsyms)),
                )
                .link(".dynsym")
                .align(4),
            );
        }
        HashStyle::Gnu => {
            b.section(
                SectionDesc::new(
                    ".gnu.hash",
                    SHT_GNU_HASH,
                    SHF_ALLOC as u64,
                    Content::Bytes(gnu_hash(flavor, nsyms)),
                )
                .link(".dynsym")
                .align(word),
            );
        }
        HashStyle::None => {}
    }
    let imports = DYNSYM_IMPORTS.iter().map(|name| Sym::undef(name, STT_FUNC)).collect();
    b.section(
        SectionDesc::new(".dynsym", SHT_DYNSYM, SHF_ALLOC as u64, Content::Symbols(imports))
            .link(".dynstr")
            .info(1)
            .align(word),
    );
    b.section(SectionDesc::new(
        ".dynstr",
        SHT_STRTAB,
        SHF_ALLOC as u64,
        Content::Strtab,
    ));

    let got = |slot: u64| Val::At(".got.plt", (3 + slot) * word);
    let relocs = vec![
        Rel { offset: got(0), sym: 1, r_type: jump_slot, addend: 0 },
        Rel { offset: got(1), sym: 2, r_type: jump_slot, addend: 0 },
        Rel { offset: got(2), sym: 0, r_type: irelative, addend: 0x40 },
        Rel { offset: got(3), sym: 3, r_type: jump_slot, addend: 0 },
    ];
    let (rel_name, rel_type) = if rela {
        (".rela.plt", SHT_RELA)
    } else {
        (".rel.plt", SHT_REL)
    };
    b.section(
        SectionDesc::new(
            rel_name,
            rel_type,
            (SHF_ALLOC | SHF_INFO_LINK) as u64,
            Content::Relocs { rela, entries: relocs },
        )
        .link(".dynsym")
        .align(word),
    );
    b.section(
        SectionDesc::new(
            ".plt",
            SHT_PROGBITS,
            (SHF_ALLOC | SHF_EXECINSTR) as u64,
            Content::Bytes(vec![0xcc; 16 + 16 * 4]),
        )
        .align(16),
    );
    if opts.plt_sec {
        b.section(
            SectionDesc::new(
                ".plt.sec",
                SHT_PROGBITS,
                (SHF_ALLOC | SHF_EXECINSTR) as u64,
                Content::Bytes(vec![0xcc; 16 * 4]),
            )
            .align(16),
        );
    }
    b.section(text());

    let mut dynamic = vec![
        (DT_NEEDED, DynVal::Str("libc.so.6")),
        (DT_NEEDED, DynVal::Str("libm.so.6")),
        (DT_RUNPATH, DynVal::Str("$ORIGIN/lib")),
        (DT_STRTAB, DynVal::Addr(".dynstr")),
        (DT_SYMTAB, DynVal::Addr(".dynsym")),
        (DT_STRSZ, DynVal::Size(".dynstr")),
        (DT_SYMENT, DynVal::Raw(flavor.sym_size())),
        (DT_PLTGOT, DynVal::Addr(".got.plt")),
        (DT_JMPREL, DynVal::Addr(rel_name)),
        (DT_PLTRELSZ, DynVal::Size(rel_name)),
        (DT_PLTREL, DynVal::Raw((if rela { DT_RELA } else { DT_REL }) as u64)),
        (DT_DEBUG, DynVal::Raw(0)),
    ];
    match opts.hash {
        HashStyle::Sysv => dynamic.push((DT_HASH, DynVal::Addr(".hash"))),
        HashStyle::Gnu => dynamic.push((DT_GNU_HASH, DynVal::Addr(".gnu.hash"))),
        HashStyle::None => {}
    }
    b.section(
        SectionDesc::new(
            ".dynamic",
            SHT_DYNAMIC,
            (SHF_ALLOC | SHF_WRITE) as u64,
            Content::Dynamic(dynamic),
        )
        .link(".dynstr")
        .align(word),
    );
    b.section(
        SectionDesc::new(
            ".got.plt",
            SHT_PROGBITS,
            (SHF_ALLOC | SHF_WRITE) as u64,
            Content::Bytes(vec![0; (word * 7) as usize]),
        )
        .align(word),
    );
    b.section(data());
    b.section(bss());
    if opts.with_symtab {
        for sec in symtab(flavor) {
            b.section(sec);
        }
    }

    b.segment(PT_INTERP, PF_R, ".interp", ".interp");
    b.segment_from_start(PT_LOAD, PF_R | PF_X, ".text");
    b.segment(PT_LOAD, PF_R | PF_W, ".dynamic", ".bss");
    b.segment(PT_DYNAMIC, PF_R | PF_W, ".dynamic", ".dynamic");
    b.build()
}

/// A statically linked executable with `.symtab`.
pub fn static_exe(flavor: Flavor, machine: u16, with_symtab: bool) -> Vec<u8> {
    let mut b = ElfBuilder::new(flavor, ET_EXEC, machine);
    b.entry = Some(Val::At(".text", 0));
    b.section(text());
    b.section(data());
    b.section(bss());
    if with_symtab {
        for sec in symtab(flavor) {
            b.section(sec);
        }
    }
    b.segment_from_start(PT_LOAD, PF_R | PF_X, ".text");
    b.segment(PT_LOAD, PF_R | PF_W, ".data", ".bss");
    b.build()
}

/// A self-relocating executable: `PT_DYNAMIC` without an interpreter.
pub fn static_pie(flavor: Flavor, machine: u16) -> Vec<u8> {
    let word = flavor.word();
    let mut b = ElfBuilder::new(flavor, ET_DYN, machine);
    b.entry = Some(Val::At(".text", 0));
    b.section(
        SectionDesc::new(".dynsym", SHT_DYNSYM, SHF_ALLOC as u64, Content::Symbols(Vec::new()))
            .link(".dynstr")
            .info(1)
            .align(word),
    );
    b.section(SectionDesc::new(
        ".dynstr",
        SHT_STRTAB,
        SHF_ALLOC as u64,
        Content::Strtab,
    ));
    b.section(text());
    b.section(
        SectionDesc::new(
            ".dynamic",
            SHT_DYNAMIC,
            (SHF_ALLOC | SHF_WRITE) as u64,
            Content::Dynamic(vec![
                (DT_STRTAB, DynVal::Addr(".dynstr")),
                (DT_SYMTAB, DynVal::Addr(".dynsym")),
                (DT_STRSZ, DynVal::Size(".dynstr")),
                (DT_SYMENT, DynVal::Raw(flavor.sym_size())),
                (DT_FLAGS_1, DynVal::Raw(0x0800_0000)),
            ]),
        )
        .link(".dynstr")
        .align(word),
    );
    b.section(data());
    for sec in symtab(flavor) {
        b.section(sec);
    }
    b.segment_from_start(PT_LOAD, PF_R | PF_X, ".text");
    b.segment(PT_LOAD, PF_R | PF_W, ".dynamic", ".data");
    b.segment(PT_DYNAMIC, PF_R | PF_W, ".dynamic", ".dynamic");
    b.build()
}

/// A relocatable object: no program headers.
pub fn relocatable(flavor: Flavor, machine: u16) -> Vec<u8> {
    let mut b = ElfBuilder::new(flavor, ET_REL, machine);
    let mut text = text();
    text.flags = (SHF_ALLOC | SHF_EXECINSTR) as u64;
    b.section(text);
    b.section(data());
    for sec in symtab(flavor) {
        b.section(sec);
    }
    b.build()
}

/// Removes every trace of the section header table from an image.
pub fn strip_section_headers(bytes: &mut [u8], flavor: Flavor) {
    let f = ehdr_fields(flavor);
    patch(bytes, flavor, f.e_shoff, flavor.word() as usize, 0);
    patch(bytes, flavor, f.e_shnum, 2, 0);
    patch(bytes, flavor, f.e_shstrndx, 2, 0);
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
