//! i386 PLT layout. Same stub sizes as x86-64, with `Rel` relocations.

use super::PltLayout;
use elf::abi::EM_386;

pub const EM_ARCH: u16 = EM_386;

const R_386_NONE: u32 = 0;
const R_386_32: u32 = 1;
const R_386_COPY: u32 = 5;
const R_386_GLOB_DAT: u32 = 6;
const R_386_JMP_SLOT: u32 = 7;
const R_386_RELATIVE: u32 = 8;
const R_386_IRELATIVE: u32 = 42;

pub const REL_JUMP_SLOT: u32 = R_386_JMP_SLOT;
pub const REL_IRELATIVE: u32 = R_386_IRELATIVE;

pub(crate) const PLT_HEADER_SIZE: u64 = 16;
pub(crate) const PLT_ENTRY_SIZE: u64 = 16;

pub(crate) const LAYOUT: PltLayout = PltLayout {
    machine: EM_ARCH,
    header_size: PLT_HEADER_SIZE,
    entry_size: PLT_ENTRY_SIZE,
    jump_slot: REL_JUMP_SLOT,
    irelative: REL_IRELATIVE,
};

pub(crate) fn rel_type_to_str(r_type: u32) -> &'static str {
    match r_type {
        R_386_NONE => "R_386_NONE",
        R_386_32 => "R_386_32",
        R_386_COPY => "R_386_COPY",
        R_386_GLOB_DAT => "R_386_GLOB_DAT",
        R_386_JMP_SLOT => "R_386_JMP_SLOT",
        R_386_RELATIVE => "R_386_RELATIVE",
        R_386_IRELATIVE => "R_386_IRELATIVE",
        _ => "UNKNOWN",
    }
}
