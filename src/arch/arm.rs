//! 32-bit ARM PLT layout.
//!
//! The PLT header is five words (20 bytes); each stub is three instructions
//! (12 bytes).

use super::PltLayout;
use elf::abi::*;

/// The ELF machine type for ARM architecture.
pub const EM_ARCH: u16 = EM_ARM;

/// PLT jump slot relocation type.
pub const REL_JUMP_SLOT: u32 = R_ARM_JUMP_SLOT;
/// IRELATIVE relocation type.
pub const REL_IRELATIVE: u32 = R_ARM_IRELATIVE;

pub(crate) const PLT_HEADER_SIZE: u64 = 20;
pub(crate) const PLT_ENTRY_SIZE: u64 = 12;

pub(crate) const LAYOUT: PltLayout = PltLayout {
    machine: EM_ARCH,
    header_size: PLT_HEADER_SIZE,
    entry_size: PLT_ENTRY_SIZE,
    jump_slot: REL_JUMP_SLOT,
    irelative: REL_IRELATIVE,
};

/// Map arm relocation type to human readable name
pub(crate) fn rel_type_to_str(r_type: u32) -> &'static str {
    match r_type {
        R_ARM_NONE => "R_ARM_NONE",
        R_ARM_ABS32 => "R_ARM_ABS32",
        R_ARM_GLOB_DAT => "R_ARM_GLOB_DAT",
        R_ARM_JUMP_SLOT => "R_ARM_JUMP_SLOT",
        R_ARM_RELATIVE => "R_ARM_RELATIVE",
        R_ARM_IRELATIVE => "R_ARM_IRELATIVE",
        R_ARM_COPY => "R_ARM_COPY",
        _ => "UNKNOWN",
    }
}
