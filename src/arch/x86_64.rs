//! x86-64 PLT layout.
//!
//! `.plt` starts with a 16-byte stub that pushes the link map and jumps to the
//! resolver; every imported function then gets one 16-byte stub. With IBT
//! enabled the linker emits a second table, `.plt.sec`, holding the stubs
//! that are actually called.

use super::PltLayout;
use elf::abi::*;

/// The ELF machine type for x86-64 architecture.
pub const EM_ARCH: u16 = EM_X86_64;

/// PLT jump slot relocation type.
pub const REL_JUMP_SLOT: u32 = R_X86_64_JUMP_SLOT;
/// IRELATIVE relocation type.
pub const REL_IRELATIVE: u32 = R_X86_64_IRELATIVE;

/// Size of the PLT header in bytes.
pub(crate) const PLT_HEADER_SIZE: u64 = 16;
/// Size of each PLT entry in bytes.
pub(crate) const PLT_ENTRY_SIZE: u64 = 16;

pub(crate) const LAYOUT: PltLayout = PltLayout {
    machine: EM_ARCH,
    header_size: PLT_HEADER_SIZE,
    entry_size: PLT_ENTRY_SIZE,
    jump_slot: REL_JUMP_SLOT,
    irelative: REL_IRELATIVE,
};

/// Map x86-64 relocation types to human readable names
pub(crate) fn rel_type_to_str(r_type: u32) -> &'static str {
    match r_type {
        R_X86_64_NONE => "R_X86_64_NONE",
        R_X86_64_64 => "R_X86_64_64",
        R_X86_64_COPY => "R_X86_64_COPY",
        R_X86_64_GLOB_DAT => "R_X86_64_GLOB_DAT",
        R_X86_64_JUMP_SLOT => "R_X86_64_JUMP_SLOT",
        R_X86_64_RELATIVE => "R_X86_64_RELATIVE",
        R_X86_64_IRELATIVE => "R_X86_64_IRELATIVE",
        _ => "UNKNOWN",
    }
}
