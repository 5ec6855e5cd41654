//! Per-machine knowledge needed to interpret PLT relocations.
//!
//! Every machine with a known PLT layout has its own module exporting its
//! `e_machine` value, its jump-slot relocation types and a [`PltLayout`].
//! All of them are compiled in regardless of the host target.

mod aarch64;
mod arm;
mod riscv;
mod x86;
mod x86_64;

/// Shape of the procedure linkage table on one machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PltLayout {
    /// `e_machine` this layout applies to.
    pub machine: u16,
    /// Size of the reserved stub at the start of `.plt`.
    pub header_size: u64,
    /// Size of every following stub.
    pub entry_size: u64,
    /// Relocation type binding a stub to a symbol.
    pub jump_slot: u32,
    /// Relocation type for indirect functions; also occupies a stub.
    pub irelative: u32,
}

impl PltLayout {
    /// Address of the stub for the `slot`-th PLT relocation.
    ///
    /// `header_size` is skipped unless the stubs live in a separate
    /// `.plt.sec` section.
    #[inline]
    pub fn stub_address(&self, base: u64, slot: u64, separate: bool) -> u64 {
        let header = if separate { 0 } else { self.header_size };
        base.wrapping_add(header)
            .wrapping_add(self.entry_size.wrapping_mul(slot))
    }
}

static LAYOUTS: [PltLayout; 5] = [
    x86_64::LAYOUT,
    x86::LAYOUT,
    aarch64::LAYOUT,
    arm::LAYOUT,
    riscv::LAYOUT,
];

/// The PLT layout for `machine`, if it is known.
pub fn plt_layout(machine: u16) -> Option<&'static PltLayout> {
    LAYOUTS.iter().find(|layout| layout.machine == machine)
}

/// Map a relocation type of `machine` to a human readable name
pub fn rel_type_to_str(machine: u16, r_type: u32) -> &'static str {
    match machine {
        x86_64::EM_ARCH => x86_64::rel_type_to_str(r_type),
        x86::EM_ARCH => x86::rel_type_to_str(r_type),
        aarch64::EM_ARCH => aarch64::rel_type_to_str(r_type),
        arm::EM_ARCH => arm::rel_type_to_str(r_type),
        riscv::EM_ARCH => riscv::rel_type_to_str(r_type),
        _ => "UNKNOWN",
    }
}
