//! Per-step change signals.
//!
//! `Cpu::step` returns a fresh `DirtyFlags` describing what that one
//! instruction touched. The CPU never accumulates them; a consumer that
//! wants to batch several steps merges them itself and clears its own
//! copy once it has reacted.

use serde::{Serialize, Deserialize};

/// Which parts of the machine state a step changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyFlags {
    /// A register or flag was written.
    pub regs: bool,
    /// A RAM nibble was written.
    pub ram: bool,
    /// A RAM nibble inside the visible screen was written.
    pub screen: bool,
}

impl DirtyFlags {
    /// No changes.
    pub const CLEAN: DirtyFlags = DirtyFlags { regs: false, ram: false, screen: false };

    /// Only registers changed.
    pub const REGS: DirtyFlags = DirtyFlags { regs: true, ram: false, screen: false };

    /// Flags for a RAM write, on or off the screen.
    pub fn ram_write(on_screen: bool) -> Self {
        Self { regs: false, ram: true, screen: on_screen }
    }

    /// Did anything change?
    pub fn any(&self) -> bool {
        self.regs || self.ram || self.screen
    }

    /// Fold another step's flags into this set.
    pub fn merge(&mut self, other: DirtyFlags) {
        self.regs |= other.regs;
        self.ram |= other.ram;
        self.screen |= other.screen;
    }

    /// Return the register flag and clear it.
    pub fn take_regs(&mut self) -> bool {
        std::mem::take(&mut self.regs)
    }

    /// Return the RAM flag and clear it.
    pub fn take_ram(&mut self) -> bool {
        std::mem::take(&mut self.ram)
    }

    /// Return the screen flag and clear it.
    pub fn take_screen(&mut self) -> bool {
        std::mem::take(&mut self.screen)
    }
}

impl std::ops::BitOr for DirtyFlags {
    type Output = DirtyFlags;

    fn bitor(mut self, rhs: DirtyFlags) -> DirtyFlags {
        self.merge(rhs);
        self
    }
}

impl std::ops::BitOrAssign for DirtyFlags {
    fn bitor_assign(&mut self, rhs: DirtyFlags) {
        self.merge(rhs);
    }
}
