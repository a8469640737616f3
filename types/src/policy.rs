//! Control policy resolution.
//!
//! Every instruction carries its own stop/pause/advance/back flags, each of
//! which may defer to the owning group's default. Two absolute rules win over
//! any flag: the last instruction can never advance and the first can never
//! go back.

use serde::{Deserialize, Serialize};

use crate::script::{Instruction, InstructionGroup};

/// Three-valued per-instruction flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyFlag {
    /// Use the group default.
    #[default]
    Inherit,
    Off,
    On,
}

impl PolicyFlag {
    /// Decode the wire encoding: negative inherits, zero is off, positive is on.
    #[must_use]
    pub const fn from_wire(raw: i64) -> Self {
        if raw < 0 {
            Self::Inherit
        } else if raw == 0 {
            Self::Off
        } else {
            Self::On
        }
    }

    #[must_use]
    pub const fn resolve(self, default: bool) -> bool {
        match self {
            Self::Inherit => default,
            Self::Off => false,
            Self::On => true,
        }
    }
}

/// A user-facing control whose availability is decided per instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Stoppable,
    Pausable,
    CanAdvance,
    CanGoBack,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Stoppable,
        Capability::Pausable,
        Capability::CanAdvance,
        Capability::CanGoBack,
    ];
}

/// An instruction's own flags, as loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyFlags {
    pub stoppable: PolicyFlag,
    pub pausable: PolicyFlag,
    pub can_advance: PolicyFlag,
    pub can_go_back: PolicyFlag,
}

impl PolicyFlags {
    #[must_use]
    pub const fn get(&self, capability: Capability) -> PolicyFlag {
        match capability {
            Capability::Stoppable => self.stoppable,
            Capability::Pausable => self.pausable,
            Capability::CanAdvance => self.can_advance,
            Capability::CanGoBack => self.can_go_back,
        }
    }
}

/// Group-level defaults consulted by inheriting flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDefaults {
    pub stoppable: bool,
    pub pausable: bool,
    pub can_advance: bool,
    pub can_go_back: bool,
}

impl PolicyDefaults {
    #[must_use]
    pub const fn get(&self, capability: Capability) -> bool {
        match capability {
            Capability::Stoppable => self.stoppable,
            Capability::Pausable => self.pausable,
            Capability::CanAdvance => self.can_advance,
            Capability::CanGoBack => self.can_go_back,
        }
    }
}

/// Resolve one capability for an instruction of `group`.
///
/// Pure and deterministic: the answer depends only on the pair passed in.
#[must_use]
pub fn resolve(instruction: &Instruction, group: &InstructionGroup, capability: Capability) -> bool {
    match capability {
        Capability::CanAdvance if instruction.is_last() => false,
        Capability::CanGoBack if instruction.is_first() => false,
        _ => instruction
            .flags()
            .get(capability)
            .resolve(group.defaults().get(capability)),
    }
}

/// The four resolved controls of one instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    pub stoppable: bool,
    pub pausable: bool,
    pub can_advance: bool,
    pub can_go_back: bool,
}

impl Controls {
    #[must_use]
    pub fn resolve(instruction: &Instruction, group: &InstructionGroup) -> Self {
        Self {
            stoppable: resolve(instruction, group, Capability::Stoppable),
            pausable: resolve(instruction, group, Capability::Pausable),
            can_advance: resolve(instruction, group, Capability::CanAdvance),
            can_go_back: resolve(instruction, group, Capability::CanGoBack),
        }
    }

    /// Whether any playback control (stop or pause) is offered.
    #[must_use]
    pub const fn is_playable(&self) -> bool {
        self.stoppable || self.pausable
    }
}
