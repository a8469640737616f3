//! Core domain types for Cyrano troubleshooting scripts.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies:
//!
//! - [`Sequence`] and friends: the loaded script model and its parsing rules
//! - [`policy`]: stop/pause/advance/back resolution with group inheritance
//! - [`BranchTarget`]: the compact branch record encoding
//! - [`record`]: wire records as the script server sends them

mod branch;
mod ids;
pub mod policy;
pub mod record;
mod script;
mod session;

pub use branch::{Branch, BranchTarget, MAX_BRANCHES, branch_slots};
pub use ids::{Generation, GroupId, InstructionId};
pub use policy::{Capability, Controls, PolicyDefaults, PolicyFlag, PolicyFlags};
pub use script::{
    AdvanceMode, Instruction, InstructionGroup, InstructionKind, InstructionRef, LoadError,
    ScriptSummary, Sequence,
};
pub use session::SessionContext;
