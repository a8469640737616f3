//! Branch slots and their compact target encoding.
//!
//! A branch record is one of:
//!
//! | Record | Target |
//! |--------|--------|
//! | `""` / `"null"` | none (slot unusable) |
//! | `"5,12"` | group 5, instruction 12 |
//! | `"12"` | instruction 12, group resolved by the server |
//!
//! Anything that fails to parse makes the slot unusable instead of failing
//! the load.

use serde_json::Value;

use crate::ids::{GroupId, InstructionId};
use crate::record::RawBranchRecord;

/// Number of branch slots offered per instruction.
pub const MAX_BRANCHES: usize = 4;

/// Where a branch leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchTarget {
    /// Both ids known: load `group` and open the item numbered `instruction`.
    Group {
        group: GroupId,
        instruction: InstructionId,
    },
    /// Only the instruction id is known; the server picks the sequence.
    Lookup(InstructionId),
}

impl BranchTarget {
    /// Parse a record. `None` means "no target".
    #[must_use]
    pub fn parse(record: &str) -> Option<Self> {
        if record.is_empty() || record == "null" {
            return None;
        }

        if record.contains(',') {
            let parts: Vec<&str> = record.split(',').collect();
            let [group, instruction] = parts.as_slice() else {
                return None;
            };
            let group: i64 = group.parse().ok()?;
            let instruction = InstructionId::new(instruction.parse().ok()?);
            return Some(if group >= 0 {
                Self::Group {
                    group: GroupId::new(group),
                    instruction,
                }
            } else {
                Self::Lookup(instruction)
            });
        }

        record
            .parse()
            .ok()
            .map(|instruction| Self::Lookup(InstructionId::new(instruction)))
    }

    /// The target group, when known.
    #[must_use]
    pub const fn group(&self) -> Option<GroupId> {
        match self {
            Self::Group { group, .. } => Some(*group),
            Self::Lookup(_) => None,
        }
    }

    #[must_use]
    pub const fn instruction(&self) -> InstructionId {
        match self {
            Self::Group { instruction, .. } | Self::Lookup(instruction) => *instruction,
        }
    }
}

/// A usable branch: existence proves it has both a label and a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    label: String,
    target: BranchTarget,
}

impl Branch {
    /// Build a branch from its label and record; `None` if either is unusable.
    #[must_use]
    pub fn new(label: Option<&str>, record: Option<&str>) -> Option<Self> {
        let label = label.filter(|l| !l.is_empty() && *l != "null")?;
        let target = BranchTarget::parse(record.unwrap_or_default())?;
        Some(Self {
            label: label.to_string(),
            target,
        })
    }

    /// Decode one entry of an instruction's `branching` array.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match serde_json::from_value::<RawBranchRecord>(value.clone()) {
            Ok(raw) => Self::new(raw.label.as_deref(), raw.record.as_deref()),
            Err(err) => {
                tracing::debug!("Ignoring malformed branch slot: {err}");
                None
            }
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn target(&self) -> BranchTarget {
        self.target
    }
}

/// Fill the fixed slot array from a `branching` list, in order.
#[must_use]
pub fn branch_slots(entries: &[Value]) -> [Option<Branch>; MAX_BRANCHES] {
    if entries.len() > MAX_BRANCHES {
        tracing::debug!(
            "Instruction lists {} branches; only the first {MAX_BRANCHES} are used",
            entries.len()
        );
    }
    let mut slots: [Option<Branch>; MAX_BRANCHES] = Default::default();
    for (slot, entry) in slots.iter_mut().zip(entries) {
        *slot = Branch::from_value(entry);
    }
    slots
}
