//! Loaded troubleshooting scripts.
//!
//! A [`Sequence`] is the unit that is replaced on every load: it owns the
//! group record and every instruction of that group, so an instruction can
//! never outlive the group its policy lookups depend on.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::branch::{Branch, MAX_BRANCHES, branch_slots};
use crate::ids::{GroupId, InstructionId};
use crate::policy::{Capability, Controls, PolicyDefaults, PolicyFlag, PolicyFlags, resolve};
use crate::record::{RawGroupRecord, RawInstructionRecord};

/// How an instruction is voiced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionKind {
    /// Description is read out by text-to-speech.
    Speech,
    /// An audio clip is streamed from the server.
    StreamedAudio,
    /// Any other type code: displayed only.
    Silent(i64),
}

impl InstructionKind {
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Speech,
            2 => Self::StreamedAudio,
            other => Self::Silent(other),
        }
    }

    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Speech => 1,
            Self::StreamedAudio => 2,
            Self::Silent(code) => code,
        }
    }

    /// Whether playback of this kind reports completion.
    #[must_use]
    pub const fn signals_completion(self) -> bool {
        matches!(self, Self::Speech | Self::StreamedAudio)
    }
}

/// What moves the player past an instruction without user input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdvanceMode {
    /// Advance when playback reports completion (`delay == 0`).
    OnCompletion,
    /// Advance after a fixed delay.
    After(Duration),
    /// Never auto-advance (negative or non-finite delay).
    Manual,
}

impl AdvanceMode {
    #[must_use]
    pub fn from_delay_secs(delay: f64) -> Self {
        if delay == 0.0 {
            Self::OnCompletion
        } else if delay > 0.0 && delay.is_finite() {
            Duration::try_from_secs_f64(delay).map_or(Self::Manual, Self::After)
        } else {
            Self::Manual
        }
    }
}

/// One troubleshooting script's header record.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionGroup {
    group_id: GroupId,
    name: String,
    description: String,
    filename: String,
    defaults: PolicyDefaults,
}

impl InstructionGroup {
    #[must_use]
    pub fn from_record(raw: RawGroupRecord) -> Self {
        Self {
            group_id: GroupId::new(raw.group_id),
            name: raw.name,
            description: raw.description,
            filename: raw.filename,
            defaults: PolicyDefaults {
                stoppable: raw.cf_stop > 0,
                pausable: raw.cf_pause > 0,
                can_advance: raw.cf_next > 0,
                can_go_back: raw.cf_previous > 0,
            },
        }
    }

    #[must_use]
    pub const fn group_id(&self) -> GroupId {
        self.group_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub const fn defaults(&self) -> &PolicyDefaults {
        &self.defaults
    }
}

/// One step of a script.
///
/// `item_number` must equal the instruction's 1-based position in its
/// sequence. The server guarantees this; relative navigation depends on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    item_number: i64,
    command_id: Option<InstructionId>,
    name: String,
    description: String,
    kind: InstructionKind,
    filename: String,
    url: String,
    delay_secs: f64,
    first: bool,
    last: bool,
    flags: PolicyFlags,
    branches: [Option<Branch>; MAX_BRANCHES],
}

impl Instruction {
    #[must_use]
    pub fn from_record(raw: RawInstructionRecord, is_last: bool) -> Self {
        Self {
            item_number: raw.instruction_number,
            command_id: raw.command_id.map(InstructionId::new),
            name: raw.name,
            description: raw.description,
            kind: InstructionKind::from_code(raw.kind),
            filename: raw.filename,
            url: raw.url,
            delay_secs: raw.delay,
            first: raw.instruction_number == 1,
            last: is_last,
            flags: PolicyFlags {
                stoppable: PolicyFlag::from_wire(raw.cf_stop),
                pausable: PolicyFlag::from_wire(raw.cf_pause),
                can_advance: PolicyFlag::from_wire(raw.cf_next),
                can_go_back: PolicyFlag::from_wire(raw.cf_previous),
            },
            branches: branch_slots(&raw.branching),
        }
    }

    #[must_use]
    pub const fn item_number(&self) -> i64 {
        self.item_number
    }

    #[must_use]
    pub const fn command_id(&self) -> Option<InstructionId> {
        self.command_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub const fn kind(&self) -> InstructionKind {
        self.kind
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub const fn delay_secs(&self) -> f64 {
        self.delay_secs
    }

    #[must_use]
    pub fn advance_mode(&self) -> AdvanceMode {
        AdvanceMode::from_delay_secs(self.delay_secs)
    }

    #[must_use]
    pub const fn is_first(&self) -> bool {
        self.first
    }

    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.last
    }

    #[must_use]
    pub const fn flags(&self) -> &PolicyFlags {
        &self.flags
    }

    #[must_use]
    pub fn branches(&self) -> &[Option<Branch>; MAX_BRANCHES] {
        &self.branches
    }

    #[must_use]
    pub fn branch(&self, slot: usize) -> Option<&Branch> {
        self.branches.get(slot).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn has_branches(&self) -> bool {
        self.branches.iter().any(Option::is_some)
    }

    /// Labels for the branch buttons; `None` hides the slot.
    #[must_use]
    pub fn branch_labels(&self) -> [Option<String>; MAX_BRANCHES] {
        self.branches
            .each_ref()
            .map(|slot| slot.as_ref().map(|b| b.label().to_string()))
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("sequence has {0} record(s); a group record and at least one instruction are required")]
    TooShort(usize),
    #[error("group record is malformed: {0}")]
    Group(#[source] serde_json::Error),
    #[error("instruction record {index} is malformed: {source}")]
    Instruction {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// A loaded, non-empty script: its group and instructions in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    group: InstructionGroup,
    instructions: Vec<Instruction>,
}

impl Sequence {
    /// Build from a fetched record array: element 0 is the group, the rest
    /// are instructions with the final element flagged last.
    pub fn load(records: &[Value]) -> Result<Self, LoadError> {
        let [group, items @ ..] = records else {
            return Err(LoadError::TooShort(0));
        };
        if items.is_empty() {
            return Err(LoadError::TooShort(records.len()));
        }

        let group = serde_json::from_value::<RawGroupRecord>(group.clone())
            .map(InstructionGroup::from_record)
            .map_err(LoadError::Group)?;

        let last_index = items.len() - 1;
        let instructions = items
            .iter()
            .enumerate()
            .map(|(i, value)| {
                serde_json::from_value::<RawInstructionRecord>(value.clone())
                    .map(|raw| Instruction::from_record(raw, i == last_index))
                    .map_err(|source| LoadError::Instruction {
                        index: i + 1,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let sequence = Self {
            group,
            instructions,
        };
        if let Some(position) = sequence.first_misnumbered() {
            tracing::warn!(
                group = %sequence.group.group_id,
                position,
                "Instruction number does not match its position; relative navigation will misbehave"
            );
        }
        Ok(sequence)
    }

    #[must_use]
    pub const fn group(&self) -> &InstructionGroup {
        &self.group
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Always false for a loaded sequence; provided for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Whether `index` is a valid 1-based position.
    #[must_use]
    pub fn contains_position(&self, index: i64) -> bool {
        usize::try_from(index).is_ok_and(|i| i >= 1 && i <= self.instructions.len())
    }

    /// The instruction at a 1-based position.
    #[must_use]
    pub fn get(&self, index: i64) -> Option<InstructionRef<'_>> {
        if !self.contains_position(index) {
            return None;
        }
        let offset = usize::try_from(index - 1).ok()?;
        self.instructions.get(offset).map(|instruction| InstructionRef {
            instruction,
            group: &self.group,
            position: index,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = InstructionRef<'_>> {
        self.instructions
            .iter()
            .zip(1_i64..)
            .map(|(instruction, position)| InstructionRef {
                instruction,
                group: &self.group,
                position,
            })
    }

    /// 1-based position of the instruction with server id `id`.
    #[must_use]
    pub fn position_of(&self, id: InstructionId) -> Option<i64> {
        self.iter()
            .find(|i| i.instruction().command_id() == Some(id))
            .map(|i| i.position())
    }

    fn first_misnumbered(&self) -> Option<i64> {
        self.iter()
            .find(|i| i.instruction().item_number() != i.position())
            .map(|i| i.position())
    }
}

/// An instruction paired with its owning group for policy lookups.
#[derive(Debug, Clone, Copy)]
pub struct InstructionRef<'a> {
    instruction: &'a Instruction,
    group: &'a InstructionGroup,
    position: i64,
}

impl<'a> InstructionRef<'a> {
    #[must_use]
    pub const fn instruction(&self) -> &'a Instruction {
        self.instruction
    }

    #[must_use]
    pub const fn group(&self) -> &'a InstructionGroup {
        self.group
    }

    /// 1-based position inside the sequence.
    #[must_use]
    pub const fn position(&self) -> i64 {
        self.position
    }

    #[must_use]
    pub fn allows(&self, capability: Capability) -> bool {
        resolve(self.instruction, self.group, capability)
    }

    #[must_use]
    pub fn stoppable(&self) -> bool {
        self.allows(Capability::Stoppable)
    }

    #[must_use]
    pub fn pausable(&self) -> bool {
        self.allows(Capability::Pausable)
    }

    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.allows(Capability::CanAdvance)
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.allows(Capability::CanGoBack)
    }

    #[must_use]
    pub fn controls(&self) -> Controls {
        Controls::resolve(self.instruction, self.group)
    }
}

impl std::ops::Deref for InstructionRef<'_> {
    type Target = Instruction;

    fn deref(&self) -> &Self::Target {
        self.instruction
    }
}

/// An entry of the script picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSummary {
    pub group_id: GroupId,
    pub name: String,
    pub description: String,
}

impl ScriptSummary {
    /// Decode the script list, skipping records that do not parse.
    #[must_use]
    pub fn parse_catalog(records: &[Value]) -> Vec<Self> {
        records
            .iter()
            .filter_map(|value| match serde_json::from_value::<RawGroupRecord>(value.clone()) {
                Ok(raw) => Some(Self {
                    group_id: GroupId::new(raw.group_id),
                    name: raw.name,
                    description: raw.description,
                }),
                Err(err) => {
                    tracing::warn!("Skipping malformed script list entry: {err}");
                    None
                }
            })
            .collect()
    }
}
