//! Navigation transition graph authority.
//!
//! The single place that names the edges between [`NavTag`]s and decides
//! which are legal. The engine asks here instead of encoding the graph at
//! each call site.

use crate::state::{NavEdge, NavTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TransitionReceipt {
    from: NavTag,
    edge: NavEdge,
    to: NavTag,
}

impl TransitionReceipt {
    #[must_use]
    pub(crate) const fn edge(self) -> NavEdge {
        self.edge
    }
}

#[must_use]
pub(crate) fn transition_receipt(from: NavTag, to: NavTag) -> Option<TransitionReceipt> {
    transition_edge(from, to).map(|edge| TransitionReceipt { from, edge, to })
}

#[must_use]
pub(crate) fn receipt_is_legal(receipt: TransitionReceipt) -> bool {
    is_legal_transition(receipt.from, receipt.edge, receipt.to)
}

/// Name the edge a state change would take. `Idle -> Idle` has no edge.
#[must_use]
pub(crate) fn transition_edge(from: NavTag, to: NavTag) -> Option<NavEdge> {
    use NavEdge::{Finish, ShowInstruction, StartLoad};
    use NavTag::{Displaying, Idle, Loading};

    match (from, to) {
        (_, Loading) => Some(StartLoad),
        (_, Displaying) => Some(ShowInstruction),
        (Loading | Displaying, Idle) => Some(Finish),
        (Idle, Idle) => None,
    }
}

/// An instruction is only ever shown out of a load or another instruction.
#[must_use]
pub(crate) fn is_legal_transition(from: NavTag, edge: NavEdge, to: NavTag) -> bool {
    use NavEdge::{Finish, ShowInstruction, StartLoad};
    use NavTag::{Displaying, Idle, Loading};

    match edge {
        StartLoad => to == Loading,
        ShowInstruction => to == Displaying && matches!(from, Loading | Displaying),
        Finish => to == Idle && matches!(from, Loading | Displaying),
    }
}
