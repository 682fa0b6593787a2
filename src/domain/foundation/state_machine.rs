//! Lifecycle transitions for membership and invitation statuses.

use std::fmt;

/// Rejected move between two lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition<S> {
    pub from: S,
    pub to: S,
}

impl<S: fmt::Debug> fmt::Display for IllegalTransition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal transition {:?} -> {:?}", self.from, self.to)
    }
}

impl<S: fmt::Debug> std::error::Error for IllegalTransition<S> {}

/// A closed set of statuses with an edge relation between them.
///
/// Implementors list every state in `STATES` and decide the edges in
/// `can_transition_to`; the reachable set and terminal check follow.
pub trait StateMachine: Sized + Copy + PartialEq + fmt::Debug + 'static {
    const STATES: &'static [Self];

    fn can_transition_to(&self, target: &Self) -> bool;

    fn valid_transitions(&self) -> Vec<Self> {
        Self::STATES
            .iter()
            .copied()
            .filter(|target| self.can_transition_to(target))
            .collect()
    }

    fn transition_to(&self, target: Self) -> Result<Self, IllegalTransition<Self>> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(IllegalTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// No outgoing edges. A consumed invitation code sits in such a state.
    fn is_terminal(&self) -> bool {
        !Self::STATES.iter().any(|target| self.can_transition_to(target))
    }
}
