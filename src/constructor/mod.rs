pub(crate) mod alternating;
pub(crate) mod buchi;
pub(crate) mod generalized;
pub(crate) mod queue;
pub(crate) mod scc;

use std::fmt;
use std::time::Duration;

/// Status of a state slot during the construction of an automaton.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum StateStatus {
    /// Created, but the transitions have not been computed yet.
    Pending,
    Live,
    /// Removed from the automaton, with the state replacing it if any.
    Removed(Option<usize>),
}

/// Follows the replacements of removed states until a state that is not removed.
///
/// Returns `None` if the chain ends in a state removed without replacement.
pub(crate) fn resolve_removed<F>(state: usize, status: F) -> Option<usize>
where
    F: Fn(usize) -> StateStatus,
{
    let mut state = state;
    loop {
        match status(state) {
            StateStatus::Removed(Some(replacement)) => state = replacement,
            StateStatus::Removed(None) => return None,
            StateStatus::Pending | StateStatus::Live => return Some(state),
        }
    }
}

/// Size of an automaton and the time spent to construct it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageStats {
    states: usize,
    transitions: usize,
    time: Duration,
}

impl StageStats {
    pub(crate) fn new(states: usize, transitions: usize, time: Duration) -> Self {
        Self {
            states,
            transitions,
            time,
        }
    }

    pub fn states(&self) -> usize {
        self.states
    }

    pub fn transitions(&self) -> usize {
        self.transitions
    }

    pub fn time(&self) -> Duration {
        self.time
    }
}

impl std::ops::AddAssign for StageStats {
    fn add_assign(&mut self, rhs: Self) {
        self.states += rhs.states;
        self.transitions += rhs.transitions;
        self.time += rhs.time;
    }
}

impl fmt::Display for StageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "|Q| = {}, |E| = {}, time: {:.2}",
            self.states(),
            self.transitions(),
            self.time().as_secs_f32(),
        )
    }
}

/// Statistics of the automata built by one translation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TranslationStats {
    pub alternating: StageStats,
    pub generalized: StageStats,
    pub buchi: StageStats,
}

impl TranslationStats {
    /// The sum over all stages.
    pub fn total(&self) -> StageStats {
        let mut total = self.alternating;
        total += self.generalized;
        total += self.buchi;
        total
    }
}

impl fmt::Display for TranslationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "alternating: {}; generalized: {}; buchi: {}",
            self.alternating, self.generalized, self.buchi
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_removed() {
        let statuses = vec![
            StateStatus::Removed(Some(1)),
            StateStatus::Removed(Some(2)),
            StateStatus::Live,
            StateStatus::Removed(None),
            StateStatus::Removed(Some(3)),
        ];
        let status = |s: usize| statuses[s];
        assert_eq!(resolve_removed(0, status), Some(2));
        assert_eq!(resolve_removed(2, status), Some(2));
        assert_eq!(resolve_removed(4, status), None);
    }

    #[test]
    fn test_stats() {
        let stats = TranslationStats {
            alternating: StageStats::new(2, 3, Duration::from_millis(10)),
            generalized: StageStats::new(4, 5, Duration::from_millis(20)),
            buchi: StageStats::new(6, 7, Duration::from_millis(30)),
        };
        let total = stats.total();
        assert_eq!(total.states(), 12);
        assert_eq!(total.transitions(), 15);
        assert_eq!(total.to_string(), "|Q| = 12, |E| = 15, time: 0.06");
    }
}
