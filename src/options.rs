//! Options for the translation procedure.

use std::fmt;
use std::str::FromStr;

/// The order in which the work lists of the subset and counting
/// constructions are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorationStrategy {
    /// Explore states in a breadth-first search, i.e.
    /// choose the state that was discovered the earliest as the next state.
    Bfs,
    /// Explore states in a depth-first search, i.e.
    /// choose the state that was discovered the latest as the next state.
    Dfs,
}
impl Default for ExplorationStrategy {
    fn default() -> Self {
        Self::Bfs
    }
}

impl ExplorationStrategy {
    const VARIANTS: [(&'static str, ExplorationStrategy); 2] = [
        ("bfs", ExplorationStrategy::Bfs),
        ("dfs", ExplorationStrategy::Dfs),
    ];
}

impl fmt::Display for ExplorationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Self::VARIANTS
            .iter()
            .find(|(_, s)| s == self)
            .map(|(name, _)| *name)
            .unwrap_or_default();
        write!(f, "{}", name)
    }
}

/// Error returned when an [`ExplorationStrategy`] can not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseExplorationStrategyError {
    value: String,
}
impl ParseExplorationStrategyError {
    fn new(value: String) -> Self {
        Self { value }
    }
}
impl fmt::Display for ParseExplorationStrategyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid value '{}' [possible values: bfs, dfs]",
            self.value
        )
    }
}
impl std::error::Error for ParseExplorationStrategyError {}

impl FromStr for ExplorationStrategy {
    type Err = ParseExplorationStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::VARIANTS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, strategy)| *strategy)
            .ok_or_else(|| ParseExplorationStrategyError::new(s.to_owned()))
    }
}

/// Options for the translation of a formula into a Büchi automaton.
///
/// Every combination of options yields an automaton with the same language,
/// the options only influence the size of the result and the time spent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOptions {
    /// Apply the algebraic rewrite rules to the formula before
    /// the automaton construction.
    ///
    /// If disabled, the formula is only brought into negation normal form.
    pub formula_simplification: bool,
    /// Apply the a-posteriori simplifications of the alternating,
    /// generalized Büchi and Büchi automata.
    pub automata_simplification: bool,
    /// Detect redundant transitions and equivalent states while
    /// transitions are generated.
    pub on_the_fly_simplification: bool,
    /// Relax the acceptance bookkeeping within strongly connected components.
    pub scc_simplification: bool,
    /// The exploration strategy for the work lists.
    pub exploration_strategy: ExplorationStrategy,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        TranslationOptions {
            formula_simplification: true,
            automata_simplification: true,
            on_the_fly_simplification: true,
            scc_simplification: true,
            exploration_strategy: ExplorationStrategy::default(),
        }
    }
}

impl TranslationOptions {
    /// Options with every simplification turned off.
    pub fn unsimplified() -> Self {
        TranslationOptions {
            formula_simplification: false,
            automata_simplification: false,
            on_the_fly_simplification: false,
            scc_simplification: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exploration_strategy() {
        assert_eq!("bfs".parse(), Ok(ExplorationStrategy::Bfs));
        assert_eq!("DFS".parse(), Ok(ExplorationStrategy::Dfs));
        let err = "random".parse::<ExplorationStrategy>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value 'random' [possible values: bfs, dfs]"
        );
        assert_eq!(ExplorationStrategy::Dfs.to_string(), "dfs");
    }

    #[test]
    fn test_unsimplified_keeps_strategy() {
        let options = TranslationOptions::unsimplified();
        assert!(!options.formula_simplification);
        assert!(!options.scc_simplification);
        assert_eq!(options.exploration_strategy, ExplorationStrategy::Bfs);
    }
}
