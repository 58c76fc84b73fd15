//! Errors of the translation procedure.

use std::fmt;

/// An error that occurred while rewriting a formula or constructing an automaton.
///
/// All errors are raised synchronously and no partial result is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// Negation was pushed into a formula whose top operator is not a negation.
    NotANegation { formula: String },
    /// An operator was encountered that is outside of the operators
    /// supported by the given stage.
    NotInNormalForm {
        operator: &'static str,
        stage: &'static str,
    },
    /// The exported automaton contains states that are not reachable
    /// from its start state.
    UnreachableStates { unreachable: usize },
}

impl TranslationError {
    pub(crate) fn not_in_normal_form(operator: &'static str, stage: &'static str) -> Self {
        TranslationError::NotInNormalForm { operator, stage }
    }
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationError::NotANegation { formula } => {
                write!(f, "can not push negation into '{}': not a negation", formula)
            }
            TranslationError::NotInNormalForm { operator, stage } => write!(
                f,
                "formula not in required normal form: operator '{}' not supported by {}",
                operator, stage
            ),
            TranslationError::UnreachableStates { unreachable } => write!(
                f,
                "automaton is disjoint: {} state(s) not reachable from the start state",
                unreachable
            ),
        }
    }
}

impl std::error::Error for TranslationError {}
