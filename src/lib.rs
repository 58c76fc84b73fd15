//! Translation of LTL formulas into nondeterministic Büchi automata
//! following the construction of Gastin and Oddoux.

pub mod ap;
pub mod bitset;
mod constructor;
pub mod error;
pub mod ltl;
pub mod nba;
pub mod options;

use std::time::Instant;

use log::{debug, info, trace};

use ap::ApSet;
use constructor::alternating::AlternatingAutomaton;
use constructor::buchi::BuchiConstructor;
use constructor::generalized::GeneralizedConstructor;
use constructor::queue::{BfsQueue, DfsQueue, ExplorationQueue};
use error::TranslationError;
use ltl::{LtlArena, LtlIndex};
use nba::Nba;
use options::{ExplorationStrategy, TranslationOptions};

pub use constructor::{StageStats, TranslationStats};

/// The automaton produced by a translation together with diagnostics.
#[derive(Debug, Clone)]
pub struct TranslationResult {
    pub nba: Nba,
    pub stats: TranslationStats,
    /// The Büchi automaton before export, as a Spin never claim.
    pub never_claim: String,
}

/// Translates the formula into an NBA with the default options.
///
/// Atomic propositions of the formula missing from `aps` are added to it,
/// and the guards of the returned automaton refer to the indices in `aps`.
pub fn translate(
    arena: &mut LtlArena,
    formula: LtlIndex,
    aps: &mut ApSet,
) -> Result<Nba, TranslationError> {
    translate_with(arena, formula, aps, &TranslationOptions::default()).map(|result| result.nba)
}

pub fn translate_with(
    arena: &mut LtlArena,
    formula: LtlIndex,
    aps: &mut ApSet,
    options: &TranslationOptions,
) -> Result<TranslationResult, TranslationError> {
    info!("Creating alternating automaton");
    let start = Instant::now();
    let alternating = AlternatingAutomaton::new(arena, formula, aps, options)?;
    let alternating_stats = constructor::StageStats::new(
        alternating.num_states(),
        alternating.num_transitions(),
        start.elapsed(),
    );
    debug!("Alternating automaton: {}", alternating_stats);
    trace!("Alternating automaton:\n{}", alternating);

    match options.exploration_strategy {
        ExplorationStrategy::Bfs => explore_with(
            &alternating,
            alternating_stats,
            BfsQueue::with_capacity(4096),
            BfsQueue::with_capacity(4096),
            options,
        ),
        ExplorationStrategy::Dfs => explore_with(
            &alternating,
            alternating_stats,
            DfsQueue::with_capacity(4096),
            DfsQueue::with_capacity(4096),
            options,
        ),
    }
}

fn explore_with<G: ExplorationQueue<usize>, B: ExplorationQueue<usize>>(
    alternating: &AlternatingAutomaton,
    alternating_stats: StageStats,
    generalized_queue: G,
    buchi_queue: B,
    options: &TranslationOptions,
) -> Result<TranslationResult, TranslationError> {
    info!("Creating generalized Buchi automaton");
    let start = Instant::now();
    let generalized =
        GeneralizedConstructor::new(alternating, generalized_queue, options).into_automaton();
    let generalized_stats = StageStats::new(
        generalized.num_states(),
        generalized.num_transitions(),
        start.elapsed(),
    );
    debug!("Generalized Buchi automaton: {}", generalized_stats);
    trace!("Generalized Buchi automaton:\n{}", generalized);

    info!("Creating Buchi automaton");
    let start = Instant::now();
    let buchi = BuchiConstructor::new(&generalized, buchi_queue, options).into_automaton();
    let buchi_stats = StageStats::new(buchi.num_states(), buchi.num_transitions(), start.elapsed());
    debug!("Buchi automaton: {}", buchi_stats);
    trace!("Buchi automaton:\n{}", buchi);

    info!("Exporting automaton");
    let nba = buchi.to_nba()?;
    let stats = TranslationStats {
        alternating: alternating_stats,
        generalized: generalized_stats,
        buchi: buchi_stats,
    };
    trace!("Stats: {}", stats);
    Ok(TranslationResult {
        nba,
        stats,
        never_claim: buchi.to_string(),
    })
}
