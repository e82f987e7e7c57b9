//! Trial execution
//!
//! Each trial gets its own `ChaCha8Rng` seeded from the batch's base seed and
//! the trial index; no two trials of a batch share a seed. Batches are
//! compute-bound and run on whatever thread calls `run_batch` (normally a
//! blocking worker), in order or across rayon workers.

use std::num::NonZeroU32;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combat::{CombatResolver, Opponent, TrialInput, TrialOutcome};
use crate::core::error::{ForecastError, Result};
use crate::simulation::aggregate::{aggregate, AggregateResult, OutcomeKind};
use crate::simulation::control::BatchControl;

/// A validated, positive trial count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialCount(NonZeroU32);

impl TrialCount {
    /// Reject zero, negative and out-of-range counts before any work starts
    pub fn new(count: i64) -> Result<Self> {
        u32::try_from(count)
            .ok()
            .and_then(NonZeroU32::new)
            .map(TrialCount)
            .ok_or(ForecastError::InvalidTrialCount(count))
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

/// Where a batch's base seed comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedPolicy {
    /// Fresh base seed from OS entropy for every batch
    #[default]
    Entropy,
    /// Fixed base seed; the batch replays the same outcome sequence
    Replay(u64),
}

impl SeedPolicy {
    pub fn base_seed(&self) -> u64 {
        match self {
            SeedPolicy::Entropy => rand::rngs::OsRng.next_u64(),
            SeedPolicy::Replay(seed) => *seed,
        }
    }
}

/// Seed of trial `index`. splitmix64 is a bijection, so distinct indices
/// under one base never collide.
pub fn trial_seed(base: u64, index: u64) -> u64 {
    let mut z = base.wrapping_add(index).wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Outcome of a finished (or cancelled) batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub result: AggregateResult,
    pub requested: u32,
    pub cancelled: bool,
    pub base_seed: u64,
}

impl BatchReport {
    /// Report for a batch cancelled while its input was still being
    /// assembled; no trial ran
    pub fn cancelled_before_start(requested: u32, kind: OutcomeKind, base_seed: u64) -> Self {
        Self {
            result: aggregate(&[], kind),
            requested,
            cancelled: true,
            base_seed,
        }
    }

    pub fn completed(&self) -> usize {
        self.result.trials()
    }
}

/// Run a single trial with its own random source
pub fn run_one<R: CombatResolver + ?Sized>(
    resolver: &R,
    input: &TrialInput,
    rng: &mut dyn RngCore,
) -> Result<TrialOutcome> {
    match &input.opponent {
        Opponent::Avatar { digest, effects } => {
            let win = resolver.resolve_arena(
                &input.me,
                digest,
                &input.sheets,
                &input.my_effects,
                effects,
                &input.game_config,
                rng,
            )?;
            Ok(TrialOutcome::Arena { win })
        }
        Opponent::Stage(stage) => {
            let tier = resolver.resolve_stage(
                &input.me,
                stage,
                &input.sheets,
                &input.my_effects,
                &input.game_config,
                rng,
            )?;
            Ok(TrialOutcome::Stage { tier })
        }
    }
}

fn outcome_kind(input: &TrialInput) -> OutcomeKind {
    if input.is_arena() {
        OutcomeKind::Arena
    } else {
        OutcomeKind::Stage {
            max_tier: input.max_tier(),
        }
    }
}

fn run_trial<R: CombatResolver + ?Sized>(
    resolver: &R,
    input: &TrialInput,
    base_seed: u64,
    index: u64,
) -> Result<TrialOutcome> {
    let mut rng = ChaCha8Rng::seed_from_u64(trial_seed(base_seed, index));
    run_one(resolver, input, &mut rng)
}

/// Run `trial_count` trials and aggregate what completed.
///
/// Cancellation is checked before each trial; a cancelled batch still
/// returns an aggregate over the trials that finished. A resolver error
/// fails the whole batch.
pub fn run_batch<R: CombatResolver + ?Sized>(
    trial_count: TrialCount,
    input: &TrialInput,
    resolver: &R,
    seeds: SeedPolicy,
    parallel_threshold: u32,
    control: &BatchControl,
) -> Result<BatchReport> {
    let total = trial_count.get();
    let base_seed = seeds.base_seed();
    let kind = outcome_kind(input);

    control.mark_started(total);
    tracing::info!(trials = total, base_seed, parallel = total >= parallel_threshold, "batch started");

    let outcomes: Vec<TrialOutcome> = if total >= parallel_threshold {
        // Collecting into a Result stops handing out trials after the first error
        (0..u64::from(total))
            .into_par_iter()
            .filter_map(|index| {
                if control.is_cancelled() {
                    return None;
                }
                let outcome = run_trial(resolver, input, base_seed, index);
                if outcome.is_ok() {
                    control.record_completion();
                }
                Some(outcome)
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        let mut outcomes = Vec::with_capacity(total as usize);
        for index in 0..u64::from(total) {
            if control.is_cancelled() {
                break;
            }
            outcomes.push(run_trial(resolver, input, base_seed, index)?);
            control.record_completion();
        }
        outcomes
    };

    let cancelled = outcomes.len() < total as usize;
    let result = aggregate(&outcomes, kind);
    tracing::info!(completed = outcomes.len(), cancelled, "batch finished");

    Ok(BatchReport {
        result,
        requested: total,
        cancelled,
        base_seed,
    })
}
