//! Result aggregation
//!
//! Aggregates are always recomputed from the full outcome list of one batch.
//! Denominators are the number of outcomes actually recorded, which is less
//! than the requested trial count when a batch was cancelled.

use serde::{Deserialize, Serialize};

use crate::combat::TrialOutcome;

/// PvP tally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaTally {
    pub wins: usize,
    pub trials: usize,
}

impl ArenaTally {
    /// Wins over completed trials; `None` when no trial completed
    pub fn win_rate(&self) -> Option<f64> {
        if self.trials == 0 {
            None
        } else {
            Some(self.wins as f64 / self.trials as f64)
        }
    }
}

/// PvE tally over tiers `0..=max_tier`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTally {
    exact: Vec<usize>,
    trials: usize,
}

impl StageTally {
    pub fn new(max_tier: u8) -> Self {
        Self {
            exact: vec![0; usize::from(max_tier) + 1],
            trials: 0,
        }
    }

    pub fn trials(&self) -> usize {
        self.trials
    }

    pub fn max_tier(&self) -> u8 {
        u8::try_from(self.exact.len() - 1).unwrap_or(u8::MAX)
    }

    /// Trials that ended exactly at `tier`
    pub fn exact(&self, tier: u8) -> usize {
        self.exact.get(usize::from(tier)).copied().unwrap_or(0)
    }

    pub fn exact_counts(&self) -> &[usize] {
        &self.exact
    }

    /// Trials that reached `tier` or better
    pub fn at_least(&self, tier: u8) -> usize {
        self.exact.iter().skip(usize::from(tier)).sum()
    }

    /// `at_least` for every tier, indexed by tier
    pub fn cumulative(&self) -> Vec<usize> {
        let mut running = 0;
        let mut counts: Vec<usize> = self
            .exact
            .iter()
            .rev()
            .map(|n| {
                running += n;
                running
            })
            .collect();
        counts.reverse();
        counts
    }

    /// Sum of tiers over all trials (one star per cleared wave)
    pub fn total_stars(&self) -> usize {
        self.exact
            .iter()
            .enumerate()
            .map(|(tier, n)| tier * n)
            .sum()
    }

    /// Share of trials that cleared every wave
    pub fn clear_rate(&self) -> Option<f64> {
        if self.trials == 0 {
            None
        } else {
            Some(self.at_least(self.max_tier()) as f64 / self.trials as f64)
        }
    }
}

/// Aggregate of one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AggregateResult {
    Arena(ArenaTally),
    Stage(StageTally),
}

impl AggregateResult {
    /// Number of trials the aggregate covers
    pub fn trials(&self) -> usize {
        match self {
            AggregateResult::Arena(t) => t.trials,
            AggregateResult::Stage(t) => t.trials,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn summary(&self) -> String {
        match self {
            AggregateResult::Arena(t) => format!(
                "{} trials, {} wins, win rate {}",
                t.trials,
                t.wins,
                format_rate(t.win_rate())
            ),
            AggregateResult::Stage(t) => {
                let tiers: Vec<String> = (0..=t.max_tier())
                    .map(|tier| {
                        let label = if tier == 0 {
                            "Fail".to_string()
                        } else {
                            "★".repeat(usize::from(tier))
                        };
                        format!("{}: {}", label, t.exact(tier))
                    })
                    .collect();
                format!(
                    "{}\nTotal Stars: {}\nWin Rate: {}",
                    tiers.join("  "),
                    t.total_stars(),
                    format_rate(t.clear_rate())
                )
            }
        }
    }
}

fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{:.2}%", r * 100.0),
        None => "n/a".into(),
    }
}

/// What kind of outcomes a batch produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Arena,
    Stage { max_tier: u8 },
}

pub fn aggregate_arena(outcomes: &[bool]) -> ArenaTally {
    ArenaTally {
        wins: outcomes.iter().filter(|win| **win).count(),
        trials: outcomes.len(),
    }
}

/// Tiers above `max_tier` widen the tally rather than being lost
pub fn aggregate_stage(outcomes: &[u8], max_tier: u8) -> StageTally {
    let top = outcomes.iter().copied().max().unwrap_or(0).max(max_tier);
    let mut tally = StageTally::new(top);
    for tier in outcomes {
        tally.exact[usize::from(*tier)] += 1;
    }
    tally.trials = outcomes.len();
    tally
}

/// Reduce the outcomes of a batch. Outcomes of the other kind are ignored.
pub fn aggregate(outcomes: &[TrialOutcome], kind: OutcomeKind) -> AggregateResult {
    match kind {
        OutcomeKind::Arena => {
            let wins: Vec<bool> = outcomes
                .iter()
                .filter_map(|o| match o {
                    TrialOutcome::Arena { win } => Some(*win),
                    TrialOutcome::Stage { .. } => None,
                })
                .collect();
            AggregateResult::Arena(aggregate_arena(&wins))
        }
        OutcomeKind::Stage { max_tier } => {
            let tiers: Vec<u8> = outcomes
                .iter()
                .filter_map(|o| match o {
                    TrialOutcome::Stage { tier } => Some(*tier),
                    TrialOutcome::Arena { .. } => None,
                })
                .collect();
            AggregateResult::Stage(aggregate_stage(&tiers, max_tier))
        }
    }
}
