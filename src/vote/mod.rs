//! Multi-frame vote confirmation
//!
//! A [`VoteConfirmer`] keeps the last N per-frame readings of one stream and
//! confirms a code once it fills enough of the window. Repeated confirmations
//! of the same code are held back for a debounce interval.
//!
//! One confirmer belongs to one stream and its `observe` calls must arrive in
//! frame order. Use [`ConfirmerHandle`] when several producers feed one stream.

mod handle;

pub use handle::ConfirmerHandle;

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::VoteConfig;
use crate::error::ConfigError;

/// One frame's reading. `code == None` marks a frame without a code.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionSample {
    pub code: Option<String>,
    pub confidence: f32,
    pub timestamp: Instant,
}

/// A code that won the vote
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedResult {
    pub code: String,
    /// Mean confidence of the winning code's samples
    pub confidence: f32,
    /// Number of window entries carrying the winning code
    pub votes: usize,
    /// `votes / window_size`
    pub ratio: f32,
}

/// Why an observation did not confirm anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingReason {
    /// The window is not full yet
    ColdStart,
    /// The window holds only empty markers
    NoVotes,
    /// The leading code does not fill enough of the window
    BelowThreshold,
    /// The leading code was confirmed too recently
    Debounced,
}

/// Outcome of one observation
#[derive(Debug, Clone, PartialEq)]
pub enum VoteDecision {
    Pending(PendingReason),
    Confirmed(ConfirmedResult),
}

impl VoteDecision {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, VoteDecision::Confirmed(_))
    }

    pub fn confirmed(&self) -> Option<&ConfirmedResult> {
        match self {
            VoteDecision::Confirmed(result) => Some(result),
            VoteDecision::Pending(_) => None,
        }
    }
}

/// Votes for one code in the current window
#[derive(Debug, Clone, PartialEq)]
pub struct VoteTally {
    pub code: String,
    pub count: usize,
    pub mean_confidence: f32,
}

/// Read-only snapshot of a confirmer
#[derive(Debug, Clone, PartialEq)]
pub struct VoteStats {
    pub window_size: usize,
    pub occupancy: usize,
    /// Tally per code, ordered by code
    pub tally: Vec<VoteTally>,
    pub last_confirmed: Option<String>,
    pub last_confirmed_at: Option<Instant>,
}

#[derive(Debug, Clone, Default)]
struct ConfirmationState {
    code: Option<String>,
    at: Option<Instant>,
}

/// Sliding-window majority vote with debounce, for one stream
#[derive(Debug, Clone)]
pub struct VoteConfirmer {
    window_size: usize,
    threshold: f32,
    debounce: Duration,
    window: VecDeque<RecognitionSample>,
    state: ConfirmationState,
}

impl VoteConfirmer {
    pub fn new(config: &VoteConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        info!(
            "Vote confirmer ready (window: {}, threshold: {:.0}%, debounce: {:?})",
            config.window_size,
            config.threshold * 100.0,
            config.debounce()
        );

        Ok(Self {
            window_size: config.window_size,
            threshold: config.threshold,
            debounce: config.debounce(),
            window: VecDeque::with_capacity(config.window_size),
            state: ConfirmationState::default(),
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Record one frame's reading taken at `now` and decide.
    ///
    /// An absent or empty `code` is recorded as an empty marker.
    pub fn observe(&mut self, code: Option<&str>, confidence: f32, now: Instant) -> VoteDecision {
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(RecognitionSample {
            code: code.filter(|c| !c.is_empty()).map(str::to_string),
            confidence,
            timestamp: now,
        });

        if self.window.len() < self.window_size {
            return VoteDecision::Pending(PendingReason::ColdStart);
        }

        let tally = self.tally();
        let Some(winner) = leader(&tally) else {
            return VoteDecision::Pending(PendingReason::NoVotes);
        };

        let ratio = winner.count as f32 / self.window_size as f32;
        if ratio < self.threshold {
            return VoteDecision::Pending(PendingReason::BelowThreshold);
        }

        if let (Some(last_code), Some(last_at)) = (&self.state.code, self.state.at) {
            if *last_code == winner.code && now.saturating_duration_since(last_at) < self.debounce {
                debug!("Confirmation of {} debounced", winner.code);
                return VoteDecision::Pending(PendingReason::Debounced);
            }
        }

        self.state.code = Some(winner.code.clone());
        self.state.at = Some(now);

        info!(
            "Confirmed code {} (votes: {}/{}, confidence: {:.1}%)",
            winner.code,
            winner.count,
            self.window_size,
            winner.mean_confidence * 100.0
        );

        VoteDecision::Confirmed(ConfirmedResult {
            code: winner.code.clone(),
            confidence: winner.mean_confidence,
            votes: winner.count,
            ratio,
        })
    }

    /// Forget the window and the last confirmation
    pub fn reset(&mut self) {
        self.window.clear();
        self.state = ConfirmationState::default();
        info!("Vote confirmer reset");
    }

    pub fn stats(&self) -> VoteStats {
        VoteStats {
            window_size: self.window_size,
            occupancy: self.window.len(),
            tally: self.tally(),
            last_confirmed: self.state.code.clone(),
            last_confirmed_at: self.state.at,
        }
    }

    fn tally(&self) -> Vec<VoteTally> {
        let mut votes: BTreeMap<&str, (usize, f32)> = BTreeMap::new();
        for sample in &self.window {
            if let Some(code) = &sample.code {
                let entry = votes.entry(code.as_str()).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += sample.confidence;
            }
        }

        votes
            .into_iter()
            .map(|(code, (count, total))| VoteTally {
                code: code.to_string(),
                count,
                mean_confidence: total / count as f32,
            })
            .collect()
    }
}

/// Highest count wins; ties go to the lexicographically smallest code
fn leader(tally: &[VoteTally]) -> Option<&VoteTally> {
    // `tally` is ordered by code, so keeping the first maximum breaks ties
    tally.iter().fold(None, |best: Option<&VoteTally>, t| match best {
        Some(b) if b.count >= t.count => Some(b),
        _ => Some(t),
    })
}
