//! Temporal smoothing of live classifications
//!
//! ## State Machine
//!
//! ```text
//!            push (count < threshold)
//!              ┌──────┐
//!              ▼      │
//!  reset ──► Warming ─┘ ── push (count reaches threshold) ──► Stable ◄─┐
//!              ▲                                                │     │
//!              └──────────────────── reset ─────────────────────┘     │
//!                                                              push ──┘
//! ```
//!
//! - **Warming**: `current()` passes the latest raw result through unchanged,
//!   so feedback is not withheld at the start of a session.
//! - **Stable**: `current()` returns the highest-confidence entry in the
//!   window. On equal confidence the most recently inserted entry wins.
//!
//! The vote is over confidence, not label frequency: one strong reading
//! outweighs a burst of weaker alternates, which suits static gestures that
//! should snap to a confident reading.
//!
//! ## Recency decay
//!
//! With `recency_decay = Some(d)` the Stable selection ranks entries by
//! `confidence * d^age` (age 0 = newest) instead, so a stale peak fades out.
//! The reported confidence is always the entry's own, unweighted value.

use serde::{Deserialize, Serialize};

use crate::classifier::ClassificationResult;
use crate::errors::{PipelineError, PipelineResult};
use crate::labels::GestureLabel;
use crate::window::{SmoothingWindow, MAX_WINDOW_CAPACITY};

/// Smoother tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmootherConfig {
    /// Window capacity W
    pub window_capacity: usize,
    /// Pushes since reset required to leave Warming
    pub warm_threshold: usize,
    /// Optional per-step decay applied when ranking entries, in (0, 1]
    pub recency_decay: Option<f32>,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            window_capacity: 7,
            warm_threshold: 3,
            recency_decay: None,
        }
    }
}

impl SmootherConfig {
    /// Check ranges
    pub fn validate(&self) -> PipelineResult<()> {
        if self.window_capacity == 0 || self.window_capacity > MAX_WINDOW_CAPACITY {
            return Err(PipelineError::InvalidConfig(format!(
                "smoother.window_capacity must be in 1..={MAX_WINDOW_CAPACITY}, got {}",
                self.window_capacity
            )));
        }
        if self.warm_threshold == 0 || self.warm_threshold > self.window_capacity {
            return Err(PipelineError::InvalidConfig(format!(
                "smoother.warm_threshold must be in 1..={}, got {}",
                self.window_capacity, self.warm_threshold
            )));
        }
        if let Some(decay) = self.recency_decay {
            if !(decay > 0.0 && decay <= 1.0) {
                return Err(PipelineError::InvalidConfig(format!(
                    "smoother.recency_decay must be in (0, 1], got {decay}"
                )));
            }
        }
        Ok(())
    }
}

/// Operational state of the smoother
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmootherState {
    /// Fewer pushes than the warm threshold since the last reset
    Warming,
    /// Window is warm, selection is a confidence vote
    Stable,
}

/// Stabilized prediction exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedPrediction {
    /// Letter shown to the user
    pub label: GestureLabel,
    /// Confidence of the window entry that won the vote
    pub confidence: f32,
    /// State that produced this prediction
    pub state: SmootherState,
}

impl SmoothedPrediction {
    /// Label and confidence without the state
    pub fn result(&self) -> ClassificationResult {
        ClassificationResult::new(self.label, self.confidence)
    }
}

/// Max-confidence vote over a trailing window
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    window: SmoothingWindow,
    config: SmootherConfig,
    pushes_since_reset: usize,
    state: SmootherState,
}

impl TemporalSmoother {
    /// Empty smoother; fails on an invalid config
    pub fn new(config: SmootherConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self {
            window: SmoothingWindow::new(config.window_capacity)?,
            config,
            pushes_since_reset: 0,
            state: SmootherState::Warming,
        })
    }

    /// Add the latest raw classification
    pub fn push(&mut self, result: ClassificationResult) {
        self.window.push(result);
        self.pushes_since_reset = self.pushes_since_reset.saturating_add(1);

        if self.state == SmootherState::Warming
            && self.pushes_since_reset >= self.config.warm_threshold
        {
            self.state = SmootherState::Stable;
        }
    }

    /// Current stabilized prediction, `None` before the first push
    pub fn current(&self) -> Option<SmoothedPrediction> {
        let selected = match self.state {
            SmootherState::Warming => self.window.latest().copied(),
            SmootherState::Stable => self.vote(),
        }?;

        Some(SmoothedPrediction {
            label: selected.label,
            confidence: selected.confidence,
            state: self.state,
        })
    }

    /// Push and return the resulting prediction
    pub fn update(&mut self, result: ClassificationResult) -> SmoothedPrediction {
        self.push(result);
        // A push always leaves at least one entry in the window
        self.current().unwrap_or(SmoothedPrediction {
            label: result.label,
            confidence: result.confidence,
            state: self.state,
        })
    }

    /// Clear the window and return to Warming; call at every session start
    pub fn reset(&mut self) {
        self.window.clear();
        self.pushes_since_reset = 0;
        self.state = SmootherState::Warming;
    }

    /// Warming or stable
    pub fn state(&self) -> SmootherState {
        self.state
    }

    /// Recent predictions, oldest first
    pub fn window(&self) -> &SmoothingWindow {
        &self.window
    }

    /// Active configuration
    pub fn config(&self) -> &SmootherConfig {
        &self.config
    }

    /// Highest (optionally decayed) confidence; `>=` while scanning oldest to
    /// newest lets later entries win ties
    fn vote(&self) -> Option<ClassificationResult> {
        let newest = self.window.len().checked_sub(1)?;
        let mut best: Option<(f32, ClassificationResult)> = None;

        for (i, entry) in self.window.iter().enumerate() {
            let score = match self.config.recency_decay {
                Some(decay) => entry.confidence * decay.powi((newest - i) as i32),
                None => entry.confidence,
            };
            match best {
                Some((best_score, _)) if score < best_score => {}
                _ => best = Some((score, *entry)),
            }
        }

        best.map(|(_, entry)| entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(c: char, confidence: f32) -> ClassificationResult {
        ClassificationResult::new(GestureLabel::from_char(c).unwrap(), confidence)
    }

    fn smoother(capacity: usize, threshold: usize) -> TemporalSmoother {
        TemporalSmoother::new(SmootherConfig {
            window_capacity: capacity,
            warm_threshold: threshold,
            recency_decay: None,
        })
        .unwrap()
    }

    #[test]
    fn empty_smoother_has_no_prediction() {
        let s = smoother(5, 3);
        assert!(s.current().is_none());
        assert_eq!(s.state(), SmootherState::Warming);
    }

    #[test]
    fn confidence_vote_scenario() {
        let mut s = smoother(5, 3);
        let inputs = [
            result('A', 0.90),
            result('B', 0.30),
            result('A', 0.95),
            result('C', 0.20),
            result('A', 0.99),
        ];

        s.push(inputs[0]);
        s.push(inputs[1]);
        let warming = s.current().unwrap();
        assert_eq!(warming.state, SmootherState::Warming);
        assert_eq!(warming.label.as_char(), 'B');
        assert_eq!(warming.confidence, 0.30);

        for r in &inputs[2..] {
            s.push(*r);
        }
        let stable = s.current().unwrap();
        assert_eq!(stable.state, SmootherState::Stable);
        assert_eq!(stable.label.as_char(), 'A');
        assert_eq!(stable.confidence, 0.99);
    }

    #[test]
    fn becomes_stable_at_threshold() {
        let mut s = smoother(5, 3);
        s.push(result('A', 0.9));
        s.push(result('B', 0.1));
        assert_eq!(s.state(), SmootherState::Warming);

        s.push(result('C', 0.2));
        assert_eq!(s.state(), SmootherState::Stable);
        // Stable now votes: the 0.9 entry wins over the raw latest
        assert_eq!(s.current().unwrap().label.as_char(), 'A');
    }

    #[test]
    fn ties_prefer_most_recent() {
        let mut s = smoother(5, 1);
        s.push(result('A', 0.8));
        s.push(result('B', 0.8));
        s.push(result('C', 0.5));
        assert_eq!(s.current().unwrap().label.as_char(), 'B');
    }

    #[test]
    fn evicted_peak_is_forgotten() {
        let mut s = smoother(3, 1);
        s.push(result('A', 0.99));
        for _ in 0..3 {
            s.push(result('B', 0.6));
        }
        let current = s.current().unwrap();
        assert_eq!(current.label.as_char(), 'B');
        assert_eq!(current.confidence, 0.6);
    }

    #[test]
    fn reset_returns_to_warming() {
        let mut s = smoother(5, 3);
        for c in ['A', 'B', 'C', 'D'] {
            s.push(result(c, 0.9));
        }
        assert_eq!(s.state(), SmootherState::Stable);

        s.reset();
        assert_eq!(s.state(), SmootherState::Warming);
        assert!(s.current().is_none());

        s.push(result('Z', 0.1));
        let current = s.current().unwrap();
        assert_eq!(current.result(), result('Z', 0.1));
        assert_eq!(current.state, SmootherState::Warming);
    }

    #[test]
    fn recency_decay_fades_stale_peak() {
        let mut s = TemporalSmoother::new(SmootherConfig {
            window_capacity: 7,
            warm_threshold: 3,
            recency_decay: Some(0.8),
        })
        .unwrap();

        s.push(result('A', 0.95));
        for _ in 0..4 {
            s.push(result('B', 0.7));
        }
        // 0.95 * 0.8^4 = 0.389 < 0.7
        let current = s.current().unwrap();
        assert_eq!(current.label.as_char(), 'B');
        assert_eq!(current.confidence, 0.7);
    }

    #[test]
    fn update_returns_current() {
        let mut s = smoother(5, 3);
        let p = s.update(result('H', 0.4));
        assert_eq!(p.label.as_char(), 'H');
        assert_eq!(p.state, SmootherState::Warming);
    }

    #[test]
    fn config_validation() {
        let mut config = SmootherConfig::default();
        assert!(config.validate().is_ok());

        config.warm_threshold = 8;
        assert!(config.validate().is_err());

        config = SmootherConfig {
            window_capacity: 17,
            ..SmootherConfig::default()
        };
        assert!(config.validate().is_err());

        config = SmootherConfig {
            recency_decay: Some(0.0),
            ..SmootherConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
