//! Consecutive-observation debounce
//!
//! A new value is committed only after it has been observed on `required`
//! consecutive observations. Used for stage transitions (frames) and for
//! exercise switching (classification windows).

use super::Stage;
use crate::config::ThresholdPair;

#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    required: usize,
    candidate: Option<T>,
    streak: usize,
}

impl<T: Copy + PartialEq> Debouncer<T> {
    pub fn new(required: usize) -> Self {
        Self {
            required: required.max(1),
            candidate: None,
            streak: 0,
        }
    }

    /// Feed one observation. Returns the committed value when the streak
    /// reaches `required`.
    ///
    /// `None` (no opinion) and observations equal to `current` break the
    /// streak.
    pub fn observe(&mut self, current: Option<T>, observed: Option<T>) -> Option<T> {
        let observed = match observed {
            Some(v) if Some(v) != current => v,
            _ => {
                self.reset();
                return None;
            }
        };

        if self.candidate == Some(observed) {
            self.streak += 1;
        } else {
            self.candidate = Some(observed);
            self.streak = 1;
        }

        if self.streak >= self.required {
            self.reset();
            Some(observed)
        } else {
            None
        }
    }

    /// Pending candidate and how many times it has been seen in a row
    pub fn pending(&self) -> Option<(T, usize)> {
        self.candidate.map(|c| (c, self.streak))
    }

    pub fn required(&self) -> usize {
        self.required
    }

    pub fn reset(&mut self) {
        self.candidate = None;
        self.streak = 0;
    }
}

/// Which side of the thresholds an angle sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Extended,
    Flexed,
}

impl Zone {
    /// `None` between the two thresholds
    pub fn of(angle: f32, thresholds: ThresholdPair) -> Option<Self> {
        if angle >= thresholds.extended {
            Some(Zone::Extended)
        } else if angle <= thresholds.flexed {
            Some(Zone::Flexed)
        } else {
            None
        }
    }
}

/// A committed stage change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Stage,
    pub to: Stage,
}

impl Transition {
    /// The counting edge
    pub fn completes_rep(&self) -> bool {
        self.from == Stage::Down && self.to == Stage::Up
    }
}

/// Debounced stage for one angle signal
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    stage: Stage,
    up_zone: Zone,
    thresholds: ThresholdPair,
    debouncer: Debouncer<Stage>,
}

impl PhaseTracker {
    pub fn new(thresholds: ThresholdPair, up_zone: Zone, hysteresis_frames: usize) -> Self {
        Self {
            stage: Stage::Waiting,
            up_zone,
            thresholds,
            debouncer: Debouncer::new(hysteresis_frames),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Feed one valid angle. Frames without a usable angle must not be fed.
    pub fn observe(&mut self, angle: f32) -> Option<Transition> {
        let observed = Zone::of(angle, self.thresholds).map(|zone| {
            if zone == self.up_zone {
                Stage::Up
            } else {
                Stage::Down
            }
        });
        let to = self.debouncer.observe(Some(self.stage), observed)?;
        let from = std::mem::replace(&mut self.stage, to);
        Some(Transition { from, to })
    }

    pub fn reset(&mut self) {
        self.stage = Stage::Waiting;
        self.debouncer.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commits_after_required() {
        let mut d = Debouncer::new(3);
        assert_eq!(d.observe(Some(0), Some(1)), None);
        assert_eq!(d.observe(Some(0), Some(1)), None);
        assert_eq!(d.pending(), Some((1, 2)));
        assert_eq!(d.observe(Some(0), Some(1)), Some(1));
        assert_eq!(d.pending(), None);
    }

    #[test]
    fn test_interrupted_streak_restarts() {
        let mut d = Debouncer::new(2);
        assert_eq!(d.observe(Some(0), Some(1)), None);
        assert_eq!(d.observe(Some(0), Some(2)), None);
        assert_eq!(d.pending(), Some((2, 1)));
        assert_eq!(d.observe(Some(0), None), None);
        assert_eq!(d.pending(), None);
        assert_eq!(d.observe(Some(0), Some(1)), None);
        assert_eq!(d.observe(Some(0), Some(1)), Some(1));
    }

    #[test]
    fn test_observing_current_breaks_streak() {
        let mut d = Debouncer::new(2);
        d.observe(Some(0), Some(1));
        assert_eq!(d.observe(Some(0), Some(0)), None);
        assert_eq!(d.observe(Some(0), Some(1)), None);
    }

    #[test]
    fn test_from_nothing() {
        let mut d: Debouncer<u8> = Debouncer::new(1);
        assert_eq!(d.observe(None, Some(4)), Some(4));
        assert_eq!(d.observe(Some(4), Some(4)), None);
    }

    #[test]
    fn test_zone() {
        let t = ThresholdPair::new(160.0, 40.0);
        assert_eq!(Zone::of(170.0, t), Some(Zone::Extended));
        assert_eq!(Zone::of(160.0, t), Some(Zone::Extended));
        assert_eq!(Zone::of(100.0, t), None);
        assert_eq!(Zone::of(40.0, t), Some(Zone::Flexed));
        assert_eq!(Zone::of(10.0, t), Some(Zone::Flexed));
    }

    #[test]
    fn test_phase_tracker_cycle() {
        let mut p = PhaseTracker::new(ThresholdPair::new(160.0, 90.0), Zone::Extended, 2);
        assert_eq!(p.observe(170.0), None);
        assert_eq!(
            p.observe(170.0),
            Some(Transition { from: Stage::Waiting, to: Stage::Up })
        );
        p.observe(80.0);
        let t = p.observe(80.0).unwrap();
        assert_eq!(t.to, Stage::Down);
        assert!(!t.completes_rep());
        p.observe(175.0);
        let t = p.observe(175.0).unwrap();
        assert!(t.completes_rep());
        assert_eq!(p.stage(), Stage::Up);
    }
}
