// ── Multi-rate scheduler ──
//
// Three collection tiers firing at independent cadences from one polling
// loop. Each tier's next fire is anchored to its own last actual fire
// time, not a fixed grid, so rounding never accumulates into drift and
// firing one tier never resets another. The loop sleeps a short quantum
// between polls to bound CPU without busy-waiting.

use std::time::Duration;

use tokio::time::Instant;

/// Poll quantum of the collection loop.
pub const QUANTUM: Duration = Duration::from_millis(100);

/// Wall-time period between periodic statistics log lines, independent
/// of the tier timers.
pub const STATS_LOG_PERIOD: Duration = Duration::from_secs(300);

/// Collection cadence tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Fast,
    Normal,
    Slow,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Fast, Tier::Normal, Tier::Slow];
}

/// Per-tier intervals, in seconds-resolution wall time.
#[derive(Debug, Clone, Copy)]
pub struct TierIntervals {
    pub fast: Duration,
    pub normal: Duration,
    pub slow: Duration,
}

impl TierIntervals {
    fn get(&self, tier: Tier) -> Duration {
        match tier {
            Tier::Fast => self.fast,
            Tier::Normal => self.normal,
            Tier::Slow => self.slow,
        }
    }
}

/// Tracks, per tier, when it last fired; `due` returns every tier whose
/// interval has elapsed and re-anchors those tiers to `now`.
#[derive(Debug)]
pub struct MultiRateScheduler {
    intervals: TierIntervals,
    last_fire: [Option<Instant>; 3],
}

impl MultiRateScheduler {
    pub fn new(intervals: TierIntervals) -> Self {
        Self {
            intervals,
            last_fire: [None; 3],
        }
    }

    /// Tiers due at `now`. Every tier fires on the first poll.
    pub fn due(&mut self, now: Instant) -> Vec<Tier> {
        let mut due = Vec::new();
        for (slot, tier) in self.last_fire.iter_mut().zip(Tier::ALL) {
            let ready = match *slot {
                None => true,
                Some(last) => now.duration_since(last) >= self.intervals.get(tier),
            };
            if ready {
                *slot = Some(now);
                due.push(tier);
            }
        }
        due
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn intervals(fast: u64, normal: u64, slow: u64) -> TierIntervals {
        TierIntervals {
            fast: Duration::from_secs(fast),
            normal: Duration::from_secs(normal),
            slow: Duration::from_secs(slow),
        }
    }

    /// Simulate a polling loop under the paused clock and count fires per
    /// tier: each must track its own cadence with no cross-tier drift.
    #[tokio::test(start_paused = true)]
    async fn tiers_fire_at_independent_cadences() {
        let mut scheduler = MultiRateScheduler::new(intervals(1, 5, 30));
        let mut fired = [0_u32; 3];

        // First poll primes all tiers; excluded from the cadence counts.
        scheduler.due(Instant::now());

        let simulated = Duration::from_secs(60);
        let steps = u32::try_from(simulated.as_millis() / QUANTUM.as_millis()).unwrap();
        for _ in 0..steps {
            tokio::time::advance(QUANTUM).await;
            for tier in scheduler.due(Instant::now()) {
                match tier {
                    Tier::Fast => fired[0] += 1,
                    Tier::Normal => fired[1] += 1,
                    Tier::Slow => fired[2] += 1,
                }
            }
        }

        assert_eq!(fired[0], 60);
        assert_eq!(fired[1], 12);
        assert_eq!(fired[2], 2);
    }

    #[tokio::test(start_paused = true)]
    async fn firing_one_tier_does_not_reset_another() {
        let mut scheduler = MultiRateScheduler::new(intervals(1, 3, 100));
        scheduler.due(Instant::now());

        // 2.9s in: fast has fired twice, normal not yet.
        tokio::time::advance(Duration::from_millis(2_900)).await;
        let due = scheduler.due(Instant::now());
        assert!(due.contains(&Tier::Fast));
        assert!(!due.contains(&Tier::Normal));

        // 0.1s later normal reaches its own 3s anchor, regardless of how
        // often fast fired in between.
        tokio::time::advance(Duration::from_millis(100)).await;
        let due = scheduler.due(Instant::now());
        assert!(due.contains(&Tier::Normal));
    }

    #[tokio::test(start_paused = true)]
    async fn anchors_track_actual_fire_times() {
        let mut scheduler = MultiRateScheduler::new(intervals(2, 50, 100));
        scheduler.due(Instant::now());

        // A late poll (3s instead of 2s) fires once, and the next fire is
        // anchored to the late poll — not the original grid.
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(scheduler.due(Instant::now()).contains(&Tier::Fast));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!scheduler.due(Instant::now()).contains(&Tier::Fast));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(scheduler.due(Instant::now()).contains(&Tier::Fast));
    }
}
