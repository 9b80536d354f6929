//! # Delay between worker incarnations.
//!
//! [`BackoffPolicy`] maps the consecutive-restart index to a delay. The three
//! recognized shapes are constructors over the same parameters:
//!
//! | shape         | constructor                       | delay for restart `n`          |
//! |---------------|-----------------------------------|--------------------------------|
//! | none          | [`BackoffPolicy::none`]           | `0`                            |
//! | fixed         | [`BackoffPolicy::fixed`]          | `first`                        |
//! | exponential   | [`BackoffPolicy::exponential`]    | `min(first × 2^n, max)`        |
//!
//! [`JitterPolicy`] then randomizes the clamped base. The base is derived from
//! `n` alone, so jitter never compounds across restarts.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use routevisor::BackoffPolicy;
//!
//! let backoff = BackoffPolicy::exponential(Duration::from_millis(100), Duration::from_secs(1));
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(3), Duration::from_millis(800));
//! assert_eq!(backoff.next(10), Duration::from_secs(1));
//! ```

use std::time::Duration;

use rand::Rng;

/// Randomization applied to a computed backoff delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Exact delay.
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// `delay/2` plus uniform in `[0, delay/2]`.
    Equal,
    /// Uniform in `[first, 3 × delay]`, capped at `max`.
    ///
    /// Needs the policy bounds, so only [`BackoffPolicy::next`] applies it;
    /// [`JitterPolicy::apply`] returns the delay unchanged.
    Decorrelated,
}

impl JitterPolicy {
    /// Applies jitter using the thread-local RNG.
    pub fn apply(&self, delay: Duration) -> Duration {
        self.apply_with(delay, &mut rand::rng())
    }

    /// Applies jitter with a caller-supplied RNG.
    pub fn apply_with<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        let ms = delay.as_millis().min(u128::from(u64::MAX)) as u64;
        match self {
            JitterPolicy::None | JitterPolicy::Decorrelated => delay,
            _ if ms == 0 => Duration::ZERO,
            JitterPolicy::Full => Duration::from_millis(rng.random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                Duration::from_millis(half + rng.random_range(0..=ms - half))
            }
        }
    }
}

/// Backoff between a fault and the next incarnation.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first restart.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Growth factor per consecutive restart (`1.0` = fixed).
    pub factor: f64,
    /// Randomization of the clamped delay.
    pub jitter: JitterPolicy,
}

impl BackoffPolicy {
    /// Restart immediately.
    pub const fn none() -> Self {
        Self {
            first: Duration::ZERO,
            max: Duration::ZERO,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Same delay before every restart.
    pub const fn fixed(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Doubling delay starting at `first`, capped at `max`.
    pub const fn exponential(first: Duration, max: Duration) -> Self {
        Self {
            first,
            max,
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Returns a policy with updated jitter.
    pub const fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before restart number `restart` (0-indexed within the current streak).
    ///
    /// Overflowing or non-finite intermediate values clamp to `max`.
    pub fn next(&self, restart: u32) -> Duration {
        let exp = restart.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        match self.jitter {
            JitterPolicy::Decorrelated => self.decorrelated(base, &mut rand::rng()),
            jitter => jitter.apply(base),
        }
    }

    fn decorrelated<R: Rng>(&self, base: Duration, rng: &mut R) -> Duration {
        let lo = self.first.min(self.max).as_millis().min(u128::from(u64::MAX)) as u64;
        let hi = base
            .saturating_mul(3)
            .min(self.max)
            .as_millis()
            .min(u128::from(u64::MAX)) as u64;
        if hi <= lo {
            return Duration::from_millis(lo);
        }
        Duration::from_millis(rng.random_range(lo..=hi))
    }
}

impl Default for BackoffPolicy {
    /// Exponential from 100ms, capped at 10s, no jitter.
    fn default() -> Self {
        Self::exponential(Duration::from_millis(100), Duration::from_secs(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_zero() {
        let p = BackoffPolicy::none();
        for n in 0..5 {
            assert_eq!(p.next(n), Duration::ZERO);
        }
    }

    #[test]
    fn test_fixed_is_constant() {
        let p = BackoffPolicy::fixed(Duration::from_millis(250));
        for n in 0..10 {
            assert_eq!(p.next(n), Duration::from_millis(250), "restart {n}");
        }
    }

    #[test]
    fn test_exponential_growth_and_cap() {
        let p = BackoffPolicy::exponential(Duration::from_millis(100), Duration::from_secs(2));
        assert_eq!(p.next(0), Duration::from_millis(100));
        assert_eq!(p.next(1), Duration::from_millis(200));
        assert_eq!(p.next(4), Duration::from_millis(1600));
        assert_eq!(p.next(5), Duration::from_secs(2));
        assert_eq!(p.next(u32::MAX), Duration::from_secs(2));
    }

    #[test]
    fn test_first_above_max_clamps() {
        let p = BackoffPolicy {
            first: Duration::from_secs(10),
            max: Duration::from_secs(5),
            factor: 1.0,
            jitter: JitterPolicy::None,
        };
        assert_eq!(p.next(0), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_bounds() {
        let full = BackoffPolicy::fixed(Duration::from_millis(1000)).with_jitter(JitterPolicy::Full);
        let equal =
            BackoffPolicy::fixed(Duration::from_millis(1000)).with_jitter(JitterPolicy::Equal);
        for n in 0..50 {
            assert!(full.next(n) <= Duration::from_millis(1000));
            let d = equal.next(n);
            assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_decorrelated_stays_within_bounds() {
        let p = BackoffPolicy::exponential(Duration::from_millis(100), Duration::from_secs(1))
            .with_jitter(JitterPolicy::Decorrelated);
        for n in 0..20 {
            let d = p.next(n);
            assert!(d >= Duration::from_millis(100), "restart {n}: {d:?}");
            assert!(d <= Duration::from_secs(1), "restart {n}: {d:?}");
        }
        assert_eq!(
            JitterPolicy::Decorrelated.apply(Duration::from_millis(7)),
            Duration::from_millis(7)
        );
    }

    #[test]
    fn test_jitter_of_zero_is_zero() {
        assert_eq!(JitterPolicy::Full.apply(Duration::ZERO), Duration::ZERO);
        assert_eq!(JitterPolicy::Equal.apply(Duration::ZERO), Duration::ZERO);
    }
}
