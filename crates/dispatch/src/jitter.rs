//! Randomized pacing between successive tasks in a slot.
//!
//! A nominal delay plus a signed jitter keeps parallel slots from firing in
//! lockstep against whatever the worker talks to.

use std::time::Duration;

use rand::Rng;

/// Uniform random integer in `[-max_ms, +max_ms]`. Always 0 when `max_ms` is 0.
pub fn jitter(max_ms: u64) -> i64 {
    jitter_with(&mut rand::thread_rng(), max_ms)
}

/// Same as [`jitter`] with a caller-supplied RNG.
pub fn jitter_with<R: Rng + ?Sized>(rng: &mut R, max_ms: u64) -> i64 {
    if max_ms == 0 {
        return 0;
    }
    let max = i64::try_from(max_ms).unwrap_or(i64::MAX);
    rng.gen_range(-max..=max)
}

/// Wait before the next task in a slot.
///
/// `None` means no timer at all: the next task runs immediately. Otherwise
/// the jittered delay is clamped at zero.
pub fn paced_delay(nominal_ms: u64, jitter_ms: u64) -> Option<Duration> {
    paced_delay_with(&mut rand::thread_rng(), nominal_ms, jitter_ms)
}

pub fn paced_delay_with<R: Rng + ?Sized>(
    rng: &mut R,
    nominal_ms: u64,
    jitter_ms: u64,
) -> Option<Duration> {
    if nominal_ms == 0 {
        return None;
    }
    let nominal = i64::try_from(nominal_ms).unwrap_or(i64::MAX);
    let wait = nominal.saturating_add(jitter_with(rng, jitter_ms)).max(0);
    Some(Duration::from_millis(wait as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn zero_magnitude_is_always_zero() {
        for _ in 0..1000 {
            assert_eq!(jitter(0), 0);
        }
    }

    #[test]
    fn samples_stay_in_closed_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for max in [1u64, 3, 100, 1_000] {
            for _ in 0..10_000 {
                let j = jitter_with(&mut rng, max);
                assert!((-(max as i64)..=max as i64).contains(&j), "{j} outside ±{max}");
            }
        }
    }

    #[test]
    fn both_extremes_are_reachable() {
        let mut rng = StdRng::seed_from_u64(42);
        let samples: Vec<i64> = (0..10_000).map(|_| jitter_with(&mut rng, 2)).collect();
        assert!(samples.contains(&-2));
        assert!(samples.contains(&2));
        assert!(samples.contains(&0));
    }

    #[test]
    fn thread_rng_variant_in_range() {
        for _ in 0..10_000 {
            let j = jitter(100);
            assert!((-100..=100).contains(&j));
        }
    }

    #[test]
    fn no_timer_when_nominal_is_zero() {
        assert_eq!(paced_delay(0, 0), None);
        // Jitter alone never creates a timer.
        assert_eq!(paced_delay(0, 500), None);
    }

    #[test]
    fn delay_within_jitter_band() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1_000 {
            let d = paced_delay_with(&mut rng, 500, 200).unwrap();
            assert!(d >= Duration::from_millis(300) && d <= Duration::from_millis(700));
        }
    }

    #[test]
    fn negative_sum_clamps_to_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut saw_zero = false;
        for _ in 0..1_000 {
            let d = paced_delay_with(&mut rng, 1, 50).unwrap();
            assert!(d <= Duration::from_millis(51));
            saw_zero |= d.is_zero();
        }
        assert!(saw_zero);
    }

    #[test]
    fn unjittered_delay_is_exact() {
        assert_eq!(paced_delay(250, 0), Some(Duration::from_millis(250)));
    }
}
