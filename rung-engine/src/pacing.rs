//! Ladder pacing.
//!
//! Inter-order delays for ladder placement: a deterministic ramp that
//! grows every second rung, plus uniform jitter, with the whole sequence
//! sorted ascending so later rungs never land faster than earlier ones.

use std::time::Duration;

use rand::Rng;

/// Pacing parameters, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingConfig {
    /// Base delay applied to every rung
    pub base_secs: f64,
    /// Ramp added every second rung
    pub increment_secs: f64,
    /// Upper bound of the uniform jitter added to each delay
    pub noise_secs: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            base_secs: 1.0,
            increment_secs: 0.5,
            noise_secs: 0.5,
        }
    }
}

/// Generate the post-placement delays for a ladder of `count` rungs.
///
/// Delay i (1-based) is `base + increment x floor((i - 1) / 2)` plus
/// uniform jitter in `[0, noise)`; the sequence is sorted ascending
/// before use.
pub fn pacing_delays<R: Rng>(config: &PacingConfig, count: usize, rng: &mut R) -> Vec<Duration> {
    let mut delays: Vec<f64> = (1..=count)
        .map(|i| {
            let ramp = config.increment_secs * (((i - 1) / 2) as f64);
            let jitter = if config.noise_secs > 0.0 {
                rng.gen_range(0.0..config.noise_secs)
            } else {
                0.0
            };
            (config.base_secs + ramp + jitter).max(0.0)
        })
        .collect();
    delays.sort_by(|a, b| a.total_cmp(b));
    delays.into_iter().map(Duration::from_secs_f64).collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_delays_sorted_ascending() {
        let config = PacingConfig::default();
        let mut rng = rand::thread_rng();
        let delays = pacing_delays(&config, 8, &mut rng);
        assert_eq!(delays.len(), 8);
        for pair in delays.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_delays_ramp_without_noise() {
        let config = PacingConfig { base_secs: 1.0, increment_secs: 0.5, noise_secs: 0.0 };
        let mut rng = StepRng::new(0, 0);
        let delays = pacing_delays(&config, 5, &mut rng);
        let secs: Vec<f64> = delays.iter().map(Duration::as_secs_f64).collect();
        // Ramp grows every second rung: 1.0, 1.0, 1.5, 1.5, 2.0
        assert_eq!(secs, vec![1.0, 1.0, 1.5, 1.5, 2.0]);
    }

    #[test]
    fn test_delays_bounded_by_noise() {
        let config = PacingConfig { base_secs: 1.0, increment_secs: 0.5, noise_secs: 0.5 };
        let mut rng = rand::thread_rng();
        for delay in pacing_delays(&config, 6, &mut rng) {
            // Largest deterministic part for 6 rungs is 1.0 + 0.5 * 2.
            assert!(delay.as_secs_f64() >= 1.0);
            assert!(delay.as_secs_f64() < 1.0 + 1.0 + 0.5);
        }
    }

    #[test]
    fn test_empty_ladder_has_no_delays() {
        let config = PacingConfig::default();
        let mut rng = rand::thread_rng();
        assert!(pacing_delays(&config, 0, &mut rng).is_empty());
    }
}
