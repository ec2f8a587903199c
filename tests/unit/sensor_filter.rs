//! Property tests for the sensor filter.

use gantry_motion::config::FilterConfig;
use gantry_motion::hal::Timestamp;
use gantry_motion::sensor::SensorFilter;
use proptest::prelude::*;

fn filter(debounce_ms: u32, filter_samples: u32, interference_threshold: u32, window_ms: u32) -> SensorFilter {
    let config = FilterConfig {
        debounce_ms,
        filter_samples,
        interference_threshold,
        interference_window_ms: window_ms,
    };
    SensorFilter::new("probe", config).expect("valid filter")
}

fn partial_ring() -> impl Strategy<Value = (u32, Vec<bool>)> {
    (2u32..=32).prop_flat_map(|n| (Just(n), prop::collection::vec(any::<bool>(), 0..n as usize)))
}

proptest! {
    /// Until the ring is full the filter reports the fail-safe default.
    #[test]
    fn partial_ring_reads_not_triggered((samples, raw) in partial_ring(), step_ms in 1u64..500) {
        let mut f = filter(1, samples, 32, 1000);
        for (i, &level) in raw.iter().enumerate() {
            let status = f.sample(level, Timestamp::from_millis(i as u64 * step_ms));
            prop_assert!(!status.filtered_state);
        }
    }

    /// One sample of the opposite level, shorter than the debounce window, never flips the state.
    #[test]
    fn single_glitch_never_flips(
        debounce_ms in 2u32..200,
        samples in 1u32..=15,
        level in any::<bool>(),
        period_seed in 1u64..200,
        tail in 1usize..50,
    ) {
        let period = 1 + period_seed % (debounce_ms as u64 - 1);
        let mut f = filter(debounce_ms, samples, 3, 1000);

        let mut t = 0;
        let mut settled = !level;
        for _ in 0..10_000 {
            settled = f.sample(level, Timestamp::from_millis(t)).filtered_state;
            t += period;
            if settled == level {
                break;
            }
        }
        prop_assert_eq!(settled, level);

        let status = f.sample(!level, Timestamp::from_millis(t));
        prop_assert_eq!(status.filtered_state, level);
        for _ in 0..tail {
            t += period;
            prop_assert_eq!(f.sample(level, Timestamp::from_millis(t)).filtered_state, level);
        }
    }

    /// Oscillation at or above the threshold rate is classified as interference and the
    /// reported state is held for as long as it lasts.
    #[test]
    fn oscillation_sets_interference_and_freezes(
        threshold in 1u32..=8,
        half_period in 1u64..=20,
        samples in 1u32..=7,
        debounce_ms in 1u32..50,
        extra_cycles in 1u32..32,
    ) {
        let window = (4 * half_period * threshold as u64) as u32;
        let mut f = filter(debounce_ms, samples, threshold, window);

        // Quiet and settled before the burst.
        let mut t = 0;
        for _ in 0..samples {
            f.sample(false, Timestamp::from_millis(t));
            t += half_period;
        }

        let mut frozen = None;
        for edge in 1..=threshold + extra_cycles {
            let status = f.sample(true, Timestamp::from_millis(t));
            if edge < threshold {
                prop_assert!(!status.interference_detected);
            } else {
                prop_assert!(status.interference_detected);
                let held = *frozen.get_or_insert(status.filtered_state);
                prop_assert_eq!(status.filtered_state, held);
            }
            t += half_period;

            let status = f.sample(false, Timestamp::from_millis(t));
            if let Some(held) = frozen {
                prop_assert!(status.interference_detected);
                prop_assert_eq!(status.filtered_state, held);
            }
            t += half_period;
        }
    }
}
