// tests/pipeline_properties.rs
//! Property tests for windowing, filtering and stitching

use holter_core::config::{MotionConfig, WaveletConfig, WaveletFamily, WindowingConfig};
use holter_core::hal::{Lead, SampleFrame};
use holter_core::processing::{
    AdaptiveWaveletFilter, FilterMode, MotionLabel, SlidingWindowBuffer, Window, WindowStitcher,
};
use proptest::prelude::*;

const FAMILIES: [WaveletFamily; 6] = [
    WaveletFamily::Haar,
    WaveletFamily::Db2,
    WaveletFamily::Db3,
    WaveletFamily::Db4,
    WaveletFamily::Db6,
    WaveletFamily::Sym4,
];

fn frame(timestamp: u64) -> SampleFrame {
    let v = (timestamp as f64 * 0.37).sin();
    SampleFrame::new(timestamp, [v, 2.0 * v, v], [0.0, (timestamp % 5) as f64 * 0.1, 1.0])
}

fn geometry() -> impl Strategy<Value = WindowingConfig> {
    (8usize..160).prop_flat_map(|window_size| {
        (Just(window_size), 0..window_size).prop_map(|(window_size, overlap)| WindowingConfig {
            window_size,
            overlap,
        })
    })
}

fn leads(window: &Window) -> [Vec<f64>; 3] {
    [window.lead(Lead::I), window.lead(Lead::II), window.lead(Lead::III)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn windows_start_every_hop_and_overlap_exactly(config in geometry(), total in 0u64..600) {
        let mut buffer = SlidingWindowBuffer::new(&config);
        let windows: Vec<Window> = (0..total).filter_map(|ts| buffer.push(frame(ts))).collect();

        let n = config.window_size as u64;
        let hop = config.hop() as u64;
        let expected = if total >= n { (total - n) / hop + 1 } else { 0 };
        prop_assert_eq!(windows.len() as u64, expected);

        for (k, window) in windows.iter().enumerate() {
            prop_assert_eq!(window.len(), config.window_size);
            prop_assert_eq!(window.start_timestamp(), Some(k as u64 * hop));
        }
        for pair in windows.windows(2) {
            prop_assert_eq!(&pair[0].frames[config.hop()..], &pair[1].frames[..config.overlap]);
        }
    }

    #[test]
    fn stitched_stream_covers_every_windowed_timestamp_once(config in geometry(), total in 0u64..600) {
        let mut buffer = SlidingWindowBuffer::new(&config);
        let mut stitcher = WindowStitcher::new(&config);
        let mut emitted = Vec::new();
        let mut covered_until = 0;

        for ts in 0..total {
            if let Some(window) = buffer.push(frame(ts)) {
                covered_until = window.end_timestamp().unwrap() + 1;
                emitted.extend(stitcher.commit(&window, &leads(&window)).unwrap());
            }
        }
        emitted.extend(stitcher.finish().unwrap());

        let timestamps: Vec<u64> = emitted.iter().map(|f| f.timestamp).collect();
        prop_assert_eq!(timestamps, (0..covered_until).collect::<Vec<u64>>());
    }

    #[test]
    fn filter_preserves_shape(
        signal in prop::collection::vec(-5.0f64..5.0, 1..600),
        family in prop::sample::select(FAMILIES.to_vec()),
        high_share in 0.0f64..1.0,
    ) {
        let wavelet = WaveletConfig { family, ..WaveletConfig::default() };
        let filter = AdaptiveWaveletFilter::new(&wavelet, &MotionConfig::default()).unwrap();
        let cutoff = (signal.len() as f64 * high_share) as usize;
        let labels: Vec<MotionLabel> = (0..signal.len())
            .map(|i| if i < cutoff { MotionLabel::High } else { MotionLabel::Low })
            .collect();

        let result = filter.filter_lead(Lead::II, &signal, &labels, high_share).unwrap();
        prop_assert_eq!(result.signal.len(), signal.len());
        prop_assert!(result.signal.iter().all(|v| v.is_finite()));
        if result.outcome.mode == FilterMode::Denoised {
            prop_assert!(result.outcome.levels >= 1);
            prop_assert!(result.outcome.levels <= wavelet.level);
        }
    }

    #[test]
    fn zero_multipliers_reconstruct_input(
        signal in prop::collection::vec(-5.0f64..5.0, 32..400),
        family in prop::sample::select(FAMILIES.to_vec()),
    ) {
        let wavelet = WaveletConfig { family, ..WaveletConfig::default() };
        let motion = MotionConfig { high_multiplier: 0.0, low_multiplier: 0.0, ..MotionConfig::default() };
        let filter = AdaptiveWaveletFilter::new(&wavelet, &motion).unwrap();
        let labels = vec![MotionLabel::Low; signal.len()];

        let result = filter.filter_lead(Lead::I, &signal, &labels, 0.0).unwrap();
        for (a, b) in signal.iter().zip(&result.signal) {
            prop_assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
        }
    }
}
