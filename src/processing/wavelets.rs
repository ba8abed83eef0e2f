// src/processing/wavelets.rs
//! Discrete wavelet transform with half-sample symmetric boundary extension
//!
//! Decomposition produces `floor((n + F - 1) / 2)` coefficients per level for
//! an input of length `n` and a filter of `F` taps. Reconstruction drops the
//! one surplus sample an odd-length level produces, so `reconstruct(decompose(x))`
//! returns `x` for every length the requested depth supports.

use crate::config::WaveletFamily;
use crate::error::{HolterError, HolterResult, ProcessingStage};
use std::ops::RangeInclusive;

const HAAR: [f64; 2] = [std::f64::consts::FRAC_1_SQRT_2, std::f64::consts::FRAC_1_SQRT_2];

const DB2: [f64; 4] = [
    0.48296291314453416,
    0.8365163037378079,
    0.2241438680420134,
    -0.12940952255126037,
];

const DB3: [f64; 6] = [
    0.3326705529509569,
    0.8068915093133388,
    0.4598775021193313,
    -0.13501102001039084,
    -0.08544127388224149,
    0.035226291882100656,
];

const DB4: [f64; 8] = [
    0.2303778133088965,
    0.7148465705529157,
    0.6308807679298589,
    -0.027983769416859854,
    -0.18703481171909309,
    0.030841381835560764,
    0.0328830116668852,
    -0.010597401785069032,
];

const DB6: [f64; 12] = [
    0.11154074335008017,
    0.4946238903983854,
    0.7511339080215775,
    0.3152503517092432,
    -0.22626469396516913,
    -0.12976686756709563,
    0.09750160558707936,
    0.02752286553001629,
    -0.031582039318031156,
    0.0005538422009938016,
    0.004777257511010651,
    -0.00107730108499558,
];

const SYM4: [f64; 8] = [
    0.032223100604071,
    -0.012603967262037833,
    -0.09921954357684722,
    0.29785779560527736,
    0.8037387518059161,
    0.49761866763201545,
    -0.02963552764599851,
    -0.07576571478927333,
];

impl WaveletFamily {
    /// Reconstruction low-pass (scaling) coefficients
    pub fn scaling_coefficients(&self) -> &'static [f64] {
        match self {
            WaveletFamily::Haar => &HAAR,
            WaveletFamily::Db2 => &DB2,
            WaveletFamily::Db3 => &DB3,
            WaveletFamily::Db4 => &DB4,
            WaveletFamily::Db6 => &DB6,
            WaveletFamily::Sym4 => &SYM4,
        }
    }

    /// Number of filter taps
    pub fn filter_length(&self) -> usize {
        self.scaling_coefficients().len()
    }
}

/// Deepest decomposition a signal of `signal_len` samples supports: `floor(log2(n / (F - 1)))`
pub fn max_decomposition_level(signal_len: usize, filter_len: usize) -> usize {
    let span = filter_len.saturating_sub(1).max(1);
    let mut level = 0;
    while span.checked_shl(level as u32 + 1).map_or(false, |needed| needed <= signal_len) {
        level += 1;
    }
    level
}

/// Window samples influencing detail coefficient `index` at `level` (finest = 1), clamped to the signal
pub fn coefficient_support(level: usize, index: usize, filter_len: usize, signal_len: usize) -> RangeInclusive<usize> {
    let scale = 1i64 << level;
    let start = scale * index as i64 + (2 - filter_len as i64) * (scale - 1);
    let end = scale * index as i64 + scale - 1;
    let last = signal_len.saturating_sub(1) as i64;
    (start.clamp(0, last) as usize)..=(end.clamp(0, last) as usize)
}

/// Analysis and synthesis filter quadruple derived from the scaling coefficients
#[derive(Debug, Clone)]
struct WaveletFilters {
    dec_lo: Vec<f64>,
    dec_hi: Vec<f64>,
    rec_lo: Vec<f64>,
    rec_hi: Vec<f64>,
}

impl WaveletFilters {
    fn new(scaling: &[f64]) -> Self {
        let len = scaling.len();
        let rec_lo = scaling.to_vec();
        let rec_hi: Vec<f64> = (0..len)
            .map(|k| if k % 2 == 0 { scaling[len - 1 - k] } else { -scaling[len - 1 - k] })
            .collect();
        let dec_lo = rec_lo.iter().rev().copied().collect();
        let dec_hi = rec_hi.iter().rev().copied().collect();

        Self { dec_lo, dec_hi, rec_lo, rec_hi }
    }
}

/// Multi-level decomposition of one signal
#[derive(Debug, Clone, PartialEq)]
pub struct WaveletDecomposition {
    /// Approximation coefficients of the coarsest level
    pub approximation: Vec<f64>,
    /// Detail coefficients, finest level first
    pub details: Vec<Vec<f64>>,
    /// Length of the decomposed signal
    pub signal_len: usize,
}

impl WaveletDecomposition {
    pub fn levels(&self) -> usize {
        self.details.len()
    }

    /// Level 1 detail coefficients, used for noise estimation
    pub fn finest_details(&self) -> &[f64] {
        self.details.first().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Discrete wavelet transform for one wavelet family
#[derive(Debug, Clone)]
pub struct WaveletTransform {
    family: WaveletFamily,
    filters: WaveletFilters,
}

impl WaveletTransform {
    pub fn new(family: WaveletFamily) -> Self {
        Self {
            family,
            filters: WaveletFilters::new(family.scaling_coefficients()),
        }
    }

    pub fn family(&self) -> WaveletFamily {
        self.family
    }

    pub fn filter_length(&self) -> usize {
        self.filters.rec_lo.len()
    }

    /// Deepest decomposition supported for `signal_len` samples
    pub fn max_level(&self, signal_len: usize) -> usize {
        max_decomposition_level(signal_len, self.filter_length())
    }

    /// Decompose `signal` into `levels` detail levels plus an approximation
    pub fn decompose(&self, signal: &[f64], levels: usize) -> HolterResult<WaveletDecomposition> {
        let supported = self.max_level(signal.len());
        if levels == 0 || levels > supported {
            return Err(HolterError::processing(
                "wavelet_transform",
                ProcessingStage::WaveletDecomposition,
                format!(
                    "{} levels requested for {} samples, {} supports 1..={}",
                    levels,
                    signal.len(),
                    self.family,
                    supported
                ),
            ));
        }

        let mut details = Vec::with_capacity(levels);
        let mut approximation = signal.to_vec();
        for _ in 0..levels {
            let (next, detail) = self.single_level_decomposition(&approximation);
            details.push(detail);
            approximation = next;
        }

        Ok(WaveletDecomposition {
            approximation,
            details,
            signal_len: signal.len(),
        })
    }

    /// Inverse transform back to `decomposition.signal_len` samples
    pub fn reconstruct(&self, decomposition: &WaveletDecomposition) -> HolterResult<Vec<f64>> {
        let mut current = decomposition.approximation.clone();

        for detail in decomposition.details.iter().rev() {
            if current.len() == detail.len() + 1 {
                current.pop();
            }
            if current.len() != detail.len() {
                return Err(HolterError::processing(
                    "wavelet_transform",
                    ProcessingStage::Reconstruction,
                    format!(
                        "coefficient length mismatch: {} approximation vs {} detail",
                        current.len(),
                        detail.len()
                    ),
                ));
            }
            current = self.single_level_reconstruction(&current, detail);
        }

        if current.len() < decomposition.signal_len {
            return Err(HolterError::processing(
                "wavelet_transform",
                ProcessingStage::Reconstruction,
                format!(
                    "reconstructed {} samples, expected {}",
                    current.len(),
                    decomposition.signal_len
                ),
            ));
        }
        current.truncate(decomposition.signal_len);
        Ok(current)
    }

    fn single_level_decomposition(&self, signal: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let n = signal.len();
        let filter_len = self.filter_length();
        let out_len = (n + filter_len - 1) / 2;

        let mut approximation = Vec::with_capacity(out_len);
        let mut details = Vec::with_capacity(out_len);

        for o in 0..out_len {
            let mut low_sum = 0.0;
            let mut high_sum = 0.0;
            let center = 2 * o as i64 + 1;

            for (j, (&low_coeff, &high_coeff)) in self.filters.dec_lo.iter()
                .zip(self.filters.dec_hi.iter()).enumerate() {

                let sample = signal[symmetric_index(center - j as i64, n)];
                low_sum += low_coeff * sample;
                high_sum += high_coeff * sample;
            }

            approximation.push(low_sum);
            details.push(high_sum);
        }

        (approximation, details)
    }

    fn single_level_reconstruction(&self, approximation: &[f64], details: &[f64]) -> Vec<f64> {
        let mut output = upsample_convolve(approximation, &self.filters.rec_lo);
        for (out, value) in output.iter_mut().zip(upsample_convolve(details, &self.filters.rec_hi)) {
            *out += value;
        }
        output
    }
}

/// Half-sample symmetric extension: `... x1 x0 | x0 x1 ... xn-1 | xn-1 xn-2 ...`
fn symmetric_index(index: i64, len: usize) -> usize {
    let period = 2 * len as i64;
    let r = index.rem_euclid(period) as usize;
    if r < len {
        r
    } else {
        2 * len - 1 - r
    }
}

/// Upsample by two and convolve, keeping only the fully overlapped part (`2n - F + 2` samples)
fn upsample_convolve(input: &[f64], filter: &[f64]) -> Vec<f64> {
    let n = input.len();
    let half = filter.len() / 2;
    let out_len = (2 * n + 2).saturating_sub(filter.len());
    let mut output = vec![0.0; out_len];

    for (o, i) in (half.saturating_sub(1)..n).enumerate() {
        let (mut even, mut odd) = (0.0, 0.0);
        for j in 0..half {
            even += filter[2 * j] * input[i - j];
            odd += filter[2 * j + 1] * input[i - j];
        }
        output[2 * o] += even;
        output[2 * o + 1] += odd;
    }

    output
}
