//! Size-targeted quality search.
//!
//! Binary search over the integer quality axis for the highest quality whose
//! encoded size fits a byte budget. Trial encodes are the expensive part, so a
//! range of `n` qualities costs at most `floor(log2(n)) + 1` encodes: 7 for
//! the default 10..=95.
//!
//! Correctness depends on encoded size being non-decreasing in quality. When a
//! codec breaks that for some image, the search may settle on a lower quality
//! than the best fitting one, or miss a fitting quality entirely.
//! [`size_curve`] and [`monotonicity_violations`] exist to check a corpus.

use crate::codec::Codec;
use crate::constants::{DEFAULT_MAX_QUALITY, DEFAULT_MIN_QUALITY, MAX_QUALITY, MIN_QUALITY};
use crate::error::{CompressionError, Result};
use crate::formats::OutputFormat;
use image::DynamicImage;

/// Inclusive range of encoder qualities the search may pick from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityRange {
    min: u8,
    max: u8,
}

impl QualityRange {
    pub fn new(min: u8, max: u8) -> Result<Self> {
        if min < MIN_QUALITY || max > MAX_QUALITY || min > max {
            return Err(CompressionError::InvalidQualityRange(min, max));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn contains(&self, quality: u8) -> bool {
        (self.min..=self.max).contains(&quality)
    }

    /// Number of distinct qualities in the range
    pub fn count(&self) -> u32 {
        u32::from(self.max - self.min) + 1
    }

    /// Upper bound on trial encodes a search over this range performs
    pub fn max_trials(&self) -> u32 {
        u32::BITS - self.count().leading_zeros()
    }
}

impl Default for QualityRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_QUALITY,
            max: DEFAULT_MAX_QUALITY,
        }
    }
}

/// One trial encode performed during a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trial {
    pub quality: u8,
    pub size: u64,
    pub accepted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Highest quality whose encoding fits the budget
    Found {
        quality: u8,
        size: u64,
        bytes: Vec<u8>,
    },
    /// Even the lowest quality in range overshoots the budget
    NotFound,
}

impl SearchOutcome {
    pub fn quality(&self) -> Option<u8> {
        match self {
            SearchOutcome::Found { quality, .. } => Some(*quality),
            SearchOutcome::NotFound => None,
        }
    }

    pub fn encoded_size(&self) -> Option<u64> {
        match self {
            SearchOutcome::Found { size, .. } => Some(*size),
            SearchOutcome::NotFound => None,
        }
    }
}

/// Binary search for the highest quality in `range` whose encoding is at most
/// `target_bytes` long.
///
/// `encode` produces the bytes for a quality; `on_trial` observes every trial
/// in the order performed. Only the best accepted buffer is kept alive.
/// An `encode` error aborts the search and is returned as is.
pub fn search_quality<E, O>(
    range: QualityRange,
    target_bytes: u64,
    mut encode: E,
    mut on_trial: O,
) -> Result<SearchOutcome>
where
    E: FnMut(u8) -> Result<Vec<u8>>,
    O: FnMut(Trial),
{
    let mut best: Option<(u8, Vec<u8>)> = None;
    let mut low = u16::from(range.min());
    let mut high = u16::from(range.max());

    while low <= high {
        let mid = (low + high) / 2;
        let quality = mid as u8;
        let buffer = encode(quality)?;
        let size = buffer.len() as u64;
        let accepted = size <= target_bytes;

        on_trial(Trial {
            quality,
            size,
            accepted,
        });

        if accepted {
            best = Some((quality, buffer));
            low = mid + 1;
        } else {
            // mid >= range.min() >= 1, so this cannot underflow
            high = mid - 1;
        }
    }

    Ok(match best {
        Some((quality, bytes)) => SearchOutcome::Found {
            quality,
            size: bytes.len() as u64,
            bytes,
        },
        None => SearchOutcome::NotFound,
    })
}

/// Runs [`search_quality`] with trial encodes from `codec`.
pub fn search<C, O>(
    codec: &C,
    image: &DynamicImage,
    format: OutputFormat,
    target_bytes: u64,
    range: QualityRange,
    on_trial: O,
) -> Result<SearchOutcome>
where
    C: Codec + ?Sized,
    O: FnMut(Trial),
{
    search_quality(
        range,
        target_bytes,
        |quality| codec.encode(image, format, quality),
        on_trial,
    )
}

/// Encoded size at one quality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityPoint {
    pub quality: u8,
    pub size: u64,
}

/// Encodes `image` at every `step`-th quality of `range` (always including
/// `range.max()`) and records the sizes.
pub fn size_curve<C: Codec + ?Sized>(
    codec: &C,
    image: &DynamicImage,
    format: OutputFormat,
    range: QualityRange,
    step: u8,
) -> Result<Vec<QualityPoint>> {
    let step = usize::from(step.max(1));
    let mut qualities: Vec<u8> = (range.min()..=range.max()).step_by(step).collect();
    if qualities.last() != Some(&range.max()) {
        qualities.push(range.max());
    }

    qualities
        .into_iter()
        .map(|quality| {
            let size = codec.encode(image, format, quality)?.len() as u64;
            Ok(QualityPoint { quality, size })
        })
        .collect()
}

/// Adjacent pairs of a size curve where the higher quality encoded smaller
pub fn monotonicity_violations(curve: &[QualityPoint]) -> Vec<(QualityPoint, QualityPoint)> {
    curve
        .windows(2)
        .filter(|pair| pair[1].size < pair[0].size)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Monotone fake encoder: `per_step` bytes per quality unit
    fn linear(per_step: usize) -> impl FnMut(u8) -> Result<Vec<u8>> {
        move |quality| Ok(vec![0u8; usize::from(quality) * per_step])
    }

    #[test]
    fn test_quality_range_validation() {
        assert!(QualityRange::new(10, 95).is_ok());
        assert!(QualityRange::new(50, 50).is_ok());
        assert!(matches!(
            QualityRange::new(0, 50),
            Err(CompressionError::InvalidQualityRange(0, 50))
        ));
        assert!(QualityRange::new(60, 50).is_err());
        assert!(QualityRange::new(10, 101).is_err());
    }

    #[test]
    fn test_default_range_needs_seven_trials() {
        let range = QualityRange::default();
        assert_eq!((range.min(), range.max()), (10, 95));
        assert_eq!(range.count(), 86);
        assert_eq!(range.max_trials(), 7);
        assert_eq!(QualityRange::new(40, 40).unwrap().max_trials(), 1);
    }

    #[test]
    fn test_finds_highest_fitting_quality() {
        let outcome =
            search_quality(QualityRange::default(), 5_000, linear(100), |_| {}).unwrap();

        assert_eq!(outcome.quality(), Some(50));
        assert_eq!(outcome.encoded_size(), Some(5_000));
    }

    #[test]
    fn test_budget_between_steps_rounds_down() {
        let outcome =
            search_quality(QualityRange::default(), 5_099, linear(100), |_| {}).unwrap();
        assert_eq!(outcome.quality(), Some(50));
    }

    #[test]
    fn test_everything_fits_returns_max() {
        let outcome =
            search_quality(QualityRange::default(), u64::MAX, linear(100), |_| {}).unwrap();
        assert_eq!(outcome.quality(), Some(95));
    }

    #[test]
    fn test_min_overshoots_is_not_found() {
        let mut trials = Vec::new();
        let outcome =
            search_quality(QualityRange::default(), 999, linear(100), |t| trials.push(t)).unwrap();

        assert_eq!(outcome, SearchOutcome::NotFound);
        assert!(trials.iter().all(|t| !t.accepted));
        assert_eq!(trials.last().map(|t| t.quality), Some(10));
    }

    #[test]
    fn test_trial_count_is_bounded() {
        for target in [0, 1_000, 4_321, 9_500, 20_000] {
            let mut trials = 0u32;
            search_quality(QualityRange::default(), target, linear(100), |_| trials += 1).unwrap();
            assert!(trials <= QualityRange::default().max_trials(), "target {target}: {trials} trials");
        }
    }

    #[test]
    fn test_encode_error_propagates() {
        let result = search_quality(
            QualityRange::default(),
            1_000,
            |_| Err(CompressionError::WebpEncoding("boom".to_string())),
            |_| {},
        );
        assert!(matches!(result, Err(CompressionError::WebpEncoding(_))));
    }

    #[test]
    fn test_non_monotone_codec_can_miss_a_fit() {
        // Only quality 20 fits. Midpoints 52, 30, 19, 14, 11, 10 all
        // overshoot, so 20 is never tried.
        let encode = |quality: u8| Ok(vec![0u8; if quality == 20 { 10 } else { 1_000 }]);
        let outcome = search_quality(QualityRange::default(), 10, encode, |_| {}).unwrap();
        assert_eq!(outcome, SearchOutcome::NotFound);
    }

    #[test]
    fn test_monotonicity_violations() {
        let curve = [
            QualityPoint { quality: 10, size: 100 },
            QualityPoint { quality: 20, size: 90 },
            QualityPoint { quality: 30, size: 150 },
        ];
        let violations = monotonicity_violations(&curve);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].1.quality, 20);
    }
}
