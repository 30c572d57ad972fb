//! Key/Scale Correlator
//!
//! Krumhansl-Schmuckler key finding: the histogram is rotated through all
//! twelve roots and correlated against the major and minor key profiles. The
//! winning root is then re-labelled against the scale template catalog.

use tracing::trace;

use crate::histogram::PitchClassHistogram;
use crate::scale::{NoteName, Scale, ScaleType, SCALE_CATALOG};

const SEMITONES: usize = 12;

/// Most alternatives an analysis reports.
pub const MAX_ALTERNATIVES: usize = 3;

/// Krumhansl-Kessler major key profile.
pub const MAJOR_PROFILE: [f64; SEMITONES] =
    [6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88];

/// Krumhansl-Kessler minor key profile.
pub const MINOR_PROFILE: [f64; SEMITONES] =
    [6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17];

/// The two key profiles, major first, with the scale type each one stands for.
static KEY_PROFILES: [(ScaleType, &[f64; SEMITONES]); 2] = [
    (ScaleType::Ionian, &MAJOR_PROFILE),
    (ScaleType::Aeolian, &MINOR_PROFILE),
];

/// Pearson correlation coefficient between two 12-element arrays.
///
/// `None` when either side has (numerically) zero variance.
pub fn pearson(x: &[f64; SEMITONES], y: &[f64; SEMITONES]) -> Option<f64> {
    let x_mean = x.iter().sum::<f64>() / SEMITONES as f64;
    let y_mean = y.iter().sum::<f64>() / SEMITONES as f64;

    let mut num = 0.0;
    let mut x_sq = 0.0;
    let mut y_sq = 0.0;
    for (a, b) in x.iter().zip(y) {
        let xd = a - x_mean;
        let yd = b - y_mean;
        num += xd * yd;
        x_sq += xd * xd;
        y_sq += yd * yd;
    }

    let denom = (x_sq * y_sq).sqrt();
    if denom < 1e-12 {
        return None;
    }
    Some(num / denom)
}

/// Rotate so that `root` lands in bin 0.
pub fn rotate(histogram: &PitchClassHistogram, root: usize) -> PitchClassHistogram {
    let mut rotated = [0.0; SEMITONES];
    for (i, bin) in rotated.iter_mut().enumerate() {
        *bin = histogram[(i + root) % SEMITONES];
    }
    rotated
}

/// Map a correlation in `[-1, 1]` onto `[0, 1]`.
fn correlation_confidence(correlation: f64) -> f64 {
    ((correlation + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Correlation of every `(root, major/minor)` pair, roots ascending and major
/// before minor at each root.
fn key_candidates(histogram: &PitchClassHistogram) -> impl Iterator<Item = (usize, ScaleType, Option<f64>)> + '_ {
    (0..SEMITONES).flat_map(move |root| {
        let rotated = rotate(histogram, root);
        KEY_PROFILES
            .iter()
            .map(move |&(scale_type, profile)| (root, scale_type, pearson(&rotated, profile)))
    })
}

/// Best major/minor key, then re-labelled against the template catalog.
///
/// Returns [`Scale::unknown`] when no correlation is defined, e.g. for a flat
/// or empty histogram.
pub fn best_scale(histogram: &PitchClassHistogram) -> Scale {
    let mut best: Option<(usize, ScaleType, f64)> = None;
    for (root, scale_type, correlation) in key_candidates(histogram) {
        let Some(correlation) = correlation else {
            continue;
        };
        let better = match best {
            Some((_, _, c)) => correlation > c,
            None => true,
        };
        if better {
            best = Some((root, scale_type, correlation));
        }
    }

    match best {
        Some((root, scale_type, correlation)) => {
            let key = Scale::new(
                NoteName::from_pitch_class(root as u8),
                scale_type,
                correlation_confidence(correlation),
            );
            refine_scale(histogram, key)
        }
        None => Scale::unknown(),
    }
}

/// Try every non-major/minor template at the key's root; a template whose mean
/// bin weight beats the current confidence replaces the scale type. The root
/// never changes.
pub fn refine_scale(histogram: &PitchClassHistogram, mut scale: Scale) -> Scale {
    if scale.scale_type == ScaleType::Unknown {
        return scale;
    }
    let root = usize::from(scale.root.pitch_class());

    for &(scale_type, _, intervals) in SCALE_CATALOG.iter() {
        if matches!(scale_type, ScaleType::Ionian | ScaleType::Aeolian) {
            continue;
        }
        let score = intervals
            .iter()
            .map(|&i| histogram[(root + usize::from(i)) % SEMITONES])
            .sum::<f64>()
            / intervals.len() as f64;

        if score > scale.confidence {
            trace!(from = %scale.scale_type, to = %scale_type, score, "refined scale type");
            scale.scale_type = scale_type;
            scale.intervals = intervals.to_vec();
            scale.confidence = score;
        }
    }
    scale
}

/// Up to [`MAX_ALTERNATIVES`] major/minor keys at or above `min_confidence`,
/// best first, never repeating the primary scale's root and type.
pub fn alternative_scales(histogram: &PitchClassHistogram, primary: &Scale, min_confidence: f64) -> Vec<Scale> {
    let mut alternatives: Vec<Scale> = key_candidates(histogram)
        .map(|(root, scale_type, correlation)| {
            let confidence = correlation.map_or(0.0, correlation_confidence);
            Scale::new(NoteName::from_pitch_class(root as u8), scale_type, confidence)
        })
        .filter(|s| s.confidence >= min_confidence && !s.same_key(primary))
        .collect();

    alternatives.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    alternatives.truncate(MAX_ALTERNATIVES);
    alternatives
}
