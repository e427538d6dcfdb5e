//! # Guitar Tuning Module
//!
//! Static guitar tuning tables and the frequency matching used by the tuner
//! session. A [`TuningProfile`] names six target frequencies, one per string,
//! highest-pitched first; the detector reports a raw frequency and this module
//! answers "which string, and is it flat, sharp, or in tune".
//!
//! ## Features
//! - Predefined profiles: Standard, Drop D, DADGAD, Open G, Half-Step Down
//! - Nearest-string matching by absolute frequency distance
//! - Cent deviation calculation and the ±5-cent intonation band

use once_cell::sync::Lazy;

/// Tolerance band for "in tune", in cents. The band is closed: a deviation of
/// exactly ±5 cents still counts as in tune.
pub const CENTS_TOLERANCE: f32 = 5.0;

/// A single guitar string: its note label and target frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StringSpec {
    /// Note name, e.g. "E4", "A2"
    pub note: &'static str,
    /// Target frequency in Hz
    pub frequency: f32,
}

/// A named set of six target frequencies, highest-pitched string first.
///
/// Profiles are static configuration data; they are never computed or
/// mutated at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningProfile {
    pub name: &'static str,
    pub strings: [StringSpec; 6],
}

const fn string(note: &'static str, frequency: f32) -> StringSpec {
    StringSpec { note, frequency }
}

/// The predefined tuning profiles, in menu order.
pub static TUNINGS: Lazy<Vec<TuningProfile>> = Lazy::new(|| {
    vec![
        TuningProfile {
            name: "Standard (E)",
            strings: [
                string("E4", 329.63),
                string("B3", 246.94),
                string("G3", 196.00),
                string("D3", 146.83),
                string("A2", 110.00),
                string("E2", 82.41),
            ],
        },
        TuningProfile {
            name: "Drop D",
            strings: [
                string("E4", 329.63),
                string("B3", 246.94),
                string("G3", 196.00),
                string("D3", 146.83),
                string("A2", 110.00),
                string("D2", 73.42),
            ],
        },
        TuningProfile {
            name: "DADGAD",
            strings: [
                string("D4", 293.66),
                string("A3", 220.00),
                string("G3", 196.00),
                string("D3", 146.83),
                string("A2", 110.00),
                string("D2", 73.42),
            ],
        },
        TuningProfile {
            name: "Open G",
            strings: [
                string("D4", 293.66),
                string("B3", 246.94),
                string("G3", 196.00),
                string("D3", 146.83),
                string("G2", 98.00),
                string("D2", 73.42),
            ],
        },
        TuningProfile {
            name: "Half-Step Down",
            strings: [
                string("D#4", 311.13),
                string("A#3", 233.08),
                string("F#3", 185.00),
                string("C#3", 138.59),
                string("G#2", 103.83),
                string("D#2", 77.78),
            ],
        },
    ]
});

/// Looks up a profile by name, ignoring case. Accepts either the full display
/// name or a prefix of it ("standard", "drop d", "dadgad", ...).
pub fn profile_by_name(name: &str) -> Option<&'static TuningProfile> {
    let wanted = name.trim().to_ascii_lowercase();
    TUNINGS
        .iter()
        .find(|t| t.name.to_ascii_lowercase().starts_with(&wanted))
}

/// Finds the string of `profile` closest to a measured frequency.
///
/// Returns `None` for a non-positive frequency (the detector reports 0 Hz for
/// silence, and no string should be highlighted). Ties between two equidistant
/// strings keep the lower index, so the result is deterministic and
/// order-stable.
///
/// # Arguments
/// * `freq` - Measured frequency in Hz
/// * `profile` - The active tuning profile
///
/// # Returns
/// * `Some(index)` - Index into `profile.strings` of the nearest string
/// * `None` - No signal (freq <= 0)
pub fn nearest_string(freq: f32, profile: &TuningProfile) -> Option<usize> {
    if !(freq > 0.0) {
        return None;
    }

    let mut closest = 0;
    let mut min_diff = (freq - profile.strings[0].frequency).abs();
    for (i, s) in profile.strings.iter().enumerate().skip(1) {
        let diff = (freq - s.frequency).abs();
        if diff < min_diff {
            min_diff = diff;
            closest = i;
        }
    }
    Some(closest)
}

/// Whether a measured note is below, inside, or above the tolerance band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intonation {
    /// Below the band; the string needs tightening
    Flat,
    /// Within the ±5-cent band of the target
    InTune,
    /// Above the band; the string needs loosening
    Sharp,
}

impl std::fmt::Display for Intonation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intonation::Flat => write!(f, "flat"),
            Intonation::InTune => write!(f, "in tune"),
            Intonation::Sharp => write!(f, "sharp"),
        }
    }
}

/// Classifies a cent deviation against the fixed ±5-cent band.
///
/// The interval is closed: -5.0 and +5.0 are both in tune.
pub fn classify_cents(cents: f32) -> Intonation {
    if cents < -CENTS_TOLERANCE {
        Intonation::Flat
    } else if cents > CENTS_TOLERANCE {
        Intonation::Sharp
    } else {
        Intonation::InTune
    }
}

/// Calculates the deviation from a target frequency in cents.
///
/// Cents are a logarithmic unit of pitch measurement where:
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
pub fn cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn standard() -> &'static TuningProfile {
        &TUNINGS[0]
    }

    #[test]
    fn exact_match_selects_that_string() {
        // A2 is index 4 in standard tuning
        assert_eq!(nearest_string(110.0, standard()), Some(4));
    }

    #[test]
    fn off_pitch_frequency_selects_closest_string() {
        // 100 Hz: 10 Hz from A2 (110.00), 17.59 Hz from E2 (82.41)
        assert_eq!(nearest_string(100.0, standard()), Some(4));
        // 300 Hz is closest to E4 (329.63) over B3 (246.94)
        assert_eq!(nearest_string(300.0, standard()), Some(0));
    }

    #[test]
    fn nearest_string_is_deterministic() {
        for _ in 0..10 {
            assert_eq!(
                nearest_string(123.4, standard()),
                nearest_string(123.4, standard())
            );
        }
    }

    #[test]
    fn tie_resolves_to_lower_index() {
        // Exactly representable frequencies so 150 Hz is equidistant from
        // the strings at indices 2 and 3.
        let profile = TuningProfile {
            name: "tie",
            strings: [
                string("a", 400.0),
                string("b", 300.0),
                string("c", 200.0),
                string("d", 100.0),
                string("e", 50.0),
                string("f", 25.0),
            ],
        };
        assert_eq!(nearest_string(150.0, &profile), Some(2));
    }

    #[test]
    fn silence_matches_no_string() {
        assert_eq!(nearest_string(0.0, standard()), None);
        assert_eq!(nearest_string(-1.0, standard()), None);
    }

    #[test]
    fn cents_band_is_closed_at_both_ends() {
        assert_eq!(classify_cents(-5.0), Intonation::InTune);
        assert_eq!(classify_cents(5.0), Intonation::InTune);
        assert_eq!(classify_cents(-5.01), Intonation::Flat);
        assert_eq!(classify_cents(5.01), Intonation::Sharp);
        assert_eq!(classify_cents(0.0), Intonation::InTune);
    }

    #[test]
    fn cents_deviation_of_octave_is_1200() {
        assert_relative_eq!(cents_deviation(220.0, 110.0), 1200.0, epsilon = 0.01);
        assert_relative_eq!(cents_deviation(110.0, 110.0), 0.0, epsilon = 0.01);
    }

    #[test]
    fn every_profile_has_six_strings_highest_first() {
        for profile in TUNINGS.iter() {
            for pair in profile.strings.windows(2) {
                assert!(pair[0].frequency > pair[1].frequency, "{}", profile.name);
            }
        }
    }

    #[test]
    fn profiles_resolve_by_case_insensitive_prefix() {
        assert_eq!(profile_by_name("standard").unwrap().name, "Standard (E)");
        assert_eq!(profile_by_name("drop d").unwrap().name, "Drop D");
        assert_eq!(profile_by_name("DADGAD").unwrap().name, "DADGAD");
        assert!(profile_by_name("open c").is_none());
    }
}
