//! # Chord Transposition Module
//!
//! Moves a chord's root through the 12-tone chromatic cycle while leaving the
//! quality suffix ("m7", "sus4", ...) untouched. Flat spellings are
//! normalized to their sharp equivalents before lookup, so the output always
//! uses sharp names.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// The chromatic cycle used for transposition, sharps only.
const CHROMATIC: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Root name to chromatic index, including the flat aliases
/// (Db→C#, Eb→D#, Gb→F#, Ab→G#, Bb→A#).
static ROOT_INDEX: Lazy<BTreeMap<&'static str, usize>> = Lazy::new(|| {
    let mut map: BTreeMap<&'static str, usize> =
        CHROMATIC.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    for (flat, sharp) in [
        ("Db", "C#"),
        ("Eb", "D#"),
        ("Gb", "F#"),
        ("Ab", "G#"),
        ("Bb", "A#"),
    ] {
        let idx = map[sharp];
        map.insert(flat, idx);
    }
    map
});

/// Splits a chord name into its root (one of A-G plus an optional accidental)
/// and the remaining quality suffix. Returns `None` when the name does not
/// start with a note letter.
fn split_root(chord: &str) -> Option<(&str, &str)> {
    let mut chars = chord.chars();
    let first = chars.next()?;
    if !('A'..='G').contains(&first) {
        return None;
    }
    let root_len = match chars.next() {
        Some('#') | Some('b') => 2,
        _ => 1,
    };
    Some(chord.split_at(root_len))
}

/// Transposes a chord name by a number of semitones.
///
/// The shift wraps modulo 12, so any integer is accepted; the UI constrains
/// it to [-11, 11]. Chord names whose root is not recognized are returned
/// unchanged rather than rejected, since song text may contain annotations
/// that merely look like chords.
///
/// # Examples
/// ```
/// use chordbook_core::chords::transpose;
/// assert_eq!(transpose("C", 2), "D");
/// assert_eq!(transpose("Bb7", 1), "B7");
/// assert_eq!(transpose("Am", -2), "Gm");
/// assert_eq!(transpose("N.C.", 3), "N.C.");
/// ```
pub fn transpose(chord: &str, semitones: i32) -> String {
    let Some((root, suffix)) = split_root(chord) else {
        return chord.to_string();
    };
    let Some(&index) = ROOT_INDEX.get(root) else {
        return chord.to_string();
    };

    let mut new_index = (index as i32 + semitones) % 12;
    if new_index < 0 {
        new_index += 12;
    }
    format!("{}{}", CHROMATIC[new_index as usize], suffix)
}
