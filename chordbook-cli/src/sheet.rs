//! Chord-sheet rendering: lyric lines with their chords laid out above the
//! character offsets the backend stores, optionally transposed.

use chordbook_core::api::{LyricLine, Song};
use chordbook_core::chords;

/// A shift of 0 leaves chord spellings untouched; any other shift goes
/// through [`chords::transpose`], which normalizes flats to sharps.
fn shifted(name: &str, shift: i32) -> String {
    if shift == 0 {
        name.to_string()
    } else {
        chords::transpose(name, shift)
    }
}

pub fn render(song: &Song, shift: i32) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} — {}\n", song.title, song.artist));

    if let Some(key) = song.key.as_deref() {
        out.push_str(&format!("Key: {}", shifted(key, shift)));
        if shift != 0 {
            out.push_str(&format!(" (original: {key}, shift {shift:+})"));
        }
        out.push('\n');
    }
    out.push('\n');

    let mut lines: Vec<&LyricLine> = song.lyrics.iter().collect();
    lines.sort_by_key(|l| l.line_number);

    for line in lines {
        let row = chord_row(line, shift);
        if !row.is_empty() {
            out.push_str(&row);
            out.push('\n');
        }
        out.push_str(&line.text);
        out.push('\n');
    }
    out
}

/// Builds the chord row for one lyric line: each chord name starts at its
/// stored character offset, nudged right when the previous chord runs long.
/// Columns are counted in characters, matching the offsets the backend
/// stores, so names spelled with multi-byte symbols do not shift the rest.
fn chord_row(line: &LyricLine, shift: i32) -> String {
    let mut chords: Vec<_> = line.chords.iter().collect();
    chords.sort_by_key(|c| c.start);

    let mut row = String::new();
    let mut col = 0;
    for chord in chords {
        let start = chord.start as usize;
        while col < start {
            row.push(' ');
            col += 1;
        }
        if col > 0 && !row.ends_with(' ') {
            row.push(' ');
            col += 1;
        }
        let name = shifted(&chord.name, shift);
        col += name.chars().count();
        row.push_str(&name);
    }
    row
}
