//! Live tuner loop: connect, capture, render one line per measurement.

use std::time::Duration;

use anyhow::{bail, Result};

use chordbook_core::protocol;
use chordbook_core::session::{Measurement, SessionConfig, TunerEvent, TunerSession};
use chordbook_core::tuning::{self, Intonation, TuningProfile, TUNINGS};

pub async fn run(server: &str, tuning_name: &str, idle_timeout: Option<u64>) -> Result<()> {
    let Some(profile) = tuning::profile_by_name(tuning_name) else {
        bail!("unknown tuning '{tuning_name}'; see `chordbook tunings`");
    };
    let index = TUNINGS.iter().position(|t| t == profile).unwrap();

    let mut config = SessionConfig::new(protocol::tuner_endpoint(server));
    config.idle_timeout = idle_timeout.map(Duration::from_secs);

    println!("Connecting to {} ...", config.endpoint);
    let (mut session, mut events) = TunerSession::connect(config).await?;

    // Tuning must be picked before capture starts; it is locked after.
    session.select_tuning(index)?;
    println!("Tuning: {}", profile.name);
    for line in profile_lines(profile) {
        println!("{line}");
    }

    session.start_capture()?;
    println!("Listening — play a string, Ctrl-C to quit.\n");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            event = events.recv() => match event {
                Some(TunerEvent::Measurement(m)) => render(&m, profile),
                Some(TunerEvent::Disconnected { reason }) => {
                    session.stop_capture();
                    eprintln!("\nConnection lost: {reason}");
                    break;
                }
                None => break,
            },
        }
    }

    session.close().await;
    Ok(())
}

/// One display line per string, numbered 1 (highest-pitched) to 6 as on the
/// instrument.
pub(crate) fn profile_lines(profile: &TuningProfile) -> Vec<String> {
    profile
        .strings
        .iter()
        .enumerate()
        .map(|(i, s)| format!("  {}  {:<3} {:>7.2} Hz", i + 1, s.note, s.frequency))
        .collect()
}

fn render(m: &Measurement, profile: &TuningProfile) {
    let Some(index) = m.string_index else {
        println!(" --                      no signal");
        return;
    };
    let string = &profile.strings[index];
    let hint = match m.intonation {
        Intonation::Flat => "tighten ↑",
        Intonation::InTune => "✓",
        Intonation::Sharp => "loosen ↓",
    };
    println!(
        "{:<3} {:>8.2} Hz  target {:>7.2} Hz  {:>+4.0} cents  {:<7} {}",
        string.note, m.frequency, string.frequency, m.cents, m.intonation, hint
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_are_numbered_one_to_six_highest_first() {
        let lines = profile_lines(&TUNINGS[0]);
        assert_eq!(lines.len(), 6);
        assert!(lines[0].trim_start().starts_with("1  E4"));
        assert!(lines[5].trim_start().starts_with("6  E2"));
    }
}
