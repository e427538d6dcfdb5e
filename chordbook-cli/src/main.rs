//! # chordbook — terminal client for the chord-sheet backend
//!
//! Subcommands cover the two halves of the product: the live guitar tuner
//! (microphone → pitch-detection service → per-string readout) and thin
//! song/chord commands over the REST API.

mod sheet;
mod tune;

use anyhow::Result;
use clap::{Parser, Subcommand};

use chordbook_core::api::{ApiClient, AuthSession};
use chordbook_core::chords;
use chordbook_core::tuning::TUNINGS;

#[derive(Parser)]
#[command(name = "chordbook", version, about = "Chord-sheet client with a live guitar tuner")]
struct Cli {
    /// Backend base URL
    #[arg(
        long,
        env = "CHORDBOOK_SERVER",
        default_value = "http://localhost:8080",
        global = true
    )]
    server: String,

    /// Bearer token for authenticated commands (see `chordbook login`)
    #[arg(long, env = "CHORDBOOK_TOKEN", global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the live guitar tuner
    Tune {
        /// Tuning profile, by name prefix ("standard", "drop d", "dadgad", ...)
        #[arg(long, default_value = "standard")]
        tuning: String,
        /// Seconds of detector silence (while sending audio) before the
        /// session reports a dead link
        #[arg(long)]
        idle_timeout: Option<u64>,
    },
    /// List the built-in tuning profiles
    Tunings,
    /// Transpose a chord by a number of semitones
    Transpose {
        chord: String,
        #[arg(allow_hyphen_values = true)]
        semitones: i32,
    },
    /// List songs: approved public songs, or your own with --mine
    Songs {
        #[arg(long)]
        mine: bool,
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Show one song as a chord sheet
    Song {
        id: i64,
        /// Shift all chords by this many semitones (-11 to 11)
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        transpose: i32,
    },
    /// Log in and print a bearer token
    Login { username: String, password: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let session = match &cli.token {
        Some(token) => AuthSession::with_token(token),
        None => AuthSession::anonymous(),
    };
    let client = ApiClient::new(&cli.server, session);

    match cli.command {
        Command::Tune {
            tuning,
            idle_timeout,
        } => tune::run(&cli.server, &tuning, idle_timeout).await?,

        Command::Tunings => {
            for profile in TUNINGS.iter() {
                println!("{}", profile.name);
                for line in tune::profile_lines(profile) {
                    println!("{line}");
                }
            }
        }

        Command::Transpose { chord, semitones } => {
            println!("{}", chords::transpose(&chord, semitones));
        }

        Command::Songs { mine, page } => {
            let songs = if mine {
                client.my_songs().await?
            } else {
                let page = client.public_songs(page, 20).await?;
                println!(
                    "page {}/{} ({} songs total)",
                    page.number + 1,
                    page.total_pages.max(1),
                    page.total_elements
                );
                page.content
            };
            for song in songs {
                println!(
                    "{:>5}  {:<30}  {:<20}  {}",
                    song.id, song.title, song.artist, song.status
                );
            }
        }

        Command::Song { id, transpose } => {
            let song = client.song(id).await?;
            print!("{}", sheet::render(&song, transpose));
        }

        Command::Login { username, password } => {
            let auth = client.login(&username, &password).await?;
            println!("{}", auth.token);
            eprintln!("export CHORDBOOK_TOKEN={}", auth.token);
        }
    }

    Ok(())
}
