use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use piecework_core::leaderboard::{DEFAULT_PLAYER_NAME, LEADERBOARD_DISPLAY_LIMIT};
use piecework_core::record::DEFAULT_PUZZLE_NAME;
use piecework_core::{
    format_elapsed, parse_play_link, share_link, InteractionEvent, JsonFileStore, LeaderboardStore,
    ManualClock, NewPuzzle, PlayRules, PuzzleError, PuzzleLibrary, PuzzleRecord, PuzzleSession,
    RngSource, SeededRandom, SubmitOutcome, SystemClock, Visibility, ALLOWED_PIECE_COUNTS,
    DEFAULT_PIECE_COUNT,
};
use piecework_image::{
    decode_stored, load_image, ImageError, ImageSource, DEFAULT_DEMO_SLUG, DEMO_CATALOG,
};
use rand::rngs::{SmallRng, StdRng};
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

mod bot;

use bot::{run_solver, validate_bot_config, BotRunConfig};

#[derive(Parser)]
#[command(name = "piecework", version, about = "Create, share and play jigsaw puzzles")]
struct Cli {
    #[arg(long, env = "PIECEWORK_STORE", default_value = "piecework.json", global = true)]
    store: PathBuf,
    #[arg(
        long,
        env = "PIECEWORK_SHARE_BASE",
        default_value = "http://localhost:8080/",
        global = true
    )]
    share_base: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a puzzle from an image file or a built-in demo picture.
    Create {
        #[arg(long, conflicts_with = "demo")]
        image: Option<PathBuf>,
        #[arg(long)]
        demo: Option<String>,
        #[arg(long, default_value = DEFAULT_PUZZLE_NAME)]
        name: String,
        #[arg(long, default_value_t = Visibility::Public)]
        visibility: Visibility,
        #[arg(long, default_value_t = DEFAULT_PIECE_COUNT)]
        pieces: u32,
    },
    /// List stored puzzles, newest first.
    List,
    Delete {
        id: String,
    },
    /// Print the share link for a puzzle.
    Link {
        id: String,
    },
    /// Resolve a share link and check access.
    Open {
        link: String,
    },
    /// Let the solver bot play a puzzle and record its time.
    Play {
        /// Defaults to the last opened puzzle.
        id: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        player: Option<String>,
        #[arg(long)]
        seed: Option<String>,
        #[arg(long, default_value_t = 0.2)]
        miss_rate: f32,
        #[arg(long)]
        verbose: bool,
    },
    Leaderboard {
        id: String,
        #[arg(long, default_value_t = LEADERBOARD_DISPLAY_LIMIT)]
        limit: usize,
    },
    /// List the built-in demo pictures.
    Demos,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "piecework=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let share_base = Url::parse(&cli.share_base)?;
    let clock = SystemClock;
    let mut store = JsonFileStore::open(&cli.store)?;
    info!(path = %store.path().display(), "using store");

    match cli.command {
        Commands::Create {
            image,
            demo,
            name,
            visibility,
            pieces,
        } => {
            let source = match (image, demo) {
                (Some(path), _) => read_upload(&path).await.map_err(PuzzleError::from)?,
                (None, Some(slug)) => ImageSource::Demo(slug),
                (None, None) => ImageSource::Demo(DEFAULT_DEMO_SLUG.to_string()),
            };
            let loaded = tokio::task::spawn_blocking(move || load_image(&source)).await??;
            let new = NewPuzzle {
                name,
                visibility,
                piece_count: pieces,
                image: loaded.into_stored(),
            };
            let mut library = PuzzleLibrary::new(&mut store, &clock);
            let record = match library.create(new, &mut rand::rng()) {
                Ok(record) => record,
                Err(err) => {
                    eprintln!("{err}");
                    eprintln!("offered sizes: {}", offered_sizes());
                    return Err(err.into());
                }
            };
            println!("id: {}", record.id);
            println!("name: {}", record.name);
            println!("grid: {}", record.grid.label());
            println!("visibility: {}", record.visibility.tag());
            println!("link: {}", share_link(&share_base, &record));
        }
        Commands::List => {
            let library = PuzzleLibrary::new(&mut store, &clock);
            let records = library.list()?;
            if records.is_empty() {
                println!("no puzzles yet");
            }
            for record in records {
                print_record_line(&record);
            }
        }
        Commands::Delete { id } => {
            let mut library = PuzzleLibrary::new(&mut store, &clock);
            if library.delete(&id)? {
                println!("deleted {id}");
            } else {
                println!("no puzzle {id}");
            }
        }
        Commands::Link { id } => {
            let library = PuzzleLibrary::new(&mut store, &clock);
            let record = library.get(&id)?;
            println!("{}", share_link(&share_base, &record));
        }
        Commands::Open { link } => {
            let Some(link) = parse_play_link(&link) else {
                return Err(format!("not a play link: {link}").into());
            };
            let mut library = PuzzleLibrary::new(&mut store, &clock);
            let record = library.open(&link.puzzle_id, link.token.as_deref())?;
            print_record_line(&record);
        }
        Commands::Play {
            id,
            token,
            player,
            seed,
            miss_rate,
            verbose,
        } => {
            let config = BotRunConfig {
                miss_rate,
                ..BotRunConfig::default()
            };
            validate_bot_config(config)?;
            let seed = match seed.as_deref() {
                Some(raw) => Some(parse_seed_arg(raw)?),
                None => None,
            };

            let (record, player) = {
                let mut library = PuzzleLibrary::new(&mut store, &clock);
                let id = match id.or(library.last_puzzle_id()?) {
                    Some(id) => id,
                    None => return Err("no puzzle given and none opened before".into()),
                };
                let record = library.open(&id, token.as_deref())?;
                let player = match player {
                    Some(name) => name,
                    None => library
                        .last_player_name()?
                        .unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_string()),
                };
                library.set_last_player_name(&player)?;
                (record, player)
            };
            let stored = record.image.clone();
            tokio::task::spawn_blocking(move || decode_stored(&stored)).await??;

            let sim_clock = ManualClock::new(0);
            let (mut session, mut bot_rng) = match seed {
                Some(seed) => (
                    PuzzleSession::from_record(
                        &record,
                        PlayRules::default(),
                        Box::new(SeededRandom::new(seed)),
                        Box::new(sim_clock.clone()),
                    )?,
                    StdRng::seed_from_u64(seed as u64),
                ),
                None => (
                    PuzzleSession::from_record(
                        &record,
                        PlayRules::default(),
                        Box::new(RngSource::<SmallRng>::from_os_rng()),
                        Box::new(sim_clock.clone()),
                    )?,
                    StdRng::from_os_rng(),
                ),
            };
            println!("playing {} ({})", record.name, record.grid.label());
            let report = run_solver(&mut session, &sim_clock, config, &mut bot_rng);
            if verbose {
                for event in &report.events {
                    print_event(event, session.total());
                }
            }
            println!("drags: {} (missed {})", report.drags, report.misses);
            let Some(outcome) = session.outcome() else {
                return Err("solver gave up before finishing".into());
            };
            println!("time: {}", format_elapsed(outcome.elapsed_ms));
            if let Some(time_ms) = outcome.leaderboard_time() {
                let mut board = LeaderboardStore::new(&mut store, &clock);
                match board.submit(&record.id, &player, time_ms)? {
                    SubmitOutcome::Inserted => println!("{player}: first time on the board"),
                    SubmitOutcome::Improved { previous_ms } => {
                        println!("{player}: new best (was {})", format_elapsed(previous_ms))
                    }
                    SubmitOutcome::Unchanged { best_ms } => {
                        println!("{player}: best stays {}", format_elapsed(best_ms))
                    }
                }
            }
        }
        Commands::Leaderboard { id, limit } => {
            PuzzleLibrary::new(&mut store, &clock).get(&id)?;
            let board = LeaderboardStore::new(&mut store, &clock);
            let entries = board.top(&id, limit)?;
            if entries.is_empty() {
                println!("no times yet");
            }
            for (rank, entry) in entries.iter().enumerate() {
                println!(
                    "{:>3}. {:<20} {}",
                    rank + 1,
                    entry.player_name,
                    format_elapsed(entry.best_time_ms)
                );
            }
        }
        Commands::Demos => {
            for entry in DEMO_CATALOG {
                println!("  {} ({}, {}x{})", entry.slug, entry.label, entry.width, entry.height);
            }
        }
    }

    Ok(())
}

async fn read_upload(path: &Path) -> Result<ImageSource, ImageError> {
    tokio::fs::read(path)
        .await
        .map(ImageSource::Bytes)
        .map_err(|err| ImageError::Read(format!("{}: {err}", path.display())))
}

fn print_record_line(record: &PuzzleRecord) {
    println!(
        "{}  {:<24} {:<9} {:>4} pieces  created {}",
        record.id,
        record.name,
        record.visibility.tag(),
        record.piece_count,
        record.created_at
    );
}

fn print_event(event: &InteractionEvent, total: usize) {
    match event {
        InteractionEvent::FirstInteraction => println!("  timer started"),
        InteractionEvent::DragStarted { index } => println!("  pick up #{index}"),
        InteractionEvent::PieceLocked { index, placed } => {
            println!("  lock #{index} ({placed}/{total})")
        }
        InteractionEvent::PieceDropped { index, pos, on_board } => {
            let place = if *on_board { "board" } else { "table" };
            println!("  drop #{index} on {place} at ({:.0}, {:.0})", pos.x, pos.y)
        }
        InteractionEvent::Solved => println!("  solved"),
    }
}

fn offered_sizes() -> String {
    ALLOWED_PIECE_COUNTS
        .iter()
        .map(|count| count.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_seed_arg(raw: &str) -> Result<u32, Box<dyn std::error::Error>> {
    let trimmed = raw.trim();
    let value = if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16)?
    } else {
        trimmed.parse::<u32>()?
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_accepts_hex_and_decimal() {
        assert_eq!(parse_seed_arg("0x1F").unwrap(), 31);
        assert_eq!(parse_seed_arg(" 42 ").unwrap(), 42);
        assert!(parse_seed_arg("nope").is_err());
    }

    #[test]
    fn cli_parses_create_flags() {
        let cli = Cli::try_parse_from([
            "piecework",
            "create",
            "--demo",
            "checker",
            "--visibility",
            "link",
            "--pieces",
            "48",
        ])
        .unwrap();
        match cli.command {
            Commands::Create {
                demo,
                visibility,
                pieces,
                name,
                ..
            } => {
                assert_eq!(demo.as_deref(), Some("checker"));
                assert_eq!(visibility, Visibility::Link);
                assert_eq!(pieces, 48);
                assert_eq!(name, DEFAULT_PUZZLE_NAME);
            }
            _ => panic!("expected create"),
        }
    }

    #[tokio::test]
    async fn unreadable_upload_is_image_unavailable() {
        let err = read_upload(Path::new("/definitely/not/here.png"))
            .await
            .map_err(PuzzleError::from)
            .unwrap_err();
        assert!(matches!(err, PuzzleError::ImageUnavailable(_)));
    }

    #[test]
    fn image_and_demo_conflict() {
        assert!(Cli::try_parse_from([
            "piecework", "create", "--image", "a.png", "--demo", "sunset"
        ])
        .is_err());
    }
}
