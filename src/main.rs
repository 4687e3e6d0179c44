use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, LevelFilter};
use std::{
    error::Error,
    io::{self, Write},
    path::PathBuf,
    rc::Rc,
    time::Duration,
};

use encore::{
    app_dirs::AppDirs,
    catalog::Catalog,
    celebration::Celebration,
    challenge::{ChallengeId, Difficulty},
    challenge_store::ChallengeStore,
    config::{Config, ConfigStore, FileConfigStore},
    engine::{AudioEngine, EngineState, SimulatedEngine},
    error::{PlaybackError, StoreError},
    history::{humanize_since, CompletionRecord, HistoryDb},
    ledger::Ledger,
    monitor::CompletionEvent,
    persistence::{autosave, load_challenges, load_ledger, SqliteKv},
    player::Player,
    profile::ProfileSummary,
    runtime::{Command, FixedTicker, PlayerEvent, Runner, StdinEventSource},
    util::{format_time, progress_bar},
};

const PROGRESS_BAR_WIDTH: usize = 30;

/// play music challenges to the end and collect points
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Play music challenges through to the end to earn points. Progress, points and completion history persist between runs."
)]
pub struct Cli {
    /// keep the database and config under this directory
    #[clap(long, global = true)]
    data_dir: Option<PathBuf>,

    /// log debug output to stderr (RUST_LOG still takes precedence)
    #[clap(short = 'v', long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// list challenges with their progress
    List {
        /// only show challenges of this difficulty
        #[clap(short = 'd', long, value_enum)]
        difficulty: Option<DifficultyFilter>,
    },
    /// show points, completion rate and achievements
    Profile,
    /// play a challenge; type p, r, f, b or q and press enter while it plays
    Play {
        id: String,

        /// seconds of playback per second of wall clock
        #[clap(short = 's', long)]
        speed: Option<f64>,

        /// start this many seconds into the track
        #[clap(long)]
        from: Option<f64>,
    },
    /// mark a challenge complete without playing it
    Complete { id: String },
    /// show completed challenges, newest first
    History {
        /// write the history as CSV to stdout
        #[clap(long)]
        csv: bool,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum)]
enum DifficultyFilter {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyFilter> for Difficulty {
    fn from(filter: DifficultyFilter) -> Self {
        match filter {
            DifficultyFilter::Easy => Difficulty::Easy,
            DifficultyFilter::Medium => Difficulty::Medium,
            DifficultyFilter::Hard => Difficulty::Hard,
        }
    }
}

/// Everything a subcommand needs, loaded from disk
struct Context {
    config: Config,
    history: HistoryDb,
    challenges: ChallengeStore,
    ledger: Ledger,
}

impl Context {
    fn open(cli: &Cli) -> Result<Self, Box<dyn Error>> {
        let dirs = match &cli.data_dir {
            Some(dir) => AppDirs::with_data_dir(dir),
            None => AppDirs::new(),
        };
        let config_store = match dirs.config_path() {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        };
        let config = config_store.load();

        let db_path = dirs
            .db_path()
            .ok_or("could not resolve a directory for application state")?;
        debug!("using database {}", db_path.display());

        let kv = Rc::new(SqliteKv::open(&db_path)?);
        let history = HistoryDb::open(&db_path)?;
        let catalog = Catalog::builtin()?;
        let mut challenges = load_challenges(kv.as_ref(), catalog.challenges)?;
        let mut ledger = load_ledger(kv.as_ref())?;
        autosave(kv, &mut challenges, &mut ledger);

        Ok(Self {
            config,
            history,
            challenges,
            ledger,
        })
    }

    fn into_player(self) -> (Player<SimulatedEngine>, HistoryDb, Config) {
        let player = Player::new(
            SimulatedEngine::new(),
            self.challenges,
            self.ledger,
            self.config.completion,
        );
        (player, self.history, self.config)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let ctx = Context::open(&cli)?;

    match cli.command {
        Commands::List { difficulty } => list(&ctx, difficulty.map(Difficulty::from)),
        Commands::Profile => profile(&ctx),
        Commands::Play { id, speed, from } => play(ctx, &id, speed, from)?,
        Commands::Complete { id } => complete(ctx, &id)?,
        Commands::History { csv } => history(&ctx, csv)?,
    }

    Ok(())
}

fn list(ctx: &Context, difficulty: Option<Difficulty>) {
    let challenges = ctx
        .challenges
        .list()
        .iter()
        .filter(|c| difficulty.map_or(true, |d| c.difficulty == d));

    for c in challenges {
        let status = if ctx.ledger.is_completed(&c.id) {
            "✓"
        } else {
            " "
        };
        println!(
            "{status} {:<14} {:<16} {:<22} {:<6} {:>5} {:>4} pts {:>5.1}%",
            c.id.as_str(),
            c.title,
            c.artist,
            c.difficulty.to_string(),
            format_time(c.duration),
            c.points,
            c.progress,
        );
    }
}

fn profile(ctx: &Context) {
    let summary = ProfileSummary::compute(ctx.challenges.list(), &ctx.ledger);

    println!("Total points: {}", summary.total_points);
    println!(
        "Completed: {}/{} ({:.1}%)",
        summary.completed, summary.total_challenges, summary.completion_rate
    );
    println!("Average progress: {:.1}%", summary.average_progress);
    println!();
    println!("By difficulty:");
    for row in &summary.by_difficulty {
        println!(
            "  {:<6} {}/{}  ({} pts available)",
            row.difficulty.to_string(),
            row.completed,
            row.total,
            row.points_available
        );
    }
    println!();
    println!("Achievements:");
    if summary.achievements.is_empty() {
        println!("  none yet");
    }
    for achievement in &summary.achievements {
        println!("  🏆 {} - {}", achievement, achievement.description());
    }
}

fn play(
    ctx: Context,
    id: &str,
    speed: Option<f64>,
    from: Option<f64>,
) -> Result<(), Box<dyn Error>> {
    let (mut player, history, config) = ctx.into_player();
    let speed = speed.unwrap_or(config.playback_speed);
    if !(speed.is_finite() && speed > 0.0) {
        return Err(format!("speed must be a positive number, got {speed}").into());
    }

    player.play(&ChallengeId::from(id))?;
    if let Some(from) = from {
        player.seek_to(from)?;
    }
    if let Some(track) = player.current_track() {
        println!(
            "▶ {} - {} ({}, {} pts)",
            track.title,
            track.artist,
            format_time(track.duration),
            track.points
        );
    }
    println!("controls: p pause, r resume, f forward, b back, q quit (then enter)");

    let ticker = FixedTicker::new(Duration::from_millis(config.tick_interval_ms.max(1)));
    let runner = Runner::new(StdinEventSource::new(), ticker);
    let step_secs = runner.interval().as_secs_f64() * speed;

    loop {
        match runner.step() {
            PlayerEvent::Tick => {
                player.engine_mut().advance(step_secs);
                let completion = player.poll();
                print_status(&player)?;

                if let Some(event) = completion {
                    println!();
                    celebrate(player.challenges(), &history, &event)?;
                    break;
                }
                if player.engine().state() == EngineState::Ended {
                    println!();
                    break;
                }
            }
            PlayerEvent::Command(Command::Quit) => {
                println!();
                break;
            }
            PlayerEvent::Command(cmd) => {
                if let Err(e) = control(&mut player, cmd, config.seek_step_secs) {
                    eprintln!("\n{e}");
                }
            }
        }
    }

    player.stop();
    Ok(())
}

fn control<E: AudioEngine>(
    player: &mut Player<E>,
    cmd: Command,
    step: f64,
) -> Result<(), PlaybackError> {
    match cmd {
        Command::Pause => player.pause(),
        Command::Resume => player.resume(),
        Command::SeekForward => player.seek_forward(step).map(|_| ()),
        Command::SeekBackward => {
            if !player.seek_backward(step)? {
                println!("\ntrack finished, rewind is disabled");
            }
            Ok(())
        }
        Command::Quit => Ok(()),
    }
}

fn print_status<E: AudioEngine>(player: &Player<E>) -> io::Result<()> {
    let state = if player.is_playing() { "▶" } else { "⏸" };
    let position = player.session().state().current_position;
    let mut out = io::stdout();
    write!(
        out,
        "\r{state} {} {} / {} {:>5.1}%  +{} pts ",
        progress_bar(player.progress(), PROGRESS_BAR_WIDTH),
        format_time(position),
        format_time(player.duration()),
        player.progress(),
        player.points_counter().earned(),
    )?;
    out.flush()
}

fn celebrate(
    challenges: &ChallengeStore,
    history: &HistoryDb,
    event: &CompletionEvent,
) -> Result<(), StoreError> {
    let challenge = challenges.get(&event.challenge_id);
    let (title, artist) = challenge
        .map(|c| (c.title.as_str(), c.artist.as_str()))
        .unwrap_or((event.challenge_id.as_str(), ""));

    for line in Celebration::new(event, title, artist).lines() {
        println!("{line}");
    }
    history.record(&CompletionRecord::from_event(event, challenge))
}

fn complete(ctx: Context, id: &str) -> Result<(), Box<dyn Error>> {
    let (mut player, history, _) = ctx.into_player();
    match player.complete_challenge(&ChallengeId::from(id))? {
        Some(event) => celebrate(player.challenges(), &history, &event)?,
        None => println!("{id} is already completed"),
    }
    Ok(())
}

fn history(ctx: &Context, csv: bool) -> Result<(), Box<dyn Error>> {
    if csv {
        ctx.history.export_csv(io::stdout())?;
        return Ok(());
    }

    let records = ctx.history.list()?;
    if records.is_empty() {
        println!("no completions yet");
    }
    let now = chrono::Utc::now();
    for r in records {
        println!(
            "{:<16} +{:<4} via {:<11} {}",
            r.title,
            r.points_awarded,
            r.trigger,
            humanize_since(r.completed_at, now)
        );
    }
    Ok(())
}
