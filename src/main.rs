use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    style::{Print, Stylize},
    terminal::{disable_raw_mode, enable_raw_mode},
    tty::IsTty,
};
use std::{
    error::Error,
    fmt::Display,
    io::{self, stdin, Write},
    path::PathBuf,
    sync::mpsc::{self, Receiver},
    thread::{self, JoinHandle},
};

use fifteen_twenty::{
    config::{ConfigStore, FileConfigStore, GameConfig},
    input::EventSink,
    results_log::ResultsLog,
    round::RoundResult,
    rules::rules_text,
    runtime::{ChannelEventSource, Runner, TerminalInput},
    GameSession, SessionEvent,
};

/// fifteen-twenty: call the total of both hands before the computer does
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Play the fifteen-twenty hand game against the computer. Show a fist (f) or a palm (p) \
                  and call the total (0-9); the first to call the sum of both hands wins the round."
)]
pub struct Cli {
    /// number of decisive (non-draw) rounds to play
    #[clap(short = 't', long)]
    target_rounds: Option<u32>,

    /// seconds before a round is filled in at random
    #[clap(long)]
    timeout_secs: Option<u64>,

    /// path to a JSON config file (default: platform config dir)
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// append each finished session to the results log
    #[clap(long)]
    record: bool,

    /// ignore spoken start/exit phrases
    #[clap(long)]
    no_voice_commands: bool,

    /// write the effective configuration back to the config file
    #[clap(long)]
    save_config: bool,

    /// print the rules and exit
    #[clap(long)]
    rules: bool,
}

impl Cli {
    /// Command-line flags take precedence over the stored config.
    fn apply(&self, mut config: GameConfig) -> GameConfig {
        if let Some(target) = self.target_rounds {
            config.target_valid_rounds = target;
        }
        if let Some(secs) = self.timeout_secs {
            config.round_timeout_ms = secs * 1000;
        }
        if self.record {
            config.record_results = true;
        }
        if self.no_voice_commands {
            config.voice_commands = false;
        }
        config
    }

    fn config_store(&self) -> FileConfigStore {
        self.config
            .as_ref()
            .map_or_else(FileConfigStore::new, FileConfigStore::with_path)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let store = cli.config_store();
    let config = cli.apply(store.load());
    config.validate()?;
    if cli.save_config {
        store.save(&config)?;
    }

    if cli.rules {
        println!("{}", rules_text(&config));
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut session = GameSession::new(config.clone())?;
    if config.record_results {
        match ResultsLog::default_location() {
            Some(log) => session = session.with_results_log(log),
            None => log::warn!("no state directory, results will not be recorded"),
        }
    }

    let (tx, rx) = mpsc::channel();
    let (out_tx, out_rx) = mpsc::channel();

    enable_raw_mode()?;
    let mut input = TerminalInput::start(EventSink::new(tx));
    let runner = Runner::new(ChannelEventSource::new(rx), session, out_tx);
    let game = thread::spawn(move || runner.run());

    let mut stdout = io::stdout();
    let rendered = render_events(&mut stdout, out_rx, &config);

    input.stop();
    let joined = join_runner(game);
    disable_raw_mode()?;
    rendered?;
    joined?;

    Ok(())
}

/// Surfaces a panic on the game thread as an error instead of a clean exit.
fn join_runner<T>(handle: JoinHandle<T>) -> io::Result<T> {
    handle.join().map_err(|_| {
        log::error!("game loop panicked");
        io::Error::new(io::ErrorKind::Other, "game loop panicked")
    })
}

fn line<W: Write>(out: &mut W, content: impl Display) -> io::Result<()> {
    // raw mode: no implicit carriage return
    execute!(out, Print(content), Print("\r\n"))
}

fn render_events<W: Write>(
    out: &mut W,
    events: Receiver<SessionEvent>,
    config: &GameConfig,
) -> io::Result<()> {
    line(out, "Fifteen-Twenty".bold().cyan())?;
    line(
        out,
        "(s) start  (r) rules  (q) quit  |  (f) fist  (p) palm  (0-9) call".dark_grey(),
    )?;

    for event in events {
        match event {
            SessionEvent::SessionStarted {
                target_valid_rounds,
            } => {
                line(
                    out,
                    format!("Get ready... first to {} decisive rounds", target_valid_rounds)
                        .yellow(),
                )?;
            }
            SessionEvent::RoundStarted { round } => {
                line(out, format!("Round {}: waiting for input...", round).yellow())?;
            }
            SessionEvent::RoundResolved {
                outcome,
                standing,
                history,
            } => {
                let verdict = match outcome.result {
                    RoundResult::PlayerWin => "You win!".green().bold(),
                    RoundResult::ComputerWin => "You lose...".red().bold(),
                    RoundResult::Draw => "Draw".grey().bold(),
                };
                line(out, verdict)?;
                line(out, &outcome)?;
                if outcome.auto_filled.any() {
                    line(out, "(time ran out, missing input picked at random)".dark_grey())?;
                }
                line(
                    out,
                    format!(
                        "Player {} | Computer {} | Draws {} | Rounds {}/{}",
                        standing.player_wins,
                        standing.computer_wins,
                        standing.draws,
                        standing.valid_rounds,
                        config.target_valid_rounds
                    ),
                )?;
                if !history.is_empty() {
                    line(out, "Recent rounds:".dark_grey())?;
                    for entry in &history {
                        line(out, format!("  {}", entry).dark_grey())?;
                    }
                }
            }
            SessionEvent::SessionFinished(summary) => {
                for text in summary.to_string().lines() {
                    line(out, text.bold())?;
                }
                line(out, "(c) play again  (q) exit".dark_grey())?;
            }
            SessionEvent::SourceError(message) => {
                line(out, message.red())?;
            }
            SessionEvent::Rules(text) => {
                for text in text.lines() {
                    line(out, text)?;
                }
            }
        }
    }

    Ok(())
}
