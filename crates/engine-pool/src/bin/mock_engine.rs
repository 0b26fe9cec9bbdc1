//! Deterministic UCI engine used to exercise the engine pool.
//!
//! Always answers with the move and score given on the command line, after
//! sleeping for `movetime` (or `--delay-ms` for depth searches). `--mode`
//! selects a misbehaviour: never answering, malformed output, crashing,
//! skipping the handshake.

use clap::{Parser, ValueEnum};
use std::io::{BufRead, Write};
use std::time::Duration;
use uci::{stdio_engine, GoOptions, GuiCommand, InfoBuilder, ScoreBound, UciEngine, UciError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Well-behaved engine.
    Normal,
    /// Accept `go` and never answer, ignoring `stop`.
    Hang,
    /// Answer `go` with a `bestmove` line that has no move.
    Garbage,
    /// Answer `go` with a handshake reply instead of a search result.
    Desync,
    /// Exit as soon as `go` arrives.
    CrashOnGo,
    /// Never send `uciok` / `readyok`.
    NoHandshake,
    /// Report a mated position: `bestmove (none)`.
    NoLegalMoves,
}

#[derive(Parser, Debug)]
#[command(name = "mock-engine", about = "Scripted UCI engine for tests")]
struct Cli {
    /// Name reported in `id name`.
    #[arg(long, default_value = "MockFish")]
    name: String,

    /// Move reported in `bestmove`.
    #[arg(long, default_value = "e2e4")]
    bestmove: String,

    /// Centipawn score reported for the side to move.
    #[arg(long, default_value_t = 35, allow_hyphen_values = true)]
    score_cp: i32,

    /// Report a mate score instead of centipawns.
    #[arg(long, allow_hyphen_values = true)]
    score_mate: Option<i32>,

    /// Think time for searches without `movetime`.
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    #[arg(long, value_enum, default_value_t = Mode::Normal)]
    mode: Mode,

    /// Refuse (with a malformed `bestmove`) any `go` not preceded by a
    /// `ucinewgame` since the previous search.
    #[arg(long)]
    require_new_game: bool,

    /// Exit with status 3 this long after start-up.
    #[arg(long)]
    exit_after_ms: Option<u64>,
}

fn main() {
    let cli = Cli::parse();

    if let Some(ms) = cli.exit_after_ms {
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(ms));
            std::process::exit(3);
        });
    }

    let mut engine = stdio_engine();
    if let Err(e) = run(&cli, &mut engine) {
        eprintln!("mock-engine: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli, engine: &mut UciEngine<impl BufRead, impl Write>) -> Result<(), UciError> {
    let mut new_game = false;
    loop {
        let cmd = match engine.read_command() {
            Ok(Some(cmd)) => cmd,
            Ok(None) => return Ok(()),
            Err(e) => {
                eprintln!("Error reading command: {}", e);
                continue;
            }
        };

        match cmd {
            GuiCommand::Uci => {
                if cli.mode != Mode::NoHandshake {
                    engine.send_id(&cli.name, "chessOS")?;
                    engine.send_raw("option name Hash type spin default 16 min 1 max 1024")?;
                    engine.send_uciok()?;
                }
            }
            GuiCommand::IsReady => {
                if cli.mode != Mode::NoHandshake {
                    engine.send_readyok()?;
                }
            }
            GuiCommand::UciNewGame => new_game = true,
            GuiCommand::Go(_) if cli.require_new_game && !new_game => engine.send_raw("bestmove")?,
            GuiCommand::Go(opts) => {
                new_game = false;
                search(cli, engine, &opts)?
            }
            GuiCommand::Quit => return Ok(()),
            // Position, options and stop need no state: the answer is scripted.
            _ => {}
        }
    }
}

fn search(
    cli: &Cli,
    engine: &mut UciEngine<impl BufRead, impl Write>,
    opts: &GoOptions,
) -> Result<(), UciError> {
    match cli.mode {
        Mode::Hang => return Ok(()),
        Mode::CrashOnGo => std::process::exit(1),
        Mode::Garbage => return engine.send_raw("bestmove"),
        Mode::Desync => return engine.send_uciok(),
        Mode::NoLegalMoves => {
            engine.send_info(InfoBuilder::new().depth(0).score_mate(0).build())?;
            return engine.send_bestmove(None);
        }
        Mode::Normal | Mode::NoHandshake => {}
    }

    let think = opts
        .movetime
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(cli.delay_ms));
    std::thread::sleep(think);

    let depth = opts.depth.unwrap_or(1).clamp(1, 64);
    engine.send_raw("info string mock search started")?;
    for d in 1..=depth {
        if d == depth {
            // Bound lines must not be taken as the final score.
            let bound = InfoBuilder::new()
                .depth(d)
                .score_cp(9999)
                .bound(ScoreBound::Lower)
                .nodes(1);
            engine.send_info(bound.build())?;
        }
        let info = InfoBuilder::new()
            .depth(d)
            .nodes(1000 * u64::from(d))
            .time(think.as_millis() as u64)
            .pv([cli.bestmove.as_str()]);
        let info = match cli.score_mate {
            Some(m) => info.score_mate(m),
            None => info.score_cp(cli.score_cp),
        };
        engine.send_info(info.build())?;
    }
    engine.send_bestmove(Some(&cli.bestmove))
}
