//! UCI (Universal Chess Interface) wire codec.
//!
//! The protocol is line oriented: the GUI writes commands to the engine's
//! stdin and reads replies from its stdout. This crate formats the GUI side
//! ([`GuiCommand::to_uci`]) and parses the engine side
//! ([`EngineMessage::parse`]), and the reverse pair for writing engines.
//!
//! # Commands used by the engine pool
//!
//! - `uci` / `uciok` - Handshake, engine sends `id` lines in between
//! - `isready` / `readyok` - Synchronization
//! - `setoption name <id> [value <x>]` - Configure the engine
//! - `position (startpos | fen <fen>) [moves <move>...]` - Set position
//! - `go [movetime <ms>] [depth <d>]` - Start search, ends with `bestmove`
//! - `stop` - Stop search
//! - `quit` - Exit engine

mod command;
mod info;

pub use command::{GoOptions, GuiCommand};
pub use info::{EngineInfo, InfoBuilder, Score, ScoreBound};

use std::io::{BufRead, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UciError {
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Moves engines send in `bestmove` when there is nothing to play.
const NULL_MOVES: [&str; 2] = ["(none)", "0000"];

/// Messages sent from engine to GUI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Engine identification.
    Id { name: Option<String>, author: Option<String> },
    /// Option declaration during the handshake (kept verbatim).
    Option(String),
    /// UCI initialization complete.
    UciOk,
    /// Engine is ready.
    ReadyOk,
    /// Search information.
    Info(EngineInfo),
    /// Best move found. `mv` is `None` when the position has no legal move.
    BestMove { mv: Option<String>, ponder: Option<String> },
    /// Anything else (banners, debug chatter).
    Unknown(String),
}

impl EngineMessage {
    /// Parse one line of engine output.
    ///
    /// Lines that are not part of the vocabulary come back as
    /// [`EngineMessage::Unknown`]. A line that starts with a known keyword but
    /// is malformed is an error, since it means the stream cannot be trusted.
    pub fn parse(line: &str) -> Result<Self, UciError> {
        let line = line.trim();
        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((k, r)) => (k, r.trim()),
            None => (line, ""),
        };

        match keyword {
            "uciok" => Ok(EngineMessage::UciOk),
            "readyok" => Ok(EngineMessage::ReadyOk),
            "id" => {
                if let Some(name) = rest.strip_prefix("name ") {
                    Ok(EngineMessage::Id {
                        name: Some(name.trim().to_string()),
                        author: None,
                    })
                } else if let Some(author) = rest.strip_prefix("author ") {
                    Ok(EngineMessage::Id {
                        name: None,
                        author: Some(author.trim().to_string()),
                    })
                } else {
                    Err(UciError::ParseError(format!("Malformed id line: '{}'", line)))
                }
            }
            "option" => Ok(EngineMessage::Option(rest.to_string())),
            "info" => EngineInfo::parse(line)
                .map(EngineMessage::Info)
                .ok_or_else(|| UciError::ParseError(format!("Malformed info line: '{}'", line))),
            "bestmove" => {
                let mut parts = rest.split_whitespace();
                let mv = parts
                    .next()
                    .ok_or_else(|| UciError::ParseError("bestmove without a move".to_string()))?;
                let ponder = match (parts.next(), parts.next()) {
                    (Some("ponder"), Some(p)) => Some(p.to_string()),
                    (None, _) => None,
                    _ => {
                        return Err(UciError::ParseError(format!(
                            "Malformed bestmove line: '{}'",
                            line
                        )))
                    }
                };
                let mv = if NULL_MOVES.contains(&mv) {
                    None
                } else {
                    Some(mv.to_string())
                };
                Ok(EngineMessage::BestMove { mv, ponder })
            }
            _ => Ok(EngineMessage::Unknown(line.to_string())),
        }
    }

    /// Format message for output.
    pub fn to_uci(&self) -> String {
        match self {
            EngineMessage::Id { name, author } => {
                let mut parts = Vec::new();
                if let Some(n) = name {
                    parts.push(format!("id name {}", n));
                }
                if let Some(a) = author {
                    parts.push(format!("id author {}", a));
                }
                parts.join("\n")
            }
            EngineMessage::Option(decl) => format!("option {}", decl),
            EngineMessage::UciOk => "uciok".to_string(),
            EngineMessage::ReadyOk => "readyok".to_string(),
            EngineMessage::Info(info) => info.to_uci(),
            EngineMessage::BestMove { mv, ponder } => {
                let mv = mv.as_deref().unwrap_or(NULL_MOVES[0]);
                match ponder {
                    Some(p) => format!("bestmove {} ponder {}", mv, p),
                    None => format!("bestmove {}", mv),
                }
            }
            EngineMessage::Unknown(raw) => raw.clone(),
        }
    }
}

/// Simple synchronous UCI engine wrapper for writing engines.
pub struct UciEngine<R: BufRead, W: Write> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> UciEngine<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read and parse the next command from GUI. `Ok(None)` on end of input.
    pub fn read_command(&mut self) -> Result<Option<GuiCommand>, UciError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        GuiCommand::parse(&line).map(Some)
    }

    /// Send a message to the GUI.
    pub fn send(&mut self, msg: &EngineMessage) -> Result<(), UciError> {
        self.send_raw(&msg.to_uci())
    }

    /// Write an arbitrary line.
    pub fn send_raw(&mut self, line: &str) -> Result<(), UciError> {
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Send engine identification.
    pub fn send_id(&mut self, name: &str, author: &str) -> Result<(), UciError> {
        self.send(&EngineMessage::Id {
            name: Some(name.to_string()),
            author: Some(author.to_string()),
        })
    }

    /// Send uciok.
    pub fn send_uciok(&mut self) -> Result<(), UciError> {
        self.send(&EngineMessage::UciOk)
    }

    /// Send readyok.
    pub fn send_readyok(&mut self) -> Result<(), UciError> {
        self.send(&EngineMessage::ReadyOk)
    }

    /// Send best move.
    pub fn send_bestmove(&mut self, mv: Option<&str>) -> Result<(), UciError> {
        self.send(&EngineMessage::BestMove {
            mv: mv.map(str::to_string),
            ponder: None,
        })
    }

    /// Send search info.
    pub fn send_info(&mut self, info: EngineInfo) -> Result<(), UciError> {
        self.send(&EngineMessage::Info(info))
    }
}

/// Create a UCI engine using stdin/stdout.
pub fn stdio_engine() -> UciEngine<std::io::BufReader<std::io::Stdin>, std::io::Stdout> {
    UciEngine::new(std::io::BufReader::new(std::io::stdin()), std::io::stdout())
}
