//! Commands sent from the GUI (us) to an engine.

use crate::UciError;
use std::fmt;

/// Commands sent from GUI to engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiCommand {
    /// Initialize UCI mode.
    Uci,
    /// Check if engine is ready.
    IsReady,
    /// Set an engine option.
    SetOption { name: String, value: Option<String> },
    /// Tell the engine the next position belongs to a new game.
    UciNewGame,
    /// Set up position. `fen: None` means the standard starting position.
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    /// Start calculating.
    Go(GoOptions),
    /// Stop calculating.
    Stop,
    /// Quit the engine.
    Quit,
    /// Unknown command (for forward compatibility).
    Unknown(String),
}

/// Options for the `go` command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoOptions {
    /// Search for exactly this time in milliseconds.
    pub movetime: Option<u64>,
    /// Search to this depth.
    pub depth: Option<u32>,
}

impl GoOptions {
    pub fn depth(depth: u32) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }

    pub fn movetime(ms: u64) -> Self {
        Self {
            movetime: Some(ms),
            ..Self::default()
        }
    }
}

impl fmt::Display for GuiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuiCommand::Uci => f.write_str("uci"),
            GuiCommand::IsReady => f.write_str("isready"),
            GuiCommand::SetOption { name, value: None } => write!(f, "setoption name {}", name),
            GuiCommand::SetOption {
                name,
                value: Some(value),
            } => write!(f, "setoption name {} value {}", name, value),
            GuiCommand::UciNewGame => f.write_str("ucinewgame"),
            GuiCommand::Position { fen, moves } => {
                match fen {
                    Some(fen) => write!(f, "position fen {}", fen)?,
                    None => f.write_str("position startpos")?,
                }
                if !moves.is_empty() {
                    write!(f, " moves {}", moves.join(" "))?;
                }
                Ok(())
            }
            GuiCommand::Go(opts) => {
                f.write_str("go")?;
                if let Some(depth) = opts.depth {
                    write!(f, " depth {}", depth)?;
                }
                if let Some(ms) = opts.movetime {
                    write!(f, " movetime {}", ms)?;
                }
                Ok(())
            }
            GuiCommand::Stop => f.write_str("stop"),
            GuiCommand::Quit => f.write_str("quit"),
            GuiCommand::Unknown(raw) => f.write_str(raw),
        }
    }
}

impl GuiCommand {
    /// Format the command as a single protocol line (no trailing newline).
    pub fn to_uci(&self) -> String {
        self.to_string()
    }

    /// Parse a UCI command string.
    pub fn parse(input: &str) -> Result<Self, UciError> {
        let input = input.trim();
        let mut parts = input.split_whitespace();

        let cmd = parts.next().unwrap_or("");

        match cmd {
            "uci" => Ok(GuiCommand::Uci),
            "isready" => Ok(GuiCommand::IsReady),
            "ucinewgame" => Ok(GuiCommand::UciNewGame),
            "stop" => Ok(GuiCommand::Stop),
            "quit" => Ok(GuiCommand::Quit),
            "setoption" => Self::parse_setoption(parts),
            "position" => Self::parse_position(parts),
            "go" => Ok(Self::parse_go(parts)),
            _ => Ok(GuiCommand::Unknown(input.to_string())),
        }
    }

    fn parse_setoption<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        let parts: Vec<&str> = parts.collect();
        if parts.first() != Some(&"name") {
            return Err(UciError::ParseError(
                "setoption requires 'name'".to_string(),
            ));
        }

        let value_idx = parts.iter().position(|&s| s == "value");
        let name_end = value_idx.unwrap_or(parts.len());
        let name = parts[1..name_end].join(" ");
        if name.is_empty() {
            return Err(UciError::ParseError("Empty option name".to_string()));
        }
        let value = value_idx.map(|idx| parts[idx + 1..].join(" "));

        Ok(GuiCommand::SetOption { name, value })
    }

    fn parse_position<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        let fen = match parts.next() {
            Some("startpos") => None,
            Some("fen") => {
                let mut fen_parts = Vec::new();
                for part in parts.by_ref() {
                    if part == "moves" {
                        break;
                    }
                    fen_parts.push(part);
                }
                if fen_parts.is_empty() {
                    return Err(UciError::ParseError("Missing FEN".to_string()));
                }
                let moves = parts.map(str::to_string).collect();
                return Ok(GuiCommand::Position {
                    fen: Some(fen_parts.join(" ")),
                    moves,
                });
            }
            Some(other) => {
                return Err(UciError::ParseError(format!(
                    "Expected 'startpos' or 'fen', got '{}'",
                    other
                )));
            }
            None => {
                return Err(UciError::ParseError(
                    "Expected 'startpos' or 'fen'".to_string(),
                ));
            }
        };

        let moves = match parts.next() {
            Some("moves") => parts.map(str::to_string).collect(),
            _ => Vec::new(),
        };

        Ok(GuiCommand::Position { fen, moves })
    }

    /// Only the fixed budgets the pool sends are kept; clock and node
    /// parameters (`wtime`, `nodes`, `infinite`, ...) are ignored.
    fn parse_go<'a>(parts: impl Iterator<Item = &'a str>) -> Self {
        let mut opts = GoOptions::default();
        let mut parts = parts.peekable();
        while let Some(part) = parts.next() {
            let mut value = || parts.next_if(|v| v.parse::<u64>().is_ok());
            match part {
                "movetime" => opts.movetime = value().and_then(|v| v.parse().ok()),
                "depth" => opts.depth = value().and_then(|v| v.parse().ok()),
                _ => {}
            }
        }
        GuiCommand::Go(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_position_startpos() {
        let cmd = GuiCommand::Position {
            fen: None,
            moves: vec![],
        };
        assert_eq!(cmd.to_uci(), "position startpos");
    }

    #[test]
    fn format_position_fen_with_moves() {
        let cmd = GuiCommand::Position {
            fen: Some("8/8/8/8/8/8/8/K6k w - - 0 1".to_string()),
            moves: vec!["a1a2".to_string(), "h1h2".to_string()],
        };
        assert_eq!(
            cmd.to_uci(),
            "position fen 8/8/8/8/8/8/8/K6k w - - 0 1 moves a1a2 h1h2"
        );
    }

    #[test]
    fn format_go() {
        assert_eq!(GuiCommand::Go(GoOptions::depth(12)).to_uci(), "go depth 12");
        assert_eq!(
            GuiCommand::Go(GoOptions::movetime(1500)).to_uci(),
            "go movetime 1500"
        );
    }

    #[test]
    fn format_setoption() {
        let cmd = GuiCommand::SetOption {
            name: "Hash".to_string(),
            value: Some("64".to_string()),
        };
        assert_eq!(cmd.to_uci(), "setoption name Hash value 64");
    }

    #[test]
    fn parse_simple_commands() {
        assert_eq!(GuiCommand::parse("uci").unwrap(), GuiCommand::Uci);
        assert_eq!(GuiCommand::parse("isready\n").unwrap(), GuiCommand::IsReady);
        assert_eq!(GuiCommand::parse("  stop ").unwrap(), GuiCommand::Stop);
        assert_eq!(
            GuiCommand::parse("debug on").unwrap(),
            GuiCommand::Unknown("debug on".to_string())
        );
    }

    #[test]
    fn parse_position_startpos_with_moves() {
        let cmd = GuiCommand::parse("position startpos moves e2e4 e7e5").unwrap();
        assert_eq!(
            cmd,
            GuiCommand::Position {
                fen: None,
                moves: vec!["e2e4".to_string(), "e7e5".to_string()]
            }
        );
    }

    #[test]
    fn parse_position_fen() {
        let cmd = GuiCommand::parse(
            "position fen rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1 moves e7e5",
        )
        .unwrap();
        assert_eq!(
            cmd,
            GuiCommand::Position {
                fen: Some(
                    "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1".to_string()
                ),
                moves: vec!["e7e5".to_string()]
            }
        );
    }

    #[test]
    fn parse_position_without_kind_fails() {
        assert!(GuiCommand::parse("position").is_err());
        assert!(GuiCommand::parse("position somewhere").is_err());
    }

    #[test]
    fn parse_setoption_multiword_name() {
        let cmd = GuiCommand::parse("setoption name Skill Level value 5").unwrap();
        assert_eq!(
            cmd,
            GuiCommand::SetOption {
                name: "Skill Level".to_string(),
                value: Some("5".to_string())
            }
        );
    }

    #[test]
    fn parse_go_options() {
        let GuiCommand::Go(opts) = GuiCommand::parse("go wtime 3000 btime 3000 movetime 1000 depth 9").unwrap() else {
            panic!("Expected Go command");
        };
        assert_eq!(opts, GoOptions { movetime: Some(1000), depth: Some(9) });

        let GuiCommand::Go(opts) = GuiCommand::parse("go depth infinite").unwrap() else {
            panic!("Expected Go command");
        };
        assert_eq!(opts, GoOptions::default());
    }

    #[test]
    fn go_formats_and_parses_back() {
        let opts = GoOptions {
            depth: Some(4),
            movetime: Some(250),
        };
        let line = GuiCommand::Go(opts.clone()).to_uci();
        assert_eq!(line, "go depth 4 movetime 250");
        assert_eq!(GuiCommand::parse(&line).unwrap(), GuiCommand::Go(opts));
    }

    #[test]
    fn format_ucinewgame() {
        assert_eq!(GuiCommand::UciNewGame.to_uci(), "ucinewgame");
        assert_eq!(GuiCommand::parse("ucinewgame").unwrap(), GuiCommand::UciNewGame);
    }
}
