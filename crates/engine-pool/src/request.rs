//! Analysis requests and results.

use crate::{EngineConfig, PoolError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uci::{GoOptions, GuiCommand, Score};

/// How much effort the engine may spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBudget {
    /// Search to a fixed depth in plies.
    Depth(u32),
    /// Search for a fixed wall-clock time.
    MoveTime(Duration),
}

impl SearchBudget {
    pub fn go_options(&self) -> GoOptions {
        match self {
            SearchBudget::Depth(d) => GoOptions::depth(*d),
            SearchBudget::MoveTime(t) => GoOptions::movetime(t.as_millis() as u64),
        }
    }

    /// Time after which a dispatched search is considered timed out.
    pub fn deadline(&self, config: &EngineConfig) -> Duration {
        match self {
            SearchBudget::Depth(_) => config.depth_timeout(),
            SearchBudget::MoveTime(t) => *t + config.movetime_grace(),
        }
    }

    fn validate(&self, config: &EngineConfig) -> Result<(), PoolError> {
        match *self {
            SearchBudget::Depth(d) if d == 0 || d > config.max_depth => Err(
                PoolError::InvalidRequest(format!("depth must be between 1 and {}", config.max_depth)),
            ),
            SearchBudget::MoveTime(t)
                if t.is_zero() || t > Duration::from_millis(config.max_movetime_ms) =>
            {
                Err(PoolError::InvalidRequest(format!(
                    "movetime must be between 1 and {} ms",
                    config.max_movetime_ms
                )))
            }
            _ => Ok(()),
        }
    }
}

/// A position to analyze: the standard start or a FEN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    StartPos,
    Fen(String),
}

impl Position {
    /// Parse the request notation: `start`/`startpos` or a FEN string.
    ///
    /// Only the shape of a FEN is checked (eight ranks, side to move);
    /// legality is the engine's business.
    pub fn parse(input: &str) -> Result<Self, PoolError> {
        if input.contains(['\n', '\r']) {
            return Err(PoolError::InvalidRequest(
                "position must be a single line".to_string(),
            ));
        }
        let input = input.trim();
        match input {
            "" => Err(PoolError::InvalidRequest("position is empty".to_string())),
            "start" | "startpos" => Ok(Position::StartPos),
            fen => {
                let fields: Vec<&str> = fen.split_whitespace().collect();
                if fields.len() < 2 || fields.len() > 6 {
                    return Err(PoolError::InvalidRequest(format!(
                        "FEN needs 2 to 6 fields, got {}",
                        fields.len()
                    )));
                }
                if fields[0].split('/').count() != 8 {
                    return Err(PoolError::InvalidRequest(
                        "FEN board must have 8 ranks".to_string(),
                    ));
                }
                if !matches!(fields[1], "w" | "b") {
                    return Err(PoolError::InvalidRequest(format!(
                        "FEN side to move must be 'w' or 'b', got '{}'",
                        fields[1]
                    )));
                }
                // Anything else in the optional fields would reach the engine
                // as part of the `position` command.
                let optional = [
                    ("castling", is_castling as fn(&str) -> bool),
                    ("en passant", is_en_passant),
                    ("halfmove clock", is_counter),
                    ("fullmove number", is_counter),
                ];
                for (field, (name, valid)) in fields[2..].iter().zip(optional) {
                    if !valid(field) {
                        return Err(PoolError::InvalidRequest(format!(
                            "FEN {} field is invalid: '{}'",
                            name, field
                        )));
                    }
                }
                Ok(Position::Fen(fields.join(" ")))
            }
        }
    }

    fn white_to_move(&self) -> bool {
        match self {
            Position::StartPos => true,
            Position::Fen(fen) => fen.split_whitespace().nth(1) != Some("b"),
        }
    }
}

/// One request for a best move / evaluation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub position: Position,
    /// Moves in UCI notation played from `position`.
    pub moves: Vec<String>,
    pub budget: SearchBudget,
    /// Who asked, for logs and the result.
    pub requester: String,
}

impl AnalysisRequest {
    /// Build a request from its wire form, validating position and moves.
    pub fn new(
        position: &str,
        moves: Vec<String>,
        budget: SearchBudget,
        requester: impl Into<String>,
    ) -> Result<Self, PoolError> {
        let position = Position::parse(position)?;
        if let Some(bad) = moves.iter().find(|m| !is_uci_move(m)) {
            return Err(PoolError::InvalidRequest(format!(
                "'{}' is not a UCI move",
                bad
            )));
        }
        Ok(Self {
            position,
            moves,
            budget,
            requester: requester.into(),
        })
    }

    /// Check the budget against the configured limits.
    pub fn validate(&self, config: &EngineConfig) -> Result<(), PoolError> {
        self.budget.validate(config)
    }

    pub fn position_command(&self) -> GuiCommand {
        GuiCommand::Position {
            fen: match &self.position {
                Position::StartPos => None,
                Position::Fen(fen) => Some(fen.clone()),
            },
            moves: self.moves.clone(),
        }
    }

    /// Whether White is to move once `moves` have been played.
    pub fn white_to_move(&self) -> bool {
        self.position.white_to_move() ^ (self.moves.len() % 2 == 1)
    }
}

fn is_castling(field: &str) -> bool {
    field == "-" || (!field.is_empty() && field.len() <= 4 && field.chars().all(|c| "KQkq".contains(c)))
}

fn is_en_passant(field: &str) -> bool {
    match field.as_bytes() {
        b"-" => true,
        [file, rank] => (b'a'..=b'h').contains(file) && matches!(*rank, b'3' | b'6'),
        _ => false,
    }
}

fn is_counter(field: &str) -> bool {
    !field.is_empty() && field.len() <= 5 && field.bytes().all(|b| b.is_ascii_digit())
}

fn is_uci_move(mv: &str) -> bool {
    let b = mv.as_bytes();
    let square = |f: u8, r: u8| (b'a'..=b'h').contains(&f) && (b'1'..=b'8').contains(&r);
    match b.len() {
        4 => square(b[0], b[1]) && square(b[2], b[3]),
        5 => square(b[0], b[1]) && square(b[2], b[3]) && b"qrbn".contains(&b[4]),
        _ => false,
    }
}

/// How a request ended after it reached an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Ok,
    Timeout,
    EngineError,
}

/// Outcome of one analysis. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub requester: String,
    /// Best move in UCI notation; absent on timeout, error, or no legal move.
    pub best_move: Option<String>,
    /// Evaluation in pawns from White's point of view.
    pub evaluation: Option<f64>,
    /// Mate distance in moves from White's point of view.
    pub mate: Option<i32>,
    /// Search depth reached.
    pub depth: Option<u32>,
    /// Principal variation.
    pub pv: Vec<String>,
    pub status: AnalysisStatus,
    /// Failure detail for `Timeout` and `EngineError`.
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl AnalysisResult {
    pub(crate) fn completed(
        request: &AnalysisRequest,
        best_move: Option<String>,
        score: Option<Score>,
        depth: Option<u32>,
        pv: Vec<String>,
        elapsed: Duration,
    ) -> Self {
        let score = score.map(|s| if request.white_to_move() { s } else { s.flipped() });
        let (evaluation, mate) = match score {
            Some(Score::Cp(cp)) => (Some(f64::from(cp) / 100.0), None),
            Some(Score::Mate(m)) => (None, Some(m)),
            None => (None, None),
        };
        Self {
            requester: request.requester.clone(),
            best_move,
            evaluation,
            mate,
            depth,
            pv,
            status: AnalysisStatus::Ok,
            error: None,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub(crate) fn failed(
        request: &AnalysisRequest,
        status: AnalysisStatus,
        error: &PoolError,
        elapsed: Duration,
    ) -> Self {
        Self {
            requester: request.requester.clone(),
            best_move: None,
            evaluation: None,
            mate: None,
            depth: None,
            pv: Vec::new(),
            status,
            error: Some(error.to_string()),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == AnalysisStatus::Ok
    }
}
