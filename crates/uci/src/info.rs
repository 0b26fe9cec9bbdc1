//! UCI `info` line types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Score in centipawns or mate distance, from the side to move's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    /// Centipawn score (100 = 1 pawn advantage).
    Cp(i32),
    /// Mate in N moves (positive = side to move mates, negative = gets mated).
    Mate(i32),
}

impl Score {
    /// The same score seen from the other side.
    pub fn flipped(self) -> Self {
        match self {
            Score::Cp(cp) => Score::Cp(-cp),
            Score::Mate(m) => Score::Mate(-m),
        }
    }
}

/// Whether a reported score is exact or only a search window bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBound {
    Lower,
    Upper,
}

/// Search information from engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineInfo {
    /// Search depth in plies.
    pub depth: Option<u32>,
    /// Selective search depth.
    pub seldepth: Option<u32>,
    /// Principal variation index when the engine runs with MultiPV.
    pub multipv: Option<u32>,
    /// Score evaluation.
    pub score: Option<Score>,
    /// Set when the score is a lowerbound/upperbound rather than exact.
    pub bound: Option<ScoreBound>,
    /// Nodes searched.
    pub nodes: Option<u64>,
    /// Nodes per second.
    pub nps: Option<u64>,
    /// Time spent in milliseconds.
    pub time: Option<u64>,
    /// Principal variation (best line found).
    pub pv: Vec<String>,
    /// Arbitrary string info.
    pub string: Option<String>,
}

impl EngineInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// True for lines carrying an exact score for the main line.
    pub fn is_exact_main_line(&self) -> bool {
        self.score.is_some() && self.bound.is_none() && self.multipv.unwrap_or(1) == 1
    }

    /// Format as an `info` line.
    pub fn to_uci(&self) -> String {
        self.to_string()
    }

    /// Parse an `info` line. Returns `None` for any other line.
    ///
    /// Unknown tokens are skipped so that engine-specific fields
    /// (`tbhits`, `currmove`, `wdl`, ...) never break parsing.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace().peekable();
        if tokens.next() != Some("info") {
            return None;
        }

        let mut info = EngineInfo::new();
        while let Some(token) = tokens.next() {
            match token {
                "depth" => info.depth = number(&mut tokens),
                "seldepth" => info.seldepth = number(&mut tokens),
                "multipv" => info.multipv = number(&mut tokens),
                "nodes" => info.nodes = number(&mut tokens),
                "nps" => info.nps = number(&mut tokens),
                "time" => info.time = number(&mut tokens),
                "score" => {
                    info.score = match tokens.next_if(|t| *t == "cp" || *t == "mate") {
                        Some("cp") => number(&mut tokens).map(Score::Cp),
                        Some(_) => number(&mut tokens).map(Score::Mate),
                        None => None,
                    }
                }
                "lowerbound" => info.bound = Some(ScoreBound::Lower),
                "upperbound" => info.bound = Some(ScoreBound::Upper),
                "pv" => {
                    while let Some(mv) = tokens.next_if(|t| !INFO_KEYWORDS.contains(t)) {
                        info.pv.push(mv.to_string());
                    }
                }
                "string" => {
                    // Free text up to the end of the line.
                    info.string = Some(tokens.by_ref().collect::<Vec<_>>().join(" "));
                }
                _ => {}
            }
        }

        Some(info)
    }
}

/// Keywords that end a `pv` move list.
const INFO_KEYWORDS: &[&str] = &[
    "depth",
    "seldepth",
    "multipv",
    "score",
    "nodes",
    "nps",
    "time",
    "pv",
    "currmove",
    "currmovenumber",
    "hashfull",
    "tbhits",
    "string",
];

fn number<'a, T: std::str::FromStr>(
    tokens: &mut std::iter::Peekable<impl Iterator<Item = &'a str>>,
) -> Option<T> {
    tokens.next_if(|t| t.parse::<T>().is_ok())?.parse().ok()
}

impl fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("info")?;
        let fields = [
            ("depth", self.depth.map(u64::from)),
            ("seldepth", self.seldepth.map(u64::from)),
            ("multipv", self.multipv.map(u64::from)),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                write!(f, " {} {}", name, value)?;
            }
        }
        match self.score {
            Some(Score::Cp(cp)) => write!(f, " score cp {}", cp)?,
            Some(Score::Mate(m)) => write!(f, " score mate {}", m)?,
            None => {}
        }
        match (self.score, self.bound) {
            (Some(_), Some(ScoreBound::Lower)) => f.write_str(" lowerbound")?,
            (Some(_), Some(ScoreBound::Upper)) => f.write_str(" upperbound")?,
            _ => {}
        }
        for (name, value) in [("nodes", self.nodes), ("nps", self.nps), ("time", self.time)] {
            if let Some(value) = value {
                write!(f, " {} {}", name, value)?;
            }
        }
        if !self.pv.is_empty() {
            write!(f, " pv {}", self.pv.join(" "))?;
        }
        if let Some(text) = &self.string {
            write!(f, " string {}", text)?;
        }
        Ok(())
    }
}

/// Builds [`EngineInfo`] lines, mostly for engines under test.
#[derive(Default)]
pub struct InfoBuilder {
    info: EngineInfo,
}

impl InfoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(mut self, depth: u32) -> Self {
        self.info.depth = Some(depth);
        self
    }

    pub fn score_cp(mut self, cp: i32) -> Self {
        self.info.score = Some(Score::Cp(cp));
        self
    }

    pub fn score_mate(mut self, moves: i32) -> Self {
        self.info.score = Some(Score::Mate(moves));
        self
    }

    /// Mark the score as a search-window bound.
    pub fn bound(mut self, bound: ScoreBound) -> Self {
        self.info.bound = Some(bound);
        self
    }

    pub fn nodes(mut self, nodes: u64) -> Self {
        self.info.nodes = Some(nodes);
        self
    }

    pub fn time(mut self, ms: u64) -> Self {
        self.info.time = Some(ms);
        self
    }

    pub fn pv<S: Into<String>>(mut self, moves: impl IntoIterator<Item = S>) -> Self {
        self.info.pv = moves.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> EngineInfo {
        self.info
    }
}
