//! [UCI] message framing: engine-bound commands parsed from input lines and
//! GUI-bound responses formatted for the output stream.
//!
//! The protocol is a line-oriented text exchange. Both directions are plain
//! tagged variants: the original interface-per-message designs tend to be
//! much heavier than what the protocol needs. Anything the parser does not
//! recognize lands in [`Command::Unknown`] and is ignored by the engine, as
//! the protocol demands: an unsupported line must never fail the session.
//!
//! [UCI]: https://www.chessprogramming.org/UCI

use std::fmt;

use crate::chess::core::Move;

/// Engine-bound messages read from the input stream.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Command {
    Uci,
    Debug {
        on: bool,
    },
    IsReady,
    SetPosition {
        fen: Option<String>,
        moves: Vec<String>,
    },
    NewGame,
    Go {
        depth: Option<u32>,
        wtime: Option<u64>,
        btime: Option<u64>,
        winc: Option<u64>,
        binc: Option<u64>,
        nodes: Option<u64>,
        mate: Option<u32>,
        movetime: Option<u64>,
        infinite: bool,
    },
    Stop,
    PonderHit,
    Quit,
    Unknown(String),
}

fn parse_go(parts: &[&str]) -> Command {
    let mut depth = None;
    let mut wtime = None;
    let mut btime = None;
    let mut winc = None;
    let mut binc = None;
    let mut nodes = None;
    let mut mate = None;
    let mut movetime = None;
    let mut infinite = false;

    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" if i + 1 < parts.len() => depth = parts[i + 1].parse().ok(),
            "wtime" if i + 1 < parts.len() => wtime = parts[i + 1].parse().ok(),
            "btime" if i + 1 < parts.len() => btime = parts[i + 1].parse().ok(),
            "winc" if i + 1 < parts.len() => winc = parts[i + 1].parse().ok(),
            "binc" if i + 1 < parts.len() => binc = parts[i + 1].parse().ok(),
            "nodes" if i + 1 < parts.len() => nodes = parts[i + 1].parse().ok(),
            "mate" if i + 1 < parts.len() => mate = parts[i + 1].parse().ok(),
            "movetime" if i + 1 < parts.len() => movetime = parts[i + 1].parse().ok(),
            "infinite" => infinite = true,
            _ => {}
        }
        if parts[i] == "infinite" {
            i += 1;
        } else {
            i += 2;
        }
    }

    Command::Go {
        depth,
        wtime,
        btime,
        winc,
        binc,
        nodes,
        mate,
        movetime,
        infinite,
    }
}

fn parse_setposition(parts: &[&str]) -> Command {
    let moves_index = parts.iter().position(|&part| part == "moves");
    let fen = parts
        .iter()
        .position(|&part| part == "fen")
        .and_then(|index| {
            let end = moves_index.unwrap_or(parts.len());
            // Guards against degenerate input like "position moves fen".
            (index < end).then(|| parts[index + 1..end].join(" "))
        });
    let moves = match moves_index {
        Some(index) => parts[index + 1..]
            .iter()
            .map(|uci_move| (*uci_move).to_string())
            .collect(),
        None => vec![],
    };
    Command::SetPosition { fen, moves }
}

impl Command {
    pub(super) fn parse(input: &str) -> Self {
        let parts: Vec<&str> = input.split_whitespace().collect();

        // Blank lines map to an empty Unknown, which the engine skips
        // silently.
        if parts.is_empty() {
            return Self::Unknown(String::new());
        }

        match parts[0] {
            "uci" => Self::Uci,
            "debug" if parts.len() > 1 => Self::Debug {
                on: parts[1] == "on",
            },
            "isready" => Self::IsReady,
            "position" => parse_setposition(&parts),
            "ucinewgame" => Self::NewGame,
            "go" => parse_go(&parts),
            "stop" => Self::Stop,
            "ponderhit" => Self::PonderHit,
            "quit" => Self::Quit,
            _ => Self::Unknown(input.trim_end().to_string()),
        }
    }
}

/// GUI-bound messages written to the output stream, one line per message
/// ([`Response::Id`] spans two).
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Response {
    Id {
        name: String,
        author: String,
    },
    UciOk,
    ReadyOk,
    /// Free-form engine commentary, e.g. "info string ignoring illegal move".
    Info(String),
    /// The search result. `None` stands for the null move "0000" emitted on
    /// terminal positions.
    BestMove {
        best: Option<Move>,
        ponder: Option<Move>,
    },
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Id { name, author } => {
                write!(f, "id name {name}\nid author {author}")
            }
            Self::UciOk => write!(f, "uciok"),
            Self::ReadyOk => write!(f, "readyok"),
            Self::Info(body) => write!(f, "info {body}"),
            Self::BestMove { best, ponder } => {
                match best {
                    Some(best) => write!(f, "bestmove {best}")?,
                    None => write!(f, "bestmove 0000")?,
                }
                if let Some(ponder) = ponder {
                    write!(f, " ponder {ponder}")?;
                }
                Ok(())
            }
        }
    }
}
