//! The engine puts all pieces together: it owns the current position and
//! implements the [Universal Chess Interface] (UCI) for communication with
//! the client (e.g. a tournament runner or a GUI).
//!
//! [`Engine::uci_loop`] is the "main loop" which reads commands from the
//! input stream and writes responses to the output stream.
//!
//! [Universal Chess Interface]: https://www.chessprogramming.org/UCI

use std::io::{BufRead, Write};

use anyhow::Context;
use tracing::debug;

use crate::chess::core::Move;
use crate::chess::position::Position;
use crate::engine::uci::{Command, Response};

mod uci;

/// The Engine connects everything together and handles commands sent by the
/// UCI server. It is created when the program is started and implements the
/// "main loop" via [`Engine::uci_loop`].
pub struct Engine<'a, R: BufRead, W: Write> {
    /// Next search will start from this position.
    position: Position,
    debug: bool,
    /// UCI commands will be read from this stream.
    input: &'a mut R,
    /// Responses to UCI commands will be written to this stream.
    out: &'a mut W,
}

impl<'a, R: BufRead, W: Write> Engine<'a, R, W> {
    /// Creates a new instance of the engine with the starting position set
    /// up.
    #[must_use]
    pub fn new(input: &'a mut R, out: &'a mut W) -> Self {
        Self {
            position: Position::starting(),
            debug: false,
            input,
            out,
        }
    }

    /// Continuously reads the input stream and executes sent UCI commands
    /// until "quit" is sent or the stream ends.
    ///
    /// The implementation does not aim to be complete and exhaustive: the
    /// main goal is to make the engine work in reasonably simple setups.
    /// Unknown and unsupported commands are skipped with a notice, never
    /// failing the session; an engine that dies on strange input loses the
    /// game on time.
    ///
    /// # Errors
    ///
    /// Returns an error only when one of the streams does: protocol-level
    /// problems are not errors.
    pub fn uci_loop(&mut self) -> anyhow::Result<()> {
        loop {
            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(error) => return Err(error).context("reading UCI input"),
            }
            let command = Command::parse(&line);
            debug!(?command, "received command");
            match command {
                Command::Uci => self.handshake()?,
                Command::Debug { on } => self.debug = on,
                Command::IsReady => self.respond(&Response::ReadyOk)?,
                Command::NewGame => self.position = Position::starting(),
                Command::SetPosition { fen, moves } => {
                    self.set_position(fen.as_deref(), &moves)?;
                }
                Command::Go { .. } => self.go()?,
                // Search is synchronous so far, so there is nothing in
                // flight to interrupt.
                Command::Stop | Command::PonderHit => {}
                Command::Quit => break,
                Command::Unknown(line) => {
                    if !line.is_empty() {
                        self.respond(&Response::Info(format!(
                            "string unsupported command: {line}"
                        )))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn respond(&mut self, response: &Response) -> anyhow::Result<()> {
        writeln!(self.out, "{response}").context("writing UCI response")?;
        self.out.flush().context("flushing UCI response")
    }

    /// Responds to the `uci` handshake command by identifying the engine.
    fn handshake(&mut self) -> anyhow::Result<()> {
        self.respond(&Response::Id {
            name: format!("{} {}", env!("CARGO_PKG_NAME"), crate::engine_version()),
            author: env!("CARGO_PKG_AUTHORS").to_string(),
        })?;
        self.respond(&Response::UciOk)
    }

    /// Changes the position to the one specified in the command. The moves
    /// are applied only after they are found in the legal move list: the
    /// engine never trusts the server enough to corrupt its own board.
    fn set_position(&mut self, fen: Option<&str>, moves: &[String]) -> anyhow::Result<()> {
        let mut position = match fen {
            Some(fen) => match Position::try_from(fen) {
                Ok(position) => position,
                Err(error) => {
                    return self
                        .respond(&Response::Info(format!("string ignoring position: {error}")));
                }
            },
            None => Position::starting(),
        };
        for uci_move in moves {
            let candidate = match Move::from_uci(uci_move) {
                Ok(candidate) => candidate,
                Err(error) => {
                    return self.respond(&Response::Info(format!(
                        "string ignoring position: {error}"
                    )));
                }
            };
            if !position.legal_moves().contains(&candidate) {
                return self.respond(&Response::Info(format!(
                    "string ignoring position: {candidate} is not legal"
                )));
            }
            let _ = position.apply(&candidate);
        }
        self.position = position;
        Ok(())
    }

    /// Reports the move to play in the current position. This is the seam
    /// where a real search plugs in; until then the selector simply takes
    /// the first legal move, and a terminal position yields the null move.
    fn go(&mut self) -> anyhow::Result<()> {
        if self.debug {
            let position = self.position.to_string();
            self.respond(&Response::Info(format!("string searching {position}")))?;
        }
        let best = self.position.legal_moves().first().copied();
        debug!(best = ?best.map(|m| m.to_string()), "selected move");
        self.respond(&Response::BestMove { best, ponder: None })
    }
}
