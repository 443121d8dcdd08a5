//! Provides fully-specified [Chess Position] implementation: stores
//! information about the board and tracks the state of castling, en passant
//! and the 50-move rule counters.
//!
//! The move generator and move making/unmaking are also implemented here as
//! the way of mutating a [`Position`].
//!
//! [Chess Position]: https://www.chessprogramming.org/Chess_Position

use std::fmt;

use crate::chess::attacks;
use crate::chess::bitboard::{Bitboard, Board, BoardError};
use crate::chess::core::{
    CastlingRights, Direction, File, Move, MoveList, Piece, PieceKind, Player, Promotion, Rank,
    Square, BOARD_WIDTH,
};

/// Failure while decoding a position from Forsyth-Edwards Notation.
///
/// The first six variants describe syntax problems; the last two mean the
/// input parsed but describes a state the engine can not reason about.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    /// FEN has exactly six space-separated fields.
    #[error("expected 6 space-separated FEN fields, got {0}")]
    FieldCount(usize),
    /// The piece placement field does not describe an 8x8 board.
    #[error("malformed piece placement: {0}")]
    Placement(String),
    /// The active player field is not "w" or "b".
    #[error("malformed side to move: {0:?}")]
    SideToMove(String),
    /// The castling field is not "-" or a canonical subsequence of "KQkq".
    #[error("malformed castling rights: {0}")]
    Castling(String),
    /// The en passant field is not "-" or a square on rank 3 or 6.
    #[error("malformed en passant target: {0}")]
    EnPassant(String),
    /// A clock field is not a plain decimal number in range.
    #[error("malformed {counter} counter: {value:?}")]
    Counter {
        #[allow(missing_docs)]
        counter: &'static str,
        #[allow(missing_docs)]
        value: String,
    },
    /// The placement violates a board invariant.
    #[error("illegal position: {0}")]
    IllegalBoard(#[from] BoardError),
    /// The fields are individually wellformed but contradict each other.
    #[error("illegal position: {0}")]
    IllegalPosition(String),
}

/// A receipt returned by [`Position::apply`] carrying everything needed to
/// reverse the move. The side to move and the fullmove counter are recomputed
/// by [`Position::unapply`] from the mover's color instead of being stored.
///
/// An `Undo` must be consumed by exactly one `unapply` on the same position,
/// and outstanding receipts must be consumed in LIFO order.
#[derive(Copy, Clone, Debug)]
pub struct Undo {
    next_move: Move,
    captured: Option<PieceKind>,
    en_passant_square: Option<Square>,
    castling: CastlingRights,
    halfmove_clock: u8,
}

/// Piece-centric implementation of the chess position, which includes all
/// pieces and their placement, information about the castling rights, side to
/// move, 50 move rule counters etc.
///
/// [`Position::try_from()`] provides a convenient interface for creating a
/// [`Position`]. It will clean up the input (trim newlines and whitespace)
/// and attempt to parse in either FEN or a version of [Extended Position
/// Description] (EPD): all FEN fields except the halfmove clock and the
/// fullmove counter, which default to "0 1". Parsing EPD is important for
/// compatibility with position books and datasets that only store trimmed
/// lines.
///
/// [Forsyth-Edwards Notation]: https://www.chessprogramming.org/Forsyth-Edwards_Notation
/// [Extended Position Description]: https://www.chessprogramming.org/Extended_Position_Description
#[derive(Clone, PartialEq, Eq)]
pub struct Position {
    board: Board,
    castling: CastlingRights,
    side_to_move: Player,
    /// [Halfmove Clock][^ply] keeps track of the number of halfmoves since
    /// the last capture or pawn move and is used to track the fifty[^fifty]
    /// move draw rule.
    ///
    /// [Halfmove Clock]: https://www.chessprogramming.org/Halfmove_Clock
    /// [^ply]: Half-move or [ply](https://www.chessprogramming.org/Ply) means a move of only
    ///     one side.
    /// [^fifty]: 50 __full__ moves
    halfmove_clock: u8,
    fullmove_counter: u16,
    en_passant_square: Option<Square>,
}

impl Position {
    /// Creates the starting position of the standard chess.
    ///
    /// ```
    /// use tabiya::chess::position::Position;
    ///
    /// let starting_position = Position::starting();
    /// assert_eq!(
    ///     &starting_position.to_string(),
    ///     "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
    /// );
    /// ```
    #[must_use]
    pub fn starting() -> Self {
        Self {
            board: Board::starting(),
            castling: CastlingRights::ALL,
            side_to_move: Player::White,
            halfmove_clock: 0,
            fullmove_counter: 1,
            en_passant_square: None,
        }
    }

    pub(crate) const fn us(&self) -> Player {
        self.side_to_move
    }

    pub(crate) fn them(&self) -> Player {
        !self.us()
    }

    /// Piece placement of the position.
    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// The player whose turn it is.
    #[must_use]
    pub const fn side_to_move(&self) -> Player {
        self.side_to_move
    }

    /// Current castling rights of both players.
    #[must_use]
    pub const fn castling(&self) -> CastlingRights {
        self.castling
    }

    /// The en passant target square left behind the last double pawn push, if
    /// any. The square is recorded even when no pawn can actually capture;
    /// whether a capture is legal is the move generator's concern.
    #[must_use]
    pub const fn en_passant_square(&self) -> Option<Square> {
        self.en_passant_square
    }

    /// Number of plies since the last capture or pawn move.
    #[must_use]
    pub const fn halfmove_clock(&self) -> u8 {
        self.halfmove_clock
    }

    /// Starts at 1 and increments after each Black move.
    #[must_use]
    pub const fn fullmove_counter(&self) -> u16 {
        self.fullmove_counter
    }

    /// Returns true if the fifty-move rule draw can be claimed. The counter
    /// is tracked but the draw is never asserted by this layer.
    #[must_use]
    pub const fn halfmove_clock_expired(&self) -> bool {
        self.halfmove_clock >= 100
    }

    /// Returns the piece on the square, if any.
    #[must_use]
    pub fn at(&self, square: Square) -> Option<Piece> {
        self.board.at(square)
    }

    /// Parses a position from full Forsyth-Edwards Notation and checks that
    /// the result describes a state the engine can reason about.
    ///
    /// FEN ::=
    ///       Piece Placement
    ///   ' ' Side to move
    ///   ' ' Castling ability
    ///   ' ' En passant target square
    ///   ' ' Halfmove clock
    ///   ' ' Fullmove counter
    ///
    /// The parser is strict: accepted inputs survive the encode round-trip
    /// byte for byte. It does not verify that the position is *reachable*
    /// (e.g. that castling rights are consistent with the rook placement);
    /// unreachable but well-formed states are the move generator's concern.
    ///
    /// # Errors
    ///
    /// Returns [`FenError`] describing the first problem found.
    pub fn from_fen(input: &str) -> Result<Self, FenError> {
        let fields: Vec<&str> = input.split(' ').collect();
        if fields.len() != 6 {
            return Err(FenError::FieldCount(fields.len()));
        }

        let board = parse_placement(fields[0])?;
        let side_to_move = Player::try_from(fields[1])
            .map_err(|_| FenError::SideToMove(fields[1].to_string()))?;
        let castling = CastlingRights::try_from(fields[2])
            .map_err(|error| FenError::Castling(error.to_string()))?;
        let en_passant_square = match fields[3] {
            "-" => None,
            field => {
                let square = Square::try_from(field)
                    .map_err(|error| FenError::EnPassant(error.to_string()))?;
                if square.rank() != Rank::Three && square.rank() != Rank::Six {
                    return Err(FenError::EnPassant(format!(
                        "expected a square on rank 3 or 6, got {square}"
                    )));
                }
                Some(square)
            }
        };
        let halfmove_clock = parse_counter::<u8>("halfmove", fields[4])?;
        let fullmove_counter = parse_counter::<u16>("fullmove", fields[5])?;
        if fullmove_counter == 0 {
            return Err(FenError::Counter {
                counter: "fullmove",
                value: fields[5].to_string(),
            });
        }

        let result = Self {
            board,
            castling,
            side_to_move,
            halfmove_clock,
            fullmove_counter,
            en_passant_square,
        };
        validate(&result)?;
        Ok(result)
    }

    /// Checks whether the position is not corrupted and is safe to work with.
    /// It doesn't handle all corner cases and is only used as a sanity check.
    #[must_use]
    pub(crate) fn is_legal(&self) -> bool {
        validate(self).is_ok()
    }

    /// Returns true if the side to move's king is under attack.
    #[must_use]
    pub fn in_check(&self) -> bool {
        self.is_king_attacked(self.us())
    }

    /// The side to move has no legal moves and is in check.
    #[must_use]
    pub fn is_checkmate(&self) -> bool {
        self.legal_moves().is_empty() && self.in_check()
    }

    /// The side to move has no legal moves but is not in check.
    #[must_use]
    pub fn is_stalemate(&self) -> bool {
        self.legal_moves().is_empty() && !self.in_check()
    }

    fn is_king_attacked(&self, player: Player) -> bool {
        attacks::attacks_square(
            self.board.pieces(!player),
            !player,
            self.board.king_square(player),
            self.board.occupied(),
        )
    }

    /// Calculates the list of legal moves (i.e. the moves that do not leave
    /// the king of the side to move in check).
    ///
    /// This is a performance and correctness-critical path: every
    /// modification should be benchmarked and carefully tested.
    #[must_use]
    pub fn legal_moves(&self) -> MoveList {
        debug_assert!(self.is_legal(), "{self:?}");
        let mut moves = MoveList::new();
        let (us, them) = (self.us(), self.them());
        let (our_pieces, their_pieces) = (self.board.pieces(us), self.board.pieces(them));
        let (our_occupancy, their_occupancy) = (our_pieces.all(), their_pieces.all());
        let occupied = our_occupancy | their_occupancy;
        let their_or_empty = !our_occupancy;

        generate_king_moves(our_pieces.king.as_square(), their_or_empty, &mut moves);
        generate_knight_moves(our_pieces.knights, their_or_empty, &mut moves);
        generate_sliding_moves(
            our_pieces.rooks | our_pieces.queens,
            occupied,
            their_or_empty,
            attacks::rook_attacks,
            &mut moves,
        );
        generate_sliding_moves(
            our_pieces.bishops | our_pieces.queens,
            occupied,
            their_or_empty,
            attacks::bishop_attacks,
            &mut moves,
        );
        generate_pawn_moves(
            our_pieces.pawns,
            us,
            their_occupancy,
            occupied,
            self.en_passant_square,
            &mut moves,
        );
        generate_castle_moves(&self.board, us, self.castling, self.in_check(), &mut moves);

        // The king safety filter: a pseudo-legal move is legal iff the king
        // of the mover is not attacked once the move is made. Applying and
        // reverting each candidate is the simple, always-correct variant.
        let mut scratch = self.clone();
        moves.retain(|candidate| {
            let undo = scratch.apply(candidate);
            let safe = !scratch.is_king_attacked(us);
            scratch.unapply(undo);
            safe
        });
        moves
    }

    /// Transitions to the next position by making the move and returns the
    /// receipt that [`Position::unapply`] consumes to take the move back.
    ///
    /// The move must be drawn from [`Position::legal_moves`]: applying an
    /// illegal move leaves the position in an unspecified state.
    pub fn apply(&mut self, next_move: &Move) -> Undo {
        let mut undo = Undo {
            next_move: *next_move,
            captured: None,
            en_passant_square: self.en_passant_square,
            castling: self.castling,
            halfmove_clock: self.halfmove_clock,
        };

        // Increment the halfmove clock early: it is reset on capture or pawn
        // push. Saturating keeps degenerate inputs (a clock already at the
        // u8 ceiling) from wrapping; the receipt restores the exact value.
        self.halfmove_clock = self.halfmove_clock.saturating_add(1);

        self.update_castling_rights(next_move);
        self.handle_capture(next_move, &mut undo);

        let moved = self.make_pawn_move(next_move, &mut undo)
            || self.make_king_move(next_move)
            || self.make_regular_move(next_move);
        debug_assert!(moved, "{next_move} does not start from a piece of ours");

        if self.side_to_move == Player::Black {
            self.fullmove_counter += 1;
        }
        self.side_to_move = !self.side_to_move;

        undo
    }

    /// The exact inverse of [`Position::apply`]: restores the position the
    /// receipt was produced in, bit for bit.
    pub fn unapply(&mut self, undo: Undo) {
        self.side_to_move = !self.side_to_move;
        let (us, them) = (self.us(), self.them());
        if us == Player::Black {
            self.fullmove_counter -= 1;
        }

        let next_move = undo.next_move;
        let (from, to) = (next_move.from(), next_move.to());

        // Move the piece back, demoting promotions to the pawn.
        let our_pieces = self.board.pieces_mut(us);
        let kind = match next_move.promotion() {
            Some(promotion) => {
                our_pieces.bitboard_for_mut(promotion.kind()).clear(to);
                our_pieces.pawns.extend(from);
                PieceKind::Pawn
            }
            None => {
                let kind = match our_pieces.at(to) {
                    Some(kind) => kind,
                    None => unreachable!("unapply consumes the receipt of the last apply"),
                };
                our_pieces.bitboard_for_mut(kind).clear(to);
                our_pieces.bitboard_for_mut(kind).extend(from);
                kind
            }
        };

        // Un-move the castling rook.
        if kind == PieceKind::King
            && from.file() == File::E
            && from.rank() == Rank::backrank(us)
            && to.rank() == Rank::backrank(us)
        {
            let backrank = Rank::backrank(us);
            if to.file() == File::G {
                our_pieces.rooks.clear(Square::new(File::F, backrank));
                our_pieces.rooks.extend(Square::new(File::H, backrank));
            } else if to.file() == File::C {
                our_pieces.rooks.clear(Square::new(File::D, backrank));
                our_pieces.rooks.extend(Square::new(File::A, backrank));
            }
        }

        // Restore the captured piece. An en passant victim is not on the
        // target square but behind it, on the same rank the capture started.
        if let Some(captured) = undo.captured {
            let square = if kind == PieceKind::Pawn
                && captured == PieceKind::Pawn
                && undo.en_passant_square == Some(to)
            {
                Square::new(to.file(), from.rank())
            } else {
                to
            };
            self.board
                .pieces_mut(them)
                .bitboard_for_mut(captured)
                .extend(square);
        }

        self.en_passant_square = undo.en_passant_square;
        self.castling = undo.castling;
        self.halfmove_clock = undo.halfmove_clock;
    }

    fn update_castling_rights(&mut self, next_move: &Move) {
        // Moving the king or a rook from its home square forfeits the
        // corresponding rights; so does capturing a rook on its home square.
        if self.castling.contains(CastlingRights::WHITE_SHORT)
            && (next_move.from() == Square::E1
                || next_move.from() == Square::H1
                || next_move.to() == Square::H1)
        {
            self.castling.remove(CastlingRights::WHITE_SHORT);
        }
        if self.castling.contains(CastlingRights::WHITE_LONG)
            && (next_move.from() == Square::E1
                || next_move.from() == Square::A1
                || next_move.to() == Square::A1)
        {
            self.castling.remove(CastlingRights::WHITE_LONG);
        }
        if self.castling.contains(CastlingRights::BLACK_SHORT)
            && (next_move.from() == Square::E8
                || next_move.from() == Square::H8
                || next_move.to() == Square::H8)
        {
            self.castling.remove(CastlingRights::BLACK_SHORT);
        }
        if self.castling.contains(CastlingRights::BLACK_LONG)
            && (next_move.from() == Square::E8
                || next_move.from() == Square::A8
                || next_move.to() == Square::A8)
        {
            self.castling.remove(CastlingRights::BLACK_LONG);
        }
    }

    /// Removes the captured piece from the target square and records it in
    /// the receipt. En passant captures are handled by
    /// [`Position::make_pawn_move`]: their victim is not on the target
    /// square.
    fn handle_capture(&mut self, next_move: &Move, undo: &mut Undo) {
        let them = self.them();
        let their_pieces = self.board.pieces_mut(them);
        if let Some(kind) = their_pieces.at(next_move.to()) {
            their_pieces.bitboard_for_mut(kind).clear(next_move.to());
            undo.captured = Some(kind);
            // Capturing a piece resets the clock.
            self.halfmove_clock = 0;
        }
    }

    fn make_pawn_move(&mut self, next_move: &Move, undo: &mut Undo) -> bool {
        let (us, them) = (self.us(), self.them());
        let previous_en_passant = self.en_passant_square;
        self.en_passant_square = None;

        if !self.board.pieces(us).pawns.contains(next_move.from()) {
            return false;
        }

        // Pawn move resets the 50 halfmove rule clock.
        self.halfmove_clock = 0;

        // A pawn arriving at the en passant target captures the pawn that
        // just double-pushed past it.
        if let Some(en_passant_square) = previous_en_passant {
            if next_move.to() == en_passant_square {
                let captured_pawn =
                    Square::new(next_move.to().file(), next_move.from().rank());
                self.board.pieces_mut(them).pawns.clear(captured_pawn);
                undo.captured = Some(PieceKind::Pawn);
            }
        }

        let our_pieces = self.board.pieces_mut(us);
        our_pieces.pawns.clear(next_move.from());
        match next_move.promotion() {
            Some(promotion) => our_pieces
                .bitboard_for_mut(promotion.kind())
                .extend(next_move.to()),
            None => our_pieces.pawns.extend(next_move.to()),
        }

        // A double push leaves the en passant target right behind the pawn.
        // FEN records the square even when no enemy pawn can capture.
        if next_move.from().file() == next_move.to().file()
            && next_move.from().rank() == Rank::pawns_starting(us)
            && (next_move.to() as i8 - next_move.from() as i8).abs() == 2 * BOARD_WIDTH as i8
        {
            self.en_passant_square = next_move.from().shift(pawn_push_direction(us));
        }

        true
    }

    /// Castle or regular king move.
    fn make_king_move(&mut self, next_move: &Move) -> bool {
        let us = self.us();
        let our_pieces = self.board.pieces_mut(us);

        if !our_pieces.king.contains(next_move.from()) {
            return false;
        }

        let backrank = Rank::backrank(us);

        // The king travelling two squares from its home is a castle: bring
        // the rook over the king.
        if next_move.from() == Square::new(File::E, backrank)
            && next_move.to().rank() == backrank
        {
            if next_move.to().file() == File::G {
                our_pieces.rooks.clear(Square::new(File::H, backrank));
                our_pieces.rooks.extend(Square::new(File::F, backrank));
            } else if next_move.to().file() == File::C {
                our_pieces.rooks.clear(Square::new(File::A, backrank));
                our_pieces.rooks.extend(Square::new(File::D, backrank));
            }
        }

        our_pieces.king.clear(next_move.from());
        our_pieces.king.extend(next_move.to());
        true
    }

    fn make_regular_move(&mut self, next_move: &Move) -> bool {
        let us = self.us();
        let our_pieces = self.board.pieces_mut(us);
        for kind in [
            PieceKind::Queen,
            PieceKind::Rook,
            PieceKind::Bishop,
            PieceKind::Knight,
        ] {
            let bitboard = our_pieces.bitboard_for_mut(kind);
            if bitboard.contains(next_move.from()) {
                bitboard.clear(next_move.from());
                bitboard.extend(next_move.to());
                return true;
            }
        }
        false
    }
}

impl TryFrom<&str> for Position {
    type Error = FenError;

    /// Cleans up the input and parses either full FEN or a trimmed EPD-style
    /// position (the clock fields default to "0 1").
    fn try_from(input: &str) -> Result<Self, FenError> {
        let mut input = input.trim();
        for prefix in ["fen ", "epd "] {
            if let Some(stripped) = input.strip_prefix(prefix) {
                input = stripped;
            }
        }
        match input.split(' ').count() {
            4 => Self::from_fen(&(input.to_string() + " 0 1")),
            _ => Self::from_fen(input),
        }
    }
}

impl fmt::Display for Position {
    /// Returns the position representation in Forsyth-Edwards Notation.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ", self.board)?;
        write!(f, "{} ", self.side_to_move)?;
        write!(f, "{} ", self.castling)?;
        match self.en_passant_square {
            Some(square) => write!(f, "{square} ")?,
            None => write!(f, "- ")?,
        }
        write!(f, "{} {}", self.halfmove_clock, self.fullmove_counter)
    }
}

impl fmt::Debug for Position {
    /// Dumps the board in a human readable format ('.' for an empty square,
    /// FEN algebraic symbol for a piece) together with the position state.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:?}", self.board)?;
        writeln!(f, "Player to move: {:?}", self.side_to_move)?;
        writeln!(f, "Fullmove counter: {}", self.fullmove_counter)?;
        writeln!(f, "En Passant: {:?}", self.en_passant_square)?;
        // bitflags' default fmt::Debug implementation is not very convenient:
        // dump FEN instead.
        writeln!(f, "Castling rights: {}", self.castling)?;
        writeln!(f, "FEN: {self}")
    }
}

fn parse_placement(placement: &str) -> Result<Board, FenError> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != BOARD_WIDTH as usize {
        return Err(FenError::Placement(format!(
            "expected 8 ranks, got {}",
            ranks.len()
        )));
    }
    let mut board = Board::empty();
    for (rank_index, rank_fen) in ranks.iter().enumerate() {
        // The first chunk describes rank 8, the last one rank 1.
        let rank = Rank::try_from(BOARD_WIDTH - 1 - rank_index as u8)
            .map_err(|error| FenError::Placement(error.to_string()))?;
        let mut file: u8 = 0;
        let mut previous_was_digit = false;
        for symbol in rank_fen.chars() {
            if let Some(skip) = symbol.to_digit(10) {
                if previous_was_digit {
                    return Err(FenError::Placement(format!(
                        "two adjacent digits in {rank_fen}"
                    )));
                }
                if skip == 0 {
                    return Err(FenError::Placement(format!(
                        "empty square run can not be 0 in {rank_fen}"
                    )));
                }
                previous_was_digit = true;
                file += skip as u8;
                continue;
            }
            previous_was_digit = false;
            if file >= BOARD_WIDTH {
                return Err(FenError::Placement(format!(
                    "rank {rank_fen} describes more than 8 squares"
                )));
            }
            let piece = Piece::try_from(symbol)
                .map_err(|error| FenError::Placement(error.to_string()))?;
            let square = Square::new(
                File::try_from(file).map_err(|error| FenError::Placement(error.to_string()))?,
                rank,
            );
            board.put_unchecked(piece, square);
            file += 1;
        }
        if file != BOARD_WIDTH {
            return Err(FenError::Placement(format!(
                "rank {rank_fen} describes {file} squares instead of 8"
            )));
        }
    }
    Ok(board)
}

fn parse_counter<T: std::str::FromStr>(
    counter: &'static str,
    value: &str,
) -> Result<T, FenError> {
    // Leading zeros would not survive the encode round-trip.
    if value.len() > 1 && value.starts_with('0') {
        return Err(FenError::Counter {
            counter,
            value: value.to_string(),
        });
    }
    value.parse().map_err(|_| FenError::Counter {
        counter,
        value: value.to_string(),
    })
}

/// Checks if the position is "legal", i.e. if it can be reasoned about by the
/// engine. Checking whether the position is truly reachable from the starting
/// position requires retrograde analysis and a potentially unreasonable
/// amount of time. This check employs a limited number of heuristics that
/// filter out the most obviously incorrect positions and prevents them from
/// being analyzed, setting up a barrier between the untrusted environment
/// (UCI front-end, user input) and the engine.
fn validate(position: &Position) -> Result<(), FenError> {
    position.board.validate()?;
    for player in [Player::White, Player::Black] {
        if position.board.pieces(player).pawns.count() > 8 {
            return Err(FenError::IllegalPosition(format!(
                "{player:?} can have at most 8 pawns"
            )));
        }
        if position.board.pieces(player).all().count() > 16 {
            return Err(FenError::IllegalPosition(format!(
                "{player:?} can have at most 16 pieces"
            )));
        }
    }
    if let Some(en_passant_square) = position.en_passant_square {
        let expected_rank = match position.us() {
            Player::White => Rank::Six,
            Player::Black => Rank::Three,
        };
        if en_passant_square.rank() != expected_rank {
            return Err(FenError::IllegalPosition(format!(
                "expected en passant square on rank {expected_rank} for {:?} to move, got {en_passant_square}",
                position.us(),
            )));
        }
    }
    // The player who just moved can not have left their own king hanging.
    if position.is_king_attacked(position.them()) {
        return Err(FenError::IllegalPosition(
            "the side not to move is in check".to_string(),
        ));
    }
    Ok(())
}

const fn pawn_push_direction(player: Player) -> Direction {
    match player {
        Player::White => Direction::Up,
        Player::Black => Direction::Down,
    }
}

fn push_pawn_moves(from: Square, to: Square, moves: &mut MoveList) {
    // A pawn move onto the last rank expands into the four promotions.
    match to.rank() {
        Rank::One | Rank::Eight => {
            moves.push(Move::new(from, to, Some(Promotion::Queen)));
            moves.push(Move::new(from, to, Some(Promotion::Rook)));
            moves.push(Move::new(from, to, Some(Promotion::Bishop)));
            moves.push(Move::new(from, to, Some(Promotion::Knight)));
        }
        _ => moves.push(Move::new(from, to, None)),
    }
}

fn generate_king_moves(king: Square, their_or_empty: Bitboard, moves: &mut MoveList) {
    for to in (attacks::king_attacks(king) & their_or_empty).iter() {
        moves.push(Move::new(king, to, None));
    }
}

fn generate_knight_moves(knights: Bitboard, their_or_empty: Bitboard, moves: &mut MoveList) {
    for from in knights.iter() {
        for to in (attacks::knight_attacks(from) & their_or_empty).iter() {
            moves.push(Move::new(from, to, None));
        }
    }
}

fn generate_sliding_moves(
    sliders: Bitboard,
    occupied: Bitboard,
    their_or_empty: Bitboard,
    piece_attacks: fn(Square, Bitboard) -> Bitboard,
    moves: &mut MoveList,
) {
    for from in sliders.iter() {
        for to in (piece_attacks(from, occupied) & their_or_empty).iter() {
            moves.push(Move::new(from, to, None));
        }
    }
}

fn generate_pawn_moves(
    pawns: Bitboard,
    us: Player,
    their_occupancy: Bitboard,
    occupied: Bitboard,
    en_passant_square: Option<Square>,
    moves: &mut MoveList,
) {
    // Captures, including capture-promotions.
    for from in pawns.iter() {
        for to in (attacks::pawn_attacks(from, us) & their_occupancy).iter() {
            push_pawn_moves(from, to, moves);
        }
    }
    // En passant: the capturing pawn sits on one of the two squares that
    // diagonally attack the target. Whether the capture uncovers a check is
    // left to the king safety filter.
    if let Some(en_passant_square) = en_passant_square {
        for from in (attacks::pawn_attacks(en_passant_square, !us) & pawns).iter() {
            moves.push(Move::new(from, en_passant_square, None));
        }
    }
    let push_direction = pawn_push_direction(us);
    // Single pushes.
    let single_pushes = pawns.shift(push_direction) - occupied;
    for to in single_pushes.iter() {
        let from = to.shift(push_direction.opposite()).unwrap();
        push_pawn_moves(from, to, moves);
    }
    // Double pushes from the starting rank, both squares empty. Double pushes
    // never promote.
    let double_pushes = (single_pushes
        & Rank::pawns_starting(us).mask().shift(push_direction))
    .shift(push_direction)
        - occupied;
    for to in double_pushes.iter() {
        let from = to
            .shift(push_direction.opposite())
            .unwrap()
            .shift(push_direction.opposite())
            .unwrap();
        moves.push(Move::new(from, to, None));
    }
}

fn generate_castle_moves(
    board: &Board,
    us: Player,
    castling: CastlingRights,
    in_check: bool,
    moves: &mut MoveList,
) {
    // Castling out of check is not allowed.
    if in_check {
        return;
    }
    let (short, long) = match us {
        Player::White => (CastlingRights::WHITE_SHORT, CastlingRights::WHITE_LONG),
        Player::Black => (CastlingRights::BLACK_SHORT, CastlingRights::BLACK_LONG),
    };
    let backrank = Rank::backrank(us);
    let king_home = Square::new(File::E, backrank);
    // FEN does not guarantee that the rights are consistent with the piece
    // placement, so the king and the rook are checked to be at home.
    if !board.pieces(us).king.contains(king_home) {
        return;
    }
    let occupied = board.occupied();
    let walk_is_safe = |walk: Bitboard| {
        walk.iter()
            .all(|square| !attacks::attacks_square(board.pieces(!us), !us, square, occupied))
    };
    if castling.contains(short) {
        let rook_home = Square::new(File::H, backrank);
        let king_walk = match us {
            Player::White => attacks::WHITE_SHORT_CASTLE_KING_WALK,
            Player::Black => attacks::BLACK_SHORT_CASTLE_KING_WALK,
        };
        if board.pieces(us).rooks.contains(rook_home)
            && (attacks::between(king_home, rook_home) & occupied).is_empty()
            && walk_is_safe(king_walk)
        {
            moves.push(Move::new(king_home, Square::new(File::G, backrank), None));
        }
    }
    if castling.contains(long) {
        let rook_home = Square::new(File::A, backrank);
        let king_walk = match us {
            Player::White => attacks::WHITE_LONG_CASTLE_KING_WALK,
            Player::Black => attacks::BLACK_LONG_CASTLE_KING_WALK,
        };
        if board.pieces(us).rooks.contains(rook_home)
            && (attacks::between(king_home, rook_home) & occupied).is_empty()
            && walk_is_safe(king_walk)
        {
            moves.push(Move::new(king_home, Square::new(File::C, backrank), None));
        }
    }
}

/// [Perft] (**per**formance **t**esting) is a technique for checking
/// correctness of move generation by traversing the tree of possible
/// positions (nodes) and calculating all the leaf nodes at a certain depth.
/// Checks move generation, making and unmaking moves at once.
///
/// Here is a useful perft exploration web tool: <https://analog-hors.github.io/webperft/>
///
/// [Perft]: https://www.chessprogramming.org/Perft
#[must_use]
pub fn perft(position: &mut Position, depth: u8) -> u64 {
    debug_assert!(position.is_legal());
    if depth == 0 {
        return 1;
    }
    let moves = position.legal_moves();
    if depth == 1 {
        return moves.len() as u64;
    }
    let mut nodes = 0;
    for next_move in &moves {
        let undo = position.apply(next_move);
        nodes += perft(position, depth - 1);
        position.unapply(undo);
    }
    nodes
}

/// Computes [`perft`] with one fewer depth for each position after a legal
/// root move, keyed by that move. Indispensable for hunting down move
/// generation divergences: mismatched subtrees point at the bug.
#[must_use]
pub fn divide(position: &mut Position, depth: u8) -> Vec<(Move, u64)> {
    debug_assert!(depth > 0, "divide needs at least one ply to split on");
    let mut nodes = vec![];
    for next_move in position.legal_moves() {
        let undo = position.apply(&next_move);
        let subtree = perft(position, depth - 1);
        position.unapply(undo);
        tracing::debug!(%next_move, subtree, "divide");
        nodes.push((next_move, subtree));
    }
    nodes
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{divide, perft, FenError, Position};
    use crate::chess::bitboard::BoardError;
    use crate::chess::core::{CastlingRights, Move, Player, Square};

    fn setup(input: &str) -> Position {
        Position::try_from(input).expect("parsing legal position")
    }

    #[test]
    fn starting() {
        let position = Position::starting();
        assert_eq!(
            position.to_string(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
        assert_eq!(position.side_to_move(), Player::White);
        assert_eq!(position.castling(), CastlingRights::ALL);
        assert_eq!(position.en_passant_square(), None);
        assert!(!position.in_check());
        assert_eq!(position, setup(&position.to_string()));
    }

    #[test]
    fn fen_field_count() {
        assert_eq!(
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -"),
            Err(FenError::FieldCount(4))
        );
        assert_eq!(Position::from_fen(""), Err(FenError::FieldCount(1)));
    }

    #[test]
    fn fen_placement_errors() {
        // Rank does not sum to 8.
        assert!(matches!(
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPP/RNBQKBNR w KQkq - 0 1"),
            Err(FenError::Placement(_))
        ));
        // Two adjacent digits.
        assert!(matches!(
            Position::from_fen("rnbqkbnr/pppppppp/44/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            Err(FenError::Placement(_))
        ));
        // Unknown piece letter.
        assert!(matches!(
            Position::from_fen("rnbqkbnr/pppppppp/8/8/4X3/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            Err(FenError::Placement(_))
        ));
        // Seven ranks only.
        assert!(matches!(
            Position::from_fen("rnbqkbnr/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            Err(FenError::Placement(_))
        ));
    }

    #[test]
    fn fen_field_errors() {
        assert!(matches!(
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1"),
            Err(FenError::SideToMove(_))
        ));
        assert!(matches!(
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQqk - 0 1"),
            Err(FenError::Castling(_))
        ));
        assert!(matches!(
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e5 0 1"),
            Err(FenError::EnPassant(_))
        ));
        assert!(matches!(
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - -1 1"),
            Err(FenError::Counter { .. })
        ));
        // Leading zeros do not survive the encode round-trip.
        assert!(matches!(
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 00 1"),
            Err(FenError::Counter { .. })
        ));
        assert!(matches!(
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 0"),
            Err(FenError::Counter { .. })
        ));
    }

    #[test]
    fn fen_semantic_errors() {
        assert_eq!(
            Position::from_fen("3k4/8/8/8/8/8/8/8 w - - 0 1"),
            Err(FenError::IllegalBoard(BoardError::MissingKing(
                Player::White
            )))
        );
        assert_eq!(
            Position::from_fen("8/8/8/8/3kK3/8/8/8 w - - 0 1"),
            Err(FenError::IllegalBoard(BoardError::KingsAdjacent))
        );
        assert_eq!(
            Position::from_fen("4k3/8/8/8/8/8/8/P3K3 w - - 0 1"),
            Err(FenError::IllegalBoard(BoardError::PawnOnBackRank(
                Square::A1
            )))
        );
        // The en passant rank contradicts the side to move.
        assert!(matches!(
            Position::from_fen(
                "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e3 0 1"
            ),
            Err(FenError::IllegalPosition(_))
        ));
        // The side that just moved left its king in check.
        assert!(matches!(
            Position::from_fen("4k3/8/8/8/7b/8/5K2/8 b - - 0 1"),
            Err(FenError::IllegalPosition(_))
        ));
    }

    #[test]
    fn apply_unapply_round_trip() {
        let mut position = Position::starting();
        let original = position.clone();
        let next_move = Move::from_uci("e2e4").unwrap();
        let undo = position.apply(&next_move);
        assert_eq!(
            position.to_string(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e4 0 1"
        );
        position.unapply(undo);
        assert_eq!(position, original);
    }

    #[test]
    fn en_passant_capture() {
        let mut position = setup("4k3/8/8/8/4Pp2/8/8/4K3 b - e3 0 1");
        let original = position.clone();
        let capture = Move::from_uci("f4e3").unwrap();
        assert!(position.legal_moves().contains(&capture));
        let undo = position.apply(&capture);
        // The captured pawn is removed from e4, not e3.
        assert_eq!(position.to_string(), "4k3/8/8/8/8/4p3/8/4K3 w - - 0 2");
        position.unapply(undo);
        assert_eq!(position, original);
    }

    #[test]
    fn castling_moves_the_rook() {
        let mut position = setup("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let original = position.clone();
        let undo = position.apply(&Move::from_uci("e1g1").unwrap());
        assert_eq!(position.to_string(), "r3k2r/8/8/8/8/8/8/R4RK1 b kq - 1 1");
        position.unapply(undo);
        assert_eq!(position, original);

        let undo = position.apply(&Move::from_uci("e1c1").unwrap());
        assert_eq!(position.to_string(), "r3k2r/8/8/8/8/8/8/2KR3R b kq - 1 1");
        position.unapply(undo);
        assert_eq!(position, original);
    }

    #[test]
    fn promotion_demotes_on_unapply() {
        let mut position = setup("4k3/1P6/8/8/8/8/8/4K3 w - - 0 1");
        let original = position.clone();
        let undo = position.apply(&Move::from_uci("b7b8q").unwrap());
        assert_eq!(position.to_string(), "1Q2k3/8/8/8/8/8/8/4K3 b - - 0 1");
        position.unapply(undo);
        assert_eq!(position, original);
    }

    #[test]
    fn fullmove_counter_increments_after_black() {
        let mut position = Position::starting();
        let _ = position.apply(&Move::from_uci("g1f3").unwrap());
        assert_eq!(position.fullmove_counter(), 1);
        let undo = position.apply(&Move::from_uci("g8f6").unwrap());
        assert_eq!(position.fullmove_counter(), 2);
        position.unapply(undo);
        assert_eq!(position.fullmove_counter(), 1);
        // A knight move does not reset the halfmove clock.
        assert_eq!(position.halfmove_clock(), 1);
    }

    #[test]
    fn terminal_positions() {
        // Fool's mate.
        let checkmate = setup("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
        assert!(checkmate.legal_moves().is_empty());
        assert!(checkmate.in_check());
        assert!(checkmate.is_checkmate());
        assert!(!checkmate.is_stalemate());

        let stalemate = setup("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        assert!(stalemate.legal_moves().is_empty());
        assert!(!stalemate.in_check());
        assert!(stalemate.is_stalemate());
        assert!(!stalemate.is_checkmate());

        assert!(!Position::starting().is_checkmate());
        assert!(!Position::starting().is_stalemate());
    }

    #[test]
    fn perft_shallow() {
        let mut position = Position::starting();
        assert_eq!(perft(&mut position, 0), 1);
        assert_eq!(perft(&mut position, 1), 20);
        assert_eq!(perft(&mut position, 2), 400);
        assert_eq!(perft(&mut position, 3), 8902);
        // The walk restores the position it borrowed.
        assert_eq!(position, Position::starting());
    }

    #[test]
    fn divide_sums_to_perft() {
        let mut position = Position::starting();
        let split = divide(&mut position, 3);
        assert_eq!(split.len(), 20);
        assert_eq!(split.iter().map(|(_, nodes)| nodes).sum::<u64>(), 8902);
    }
}
