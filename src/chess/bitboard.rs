//! [`Bitboard`]-based representation of piece placement. Bitboards utilize
//! the fact that modern processors operate on 64 bit integers, and the bit
//! operations can be performed simultaneously. This results in very efficient
//! calculation of attack vectors and other features that are needed for
//! generating moves. The disadvantage is complexity that comes with the
//! bitboard implementation and inefficiency of some operations like "get
//! piece type on a given square" (efficiently handled by square-centric board
//! implementations).
//!
//! [Bitboard]: https://www.chessprogramming.org/Bitboards

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, Not, Sub, SubAssign};

use itertools::Itertools;
use strum::IntoEnumIterator;

use crate::chess::attacks;
use crate::chess::core::{
    Direction, File, Piece, PieceKind, Player, Rank, Square, BOARD_SIZE, BOARD_WIDTH,
};

const FILE_A_BITS: u64 = 0x0101_0101_0101_0101;
const FILE_H_BITS: u64 = FILE_A_BITS << 7;

/// Represents a set of squares and provides common operations (e.g. AND, OR,
/// XOR) over these sets. Each bit corresponds to one of 64 squares of the
/// chess board.
///
/// Mirroring [`Square`] semantics, the least significant bit corresponds to
/// A1, and the most significant bit to H8.
///
/// Bitboard is a thin wrapper around [u64].
#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub struct Bitboard(u64);

impl Bitboard {
    /// Constructs a bitboard from the raw bit set.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bit set.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// The set with no squares.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The set with all 64 squares.
    #[must_use]
    pub const fn full() -> Self {
        Self(u64::MAX)
    }

    /// Builds the set containing exactly the given squares.
    #[must_use]
    pub fn from_squares(squares: &[Square]) -> Self {
        let mut result = Self::empty();
        for square in squares {
            result |= Self::from(*square);
        }
        result
    }

    /// Returns true if the square is in the set.
    #[must_use]
    pub const fn contains(self, square: Square) -> bool {
        (self.0 & (1u64 << square as u8)) != 0
    }

    /// Adds the square to the set.
    pub fn extend(&mut self, square: Square) {
        self.0 |= 1u64 << square as u8;
    }

    /// Removes the square from the set. Removing a square that is not in the
    /// set is a no-op.
    pub fn clear(&mut self, square: Square) {
        self.0 &= !(1u64 << square as u8);
    }

    /// Flips square membership.
    pub fn toggle(&mut self, square: Square) {
        self.0 ^= 1u64 << square as u8;
    }

    /// Number of squares in the set.
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn has_any(self) -> bool {
        self.0 != 0
    }

    /// Returns the least significant square of the set. Meaningless for an
    /// empty bitboard.
    ///
    /// # Panics
    ///
    /// Panics in debug mode when the set is empty.
    #[must_use]
    pub fn as_square(self) -> Square {
        debug_assert!(self.has_any());
        unsafe { std::mem::transmute(self.0.trailing_zeros() as u8) }
    }

    /// Returns the most significant square of the set. Meaningless for an
    /// empty bitboard.
    #[must_use]
    pub(crate) fn msb_square(self) -> Square {
        debug_assert!(self.has_any());
        unsafe { std::mem::transmute((BOARD_SIZE - 1) - self.0.leading_zeros() as u8) }
    }

    /// Shifts all squares one step in the given direction. Squares that would
    /// wrap around the A/H file edge fall off the board instead.
    #[must_use]
    pub(crate) const fn shift(self, direction: Direction) -> Self {
        match direction {
            Direction::Up => Self(self.0 << BOARD_WIDTH),
            Direction::Down => Self(self.0 >> BOARD_WIDTH),
            Direction::Left => Self((self.0 & !FILE_A_BITS) >> 1),
            Direction::Right => Self((self.0 & !FILE_H_BITS) << 1),
            Direction::UpLeft => Self((self.0 & !FILE_A_BITS) << (BOARD_WIDTH - 1)),
            Direction::UpRight => Self((self.0 & !FILE_H_BITS) << (BOARD_WIDTH + 1)),
            Direction::DownLeft => Self((self.0 & !FILE_A_BITS) >> (BOARD_WIDTH + 1)),
            Direction::DownRight => Self((self.0 & !FILE_H_BITS) >> (BOARD_WIDTH - 1)),
        }
    }

    /// An iterator over the squares of the set, from A1 towards H8.
    pub fn iter(self) -> SquareIterator {
        SquareIterator(self.0)
    }
}

/// Iterates over set squares in a given [`Bitboard`] from the least
/// significant bits (A1) to the most significant ones (H8).
pub struct SquareIterator(u64);

impl Iterator for SquareIterator {
    type Item = Square;

    fn next(&mut self) -> Option<Self::Item> {
        if self.0 == 0 {
            return None;
        }
        let square = Bitboard(self.0).as_square();
        // Clear the lowest set bit.
        self.0 &= self.0 - 1;
        Some(square)
    }
}

impl IntoIterator for Bitboard {
    type Item = Square;
    type IntoIter = SquareIterator;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl From<Square> for Bitboard {
    fn from(square: Square) -> Self {
        Self(1u64 << square as u8)
    }
}

impl BitOr for Bitboard {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Bitboard {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Bitboard {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Bitboard {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl BitXor for Bitboard {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self::Output {
        Self(self.0 ^ rhs.0)
    }
}

impl Sub for Bitboard {
    type Output = Self;

    /// Set difference.
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 & !rhs.0)
    }
}

impl SubAssign for Bitboard {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 &= !rhs.0;
    }
}

impl Not for Bitboard {
    type Output = Self;

    /// Set complement.
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

const LINE_SEPARATOR: &str = "\n";
const SQUARE_SEPARATOR: &str = " ";

impl fmt::Debug for Bitboard {
    /// Renders the set as an 8x8 grid, rank 8 at the top.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            format!("{:#066b}", self.0)
                .chars()
                .rev()
                .take(BOARD_SIZE as usize)
                .chunks(BOARD_WIDTH as usize)
                .into_iter()
                .map(|chunk| chunk
                    .map(|ch| match ch {
                        '1' => '1',
                        '0' => '.',
                        _ => unreachable!(),
                    })
                    .join(SQUARE_SEPARATOR))
                .collect::<Vec<String>>()
                .iter()
                .rev()
                .join(LINE_SEPARATOR)
        )
    }
}

/// Piece-centric representation of all material owned by one player. Uses
/// [`Bitboard`] to store a set of squares occupied by each piece kind.
///
/// Defaults to an empty set.
#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub(crate) struct Pieces {
    pub(crate) king: Bitboard,
    pub(crate) queens: Bitboard,
    pub(crate) rooks: Bitboard,
    pub(crate) bishops: Bitboard,
    pub(crate) knights: Bitboard,
    pub(crate) pawns: Bitboard,
}

impl Pieces {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn starting(player: Player) -> Self {
        let backrank = Rank::backrank(player).mask();
        Self {
            king: backrank & File::E.mask(),
            queens: backrank & File::D.mask(),
            rooks: backrank & (File::A.mask() | File::H.mask()),
            bishops: backrank & (File::C.mask() | File::F.mask()),
            knights: backrank & (File::B.mask() | File::G.mask()),
            pawns: Rank::pawns_starting(player).mask(),
        }
    }

    /// Squares occupied by any piece of the player.
    pub(crate) fn all(&self) -> Bitboard {
        self.king | self.queens | self.rooks | self.bishops | self.knights | self.pawns
    }

    pub(crate) fn bitboard_for(&self, kind: PieceKind) -> Bitboard {
        match kind {
            PieceKind::King => self.king,
            PieceKind::Queen => self.queens,
            PieceKind::Rook => self.rooks,
            PieceKind::Bishop => self.bishops,
            PieceKind::Knight => self.knights,
            PieceKind::Pawn => self.pawns,
        }
    }

    pub(crate) fn bitboard_for_mut(&mut self, kind: PieceKind) -> &mut Bitboard {
        match kind {
            PieceKind::King => &mut self.king,
            PieceKind::Queen => &mut self.queens,
            PieceKind::Rook => &mut self.rooks,
            PieceKind::Bishop => &mut self.bishops,
            PieceKind::Knight => &mut self.knights,
            PieceKind::Pawn => &mut self.pawns,
        }
    }

    pub(crate) fn at(&self, square: Square) -> Option<PieceKind> {
        if self.pawns.contains(square) {
            return Some(PieceKind::Pawn);
        }
        if self.knights.contains(square) {
            return Some(PieceKind::Knight);
        }
        if self.bishops.contains(square) {
            return Some(PieceKind::Bishop);
        }
        if self.rooks.contains(square) {
            return Some(PieceKind::Rook);
        }
        if self.queens.contains(square) {
            return Some(PieceKind::Queen);
        }
        if self.king.contains(square) {
            return Some(PieceKind::King);
        }
        None
    }

    fn clear(&mut self, square: Square) -> Option<PieceKind> {
        let kind = self.at(square)?;
        self.bitboard_for_mut(kind).clear(square);
        Some(kind)
    }
}

/// The first [`Board`] invariant violation discovered by
/// [`Board::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// Two piece bitboards claim the same square.
    #[error("two pieces occupy {0}")]
    DoubleOccupancy(Square),
    /// A player has more than one king.
    #[error("{0:?} has more than one king")]
    MultipleKings(Player),
    /// A player has no king at all.
    #[error("{0:?} has no king")]
    MissingKing(Player),
    /// The kings guard each other, which is impossible to reach legally.
    #[error("the kings are adjacent")]
    KingsAdjacent,
    /// Pawns can never stay on their own or the promotion backrank.
    #[error("pawn on back rank at {0}")]
    PawnOnBackRank(Square),
}

/// Piece-centric implementation of the chess board: the single source of
/// truth for piece placement. This is the "back-end" of the chess engine, an
/// efficient board representation is crucial for performance.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Board {
    pub(crate) white: Pieces,
    pub(crate) black: Pieces,
}

impl Board {
    /// Returns the board of the starting position of the standard chess.
    #[must_use]
    pub fn starting() -> Self {
        Self {
            white: Pieces::starting(Player::White),
            black: Pieces::starting(Player::Black),
        }
    }

    /// Returns a board with no pieces on it.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            white: Pieces::empty(),
            black: Pieces::empty(),
        }
    }

    pub(crate) fn pieces(&self, player: Player) -> &Pieces {
        match player {
            Player::White => &self.white,
            Player::Black => &self.black,
        }
    }

    pub(crate) fn pieces_mut(&mut self, player: Player) -> &mut Pieces {
        match player {
            Player::White => &mut self.white,
            Player::Black => &mut self.black,
        }
    }

    /// Places the piece on the square, first removing whatever was there.
    pub fn put(&mut self, piece: Piece, square: Square) {
        let _ = self.remove(square);
        self.put_unchecked(piece, square);
    }

    /// Places the piece on the square the caller guarantees to be empty.
    /// Putting a piece on an occupied square breaks board invariants.
    pub fn put_unchecked(&mut self, piece: Piece, square: Square) {
        self.pieces_mut(piece.owner)
            .bitboard_for_mut(piece.kind)
            .extend(square);
    }

    /// Removes and returns the piece on the square, if any.
    pub fn remove(&mut self, square: Square) -> Option<Piece> {
        if let Some(kind) = self.white.clear(square) {
            return Some(Piece {
                owner: Player::White,
                kind,
            });
        }
        if let Some(kind) = self.black.clear(square) {
            return Some(Piece {
                owner: Player::Black,
                kind,
            });
        }
        None
    }

    /// Returns the piece on the square, if any.
    ///
    /// WARNING: This is slow for a piece-centric board representation. Use
    /// bitboards directly on hot paths.
    #[must_use]
    pub fn at(&self, square: Square) -> Option<Piece> {
        if let Some(kind) = self.white.at(square) {
            return Some(Piece {
                owner: Player::White,
                kind,
            });
        }
        if let Some(kind) = self.black.at(square) {
            return Some(Piece {
                owner: Player::Black,
                kind,
            });
        }
        None
    }

    /// Squares occupied by the player's pieces.
    #[must_use]
    pub fn player(&self, player: Player) -> Bitboard {
        self.pieces(player).all()
    }

    /// Squares occupied by pieces of the given kind, both colors combined.
    #[must_use]
    pub fn kind(&self, kind: PieceKind) -> Bitboard {
        self.white.bitboard_for(kind) | self.black.bitboard_for(kind)
    }

    /// Squares occupied by any piece. Derived from the piece sets, not stored.
    #[must_use]
    pub fn occupied(&self) -> Bitboard {
        self.white.all() | self.black.all()
    }

    /// The square of the player's king. Only meaningful when the board is
    /// valid (each player has exactly one king).
    #[must_use]
    pub fn king_square(&self, player: Player) -> Square {
        self.pieces(player).king.as_square()
    }

    /// Checks the board invariants and reports the first violation found:
    ///
    /// - each square holds at most one piece,
    /// - each player has exactly one king,
    /// - the kings are not adjacent,
    /// - no pawns sit on the first or the last rank.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError`] describing the violation.
    pub fn validate(&self) -> Result<(), BoardError> {
        let bitboards = [
            self.white.king,
            self.white.queens,
            self.white.rooks,
            self.white.bishops,
            self.white.knights,
            self.white.pawns,
            self.black.king,
            self.black.queens,
            self.black.rooks,
            self.black.bishops,
            self.black.knights,
            self.black.pawns,
        ];
        let mut seen = Bitboard::empty();
        for bitboard in bitboards {
            let overlap = seen & bitboard;
            if overlap.has_any() {
                return Err(BoardError::DoubleOccupancy(overlap.as_square()));
            }
            seen |= bitboard;
        }
        for player in [Player::White, Player::Black] {
            match self.pieces(player).king.count() {
                0 => return Err(BoardError::MissingKing(player)),
                1 => (),
                _ => return Err(BoardError::MultipleKings(player)),
            }
        }
        if (attacks::king_attacks(self.king_square(Player::White))
            & self.black.king)
            .has_any()
        {
            return Err(BoardError::KingsAdjacent);
        }
        let backranks = Rank::One.mask() | Rank::Eight.mask();
        let stray_pawns = (self.white.pawns | self.black.pawns) & backranks;
        if stray_pawns.has_any() {
            return Err(BoardError::PawnOnBackRank(stray_pawns.as_square()));
        }
        Ok(())
    }

    /// Returns true when [`Board::validate`] finds no invariant violations.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl fmt::Display for Board {
    /// Returns the board representation as the piece placement field of FEN.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in Rank::iter().rev() {
            let mut empty_squares = 0;
            for file in File::iter() {
                let square = Square::new(file, rank);
                if let Some(piece) = self.at(square) {
                    if empty_squares != 0 {
                        write!(f, "{empty_squares}")?;
                        empty_squares = 0;
                    }
                    write!(f, "{piece}")?;
                } else {
                    empty_squares += 1;
                }
            }
            if empty_squares != 0 {
                write!(f, "{empty_squares}")?;
            }
            if rank != Rank::One {
                const RANK_SEPARATOR: char = '/';
                write!(f, "{RANK_SEPARATOR}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    /// Dumps the board in a simple format ('.' for empty square, FEN
    /// algebraic symbol for piece) a-la Stockfish "debug" command in UCI
    /// mode.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in Rank::iter().rev() {
            for file in File::iter() {
                let symbol = match self.at(Square::new(file, rank)) {
                    Some(piece) => piece.algebraic_symbol(),
                    None => '.',
                };
                write!(f, "{symbol}")?;
                if file != File::H {
                    write!(f, "{SQUARE_SEPARATOR}")?;
                }
            }
            if rank != Rank::One {
                write!(f, "{LINE_SEPARATOR}")?;
            }
        }
        Ok(())
    }
}
