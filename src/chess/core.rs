//! Board and move primitives commonly used within [`crate::chess`].

use std::{fmt, mem};

use anyhow::bail;

use crate::chess::bitboard::Bitboard;

#[allow(missing_docs)]
pub const BOARD_WIDTH: u8 = 8;
#[allow(missing_docs)]
pub const BOARD_SIZE: u8 = BOARD_WIDTH * BOARD_WIDTH;

/// Represents a column (vertical row) of the chessboard. In chess notation, it
/// is normally represented with a lowercase letter.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, strum::EnumIter)]
#[allow(missing_docs)]
pub enum File {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl File {
    /// Returns a bitboard with all squares of this file set.
    #[must_use]
    pub const fn mask(self) -> Bitboard {
        Bitboard::from_bits(0x0101_0101_0101_0101 << self as u8)
    }
}

impl TryFrom<char> for File {
    type Error = anyhow::Error;

    fn try_from(file: char) -> anyhow::Result<Self> {
        match file {
            'a'..='h' => Ok(unsafe { mem::transmute::<u8, Self>(file as u8 - b'a') }),
            _ => bail!("unknown file: expected within 'a'..='h', got '{file}'"),
        }
    }
}

impl TryFrom<u8> for File {
    type Error = anyhow::Error;

    fn try_from(column: u8) -> anyhow::Result<Self> {
        match column {
            0..=7 => Ok(unsafe { mem::transmute::<u8, Self>(column) }),
            _ => bail!("unknown file: expected within 0..BOARD_WIDTH, got {column}"),
        }
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", (b'a' + *self as u8) as char)
    }
}

/// Represents a horizontal row of the chessboard. In chess notation, it is
/// represented with a number. The implementation assumes zero-based values
/// (i.e. rank 1 would be 0).
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, strum::EnumIter)]
#[allow(missing_docs)]
pub enum Rank {
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
}

impl Rank {
    /// Returns a bitboard with all squares of this rank set.
    #[must_use]
    pub const fn mask(self) -> Bitboard {
        Bitboard::from_bits(0xFF << (self as u8 * BOARD_WIDTH))
    }

    /// The rank where the player's pieces start the game.
    #[must_use]
    pub const fn backrank(player: Player) -> Self {
        match player {
            Player::White => Self::One,
            Player::Black => Self::Eight,
        }
    }

    /// The rank where the player's pawns start the game.
    #[must_use]
    pub const fn pawns_starting(player: Player) -> Self {
        match player {
            Player::White => Self::Two,
            Player::Black => Self::Seven,
        }
    }
}

impl TryFrom<char> for Rank {
    type Error = anyhow::Error;

    fn try_from(rank: char) -> anyhow::Result<Self> {
        match rank {
            '1'..='8' => Ok(unsafe { mem::transmute::<u8, Self>(rank as u8 - b'1') }),
            _ => bail!("unknown rank: expected within '1'..='8', got '{rank}'"),
        }
    }
}

impl TryFrom<u8> for Rank {
    type Error = anyhow::Error;

    fn try_from(row: u8) -> anyhow::Result<Self> {
        match row {
            0..=7 => Ok(unsafe { mem::transmute::<u8, Self>(row) }),
            _ => bail!("unknown rank: expected within 0..BOARD_WIDTH, got {row}"),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", *self as u8 + 1)
    }
}

/// Board squares: from left to right, from bottom to the top:
///
/// ```
/// use tabiya::chess::core::Square;
///
/// assert_eq!(Square::A1 as u8, 0);
/// assert_eq!(Square::E1 as u8, 4);
/// assert_eq!(Square::H1 as u8, 7);
/// assert_eq!(Square::A4 as u8, 8 * 3);
/// assert_eq!(Square::H8 as u8, 63);
/// ```
///
/// Square is a compact representation using only one byte.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::EnumIter)]
#[rustfmt::skip]
#[allow(missing_docs)]
pub enum Square {
    A1, B1, C1, D1, E1, F1, G1, H1,
    A2, B2, C2, D2, E2, F2, G2, H2,
    A3, B3, C3, D3, E3, F3, G3, H3,
    A4, B4, C4, D4, E4, F4, G4, H4,
    A5, B5, C5, D5, E5, F5, G5, H5,
    A6, B6, C6, D6, E6, F6, G6, H6,
    A7, B7, C7, D7, E7, F7, G7, H7,
    A8, B8, C8, D8, E8, F8, G8, H8,
}

impl Square {
    /// Connects file (column) and rank (row) to form a full square.
    #[must_use]
    pub const fn new(file: File, rank: Rank) -> Self {
        unsafe { mem::transmute(file as u8 + (rank as u8) * BOARD_WIDTH) }
    }

    /// Returns file (column) on which the square is located.
    #[must_use]
    pub const fn file(self) -> File {
        unsafe { mem::transmute(self as u8 % BOARD_WIDTH) }
    }

    /// Returns rank (row) on which the square is located.
    #[must_use]
    pub const fn rank(self) -> Rank {
        unsafe { mem::transmute(self as u8 / BOARD_WIDTH) }
    }

    /// Returns true if the other square is a king move away from this one.
    /// A square is not adjacent to itself.
    #[must_use]
    pub fn is_adjacent_to(self, other: Self) -> bool {
        let file_distance = (self.file() as i8 - other.file() as i8).abs();
        let rank_distance = (self.rank() as i8 - other.rank() as i8).abs();
        self != other && file_distance <= 1 && rank_distance <= 1
    }

    pub(crate) fn shift(self, direction: Direction) -> Option<Self> {
        match direction {
            Direction::Right | Direction::UpRight | Direction::DownRight => {
                if self.file() == File::H {
                    return None;
                }
            }
            Direction::Left | Direction::UpLeft | Direction::DownLeft => {
                if self.file() == File::A {
                    return None;
                }
            }
            Direction::Up | Direction::Down => (),
        }
        let candidate = self as i8 + direction.offset();
        if candidate < 0 {
            return None;
        }
        Self::try_from(candidate as u8).ok()
    }
}

impl TryFrom<u8> for Square {
    type Error = anyhow::Error;

    /// Creates a square given its position on the board.
    ///
    /// # Errors
    ///
    /// If given square index is outside 0..[`BOARD_SIZE`] range.
    fn try_from(square_index: u8) -> anyhow::Result<Self> {
        // Exclusive range patterns are not allowed: https://github.com/rust-lang/rust/issues/37854
        const MAX_INDEX: u8 = BOARD_SIZE - 1;
        match square_index {
            0..=MAX_INDEX => Ok(unsafe { mem::transmute::<u8, Self>(square_index) }),
            _ => bail!("unknown square index: needs to be in 0..BOARD_SIZE, got {square_index}"),
        }
    }
}

impl TryFrom<&str> for Square {
    type Error = anyhow::Error;

    fn try_from(square: &str) -> anyhow::Result<Self> {
        let bytes = square.as_bytes();
        if bytes.len() != 2 {
            bail!(
                "unknown square: should be two-char, got {square} with {} chars",
                bytes.len()
            );
        }
        let (file, rank) = (bytes[0] as char, bytes[1] as char);
        Ok(Self::new(file.try_into()?, rank.try_into()?))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.file(), self.rank())
    }
}

/// A standard game of chess is played between two players: White (having the
/// advantage of the first turn) and Black.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Player {
    White,
    Black,
}

impl std::ops::Not for Player {
    type Output = Self;

    /// Returns the opponent. Taking the opposite twice gives back the original
    /// player.
    fn not(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

impl TryFrom<&str> for Player {
    type Error = anyhow::Error;

    fn try_from(player: &str) -> anyhow::Result<Self> {
        match player {
            "w" => Ok(Self::White),
            "b" => Ok(Self::Black),
            _ => bail!("unknown player: expected 'w' or 'b', got '{player}'"),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match &self {
                Self::White => 'w',
                Self::Black => 'b',
            }
        )
    }
}

/// Standard [chess pieces].
///
/// [chess pieces]: https://en.wikipedia.org/wiki/Chess_piece
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PieceKind {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

/// Represents a specific piece owned by a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Piece {
    #[allow(missing_docs)]
    pub owner: Player,
    #[allow(missing_docs)]
    pub kind: PieceKind,
}

impl Piece {
    /// Algebraic notation symbol used in FEN. Uppercase for white, lowercase
    /// for black.
    pub(in crate::chess) fn algebraic_symbol(&self) -> char {
        let result = match &self.kind {
            PieceKind::King => 'k',
            PieceKind::Queen => 'q',
            PieceKind::Rook => 'r',
            PieceKind::Bishop => 'b',
            PieceKind::Knight => 'n',
            PieceKind::Pawn => 'p',
        };
        match &self.owner {
            Player::White => result.to_ascii_uppercase(),
            Player::Black => result,
        }
    }
}

impl TryFrom<char> for Piece {
    type Error = anyhow::Error;

    fn try_from(symbol: char) -> anyhow::Result<Self> {
        let owner = if symbol.is_ascii_uppercase() {
            Player::White
        } else {
            Player::Black
        };
        let kind = match symbol.to_ascii_lowercase() {
            'k' => PieceKind::King,
            'q' => PieceKind::Queen,
            'r' => PieceKind::Rook,
            'b' => PieceKind::Bishop,
            'n' => PieceKind::Knight,
            'p' => PieceKind::Pawn,
            _ => bail!("unknown piece symbol: expected within \"KQRBNPkqrbnp\", got '{symbol}'"),
        };
        Ok(Self { owner, kind })
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.algebraic_symbol())
    }
}

/// Directions on the board from the perspective of the White player.
///
/// Traditionally these would be cardinal directions (North, East and so on),
/// but relative directions are more straightforward to argue about when both
/// players are involved.
#[derive(Copy, Clone, Debug)]
#[allow(missing_docs)]
pub(crate) enum Direction {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction {
    pub(crate) const fn offset(self) -> i8 {
        match self {
            Self::Up => BOARD_WIDTH as i8,
            Self::Down => -(BOARD_WIDTH as i8),
            Self::Left => -1,
            Self::Right => 1,
            Self::UpLeft => BOARD_WIDTH as i8 - 1,
            Self::UpRight => BOARD_WIDTH as i8 + 1,
            Self::DownLeft => -(BOARD_WIDTH as i8 + 1),
            Self::DownRight => -(BOARD_WIDTH as i8 - 1),
        }
    }

    pub(crate) const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::UpLeft => Self::DownRight,
            Self::UpRight => Self::DownLeft,
            Self::DownLeft => Self::UpRight,
            Self::DownRight => Self::UpLeft,
        }
    }
}

/// A role the pawn can be promoted to once it reaches the last rank. Pawns
/// can not stay pawns and can not become kings.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Promotion {
    Knight,
    Bishop,
    Rook,
    Queen,
}

impl Promotion {
    /// The kind of piece the pawn turns into.
    #[must_use]
    pub const fn kind(self) -> PieceKind {
        match self {
            Self::Knight => PieceKind::Knight,
            Self::Bishop => PieceKind::Bishop,
            Self::Rook => PieceKind::Rook,
            Self::Queen => PieceKind::Queen,
        }
    }

    const fn algebraic_symbol(self) -> char {
        match self {
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
        }
    }
}

/// Failure while interpreting a move in UCI long algebraic notation.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseMoveError {
    /// The move string is shorter or longer than "from square + to square +
    /// optional promotion" allows.
    #[error("move should be 4 or 5 characters long, got {0}")]
    Length(usize),
    /// One of the two square names does not designate a board square.
    #[error("unknown square: {0:?}")]
    Square(String),
    /// The trailing promotion letter is not one of "qrbn".
    #[error("unknown promotion piece: '{0}', expected one of \"qrbn\"")]
    Promotion(char),
}

/// A chess move: where the piece moves from and to plus the promotion
/// information where relevant. Castling is encoded as the king travelling two
/// squares towards the rook.
///
/// Which piece moves, whether the move is a capture, an en passant capture or
/// a castle is not stored: all of it can be recovered from the position the
/// move is applied to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Move {
    from: Square,
    to: Square,
    promotion: Option<Promotion>,
}

impl Move {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn new(from: Square, to: Square, promotion: Option<Promotion>) -> Self {
        Self {
            from,
            to,
            promotion,
        }
    }

    /// Parses a move from UCI-compatible long algebraic notation, e.g. "e2e4"
    /// or "e7e8q".
    ///
    /// # Errors
    ///
    /// Returns [`ParseMoveError`] when the input is not wellformed. Whether
    /// the move is legal in any position is not this function's concern.
    pub fn from_uci(input: &str) -> Result<Self, ParseMoveError> {
        if input.len() < 4 || input.len() > 5 {
            return Err(ParseMoveError::Length(input.len()));
        }
        // get() instead of slicing: the input comes straight from the wire
        // and a square name may fall on a multi-byte character boundary.
        let from = match input.get(0..2) {
            Some(name) => {
                Square::try_from(name).map_err(|_| ParseMoveError::Square(name.to_string()))?
            }
            None => return Err(ParseMoveError::Square(input.to_string())),
        };
        let to = match input.get(2..4) {
            Some(name) => {
                Square::try_from(name).map_err(|_| ParseMoveError::Square(name.to_string()))?
            }
            None => return Err(ParseMoveError::Square(input.to_string())),
        };
        let promotion = match input.as_bytes().get(4) {
            None => None,
            Some(b'q') => Some(Promotion::Queen),
            Some(b'r') => Some(Promotion::Rook),
            Some(b'b') => Some(Promotion::Bishop),
            Some(b'n') => Some(Promotion::Knight),
            Some(&symbol) => return Err(ParseMoveError::Promotion(symbol as char)),
        };
        Ok(Self::new(from, to, promotion))
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn from(&self) -> Square {
        self.from
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn to(&self) -> Square {
        self.to
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn promotion(&self) -> Option<Promotion> {
        self.promotion
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promotion) = self.promotion {
            write!(f, "{}", promotion.algebraic_symbol())?;
        }
        Ok(())
    }
}

/// Moves of a position, in no particular order. The capacity covers the
/// worst case for any army of at most 16 pieces (15 queens plus the king sum
/// to fewer than 512 targets), so generation never spills: the record over
/// the board is 218 legal moves.
pub type MoveList = arrayvec::ArrayVec<Move, 512>;

bitflags::bitflags! {
    /// Track the ability to [castle] each side (kingside is often referred to
    /// as O-O or OO, queenside as O-O-O or OOO). When the king moves, the
    /// player loses the ability to castle both sides, when a rook moves or is
    /// captured on its home square, the player loses the ability to castle
    /// the corresponding side. Rights are only ever removed during a game,
    /// never added back.
    ///
    /// [castle]: https://www.chessprogramming.org/Castling
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CastlingRights: u8 {
        #[allow(missing_docs)]
        const WHITE_SHORT = 0b0001;
        #[allow(missing_docs)]
        const WHITE_LONG = 0b0010;
        #[allow(missing_docs)]
        const BLACK_SHORT = 0b0100;
        #[allow(missing_docs)]
        const BLACK_LONG = 0b1000;
    }
}

impl CastlingRights {
    /// No player can castle either side.
    pub const NONE: Self = Self::empty();
    /// Both players can castle both sides.
    pub const ALL: Self = Self::all();
}

impl TryFrom<&str> for CastlingRights {
    type Error = anyhow::Error;

    /// Parses [`CastlingRights`] from the FEN format: either "-" or a
    /// non-empty subsequence of "KQkq" in that canonical order.
    ///
    /// # Errors
    ///
    /// Returns an error on unknown symbols, duplicates and letters out of the
    /// canonical order. The strictness preserves the byte-for-byte FEN
    /// round-trip.
    fn try_from(fen: &str) -> anyhow::Result<Self> {
        if fen == "-" {
            return Ok(Self::NONE);
        }
        if fen.is_empty() {
            bail!("castling rights can not be empty: expected '-' or a subsequence of \"KQkq\"");
        }
        let mut rights = Self::NONE;
        for symbol in fen.chars() {
            let right = match symbol {
                'K' => Self::WHITE_SHORT,
                'Q' => Self::WHITE_LONG,
                'k' => Self::BLACK_SHORT,
                'q' => Self::BLACK_LONG,
                _ => bail!("unknown castling right: expected within \"KQkq\", got '{symbol}'"),
            };
            if right.bits() <= rights.bits() {
                bail!("castling rights should be a subsequence of \"KQkq\", got {fen}");
            }
            rights |= right;
        }
        Ok(rights)
    }
}

impl fmt::Display for CastlingRights {
    /// Prints the rights in canonical FEN format.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }
        for (right, symbol) in [
            (Self::WHITE_SHORT, 'K'),
            (Self::WHITE_LONG, 'Q'),
            (Self::BLACK_SHORT, 'k'),
            (Self::BLACK_LONG, 'q'),
        ] {
            if self.contains(right) {
                write!(f, "{symbol}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::mem::size_of;

    use pretty_assertions::assert_eq;

    use super::{
        CastlingRights, Direction, File, Move, ParseMoveError, PieceKind, Player, Promotion, Rank,
        Square, BOARD_SIZE, BOARD_WIDTH,
    };

    #[test]
    fn rank() {
        assert_eq!(
            ('1'..='9')
                .filter_map(|ch| Rank::try_from(ch).ok())
                .collect::<Vec<Rank>>(),
            vec![
                Rank::One,
                Rank::Two,
                Rank::Three,
                Rank::Four,
                Rank::Five,
                Rank::Six,
                Rank::Seven,
                Rank::Eight,
            ]
        );
        assert!(Rank::try_from('0').is_err());
        assert!(Rank::try_from(BOARD_WIDTH).is_err());
    }

    #[test]
    fn file() {
        assert_eq!(
            ('a'..='i')
                .filter_map(|ch| File::try_from(ch).ok())
                .collect::<Vec<File>>(),
            vec![
                File::A,
                File::B,
                File::C,
                File::D,
                File::E,
                File::F,
                File::G,
                File::H,
            ]
        );
        assert!(File::try_from('i').is_err());
        assert!(File::try_from(BOARD_WIDTH).is_err());
    }

    #[test]
    fn square() {
        let squares: Vec<_> = [
            0u8,
            BOARD_SIZE - 1,
            BOARD_WIDTH - 1,
            BOARD_WIDTH,
            BOARD_WIDTH * 2 + 5,
            BOARD_SIZE,
        ]
        .iter()
        .filter_map(|square| Square::try_from(*square).ok())
        .collect();
        assert_eq!(
            squares,
            vec![Square::A1, Square::H8, Square::H1, Square::A2, Square::F3]
        );
        assert_eq!(Square::try_from("e4").unwrap(), Square::E4);
        assert_eq!(Square::try_from("h8").unwrap(), Square::H8);
        assert!(Square::try_from("i1").is_err());
        assert!(Square::try_from("a9").is_err());
        assert!(Square::try_from("e").is_err());
    }

    #[test]
    fn primitive_size() {
        assert_eq!(size_of::<Square>(), 1);
        // Primitives will have small size thanks to the niche optimizations:
        // https://rust-lang.github.io/unsafe-code-guidelines/layout/enums.html#layout-of-a-data-carrying-enums-without-a-repr-annotation
        assert_eq!(size_of::<PieceKind>(), size_of::<Option<PieceKind>>());
        assert_eq!(size_of::<Move>(), 3);
    }

    #[test]
    fn square_shift() {
        let square = Square::E4;
        assert_eq!(square.shift(Direction::Up), Some(Square::E5));
        assert_eq!(square.shift(Direction::Down), Some(Square::E3));
        assert_eq!(square.shift(Direction::Left), Some(Square::D4));
        assert_eq!(square.shift(Direction::Right), Some(Square::F4));
        assert_eq!(square.shift(Direction::UpLeft), Some(Square::D5));
        assert_eq!(square.shift(Direction::UpRight), Some(Square::F5));
        assert_eq!(square.shift(Direction::DownLeft), Some(Square::D3));
        assert_eq!(square.shift(Direction::DownRight), Some(Square::F3));

        // The board does not wrap around either edge.
        assert_eq!(Square::A1.shift(Direction::Left), None);
        assert_eq!(Square::A1.shift(Direction::Down), None);
        assert_eq!(Square::A1.shift(Direction::DownLeft), None);
        assert_eq!(Square::H8.shift(Direction::Right), None);
        assert_eq!(Square::H8.shift(Direction::Up), None);
        assert_eq!(Square::H8.shift(Direction::UpRight), None);
        assert_eq!(Square::H4.shift(Direction::UpRight), None);
        assert_eq!(Square::A4.shift(Direction::DownLeft), None);
    }

    #[test]
    fn adjacent_squares() {
        assert!(Square::A1.is_adjacent_to(Square::A2));
        assert!(Square::A1.is_adjacent_to(Square::B2));
        assert!(Square::E4.is_adjacent_to(Square::D5));
        assert!(!Square::A1.is_adjacent_to(Square::A3));
        assert!(!Square::A1.is_adjacent_to(Square::A1));
        assert!(!Square::A1.is_adjacent_to(Square::H8));
    }

    #[test]
    fn opponent() {
        assert_eq!(!Player::White, Player::Black);
        assert_eq!(!Player::Black, Player::White);
        assert_eq!(!!Player::White, Player::White);
    }

    #[test]
    fn move_from_uci() {
        assert_eq!(
            Move::from_uci("e2e4").unwrap(),
            Move::new(Square::E2, Square::E4, None)
        );
        assert_eq!(
            Move::from_uci("e7e8q").unwrap(),
            Move::new(Square::E7, Square::E8, Some(Promotion::Queen))
        );
        assert_eq!(
            Move::from_uci("a7a8n").unwrap(),
            Move::new(Square::A7, Square::A8, Some(Promotion::Knight))
        );
        assert_eq!(Move::from_uci("e2e"), Err(ParseMoveError::Length(3)));
        assert_eq!(Move::from_uci("e7e8qq"), Err(ParseMoveError::Length(6)));
        assert_eq!(Move::from_uci("e7e8h"), Err(ParseMoveError::Promotion('h')));
        assert_eq!(
            Move::from_uci("i2e4"),
            Err(ParseMoveError::Square("i2".to_string()))
        );
    }

    #[test]
    fn move_display() {
        assert_eq!(Move::new(Square::G1, Square::F3, None).to_string(), "g1f3");
        assert_eq!(
            Move::new(Square::B7, Square::C8, Some(Promotion::Rook)).to_string(),
            "b7c8r"
        );
    }

    #[test]
    fn castling_rights() {
        assert_eq!(CastlingRights::try_from("-").unwrap(), CastlingRights::NONE);
        assert_eq!(
            CastlingRights::try_from("KQkq").unwrap(),
            CastlingRights::ALL
        );
        assert_eq!(
            CastlingRights::try_from("Kq").unwrap(),
            CastlingRights::WHITE_SHORT | CastlingRights::BLACK_LONG
        );
        // Only canonical order survives the encode-decode round-trip.
        assert!(CastlingRights::try_from("qK").is_err());
        assert!(CastlingRights::try_from("KK").is_err());
        assert!(CastlingRights::try_from("").is_err());
        assert!(CastlingRights::try_from("KQxq").is_err());

        assert_eq!(CastlingRights::ALL.to_string(), "KQkq");
        assert_eq!(CastlingRights::NONE.to_string(), "-");
        assert_eq!(
            (CastlingRights::WHITE_LONG | CastlingRights::BLACK_SHORT).to_string(),
            "Qk"
        );
    }
}
