use itertools::Itertools;
use pretty_assertions::assert_eq;
use tabiya::chess::core::Move;
use tabiya::chess::position::Position;

fn setup(input: &str) -> Position {
    Position::try_from(input).expect("parsing legal position")
}

fn get_moves(position: &Position) -> Vec<String> {
    position
        .legal_moves()
        .iter()
        .map(Move::to_string)
        .sorted()
        .collect::<Vec<_>>()
}

fn sorted_moves(moves: &[&str]) -> Vec<String> {
    moves
        .iter()
        .map(|next_move| (*next_move).to_string())
        .sorted()
        .collect::<Vec<_>>()
}

#[test]
fn starting_moves() {
    assert_eq!(
        get_moves(&Position::starting()),
        sorted_moves(&[
            "a2a3", "a2a4", "b1a3", "b1c3", "b2b3", "b2b4", "c2c3", "c2c4", "d2d3", "d2d4",
            "e2e3", "e2e4", "f2f3", "f2f4", "g1f3", "g1h3", "g2g3", "g2g4", "h2h3", "h2h4"
        ])
    );
}

#[test]
fn kiwipete_has_48_moves() {
    let position = setup("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -");
    assert_eq!(position.legal_moves().len(), 48);
}

#[test]
fn promotions_expand_into_four_moves() {
    let position = setup("4k3/1P6/8/8/8/8/8/4K3 w - - 0 1");
    let moves = get_moves(&position);
    for promotion in ["b7b8q", "b7b8r", "b7b8b", "b7b8n"] {
        assert!(moves.contains(&promotion.to_string()), "missing {promotion}");
    }
    // A promotion carrying piece choice is legal; a bare push to the last
    // rank is not in the list.
    assert!(!moves.contains(&"b7b8".to_string()));
}

#[test]
fn en_passant_is_generated() {
    let position = setup("4k3/8/8/3Pp3/8/8/8/4K3 w - e6 0 1");
    assert!(get_moves(&position).contains(&"d5e6".to_string()));
}

#[test]
fn en_passant_discovering_a_rook_is_illegal() {
    // Taking en passant would remove both pawns from the fifth rank and
    // expose the king to the rook.
    let position = setup("4k3/8/8/KPp4r/8/8/8/8 w - c6 0 1");
    let moves = get_moves(&position);
    assert!(!moves.contains(&"b5c6".to_string()));
    assert!(moves.contains(&"b5b6".to_string()));
}

#[test]
fn pinned_bishop_can_not_move() {
    let position = setup("3kr3/8/8/8/8/8/4B3/4K3 w - - 0 1");
    assert!(get_moves(&position)
        .iter()
        .all(|next_move| !next_move.starts_with("e2")));
}

#[test]
fn castling_walk_must_be_safe() {
    // The rook on f3 covers f1: short castling would walk through check,
    // long castling stays clear of it.
    let position = setup("4k3/8/8/8/8/5r2/8/R3K2R w KQ - 0 1");
    let moves = get_moves(&position);
    assert!(!moves.contains(&"e1g1".to_string()));
    assert!(moves.contains(&"e1c1".to_string()));
    assert!(!moves.contains(&"e1f1".to_string()));
}

#[test]
fn castling_needs_empty_squares() {
    let position = setup("4k3/8/8/8/8/8/8/R2QK2R w KQ - 0 1");
    let moves = get_moves(&position);
    assert!(moves.contains(&"e1g1".to_string()));
    // The queen is in the way on the long side.
    assert!(!moves.contains(&"e1c1".to_string()));
}

#[test]
fn castling_out_of_check_is_illegal() {
    let position = setup("4k3/8/8/8/8/4r3/8/R3K2R w KQ - 0 1");
    let moves = get_moves(&position);
    assert!(!moves.contains(&"e1g1".to_string()));
    assert!(!moves.contains(&"e1c1".to_string()));
}

#[test]
fn double_check_only_king_moves() {
    // Both the rook on e1 and the bishop on b5 give check; the rook on a8
    // can neither block nor capture both, so only the king can resolve it.
    let position = setup("r3k3/8/8/1B6/8/8/8/4RK2 b - - 0 1");
    assert!(position.in_check());
    assert_eq!(get_moves(&position), sorted_moves(&["e8d8", "e8f7", "e8f8"]));
}

#[test]
fn check_must_be_resolved() {
    // The queen checks from h4; blocking, capturing or stepping away are the
    // only options.
    let position = setup("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
    // This is mate: f3 pawn can not capture h4, nothing blocks g3.
    assert!(position.is_checkmate());
}

#[test]
fn apply_unapply_restores_every_position() {
    for fen in [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - -",
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        "4k3/8/8/3Pp3/8/8/8/4K3 w - e6 0 1",
        "r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1",
    ] {
        let mut position = setup(fen);
        let original = position.clone();
        for next_move in position.legal_moves() {
            let undo = position.apply(&next_move);
            assert_ne!(
                position, original,
                "{fen}: applying {next_move} changed nothing"
            );
            position.unapply(undo);
            assert_eq!(position, original, "{fen}: undoing {next_move} diverged");
        }
    }
}

#[test]
fn nested_apply_unapply_consumes_receipts_in_lifo_order() {
    let mut position = Position::starting();
    let original = position.clone();
    let mut receipts = vec![];
    for uci_move in ["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"] {
        let next_move = Move::from_uci(uci_move).unwrap();
        receipts.push(position.apply(&next_move));
    }
    assert_eq!(
        position.to_string(),
        "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3"
    );
    while let Some(undo) = receipts.pop() {
        position.unapply(undo);
    }
    assert_eq!(position, original);
}
