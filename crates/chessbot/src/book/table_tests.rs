use super::*;

fn play(moves: &[&str]) -> Board {
    let mut board = Board::default();
    for uci in moves {
        let mv = parse_uci_move(&board, uci).unwrap();
        board.play(mv);
    }
    board
}

/// Stored weight of `mv` in `board`, if the book lists it.
fn weight_of(book: &TableBook, board: &Board, mv: Move) -> Option<u16> {
    let code = encode_move(mv);
    book.positions
        .get(&book_key(board))?
        .iter()
        .find(|(existing, _)| *existing == code)
        .map(|&(_, weight)| weight)
}

fn uci_list(hits: &[BookMove]) -> Vec<String> {
    hits.iter().map(|hit| hit.mv.to_string()).collect()
}

#[test]
fn test_builtin_first_moves() {
    let book = TableBook::builtin().unwrap();
    let hits = book.lookup(&Board::default());
    assert_eq!(uci_list(&hits), vec!["e2e4", "d2d4", "c2c4", "g1f3"]);
    assert!(hits.iter().all(|hit| hit.weight == 100));
}

#[test]
fn test_builtin_replies_decay() {
    let book = TableBook::builtin().unwrap();
    let hits = book.lookup(&play(&["e2e4"]));
    assert_eq!(uci_list(&hits), vec!["e7e5", "c7c5", "e7e6", "c7c6"]);
    assert!(hits.iter().all(|hit| hit.weight == 90));

    let ruy_or_italian = book.lookup(&play(&["e2e4", "e7e5", "g1f3", "b8c6"]));
    assert_eq!(uci_list(&ruy_or_italian), vec!["f1b5", "f1c4"]);
    assert_eq!(ruy_or_italian[0].weight, 60);
}

#[test]
fn test_reti_line_hits() {
    let book = TableBook::builtin().unwrap();
    let hits = book.lookup(&play(&["g1f3", "d7d5"]));
    assert_eq!(uci_list(&hits), vec!["c2c4"]);
}

#[test]
fn test_absent_position_is_empty() {
    let book = TableBook::builtin().unwrap();
    assert!(book.lookup(&play(&["a2a3"])).is_empty());
}

#[test]
fn test_lookup_only_returns_book_moves() {
    let book = TableBook::builtin().unwrap();
    let position = play(&["d2d4"]);
    let hits = book.lookup(&position);
    for hit in &hits {
        assert!(weight_of(&book, &position, hit.mv).is_some());
        assert!(position.legal_moves().contains(&hit.mv));
    }
    assert_eq!(hits.len(), 4);
}

#[test]
fn test_toml_lines_and_positions() {
    let text = r#"
        [[line]]
        moves = ["e2e4", "c7c5", "g1f3"]
        base_weight = 50
        decay = 5

        [[position]]
        fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        moves = [{ uci = "e7e5", weight = 80 }, { uci = "c7c5", weight = 20 }]
    "#;
    let book = TableBook::from_toml_str(text).unwrap();

    let start_hits = book.lookup(&Board::default());
    assert_eq!(uci_list(&start_hits), vec!["e2e4"]);
    assert_eq!(start_hits[0].weight, 50);

    // The line gave c7c5 weight 45; the position entry keeps the larger.
    let after_e4 = book.lookup(&play(&["e2e4"]));
    assert_eq!(uci_list(&after_e4), vec!["e7e5", "c7c5"]);
    assert_eq!(after_e4[1].weight, 45);

    let sicilian = book.lookup(&play(&["e2e4", "c7c5"]));
    assert_eq!(sicilian[0].weight, 40);
}

#[test]
fn test_line_weight_never_below_one() {
    let mut book = TableBook::new();
    book.add_line(&["e2e4", "e7e5", "g1f3"], 10, 20).unwrap();
    let hits = book.lookup(&play(&["e2e4", "e7e5"]));
    assert_eq!(hits[0].weight, 1);
}

#[test]
fn test_illegal_line_is_rejected() {
    let mut book = TableBook::new();
    let err = book.add_line(&["e2e4", "e2e4"], 100, 10).unwrap_err();
    match err {
        BookError::IllegalMove { uci, ply, .. } => {
            assert_eq!(uci, "e2e4");
            assert_eq!(ply, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_bad_toml_and_fen() {
    assert!(matches!(
        TableBook::from_toml_str("[[line]]\nmoves = 3"),
        Err(BookError::Parse(_))
    ));
    let bad_fen = r#"
        [[position]]
        fen = "not a fen"
        moves = []
    "#;
    assert!(matches!(
        TableBook::from_toml_str(bad_fen),
        Err(BookError::InvalidFen { .. })
    ));
}

#[test]
fn test_entries_cover_every_position() {
    let book = TableBook::builtin().unwrap();
    let entries = book.entries();
    let mut keys: Vec<u64> = entries.iter().map(|e| e.key).collect();
    assert!(keys.windows(2).all(|pair| pair[0] <= pair[1]));
    keys.dedup();
    assert_eq!(keys.len(), book.len());
}

fn game(moves: &[&str]) -> Vec<Move> {
    let mut board = Board::default();
    moves
        .iter()
        .map(|uci| {
            let mv = parse_uci_move(&board, uci).unwrap();
            board.play(mv);
            mv
        })
        .collect()
}

#[test]
fn test_reinforce_rewards_winner_moves_only() {
    let book = TableBook::builtin().unwrap();
    let moves = game(&["e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6"]);

    let updated = book.reinforced(&moves, GameOutcome::WhiteWins, Color::White);

    let start = Board::default();
    assert_eq!(weight_of(&updated, &start, moves[0]), Some(105));
    // Black's reply is untouched.
    let after_e4 = play(&["e2e4"]);
    assert_eq!(weight_of(&updated, &after_e4, moves[1]), Some(90));
    let ruy = play(&["e2e4", "e7e5", "g1f3", "b8c6"]);
    assert_eq!(weight_of(&updated, &ruy, moves[4]), Some(65));

    // The original book is unchanged.
    assert_eq!(weight_of(&book, &start, moves[0]), Some(100));
}

#[test]
fn test_reinforce_loss_and_draw() {
    let book = TableBook::builtin().unwrap();
    let moves = game(&["d2d4", "d7d5", "c2c4"]);
    let after_d4 = play(&["d2d4"]);

    let lost = book.reinforced(&moves, GameOutcome::WhiteWins, Color::Black);
    assert_eq!(weight_of(&lost, &after_d4, moves[1]), Some(85));

    let drawn = book.reinforced(&moves, GameOutcome::Draw, Color::Black);
    assert_eq!(weight_of(&drawn, &after_d4, moves[1]), Some(90));
}

#[test]
fn test_reinforce_stops_when_game_leaves_book() {
    let mut book = TableBook::new();
    book.add_line(&["e2e4", "e7e5"], 100, 10).unwrap();
    book.add_line(&["g1f3"], 100, 10).unwrap();
    // After 1.e4 e5 2.Nf3 the knight move is not in the book for that position.
    let moves = game(&["e2e4", "e7e5", "g1f3"]);

    let updated = book.reinforced(&moves, GameOutcome::WhiteWins, Color::White);
    let start = Board::default();
    let nf3_from_start = parse_uci_move(&start, "g1f3").unwrap();
    assert_eq!(weight_of(&updated, &start, nf3_from_start), Some(100));
    assert_eq!(weight_of(&updated, &start, moves[0]), Some(105));
}
