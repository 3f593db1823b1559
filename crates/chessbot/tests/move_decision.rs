//! End-to-end move decisions through the public API.

use std::fs;
use std::path::PathBuf;

use chessbot::{
    BookFormat, BookStatus, ChessBot, EngineConfig, EvaluationWeights, MATE_SCORE, MoveSource, Rules,
    TableBook, parse_uci_move, write_binary_book,
};
use cozy_chess::Board;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("chessbot_it_{}_{name}", std::process::id()))
}

fn searching_bot() -> ChessBot {
    let mut config = EngineConfig::default();
    config.book.enabled = false;
    ChessBot::new(config).unwrap()
}

#[test]
fn start_position_depth_two_without_book() {
    let mut bot = searching_bot();
    let weights = EvaluationWeights::default();
    let start = Board::default();

    let result = bot.choose_move(&start, 2, &weights, false).unwrap();
    assert!(start.legal_moves().contains(&result.best_move));
    assert!(result.score.abs() < 150, "score {}", result.score);
    assert_eq!(result.source, MoveSource::Search);
}

#[test]
fn back_rank_mate_at_depth_one() {
    let mut bot = searching_bot();
    let weights = EvaluationWeights::default();
    let board = Board::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1", false).unwrap();

    let result = bot.choose_move(&board, 1, &weights, true).unwrap();
    assert_eq!(result.best_move, parse_uci_move(&board, "a1a8").unwrap());
    assert_eq!(result.score, MATE_SCORE);
}

#[test]
fn several_positions_return_legal_moves() {
    let fens = [
        "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
        "r3k2r/ppp2ppp/2n1bn2/3pp3/3PP3/2N1BN2/PPP2PPP/R3K2R b KQkq - 0 8",
        "8/8/4k3/8/2P5/8/4K3/8 w - - 0 1",
        "8/P7/8/8/8/8/6k1/4K3 w - - 0 1",
    ];
    let mut bot = searching_bot();
    let weights = EvaluationWeights::default();
    for fen in fens {
        let board = Board::from_fen(fen, false).unwrap();
        for depth in 1..=3 {
            let result = bot.choose_move(&board, depth, &weights, false).unwrap();
            assert!(board.legal_moves().contains(&result.best_move), "{fen} @ {depth}");
        }
    }
}

#[test]
fn toml_book_hit_and_miss() {
    let path = temp_path("book.toml");
    fs::write(
        &path,
        r#"
        [[position]]
        fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        moves = [{ uci = "c2c4", weight = 40 }, { uci = "g1f3", weight = 60 }]
        "#,
    )
    .unwrap();

    let mut config = EngineConfig::default();
    config.book.format = BookFormat::from_path(&path);
    config.book.path = Some(path.clone());
    let mut bot = ChessBot::new(config).unwrap();
    assert_eq!(
        bot.book_status(),
        &BookStatus::Loaded {
            format: BookFormat::Table
        }
    );

    let weights = EvaluationWeights::default();
    let start = Board::default();
    let hit = bot.choose_move(&start, 3, &weights, true).unwrap();
    assert_eq!(hit.best_move.to_string(), "g1f3");
    assert_eq!(hit.source, MoveSource::Book { weight: 60 });

    let mut after = start.clone();
    after.play(parse_uci_move(&start, "g1f3").unwrap());
    let miss = bot.choose_move(&after, 1, &weights, true).unwrap();
    assert_eq!(miss.source, MoveSource::Search);

    let _ = fs::remove_file(&path);
}

#[test]
fn compiled_binary_book_serves_the_builtin_lines() {
    let path = temp_path("builtin.bin");
    write_binary_book(&path, &TableBook::builtin().unwrap().entries()).unwrap();

    let mut config = EngineConfig::default();
    config.book.format = BookFormat::Binary;
    config.book.path = Some(path.clone());
    let mut bot = ChessBot::new(config).unwrap();
    assert!(bot.book_status().is_loaded());

    let weights = EvaluationWeights::default();
    let result = bot.choose_move(&Board::default(), 4, &weights, true).unwrap();
    assert_eq!(result.best_move.to_string(), "e2e4");
    assert!(matches!(result.source, MoveSource::Book { .. }));

    let _ = fs::remove_file(&path);
}

#[test]
fn corrupt_book_degrades_to_search() {
    let path = temp_path("corrupt.bin");
    fs::write(&path, [0xAB; 21]).unwrap();

    let mut config = EngineConfig::default();
    config.book.format = BookFormat::Binary;
    config.book.path = Some(path.clone());
    let mut bot = ChessBot::new(config).unwrap();
    match bot.book_status() {
        BookStatus::Unavailable { reason } => assert!(reason.contains("corrupt"), "{reason}"),
        other => panic!("unexpected status: {other:?}"),
    }

    let weights = EvaluationWeights::default();
    let result = bot.choose_move(&Board::default(), 1, &weights, true).unwrap();
    assert_eq!(result.source, MoveSource::Search);

    let _ = fs::remove_file(&path);
}

#[test]
fn config_file_drives_the_bot() {
    let weights_path = temp_path("weights.json");
    let mut weights = EvaluationWeights::default();
    weights.mobility = 0;
    weights.save_json(&weights_path).unwrap();

    let config_path = temp_path("engine.toml");
    fs::write(
        &config_path,
        format!(
            "depth = 2\nweights_path = {:?}\n\n[book]\nenabled = false\n",
            weights_path.display().to_string()
        ),
    )
    .unwrap();

    let config = EngineConfig::load(&config_path).unwrap();
    assert_eq!(config.depth, 2);
    let bot = ChessBot::new(config).unwrap();
    assert_eq!(bot.weights().mobility, 0);
    assert_eq!(bot.book_status(), &BookStatus::Disabled);

    let _ = fs::remove_file(&weights_path);
    let _ = fs::remove_file(&config_path);
}
