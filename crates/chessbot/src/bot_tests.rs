use super::*;
use crate::book::{BookPolicy, TableBook};
use crate::config::BookConfig;
use crate::eval::MATE_SCORE;
use crate::rules::{Rules, parse_uci_move};
use cozy_chess::Move;
use std::time::Duration;

const FOOLS_MATE: &str = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
const BACK_RANK: &str = "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1";

fn no_book() -> EngineConfig {
    EngineConfig {
        book: BookConfig {
            enabled: false,
            ..BookConfig::default()
        },
        ..EngineConfig::default()
    }
}

fn board(fen: &str) -> Board {
    Board::from_fen(fen, false).unwrap()
}

#[test]
fn test_builtin_book_hit_at_start() {
    let mut bot = ChessBot::new(EngineConfig::default()).unwrap();
    assert!(bot.book_status().is_loaded());

    let weights = EvaluationWeights::default();
    let result = bot.choose_move(&Board::default(), 4, &weights, true).unwrap();
    assert_eq!(result.best_move.to_string(), "e2e4");
    assert_eq!(result.source, MoveSource::Book { weight: 100 });
    assert_eq!(result.depth, 0);
    assert_eq!(result.nodes, 0);
}

#[test]
fn test_book_disabled_per_call_searches() {
    let mut bot = ChessBot::new(EngineConfig::default()).unwrap();
    let weights = EvaluationWeights::default();
    let start = Board::default();
    let result = bot.choose_move(&start, 2, &weights, false).unwrap();
    assert_eq!(result.source, MoveSource::Search);
    assert_eq!(result.depth, 2);
    assert!(start.legal_moves().contains(&result.best_move));
}

#[test]
fn test_book_miss_falls_through_to_search() {
    let mut bot = ChessBot::new(EngineConfig::default()).unwrap();
    let weights = EvaluationWeights::default();
    let position = board(BACK_RANK);
    let result = bot.choose_move(&position, 1, &weights, true).unwrap();
    assert_eq!(result.source, MoveSource::Search);
    assert_eq!(result.best_move.to_string(), "a1a8");
    assert_eq!(result.score, MATE_SCORE);
}

#[test]
fn test_extreme_weights_still_find_mate() {
    let mut bot = ChessBot::new(no_book()).unwrap();
    let weights = EvaluationWeights {
        queen: i32::MAX,
        rook: i32::MAX,
        mobility: i32::MAX,
        pawn_shield: i32::MIN,
        ..EvaluationWeights::default()
    };
    let result = bot.choose_move(&board(BACK_RANK), 1, &weights, false).unwrap();
    assert_eq!(result.best_move.to_string(), "a1a8");
    assert_eq!(result.score, MATE_SCORE);
}

#[test]
fn test_no_legal_moves() {
    let mut bot = ChessBot::new(no_book()).unwrap();
    let weights = EvaluationWeights::default();
    assert!(matches!(
        bot.choose_move(&board(FOOLS_MATE), 3, &weights, true),
        Err(EngineError::NoLegalMoves)
    ));
}

#[test]
fn test_caller_board_untouched() {
    let mut bot = ChessBot::new(no_book()).unwrap();
    let weights = EvaluationWeights::default();
    let position = board("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3");
    let before = position.hash();
    bot.choose_move(&position, 3, &weights, false).unwrap();
    assert_eq!(position.hash(), before);
    assert_eq!(position.halfmove_clock(), 2);
}

#[test]
fn test_disabled_book_status() {
    let bot = ChessBot::new(no_book()).unwrap();
    assert_eq!(bot.book_status(), &BookStatus::Disabled);
}

#[test]
fn test_missing_binary_book_is_unavailable() {
    let mut config = EngineConfig::default();
    config.book.format = BookFormat::Binary;
    config.book.path = Some(std::env::temp_dir().join("chessbot_no_such_book.bin"));
    let mut bot = ChessBot::new(config).unwrap();
    assert!(matches!(bot.book_status(), BookStatus::Unavailable { .. }));

    let weights = EvaluationWeights::default();
    let result = bot.choose_move(&Board::default(), 1, &weights, true).unwrap();
    assert_eq!(result.source, MoveSource::Search);
}

#[test]
fn test_book_without_path_is_unavailable() {
    let mut config = EngineConfig::default();
    config.book.format = BookFormat::Table;
    let bot = ChessBot::new(config).unwrap();
    match bot.book_status() {
        BookStatus::Unavailable { reason } => assert!(reason.contains("path")),
        other => panic!("unexpected status: {other:?}"),
    }
}

#[test]
fn test_missing_weights_file_is_error() {
    let config = EngineConfig {
        weights_path: Some(std::env::temp_dir().join("chessbot_no_such_weights.json")),
        ..no_book()
    };
    assert!(matches!(ChessBot::new(config), Err(ConfigError::Io { .. })));
}

#[test]
fn test_custom_book() {
    let mut table = TableBook::new();
    table.add_line(&["b1c3"], 7, 1).unwrap();
    let mut bot = ChessBot::with_book(
        EngineConfig::default(),
        EvaluationWeights::default(),
        Box::new(table),
    );
    let result = Engine::search(&mut bot, &Board::default(), &SearchLimits::depth(3)).unwrap();
    assert_eq!(result.best_move.to_string(), "b1c3");
    assert_eq!(result.source, MoveSource::Book { weight: 7 });
}

#[test]
fn test_book_score_is_side_relative() {
    let mut bot = ChessBot::new(EngineConfig::default()).unwrap();
    let weights = EvaluationWeights::default();
    let mut after_e4 = Board::default();
    after_e4.play(parse_uci_move(&after_e4, "e2e4").unwrap());
    let result = bot.book_move(&after_e4, &weights).unwrap();
    assert_eq!(result.side, Color::Black);
    assert_eq!(result.score, -evaluate(&after_e4, &weights));
    assert_eq!(result.white_score(), evaluate(&after_e4, &weights));
}

#[test]
fn test_new_game_replays_book_choices() {
    let mut config = EngineConfig::default();
    config.book.policy = BookPolicy::Weighted;
    config.book.seed = 11;
    let mut bot = ChessBot::new(config).unwrap();
    let weights = EvaluationWeights::default();
    let start = Board::default();

    let first: Vec<Move> = (0..8)
        .map(|_| bot.book_move(&start, &weights).unwrap().best_move)
        .collect();
    bot.new_game();
    let second: Vec<Move> = (0..8)
        .map(|_| bot.book_move(&start, &weights).unwrap().best_move)
        .collect();
    assert_eq!(first, second);
}

#[test]
fn test_set_option() {
    let mut bot = ChessBot::new(EngineConfig::default()).unwrap();

    assert!(bot.set_option("Depth", "6"));
    assert_eq!(bot.config().depth, 6);
    assert_eq!(bot.default_limits(), SearchLimits::depth(6));
    assert!(bot.set_option("depth", "200"));
    assert_eq!(bot.config().depth, MAX_DEPTH);
    assert!(!bot.set_option("Depth", "deep"));

    assert!(bot.set_option("OwnBook", "false"));
    assert_eq!(bot.book_status(), &BookStatus::Disabled);
    assert!(bot.set_option("OwnBook", "true"));
    assert!(bot.book_status().is_loaded());

    assert!(bot.set_option("BookFile", "/nonexistent/book.bin"));
    assert_eq!(bot.config().book.format, BookFormat::Binary);
    assert!(matches!(bot.book_status(), BookStatus::Unavailable { .. }));

    assert!(bot.set_option("Parallel", "true"));
    assert!(bot.config().parallel);
    assert!(bot.set_option("MoveOrdering", "false"));
    assert!(!bot.config().move_ordering);

    assert!(!bot.set_option("Hash", "64"));
}

#[test]
fn test_time_limited_search_returns_legal_move() {
    let mut bot = ChessBot::new(no_book()).unwrap();
    let weights = EvaluationWeights::default();
    let start = Board::default();
    let limits = SearchLimits::depth_and_time(3, Duration::from_secs(30));
    let result = bot.choose_move_with_limits(&start, &limits, &weights, false).unwrap();
    assert!(start.legal_moves().contains(&result.best_move));
    assert!(!result.stopped);
    assert_eq!(result.depth, 3);
}

#[test]
fn test_name() {
    let bot = ChessBot::new(no_book()).unwrap();
    assert!(bot.name().starts_with("ChessBot"));
    assert_eq!(bot.author(), "ML-chess");
}
