pub mod score_history;

pub use score_history::ScoreHistoryRepository;
