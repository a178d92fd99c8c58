pub mod auth;
pub mod history;
pub mod ranking;
pub mod submission;

pub use auth::{Claims, JwtService, JwtValidator};
pub use history::ScoreHistory;
pub use ranking::{InMemoryScoreStore, RankedScoreStore, RedisScoreStore};
pub use submission::{LeaderboardPublisher, SubmissionCoordinator, SubmissionOutcome};
