pub mod id;
pub mod leaderboard;

pub use id::{ChannelId, MemberId, DEFAULT_CHANNEL};
pub use leaderboard::{
    MemberRank, MemberStanding, RankSnapshot, RankedEntry, ScoreRecord, MAX_SCORE,
};
