pub mod blocklist;
pub mod stats;

pub use blocklist::ReloadBlocklistUseCase;
pub use stats::GetQueryStatsUseCase;
