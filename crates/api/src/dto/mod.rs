pub mod blocklist;
pub mod stats;

pub use blocklist::BlocklistReloadResponse;
pub use stats::StatsResponse;
