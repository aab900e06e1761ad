pub mod blocklist;
pub mod health;
pub mod stats;

pub use blocklist::reload_blocklist;
pub use health::health_check;
pub use stats::get_stats;
