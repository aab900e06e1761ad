pub mod ports;
pub mod use_cases;

pub use ports::{BlocklistControl, MetricsSink, QueryLogStorage};
pub use use_cases::{GetQueryStatsUseCase, ReloadBlocklistUseCase};
