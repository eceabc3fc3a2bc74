pub mod trending;

pub use trending::{
    InMemoryUsageTracker, RefreshSummary, TrendQuery, TrendingBackends, TrendingService,
    UsageTracker,
};
