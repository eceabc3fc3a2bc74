/// Trending Statuses
///
/// Time-decayed engagement ranking with a moderation gate in front of the
/// public list.
pub mod algorithm;
pub mod compute;
pub mod eligibility;
pub mod query;
pub mod review;
pub mod service;
pub mod usage;

pub use algorithm::TrendingAlgorithm;
pub use compute::{RefreshSummary, TrendingComputeService};
pub use eligibility::is_eligible;
pub use query::{LocalePreference, RankedView, TrendQuery};
pub use review::ReviewGate;
pub use service::{TrendingBackends, TrendingService};
pub use usage::{InMemoryUsageTracker, UsageTracker};
