pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{Config, TrendingOptions};
pub use error::{Result, TrendsError};
pub use models::{Account, AccountId, Post, PostId, TrendRecord, Visibility};
pub use services::{TrendQuery, TrendingBackends, TrendingService};
