pub mod breaker;
pub mod config;
pub mod denylist;
pub mod gate;
pub mod http;
pub mod moderation;
pub mod search;
pub mod verdict_cache;
pub mod video_url;

mod metrics;
