//! Config - 통합 설정 관리
//!
//! - `server.rs` - ServerConfig (TOML)

mod server;

pub use server::{
    CacheSettings, ProjectSettings, QuerySettings, RetrySettings, ServerConfig, ServerSettings,
    CONFIG_DIR, CONFIG_FILE, MAX_LOOKBACK_HOURS,
};
