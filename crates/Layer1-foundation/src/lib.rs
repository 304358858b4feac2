//! # o11y-foundation
//!
//! Foundation layer for o11y-mcp:
//! - Core: 로그 레코드 / 쿼리 요청 타입, 페이지 크기 정책
//! - Cache: 쿼리 결과 캐시 (TTL + 주기적 정리)
//! - Config: 통합 설정 (ServerConfig)
//! - Error: 공용 에러 타입
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Tool Layer (list / search / preset)                    │
//! │                     │                                   │
//! │                     ▼                                   │
//! │          ResultCache ── hit ──▶ cached response         │
//! │                     │ miss                              │
//! │                     ▼                                   │
//! │   Filter / Preset ──▶ RetryCoordinator ──▶ LogStore     │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod core;
pub mod error;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Core (로그/쿼리 타입)
// ============================================================================
pub use self::core::{
    effective_page_size, LogPayload, LogRecord, MonitoredResource, QueryRequest,
    DEFAULT_ORDER_BY, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};

// ============================================================================
// Cache
// ============================================================================
pub use cache::{CacheSweeper, ResultCache, ResultCacheStats};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    CacheSettings, ProjectSettings, QuerySettings, RetrySettings, ServerConfig, ServerSettings,
    CONFIG_DIR, CONFIG_FILE, MAX_LOOKBACK_HOURS,
};
