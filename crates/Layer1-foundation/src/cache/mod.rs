//! # o11y-mcp Cache System
//!
//! Quota-protecting result cache for remote log queries.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Query Executors (list / search / preset)                     │
//! │           │ generate_key(tool, request)                       │
//! │           ▼                                                   │
//! │  ┌──────────────────┐        ┌─────────────────────────┐     │
//! │  │   ResultCache    │◀──────▶│     CacheSweeper         │     │
//! │  │ RwLock<HashMap>  │ sweep  │ (periodic, cancellable)  │     │
//! │  └──────────────────┘        └─────────────────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is persisted; the cache lives and dies with the process.

mod result;
mod sweeper;
pub mod util;

pub use result::{ResultCache, ResultCacheStats};
pub use sweeper::CacheSweeper;
