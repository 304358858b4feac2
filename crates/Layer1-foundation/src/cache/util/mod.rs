//! Cache utilities
//!
//! - `CompositeKey`: 여러 요소로 고정 길이 캐시 키 생성

mod hash;

pub use hash::{compute_hash, CompositeKey};
