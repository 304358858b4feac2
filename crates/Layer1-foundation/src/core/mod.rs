//! Core Module - 핵심 데이터 타입
//!
//! - `types.rs`: 로그 레코드, 쿼리 요청, 페이지 크기 정책

mod types;

pub use types::{
    effective_page_size, LogPayload, LogRecord, MonitoredResource, QueryRequest,
    DEFAULT_ORDER_BY, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
