//! Query execution - 도구 요청을 캐시 / 원격 호출로 연결

mod executor;

pub use executor::{
    ExecutorPolicy, QueryError, QueryExecutor, QueryOutcome, LIST_SCOPE, PRESET_SCOPE,
    SEARCH_SCOPE,
};
