//! Preset Catalog - 이름 있는 쿼리 템플릿
//!
//! 자주 쓰는 쿼리 형태를 고정된 시간 범위 / 페이지 크기와 함께 제공합니다.
//! 템플릿의 `{start}` 는 `now - lookback` 으로, `{0}` `{1}` ... 은
//! 위치 파라미터로 치환됩니다.

use crate::filter::{escape, format_timestamp};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

/// Preset resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PresetError {
    #[error("unknown preset query: {0}")]
    UnknownPreset(String),

    #[error("preset query {preset} requires parameter '{parameter}'")]
    MissingParameter { preset: String, parameter: String },
}

/// One catalog entry. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetDefinition {
    pub name: &'static str,
    pub description: &'static str,

    #[serde(skip)]
    template: &'static str,

    /// Names of the positional parameters, in order
    pub parameters: &'static [&'static str],

    #[serde(rename = "pageSize")]
    pub page_size: usize,

    #[serde(rename = "lookbackHours")]
    pub lookback_hours: i64,
}

impl PresetDefinition {
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn lookback(&self) -> Duration {
        Duration::hours(self.lookback_hours)
    }
}

const BUILTIN_PRESETS: &[PresetDefinition] = &[
    PresetDefinition {
        name: "cloud_run_errors",
        description: "Errors from all Cloud Run services in the last hour",
        template: r#"resource.type="cloud_run_revision" AND severity>=ERROR AND timestamp>="{start}""#,
        parameters: &[],
        page_size: 10,
        lookback_hours: 1,
    },
    PresetDefinition {
        name: "cloud_run_service_errors",
        description: "Errors from one Cloud Run service in the last 2 hours",
        template: r#"resource.type="cloud_run_revision" AND resource.labels.service_name="{0}" AND severity>=ERROR AND timestamp>="{start}""#,
        parameters: &["service"],
        page_size: 15,
        lookback_hours: 2,
    },
    PresetDefinition {
        name: "recent_logs",
        description: "All logs from the last hour",
        template: r#"timestamp>="{start}""#,
        parameters: &[],
        page_size: 20,
        lookback_hours: 1,
    },
    PresetDefinition {
        name: "high_severity",
        description: "ERROR and above in the last 6 hours",
        template: r#"severity>=ERROR AND timestamp>="{start}""#,
        parameters: &[],
        page_size: 10,
        lookback_hours: 6,
    },
];

/// A preset materialized against a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPreset {
    pub name: String,
    pub filter: String,
    pub page_size: usize,
}

/// Fixed table of named query templates
#[derive(Debug, Clone)]
pub struct PresetCatalog {
    presets: Vec<PresetDefinition>,
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PresetCatalog {
    /// Catalog with the built-in presets
    pub fn builtin() -> Self {
        let mut presets = BUILTIN_PRESETS.to_vec();
        presets.sort_by_key(|p| p.name);
        Self { presets }
    }

    /// All definitions, sorted by name
    pub fn list(&self) -> &[PresetDefinition] {
        &self.presets
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.presets.iter().map(|p| p.name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&PresetDefinition> {
        self.presets.iter().find(|p| p.name == name)
    }

    pub fn resolve(&self, name: &str, params: &[String]) -> Result<ResolvedPreset, PresetError> {
        self.resolve_at(name, params, Utc::now())
    }

    /// Resolve `name` with start time `now - lookback`. Extra parameters are ignored.
    pub fn resolve_at(
        &self,
        name: &str,
        params: &[String],
        now: DateTime<Utc>,
    ) -> Result<ResolvedPreset, PresetError> {
        let preset = self
            .get(name)
            .ok_or_else(|| PresetError::UnknownPreset(name.to_string()))?;

        if params.len() < preset.arity() {
            return Err(PresetError::MissingParameter {
                preset: preset.name.to_string(),
                parameter: preset.parameters[params.len()].to_string(),
            });
        }

        let start = format_timestamp(now - preset.lookback());

        Ok(ResolvedPreset {
            name: preset.name.to_string(),
            filter: render_template(preset.template, &start, &params[..preset.arity()]),
            page_size: preset.page_size,
        })
    }
}

/// Single pass over `template`. Parameter values are escaped and never re-scanned,
/// so a value containing `"` or `{1}` stays inside its own quoted string.
fn render_template(template: &str, start: &str, params: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let Some(close) = tail.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let slot = &tail[..close];
        let value = if slot == "start" {
            Some(start.to_string())
        } else {
            slot.parse::<usize>()
                .ok()
                .and_then(|i| params.get(i))
                .map(|v| escape(v))
        };
        match value {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[open..open + close + 2]),
        }
        rest = &tail[close + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_service_errors_preset() {
        let catalog = PresetCatalog::builtin();
        let resolved = catalog
            .resolve_at("cloud_run_service_errors", &["svc-a".to_string()], now())
            .unwrap();

        assert_eq!(resolved.page_size, 15);
        assert!(resolved
            .filter
            .contains(r#"resource.labels.service_name="svc-a""#));
        assert!(resolved.filter.ends_with(r#"timestamp>="2024-05-01T10:00:00Z""#));
    }

    #[test]
    fn test_zero_arity_presets() {
        let catalog = PresetCatalog::builtin();

        let recent = catalog.resolve_at("recent_logs", &[], now()).unwrap();
        assert_eq!(recent.filter, r#"timestamp>="2024-05-01T11:00:00Z""#);
        assert_eq!(recent.page_size, 20);

        let high = catalog.resolve_at("high_severity", &[], now()).unwrap();
        assert_eq!(high.filter, r#"severity>=ERROR AND timestamp>="2024-05-01T06:00:00Z""#);
        assert_eq!(high.page_size, 10);
    }

    #[test]
    fn test_missing_parameter() {
        let err = PresetCatalog::builtin()
            .resolve_at("cloud_run_service_errors", &[], now())
            .unwrap_err();
        assert_eq!(
            err,
            PresetError::MissingParameter {
                preset: "cloud_run_service_errors".into(),
                parameter: "service".into(),
            }
        );
    }

    #[test]
    fn test_unknown_preset() {
        let err = PresetCatalog::builtin().resolve("nonexistent", &[]).unwrap_err();
        assert_eq!(err, PresetError::UnknownPreset("nonexistent".into()));
        assert_eq!(err.to_string(), "unknown preset query: nonexistent");
    }

    #[test]
    fn test_parameter_cannot_escape_its_clause() {
        let service = r#"x" OR severity>=DEBUG OR resource.type="y"#.to_string();
        let resolved = PresetCatalog::builtin()
            .resolve_at("cloud_run_service_errors", &[service], now())
            .unwrap();

        assert_eq!(
            resolved.filter,
            r#"resource.type="cloud_run_revision" AND resource.labels.service_name="x\" OR severity>=DEBUG OR resource.type=\"y" AND severity>=ERROR AND timestamp>="2024-05-01T10:00:00Z""#
        );
    }

    #[test]
    fn test_parameter_placeholders_not_expanded() {
        let resolved = PresetCatalog::builtin()
            .resolve_at("cloud_run_service_errors", &[r"{start}\{0}".to_string()], now())
            .unwrap();
        assert!(resolved
            .filter
            .contains(r#"service_name="{start}\\{0}""#));
    }

    #[test]
    fn test_extra_parameters_ignored() {
        let catalog = PresetCatalog::builtin();
        let with_extra = catalog
            .resolve_at("cloud_run_errors", &["ignored".to_string()], now())
            .unwrap();
        let without = catalog.resolve_at("cloud_run_errors", &[], now()).unwrap();
        assert_eq!(with_extra, without);
    }

    #[test]
    fn test_list_sorted_by_name() {
        let names = PresetCatalog::builtin().names();
        assert_eq!(
            names,
            vec![
                "cloud_run_errors",
                "cloud_run_service_errors",
                "high_severity",
                "recent_logs"
            ]
        );
    }
}
