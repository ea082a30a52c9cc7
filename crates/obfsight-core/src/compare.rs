//! Cross-profile comparison of recorded complexity reports.
//!
//! For each profile, a chosen report metric (e.g. `totalCyclomatic`) of the
//! obfuscated and deobfuscated stages is divided by the same metric of the
//! original stage, so the original sits at `1.0`.

use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::domain::{PipelineError, RepositoryIdentity, Result, Stage, TransformProfile};
use crate::layout::PathLayout;

/// Ratios for one profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRatios {
    pub profile: String,
    pub obfuscated: f64,
    pub deobfuscated: f64,
}

/// Ratios of every requested profile against the original baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileComparison {
    pub metric: String,

    /// Raw metric of the original stage, read from the first profile's stats.
    pub original: f64,

    pub profiles: Vec<ProfileRatios>,
}

/// Read a numeric top-level field from a complexity report document.
pub fn metric_value(report: &Value, metric: &str) -> Result<f64> {
    report
        .get(metric)
        .and_then(Value::as_f64)
        .ok_or_else(|| {
            PipelineError::Configuration(format!(
                "'{metric}' is not a numeric field of the complexity report"
            ))
        })
}

fn read_metric(layout: &PathLayout, stage: Stage, metric: &str) -> Result<f64> {
    let path = layout.complexity_report(stage)?;
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PipelineError::ReportNotFound { path })
        }
        Err(e) => return Err(e.into()),
    };
    let report: Value = serde_json::from_str(&raw)?;
    metric_value(&report, metric)
}

/// Compare `profiles` of one repository on `metric`.
pub fn compare_profiles(
    storage_root: &Path,
    identity: &RepositoryIdentity,
    profiles: &[String],
    metric: &str,
) -> Result<ProfileComparison> {
    let layouts = profiles
        .iter()
        .map(|name| {
            let profile = TransformProfile::empty(name.as_str());
            profile.validate()?;
            Ok(PathLayout::new(storage_root, identity, Some(&profile)))
        })
        .collect::<Result<Vec<_>>>()?;

    let Some(first) = layouts.first() else {
        return Err(PipelineError::Configuration(
            "no profiles to compare".to_string(),
        ));
    };
    let original = read_metric(first, Stage::Original, metric)?;
    if original == 0.0 {
        return Err(PipelineError::Configuration(format!(
            "original {metric} is zero, ratios are undefined"
        )));
    }

    let mut ratios = Vec::with_capacity(layouts.len());
    for (name, layout) in profiles.iter().zip(&layouts) {
        ratios.push(ProfileRatios {
            profile: name.clone(),
            obfuscated: read_metric(layout, Stage::Obfuscated, metric)? / original,
            deobfuscated: read_metric(layout, Stage::Deobfuscated, metric)? / original,
        });
    }

    Ok(ProfileComparison {
        metric: metric.to_string(),
        original,
        profiles: ratios,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metric_value_reads_numbers_only() {
        let report = json!({"totalCyclomatic": 12, "sourceDigest": "abc"});
        assert_eq!(metric_value(&report, "totalCyclomatic").unwrap(), 12.0);
        assert!(metric_value(&report, "sourceDigest").is_err());
        assert!(metric_value(&report, "missing").is_err());
    }

    #[test]
    fn test_missing_report_is_report_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let identity = RepositoryIdentity::new("demo", "src", "https://example/demo.git");
        let err = compare_profiles(dir.path(), &identity, &["p1".to_string()], "totalCyclomatic")
            .unwrap_err();
        match err {
            PipelineError::ReportNotFound { path } => {
                assert!(path.ends_with("p1/stats/complexities/original.json"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_profiles_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let identity = RepositoryIdentity::new("demo", "src", "https://example/demo.git");
        assert!(matches!(
            compare_profiles(dir.path(), &identity, &[], "totalCyclomatic"),
            Err(PipelineError::Configuration(_))
        ));
    }
}
