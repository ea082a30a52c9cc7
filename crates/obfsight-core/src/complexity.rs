//! Complexity report model and aggregation.

use serde::{Deserialize, Serialize};

/// Halstead counts for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HalsteadMetrics {
    /// Total operator occurrences.
    pub operators: u64,

    /// Total operand occurrences.
    pub operands: u64,

    pub effort: f64,
}

impl HalsteadMetrics {
    /// Program length: operators plus operands.
    pub fn length(&self) -> u64 {
        self.operators + self.operands
    }
}

/// Metrics reported by the analyzer for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetrics {
    /// Path relative to the analyzed directory.
    pub path: String,
    pub cyclomatic: u64,
    pub halstead: HalsteadMetrics,
    pub logical_lines: u64,
    pub function_count: u64,
}

/// Aggregated complexity of a stage's source tree.
///
/// Contains no timestamps, so rerunning on an unchanged tree writes the same
/// bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityReport {
    /// Per-file metrics sorted by path.
    pub reports: Vec<FileMetrics>,
    pub total_cyclomatic: u64,
    pub total_halstead_length: u64,
    pub total_halstead_effort: f64,
    pub total_logical_lines: u64,
    #[serde(rename = "totalNFunctions")]
    pub total_n_functions: u64,

    /// SHA-256 over the analyzed files' relative paths and contents.
    pub source_digest: String,
}

impl ComplexityReport {
    /// Sum per-file metrics into totals.
    pub fn aggregate(mut reports: Vec<FileMetrics>, source_digest: String) -> Self {
        reports.sort_by(|a, b| a.path.cmp(&b.path));

        let mut report = Self {
            reports: Vec::new(),
            total_cyclomatic: 0,
            total_halstead_length: 0,
            total_halstead_effort: 0.0,
            total_logical_lines: 0,
            total_n_functions: 0,
            source_digest,
        };
        for file in &reports {
            report.total_cyclomatic += file.cyclomatic;
            report.total_halstead_length += file.halstead.length();
            report.total_halstead_effort += file.halstead.effort;
            report.total_logical_lines += file.logical_lines;
            report.total_n_functions += file.function_count;
        }
        report.reports = reports;
        report
    }

    pub fn file_count(&self) -> usize {
        self.reports.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, cyclomatic: u64, functions: u64) -> FileMetrics {
        FileMetrics {
            path: path.to_string(),
            cyclomatic,
            halstead: HalsteadMetrics {
                operators: 10,
                operands: 5,
                effort: 120.5,
            },
            logical_lines: 7,
            function_count: functions,
        }
    }

    #[test]
    fn test_aggregate_sums_totals() {
        let report = ComplexityReport::aggregate(
            vec![file("b.js", 3, 2), file("a.js", 4, 1)],
            "digest".to_string(),
        );
        assert_eq!(report.total_cyclomatic, 7);
        assert_eq!(report.total_halstead_length, 30);
        assert!((report.total_halstead_effort - 241.0).abs() < f64::EPSILON);
        assert_eq!(report.total_logical_lines, 14);
        assert_eq!(report.total_n_functions, 3);
        assert_eq!(report.reports[0].path, "a.js");
    }

    #[test]
    fn test_aggregate_empty_tree() {
        let report = ComplexityReport::aggregate(vec![], String::new());
        assert_eq!(report.total_cyclomatic, 0);
        assert_eq!(report.total_n_functions, 0);
        assert_eq!(report.file_count(), 0);
    }

    #[test]
    fn test_report_json_keys() {
        let report = ComplexityReport::aggregate(vec![file("a.js", 1, 1)], "d".to_string());
        let value = serde_json::to_value(&report).unwrap();
        for key in [
            "totalCyclomatic",
            "totalHalsteadLength",
            "totalHalsteadEffort",
            "totalLogicalLines",
            "totalNFunctions",
            "sourceDigest",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value["reports"][0].get("logicalLines").is_some());
    }

    #[test]
    fn test_aggregation_is_order_independent() {
        let a = ComplexityReport::aggregate(
            vec![file("x.js", 2, 1), file("y.js", 5, 3)],
            "d".to_string(),
        );
        let b = ComplexityReport::aggregate(
            vec![file("y.js", 5, 3), file("x.js", 2, 1)],
            "d".to_string(),
        );
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
