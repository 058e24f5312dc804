//! Console output: the scenario matrix for `--list` and the end-of-run summary

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use dcfs_common::Scenario;

use crate::error::E2eResult;
use crate::runner::TestSuiteResult;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

fn table(headers: Vec<&'static str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);
    table
}

/// Render the expanded scenario list
pub fn render_scenarios(scenarios: &[Scenario], format: OutputFormat) -> E2eResult<String> {
    Ok(match format {
        OutputFormat::Table => {
            let mut t = table(vec!["#", "Encryption", "Backup", "Partitioner", "Disks", "Volume"]);
            for s in scenarios {
                t.add_row(vec![
                    s.index.to_string(),
                    s.encryption.to_string(),
                    s.backup.to_string(),
                    s.partitioner.to_string(),
                    s.disks.join(", "),
                    s.volume_name(),
                ]);
            }
            t.to_string()
        }
        OutputFormat::Json => serde_json::to_string_pretty(scenarios)?,
        OutputFormat::Yaml => serde_yaml::to_string(scenarios)?,
    })
}

/// One row per test of a finished run
pub fn render_summary(result: &TestSuiteResult) -> String {
    let mut t = table(vec!["Test", "Result", "Duration (ms)", "Error"]);
    for r in &result.results {
        t.add_row(vec![
            r.name.clone(),
            if r.success { "pass" } else { "FAIL" }.to_string(),
            r.duration_ms.to_string(),
            r.error.clone().unwrap_or_default(),
        ]);
    }
    format!(
        "{}\n{} passed, {} failed, {} skipped",
        t, result.passed, result.failed, result.skipped
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TestResult;
    use chrono::Utc;
    use dcfs_common::Catalog;
    use std::time::Duration;

    #[test]
    fn test_table_lists_every_scenario() {
        let scenarios = Catalog::dcfs().expand();
        let out = render_scenarios(&scenarios, OutputFormat::Table).unwrap();
        assert!(out.contains("e2e_035_off_off_throughput"));
        assert!(out.contains("SFTP drive, FTP drive, FTP drive, SFTP drive"));
    }

    #[test]
    fn test_json_and_yaml_parse_back() {
        let scenarios = Catalog::dcfs().expand();
        let json = render_scenarios(&scenarios, OutputFormat::Json).unwrap();
        let parsed: Vec<Scenario> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, scenarios);

        let yaml = render_scenarios(&scenarios[..2], OutputFormat::Yaml).unwrap();
        let parsed: Vec<Scenario> = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, scenarios[..2]);
    }

    #[test]
    fn test_summary_marks_failures() {
        let result = TestSuiteResult::from_results(
            Utc::now(),
            Duration::from_secs(1),
            vec![TestResult {
                name: "disk: SFTP disk lifecycle".to_string(),
                success: false,
                duration_ms: 12,
                steps: vec![],
                error: Some("Timeout waiting for: dashboard".to_string()),
            }],
        );
        let out = render_summary(&result);
        assert!(out.contains("FAIL"));
        assert!(out.contains("Timeout waiting for: dashboard"));
        assert!(out.ends_with("0 passed, 1 failed, 0 skipped"));
    }
}
