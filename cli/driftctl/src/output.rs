//! Output formatting for CLI commands.

use colored::Colorize;
use drift_reconcile::{
    DiffResult, FieldDelta, Plan, ReconcileError, ReconcileOutcome, ReconcileReport, ResourceKey,
    Value,
};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => Self::Json,
            _ => Self::Table,
        }
    }
}

/// One row of an apply summary.
#[derive(Debug, Serialize, Tabled)]
pub struct ReportRow {
    #[tabled(rename = "KIND")]
    pub kind: String,
    #[tabled(rename = "NAME")]
    pub name: String,
    #[tabled(rename = "OUTCOME")]
    pub outcome: String,
    #[tabled(rename = "PHASE")]
    pub phase: String,
    #[tabled(rename = "ERROR")]
    pub error: String,
}

impl From<&ReconcileReport> for ReportRow {
    fn from(report: &ReconcileReport) -> Self {
        let error = match &report.outcome {
            ReconcileOutcome::Failed(e) => describe(e),
            _ => String::new(),
        };

        Self {
            kind: report.key.kind.clone(),
            name: report.key.name.clone(),
            outcome: report.outcome.label().to_string(),
            phase: report.reached.to_string(),
            error,
        }
    }
}

/// One row of a remote listing.
#[derive(Debug, Serialize, Tabled)]
pub struct ResourceRow {
    #[tabled(rename = "UID")]
    pub uid: String,
    #[tabled(rename = "NAME")]
    pub name: String,
    #[tabled(rename = "TYPE")]
    pub resource_type: String,
}

/// Print data in the specified format.
pub fn print_output<T: Serialize + Tabled>(data: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                println!("{}", "No items found.".dimmed());
            } else {
                println!("{}", Table::new(data));
            }
        }
        OutputFormat::Json => println!("{}", format_json(data, "[]")),
    }
}

/// Print a single item as JSON.
pub fn print_single<T: Serialize + ?Sized>(data: &T) {
    println!("{}", format_json(data, "{}"));
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "Success:".green().bold(), message);
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "Info:".blue().bold(), message);
}

/// Print a plan as a human-readable diff.
pub fn print_plan(plan: &Plan) {
    let header = plan.key.to_string().bold();
    match &plan.diff {
        DiffResult::Absent => println!("{} {}", header, "would be created".green()),
        DiffResult::Matching => println!("{} {}", header, "no changes".dimmed()),
        DiffResult::Drifted(deltas) => {
            println!("{} {}", header, "would be updated".yellow());
            for delta in deltas {
                print_delta(delta);
            }
        }
    }

    let remote = plan
        .remote
        .as_ref()
        .map(|f| f.short().to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  {}",
        format!("desired {}  remote {}", plan.desired.short(), remote).dimmed()
    );
}

/// Print a resource that could not be planned.
pub fn print_plan_error(key: &ResourceKey, err: &ReconcileError) {
    println!("{} {}", key.to_string().bold(), "error".red());
    println!("  {}", describe(err).red());
}

/// An error together with its handler cause.
fn describe(err: &ReconcileError) -> String {
    match err.handler_error() {
        Some(cause) => format!("{err}: {cause}"),
        None => err.to_string(),
    }
}

fn print_delta(delta: &FieldDelta) {
    if let Some(remote) = &delta.remote {
        println!("  {} {}: {}", "-".red(), delta.path, render(remote).red());
    }
    if let Some(desired) = &delta.desired {
        println!("  {} {}: {}", "+".green(), delta.path, render(desired).green());
    }
}

fn render(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

/// JSON form of a plan.
#[derive(Debug, Serialize)]
pub struct PlanJson<'a> {
    pub kind: &'a str,
    pub name: &'a str,
    pub action: &'static str,
    pub deltas: &'a [FieldDelta],
    pub desired: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<&'a str>,
}

impl<'a> From<&'a Plan> for PlanJson<'a> {
    fn from(plan: &'a Plan) -> Self {
        let action = match plan.diff {
            DiffResult::Absent => "create",
            DiffResult::Matching => "none",
            DiffResult::Drifted(_) => "update",
        };
        Self {
            kind: &plan.key.kind,
            name: &plan.key.name,
            action,
            deltas: plan.diff.deltas(),
            desired: plan.desired.as_str(),
            remote: plan.remote.as_ref().map(|f| f.as_str()),
        }
    }
}

/// JSON form of one diff entry: a plan, or the error that prevented it.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DiffEntryJson<'a> {
    Plan(PlanJson<'a>),
    Error {
        kind: &'a str,
        name: &'a str,
        action: &'static str,
        error: String,
    },
}

impl<'a> DiffEntryJson<'a> {
    pub fn new(key: &'a ResourceKey, result: &'a Result<Plan, ReconcileError>) -> Self {
        match result {
            Ok(plan) => Self::Plan(PlanJson::from(plan)),
            Err(e) => Self::Error {
                kind: &key.kind,
                name: &key.name,
                action: "error",
                error: describe(e),
            },
        }
    }
}

fn format_json<T: Serialize + ?Sized>(data: &T, fallback: &str) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_reconcile::{Fingerprint, Phase, ReconcileError, ResourceKey};
    use serde_json::json;

    #[test]
    fn test_report_row_includes_cause() {
        let report = ReconcileReport {
            key: ResourceKey::new("Check", "a"),
            outcome: ReconcileOutcome::Failed(ReconcileError::RemoteFetch {
                key: ResourceKey::new("Check", "a"),
                source: drift_reconcile::HandlerError::Api {
                    status: 502,
                    message: "bad gateway".into(),
                },
            }),
            reached: Phase::Start,
        };

        let row = ReportRow::from(&report);
        assert_eq!(row.outcome, "failed");
        assert_eq!(row.phase, "start");
        assert!(row.error.contains("bad gateway"));
    }

    #[test]
    fn test_plan_json_action() {
        let plan = Plan {
            key: ResourceKey::new("Check", "a"),
            diff: DiffResult::Drifted(vec![FieldDelta {
                path: "target".into(),
                desired: Some(json!("x")),
                remote: Some(json!("y")),
            }]),
            desired: Fingerprint::of(&Default::default()),
            remote: None,
        };

        let value = serde_json::to_value(PlanJson::from(&plan)).unwrap();
        assert_eq!(value["action"], json!("update"));
        assert_eq!(value["deltas"][0]["path"], json!("target"));
        assert!(value.get("remote").is_none());
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("table"), OutputFormat::Table);
    }
}
