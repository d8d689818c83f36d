//! Reconciliation commands
//!
//! - `plan` - Refresh tracked objects and preview what apply would change
//! - `apply` - Create, update and delete remote objects to match declarations
//! - `refresh` - Record what the remote currently holds
//! - `import` - Track an existing remote object
//! - `destroy` - Delete tracked remote objects

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use declarative::{
    Action, ApplyResult, AutoConfirm, Change, ExecuteOptions, ExecuteReport, NoProgress,
    PlanSummary, ReadOutcome, Task, execute, group_by_kind,
};
use devhub_client::Client;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::Context;
use crate::config::{Declarations, ProviderConfig};
use crate::paths;
use crate::progress::{BarProgress, PromptConfirm};
use crate::resource::{self, Kind};
use crate::state::StateFile;
use crate::ui;

// ============================================================================
// Loading
// ============================================================================

fn load_declarations(file: Option<&str>) -> Result<Declarations> {
    let path = paths::declarations_file(file)?;
    Declarations::load(&path)
}

fn connect(declarations: &Declarations) -> Result<Arc<Client>> {
    let provider = ProviderConfig::resolve(&declarations.provider)?;
    log::debug!("Connecting to {}", provider.host);
    Ok(Arc::new(Client::new(&provider.client_config())))
}

// ============================================================================
// Target Parsing
// ============================================================================

/// Whether `address` is selected by `target`.
///
/// A target is a kind (`database`, `devhub_querydesk_database`) or an
/// address, written with either the table or the type name
/// (`database.main`, `devhub_querydesk_database.main`).
fn matches_target(address: &str, target: Option<&str>) -> bool {
    let Some(target) = target else {
        return true;
    };
    if target == address {
        return true;
    }

    let Some((type_name, name)) = address.split_once('.') else {
        return false;
    };
    let Some(kind) = Kind::from_type_name(type_name) else {
        return false;
    };

    target == kind.type_name()
        || target == kind.table()
        || target == format!("{}.{name}", kind.table())
}

// ============================================================================
// Refresh
// ============================================================================

#[derive(Debug, Default)]
struct RefreshReport {
    drifted: Vec<String>,
    gone: Vec<String>,
    failed: Vec<(String, String)>,
    unchanged: usize,
}

/// Read every targeted tracked object back into `state`.
///
/// Gone objects are dropped. A failed read leaves the entry untouched.
fn refresh_tracked(client: &Client, state: &mut StateFile, target: Option<&str>) -> RefreshReport {
    let mut report = RefreshReport::default();
    let addresses: Vec<String> = state
        .resources
        .keys()
        .filter(|a| matches_target(a, target))
        .cloned()
        .collect();

    for address in addresses {
        let Some(entry) = state.get(&address).cloned() else {
            continue;
        };

        match resource::refresh(entry.kind, client, &entry.state) {
            Ok(ReadOutcome::Refreshed {
                state: refreshed,
                drifted,
            }) => {
                if drifted {
                    report.drifted.push(address.clone());
                } else {
                    report.unchanged += 1;
                }
                state.put(&address, entry.kind, entry.id, refreshed);
            }
            Ok(ReadOutcome::Gone) => {
                state.remove(&address);
                report.gone.push(address);
            }
            Err(err) => {
                log::debug!("{address}: refresh failed: {err:#}");
                report.failed.push((address, format!("{err:#}")));
            }
        }
    }

    report
}

fn show_refresh(report: &RefreshReport) {
    for address in &report.drifted {
        println!("  {} {address} {}", "~".yellow(), "changed outside devhub".dimmed());
    }
    for address in &report.gone {
        println!("  {} {address} {}", "-".red(), "no longer exists".dimmed());
    }
    for (address, error) in &report.failed {
        ui::error(&format!("{address}: {error}"));
    }
}

// ============================================================================
// Planning
// ============================================================================

/// A planned change with the values its task needs
#[derive(Debug)]
struct Planned {
    kind: Kind,
    change: Change,
    desired: Option<Value>,
    tracked: Option<Value>,
}

fn plan_all(
    declarations: &Declarations,
    state: &StateFile,
    target: Option<&str>,
) -> Result<Vec<Planned>> {
    let addresses: BTreeSet<&String> = declarations
        .resources
        .keys()
        .chain(state.resources.keys())
        .filter(|a| matches_target(a, target))
        .collect();

    let mut planned = Vec::with_capacity(addresses.len());
    for address in addresses {
        let declaration = declarations.resources.get(address);
        let entry = state.get(address);
        let kind = match (declaration, entry) {
            (Some(d), _) => d.kind,
            (None, Some(e)) => e.kind,
            (None, None) => continue,
        };

        let desired = declaration.map(|d| d.state.clone());
        let tracked = entry.map(|e| e.state.clone());
        let change = resource::plan(kind, address, desired.as_ref(), tracked.as_ref())
            .with_context(|| format!("Failed to plan {address}"))?;
        planned.push(Planned {
            kind,
            change,
            desired,
            tracked,
        });
    }

    Ok(planned)
}

fn show_plan(planned: &[Planned], verbose: bool) {
    let changes: Vec<Change> = planned
        .iter()
        .filter(|p| p.change.is_change())
        .map(|p| p.change.clone())
        .collect();

    if changes.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    for (kind, group) in group_by_kind(&changes) {
        ui::section(kind);
        for change in group {
            println!("  {} {}", ui::action_symbol(change.action), change.address);
            if change.action == Action::Update || verbose {
                show_change_diff(change.before.as_ref(), change.after.as_ref());
            }
        }
    }

    let summary = PlanSummary::from_changes(&changes);
    println!();
    println!(
        "  Plan: {} to create, {} to update, {} to delete",
        summary.to_create.to_string().green(),
        summary.to_update.to_string().yellow(),
        summary.to_delete.to_string().red()
    );
}

/// Unified diff of two redacted states
fn show_change_diff(before: Option<&Value>, after: Option<&Value>) {
    let render = |value: Option<&Value>| {
        value
            .map(|v| serde_json::to_string_pretty(v).unwrap_or_default() + "\n")
            .unwrap_or_default()
    };
    let before = render(before);
    let after = render(after);

    let diff = similar::TextDiff::from_lines(&before, &after);
    for change in diff.iter_all_changes() {
        match change.tag() {
            similar::ChangeTag::Delete => {
                print!("      {}", format!("- {change}").red());
            }
            similar::ChangeTag::Insert => {
                print!("      {}", format!("+ {change}").green());
            }
            similar::ChangeTag::Equal => {}
        }
    }
}

// ============================================================================
// Execution
// ============================================================================

fn run_tasks(
    ctx: &Context,
    tasks: &[Box<dyn Task>],
    opts: &ExecuteOptions,
    yes: bool,
) -> Result<ExecuteReport> {
    match (ctx.quiet, yes) {
        (true, true) => execute(tasks, opts, &mut NoProgress, &mut AutoConfirm),
        (true, false) => execute(tasks, opts, &mut NoProgress, &mut PromptConfirm),
        (false, true) => execute(tasks, opts, &mut BarProgress::new(), &mut AutoConfirm),
        (false, false) => execute(tasks, opts, &mut BarProgress::new(), &mut PromptConfirm),
    }
}

/// Fold task results into tracked state. Failed entries keep their prior state.
fn record_results(
    state: &mut StateFile,
    planned: &[Planned],
    report: &ExecuteReport,
) -> Result<()> {
    for (address, result) in &report.results {
        let Some(kind) = planned
            .iter()
            .find(|p| &p.change.address == address)
            .map(|p| p.kind)
        else {
            continue;
        };

        match result {
            ApplyResult::Created { state: tracked } | ApplyResult::Updated { state: tracked } => {
                let id = resource::state_id(kind, tracked)?;
                state.put(address, kind, id, tracked.clone());
            }
            ApplyResult::Deleted => {
                state.remove(address);
            }
            ApplyResult::Failed { error } => {
                ui::error(&format!("{address}: {error}"));
            }
            ApplyResult::NoChange | ApplyResult::Skipped { .. } => {}
        }
    }
    Ok(())
}

fn print_summary(report: &ExecuteReport) {
    let summary = &report.summary;
    println!();
    if summary.is_success() {
        println!("  {} Apply complete!", "✓".green().bold());
    } else {
        println!("  {} Apply finished with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} created", ui::count(summary.created, "resource"));
    }
    if summary.updated > 0 {
        println!("    • {} updated", ui::count(summary.updated, "resource"));
    }
    if summary.deleted > 0 {
        println!("    • {} deleted", ui::count(summary.deleted, "resource"));
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", ui::count(summary.skipped, "resource"));
    }
    if summary.failed > 0 {
        println!(
            "    • {} {}",
            ui::count(summary.failed, "resource"),
            "failed".red()
        );
    }
}

/// Execute planned changes and persist what succeeded.
fn converge(
    ctx: &Context,
    client: &Arc<Client>,
    state: &mut StateFile,
    planned: &[Planned],
    opts: &ExecuteOptions,
    yes: bool,
) -> Result<ExecuteReport> {
    let tasks: Vec<Box<dyn Task>> = planned
        .iter()
        .filter(|p| p.change.is_change())
        .map(|p| {
            resource::task(
                p.kind,
                &p.change,
                p.desired.clone(),
                p.tracked.clone(),
                Arc::clone(client),
            )
        })
        .collect();

    let report = run_tasks(ctx, &tasks, opts, yes)?;
    record_results(state, planned, &report)?;
    if !opts.dry_run {
        state.touch()?;
    }
    Ok(report)
}

fn fail_on_errors(report: &ExecuteReport) -> Result<()> {
    if report.summary.failed > 0 {
        bail!("{} failed", ui::count(report.summary.failed, "resource"));
    }
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

/// Show drift and what apply would change
pub fn plan(ctx: &Context, file: Option<&str>, target: Option<&str>) -> Result<()> {
    let declarations = load_declarations(file)?;
    let client = connect(&declarations)?;
    let mut state = StateFile::load()?;

    ui::header("devhub plan");
    let refreshed = refresh_tracked(&client, &mut state, target);
    show_refresh(&refreshed);

    let planned = plan_all(&declarations, &state, target)?;
    show_plan(&planned, ctx.verbose > 0);
    Ok(())
}

/// Make remote objects match the declarations
pub fn apply(
    ctx: &Context,
    file: Option<&str>,
    target: Option<&str>,
    dry_run: bool,
    jobs: usize,
    yes: bool,
) -> Result<()> {
    let declarations = load_declarations(file)?;
    let client = connect(&declarations)?;
    let mut state = StateFile::load()?;

    ui::header("devhub apply");
    if dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    let opts = ExecuteOptions {
        dry_run,
        jobs: jobs.max(1),
    };
    let report = reconcile(ctx, &client, &declarations, &mut state, target, &opts, yes)?;
    fail_on_errors(&report)
}

fn reconcile(
    ctx: &Context,
    client: &Arc<Client>,
    declarations: &Declarations,
    state: &mut StateFile,
    target: Option<&str>,
    opts: &ExecuteOptions,
    yes: bool,
) -> Result<ExecuteReport> {
    let refreshed = refresh_tracked(client, state, target);
    show_refresh(&refreshed);
    if !opts.dry_run && (!refreshed.drifted.is_empty() || !refreshed.gone.is_empty()) {
        state.touch()?;
    }

    let planned = plan_all(declarations, state, target)?;
    show_plan(&planned, ctx.verbose > 0);
    if !planned.iter().any(|p| p.change.is_change()) {
        return Ok(ExecuteReport::default());
    }

    let report = converge(ctx, client, state, &planned, opts, yes)?;
    if !opts.dry_run {
        print_summary(&report);
    }
    Ok(report)
}

/// Re-read tracked objects and record what the remote holds
pub fn refresh(_ctx: &Context, file: Option<&str>, target: Option<&str>) -> Result<()> {
    let declarations = Declarations::load_or_default(&paths::declarations_file(file)?)?;
    let client = connect(&declarations)?;
    let mut state = StateFile::load()?;

    ui::header("devhub refresh");
    let report = refresh_tracked(&client, &mut state, target);
    show_refresh(&report);
    state.touch()?;

    println!();
    ui::success(&format!(
        "{} unchanged, {} changed, {} gone",
        report.unchanged,
        report.drifted.len(),
        report.gone.len()
    ));
    if !report.failed.is_empty() {
        bail!("{} could not be read", ui::count(report.failed.len(), "resource"));
    }
    Ok(())
}

/// Start tracking an existing remote object
pub fn import(
    _ctx: &Context,
    file: Option<&str>,
    kind: Kind,
    name: &str,
    id: &str,
) -> Result<()> {
    let declarations = Declarations::load_or_default(&paths::declarations_file(file)?)?;
    let client = connect(&declarations)?;
    let mut state = StateFile::load()?;

    let address = import_into(&client, &mut state, kind, name, id)?;
    ui::success(&format!("Imported {address} ({})", ui::truncate_id(id, 24)));
    if !declarations.resources.contains_key(&address) {
        ui::dim(&format!(
            "No declaration for {address} yet; the next apply will delete it"
        ));
    }
    Ok(())
}

fn import_into(
    client: &Client,
    state: &mut StateFile,
    kind: Kind,
    name: &str,
    id: &str,
) -> Result<String> {
    let address = kind.address(name);
    if let Some(entry) = state.get(&address) {
        bail!("{address} is already tracked as {}", entry.id);
    }

    let imported = resource::import(kind, client, id)?;
    state.put(&address, kind, id.to_string(), imported);
    state.touch()?;
    Ok(address)
}

/// Delete tracked remote objects
pub fn destroy(ctx: &Context, file: Option<&str>, target: Option<&str>, yes: bool) -> Result<()> {
    let declarations = Declarations::load_or_default(&paths::declarations_file(file)?)?;
    let client = connect(&declarations)?;
    let mut state = StateFile::load()?;

    ui::header("devhub destroy");
    let report = destroy_tracked(ctx, &client, &mut state, target, yes)?;
    if report.summary.total() == 0 {
        ui::info("Nothing to destroy");
        return Ok(());
    }
    print_summary(&report);
    fail_on_errors(&report)
}

fn destroy_tracked(
    ctx: &Context,
    client: &Arc<Client>,
    state: &mut StateFile,
    target: Option<&str>,
    yes: bool,
) -> Result<ExecuteReport> {
    let mut planned = Vec::new();
    for (address, entry) in state.resources.iter().filter(|(a, _)| matches_target(a, target)) {
        let change = resource::plan(entry.kind, address, None, Some(&entry.state))?;
        println!("  {} {address}", ui::action_symbol(change.action));
        planned.push(Planned {
            kind: entry.kind,
            change,
            desired: None,
            tracked: Some(entry.state.clone()),
        });
    }

    if planned.is_empty() {
        return Ok(ExecuteReport::default());
    }
    converge(ctx, client, state, &planned, &ExecuteOptions::default(), yes)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use devhub_client::MockTransport;
    use devhub_client::transport::Method;
    use tempfile::TempDir;

    const QUIET: Context = Context {
        verbose: 0,
        quiet: true,
    };

    const DECLARATIONS: &str = r#"
[dashboard.ops]
name = "Ops"

[[dashboard.ops.panels]]
title = "Signups"
query_details = { query = "select count(*) from users", credential_id = "c-1" }

[workspace.infra]
name = "infra"
repository = "acme/infra"
docker_image = "hashicorp/terraform:1.9"

[[workspace.infra.secrets]]
name = "TOKEN"
value = "s3cr3t"
"#;

    fn mock_client() -> (MockTransport, Arc<Client>) {
        let mock = MockTransport::new();
        let client = Arc::new(Client::with_transport(Box::new(mock.clone())));
        (mock, client)
    }

    fn opts() -> ExecuteOptions {
        ExecuteOptions {
            dry_run: false,
            jobs: 2,
        }
    }

    #[test]
    fn test_matches_target() {
        let address = "devhub_querydesk_database.main";
        assert!(matches_target(address, None));
        assert!(matches_target(address, Some("database")));
        assert!(matches_target(address, Some("devhub_querydesk_database")));
        assert!(matches_target(address, Some("database.main")));
        assert!(matches_target(address, Some(address)));

        assert!(!matches_target(address, Some("workflow")));
        assert!(!matches_target(address, Some("database.other")));
        assert!(!matches_target(address, Some("devhub_querydesk")));
    }

    #[test]
    fn test_apply_creates_then_converges() {
        let dir = TempDir::new().unwrap();
        let (mock, client) = mock_client();
        let declarations = Declarations::parse(DECLARATIONS).unwrap();
        let mut state = StateFile::load_from(&dir.path().join("state.json")).unwrap();

        let report =
            reconcile(&QUIET, &client, &declarations, &mut state, None, &opts(), true).unwrap();
        assert_eq!(report.summary.created, 2);
        assert!(state.get("devhub_dashboard.ops").is_some());
        assert!(state.get("devhub_terradesk_workspace.infra").is_some());

        let saved = StateFile::load_from(state.path()).unwrap();
        assert_eq!(saved.resources.len(), 2);

        let report =
            reconcile(&QUIET, &client, &declarations, &mut state, None, &opts(), true).unwrap();
        assert_eq!(report.summary.total(), 0);
        assert_eq!(mock.count(Method::Post), 2);
        assert_eq!(mock.count(Method::Patch), 0);
    }

    #[test]
    fn test_explicit_empty_values_converge() {
        let content = r##"
[workflow.deploy]
name = "Deploy"
trigger_linear_label_name = ""
inputs = [{ key = "ref", description = "", type = "string" }]

[[workflow.deploy.steps]]
name = ""
slack_action = { slack_channel = "#deploys", message = "Deploying", link_text = "Run" }

[dashboard.ops]
name = "Ops"

[[dashboard.ops.panels]]
title = "Signups"
inputs = [{ key = "day", description = "" }]
query_details = { query = "select 1", credential_id = "c-1" }

[database.main]
name = "main"
adapter = "POSTGRES"
hostname = "db.internal"
database = "app"
group = ""
slack_channel = ""
agent_id = ""
cacertfile = ""

[[database.main.credentials]]
username = "reader"
password = "hunter2"
hostname = ""
reviews_required = 0

[workspace.infra]
name = "infra"
repository = "acme/infra"
docker_image = "hashicorp/terraform:1.9"
init_args = ""
path = ""
agent_id = ""

[workspace.infra.workload_identity]
enabled = false
"##;
        let dir = TempDir::new().unwrap();
        let (mock, client) = mock_client();
        let declarations = Declarations::parse(content).unwrap();
        let mut state = StateFile::load_from(&dir.path().join("state.json")).unwrap();

        let report =
            reconcile(&QUIET, &client, &declarations, &mut state, None, &opts(), true).unwrap();
        assert_eq!(report.summary.created, 4);

        for _ in 0..3 {
            let report =
                reconcile(&QUIET, &client, &declarations, &mut state, None, &opts(), true)
                    .unwrap();
            assert_eq!(report.summary.total(), 0);
        }
        assert_eq!(mock.count(Method::Patch), 0);

        let workspace = &state.get("devhub_terradesk_workspace.infra").unwrap().state;
        assert!(workspace["path"].is_null());
        assert!(workspace.get("workload_identity").is_none());
    }

    #[test]
    fn test_apply_updates_and_deletes() {
        let dir = TempDir::new().unwrap();
        let (mock, client) = mock_client();
        let mut state = StateFile::load_from(&dir.path().join("state.json")).unwrap();

        let declarations = Declarations::parse(DECLARATIONS).unwrap();
        reconcile(&QUIET, &client, &declarations, &mut state, None, &opts(), true).unwrap();
        let dashboard_id = state.get("devhub_dashboard.ops").unwrap().id.clone();

        let renamed = DECLARATIONS.replace("name = \"Ops\"", "name = \"Operations\"");
        let renamed = renamed
            .split("[workspace.infra]")
            .next()
            .unwrap_or_default()
            .to_string();
        let declarations = Declarations::parse(&renamed).unwrap();

        let report =
            reconcile(&QUIET, &client, &declarations, &mut state, None, &opts(), true).unwrap();
        assert_eq!(report.summary.updated, 1);
        assert_eq!(report.summary.deleted, 1);
        assert_eq!(state.resources.len(), 1);

        let entry = state.get("devhub_dashboard.ops").unwrap();
        assert_eq!(entry.id, dashboard_id);
        assert_eq!(entry.state["name"], "Operations");
        assert_eq!(mock.count(Method::Delete), 1);
    }

    #[test]
    fn test_failed_create_is_not_tracked() {
        let dir = TempDir::new().unwrap();
        let (mock, client) = mock_client();
        let mut state = StateFile::load_from(&dir.path().join("state.json")).unwrap();
        let declarations = Declarations::parse(DECLARATIONS).unwrap();

        mock.fail_next(devhub_client::Error::status(503, "unavailable"));
        let single = ExecuteOptions {
            dry_run: false,
            jobs: 1,
        };
        let report =
            reconcile(&QUIET, &client, &declarations, &mut state, None, &single, true).unwrap();
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.created, 1);
        assert_eq!(state.resources.len(), 1);
        assert!(fail_on_errors(&report).is_err());
    }

    #[test]
    fn test_dry_run_sends_and_saves_nothing() {
        let dir = TempDir::new().unwrap();
        let (mock, client) = mock_client();
        let mut state = StateFile::load_from(&dir.path().join("state.json")).unwrap();
        let declarations = Declarations::parse(DECLARATIONS).unwrap();

        let dry = ExecuteOptions {
            dry_run: true,
            jobs: 2,
        };
        let report =
            reconcile(&QUIET, &client, &declarations, &mut state, None, &dry, true).unwrap();
        assert_eq!(report.summary.skipped, 2);
        assert!(mock.calls().is_empty());
        assert!(!state.path().exists());
    }

    #[test]
    fn test_target_limits_apply() {
        let dir = TempDir::new().unwrap();
        let (_mock, client) = mock_client();
        let mut state = StateFile::load_from(&dir.path().join("state.json")).unwrap();
        let declarations = Declarations::parse(DECLARATIONS).unwrap();

        let report = reconcile(
            &QUIET,
            &client,
            &declarations,
            &mut state,
            Some("workspace"),
            &opts(),
            true,
        )
        .unwrap();
        assert_eq!(report.summary.created, 1);
        assert!(state.get("devhub_dashboard.ops").is_none());
    }

    #[test]
    fn test_refresh_drops_gone_objects() {
        let dir = TempDir::new().unwrap();
        let (mock, client) = mock_client();
        let mut state = StateFile::load_from(&dir.path().join("state.json")).unwrap();
        let declarations = Declarations::parse(DECLARATIONS).unwrap();
        reconcile(&QUIET, &client, &declarations, &mut state, None, &opts(), true).unwrap();

        let id = state.get("devhub_dashboard.ops").unwrap().id.clone();
        mock.remove("dashboards", &id);

        let report = refresh_tracked(&client, &mut state, None);
        assert_eq!(report.gone, vec!["devhub_dashboard.ops".to_string()]);
        assert_eq!(report.unchanged, 1);
        assert!(state.get("devhub_dashboard.ops").is_none());
    }

    #[test]
    fn test_refresh_failure_keeps_entry() {
        let dir = TempDir::new().unwrap();
        let (mock, client) = mock_client();
        let mut state = StateFile::load_from(&dir.path().join("state.json")).unwrap();
        let declarations = Declarations::parse(DECLARATIONS).unwrap();
        reconcile(&QUIET, &client, &declarations, &mut state, Some("dashboard"), &opts(), true)
            .unwrap();
        let before = state.get("devhub_dashboard.ops").cloned();

        mock.fail_next(devhub_client::Error::Network("timed out".to_string()));
        let report = refresh_tracked(&client, &mut state, None);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(state.get("devhub_dashboard.ops").cloned(), before);
    }

    #[test]
    fn test_import_then_plan_is_noop() {
        let dir = TempDir::new().unwrap();
        let (mock, client) = mock_client();
        mock.insert(
            "dashboards",
            serde_json::json!({
                "id": "dash-9",
                "name": "Ops",
                "restricted_access": false,
                "panels": [{
                    "id": "p-1",
                    "title": "Signups",
                    "details": { "type": "query", "query": "select count(*) from users", "credential_id": "c-1" }
                }]
            }),
        );
        let mut state = StateFile::load_from(&dir.path().join("state.json")).unwrap();

        let address = import_into(&client, &mut state, Kind::Dashboard, "ops", "dash-9").unwrap();
        assert_eq!(address, "devhub_dashboard.ops");
        assert!(import_into(&client, &mut state, Kind::Dashboard, "ops", "dash-9").is_err());

        let declarations = Declarations::parse(DECLARATIONS).unwrap();
        let planned = plan_all(&declarations, &state, Some("dashboard")).unwrap();
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].change.action, Action::NoOp);
    }

    #[test]
    fn test_import_unknown_id() {
        let dir = TempDir::new().unwrap();
        let (_mock, client) = mock_client();
        let mut state = StateFile::load_from(&dir.path().join("state.json")).unwrap();
        assert!(import_into(&client, &mut state, Kind::Workflow, "x", "missing").is_err());
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_destroy_counts_missing_as_deleted() {
        let dir = TempDir::new().unwrap();
        let (mock, client) = mock_client();
        let mut state = StateFile::load_from(&dir.path().join("state.json")).unwrap();
        let declarations = Declarations::parse(DECLARATIONS).unwrap();
        reconcile(&QUIET, &client, &declarations, &mut state, None, &opts(), true).unwrap();

        let id = state.get("devhub_terradesk_workspace.infra").unwrap().id.clone();
        mock.remove("terradesk/workspaces", &id);

        let report = destroy_tracked(&QUIET, &client, &mut state, None, true).unwrap();
        assert_eq!(report.summary.deleted, 2);
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_planned_secret_is_redacted() {
        let declarations = Declarations::parse(DECLARATIONS).unwrap();
        let dir = TempDir::new().unwrap();
        let state = StateFile::load_from(&dir.path().join("state.json")).unwrap();

        let planned = plan_all(&declarations, &state, Some("workspace")).unwrap();
        let after = planned[0].change.after.as_ref().unwrap();
        assert_eq!(after["secrets"][0]["value"], declarative::schema::REDACTED);
        assert_eq!(planned[0].desired.as_ref().unwrap()["secrets"][0]["value"], "s3cr3t");
    }
}
