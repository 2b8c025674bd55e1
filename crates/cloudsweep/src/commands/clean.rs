use std::collections::BTreeSet;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::ArgMatches;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use cloudsweep_config::{
    ResourceClass, RuleOverrides, RuleSet, Service, SweepConfig, resolve_config_path,
};
use cloudsweep_core::{
    CleanupRunner, DEFAULT_CASCADES, EventBus, Inventory, InventoryStore, Mode, Orchestrator,
    OrchestratorError, ResourceReport, RetryPolicy, RunMode, RunSummary, TracingObserver,
    log_app_error,
};

use super::CommandStatus;
use crate::approve::StdinApprover;
use crate::color;
use crate::live::LiveProgress;
use crate::table::Table;

/// Everything `clean` needs, pulled out of the command line.
#[derive(Debug, Clone, PartialEq)]
struct CleanRequest {
    config: Option<PathBuf>,
    inventory: PathBuf,
    classes: Vec<ResourceClass>,
    overrides: RuleOverrides,
    mode: RunMode,
    plan: bool,
    json: bool,
    live: bool,
}

impl CleanRequest {
    fn from_matches(matches: &ArgMatches) -> Result<Self, Box<dyn std::error::Error>> {
        let inventory = matches
            .get_one::<PathBuf>("inventory")
            .cloned()
            .ok_or("--inventory is required")?;

        let mut classes = BTreeSet::new();
        for name in matches.get_many::<String>("service").into_iter().flatten() {
            let service: Service = name.parse()?;
            classes.extend(service.classes());
        }

        let strings = |id: &str| -> Vec<String> {
            matches
                .get_many::<String>(id)
                .into_iter()
                .flatten()
                .cloned()
                .collect()
        };
        let overrides = RuleOverrides {
            targets: strings("target"),
            ignore: strings("exclude"),
            delete_all: matches.get_flag("delete-all"),
            batch_size: matches.get_one::<usize>("batch-size").copied(),
        };

        let mode = RunMode {
            mode: if matches.get_flag("apply") {
                Mode::Apply
            } else {
                Mode::DryRun
            },
            force_zero_retention: matches.get_flag("force-zero-retention"),
            force_delete_all: matches.get_flag("force-delete-all"),
            interactive: matches.get_flag("interactive"),
        };

        let json = matches.get_flag("json");
        let live = if matches.get_flag("live") {
            true
        } else if matches.get_flag("no-live") {
            false
        } else {
            !json && std::io::stderr().is_terminal()
        };

        Ok(Self {
            config: matches.get_one::<PathBuf>("config").cloned(),
            inventory,
            classes: classes.into_iter().collect(),
            overrides,
            mode,
            plan: matches.get_flag("plan"),
            json,
            live,
        })
    }
}

pub(crate) fn handle_clean_command(
    matches: &ArgMatches,
) -> Result<CommandStatus, Box<dyn std::error::Error>> {
    let request = CleanRequest::from_matches(matches)?;
    info!(
        event = "cli.clean_started",
        mode = %request.mode.mode,
        classes = request.classes.len(),
        inventory = %request.inventory.display(),
        plan = request.plan,
        json_output = request.json
    );

    let source = resolve_config_path(request.config.as_deref());
    let config = match SweepConfig::load(&source) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", color::error(&format!("Failed to load config: {}", e)));
            error!(event = "cli.clean_failed", stage = "config", error = %e);
            log_app_error(&e);
            return Err(e.into());
        }
    };

    let inventory = match Inventory::load(&request.inventory) {
        Ok(inventory) => inventory,
        Err(e) => {
            eprintln!("{}", color::error(&e.to_string()));
            error!(event = "cli.clean_failed", stage = "inventory", error = %e);
            log_app_error(&e);
            return Err(e.into());
        }
    };
    let store = InventoryStore::new(inventory);

    let cancel = CancellationToken::new();
    let orchestrator = build_orchestrator(&request, &config, &store, &cancel)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(async {
        let signals = tokio::spawn(wait_for_shutdown_signal(cancel.clone()));
        let result = orchestrator.run(Utc::now()).await;
        signals.abort();
        result
    });

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{}", color::error(&e.to_string()));
            if let OrchestratorError::Blocked(blocked) = &e {
                eprintln!(
                    "{}",
                    color::hint(&format!(
                        "Nothing was deleted. Re-run without --apply to preview {} resources.",
                        blocked.class
                    ))
                );
            }
            error!(event = "cli.clean_failed", stage = "run", error = %e);
            log_app_error(&e);
            return Err(e.into());
        }
    };

    if request.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, request.plan);
    }

    if !summary.dry_run && summary.totals.deleted > 0 {
        save_inventory(&store, &request.inventory)?;
    }

    info!(
        event = "cli.clean_completed",
        deleted = summary.totals.deleted,
        failed = summary.totals.failed,
        cancelled = summary.cancelled
    );

    command_status(&summary)
}

fn build_orchestrator(
    request: &CleanRequest,
    config: &SweepConfig,
    store: &Arc<InventoryStore>,
    cancel: &CancellationToken,
) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let mut events = EventBus::new().with_observer(Arc::new(TracingObserver));
    if request.live && !request.json {
        events.subscribe(Arc::new(LiveProgress::new()));
    }
    let approver = request
        .mode
        .interactive
        .then(|| Arc::new(StdinApprover::new()));

    let resolve = |class: ResourceClass| -> Result<Option<RuleSet>, Box<dyn std::error::Error>> {
        let rules = match config.rule_set(class, &request.overrides) {
            Ok(rules) => rules,
            Err(e) => {
                eprintln!("{}", color::error(&e.to_string()));
                log_app_error(&e);
                return Err(e.into());
            }
        };
        if !rules.enabled {
            info!(event = "cli.clean_class_skipped", class = %class, reason = "disabled");
            return Ok(None);
        }
        Ok(Some(rules))
    };
    let runner_for = |rules: RuleSet| {
        let provider = store.provider(rules.class);
        let mut runner = CleanupRunner::new(provider, Arc::new(rules), request.mode)
            .with_retry(RetryPolicy::from(config.retry))
            .with_events(events.clone())
            .with_cancellation(cancel.clone());
        if let Some(approver) = &approver {
            runner = runner.with_approver(approver.clone());
        }
        runner
    };

    let mut orchestrator = Orchestrator::new(request.mode);
    let mut cascading = Vec::new();
    for &class in &request.classes {
        let Some(rules) = resolve(class)? else {
            continue;
        };
        if rules.delete_dependents {
            cascading.push(class);
        }
        orchestrator.add(runner_for(rules))?;
    }

    for class in implied_dependents(&request.classes, &cascading) {
        let Some(rules) = resolve(class)? else {
            continue;
        };
        info!(event = "cli.clean_dependents_added", class = %class);
        orchestrator.add(runner_for(rules).with_dependents_only(true))?;
    }
    Ok(orchestrator)
}

/// Dependent classes to sweep for owners whose rules cascade, when the
/// operator did not select the dependent class itself. Only dependents of
/// removed owners are touched in those classes.
fn implied_dependents(selected: &[ResourceClass], cascading: &[ResourceClass]) -> Vec<ResourceClass> {
    let mut implied: Vec<ResourceClass> = DEFAULT_CASCADES
        .iter()
        .filter(|cascade| cascading.contains(&cascade.owner))
        .filter(|cascade| !selected.contains(&cascade.dependent))
        .map(|cascade| cascade.dependent)
        .collect();
    implied.sort();
    implied.dedup();
    implied
}

/// Wait for Ctrl-C or SIGTERM and cancel the run.
///
/// Batches already submitted finish; nothing new is submitted.
async fn wait_for_shutdown_signal(token: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!(event = "cli.signal_handler_failed", error = %e);
                    return;
                }
            };

        tokio::select! {
            _ = ctrl_c => {
                info!(event = "cli.signal_received", signal = "SIGINT");
            }
            _ = sigterm.recv() => {
                info!(event = "cli.signal_received", signal = "SIGTERM");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = ctrl_c.await {
            warn!(event = "cli.signal_handler_failed", error = %e);
            return;
        }
        info!(event = "cli.signal_received", signal = "SIGINT");
    }

    eprintln!(
        "{}",
        color::warning("Interrupted. Finishing in-flight batches, nothing new will be submitted.")
    );
    token.cancel();
}

fn save_inventory(store: &InventoryStore, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = store.snapshot().save(path) {
        eprintln!("{}", color::error(&e.to_string()));
        error!(event = "cli.clean_failed", stage = "save_inventory", error = %e);
        log_app_error(&e);
        return Err(e.into());
    }
    info!(event = "cli.inventory_saved", path = %path.display());
    Ok(())
}

fn command_status(summary: &RunSummary) -> Result<CommandStatus, Box<dyn std::error::Error>> {
    if summary.blocked {
        let reason = summary.blocked_reason.as_deref().unwrap_or("safety gate");
        return Err(format!("Run blocked: {}", reason).into());
    }
    if summary.has_failures() || summary.cancelled {
        return Ok(CommandStatus::PartialFailure);
    }
    Ok(CommandStatus::Success)
}

fn print_summary(summary: &RunSummary, plan: bool) {
    println!(
        "{} {}",
        color::bold("Mode:"),
        if summary.dry_run {
            color::aurora("dry run")
        } else {
            color::ember("apply")
        }
    );

    let mut classes = Table::new(&[
        "Class", "Scanned", "Eligible", "Planned", "Deleted", "Failed", "Rejected", "Batches",
        "Note",
    ])
    .style(0, color::ice)
    .max_width(8, 50);
    for class in &summary.per_class {
        classes.add_row(vec![
            class.class.to_string(),
            class.scanned.to_string(),
            class.eligible.to_string(),
            class.planned.to_string(),
            class.deleted.to_string(),
            class.failed.to_string(),
            class.rejected.to_string(),
            class.batches.to_string(),
            class_note(class),
        ]);
    }
    classes.print();

    let mut resources = Table::new(&["Resource", "Class", "Status", "Reason"])
        .max_width(0, 48)
        .max_width(3, 60)
        .style(2, color::outcome);
    for row in summary
        .per_resource
        .iter()
        .filter(|row| plan || row.included || row.status.is_some())
    {
        resources.add_row(resource_row(row));
    }
    if !resources.is_empty() {
        println!();
        resources.print();
    }

    println!();
    println!("{}", totals_line(summary));
    if summary.cancelled {
        println!(
            "{}",
            color::warning("Run was interrupted; some resources were not attempted.")
        );
    }
    if summary.dry_run && summary.totals.planned > 0 {
        println!(
            "{}",
            color::hint("Dry run: nothing was deleted. Re-run with --apply to delete.")
        );
    }
}

fn class_note(class: &cloudsweep_core::ClassSummary) -> String {
    if let Some(reason) = &class.blocked_reason {
        return format!("blocked: {}", reason);
    }
    if let Some(error) = &class.discovery_error {
        return format!("discovery failed: {}", error);
    }
    if class.cancelled {
        return "cancelled".to_string();
    }
    String::new()
}

fn resource_row(row: &ResourceReport) -> Vec<String> {
    let id = match &row.parent_id {
        Some(_) => format!("↳ {}", row.id),
        None => row.id.clone(),
    };
    let status = match row.status {
        Some(status) => status.as_str().to_string(),
        None if row.included => "pending".to_string(),
        None => "skipped".to_string(),
    };
    let reason = match &row.error {
        Some(error) => error.clone(),
        None => row.reason.clone(),
    };
    vec![id, row.class.to_string(), status, reason]
}

fn totals_line(summary: &RunSummary) -> String {
    let totals = &summary.totals;
    let verb = if summary.dry_run {
        format!("{} planned", totals.planned)
    } else {
        format!("{} deleted", totals.deleted)
    };
    format!(
        "{} scanned, {} eligible, {}, {} failed, {} rejected in {} ms",
        totals.scanned,
        totals.eligible,
        verb,
        totals.failed,
        totals.rejected,
        summary.duration_ms()
    )
}
