use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use warden_pipeline::{
    FailurePolicy, OperationOutcome, SyncEngine, SyncOptions, SyncReport, SyncStatus,
};

/// Remote object a `delete` targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Group(String),
    Package(String),
}

pub async fn cmd_sync(
    engine: &SyncEngine,
    tenant_id: &str,
    force: bool,
    continue_on_error: bool,
    cancel: &CancellationToken,
) -> Result<SyncReport> {
    println!(":: Syncing tenant {}", tenant_id);

    let options = SyncOptions {
        force,
        failure_policy: if continue_on_error {
            FailurePolicy::ContinuePass
        } else {
            FailurePolicy::AbortPass
        },
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Reconciling...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = engine.sync_all(tenant_id, &options, cancel).await;
    pb.finish_and_clear();

    match result {
        Ok(report) => {
            print_report(&report);
            println!("\n:: Sync complete ({} operations ran)", report.executed().len());
            Ok(report)
        }
        Err(e) => {
            if let Some(report) = e.report() {
                print_report(report);
            }
            Err(e).with_context(|| format!("Sync of tenant '{tenant_id}' failed"))
        }
    }
}

fn print_report(report: &SyncReport) {
    println!();
    for r in &report.operations {
        let detail = match &r.outcome {
            OperationOutcome::Synced { counts } => format!(
                "synced    {} rows ({} new, {} updated, {} unchanged, {} tombstoned, {} skipped)",
                counts.synced(),
                counts.inserted,
                counts.updated,
                counts.unchanged,
                counts.tombstoned,
                counts.skipped
            ),
            OperationOutcome::Fresh { next_due } => {
                format!("fresh     next due {}", fmt_time(Some(*next_due)))
            }
            OperationOutcome::Failed { message } => format!("FAILED    {message}"),
            OperationOutcome::NotRun => "not run".to_string(),
        };
        println!("   {:<20} {}", r.operation.name(), detail);
    }
}

pub async fn cmd_status(engine: &SyncEngine, tenant_id: &str) -> Result<SyncStatus> {
    let status = engine
        .status(tenant_id)
        .await
        .with_context(|| format!("Failed to read sync status of '{tenant_id}'"))?;

    println!(":: Sync status for {}", status.tenant_id);
    println!("   Last full sync: {}\n", fmt_time(status.last_full_sync));
    println!("   {:<20} {:<22} {:<22} {:<4}", "OPERATION", "LAST SYNC", "NEXT DUE", "DUE");
    for op in &status.operations {
        println!(
            "   {:<20} {:<22} {:<22} {:<4}",
            op.operation.name(),
            fmt_time(op.last_sync),
            fmt_time(op.next_due),
            if op.due { "yes" } else { "no" }
        );
    }

    Ok(status)
}

pub async fn cmd_clear_history(engine: &SyncEngine, tenant_id: &str) -> Result<()> {
    engine
        .clear_history(tenant_id)
        .await
        .with_context(|| format!("Failed to clear sync history of '{tenant_id}'"))?;
    println!(":: Sync history of '{}' cleared; the next pass runs everything.", tenant_id);
    Ok(())
}

pub async fn cmd_delete(
    engine: &SyncEngine,
    tenant_id: &str,
    target: DeleteTarget,
    cancel: &CancellationToken,
) -> Result<bool> {
    let (what, removed) = match &target {
        DeleteTarget::Group(id) => (
            format!("custom group {id}"),
            engine.delete_custom_group(tenant_id, id, cancel).await,
        ),
        DeleteTarget::Package(id) => (
            format!("package {id}"),
            engine.delete_package(tenant_id, id, cancel).await,
        ),
    };
    let removed = removed.with_context(|| format!("Failed to delete {what}"))?;

    if removed {
        println!(":: Deleted {} (local row removed)", what);
    } else {
        println!(":: Deleted {} (no local row was stored)", what);
    }
    Ok(removed)
}

fn fmt_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string())
}
