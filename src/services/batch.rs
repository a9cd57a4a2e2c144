//! Recurring invoice batch orchestration.
//!
//! One run walks the template registry in order, classifies each template's
//! tags, computes dates for the target month, and creates invoices through
//! the platform. A failure on one template is recorded on the report and
//! never aborts the rest of the run.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{BatchOutcome, BatchReport, Invoice, InvoiceDates, TemplateEntry, TemplateResult};
use crate::services::classifier;
use crate::services::dates::compute_dates;
use crate::services::platform::InvoicingPlatform;
use crate::utils::{month_bounds, normalize_date, parse_date};

const GENERATION_MARKER_PREFIX: &str = "自動発行";

/// Synthetic tag written onto every generated invoice. Doubles as the
/// idempotency key for the (template, target month) pair: the pre-create
/// check scans the target period's invoices for it.
pub fn generation_marker(template_id: &str, target_month: &str) -> String {
    format!("{GENERATION_MARKER_PREFIX}:{template_id}:{target_month}")
}

pub async fn run_recurring_batch(
    platform: &dyn InvoicingPlatform,
    templates: &[TemplateEntry],
    target_month: &str,
    cancel: &AtomicBool,
) -> Result<BatchReport, EngineError> {
    let run_id = Uuid::new_v4();
    let (period_start, period_end) = month_bounds(target_month)?;

    info!(
        %run_id,
        target_month,
        templates = templates.len(),
        "starting recurring invoice batch"
    );

    // Fresh listing of the target period, fetched once per run; the
    // duplicate check below must not depend on a possibly stale cache.
    let period_invoices = platform.list_invoices(period_start, period_end).await?;

    let mut results: Vec<TemplateResult> = Vec::new();
    let mut cancelled = false;

    for entry in templates {
        if cancel.load(Ordering::SeqCst) {
            warn!(%run_id, processed = results.len(), "batch cancelled, returning partial report");
            cancelled = true;
            break;
        }

        match process_template(platform, entry, target_month, &period_invoices).await {
            Ok(Some(outcome)) => {
                results.push(TemplateResult {
                    template_id: entry.template_id.clone(),
                    note: entry.note.clone(),
                    outcome,
                });
            }
            Ok(None) => {
                debug!(template_id = %entry.template_id, "template not marked recurring, skipping");
            }
            Err(err) => {
                warn!(template_id = %entry.template_id, error = %err, "template processing failed");
                results.push(TemplateResult {
                    template_id: entry.template_id.clone(),
                    note: entry.note.clone(),
                    outcome: BatchOutcome::Failed {
                        reason: format!("{err:#}"),
                    },
                });
            }
        }
    }

    let created_count = results
        .iter()
        .filter(|r| matches!(r.outcome, BatchOutcome::Created { .. }))
        .count();
    let already_exists_count = results
        .iter()
        .filter(|r| matches!(r.outcome, BatchOutcome::AlreadyExists { .. }))
        .count();
    let failure_count = results
        .iter()
        .filter(|r| matches!(r.outcome, BatchOutcome::Failed { .. }))
        .count();

    info!(
        %run_id,
        created = created_count,
        already_exists = already_exists_count,
        failed = failure_count,
        cancelled,
        "recurring invoice batch finished"
    );

    Ok(BatchReport {
        run_id,
        target_month: target_month.to_string(),
        results,
        created_count,
        already_exists_count,
        failure_count,
        cancelled,
    })
}

/// Process one template. `Ok(None)` means the template is not eligible
/// this period and gets no report entry. Any error becomes a `Failed`
/// record for this template only.
async fn process_template(
    platform: &dyn InvoicingPlatform,
    entry: &TemplateEntry,
    target_month: &str,
    period_invoices: &[Invoice],
) -> Result<Option<BatchOutcome>> {
    let template = platform.get_invoice_detail(&entry.template_id).await?;
    let policy = classifier::classify(&template.tag_names);

    if !policy.is_recurring_template {
        return Ok(None);
    }

    let marker = generation_marker(&entry.template_id, target_month);
    if let Some(existing) = period_invoices
        .iter()
        .find(|inv| inv.tag_names.iter().any(|tag| tag == &marker))
    {
        return Ok(Some(BatchOutcome::AlreadyExists {
            existing_invoice_id: existing.id.clone(),
        }));
    }

    let dates = match compute_dates(policy.closing_rule, target_month)? {
        Some(dates) => dates,
        None => template_own_dates(&template)?,
    };

    let new_invoice_id = platform
        .create_from_template(&entry.template_id, dates.billing_date, dates.due_date)
        .await?;

    // The marker must land on the new invoice or the next run would
    // create a duplicate; on failure the operator reconciles by hand.
    let mut tags = template.tag_names.clone();
    tags.push(marker);
    if let Err(err) = platform.update_invoice_tags(&new_invoice_id, &tags).await {
        return Err(anyhow!(
            "created invoice {new_invoice_id} but failed to record generation marker: {err}"
        ));
    }

    Ok(Some(BatchOutcome::Created {
        new_invoice_id,
        billing_date: dates.billing_date.format("%Y-%m-%d").to_string(),
        due_date: dates.due_date.format("%Y-%m-%d").to_string(),
        total_amount: template.total_amount,
        closing_rule: policy.closing_rule,
    }))
}

/// Fallback for `ClosingRule::None`: copy the template invoice's own
/// dates verbatim.
fn template_own_dates(template: &Invoice) -> Result<InvoiceDates> {
    let billing_raw = normalize_date(template.billing_date.clone())
        .ok_or_else(|| anyhow!("template has no billing date to copy"))?;
    let due_raw = normalize_date(template.due_date.clone())
        .ok_or_else(|| anyhow!("template has no due date to copy"))?;

    let billing_date = parse_date(&billing_raw)
        .ok_or_else(|| anyhow!("template billing date {billing_raw:?} is unparseable"))?;
    let due_date = parse_date(&due_raw)
        .ok_or_else(|| anyhow!("template due date {due_raw:?} is unparseable"))?;

    Ok(InvoiceDates {
        billing_date,
        due_date,
    })
}
