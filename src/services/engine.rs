use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use tracing::info;

use crate::db::Database;
use crate::error::EngineError;
use crate::models::{
    BatchReport, CacheMeta, Invoice, InvoiceDates, ManualSaveReport, Mapping, MappingRunReport,
};
use crate::services::batch::run_recurring_batch;
use crate::services::cache::InvoiceCache;
use crate::services::classifier::{self, ClosingRule, TagClassification};
use crate::services::dates;
use crate::services::mapper::{plan_auto_mappings, plan_manual_mappings};
use crate::services::platform::InvoicingPlatform;
use crate::services::projects::ProjectStore;
use crate::services::registry::TemplateRegistry;
use crate::utils::now_rfc3339;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cache_ttl_secs: u64,
    pub registry_path: PathBuf,
}

/// Facade over the recurring invoice core. Owns the collaborators and is
/// what the console's pages call into.
pub struct Engine {
    platform: Arc<dyn InvoicingPlatform>,
    projects: Arc<dyn ProjectStore>,
    registry: TemplateRegistry,
    db: Mutex<Database>,
    cache: Mutex<InvoiceCache>,
    cancel: Arc<AtomicBool>,
}

impl Engine {
    /// Wire up the engine. The template registry must exist up front so a
    /// misconfigured deployment fails here, once, rather than mid-run.
    pub fn new(
        platform: Arc<dyn InvoicingPlatform>,
        projects: Arc<dyn ProjectStore>,
        db: Database,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        if !config.registry_path.exists() {
            return Err(EngineError::Configuration(format!(
                "template registry {} not found",
                config.registry_path.display()
            )));
        }

        Ok(Engine {
            platform,
            projects,
            registry: TemplateRegistry::new(config.registry_path),
            db: Mutex::new(db),
            cache: Mutex::new(InvoiceCache::new(Duration::from_secs(config.cache_ttl_secs))),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn classify_tags(&self, tags: &[String]) -> TagClassification {
        classifier::classify(tags)
    }

    pub fn compute_invoice_dates(
        &self,
        rule: ClosingRule,
        target_month: &str,
    ) -> Result<Option<InvoiceDates>, EngineError> {
        dates::compute_dates(rule, target_month)
    }

    /// Invoice list for a date range, through the cache. A stale entry is
    /// returned with `expired = true`; pass `force_refresh` to re-fetch.
    pub async fn get_cached_invoices(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        force_refresh: bool,
    ) -> Result<(Vec<Invoice>, CacheMeta), EngineError> {
        if !force_refresh {
            let hit = self.lock_cache()?.lookup(from, to);
            if let Some(hit) = hit {
                return Ok(hit);
            }
        }

        let invoices = self.platform.list_invoices(from, to).await?;
        let meta = self.lock_cache()?.store(from, to, invoices.clone());
        Ok((invoices, meta))
    }

    /// Map unmapped invoices in the range to projects by tag heuristics,
    /// persisting the result in one transaction.
    pub async fn run_auto_mapping(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<MappingRunReport, EngineError> {
        let (invoices, _) = self.get_cached_invoices(from, to, false).await?;
        let projects = self.projects.list_projects()?;

        let existing: HashMap<String, Mapping> = self
            .lock_db()?
            .list_mappings()?
            .into_iter()
            .map(|m| (m.invoice_id.clone(), m))
            .collect();

        let planned = plan_auto_mappings(&invoices, &projects, &existing, &now_rfc3339());
        self.lock_db()?.apply_mappings(&planned)?;

        info!(mapped = planned.len(), "auto-mapping run finished");
        Ok(MappingRunReport {
            mapped_count: planned.len(),
            mappings: planned,
        })
    }

    /// Apply a manual mapping submission. `None` clears the mapping for
    /// that invoice; unknown project ids are rejected per entry.
    pub fn save_manual_mappings(
        &self,
        entries: &[(String, Option<String>)],
        actor: &str,
    ) -> Result<ManualSaveReport, EngineError> {
        let projects = self.projects.list_projects()?;
        let (upserts, removals, rejected) =
            plan_manual_mappings(entries, &projects, actor, &now_rfc3339());

        let db = self.lock_db()?;
        for mapping in &upserts {
            db.upsert_mapping(mapping)?;
        }
        for invoice_id in &removals {
            db.remove_mapping(invoice_id)?;
        }

        Ok(ManualSaveReport {
            saved_count: upserts.len(),
            removed_count: removals.len(),
            rejected,
        })
    }

    pub fn get_mapping(&self, invoice_id: &str) -> Result<Option<Mapping>, EngineError> {
        Ok(self.lock_db()?.get_mapping(invoice_id)?)
    }

    pub fn list_mappings(&self) -> Result<Vec<Mapping>, EngineError> {
        Ok(self.lock_db()?.list_mappings()?)
    }

    /// Generate this period's recurring invoices from the template
    /// registry and return the full per-template report.
    pub async fn run_recurring_invoice_batch(
        &self,
        target_month: &str,
    ) -> Result<BatchReport, EngineError> {
        let templates = self.registry.load()?;
        run_recurring_batch(self.platform.as_ref(), &templates, target_month, &self.cancel).await
    }

    /// Shared flag checked between templates during a batch run; set it to
    /// stop after the current template and receive the partial report.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    fn lock_db(&self) -> Result<std::sync::MutexGuard<'_, Database>, EngineError> {
        self.db
            .lock()
            .map_err(|_| EngineError::Internal("mapping store lock poisoned".to_string()))
    }

    fn lock_cache(&self) -> Result<std::sync::MutexGuard<'_, InvoiceCache>, EngineError> {
        self.cache
            .lock()
            .map_err(|_| EngineError::Internal("invoice cache lock poisoned".to_string()))
    }
}
