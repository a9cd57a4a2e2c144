use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Invoice as the external platform returns it. Owned by the platform;
/// read-only here apart from the create / update-tags operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    #[serde(default)]
    pub billing_number: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub partner_id: Option<String>,
    #[serde(default)]
    pub partner_name: Option<String>,
    #[serde(default)]
    pub billing_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub sales_date: Option<String>,
    #[serde(default)]
    pub total_amount: i64,
    #[serde(default)]
    pub subtotal: i64,
    #[serde(default)]
    pub tax: i64,
    #[serde(default)]
    pub tag_names: Vec<String>,
    #[serde(default)]
    pub payment_status: String,
    #[serde(default)]
    pub posting_status: String,
}

/// Internal project record, as listed by the console's record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

/// One row of the recurring invoice template registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub template_id: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingMethod {
    Manual,
    Automatic,
}

impl MappingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingMethod::Manual => "manual",
            MappingMethod::Automatic => "automatic",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "manual" => Some(MappingMethod::Manual),
            "automatic" => Some(MappingMethod::Automatic),
            _ => None,
        }
    }
}

/// Persisted association between a platform invoice and a project record.
/// `project_name` is a snapshot taken at mapping time and may drift from
/// the live project record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub invoice_id: String,
    pub project_id: String,
    pub project_name: String,
    pub method: MappingMethod,
    pub mapped_at: String,
    pub mapped_by: Option<String>,
}

/// Billing/due date pair computed from a closing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDates {
    pub billing_date: NaiveDate,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Created {
        new_invoice_id: String,
        billing_date: String,
        due_date: String,
        total_amount: i64,
        closing_rule: crate::services::classifier::ClosingRule,
    },
    AlreadyExists {
        existing_invoice_id: String,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateResult {
    pub template_id: String,
    pub note: String,
    pub outcome: BatchOutcome,
}

/// Full report of one recurring invoice batch run. Never persisted here;
/// the caller renders or logs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub target_month: String,
    pub results: Vec<TemplateResult>,
    pub created_count: usize,
    pub already_exists_count: usize,
    pub failure_count: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub cached_at: String,
    pub expired: bool,
    pub remaining_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRunReport {
    pub mapped_count: usize,
    pub mappings: Vec<Mapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedMapping {
    pub invoice_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualSaveReport {
    pub saved_count: usize,
    pub removed_count: usize,
    pub rejected: Vec<RejectedMapping>,
}
