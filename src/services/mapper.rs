use std::collections::HashMap;

use tracing::debug;

use crate::models::{Invoice, Mapping, MappingMethod, Project, RejectedMapping};

/// Plan automatic invoice-to-project mappings.
///
/// For every invoice with no existing mapping, a project is a candidate
/// when its id appears as a case-sensitive substring of one of the
/// invoice's tags. Exactly one candidate produces a mapping; zero or
/// several candidates leave the invoice unmapped (ambiguity is a no-op,
/// never a guess). Existing mappings — manual or automatic — are never
/// touched.
pub fn plan_auto_mappings(
    invoices: &[Invoice],
    projects: &[Project],
    existing: &HashMap<String, Mapping>,
    mapped_at: &str,
) -> Vec<Mapping> {
    let mut planned = Vec::new();

    for invoice in invoices {
        if existing.contains_key(&invoice.id) {
            continue;
        }

        let mut candidates: Vec<&Project> = Vec::new();
        for project in projects {
            let hit = invoice
                .tag_names
                .iter()
                .any(|tag| tag.contains(&project.id));
            if hit && !candidates.iter().any(|c| c.id == project.id) {
                candidates.push(project);
            }
        }

        match candidates.as_slice() {
            [] => {}
            [project] => planned.push(Mapping {
                invoice_id: invoice.id.clone(),
                project_id: project.id.clone(),
                project_name: project.name.clone(),
                method: MappingMethod::Automatic,
                mapped_at: mapped_at.to_string(),
                mapped_by: None,
            }),
            _ => {
                debug!(
                    invoice_id = %invoice.id,
                    candidates = candidates.len(),
                    "ambiguous project match, leaving unmapped"
                );
            }
        }
    }

    planned
}

/// Plan a manual mapping submission: `Some(project_id)` maps, `None`
/// clears. Unknown project ids are rejected per entry; the rest of the
/// submission still goes through.
pub fn plan_manual_mappings(
    entries: &[(String, Option<String>)],
    projects: &[Project],
    actor: &str,
    mapped_at: &str,
) -> (Vec<Mapping>, Vec<String>, Vec<RejectedMapping>) {
    let by_id: HashMap<&str, &Project> =
        projects.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut upserts = Vec::new();
    let mut removals = Vec::new();
    let mut rejected = Vec::new();

    for (invoice_id, selection) in entries {
        match selection {
            None => removals.push(invoice_id.clone()),
            Some(project_id) => match by_id.get(project_id.as_str()) {
                Some(project) => upserts.push(Mapping {
                    invoice_id: invoice_id.clone(),
                    project_id: project.id.clone(),
                    project_name: project.name.clone(),
                    method: MappingMethod::Manual,
                    mapped_at: mapped_at.to_string(),
                    mapped_by: Some(actor.to_string()),
                }),
                None => rejected.push(RejectedMapping {
                    invoice_id: invoice_id.clone(),
                    reason: format!("unknown project id: {project_id}"),
                }),
            },
        }
    }

    (upserts, removals, rejected)
}
