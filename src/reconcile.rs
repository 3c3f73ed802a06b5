//! Reconciliation of external lead rows into the store.
//!
//! Keyed on the canonical phone number, so re-running the same batch only
//! produces duplicates. Completed and archived leads are never touched;
//! active leads only get their descriptive fields refreshed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::{Lead, LeadFields};
use crate::normalize::{is_valid_phone, normalize_phone, resolve_timezone, MIN_PHONE_DIGITS};
use crate::store::{LeadStore, NewLead};

/// One row from a lead source. Column names are matched leniently.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SourceRow {
    #[serde(default, alias = "Phone", alias = "phone_number", alias = "Phone Number", deserialize_with = "loose_string")]
    pub phone: Option<String>,
    #[serde(default, alias = "Business Name", alias = "business", alias = "Business", alias = "company", deserialize_with = "loose_string")]
    pub business_name: Option<String>,
    #[serde(default, alias = "Owner Name", alias = "owner", alias = "Owner", deserialize_with = "loose_string")]
    pub owner_name: Option<String>,
    #[serde(default, alias = "First Name", alias = "first", deserialize_with = "loose_string")]
    pub first_name: Option<String>,
    #[serde(default, alias = "Website", alias = "url", deserialize_with = "loose_string")]
    pub website: Option<String>,
    #[serde(default, alias = "State", alias = "state", alias = "Region", deserialize_with = "loose_string")]
    pub region: Option<String>,
    /// Where the row came from, e.g. `leads.json:12`
    #[serde(skip)]
    pub external_ref: Option<String>,
}

/// Accept strings or numbers; blank cells become `None`.
fn loose_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    }
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty()))
}

/// Sheet syncs require a business name; ad-hoc imports do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMode {
    #[default]
    Sheet,
    Import,
}

impl std::str::FromStr for ReconcileMode {
    type Err = crate::error::DialerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sheet" => Ok(ReconcileMode::Sheet),
            "import" => Ok(ReconcileMode::Import),
            other => Err(crate::error::DialerError::invalid(format!(
                "unknown reconcile mode: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub mode: ReconcileMode,
    /// `max_attempts` for newly imported leads
    pub max_attempts: u32,
    /// Tag written to `import_batch` of new leads
    pub import_batch: Option<String>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            mode: ReconcileMode::Sheet,
            max_attempts: 5,
            import_batch: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub imported: u32,
    pub duplicates: u32,
    pub updated: u32,
    pub skipped: u32,
    pub errors: Vec<String>,
}

impl ReconcileReport {
    pub fn merge(&mut self, other: ReconcileReport) {
        self.imported += other.imported;
        self.duplicates += other.duplicates;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.errors.extend(other.errors);
    }
}

enum RowOutcome {
    Imported,
    Duplicate,
    Updated,
}

/// Merge `rows` into the store. Row-level failures are collected in
/// `errors`; the batch always runs to the end.
pub fn reconcile<I>(
    store: &LeadStore,
    rows: I,
    options: &ReconcileOptions,
    now: DateTime<Utc>,
) -> ReconcileReport
where
    I: IntoIterator<Item = SourceRow>,
{
    let mut report = ReconcileReport::default();

    for (idx, row) in rows.into_iter().enumerate() {
        let label = row
            .external_ref
            .clone()
            .unwrap_or_else(|| format!("row {}", idx + 1));

        let Some(raw_phone) = row.phone.as_deref() else {
            debug!(row = %label, "skipped: no phone");
            report.skipped += 1;
            continue;
        };

        let phone = normalize_phone(raw_phone);
        if !is_valid_phone(&phone) {
            warn!(row = %label, phone = raw_phone, "skipped: invalid phone");
            report.skipped += 1;
            report.errors.push(format!(
                "{}: phone '{}' has fewer than {} digits",
                label, raw_phone, MIN_PHONE_DIGITS
            ));
            continue;
        }

        if options.mode == ReconcileMode::Sheet && row.business_name.is_none() {
            debug!(row = %label, "skipped: no business name");
            report.skipped += 1;
            continue;
        }

        match reconcile_row(store, &phone, &row, options, now) {
            Ok(RowOutcome::Imported) => report.imported += 1,
            Ok(RowOutcome::Duplicate) => report.duplicates += 1,
            Ok(RowOutcome::Updated) => {
                report.duplicates += 1;
                report.updated += 1;
            }
            Err(e) => {
                warn!(row = %label, error = %e, "row failed");
                report.errors.push(format!("{}: {}", label, e));
            }
        }
    }

    info!(
        imported = report.imported,
        duplicates = report.duplicates,
        updated = report.updated,
        skipped = report.skipped,
        errors = report.errors.len(),
        "reconciliation finished"
    );
    report
}

fn reconcile_row(
    store: &LeadStore,
    phone: &str,
    row: &SourceRow,
    options: &ReconcileOptions,
    now: DateTime<Utc>,
) -> Result<RowOutcome> {
    let fields = fields_from_row(row);

    if let Some(existing) = store.find_by_phone(phone)? {
        return merge_existing(store, &existing, &fields, now);
    }

    let new_lead = NewLead {
        phone_number: phone.to_string(),
        fields: fields.clone(),
        max_attempts: options.max_attempts,
        import_batch: options.import_batch.clone(),
    };

    match store.insert_lead(&new_lead, now)? {
        Some(_) => Ok(RowOutcome::Imported),
        // Someone inserted the same phone between our lookup and insert
        None => match store.find_by_phone(phone)? {
            Some(existing) => merge_existing(store, &existing, &fields, now),
            None => Ok(RowOutcome::Duplicate),
        },
    }
}

fn merge_existing(
    store: &LeadStore,
    existing: &Lead,
    fields: &LeadFields,
    now: DateTime<Utc>,
) -> Result<RowOutcome> {
    if existing.status.is_terminal() {
        debug!(lead_id = %existing.id, status = %existing.status, "terminal lead left untouched");
        return Ok(RowOutcome::Duplicate);
    }

    if store.refresh_active_lead(&existing.id, fields, now)? {
        Ok(RowOutcome::Updated)
    } else {
        // Went terminal after we read it
        Ok(RowOutcome::Duplicate)
    }
}

fn fields_from_row(row: &SourceRow) -> LeadFields {
    LeadFields {
        business_name: row.business_name.clone(),
        owner_name: row.owner_name.clone(),
        first_name: row.first_name.clone(),
        website: row.website.clone(),
        region: row.region.clone(),
        timezone: row.region.as_deref().and_then(resolve_timezone),
        external_ref: row.external_ref.clone(),
    }
}
