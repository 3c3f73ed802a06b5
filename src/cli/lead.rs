use anyhow::{anyhow, Result};

use super::short_ts;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::reconcile::{reconcile, ReconcileMode, ReconcileOptions, SourceRow};
use crate::store::LeadStore;

pub fn add(store: &LeadStore, config: &Config, row: SourceRow) -> Result<()> {
    let options = ReconcileOptions {
        mode: ReconcileMode::Import,
        max_attempts: config.dialer.default_max_attempts,
        import_batch: Some("manual".to_string()),
    };
    let report = reconcile(store, vec![row.clone()], &options, SystemClock.now());

    if let Some(error) = report.errors.first() {
        return Err(anyhow!("{}", error));
    }
    if report.skipped > 0 {
        return Err(anyhow!("Lead skipped: a phone number is required"));
    }

    let phone = crate::normalize::normalize_phone(row.phone.as_deref().unwrap_or_default());
    let lead = store
        .find_by_phone(&phone)?
        .ok_or_else(|| anyhow!("Lead {} not found after insert", phone))?;

    if report.imported == 1 {
        println!("Lead '{}' added with ID: {}", lead.display_name(), lead.id);
    } else if report.updated == 1 {
        println!("Lead '{}' already queued; details refreshed", lead.display_name());
    } else {
        println!("Lead '{}' is already {}; left untouched", lead.display_name(), lead.status);
    }
    Ok(())
}

pub fn show(store: &LeadStore, query: &str, json: bool) -> Result<()> {
    let lead = store
        .find_lead(query)?
        .ok_or_else(|| anyhow!("Lead not found: {}", query))?;
    let notes = store.notes_for(&lead.id)?;
    let history = store.history_for(&lead.id)?;

    if json {
        let value = serde_json::json!({
            "lead": lead,
            "notes": notes,
            "history": history,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(80));
    println!("Lead: {} ({})", lead.display_name(), lead.id);
    println!("Phone: {}", lead.phone_number);
    if let Some(owner) = &lead.owner_name {
        println!("Owner: {}", owner);
    }
    if let Some(website) = &lead.website {
        println!("Website: {}", website);
    }
    println!(
        "Region: {} | Zone: {}",
        lead.region.as_deref().unwrap_or("-"),
        lead.timezone.map(|z| z.as_str()).unwrap_or("-")
    );
    println!(
        "Status: {} | Attempts: {}/{} | Next: {}",
        lead.status,
        lead.attempt_count,
        lead.max_attempts,
        short_ts(lead.next_call_at)
    );
    if lead.demo_booked {
        println!("Demo booked: {}", short_ts(lead.demo_date));
    }
    if let Some(batch) = &lead.import_batch {
        println!("Batch: {} | Source row: {}", batch, lead.external_ref.as_deref().unwrap_or("-"));
    }
    println!("{}", "=".repeat(80));

    if history.is_empty() {
        println!("\nNo calls recorded yet.");
    } else {
        println!("\n{:<4} {:<12} {:<16} {}", "#", "Date", "Outcome", "Notes");
        println!("{}", "-".repeat(60));
        for h in &history {
            println!(
                "{:<4} {:<12} {:<16} {}",
                h.attempt_number,
                h.call_date,
                h.outcome.as_str(),
                h.notes.as_deref().unwrap_or("")
            );
        }
    }

    if !notes.is_empty() {
        println!("\nNotes");
        println!("{}", "-".repeat(60));
        if let Some(text) = &lead.notes {
            println!("{}", text);
        }
    }

    Ok(())
}
