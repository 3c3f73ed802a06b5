//! Queue command implementation

use anyhow::Result;

use super::{short_id, short_ts, truncate};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::model::Zone;
use crate::queue::build_queue;
use crate::schedule::ScheduleTable;
use crate::store::LeadStore;

pub fn run(
    store: &LeadStore,
    schedule: &ScheduleTable,
    config: &Config,
    zone: Option<String>,
    limit: Option<u32>,
    json: bool,
) -> Result<()> {
    let zone: Option<Zone> = zone.as_deref().map(str::parse::<Zone>).transpose()?;
    let limit = limit.unwrap_or(config.dialer.queue_limit);

    let snapshot = build_queue(
        store,
        schedule,
        &config.queue_policy(),
        SystemClock.now(),
        zone,
        limit,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    match (&snapshot.active_zone, &snapshot.active_label) {
        (Some(zone), Some(label)) => println!("Calling {} ({})", zone, label),
        (Some(zone), None) => println!("Calling {}", zone),
        _ => println!("No calling block active; showing all zones"),
    }
    println!(
        "{} callable | {} dialed today | {} callbacks due today",
        snapshot.total_callable,
        snapshot.dialed_today,
        snapshot.callbacks_today.len()
    );
    let zones: Vec<String> = snapshot
        .by_zone
        .iter()
        .map(|z| {
            let name = z.zone.map(|z| z.as_str()).unwrap_or("??");
            format!("{} {}", name, z.callable)
        })
        .collect();
    println!("By zone: {}\n", zones.join(" | "));

    if snapshot.leads.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }

    println!(
        "{:<4} {:<10} {:<28} {:<12} {:<4} {:<10} {:<8} {}",
        "#", "ID", "Business", "Phone", "TZ", "Status", "Tries", "Next"
    );
    println!("{}", "-".repeat(95));

    for (i, lead) in snapshot.leads.iter().enumerate() {
        let marker = if i < snapshot.callbacks_due { "*" } else { "" };
        println!(
            "{:<4} {:<10} {:<28} {:<12} {:<4} {:<10} {:<8} {}",
            format!("{}{}", i + 1, marker),
            short_id(&lead.id),
            truncate(lead.display_name(), 28),
            lead.phone_number,
            lead.timezone.map(|z| z.as_str()).unwrap_or("-"),
            lead.status.as_str(),
            format!("{}/{}", lead.attempt_count, lead.max_attempts),
            short_ts(lead.next_call_at),
        );
    }

    if snapshot.callbacks_due > 0 {
        println!("\n* callback due");
    }

    Ok(())
}
