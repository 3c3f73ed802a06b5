//! Stats command implementation

use anyhow::Result;

use crate::clock::{Clock, SystemClock};
use crate::schedule::Calendar;
use crate::stats::daily_stats;
use crate::store::LeadStore;

pub fn run(store: &LeadStore, calendar: &Calendar, json: bool) -> Result<()> {
    let report = daily_stats(store, calendar, SystemClock.now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let snap = &report.snapshot;
    println!("Stats for {}", report.date);
    println!("{}", "=".repeat(40));
    println!("Dials:          {}", snap.total_dials);
    println!("Contacts:       {}", snap.contacts);
    println!("Conversations:  {}", snap.conversations);
    println!("Demos booked:   {}", snap.demos_booked);
    println!();
    println!("Callable:       {}", report.total_callable);
    for s in &report.by_status {
        println!("  {:<12}  {}", s.status.as_str(), s.callable);
    }
    println!("Callbacks due:  {}", report.callbacks_due_today);
    for z in &report.by_zone {
        let name = z.zone.map(|z| z.as_str()).unwrap_or("unresolved");
        println!("  {:<12}  {}", name, z.callable);
    }

    let total = report.outcomes_total();
    if total > 0 {
        println!("\nOutcomes today");
        println!("{}", "-".repeat(40));
        for o in &report.outcomes_today {
            println!(
                "{:<16} {:>5} {:>6.1}%",
                o.outcome.as_str(),
                o.count,
                o.percent_of(total)
            );
        }
    }

    Ok(())
}
