//! Dispose command implementation

use anyhow::{anyhow, Result};

use crate::clock::{parse_ts, SystemClock, ThreadJitter};
use crate::disposition::{apply_disposition, DispositionRequest};
use crate::model::Outcome;
use crate::schedule::Calendar;
use crate::store::LeadStore;

pub struct DisposeArgs {
    pub lead: String,
    pub outcome: String,
    pub notes: Option<String>,
    pub demo_date: Option<String>,
    pub callback_at: Option<String>,
}

pub fn run(store: &LeadStore, calendar: &Calendar, args: DisposeArgs, json: bool) -> Result<()> {
    let outcome: Outcome = args.outcome.parse()?;

    let lead = store
        .find_lead(&args.lead)?
        .ok_or_else(|| anyhow!("Lead not found: {}", args.lead))?;

    let request = DispositionRequest {
        lead_id: lead.id.clone(),
        outcome,
        notes: args.notes,
        demo_date: args.demo_date.as_deref().map(parse_ts).transpose()?,
        callback_at: args.callback_at.as_deref().map(parse_ts).transpose()?,
    };

    let result = apply_disposition(store, calendar, &SystemClock, &ThreadJitter, &request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "{} ({}) → {} after {} attempt{}",
        lead.display_name(),
        lead.phone_number,
        result.new_status,
        result.attempt_count,
        if result.attempt_count == 1 { "" } else { "s" }
    );
    if let Some(next) = result.next_call_at {
        println!("Next call: {}", next.to_rfc3339());
    }
    Ok(())
}
