//! Queue assembly: due callbacks first, then queued leads for the active zone.
//!
//! Read-only; nothing here reserves a lead, so two operators that build a
//! queue at the same moment can be handed the same lead.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::error::Result;
use crate::model::{Lead, Zone};
use crate::schedule::ScheduleTable;
use crate::store::LeadStore;

/// Queue knobs taken from config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePolicy {
    /// Upper bound on due callbacks placed ahead of the fresh queue
    pub callback_cap: u32,
    /// Hold back queued leads whose retry backoff has not elapsed
    pub honor_retry_backoff: bool,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            callback_cap: 10,
            honor_retry_backoff: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneCount {
    /// `None` for leads whose region did not resolve
    pub zone: Option<Zone>,
    pub callable: u32,
}

/// Everything an operator session needs to start dialing
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    /// Due callbacks followed by queued leads, no lead twice
    pub leads: Vec<Lead>,
    /// How many of `leads` are due callbacks
    pub callbacks_due: usize,
    pub active_zone: Option<Zone>,
    pub active_label: Option<String>,
    pub total_callable: u32,
    pub dialed_today: u32,
    /// Every callback scheduled before the end of today
    pub callbacks_today: Vec<Lead>,
    pub by_zone: Vec<ZoneCount>,
}

/// Build the ordered work list for a calling session.
///
/// All reads run in one read transaction, so counts and leads agree with each
/// other even while dispositions are being committed.
pub fn build_queue(
    store: &LeadStore,
    schedule: &ScheduleTable,
    policy: &QueuePolicy,
    now: DateTime<Utc>,
    override_zone: Option<Zone>,
    limit: u32,
) -> Result<QueueSnapshot> {
    let (active_zone, active_label) = match override_zone {
        Some(zone) => (
            Some(zone),
            Some(
                schedule
                    .label_for(zone)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{} (manual)", zone)),
            ),
        ),
        None => match schedule.current_block(now) {
            Some(block) => (Some(block.zone), Some(block.label.clone())),
            None => (None, None),
        },
    };

    let calendar = schedule.calendar();
    let (_, end_of_day) = calendar.day_bounds(now);

    let snapshot = store.read_consistent(|store| {
        let callbacks = store.due_callbacks(now, policy.callback_cap)?;
        let queued = store.queued_leads(now, active_zone, limit, policy.honor_retry_backoff)?;

        let seen: HashSet<String> = callbacks.iter().map(|l| l.id.clone()).collect();
        let callbacks_due = callbacks.len();
        let mut leads = callbacks;
        leads.extend(queued.into_iter().filter(|l| !seen.contains(&l.id)));

        Ok(QueueSnapshot {
            leads,
            callbacks_due,
            active_zone,
            active_label,
            total_callable: store.callable_count()?,
            dialed_today: store.history_count_on(&calendar.date_key(now))?,
            callbacks_today: store.callbacks_due_before(end_of_day)?,
            by_zone: zone_breakdown(store)?,
        })
    })?;

    debug!(
        zone = ?snapshot.active_zone,
        callbacks = snapshot.callbacks_due,
        total = snapshot.leads.len(),
        "queue assembled"
    );
    Ok(snapshot)
}

/// Callable counts for all four zones (zero-filled) plus the unresolved bucket if non-empty
pub fn zone_breakdown(store: &LeadStore) -> Result<Vec<ZoneCount>> {
    let counts = store.callable_by_zone()?;
    let lookup = |zone: Option<Zone>| {
        counts
            .iter()
            .find(|(z, _)| *z == zone)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    };

    let mut out: Vec<ZoneCount> = Zone::ALL
        .into_iter()
        .map(|z| ZoneCount {
            zone: Some(z),
            callable: lookup(Some(z)),
        })
        .collect();

    let unresolved = lookup(None);
    if unresolved > 0 {
        out.push(ZoneCount {
            zone: None,
            callable: unresolved,
        });
    }
    Ok(out)
}
