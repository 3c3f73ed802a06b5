//! Daily stats projection for the operator dashboard

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::model::{DailySnapshot, LeadStatus, Outcome};
use crate::queue::{zone_breakdown, ZoneCount};
use crate::schedule::Calendar;
use crate::store::LeadStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: LeadStatus,
    pub callable: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeCount {
    pub outcome: Outcome,
    pub count: u32,
}

impl OutcomeCount {
    /// Share of `total` in percent, 0 when `total` is 0
    pub fn percent_of(&self, total: u32) -> f64 {
        if total == 0 {
            0.0
        } else {
            f64::from(self.count) * 100.0 / f64::from(total)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub date: String,
    pub total_callable: u32,
    pub by_status: Vec<StatusCount>,
    pub dialed_today: u32,
    pub callbacks_due_today: u32,
    pub by_zone: Vec<ZoneCount>,
    /// `last_outcome` of leads called today, most frequent first
    pub outcomes_today: Vec<OutcomeCount>,
    pub snapshot: DailySnapshot,
}

impl StatsReport {
    pub fn outcomes_total(&self) -> u32 {
        self.outcomes_today.iter().map(|o| o.count).sum()
    }
}

/// Read-only projection over the latest committed state, taken in one read
/// transaction
pub fn daily_stats(
    store: &LeadStore,
    calendar: &Calendar,
    now: DateTime<Utc>,
) -> Result<StatsReport> {
    let date = calendar.date_key(now);
    let (start, end) = calendar.day_bounds(now);

    store.read_consistent(|store| {
        let by_status = store
            .callable_by_status()?
            .into_iter()
            .map(|(status, callable)| StatusCount { status, callable })
            .collect::<Vec<_>>();

        let outcomes_today = store
            .outcome_histogram(start, end)?
            .into_iter()
            .map(|(outcome, count)| OutcomeCount { outcome, count })
            .collect();

        Ok(StatsReport {
            total_callable: by_status.iter().map(|s| s.callable).sum(),
            by_status,
            dialed_today: store.history_count_on(&date)?,
            callbacks_due_today: store.callbacks_due_before(end)?.len() as u32,
            by_zone: zone_breakdown(store)?,
            outcomes_today,
            snapshot: store.daily_snapshot(&date)?,
            date: date.clone(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, FixedJitter};
    use crate::disposition::{apply_disposition, DispositionRequest};
    use crate::model::{LeadFields, Zone};
    use crate::store::NewLead;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 18, 0, 0).unwrap()
    }

    fn seed(store: &LeadStore, phone: &str, zone: Zone) -> String {
        store
            .insert_lead(
                &NewLead {
                    phone_number: phone.to_string(),
                    fields: LeadFields {
                        timezone: Some(zone),
                        ..Default::default()
                    },
                    max_attempts: 5,
                    import_batch: None,
                },
                now() - Duration::days(2),
            )
            .unwrap()
            .unwrap()
            .id
    }

    fn dispose(store: &LeadStore, at: DateTime<Utc>, id: &str, outcome: Outcome) {
        apply_disposition(
            store,
            &Calendar::default(),
            &FixedClock(at),
            &FixedJitter(0.3),
            &DispositionRequest::new(id, outcome),
        )
        .unwrap();
    }

    #[test]
    fn test_empty_store() {
        let store = LeadStore::open_in_memory().unwrap();
        let report = daily_stats(&store, &Calendar::default(), now()).unwrap();
        assert_eq!(report.date, "2025-03-03");
        assert_eq!(report.total_callable, 0);
        assert!(report.outcomes_today.is_empty());
        assert_eq!(report.snapshot.total_dials, 0);
        assert_eq!(report.by_zone.len(), 4);
    }

    #[test]
    fn test_today_only_projection() {
        let store = LeadStore::open_in_memory().unwrap();
        let a = seed(&store, "1000000001", Zone::ET);
        let b = seed(&store, "1000000002", Zone::CT);
        let c = seed(&store, "1000000003", Zone::CT);
        let d = seed(&store, "1000000004", Zone::PT);

        // Yesterday's call does not count toward today
        dispose(&store, now() - Duration::days(1), &d, Outcome::Voicemail);
        dispose(&store, now(), &a, Outcome::NoAnswer);
        dispose(&store, now(), &b, Outcome::NoAnswer);
        dispose(&store, now(), &c, Outcome::NotInterested);

        let report = daily_stats(&store, &Calendar::default(), now()).unwrap();
        assert_eq!(report.dialed_today, 3);
        assert_eq!(report.total_callable, 3);
        assert_eq!(
            report.outcomes_today,
            vec![
                OutcomeCount { outcome: Outcome::NoAnswer, count: 2 },
                OutcomeCount { outcome: Outcome::NotInterested, count: 1 },
            ]
        );
        assert_eq!(report.outcomes_total(), 3);
        let pct = report.outcomes_today[0].percent_of(report.outcomes_total());
        assert!((pct - 66.666).abs() < 0.01);

        assert_eq!(report.snapshot.total_dials, 3);
        assert_eq!(report.snapshot.contacts, 1);
        let ct = report.by_zone.iter().find(|z| z.zone == Some(Zone::CT)).unwrap();
        assert_eq!(ct.callable, 1);
    }

    #[test]
    fn test_callbacks_due_today() {
        let store = LeadStore::open_in_memory().unwrap();
        let a = seed(&store, "1000000001", Zone::ET);
        apply_disposition(
            &store,
            &Calendar::default(),
            &FixedClock(now()),
            &FixedJitter(0.0),
            &DispositionRequest::new(&a, Outcome::Callback).callback_at(now() + Duration::hours(2)),
        )
        .unwrap();
        let b = seed(&store, "1000000002", Zone::ET);
        dispose(&store, now(), &b, Outcome::Callback); // tomorrow

        let report = daily_stats(&store, &Calendar::default(), now()).unwrap();
        assert_eq!(report.callbacks_due_today, 1);
        let callback = report
            .by_status
            .iter()
            .find(|s| s.status == LeadStatus::Callback)
            .unwrap();
        assert_eq!(callback.callable, 2);
    }
}
