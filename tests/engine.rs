//! End-to-end flows against an on-disk database

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::path::Path;
use std::thread;

use dialer::clock::{FixedClock, FixedJitter};
use dialer::disposition::{apply_disposition, DispositionRequest};
use dialer::model::{LeadStatus, Outcome, Zone};
use dialer::queue::{build_queue, QueuePolicy};
use dialer::reconcile::{reconcile, ReconcileMode, ReconcileOptions, SourceRow};
use dialer::schedule::ScheduleTable;
use dialer::source::{JsonSource, LeadSource};
use dialer::stats::daily_stats;
use dialer::LeadStore;

// 11:30 in New York: the Central block
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 16, 30, 0).unwrap()
}

fn open(path: &Path) -> LeadStore {
    LeadStore::open(path, std::time::Duration::from_secs(10)).unwrap()
}

fn row(phone: &str, business: &str, region: &str) -> SourceRow {
    SourceRow {
        phone: Some(phone.to_string()),
        business_name: Some(business.to_string()),
        region: Some(region.to_string()),
        ..Default::default()
    }
}

#[test]
fn source_to_queue_to_stats() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("sheet.json"),
        r#"[
            {"Phone": "(312) 555-0101", "Business Name": "Windy Plumbing", "State": "IL"},
            {"Phone": "+1 512 555 0102", "Business Name": "Lone Star HVAC", "State": "Texas"},
            {"Phone": "415-555-0103", "Business Name": "Bay Roofing", "State": "CA"},
            {"Phone": "312.555.0101", "Business Name": "Windy Plumbing Co", "State": "IL"},
            {"Phone": "555", "Business Name": "Broken Row"}
        ]"#,
    )
    .unwrap();

    let store = open(&dir.path().join("dialer.db"));
    let source = JsonSource::new(
        "sheet",
        dir.path().join("*.json").display().to_string(),
        ReconcileMode::Sheet,
    );
    let batch = source.load().unwrap();
    let options = ReconcileOptions {
        mode: source.mode(),
        max_attempts: 5,
        import_batch: Some(batch.tag.clone()),
    };

    let report = reconcile(&store, batch.rows.clone(), &options, now() - Duration::days(1));
    assert_eq!(report.imported, 3);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.updated, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.errors.len(), 1);

    let windy = store.find_by_phone("3125550101").unwrap().unwrap();
    assert_eq!(windy.business_name.as_deref(), Some("Windy Plumbing Co"));
    assert_eq!(windy.external_ref.as_deref(), Some("sheet.json:4"));
    assert_eq!(windy.import_batch.as_deref(), Some(batch.tag.as_str()));

    // Central block: only the two CT leads
    let schedule = ScheduleTable::default();
    let policy = QueuePolicy::default();
    let snap = build_queue(&store, &schedule, &policy, now(), None, 50).unwrap();
    assert_eq!(snap.active_zone, Some(Zone::CT));
    assert_eq!(snap.leads.len(), 2);
    assert!(snap.leads.iter().all(|l| l.timezone == Some(Zone::CT)));
    assert_eq!(snap.total_callable, 3);

    let clock = FixedClock(now());
    let first = &snap.leads[0];
    apply_disposition(
        &store,
        schedule.calendar(),
        &clock,
        &FixedJitter(0.1),
        &DispositionRequest::new(&first.id, Outcome::NotInterested).notes("has a vendor"),
    )
    .unwrap();

    let snap = build_queue(&store, &schedule, &policy, now(), None, 50).unwrap();
    assert_eq!(snap.leads.len(), 1);
    assert_ne!(snap.leads[0].id, first.id);
    assert_eq!(snap.dialed_today, 1);

    let stats = daily_stats(&store, schedule.calendar(), now()).unwrap();
    assert_eq!(stats.total_callable, 2);
    assert_eq!(stats.snapshot.total_dials, 1);
    assert_eq!(stats.snapshot.contacts, 1);
    assert_eq!(stats.outcomes_today.len(), 1);

    // A stale re-sync must not reopen the finished lead
    let again = reconcile(&store, batch.rows, &options, now());
    assert_eq!(again.imported, 0);
    assert_eq!(again.duplicates, 4);
    let finished = store.get_lead(&first.id).unwrap().unwrap();
    assert_eq!(finished.status, LeadStatus::Completed);
    assert!(finished.not_interested);
}

#[test]
fn concurrent_dispositions_keep_every_increment() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("dialer.db");

    let id = {
        let store = open(&db);
        let options = ReconcileOptions {
            mode: ReconcileMode::Sheet,
            max_attempts: 50,
            import_batch: None,
        };
        reconcile(&store, vec![row("9195550100", "Acme Roofing", "NC")], &options, now());
        store.find_by_phone("9195550100").unwrap().unwrap().id
    };

    let per_thread = 5;
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let db = db.clone();
            let id = id.clone();
            thread::spawn(move || {
                let store = open(&db);
                let schedule = ScheduleTable::default();
                for _ in 0..per_thread {
                    apply_disposition(
                        &store,
                        schedule.calendar(),
                        &FixedClock(now()),
                        &FixedJitter(0.5),
                        &DispositionRequest::new(&id, Outcome::NoAnswer),
                    )
                    .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let store = open(&db);
    let lead = store.get_lead(&id).unwrap().unwrap();
    assert_eq!(lead.attempt_count, 2 * per_thread);

    let history = store.history_for(&id).unwrap();
    let mut numbers: Vec<u32> = history.iter().map(|h| h.attempt_number).collect();
    numbers.sort();
    assert_eq!(numbers, (1..=2 * per_thread).collect::<Vec<_>>());
    assert_eq!(store.daily_snapshot("2025-03-03").unwrap().total_dials, 2 * per_thread);
}

#[test]
fn archived_lead_never_returns() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("dialer.db"));
    let options = ReconcileOptions {
        mode: ReconcileMode::Sheet,
        max_attempts: 3,
        import_batch: None,
    };
    reconcile(&store, vec![row("9195550100", "Acme", "NC")], &options, now() - Duration::days(20));
    let id = store.find_by_phone("9195550100").unwrap().unwrap().id;

    let schedule = ScheduleTable::default();
    for days_ago in [12, 8, 4] {
        let at = now() - Duration::days(days_ago);
        apply_disposition(
            &store,
            schedule.calendar(),
            &FixedClock(at),
            &FixedJitter(0.9),
            &DispositionRequest::new(&id, Outcome::NoAnswer),
        )
        .unwrap();
    }

    let lead = store.get_lead(&id).unwrap().unwrap();
    assert_eq!(lead.status, LeadStatus::Archived);
    assert_eq!(lead.attempt_count, 3);

    for zone in [None, Some(Zone::ET)] {
        let snap = build_queue(&store, &schedule, &QueuePolicy::default(), now(), zone, 50).unwrap();
        assert!(snap.leads.iter().all(|l| l.id != id));
    }

    // Re-importing the same phone leaves it archived
    let report = reconcile(&store, vec![row("919 555 0100", "Acme", "NC")], &options, now());
    assert_eq!((report.imported, report.duplicates, report.updated), (0, 1, 0));
    assert_eq!(store.get_lead(&id).unwrap().unwrap(), lead);
}
