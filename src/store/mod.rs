//! Lead store backed by SQLite
//!
//! The only component that writes leads, call history, notes and daily stats.
//! Several operators may hold their own `LeadStore` on the same database file;
//! WAL mode keeps readers unblocked and dispositions serialize on
//! `BEGIN IMMEDIATE` plus a compare-and-swap on `attempt_count`.

mod schema;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clock::{format_ts, parse_ts};
use crate::error::{DialerError, Result};
use crate::model::{
    CallHistoryEntry, DailySnapshot, Lead, LeadFields, LeadStatus, NoteEntry, Outcome, Zone,
};

pub use schema::SCHEMA;

const LEAD_COLUMNS: &str = "id, phone_number, business_name, owner_name, first_name, website,
     region, timezone, status, attempt_count, max_attempts, last_called_at, next_call_at,
     last_outcome, demo_booked, not_interested, wrong_number, demo_date, notes,
     import_batch, external_ref, created_at, updated_at";

/// `status IN ('queued', ...)` over the statuses a caller can still be handed
fn callable_statuses() -> String {
    let list = LeadStatus::CALLABLE
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("status IN ({})", list)
}

fn callable_filter() -> String {
    format!("{} AND attempt_count < max_attempts", callable_statuses())
}

pub struct LeadStore {
    conn: Connection,
}

/// A lead to insert (phone already normalized)
#[derive(Debug, Clone)]
pub struct NewLead {
    pub phone_number: String,
    pub fields: LeadFields,
    pub max_attempts: u32,
    pub import_batch: Option<String>,
}

/// Full post-disposition state computed by the disposition engine
#[derive(Debug, Clone)]
pub struct DispositionWrite {
    /// `attempt_count` as read; the update only lands if it is unchanged
    pub expected_attempt_count: u32,
    pub status: LeadStatus,
    pub attempt_count: u32,
    pub last_called_at: DateTime<Utc>,
    pub next_call_at: Option<DateTime<Utc>>,
    pub last_outcome: Outcome,
    pub demo_booked: bool,
    pub not_interested: bool,
    pub wrong_number: bool,
    pub demo_date: Option<DateTime<Utc>>,
    pub note: NoteEntry,
    /// `note` rendered for the text log
    pub note_line: String,
    pub history: NewHistoryEntry,
    pub stats: StatsIncrement,
}

#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub attempt_number: u32,
    pub outcome: Outcome,
    pub notes: Option<String>,
    pub demo_date: Option<DateTime<Utc>>,
    pub callback_at: Option<DateTime<Utc>>,
    pub call_date: String,
    pub called_at: DateTime<Utc>,
}

/// Counters to add to one day's snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsIncrement {
    pub stat_date: String,
    pub total_dials: u32,
    pub contacts: u32,
    pub conversations: u32,
    pub demos_booked: u32,
}

impl LeadStore {
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "opened lead store");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // ============================================
    // LOOKUPS
    // ============================================

    pub fn get_lead(&self, id: &str) -> Result<Option<Lead>> {
        select_lead(&self.conn, "id = ?1", id)
    }

    /// Exact match on the canonical phone number
    pub fn find_by_phone(&self, phone: &str) -> Result<Option<Lead>> {
        select_lead(&self.conn, "phone_number = ?1", phone)
    }

    /// Lead by id, falling back to a phone number in any format
    pub fn find_lead(&self, query: &str) -> Result<Option<Lead>> {
        if let Some(lead) = self.get_lead(query)? {
            return Ok(Some(lead));
        }
        let phone = crate::normalize::normalize_phone(query);
        if phone.is_empty() {
            return Ok(None);
        }
        self.find_by_phone(&phone)
    }

    // ============================================
    // RECONCILIATION WRITES
    // ============================================

    /// Insert a queued lead. Returns `None` when the phone number already exists.
    pub fn insert_lead(&self, lead: &NewLead, now: DateTime<Utc>) -> Result<Option<Lead>> {
        let id = uuid::Uuid::new_v4().to_string();
        let ts = format_ts(now);
        let f = &lead.fields;
        let inserted = self.conn.execute(
            r#"INSERT INTO leads
               (id, phone_number, business_name, owner_name, first_name, website, region,
                timezone, status, attempt_count, max_attempts, import_batch, external_ref,
                created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'queued', 0, ?9, ?10, ?11, ?12, ?12)
               ON CONFLICT(phone_number) DO NOTHING"#,
            params![
                id,
                lead.phone_number,
                f.business_name,
                f.owner_name,
                f.first_name,
                f.website,
                f.region,
                f.timezone,
                lead.max_attempts,
                lead.import_batch,
                f.external_ref,
                ts,
            ],
        )?;

        if inserted == 0 {
            return Ok(None);
        }
        self.get_lead(&id)
    }

    /// Overwrite descriptive fields of a still-active lead.
    ///
    /// Fields absent from `fields` keep their stored value. Status, attempts and
    /// scheduling timestamps are never touched. Returns false if the lead is
    /// terminal (or gone) by the time the update runs.
    pub fn refresh_active_lead(
        &self,
        id: &str,
        fields: &LeadFields,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let sql = format!(
            r#"UPDATE leads SET
                   business_name = COALESCE(?2, business_name),
                   owner_name = COALESCE(?3, owner_name),
                   first_name = COALESCE(?4, first_name),
                   website = COALESCE(?5, website),
                   region = COALESCE(?6, region),
                   timezone = CASE WHEN ?6 IS NOT NULL THEN ?7 ELSE timezone END,
                   external_ref = COALESCE(?8, external_ref),
                   updated_at = ?9
               WHERE id = ?1 AND {}"#,
            callable_statuses()
        );
        let changed = self.conn.execute(
            &sql,
            params![
                id,
                fields.business_name,
                fields.owner_name,
                fields.first_name,
                fields.website,
                fields.region,
                fields.timezone,
                fields.external_ref,
                format_ts(now),
            ],
        )?;
        Ok(changed > 0)
    }

    // ============================================
    // DISPOSITIONS
    // ============================================

    /// Read the lead, let `plan` compute its new state, and write everything in
    /// one immediate transaction: lead row, note, call history row and the
    /// daily stats upsert. Nothing is written if `plan` fails.
    pub fn apply_disposition<F>(&self, lead_id: &str, plan: F) -> Result<Lead>
    where
        F: FnOnce(&Lead) -> Result<DispositionWrite>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        let lead = select_lead(&tx, "id = ?1", lead_id)?
            .ok_or_else(|| DialerError::NotFound(lead_id.to_string()))?;
        let write = plan(&lead)?;

        let changed = tx.execute(
            r#"UPDATE leads SET
                   status = ?3,
                   attempt_count = ?4,
                   last_called_at = ?5,
                   next_call_at = ?6,
                   last_outcome = ?7,
                   demo_booked = ?8,
                   not_interested = ?9,
                   wrong_number = ?10,
                   demo_date = ?11,
                   notes = CASE WHEN notes IS NULL OR notes = '' THEN ?12
                                ELSE notes || char(10) || ?12 END,
                   updated_at = ?5
               WHERE id = ?1 AND attempt_count = ?2"#,
            params![
                lead_id,
                write.expected_attempt_count,
                write.status,
                write.attempt_count,
                format_ts(write.last_called_at),
                write.next_call_at.map(format_ts),
                write.last_outcome,
                write.demo_booked,
                write.not_interested,
                write.wrong_number,
                write.demo_date.map(format_ts),
                write.note_line,
            ],
        )?;

        if changed == 0 {
            warn!(lead_id, "attempt_count changed underneath disposition");
            return Err(DialerError::Conflict(format!(
                "lead {} was modified concurrently",
                lead_id
            )));
        }

        tx.execute(
            "INSERT INTO lead_notes (lead_id, recorded_at, outcome, body) VALUES (?1, ?2, ?3, ?4)",
            params![
                lead_id,
                format_ts(write.note.recorded_at),
                write.note.outcome,
                write.note.body,
            ],
        )?;

        let h = &write.history;
        tx.execute(
            r#"INSERT INTO call_history
               (lead_id, attempt_number, outcome, notes, demo_date, callback_at, call_date, called_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                lead_id,
                h.attempt_number,
                h.outcome,
                h.notes,
                h.demo_date.map(format_ts),
                h.callback_at.map(format_ts),
                h.call_date,
                format_ts(h.called_at),
            ],
        )?;

        upsert_daily_stats(&tx, &write.stats, write.last_called_at)?;

        let updated = select_lead(&tx, "id = ?1", lead_id)?
            .ok_or_else(|| DialerError::NotFound(lead_id.to_string()))?;
        tx.commit()?;
        Ok(updated)
    }

    /// Run several reads inside one deferred transaction, so under WAL they
    /// all see the same committed state.
    pub fn read_consistent<T, F>(&self, read: F) -> Result<T>
    where
        F: FnOnce(&LeadStore) -> Result<T>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Deferred)?;
        let out = read(self)?;
        tx.commit()?;
        Ok(out)
    }

    // ============================================
    // QUEUE QUERIES
    // ============================================

    /// Callbacks whose time has come, soonest first
    pub fn due_callbacks(&self, now: DateTime<Utc>, cap: u32) -> Result<Vec<Lead>> {
        let sql = format!(
            "SELECT {} FROM leads
             WHERE status = 'callback' AND attempt_count < max_attempts
               AND next_call_at IS NOT NULL AND next_call_at <= ?1
             ORDER BY next_call_at ASC, rowid ASC
             LIMIT ?2",
            LEAD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![format_ts(now), cap], lead_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Every callback scheduled before `before` (overdue ones included)
    pub fn callbacks_due_before(&self, before: DateTime<Utc>) -> Result<Vec<Lead>> {
        let sql = format!(
            "SELECT {} FROM leads
             WHERE status = 'callback' AND attempt_count < max_attempts
               AND next_call_at IS NOT NULL AND next_call_at < ?1
             ORDER BY next_call_at ASC, rowid ASC",
            LEAD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![format_ts(before)], lead_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Queued leads under the attempt cap: fewest attempts first, then oldest.
    ///
    /// `zone = None` means every zone. With `honor_backoff`, leads whose
    /// `next_call_at` is still in the future are held back.
    pub fn queued_leads(
        &self,
        now: DateTime<Utc>,
        zone: Option<Zone>,
        limit: u32,
        honor_backoff: bool,
    ) -> Result<Vec<Lead>> {
        let sql = format!(
            "SELECT {} FROM leads
             WHERE status = 'queued' AND attempt_count < max_attempts
               AND (?2 = 0 OR next_call_at IS NULL OR next_call_at <= ?1)
               AND (?3 IS NULL OR timezone = ?3)
             ORDER BY attempt_count ASC, created_at ASC, rowid ASC
             LIMIT ?4",
            LEAD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![format_ts(now), honor_backoff, zone, limit],
            lead_from_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ============================================
    // AGGREGATES
    // ============================================

    pub fn callable_count(&self) -> Result<u32> {
        let sql = format!("SELECT COUNT(*) FROM leads WHERE {}", callable_filter());
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// Callable leads per status
    pub fn callable_by_status(&self) -> Result<Vec<(LeadStatus, u32)>> {
        let sql = format!(
            "SELECT status, COUNT(*) FROM leads WHERE {} GROUP BY status ORDER BY status",
            callable_filter()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Callable leads per zone; `None` is the unresolved bucket
    pub fn callable_by_zone(&self) -> Result<Vec<(Option<Zone>, u32)>> {
        let sql = format!(
            "SELECT timezone, COUNT(*) FROM leads WHERE {} GROUP BY timezone ORDER BY timezone",
            callable_filter()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Call history rows recorded on a reference-zone date
    pub fn history_count_on(&self, call_date: &str) -> Result<u32> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM call_history WHERE call_date = ?1",
            params![call_date],
            |row| row.get(0),
        )?)
    }

    /// `last_outcome` of leads last called in `[start, end)`, most frequent first
    pub fn outcome_histogram(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<(Outcome, u32)>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT last_outcome, COUNT(*) AS n FROM leads
               WHERE last_outcome IS NOT NULL
                 AND last_called_at >= ?1 AND last_called_at < ?2
               GROUP BY last_outcome
               ORDER BY n DESC, last_outcome ASC"#,
        )?;
        let rows = stmt.query_map(params![format_ts(start), format_ts(end)], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Snapshot for a date; zeroes when nothing was recorded yet
    pub fn daily_snapshot(&self, stat_date: &str) -> Result<DailySnapshot> {
        let row = self
            .conn
            .query_row(
                "SELECT stat_date, total_dials, contacts, conversations, demos_booked
                 FROM daily_stats WHERE stat_date = ?1",
                params![stat_date],
                |row| {
                    Ok(DailySnapshot {
                        stat_date: row.get(0)?,
                        total_dials: row.get(1)?,
                        contacts: row.get(2)?,
                        conversations: row.get(3)?,
                        demos_booked: row.get(4)?,
                    })
                },
            )
            .optional()?;

        Ok(row.unwrap_or_else(|| DailySnapshot {
            stat_date: stat_date.to_string(),
            ..Default::default()
        }))
    }

    // ============================================
    // AUDIT
    // ============================================

    pub fn history_for(&self, lead_id: &str) -> Result<Vec<CallHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT id, lead_id, attempt_number, outcome, notes, demo_date, callback_at,
                      call_date, called_at
               FROM call_history
               WHERE lead_id = ?1
               ORDER BY id ASC"#,
        )?;

        let rows = stmt.query_map(params![lead_id], |row| {
            Ok(CallHistoryEntry {
                id: row.get(0)?,
                lead_id: row.get(1)?,
                attempt_number: row.get(2)?,
                outcome: row.get(3)?,
                notes: row.get(4)?,
                demo_date: ts_col(row, 5)?,
                callback_at: ts_col(row, 6)?,
                call_date: row.get(7)?,
                called_at: req_ts_col(row, 8)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn notes_for(&self, lead_id: &str) -> Result<Vec<NoteEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT recorded_at, outcome, body FROM lead_notes WHERE lead_id = ?1 ORDER BY id ASC",
        )?;

        let rows = stmt.query_map(params![lead_id], |row| {
            Ok(NoteEntry {
                recorded_at: req_ts_col(row, 0)?,
                outcome: row.get(1)?,
                body: row.get(2)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Raw connection, for tests that need to poke at rows directly
    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn upsert_daily_stats(conn: &Connection, inc: &StatsIncrement, now: DateTime<Utc>) -> Result<()> {
    conn.execute(
        r#"INSERT INTO daily_stats
           (stat_date, total_dials, contacts, conversations, demos_booked, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT(stat_date) DO UPDATE SET
               total_dials = total_dials + excluded.total_dials,
               contacts = contacts + excluded.contacts,
               conversations = conversations + excluded.conversations,
               demos_booked = demos_booked + excluded.demos_booked,
               updated_at = excluded.updated_at"#,
        params![
            inc.stat_date,
            inc.total_dials,
            inc.contacts,
            inc.conversations,
            inc.demos_booked,
            format_ts(now),
        ],
    )?;
    Ok(())
}

fn select_lead(conn: &Connection, predicate: &str, arg: &str) -> Result<Option<Lead>> {
    let sql = format!("SELECT {} FROM leads WHERE {}", LEAD_COLUMNS, predicate);
    Ok(conn.query_row(&sql, params![arg], lead_from_row).optional()?)
}

fn lead_from_row(row: &Row) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: row.get(0)?,
        phone_number: row.get(1)?,
        business_name: row.get(2)?,
        owner_name: row.get(3)?,
        first_name: row.get(4)?,
        website: row.get(5)?,
        region: row.get(6)?,
        timezone: row.get(7)?,
        status: row.get(8)?,
        attempt_count: row.get(9)?,
        max_attempts: row.get(10)?,
        last_called_at: ts_col(row, 11)?,
        next_call_at: ts_col(row, 12)?,
        last_outcome: row.get(13)?,
        demo_booked: row.get(14)?,
        not_interested: row.get(15)?,
        wrong_number: row.get(16)?,
        demo_date: ts_col(row, 17)?,
        notes: row.get(18)?,
        import_batch: row.get(19)?,
        external_ref: row.get(20)?,
        created_at: req_ts_col(row, 21)?,
        updated_at: req_ts_col(row, 22)?,
    })
}

fn ts_col(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        parse_ts(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn req_ts_col(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 15, 0, 0).unwrap()
    }

    fn new_lead(phone: &str, zone: Option<Zone>) -> NewLead {
        NewLead {
            phone_number: phone.to_string(),
            fields: LeadFields {
                business_name: Some(format!("Biz {}", phone)),
                timezone: zone,
                ..Default::default()
            },
            max_attempts: 5,
            import_batch: Some("batch-test".to_string()),
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let store = LeadStore::open_in_memory().unwrap();
        let lead = store
            .insert_lead(&new_lead("9195550100", Some(Zone::ET)), now())
            .unwrap()
            .unwrap();
        assert_eq!(lead.status, LeadStatus::Queued);
        assert_eq!(lead.attempt_count, 0);
        assert_eq!(lead.created_at, now());

        assert_eq!(store.get_lead(&lead.id).unwrap().unwrap(), lead);
        assert_eq!(store.find_by_phone("9195550100").unwrap().unwrap().id, lead.id);
        assert_eq!(store.find_lead("+1 919-555-0100").unwrap().unwrap().id, lead.id);
        assert!(store.find_lead("nope").unwrap().is_none());
    }

    #[test]
    fn test_insert_duplicate_phone_is_none() {
        let store = LeadStore::open_in_memory().unwrap();
        assert!(store.insert_lead(&new_lead("9195550100", None), now()).unwrap().is_some());
        assert!(store.insert_lead(&new_lead("9195550100", None), now()).unwrap().is_none());
    }

    #[test]
    fn test_refresh_skips_terminal_leads() {
        let store = LeadStore::open_in_memory().unwrap();
        let lead = store.insert_lead(&new_lead("9195550100", None), now()).unwrap().unwrap();
        let fields = LeadFields {
            owner_name: Some("Pat".to_string()),
            region: Some("TX".to_string()),
            timezone: Some(Zone::CT),
            ..Default::default()
        };
        assert!(store.refresh_active_lead(&lead.id, &fields, now()).unwrap());
        let refreshed = store.get_lead(&lead.id).unwrap().unwrap();
        assert_eq!(refreshed.owner_name.as_deref(), Some("Pat"));
        assert_eq!(refreshed.business_name, lead.business_name);
        assert_eq!(refreshed.timezone, Some(Zone::CT));

        store
            .conn()
            .execute("UPDATE leads SET status = 'completed' WHERE id = ?1", params![lead.id])
            .unwrap();
        assert!(!store.refresh_active_lead(&lead.id, &fields, now()).unwrap());
    }

    #[test]
    fn test_queued_ordering_and_zone_filter() {
        let store = LeadStore::open_in_memory().unwrap();
        let a = store.insert_lead(&new_lead("1000000001", Some(Zone::ET)), now()).unwrap().unwrap();
        let b = store.insert_lead(&new_lead("1000000002", Some(Zone::ET)), now()).unwrap().unwrap();
        let c = store.insert_lead(&new_lead("1000000003", Some(Zone::PT)), now()).unwrap().unwrap();
        store
            .conn()
            .execute("UPDATE leads SET attempt_count = 1 WHERE id = ?1", params![a.id])
            .unwrap();

        let et = store.queued_leads(now(), Some(Zone::ET), 10, true).unwrap();
        let ids: Vec<_> = et.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec![b.id.as_str(), a.id.as_str()]);

        let all = store.queued_leads(now(), None, 10, true).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].id, a.id);
        assert!(all.iter().any(|l| l.id == c.id));

        assert_eq!(store.queued_leads(now(), None, 1, true).unwrap().len(), 1);
    }

    #[test]
    fn test_backoff_gate() {
        let store = LeadStore::open_in_memory().unwrap();
        let lead = store.insert_lead(&new_lead("1000000001", None), now()).unwrap().unwrap();
        store
            .conn()
            .execute(
                "UPDATE leads SET next_call_at = ?2 WHERE id = ?1",
                params![lead.id, format_ts(now() + chrono::Duration::days(2))],
            )
            .unwrap();
        assert!(store.queued_leads(now(), None, 10, true).unwrap().is_empty());
        assert_eq!(store.queued_leads(now(), None, 10, false).unwrap().len(), 1);
    }

    #[test]
    fn test_history_is_append_only() {
        let store = LeadStore::open_in_memory().unwrap();
        let lead = store.insert_lead(&new_lead("1000000001", None), now()).unwrap().unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO call_history (lead_id, attempt_number, outcome, call_date, called_at)
                 VALUES (?1, 1, 'no_answer', '2025-03-03', ?2)",
                params![lead.id, format_ts(now())],
            )
            .unwrap();
        assert!(store
            .conn()
            .execute("UPDATE call_history SET outcome = 'conversation'", [])
            .is_err());
        assert!(store.conn().execute("DELETE FROM call_history", []).is_err());
        assert_eq!(store.history_for(&lead.id).unwrap().len(), 1);
    }

    #[test]
    fn test_snapshot_defaults_to_zero() {
        let store = LeadStore::open_in_memory().unwrap();
        let snap = store.daily_snapshot("2025-03-03").unwrap();
        assert_eq!(snap.stat_date, "2025-03-03");
        assert_eq!(snap.total_dials, 0);
    }

    #[test]
    fn test_plan_error_writes_nothing() {
        let store = LeadStore::open_in_memory().unwrap();
        let lead = store.insert_lead(&new_lead("1000000001", None), now()).unwrap().unwrap();
        let err = store
            .apply_disposition(&lead.id, |_| Err(DialerError::invalid("nope")))
            .unwrap_err();
        assert!(matches!(err, DialerError::InvalidArgument(_)));
        assert_eq!(store.get_lead(&lead.id).unwrap().unwrap(), lead);

        let err = store
            .apply_disposition("missing", |_| Err(DialerError::invalid("unreached")))
            .unwrap_err();
        assert!(matches!(err, DialerError::NotFound(_)));
    }

    #[test]
    fn test_callable_follows_status_set() {
        let store = LeadStore::open_in_memory().unwrap();
        let working = store.insert_lead(&new_lead("1000000001", None), now()).unwrap().unwrap();
        let done = store.insert_lead(&new_lead("1000000002", None), now()).unwrap().unwrap();
        store.insert_lead(&new_lead("1000000003", None), now()).unwrap().unwrap();
        store
            .conn()
            .execute_batch(&format!(
                "UPDATE leads SET status = 'in_progress' WHERE id = '{}';
                 UPDATE leads SET status = 'archived' WHERE id = '{}';",
                working.id, done.id
            ))
            .unwrap();

        assert_eq!(store.callable_count().unwrap(), 2);
        let by_status = store.callable_by_status().unwrap();
        assert!(by_status.iter().all(|(s, _)| LeadStatus::CALLABLE.contains(s)));
        assert!(by_status.contains(&(LeadStatus::InProgress, 1)));

        let fields = LeadFields {
            website: Some("acme.example".to_string()),
            ..Default::default()
        };
        assert!(store.refresh_active_lead(&working.id, &fields, now()).unwrap());
        assert!(!store.refresh_active_lead(&done.id, &fields, now()).unwrap());
    }

    #[test]
    fn test_read_consistent_sees_one_commit() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("dialer.db");
        let reader = LeadStore::open(&db, Duration::from_secs(5)).unwrap();
        let writer = LeadStore::open(&db, Duration::from_secs(5)).unwrap();
        writer.insert_lead(&new_lead("1000000001", None), now()).unwrap();

        let (before, after) = reader
            .read_consistent(|store| {
                let before = store.callable_count()?;
                writer.insert_lead(&new_lead("1000000002", None), now())?;
                Ok((before, store.callable_count()?))
            })
            .unwrap();
        assert_eq!((before, after), (1, 1));
        assert_eq!(reader.callable_count().unwrap(), 2);
    }
}
