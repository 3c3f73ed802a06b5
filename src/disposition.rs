//! Disposition engine: the per-lead call-attempt state machine.
//!
//! | outcome                             | status                                   | next_call_at          |
//! |-------------------------------------|------------------------------------------|-----------------------|
//! | no_answer / voicemail / gatekeeper  | archived at the attempt cap, else queued | now + 2..3 days       |
//! | conversation                        | archived at the attempt cap, else queued | now + 3 days          |
//! | demo_booked / not_interested / wrong_number | completed (flag set)             | unset                 |
//! | callback                            | callback                                 | requested, else +1 day |

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::Serialize;
use tracing::info;

use crate::clock::{Clock, Jitter};
use crate::error::{DialerError, Result};
use crate::model::{Lead, LeadStatus, NoteEntry, Outcome};
use crate::schedule::Calendar;
use crate::store::{DispositionWrite, LeadStore, NewHistoryEntry, StatsIncrement};

const RETRY_BASE_DAYS: i64 = 2;
const CONVERSATION_RETRY_DAYS: i64 = 3;
const CALLBACK_DEFAULT_DAYS: i64 = 1;

/// One reported call outcome
#[derive(Debug, Clone)]
pub struct DispositionRequest {
    pub lead_id: String,
    pub outcome: Outcome,
    pub notes: Option<String>,
    pub demo_date: Option<DateTime<Utc>>,
    pub callback_at: Option<DateTime<Utc>>,
}

impl DispositionRequest {
    pub fn new(lead_id: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            lead_id: lead_id.into(),
            outcome,
            notes: None,
            demo_date: None,
            callback_at: None,
        }
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn demo_date(mut self, at: DateTime<Utc>) -> Self {
        self.demo_date = Some(at);
        self
    }

    pub fn callback_at(mut self, at: DateTime<Utc>) -> Self {
        self.callback_at = Some(at);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispositionResult {
    pub lead_id: String,
    pub new_status: LeadStatus,
    pub attempt_count: u32,
    pub next_call_at: Option<DateTime<Utc>>,
}

/// Status, schedule and terminal flags after one outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub status: LeadStatus,
    pub attempt_count: u32,
    pub next_call_at: Option<DateTime<Utc>>,
    pub demo_booked: bool,
    pub not_interested: bool,
    pub wrong_number: bool,
    pub demo_date: Option<DateTime<Utc>>,
}

/// Pure transition table. `unit_jitter` is in `[0, 1)`.
pub fn transition(
    lead: &Lead,
    request: &DispositionRequest,
    now: DateTime<Utc>,
    unit_jitter: f64,
) -> Transition {
    let attempt_count = lead.attempt_count + 1;
    let retry_status = if attempt_count >= lead.max_attempts {
        LeadStatus::Archived
    } else {
        LeadStatus::Queued
    };

    let mut next = Transition {
        status: retry_status,
        attempt_count,
        next_call_at: None,
        demo_booked: lead.demo_booked,
        not_interested: lead.not_interested,
        wrong_number: lead.wrong_number,
        demo_date: lead.demo_date,
    };

    match request.outcome {
        Outcome::NoAnswer | Outcome::Voicemail | Outcome::Gatekeeper => {
            let ms = ((RETRY_BASE_DAYS as f64 + unit_jitter) * 86_400_000.0) as i64;
            next.next_call_at = Some((now + Duration::milliseconds(ms)).trunc_subsecs(0));
        }
        Outcome::Conversation => {
            next.next_call_at = Some(now + Duration::days(CONVERSATION_RETRY_DAYS));
        }
        Outcome::DemoBooked => {
            next.status = LeadStatus::Completed;
            next.demo_booked = true;
            next.demo_date = request.demo_date;
        }
        Outcome::NotInterested => {
            next.status = LeadStatus::Completed;
            next.not_interested = true;
        }
        Outcome::WrongNumber => {
            next.status = LeadStatus::Completed;
            next.wrong_number = true;
        }
        Outcome::Callback => {
            next.status = LeadStatus::Callback;
            next.next_call_at = Some(
                request
                    .callback_at
                    .unwrap_or(now + Duration::days(CALLBACK_DEFAULT_DAYS)),
            );
        }
    }

    next
}

/// Record one outcome against a lead.
///
/// The lead is re-read inside the store transaction, so the attempt increment
/// and status change are computed from the latest committed state. Fails with
/// `NotFound` for an unknown id and `Conflict` for a lead that is already
/// completed or archived; either way nothing is written.
pub fn apply_disposition(
    store: &LeadStore,
    calendar: &Calendar,
    clock: &dyn Clock,
    jitter: &dyn Jitter,
    request: &DispositionRequest,
) -> Result<DispositionResult> {
    let now = clock.now().trunc_subsecs(0);
    let notes = request
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    let updated = store.apply_disposition(&request.lead_id, |lead| {
        if lead.status.is_terminal() {
            return Err(DialerError::Conflict(format!(
                "lead {} is already {}",
                lead.id, lead.status
            )));
        }

        let next = transition(lead, request, now, jitter.unit());
        let note = NoteEntry {
            recorded_at: now,
            outcome: request.outcome,
            body: notes.clone(),
        };
        let note_line = note.render(&calendar.short_date(now));
        let outcome = request.outcome;

        Ok(DispositionWrite {
            expected_attempt_count: lead.attempt_count,
            status: next.status,
            attempt_count: next.attempt_count,
            last_called_at: now,
            next_call_at: next.next_call_at,
            last_outcome: outcome,
            demo_booked: next.demo_booked,
            not_interested: next.not_interested,
            wrong_number: next.wrong_number,
            demo_date: next.demo_date,
            note,
            note_line,
            history: NewHistoryEntry {
                attempt_number: lead.attempt_count + 1,
                outcome,
                notes: notes.clone(),
                demo_date: request.demo_date.filter(|_| outcome == Outcome::DemoBooked),
                callback_at: next.next_call_at.filter(|_| outcome == Outcome::Callback),
                call_date: calendar.date_key(now),
                called_at: now,
            },
            stats: StatsIncrement {
                stat_date: calendar.date_key(now),
                total_dials: 1,
                contacts: u32::from(outcome.is_contact()),
                conversations: u32::from(outcome.is_conversation()),
                demos_booked: u32::from(outcome == Outcome::DemoBooked),
            },
        })
    })?;

    info!(
        lead_id = %updated.id,
        outcome = %request.outcome,
        status = %updated.status,
        attempt_count = updated.attempt_count,
        "disposition recorded"
    );

    Ok(DispositionResult {
        lead_id: updated.id,
        new_status: updated.status,
        attempt_count: updated.attempt_count,
        next_call_at: updated.next_call_at,
    })
}
