//! Lead, call history and daily stats records plus the closed enumerations
//! (zone, status, outcome) that drive scheduling.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DialerError;

/// Calling time zone bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Zone {
    ET,
    CT,
    MT,
    PT,
}

impl Zone {
    pub const ALL: [Zone; 4] = [Zone::ET, Zone::CT, Zone::MT, Zone::PT];

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::ET => "ET",
            Zone::CT => "CT",
            Zone::MT => "MT",
            Zone::PT => "PT",
        }
    }
}

impl FromStr for Zone {
    type Err = DialerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ET" | "EST" | "EDT" | "EASTERN" => Ok(Zone::ET),
            "CT" | "CST" | "CDT" | "CENTRAL" => Ok(Zone::CT),
            "MT" | "MST" | "MDT" | "MOUNTAIN" => Ok(Zone::MT),
            "PT" | "PST" | "PDT" | "PACIFIC" => Ok(Zone::PT),
            other => Err(DialerError::invalid(format!("unknown zone: {}", other))),
        }
    }
}

/// Lead call-state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Queued,
    InProgress,
    Callback,
    Completed,
    Archived,
}

impl LeadStatus {
    /// Statuses a caller can still be handed
    pub const CALLABLE: [LeadStatus; 3] = [
        LeadStatus::Queued,
        LeadStatus::Callback,
        LeadStatus::InProgress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Queued => "queued",
            LeadStatus::InProgress => "in_progress",
            LeadStatus::Callback => "callback",
            LeadStatus::Completed => "completed",
            LeadStatus::Archived => "archived",
        }
    }

    /// Completed and archived leads are never surfaced or reopened
    pub fn is_terminal(&self) -> bool {
        matches!(self, LeadStatus::Completed | LeadStatus::Archived)
    }
}

impl FromStr for LeadStatus {
    type Err = DialerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(LeadStatus::Queued),
            "in_progress" => Ok(LeadStatus::InProgress),
            "callback" => Ok(LeadStatus::Callback),
            "completed" => Ok(LeadStatus::Completed),
            "archived" => Ok(LeadStatus::Archived),
            other => Err(DialerError::invalid(format!("unknown status: {}", other))),
        }
    }
}

/// Result of one call attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    NoAnswer,
    Voicemail,
    Gatekeeper,
    Conversation,
    DemoBooked,
    NotInterested,
    WrongNumber,
    Callback,
}

impl Outcome {
    pub const ALL: [Outcome; 8] = [
        Outcome::NoAnswer,
        Outcome::Voicemail,
        Outcome::Gatekeeper,
        Outcome::Conversation,
        Outcome::DemoBooked,
        Outcome::NotInterested,
        Outcome::WrongNumber,
        Outcome::Callback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::NoAnswer => "no_answer",
            Outcome::Voicemail => "voicemail",
            Outcome::Gatekeeper => "gatekeeper",
            Outcome::Conversation => "conversation",
            Outcome::DemoBooked => "demo_booked",
            Outcome::NotInterested => "not_interested",
            Outcome::WrongNumber => "wrong_number",
            Outcome::Callback => "callback",
        }
    }

    /// Counted as a contact in the daily snapshot
    pub fn is_contact(&self) -> bool {
        matches!(
            self,
            Outcome::Conversation | Outcome::DemoBooked | Outcome::Callback | Outcome::NotInterested
        )
    }

    /// Counted as a conversation in the daily snapshot
    pub fn is_conversation(&self) -> bool {
        matches!(self, Outcome::Conversation | Outcome::DemoBooked)
    }
}

impl FromStr for Outcome {
    type Err = DialerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Outcome::ALL
            .into_iter()
            .find(|o| o.as_str() == key)
            .ok_or_else(|| DialerError::invalid(format!("unknown outcome: {}", s)))
    }
}

macro_rules! text_enum_sql {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: DialerError| FromSqlError::Other(Box::new(e)))
            }
        }
    )*};
}

text_enum_sql!(Zone, LeadStatus, Outcome);

/// One prospect
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lead {
    pub id: String,
    pub phone_number: String,
    pub business_name: Option<String>,
    pub owner_name: Option<String>,
    pub first_name: Option<String>,
    pub website: Option<String>,
    pub region: Option<String>,
    pub timezone: Option<Zone>,
    pub status: LeadStatus,
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub last_called_at: Option<DateTime<Utc>>,
    pub next_call_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<Outcome>,
    pub demo_booked: bool,
    pub not_interested: bool,
    pub wrong_number: bool,
    pub demo_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub import_batch: Option<String>,
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Best display name: business, then owner, then phone
    pub fn display_name(&self) -> &str {
        self.business_name
            .as_deref()
            .or(self.owner_name.as_deref())
            .unwrap_or(&self.phone_number)
    }
}

/// Descriptive fields for a new or refreshed lead
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadFields {
    pub business_name: Option<String>,
    pub owner_name: Option<String>,
    pub first_name: Option<String>,
    pub website: Option<String>,
    pub region: Option<String>,
    pub timezone: Option<Zone>,
    pub external_ref: Option<String>,
}

/// Immutable record of one disposition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallHistoryEntry {
    pub id: i64,
    pub lead_id: String,
    pub attempt_number: u32,
    pub outcome: Outcome,
    pub notes: Option<String>,
    pub demo_date: Option<DateTime<Utc>>,
    pub callback_at: Option<DateTime<Utc>>,
    /// Calendar date in the reference time zone (`YYYY-MM-DD`)
    pub call_date: String,
    pub called_at: DateTime<Utc>,
}

/// Structured note line; rendered into the lead's text log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteEntry {
    pub recorded_at: DateTime<Utc>,
    pub outcome: Outcome,
    pub body: Option<String>,
}

impl NoteEntry {
    /// `[<short-date>] <outcome>: <notes>` or `[<short-date>] <outcome>`
    pub fn render(&self, short_date: &str) -> String {
        match self.body.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
            Some(body) => format!("[{}] {}: {}", short_date, self.outcome, body),
            None => format!("[{}] {}", short_date, self.outcome),
        }
    }
}

/// Running per-day counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailySnapshot {
    pub stat_date: String,
    pub total_dials: u32,
    pub contacts: u32,
    pub conversations: u32,
    pub demos_booked: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_parsing_is_closed() {
        assert_eq!("no_answer".parse::<Outcome>().unwrap(), Outcome::NoAnswer);
        assert_eq!("Demo-Booked".parse::<Outcome>().unwrap(), Outcome::DemoBooked);
        assert!(matches!(
            "hung_up".parse::<Outcome>(),
            Err(DialerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_outcome_counters() {
        assert!(Outcome::Callback.is_contact());
        assert!(!Outcome::Callback.is_conversation());
        assert!(Outcome::DemoBooked.is_conversation());
        assert!(!Outcome::Voicemail.is_contact());
    }

    #[test]
    fn test_zone_and_status_round_trip_text() {
        for zone in Zone::ALL {
            assert_eq!(zone.as_str().parse::<Zone>().unwrap(), zone);
        }
        assert_eq!("in_progress".parse::<LeadStatus>().unwrap(), LeadStatus::InProgress);
        assert!(LeadStatus::Archived.is_terminal());
        assert!(!LeadStatus::Callback.is_terminal());
    }

    #[test]
    fn test_note_render() {
        let note = NoteEntry {
            recorded_at: Utc::now(),
            outcome: Outcome::Voicemail,
            body: Some("left msg".to_string()),
        };
        assert_eq!(note.render("3/1"), "[3/1] voicemail: left msg");
        let bare = NoteEntry { body: Some("  ".into()), ..note };
        assert_eq!(bare.render("3/1"), "[3/1] voicemail");
    }
}
