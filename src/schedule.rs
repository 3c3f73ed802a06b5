//! Scheduling cascade: reference-zone hour of day → zone bucket to call now.
//!
//! The block table is plain configuration; the only contract is a finite lookup
//! consulted once per queue assembly.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::model::Zone;

/// One dedicated calling hour
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallingBlock {
    /// Hour of day (0-23) in the reference time zone
    pub hour: u32,
    pub zone: Zone,
    pub label: String,
}

impl CallingBlock {
    pub fn new(hour: u32, zone: Zone, label: impl Into<String>) -> Self {
        Self {
            hour,
            zone,
            label: label.into(),
        }
    }
}

/// Calendar arithmetic in the reference time zone ("today", short dates)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    tz: Tz,
}

impl Calendar {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    /// `YYYY-MM-DD` key used for call history and daily stats
    pub fn date_key(&self, now: DateTime<Utc>) -> String {
        self.local_date(now).format("%Y-%m-%d").to_string()
    }

    /// `M/D` used in rendered note lines
    pub fn short_date(&self, now: DateTime<Utc>) -> String {
        self.local_date(now).format("%-m/%-d").to_string()
    }

    /// UTC bounds `[start, end)` of the reference-zone day containing `now`
    pub fn day_bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let date = self.local_date(now);
        let start = self.start_of(date);
        let end = date
            .succ_opt()
            .map(|next| self.start_of(next))
            .unwrap_or(start + Duration::days(1));
        (start, end)
    }

    fn start_of(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        // Midnight can be skipped by a DST jump in some zones; fall back to the
        // earliest instant that exists that day.
        match self.tz.from_local_datetime(&midnight) {
            chrono::LocalResult::Single(t) => t.with_timezone(&Utc),
            chrono::LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
            chrono::LocalResult::None => {
                let one_am = midnight + Duration::hours(1);
                self.tz
                    .from_local_datetime(&one_am)
                    .earliest()
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
            }
        }
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new(chrono_tz::America::New_York)
    }
}

/// Ordered block table
#[derive(Debug, Clone)]
pub struct ScheduleTable {
    calendar: Calendar,
    blocks: Vec<CallingBlock>,
}

impl ScheduleTable {
    pub fn new(calendar: Calendar, mut blocks: Vec<CallingBlock>) -> Self {
        blocks.sort_by_key(|b| b.hour);
        Self { calendar, blocks }
    }

    /// Eastern-reference working day: ET mornings and evenings, one or two late-morning
    /// blocks for each western zone.
    pub fn default_blocks() -> Vec<CallingBlock> {
        vec![
            CallingBlock::new(9, Zone::ET, "Eastern morning"),
            CallingBlock::new(10, Zone::ET, "Eastern morning"),
            CallingBlock::new(11, Zone::CT, "Central late morning"),
            CallingBlock::new(12, Zone::CT, "Central midday"),
            CallingBlock::new(13, Zone::MT, "Mountain late morning"),
            CallingBlock::new(14, Zone::PT, "Pacific late morning"),
            CallingBlock::new(15, Zone::PT, "Pacific midday"),
            CallingBlock::new(16, Zone::ET, "Eastern afternoon"),
            CallingBlock::new(17, Zone::ET, "Eastern evening"),
        ]
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn blocks(&self) -> &[CallingBlock] {
        &self.blocks
    }

    /// Block active at `now`, if any
    pub fn current_block(&self, now: DateTime<Utc>) -> Option<&CallingBlock> {
        let hour = now.with_timezone(&self.calendar.tz()).hour();
        self.blocks.iter().find(|b| b.hour == hour)
    }

    /// Zone bucket to call at `now`; `None` outside the covered hours
    pub fn current_bucket(&self, now: DateTime<Utc>) -> Option<Zone> {
        self.current_block(now).map(|b| b.zone)
    }

    /// First block label for a zone (used when the operator overrides the zone)
    pub fn label_for(&self, zone: Zone) -> Option<&str> {
        self.blocks
            .iter()
            .find(|b| b.zone == zone)
            .map(|b| b.label.as_str())
    }
}

impl Default for ScheduleTable {
    fn default() -> Self {
        Self::new(Calendar::default(), Self::default_blocks())
    }
}
