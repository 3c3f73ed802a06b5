//! Phone canonicalization and region → calling zone lookup

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::model::Zone;

/// Shortest digit string accepted as a phone number
pub const MIN_PHONE_DIGITS: usize = 7;

/// Strip everything but digits; drop the NANP country code from 11-digit numbers.
///
/// No length validation beyond that, see [`is_valid_phone`].
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 11 && digits.starts_with('1') {
        digits[1..].to_string()
    } else {
        digits
    }
}

pub fn is_valid_phone(normalized: &str) -> bool {
    normalized.len() >= MIN_PHONE_DIGITS
}

/// (code, name, zone). Multi-zone states use the zone most of their population is in;
/// Alaska, Hawaii and the Pacific territories fold into PT, the Atlantic ones into ET.
const REGIONS: &[(&str, &str, Zone)] = &[
    ("AL", "Alabama", Zone::CT),
    ("AK", "Alaska", Zone::PT),
    ("AZ", "Arizona", Zone::MT),
    ("AR", "Arkansas", Zone::CT),
    ("CA", "California", Zone::PT),
    ("CO", "Colorado", Zone::MT),
    ("CT", "Connecticut", Zone::ET),
    ("DE", "Delaware", Zone::ET),
    ("DC", "District of Columbia", Zone::ET),
    ("FL", "Florida", Zone::ET),
    ("GA", "Georgia", Zone::ET),
    ("HI", "Hawaii", Zone::PT),
    ("ID", "Idaho", Zone::MT),
    ("IL", "Illinois", Zone::CT),
    ("IN", "Indiana", Zone::ET),
    ("IA", "Iowa", Zone::CT),
    ("KS", "Kansas", Zone::CT),
    ("KY", "Kentucky", Zone::ET),
    ("LA", "Louisiana", Zone::CT),
    ("ME", "Maine", Zone::ET),
    ("MD", "Maryland", Zone::ET),
    ("MA", "Massachusetts", Zone::ET),
    ("MI", "Michigan", Zone::ET),
    ("MN", "Minnesota", Zone::CT),
    ("MS", "Mississippi", Zone::CT),
    ("MO", "Missouri", Zone::CT),
    ("MT", "Montana", Zone::MT),
    ("NE", "Nebraska", Zone::CT),
    ("NV", "Nevada", Zone::PT),
    ("NH", "New Hampshire", Zone::ET),
    ("NJ", "New Jersey", Zone::ET),
    ("NM", "New Mexico", Zone::MT),
    ("NY", "New York", Zone::ET),
    ("NC", "North Carolina", Zone::ET),
    ("ND", "North Dakota", Zone::CT),
    ("OH", "Ohio", Zone::ET),
    ("OK", "Oklahoma", Zone::CT),
    ("OR", "Oregon", Zone::PT),
    ("PA", "Pennsylvania", Zone::ET),
    ("RI", "Rhode Island", Zone::ET),
    ("SC", "South Carolina", Zone::ET),
    ("SD", "South Dakota", Zone::CT),
    ("TN", "Tennessee", Zone::CT),
    ("TX", "Texas", Zone::CT),
    ("UT", "Utah", Zone::MT),
    ("VT", "Vermont", Zone::ET),
    ("VA", "Virginia", Zone::ET),
    ("WA", "Washington", Zone::PT),
    ("WV", "West Virginia", Zone::ET),
    ("WI", "Wisconsin", Zone::CT),
    ("WY", "Wyoming", Zone::MT),
    // Territories
    ("PR", "Puerto Rico", Zone::ET),
    ("VI", "U.S. Virgin Islands", Zone::ET),
    ("GU", "Guam", Zone::PT),
    ("MP", "Northern Mariana Islands", Zone::PT),
    ("AS", "American Samoa", Zone::PT),
];

/// Case-insensitive region code/name → zone map
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    entries: HashMap<String, Zone>,
}

impl RegionTable {
    /// Build from (code, name, zone) triples; both code and name become keys
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str, Zone)>) -> Self {
        let mut map = HashMap::new();
        for (code, name, zone) in entries {
            map.insert(Self::key(code), zone);
            map.insert(Self::key(name), zone);
        }
        Self { entries: map }
    }

    /// The built-in US table
    pub fn us() -> &'static RegionTable {
        static TABLE: OnceLock<RegionTable> = OnceLock::new();
        TABLE.get_or_init(|| RegionTable::from_entries(REGIONS.iter().copied()))
    }

    pub fn resolve(&self, region: &str) -> Option<Zone> {
        let key = Self::key(region);
        if key.is_empty() {
            return None;
        }
        self.entries.get(&key).copied()
    }

    fn key(raw: &str) -> String {
        raw.trim()
            .trim_end_matches('.')
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase()
    }
}

/// Resolve against the built-in US table
pub fn resolve_timezone(region: &str) -> Option<Zone> {
    RegionTable::us().resolve(region)
}
