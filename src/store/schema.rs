//! SQLite schema definition
//!
//! - leads: one row per prospect, unique on the canonical phone number
//! - call_history / lead_notes: append-only, enforced by triggers
//! - daily_stats: one row per reference-zone calendar date

pub const SCHEMA: &str = r#"
-- ============================================
-- LEADS
-- ============================================

CREATE TABLE IF NOT EXISTS leads (
    id TEXT PRIMARY KEY,                   -- UUID
    phone_number TEXT NOT NULL UNIQUE,     -- digits only, 10-digit NANP form
    business_name TEXT,
    owner_name TEXT,
    first_name TEXT,
    website TEXT,
    region TEXT,                           -- free text as received
    timezone TEXT,                         -- 'ET', 'CT', 'MT', 'PT' or NULL
    status TEXT NOT NULL DEFAULT 'queued', -- 'queued', 'in_progress', 'callback', 'completed', 'archived'
    attempt_count INTEGER NOT NULL DEFAULT 0,
    max_attempts INTEGER NOT NULL DEFAULT 5,
    last_called_at TEXT,                   -- RFC 3339 UTC, second precision
    next_call_at TEXT,
    last_outcome TEXT,
    demo_booked BOOLEAN NOT NULL DEFAULT FALSE,
    not_interested BOOLEAN NOT NULL DEFAULT FALSE,
    wrong_number BOOLEAN NOT NULL DEFAULT FALSE,
    demo_date TEXT,
    notes TEXT,                            -- rendered, append-only log
    import_batch TEXT,
    external_ref TEXT,                     -- '<file>:<row>' from the lead source
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK (attempt_count >= 0)
);

-- ============================================
-- CALL HISTORY (append-only)
-- ============================================

CREATE TABLE IF NOT EXISTS call_history (
    id INTEGER PRIMARY KEY,
    lead_id TEXT NOT NULL,
    attempt_number INTEGER NOT NULL,       -- 1-based
    outcome TEXT NOT NULL,
    notes TEXT,
    demo_date TEXT,
    callback_at TEXT,
    call_date TEXT NOT NULL,               -- 'YYYY-MM-DD' in the reference zone
    called_at TEXT NOT NULL,
    FOREIGN KEY(lead_id) REFERENCES leads(id)
);

CREATE TRIGGER IF NOT EXISTS call_history_no_update
BEFORE UPDATE ON call_history
BEGIN
    SELECT RAISE(ABORT, 'call_history is append-only');
END;

CREATE TRIGGER IF NOT EXISTS call_history_no_delete
BEFORE DELETE ON call_history
BEGIN
    SELECT RAISE(ABORT, 'call_history is append-only');
END;

-- ============================================
-- NOTES (structured form of leads.notes)
-- ============================================

CREATE TABLE IF NOT EXISTS lead_notes (
    id INTEGER PRIMARY KEY,
    lead_id TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    outcome TEXT NOT NULL,
    body TEXT,
    FOREIGN KEY(lead_id) REFERENCES leads(id)
);

CREATE TRIGGER IF NOT EXISTS lead_notes_no_update
BEFORE UPDATE ON lead_notes
BEGIN
    SELECT RAISE(ABORT, 'lead_notes is append-only');
END;

CREATE TRIGGER IF NOT EXISTS lead_notes_no_delete
BEFORE DELETE ON lead_notes
BEGIN
    SELECT RAISE(ABORT, 'lead_notes is append-only');
END;

-- ============================================
-- DAILY STATS
-- ============================================

CREATE TABLE IF NOT EXISTS daily_stats (
    stat_date TEXT PRIMARY KEY,            -- 'YYYY-MM-DD' in the reference zone
    total_dials INTEGER NOT NULL DEFAULT 0,
    contacts INTEGER NOT NULL DEFAULT 0,
    conversations INTEGER NOT NULL DEFAULT 0,
    demos_booked INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

-- ============================================
-- INDEXES
-- ============================================

CREATE INDEX IF NOT EXISTS idx_leads_status_attempts ON leads(status, attempt_count, created_at);
CREATE INDEX IF NOT EXISTS idx_leads_timezone ON leads(timezone);
CREATE INDEX IF NOT EXISTS idx_leads_next_call ON leads(next_call_at);
CREATE INDEX IF NOT EXISTS idx_leads_last_called ON leads(last_called_at);
CREATE INDEX IF NOT EXISTS idx_history_lead ON call_history(lead_id);
CREATE INDEX IF NOT EXISTS idx_history_date ON call_history(call_date);
CREATE INDEX IF NOT EXISTS idx_notes_lead ON lead_notes(lead_id);
"#;
