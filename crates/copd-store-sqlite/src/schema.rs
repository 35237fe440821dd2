//! SQL schema for the COPD SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS factors (
    factor_id   TEXT PRIMARY KEY,
    plan_id     TEXT NOT NULL,
    title       TEXT NOT NULL,
    description TEXT,
    domain      TEXT NOT NULL,   -- canonical UPPERCASE tag
    source_ref  TEXT,
    confidence  REAL,
    created_by  TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS deductions (
    deduction_id TEXT PRIMARY KEY,
    factor_id    TEXT NOT NULL REFERENCES factors(factor_id),
    text         TEXT NOT NULL,
    confidence   REAL,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS conclusions (
    conclusion_id TEXT PRIMARY KEY,
    factor_id     TEXT NOT NULL REFERENCES factors(factor_id),
    deduction_id  TEXT NOT NULL REFERENCES deductions(deduction_id),
    type          TEXT NOT NULL,
    text          TEXT NOT NULL,
    priority      INTEGER,
    owner         TEXT,
    status        TEXT NOT NULL DEFAULT 'DRAFT',
    created_at    TEXT NOT NULL
);

-- target_id is not a foreign key; links may dangle.
CREATE TABLE IF NOT EXISTS conclusion_links (
    link_id       TEXT PRIMARY KEY,
    conclusion_id TEXT NOT NULL REFERENCES conclusions(conclusion_id),
    target_kind   TEXT NOT NULL,
    target_id     TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS artefacts (
    artefact_id  TEXT PRIMARY KEY,
    plan_id      TEXT NOT NULL,
    kind         TEXT NOT NULL,             -- target-kind tag
    value_json   TEXT NOT NULL,             -- JSON payload (inner data only)
    derived_from TEXT NOT NULL DEFAULT '[]', -- JSON array of conclusion ids
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS factors_plan_idx          ON factors(plan_id);
CREATE INDEX IF NOT EXISTS deductions_factor_idx     ON deductions(factor_id);
CREATE INDEX IF NOT EXISTS conclusions_deduction_idx ON conclusions(deduction_id);
CREATE INDEX IF NOT EXISTS links_conclusion_idx      ON conclusion_links(conclusion_id);
CREATE INDEX IF NOT EXISTS artefacts_plan_kind_idx   ON artefacts(plan_id, kind);

PRAGMA user_version = 1;
";
