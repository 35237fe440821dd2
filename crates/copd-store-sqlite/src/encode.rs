//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, enum
//! fields their canonical tags. `derived_from` is a compact JSON array.

use chrono::{DateTime, Utc};
use copd_core::{
  artefact::{Artefact, ArtefactValue},
  conclusion::{Conclusion, ConclusionLink, ConclusionStatus, ConclusionType},
  factor::{Deduction, Factor, FactorDomain},
  target::TargetKind,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Provenance ──────────────────────────────────────────────────────────────

pub fn encode_ids(ids: &[Uuid]) -> Result<String> { Ok(serde_json::to_string(ids)?) }

pub fn decode_ids(s: &str) -> Result<Vec<Uuid>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const FACTOR_COLUMNS: &str = "factor_id, plan_id, title, description, domain, \
                                  source_ref, confidence, created_by, created_at";

/// Raw values read directly from a `factors` row.
pub struct RawFactor {
  pub factor_id:   String,
  pub plan_id:     String,
  pub title:       String,
  pub description: Option<String>,
  pub domain:      String,
  pub source_ref:  Option<String>,
  pub confidence:  Option<f64>,
  pub created_by:  Option<String>,
  pub created_at:  String,
}

impl RawFactor {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      factor_id:   row.get(0)?,
      plan_id:     row.get(1)?,
      title:       row.get(2)?,
      description: row.get(3)?,
      domain:      row.get(4)?,
      source_ref:  row.get(5)?,
      confidence:  row.get(6)?,
      created_by:  row.get(7)?,
      created_at:  row.get(8)?,
    })
  }

  pub fn into_factor(self) -> Result<Factor> {
    Ok(Factor {
      factor_id:   decode_uuid(&self.factor_id)?,
      plan_id:     decode_uuid(&self.plan_id)?,
      title:       self.title,
      description: self.description,
      domain:      FactorDomain::parse(&self.domain)?,
      source_ref:  self.source_ref,
      confidence:  self.confidence,
      created_by:  self.created_by,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const DEDUCTION_COLUMNS: &str = "deduction_id, factor_id, text, confidence, created_at";

pub struct RawDeduction {
  pub deduction_id: String,
  pub factor_id:    String,
  pub text:         String,
  pub confidence:   Option<f64>,
  pub created_at:   String,
}

impl RawDeduction {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      deduction_id: row.get(0)?,
      factor_id:    row.get(1)?,
      text:         row.get(2)?,
      confidence:   row.get(3)?,
      created_at:   row.get(4)?,
    })
  }

  pub fn into_deduction(self) -> Result<Deduction> {
    Ok(Deduction {
      deduction_id: decode_uuid(&self.deduction_id)?,
      factor_id:    decode_uuid(&self.factor_id)?,
      text:         self.text,
      confidence:   self.confidence,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const CONCLUSION_COLUMNS: &str = "conclusion_id, factor_id, deduction_id, type, text, \
                                      priority, owner, status, created_at";

pub struct RawConclusion {
  pub conclusion_id: String,
  pub factor_id:     String,
  pub deduction_id:  String,
  pub kind:          String,
  pub text:          String,
  pub priority:      Option<i64>,
  pub owner:         Option<String>,
  pub status:        String,
  pub created_at:    String,
}

impl RawConclusion {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      conclusion_id: row.get(0)?,
      factor_id:     row.get(1)?,
      deduction_id:  row.get(2)?,
      kind:          row.get(3)?,
      text:          row.get(4)?,
      priority:      row.get(5)?,
      owner:         row.get(6)?,
      status:        row.get(7)?,
      created_at:    row.get(8)?,
    })
  }

  pub fn into_conclusion(self) -> Result<Conclusion> {
    Ok(Conclusion {
      conclusion_id: decode_uuid(&self.conclusion_id)?,
      factor_id:     decode_uuid(&self.factor_id)?,
      deduction_id:  decode_uuid(&self.deduction_id)?,
      kind:          ConclusionType::parse(&self.kind)?,
      text:          self.text,
      priority:      self.priority,
      owner:         self.owner,
      status:        ConclusionStatus::parse(&self.status)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const LINK_COLUMNS: &str = "link_id, conclusion_id, target_kind, target_id, created_at";

pub struct RawLink {
  pub link_id:       String,
  pub conclusion_id: String,
  pub target_kind:   String,
  pub target_id:     String,
  pub created_at:    String,
}

impl RawLink {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      link_id:       row.get(0)?,
      conclusion_id: row.get(1)?,
      target_kind:   row.get(2)?,
      target_id:     row.get(3)?,
      created_at:    row.get(4)?,
    })
  }

  pub fn into_link(self) -> Result<ConclusionLink> {
    Ok(ConclusionLink {
      link_id:       decode_uuid(&self.link_id)?,
      conclusion_id: decode_uuid(&self.conclusion_id)?,
      target_kind:   TargetKind::parse(&self.target_kind)?,
      target_id:     decode_uuid(&self.target_id)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const ARTEFACT_COLUMNS: &str = "artefact_id, plan_id, kind, value_json, derived_from, created_at";

pub struct RawArtefact {
  pub artefact_id:  String,
  pub plan_id:      String,
  pub kind:         String,
  pub value_json:   String,
  pub derived_from: String,
  pub created_at:   String,
}

impl RawArtefact {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      artefact_id:  row.get(0)?,
      plan_id:      row.get(1)?,
      kind:         row.get(2)?,
      value_json:   row.get(3)?,
      derived_from: row.get(4)?,
      created_at:   row.get(5)?,
    })
  }

  pub fn into_artefact(self) -> Result<Artefact> {
    let kind = TargetKind::parse(&self.kind)?;
    let data: serde_json::Value = serde_json::from_str(&self.value_json)?;

    Ok(Artefact {
      artefact_id:  decode_uuid(&self.artefact_id)?,
      plan_id:      decode_uuid(&self.plan_id)?,
      value:        ArtefactValue::from_parts(kind, data)?,
      derived_from: decode_ids(&self.derived_from)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}
