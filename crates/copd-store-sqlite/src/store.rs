//! [`SqliteStore`] — the SQLite implementation of [`LineageStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, Row};
use uuid::Uuid;

use copd_core::{
  artefact::{Artefact, NewArtefact},
  cascade::{CascadeDelete, CascadeNode, CascadeOutcome},
  conclusion::{Conclusion, ConclusionLink, ConclusionStatus, NewConclusion},
  factor::{Deduction, Factor, NewDeduction, NewFactor},
  store::{LineageStore, LinkTarget, NewLink},
  target::TargetKind,
};

use crate::{
  Error, Result,
  encode::{
    ARTEFACT_COLUMNS, CONCLUSION_COLUMNS, DEDUCTION_COLUMNS, FACTOR_COLUMNS,
    LINK_COLUMNS, RawArtefact, RawConclusion, RawDeduction, RawFactor, RawLink,
    encode_dt, encode_ids, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn query_all<T, P: rusqlite::Params>(
  conn: &rusqlite::Connection,
  sql: &str,
  params: P,
  map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
  let mut stmt = conn.prepare(sql)?;
  stmt.query_map(params, map)?.collect()
}

/// An artefact encoded for the `artefacts` table.
struct ArtefactRow {
  artefact_id:  String,
  plan_id:      String,
  kind:         String,
  value_json:   String,
  derived_from: String,
  created_at:   String,
}

impl ArtefactRow {
  fn encode(artefact: &Artefact) -> Result<Self> {
    Ok(Self {
      artefact_id:  encode_uuid(artefact.artefact_id),
      plan_id:      encode_uuid(artefact.plan_id),
      kind:         artefact.kind().as_ref().to_owned(),
      value_json:   artefact.value.to_json()?.to_string(),
      derived_from: encode_ids(&artefact.derived_from)?,
      created_at:   encode_dt(artefact.created_at),
    })
  }

  fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO artefacts (
         artefact_id, plan_id, kind, value_json, derived_from, created_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      rusqlite::params![
        self.artefact_id,
        self.plan_id,
        self.kind,
        self.value_json,
        self.derived_from,
        self.created_at,
      ],
    )?;
    Ok(())
  }
}

fn build_artefact(input: NewArtefact) -> Artefact {
  Artefact {
    artefact_id:  Uuid::new_v4(),
    plan_id:      input.plan_id,
    value:        input.value,
    derived_from: input.derived_from,
    created_at:   Utc::now(),
  }
}

fn delete_statement(node: CascadeNode) -> (&'static str, String) {
  match node {
    CascadeNode::Link(id) => {
      ("DELETE FROM conclusion_links WHERE link_id = ?1", encode_uuid(id))
    }
    CascadeNode::Conclusion(id) => {
      ("DELETE FROM conclusions WHERE conclusion_id = ?1", encode_uuid(id))
    }
    CascadeNode::Deduction(id) => {
      ("DELETE FROM deductions WHERE deduction_id = ?1", encode_uuid(id))
    }
    CascadeNode::Factor(id) => {
      ("DELETE FROM factors WHERE factor_id = ?1", encode_uuid(id))
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A COPD lineage store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a private in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── LineageStore impl ───────────────────────────────────────────────────────

impl LineageStore for SqliteStore {
  type Error = Error;

  // ── Factors ───────────────────────────────────────────────────────────────

  async fn add_factor(&self, input: NewFactor) -> Result<Factor> {
    let factor = Factor {
      factor_id:   Uuid::new_v4(),
      plan_id:     input.plan_id,
      title:       input.title,
      description: input.description,
      domain:      input.domain,
      source_ref:  input.source_ref,
      confidence:  input.confidence,
      created_by:  input.created_by,
      created_at:  Utc::now(),
    };

    let id_str      = encode_uuid(factor.factor_id);
    let plan_str    = encode_uuid(factor.plan_id);
    let title       = factor.title.clone();
    let description = factor.description.clone();
    let domain_str  = factor.domain.to_string();
    let source_ref  = factor.source_ref.clone();
    let confidence  = factor.confidence;
    let created_by  = factor.created_by.clone();
    let at_str      = encode_dt(factor.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO factors (
             factor_id, plan_id, title, description, domain,
             source_ref, confidence, created_by, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            plan_str,
            title,
            description,
            domain_str,
            source_ref,
            confidence,
            created_by,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(factor)
  }

  async fn get_factor(&self, id: Uuid) -> Result<Option<Factor>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawFactor> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {FACTOR_COLUMNS} FROM factors WHERE factor_id = ?1"),
              rusqlite::params![id_str],
              RawFactor::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawFactor::into_factor).transpose()
  }

  async fn list_factors(&self, plan_id: Option<Uuid>) -> Result<Vec<Factor>> {
    let plan_str = plan_id.map(encode_uuid);

    let raws: Vec<RawFactor> = self
      .conn
      .call(move |conn| {
        Ok(query_all(
          conn,
          &format!(
            "SELECT {FACTOR_COLUMNS} FROM factors
             WHERE (?1 IS NULL OR plan_id = ?1)
             ORDER BY rowid"
          ),
          rusqlite::params![plan_str],
          RawFactor::from_row,
        )?)
      })
      .await?;

    raws.into_iter().map(RawFactor::into_factor).collect()
  }

  // ── Deductions ────────────────────────────────────────────────────────────

  async fn add_deduction(&self, input: NewDeduction) -> Result<Deduction> {
    let deduction = Deduction {
      deduction_id: Uuid::new_v4(),
      factor_id:    input.factor_id,
      text:         input.text,
      confidence:   input.confidence,
      created_at:   Utc::now(),
    };

    let id_str     = encode_uuid(deduction.deduction_id);
    let factor_str = encode_uuid(deduction.factor_id);
    let text       = deduction.text.clone();
    let confidence = deduction.confidence;
    let at_str     = encode_dt(deduction.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO deductions (deduction_id, factor_id, text, confidence, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, factor_str, text, confidence, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(deduction)
  }

  async fn get_deduction(&self, id: Uuid) -> Result<Option<Deduction>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawDeduction> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {DEDUCTION_COLUMNS} FROM deductions WHERE deduction_id = ?1"),
              rusqlite::params![id_str],
              RawDeduction::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDeduction::into_deduction).transpose()
  }

  async fn list_deductions(&self, factor_id: Uuid) -> Result<Vec<Deduction>> {
    let factor_str = encode_uuid(factor_id);

    let raws: Vec<RawDeduction> = self
      .conn
      .call(move |conn| {
        Ok(query_all(
          conn,
          &format!(
            "SELECT {DEDUCTION_COLUMNS} FROM deductions WHERE factor_id = ?1 ORDER BY rowid"
          ),
          rusqlite::params![factor_str],
          RawDeduction::from_row,
        )?)
      })
      .await?;

    raws.into_iter().map(RawDeduction::into_deduction).collect()
  }

  // ── Conclusions ───────────────────────────────────────────────────────────

  async fn add_conclusion(&self, input: NewConclusion) -> Result<Conclusion> {
    let conclusion = Conclusion {
      conclusion_id: Uuid::new_v4(),
      factor_id:     input.factor_id,
      deduction_id:  input.deduction_id,
      kind:          input.kind,
      text:          input.text,
      priority:      input.priority,
      owner:         input.owner,
      status:        ConclusionStatus::Draft,
      created_at:    Utc::now(),
    };

    let id_str        = encode_uuid(conclusion.conclusion_id);
    let factor_str    = encode_uuid(conclusion.factor_id);
    let deduction_str = encode_uuid(conclusion.deduction_id);
    let kind_str      = conclusion.kind.to_string();
    let text          = conclusion.text.clone();
    let priority      = conclusion.priority;
    let owner         = conclusion.owner.clone();
    let status_str    = conclusion.status.to_string();
    let at_str        = encode_dt(conclusion.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO conclusions (
             conclusion_id, factor_id, deduction_id, type, text,
             priority, owner, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            factor_str,
            deduction_str,
            kind_str,
            text,
            priority,
            owner,
            status_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(conclusion)
  }

  async fn get_conclusion(&self, id: Uuid) -> Result<Option<Conclusion>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawConclusion> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CONCLUSION_COLUMNS} FROM conclusions WHERE conclusion_id = ?1"
              ),
              rusqlite::params![id_str],
              RawConclusion::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawConclusion::into_conclusion).transpose()
  }

  async fn list_conclusions(&self, deduction_id: Uuid) -> Result<Vec<Conclusion>> {
    let deduction_str = encode_uuid(deduction_id);

    let raws: Vec<RawConclusion> = self
      .conn
      .call(move |conn| {
        Ok(query_all(
          conn,
          &format!(
            "SELECT {CONCLUSION_COLUMNS} FROM conclusions
             WHERE deduction_id = ?1
             ORDER BY rowid"
          ),
          rusqlite::params![deduction_str],
          RawConclusion::from_row,
        )?)
      })
      .await?;

    raws.into_iter().map(RawConclusion::into_conclusion).collect()
  }

  async fn set_conclusion_status(
    &self,
    id: Uuid,
    status: ConclusionStatus,
  ) -> Result<Option<Conclusion>> {
    let id_str     = encode_uuid(id);
    let status_str = status.to_string();

    let raw: Option<RawConclusion> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE conclusions SET status = ?2 WHERE conclusion_id = ?1",
          rusqlite::params![id_str, status_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CONCLUSION_COLUMNS} FROM conclusions WHERE conclusion_id = ?1"
              ),
              rusqlite::params![id_str],
              RawConclusion::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawConclusion::into_conclusion).transpose()
  }

  // ── Links ─────────────────────────────────────────────────────────────────

  async fn add_link(&self, input: NewLink) -> Result<(ConclusionLink, Option<Artefact>)> {
    let (target_id, created) = match input.target {
      LinkTarget::Existing(id) => (id, None),
      LinkTarget::Create(new) => {
        let artefact = build_artefact(new);
        (artefact.artefact_id, Some(artefact))
      }
    };

    let link = ConclusionLink {
      link_id: Uuid::new_v4(),
      conclusion_id: input.conclusion_id,
      target_kind: input.target_kind,
      target_id,
      created_at: Utc::now(),
    };

    let artefact_row   = created.as_ref().map(ArtefactRow::encode).transpose()?;
    let link_str       = encode_uuid(link.link_id);
    let conclusion_str = encode_uuid(link.conclusion_id);
    let kind_str       = link.target_kind.as_ref().to_owned();
    let target_str     = encode_uuid(link.target_id);
    let at_str         = encode_dt(link.created_at);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(row) = &artefact_row {
          row.insert(&tx)?;
        }
        tx.execute(
          "INSERT INTO conclusion_links (
             link_id, conclusion_id, target_kind, target_id, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![link_str, conclusion_str, kind_str, target_str, at_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok((link, created))
  }

  async fn list_links(&self, conclusion_id: Uuid) -> Result<Vec<ConclusionLink>> {
    let conclusion_str = encode_uuid(conclusion_id);

    let raws: Vec<RawLink> = self
      .conn
      .call(move |conn| {
        Ok(query_all(
          conn,
          &format!(
            "SELECT {LINK_COLUMNS} FROM conclusion_links
             WHERE conclusion_id = ?1
             ORDER BY rowid"
          ),
          rusqlite::params![conclusion_str],
          RawLink::from_row,
        )?)
      })
      .await?;

    raws.into_iter().map(RawLink::into_link).collect()
  }

  // ── Artefacts ─────────────────────────────────────────────────────────────

  async fn add_artefact(&self, input: NewArtefact) -> Result<Artefact> {
    let artefact = build_artefact(input);
    let row = ArtefactRow::encode(&artefact)?;

    self
      .conn
      .call(move |conn| {
        row.insert(conn)?;
        Ok(())
      })
      .await?;

    Ok(artefact)
  }

  async fn get_artefact(&self, kind: TargetKind, id: Uuid) -> Result<Option<Artefact>> {
    let id_str   = encode_uuid(id);
    let kind_str = kind.as_ref().to_owned();

    let raw: Option<RawArtefact> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ARTEFACT_COLUMNS} FROM artefacts
                 WHERE artefact_id = ?1 AND kind = ?2"
              ),
              rusqlite::params![id_str, kind_str],
              RawArtefact::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawArtefact::into_artefact).transpose()
  }

  async fn list_artefacts(
    &self,
    plan_id: Uuid,
    kind: Option<TargetKind>,
  ) -> Result<Vec<Artefact>> {
    let plan_str = encode_uuid(plan_id);
    let kind_str = kind.map(|k| k.as_ref().to_owned());

    let raws: Vec<RawArtefact> = self
      .conn
      .call(move |conn| {
        Ok(query_all(
          conn,
          &format!(
            "SELECT {ARTEFACT_COLUMNS} FROM artefacts
             WHERE plan_id = ?1 AND (?2 IS NULL OR kind = ?2)
             ORDER BY rowid"
          ),
          rusqlite::params![plan_str, kind_str],
          RawArtefact::from_row,
        )?)
      })
      .await?;

    raws.into_iter().map(RawArtefact::into_artefact).collect()
  }

  async fn delete_artefact(&self, kind: TargetKind, id: Uuid) -> Result<bool> {
    let id_str   = encode_uuid(id);
    let kind_str = kind.as_ref().to_owned();

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM artefacts WHERE artefact_id = ?1 AND kind = ?2",
          rusqlite::params![id_str, kind_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  // ── Cascades ──────────────────────────────────────────────────────────────

  /// Foreign keys reject the transaction if a child outside `plan` still
  /// points at a removed parent.
  async fn delete_cascade(&self, plan: CascadeDelete) -> Result<CascadeOutcome> {
    let statements: Vec<_> = plan
      .ordered()
      .into_iter()
      .map(|node| (node, delete_statement(node)))
      .collect();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for (node, (sql, id)) in &statements {
          // Dropping the transaction uncommitted rolls back earlier deletes.
          if tx.execute(sql, rusqlite::params![id])? != 1 {
            return Ok(CascadeOutcome::Missing(*node));
          }
        }
        tx.commit()?;
        Ok(CascadeOutcome::Applied)
      })
      .await?;

    Ok(outcome)
  }
}
