//! [`SqliteStore`] — the SQLite implementation of [`PointsStore`].

use std::{collections::HashMap, path::Path};

use acad_core::{
  account::{Account, AccountCounts, AccountKind, AccountStatus, NewAccount, Role},
  gate::ensure_can_submit,
  policy::PointsPolicy,
  report::StatusCounts,
  review::check_transition,
  store::PointsStore,
  submission::{
    Category, Decision, NewSubmission, Review, Submission, SubmissionStatus,
    SubmissionWithStudent,
  },
};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    ACCOUNT_COLUMNS, ACCOUNT_WIDTH, RawAccount, RawListing, RawSubmission,
    SUBMISSION_COLUMNS, encode_account_status, encode_category, encode_dt,
    encode_role, encode_submission_status, encode_uuid, decode_role,
    decode_submission_status, decode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An activity-point store backed by a single SQLite file.
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

  /// Open an in-memory store — useful for testing.
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

  /// Insert an account inside an IMMEDIATE transaction. With `first_admin`
  /// set, the insert only happens while no admin account exists.
  async fn insert_account(&self, input: NewAccount, first_admin: bool) -> Result<Account> {
    let now = Utc::now();
    let account = Account {
      account_id:  Uuid::new_v4(),
      external_id: input.external_id.trim().to_owned(),
      name:        input.name.trim().to_owned(),
      department:  input.department,
      kind:        input.kind,
      status:      AccountStatus::Active,
      created_at:  now,
      updated_at:  now,
    };

    let role = account.role();
    let (semester, institution) = match &account.kind {
      AccountKind::Student { semester } => (semester.map(i64::from), None),
      AccountKind::Faculty => (None, None),
      AccountKind::Admin { institution } => (None, institution.clone()),
    };
    let id_str      = encode_uuid(account.account_id);
    let role_str    = encode_role(role);
    let external_id = account.external_id.clone();
    let name        = account.name.clone();
    let department  = account.department.clone();
    let status_str  = encode_account_status(account.status);
    let at_str      = encode_dt(now);
    let hash        = input.password_hash;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if first_admin {
          let admin_exists = tx
            .query_row("SELECT 1 FROM accounts WHERE role = 'admin' LIMIT 1", [], |_| {
              Ok(true)
            })
            .optional()?
            .unwrap_or(false);
          if admin_exists {
            return Ok(Err(acad_core::Error::AdminExists));
          }
        }
        let taken = tx
          .query_row(
            "SELECT 1 FROM accounts WHERE role = ?1 AND external_id = ?2",
            rusqlite::params![role_str, external_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(Err(acad_core::Error::AccountExists { role, external_id }));
        }
        tx.execute(
          "INSERT INTO accounts (
             account_id, role, external_id, name, department, semester,
             institution, status, password_hash, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
          rusqlite::params![
            id_str,
            role_str,
            external_id,
            name,
            department,
            semester,
            institution,
            status_str,
            hash,
            at_str,
          ],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;

    tracing::info!(account = %account.account_id, %role, "account registered");
    Ok(account)
  }
}

// ─── Blocking helpers (run on the connection thread) ─────────────────────────

fn load_account(conn: &rusqlite::Connection, id: &str) -> Result<Option<Account>> {
  let raw = conn
    .query_row(
      &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts a WHERE a.account_id = ?1"),
      rusqlite::params![id],
      |row| RawAccount::from_row(row, 0),
    )
    .optional()?;
  raw.map(RawAccount::into_account).transpose()
}

fn load_submission(
  conn: &rusqlite::Connection,
  id: &str,
) -> Result<Option<Submission>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions s WHERE s.submission_id = ?1"
      ),
      rusqlite::params![id],
      |row| RawSubmission::from_row(row, 0),
    )
    .optional()?;
  raw.map(RawSubmission::into_submission).transpose()
}

fn sum_approved(
  conn: &rusqlite::Connection,
  student_id: &str,
  category: &str,
  excluding: Option<&str>,
) -> Result<u32> {
  let sum: i64 = conn.query_row(
    "SELECT COALESCE(SUM(points), 0) FROM submissions
     WHERE student_id = ?1
       AND category   = ?2
       AND status     = 'Approved'
       AND (?3 IS NULL OR submission_id != ?3)",
    rusqlite::params![student_id, category, excluding],
    |r| r.get(0),
  )?;
  Ok(u32::try_from(sum).unwrap_or(u32::MAX))
}

fn list_joined(
  conn: &rusqlite::Connection,
  filter: &str,
  order: &str,
) -> Result<Vec<RawListing>> {
  let sql = format!(
    "SELECT {SUBMISSION_COLUMNS}, {ACCOUNT_COLUMNS}
     FROM submissions s
     JOIN accounts a ON a.account_id = s.student_id
     {filter}
     ORDER BY s.created_at {order}, s.rowid {order}"
  );
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map([], RawListing::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// The review transition: every check and the update run against the same
/// transaction, so the approved sum cannot change underneath the cap check.
fn commit_review(
  conn: &rusqlite::Connection,
  review: &Review,
  policy: &PointsPolicy,
  now: DateTime<Utc>,
) -> Result<Submission> {
  let submission_id = encode_uuid(review.submission_id);
  let submission = load_submission(conn, &submission_id)?
    .ok_or(acad_core::Error::SubmissionNotFound(review.submission_id))?;
  let reviewer = load_account(conn, &encode_uuid(review.reviewer_id))?
    .ok_or(acad_core::Error::AccountNotFound(review.reviewer_id))?;

  check_transition(&submission, &reviewer)?;

  if let Decision::Approve { points } = review.decision {
    let already = sum_approved(
      conn,
      &encode_uuid(submission.student_id),
      encode_category(submission.category),
      Some(&submission_id),
    )?;
    policy.admit(submission.category, already, points)?;
  }

  let status = review.decision.status();
  let points = review.decision.points();
  let changed = conn.execute(
    "UPDATE submissions
     SET status = ?1, points = ?2, reviewer_id = ?3, remarks = ?4, updated_at = ?5
     WHERE submission_id = ?6 AND status = 'Pending'",
    rusqlite::params![
      encode_submission_status(status),
      points,
      encode_uuid(review.reviewer_id),
      review.remarks,
      encode_dt(now),
      submission_id,
    ],
  )?;
  if changed != 1 {
    return Err(acad_core::Error::AlreadyReviewed(review.submission_id).into());
  }

  Ok(Submission {
    points,
    status,
    reviewer_id: Some(review.reviewer_id),
    remarks: review.remarks.clone(),
    updated_at: now,
    ..submission
  })
}

// ─── PointsStore impl ────────────────────────────────────────────────────────

impl PointsStore for SqliteStore {
  type Error = crate::Error;

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn create_account(&self, input: NewAccount) -> Result<Account> {
    self.insert_account(input, false).await
  }

  async fn create_first_admin(&self, input: NewAccount) -> Result<Account> {
    self.insert_account(input, true).await
  }

  async fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| Ok(load_account(conn, &id_str)))
      .await?
  }

  async fn find_credentials(
    &self,
    role: Role,
    external_id: &str,
  ) -> Result<Option<(Account, String)>> {
    let role_str    = encode_role(role);
    let external_id = external_id.trim().to_owned();

    let raw: Option<(RawAccount, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ACCOUNT_COLUMNS}, a.password_hash FROM accounts a
                 WHERE a.role = ?1 AND a.external_id = ?2"
              ),
              rusqlite::params![role_str, external_id],
              |row| Ok((RawAccount::from_row(row, 0)?, row.get(ACCOUNT_WIDTH)?)),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(account, hash)| Ok((account.into_account()?, hash)))
      .transpose()
  }

  async fn list_accounts(
    &self,
    role: Role,
    department: Option<String>,
  ) -> Result<Vec<Account>> {
    let role_str = encode_role(role);

    let raws: Vec<RawAccount> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ACCOUNT_COLUMNS} FROM accounts a
           WHERE a.role = ?1 AND (?2 IS NULL OR a.department = ?2)
           ORDER BY a.name, a.external_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![role_str, department], |row| {
            RawAccount::from_row(row, 0)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAccount::into_account).collect()
  }

  async fn set_account_status(
    &self,
    id: Uuid,
    status: AccountStatus,
  ) -> Result<Account> {
    let id_str     = encode_uuid(id);
    let status_str = encode_account_status(status);
    let at_str     = encode_dt(Utc::now());

    let account = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
          "UPDATE accounts SET status = ?1, updated_at = ?2 WHERE account_id = ?3",
          rusqlite::params![status_str, at_str, id_str],
        )?;
        if changed == 0 {
          return Ok(Err(crate::Error::from(acad_core::Error::AccountNotFound(id))));
        }
        let account = load_account(&tx, &id_str);
        tx.commit()?;
        Ok(account)
      })
      .await??
      .ok_or(acad_core::Error::AccountNotFound(id))?;

    tracing::info!(account = %id, %status, "account status changed");
    Ok(account)
  }

  async fn count_accounts(&self) -> Result<AccountCounts> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT role, COUNT(*) FROM accounts GROUP BY role")?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut counts = AccountCounts::default();
    for (role, n) in rows {
      let n = u64::try_from(n).unwrap_or(0);
      match decode_role(&role)? {
        Role::Student => counts.students = n,
        Role::Faculty => counts.faculty = n,
        Role::Admin => {}
      }
    }
    Ok(counts)
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(
    &self,
    account_id: Uuid,
    token_digest: String,
    expires_at: DateTime<Utc>,
  ) -> Result<()> {
    let id_str      = encode_uuid(account_id);
    let at_str      = encode_dt(Utc::now());
    let expires_str = encode_dt(expires_at);

    let purged = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let purged = tx.execute(
          "DELETE FROM sessions WHERE expires_at <= ?1",
          rusqlite::params![at_str],
        )?;
        tx.execute(
          "INSERT INTO sessions (token_digest, account_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![token_digest, id_str, at_str, expires_str],
        )?;
        tx.commit()?;
        Ok(purged)
      })
      .await?;

    if purged > 0 {
      tracing::debug!(purged, "expired sessions removed");
    }
    Ok(())
  }

  async fn resolve_session(&self, token_digest: String) -> Result<Option<Account>> {
    let now_str = encode_dt(Utc::now());

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ACCOUNT_COLUMNS} FROM sessions se
                 JOIN accounts a ON a.account_id = se.account_id
                 WHERE se.token_digest = ?1 AND se.expires_at > ?2"
              ),
              rusqlite::params![token_digest, now_str],
              |row| RawAccount::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn delete_session(&self, token_digest: String) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE token_digest = ?1",
          rusqlite::params![token_digest],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }

  // ── Submissions — writes ──────────────────────────────────────────────────

  async fn create_submission(&self, input: NewSubmission) -> Result<Submission> {
    let now = Utc::now();
    let submission = Submission {
      submission_id: Uuid::new_v4(),
      student_id:    input.student_id,
      category:      input.category,
      activity_type: input.activity_type,
      title:         input.title,
      description:   input.description,
      points:        None,
      status:        SubmissionStatus::Pending,
      reviewer_id:   None,
      remarks:       None,
      artifact:      input.artifact,
      created_at:    now,
      updated_at:    now,
    };

    let s = submission.clone();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let student_id = encode_uuid(s.student_id);
        let student = match load_account(&tx, &student_id) {
          Ok(Some(a)) => a,
          Ok(None) => {
            return Ok(Err(crate::Error::from(acad_core::Error::AccountNotFound(
              s.student_id,
            ))));
          }
          Err(e) => return Ok(Err(e)),
        };
        if let Err(e) = ensure_can_submit(&student) {
          return Ok(Err(crate::Error::from(e)));
        }

        let at_str = encode_dt(s.created_at);
        tx.execute(
          "INSERT INTO submissions (
             submission_id, student_id, category, activity_type, title,
             description, points, status, reviewer_id, remarks,
             file_name, original_name, media_type, file_size, sha256,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, NULL, NULL,
                     ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
          rusqlite::params![
            encode_uuid(s.submission_id),
            student_id,
            encode_category(s.category),
            s.activity_type,
            s.title,
            s.description,
            encode_submission_status(s.status),
            s.artifact.file_name,
            s.artifact.original_name,
            s.artifact.media_type,
            i64::try_from(s.artifact.size).unwrap_or(i64::MAX),
            s.artifact.sha256,
            at_str,
          ],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;

    Ok(submission)
  }

  async fn review(&self, review: Review, policy: PointsPolicy) -> Result<Submission> {
    let now = Utc::now();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match commit_review(&tx, &review, &policy, now) {
          Ok(submission) => {
            tx.commit()?;
            Ok(Ok(submission))
          }
          // Dropping the transaction rolls it back.
          Err(e) => Ok(Err(e)),
        }
      })
      .await?
  }

  // ── Submissions — reads ───────────────────────────────────────────────────

  async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| Ok(load_submission(conn, &id_str)))
      .await?
  }

  async fn list_for_student(&self, student_id: Uuid) -> Result<Vec<Submission>> {
    let id_str = encode_uuid(student_id);

    let raws: Vec<RawSubmission> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBMISSION_COLUMNS} FROM submissions s
           WHERE s.student_id = ?1
           ORDER BY s.created_at DESC, s.rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| RawSubmission::from_row(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    tracing::debug!(student = %student_id, count = raws.len(), "listed submissions");
    raws.into_iter().map(RawSubmission::into_submission).collect()
  }

  async fn list_pending(&self) -> Result<Vec<SubmissionWithStudent>> {
    let raws = self
      .conn
      .call(|conn| Ok(list_joined(conn, "WHERE s.status = 'Pending'", "ASC")))
      .await??;
    tracing::debug!(count = raws.len(), "listed pending queue");
    raws.into_iter().map(RawListing::into_listing).collect()
  }

  async fn list_all(&self) -> Result<Vec<SubmissionWithStudent>> {
    let raws = self
      .conn
      .call(|conn| Ok(list_joined(conn, "", "DESC")))
      .await??;
    raws.into_iter().map(RawListing::into_listing).collect()
  }

  async fn approved_points(
    &self,
    student_id: Uuid,
    category: Category,
    excluding: Option<Uuid>,
  ) -> Result<u32> {
    let student_str   = encode_uuid(student_id);
    let category_str  = encode_category(category);
    let excluding_str = excluding.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        Ok(sum_approved(
          conn,
          &student_str,
          category_str,
          excluding_str.as_deref(),
        ))
      })
      .await?
  }

  async fn approved_points_by_student(&self) -> Result<HashMap<Uuid, u32>> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT student_id, SUM(points) FROM submissions
           WHERE status = 'Approved'
           GROUP BY student_id",
        )?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(id, sum)| Ok((decode_uuid(&id)?, u32::try_from(sum).unwrap_or(u32::MAX))))
      .collect()
  }

  async fn status_counts(&self) -> Result<StatusCounts> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT status, COUNT(*) FROM submissions GROUP BY status")?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut counts = StatusCounts::default();
    for (status, n) in rows {
      let n = u64::try_from(n).unwrap_or(0);
      match decode_submission_status(&status)? {
        SubmissionStatus::Pending => counts.pending = n,
        SubmissionStatus::Approved => counts.approved = n,
        SubmissionStatus::Rejected => counts.rejected = n,
      }
    }
    Ok(counts)
  }
}
