//! Integration tests for `SqliteStore` against an in-memory database.

use acad_core::{
  account::{Account, AccountKind, AccountStatus, NewAccount, Role},
  policy::PointsPolicy,
  report,
  store::PointsStore,
  submission::{
    ArtifactRef, Category, Decision, NewSubmission, Review, Submission,
    SubmissionStatus,
  },
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn domain(e: Error) -> acad_core::Error { e.into() }

async fn student(s: &SqliteStore, register_number: &str) -> Account {
  s.create_account(NewAccount {
    external_id:   register_number.into(),
    name:          "Asha Rao".into(),
    department:    Some("CSE".into()),
    kind:          AccountKind::Student { semester: Some(5) },
    password_hash: "hash".into(),
  })
  .await
  .unwrap()
}

async fn faculty(s: &SqliteStore, faculty_id: &str) -> Account {
  s.create_account(NewAccount {
    external_id:   faculty_id.into(),
    name:          "Meera Nair".into(),
    department:    Some("CSE".into()),
    kind:          AccountKind::Faculty,
    password_hash: "hash".into(),
  })
  .await
  .unwrap()
}

fn artifact() -> ArtifactRef {
  ArtifactRef {
    file_name:     format!("{}.pdf", Uuid::new_v4()),
    original_name: "certificate.pdf".into(),
    media_type:    "application/pdf".into(),
    size:          2048,
    sha256:        "00".repeat(32),
  }
}

async fn submit(s: &SqliteStore, student: &Account, category: Category) -> Submission {
  s.create_submission(NewSubmission {
    student_id:    student.account_id,
    category,
    activity_type: "Workshop".into(),
    title:         "Rust workshop".into(),
    description:   String::new(),
    artifact:      artifact(),
  })
  .await
  .unwrap()
}

fn approve(submission: &Submission, reviewer: &Account, points: u32) -> Review {
  Review {
    submission_id: submission.submission_id,
    reviewer_id:   reviewer.account_id,
    decision:      Decision::Approve { points },
    remarks:       None,
  }
}

fn reject(submission: &Submission, reviewer: &Account) -> Review {
  Review {
    submission_id: submission.submission_id,
    reviewer_id:   reviewer.account_id,
    decision:      Decision::Reject,
    remarks:       Some("illegible".into()),
  }
}

/// Submit and approve in one go.
async fn approved(
  s: &SqliteStore,
  student: &Account,
  reviewer: &Account,
  category: Category,
  points: u32,
) -> Submission {
  let sub = submit(s, student, category).await;
  s.review(approve(&sub, reviewer, points), PointsPolicy::default())
    .await
    .unwrap()
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_account() {
  let s = store().await;
  let a = student(&s, "21CS001").await;
  assert_eq!(a.role(), Role::Student);
  assert!(a.is_active());

  let fetched = s.get_account(a.account_id).await.unwrap().unwrap();
  assert_eq!(fetched.external_id, "21CS001");
  assert_eq!(fetched.kind, AccountKind::Student { semester: Some(5) });

  assert!(s.get_account(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_external_id_rejected_per_role() {
  let s = store().await;
  student(&s, "X1").await;

  let err = s
    .create_account(NewAccount {
      external_id:   "X1".into(),
      name:          "Other".into(),
      department:    None,
      kind:          AccountKind::Student { semester: None },
      password_hash: "h".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(domain(err), acad_core::Error::AccountExists { role: Role::Student, .. }));

  // The same identifier is free for a different role.
  faculty(&s, "X1").await;
}

#[tokio::test]
async fn credentials_lookup() {
  let s = store().await;
  let a = faculty(&s, "F100").await;

  let (found, hash) = s
    .find_credentials(Role::Faculty, "F100")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.account_id, a.account_id);
  assert_eq!(hash, "hash");

  assert!(s.find_credentials(Role::Student, "F100").await.unwrap().is_none());
}

#[tokio::test]
async fn list_and_count_accounts() {
  let s = store().await;
  student(&s, "S1").await;
  student(&s, "S2").await;
  faculty(&s, "F1").await;
  s.create_account(NewAccount {
    external_id:   "S3".into(),
    name:          "Ravi".into(),
    department:    Some("ECE".into()),
    kind:          AccountKind::Student { semester: None },
    password_hash: "h".into(),
  })
  .await
  .unwrap();

  assert_eq!(s.list_accounts(Role::Student, None).await.unwrap().len(), 3);
  let cse = s
    .list_accounts(Role::Student, Some("CSE".into()))
    .await
    .unwrap();
  assert_eq!(cse.len(), 2);

  let counts = s.count_accounts().await.unwrap();
  assert_eq!(counts.students, 3);
  assert_eq!(counts.faculty, 1);
}

#[tokio::test]
async fn toggle_status() {
  let s = store().await;
  let a = student(&s, "S1").await;

  let disabled = s
    .set_account_status(a.account_id, AccountStatus::Disabled)
    .await
    .unwrap();
  assert_eq!(disabled.status, AccountStatus::Disabled);

  let enabled = s
    .set_account_status(a.account_id, AccountStatus::Active)
    .await
    .unwrap();
  assert!(enabled.is_active());

  let err = s
    .set_account_status(Uuid::new_v4(), AccountStatus::Disabled)
    .await
    .unwrap_err();
  assert!(matches!(domain(err), acad_core::Error::AccountNotFound(_)));
}

#[tokio::test]
async fn sessions_resolve_to_account() {
  let s = store().await;
  let a = student(&s, "S1").await;
  s.create_session(a.account_id, "digest".into(), Utc::now() + Duration::hours(1))
    .await
    .unwrap();

  let resolved = s.resolve_session("digest".into()).await.unwrap().unwrap();
  assert_eq!(resolved.account_id, a.account_id);
  assert!(s.resolve_session("other".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn expired_sessions_do_not_resolve() {
  let s = store().await;
  let a = student(&s, "S1").await;
  s.create_session(a.account_id, "stale".into(), Utc::now() - Duration::minutes(1))
    .await
    .unwrap();
  assert!(s.resolve_session("stale".into()).await.unwrap().is_none());

  // Issuing a new session purges the expired row.
  s.create_session(a.account_id, "fresh".into(), Utc::now() + Duration::hours(1))
    .await
    .unwrap();
  assert!(!s.delete_session("stale".into()).await.unwrap());
}

#[tokio::test]
async fn deleted_session_stops_resolving() {
  let s = store().await;
  let a = student(&s, "S1").await;
  s.create_session(a.account_id, "digest".into(), Utc::now() + Duration::hours(1))
    .await
    .unwrap();

  assert!(s.delete_session("digest".into()).await.unwrap());
  assert!(s.resolve_session("digest".into()).await.unwrap().is_none());
  assert!(!s.delete_session("digest".into()).await.unwrap());
}

// ─── First admin ─────────────────────────────────────────────────────────────

fn new_admin(username: &str) -> NewAccount {
  NewAccount {
    external_id:   username.into(),
    name:          username.into(),
    department:    None,
    kind:          AccountKind::Admin { institution: None },
    password_hash: "hash".into(),
  }
}

#[tokio::test]
async fn first_admin_only_once() {
  let s = store().await;
  let root = s.create_first_admin(new_admin("root")).await.unwrap();
  assert_eq!(root.role(), Role::Admin);

  let err = s.create_first_admin(new_admin("other")).await.unwrap_err();
  assert!(matches!(domain(err), acad_core::Error::AdminExists));

  // The regular path is unaffected.
  s.create_account(new_admin("other")).await.unwrap();
  assert_eq!(s.list_accounts(Role::Admin, None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn concurrent_first_admins_cannot_both_pass() {
  let s = store().await;

  let (s1, s2) = (s.clone(), s.clone());
  let (left, right) = tokio::join!(
    tokio::spawn(async move { s1.create_first_admin(new_admin("root1")).await }),
    tokio::spawn(async move { s2.create_first_admin(new_admin("root2")).await }),
  );
  let results = [left.unwrap(), right.unwrap()];

  assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
  let failure = results.into_iter().find_map(Result::err).unwrap();
  assert!(matches!(domain(failure), acad_core::Error::AdminExists));
  assert_eq!(s.list_accounts(Role::Admin, None).await.unwrap().len(), 1);
}

// ─── Submission gate ─────────────────────────────────────────────────────────

#[tokio::test]
async fn submission_starts_pending() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let sub = submit(&s, &a, Category::GroupII).await;

  assert_eq!(sub.status, SubmissionStatus::Pending);
  assert_eq!(sub.points, None);
  assert_eq!(sub.reviewer_id, None);

  let fetched = s.get_submission(sub.submission_id).await.unwrap().unwrap();
  assert_eq!(fetched.category, Category::GroupII);
  assert_eq!(fetched.artifact, sub.artifact);
}

#[tokio::test]
async fn disabled_student_cannot_submit() {
  let s = store().await;
  let a = student(&s, "S1").await;
  s.set_account_status(a.account_id, AccountStatus::Disabled)
    .await
    .unwrap();

  let err = s
    .create_submission(NewSubmission {
      student_id:    a.account_id,
      category:      Category::GroupI,
      activity_type: "Sports".into(),
      title:         "Marathon".into(),
      description:   String::new(),
      artifact:      artifact(),
    })
    .await
    .unwrap_err();
  assert!(matches!(domain(err), acad_core::Error::AccountDisabled(id) if id == a.account_id));
  assert!(s.list_for_student(a.account_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn faculty_cannot_own_submission() {
  let s = store().await;
  let f = faculty(&s, "F1").await;
  let err = s
    .create_submission(NewSubmission {
      student_id:    f.account_id,
      category:      Category::GroupI,
      activity_type: "Sports".into(),
      title:         "Marathon".into(),
      description:   String::new(),
      artifact:      artifact(),
    })
    .await
    .unwrap_err();
  assert!(matches!(domain(err), acad_core::Error::NotAStudent(_)));
}

// ─── Review engine ───────────────────────────────────────────────────────────

#[tokio::test]
async fn approve_records_points_and_reviewer() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let f = faculty(&s, "F1").await;
  let sub = submit(&s, &a, Category::GroupI).await;

  let mut review = approve(&sub, &f, 12);
  review.remarks = Some("good".into());
  let done = s.review(review, PointsPolicy::default()).await.unwrap();

  assert_eq!(done.status, SubmissionStatus::Approved);
  assert_eq!(done.points, Some(12));
  assert_eq!(done.reviewer_id, Some(f.account_id));
  assert_eq!(done.remarks.as_deref(), Some("good"));

  let stored = s.get_submission(sub.submission_id).await.unwrap().unwrap();
  assert_eq!(stored.points, Some(12));
  assert_eq!(stored.status, SubmissionStatus::Approved);
}

#[tokio::test]
async fn second_rejection_is_already_reviewed() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let f = faculty(&s, "F1").await;
  let sub = submit(&s, &a, Category::GroupI).await;

  let first = s.review(reject(&sub, &f), PointsPolicy::default()).await.unwrap();
  assert_eq!(first.status, SubmissionStatus::Rejected);
  assert_eq!(first.points, None);

  let err = s
    .review(reject(&sub, &f), PointsPolicy::default())
    .await
    .unwrap_err();
  assert!(matches!(domain(err), acad_core::Error::AlreadyReviewed(id) if id == sub.submission_id));

  let stored = s.get_submission(sub.submission_id).await.unwrap().unwrap();
  assert_eq!(stored.status, SubmissionStatus::Rejected);
  assert_eq!(stored.remarks.as_deref(), Some("illegible"));
}

#[tokio::test]
async fn approved_submission_cannot_be_reapproved() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let f = faculty(&s, "F1").await;
  let sub = approved(&s, &a, &f, Category::GroupI, 10).await;

  let err = s
    .review(approve(&sub, &f, 40), PointsPolicy::default())
    .await
    .unwrap_err();
  assert!(matches!(domain(err), acad_core::Error::AlreadyReviewed(_)));
  let stored = s.get_submission(sub.submission_id).await.unwrap().unwrap();
  assert_eq!(stored.points, Some(10));
}

#[tokio::test]
async fn cap_exceeded_reports_remaining() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let f = faculty(&s, "F1").await;
  approved(&s, &a, &f, Category::GroupI, 25).await;

  let sub = submit(&s, &a, Category::GroupI).await;
  let err = s
    .review(approve(&sub, &f, 20), PointsPolicy::default())
    .await
    .unwrap_err();
  assert!(matches!(
    domain(err),
    acad_core::Error::CategoryCapExceeded { category: Category::GroupI, remaining: 15 }
  ));

  // Nothing changed.
  let stored = s.get_submission(sub.submission_id).await.unwrap().unwrap();
  assert_eq!(stored.status, SubmissionStatus::Pending);
  assert_eq!(stored.points, None);
}

#[tokio::test]
async fn cap_boundary() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let f = faculty(&s, "F1").await;
  approved(&s, &a, &f, Category::GroupIII, 30).await;
  approved(&s, &a, &f, Category::GroupIII, 10).await;

  let sub = submit(&s, &a, Category::GroupIII).await;
  let err = s
    .review(approve(&sub, &f, 1), PointsPolicy::default())
    .await
    .unwrap_err();
  assert!(matches!(
    domain(err),
    acad_core::Error::CategoryCapExceeded { remaining: 0, .. }
  ));

  // Other categories are capped independently.
  approved(&s, &a, &f, Category::GroupI, 40).await;
}

#[tokio::test]
async fn cap_is_per_student() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let b = student(&s, "S2").await;
  let f = faculty(&s, "F1").await;
  approved(&s, &a, &f, Category::GroupII, 40).await;
  approved(&s, &b, &f, Category::GroupII, 40).await;
}

#[tokio::test]
async fn rejection_skips_cap_check() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let f = faculty(&s, "F1").await;
  approved(&s, &a, &f, Category::GroupI, 40).await;

  let sub = submit(&s, &a, Category::GroupI).await;
  let done = s.review(reject(&sub, &f), PointsPolicy::default()).await.unwrap();
  assert_eq!(done.status, SubmissionStatus::Rejected);
}

#[tokio::test]
async fn disabled_reviewer_refused() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let f = faculty(&s, "F1").await;
  let sub = submit(&s, &a, Category::GroupI).await;
  s.set_account_status(f.account_id, AccountStatus::Disabled)
    .await
    .unwrap();

  let err = s
    .review(approve(&sub, &f, 5), PointsPolicy::default())
    .await
    .unwrap_err();
  assert!(matches!(domain(err), acad_core::Error::AccountDisabled(id) if id == f.account_id));
  let stored = s.get_submission(sub.submission_id).await.unwrap().unwrap();
  assert_eq!(stored.status, SubmissionStatus::Pending);
}

#[tokio::test]
async fn student_cannot_review() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let sub = submit(&s, &a, Category::GroupI).await;
  let err = s
    .review(approve(&sub, &a, 5), PointsPolicy::default())
    .await
    .unwrap_err();
  assert!(matches!(domain(err), acad_core::Error::NotAReviewer(_)));
}

#[tokio::test]
async fn unknown_submission() {
  let s = store().await;
  let f = faculty(&s, "F1").await;
  let err = s
    .review(
      Review {
        submission_id: Uuid::new_v4(),
        reviewer_id:   f.account_id,
        decision:      Decision::Reject,
        remarks:       None,
      },
      PointsPolicy::default(),
    )
    .await
    .unwrap_err();
  assert!(matches!(domain(err), acad_core::Error::SubmissionNotFound(_)));
}

#[tokio::test]
async fn concurrent_approvals_cannot_both_pass() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let f1 = faculty(&s, "F1").await;
  let f2 = faculty(&s, "F2").await;
  let x = submit(&s, &a, Category::GroupI).await;
  let y = submit(&s, &a, Category::GroupI).await;

  let (s1, s2) = (s.clone(), s.clone());
  let (r1, r2) = (approve(&x, &f1, 25), approve(&y, &f2, 20));
  let (left, right) = tokio::join!(
    tokio::spawn(async move { s1.review(r1, PointsPolicy::default()).await }),
    tokio::spawn(async move { s2.review(r2, PointsPolicy::default()).await }),
  );
  let results = [left.unwrap(), right.unwrap()];

  assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
  let failure = results.into_iter().find_map(Result::err).unwrap();
  assert!(matches!(domain(failure), acad_core::Error::CategoryCapExceeded { .. }));

  let total = s.approved_points(a.account_id, Category::GroupI, None).await.unwrap();
  assert!(total <= 40);
}

#[tokio::test]
async fn cap_invariant_holds_over_a_backlog() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let f = faculty(&s, "F1").await;

  let mut handles = Vec::new();
  for points in [7, 13, 9, 22, 4, 18, 1, 6, 11, 3] {
    let sub = submit(&s, &a, Category::GroupII).await;
    let store = s.clone();
    let review = approve(&sub, &f, points);
    handles.push(tokio::spawn(async move {
      store.review(review, PointsPolicy::default()).await
    }));
  }
  for h in handles {
    let _ = h.await.unwrap();
  }

  let total = s.approved_points(a.account_id, Category::GroupII, None).await.unwrap();
  assert!(total <= 40, "approved total {total} exceeds the cap");
  let approved_sum: u32 = s
    .list_for_student(a.account_id)
    .await
    .unwrap()
    .iter()
    .filter(|s| s.status == SubmissionStatus::Approved)
    .filter_map(|s| s.points)
    .sum();
  assert_eq!(approved_sum, total);
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pending_queue_is_oldest_first() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let b = student(&s, "S2").await;
  let f = faculty(&s, "F1").await;
  let first = submit(&s, &a, Category::GroupI).await;
  let second = submit(&s, &b, Category::GroupII).await;
  let third = submit(&s, &a, Category::GroupIII).await;
  s.review(reject(&second, &f), PointsPolicy::default()).await.unwrap();

  let pending = s.list_pending().await.unwrap();
  let ids: Vec<_> = pending.iter().map(|p| p.submission.submission_id).collect();
  assert_eq!(ids, vec![first.submission_id, third.submission_id]);
  assert_eq!(pending[0].student.register_number, "S1");
  assert_eq!(pending[0].student.semester, Some(5));
}

#[tokio::test]
async fn student_listing_is_newest_first() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let older = submit(&s, &a, Category::GroupI).await;
  let newer = submit(&s, &a, Category::GroupI).await;

  let list = s.list_for_student(a.account_id).await.unwrap();
  assert_eq!(list.len(), 2);
  assert_eq!(list[0].submission_id, newer.submission_id);
  assert_eq!(list[1].submission_id, older.submission_id);

  assert_eq!(s.list_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn approved_points_query() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let f = faculty(&s, "F1").await;
  let x = approved(&s, &a, &f, Category::GroupI, 10).await;
  approved(&s, &a, &f, Category::GroupI, 5).await;
  approved(&s, &a, &f, Category::GroupII, 8).await;

  assert_eq!(s.approved_points(a.account_id, Category::GroupI, None).await.unwrap(), 15);
  assert_eq!(
    s.approved_points(a.account_id, Category::GroupI, Some(x.submission_id))
      .await
      .unwrap(),
    5
  );

  let by_student = s.approved_points_by_student().await.unwrap();
  assert_eq!(by_student.get(&a.account_id), Some(&23));
}

#[tokio::test]
async fn status_counts() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let f = faculty(&s, "F1").await;
  approved(&s, &a, &f, Category::GroupI, 10).await;
  let r = submit(&s, &a, Category::GroupI).await;
  s.review(reject(&r, &f), PointsPolicy::default()).await.unwrap();
  submit(&s, &a, Category::GroupII).await;
  submit(&s, &a, Category::GroupIII).await;

  let counts = s.status_counts().await.unwrap();
  assert_eq!(counts.approved, 1);
  assert_eq!(counts.rejected, 1);
  assert_eq!(counts.pending, 2);
  assert_eq!(counts.total(), 4);
}

#[tokio::test]
async fn student_totals_from_store() {
  let s = store().await;
  let a = student(&s, "S1").await;
  let f = faculty(&s, "F1").await;
  approved(&s, &a, &f, Category::GroupI, 15).await;
  approved(&s, &a, &f, Category::GroupII, 40).await;
  approved(&s, &a, &f, Category::GroupIII, 10).await;
  submit(&s, &a, Category::GroupI).await;

  let totals = report::student_totals(&s, &PointsPolicy::default(), a.account_id)
    .await
    .unwrap();
  assert_eq!(totals.overall_earned, 65);
  assert_eq!(totals.capped_earned, 65);
  assert_eq!(totals.percent_complete, 54.167);
  assert_eq!(totals.per_category[&Category::GroupI].pending, 1);
}
