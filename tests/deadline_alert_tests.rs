//! Integration tests for the deadline alert jobs: offset scanning,
//! preference suppression, metadata shape and per-offset failure isolation.

mod common;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use tokio_util::sync::CancellationToken;

use common::{test_harness, TestHarness};
use joblink_server::background_jobs::{BackgroundJob, DailyTime, JobContext};
use joblink_server::deadline_alerts::{
    local_today, CompanyDeadlineAlertsJob, FavoriteDeadlineAlertsJob,
};
use joblink_server::directory::{CompanyJobDeadline, FavoriteJobDeadline, JobDirectory};
use joblink_server::notifications::{NotificationStore, NotificationType};
use joblink_server::preferences::{
    ensure_preferences, AccountRole, PreferenceCategory, PreferenceRecord, PreferenceStore,
};

#[derive(Default)]
struct FakeJobDirectory {
    favorites: HashMap<NaiveDate, Vec<FavoriteJobDeadline>>,
    company: HashMap<NaiveDate, Vec<CompanyJobDeadline>>,
    failing_dates: HashSet<NaiveDate>,
}

impl JobDirectory for FakeJobDirectory {
    fn favorite_jobs_with_deadline(&self, date: NaiveDate) -> Result<Vec<FavoriteJobDeadline>> {
        if self.failing_dates.contains(&date) {
            bail!("platform database unavailable");
        }
        Ok(self.favorites.get(&date).cloned().unwrap_or_default())
    }

    fn company_jobs_with_deadline(&self, date: NaiveDate) -> Result<Vec<CompanyJobDeadline>> {
        if self.failing_dates.contains(&date) {
            bail!("platform database unavailable");
        }
        Ok(self.company.get(&date).cloned().unwrap_or_default())
    }

    fn admin_user_ids(&self) -> Result<Vec<usize>> {
        Ok(vec![])
    }
}

fn favorite_row(user_id: usize, job_post_id: i64, deadline: NaiveDate) -> FavoriteJobDeadline {
    FavoriteJobDeadline {
        user_id,
        job_post_id,
        job_title: "Backend engineer".to_string(),
        company_name: "Acme".to_string(),
        deadline,
    }
}

fn favorite_job(harness: &TestHarness, directory: FakeJobDirectory) -> FavoriteDeadlineAlertsJob {
    FavoriteDeadlineAlertsJob::new(
        harness.engine.clone(),
        Arc::new(directory),
        DailyTime::new(9, 0),
    )
}

fn ctx() -> JobContext {
    JobContext::new(CancellationToken::new())
}

#[tokio::test]
async fn one_day_offset_produces_notification_with_metadata() {
    let harness = test_harness();
    ensure_preferences(harness.store.as_ref(), 1, AccountRole::Member).unwrap();
    let (_conn_id, mut rx) = harness.connections.register(1).await;

    let today = local_today(Utc::now());
    let d1 = today + chrono::Duration::days(1);
    let mut directory = FakeJobDirectory::default();
    directory.favorites.insert(d1, vec![favorite_row(1, 100, d1)]);

    let job = favorite_job(&harness, directory);
    job.execute(&ctx()).await.unwrap();

    let stored = harness.store.list_notifications(1, false).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].kind, NotificationType::FavoriteJobDeadline);
    let metadata = stored[0].metadata.as_ref().unwrap();
    assert_eq!(metadata["job_post_id"], 100);
    assert_eq!(metadata["when"], "D-1");

    // Connected client got the live event too
    let event = rx.recv().await.unwrap();
    assert_eq!(event.msg_type, "notification_created");
    assert_eq!(event.payload["notification"]["metadata"]["when"], "D-1");
}

#[tokio::test]
async fn opted_out_user_gets_nothing_from_the_scan() {
    let harness = test_harness();
    let mut record = PreferenceRecord::defaults(1, AccountRole::Member);
    record
        .categories
        .insert(PreferenceCategory::FavoriteJobDeadline, false);
    harness.store.upsert_preferences(&record).unwrap();
    let (_conn_id, mut rx) = harness.connections.register(1).await;

    let today = local_today(Utc::now());
    let d7 = today + chrono::Duration::days(7);
    let mut directory = FakeJobDirectory::default();
    directory.favorites.insert(d7, vec![favorite_row(1, 100, d7)]);

    let job = favorite_job(&harness, directory);
    job.execute(&ctx()).await.unwrap();

    assert!(harness.store.list_notifications(1, false).unwrap().is_empty());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn all_three_offsets_are_scanned() {
    let harness = test_harness();
    ensure_preferences(harness.store.as_ref(), 1, AccountRole::Member).unwrap();

    let today = local_today(Utc::now());
    let mut directory = FakeJobDirectory::default();
    for (job_post_id, days) in [(100, 7i64), (101, 1), (102, -1)] {
        let date = today + chrono::Duration::days(days);
        directory
            .favorites
            .insert(date, vec![favorite_row(1, job_post_id, date)]);
    }

    let job = favorite_job(&harness, directory);
    job.execute(&ctx()).await.unwrap();

    let stored = harness.store.list_notifications(1, false).unwrap();
    assert_eq!(stored.len(), 3);
    let mut labels: Vec<String> = stored
        .iter()
        .map(|n| n.metadata.as_ref().unwrap()["when"].as_str().unwrap().to_string())
        .collect();
    labels.sort();
    assert_eq!(labels, vec!["D+1", "D-1", "D-7"]);
}

#[tokio::test]
async fn failing_offset_does_not_abort_the_others() {
    let harness = test_harness();
    ensure_preferences(harness.store.as_ref(), 1, AccountRole::Member).unwrap();

    let today = local_today(Utc::now());
    let d7 = today + chrono::Duration::days(7);
    let d1 = today + chrono::Duration::days(1);
    let mut directory = FakeJobDirectory::default();
    // The D-7 query blows up; the D-1 one still runs
    directory.failing_dates.insert(d7);
    directory.favorites.insert(d1, vec![favorite_row(1, 101, d1)]);

    let job = favorite_job(&harness, directory);
    job.execute(&ctx()).await.unwrap();

    let stored = harness.store.list_notifications(1, false).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].metadata.as_ref().unwrap()["when"], "D-1");
}

#[tokio::test]
async fn cancelled_context_stops_the_job() {
    let harness = test_harness();
    ensure_preferences(harness.store.as_ref(), 1, AccountRole::Member).unwrap();

    let today = local_today(Utc::now());
    let d7 = today + chrono::Duration::days(7);
    let mut directory = FakeJobDirectory::default();
    directory.favorites.insert(d7, vec![favorite_row(1, 100, d7)]);

    let token = CancellationToken::new();
    token.cancel();
    let job = favorite_job(&harness, directory);

    assert!(job.execute(&JobContext::new(token)).await.is_err());
    assert!(harness.store.list_notifications(1, false).unwrap().is_empty());
}

#[tokio::test]
async fn company_scan_notifies_the_posting_owner() {
    let harness = test_harness();
    ensure_preferences(harness.store.as_ref(), 2, AccountRole::Company).unwrap();

    let today = local_today(Utc::now());
    let d1 = today + chrono::Duration::days(1);
    let mut directory = FakeJobDirectory::default();
    directory.company.insert(
        d1,
        vec![CompanyJobDeadline {
            company_user_id: 2,
            job_post_id: 300,
            job_title: "Data analyst".to_string(),
            company_name: "Globex".to_string(),
            deadline: d1,
        }],
    );

    let job = CompanyDeadlineAlertsJob::new(
        harness.engine.clone(),
        Arc::new(directory),
        DailyTime::new(9, 30),
    );
    job.execute(&ctx()).await.unwrap();

    let stored = harness.store.list_notifications(2, false).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].kind, NotificationType::EmpJobDeadline);
    assert_eq!(stored[0].message, "[Globex] 'Data analyst' closes tomorrow.");
    assert_eq!(stored[0].metadata.as_ref().unwrap()["job_post_id"], 300);
}

#[tokio::test]
async fn company_scan_respects_master_switch() {
    let harness = test_harness();
    let mut record = PreferenceRecord::defaults(2, AccountRole::Company);
    record.all_notifications = false;
    harness.store.upsert_preferences(&record).unwrap();

    let today = local_today(Utc::now());
    let d1 = today + chrono::Duration::days(1);
    let mut directory = FakeJobDirectory::default();
    directory.company.insert(
        d1,
        vec![CompanyJobDeadline {
            company_user_id: 2,
            job_post_id: 300,
            job_title: "Data analyst".to_string(),
            company_name: "Globex".to_string(),
            deadline: d1,
        }],
    );

    let job = CompanyDeadlineAlertsJob::new(
        harness.engine.clone(),
        Arc::new(directory),
        DailyTime::new(9, 30),
    );
    job.execute(&ctx()).await.unwrap();

    assert!(harness.store.list_notifications(2, false).unwrap().is_empty());
}
