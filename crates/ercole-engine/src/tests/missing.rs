use chrono::Utc;
use ercole_common::alert::{
    Alert, AlertCategory, AlertCode, AlertDetails, AlertSeverity, AlertStatus, Technology,
};

use super::fakes::*;

async fn ingest_databases(h: &Harness, names: &[&str]) {
    let dbs = names.iter().map(|n| oracle_db(n, vec![])).collect();
    h.service
        .insert_host_data(with_oracle(host("db01"), dbs))
        .await
        .unwrap();
}

fn open_missing_alert(id: &str, db_names: &[&str]) -> Alert {
    Alert {
        id: id.into(),
        category: AlertCategory::License,
        affected_technology: Some(Technology::OracleDatabase),
        severity: AlertSeverity::Warning,
        status: AlertStatus::New,
        description: String::new(),
        date: Utc::now(),
        details: AlertDetails::MissingDatabase {
            hostname: "db01".into(),
            db_names: db_names.iter().map(|s| s.to_string()).collect(),
        },
    }
}

#[tokio::test]
async fn losing_every_database_is_critical() {
    let h = Harness::new(FakeApi::default());
    ingest_databases(&h, &["B", "A"]).await;
    ingest_databases(&h, &[]).await;

    let alerts = h.alerts_with_code(AlertCode::MissingDatabase);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::Critical);
    assert_eq!(
        alerts[0].details,
        AlertDetails::MissingDatabase {
            hostname: "db01".into(),
            db_names: vec!["A".into(), "B".into()],
        }
    );
    assert_eq!(
        alerts[0].description,
        r#"The databases "A, B" on "db01" are missing compared to the previous hostdata"#
    );
}

#[tokio::test]
async fn losing_some_databases_is_a_warning() {
    let h = Harness::new(FakeApi::default());
    ingest_databases(&h, &["A", "B"]).await;
    ingest_databases(&h, &["A"]).await;

    let alerts = h.alerts_with_code(AlertCode::MissingDatabase);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    assert_eq!(
        alerts[0].details,
        AlertDetails::MissingDatabase {
            hostname: "db01".into(),
            db_names: vec!["B".into()],
        }
    );
}

#[tokio::test]
async fn nothing_missing_raises_nothing() {
    let h = Harness::new(FakeApi::default());
    ingest_databases(&h, &["A"]).await;
    ingest_databases(&h, &["A", "C"]).await;

    assert!(h.alerts_with_code(AlertCode::MissingDatabase).is_empty());
}

#[tokio::test]
async fn alerts_for_reappeared_databases_are_acked_by_id() {
    let api = FakeApi::default();
    {
        let mut existing = api.existing_alerts.lock().unwrap();
        existing.push(open_missing_alert("back", &["A"]));
        existing.push(open_missing_alert("still-gone", &["A", "Z"]));
    }
    let h = Harness::new(api);
    ingest_databases(&h, &["A"]).await;
    ingest_databases(&h, &["A"]).await;

    let acked = h.api.acked();
    assert_eq!(acked.len(), 1);
    assert_eq!(acked[0].ids, vec!["back".to_string()]);
    assert!(h.alerts_with_code(AlertCode::MissingDatabase).is_empty());
}

#[tokio::test]
async fn first_snapshot_skips_the_detector() {
    let api = FakeApi::default();
    api.existing_alerts
        .lock()
        .unwrap()
        .push(open_missing_alert("old", &["A"]));
    let h = Harness::new(api);
    ingest_databases(&h, &["A"]).await;

    assert!(h.api.acked().is_empty());
}

#[tokio::test]
async fn dropping_the_oracle_block_loses_every_database() {
    let h = Harness::new(FakeApi::default());
    ingest_databases(&h, &["A", "B"]).await;
    h.service.insert_host_data(host("db01")).await.unwrap();

    let alerts = h.alerts_with_code(AlertCode::MissingDatabase);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::Critical);
    assert_eq!(
        alerts[0].details,
        AlertDetails::MissingDatabase {
            hostname: "db01".into(),
            db_names: vec!["A".into(), "B".into()],
        }
    );
}

#[tokio::test]
async fn host_without_oracle_in_either_snapshot_raises_nothing() {
    let h = Harness::new(FakeApi::default());
    h.service.insert_host_data(host("db01")).await.unwrap();
    h.service.insert_host_data(host("db01")).await.unwrap();

    assert!(h.alerts_with_code(AlertCode::MissingDatabase).is_empty());
    assert!(h.api.acked().is_empty());
}
