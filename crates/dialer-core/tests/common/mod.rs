//! Shared fixtures for the dialer integration tests

#![allow(dead_code)]

use std::sync::Arc;

use dialer_core::prelude::*;
use tempfile::TempDir;

/// Engine over a file-backed database, plus a broadcast notifier the test
/// can subscribe to. Keep the `TempDir` alive for the test's duration.
pub struct TestDialer {
    pub engine: DialerEngine,
    pub notifier: BroadcastNotifier,
    _dir: TempDir,
}

pub async fn create_test_dialer() -> TestDialer {
    create_test_dialer_with(DialerConfig::default()).await
}

pub async fn create_test_dialer_with(mut config: DialerConfig) -> TestDialer {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("dialer.db");
    config.database.url = format!("sqlite://{}?mode=rwc", db_path.display());
    config.database.busy_timeout_ms = 30_000;

    let notifier = BroadcastNotifier::new(256);
    let engine = DialerEngine::new(config, Arc::new(notifier.clone()))
        .await
        .expect("Failed to create test dialer");

    TestDialer {
        engine,
        notifier,
        _dir: dir,
    }
}

/// Qualification catalog used across tests
pub struct Outcomes {
    pub group: QualificationGroup,
    /// positive, not recyclable
    pub sale: Qualification,
    /// negative, recyclable
    pub refused: Qualification,
    /// neutral, recyclable
    pub no_answer: Qualification,
    /// negative, not recyclable
    pub wrong_number: Qualification,
}

pub async fn create_outcomes(engine: &DialerEngine) -> Outcomes {
    let group = engine.create_qualification_group("Sales outcomes").await.unwrap();

    let make = |label: &str, qualification_type: QualificationType, is_recyclable: bool| NewQualification {
        group_id: group.id.clone(),
        label: label.to_string(),
        qualification_type,
        is_recyclable,
    };

    let sale = engine.create_qualification(make("Sale", QualificationType::Positive, false)).await.unwrap();
    let refused = engine.create_qualification(make("Refused", QualificationType::Negative, true)).await.unwrap();
    let no_answer = engine.create_qualification(make("No answer", QualificationType::Neutral, true)).await.unwrap();
    let wrong_number = engine
        .create_qualification(make("Wrong number", QualificationType::Negative, false))
        .await
        .unwrap();

    Outcomes {
        group,
        sale,
        refused,
        no_answer,
        wrong_number,
    }
}

pub async fn create_campaign(engine: &DialerEngine, outcomes: &Outcomes) -> Campaign {
    engine
        .create_campaign(NewCampaign {
            name: "Spring renewals".to_string(),
            quotas_enabled: false,
            qualification_group_id: Some(outcomes.group.id.clone()),
            quota_rules: Vec::new(),
        })
        .await
        .unwrap()
}

pub async fn create_quota_campaign(engine: &DialerEngine, outcomes: &Outcomes, rules: Vec<NewQuotaRule>) -> Campaign {
    engine
        .create_campaign(NewCampaign {
            name: "Quota campaign".to_string(),
            quotas_enabled: true,
            qualification_group_id: Some(outcomes.group.id.clone()),
            quota_rules: rules,
        })
        .await
        .unwrap()
}

pub fn row(phone: &str, postal_code: Option<&str>) -> NewContact {
    let mut row = NewContact::with_phone(phone);
    row.postal_code = postal_code.map(str::to_string);
    row
}

/// Import rows without dedup and return the inserted contacts in order
pub async fn import_rows(engine: &DialerEngine, campaign_id: &str, rows: Vec<NewContact>) -> Vec<Contact> {
    let report = engine
        .import_batch(campaign_id, rows, &DedupConfig::disabled())
        .await
        .unwrap();
    assert!(report.invalids.is_empty(), "unexpected rejects: {:?}", report.invalids);
    report.valids
}

pub async fn import_phones(engine: &DialerEngine, campaign_id: &str, count: usize) -> Vec<Contact> {
    let rows = (0..count).map(|i| row(&format!("06000000{:02}", i), None)).collect();
    import_rows(engine, campaign_id, rows).await
}

pub async fn qualify(
    engine: &DialerEngine,
    campaign: &Campaign,
    contact_id: &str,
    agent_id: &str,
    qualification: &Qualification,
) -> QualifyOutcome {
    engine
        .qualify(QualifyRequest::new(contact_id, &qualification.id, &campaign.id, agent_id))
        .await
        .unwrap()
}
