//! Integration tests for contact distribution
//!
//! These run against a file-backed database so concurrent claims go through
//! separate pooled connections.

mod common;

use chrono::{Duration, Utc};
use common::*;
use dialer_core::prelude::*;
use futures::future::join_all;

#[tokio::test]
async fn test_pick_next_is_fifo() {
    let dialer = create_test_dialer().await;
    let outcomes = create_outcomes(&dialer.engine).await;
    let campaign = create_campaign(&dialer.engine, &outcomes).await;
    let contacts = import_phones(&dialer.engine, &campaign.id, 3).await;

    let first = dialer.engine.pick_next(&campaign.id, "agent-a").await.unwrap().unwrap();
    let second = dialer.engine.pick_next(&campaign.id, "agent-b").await.unwrap().unwrap();

    assert_eq!(first.contact.id, contacts[0].id);
    assert_eq!(second.contact.id, contacts[1].id);
    assert!(first.contact.is_locked_by("agent-a"));
    assert_eq!(first.contact.status, ContactStatus::Pending);
}

#[tokio::test]
async fn test_agent_gets_its_held_contact_back() {
    let dialer = create_test_dialer().await;
    let outcomes = create_outcomes(&dialer.engine).await;
    let campaign = create_campaign(&dialer.engine, &outcomes).await;
    let contacts = import_phones(&dialer.engine, &campaign.id, 2).await;

    let first = dialer.engine.pick_next(&campaign.id, "agent-a").await.unwrap().unwrap();
    let again = dialer.engine.pick_next(&campaign.id, "agent-a").await.unwrap().unwrap();

    assert_eq!(first.contact.id, contacts[0].id);
    assert_eq!(again.contact.id, contacts[0].id);
}

#[tokio::test]
async fn test_concurrent_agents_receive_distinct_contacts() {
    let dialer = create_test_dialer().await;
    let outcomes = create_outcomes(&dialer.engine).await;
    let campaign = create_campaign(&dialer.engine, &outcomes).await;
    import_phones(&dialer.engine, &campaign.id, 10).await;

    let picks = (0..8).map(|i| {
        let engine = dialer.engine.clone();
        let campaign_id = campaign.id.clone();
        async move { engine.pick_next(&campaign_id, &format!("agent-{}", i)).await }
    });
    let results = join_all(picks).await;

    let mut ids: Vec<String> = results
        .into_iter()
        .map(|r| r.unwrap().expect("every agent should get a contact").contact.id)
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);

    let snapshot = dialer.engine.campaign_snapshot(&campaign.id).await.unwrap();
    assert_eq!(snapshot.counts.locked, 8);
}

#[tokio::test]
async fn test_exhausted_pool_returns_none() {
    let dialer = create_test_dialer().await;
    let outcomes = create_outcomes(&dialer.engine).await;
    let campaign = create_campaign(&dialer.engine, &outcomes).await;
    import_phones(&dialer.engine, &campaign.id, 1).await;

    assert!(dialer.engine.pick_next(&campaign.id, "agent-a").await.unwrap().is_some());
    assert!(dialer.engine.pick_next(&campaign.id, "agent-b").await.unwrap().is_none());
}

#[tokio::test]
async fn test_paging_finds_contacts_past_the_first_batch() {
    let mut config = DialerConfig::default();
    config.allocation.candidate_batch_size = 2;
    let dialer = create_test_dialer_with(config).await;
    let outcomes = create_outcomes(&dialer.engine).await;
    let campaign = create_campaign(&dialer.engine, &outcomes).await;
    let contacts = import_phones(&dialer.engine, &campaign.id, 5).await;

    let tomorrow = Utc::now() + Duration::days(1);
    for contact in contacts.iter().take(4) {
        let request =
            QualifyRequest::new(&contact.id, &outcomes.no_answer.id, &campaign.id, "agent-a").relaunch_at(tomorrow);
        dialer.engine.qualify(request).await.unwrap();
    }

    let allocation = dialer.engine.pick_next(&campaign.id, "agent-z").await.unwrap().unwrap();
    assert_eq!(allocation.contact.id, contacts[4].id);
}

#[tokio::test]
async fn test_future_relaunch_is_skipped() {
    let dialer = create_test_dialer().await;
    let outcomes = create_outcomes(&dialer.engine).await;
    let campaign = create_campaign(&dialer.engine, &outcomes).await;
    let contacts = import_phones(&dialer.engine, &campaign.id, 2).await;

    let tomorrow = Utc::now() + Duration::days(1);
    let request = QualifyRequest::new(&contacts[0].id, &outcomes.no_answer.id, &campaign.id, "agent-a")
        .relaunch_at(tomorrow);
    let outcome = dialer.engine.qualify(request).await.unwrap();
    assert_eq!(outcome.contact.status, ContactStatus::Pending);

    let allocation = dialer.engine.pick_next(&campaign.id, "agent-a").await.unwrap().unwrap();
    assert_eq!(allocation.contact.id, contacts[1].id);
    assert!(dialer.engine.pick_next(&campaign.id, "agent-b").await.unwrap().is_none());
}

#[tokio::test]
async fn test_elapsed_relaunch_is_eligible() {
    let dialer = create_test_dialer().await;
    let outcomes = create_outcomes(&dialer.engine).await;
    let campaign = create_campaign(&dialer.engine, &outcomes).await;
    let contacts = import_phones(&dialer.engine, &campaign.id, 1).await;

    let an_hour_ago = Utc::now() - Duration::hours(1);
    let request = QualifyRequest::new(&contacts[0].id, &outcomes.no_answer.id, &campaign.id, "agent-a")
        .relaunch_at(an_hour_ago);
    dialer.engine.qualify(request).await.unwrap();

    let allocation = dialer.engine.pick_next(&campaign.id, "agent-b").await.unwrap().unwrap();
    assert_eq!(allocation.contact.id, contacts[0].id);
}

#[tokio::test]
async fn test_callback_reserves_contact_for_its_agent() {
    let dialer = create_test_dialer().await;
    let outcomes = create_outcomes(&dialer.engine).await;
    let campaign = create_campaign(&dialer.engine, &outcomes).await;
    let contacts = import_phones(&dialer.engine, &campaign.id, 2).await;

    dialer
        .engine
        .schedule_callback(&contacts[0].id, "agent-a", Utc::now())
        .await
        .unwrap();

    let other = dialer.engine.pick_next(&campaign.id, "agent-b").await.unwrap().unwrap();
    assert_eq!(other.contact.id, contacts[1].id);

    let owner = dialer.engine.pick_next(&campaign.id, "agent-a").await.unwrap().unwrap();
    assert_eq!(owner.contact.id, contacts[0].id);
}

#[tokio::test]
async fn test_exhausted_quota_rule_skips_matching_contacts() {
    let dialer = create_test_dialer().await;
    let outcomes = create_outcomes(&dialer.engine).await;
    let campaign = create_quota_campaign(
        &dialer.engine,
        &outcomes,
        vec![
            NewQuotaRule::new(ContactField::PostalCode, QuotaOperator::StartsWith, "75", 2).with_current_count(1),
            NewQuotaRule::new(ContactField::PostalCode, QuotaOperator::StartsWith, "13", 5),
        ],
    )
    .await;
    let paris_rule = campaign.quota_rules[0].id.clone();

    let contacts = import_rows(
        &dialer.engine,
        &campaign.id,
        vec![
            row("0600000001", Some("75001")),
            row("0600000002", Some("75002")),
            row("0600000003", Some("13001")),
        ],
    )
    .await;

    let first = dialer.engine.pick_next(&campaign.id, "agent-a").await.unwrap().unwrap();
    assert_eq!(first.contact.id, contacts[0].id);

    let outcome = qualify(&dialer.engine, &campaign, &first.contact.id, "agent-a", &outcomes.sale).await;
    assert_eq!(outcome.quota_rule_id.as_deref(), Some(paris_rule.as_str()));

    let campaign_now = dialer.engine.get_campaign(&campaign.id).await.unwrap();
    assert_eq!(campaign_now.quota_rules[0].current_count, 2);

    let next = dialer.engine.pick_next(&campaign.id, "agent-a").await.unwrap().unwrap();
    assert_eq!(next.contact.id, contacts[2].id);

    let snapshot = next.snapshot.expect("allocation carries a snapshot");
    assert!(snapshot.rule(&paris_rule).unwrap().exhausted);
}

#[tokio::test]
async fn test_unmatched_contact_is_ineligible_with_quotas_enabled() {
    let dialer = create_test_dialer().await;
    let outcomes = create_outcomes(&dialer.engine).await;
    let campaign = create_quota_campaign(
        &dialer.engine,
        &outcomes,
        vec![NewQuotaRule::new(ContactField::PostalCode, QuotaOperator::Equals, "69001", 3)],
    )
    .await;
    import_rows(&dialer.engine, &campaign.id, vec![row("0600000001", Some("75001"))]).await;

    assert!(dialer.engine.pick_next(&campaign.id, "agent-a").await.unwrap().is_none());

    let campaign = dialer.engine.set_quotas_enabled(&campaign.id, false).await.unwrap();
    assert!(!campaign.quotas_enabled);
    assert!(dialer.engine.pick_next(&campaign.id, "agent-a").await.unwrap().is_some());
}

#[tokio::test]
async fn test_pick_next_errors() {
    let dialer = create_test_dialer().await;

    let err = dialer.engine.pick_next("missing", "agent-a").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = dialer.engine.pick_next("missing", "  ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_allocation_publishes_snapshot() {
    let dialer = create_test_dialer().await;
    let outcomes = create_outcomes(&dialer.engine).await;
    let campaign = create_campaign(&dialer.engine, &outcomes).await;
    import_phones(&dialer.engine, &campaign.id, 2).await;

    let mut events = dialer.notifier.subscribe();
    let allocation = dialer.engine.pick_next(&campaign.id, "agent-a").await.unwrap().unwrap();

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind, ChangeKind::ContactAllocated);
    assert_eq!(event.campaign_id, campaign.id);

    let snapshot = event.snapshot.expect("snapshot after commit");
    assert_eq!(snapshot.counts.locked, 1);
    assert_eq!(snapshot.counts.pending, 2);
    let held = snapshot
        .contacts
        .iter()
        .find(|c| c.id == allocation.contact.id)
        .unwrap();
    assert_eq!(held.locked_by.as_deref(), Some("agent-a"));

    let returned = allocation.snapshot.unwrap();
    assert_eq!(returned.counts, snapshot.counts);
}
