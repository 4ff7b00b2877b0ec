//! SQLite store tests, against a private in-memory database.

#![cfg(all(feature = "sqlite", feature = "local"))]

use std::sync::Arc;
use std::time::Duration;

use bulkmail::links::SiteLinks;
use bulkmail::model::NewLogEntry;
use bulkmail::params::{MapParams, Params};
use bulkmail::providers::LocalMailer;
use bulkmail::store::{MailingStore, SqliteStore};
use bulkmail::testing::*;
use bulkmail::{Dispatcher, MailingConfig, NewTemplate, SendOptions, StoreError, TemplateId};

async fn store() -> SqliteStore {
    SqliteStore::in_memory().await.unwrap()
}

#[tokio::test]
async fn template_round_trip() {
    let store = store().await;
    let created = store
        .create_template(NewTemplate::new("mod_test", "sujet_modele", "<p>{{ x }}</p>").html(true))
        .await
        .unwrap();

    let found = store.template_by_code("mod_test").await.unwrap().unwrap();
    assert_eq!(found, created);
    assert!(found.is_html);
    assert!(store.template_by_code("absent").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_template_code_is_rejected() {
    let store = store().await;
    store
        .create_template(NewTemplate::new("mod_test", "a", "a"))
        .await
        .unwrap();

    let err = store
        .create_template(NewTemplate::new("mod_test", "b", "b"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));
}

#[tokio::test]
async fn invalid_template_is_rejected_before_insert() {
    let store = store().await;
    let err = store
        .create_template(NewTemplate::new("much_too_long", "a", "a"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)));
}

#[tokio::test]
async fn envelopes_are_listed_per_template_in_order() {
    let store = store().await;
    let first = store
        .create_template(NewTemplate::new("un", "s", "b"))
        .await
        .unwrap();
    let second = store
        .create_template(NewTemplate::new("deux", "s", "b"))
        .await
        .unwrap();

    let a = store.create_envelope(first.id).await.unwrap();
    store.create_envelope(second.id).await.unwrap();
    let c = store.create_envelope(first.id).await.unwrap();

    assert_eq!(store.envelopes_for(first.id).await.unwrap(), vec![a, c]);
    assert!(matches!(
        store.create_envelope(TemplateId(999)).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn log_satisfaction_rules() {
    let store = store().await;
    let template = store
        .create_template(NewTemplate::new("mod_test", "s", "b"))
        .await
        .unwrap();
    let envelope = store.create_envelope(template.id).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.append(NewLogEntry::new(envelope.id, "a@test.org", Some("refused".into())))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert!(!store.is_satisfied(envelope.id, "a@test.org", true).await.unwrap());
    assert!(store.is_satisfied(envelope.id, "a@test.org", false).await.unwrap());
    assert!(!store.is_satisfied(envelope.id, "b@test.org", false).await.unwrap());

    let mut tx = store.begin().await.unwrap();
    tx.append(NewLogEntry::new(envelope.id, "a@test.org", None))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert!(store.is_satisfied(envelope.id, "a@test.org", true).await.unwrap());

    let entries = store.log_entries(envelope.id).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].error.as_deref(), Some("refused"));
    assert!(entries[1].is_success());
}

#[tokio::test]
async fn dropped_transaction_rolls_back() {
    let store = store().await;
    let template = store
        .create_template(NewTemplate::new("mod_test", "s", "b"))
        .await
        .unwrap();
    let envelope = store.create_envelope(template.id).await.unwrap();

    {
        let mut tx = store.begin().await.unwrap();
        tx.append(NewLogEntry::new(envelope.id, "a@test.org", None))
            .await
            .unwrap();
    }

    assert!(store.log_entries(envelope.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn sent_at_survives_storage() {
    let store = store().await;
    let template = store
        .create_template(NewTemplate::new("mod_test", "s", "b"))
        .await
        .unwrap();
    let envelope = store.create_envelope(template.id).await.unwrap();

    let entry = NewLogEntry::new(envelope.id, "a@test.org", None);
    let sent_at = entry.sent_at;
    let mut tx = store.begin().await.unwrap();
    tx.append(entry).await.unwrap();
    tx.commit().await.unwrap();

    let stored = &store.log_entries(envelope.id).await.unwrap()[0];
    assert_eq!(stored.sent_at, sent_at);
}

#[tokio::test]
async fn dispatcher_runs_on_sqlite() {
    let store = store().await;
    let template = store
        .create_template(NewTemplate::new(
            "mod_test",
            "sujet_modele",
            "{{ nom_destinataire }}{{ url }}",
        ))
        .await
        .unwrap();
    let envelope = store.create_envelope(template.id).await.unwrap();

    let params = Arc::new(MapParams::new());
    let record = Params::new("dest1@test.org")
        .var("nom_destinataire", "nom dest1")
        .with_token();
    let token = record.token().unwrap().to_string();
    params.insert(envelope.id, record);

    let mailer = LocalMailer::new();
    let dispatcher = Dispatcher::builder()
        .store(store.clone())
        .mailer(mailer.clone())
        .params(params.clone())
        .config(MailingConfig::default().pacing(Duration::ZERO))
        .build()
        .unwrap();
    let options =
        SendOptions::new().link_resolver(SiteLinks::new("example.com", "/acces/{token}"));

    let report = dispatcher
        .send("mod_test", "expediteur@test.org", &options)
        .await
        .unwrap();
    assert_eq!(report.sent, 1);
    assert_email_body(
        &mailer,
        &format!("nom dest1http://example.com/acces/{}", token),
    );

    let report = dispatcher
        .send("mod_test", "expediteur@test.org", &options)
        .await
        .unwrap();
    assert_eq!(report.skipped, 1);
    assert_email_count(&mailer, 1);

    params
        .set_address(envelope.id, "autre_adresse@test.org")
        .unwrap();
    dispatcher
        .send("mod_test", "expediteur@test.org", &options)
        .await
        .unwrap();
    assert_email_count(&mailer, 2);
    assert_eq!(store.log_entries(envelope.id).await.unwrap().len(), 2);
}
