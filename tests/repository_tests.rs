mod test_utils;

use chrono::{Duration, TimeZone, Utc};
use sea_orm::EntityTrait;
use test_utils::{create_va, insert_user_role, pilot_schema, insert_airtable_config, setup_test_db_arc};
use va_sync::models::UserRole;
use va_sync::repositories::{
    PilotRecord, PilotRepository, PirepRecord, PirepRepository, ProviderConfigRepository,
    SyncHistoryRepository, UpsertRepository, UserRoleRepository,
};
use va_sync::schema::EntityKind;
use va_sync::sync::PilotLinker;

fn pilot_record(va_id: uuid::Uuid, record_id: &str, callsign: &str) -> PilotRecord {
    PilotRecord {
        va_id,
        airtable_record_id: record_id.to_string(),
        callsign: callsign.to_string(),
        registered: false,
        source_created_at: None,
    }
}

#[tokio::test]
async fn pilot_upsert_overwrites_mutable_fields_only() {
    let db = setup_test_db_arc().await.unwrap();
    let va = create_va(&db, "QTR").await.unwrap();
    let repo = PilotRepository::new(db.clone());

    repo.upsert(&pilot_record(va, "rec1", "QTR001")).await.unwrap();
    let first = repo.find_by_record_id(va, "rec1").await.unwrap().unwrap();

    let mut changed = pilot_record(va, "rec1", "QTR777");
    changed.registered = true;
    repo.upsert(&changed).await.unwrap();

    let second = repo.find_by_record_id(va, "rec1").await.unwrap().unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.callsign, "QTR777");
    assert!(second.registered);
    assert_eq!(repo.count_for_va(va).await.unwrap(), 1);
}

#[tokio::test]
async fn find_by_callsign_ignores_case_and_whitespace() {
    let db = setup_test_db_arc().await.unwrap();
    let va = create_va(&db, "BAW").await.unwrap();
    let other = create_va(&db, "EZY").await.unwrap();
    let repo = PilotRepository::new(db.clone());

    repo.upsert(&pilot_record(va, "rec1", "BAW123")).await.unwrap();
    repo.upsert(&pilot_record(other, "rec9", "EZY123")).await.unwrap();

    let found = repo.find_by_callsign(va, "  baw123 ").await.unwrap();
    assert_eq!(found.map(|p| p.airtable_record_id), Some("rec1".to_string()));

    assert!(repo.find_by_callsign(va, "EZY123").await.unwrap().is_none());
    assert!(repo.find_by_callsign(va, "   ").await.unwrap().is_none());
}

#[tokio::test]
async fn find_by_callsign_folds_both_sides_the_same_way() {
    let db = setup_test_db_arc().await.unwrap();
    let va = create_va(&db, "ECO").await.unwrap();
    let repo = PilotRepository::new(db.clone());

    repo.upsert(&pilot_record(va, "recE", "ÉCO001")).await.unwrap();

    // ASCII letters differ in case, the accented letter is spelled as stored.
    let found = repo.find_by_callsign(va, "Éco001").await.unwrap();
    assert_eq!(found.map(|p| p.airtable_record_id), Some("recE".to_string()));
    let found = repo.find_by_callsign(va, " ÉCO001").await.unwrap();
    assert_eq!(found.map(|p| p.airtable_record_id), Some("recE".to_string()));
}

#[tokio::test]
async fn pirep_upsert_replaces_optional_fields() {
    let db = setup_test_db_arc().await.unwrap();
    let va = create_va(&db, "PRP").await.unwrap();
    let repo = PirepRepository::new(db.clone());

    let mut record = PirepRecord {
        va_id: va,
        airtable_record_id: "recP".to_string(),
        route: Some("OMDB-OTHH".to_string()),
        flight_mode: Some("Normal".to_string()),
        flight_time: Some(1.5),
        pilot_callsign: "PRP001".to_string(),
        aircraft: Some("B777-300ER".to_string()),
        livery: None,
        route_id: None,
        pilot_id: None,
        source_created_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()),
    };
    repo.upsert(&record).await.unwrap();

    record.flight_time = None;
    record.livery = Some("Oneworld".to_string());
    repo.upsert(&record).await.unwrap();

    let stored = repo.find_by_record_id(va, "recP").await.unwrap().unwrap();
    assert_eq!(stored.flight_time, None);
    assert_eq!(stored.livery.as_deref(), Some("Oneworld"));
    assert_eq!(repo.count_for_va(va).await.unwrap(), 1);
}

#[tokio::test]
async fn ledger_keeps_one_row_per_va_and_event() {
    let db = setup_test_db_arc().await.unwrap();
    let a = create_va(&db, "AAA").await.unwrap();
    let b = create_va(&db, "BBB").await.unwrap();
    let history = SyncHistoryRepository::new(db.clone());
    let event = EntityKind::Route.event_type();

    let older = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
    let newer = older + Duration::hours(3);
    history.record_sync_at(a, event, older).await.unwrap();
    history.record_sync_at(b, event, newer).await.unwrap();

    assert_eq!(history.get_last_sync_time(a, event).await.unwrap(), Some(older));
    assert_eq!(
        history.get_last_sync_time_for_event(event).await.unwrap(),
        Some(newer)
    );
    assert_eq!(
        history
            .get_last_sync_time(a, EntityKind::Pilot.event_type())
            .await
            .unwrap(),
        None
    );

    let before = Utc::now();
    history
        .record_sync(b, EntityKind::Pilot.event_type())
        .await
        .unwrap();
    let stamped = history
        .get_last_sync_time(b, EntityKind::Pilot.event_type())
        .await
        .unwrap()
        .expect("pilot sync recorded");
    assert!(stamped >= before - Duration::seconds(1));

    // Re-recording moves the timestamp instead of adding a row.
    let latest = newer + Duration::hours(1);
    history.record_sync_at(a, event, latest).await.unwrap();
    assert_eq!(history.get_last_sync_time(a, event).await.unwrap(), Some(latest));
    assert_eq!(
        history.get_last_sync_time_for_event(event).await.unwrap(),
        Some(latest)
    );
}

#[tokio::test]
async fn newest_active_airtable_config_wins() {
    let db = setup_test_db_arc().await.unwrap();
    let va = create_va(&db, "CFG").await.unwrap();
    insert_airtable_config(&db, va, pilot_schema(None)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let newest = insert_airtable_config(&db, va, pilot_schema(Some("Modified")))
        .await
        .unwrap();

    let config = ProviderConfigRepository::new(db.clone())
        .find_active_airtable(va)
        .await
        .unwrap()
        .expect("active config");
    assert_eq!(config.id, newest);
}

#[tokio::test]
async fn linker_matches_callsigns_case_insensitively() {
    let db = setup_test_db_arc().await.unwrap();
    let va = create_va(&db, "LNK").await.unwrap();
    let pilots = PilotRepository::new(db.clone());
    pilots.upsert(&pilot_record(va, "recA", "LNK001")).await.unwrap();

    let matching = insert_user_role(&db, va, Some("lnk001")).await.unwrap();
    let unmatched = insert_user_role(&db, va, Some("LNK999")).await.unwrap();
    let without_callsign = insert_user_role(&db, va, None).await.unwrap();

    let linker = PilotLinker::new(db.clone());
    let report = linker.run_for_va(va).await.unwrap();
    assert_eq!(report.examined, 2);
    assert_eq!(report.linked, 1);

    let linked = UserRole::find_by_id(matching).one(&*db).await.unwrap().unwrap();
    assert_eq!(linked.airtable_pilot_id.as_deref(), Some("recA"));
    for id in [unmatched, without_callsign] {
        let role = UserRole::find_by_id(id).one(&*db).await.unwrap().unwrap();
        assert!(role.airtable_pilot_id.is_none());
    }

    // The pilot shows up later; the next run picks the member up.
    pilots.upsert(&pilot_record(va, "recZ", "LNK999")).await.unwrap();
    let report = linker.run_all().await;
    assert_eq!(report.examined, 1);
    assert_eq!(report.linked, 1);

    let again = linker.run_for_va(va).await.unwrap();
    assert_eq!(again.examined, 0);

    let roles = UserRoleRepository::new(db.clone());
    assert!(!roles.set_pilot_link(matching, "recA").await.unwrap());
}
