use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use va_sync::connectors::{
    AirtableConnector, Cursor, FetchFilters, RecordSourceFactory, SourceError,
};
use va_sync::schema::{AirtableConnection, EntitySchema};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param, query_param_is_missing},
};

fn schema(last_modified: Option<&str>) -> EntitySchema {
    EntitySchema {
        table_name: "Pilots".to_string(),
        enabled: true,
        field_mappings: BTreeMap::from([("callsign".to_string(), "Callsign".to_string())]),
        last_modified_field: last_modified.map(str::to_string),
    }
}

fn connector(server: &MockServer) -> AirtableConnector {
    AirtableConnector::new(&server.uri(), None, Duration::from_secs(5)).unwrap()
}

fn connection(api_key: Option<&str>) -> AirtableConnection {
    AirtableConnection {
        base_id: "appTEST".to_string(),
        api_key: api_key.map(str::to_string),
    }
}

#[tokio::test]
async fn lists_records_with_bearer_auth_and_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v0/appTEST/Pilots"))
        .and(header("authorization", "Bearer patVA"))
        .and(query_param("pageSize", "2"))
        .and(query_param_is_missing("offset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"id": "rec1", "createdTime": "2024-01-01T00:00:00.000Z", "fields": {"Callsign": "QTR001"}},
                {"id": "rec2", "createdTime": "2024-01-02T00:00:00.000Z", "fields": {"Callsign": "QTR002"}}
            ],
            "offset": "itrNext/rec2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v0/appTEST/Pilots"))
        .and(query_param("offset", "itrNext/rec2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"id": "rec3", "createdTime": "2024-01-03T00:00:00.000Z", "fields": {}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = connector(&server)
        .connect(Uuid::new_v4(), &connection(Some("patVA")))
        .unwrap();

    let mut filters = FetchFilters::first_page(2, None);
    let first = source.fetch_page(&schema(None), &filters).await.unwrap();
    assert_eq!(first.records.len(), 2);
    assert!(first.has_more);
    assert_eq!(first.records[0].fields["Callsign"], json!("QTR001"));
    assert_eq!(
        first.records[1].created_time,
        Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
    );

    filters.cursor = first.next_cursor;
    let second = source.fetch_page(&schema(None), &filters).await.unwrap();
    assert_eq!(second.records.len(), 1);
    assert!(!second.has_more);
    assert!(second.next_cursor.is_none());
}

#[tokio::test]
async fn incremental_fetch_sends_inclusive_formula() {
    let server = MockServer::start().await;
    let since = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/v0/appTEST/Pilots"))
        .and(query_param(
            "filterByFormula",
            "NOT(IS_BEFORE({Last Modified}, '2024-05-01T12:30:00.000Z'))",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "records": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let source = connector(&server)
        .connect(Uuid::new_v4(), &connection(Some("k")))
        .unwrap();
    let page = source
        .fetch_page(
            &schema(Some("Last Modified")),
            &FetchFilters::first_page(100, Some(since)),
        )
        .await
        .unwrap();
    assert!(page.records.is_empty());
    assert!(!page.has_more);
}

#[tokio::test]
async fn falls_back_to_process_wide_api_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer patDEFAULT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "records": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let connector =
        AirtableConnector::new(&server.uri(), Some("patDEFAULT".into()), Duration::from_secs(5))
            .unwrap();
    let source = connector
        .connect(Uuid::new_v4(), &connection(None))
        .unwrap();
    source
        .fetch_page(&schema(None), &FetchFilters::first_page(10, None))
        .await
        .unwrap();
}

#[tokio::test]
async fn maps_http_failures() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v0/appTEST/Pilots"))
        .and(header("authorization", "Bearer bad"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v0/appTEST/Pilots"))
        .and(header("authorization", "Bearer busy"))
        .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "30"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v0/appTEST/Pilots"))
        .and(header("authorization", "Bearer broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v0/appTEST/Pilots"))
        .and(header("authorization", "Bearer down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let connector = connector(&server);
    let filters = FetchFilters::first_page(10, None);
    let fetch = |key: &'static str| {
        let source = connector
            .connect(Uuid::new_v4(), &connection(Some(key)))
            .unwrap();
        let schema = schema(None);
        let filters = filters.clone();
        async move { source.fetch_page(&schema, &filters).await }
    };

    assert!(matches!(
        fetch("bad").await,
        Err(SourceError::Authentication { status: 401, .. })
    ));
    assert!(matches!(
        fetch("busy").await,
        Err(SourceError::RateLimited {
            retry_after: Some(30)
        })
    ));
    assert!(matches!(
        fetch("broken").await,
        Err(SourceError::MalformedResponse { .. })
    ));
    let down = fetch("down").await;
    assert!(matches!(down, Err(SourceError::Http { status: 503, body: None })));
    assert!(down.unwrap_err().is_transient());
}

#[test]
fn cursor_round_trips_offset_token() {
    let cursor = Cursor::from_string("itr/rec");
    assert_eq!(cursor.as_str(), Some("itr/rec"));
}
