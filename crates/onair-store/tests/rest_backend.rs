use mockito::{Matcher, Server};
use onair_core::config::BackendConfig;
use onair_store::{Collaborator, Filter, Query, RestCollaborator, StoreError, Table};
use serde_json::json;

fn config(url: &str, token: Option<&str>) -> BackendConfig {
    BackendConfig {
        url: url.to_string(),
        api_key: "anon-key".to_string(),
        access_token: token.map(str::to_string),
        timeout_secs: 5,
        retries: 2,
        retry_delay_ms: 10,
    }
}

#[tokio::test]
async fn select_sends_postgrest_query() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/v1/testimonials")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("select".into(), "*".into()),
            Matcher::UrlEncoded("status".into(), "eq.pending".into()),
            Matcher::UrlEncoded("end_date".into(), "gte.2026-10-15".into()),
            Matcher::UrlEncoded("order".into(), "scheduled_time.asc".into()),
        ]))
        .match_header("apikey", "anon-key")
        .match_header("authorization", "Bearer session-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id": 1, "sponsor": "Acme"}]"#)
        .create_async()
        .await;

    let backend = RestCollaborator::new(&config(&server.url(), Some("session-token"))).unwrap();
    let query = Query::new()
        .eq("status", "pending")
        .gte("end_date", "2026-10-15")
        .order_asc("scheduled_time");
    let rows = backend.select(Table::Testimonials, &query).await.unwrap();

    assert_eq!(rows, vec![json!({"id": 1, "sponsor": "Acme"})]);
    mock.assert_async().await;
}

#[tokio::test]
async fn update_patches_matching_rows() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PATCH", "/rest/v1/produced_content")
        .match_query(Matcher::UrlEncoded("id".into(), "eq.c1".into()))
        .match_header("prefer", "return=representation")
        .match_body(Matcher::PartialJson(json!({"status": "read"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id": "c1", "status": "read"}]"#)
        .create_async()
        .await;

    let backend = RestCollaborator::new(&config(&server.url(), Some("t"))).unwrap();
    let rows = backend
        .update(
            Table::ProducedContent,
            json!({"status": "read", "read_by": ["u1"]}),
            &[Filter::eq("id", "c1")],
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn current_actor_reads_auth_user() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/auth/v1/user")
        .match_header("authorization", "Bearer good")
        .with_status(200)
        .with_body(r#"{"id": "u1", "email": "ana@radio.test", "role": "authenticated"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/auth/v1/user")
        .match_header("authorization", "Bearer expired")
        .with_status(401)
        .with_body(r#"{"message": "JWT expired"}"#)
        .create_async()
        .await;

    let signed_in = RestCollaborator::new(&config(&server.url(), Some("good"))).unwrap();
    let actor = signed_in.current_actor().await.unwrap().unwrap();
    assert_eq!(actor.id.as_str(), "u1");
    assert_eq!(actor.email.as_deref(), Some("ana@radio.test"));

    let expired = RestCollaborator::new(&config(&server.url(), Some("expired"))).unwrap();
    assert!(expired.current_actor().await.unwrap().is_none());

    let anonymous = RestCollaborator::new(&config(&server.url(), None)).unwrap();
    assert!(anonymous.current_actor().await.unwrap().is_none());
}

#[tokio::test]
async fn http_errors_are_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/v1/programs")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("upstream down")
        .expect(1)
        .create_async()
        .await;

    let backend = RestCollaborator::new(&config(&server.url(), None)).unwrap();
    let err = backend.ping().await.unwrap_err();

    assert!(matches!(err, StoreError::Api { status: 503, .. }));
    assert!(err.is_connectivity_error());
    mock.assert_async().await;
}

#[tokio::test]
async fn bad_request_is_not_a_connectivity_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/rest/v1/programs")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"message": "column does not exist"}"#)
        .create_async()
        .await;

    let backend = RestCollaborator::new(&config(&server.url(), None)).unwrap();
    let err = backend
        .select(Table::Programs, &Query::new())
        .await
        .unwrap_err();
    assert!(!err.is_connectivity_error());
}

#[tokio::test]
async fn unreachable_backend_is_connectivity_error() {
    // Nothing listens on port 1; every attempt is refused.
    let backend = RestCollaborator::new(&config("http://127.0.0.1:1", None)).unwrap();
    let err = backend
        .select(Table::Programs, &Query::new())
        .await
        .unwrap_err();
    assert!(err.is_connectivity_error(), "got {err}");
}
