//! REST API integration tests
//!
//! Each test spawns its own gateway with in-memory storage.
//!
//! Run with: cargo test -p integration-tests --test api_tests

use integration_tests::*;
use reqwest::StatusCode;
use serde_json::json;

// ============================================================================
// Health & auth
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.unwrap();
    let response = server.get("/health").await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_missing_and_bad_tokens() {
    let server = TestServer::start().await.unwrap();

    let response = server.get("/api/v1/sessions/1").await.unwrap();
    let error: ErrorEnvelope = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert!(!error.success);
    assert_eq!(error.code, "MISSING_AUTH");

    let response = server
        .client
        .get(format!("{}/api/v1/sessions/1", server.base_url()))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    let error: ErrorEnvelope = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(error.code, "INVALID_TOKEN");
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_schedule_then_open_then_close() {
    let server = TestServer::start().await.unwrap();
    let host = host();

    let response = server
        .post_as(&host, "/api/v1/sessions", &ScheduleSessionRequest::default())
        .await
        .unwrap();
    let created: Envelope<SessionResponse> =
        assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(created.data.state, "scheduled");
    assert_eq!(created.data.host_id, host.id);
    let id = created.data.id;

    // scheduled sessions take no messages
    let response = server
        .post_as(&host, &format!("/api/v1/sessions/{id}/messages"), &SendMessageRequest::chat("early"))
        .await
        .unwrap();
    let error: ErrorEnvelope = assert_json(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(error.code, "SESSION_NOT_ACTIVE");

    server.open_session(&host, id).await.unwrap();
    let response = server.get_as(&host, &format!("/api/v1/sessions/{id}")).await.unwrap();
    let session: Envelope<SessionResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(session.data.state, "active");

    server.close_session(&host, id).await.unwrap();
    // closing again is a no-op
    server.close_session(&host, id).await.unwrap();

    let response = server.action_as(&host, &format!("/api/v1/sessions/{id}/open")).await.unwrap();
    assert_status(response, StatusCode::CONFLICT).await.unwrap();
}

#[tokio::test]
async fn test_lifecycle_permissions() {
    let server = TestServer::start().await.unwrap();
    let host = host();
    let student = student();
    let id = unique_id();

    let response = server.action_as(&student, &format!("/api/v1/sessions/{id}/open")).await.unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();

    server.open_session(&host, id).await.unwrap();

    let response = server.action_as(&student, &format!("/api/v1/sessions/{id}/close")).await.unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();

    server.close_session(&moderator(), id).await.unwrap();
}

#[tokio::test]
async fn test_unknown_session() {
    let server = TestServer::start().await.unwrap();
    let id = unique_id();

    let response = server.get_as(&host(), &format!("/api/v1/sessions/{id}")).await.unwrap();
    let error: ErrorEnvelope = assert_json(response, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(error.code, "UNKNOWN_SESSION");

    let response = server
        .get_as(&host(), &format!("/api/v1/sessions/{id}/messages"))
        .await
        .unwrap();
    assert_status(response, StatusCode::NOT_FOUND).await.unwrap();
}

// ============================================================================
// Messages
// ============================================================================

#[tokio::test]
async fn test_host_posts_and_history_pages() {
    let server = TestServer::start().await.unwrap();
    let host = host();
    let id = unique_id();
    server.open_session(&host, id).await.unwrap();

    for body in ["one", "two", "three"] {
        let response = server
            .post_as(&host, &format!("/api/v1/sessions/{id}/messages"), &SendMessageRequest::chat(body))
            .await
            .unwrap();
        assert_status(response, StatusCode::CREATED).await.unwrap();
    }

    let response = server
        .get_as(&host, &format!("/api/v1/sessions/{id}/messages?page=2&per_page=2"))
        .await
        .unwrap();
    let history: Envelope<HistoryResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(history.data.total, 3);
    assert_eq!(history.data.page, 2);
    assert!(!history.data.has_next);
    assert_eq!(history.data.messages.len(), 1);
    assert_eq!(history.data.messages[0].seq, 3);
    assert_eq!(history.data.messages[0].body, "three");
}

#[tokio::test]
async fn test_student_must_join_before_posting() {
    let server = TestServer::start().await.unwrap();
    let host = host();
    let student = student();
    let id = unique_id();
    server.open_session(&host, id).await.unwrap();

    let response = server
        .post_as(&student, &format!("/api/v1/sessions/{id}/messages"), &SendMessageRequest::chat("hi"))
        .await
        .unwrap();
    let error: ErrorEnvelope = assert_json(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(error.code, "NOT_PARTICIPANT");

    let mut stream = server.connect(&student, id, None).await.unwrap();
    stream.until_ready().await.unwrap();

    let response = server
        .post_as(&student, &format!("/api/v1/sessions/{id}/messages"), &SendMessageRequest::chat("hi"))
        .await
        .unwrap();
    let sent: Envelope<MessageResponse> = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(sent.data.author_id, Some(student.id));

    let response = server
        .get_as(&host, &format!("/api/v1/sessions/{id}/participants"))
        .await
        .unwrap();
    let participants: Envelope<ParticipantsResponse> =
        assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(participants.data.participants, vec![student.id]);
}

#[tokio::test]
async fn test_announcement_rules() {
    let server = TestServer::start().await.unwrap();
    let host = host();
    let student = student();
    let id = unique_id();
    server.open_session(&host, id).await.unwrap();

    let mut stream = server.connect(&student, id, None).await.unwrap();
    stream.until_ready().await.unwrap();

    let response = server
        .post_as(&student, &format!("/api/v1/sessions/{id}/messages"), &SendMessageRequest::announcement("listen"))
        .await
        .unwrap();
    let error: ErrorEnvelope = assert_json(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(error.code, "FORBIDDEN");

    let response = server
        .post_as(&host, &format!("/api/v1/sessions/{id}/messages"), &SendMessageRequest::announcement("Quiz"))
        .await
        .unwrap();
    let sent: Envelope<MessageResponse> = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert!(sent.data.is_announcement);
    assert_eq!(sent.data.seq, 1);

    let response = server
        .post_as(&host, &format!("/api/v1/sessions/{id}/announcements"), &json!({ "message": "Break" }))
        .await
        .unwrap();
    let system: Envelope<MessageResponse> = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert!(system.data.author_id.is_none());
    assert_eq!(system.data.seq, 2);
}

#[tokio::test]
async fn test_body_validation() {
    let server = TestServer::start_with(live_common::ChatConfig {
        max_body_length: 10,
        ..Default::default()
    })
    .await
    .unwrap();
    let host = host();
    let id = unique_id();
    server.open_session(&host, id).await.unwrap();
    let path = format!("/api/v1/sessions/{id}/messages");

    let response = server.post_as(&host, &path, &SendMessageRequest::chat("")).await.unwrap();
    assert_status(response, StatusCode::UNPROCESSABLE_ENTITY).await.unwrap();

    let response = server.post_as(&host, &path, &SendMessageRequest::chat("   ")).await.unwrap();
    assert_status(response, StatusCode::UNPROCESSABLE_ENTITY).await.unwrap();

    let response = server
        .post_as(&host, &path, &SendMessageRequest::chat("far too long for this"))
        .await
        .unwrap();
    let error: ErrorEnvelope = assert_json(response, StatusCode::UNPROCESSABLE_ENTITY).await.unwrap();
    assert_eq!(error.code, "MESSAGE_TOO_LONG");

    let response = server.post_as(&host, &path, &json!({ "is_announcement": true })).await.unwrap();
    assert_status(response, StatusCode::BAD_REQUEST).await.unwrap();

    // nothing was written
    let response = server.get_as(&host, &path).await.unwrap();
    let history: Envelope<HistoryResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(history.data.total, 0);
}
