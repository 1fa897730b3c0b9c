//! WebSocket stream integration tests
//!
//! Run with: cargo test -p integration-tests --test stream_tests

use std::time::Duration;

use integration_tests::*;
use live_common::ChatConfig;
use live_core::{ChatUser, Snowflake};
use live_gateway::protocol::{event_names, OpCode, ReadyPayload};
use reqwest::StatusCode;

async fn post(
    server: &TestServer,
    user: &ChatUser,
    id: Snowflake,
    request: SendMessageRequest,
) -> MessageResponse {
    let response = server
        .post_as(user, &format!("/api/v1/sessions/{id}/messages"), &request)
        .await
        .unwrap();
    let sent: Envelope<MessageResponse> = assert_json(response, StatusCode::CREATED).await.unwrap();
    sent.data
}

#[tokio::test]
async fn test_hello_then_ready() {
    let server = TestServer::start_with(ChatConfig {
        heartbeat_interval_ms: 30_000,
        ..Default::default()
    })
    .await
    .unwrap();
    let host = host();
    let id = unique_id();
    server.open_session(&host, id).await.unwrap();

    let mut stream = server.connect(&student(), id, None).await.unwrap();

    let hello = stream.next_message().await.unwrap();
    assert_eq!(hello.op, OpCode::Hello);
    assert_eq!(hello.d.unwrap()["heartbeat_interval"], 30_000);

    let ready = stream.next_message().await.unwrap();
    assert!(ready.is_event(event_names::READY));
    let payload: ReadyPayload = ready.data().unwrap();
    assert_eq!(payload.session_id, id);
    assert_eq!(payload.last_seq, 0);
}

/// Host welcome, student reply, host announcement; a late joiner replays
/// all three in order.
#[tokio::test]
async fn test_lecture_flow() {
    let server = TestServer::start().await.unwrap();
    let host = host();
    let student = student();
    let id = unique_id();
    server.open_session(&host, id).await.unwrap();

    post(&server, &host, id, SendMessageRequest::chat("Welcome")).await;

    let mut stream = server.connect(&student, id, None).await.unwrap();
    let replay = stream.until_ready().await.unwrap();
    assert_eq!(replay.len(), 1);
    assert_eq!(replay[0].s, Some(1));

    let hi = post(&server, &student, id, SendMessageRequest::chat("hi")).await;
    assert_eq!(hi.seq, 2);
    assert_eq!(stream.next_seq().await.unwrap(), 2);

    let quiz = post(&server, &host, id, SendMessageRequest::announcement("Quiz starts now")).await;
    assert_eq!(quiz.seq, 3);
    assert_eq!(stream.next_seq().await.unwrap(), 3);

    let late_joiner = ChatUser::participant(unique_id());
    let mut late = server.connect(&late_joiner, id, None).await.unwrap();
    let replay = late.until_ready().await.unwrap();
    let seqs: Vec<_> = replay.iter().map(|m| m.s.unwrap()).collect();
    assert_eq!(seqs, vec![1, 2, 3]);

    let last: MessageResponse = replay[2].data().unwrap();
    assert!(last.is_announcement);
    assert_eq!(last.body, "Quiz starts now");
}

#[tokio::test]
async fn test_resume_skips_seen_messages() {
    let server = TestServer::start().await.unwrap();
    let host = host();
    let student = student();
    let id = unique_id();
    server.open_session(&host, id).await.unwrap();

    post(&server, &host, id, SendMessageRequest::chat("Welcome")).await;
    post(&server, &host, id, SendMessageRequest::chat("Agenda")).await;

    let mut first = server.connect(&student, id, None).await.unwrap();
    first.until_ready().await.unwrap();
    drop(first);

    post(&server, &host, id, SendMessageRequest::announcement("Quiz")).await;

    let mut resumed = server.connect(&student, id, Some(2)).await.unwrap();
    let replay = resumed.until_ready().await.unwrap();
    let seqs: Vec<_> = replay.iter().map(|m| m.s.unwrap()).collect();
    assert_eq!(seqs, vec![3]);

    post(&server, &host, id, SendMessageRequest::chat("live")).await;
    assert_eq!(resumed.next_seq().await.unwrap(), 4);
}

#[tokio::test]
async fn test_resume_ahead_of_server_still_goes_live() {
    let server = TestServer::start().await.unwrap();
    let host = host();
    let student = student();
    let id = unique_id();
    server.open_session(&host, id).await.unwrap();

    post(&server, &host, id, SendMessageRequest::chat("Welcome")).await;

    let mut stream = server.connect(&student, id, Some(50)).await.unwrap();
    let hello = stream.next_message().await.unwrap();
    assert_eq!(hello.op, OpCode::Hello);

    let ready = stream.next_message().await.unwrap();
    assert!(ready.is_event(event_names::READY));
    let payload: ReadyPayload = ready.data().unwrap();
    assert_eq!(payload.last_seq, 1);

    for expected in 2..=4 {
        post(&server, &host, id, SendMessageRequest::chat("live")).await;
        assert_eq!(stream.next_seq().await.unwrap(), expected);
    }
}

#[tokio::test]
async fn test_every_participant_sees_the_same_order() {
    let server = TestServer::start().await.unwrap();
    let host = host();
    let id = unique_id();
    server.open_session(&host, id).await.unwrap();

    let students: Vec<_> = (0..3).map(|_| student()).collect();
    let mut streams = Vec::new();
    for student in &students {
        let mut stream = server.connect(student, id, None).await.unwrap();
        stream.until_ready().await.unwrap();
        streams.push(stream);
    }

    for (i, student) in students.iter().enumerate() {
        post(&server, student, id, SendMessageRequest::chat(&format!("m{i}"))).await;
        post(&server, &host, id, SendMessageRequest::chat(&format!("h{i}"))).await;
    }

    for stream in &mut streams {
        for expected in 1..=6 {
            assert_eq!(stream.next_seq().await.unwrap(), expected);
        }
    }
}

#[tokio::test]
async fn test_close_ends_streams() {
    let server = TestServer::start().await.unwrap();
    let host = host();
    let student = student();
    let id = unique_id();
    server.open_session(&host, id).await.unwrap();

    let mut stream = server.connect(&student, id, None).await.unwrap();
    stream.until_ready().await.unwrap();

    server.close_session(&host, id).await.unwrap();

    let ended = stream.next_message().await.unwrap();
    assert!(ended.is_event(event_names::SESSION_ENDED));
    assert_eq!(stream.close_code().await.unwrap(), Some(4004));

    let response = server
        .post_as(&student, &format!("/api/v1/sessions/{id}/messages"), &SendMessageRequest::chat("still here?"))
        .await
        .unwrap();
    assert_status(response, StatusCode::CONFLICT).await.unwrap();
}

#[tokio::test]
async fn test_connect_refusals() {
    let server = TestServer::start().await.unwrap();
    let host = host();
    let student = student();

    // unknown session: refused before the upgrade
    let url = server.stream_url(unique_id(), &server.token(&student), None);
    assert_eq!(server.connect_status(&url).await.unwrap(), 404);

    // no token
    let url = format!("ws://{}/api/v1/sessions/{}/stream", server.addr, unique_id());
    assert_eq!(server.connect_status(&url).await.unwrap(), 401);

    // scheduled session: upgraded, then closed with 4003
    let response = server
        .post_as(&host, "/api/v1/sessions", &ScheduleSessionRequest::default())
        .await
        .unwrap();
    let created: Envelope<SessionResponse> = assert_json(response, StatusCode::CREATED).await.unwrap();

    let mut stream = server.connect(&student, created.data.id, None).await.unwrap();
    assert_eq!(stream.close_code().await.unwrap(), Some(4003));
}

#[tokio::test]
async fn test_heartbeat_ack_and_timeout() {
    let server = TestServer::start_with(ChatConfig {
        heartbeat_interval_ms: 200,
        ..Default::default()
    })
    .await
    .unwrap();
    let host = host();
    let id = unique_id();
    server.open_session(&host, id).await.unwrap();

    let mut stream = server.connect(&student(), id, None).await.unwrap();
    stream.until_ready().await.unwrap();

    stream.heartbeat().await.unwrap();
    let ack = stream.next_message().await.unwrap();
    assert_eq!(ack.op, OpCode::HeartbeatAck);

    // silent for well over two intervals
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(stream.close_code().await.unwrap(), Some(4005));
}

#[tokio::test]
async fn test_bad_frames_close_the_stream() {
    let server = TestServer::start().await.unwrap();
    let host = host();
    let id = unique_id();
    server.open_session(&host, id).await.unwrap();

    let mut stream = server.connect(&student(), id, None).await.unwrap();
    stream.until_ready().await.unwrap();
    stream.send_raw("{not json").await.unwrap();
    assert_eq!(stream.close_code().await.unwrap(), Some(4002));

    let mut stream = server.connect(&student(), id, None).await.unwrap();
    stream.until_ready().await.unwrap();
    stream.send_raw(r#"{"op":0,"t":"MESSAGE_CREATE"}"#).await.unwrap();
    assert_eq!(stream.close_code().await.unwrap(), Some(4001));
}

#[tokio::test]
async fn test_leaving_drops_participation() {
    let server = TestServer::start().await.unwrap();
    let host = host();
    let student = student();
    let id = unique_id();
    server.open_session(&host, id).await.unwrap();

    let mut stream = server.connect(&student, id, None).await.unwrap();
    stream.until_ready().await.unwrap();
    drop(stream);

    // the server notices the dropped socket asynchronously
    let mut participants = vec![student.id];
    for _ in 0..50 {
        let response = server
            .get_as(&host, &format!("/api/v1/sessions/{id}/participants"))
            .await
            .unwrap();
        let body: Envelope<ParticipantsResponse> = assert_json(response, StatusCode::OK).await.unwrap();
        participants = body.data.participants;
        if participants.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(participants.is_empty());
}
