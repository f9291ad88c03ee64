//! `POST /slack/events`: Events API webhook.

use super::signature;
use super::state::ApiState;
use crate::messaging::slack::strip_bot_mention;
use crate::messaging::{AppMentionEvent, MessageEvent, OutboundReply, SlackEnvelope, SlackEvent};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

pub(super) async fn slack_events(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::warn!(%error, "slack webhook body is not valid JSON");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let envelope: SlackEnvelope = match serde_json::from_value(payload.clone()) {
        Ok(envelope) => envelope,
        Err(error) => {
            tracing::warn!(%error, "slack webhook body is not a recognizable envelope");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match envelope {
        // The handshake is answered before signature checks so the request URL
        // can be registered.
        SlackEnvelope::UrlVerification { challenge } => {
            tracing::info!("answering slack url verification");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain")],
                challenge,
            )
                .into_response()
        }
        SlackEnvelope::EventCallback { team_id, event } => {
            if let Err(rejection) = verify_request(&state, &headers, &body) {
                return rejection.into_response();
            }
            dispatch_event(&state, event, team_id.as_deref(), &payload);
            StatusCode::OK.into_response()
        }
        SlackEnvelope::Unknown => {
            if let Err(rejection) = verify_request(&state, &headers, &body) {
                return rejection.into_response();
            }
            tracing::debug!(
                envelope_type = payload["type"].as_str().unwrap_or(""),
                "ignoring unhandled slack envelope"
            );
            StatusCode::OK.into_response()
        }
    }
}

fn verify_request(state: &ApiState, headers: &HeaderMap, body: &[u8]) -> Result<(), StatusCode> {
    let Some(secret) = &state.signing_secret else {
        return Ok(());
    };
    let now = chrono::Utc::now().timestamp();
    signature::verify(secret, headers, body, now).map_err(|error| {
        tracing::warn!(%error, "rejected slack request");
        StatusCode::UNAUTHORIZED
    })
}

fn dispatch_event(
    state: &Arc<ApiState>,
    event: SlackEvent,
    team_id: Option<&str>,
    payload: &serde_json::Value,
) {
    match event {
        SlackEvent::AppMention(mention) => handle_app_mention(state, mention, team_id),
        SlackEvent::Message(message) => handle_message(&message),
        SlackEvent::Unknown => {
            tracing::debug!(
                event_type = payload["event"]["type"].as_str().unwrap_or(""),
                "ignoring unhandled slack event type"
            );
        }
    }
}

/// Answer a mention in the background; Slack expects the ack within three seconds.
fn handle_app_mention(state: &Arc<ApiState>, mention: AppMentionEvent, team_id: Option<&str>) {
    if mention.user.as_deref() == Some(state.bot_user_id.as_str()) {
        tracing::debug!(channel = %mention.channel, "ignoring mention from the bot itself");
        return;
    }

    let query = strip_bot_mention(&mention.text, &state.bot_user_id);
    tracing::info!(
        team_id = team_id.unwrap_or(""),
        channel = %mention.channel,
        user = mention.user.as_deref().unwrap_or(""),
        "app mention received"
    );

    let task_state = Arc::clone(state);
    state.spawn_task(async move {
        let state = task_state;
        let text = state.canopy.answer(&query).await;
        let reply = OutboundReply {
            channel: mention.channel,
            thread_ts: mention.thread_ts,
            text,
        };
        if let Err(error) = state.messaging.post_reply(reply).await {
            tracing::error!(
                %error,
                adapter = state.messaging.name(),
                "failed to post reply"
            );
        }
    });
}

fn handle_message(message: &MessageEvent) {
    tracing::info!(
        channel = message.channel.as_deref().unwrap_or(""),
        user = message.user.as_deref().unwrap_or(""),
        bot_id = message.bot_id.as_deref().unwrap_or(""),
        subtype = message.subtype.as_deref().unwrap_or(""),
        ts = message.ts.as_deref().unwrap_or(""),
        thread_ts = message.thread_ts.as_deref().unwrap_or(""),
        text = message.text.as_deref().unwrap_or(""),
        "message event received"
    );
}

#[cfg(test)]
mod tests {
    use super::super::server::build_router;
    use super::super::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER, sign};
    use super::super::state::ApiState;
    use crate::canopy::{CanopyClient, PERSONA_PROMPT};
    use crate::config::CanopyConfig;
    use crate::error::Result;
    use crate::messaging::{Messaging, OutboundReply};

    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    const SECRET: &str = "test-signing-secret";
    const BOT: &str = "U123";

    /// Records replies instead of calling Slack.
    struct RecordingMessaging {
        replies: mpsc::UnboundedSender<OutboundReply>,
    }

    impl Messaging for RecordingMessaging {
        fn name(&self) -> &str {
            "recording"
        }

        async fn post_reply(&self, reply: OutboundReply) -> Result<()> {
            let _ = self.replies.send(reply);
            Ok(())
        }
    }

    fn test_state(server: &MockServer) -> (Arc<ApiState>, mpsc::UnboundedReceiver<OutboundReply>) {
        let canopy = CanopyClient::new(&CanopyConfig {
            api_url: server.url("/v1/chat/completions"),
            api_key: "sk-test".into(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        let (replies, received) = mpsc::unbounded_channel();
        let state = ApiState::new(
            BOT,
            Some(SECRET.to_string()),
            canopy,
            Arc::new(RecordingMessaging { replies }),
        );
        (Arc::new(state), received)
    }

    fn test_app(server: &MockServer) -> (Router, mpsc::UnboundedReceiver<OutboundReply>) {
        let (state, received) = test_state(server);
        (build_router(state), received)
    }

    fn request_with(body: &serde_json::Value, timestamp: &str, signature: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/slack/events")
            .header("content-type", "application/json")
            .header(TIMESTAMP_HEADER, timestamp)
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn signed_request(body: &serde_json::Value) -> Request<Body> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(SECRET, &timestamp, body.to_string().as_bytes());
        request_with(body, &timestamp, &signature)
    }

    fn mention(user: &str, text: &str) -> serde_json::Value {
        json!({
            "type": "event_callback",
            "team_id": "T1",
            "event": {
                "type": "app_mention",
                "user": user,
                "text": text,
                "channel": "C1",
                "ts": "1700000000.000100"
            }
        })
    }

    async fn next_reply(received: &mut mpsc::UnboundedReceiver<OutboundReply>) -> OutboundReply {
        tokio::time::timeout(Duration::from_secs(5), received.recv())
            .await
            .expect("reply within timeout")
            .expect("reply channel open")
    }

    #[tokio::test]
    async fn test_url_verification_echoes_challenge() {
        let server = MockServer::start_async().await;
        let (app, _received) = test_app(&server);

        let request = Request::builder()
            .method("POST")
            .uri("/slack/events")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"type":"url_verification","challenge":"abc123"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/plain");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"abc123");
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let server = MockServer::start_async().await;
        let (app, _received) = test_app(&server);

        let request = Request::builder()
            .method("POST")
            .uri("/slack/events")
            .body(Body::from("type=url_verification"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unsigned_event_is_rejected() {
        let server = MockServer::start_async().await;
        let completion = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).body(r#"{"choices":[{"message":{"content":"Hello"}}]}"#);
        });
        let (app, mut received) = test_app(&server);

        let request = Request::builder()
            .method("POST")
            .uri("/slack/events")
            .body(Body::from(mention("U999", "<@U123> hi").to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(received.try_recv().is_err());
        completion.assert_calls(0);
    }

    #[tokio::test]
    async fn test_badly_signed_events_are_rejected() {
        let server = MockServer::start_async().await;
        let completion = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).body(r#"{"choices":[{"message":{"content":"Hello"}}]}"#);
        });
        let (app, mut received) = test_app(&server);

        let body = mention("U999", "<@U123> hi");
        let payload = body.to_string();
        let now = chrono::Utc::now().timestamp();
        let fresh = now.to_string();
        let stale = (now - 600).to_string();
        let extreme = "-9223372036854775000";

        let requests = [
            request_with(&body, &fresh, &sign("wrong-secret", &fresh, payload.as_bytes())),
            request_with(&body, &stale, &sign(SECRET, &stale, payload.as_bytes())),
            request_with(&body, extreme, &sign(SECRET, extreme, payload.as_bytes())),
            request_with(&body, "not-a-number", "v0=00"),
        ];

        for request in requests {
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        assert!(received.try_recv().is_err());
        completion.assert_calls(0);
    }

    #[tokio::test]
    async fn test_drain_waits_for_in_flight_reply() {
        let server = MockServer::start_async().await;
        let completion = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .delay(Duration::from_millis(300))
                .body(r#"{"choices":[{"message":{"content":"late but here"}}]}"#);
        });
        let (state, mut received) = test_state(&server);
        let app = build_router(state.clone());

        let response = app
            .oneshot(signed_request(&mention("U999", "<@U123> still there?")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(received.try_recv().is_err());

        assert!(state.drain_tasks(Duration::from_secs(5)).await);

        let reply = received.try_recv().expect("reply posted before drain returned");
        assert_eq!(reply.text, "late but here");
        completion.assert_calls(1);
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_timeout() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .delay(Duration::from_secs(3))
                .body(r#"{"choices":[{"message":{"content":"too late"}}]}"#);
        });
        let (state, _received) = test_state(&server);
        let app = build_router(state.clone());

        let response = app
            .oneshot(signed_request(&mention("U999", "<@U123> slow one")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert!(!state.drain_tasks(Duration::from_millis(100)).await);
    }

    #[tokio::test]
    async fn test_mention_queries_canopy_with_stripped_text_and_replies() {
        let server = MockServer::start_async().await;
        let completion = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test")
                .json_body(json!({
                    "messages": [{
                        "role": "user",
                        "content": format!("{PERSONA_PROMPT} what is forageSF?")
                    }],
                    "stream": false,
                    "model": "GPT-4",
                    "temperature": 0.0
                }));
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"choices":[{"message":{"content":"Hello"}}]}"#);
        });
        let (app, mut received) = test_app(&server);

        let response = app
            .oneshot(signed_request(&mention("U999", "<@U123> what is forageSF?")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let reply = next_reply(&mut received).await;
        assert_eq!(
            reply,
            OutboundReply {
                channel: "C1".into(),
                thread_ts: None,
                text: "Hello".into(),
            }
        );
        completion.assert_calls(1);
    }

    #[tokio::test]
    async fn test_mention_in_thread_replies_in_thread() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).body(r#"{"choices":[{"message":{"content":"Hi"}}]}"#);
        });
        let (app, mut received) = test_app(&server);

        let mut body = mention("U999", "<@U123> hello");
        body["event"]["thread_ts"] = json!("1699999999.000050");
        let response = app.oneshot(signed_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let reply = next_reply(&mut received).await;
        assert_eq!(reply.thread_ts.as_deref(), Some("1699999999.000050"));
    }

    #[tokio::test]
    async fn test_canopy_failure_is_posted_as_reply_text() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(500);
        });
        let (app, mut received) = test_app(&server);

        let response = app
            .oneshot(signed_request(&mention("U999", "<@U123> anyone there?")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let reply = next_reply(&mut received).await;
        assert_eq!(reply.text, "Error: Could not get a response from the Canopy server");
    }

    #[tokio::test]
    async fn test_self_mention_is_ignored() {
        let server = MockServer::start_async().await;
        let completion = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).body(r#"{"choices":[{"message":{"content":"loop"}}]}"#);
        });
        let (app, mut received) = test_app(&server);

        let response = app
            .oneshot(signed_request(&mention(BOT, "<@U123> talking to myself")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(received.try_recv().is_err());
        completion.assert_calls(0);
    }

    #[tokio::test]
    async fn test_message_and_unknown_events_are_acknowledged_without_reply() {
        let server = MockServer::start_async().await;
        let completion = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).body(r#"{"choices":[{"message":{"content":"no"}}]}"#);
        });
        let (app, mut received) = test_app(&server);

        let bodies = [
            json!({
                "type": "event_callback",
                "event": {"type": "message", "user": "U999", "text": "just chatting", "channel": "C1", "ts": "1.2"}
            }),
            json!({
                "type": "event_callback",
                "event": {"type": "reaction_added", "reaction": "tada"}
            }),
            json!({"type": "app_rate_limited", "minute_rate_limited": 1}),
        ];

        for body in &bodies {
            let response = app.clone().oneshot(signed_request(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert!(received.try_recv().is_err());
        completion.assert_calls(0);
    }
}
