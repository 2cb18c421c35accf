//! Integration tests for the server, handler and full connection flow,
//! over real WebSocket clients.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use ito_server::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns the address.
async fn start_server(builder: ItoServerBuilder) -> String {
    let server = builder
        .bind("127.0.0.1:0")
        .seed(11)
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send_action(ws: &mut ClientWs, seq: u64, action: ClientAction) {
    let text = serde_json::to_string(&ClientEnvelope { seq, action }).expect("encode");
    ws.send(Message::Text(text.into())).await.expect("send");
}

async fn login(ws: &mut ClientWs, participant: &str) {
    send_action(
        ws,
        1,
        ClientAction::Login {
            participant: ParticipantId::new(participant),
            name: participant.to_string(),
        },
    )
    .await;
}

/// Next envelope from the server, failing after two seconds.
async fn recv(ws: &mut ClientWs) -> ServerEnvelope {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for server")
        .expect("stream ended")
        .expect("recv error");
    assert!(msg.is_text(), "server frames are JSON text");
    serde_json::from_slice(&msg.into_data()).expect("decode")
}

/// Skips envelopes until one matches.
async fn recv_until(
    ws: &mut ClientWs,
    pred: impl Fn(&ServerEvent) -> bool,
) -> ServerEnvelope {
    loop {
        let env = recv(ws).await;
        if pred(&env.event) {
            return env;
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_login_receives_snapshot_first() {
    let addr = start_server(ItoServer::builder()).await;
    let mut ws = connect(&addr).await;

    login(&mut ws, "ann").await;

    let env = recv(&mut ws).await;
    assert_eq!(env.seq, 1);
    assert!(env.timestamp > 0);
    match env.event {
        ServerEvent::LoginSuccess {
            me, config, active_count, ..
        } => {
            assert_eq!(me.id, ParticipantId::new("ann"));
            assert_eq!(config.status, Status::Waiting);
            assert_eq!(active_count, 1);
        }
        other => panic!("expected LoginSuccess, got {other:?}"),
    }
    assert_eq!(recv(&mut ws).await.seq, 2);
}

#[tokio::test]
async fn test_heartbeat_response() {
    let addr = start_server(ItoServer::builder()).await;
    let mut ws = connect(&addr).await;

    send_action(&mut ws, 1, ClientAction::Heartbeat { client_time: 12345 }).await;

    match recv(&mut ws).await.event {
        ServerEvent::HeartbeatAck {
            client_time,
            server_time,
        } => {
            assert_eq!(client_time, 12345);
            assert!(server_time > 0);
        }
        other => panic!("expected HeartbeatAck, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_frame_gets_error_400() {
    let addr = start_server(ItoServer::builder()).await;
    let mut ws = connect(&addr).await;

    ws.send(Message::Text(r#"{"action":{"type":"Dance"}}"#.into()))
        .await
        .expect("send");

    match recv(&mut ws).await.event {
        ServerEvent::Error { code, .. } => assert_eq!(code, 400),
        other => panic!("expected Error 400, got {other:?}"),
    }
}

#[tokio::test]
async fn test_oversized_field_gets_error_400() {
    let addr = start_server(ItoServer::builder()).await;
    let mut ws = connect(&addr).await;

    send_action(
        &mut ws,
        1,
        ClientAction::Login {
            participant: ParticipantId::new("ann"),
            name: "n".repeat(ito_protocol::MAX_NAME_LEN + 1),
        },
    )
    .await;

    match recv(&mut ws).await.event {
        ServerEvent::Error { code, message } => {
            assert_eq!(code, 400);
            assert!(message.contains("name"));
        }
        other => panic!("expected Error 400, got {other:?}"),
    }
}

#[tokio::test]
async fn test_action_before_login_is_rejected() {
    let addr = start_server(ItoServer::builder()).await;
    let mut ws = connect(&addr).await;

    send_action(&mut ws, 1, ClientAction::RevealCards).await;

    match recv(&mut ws).await.event {
        ServerEvent::Rejected { action, reason } => {
            assert_eq!(action, "RevealCards");
            assert_eq!(reason, "login required");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_chat_broadcast_reaches_everyone() {
    let addr = start_server(ItoServer::builder()).await;
    let mut ann = connect(&addr).await;
    let mut bob = connect(&addr).await;
    login(&mut ann, "ann").await;
    recv_until(&mut ann, |e| matches!(e, ServerEvent::LoginSuccess { .. })).await;
    login(&mut bob, "bob").await;
    recv_until(&mut bob, |e| matches!(e, ServerEvent::LoginSuccess { .. })).await;

    send_action(&mut bob, 2, ClientAction::SendChat { text: "hello".into() }).await;

    for ws in [&mut ann, &mut bob] {
        let env = recv_until(ws, |e| matches!(e, ServerEvent::ChatMessage { .. })).await;
        match env.event {
            ServerEvent::ChatMessage { message } => {
                assert_eq!(message.name, "bob");
                assert_eq!(message.text, "hello");
            }
            other => panic!("expected ChatMessage, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_closed_socket_marks_participant_offline() {
    let addr = start_server(ItoServer::builder()).await;
    let mut ann = connect(&addr).await;
    let mut bob = connect(&addr).await;
    login(&mut ann, "ann").await;
    recv_until(&mut ann, |e| matches!(e, ServerEvent::LoginSuccess { .. })).await;
    login(&mut bob, "bob").await;
    recv_until(&mut bob, |e| matches!(e, ServerEvent::LoginSuccess { .. })).await;

    bob.close(None).await.expect("close");

    recv_until(&mut ann, |e| {
        matches!(
            e,
            ServerEvent::PlayerList { players }
                if players.iter().any(|p| p.id.as_str() == "bob" && !p.online)
        )
    })
    .await;
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let addr = start_server(
        ItoServer::builder().idle_timeout(Duration::from_millis(200)),
    )
    .await;
    let mut ws = connect(&addr).await;

    let result = tokio::time::timeout(Duration::from_secs(2), ws.next()).await;

    match result {
        Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {} // expected
        Ok(Some(Err(_))) => {}                           // also fine
        other => panic!("expected close, got {other:?}"),
    }
}

#[tokio::test]
async fn test_round_played_over_the_wire() {
    let addr = start_server(ItoServer::builder()).await;
    let mut ann = connect(&addr).await;
    let mut bob = connect(&addr).await;
    login(&mut ann, "ann").await;
    recv_until(&mut ann, |e| matches!(e, ServerEvent::LoginSuccess { .. })).await;
    login(&mut bob, "bob").await;
    recv_until(&mut bob, |e| matches!(e, ServerEvent::LoginSuccess { .. })).await;

    send_action(&mut ann, 2, ClientAction::StartGame { mode: None }).await;
    send_action(&mut ann, 3, ClientAction::UpdateTheme { theme: "Size".into() }).await;

    let mut cards = Vec::new();
    for ws in [&mut ann, &mut bob] {
        let env = recv_until(ws, |e| {
            matches!(e, ServerEvent::YourHand { cards } if !cards.is_empty())
        })
        .await;
        if let ServerEvent::YourHand { cards: hand } = env.event {
            cards.push(hand[0].clone());
        }
    }
    // Play in order, so the reveal succeeds.
    let (low, high) = if cards[0].number < cards[1].number { (0, 1) } else { (1, 0) };
    let mut sockets = [ann, bob];
    send_action(&mut sockets[low], 4, ClientAction::PlayCard { card: cards[low].id.clone() }).await;
    // Table order is arrival order: wait for the first card to land.
    recv_until(&mut sockets[high], |e| {
        matches!(e, ServerEvent::TableUpdated { cards } if cards.len() == 1)
    })
    .await;
    send_action(&mut sockets[high], 4, ClientAction::PlayCard { card: cards[high].id.clone() }).await;
    recv_until(&mut sockets[0], |e| {
        matches!(e, ServerEvent::TableUpdated { cards } if cards.len() == 2)
    })
    .await;
    send_action(&mut sockets[0], 5, ClientAction::RevealCards).await;

    let env = recv_until(&mut sockets[1], |e| matches!(e, ServerEvent::GameResult { .. })).await;
    match env.event {
        ServerEvent::GameResult { table, success, .. } => {
            assert!(success);
            assert!(table.iter().all(|c| c.number.is_some()));
        }
        other => panic!("expected GameResult, got {other:?}"),
    }
}
