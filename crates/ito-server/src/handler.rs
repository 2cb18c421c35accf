//! Per-connection handler: decode, validate and relay.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register with the room and get an outbound event channel
//!   2. Loop: receive frames → decode → validate → forward to the room,
//!      and push room events back out, whichever comes first
//!   3. On close, error or idle timeout, tell the room the connection left

use std::time::Duration;

use ito_protocol::{ClientAction, ClientEnvelope, Codec, ServerEnvelope, ServerEvent};
use ito_session::unix_millis;
use ito_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::ServerError;
use crate::room::RoomHandle;

/// Drop guard that reports the connection closed when the handler exits.
///
/// Runs even when the handler bails out early with `?`. `Drop` is
/// synchronous, so the async send goes to a fire-and-forget task.
struct ConnectionGuard {
    conn_id: ConnectionId,
    room: RoomHandle,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let room = self.room.clone();
        tokio::spawn(async move {
            let _ = room.disconnect(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    room: RoomHandle,
    codec: C,
    idle_timeout: Duration,
) -> Result<(), ServerError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    room.connect(conn_id, events_tx).await?;
    let _guard = ConnectionGuard {
        conn_id,
        room: room.clone(),
    };

    let mut seq: u64 = 1;
    let mut idle_deadline = Instant::now() + idle_timeout;

    loop {
        tokio::select! {
            incoming = time::timeout_at(idle_deadline, conn.recv()) => {
                let data = match incoming {
                    Ok(Ok(Some(data))) => data,
                    Ok(Ok(None)) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Ok(Err(e)) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                    Err(_) => {
                        tracing::info!(%conn_id, "connection idle, closing");
                        let _ = conn.close().await;
                        break;
                    }
                };
                idle_deadline = Instant::now() + idle_timeout;
                handle_frame(&conn, &room, &codec, &data, &mut seq).await?;
            }
            Some(event) = events_rx.recv() => {
                send_event(&conn, &codec, event, &mut seq).await?;
            }
        }
    }

    // _guard drops here → room disconnect fires.
    Ok(())
}

/// Decodes and validates one inbound frame, then answers or forwards it.
async fn handle_frame<C: Codec>(
    conn: &WebSocketConnection,
    room: &RoomHandle,
    codec: &C,
    data: &[u8],
    seq: &mut u64,
) -> Result<(), ServerError> {
    let conn_id = conn.id();
    let envelope: ClientEnvelope = match codec.decode(data) {
        Ok(env) => env,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
            let event = ServerEvent::Error {
                code: 400,
                message: format!("invalid message: {e}"),
            };
            return send_event(conn, codec, event, seq).await;
        }
    };

    if let Err(e) = envelope.action.validate() {
        tracing::debug!(
            %conn_id,
            seq = envelope.seq,
            action = envelope.action.name(),
            error = %e,
            "invalid action"
        );
        let event = ServerEvent::Error {
            code: 400,
            message: e.to_string(),
        };
        return send_event(conn, codec, event, seq).await;
    }

    match envelope.action {
        ClientAction::Heartbeat { client_time } => {
            let ack = ServerEvent::HeartbeatAck {
                client_time,
                server_time: unix_millis(),
            };
            send_event(conn, codec, ack, seq).await
        }
        action => {
            tracing::trace!(%conn_id, seq = envelope.seq, action = action.name(), "forwarding");
            room.action(conn_id, action).await
        }
    }
}

/// Wraps `event` in an envelope and sends it.
async fn send_event<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    event: ServerEvent,
    seq: &mut u64,
) -> Result<(), ServerError> {
    let envelope = ServerEnvelope {
        seq: next_seq(seq),
        timestamp: unix_millis(),
        event,
    };
    let bytes = codec.encode(&envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_seq_counts_up_from_current() {
        let mut seq = 1;
        assert_eq!(next_seq(&mut seq), 1);
        assert_eq!(next_seq(&mut seq), 2);
        assert_eq!(seq, 3);
    }
}
