//! Per-connection driver: reader, writer and keep-alive loops sharing one
//! cancellation token.

use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{interval_at, sleep, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::relay::{self, ConnectionHandle, Outbound, RelayError, SessionId};
use crate::AppState;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no frame received within {0:?}")]
    IdleTimeout(Duration),
    #[error("write did not complete within {0:?}")]
    WriteTimeout(Duration),
    #[error("transport error: {0}")]
    Transport(#[from] axum::Error),
}

/// Why the reader stopped.
#[derive(Debug)]
enum CloseReason {
    PeerClosed,
    Cancelled,
    Failed(TransportError),
}

/// Run one upgraded connection from attach to teardown.
pub async fn run_connection(socket: WebSocket, session_id: SessionId, state: AppState) {
    let (handle, outbound) = ConnectionHandle::new(session_id, state.shutdown.child_token());
    let (sink, stream) = socket.split();

    state.registry.attach(&handle).await;

    let writer = tokio::spawn(write_loop(sink, outbound, handle.cancel.clone(), state.relay));
    let keepalive = tokio::spawn(keepalive_loop(handle.clone(), state.relay.ping_period));

    let reason = read_loop(stream, &handle, &state).await;
    match &reason {
        CloseReason::Failed(e) => {
            info!(session = %handle.session_id, conn = %handle.id, error = %e, "connection closing")
        }
        other => info!(session = %handle.session_id, conn = %handle.id, reason = ?other, "connection closing"),
    }

    // Detach first so an emptied session is pruned before the writer's grace period.
    state.registry.detach(&handle).await;
    handle.cancel.cancel();

    let _ = keepalive.await;
    let _ = writer.await;
    let live_sessions = state.registry.session_count().await;
    debug!(
        session = %handle.session_id,
        conn = %handle.id,
        live_sessions,
        "connection closed"
    );
}

async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    handle: &ConnectionHandle,
    state: &AppState,
) -> CloseReason {
    let pong_wait = state.relay.pong_wait;
    loop {
        let next = tokio::select! {
            _ = handle.cancel.cancelled() => return CloseReason::Cancelled,
            next = timeout(pong_wait, stream.next()) => next,
        };

        let msg = match next {
            Err(_) => return CloseReason::Failed(TransportError::IdleTimeout(pong_wait)),
            Ok(None) => return CloseReason::PeerClosed,
            Ok(Some(Err(e))) => return CloseReason::Failed(e.into()),
            Ok(Some(Ok(msg))) => msg,
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => {
                    warn!(session = %handle.session_id, conn = %handle.id, error = %e, "dropping non-utf8 message");
                    continue;
                }
            },
            Message::Close(_) => return CloseReason::PeerClosed,
            // Any frame, pongs included, resets the idle timer.
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        match relay::process_message(&state.registry, handle, &text).await {
            Ok(_) => {}
            Err(RelayError::UnknownSession(id)) => {
                warn!(session = %id, conn = %handle.id, "session vanished, cancelling connection");
                handle.cancel.cancel();
            }
            Err(e) => {
                warn!(session = %handle.session_id, conn = %handle.id, error = %e, "processing message");
            }
        }
    }
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: UnboundedReceiver<Outbound>,
    cancel: CancellationToken,
    relay: RelayConfig,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = outbound.recv() => {
                let Some(item) = next else { break };
                let frame = match item {
                    Outbound::State(payload) => Message::Text(payload.to_string()),
                    Outbound::Ping => Message::Ping(Vec::new()),
                };
                if let Err(e) = write_frame(&mut sink, frame, relay.write_wait).await {
                    warn!(error = %e, "write error");
                    cancel.cancel();
                    break;
                }
            }
        }
    }

    debug!("closing send channel");
    let close = Message::Close(Some(CloseFrame {
        code: close_code::NORMAL,
        reason: "".into(),
    }));
    if let Err(e) = write_frame(&mut sink, close, relay.write_wait).await {
        debug!(error = %e, "close frame not delivered");
    }
    sleep(relay.close_grace).await;
    let _ = sink.close().await;
}

async fn write_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    frame: Message,
    write_wait: Duration,
) -> Result<(), TransportError> {
    match timeout(write_wait, sink.send(frame)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(TransportError::WriteTimeout(write_wait)),
    }
}

async fn keepalive_loop(handle: ConnectionHandle, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = handle.cancel.cancelled() => return,
            _ = ticker.tick() => {
                if !handle.enqueue(Outbound::Ping) {
                    return;
                }
            }
        }
    }
}
