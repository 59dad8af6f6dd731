use aparajito_bridge::BridgeHandle;
use aparajito_models::gateway::{InboundMessage, UiCommand, UiEvent};
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Duration;

const PING_INTERVAL: Duration = Duration::from_secs(20);

async fn send_event(sender: &mut (impl SinkExt<Message> + Unpin), event: &UiEvent) -> Result<(), ()> {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(event = event.name(), "failed to encode event: {e}");
            return Ok(());
        }
    };
    tracing::trace!(event = event.name(), %payload, "ws out");
    sender
        .send(Message::Text(payload.into()))
        .await
        .map_err(|_| ())
}

async fn send_close(sender: &mut (impl SinkExt<Message> + Unpin), code: u16, reason: &str) {
    tracing::debug!(code, reason, "closing gateway connection");
    let _ = sender
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })))
        .await;
}

/// Serve one UI connection: `ready` first, then bridge events out and
/// commands in until either side goes away.
pub async fn handle_connection(socket: WebSocket, bridge: BridgeHandle) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before taking the snapshot so no event falls in between.
    let mut event_rx = bridge.subscribe();
    let session = match bridge.snapshot().await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("rejecting UI connection: {e}");
            send_close(&mut sender, 1011, "Playback bridge unavailable").await;
            return;
        }
    };
    if send_event(&mut sender, &UiEvent::Ready { session })
        .await
        .is_err()
    {
        return;
    }
    tracing::info!("UI connected");

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let disconnect_reason = loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::trace!(payload = %text.as_str(), "ws in");
                        let inbound = match serde_json::from_str::<InboundMessage>(&text) {
                            Ok(inbound) => inbound,
                            Err(e) => {
                                tracing::warn!("ignoring malformed UI message: {e}");
                                continue;
                            }
                        };
                        match inbound.command {
                            UiCommand::ListTracks { kind } => {
                                let tracks = match bridge.list_tracks(kind).await {
                                    Ok(tracks) => tracks,
                                    Err(e) => {
                                        tracing::warn!("dropping listTracks: {e}");
                                        continue;
                                    }
                                };
                                let reply = UiEvent::TrackList {
                                    nonce: inbound.nonce,
                                    kind,
                                    tracks,
                                };
                                if send_event(&mut sender, &reply).await.is_err() {
                                    break "websocket send error".to_string();
                                }
                            }
                            command => {
                                let op = command.name();
                                if let Err(e) = bridge.send(command).await {
                                    tracing::warn!(op, "dropping command: {e}");
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break "client closed".to_string(),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break format!("websocket receive error: {e}"),
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        if send_event(&mut sender, &event).await.is_err() {
                            break "websocket send error".to_string();
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("UI event stream lagged (missed {skipped} events); forcing reconnect");
                        send_close(&mut sender, 1013, "Gateway fell behind; reconnect required").await;
                        break format!("event stream lagged by {skipped} events");
                    }
                    Err(RecvError::Closed) => {
                        break "event stream closed".to_string();
                    }
                }
            }
            _ = ping_interval.tick() => {
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break "websocket ping send error".to_string();
                }
            }
        }
    };
    tracing::info!("UI disconnected: {disconnect_reason}");
}
