use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use aparajito_bridge::backend::simulated::{SimulatedBackend, SimulatedMedia};
use aparajito_bridge::{spawn_bridge, Bridge, BridgeConfig, BridgeHandle, EventBus, NoPicker};
use aparajito_ws::gateway_router;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct GatewayTestContext {
    url: String,
    bridge: BridgeHandle,
}

impl GatewayTestContext {
    async fn new() -> anyhow::Result<Self> {
        let (backend, backend_rx) = SimulatedBackend::channel();
        let backend = backend.with_fallback(SimulatedMedia::feature());
        let bridge = Bridge::new(Box::new(backend), EventBus::new(64), BridgeConfig::default());
        let (handle, _task) = spawn_bridge(bridge, backend_rx, Arc::new(NoPicker));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = gateway_router().with_state(handle.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            url: format!("ws://{addr}/bridge"),
            bridge: handle,
        })
    }

    async fn connect(&self) -> anyhow::Result<Client> {
        let (ws, _) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        Ok(ws)
    }
}

async fn next_frame(ws: &mut Client) -> anyhow::Result<Message> {
    tokio::time::timeout(Duration::from_secs(10), ws.next())
        .await?
        .context("gateway closed the stream")?
        .map_err(Into::into)
}

async fn next_json(ws: &mut Client) -> anyhow::Result<Value> {
    loop {
        if let Message::Text(text) = next_frame(ws).await? {
            return Ok(serde_json::from_str(text.as_str())?);
        }
    }
}

/// Skip unrelated notifications (timeline ticks, play state) until `name`.
async fn next_event(ws: &mut Client, name: &str) -> anyhow::Result<Value> {
    loop {
        let value = next_json(ws).await?;
        if value["event"] == name {
            return Ok(value);
        }
    }
}

async fn send(ws: &mut Client, value: Value) -> anyhow::Result<()> {
    ws.send(Message::text(value.to_string())).await?;
    Ok(())
}

#[tokio::test]
async fn ready_snapshot_is_sent_first() -> anyhow::Result<()> {
    let ctx = GatewayTestContext::new().await?;
    let mut ws = ctx.connect().await?;

    let ready = next_json(&mut ws).await?;
    assert_eq!(ready["event"], "ready");
    assert_eq!(ready["session"]["isPlaying"], false);
    assert_eq!(ready["session"]["isNativeModeActive"], false);
    assert_eq!(ready["session"]["layout"]["mode"], "portrait");
    assert_eq!(ready["session"]["layout"]["systemBars"]["state"], "visible");
    Ok(())
}

#[tokio::test]
async fn commands_flow_in_and_events_flow_out() -> anyhow::Result<()> {
    let ctx = GatewayTestContext::new().await?;
    let mut ws = ctx.connect().await?;
    next_event(&mut ws, "ready").await?;

    send(
        &mut ws,
        json!({"op": "loadAndPlay", "uri": "https://cdn.example.com/aparajito.mp4"}),
    )
    .await?;
    let state = next_event(&mut ws, "setPlayState").await?;
    assert_eq!(state["isPlaying"], true);

    send(&mut ws, json!({"op": "listTracks", "kind": "sub", "nonce": "n-7"})).await?;
    let list = next_event(&mut ws, "trackList").await?;
    assert_eq!(list["nonce"], "n-7");
    assert_eq!(list["kind"], "subtitle");
    assert_eq!(list["tracks"][0]["label"], "English");
    assert_eq!(list["tracks"][1]["label"], "subtitle 2");
    assert_eq!(list["tracks"][1]["groupIndex"], 1);
    Ok(())
}

#[tokio::test]
async fn malformed_messages_do_not_drop_the_connection() -> anyhow::Result<()> {
    let ctx = GatewayTestContext::new().await?;
    let mut ws = ctx.connect().await?;
    next_event(&mut ws, "ready").await?;

    ws.send(Message::text("not json")).await?;
    send(&mut ws, json!({"op": "selfDestruct"})).await?;
    send(&mut ws, json!({"op": "setOrientation", "isLandscape": true})).await?;

    let layout = next_event(&mut ws, "applyLayout").await?;
    assert_eq!(layout["mode"], "landscape");
    assert_eq!(layout["playerHeightFraction"], 1.0);
    assert_eq!(layout["systemBars"]["state"], "immersive");
    assert_eq!(layout["systemBars"]["transientReveal"], true);
    Ok(())
}

#[tokio::test]
async fn events_reach_every_connected_ui() -> anyhow::Result<()> {
    let ctx = GatewayTestContext::new().await?;
    let mut first = ctx.connect().await?;
    let mut second = ctx.connect().await?;
    next_event(&mut first, "ready").await?;
    next_event(&mut second, "ready").await?;

    send(&mut first, json!({"op": "setOrientation", "isLandscape": true})).await?;
    assert_eq!(next_event(&mut first, "applyLayout").await?["mode"], "landscape");
    assert_eq!(next_event(&mut second, "applyLayout").await?["mode"], "landscape");
    Ok(())
}

#[tokio::test]
async fn connection_after_shutdown_is_closed() -> anyhow::Result<()> {
    let ctx = GatewayTestContext::new().await?;
    ctx.bridge.shutdown().await?;
    // The runtime drops its mailbox once teardown finishes.
    while ctx.bridge.snapshot().await.is_ok() {
        tokio::task::yield_now().await;
    }

    let mut ws = ctx.connect().await?;
    match next_frame(&mut ws).await? {
        Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 1011),
        other => panic!("expected close frame, got {other:?}"),
    }
    Ok(())
}
