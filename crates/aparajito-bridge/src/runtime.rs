//! Single-task executor for a [`Bridge`].
//!
//! UI commands, backend notifications, timeline deadlines and file-picker
//! results all arrive on one task and are handled one at a time, so the
//! bridge itself needs no locking.

use std::sync::Arc;

use aparajito_models::gateway::{SessionSnapshot, UiCommand, UiEvent, VIDEO_MIME_FILTER};
use aparajito_models::track::{TrackEntry, TrackKind};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::backend::BackendEventReceiver;
use crate::error::BridgeError;
use crate::events::EventBus;
use crate::picker::{FilePicker, PickResult};
use crate::router::{Bridge, CommandOutcome};

const MAILBOX_CAPACITY: usize = 64;

enum Mail {
    Command {
        command: UiCommand,
        reply: Option<oneshot::Sender<CommandOutcome>>,
    },
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown,
}

/// Cloneable sender side of a running bridge.
#[derive(Clone)]
pub struct BridgeHandle {
    mailbox: mpsc::Sender<Mail>,
    bus: EventBus,
}

impl BridgeHandle {
    /// Queue a command without waiting for it to run.
    pub async fn send(&self, command: UiCommand) -> Result<(), BridgeError> {
        self.post(Mail::Command {
            command,
            reply: None,
        })
        .await
    }

    /// Run a command and wait for its outcome.
    pub async fn request(&self, command: UiCommand) -> Result<CommandOutcome, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.post(Mail::Command {
            command,
            reply: Some(tx),
        })
        .await?;
        rx.await.map_err(|_| BridgeError::BackendUnavailable)
    }

    pub async fn list_tracks(&self, kind: TrackKind) -> Result<Vec<TrackEntry>, BridgeError> {
        match self.request(UiCommand::ListTracks { kind }).await? {
            CommandOutcome::Tracks(tracks) => Ok(tracks),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.post(Mail::Snapshot(tx)).await?;
        rx.await.map_err(|_| BridgeError::BackendUnavailable)
    }

    /// Ask the runtime to tear the bridge down. Await the task returned by
    /// [`spawn_bridge`] to know when the backend has been released.
    pub async fn shutdown(&self) -> Result<(), BridgeError> {
        self.post(Mail::Shutdown).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.bus.subscribe()
    }

    async fn post(&self, mail: Mail) -> Result<(), BridgeError> {
        self.mailbox
            .send(mail)
            .await
            .map_err(|_| BridgeError::BackendUnavailable)
    }
}

/// Start the runtime task for `bridge`.
pub fn spawn_bridge(
    bridge: Bridge,
    backend_events: BackendEventReceiver,
    picker: Arc<dyn FilePicker>,
) -> (BridgeHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    let handle = BridgeHandle {
        mailbox: tx,
        bus: bridge.bus().clone(),
    };
    let task = tokio::spawn(run(bridge, rx, backend_events, picker));
    (handle, task)
}

async fn run(
    mut bridge: Bridge,
    mut mailbox: mpsc::Receiver<Mail>,
    mut backend_events: BackendEventReceiver,
    picker: Arc<dyn FilePicker>,
) {
    tracing::info!("bridge runtime started");
    let mut pick: Option<PickResult> = None;
    let mut backend_open = true;

    loop {
        let due = bridge.timeline_due();
        tokio::select! {
            mail = mailbox.recv() => match mail {
                Some(Mail::Command { command, reply }) => {
                    let outcome = bridge.handle(command);
                    if outcome == CommandOutcome::PickFile {
                        if pick.is_some() {
                            tracing::debug!("replacing pending file pick");
                        }
                        pick = Some(picker.pick(VIDEO_MIME_FILTER));
                    }
                    if let Some(reply) = reply {
                        let _ = reply.send(outcome);
                    }
                }
                Some(Mail::Snapshot(reply)) => {
                    let _ = reply.send(bridge.snapshot());
                }
                Some(Mail::Shutdown) | None => break,
            },
            event = backend_events.recv(), if backend_open => match event {
                Some(event) => bridge.on_backend_event(event),
                None => {
                    tracing::warn!("backend event channel closed");
                    backend_open = false;
                }
            },
            _ = sleep_until(due) => bridge.tick_timeline(),
            picked = wait_pick(&mut pick), if pick.is_some() => {
                pick = None;
                match picked {
                    Some(uri) => bridge.local_file_selected(uri),
                    None => tracing::debug!("file pick cancelled"),
                }
            }
        }
    }

    mailbox.close();
    bridge.teardown();
    tracing::info!("bridge runtime stopped");
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn wait_pick(pick: &mut Option<PickResult>) -> Option<String> {
    match pick.as_mut() {
        Some(rx) => rx.await.ok().flatten(),
        None => std::future::pending().await,
    }
}
