use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::AbortOnDropHandle};
use uuid::Uuid;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorType {
    Aggregator,
}

/// Messages sent from Actors to the Supervisor
#[derive(Debug, Clone)]
pub enum ControlMessage {
    Heartbeat(Uuid),
    Shutdown(Uuid),
    Error(Uuid, String),
}

/// The trait that all restartable services must implement
#[async_trait]
pub trait Actor: Send + Sync {
    fn name(&self) -> ActorType;

    fn id(&self) -> Uuid;

    /// The main loop of the actor.
    ///
    /// It must periodically send `ControlMessage::Heartbeat` to the supervisor
    /// and return once `cancel` fires, after finishing any write in flight.
    async fn run(
        &mut self,
        supervisor_tx: mpsc::Sender<ControlMessage>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()>;

    /// Pulses until the returned handle is dropped, so an aborted `run` also
    /// stops its heartbeat.
    fn spawn_heartbeat(
        &self,
        supervisor_tx: mpsc::Sender<ControlMessage>,
    ) -> AbortOnDropHandle<()> {
        let id = self.id();
        AbortOnDropHandle::new(tokio::spawn(async move {
            loop {
                if supervisor_tx
                    .send(ControlMessage::Heartbeat(id))
                    .await
                    .is_err()
                {
                    break;
                }
                tokio::time::sleep(HEARTBEAT_INTERVAL).await;
            }
        }))
    }
}
