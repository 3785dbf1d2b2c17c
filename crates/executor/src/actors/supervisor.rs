use std::{collections::HashMap, time::Duration};
use tracing::{debug, error, info, warn};

use common::actors::{Actor, ActorType, ControlMessage};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type ActorFactory = Box<dyn Fn() -> Box<dyn Actor> + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub struct SupervisorSettings {
    /// How often liveness is checked.
    pub check_interval: Duration,
    /// An actor silent for longer than this is aborted and respawned.
    pub heartbeat_timeout: Duration,
    /// How long stopping actors may take to finish in-flight work.
    pub shutdown_grace: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(1),
            heartbeat_timeout: Duration::from_secs(3),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

struct RunningActor {
    id: Uuid,
    handle: JoinHandle<()>,
    last_pulse: Instant,
    stopped: bool,
}

/// Keeps every registered actor alive until the shutdown token fires.
pub struct Supervisor {
    actor_factories: HashMap<ActorType, ActorFactory>,
    running: HashMap<ActorType, RunningActor>,
    settings: SupervisorSettings,
    shutdown: CancellationToken,
}

impl Supervisor {
    pub fn new(settings: SupervisorSettings) -> Self {
        Self {
            actor_factories: HashMap::new(),
            running: HashMap::new(),
            settings,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops the supervisor and all of its actors.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn register_actor(&mut self, actor_type: ActorType, factory: ActorFactory) {
        self.actor_factories.insert(actor_type, factory);
    }

    /// Runs until the shutdown token is cancelled, then waits up to
    /// `shutdown_grace` for the actors to stop before aborting them.
    pub async fn start(&mut self) {
        let mut check_interval = time::interval(self.settings.check_interval);
        let (supervisor_tx, mut supervisor_rx) = mpsc::channel::<ControlMessage>(512);

        let actors: Vec<ActorType> = self.actor_factories.keys().copied().collect();
        for actor in actors {
            self.spawn_actor(actor, supervisor_tx.clone());
        }

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,

                Some(msg) = supervisor_rx.recv() => self.handle_message(msg),

                _ = check_interval.tick() => self.check_actors(&supervisor_tx),
            }
        }

        // Actors ignore send failures, so nothing blocks on a full channel.
        drop(supervisor_rx);
        self.stop_all().await;
    }

    fn handle_message(&mut self, msg: ControlMessage) {
        match msg {
            ControlMessage::Heartbeat(id) => {
                if let Some((_, actor)) = self.find_mut(id) {
                    actor.last_pulse = Instant::now();
                }
            }
            ControlMessage::Shutdown(id) => {
                if let Some((actor_type, actor)) = self.find_mut(id) {
                    warn!("{:?} is shutting down gracefully.", actor_type);
                    actor.stopped = true;
                }
            }
            ControlMessage::Error(id, error_msg) => match self.find_mut(id) {
                Some((actor_type, actor)) => {
                    error!("Actor {:?} reported error: {}", actor_type, error_msg);
                    actor.last_pulse = Instant::now();
                }
                None => debug!("Error from retired actor {}: {}", id, error_msg),
            },
        }
    }

    fn check_actors(&mut self, supervisor_tx: &mpsc::Sender<ControlMessage>) {
        let dead_timeout = Instant::now() - self.settings.heartbeat_timeout;
        let mut dead_actors = Vec::new();

        for (actor_type, actor) in self.running.iter() {
            if actor.stopped {
                continue;
            }
            if actor.handle.is_finished() {
                warn!("{:?} exited unexpectedly, restarting", actor_type);
                dead_actors.push(*actor_type);
            } else if actor.last_pulse < dead_timeout {
                warn!("{:?} is unresponsive!", actor_type);
                actor.handle.abort();
                dead_actors.push(*actor_type);
            }
        }

        for actor_type in dead_actors {
            self.spawn_actor(actor_type, supervisor_tx.clone());
        }
    }

    fn spawn_actor(&mut self, actor_type: ActorType, tx: mpsc::Sender<ControlMessage>) {
        let Some(factory) = self.actor_factories.get(&actor_type) else {
            return;
        };
        let mut new_actor = factory();
        let id = new_actor.id();
        let cancel = self.shutdown.child_token();

        let handle = tokio::spawn(async move {
            if let Err(e) = new_actor.run(tx, cancel).await {
                error!("Actor {:?} crashed: {}", actor_type, e);
            }
        });

        info!("Spawned {:?} ({})", actor_type, id);
        self.running.insert(
            actor_type,
            RunningActor {
                id,
                handle,
                last_pulse: Instant::now(),
                stopped: false,
            },
        );
    }

    async fn stop_all(&mut self) {
        self.shutdown.cancel();
        let deadline = Instant::now() + self.settings.shutdown_grace;

        for (actor_type, mut actor) in self.running.drain() {
            if time::timeout_at(deadline, &mut actor.handle).await.is_err() {
                warn!(
                    "{:?} did not stop within {:?}, aborting",
                    actor_type, self.settings.shutdown_grace
                );
                actor.handle.abort();
            }
        }
        info!("All actors stopped");
    }

    fn find_mut(&mut self, id: Uuid) -> Option<(ActorType, &mut RunningActor)> {
        self.running
            .iter_mut()
            .find(|(_, actor)| actor.id == id)
            .map(|(actor_type, actor)| (*actor_type, actor))
    }
}
