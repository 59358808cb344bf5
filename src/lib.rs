pub mod core;
pub mod plugins;
pub mod storage;
pub mod utils;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    core::services::DoorSession,
    plugins::Collaborators,
    utils::{config::Config, error::Result},
};

/// Host-owned root of the system: one door session plus its background
/// housekeeping. Created with [`Application::new`], torn down with
/// [`Application::shutdown`].
pub struct Application {
    config: Arc<Config>,
    session: Arc<DoorSession>,
    background: CancellationToken,
    status_task: Mutex<Option<JoinHandle<()>>>,
}

impl Application {
    pub fn new(config: Config, collaborators: Collaborators) -> Result<Self> {
        let config = Arc::new(config);

        info!("Initializing door session...");
        let session = Arc::new(DoorSession::new(config.clone(), collaborators)?);

        Ok(Self {
            config,
            session,
            background: CancellationToken::new(),
            status_task: Mutex::new(None),
        })
    }

    /// Starts the periodic door status refresh, if configured.
    pub fn start(&self) {
        let Some(period) = self.config.door.status_poll_interval() else {
            info!("Door status refresh disabled");
            return;
        };

        let session = self.session.clone();
        let stop = self.background.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => match session.refresh_door_state().await {
                        Ok(door) => debug!(door = %door, "Door status refreshed"),
                        Err(e) => {
                            warn!(error = %e, "Door status refresh stopped");
                            break;
                        }
                    },
                }
            }
        });

        if let Some(previous) = self.status_task.lock().replace(task) {
            previous.abort();
        }
        info!(period_ms = period.as_millis() as u64, "Application successfully started");
    }

    pub fn session(&self) -> &DoorSession {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down application...");

        self.background.cancel();
        let task = self.status_task.lock().take();
        if let Some(task) = task {
            task.await?;
        }

        info!("Closing door session...");
        self.session.shutdown().await;

        info!("Application shutdown complete");
        Ok(())
    }
}
