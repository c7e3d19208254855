//! Connectivity supervision.
//!
//! Called at the top of every loop pass. Keeps two layers straight: the
//! network link (loss is fatal and handled by a full device restart, never an
//! in-place rejoin) and the broker session (loss is recoverable and retried
//! forever with a fixed delay). While the session is down this blocks the
//! whole loop; physical edges keep queueing in the command bridge and drain
//! once connectivity returns. The flat, unbounded retry is a deliberate
//! simplicity trade-off: an unreachable broker wedges the device here.

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::hal::Collaborators;

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("network link lost, device restart issued")]
    NetworkLost,

    #[error("shutdown requested while reconnecting")]
    Shutdown,
}

#[derive(Debug, Default)]
pub struct ConnectivitySupervisor {
    client_id: String,
    subscriptions: Vec<String>,
    retry_delay_ms: u64,
}

impl ConnectivitySupervisor {
    pub fn new(client_id: &str, subscriptions: Vec<String>, retry_delay_ms: u64) -> Self {
        Self {
            client_id: client_id.to_string(),
            subscriptions,
            retry_delay_ms,
        }
    }

    /// Idempotent connectivity check; cheap when everything is up.
    ///
    /// Session operations are only ever attempted while the network link is
    /// joined. After a successful session connect every inbound channel is
    /// re-subscribed; a failed subscribe is logged and left to the next
    /// reconnect cycle.
    pub fn ensure_connected(
        &self,
        io: &mut Collaborators,
        shutdown: &CancellationToken,
    ) -> Result<(), SupervisorError> {
        if !io.link.joined() {
            error!("network link lost, restarting device");
            io.power.restart();
            return Err(SupervisorError::NetworkLost);
        }

        if io.transport.connected() {
            return Ok(());
        }

        info!("session down, connecting as {}", self.client_id);
        loop {
            if shutdown.is_cancelled() {
                return Err(SupervisorError::Shutdown);
            }
            match io.transport.connect(&self.client_id) {
                Ok(()) => break,
                Err(err) => {
                    error!("session connect failed: {err}");
                    io.clock.sleep_ms(self.retry_delay_ms);
                }
            }
        }
        info!("session established");

        for topic in &self.subscriptions {
            if let Err(err) = io.transport.subscribe(topic) {
                error!("subscribe to {topic} failed: {err}");
            }
        }
        Ok(())
    }
}
