//! Broker session over rumqttc's synchronous client.
//!
//! `connect` builds a fresh client/connection pair and blocks until the
//! broker acknowledges the session, so the caller gets a definite
//! success-or-failure answer. `service` pumps the event loop once per loop
//! pass; that single call carries keepalives, surfaces inbound publishes,
//! and is where session loss shows up.

use std::time::Duration;

use rumqttc::{
    Client, ConnAck, Connection, ConnectReturnCode, ConnectionError, Event, MqttOptions, Packet,
    QoS,
};
use tracing::{debug, info, warn};

use crate::config::MqttSettings;

use super::{Inbound, SessionTransport, TransportError};

const ACK_WAIT: Duration = Duration::from_secs(5);
const EVENT_CAPACITY: usize = 32;

pub struct RumqttcSession {
    settings: MqttSettings,
    session: Option<(Client, Connection)>,
    connected: bool,
}

impl RumqttcSession {
    pub fn new(settings: MqttSettings) -> Self {
        Self {
            settings,
            session: None,
            connected: false,
        }
    }
}

impl SessionTransport for RumqttcSession {
    fn connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self, client_id: &str) -> Result<(), TransportError> {
        self.session = None;
        self.connected = false;

        let mut options = MqttOptions::new(client_id, &self.settings.host, self.settings.port);
        options.set_keep_alive(Duration::from_secs(self.settings.keep_alive_secs.max(1)));
        if !self.settings.username.is_empty() {
            options.set_credentials(&self.settings.username, &self.settings.password);
        }

        info!(
            "connecting to {}:{} as {client_id}",
            self.settings.host, self.settings.port
        );
        let (client, mut connection) = Client::new(options, EVENT_CAPACITY);

        loop {
            match connection.recv_timeout(ACK_WAIT) {
                Ok(Ok(Event::Incoming(Packet::ConnAck(ConnAck { code, .. })))) => {
                    if code == ConnectReturnCode::Success {
                        self.session = Some((client, connection));
                        self.connected = true;
                        return Ok(());
                    }
                    return Err(TransportError::Rejected(format!("{code:?}")));
                }
                Ok(Ok(_)) => continue,
                Ok(Err(err)) => return Err(TransportError::Connect(err.to_string())),
                Err(_) => return Err(TransportError::AckTimeout(ACK_WAIT)),
            }
        }
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        let (client, _) = self
            .session
            .as_mut()
            .ok_or(TransportError::NotConnected)?;
        client
            .subscribe(topic, QoS::AtMostOnce)
            .map_err(|err| TransportError::Request(err.to_string()))
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &str,
        retain: bool,
    ) -> Result<(), TransportError> {
        let (client, _) = self
            .session
            .as_mut()
            .ok_or(TransportError::NotConnected)?;
        client
            .publish(topic, QoS::AtMostOnce, retain, payload.as_bytes())
            .map_err(|err| TransportError::Request(err.to_string()))
    }

    fn service(&mut self, max_wait: Duration) -> Vec<Inbound> {
        let mut inbound = Vec::new();
        let mut connected = self.connected;

        if let Some((_, connection)) = self.session.as_mut() {
            if let Ok(event) = connection.recv_timeout(max_wait) {
                absorb(event, &mut connected, &mut inbound);
            }
            // Drain whatever else is already queued without waiting again.
            while let Ok(event) = connection.try_recv() {
                absorb(event, &mut connected, &mut inbound);
            }
        }

        self.connected = connected;
        inbound
    }
}

fn absorb(
    event: Result<Event, ConnectionError>,
    connected: &mut bool,
    inbound: &mut Vec<Inbound>,
) {
    match event {
        Ok(Event::Incoming(Packet::Publish(publish))) => {
            debug!("inbound publish on {}", publish.topic);
            inbound.push(Inbound {
                topic: publish.topic.clone(),
                payload: String::from_utf8_lossy(&publish.payload).into_owned(),
            });
        }
        Ok(Event::Incoming(Packet::Disconnect)) => {
            warn!("broker closed the session");
            *connected = false;
        }
        Ok(_) => {}
        Err(err) => {
            warn!("session event loop error: {err}");
            *connected = false;
        }
    }
}
