// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Runs both radio roles on one task.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::advertiser::{Advertiser, PeripheralRadio};
use super::scanner::{CentralEvent, CentralRadio, Scanner};
use super::{ProximityError, RadioState};

/// Callback from the platform peripheral stack. Requests carry a responder
/// for the ATT result.
#[derive(Debug)]
pub enum PeripheralEvent {
    StateChanged(RadioState),
    ReadRequest {
        central: Uuid,
        offset: usize,
        respond: oneshot::Sender<Result<Vec<u8>, ProximityError>>,
    },
    WriteRequest {
        central: Uuid,
        data: Vec<u8>,
        respond: oneshot::Sender<Result<(), ProximityError>>,
    },
}

/// Advertiser and scanner driven concurrently from their event channels.
pub struct ProximityService<P: PeripheralRadio, C: CentralRadio> {
    advertiser: Advertiser<P>,
    scanner: Scanner<C>,
}

impl<P, C> ProximityService<P, C>
where
    P: PeripheralRadio + 'static,
    C: CentralRadio + 'static,
{
    pub fn new(advertiser: Advertiser<P>, scanner: Scanner<C>) -> Self {
        ProximityService {
            advertiser,
            scanner,
        }
    }

    pub fn advertiser(&self) -> &Advertiser<P> {
        &self.advertiser
    }

    pub fn scanner(&self) -> &Scanner<C> {
        &self.scanner
    }

    /// Processes both channels until both are closed, then hands the
    /// service back.
    pub async fn run(
        mut self,
        mut peripheral: mpsc::Receiver<PeripheralEvent>,
        mut central: mpsc::Receiver<CentralEvent>,
    ) -> Self {
        let mut peripheral_open = true;
        let mut central_open = true;

        while peripheral_open || central_open {
            tokio::select! {
                event = peripheral.recv(), if peripheral_open => match event {
                    Some(event) => self.on_peripheral(event),
                    None => peripheral_open = false,
                },
                event = central.recv(), if central_open => match event {
                    Some(event) => self.scanner.handle_event(event),
                    None => central_open = false,
                },
            }
        }

        tracing::debug!("proximity service stopped");
        self
    }

    /// Runs the service on its own task.
    pub fn spawn(
        self,
        peripheral: mpsc::Receiver<PeripheralEvent>,
        central: mpsc::Receiver<CentralEvent>,
    ) -> JoinHandle<Self> {
        tokio::spawn(self.run(peripheral, central))
    }

    fn on_peripheral(&mut self, event: PeripheralEvent) {
        match event {
            PeripheralEvent::StateChanged(state) => {
                if let Err(e) = self.advertiser.handle_state(state) {
                    tracing::warn!(error = %e, "advertiser unavailable");
                }
            }
            PeripheralEvent::ReadRequest {
                central,
                offset,
                respond,
            } => {
                let result = self.advertiser.handle_read(central, offset);
                if respond.send(result).is_err() {
                    tracing::debug!(%central, "read responder dropped");
                }
            }
            PeripheralEvent::WriteRequest {
                central,
                data,
                respond,
            } => {
                let result = self.advertiser.handle_write(central, &data);
                if respond.send(result).is_err() {
                    tracing::debug!(%central, "write responder dropped");
                }
            }
        }
    }
}
