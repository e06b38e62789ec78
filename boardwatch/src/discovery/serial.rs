//! Serial port discovery.
//!
//! Enumerates serial ports through the operating system (via
//! `tokio_serial::available_ports`) and detects hotplug by polling. USB
//! serial adapters carry their VID/PID and descriptor strings as port
//! properties, which is what board identification keys on.
//!
//! Enumeration can block on sysfs or IOKit, so each scan runs on the
//! blocking thread pool.

use super::{DiscoveryBackend, DiscoveryEvent};
use crate::{
    error::{Error, Result},
    port::{Port, Properties},
    tracing::prelude::*,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::mpsc,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_serial::{SerialPortInfo, SerialPortType};
use tokio_util::sync::{CancellationToken, DropGuard};

const BACKEND_ID: &str = "serial";
const PROTOCOL: &str = "serial";

/// Blocking enumeration of the ports currently present.
type Scanner = Arc<dyn Fn() -> Result<Vec<Port>> + Send + Sync>;

/// Polling serial port discovery.
///
/// After `start()` a background task rescans every `poll_interval` so that
/// `list()` reflects ports plugged or unplugged since. The task stops when
/// the backend is dropped or started again.
pub struct SerialDiscovery {
    poll_interval: Duration,
    scanner: Scanner,
    ports: Arc<Mutex<Vec<Port>>>,
    poller: Mutex<Option<DropGuard>>,
}

impl SerialDiscovery {
    pub fn new(poll_interval: Duration) -> Self {
        Self::with_scanner(poll_interval, Arc::new(system_ports))
    }

    fn with_scanner(poll_interval: Duration, scanner: Scanner) -> Self {
        Self {
            poll_interval,
            scanner,
            ports: Arc::new(Mutex::new(Vec::new())),
            poller: Mutex::new(None),
        }
    }
}

#[async_trait]
impl DiscoveryBackend for SerialDiscovery {
    fn id(&self) -> &str {
        BACKEND_ID
    }

    async fn start(&self) -> Result<()> {
        let ports = scan(&self.scanner).await?;
        debug!(count = ports.len(), "Initial serial port scan");
        *self.ports.lock() = ports;

        let shutdown = CancellationToken::new();
        tokio::spawn(poll(
            Arc::clone(&self.scanner),
            Arc::clone(&self.ports),
            self.poll_interval,
            shutdown.clone(),
        ));
        // Replacing the guard stops the poller of an earlier start.
        *self.poller.lock() = Some(shutdown.drop_guard());
        Ok(())
    }

    fn list(&self) -> Vec<Port> {
        self.ports.lock().clone()
    }

    async fn monitor(
        &self,
        events: mpsc::Sender<DiscoveryEvent>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        // Start from nothing so every port present at subscription time is
        // reported as an add.
        let mut known: Vec<Port> = Vec::new();
        let mut ticker = time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let current = match scan(&self.scanner).await {
                Ok(ports) => ports,
                Err(e) => {
                    warn!(error = %e, "Serial port scan failed");
                    continue;
                }
            };

            for event in diff(&known, &current) {
                trace!(
                    event = %event.event_type,
                    port = %event.port.address,
                    "Serial port changed"
                );
                tokio::select! {
                    _ = shutdown.cancelled() => return Ok(()),
                    sent = events.send(event) => {
                        if sent.is_err() {
                            // Subscriber went away.
                            return Ok(());
                        }
                    }
                }
            }

            *self.ports.lock() = current.clone();
            known = current;
        }

        Ok(())
    }
}

/// Keep `ports` current until `shutdown` is cancelled.
async fn poll(
    scanner: Scanner,
    ports: Arc<Mutex<Vec<Port>>>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match scan(&scanner).await {
            Ok(current) => *ports.lock() = current,
            Err(e) => warn!(error = %e, "Serial port scan failed"),
        }
    }

    trace!("Serial poller stopped.");
}

async fn scan(scanner: &Scanner) -> Result<Vec<Port>> {
    let scanner = Arc::clone(scanner);
    tokio::task::spawn_blocking(move || scanner())
        .await
        .map_err(|e| scan_error(format!("scan task failed: {e}")))?
}

fn system_ports() -> Result<Vec<Port>> {
    let infos = tokio_serial::available_ports().map_err(|e| scan_error(e.to_string()))?;
    Ok(infos.into_iter().map(port_from_info).collect())
}

fn scan_error(message: String) -> Error {
    Error::Discovery {
        backend: BACKEND_ID.to_string(),
        message,
    }
}

fn port_from_info(info: SerialPortInfo) -> Port {
    match info.port_type {
        SerialPortType::UsbPort(usb) => usb_port(
            info.port_name,
            usb.vid,
            usb.pid,
            usb.serial_number,
            usb.manufacturer,
            usb.product,
        ),
        _ => {
            let mut port = Port::new(info.port_name, PROTOCOL);
            port.protocol_label = "Serial Port".to_string();
            port
        }
    }
}

/// Build the port record for a USB serial adapter.
pub fn usb_port(
    address: String,
    vid: u16,
    pid: u16,
    serial_number: Option<String>,
    manufacturer: Option<String>,
    product: Option<String>,
) -> Port {
    let mut properties = Properties::new();
    properties.insert("vid", format!("0x{:04x}", vid));
    properties.insert("pid", format!("0x{:04x}", pid));
    if let Some(serial) = &serial_number {
        properties.insert("serialNumber", serial.as_str());
    }
    if let Some(manufacturer) = manufacturer {
        properties.insert("manufacturer", manufacturer);
    }
    if let Some(product) = product {
        properties.insert("product", product);
    }

    let mut port = Port::new(address, PROTOCOL).with_properties(properties);
    port.protocol_label = "Serial Port (USB)".to_string();
    port.hardware_id = serial_number;
    port
}

/// Events that turn `previous` into `current`: removals first, then adds.
fn diff(previous: &[Port], current: &[Port]) -> Vec<DiscoveryEvent> {
    let removed = previous
        .iter()
        .filter(|p| !current.contains(p))
        .cloned()
        .map(DiscoveryEvent::remove);
    let added = current
        .iter()
        .filter(|p| !previous.contains(p))
        .cloned()
        .map(DiscoveryEvent::add);
    removed.chain(added).collect()
}
