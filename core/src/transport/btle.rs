//! Host Bluetooth LE transport built on `btleplug`.
//!
//! Discovery listens to the adapter's event stream while scanning so devices come
//! back in the order they were first heard, followed by any peripheral the adapter
//! had cached but never reported during the scan. Notifications are pumped from the
//! peripheral's notification stream into the session's sink by one task per
//! subscribed characteristic.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use btleplug::api::{
    BDAddr, Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter,
    WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use blecount_common::device::DeviceIdentity;
use blecount_common::error::TransportError;
use blecount_common::transport::{Connection, NotificationSink, Transport};

pub struct BtleTransport {
    adapter: Adapter,
    peripherals: Mutex<HashMap<String, Peripheral>>,
}

impl BtleTransport {
    /// Binds to the first Bluetooth adapter on the host.
    pub async fn new() -> anyhow::Result<Self> {
        let manager = Manager::new().await?;
        let adapter: Adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No Bluetooth adapter found"))?;

        if let Ok(name) = adapter.adapter_info().await {
            info!("Using adapter {name}");
        }

        Ok(Self {
            adapter,
            peripherals: Mutex::new(HashMap::new()),
        })
    }

    async fn identify(&self, id: &PeripheralId) -> Option<(DeviceIdentity, Peripheral)> {
        let peripheral: Peripheral = self.adapter.peripheral(id).await.ok()?;
        let props = peripheral.properties().await.ok().flatten();

        let name: Option<String> = props.as_ref().and_then(|p| p.local_name.clone());
        let bd_addr: BDAddr = props.map(|p| p.address).unwrap_or_default();

        // CoreBluetooth hides MAC addresses; fall back to the platform id there.
        let address: String = if bd_addr.into_inner() == [0u8; 6] {
            id.to_string()
        } else {
            bd_addr.to_string()
        };

        Some((DeviceIdentity::new(address, name), peripheral))
    }
}

/// Appends `item` unless already present. Returns `true` if it was new.
fn push_unique<T: PartialEq>(order: &mut Vec<T>, item: T) -> bool {
    if order.contains(&item) {
        return false;
    }
    order.push(item);
    true
}

fn adapter_err(e: btleplug::Error) -> TransportError {
    TransportError::Adapter(e.to_string())
}

#[async_trait]
impl Transport for BtleTransport {
    async fn discover(&self, timeout: Duration) -> Result<Vec<DeviceIdentity>, TransportError> {
        let mut events = self.adapter.events().await.map_err(adapter_err)?;
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(adapter_err)?;

        let mut order: Vec<PeripheralId> = Vec::new();
        let scan_end = tokio::time::sleep(timeout);
        tokio::pin!(scan_end);

        loop {
            tokio::select! {
                _ = &mut scan_end => break,
                event = events.next() => match event {
                    // Peripherals the adapter already knows only ever report updates.
                    Some(CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id)) => {
                        debug!("scan heard {id}");
                        push_unique(&mut order, id);
                    }
                    Some(_) => {}
                    None => break,
                },
            }
        }

        if let Err(e) = self.adapter.stop_scan().await {
            debug!("stop_scan failed: {e}");
        }

        // Cached peripherals that stayed silent still count, after everything heard live.
        match self.adapter.peripherals().await {
            Ok(known) => {
                for peripheral in known {
                    if push_unique(&mut order, peripheral.id()) {
                        debug!("adapter cache added {}", peripheral.id());
                    }
                }
            }
            Err(e) => debug!("listing cached peripherals failed: {e}"),
        }

        let mut found: Vec<(DeviceIdentity, Peripheral)> = Vec::with_capacity(order.len());
        for id in &order {
            if let Some(entry) = self.identify(id).await {
                found.push(entry);
            }
        }

        let mut peripherals = self.peripherals.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(found
            .into_iter()
            .map(|(identity, peripheral)| {
                peripherals.insert(identity.address.clone(), peripheral);
                identity
            })
            .collect())
    }

    async fn connect(&self, device: &DeviceIdentity) -> Result<Box<dyn Connection>, TransportError> {
        let peripheral: Peripheral = self
            .peripherals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&device.address)
            .cloned()
            .ok_or_else(|| TransportError::UnknownDevice(device.address.clone()))?;

        let failed = |e: btleplug::Error| TransportError::ConnectFailed {
            address: device.address.clone(),
            reason: e.to_string(),
        };

        peripheral.connect().await.map_err(failed)?;
        peripheral.discover_services().await.map_err(failed)?;

        Ok(Box::new(BtleConnection {
            peripheral,
            pumps: Mutex::new(HashMap::new()),
        }))
    }
}

pub struct BtleConnection {
    peripheral: Peripheral,
    pumps: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

impl BtleConnection {
    fn characteristic(&self, uuid: Uuid) -> Result<Characteristic, TransportError> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or(TransportError::ChannelNotFound(uuid))
    }

    fn stop_pump(&self, channel: &Uuid) {
        let mut pumps = self.pumps.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pump) = pumps.remove(channel) {
            pump.abort();
        }
    }
}

#[async_trait]
impl Connection for BtleConnection {
    async fn write_command(
        &self,
        channel: Uuid,
        bytes: &[u8],
        require_ack: bool,
    ) -> Result<(), TransportError> {
        let characteristic: Characteristic = self.characteristic(channel)?;
        let write_type: WriteType = if require_ack {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };

        self.peripheral
            .write(&characteristic, bytes, write_type)
            .await
            .map_err(|e| TransportError::WriteFailed(e.to_string()))
    }

    async fn subscribe(&self, channel: Uuid, sink: NotificationSink) -> Result<(), TransportError> {
        let characteristic: Characteristic = self.characteristic(channel)?;
        let subscribe_err = |e: btleplug::Error| TransportError::SubscribeFailed(e.to_string());

        // Take the stream before enabling notify so the first frames are not lost.
        let mut notifications = self.peripheral.notifications().await.map_err(subscribe_err)?;
        self.peripheral
            .subscribe(&characteristic)
            .await
            .map_err(subscribe_err)?;

        let pump: JoinHandle<()> = tokio::spawn(async move {
            while let Some(notification) = notifications.next().await {
                if notification.uuid == channel {
                    sink(&notification.value);
                }
            }
        });

        let previous = self
            .pumps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel, pump);
        if let Some(previous) = previous {
            previous.abort();
        }
        Ok(())
    }

    async fn unsubscribe(&self, channel: Uuid) -> Result<(), TransportError> {
        self.stop_pump(&channel);
        let characteristic: Characteristic = self.characteristic(channel)?;
        self.peripheral
            .unsubscribe(&characteristic)
            .await
            .map_err(|e| TransportError::SubscribeFailed(e.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        {
            let mut pumps = self.pumps.lock().unwrap_or_else(PoisonError::into_inner);
            for (_, pump) in pumps.drain() {
                pump.abort();
            }
        }
        self.peripheral
            .disconnect()
            .await
            .map_err(|e| TransportError::Adapter(e.to_string()))
    }

    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }
}

impl Drop for BtleConnection {
    fn drop(&mut self) {
        let mut pumps = self.pumps.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, pump) in pumps.drain() {
            pump.abort();
        }
    }
}
