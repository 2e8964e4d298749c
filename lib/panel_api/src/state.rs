use std::collections::HashMap;

use serde::Deserialize;

/// A field device as reported by the panel service. Identity is `name` +
/// `unit_id`; the pair is unique across the device list.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Device {
    pub name: String,
    pub unit_id: u8,
}

impl Device {
    pub fn key(&self) -> String {
        format!("{}__{}", self.name, self.unit_id)
    }
}

/// Outcome of the most recent poll of one (device, register) pair.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Reading {
    pub address: u16,
    pub value: Option<f64>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub ts: Option<f64>,
}

impl Reading {
    /// Epoch seconds of the reading, if the server recorded one. The server
    /// uses `0.0` as "never polled".
    pub fn timestamp(&self) -> Option<f64> {
        self.ts.filter(|ts| *ts > 0.0)
    }
}

/// One polled snapshot of the whole system. Disposable: each fetch fully
/// replaces the previous one.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SystemState {
    pub armed: bool,
    pub devices: Vec<Device>,
    pub registers: Vec<u16>,
    pub latest: HashMap<String, HashMap<String, Reading>>,
}

impl SystemState {
    /// Latest reading for one (device, register) pair. The server keys the
    /// inner maps by stringified addresses.
    pub fn reading(&self, device: &Device, address: u16) -> Option<&Reading> {
        self.latest.get(&device.key())?.get(&address.to_string())
    }
}

pub fn format_address(address: u16) -> String {
    format!("0x{address:X}")
}
