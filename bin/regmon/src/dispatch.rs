use std::sync::Arc;

use log::info;
use panel_api::{format_address, Client, Device, WriteRequest};
use tokio::sync::Mutex;

use crate::app::{App, InputMode};
use crate::poller;

pub const NUMERIC_VALUE_NOTICE: &str = "Enter a numeric value";

/// An operator-initiated mutation, bound to its target coordinates at the
/// moment the operator triggered it. Every flow validates before touching
/// the network; on success it refreshes and clears its input, on failure it
/// posts a notice (and rolls back, for the arm toggle).
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Write {
        device: Device,
        address: u16,
        raw: String,
    },
    SetArm(bool),
    AddRegister(String),
}

/// Runs one command to completion. Spawned per command, so a slow server
/// stalls only this flow; the poll loop keeps its own schedule.
pub async fn run(command: Command, client: Client, app: Arc<Mutex<App>>) {
    match command {
        Command::Write {
            device,
            address,
            raw,
        } => write(device, address, &raw, &client, &app).await,
        Command::SetArm(desired) => set_arm(desired, &client, &app).await,
        Command::AddRegister(raw) => add_register(&raw, &client, &app).await,
    }
}

async fn write(device: Device, address: u16, raw: &str, client: &Client, app: &Arc<Mutex<App>>) {
    let Some(value) = parse_write_value(raw) else {
        app.lock().await.set_notice(NUMERIC_VALUE_NOTICE);
        return;
    };

    let request = WriteRequest {
        device_name: device.name,
        unit_id: device.unit_id,
        address,
        value,
    };

    match client.write_register(&request).await {
        Ok(()) => {
            info!(
                "wrote {} to {} on {}__{}",
                request.value,
                format_address(request.address),
                request.device_name,
                request.unit_id
            );
            app.lock().await.value_input.clear();
            poller::refresh(client, app).await;
        }
        Err(err) => app.lock().await.set_notice(format!("Write failed: {err}")),
    }
}

async fn set_arm(desired: bool, client: &Client, app: &Arc<Mutex<App>>) {
    // Optimistic: the displayed state flips before the server confirms.
    let previous = app.lock().await.arm_optimistically(desired);

    if let Err(err) = client.set_armed(desired).await {
        let mut app = app.lock().await;
        app.revert_arm(previous);
        app.set_notice(format!("Failed to set arm state: {err}"));
    }
}

async fn add_register(raw: &str, client: &Client, app: &Arc<Mutex<App>>) {
    let Some(address) = normalize_register_input(raw) else {
        return;
    };

    match client.add_register(&address).await {
        Ok(()) => {
            {
                let mut app = app.lock().await;
                app.register_input.clear();
                app.mode = InputMode::Normal;
            }
            poller::refresh(client, app).await;
        }
        Err(err) => app
            .lock()
            .await
            .set_notice(format!("Failed to add register: {err}")),
    }
}

/// Add-register input is only trimmed. An empty result means there is
/// nothing to submit; anything else goes to the server verbatim, hex
/// prefixes included, since the server owns the format.
pub fn normalize_register_input(raw: &str) -> Option<String> {
    let address = raw.trim();
    if address.is_empty() {
        None
    } else {
        Some(address.to_string())
    }
}

/// A write value must be a finite number. Whole values are sent as JSON
/// integers so the server sees `42`, not `42.0`.
pub fn parse_write_value(raw: &str) -> Option<serde_json::Number> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    if value.fract() == 0.0 && (i64::MIN as f64..=i64::MAX as f64).contains(&value) {
        Some(serde_json::Number::from(value as i64))
    } else {
        serde_json::Number::from_f64(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{json, to_value};

    #[test]
    fn test_rejects_non_numeric_values() {
        assert_eq!(parse_write_value("abc"), None);
        assert_eq!(parse_write_value(""), None);
        assert_eq!(parse_write_value("12abc"), None);
        assert_eq!(parse_write_value("NaN"), None);
        assert_eq!(parse_write_value("inf"), None);
    }

    #[test]
    fn test_whole_values_serialize_as_integers() {
        let value = parse_write_value("42").unwrap();
        assert_eq!(to_value(value).unwrap(), json!(42));

        let value = parse_write_value(" -7 ").unwrap();
        assert_eq!(to_value(value).unwrap(), json!(-7));
    }

    #[test]
    fn test_fractional_values_stay_fractional() {
        let value = parse_write_value("1.5").unwrap();
        assert_eq!(to_value(value).unwrap(), json!(1.5));
    }

    #[test]
    fn test_invalid_write_value_notice_mentions_numeric() {
        let mut app = App::default();
        app.set_notice(NUMERIC_VALUE_NOTICE);

        assert!(app.notice.unwrap().contains("numeric"));
    }

    #[test]
    fn test_empty_register_input_is_a_silent_no_op() {
        assert_eq!(normalize_register_input(""), None);
        assert_eq!(normalize_register_input("   "), None);
        assert_eq!(normalize_register_input(" \t\n"), None);
    }

    #[test]
    fn test_register_input_is_forwarded_verbatim() {
        assert_eq!(normalize_register_input("0x30").as_deref(), Some("0x30"));
        assert_eq!(normalize_register_input(" 0x30 ").as_deref(), Some("0x30"));
        assert_eq!(normalize_register_input("8192").as_deref(), Some("8192"));
    }
}
