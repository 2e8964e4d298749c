use chrono::{Local, LocalResult, TimeZone};
use panel_api::{format_address, Reading};

use crate::app::App;

pub const PLACEHOLDER: &str = "—";

/// Rendered form of one snapshot: everything the terminal shell needs to
/// draw, with no widget types involved. Projecting the same `App` twice
/// yields an identical view.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelView {
    pub armed: bool,
    pub notice: Option<String>,
    pub cards: Vec<DeviceCard>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeviceCard {
    pub title: String,
    pub rows: Vec<RegisterRow>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RegisterRow {
    pub address: String,
    pub value: String,
    pub status: String,
    pub selected: bool,
}

/// Pure projection of the latest snapshot plus UI state. No I/O. Device and
/// register order are the server's array order; every card lists the same
/// registers.
pub fn project(app: &App) -> PanelView {
    let Some(state) = app.snapshot.as_ref() else {
        return PanelView {
            armed: app.armed,
            notice: app.notice.clone(),
            cards: Vec::new(),
        };
    };

    let cards = state
        .devices
        .iter()
        .enumerate()
        .map(|(device_index, device)| {
            let rows = state
                .registers
                .iter()
                .enumerate()
                .map(|(register_index, &address)| {
                    let reading = state.reading(device, address);

                    RegisterRow {
                        address: format_address(address),
                        value: display_value(reading),
                        status: display_status(reading),
                        selected: app.selected == (device_index, register_index),
                    }
                })
                .collect();

            DeviceCard {
                title: format!("{} (unit {})", device.name, device.unit_id),
                rows,
            }
        })
        .collect();

    PanelView {
        armed: app.armed,
        notice: app.notice.clone(),
        cards,
    }
}

fn display_value(reading: Option<&Reading>) -> String {
    match reading.and_then(|reading| reading.value) {
        Some(value) if value.fract() == 0.0 && value.abs() < 1e15 => format!("{}", value as i64),
        Some(value) => format!("{value}"),
        None => PLACEHOLDER.to_string(),
    }
}

fn display_status(reading: Option<&Reading>) -> String {
    let Some(reading) = reading else {
        return "ERR".to_string();
    };

    let mut status = if reading.ok { "OK" } else { "ERR" }.to_string();

    if let Some(error) = reading.error.as_deref().filter(|error| !error.is_empty()) {
        status.push(' ');
        status.push_str(error);
    }

    if let Some(ts) = reading.timestamp() {
        let time = format_time_of_day(ts);
        if !time.is_empty() {
            status.push(' ');
            status.push_str(&time);
        }
    }

    status
}

fn format_time_of_day(epoch_seconds: f64) -> String {
    match Local.timestamp_opt(epoch_seconds as i64, 0) {
        LocalResult::Single(time) => time.format("%H:%M:%S").to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use panel_api::SystemState;
    use serde_json::{from_value, json};

    fn app_with_snapshot() -> App {
        let state: SystemState = from_value(json!({
            "armed": true,
            "devices": [
                {"name": "Device A", "unit_id": 1},
                {"name": "Device B", "unit_id": 2}
            ],
            "registers": [8192, 48],
            "latest": {
                "Device A__1": {
                    "8192": {"address": 8192, "value": 17, "ok": true, "error": null, "ts": null},
                    "48": {"address": 48, "value": null, "ok": false, "error": "No response", "ts": null}
                },
                "Device B__2": {
                    "8192": {"address": 8192, "value": null, "ok": true, "error": null, "ts": null}
                }
            }
        }))
        .unwrap();

        let mut app = App::default();
        app.apply_snapshot(state);
        app
    }

    #[test]
    fn test_projection_is_deterministic() {
        let app = app_with_snapshot();

        assert_eq!(project(&app), project(&app));
    }

    #[test]
    fn test_cards_follow_server_order() {
        let view = project(&app_with_snapshot());

        assert!(view.armed);
        assert_eq!(view.cards.len(), 2);
        assert_eq!(view.cards[0].title, "Device A (unit 1)");
        assert_eq!(view.cards[1].title, "Device B (unit 2)");

        for card in &view.cards {
            let addresses: Vec<&str> = card.rows.iter().map(|row| row.address.as_str()).collect();
            assert_eq!(addresses, vec!["0x2000", "0x30"]);
        }
    }

    #[test]
    fn test_failed_reading_shows_err_and_message() {
        let view = project(&app_with_snapshot());

        let row = &view.cards[0].rows[1];
        assert_eq!(row.value, PLACEHOLDER);
        assert!(row.status.contains("ERR"));
        assert!(row.status.contains("No response"));
    }

    #[test]
    fn test_null_value_shows_placeholder_not_zero() {
        let view = project(&app_with_snapshot());

        let row = &view.cards[1].rows[0];
        assert_eq!(row.value, PLACEHOLDER);
        assert!(row.status.contains("OK"));
    }

    #[test]
    fn test_missing_reading_shows_placeholder_and_err() {
        let view = project(&app_with_snapshot());

        // Device B has never been polled at 0x30.
        let row = &view.cards[1].rows[1];
        assert_eq!(row.value, PLACEHOLDER);
        assert_eq!(row.status, "ERR");
    }

    #[test]
    fn test_whole_values_print_without_fraction() {
        let view = project(&app_with_snapshot());

        assert_eq!(view.cards[0].rows[0].value, "17");
    }

    #[test]
    fn test_selected_cell_is_marked() {
        let mut app = app_with_snapshot();
        app.selected = (1, 0);

        let view = project(&app);

        assert!(view.cards[1].rows[0].selected);
        assert!(!view.cards[0].rows[0].selected);
        assert_eq!(
            view.cards
                .iter()
                .flat_map(|card| &card.rows)
                .filter(|row| row.selected)
                .count(),
            1
        );
    }

    #[test]
    fn test_empty_app_projects_no_cards() {
        let app = App::default();

        let view = project(&app);

        assert!(view.cards.is_empty());
        assert!(!view.armed);
    }
}
