use panel_api::{Device, SystemState};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum InputMode {
    #[default]
    Normal,
    AddRegister,
}

/// Everything the operator sees, in one place. The poller replaces the
/// snapshot, the dispatcher adjusts notices/inputs, the UI moves the
/// selection; rendering is a pure projection of this struct (see `view`).
#[derive(Debug, Default)]
pub struct App {
    /// Last snapshot fetched from the server. Replaced wholesale on every
    /// successful poll; never mutated in place.
    pub snapshot: Option<SystemState>,
    /// Displayed arm state. Follows the snapshot, except for the window
    /// between an optimistic toggle and its confirmation or rollback.
    pub armed: bool,
    pub notice: Option<String>,
    /// Selected (device index, register index) cell, the target of a write.
    pub selected: (usize, usize),
    pub value_input: String,
    pub register_input: String,
    pub mode: InputMode,
}

impl App {
    /// Installs a freshly fetched snapshot. The displayed arm state is
    /// re-read from the server on every refresh, which also settles any
    /// optimistic toggle still in flight.
    pub fn apply_snapshot(&mut self, state: SystemState) {
        self.armed = state.armed;
        self.selected.0 = clamp_index(self.selected.0, state.devices.len());
        self.selected.1 = clamp_index(self.selected.1, state.registers.len());
        self.snapshot = Some(state);
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    /// Flips the displayed arm state ahead of server confirmation and
    /// returns the previous state for a possible rollback.
    pub fn arm_optimistically(&mut self, desired: bool) -> bool {
        std::mem::replace(&mut self.armed, desired)
    }

    pub fn revert_arm(&mut self, previous: bool) {
        self.armed = previous;
    }

    pub fn move_device(&mut self, delta: isize) {
        let count = self.snapshot.as_ref().map_or(0, |s| s.devices.len());
        self.selected.0 = step_index(self.selected.0, delta, count);
    }

    pub fn move_register(&mut self, delta: isize) {
        let count = self.snapshot.as_ref().map_or(0, |s| s.registers.len());
        self.selected.1 = step_index(self.selected.1, delta, count);
    }

    /// The (device, address) pair the selection currently points at.
    pub fn selected_target(&self) -> Option<(Device, u16)> {
        let state = self.snapshot.as_ref()?;
        let device = state.devices.get(self.selected.0)?.clone();
        let address = *state.registers.get(self.selected.1)?;

        Some((device, address))
    }
}

fn clamp_index(index: usize, count: usize) -> usize {
    index.min(count.saturating_sub(1))
}

fn step_index(index: usize, delta: isize, count: usize) -> usize {
    if count == 0 {
        return 0;
    }

    let stepped = index.saturating_add_signed(delta);
    clamp_index(stepped, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{from_value, json};

    fn snapshot() -> SystemState {
        from_value(json!({
            "armed": false,
            "devices": [
                {"name": "Device A", "unit_id": 1},
                {"name": "Device B", "unit_id": 2}
            ],
            "registers": [8192, 48, 7],
            "latest": {}
        }))
        .unwrap()
    }

    #[test]
    fn test_apply_snapshot_follows_server_arm_state() {
        let mut app = App::default();
        app.armed = true;

        app.apply_snapshot(snapshot());

        assert!(!app.armed);
        assert!(app.snapshot.is_some());
    }

    #[test]
    fn test_apply_snapshot_clamps_selection() {
        let mut app = App::default();
        app.selected = (5, 9);

        app.apply_snapshot(snapshot());

        assert_eq!(app.selected, (1, 2));
    }

    #[test]
    fn test_optimistic_arm_and_rollback() {
        let mut app = App::default();

        let previous = app.arm_optimistically(true);
        assert!(app.armed);
        assert!(!previous);

        app.revert_arm(previous);
        assert!(!app.armed);
    }

    #[test]
    fn test_selection_movement() {
        let mut app = App::default();
        app.apply_snapshot(snapshot());

        app.move_register(1);
        app.move_register(1);
        app.move_register(1);
        assert_eq!(app.selected.1, 2);

        app.move_register(-1);
        assert_eq!(app.selected.1, 1);

        app.move_device(1);
        app.move_device(1);
        assert_eq!(app.selected.0, 1);

        let (device, address) = app.selected_target().unwrap();
        assert_eq!(device.name, "Device B");
        assert_eq!(address, 48);
    }

    #[test]
    fn test_selection_without_snapshot() {
        let mut app = App::default();

        app.move_device(1);
        app.move_register(-1);

        assert_eq!(app.selected, (0, 0));
        assert!(app.selected_target().is_none());
    }
}
