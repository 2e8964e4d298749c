use std::sync::Arc;
use std::time::Duration;

use log::{debug, error};
use panel_api::Client;
use tokio::sync::Mutex;
use tokio::time;

use crate::app::App;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(800);

/// One fetch-and-store cycle. Failures are logged and swallowed so callers
/// never have to handle them; the next cycle retries regardless. Also used
/// as the one-shot refresh after a successful command, which may overlap an
/// in-flight scheduled cycle. Snapshots are full replacements, so the last
/// writer wins.
pub async fn refresh(client: &Client, app: &Arc<Mutex<App>>) {
    match client.state().await {
        Ok(state) => {
            debug!(
                "snapshot: {} devices, {} registers",
                state.devices.len(),
                state.registers.len()
            );
            app.lock().await.apply_snapshot(state);
        }
        Err(err) => error!("state refresh failed: {err}"),
    }
}

/// Self-rescheduling poll loop: fetch, store, wait, repeat. The delay only
/// starts once the cycle completes, so scheduled cycles never overlap each
/// other. Nothing terminates the loop.
pub async fn run(client: Client, app: Arc<Mutex<App>>, interval: Duration) {
    loop {
        refresh(&client, &app).await;
        time::sleep(interval).await;
    }
}
