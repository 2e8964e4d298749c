use std::sync::Arc;
use std::time::Duration;

use log::info;
use panel_api::Client;
use tokio::sync::Mutex;
use tokio::task;

use regmon::app::App;
use regmon::{poller, ui, Result};

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let base_url =
        std::env::var("PANEL_URL").unwrap_or_else(|_| "http://localhost:5000/api".to_string());

    let poll_interval = std::env::var("PANEL_POLL_MS")
        .ok()
        .and_then(|ms| ms.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(poller::DEFAULT_POLL_INTERVAL);

    let client = Client::new(&base_url)?;
    info!("polling {base_url} every {poll_interval:?}");

    let app = Arc::new(Mutex::new(App::default()));

    task::spawn(poller::run(client.clone(), app.clone(), poll_interval));

    ui::run(client, app).await
}
