use async_ctrlc::CtrlC;
use fleetmap_client::*;
use log::info;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shared::init_logging();
    let config = config::Config::load(std::path::Path::new("./config.json"))?;

    let bus = Arc::new(EventBus::new());
    // stand-in for the selection panel that lives outside this core
    let _selection = bus.subscribe(Topic::VehicleSelected, |event| {
        if let UiEvent::VehicleSelected(id) = event {
            info!("vehicle selected: {}", id);
        }
    });

    let (click_tx, click_rx) = mpsc::channel(16);
    let engine = LogEngine::new(click_tx);
    let client = Client::from_config(&config, engine, bus.clone());

    let channel = FleetChannel::from_config(&config);
    let (snapshots, mut channel_handle) = channel.start();

    let (destroyer_tx, destroyer_rx) = oneshot::channel();
    let ctrlc = CtrlC::new()?;
    tokio::spawn(async move {
        ctrlc.await;
        let _ = destroyer_tx.send(());
    });

    info!("fleetmap client is running!");
    client.run(snapshots, click_rx, destroyer_rx).await;
    channel_handle.stop();
    channel_handle.wait().await;
    Ok(())
}
