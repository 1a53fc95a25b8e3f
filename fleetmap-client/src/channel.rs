use crate::error::ChannelError;
use crate::result::ChannelResult;
use futures::future::Fuse;
use futures::{pin_mut, select, FutureExt, SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{parse_fleet_message, FleetSnapshot};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::IntervalStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Stopped,
}

/// One logical subscription to the server's fleet topic.
///
/// Owns the whole transport policy: connect, subscribe, keep-alive pings,
/// reconnect after a fixed delay, forever, until `ChannelHandle::stop` fires.
/// Each text message becomes one `FleetSnapshot` on the returned receiver;
/// malformed bodies are logged and dropped without disturbing the connection.
pub struct FleetChannel {
    url: String,
    topic: String,
    reconnect_delay: Duration,
    heartbeat_interval: Duration,
    snapshot_buffer: usize,
    state: ChannelState,
}

pub struct ChannelHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl ChannelHandle {
    /// Requests shutdown: cancels a pending reconnect sleep, closes the
    /// socket, moves the channel to `Stopped`.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    pub async fn wait(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl FleetChannel {
    pub fn new(
        url: String,
        topic: String,
        reconnect_delay: Duration,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            url,
            topic,
            reconnect_delay,
            heartbeat_interval,
            snapshot_buffer: 64,
            state: ChannelState::Disconnected,
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        let mut channel = Self::new(
            config.server_url.clone(),
            config.fleet_topic.clone(),
            config.reconnect_delay(),
            config.heartbeat_interval(),
        );
        channel.snapshot_buffer = config.snapshot_buffer;
        channel
    }

    /// Spawns the transport task. Snapshots arrive on the returned receiver
    /// in wire order.
    pub fn start(self) -> (mpsc::Receiver<FleetSnapshot>, ChannelHandle) {
        let (snapshot_tx, snapshot_rx) = mpsc::channel(self.snapshot_buffer);
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(snapshot_tx, stop_rx));
        (
            snapshot_rx,
            ChannelHandle {
                stop: Some(stop_tx),
                task: Some(task),
            },
        )
    }

    async fn run(mut self, snapshot_tx: mpsc::Sender<FleetSnapshot>, stop_rx: oneshot::Receiver<()>) {
        let mut stop = stop_rx.fuse();
        loop {
            self.set_state(ChannelState::Connecting);
            let connect = tokio_tungstenite::connect_async(self.url.clone()).fuse();
            pin_mut!(connect);
            let ws = select! {
                result = connect => match result {
                    Ok((ws, _response)) => Some(ws),
                    Err(e) => {
                        error!("could not reach fleet topic at {}: {}", self.url, e);
                        None
                    }
                },
                _ = stop => {
                    self.set_state(ChannelState::Stopped);
                    return;
                }
            };

            if let Some(ws) = ws {
                self.set_state(ChannelState::Connected);
                match self.drive(ws, &snapshot_tx, &mut stop).await {
                    Ok(()) => {
                        self.set_state(ChannelState::Stopped);
                        return;
                    }
                    Err(e) => warn!("fleet topic connection lost: {}", e),
                }
            }

            self.set_state(ChannelState::Disconnected);
            let delay = tokio::time::sleep(self.reconnect_delay).fuse();
            pin_mut!(delay);
            select! {
                _ = delay => {}
                _ = stop => {
                    self.set_state(ChannelState::Stopped);
                    return;
                }
            }
        }
    }

    /// Pumps one live connection. `Ok(())` means shutdown was requested (or
    /// the pipeline went away); `Err` means the transport failed and the
    /// caller should reconnect.
    async fn drive(
        &mut self,
        ws: WsStream,
        snapshot_tx: &mpsc::Sender<FleetSnapshot>,
        mut stop: &mut Fuse<oneshot::Receiver<()>>,
    ) -> ChannelResult<()> {
        let (mut sink, stream) = ws.split();
        sink.send(Message::Text(subscribe_frame(&self.topic))).await?;

        let mut stream = stream.fuse();
        let mut heartbeat =
            IntervalStream::new(tokio::time::interval(self.heartbeat_interval)).fuse();
        loop {
            select! {
                message = stream.next() => match message {
                    Some(Ok(Message::Text(body))) => match parse_fleet_message(&body) {
                        Ok(snapshot) => {
                            if snapshot_tx.send(snapshot).await.is_err() {
                                // pipeline torn down underneath us
                                let _ = sink.send(Message::Close(None)).await;
                                return Ok(());
                            }
                        }
                        Err(e) => error!("dropping malformed fleet message: {}", e),
                    },
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = sink.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => return Err(ChannelError::Closed),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
                _ = heartbeat.next() => {
                    sink.send(Message::Ping(Vec::new())).await?;
                }
                _ = stop => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(());
                }
            }
        }
    }

    fn set_state(&mut self, state: ChannelState) {
        if self.state == state {
            return;
        }
        debug!("fleet channel {:?} -> {:?}", self.state, state);
        if state == ChannelState::Connected {
            info!("subscribed to fleet topic {}", self.topic);
        }
        self.state = state;
    }
}

/// Session activation frame sent right after the socket opens.
fn subscribe_frame(topic: &str) -> String {
    serde_json::json!({
        "action": "subscribe",
        "topic": topic,
        "version": shared::VERSION_STR,
    })
    .to_string()
}
