use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("websocket transport failed")]
    Transport(#[from] tungstenite::Error),
    #[error("server closed the fleet topic")]
    Closed,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("navigator resources exhausted")]
    ResourcesExhausted,
    #[error("drawing engine rejected the call: {0}")]
    Backend(String),
}
