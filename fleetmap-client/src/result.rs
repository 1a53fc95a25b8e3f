use crate::error::*;

pub type ChannelResult<T> = Result<T, ChannelError>;
pub type EngineResult<T> = Result<T, EngineError>;
