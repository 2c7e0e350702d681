// SPDX-License-Identifier: MIT

//! Errors from encoding or framing a wire message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode or decode message as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message exceeds the maximum frame size ({len} > {max})")]
    FrameTooLarge { len: usize, max: usize },
    #[error("io error while framing a message: {0}")]
    Io(#[from] std::io::Error),
}
