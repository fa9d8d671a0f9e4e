use crate::core::{Result, StoreError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single wire message; larger announced lengths are
/// treated as protocol corruption instead of allocated.
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// Write one u32-length-prefixed MessagePack message.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = rmp_serde::to_vec(message)
        .map_err(|e| StoreError::Serialization(format!("Failed to encode message: {}", e)))?;
    if payload.len() > MAX_MESSAGE_BYTES {
        return Err(StoreError::Serialization(format!(
            "Message of {} bytes exceeds the wire limit",
            payload.len()
        )));
    }
    let len = payload.len() as u32;
    writer
        .write_all(&len.to_le_bytes())
        .await
        .map_err(|e| StoreError::Remote(format!("Failed to write message length: {}", e)))?;
    writer
        .write_all(&payload)
        .await
        .map_err(|e| StoreError::Remote(format!("Failed to write message: {}", e)))?;
    writer
        .flush()
        .await
        .map_err(|e| StoreError::Remote(format!("Failed to flush message: {}", e)))?;
    Ok(())
}

/// Read one message. Returns `Ok(None)` when the peer closed the
/// connection cleanly at a frame boundary.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => {
            return Err(StoreError::Remote(format!(
                "Failed to read message length: {}",
                e
            )));
        }
    }
    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_MESSAGE_BYTES {
        return Err(StoreError::Remote(format!(
            "Announced message length {} exceeds the wire limit",
            len
        )));
    }
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| StoreError::Remote(format!("Truncated message: {}", e)))?;
    let message = rmp_serde::from_slice(&payload)
        .map_err(|e| StoreError::Serialization(format!("Failed to decode message: {}", e)))?;
    Ok(Some(message))
}
