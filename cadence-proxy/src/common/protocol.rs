/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! Length-prefixed framing over async byte streams.
//!
//! Every frame starts with a big-endian `u32` counting the bytes that follow
//! it. The functions here move whole frames, prefix included, and leave the
//! body to the [`Codec`](crate::common::Codec).

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::ProxyError;

/// Size of the frame length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Hard upper bound on a frame body, independent of configuration.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Reads one complete frame, length prefix included.
///
/// A body larger than `max_size` is read and discarded so the stream stays
/// aligned on the next frame, then reported as [`ProxyError::Malformed`].
///
/// # Errors
///
/// * [`ProxyError::ConnectionClosed`] if the stream ends, cleanly or mid-frame.
/// * [`ProxyError::Malformed`] if the frame is oversized.
/// * [`ProxyError::Io`] for other read failures.
pub async fn read_frame<R>(reader: &mut R, max_size: usize) -> Result<Vec<u8>, ProxyError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    reader.read_exact(&mut prefix).await?;
    let length = u32::from_be_bytes(prefix);
    let length_usize = length as usize;

    let limit = max_size.min(MAX_FRAME_SIZE);
    if length_usize > limit {
        let skipped = tokio::io::copy(&mut (&mut *reader).take(u64::from(length)), &mut tokio::io::sink()).await?;
        if skipped < u64::from(length) {
            return Err(ProxyError::ConnectionClosed);
        }
        tracing::warn!(length, limit, "Discarded oversized frame");
        return Err(ProxyError::Malformed(format!(
            "Frame size {length_usize} exceeds maximum {limit}"
        )));
    }

    let mut frame = vec![0u8; LENGTH_PREFIX_SIZE + length_usize];
    frame[..LENGTH_PREFIX_SIZE].copy_from_slice(&prefix);
    reader.read_exact(&mut frame[LENGTH_PREFIX_SIZE..]).await?;

    tracing::trace!(length, "Read frame");
    Ok(frame)
}

/// Writes one complete frame, length prefix included, and flushes.
pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> Result<(), ProxyError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await?;
    tracing::trace!(length = frame.len(), "Wrote frame");
    Ok(())
}
