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

//! Raw frame transport: anything that can carry whole frames in each direction.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, Mutex};

use crate::common::protocol::{read_frame, write_frame, MAX_FRAME_SIZE};
use crate::common::ProxyError;

/// Outbound half of a connection.
#[async_trait]
pub trait FrameSink: Send + Sync + 'static {
    /// Transmits one complete frame, length prefix included.
    async fn send_frame(&self, frame: Vec<u8>) -> Result<(), ProxyError>;
}

/// Inbound half of a connection.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Waits for the next complete frame; `Ok(None)` once the peer has gone away.
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, ProxyError>;
}

/// [`FrameSink`] over an async byte stream.
#[derive(Debug)]
pub struct StreamSink<W> {
    writer: Mutex<W>,
}

impl<W> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

#[async_trait]
impl<W> FrameSink for StreamSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send_frame(&self, frame: Vec<u8>) -> Result<(), ProxyError> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, &frame).await
    }
}

/// [`FrameSource`] over an async byte stream.
#[derive(Debug)]
pub struct StreamSource<R> {
    reader: R,
    max_frame_size: usize,
}

impl<R> StreamSource<R> {
    pub fn new(reader: R, max_frame_size: usize) -> Self {
        Self {
            reader,
            max_frame_size,
        }
    }
}

#[async_trait]
impl<R> FrameSource for StreamSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, ProxyError> {
        match read_frame(&mut self.reader, self.max_frame_size).await {
            Ok(frame) => Ok(Some(frame)),
            Err(ProxyError::ConnectionClosed) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Splits a bidirectional stream into its frame source and frame sink.
pub fn split_stream<S>(
    stream: S,
    max_frame_size: usize,
) -> (StreamSource<ReadHalf<S>>, StreamSink<WriteHalf<S>>)
where
    S: AsyncRead + AsyncWrite,
{
    let (reader, writer) = tokio::io::split(stream);
    (
        StreamSource::new(reader, max_frame_size.min(MAX_FRAME_SIZE)),
        StreamSink::new(writer),
    )
}

/// [`FrameSink`] feeding an in-memory channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Vec<u8>>,
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_frame(&self, frame: Vec<u8>) -> Result<(), ProxyError> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| ProxyError::ConnectionClosed)
    }
}

/// [`FrameSource`] draining an in-memory channel.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<Vec<u8>>,
}

#[async_trait]
impl FrameSource for ChannelSource {
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, ProxyError> {
        Ok(self.rx.recv().await)
    }
}

/// One side of an in-memory connection.
#[derive(Debug)]
pub struct ChannelEndpoint {
    pub sink: ChannelSink,
    pub source: ChannelSource,
}

/// Creates two connected endpoints: frames sent on one arrive at the other.
#[must_use]
pub fn channel_pair(capacity: usize) -> (ChannelEndpoint, ChannelEndpoint) {
    let (left_tx, right_rx) = mpsc::channel(capacity.max(1));
    let (right_tx, left_rx) = mpsc::channel(capacity.max(1));
    (
        ChannelEndpoint {
            sink: ChannelSink { tx: left_tx },
            source: ChannelSource { rx: left_rx },
        },
        ChannelEndpoint {
            sink: ChannelSink { tx: right_tx },
            source: ChannelSource { rx: right_rx },
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(body: &[u8]) -> Vec<u8> {
        let mut frame = u32::try_from(body.len()).unwrap().to_be_bytes().to_vec();
        frame.extend_from_slice(body);
        frame
    }

    #[tokio::test]
    async fn test_channel_pair_is_bidirectional() {
        let (mut left, mut right) = channel_pair(4);

        left.sink.send_frame(frame(b"ping")).await.unwrap();
        assert_eq!(right.source.next_frame().await.unwrap(), Some(frame(b"ping")));

        right.sink.send_frame(frame(b"pong")).await.unwrap();
        assert_eq!(left.source.next_frame().await.unwrap(), Some(frame(b"pong")));

        drop(right);
        assert_eq!(left.source.next_frame().await.unwrap(), None);
        assert_eq!(
            left.sink.send_frame(frame(b"late")).await.unwrap_err(),
            ProxyError::ConnectionClosed
        );
    }

    #[tokio::test]
    async fn test_stream_transport_over_duplex() {
        let (client, server) = tokio::io::duplex(1024);
        let (client_source, client_sink) = split_stream(client, 1024);
        let (mut server_source, server_sink) = split_stream(server, 1024);

        client_sink.send_frame(frame(b"one")).await.unwrap();
        client_sink.send_frame(frame(b"two")).await.unwrap();
        assert_eq!(server_source.next_frame().await.unwrap(), Some(frame(b"one")));
        assert_eq!(server_source.next_frame().await.unwrap(), Some(frame(b"two")));

        drop(client_sink);
        drop(client_source);
        drop(server_sink);
        assert_eq!(server_source.next_frame().await.unwrap(), None);
    }
}
