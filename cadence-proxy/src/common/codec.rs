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

//! Binary encoding of message envelopes.
//!
//! Frame layout, all integers big-endian `u32`:
//!
//! ```text
//! [length][typeTag][propertyCount]
//!     { [keyLength][key][valueLength][value] } * propertyCount
//! [attachmentCount]
//!     { [attachmentLength][attachment] } * attachmentCount
//! ```
//!
//! `length` counts the bytes after itself. Keys and values are UTF-8. A null
//! property value is written as `valueLength = 0xFFFF_FFFF` with no bytes.

use std::sync::Arc;

use crate::common::protocol::{LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE};
use crate::common::{MessageRegistry, ProxyError};
use crate::traits::ProxyMessage;

/// Length marker of a null property value.
pub const NULL_LENGTH: u32 = u32::MAX;

/// Encodes messages into frames and decodes frames through a [`MessageRegistry`].
#[derive(Debug, Clone)]
pub struct Codec {
    registry: Arc<MessageRegistry>,
    max_frame_size: usize,
}

impl Codec {
    /// Creates a codec bounded by [`MAX_FRAME_SIZE`].
    #[must_use]
    pub fn new(registry: Arc<MessageRegistry>) -> Self {
        Self::with_max_frame_size(registry, MAX_FRAME_SIZE)
    }

    /// Creates a codec rejecting frame bodies larger than `max_frame_size`.
    #[must_use]
    pub fn with_max_frame_size(registry: Arc<MessageRegistry>, max_frame_size: usize) -> Self {
        Self {
            registry,
            max_frame_size: max_frame_size.min(MAX_FRAME_SIZE),
        }
    }

    /// Lowers the frame size bound to `max_frame_size` if it is smaller.
    #[must_use]
    pub fn limited_to(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = self.max_frame_size.min(max_frame_size);
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<MessageRegistry> {
        &self.registry
    }

    #[must_use]
    pub const fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Encodes a message into a complete frame, length prefix included.
    ///
    /// Properties are written in key order, so equal messages encode to
    /// identical bytes.
    ///
    /// # Errors
    ///
    /// [`ProxyError::Malformed`] if a section does not fit its `u32` length
    /// or the frame exceeds the configured maximum.
    pub fn encode(&self, message: &dyn ProxyMessage) -> Result<Vec<u8>, ProxyError> {
        let mut frame = vec![0u8; LENGTH_PREFIX_SIZE];
        put_u32(&mut frame, message.message_type().code());

        let mut properties: Vec<(&str, Option<&str>)> = message.properties().iter().collect();
        properties.sort_unstable_by_key(|(key, _)| *key);
        put_u32(&mut frame, section_len(properties.len(), "property count")?);
        for (key, value) in properties {
            put_bytes(&mut frame, key.as_bytes(), "property key")?;
            match value {
                Some(value) => put_bytes(&mut frame, value.as_bytes(), "property value")?,
                None => put_u32(&mut frame, NULL_LENGTH),
            }
        }

        let attachments = message.attachments();
        put_u32(&mut frame, section_len(attachments.len(), "attachment count")?);
        for attachment in attachments {
            put_bytes(&mut frame, attachment, "attachment")?;
        }

        let body_len = frame.len() - LENGTH_PREFIX_SIZE;
        if body_len > self.max_frame_size {
            return Err(ProxyError::Malformed(format!(
                "Frame size {body_len} exceeds maximum {}",
                self.max_frame_size
            )));
        }
        let prefix = section_len(body_len, "frame")?.to_be_bytes();
        frame[..LENGTH_PREFIX_SIZE].copy_from_slice(&prefix);

        tracing::trace!(message_type = %message.message_type(), length = body_len, "Encoded frame");
        Ok(frame)
    }

    /// Decodes a complete frame, length prefix included.
    ///
    /// # Errors
    ///
    /// * [`ProxyError::Malformed`] for truncation, trailing bytes, a length
    ///   prefix that disagrees with the frame, invalid UTF-8, or an oversized frame.
    /// * [`ProxyError::UnknownMessageType`] if the type tag is not registered.
    pub fn decode(&self, frame: &[u8]) -> Result<Box<dyn ProxyMessage>, ProxyError> {
        let mut reader = FrameReader::new(frame);

        let length = reader.u32("length prefix")? as usize;
        if length > self.max_frame_size {
            return Err(ProxyError::Malformed(format!(
                "Frame size {length} exceeds maximum {}",
                self.max_frame_size
            )));
        }
        if length != reader.remaining() {
            return Err(ProxyError::Malformed(format!(
                "Length prefix {length} does not match {} body bytes",
                reader.remaining()
            )));
        }

        let code = reader.u32("type tag")?;
        let mut message = self.registry.create(code)?;

        let property_count = reader.u32("property count")?;
        for _ in 0..property_count {
            let key = reader.string("property key")?;
            let value = match reader.u32("property value length")? {
                NULL_LENGTH => None,
                len => Some(reader.utf8(len as usize, "property value")?),
            };
            message.properties_mut().insert_raw(key, value);
        }

        let attachment_count = reader.u32("attachment count")?;
        let envelope = message.envelope_mut();
        for _ in 0..attachment_count {
            let len = reader.u32("attachment length")? as usize;
            envelope.push_attachment(reader.take(len, "attachment")?);
        }

        if reader.remaining() != 0 {
            return Err(ProxyError::Malformed(format!(
                "{} trailing bytes after attachments",
                reader.remaining()
            )));
        }

        tracing::trace!(message_type = %message.message_type(), length, "Decoded frame");
        Ok(message)
    }
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn section_len(len: usize, section: &str) -> Result<u32, ProxyError> {
    u32::try_from(len)
        .ok()
        .filter(|len| *len != NULL_LENGTH)
        .ok_or_else(|| ProxyError::Malformed(format!("{section} too large for u32 length")))
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8], section: &str) -> Result<(), ProxyError> {
    put_u32(buf, section_len(bytes.len(), section)?);
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Bounds-checked cursor over a frame.
struct FrameReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize, section: &str) -> Result<&'a [u8], ProxyError> {
        if len > self.remaining() {
            return Err(ProxyError::Malformed(format!(
                "Truncated {section}: need {len} bytes, {} left",
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn u32(&mut self, section: &str) -> Result<u32, ProxyError> {
        let bytes = self.take(4, section)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn utf8(&mut self, len: usize, section: &str) -> Result<String, ProxyError> {
        let bytes = self.take(len, section)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| ProxyError::Malformed(format!("Invalid UTF-8 in {section}: {e}")))
    }

    fn string(&mut self, section: &str) -> Result<String, ProxyError> {
        let len = self.u32(section)? as usize;
        self.utf8(len, section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ErrorEnvelope, ErrorType, MessageType};
    use crate::messages::{DomainRegisterReply, DomainRegisterRequest, HeartbeatRequest};
    use crate::traits::{HasError, HasRequestId};

    fn codec() -> Codec {
        Codec::new(Arc::new(MessageRegistry::with_all_messages().unwrap()))
    }

    fn sample_request() -> DomainRegisterRequest {
        let mut request = DomainRegisterRequest::new();
        request.set_request_id(555);
        request.set_name(Some("orders"));
        request.set_description(None);
        request.set_owner_email(Some("a@b.com"));
        request.set_emit_metrics(true);
        request.set_retention_days(30);
        request.envelope_mut().push_attachment(vec![0, 1, 2, 255]);
        request.envelope_mut().push_attachment(Vec::new());
        request
    }

    #[test]
    fn test_round_trip_preserves_everything() {
        let codec = codec();
        let request = sample_request();

        let frame = codec.encode(&request).unwrap();
        let decoded = codec.decode(&frame).unwrap();
        let decoded = decoded.downcast::<DomainRegisterRequest>().unwrap();

        assert_eq!(*decoded, request);
        assert_eq!(decoded.request_id(), 555);
        assert!(decoded.properties().is_null("Description"));
        assert_eq!(decoded.attachments(), &[vec![0, 1, 2, 255], Vec::new()]);
    }

    #[test]
    fn test_reply_error_survives() {
        let codec = codec();
        let mut reply = DomainRegisterReply::new();
        reply.set_request_id(555);
        reply.set_error(Some(&ErrorEnvelope::new(ErrorType::Custom, "MyError")));

        let decoded = codec.decode(&codec.encode(&reply).unwrap()).unwrap();
        let error = decoded.as_error().unwrap().error().unwrap().unwrap();
        assert_eq!(error.kind, ErrorType::Custom);
        assert_eq!(error.message, "MyError");
    }

    #[test]
    fn test_cleared_error_is_not_encoded() {
        let codec = codec();
        let contains_error_key = |frame: &[u8]| frame.windows(5).any(|window| window == b"Error");

        let mut reply = DomainRegisterReply::new();
        reply.set_request_id(555);
        reply.set_error(Some(&ErrorEnvelope::new(ErrorType::Custom, "MyError")));
        assert!(contains_error_key(&codec.encode(&reply).unwrap()));

        reply.set_error(None);
        let frame = codec.encode(&reply).unwrap();
        assert!(!contains_error_key(&frame));
        let decoded = codec.decode(&frame).unwrap();
        assert_eq!(decoded.as_error().unwrap().error_type().unwrap(), ErrorType::None);

        reply.set_error(Some(&ErrorEnvelope::new(ErrorType::Generic, "failed")));
        reply.set_error(Some(&ErrorEnvelope::new(ErrorType::None, "ignored")));
        let frame = codec.encode(&reply).unwrap();
        assert!(!contains_error_key(&frame));
        let decoded = codec.decode(&frame).unwrap();
        assert_eq!(decoded.as_error().unwrap().error_type().unwrap(), ErrorType::None);
        assert_eq!(decoded.request_id(), Some(555));
    }

    #[test]
    fn test_wire_layout_of_empty_message() {
        let codec = codec();
        let frame = codec.encode(&HeartbeatRequest::new()).unwrap();
        let mut expected = 12u32.to_be_bytes().to_vec();
        expected.extend_from_slice(&MessageType::HeartbeatRequest.code().to_be_bytes());
        expected.extend_from_slice(&[0u8; 8]);
        assert_eq!(frame, expected);
    }

    #[test]
    fn test_null_value_marker() {
        let codec = codec();
        let mut request = HeartbeatRequest::new();
        request.properties_mut().set_string("K", None);

        let frame = codec.encode(&request).unwrap();
        // prefix, tag, count, key length, key, then the null marker
        assert_eq!(&frame[17..21], &NULL_LENGTH.to_be_bytes());
        assert_eq!(frame.len(), 25);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let codec = codec();
        let request = sample_request();
        let copy = request.clone();
        assert_eq!(codec.encode(&request).unwrap(), codec.encode(&copy).unwrap());
    }

    #[test]
    fn test_every_truncation_is_malformed() {
        let codec = codec();
        let frame = codec.encode(&sample_request()).unwrap();
        for cut in 0..frame.len() {
            let result = codec.decode(&frame[..cut]);
            assert!(
                matches!(result, Err(ProxyError::Malformed(_))),
                "cut at {cut} produced {result:?}"
            );
        }
    }

    #[test]
    fn test_truncated_body_with_consistent_prefix_is_malformed() {
        let codec = codec();
        let mut frame = codec.encode(&sample_request()).unwrap();
        frame.truncate(frame.len() - 3);
        let body_len = u32::try_from(frame.len() - LENGTH_PREFIX_SIZE).unwrap();
        frame[..4].copy_from_slice(&body_len.to_be_bytes());
        assert!(matches!(codec.decode(&frame), Err(ProxyError::Malformed(_))));
    }

    #[test]
    fn test_trailing_bytes_are_malformed() {
        let codec = codec();
        let mut frame = codec.encode(&HeartbeatRequest::new()).unwrap();
        frame.push(0);
        frame[..4].copy_from_slice(&13u32.to_be_bytes());
        assert!(matches!(codec.decode(&frame), Err(ProxyError::Malformed(_))));
    }

    #[test]
    fn test_unknown_type_tag() {
        let codec = codec();
        let mut frame = codec.encode(&HeartbeatRequest::new()).unwrap();
        frame[4..8].copy_from_slice(&9999u32.to_be_bytes());
        assert_eq!(
            codec.decode(&frame).unwrap_err(),
            ProxyError::UnknownMessageType(9999)
        );
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let codec = codec();
        let mut request = HeartbeatRequest::new();
        request.properties_mut().set_string("K", Some("v"));
        let mut frame = codec.encode(&request).unwrap();
        let last = frame.len() - 5;
        frame[last] = 0xFF;
        assert!(matches!(codec.decode(&frame), Err(ProxyError::Malformed(_))));
    }

    #[test]
    fn test_frame_size_limit() {
        let registry = Arc::new(MessageRegistry::with_all_messages().unwrap());
        let codec = Codec::with_max_frame_size(registry, 32);
        let mut request = HeartbeatRequest::new();
        request.envelope_mut().push_attachment(vec![0u8; 64]);

        assert!(matches!(codec.encode(&request), Err(ProxyError::Malformed(_))));

        let large = Codec::new(Arc::clone(codec.registry()));
        let frame = large.encode(&request).unwrap();
        assert!(matches!(codec.decode(&frame), Err(ProxyError::Malformed(_))));
    }
}
