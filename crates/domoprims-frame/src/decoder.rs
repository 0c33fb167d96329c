use bytes::{Buf, Bytes, BytesMut};
use tracing::trace;

use crate::codes::{Command, Component, START};

/// Marker opening every inbound event frame: start byte, event length,
/// event-report command.
pub const EVENT_MARKER: [u8; 3] = [START, 9, Command::EventReport as u8];

/// Number of payload fields following the marker.
pub const EVENT_FIELDS: usize = 7;

const EVENT_WIRE_SIZE: usize = EVENT_MARKER.len() + EVENT_FIELDS;

/// Payload field offsets fixed by the protocol definition.
const FIELD_COMPONENT: usize = 1;
const FIELD_ADDRESS: usize = 3;
const FIELD_STATE: usize = 5;

/// A decoded inbound event extracted from the raw byte stream.
///
/// Immutable; produced only by [`FrameDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFrame {
    /// Raw component code as it appeared on the wire.
    pub component_code: u8,
    /// The component, when the code is one this stack knows.
    pub component: Option<Component>,
    /// Group address of the device the event concerns.
    pub address: u8,
    /// Reported state value.
    pub state: u8,
    /// The raw payload fields, marker excluded.
    pub payload: Bytes,
}

impl EventFrame {
    fn from_payload(payload: Bytes) -> Self {
        let component_code = payload[FIELD_COMPONENT];
        Self {
            component_code,
            component: Component::from_code(component_code),
            address: payload[FIELD_ADDRESS],
            state: payload[FIELD_STATE],
            payload,
        }
    }
}

impl std::fmt::Display for EventFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.component {
            Some(component) => write!(
                f,
                "<EventFrame {} address={} state={}>",
                component, self.address, self.state
            ),
            None => write!(
                f,
                "<EventFrame component_code={} address={} state={}>",
                self.component_code, self.address, self.state
            ),
        }
    }
}

/// Incremental decoder for inbound event frames.
///
/// Feed it raw chunks as they arrive from the transport; it buffers
/// partial frames across calls, so a frame split at any byte boundary is
/// reassembled once the rest arrives. Bytes that do not open an event
/// frame are discarded silently — inbound noise never produces an error.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and extract every complete event frame it completes.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<EventFrame> {
        self.buf.extend_from_slice(bytes);

        let mut frames = Vec::new();
        loop {
            // Drop leading noise up to the next possible start byte, so the
            // buffer never grows beyond one partial frame plus the tail.
            match self.buf.iter().position(|&b| b == EVENT_MARKER[0]) {
                Some(0) => {}
                Some(pos) => {
                    trace!(discarded = pos, "skipping bytes before start marker");
                    self.buf.advance(pos);
                }
                None => {
                    if !self.buf.is_empty() {
                        trace!(discarded = self.buf.len(), "discarding non-frame bytes");
                        self.buf.clear();
                    }
                    break;
                }
            }

            if self.buf.len() < EVENT_MARKER.len() {
                break; // Partial marker; wait for more input.
            }
            if self.buf[..EVENT_MARKER.len()] != EVENT_MARKER {
                // A start byte that does not open an event frame.
                self.buf.advance(1);
                continue;
            }
            if self.buf.len() < EVENT_WIRE_SIZE {
                break; // Partial frame; wait for more input.
            }

            let mut frame = self.buf.split_to(EVENT_WIRE_SIZE);
            frame.advance(EVENT_MARKER.len());
            frames.push(EventFrame::from_payload(frame.freeze()));
        }
        frames
    }

    /// Number of bytes currently buffered awaiting frame completion.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(component: u8, address: u8, state: u8) -> Vec<u8> {
        vec![2, 9, 16, 1, component, 0, address, 0, state, 1]
    }

    #[test]
    fn decode_single_frame() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&event(1, 32, 255));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].component, Some(Component::Relay));
        assert_eq!(frames[0].address, 32);
        assert_eq!(frames[0].state, 255);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn decode_multiple_frames_in_one_chunk() {
        let mut chunk = event(1, 32, 255);
        chunk.extend(event(2, 5, 80));

        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&chunk);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].component, Some(Component::Relay));
        assert_eq!(frames[1].component, Some(Component::Dimmer));
        assert_eq!(frames[1].address, 5);
        assert_eq!(frames[1].state, 80);
    }

    #[test]
    fn frame_split_across_chunks_at_every_offset() {
        let wire = event(1, 32, 255);
        for split in 1..wire.len() {
            let mut decoder = FrameDecoder::new();
            assert!(
                decoder.feed(&wire[..split]).is_empty(),
                "split at {split} yielded a frame early"
            );
            let frames = decoder.feed(&wire[split..]);
            assert_eq!(frames.len(), 1, "split at {split}");
            assert_eq!(frames[0].address, 32);
            assert_eq!(frames[0].state, 255);
        }
    }

    #[test]
    fn leading_noise_is_discarded() {
        let mut chunk = vec![7, 88, 3, 0];
        chunk.extend(event(1, 32, 255));

        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&chunk);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].address, 32);
    }

    #[test]
    fn start_byte_without_marker_is_skipped() {
        // 2 not followed by 9,16 must not block later frames, including a
        // 2 that is itself followed by another genuine start.
        let mut chunk = vec![2, 7, 7, 2];
        chunk.extend(event(1, 4, 0));

        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&chunk);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].address, 4);
        assert_eq!(frames[0].state, 0);
    }

    #[test]
    fn unknown_component_code_still_yields_frame() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&event(99, 1, 0));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].component, None);
        assert_eq!(frames[0].component_code, 99);
    }

    #[test]
    fn noise_only_chunk_leaves_nothing_pending() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(&[5, 9, 16, 44, 0]).is_empty());
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn pending_partial_frame_is_retained() {
        let wire = event(1, 32, 255);
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(&wire[..6]).is_empty());
        assert_eq!(decoder.pending(), 6);
    }

    #[test]
    fn payload_field_layout() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&[2, 9, 16, 10, 20, 30, 40, 50, 60, 70]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].component_code, 20);
        assert_eq!(frames[0].address, 40);
        assert_eq!(frames[0].state, 60);
        assert_eq!(frames[0].payload.as_ref(), &[10, 20, 30, 40, 50, 60, 70]);
    }
}
