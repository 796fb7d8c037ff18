use bytes::Bytes;
use tracing::warn;

use super::frame::{EventName, EventPayload, StreamFrame, FRAME_DELIM};

/// Incremental decoder for the multiplexed turn stream.
///
/// The transport may split frames anywhere, including inside the delimiter
/// itself, so the parser keeps an accumulation buffer: text up to a possible
/// half-arrived delimiter is flushed eagerly, a delimited span is only
/// consumed once its closing delimiter has arrived, and a single chunk may
/// yield any number of frames. Malformed JSON inside a delimited span is
/// dropped without poisoning the rest of the stream.
#[derive(Default)]
pub struct FrameParser {
    buffer: Vec<u8>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes; returns every frame completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        self.buffer.extend_from_slice(chunk);
        let delim = FRAME_DELIM.as_bytes();
        let mut frames = Vec::new();

        loop {
            match find(&self.buffer, delim, 0) {
                None => {
                    // Keep a tail one byte shorter than the delimiter in case
                    // its prefix is still in flight.
                    let hold = delim.len() - 1;
                    if self.buffer.len() > hold {
                        let flush_len = self.buffer.len() - hold;
                        let text: Vec<u8> = self.buffer.drain(..flush_len).collect();
                        frames.push(StreamFrame::TextDelta(Bytes::from(text)));
                    }
                    break;
                }
                Some(open) => {
                    if open > 0 {
                        let text: Vec<u8> = self.buffer.drain(..open).collect();
                        frames.push(StreamFrame::TextDelta(Bytes::from(text)));
                    }

                    // Buffer now starts at the opening delimiter.
                    let Some(close) = find(&self.buffer, delim, delim.len()) else {
                        // Closing delimiter not here yet; leave the opening
                        // one unconsumed and wait for more bytes.
                        break;
                    };

                    let span = &self.buffer[delim.len()..close];
                    match decode_event(span) {
                        Some(frame) => frames.push(frame),
                        None => warn!(
                            span = %String::from_utf8_lossy(span),
                            "discarding malformed control event"
                        ),
                    }
                    self.buffer.drain(..close + delim.len());
                }
            }
        }

        frames
    }

    /// Flush whatever remains as a final text delta. Call once the transport
    /// signals end-of-stream.
    pub fn finish(&mut self) -> Option<StreamFrame> {
        if self.buffer.is_empty() {
            return None;
        }
        let text: Vec<u8> = self.buffer.drain(..).collect();
        Some(StreamFrame::TextDelta(Bytes::from(text)))
    }
}

fn decode_event(span: &[u8]) -> Option<StreamFrame> {
    let payload: EventPayload = serde_json::from_slice(span).ok()?;
    let event = EventName::parse(&payload.event)?;
    Some(StreamFrame::ControlEvent {
        event,
        meta: payload.meta,
    })
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if haystack.len() < from + needle.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Coalesce adjacent text deltas so frame sequences can be compared
    /// independently of how the transport chunked the bytes.
    fn normalize(frames: Vec<StreamFrame>) -> Vec<StreamFrame> {
        let mut out: Vec<StreamFrame> = Vec::new();
        for frame in frames {
            if let StreamFrame::TextDelta(next) = &frame {
                if let Some(StreamFrame::TextDelta(acc)) = out.last_mut() {
                    let mut merged = acc.to_vec();
                    merged.extend_from_slice(next);
                    *acc = Bytes::from(merged);
                    continue;
                }
            }
            out.push(frame);
        }
        out
    }

    fn parse_chunked(bytes: &[u8], chunk_size: usize) -> Vec<StreamFrame> {
        let mut parser = FrameParser::new();
        let mut frames = Vec::new();
        for chunk in bytes.chunks(chunk_size) {
            frames.extend(parser.push(chunk));
        }
        frames.extend(parser.finish());
        normalize(frames)
    }

    fn sample_stream() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(
            &StreamFrame::event(EventName::AgentStart, Some("cultural_analyst".into())).encode(),
        );
        bytes.extend_from_slice(b"The brand speaks to ");
        bytes.extend_from_slice(
            &StreamFrame::event(EventName::AgentLog, Some("retrying after rate limit".into()))
                .encode(),
        );
        bytes.extend_from_slice("ritual-seeking \u{2615} drinkers.".as_bytes());
        bytes.extend_from_slice(
            &StreamFrame::event(EventName::AgentDone, Some("cultural_analyst".into())).encode(),
        );
        bytes
    }

    #[test]
    fn test_whole_stream_parses() {
        let frames = parse_chunked(&sample_stream(), usize::MAX);
        assert_eq!(frames.len(), 5);
        assert!(matches!(
            frames[0],
            StreamFrame::ControlEvent { event: EventName::AgentStart, .. }
        ));
        assert_eq!(frames[1], StreamFrame::text("The brand speaks to ".as_bytes().to_vec()));
        assert!(matches!(
            frames[2],
            StreamFrame::ControlEvent { event: EventName::AgentLog, .. }
        ));
        assert_eq!(
            frames[3],
            StreamFrame::text("ritual-seeking \u{2615} drinkers.".as_bytes().to_vec())
        );
        assert!(matches!(
            frames[4],
            StreamFrame::ControlEvent { event: EventName::AgentDone, .. }
        ));
    }

    #[test]
    fn test_chunk_invariance() {
        let bytes = sample_stream();
        let reference = parse_chunked(&bytes, usize::MAX);
        for chunk_size in [1, 2, 3, 5, 7, 16, 64] {
            assert_eq!(
                parse_chunked(&bytes, chunk_size),
                reference,
                "chunk size {chunk_size} diverged"
            );
        }
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut bytes = Vec::new();
        for agent in ["cultural_analyst", "behavioral_analyst"] {
            bytes.extend_from_slice(
                &StreamFrame::event(EventName::AgentStart, Some(agent.into())).encode(),
            );
            bytes.extend_from_slice(
                &StreamFrame::event(EventName::AgentDone, Some(agent.into())).encode(),
            );
        }
        let mut parser = FrameParser::new();
        let frames = parser.push(&bytes);
        assert_eq!(frames.len(), 4);
    }

    #[test]
    fn test_delimiter_split_across_reads_is_not_flushed_as_text() {
        let event = StreamFrame::event(EventName::AgentDone, Some("critic".into())).encode();
        let mut parser = FrameParser::new();

        // Feed text plus only the first byte of the delimiter.
        let mut first = b"prose ".to_vec();
        first.push(event[0]);
        let frames = parser.push(&first);
        assert_eq!(frames, vec![StreamFrame::text("prose ".as_bytes().to_vec())]);

        // The rest of the event completes it.
        let frames = parser.push(&event[1..]);
        assert_eq!(frames.len(), 1);
        assert!(matches!(
            frames[0],
            StreamFrame::ControlEvent { event: EventName::AgentDone, .. }
        ));
        assert!(parser.finish().is_none());
    }

    #[test]
    fn test_unclosed_event_waits_for_more_bytes() {
        let event = StreamFrame::event(EventName::CriticReport, Some("verdict".into())).encode();
        let mut parser = FrameParser::new();
        // Everything but the last byte: opening delimiter present, closing
        // delimiter incomplete.
        assert!(parser.push(&event[..event.len() - 1]).is_empty());
        let frames = parser.push(&event[event.len() - 1..]);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_malformed_event_is_discarded_stream_continues() {
        let delim = FRAME_DELIM.as_bytes();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(delim);
        bytes.extend_from_slice(b"{broken json");
        bytes.extend_from_slice(delim);
        bytes.extend_from_slice(b"still flowing");

        let mut parser = FrameParser::new();
        let mut frames = parser.push(&bytes);
        frames.extend(parser.finish());
        assert_eq!(
            normalize(frames),
            vec![StreamFrame::text("still flowing".as_bytes().to_vec())]
        );
    }

    #[test]
    fn test_unknown_event_name_is_discarded() {
        let delim = FRAME_DELIM.as_bytes();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(delim);
        bytes.extend_from_slice(br#"{"event":"NOT_A_THING"}"#);
        bytes.extend_from_slice(delim);

        let mut parser = FrameParser::new();
        assert!(parser.push(&bytes).is_empty());
        assert!(parser.finish().is_none());
    }

    #[test]
    fn test_finish_flushes_held_tail() {
        let mut parser = FrameParser::new();
        // A lone record separator could be the start of a delimiter, so push
        // holds it back...
        let frames = parser.push("text\u{1e}".as_bytes());
        assert_eq!(frames, vec![StreamFrame::text("text".as_bytes().to_vec())]);
        // ...and finish releases it once the stream ends.
        assert_eq!(
            parser.finish(),
            Some(StreamFrame::text("\u{1e}".as_bytes().to_vec()))
        );
    }
}
