use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::agents::AgentId;

/// Frame delimiter: two ASCII record-separator bytes. Control characters are
/// always escaped by the JSON encoder, so no event payload can contain the
/// delimiter unescaped and frame boundaries stay unambiguous.
pub const FRAME_DELIM: &str = "\u{1e}\u{1e}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventName {
    AgentStart,
    AgentDone,
    AgentLog,
    CriticReport,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::AgentStart => "AGENT_START",
            EventName::AgentDone => "AGENT_DONE",
            EventName::AgentLog => "AGENT_LOG",
            EventName::CriticReport => "CRITIC_REPORT",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "AGENT_START" => Some(EventName::AgentStart),
            "AGENT_DONE" => Some(EventName::AgentDone),
            "AGENT_LOG" => Some(EventName::AgentLog),
            "CRITIC_REPORT" => Some(EventName::CriticReport),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of the multiplexed output stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    TextDelta(Bytes),
    ControlEvent {
        event: EventName,
        meta: Option<String>,
    },
}

/// Wire shape of a control event payload.
#[derive(Serialize, Deserialize)]
pub(crate) struct EventPayload {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
}

impl StreamFrame {
    pub fn text(delta: impl Into<Bytes>) -> Self {
        StreamFrame::TextDelta(delta.into())
    }

    pub fn event(event: EventName, meta: Option<String>) -> Self {
        StreamFrame::ControlEvent { event, meta }
    }

    /// Serialize the frame for the wire.
    pub fn encode(&self) -> Bytes {
        match self {
            StreamFrame::TextDelta(bytes) => bytes.clone(),
            StreamFrame::ControlEvent { event, meta } => {
                let payload = EventPayload {
                    event: event.as_str().to_string(),
                    meta: meta.clone(),
                };
                // Serializing a struct of strings cannot fail.
                let json = serde_json::to_string(&payload).unwrap_or_default();
                Bytes::from(format!("{FRAME_DELIM}{json}{FRAME_DELIM}"))
            }
        }
    }
}

/// Producer handle for the turn's output channel. Frames are written in the
/// order the pipeline generates them; a closed receiver (client gone) makes
/// every send a silent no-op and the turn's results are discarded. The
/// channel is unbounded so progress notices (including the retry hook, which
/// runs inside a synchronous callback) never block a provider call.
#[derive(Clone)]
pub struct FrameSink {
    tx: mpsc::UnboundedSender<StreamFrame>,
}

impl FrameSink {
    pub fn new(tx: mpsc::UnboundedSender<StreamFrame>) -> Self {
        Self { tx }
    }

    /// A connected sink/receiver pair for one turn.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StreamFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn send(&self, frame: StreamFrame) {
        let _ = self.tx.send(frame);
    }

    pub fn text_delta(&self, delta: &str) {
        if !delta.is_empty() {
            self.send(StreamFrame::text(delta.as_bytes().to_vec()));
        }
    }

    pub fn agent_start(&self, agent: AgentId) {
        self.send(StreamFrame::event(
            EventName::AgentStart,
            Some(agent.as_str().to_string()),
        ));
    }

    pub fn agent_done(&self, agent: AgentId) {
        self.send(StreamFrame::event(
            EventName::AgentDone,
            Some(agent.as_str().to_string()),
        ));
    }

    pub fn log(&self, message: impl Into<String>) {
        self.send(StreamFrame::event(EventName::AgentLog, Some(message.into())));
    }

    pub fn critic_report(&self, report: &str) {
        self.send(StreamFrame::event(
            EventName::CriticReport,
            Some(report.to_string()),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_delta_encodes_as_literal_bytes() {
        let frame = StreamFrame::text("hello".as_bytes().to_vec());
        assert_eq!(frame.encode(), Bytes::from("hello"));
    }

    #[test]
    fn test_control_event_is_delimited_json() {
        let frame = StreamFrame::event(EventName::AgentStart, Some("cultural_analyst".to_string()));
        let encoded = frame.encode();
        let encoded = std::str::from_utf8(&encoded).unwrap();
        assert!(encoded.starts_with(FRAME_DELIM));
        assert!(encoded.ends_with(FRAME_DELIM));
        let json = &encoded[FRAME_DELIM.len()..encoded.len() - FRAME_DELIM.len()];
        let payload: EventPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.event, "AGENT_START");
        assert_eq!(payload.meta.as_deref(), Some("cultural_analyst"));
    }

    #[test]
    fn test_meta_containing_delimiter_is_escaped() {
        let hostile = format!("before{FRAME_DELIM}after");
        let frame = StreamFrame::event(EventName::AgentLog, Some(hostile.clone()));
        let encoded = frame.encode();
        let encoded = std::str::from_utf8(&encoded).unwrap();

        // The inner JSON span must not contain a raw delimiter.
        let inner = &encoded[FRAME_DELIM.len()..encoded.len() - FRAME_DELIM.len()];
        assert!(!inner.contains(FRAME_DELIM));

        // And it round-trips to the original meta.
        let payload: EventPayload = serde_json::from_str(inner).unwrap();
        assert_eq!(payload.meta.as_deref(), Some(hostile.as_str()));
    }

    #[test]
    fn test_event_name_round_trip() {
        for event in [
            EventName::AgentStart,
            EventName::AgentDone,
            EventName::AgentLog,
            EventName::CriticReport,
        ] {
            assert_eq!(EventName::parse(event.as_str()), Some(event));
        }
        assert_eq!(EventName::parse("SOMETHING_ELSE"), None);
    }
}
