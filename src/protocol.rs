//! TCP protocol for squat-client ↔ squat-server communication.
//!
//! Length-delimited frames carrying JSON payloads. The field names
//! `squat_state`, `squat_reps` and `knee_angle` (and the lowercase state
//! strings) are the interoperability contract with any client driving
//! the server, so they must not change.

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::rep::SquatState;

/// Sentinel for "no knee angle measured this frame" on the wire.
pub const NO_ANGLE: f32 = -1.0;

/// Client → server: one JPEG frame plus the client's current session.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProcessRequest {
    /// JPEG-encoded frame, base64 in the JSON
    #[serde(with = "b64")]
    pub frame: Vec<u8>,
    pub squat_state: SquatState,
    pub squat_reps: u32,
}

/// Server → client: the annotated frame plus the advanced session.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProcessResponse {
    /// Annotated JPEG frame, base64 in the JSON
    #[serde(with = "b64")]
    pub frame: Vec<u8>,
    pub squat_state: SquatState,
    pub squat_reps: u32,
    /// Knee angle in degrees, [`NO_ANGLE`] when not measured.
    pub knee_angle: f32,
}

impl ProcessResponse {
    /// The measured angle, with the wire sentinel mapped back to None.
    pub fn measured_angle(&self) -> Option<f32> {
        if self.knee_angle < 0.0 {
            None
        } else {
            Some(self.knee_angle)
        }
    }
}

mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

// --- TCP codec helpers ---

pub type MessageStream = Framed<TcpStream, LengthDelimitedCodec>;
pub type MessageSink = SplitSink<MessageStream, Bytes>;
pub type MessageSource = SplitStream<MessageStream>;

/// Create a framed message stream with length-delimited framing.
pub fn message_stream(stream: TcpStream) -> MessageStream {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(16 * 1024 * 1024) // 16MB
        .new_codec();
    Framed::new(stream, codec)
}

/// Split a stream into independent send/receive halves, so requests can
/// stay in flight while responses are awaited.
pub fn split(stream: MessageStream) -> (MessageSink, MessageSource) {
    stream.split()
}

/// Send a serializable message (JSON + length prefix).
pub async fn send_message<T: Serialize>(
    stream: &mut MessageStream,
    msg: &T,
) -> anyhow::Result<()> {
    let data = serde_json::to_vec(msg)?;
    stream.send(Bytes::from(data)).await?;
    Ok(())
}

/// Receive and deserialize a message.
pub async fn recv_message<T: DeserializeOwned>(
    stream: &mut MessageStream,
) -> anyhow::Result<T> {
    match stream.next().await {
        Some(Ok(bytes)) => Ok(serde_json::from_slice(&bytes)?),
        Some(Err(e)) => Err(e.into()),
        None => Err(anyhow::anyhow!("connection closed")),
    }
}

/// Send on a split sink.
pub async fn send_to<T: Serialize>(sink: &mut MessageSink, msg: &T) -> anyhow::Result<()> {
    let data = serde_json::to_vec(msg)?;
    sink.send(Bytes::from(data)).await?;
    Ok(())
}

/// Receive from a split source.
pub async fn recv_from<T: DeserializeOwned>(source: &mut MessageSource) -> anyhow::Result<T> {
    match source.next().await {
        Some(Ok(bytes)) => Ok(serde_json::from_slice(&bytes)?),
        Some(Err(e)) => Err(e.into()),
        None => Err(anyhow::anyhow!("connection closed")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_fields() {
        let req = ProcessRequest {
            frame: vec![1, 2, 3],
            squat_state: SquatState::Descending,
            squat_reps: 4,
        };
        let json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&req).unwrap()).unwrap();
        assert_eq!(json["squat_state"], "descending");
        assert_eq!(json["squat_reps"], 4);
        assert!(json["frame"].is_string());
    }

    #[test]
    fn test_response_wire_fields() {
        let resp = ProcessResponse {
            frame: Vec::new(),
            squat_state: SquatState::Up,
            squat_reps: 7,
            knee_angle: 171.5,
        };
        let json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&resp).unwrap()).unwrap();
        assert_eq!(json["squat_state"], "up");
        assert_eq!(json["squat_reps"], 7);
        assert_eq!(json["knee_angle"], 171.5);
    }

    #[test]
    fn test_frame_roundtrip() {
        let req = ProcessRequest {
            frame: vec![0xff, 0xd8, 0xff, 0xe0],
            squat_state: SquatState::Start,
            squat_reps: 0,
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: ProcessRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.frame, req.frame);
        assert_eq!(back.squat_state, SquatState::Start);
    }

    #[test]
    fn test_no_angle_sentinel() {
        let resp = ProcessResponse {
            frame: Vec::new(),
            squat_state: SquatState::Start,
            squat_reps: 0,
            knee_angle: NO_ANGLE,
        };
        assert_eq!(resp.measured_angle(), None);

        let resp = ProcessResponse { knee_angle: 120.0, ..resp };
        assert_eq!(resp.measured_angle(), Some(120.0));
    }
}
