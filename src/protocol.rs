//! TCP protocol between the capture client and the rep server.
//!
//! Every message is one bincode payload inside a length-delimited frame.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::exercise::{Analysis, ExerciseKind, Feedback, RepCounters};
use crate::pose::Landmark;

pub const MESSAGE_HANDLING_FAILED: &str = "Message handling failed";
pub const INVALID_RESET_TARGET: &str = "Invalid workout type for reset";

// --- Message types ---

/// Client → server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Landmarks estimated client-side. `None` means no body was detected.
    Landmarks {
        exercise: String,
        timestamp_us: u64,
        landmarks: Option<Vec<Landmark>>,
    },
    /// Encoded image for the server-side pose estimator
    Image {
        exercise: String,
        timestamp_us: u64,
        jpeg_data: Vec<u8>,
    },
    Reset { exercise: String },
}

/// Server → client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Frame(FrameResponse),
    ResetAck { ok: bool, error: Option<String> },
    Error { message: String },
}

/// Per-frame result for one exercise
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FrameResponse {
    pub exercise: ExerciseKind,
    pub total_reps: u32,
    pub correct_reps: u32,
    pub incorrect_reps: u32,
    pub feedback: Option<Feedback>,
    /// Seconds of correct hold, isometric exercises only
    pub correct_duration: Option<f64>,
    pub error: Option<String>,
}

impl FrameResponse {
    pub fn analysis(exercise: ExerciseKind, counters: RepCounters, analysis: Analysis) -> Self {
        Self {
            exercise,
            total_reps: counters.total,
            correct_reps: counters.correct,
            incorrect_reps: counters.incorrect,
            feedback: analysis.feedback,
            correct_duration: analysis.correct_duration,
            error: None,
        }
    }

    pub fn error(exercise: ExerciseKind, counters: RepCounters, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::analysis(exercise, counters, Analysis::none())
        }
    }
}

// --- TCP codec helpers ---

pub type MessageStream<S = TcpStream> = Framed<S, LengthDelimitedCodec>;

/// Create a framed message stream with length-delimited framing.
pub fn message_stream<S>(stream: S, max_frame_length: usize) -> MessageStream<S>
where
    S: AsyncRead + AsyncWrite,
{
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(max_frame_length)
        .new_codec();
    Framed::new(stream, codec)
}

pub fn encode<T: Serialize>(msg: &T) -> anyhow::Result<Bytes> {
    Ok(Bytes::from(bincode::serialize(msg)?))
}

/// Send a serializable message (bincode + length prefix).
pub async fn send_message<S, T>(stream: &mut MessageStream<S>, msg: &T) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    T: Serialize,
{
    stream.send(encode(msg)?).await?;
    Ok(())
}

/// Receive and deserialize a message.
pub async fn recv_message<S, T>(stream: &mut MessageStream<S>) -> anyhow::Result<T>
where
    S: AsyncRead + AsyncWrite + Unpin,
    T: DeserializeOwned,
{
    match stream.next().await {
        Some(Ok(bytes)) => Ok(bincode::deserialize(&bytes)?),
        Some(Err(e)) => Err(e.into()),
        None => Err(anyhow::anyhow!("connection closed")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_bincode() {
        let msg = ClientMessage::Landmarks {
            exercise: "lunge".to_string(),
            timestamp_us: 42,
            landmarks: Some(vec![Landmark::new(0.1, 0.2, -0.3, 0.9); 33]),
        };
        let bytes = encode(&msg).unwrap();
        let back: ClientMessage = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_error_response_keeps_counters() {
        let counters = RepCounters { total: 3, correct: 2, incorrect: 1 };
        let r = FrameResponse::error(ExerciseKind::Curl, counters, "boom");
        assert_eq!(r.total_reps, 3);
        assert_eq!(r.incorrect_reps, 1);
        assert_eq!(r.error.as_deref(), Some("boom"));
        assert!(r.feedback.is_none());
    }

    #[test]
    fn test_garbage_does_not_decode() {
        let garbage = [0xffu8, 0xff, 0xff, 0xff, 0x01];
        assert!(bincode::deserialize::<ClientMessage>(&garbage).is_err());
    }

    #[tokio::test]
    async fn test_framed_round_trip() {
        let (a, b) = tokio::io::duplex(1024);
        let mut tx = message_stream(a, 1024);
        let mut rx = message_stream(b, 1024);

        let msg = ServerMessage::ResetAck { ok: true, error: None };
        send_message(&mut tx, &msg).await.unwrap();
        let got: ServerMessage = recv_message(&mut rx).await.unwrap();
        assert_eq!(got, msg);

        drop(tx);
        assert!(recv_message::<_, ServerMessage>(&mut rx).await.is_err());
    }
}
