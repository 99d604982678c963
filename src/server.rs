//! Rep server: one task and one [`Session`] per TCP connection.
//!
//! Messages on a connection are handled strictly in arrival order: receive,
//! handle, reply, then read the next one. Nothing is shared between
//! connections except the read-only config and pose estimator.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::exercise::ExerciseKind;
use crate::pose::{Pose, PoseEstimator, PoseFrame};
use crate::protocol::{
    self, ClientMessage, MessageStream, ServerMessage, INVALID_RESET_TARGET,
    MESSAGE_HANDLING_FAILED,
};
use crate::session::Session;

pub const FRAME_PROCESSING_FAILED: &str = "Frame processing failed";
pub const ESTIMATOR_UNAVAILABLE: &str = "Pose estimation unavailable";

pub struct Server {
    config: Arc<Config>,
    estimator: Option<Arc<dyn PoseEstimator>>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            estimator: None,
        }
    }

    /// Serve image messages with this estimator. Built once, shared by all connections.
    pub fn with_estimator(mut self, estimator: Arc<dyn PoseEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Fresh per-connection handler
    pub fn connection(&self) -> Connection {
        Connection {
            session: Session::new(&self.config.analyzers),
            estimator: self.estimator.clone(),
        }
    }

    /// Accept forever. A failing connection is logged and dropped; it never
    /// stops the accept loop.
    pub async fn run(self, listener: TcpListener) -> Result<()> {
        let max_frame_length = self.config.server.max_frame_length;
        loop {
            let (stream, addr) = listener.accept().await?;
            if let Err(e) = stream.set_nodelay(true) {
                warn!(%addr, error = %e, "set_nodelay failed");
            }
            info!(%addr, "client connected");

            let connection = self.connection();
            tokio::spawn(async move {
                let framed = protocol::message_stream(stream, max_frame_length);
                serve_client(connection, framed, addr).await;
            });
        }
    }
}

async fn serve_client<S>(connection: Connection, framed: MessageStream<S>, addr: SocketAddr)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match connection.run(framed).await {
        Ok(()) => info!(%addr, "client disconnected"),
        Err(e) => warn!(%addr, error = %format!("{e:#}"), "connection closed with error"),
    }
}

/// State for one client: its own session plus the shared estimator.
pub struct Connection {
    session: Session,
    estimator: Option<Arc<dyn PoseEstimator>>,
}

impl Connection {
    /// Read, handle and reply until the peer closes. The session is dropped
    /// on return.
    pub async fn run<S>(mut self, mut stream: MessageStream<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        while let Some(bytes) = stream.next().await {
            let bytes = bytes?;
            let reply = match bincode::deserialize::<ClientMessage>(&bytes) {
                Ok(msg) => self.handle(msg).await,
                Err(e) => {
                    warn!(error = %e, len = bytes.len(), "undecodable message");
                    error_reply(MESSAGE_HANDLING_FAILED)
                }
            };
            protocol::send_message(&mut stream, &reply).await?;
        }
        Ok(())
    }

    pub async fn handle(&mut self, msg: ClientMessage) -> ServerMessage {
        match msg {
            ClientMessage::Reset { exercise } => match self.session.reset(&exercise) {
                Ok(()) => ServerMessage::ResetAck { ok: true, error: None },
                Err(e) => {
                    debug!(error = %e, "reset rejected");
                    ServerMessage::ResetAck {
                        ok: false,
                        error: Some(INVALID_RESET_TARGET.to_string()),
                    }
                }
            },
            ClientMessage::Landmarks { exercise, timestamp_us, landmarks } => {
                let frame = match landmarks.as_deref().map(Pose::from_slice).transpose() {
                    Ok(pose) => pose.map(|p| PoseFrame::new(timestamp_us, p)),
                    Err(e) => {
                        warn!(error = %e, "malformed landmark payload");
                        return error_reply(MESSAGE_HANDLING_FAILED);
                    }
                };
                self.process(&exercise, frame.as_ref())
            }
            ClientMessage::Image { exercise, timestamp_us, jpeg_data } => {
                // Skip estimation for frames that cannot be routed
                if let Err(e) = exercise.parse::<ExerciseKind>() {
                    return error_reply(e.to_string());
                }
                match estimate(self.estimator.clone(), jpeg_data).await {
                    Ok(pose) => {
                        let frame = pose.map(|p| PoseFrame::new(timestamp_us, p));
                        self.process(&exercise, frame.as_ref())
                    }
                    Err(reply) => reply,
                }
            }
        }
    }

    fn process(&mut self, exercise: &str, frame: Option<&PoseFrame>) -> ServerMessage {
        match self.session.process(exercise, frame) {
            Ok(response) => ServerMessage::Frame(response),
            Err(e) => error_reply(e.to_string()),
        }
    }
}

/// Run the estimator on the blocking pool. `Err` carries the reply to send.
async fn estimate(
    estimator: Option<Arc<dyn PoseEstimator>>,
    image: Vec<u8>,
) -> Result<Option<Pose>, ServerMessage> {
    let Some(estimator) = estimator else {
        return Err(error_reply(ESTIMATOR_UNAVAILABLE));
    };

    match tokio::task::spawn_blocking(move || estimator.estimate(&image)).await {
        Ok(Ok(pose)) => Ok(pose),
        Ok(Err(e)) => {
            warn!(error = %format!("{e:#}"), "pose estimation failed");
            Err(error_reply(FRAME_PROCESSING_FAILED))
        }
        Err(e) => {
            warn!(error = %e, "pose estimation task failed");
            Err(error_reply(FRAME_PROCESSING_FAILED))
        }
    }
}

fn error_reply(message: impl Into<String>) -> ServerMessage {
    ServerMessage::Error { message: message.into() }
}
