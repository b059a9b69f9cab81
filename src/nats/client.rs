use anyhow::{bail, Context, Result};
use async_nats::{Client, Subscriber};
use base64::Engine;
use futures::future::FutureExt;
use futures::stream::StreamExt;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::messages::{ClosedMessage, DataMessage, JoinMessage, JoinReply, LeaveMessage};
use crate::config::TransportConfig;
use crate::session::JoinRequest;
use crate::transport::{
    AudioData, JoinRejected, StreamMetadata, StreamTransport, TranscriptData, TransportEvent,
    TransportFactory,
};

/// Stream transport talking to the media gateway over NATS
pub struct NatsTransport {
    client: Client,
    stream_id: String,
    subject_prefix: String,
    join_timeout: Duration,
    meeting_uuid: Option<String>,
    subscriber: Option<Subscriber>,
}

impl NatsTransport {
    pub fn new(client: Client, stream_id: String, config: &TransportConfig) -> Self {
        Self {
            client,
            stream_id,
            subject_prefix: config.subject_prefix.clone(),
            join_timeout: config.join_timeout(),
            meeting_uuid: None,
            subscriber: None,
        }
    }

    fn data_prefix(&self) -> String {
        format!("{}.{}.", self.subject_prefix, self.stream_id)
    }
}

#[async_trait::async_trait]
impl StreamTransport for NatsTransport {
    async fn join(&mut self, request: &JoinRequest) -> Result<()> {
        // Subscribe first so nothing published right after the reply is missed
        let data_subject = format!("{}>", self.data_prefix());
        let subscriber = self
            .client
            .subscribe(data_subject.clone())
            .await
            .context("Failed to subscribe to stream data")?;

        debug!("Subscribed to {}", data_subject);

        let message = JoinMessage {
            request_id: uuid::Uuid::new_v4().to_string(),
            meeting_uuid: request.meeting_uuid.clone(),
            rtms_stream_id: request.stream_id.clone(),
            server_urls: request.server_urls.clone(),
            signature: request.signature.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_vec(&message)?;
        let subject = format!("{}.join", self.subject_prefix);

        let reply = tokio::time::timeout(
            self.join_timeout,
            self.client.request(subject.clone(), payload.into()),
        )
        .await
        .with_context(|| format!("Timed out waiting for join reply on {}", subject))?
        .context("Join request failed")?;

        check_join_reply(&reply.payload)?;

        info!(
            "Gateway accepted join for stream {} (request {})",
            self.stream_id, message.request_id
        );

        self.meeting_uuid = Some(request.meeting_uuid.clone());
        self.subscriber = Some(subscriber);

        Ok(())
    }

    async fn poll(&mut self) -> Result<Vec<TransportEvent>> {
        let prefix = self.data_prefix();
        let Some(subscriber) = self.subscriber.as_mut() else {
            bail!("Stream {} is not joined", self.stream_id);
        };

        let mut events = Vec::new();
        let mut ended = false;

        // Take only what is already buffered; never wait for more
        while let Some(next) = subscriber.next().now_or_never() {
            let Some(message) = next else {
                ended = true;
                break;
            };

            let subject: &str = &message.subject;
            let Some(kind) = subject.strip_prefix(prefix.as_str()) else {
                debug!("Ignoring message on unexpected subject {}", subject);
                continue;
            };

            match decode_event(kind, &message.payload) {
                Ok(Some(event)) => {
                    let closed = matches!(event, TransportEvent::Closed { .. });
                    events.push(event);
                    if closed {
                        break;
                    }
                }
                Ok(None) => debug!("Ignoring message on {}", subject),
                Err(e) => warn!("Dropping malformed message on {}: {:#}", subject, e),
            }
        }

        if ended {
            self.subscriber = None;
            events.push(TransportEvent::Closed {
                reason: "subscription ended".to_string(),
            });
        }

        Ok(events)
    }

    async fn leave(&mut self) -> Result<()> {
        let message = LeaveMessage {
            meeting_uuid: self.meeting_uuid.clone().unwrap_or_default(),
            rtms_stream_id: self.stream_id.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_vec(&message)?;
        let subject = format!("{}.leave", self.subject_prefix);

        let published = self
            .client
            .publish(subject, payload.into())
            .await
            .context("Failed to publish leave");

        if let Some(mut subscriber) = self.subscriber.take() {
            subscriber
                .unsubscribe()
                .await
                .context("Failed to unsubscribe from stream data")?;
        }

        published
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Accept or refuse a join based on the gateway's reply payload
pub(crate) fn check_join_reply(payload: &[u8]) -> Result<()> {
    let reply: JoinReply = serde_json::from_slice(payload).context("Malformed join reply")?;
    if !reply.accepted {
        return Err(JoinRejected {
            reason: reply.reason.unwrap_or_else(|| "no reason given".to_string()),
        }
        .into());
    }
    Ok(())
}

/// Decode a message received on `<prefix>.<stream_id>.<kind>`
pub(crate) fn decode_event(kind: &str, payload: &[u8]) -> Result<Option<TransportEvent>> {
    let event = match kind {
        "transcript" => {
            let (data, timestamp, metadata) = decode_data(payload)?;
            TransportEvent::Transcript(TranscriptData {
                data,
                timestamp,
                metadata,
            })
        }
        "audio" => {
            let (data, timestamp, metadata) = decode_data(payload)?;
            TransportEvent::Audio(AudioData {
                data,
                timestamp,
                metadata,
            })
        }
        "closed" => {
            let closed: ClosedMessage = if payload.is_empty() {
                ClosedMessage::default()
            } else {
                serde_json::from_slice(payload)?
            };
            TransportEvent::Closed {
                reason: closed
                    .reason
                    .unwrap_or_else(|| "closed by gateway".to_string()),
            }
        }
        _ => return Ok(None),
    };

    Ok(Some(event))
}

fn decode_data(payload: &[u8]) -> Result<(Vec<u8>, u64, StreamMetadata)> {
    let message: DataMessage = serde_json::from_slice(payload).context("Invalid data message")?;
    let data = base64::engine::general_purpose::STANDARD
        .decode(&message.data)
        .context("Invalid base64 data")?;

    Ok((
        data,
        message.timestamp,
        StreamMetadata {
            user_name: message.user_name,
            user_id: message.user_id,
        },
    ))
}

/// Creates NATS transports sharing one lazily connected client
///
/// The connection is made on first use, i.e. on the poll loop thread, so the
/// client's background task lives on the poll loop runtime.
pub struct NatsTransportFactory {
    config: TransportConfig,
    client: OnceCell<Client>,
}

impl NatsTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<Client> {
        let client = self
            .client
            .get_or_try_init(|| async {
                info!("Connecting to NATS at {}", self.config.nats_url);
                let client = async_nats::connect(self.config.nats_url.as_str())
                    .await
                    .context("Failed to connect to NATS")?;
                info!("Connected to NATS successfully");
                Ok::<_, anyhow::Error>(client)
            })
            .await?;

        Ok(client.clone())
    }
}

#[async_trait::async_trait]
impl TransportFactory for NatsTransportFactory {
    async fn create(&self, stream_id: &str) -> Result<Box<dyn StreamTransport>> {
        let client = self.client().await?;
        Ok(Box::new(NatsTransport::new(
            client,
            stream_id.to_string(),
            &self.config,
        )))
    }

    async fn flush(&self) -> Result<()> {
        // Never connected, nothing buffered
        let Some(client) = self.client.get() else {
            return Ok(());
        };
        client
            .flush()
            .await
            .context("Failed to flush NATS connection")
    }
}
