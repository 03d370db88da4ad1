//! WebSocket connection loop shared by the producer and reviewer channels.
//!
//! Each connection forwards parsed frames to the coordinator and writes back
//! two streams: its own direct replies and the channel-wide broadcast.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use ghostwriter_core::events::{ProducerEvent, ProducerOutbound, ReviewerEvent, ReviewerOutbound};

use crate::coordinator::{RelayCommand, RelayHandle};

/// One side of the relay as seen by a socket.
pub trait ChannelSide: Send + 'static {
    type Inbound: DeserializeOwned + Send;
    type Outbound: Serialize + Clone + Send + 'static;

    const NAME: &'static str;

    fn subscribe(relay: &RelayHandle) -> broadcast::Receiver<Self::Outbound>;

    fn command(event: Self::Inbound, reply: mpsc::UnboundedSender<Self::Outbound>) -> RelayCommand;

    fn error(message: String) -> Self::Outbound;
}

/// The messaging client bridging the external chat.
pub struct Producer;

impl ChannelSide for Producer {
    type Inbound = ProducerEvent;
    type Outbound = ProducerOutbound;

    const NAME: &'static str = "producer";

    fn subscribe(relay: &RelayHandle) -> broadcast::Receiver<ProducerOutbound> {
        relay.subscribe_producer()
    }

    fn command(event: ProducerEvent, reply: mpsc::UnboundedSender<ProducerOutbound>) -> RelayCommand {
        RelayCommand::Producer { event, reply }
    }

    fn error(message: String) -> ProducerOutbound {
        ProducerOutbound::error(message)
    }
}

/// The operator's review surface.
pub struct Reviewer;

impl ChannelSide for Reviewer {
    type Inbound = ReviewerEvent;
    type Outbound = ReviewerOutbound;

    const NAME: &'static str = "reviewer";

    fn subscribe(relay: &RelayHandle) -> broadcast::Receiver<ReviewerOutbound> {
        relay.subscribe_reviewer()
    }

    fn command(event: ReviewerEvent, reply: mpsc::UnboundedSender<ReviewerOutbound>) -> RelayCommand {
        RelayCommand::Reviewer { event, reply }
    }

    fn error(message: String) -> ReviewerOutbound {
        ReviewerOutbound::error(message)
    }
}

/// Parse one text frame into an inbound event.
pub fn decode_frame<S: ChannelSide>(text: &str) -> Result<S::Inbound, String> {
    serde_json::from_str(text).map_err(|e| format!("Unrecognized event: {}", e))
}

/// Drive one connection until either end closes.
pub async fn serve<S: ChannelSide>(socket: WebSocket, relay: RelayHandle) {
    info!(channel = S::NAME, "Client connected");

    let (mut sink, mut stream) = socket.split();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<S::Outbound>();
    let mut broadcast_rx = S::subscribe(&relay);

    loop {
        let outbound = tokio::select! {
            Some(event) = reply_rx.recv() => Some(event),
            received = broadcast_rx.recv() => match received {
                Ok(event) => Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(channel = S::NAME, skipped, "Client lagging; events dropped");
                    None
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match decode_frame::<S>(text.as_str()) {
                        Ok(event) => {
                            if relay.send(S::command(event, reply_tx.clone())).await.is_err() {
                                warn!(channel = S::NAME, "Coordinator stopped; closing connection");
                                break;
                            }
                            None
                        }
                        Err(message) => {
                            debug!(channel = S::NAME, %message, "Rejected frame");
                            Some(S::error(message))
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => None,
                Some(Err(e)) => {
                    debug!(channel = S::NAME, error = %e, "Socket error");
                    break;
                }
            },
        };

        let Some(event) = outbound else {
            continue;
        };
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                warn!(channel = S::NAME, error = %e, "Failed to encode event");
                continue;
            }
        };
        if sink.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }

    info!(channel = S::NAME, "Client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghostwriter_core::Timestamp;

    #[test]
    fn test_decode_producer_frame() {
        let frame = r#"{"event":"newMessage","data":{"content":"lunch?","timestamp":1000,"user_id":"u1","hashed_sender_name":"alice"}}"#;
        match decode_frame::<Producer>(frame).unwrap() {
            ProducerEvent::NewMessage(message) => {
                assert_eq!(message.timestamp, Some(Timestamp(1000)));
                assert_eq!(message.sender_key.as_deref(), Some("alice"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_decode_reviewer_frame() {
        let frame = r#"{"event":"submitSelectedResponse","data":{"selected_response":"sure","messageTimestamp":1000}}"#;
        match decode_frame::<Reviewer>(frame).unwrap() {
            ReviewerEvent::SelectionSubmitted(selection) => {
                assert_eq!(selection.selected_reply.as_deref(), Some("sure"));
                assert_eq!(selection.original_timestamp, Some(Timestamp(1000)));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let err = decode_frame::<Reviewer>(r#"{"event":"bogus","data":{}}"#).unwrap_err();
        assert!(err.starts_with("Unrecognized event"));
        assert!(decode_frame::<Producer>("not json").is_err());
    }
}
