//! Engine.IO v4 / Socket.IO v5 text packet codec (polling transport only).

use serde::Deserialize;
use serde_json::Value;

/// Separates packets batched into one polling payload.
pub(crate) const RECORD_SEPARATOR: char = '\u{1e}';

const DEFAULT_NAMESPACE: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Handshake {
    pub(crate) sid: String,
    pub(crate) ping_interval: u64,
    pub(crate) ping_timeout: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EnginePacket {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Upgrade,
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SocketPacket {
    Connect {
        namespace: String,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        name: String,
        payload: Value,
    },
    ConnectError {
        namespace: String,
        message: String,
    },
    /// Acks and binary packets, which the log stream never uses
    Unsupported,
}

/// Split a polling payload into packets. Malformed packets are skipped.
pub(crate) fn decode_payload(body: &str) -> Vec<EnginePacket> {
    body.split(RECORD_SEPARATOR)
        .filter(|raw| !raw.is_empty())
        .filter_map(decode_packet)
        .collect()
}

pub(crate) fn decode_packet(raw: &str) -> Option<EnginePacket> {
    let mut chars = raw.chars();
    let kind = chars.next()?;
    let rest = chars.as_str();

    match kind {
        '0' => serde_json::from_str(rest).ok().map(EnginePacket::Open),
        '1' => Some(EnginePacket::Close),
        '2' => Some(EnginePacket::Ping),
        '3' => Some(EnginePacket::Pong),
        '4' => decode_socket_packet(rest).map(EnginePacket::Message),
        '5' => Some(EnginePacket::Upgrade),
        '6' => Some(EnginePacket::Noop),
        _ => None,
    }
}

/// Decode `<type>[<nsp>,][<ack id>][<json>]`.
pub(crate) fn decode_socket_packet(raw: &str) -> Option<SocketPacket> {
    let mut chars = raw.chars();
    let kind = chars.next()?;
    let mut rest = chars.as_str();

    let namespace = if rest.starts_with('/') {
        let (namespace, remainder) = rest.split_once(',').unwrap_or((rest, ""));
        rest = remainder;
        namespace.to_string()
    } else {
        String::from(DEFAULT_NAMESPACE)
    };

    // Ack id, ignored
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());

    match kind {
        '0' => Some(SocketPacket::Connect { namespace }),
        '1' => Some(SocketPacket::Disconnect { namespace }),
        '2' => {
            let Value::Array(mut items) = serde_json::from_str::<Value>(rest).ok()? else {
                return None;
            };
            if items.is_empty() {
                return None;
            }
            let name = match items.remove(0) {
                Value::String(name) => name,
                _ => return None,
            };
            let payload = if items.is_empty() {
                Value::Null
            } else {
                items.remove(0)
            };
            Some(SocketPacket::Event {
                namespace,
                name,
                payload,
            })
        }
        '4' => {
            let message = match serde_json::from_str::<Value>(rest) {
                Ok(Value::Object(fields)) => fields
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("connect error")
                    .to_string(),
                Ok(Value::String(message)) => message,
                _ => String::from("connect error"),
            };
            Some(SocketPacket::ConnectError { namespace, message })
        }
        '3' | '5' | '6' => Some(SocketPacket::Unsupported),
        _ => None,
    }
}

/// Socket.IO CONNECT for `namespace`, wrapped in an Engine.IO message.
pub(crate) fn encode_connect(namespace: &str) -> String {
    if namespace == DEFAULT_NAMESPACE {
        String::from("40")
    } else {
        format!("40{namespace},")
    }
}

/// Socket.IO DISCONNECT for `namespace`, wrapped in an Engine.IO message.
pub(crate) fn encode_disconnect(namespace: &str) -> String {
    if namespace == DEFAULT_NAMESPACE {
        String::from("41")
    } else {
        format!("41{namespace},")
    }
}

pub(crate) const PONG: &str = "3";
