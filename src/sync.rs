/// Sync protocol message types shared between the room service and clients.
///
/// Protocol:
///   Client sends ClientHello { client_id, room_id, vv } on connect.
///   Server replies ServerHello { peer_id, vv, updates } with the root
///   document state, then raises SyncComplete once all pre-existing state
///   has been delivered. Bidirectional ClientUpdate / ServerUpdate exchange
///   follows, each message routed to one document of the family (the root
///   or a list's sub-document). Awareness records ride the same connection
///   but bypass the CRDT documents entirely.
///
/// The `vv` and `updates` fields are base64-encoded binary (CRDT version
/// vectors and deltas).
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::presence::AwarenessRecord;
use crate::store::BoardError;

/// Which document of the family an update belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "doc", rename_all = "camelCase")]
pub enum DocTarget {
    /// The root board document (tree structure + board fragments).
    Root,
    /// One list's sub-document (list + card fragments).
    #[serde(rename_all = "camelCase")]
    List { list_id: String },
}

/// Messages sent from client to server.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    ClientHello {
        client_id: u64,
        room_id: String,
        vv: String,
    },
    ClientUpdate {
        target: DocTarget,
        updates: String,
    },
    AwarenessUpdate {
        record: AwarenessRecord,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    ServerHello {
        peer_id: u64,
        vv: String,
        updates: String,
    },
    ServerUpdate {
        target: DocTarget,
        updates: String,
    },
    /// One-time signal: all pre-existing remote state has been delivered.
    SyncComplete,
    AwarenessBroadcast {
        record: AwarenessRecord,
    },
    AwarenessGone {
        client_id: u64,
    },
    ServerError {
        message: String,
    },
}

fn b64() -> base64::engine::general_purpose::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// Encode a binary update payload for the wire.
pub fn encode_payload(bytes: &[u8]) -> String {
    b64().encode(bytes)
}

/// Decode a wire payload back into update bytes.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, BoardError> {
    b64()
        .decode(payload)
        .map_err(|e| BoardError::InvalidUpdate(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trip() {
        let bytes = vec![0u8, 1, 2, 250, 255];
        let encoded = encode_payload(&bytes);
        assert_eq!(decode_payload(&encoded).unwrap(), bytes);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_payload("not base64 !!!").is_err());
    }

    #[test]
    fn test_client_update_wire_shape() {
        let msg = ClientMessage::ClientUpdate {
            target: DocTarget::List {
                list_id: "list-1".into(),
            },
            updates: encode_payload(b"delta"),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "ClientUpdate");
        assert_eq!(json["target"]["doc"], "list");
        assert_eq!(json["target"]["listId"], "list-1");
    }

    #[test]
    fn test_list_target_round_trip() {
        let json = r#"{"doc":"list","listId":"list-9"}"#;
        let target: DocTarget = serde_json::from_str(json).unwrap();
        assert_eq!(
            target,
            DocTarget::List {
                list_id: "list-9".into()
            }
        );
        assert_eq!(serde_json::to_string(&target).unwrap(), json);
    }

    #[test]
    fn test_server_message_round_trip() {
        let msg = ServerMessage::ServerUpdate {
            target: DocTarget::Root,
            updates: encode_payload(b"delta"),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: ServerMessage = serde_json::from_str(&json).unwrap();
        match back {
            ServerMessage::ServerUpdate { target, updates } => {
                assert_eq!(target, DocTarget::Root);
                assert_eq!(decode_payload(&updates).unwrap(), b"delta");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_awareness_record_rides_camel_case() {
        let msg = ClientMessage::AwarenessUpdate {
            record: AwarenessRecord {
                client_id: 42,
                name: "Alice".into(),
                color: "#e06c75".into(),
                editor_id: "title_card-1".into(),
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "AwarenessUpdate");
        assert_eq!(json["record"]["clientId"], 42);
        assert_eq!(json["record"]["editorId"], "title_card-1");
    }

    #[test]
    fn test_client_hello_round_trip() {
        let msg = ClientMessage::ClientHello {
            client_id: 7,
            room_id: "my-kanban-board".into(),
            vv: String::new(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        match back {
            ClientMessage::ClientHello { client_id, room_id, .. } => {
                assert_eq!(client_id, 7);
                assert_eq!(room_id, "my-kanban-board");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_sync_complete_serializes_flat() {
        let json = serde_json::to_value(&ServerMessage::SyncComplete).unwrap();
        assert_eq!(json["type"], "SyncComplete");
    }
}
