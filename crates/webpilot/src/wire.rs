//! Newline-delimited JSON framing for the TCP introspection binding.
//!
//! Each request is one line `{"seq":N,"request":{"op":...}}`, answered by
//! exactly one line `{"seq":N,"response":{"status":...}}`. Requests on a
//! connection are strictly sequential.

use crate::input::InputEvent;
use crate::query::Query;
use crate::result::{PilotError, PilotResult};
use crate::transport::{NodeId, NodeRef, WatchId};
use crate::value::Value;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

/// Environment variable through which a launched application learns the
/// address its introspection endpoint must listen on
pub const TESTABILITY_ADDR_ENV: &str = "WEBPILOT_TESTABILITY_ADDR";

/// Argument appended to every launched application
pub const TESTABILITY_FLAG: &str = "-testability";

/// Operation sent to the endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WireRequest {
    /// Select nodes under a scope (the application root when `None`)
    Select {
        /// Scope node
        scope: Option<NodeId>,
        /// Filter
        query: Query,
    },
    /// Read a property
    GetProperty {
        /// Node
        id: NodeId,
        /// Property name
        name: String,
    },
    /// Write a property
    SetProperty {
        /// Node
        id: NodeId,
        /// Property name
        name: String,
        /// New value
        value: Value,
    },
    /// Start recording a signal
    WatchSignal {
        /// Node
        id: NodeId,
        /// Signal signature, e.g. `openExternalUrlTriggered(QString)`
        signal: String,
    },
    /// Fetch recorded emissions
    SignalEmissions {
        /// Watch handle
        watch: WatchId,
    },
    /// Ask whether a node still exists
    IsAlive {
        /// Node
        id: NodeId,
    },
    /// Inject input
    Input {
        /// Event
        event: InputEvent,
    },
}

/// Error classes the endpoint reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Scope node or query target missing
    NotFound,
    /// Node destroyed
    Stale,
    /// No such property
    UnknownProperty,
    /// Anything else
    Other,
}

/// Endpoint answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WireResponse {
    /// Selection result
    Nodes {
        /// Matches in discovery order
        nodes: Vec<NodeRef>,
    },
    /// Property value
    Value {
        /// Value
        value: Value,
    },
    /// Liveness answer
    Alive {
        /// Whether the node exists
        alive: bool,
    },
    /// New watch handle
    Watch {
        /// Handle
        watch: WatchId,
    },
    /// Recorded emissions, one argument list per emission
    Emissions {
        /// Argument lists
        emissions: Vec<Vec<Value>>,
    },
    /// Success with no payload
    Ok,
    /// Failure
    Error {
        /// Error class
        code: ErrorCode,
        /// Human-readable message
        message: String,
        /// Node the error concerns
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<NodeId>,
        /// Property the error concerns
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl WireResponse {
    /// Encode a domain error for the wire
    #[must_use]
    pub fn from_error(err: &PilotError) -> Self {
        let (code, id, name) = match err {
            PilotError::NotFound { .. } => (ErrorCode::NotFound, None, None),
            PilotError::StaleNode { id } => (ErrorCode::Stale, Some(*id), None),
            PilotError::UnknownProperty { id, name } => {
                (ErrorCode::UnknownProperty, Some(*id), Some(name.clone()))
            }
            _ => (ErrorCode::Other, None, None),
        };
        Self::Error {
            code,
            message: err.to_string(),
            id,
            name,
        }
    }

    /// Turn an `Error` response back into the matching domain error;
    /// other responses pass through.
    pub fn into_result(self) -> PilotResult<Self> {
        match self {
            Self::Error {
                code,
                message,
                id,
                name,
            } => Err(match (code, id) {
                (ErrorCode::Stale, Some(id)) => PilotError::StaleNode { id },
                (ErrorCode::UnknownProperty, Some(id)) => PilotError::UnknownProperty {
                    id,
                    name: name.unwrap_or_default(),
                },
                (ErrorCode::NotFound, _) => PilotError::NotFound { query: message },
                _ => PilotError::transport(message),
            }),
            other => Ok(other),
        }
    }
}

/// One request line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    /// Sequence number echoed in the response
    pub seq: u64,
    /// Operation
    pub request: WireRequest,
}

/// One response line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFrame {
    /// Sequence number of the request being answered
    pub seq: u64,
    /// Answer
    pub response: WireResponse,
}

/// Write one frame followed by a newline and flush
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, frame: &T) -> PilotResult<()> {
    serde_json::to_writer(&mut *writer, frame)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Read one frame; `Ok(None)` on clean end of stream
pub fn read_frame<R: BufRead, T: DeserializeOwned>(reader: &mut R) -> PilotResult<Option<T>> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if !line.trim().is_empty() {
            return Ok(Some(serde_json::from_str(line.trim_end())?));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_request_line_shape() {
        let frame = RequestFrame {
            seq: 7,
            request: WireRequest::IsAlive { id: 3 },
        };
        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "{\"seq\":7,\"request\":{\"op\":\"is_alive\",\"id\":3}}\n"
        );
    }

    #[test]
    fn test_read_skips_blank_lines_and_stops_at_eof() {
        let mut cursor = Cursor::new(b"\n{\"seq\":1,\"response\":{\"status\":\"ok\"}}\n".to_vec());
        let frame: ResponseFrame = read_frame(&mut cursor).unwrap().unwrap();
        assert_eq!(frame.seq, 1);
        assert_eq!(frame.response, WireResponse::Ok);
        let end: Option<ResponseFrame> = read_frame(&mut cursor).unwrap();
        assert!(end.is_none());
    }

    #[test]
    fn test_malformed_line_is_json_error() {
        let mut cursor = Cursor::new(b"not json\n".to_vec());
        let result: PilotResult<Option<ResponseFrame>> = read_frame(&mut cursor);
        assert!(matches!(result, Err(PilotError::Json(_))));
    }

    mod error_mapping_tests {
        use super::*;

        #[test]
        fn test_stale_round_trips() {
            let wire = WireResponse::from_error(&PilotError::StaleNode { id: 9 });
            assert!(matches!(
                wire.into_result(),
                Err(PilotError::StaleNode { id: 9 })
            ));
        }

        #[test]
        fn test_unknown_property_keeps_name() {
            let wire = WireResponse::from_error(&PilotError::UnknownProperty {
                id: 2,
                name: "bogus".into(),
            });
            match wire.into_result() {
                Err(PilotError::UnknownProperty { id, name }) => {
                    assert_eq!(id, 2);
                    assert_eq!(name, "bogus");
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_other_becomes_transport() {
            let wire = WireResponse::from_error(&PilotError::input("no focus"));
            assert!(matches!(
                wire.into_result(),
                Err(PilotError::Transport { .. })
            ));
        }

        #[test]
        fn test_success_passes_through() {
            let ok = WireResponse::Alive { alive: true };
            assert_eq!(ok.clone().into_result().unwrap(), ok);
        }
    }
}
