//! Introspection transport seam.
//!
//! Everything above this module talks to the application under test
//! through two traits:
//!
//! - [`Transport`]: select nodes, read/write properties, record signals
//! - [`InputBackend`]: inject pointer and keyboard events
//!
//! [`TcpTransport`] binds both to the newline-delimited JSON protocol in
//! [`crate::wire`]. The in-memory `mock::MockApp` implements the same
//! traits directly.

use crate::input::InputEvent;
use crate::query::Query;
use crate::result::{PilotError, PilotResult};
use crate::value::Value;
use crate::wire::{read_frame, write_frame, RequestFrame, ResponseFrame, WireRequest, WireResponse};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::BufReader;
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Opaque node identifier, stable for the node's lifetime only
pub type NodeId = u64;

/// Signal watch handle
pub type WatchId = u64;

/// A resolved node: identifier plus type tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// Identifier
    pub id: NodeId,
    /// Type tag
    pub type_name: String,
}

/// Object-tree access
pub trait Transport: Send + Sync + fmt::Debug {
    /// Nodes matching `query` below `scope` (whole tree when `None`), in
    /// discovery order. A missing scope node is `StaleNode`.
    fn select(&self, scope: Option<NodeId>, query: &Query) -> PilotResult<Vec<NodeRef>>;

    /// Current value of a property
    fn get_property(&self, id: NodeId, name: &str) -> PilotResult<Value>;

    /// Write a property
    fn set_property(&self, id: NodeId, name: &str, value: Value) -> PilotResult<()>;

    /// Start recording emissions of `signal` on a node
    fn watch_signal(&self, id: NodeId, signal: &str) -> PilotResult<WatchId>;

    /// Emissions recorded since the watch started
    fn signal_emissions(&self, watch: WatchId) -> PilotResult<Vec<Vec<Value>>>;

    /// Whether the node still exists
    fn is_alive(&self, id: NodeId) -> PilotResult<bool>;
}

/// Input injection
pub trait InputBackend: Send + Sync + fmt::Debug {
    /// Deliver one event
    fn dispatch(&self, event: &InputEvent) -> PilotResult<()>;
}

// =============================================================================
// TCP BINDING
// =============================================================================

/// How long a call waits for its response before the connection is dropped
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Connection {
    fn open(addr: SocketAddr, connect_timeout: Duration, io_timeout: Duration) -> PilotResult<Self> {
        let stream = TcpStream::connect_timeout(&addr, connect_timeout)?;
        Self::wrap(stream, io_timeout)
    }

    fn wrap(stream: TcpStream, io_timeout: Duration) -> PilotResult<Self> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(io_timeout))?;
        stream.set_write_timeout(Some(io_timeout))?;
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
        })
    }
}

/// Client side of the TCP wire binding.
///
/// A call that fails on the wire (I/O error, timeout, out-of-order reply)
/// drops the connection; the next call reconnects to the same peer.
pub struct TcpTransport {
    peer: SocketAddr,
    connect_timeout: Duration,
    io_timeout: Duration,
    conn: Mutex<Option<Connection>>,
    seq: AtomicU64,
}

impl fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpTransport")
            .field("peer", &self.peer)
            .field("io_timeout", &self.io_timeout)
            .finish_non_exhaustive()
    }
}

impl TcpTransport {
    /// Connect with a timeout
    pub fn connect(addr: SocketAddr, timeout: Duration) -> PilotResult<Self> {
        let conn = Connection::open(addr, timeout, DEFAULT_IO_TIMEOUT)?;
        Ok(Self::with_connection(addr, timeout, conn))
    }

    /// Wrap an already connected stream
    pub fn from_stream(stream: TcpStream) -> PilotResult<Self> {
        let peer = stream.peer_addr()?;
        let conn = Connection::wrap(stream, DEFAULT_IO_TIMEOUT)?;
        Ok(Self::with_connection(peer, DEFAULT_IO_TIMEOUT, conn))
    }

    fn with_connection(peer: SocketAddr, connect_timeout: Duration, conn: Connection) -> Self {
        Self {
            peer,
            connect_timeout,
            io_timeout: DEFAULT_IO_TIMEOUT,
            conn: Mutex::new(Some(conn)),
            seq: AtomicU64::new(1),
        }
    }

    /// Per-call response timeout (builder)
    pub fn with_io_timeout(mut self, timeout: Duration) -> PilotResult<Self> {
        self.io_timeout = timeout;
        let conn = self.conn.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(conn) = conn.as_ref() {
            conn.writer.set_read_timeout(Some(timeout))?;
            conn.writer.set_write_timeout(Some(timeout))?;
        }
        Ok(self)
    }

    /// Endpoint address
    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn call(&self, request: WireRequest) -> PilotResult<WireResponse> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let mut slot = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let conn = match slot.as_mut() {
            Some(conn) => conn,
            None => {
                tracing::debug!(peer = %self.peer, "reconnecting");
                let fresh = Connection::open(self.peer, self.connect_timeout, self.io_timeout)
                    .map_err(|e| PilotError::transport(format!("reconnect to {}: {e}", self.peer)))?;
                slot.insert(fresh)
            }
        };
        let exchanged = Self::exchange(conn, seq, request, self.peer);
        if matches!(exchanged, Err(PilotError::Transport { .. })) {
            *slot = None;
        }
        exchanged?.into_result()
    }

    fn exchange(
        conn: &mut Connection,
        seq: u64,
        request: WireRequest,
        peer: SocketAddr,
    ) -> PilotResult<WireResponse> {
        write_frame(&mut conn.writer, &RequestFrame { seq, request })
            .map_err(|e| PilotError::transport(format!("send to {peer}: {e}")))?;
        let frame: ResponseFrame = read_frame(&mut conn.reader)
            .map_err(|e| PilotError::transport(format!("receive from {peer}: {e}")))?
            .ok_or_else(|| PilotError::transport(format!("{peer} closed the connection")))?;
        if frame.seq != seq {
            return Err(PilotError::transport(format!(
                "response out of order: expected seq {seq}, got {}",
                frame.seq
            )));
        }
        Ok(frame.response)
    }

    fn unexpected(op: &str, response: &WireResponse) -> PilotError {
        PilotError::transport(format!("unexpected response to {op}: {response:?}"))
    }
}

impl Transport for TcpTransport {
    fn select(&self, scope: Option<NodeId>, query: &Query) -> PilotResult<Vec<NodeRef>> {
        tracing::debug!(?scope, query = %query, "select");
        match self.call(WireRequest::Select {
            scope,
            query: query.clone(),
        })? {
            WireResponse::Nodes { nodes } => Ok(nodes),
            other => Err(Self::unexpected("select", &other)),
        }
    }

    fn get_property(&self, id: NodeId, name: &str) -> PilotResult<Value> {
        match self.call(WireRequest::GetProperty {
            id,
            name: name.to_string(),
        })? {
            WireResponse::Value { value } => Ok(value),
            other => Err(Self::unexpected("get_property", &other)),
        }
    }

    fn set_property(&self, id: NodeId, name: &str, value: Value) -> PilotResult<()> {
        match self.call(WireRequest::SetProperty {
            id,
            name: name.to_string(),
            value,
        })? {
            WireResponse::Ok => Ok(()),
            other => Err(Self::unexpected("set_property", &other)),
        }
    }

    fn watch_signal(&self, id: NodeId, signal: &str) -> PilotResult<WatchId> {
        match self.call(WireRequest::WatchSignal {
            id,
            signal: signal.to_string(),
        })? {
            WireResponse::Watch { watch } => Ok(watch),
            other => Err(Self::unexpected("watch_signal", &other)),
        }
    }

    fn signal_emissions(&self, watch: WatchId) -> PilotResult<Vec<Vec<Value>>> {
        match self.call(WireRequest::SignalEmissions { watch })? {
            WireResponse::Emissions { emissions } => Ok(emissions),
            other => Err(Self::unexpected("signal_emissions", &other)),
        }
    }

    fn is_alive(&self, id: NodeId) -> PilotResult<bool> {
        match self.call(WireRequest::IsAlive { id })? {
            WireResponse::Alive { alive } => Ok(alive),
            other => Err(Self::unexpected("is_alive", &other)),
        }
    }
}

impl InputBackend for TcpTransport {
    fn dispatch(&self, event: &InputEvent) -> PilotResult<()> {
        match self.call(WireRequest::Input {
            event: event.clone(),
        })? {
            WireResponse::Ok => Ok(()),
            other => Err(Self::unexpected("input", &other)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::io::{BufRead, Write};
    use std::net::TcpListener;

    type Reply = (Option<u64>, WireResponse);

    /// Serve `replies` in order, one per request, then hang up.
    fn scripted_endpoint(replies: Vec<Reply>) -> SocketAddr {
        scripted_connections(vec![replies])
    }

    /// One script per accepted connection, in accept order
    fn scripted_connections(scripts: Vec<Vec<Reply>>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for replies in scripts {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut writer = stream;
                for (seq_override, response) in replies {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap() == 0 {
                        break;
                    }
                    let request: RequestFrame = serde_json::from_str(&line).unwrap();
                    let frame = ResponseFrame {
                        seq: seq_override.unwrap_or(request.seq),
                        response,
                    };
                    write_frame(&mut writer, &frame).unwrap();
                }
                writer.flush().unwrap();
            }
        });
        addr
    }

    #[test]
    fn test_select_and_property() {
        let addr = scripted_endpoint(vec![
            (
                None,
                WireResponse::Nodes {
                    nodes: vec![NodeRef {
                        id: 4,
                        type_name: "Chrome".into(),
                    }],
                },
            ),
            (
                None,
                WireResponse::Value {
                    value: Value::Bool(true),
                },
            ),
        ]);
        let t = TcpTransport::connect(addr, Duration::from_secs(2)).unwrap();
        let nodes = t.select(None, &Query::of_type("Chrome")).unwrap();
        assert_eq!(nodes[0].id, 4);
        assert_eq!(t.get_property(4, "visible").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_error_codes_map_to_domain_errors() {
        let addr = scripted_endpoint(vec![(
            None,
            WireResponse::from_error(&PilotError::StaleNode { id: 11 }),
        )]);
        let t = TcpTransport::connect(addr, Duration::from_secs(2)).unwrap();
        assert!(matches!(
            t.get_property(11, "text"),
            Err(PilotError::StaleNode { id: 11 })
        ));
    }

    #[test]
    fn test_out_of_order_response_rejected() {
        let addr = scripted_endpoint(vec![(Some(999), WireResponse::Ok)]);
        let t = TcpTransport::connect(addr, Duration::from_secs(2)).unwrap();
        let err = t.dispatch(&InputEvent::PointerMove { x: 0, y: 0 }).unwrap_err();
        assert!(err.to_string().contains("out of order"));
    }

    #[test]
    fn test_out_of_order_response_drops_connection() {
        let addr = scripted_connections(vec![
            vec![(Some(999), WireResponse::Ok)],
            vec![(
                None,
                WireResponse::Value {
                    value: Value::Bool(true),
                },
            )],
        ]);
        let t = TcpTransport::connect(addr, Duration::from_secs(2)).unwrap();
        assert!(t.dispatch(&InputEvent::PointerMove { x: 0, y: 0 }).is_err());
        assert!(t.is_alive(3).unwrap());
    }

    #[test]
    fn test_silent_endpoint_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let _holder = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            std::thread::sleep(Duration::from_secs(3));
            drop(stream);
        });
        let t = TcpTransport::connect(addr, Duration::from_secs(2))
            .unwrap()
            .with_io_timeout(Duration::from_millis(100))
            .unwrap();
        let started = std::time::Instant::now();
        let err = t.is_alive(1).unwrap_err();
        assert!(matches!(err, PilotError::Transport { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_closed_connection_is_transport_error() {
        let addr = scripted_endpoint(vec![]);
        let t = TcpTransport::connect(addr, Duration::from_secs(2)).unwrap();
        assert!(matches!(t.is_alive(1), Err(PilotError::Transport { .. })));
    }

    #[test]
    fn test_unexpected_response_kind() {
        let addr = scripted_endpoint(vec![(None, WireResponse::Ok)]);
        let t = TcpTransport::connect(addr, Duration::from_secs(2)).unwrap();
        let err = t.is_alive(1).unwrap_err();
        assert!(err.to_string().contains("unexpected response to is_alive"));
    }
}
