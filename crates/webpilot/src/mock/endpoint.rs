//! Introspection endpoint serving a [`MockApp`] over the TCP wire binding.
//!
//! The endpoint accepts any number of connections; each gets its own
//! thread answering frames in order. Dropping the [`Endpoint`] stops the
//! accept loop; open connections end when their client disconnects.

use super::app::MockApp;
use crate::input::InputEvent;
use crate::result::{PilotError, PilotResult};
use crate::transport::{InputBackend, Transport};
use crate::wire::{
    read_frame, write_frame, RequestFrame, ResponseFrame, WireRequest, WireResponse,
    TESTABILITY_ADDR_ENV,
};
use std::io::BufReader;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A listening endpoint
#[derive(Debug)]
pub struct Endpoint {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    accept: Option<JoinHandle<()>>,
}

impl Endpoint {
    /// Listen on `addr` (`127.0.0.1:0` picks a free port)
    pub fn bind(app: Arc<MockApp>, addr: impl ToSocketAddrs) -> PilotResult<Self> {
        let listener = TcpListener::bind(addr)?;
        let addr = listener.local_addr()?;
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let accept = std::thread::Builder::new()
            .name("webpilot-endpoint".into())
            .spawn(move || accept_loop(&listener, &app, &flag))?;
        tracing::info!(%addr, "introspection endpoint listening");
        Ok(Self {
            addr,
            stop,
            accept: Some(accept),
        })
    }

    /// Listen on the address named by `WEBPILOT_TESTABILITY_ADDR`
    pub fn bind_from_env(app: Arc<MockApp>) -> PilotResult<Self> {
        let addr = std::env::var(TESTABILITY_ADDR_ENV).map_err(|_| PilotError::Launch {
            executable: "mock".into(),
            message: format!("{TESTABILITY_ADDR_ENV} is not set"),
        })?;
        Self::bind(app, addr.as_str())
    }

    /// Bound address
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Block until the accept loop ends
    pub fn join(mut self) {
        if let Some(handle) = self.accept.take() {
            if handle.join().is_err() {
                tracing::warn!("endpoint accept loop panicked");
            }
        }
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        let Some(handle) = self.accept.take() else {
            return;
        };
        self.stop.store(true, Ordering::SeqCst);
        // wake the blocking accept
        let _ = TcpStream::connect(self.addr);
        if handle.join().is_err() {
            tracing::warn!("endpoint accept loop panicked");
        }
    }
}

fn accept_loop(listener: &TcpListener, app: &Arc<MockApp>, stop: &AtomicBool) {
    for stream in listener.incoming() {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(%err, "accept failed");
                continue;
            }
        };
        let app = Arc::clone(app);
        let spawned = std::thread::Builder::new()
            .name("webpilot-connection".into())
            .spawn(move || {
                if let Err(err) = serve_connection(&app, stream) {
                    tracing::debug!(%err, "connection closed with error");
                }
            });
        if let Err(err) = spawned {
            tracing::warn!(%err, "could not start connection thread");
        }
    }
}

fn serve_connection(app: &MockApp, stream: TcpStream) -> PilotResult<()> {
    let peer = stream.peer_addr().ok();
    tracing::debug!(?peer, "client connected");
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    while let Some(RequestFrame { seq, request }) = read_frame(&mut reader)? {
        let response = handle(app, request).unwrap_or_else(|err| WireResponse::from_error(&err));
        write_frame(&mut writer, &ResponseFrame { seq, response })?;
    }
    tracing::debug!(?peer, "client disconnected");
    Ok(())
}

/// Answer one request against the tree
pub fn handle(app: &MockApp, request: WireRequest) -> PilotResult<WireResponse> {
    Ok(match request {
        WireRequest::Select { scope, query } => WireResponse::Nodes {
            nodes: app.select(scope, &query)?,
        },
        WireRequest::GetProperty { id, name } => WireResponse::Value {
            value: app.get_property(id, &name)?,
        },
        WireRequest::SetProperty { id, name, value } => {
            app.set_property(id, &name, value)?;
            WireResponse::Ok
        }
        WireRequest::WatchSignal { id, signal } => WireResponse::Watch {
            watch: app.watch_signal(id, &signal)?,
        },
        WireRequest::SignalEmissions { watch } => WireResponse::Emissions {
            emissions: app.signal_emissions(watch)?,
        },
        WireRequest::IsAlive { id } => WireResponse::Alive {
            alive: app.is_alive(id)?,
        },
        WireRequest::Input { event } => {
            dispatch(app, &event)?;
            WireResponse::Ok
        }
    })
}

fn dispatch(app: &MockApp, event: &InputEvent) -> PilotResult<()> {
    InputBackend::dispatch(app, event)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::app::NodeSpec;
    use crate::query::Query;
    use crate::value::Value;
    use crate::wire::ErrorCode;

    mod handle_tests {
        use super::*;

        #[test]
        fn test_select_returns_nodes() {
            let app = MockApp::new();
            let id = app.insert(None, NodeSpec::new("Browser").name("browser"));
            let response = handle(
                &app,
                WireRequest::Select {
                    scope: None,
                    query: Query::of_type("Browser"),
                },
            )
            .unwrap();
            match response {
                WireResponse::Nodes { nodes } => {
                    assert_eq!(nodes.len(), 1);
                    assert_eq!(nodes[0].id, id);
                }
                other => panic!("unexpected response {other:?}"),
            }
        }

        #[test]
        fn test_stale_node_maps_to_stale_code() {
            let app = MockApp::new();
            let id = app.insert(None, NodeSpec::new("Dialog"));
            app.destroy(id);
            let err = handle(
                &app,
                WireRequest::GetProperty {
                    id,
                    name: "visible".into(),
                },
            )
            .unwrap_err();
            match WireResponse::from_error(&err) {
                WireResponse::Error { code, .. } => assert_eq!(code, ErrorCode::Stale),
                other => panic!("unexpected response {other:?}"),
            }
        }

        #[test]
        fn test_set_property_round_trips() {
            let app = MockApp::new();
            let id = app.insert(None, NodeSpec::new("TextField").text(""));
            handle(
                &app,
                WireRequest::SetProperty {
                    id,
                    name: "text".into(),
                    value: Value::from("hello"),
                },
            )
            .unwrap();
            assert_eq!(app.get_string(id, "text"), "hello");
        }
    }

    mod endpoint_tests {
        use super::*;
        use crate::transport::TcpTransport;
        use std::time::Duration;

        #[test]
        fn test_tcp_transport_reads_tree() {
            let app = MockApp::new();
            let id = app.insert(None, NodeSpec::new("Browser").prop("wide", true));
            let endpoint = Endpoint::bind(Arc::clone(&app), "127.0.0.1:0").unwrap();
            let transport =
                TcpTransport::connect(endpoint.local_addr(), Duration::from_secs(5)).unwrap();
            assert_eq!(transport.get_property(id, "wide").unwrap(), Value::Bool(true));
            assert!(transport.is_alive(id).unwrap());
        }

        #[test]
        fn test_drop_stops_accepting() {
            let app = MockApp::new();
            let endpoint = Endpoint::bind(app, "127.0.0.1:0").unwrap();
            let addr = endpoint.local_addr();
            drop(endpoint);
            assert!(TcpStream::connect_timeout(&addr, Duration::from_millis(200)).is_err());
        }
    }
}
