//! In-memory transport doubles for tests.
//!
//! [`MockTransport`] answers HTTP requests from per-route reply queues.
//! [`MockConnector`] hands out pre-built [`MockConnection`]s whose other
//! end ([`MockPeer`]) the test drives directly.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use crate::{
    Connection, ConnectionId, Connector, HttpRequest, HttpResponse,
    HttpTransport, Method, TransportError,
};

static NEXT_MOCK_ID: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// A scripted reply for one request.
#[derive(Debug, Clone)]
pub struct MockReply {
    outcome: MockOutcome,
    delay: Option<Duration>,
}

#[derive(Debug, Clone)]
enum MockOutcome {
    Response(HttpResponse),
    Fail(String),
}

impl MockReply {
    /// A response with the given status and raw body text.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            outcome: MockOutcome::Response(HttpResponse {
                status,
                reason: reason_for(status).to_string(),
                body: body.into().into_bytes(),
            }),
            delay: None,
        }
    }

    /// A response with a JSON body.
    pub fn json(status: u16, body: &str) -> Self {
        Self::text(status, body)
    }

    /// A response with the given status and an empty body.
    pub fn empty(status: u16) -> Self {
        Self::text(status, "")
    }

    /// The exchange fails before any response arrives.
    pub fn network_failure(reason: impl Into<String>) -> Self {
        Self {
            outcome: MockOutcome::Fail(reason.into()),
            delay: None,
        }
    }

    /// Delays the reply. Under a paused tokio clock this reorders
    /// concurrently issued requests deterministically.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

fn reason_for(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// An [`HttpTransport`] that replays scripted replies per `(method, path)`.
///
/// Replies for a route are consumed in order; the last one is sticky so a
/// polling loop keeps receiving it. Unknown routes answer 404.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    inner: Arc<StdMutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    routes: HashMap<(Method, String), VecDeque<MockReply>>,
    requests: Vec<HttpRequest>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `reply` for requests whose URL path ends with `path`.
    pub fn on(&self, method: Method, path: &str, reply: MockReply) -> &Self {
        self.lock()
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Drops every queued reply for a route and queues `reply` instead.
    pub fn replace(&self, method: Method, path: &str, reply: MockReply) -> &Self {
        let mut state = self.lock();
        let queue = state.routes.entry((method, path.to_string())).or_default();
        queue.clear();
        queue.push_back(reply);
        drop(state);
        self
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    /// Number of requests seen for a route.
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path().ends_with(path))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A poisoned mock only happens after a test already panicked.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_reply(&self, request: &HttpRequest) -> Option<MockReply> {
        let mut state = self.lock();
        state.requests.push(request.clone());
        let path = request.path();
        // Longest matching route wins so `/top` never shadows `/top/10`.
        let key = state
            .routes
            .keys()
            .filter(|(m, p)| *m == request.method && path.ends_with(p.as_str()))
            .max_by_key(|(_, p)| p.len())
            .cloned()?;
        let queue = state.routes.get_mut(&key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl HttpTransport for MockTransport {
    async fn send(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        let Some(reply) = self.next_reply(&request) else {
            return Ok(HttpResponse {
                status: 404,
                reason: "Not Found".into(),
                body: br#"{"error":"no mock route"}"#.to_vec(),
            });
        };
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        match reply.outcome {
            MockOutcome::Response(resp) => Ok(resp),
            MockOutcome::Fail(reason) => Err(TransportError::connect_refused(reason)),
        }
    }
}

// ---------------------------------------------------------------------------
// Push socket
// ---------------------------------------------------------------------------

/// A [`Connector`] that hands out connections prepared with
/// [`MockConnector::prepare`]. Dialing with nothing prepared fails.
#[derive(Clone, Default)]
pub struct MockConnector {
    pending: Arc<StdMutex<VecDeque<MockConnection>>>,
    dialed: Arc<StdMutex<Vec<String>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepares the next connection and returns the test's end of it.
    pub fn prepare(&self) -> MockPeer {
        let (conn, peer) = MockConnection::pair();
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(conn);
        peer
    }

    /// URLs dialed so far.
    pub fn dialed(&self) -> Vec<String> {
        self.dialed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Connector for MockConnector {
    type Connection = MockConnection;

    async fn connect(
        &self,
        url: &str,
    ) -> Result<Self::Connection, TransportError> {
        self.dialed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| TransportError::connect_refused("no prepared connection"))
    }
}

/// Client end of an in-memory socket.
pub struct MockConnection {
    id: ConnectionId,
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

impl MockConnection {
    /// Builds a connected pair.
    pub fn pair() -> (MockConnection, MockPeer) {
        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let conn = MockConnection {
            id: ConnectionId::new(NEXT_MOCK_ID.fetch_add(1, Ordering::Relaxed)),
            inbound: Mutex::new(inbound),
            outbound,
            closed: Arc::clone(&closed),
        };
        let peer = MockPeer {
            to_client: Some(to_client),
            from_client,
            closed,
        };
        (conn, peer)
    }
}

impl Connection for MockConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed("closed locally".into()));
        }
        self.outbound
            .send(data.to_vec())
            .map_err(|_| TransportError::ConnectionClosed("peer gone".into()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.inbound.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Server end of an in-memory socket, driven by the test.
pub struct MockPeer {
    to_client: Option<mpsc::UnboundedSender<Vec<u8>>>,
    from_client: mpsc::UnboundedReceiver<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

impl MockPeer {
    /// Pushes a text frame to the client. Returns `false` once the client
    /// end has been dropped.
    pub fn send(&self, frame: &str) -> bool {
        self.to_client
            .as_ref()
            .is_some_and(|tx| tx.send(frame.as_bytes().to_vec()).is_ok())
    }

    /// Next frame the client sent, as text.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client
            .recv()
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Ends the stream; the client's `recv` returns `Ok(None)`.
    pub fn disconnect(&mut self) {
        self.to_client = None;
    }

    /// `true` once the client called `close`.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
