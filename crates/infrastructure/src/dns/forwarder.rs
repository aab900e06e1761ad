use crate::dns::forwarding::{DnsResponse, MessageBuilder, ResponseParser};
use bytes::Bytes;
use dashmap::DashMap;
use sentry_dns_domain::{DomainError, RecordType, Upstream};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

/// Default idle timeout for pooled exchange sockets (§4.4: "the pool must
/// not hold sockets indefinitely").
const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// A pool of DNS exchange sockets keyed by upstream address and protocol
/// (§4.4). Checked-out sockets are exclusive to one in-flight query; they
/// return to the pool's free list afterward unless the query observed an
/// I/O error on them, in which case they're dropped instead of reused.
/// Stale entries are reaped lazily at checkout time rather than by a
/// separate background task.
pub struct SocketPool {
    udp: DashMap<SocketAddr, Vec<(UdpSocket, Instant)>>,
    tcp: DashMap<SocketAddr, Vec<(TcpStream, Instant)>>,
    idle_timeout: Duration,
}

impl SocketPool {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            udp: DashMap::new(),
            tcp: DashMap::new(),
            idle_timeout,
        }
    }

    async fn checkout_udp(&self, addr: SocketAddr) -> std::io::Result<UdpSocket> {
        if let Some(mut free) = self.udp.get_mut(&addr) {
            while let Some((socket, last_used)) = free.pop() {
                if last_used.elapsed() < self.idle_timeout {
                    return Ok(socket);
                }
            }
        }
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(addr).await?;
        Ok(socket)
    }

    fn checkin_udp(&self, addr: SocketAddr, socket: UdpSocket) {
        self.udp.entry(addr).or_default().push((socket, Instant::now()));
    }

    async fn checkout_tcp(&self, addr: SocketAddr, dial_timeout: Duration) -> Result<TcpStream, DomainError> {
        if let Some(mut free) = self.tcp.get_mut(&addr) {
            while let Some((stream, last_used)) = free.pop() {
                if last_used.elapsed() < self.idle_timeout {
                    return Ok(stream);
                }
            }
        }
        timeout(dial_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| DomainError::UpstreamNetworkError(format!("tcp connect timeout to {addr}")))?
            .map_err(DomainError::Io)
    }

    fn checkin_tcp(&self, addr: SocketAddr, stream: TcpStream) {
        self.tcp.entry(addr).or_default().push((stream, Instant::now()));
    }
}

/// Sends queries to configured upstream resolvers (§4.4): round-robin
/// starting index, retries on network error/timeout cycling through the
/// upstream list up to `retries * upstreams.len()` attempts (or, when
/// `failover` is disabled, retried only against the starting upstream),
/// truncated responses retried over TCP. Exchange sockets are pooled and
/// reused between queries.
pub struct UpstreamForwarder {
    upstreams: Vec<Upstream>,
    cursor: AtomicUsize,
    timeout: Duration,
    retries: u32,
    failover: bool,
    pool: Arc<SocketPool>,
}

impl UpstreamForwarder {
    pub fn new(upstreams: Vec<Upstream>, timeout: Duration, retries: u32) -> Self {
        Self {
            upstreams,
            cursor: AtomicUsize::new(0),
            timeout,
            retries,
            failover: true,
            pool: Arc::new(SocketPool::new(DEFAULT_POOL_IDLE_TIMEOUT)),
        }
    }

    /// Shares an existing pool instead of starting a fresh (empty) one —
    /// used when the handler builds a short-lived forwarder for a single
    /// matched forwarding/policy rule, so its queries still reuse sockets
    /// held by the handler's long-lived pool.
    pub fn with_pool(mut self, pool: Arc<SocketPool>) -> Self {
        self.pool = pool;
        self
    }

    /// §4.6: whether the forwarder tries all listed upstreams on failure
    /// (`true`, the default) or only retries the one it started with.
    pub fn with_failover(mut self, failover: bool) -> Self {
        self.failover = failover;
        self
    }

    /// Clones the handle to this forwarder's pool so short-lived,
    /// ad-hoc forwarders (one per matched policy/conditional-forwarding
    /// rule) can share it instead of each opening fresh sockets.
    pub fn pool(&self) -> Arc<SocketPool> {
        self.pool.clone()
    }

    fn start_index(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed) % self.upstreams.len().max(1)
    }

    fn next_upstream_order(&self) -> Vec<Upstream> {
        let start = self.start_index();
        let mut ordered = Vec::with_capacity(self.upstreams.len());
        ordered.extend_from_slice(&self.upstreams[start..]);
        ordered.extend_from_slice(&self.upstreams[..start]);
        ordered
    }

    /// Resolves `domain`/`record_type` against the configured upstreams,
    /// retrying network errors up to `retries * upstreams.len()` times
    /// (§4.4 step 2), or just `retries` times against the starting
    /// upstream when `failover` is disabled, and re-querying over TCP if
    /// the UDP response is truncated. Returns the upstream that produced
    /// the response alongside it, so callers can attribute the answer in
    /// logs and metrics.
    pub async fn forward(
        &self,
        domain: &str,
        record_type: &RecordType,
    ) -> Result<(Upstream, DnsResponse), DomainError> {
        if self.upstreams.is_empty() {
            return Err(DomainError::UpstreamNetworkError(
                "no upstreams configured".into(),
            ));
        }

        let retries = (self.retries as usize).max(1);
        let mut last_err = None;

        let candidates: Vec<Upstream> = if self.failover {
            let start = self.start_index();
            (0..retries * self.upstreams.len())
                .map(|i| self.upstreams[(start + i) % self.upstreams.len()])
                .collect()
        } else {
            let upstream = self.upstreams[self.start_index()];
            std::iter::repeat(upstream).take(retries).collect()
        };

        for upstream in &candidates {
            match self.query_udp(upstream, domain, record_type).await {
                Ok(response) if response.truncated => {
                    match self.query_tcp(upstream, domain, record_type).await {
                        Ok(tcp_response) => return Ok((*upstream, tcp_response)),
                        Err(err) => {
                            last_err = Some(err);
                            continue;
                        }
                    }
                }
                Ok(response) => return Ok((*upstream, response)),
                Err(err) if ResponseParser::is_transport_error(&err) => {
                    last_err = Some(err);
                    continue;
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            DomainError::UpstreamNetworkError("all upstreams exhausted".into())
        }))
    }

    async fn query_udp(
        &self,
        upstream: &Upstream,
        domain: &str,
        record_type: &RecordType,
    ) -> Result<DnsResponse, DomainError> {
        let (query_id, query_bytes) = MessageBuilder::build_query_with_id(domain, record_type)?;

        let socket = self.pool.checkout_udp(upstream.0).await.map_err(DomainError::Io)?;
        socket.send(&query_bytes).await.map_err(DomainError::Io)?;

        let mut buf = [0u8; 4096];
        let result = timeout(self.timeout, socket.recv(&mut buf)).await;
        let len = match result {
            Ok(Ok(len)) => len,
            Ok(Err(e)) => return Err(DomainError::Io(e)),
            Err(_) => {
                return Err(DomainError::UpstreamNetworkError(format!(
                    "timeout from {upstream}"
                )))
            }
        };
        self.pool.checkin_udp(upstream.0, socket);

        let response = ResponseParser::parse_bytes(Bytes::copy_from_slice(&buf[..len]))?;
        if response.message.id() != query_id {
            return Err(DomainError::UpstreamNetworkError(format!(
                "transaction id mismatch from {upstream}"
            )));
        }
        Ok(response)
    }

    async fn query_tcp(
        &self,
        upstream: &Upstream,
        domain: &str,
        record_type: &RecordType,
    ) -> Result<DnsResponse, DomainError> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (query_id, query_bytes) = MessageBuilder::build_query_with_id(domain, record_type)?;
        let mut stream = self.pool.checkout_tcp(upstream.0, self.timeout).await?;

        let len_prefix = (query_bytes.len() as u16).to_be_bytes();
        let write_result: Result<(), DomainError> = async {
            stream.write_all(&len_prefix).await.map_err(DomainError::Io)?;
            stream.write_all(&query_bytes).await.map_err(DomainError::Io)?;
            Ok(())
        }
        .await;
        write_result?;

        let mut len_buf = [0u8; 2];
        timeout(self.timeout, stream.read_exact(&mut len_buf))
            .await
            .map_err(|_| DomainError::UpstreamNetworkError(format!("tcp read timeout from {upstream}")))?
            .map_err(DomainError::Io)?;
        let response_len = u16::from_be_bytes(len_buf) as usize;

        let mut response_buf = vec![0u8; response_len];
        timeout(self.timeout, stream.read_exact(&mut response_buf))
            .await
            .map_err(|_| DomainError::UpstreamNetworkError(format!("tcp read timeout from {upstream}")))?
            .map_err(DomainError::Io)?;

        self.pool.checkin_tcp(upstream.0, stream);

        let response = ResponseParser::parse_bytes(Bytes::from(response_buf))?;
        if response.message.id() != query_id {
            return Err(DomainError::UpstreamNetworkError(format!(
                "transaction id mismatch from {upstream}"
            )));
        }
        Ok(response)
    }
}
