// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! TCP transport for the native protocol.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::{Request, Response, Transport};
use crate::error::{Error, ProtocolError, Result};

/// Largest reply accepted before the frame is considered complete.
const MAX_FRAME_LEN: usize = 4096;

/// TCP connection to one unit.
///
/// All exchanges serialize on a FIFO-fair mutex, so at most one request is
/// in flight. When an exchange fails mid-session the socket is dropped; the
/// next request makes one reconnect attempt before failing. That reconnect
/// and the exchange share one request timeout.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use breezart_lib::protocol::{Request, RequestKind, TcpTransport, Transport};
///
/// # async fn example() -> breezart_lib::Result<()> {
/// let transport = TcpTransport::new("192.168.1.50", 1560)
///     .with_request_timeout(Duration::from_secs(3));
/// transport.connect().await?;
///
/// let response = transport
///     .send_request(&Request::read(RequestKind::State, 0x544b))
///     .await?;
/// println!("{:?}", response.words());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TcpTransport {
    host: String,
    port: u16,
    connect_timeout: Duration,
    request_timeout: Duration,
    idle_gap: Duration,
    stream: Mutex<Option<TcpStream>>,
    connected: AtomicBool,
    closed: AtomicBool,
}

impl TcpTransport {
    /// Default TCP port of the unit.
    pub const DEFAULT_PORT: u16 = 1560;
    /// Default connect timeout.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default request timeout.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default silence after which an unterminated reply is complete.
    pub const DEFAULT_IDLE_GAP: Duration = Duration::from_millis(200);

    /// Creates a transport for `host:port`. No connection is made yet.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            idle_gap: Self::DEFAULT_IDLE_GAP,
            stream: Mutex::new(None),
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the idle gap that ends a reply without a newline.
    #[must_use]
    pub fn with_idle_gap(mut self, gap: Duration) -> Self {
        self.idle_gap = gap;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Establishes the session if none is open.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ConnectionFailed`] if the unit refuses the
    /// connection, [`ProtocolError::Timeout`] if it does not answer within
    /// the connect timeout and [`ProtocolError::Closed`] after
    /// [`Transport::close`].
    pub async fn connect(&self) -> Result<()> {
        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
        }
        Ok(())
    }

    async fn open(&self) -> Result<TcpStream> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ProtocolError::Closed.into());
        }
        if self.host.is_empty() {
            return Err(ProtocolError::InvalidAddress("empty host".to_string()).into());
        }

        let addr = format!("{}:{}", self.host, self.port);
        tracing::debug!(%addr, "Connecting");
        let stream = timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| ProtocolError::Timeout(millis(self.connect_timeout)))?
            .map_err(|e| ProtocolError::ConnectionFailed(format!("{addr}: {e}")))?;
        stream.set_nodelay(true).map_err(ProtocolError::Io)?;

        self.connected.store(true, Ordering::Release);
        tracing::info!(%addr, "Connected to Breezart unit");
        Ok(stream)
    }

    async fn exchange(&self, stream: &mut TcpStream, frame: &str) -> std::io::Result<String> {
        stream.write_all(frame.as_bytes()).await?;
        stream.flush().await?;

        let mut buf = Vec::with_capacity(256);
        let mut chunk = [0u8; 512];

        // The first bytes may take up to the request timeout.
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);

        // The unit does not always terminate replies; silence ends them too.
        while !buf.contains(&b'\n') && buf.len() < MAX_FRAME_LEN {
            match timeout(self.idle_gap, stream.read(&mut chunk)).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(n)) => buf.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(e),
            }
        }

        if let Some(end) = buf.iter().position(|b| *b == b'\n') {
            buf.truncate(end);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn drop_session(&self, guard: &mut Option<TcpStream>) {
        if guard.take().is_some() {
            self.connected.store(false, Ordering::Release);
            tracing::debug!(host = %self.host, "Session dropped");
        }
    }
}

impl Transport for TcpTransport {
    /// Sends one request and reads its reply.
    ///
    /// A reconnect counts against the request timeout, so one call never
    /// takes longer than the request timeout. The session is dropped on I/O
    /// errors, timeouts and replies that do not decode as an answer to
    /// `request`; device error codes keep it.
    async fn send_request(&self, request: &Request) -> Result<Response> {
        let mut guard = self.stream.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(ProtocolError::Closed.into());
        }

        let kind = request.kind();
        tracing::trace!(%kind, data = ?request.data(), "TX");

        let frame = request.encode();
        let exchange = async {
            if guard.is_none() {
                *guard = Some(self.open().await?);
            }
            let Some(stream) = guard.as_mut() else {
                return Err(Error::from(ProtocolError::Closed));
            };
            let raw = self
                .exchange(stream, &frame)
                .await
                .map_err(ProtocolError::Io)?;
            Ok::<_, Error>(raw)
        };
        let outcome = timeout(self.request_timeout, exchange).await;
        let raw = match outcome {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                self.drop_session(&mut guard);
                return Err(e);
            }
            Err(_) => {
                // Late bytes must not be read as the next reply.
                self.drop_session(&mut guard);
                return Err(ProtocolError::Timeout(millis(self.request_timeout)).into());
            }
        };

        tracing::trace!(%kind, %raw, "RX");
        let response = Response::parse(kind, &raw);
        if let Err(Error::Parse(e)) = &response {
            // The rest of a split frame may still be in flight.
            tracing::warn!(%kind, error = %e, "Unexpected reply, resetting session");
            self.drop_session(&mut guard);
        }
        response
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let mut guard = self.stream.lock().await;
        if let Some(mut stream) = guard.take() {
            // Best effort; the socket is released either way.
            let _ = stream.shutdown().await;
        }
        self.connected.store(false, Ordering::Release);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}
