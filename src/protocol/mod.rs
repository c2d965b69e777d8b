// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport layer for the native Breezart TCP protocol.
//!
//! - [`Request`] / [`Response`]: the text frames exchanged with the unit
//! - [`Transport`]: one request/response exchange at a time
//! - [`TcpTransport`]: the TCP implementation with reconnect-on-next-use
//!
//! The unit handles a single exchange at a time. Every [`Transport`]
//! implementation must serialize concurrent callers so that a reply is never
//! read by the wrong request.

mod frame;
mod tcp;

pub use frame::{DELIMITER, Request, RequestKind, Response};
pub use tcp::TcpTransport;

use std::future::Future;

use crate::error::Result;

/// A connection able to exchange request frames with one unit.
///
/// Poller loops and command calls share one transport through an `Arc`;
/// implementations serialize the exchanges in arrival order.
pub trait Transport: Send + Sync + 'static {
    /// Sends `request` and waits for the correlated response.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Timeout`](crate::ProtocolError::Timeout) if no
    ///   response arrives within the request timeout
    /// - [`ProtocolError::ConnectionFailed`](crate::ProtocolError::ConnectionFailed)
    ///   if the session could not be (re)established
    /// - [`ProtocolError::AuthenticationFailed`](crate::ProtocolError::AuthenticationFailed)
    ///   or [`ProtocolError::Rejected`](crate::ProtocolError::Rejected) if
    ///   the unit answered with an error code
    /// - [`ParseError`](crate::ParseError) if the reply is not correlated with
    ///   the request
    fn send_request(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send;

    /// Releases the connection. Later requests fail with
    /// [`ProtocolError::Closed`](crate::ProtocolError::Closed).
    fn close(&self) -> impl Future<Output = ()> + Send;

    /// Returns `true` while a session is established.
    fn is_connected(&self) -> bool;
}
