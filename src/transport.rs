// Copyright 2024. The RPC Bridge Contributors
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! The byte-transport seam a [`crate::proxy::Proxy`] or [`crate::service::Service`]
//! is driven over. Ordered, reliable delivery of whole envelopes is assumed;
//! framing a stream-oriented transport into envelope boundaries is the
//! transport impl's job, not this crate's.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("peer is gone")]
    Closed,
    #[error("transport failure: {0}")]
    Other(String),
}

/// Send one already-encoded envelope. Implementations are not required to be
/// `Sync`; a `Proxy`/`Service` only ever needs `&self` access from one task
/// at a time for sending, guarded by its own internal lock.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, buf: Bytes) -> Result<(), TransportError>;
}

/// An in-memory, unbounded-channel transport pairing, for tests that want a
/// real async round trip without a socket. `Loopback::pair()` returns two
/// ends; whatever is sent into one is what the other's receiver yields.
pub struct Loopback {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl Loopback {
    /// `(client_side, server_side, client_rx, server_rx)` — the two
    /// `Transport` handles to hand to a `Proxy`/`Service`, and the two
    /// receivers a driving task pumps into the other side's codec.
    pub fn pair() -> (Self, Self, mpsc::UnboundedReceiver<Bytes>, mpsc::UnboundedReceiver<Bytes>) {
        let (client_tx, server_rx) = mpsc::unbounded_channel();
        let (server_tx, client_rx) = mpsc::unbounded_channel();
        (Self { tx: client_tx }, Self { tx: server_tx }, client_rx, server_rx)
    }
}

#[async_trait]
impl Transport for Loopback {
    async fn send(&self, buf: Bytes) -> Result<(), TransportError> {
        self.tx.send(buf).map_err(|_| TransportError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loopback_delivers_in_order() {
        let (client, server, mut client_rx, mut server_rx) = Loopback::pair();
        client.send(Bytes::from_static(b"hello")).await.unwrap();
        server.send(Bytes::from_static(b"world")).await.unwrap();
        assert_eq!(server_rx.recv().await.unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(client_rx.recv().await.unwrap(), Bytes::from_static(b"world"));
    }

    #[tokio::test]
    async fn send_after_drop_is_closed() {
        let (client, _server, _client_rx, server_rx) = Loopback::pair();
        drop(server_rx);
        let err = client.send(Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }
}
