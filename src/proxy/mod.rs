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

//! The proxy side of the correlation engine: issue typed requests, allocate
//! request ids, hold pending completions, and correlate incoming server
//! envelopes back to the future that is waiting on them.

mod broadcast;
mod error;
mod pending;
mod request_id;

pub use broadcast::BroadcastHandler;
pub use error::ProxyError;

use std::sync::Mutex;

use bytes::BytesMut;
use tokio::sync::oneshot;

use self::{pending::PendingTable, request_id::RequestIdAllocator};
use crate::{
    codec,
    descriptor::{attribute_wire, InterfaceDescriptor, RPC_VERSION},
    message::{ClientMessage, Reply, Request, ServerBody},
    status::{RemoteStatus, Status},
    transport::Transport,
};

const LOG_TARGET: &str = "rpc_bridge::proxy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnecting,
}

/// Local policy knobs for a [`Proxy`]; neither affects wire compatibility.
#[derive(Debug, Clone, Copy)]
pub struct ProxyConfig {
    strict_interface_version: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            strict_interface_version: false,
        }
    }
}

impl ProxyConfig {
    /// When `true`, tightens §4.5's `peer.minor >= local.minor` compatibility
    /// rule to exact `(major, minor)` equality.
    pub fn with_strict_interface_version(mut self, strict: bool) -> Self {
        self.strict_interface_version = strict;
        self
    }
}

struct Inner<D: InterfaceDescriptor> {
    allocator: RequestIdAllocator,
    pending: PendingTable<D>,
}

/// The proxy side of one interface, generic over:
/// - `D`: the interface descriptor,
/// - `T`: the transport requests go out on,
/// - `H`: the handler for decoded `BROADCAST` bodies.
pub struct Proxy<D: InterfaceDescriptor, T: Transport, H: BroadcastHandler<D>> {
    transport: T,
    handler: H,
    state: Mutex<ConnectionState>,
    inner: Mutex<Inner<D>>,
    config: ProxyConfig,
}

impl<D: InterfaceDescriptor, T: Transport, H: BroadcastHandler<D>> Proxy<D, T, H> {
    pub fn new(transport: T, handler: H) -> Self {
        Self::with_config(transport, handler, ProxyConfig::default())
    }

    pub fn with_config(transport: T, handler: H, config: ProxyConfig) -> Self {
        Self {
            transport,
            handler,
            state: Mutex::new(ConnectionState::Idle),
            inner: Mutex::new(Inner {
                allocator: RequestIdAllocator::default(),
                pending: PendingTable::default(),
            }),
            config,
        }
    }

    /// Valid only from `Idle`. Resolves once the service's handshake reply
    /// has been checked for RPC- and interface-version compatibility.
    #[tracing::instrument(name = "proxy::connect", skip(self))]
    pub async fn connect(&self) -> Result<(), Status> {
        {
            let mut state = self.state.lock().unwrap();
            if *state != ConnectionState::Idle {
                return Err(Status::IllegalOperation);
            }
            *state = ConnectionState::Connecting;
        }
        let result = self.issue(Request::Connect, D::unit_tag(), 0).await;
        if result.is_err() {
            let mut state = self.state.lock().unwrap();
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Idle;
            }
        }
        result.map(|_| ())
    }

    /// Open Question 1, resolved: sends `DISCONNECT` carrying an allocated
    /// request id (the original reference's id-less call was a bug) and
    /// awaits `STATUS(OK)` before transitioning back to `Idle`.
    pub async fn disconnect(&self) -> Result<(), Status> {
        {
            let mut state = self.state.lock().unwrap();
            if *state != ConnectionState::Connected {
                return Err(Status::NotConnected);
            }
            *state = ConnectionState::Disconnecting;
        }
        let result = self.issue(Request::Disconnect, D::unit_tag(), 0).await;
        *self.state.lock().unwrap() = ConnectionState::Idle;
        result.map(|_| ())
    }

    /// Read attribute `component_id`'s current value. `tag` is the
    /// `RESULT` tag the pending completion expects back — the generic
    /// building block a generated typed wrapper's `get` sugar calls into.
    pub async fn get(&self, component_id: u32, tag: D::Tag) -> Result<D::Payload, Status> {
        self.guarded_fire(
            Request::Fire {
                component_id,
                payload: attribute_wire::encode_get(),
            },
            tag,
            component_id,
        )
        .await
    }

    pub async fn set(&self, component_id: u32, value: Vec<u8>) -> Result<(), Status> {
        self.guarded_fire(
            Request::Fire {
                component_id,
                payload: attribute_wire::encode_set(&value),
            },
            D::unit_tag(),
            component_id,
        )
        .await
        .map(|_| ())
    }

    pub async fn subscribe(&self, component_id: u32) -> Result<(), Status> {
        self.guarded_fire(
            Request::Fire {
                component_id,
                payload: attribute_wire::encode_subscribe(),
            },
            D::unit_tag(),
            component_id,
        )
        .await
        .map(|_| ())
    }

    pub async fn unsubscribe(&self, component_id: u32) -> Result<(), Status> {
        self.guarded_fire(
            Request::Fire {
                component_id,
                payload: attribute_wire::encode_unsubscribe(),
            },
            D::unit_tag(),
            component_id,
        )
        .await
        .map(|_| ())
    }

    /// Call a method by component id with an already-encoded input payload,
    /// expecting a `RESULT` tagged `result_tag`.
    pub async fn fire(&self, component_id: u32, input: Vec<u8>, result_tag: D::Tag) -> Result<D::Payload, Status> {
        self.guarded_fire(
            Request::Fire {
                component_id,
                payload: input,
            },
            result_tag,
            component_id,
        )
        .await
    }

    /// Remove and fail a pending entry directly, as if a displaced id had
    /// arrived for it (§5 "Cancellation and timeouts"). `false` if `id` was
    /// not outstanding.
    pub fn cancel(&self, id: u32) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.pending.remove(id) {
            Some(entry) => {
                let _ = entry.sender.send(Err(Status::UnsolicitedReply));
                true
            },
            None => false,
        }
    }

    /// Fail every outstanding completion with `NOT_CONNECTED` without
    /// consuming `self` — also run implicitly by `Drop` (§5 "Resource
    /// lifetime", §8 S8).
    pub fn teardown(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.pending.drain_fail(Status::NotConnected);
    }

    /// Feed one received envelope to the correlation engine.
    #[tracing::instrument(name = "proxy::receive_service_buffer", skip(self, bytes))]
    pub async fn receive_service_buffer(&self, bytes: &[u8]) -> Status {
        let msg = match codec::decode_server(bytes) {
            Ok(msg) => msg,
            Err(status) => return status,
        };
        match msg.body {
            ServerBody::Broadcast { component_id, payload } => match D::decode_broadcast_payload(component_id, &payload) {
                Ok(value) => {
                    self.handler.on_broadcast(component_id, value);
                    Status::Ok
                },
                Err(status) => {
                    log::debug!(target: LOG_TARGET, "failed to decode broadcast {}: {}", component_id, status);
                    status
                },
            },
            ServerBody::Reply(reply) => {
                let id = match msg.in_reply_to {
                    Some(id) => id,
                    None => return Status::InconsistentReply,
                };
                let entry = {
                    let mut inner = self.inner.lock().unwrap();
                    inner.pending.remove(id)
                };
                match entry {
                    Some(entry) => self.complete_reply(entry, reply),
                    None => {
                        log::debug!(target: LOG_TARGET, "unsolicited reply for id {}", id);
                        Status::UnsolicitedReply
                    },
                }
            },
        }
    }

    async fn guarded_fire(&self, request: Request, tag: D::Tag, component_id: u32) -> Result<D::Payload, Status> {
        {
            let state = self.state.lock().unwrap();
            if *state != ConnectionState::Connected {
                return Err(Status::NotConnected);
            }
        }
        self.issue(request, tag, component_id).await
    }

    /// Allocate an id, register the completion, *then* hand the buffer to
    /// the transport — the ordering §5 requires so a synchronously-completing
    /// transport can never produce a reply before the completion exists.
    async fn issue(&self, request: Request, tag: D::Tag, component_id: u32) -> Result<D::Payload, Status> {
        let (tx, rx) = oneshot::channel();
        let id = {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.allocator.next();
            inner.pending.insert(id, tag, component_id, tx);
            id
        };

        let mut buf = BytesMut::new();
        let encode_status = codec::encode_client(&ClientMessage { id, request }, &mut buf);
        if encode_status.is_error() {
            self.fail_pending(id, encode_status);
            return Err(encode_status);
        }

        if let Err(err) = self.transport.send(buf.freeze()).await {
            let err = ProxyError::from(err);
            log::warn!(target: LOG_TARGET, "{}", err);
            self.fail_pending(id, Status::EncodingFailure);
            return Err(Status::EncodingFailure);
        }

        rx.await.unwrap_or(Err(Status::NotConnected))
    }

    fn fail_pending(&self, id: u32, status: Status) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(entry) = inner.pending.remove(id) {
            let _ = entry.sender.send(Err(status));
        }
    }

    fn complete_reply(&self, entry: pending::PendingEntry<D>, reply: Reply) -> Status {
        match reply {
            Reply::Status(remote_status) => {
                if remote_status == RemoteStatus::Ok {
                    if entry.tag == D::unit_tag() {
                        let _ = entry.sender.send(Ok(D::unit_payload()));
                    } else {
                        let _ = entry.sender.send(Err(Status::UnrecognizedResult));
                    }
                } else {
                    let _ = entry.sender.send(Err(Status::from(remote_status)));
                }
                Status::Ok
            },
            Reply::Result { component_id, payload } => {
                if component_id != entry.component_id {
                    let _ = entry.sender.send(Err(Status::UnrecognizedResult));
                    return Status::Ok;
                }
                match D::decode_tagged(entry.tag, &payload) {
                    Ok(value) => {
                        let _ = entry.sender.send(Ok(value));
                    },
                    Err(status) => {
                        log::debug!(target: LOG_TARGET, "result payload mismatched expected tag: {}", status);
                        let _ = entry.sender.send(Err(Status::UnrecognizedResult));
                    },
                }
                Status::Ok
            },
            Reply::ServiceInfo {
                rpc_version,
                interface_version,
            } => self.complete_handshake(entry, rpc_version, interface_version),
            Reply::ConnectionReply {
                accepted,
                rpc_version,
                interface_version,
            } => {
                if !accepted {
                    *self.state.lock().unwrap() = ConnectionState::Idle;
                    let _ = entry.sender.send(Err(Status::ConnectionRefused));
                    return Status::Ok;
                }
                self.complete_handshake(entry, rpc_version, interface_version)
            },
        }
    }

    fn complete_handshake(
        &self,
        entry: pending::PendingEntry<D>,
        rpc_version: crate::descriptor::InterfaceVersion,
        interface_version: crate::descriptor::InterfaceVersion,
    ) -> Status {
        if !RPC_VERSION.is_compatible_with(rpc_version, false) {
            *self.state.lock().unwrap() = ConnectionState::Idle;
            let _ = entry.sender.send(Err(Status::RpcVersionMismatch));
            return Status::Ok;
        }
        if !D::version().is_compatible_with(interface_version, self.config.strict_interface_version) {
            *self.state.lock().unwrap() = ConnectionState::Idle;
            let _ = entry.sender.send(Err(Status::InterfaceVersionMismatch));
            return Status::Ok;
        }
        *self.state.lock().unwrap() = ConnectionState::Connected;
        let _ = entry.sender.send(Ok(D::unit_payload()));
        Status::Ok
    }
}

impl<D: InterfaceDescriptor, T: Transport, H: BroadcastHandler<D>> Drop for Proxy<D, T, H> {
    fn drop(&mut self) {
        self.teardown();
    }
}
