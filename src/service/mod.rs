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

//! The service side of the correlation engine: decode a client's envelope,
//! dispatch it by component id to a user-supplied [`Dispatcher`], and emit
//! the matching reply or (for subscribed peers) a broadcast.

mod dispatcher;
mod error;
mod subscriptions;

pub use dispatcher::Dispatcher;
pub use error::ServiceError;

use std::{collections::HashSet, hash::Hash, marker::PhantomData, sync::Mutex};

use bytes::BytesMut;

use self::subscriptions::SubscriptionTable;
use crate::{
    codec,
    descriptor::{attribute_wire, AttributeCapabilities, EntryKind, InterfaceDescriptor},
    message::{ClientMessage, Reply, Request, ServerBody, ServerMessage},
    status::{RemoteStatus, Status},
    transport::Transport,
};

const LOG_TARGET: &str = "rpc_bridge::service";

const DEFAULT_SUBSCRIPTION_CAPACITY: usize = 16;

/// Local policy knobs for a [`Service`]; none of these affect wire
/// compatibility. Mirrors `RpcServerBuilder`'s builder-with-defaults shape.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    subscription_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            subscription_capacity: DEFAULT_SUBSCRIPTION_CAPACITY,
        }
    }
}

impl ServiceConfig {
    pub fn with_subscription_capacity(mut self, capacity: usize) -> Self {
        self.subscription_capacity = capacity;
        self
    }
}

/// The service side of one interface, generic over:
/// - `D`: the interface descriptor,
/// - `Disp`: the user's handler for decoded `FIRE` payloads,
/// - `T`: the transport this service's replies and broadcasts go out on,
/// - `P`: a peer identity (`()` for the common single-peer deployment — see
///   §3 of the design notes — a `SocketAddr` or session id for a service
///   multiplexing several logical peers over one transport).
pub struct Service<D, Disp, T, P = ()>
where
    D: InterfaceDescriptor,
    Disp: Dispatcher<D>,
    T: Transport,
    P: Eq + Hash + Clone + Send + Sync + 'static,
{
    transport: T,
    dispatcher: Disp,
    connected: Mutex<HashSet<P>>,
    subscriptions: SubscriptionTable<P>,
    _descriptor: PhantomData<fn() -> D>,
}

impl<D, Disp, T, P> Service<D, Disp, T, P>
where
    D: InterfaceDescriptor,
    Disp: Dispatcher<D>,
    T: Transport,
    P: Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn new(transport: T, dispatcher: Disp) -> Self {
        Self::with_config(transport, dispatcher, ServiceConfig::default())
    }

    pub fn with_config(transport: T, dispatcher: Disp, config: ServiceConfig) -> Self {
        Self {
            transport,
            dispatcher,
            connected: Mutex::new(HashSet::new()),
            subscriptions: SubscriptionTable::with_capacity(config.subscription_capacity),
            _descriptor: PhantomData,
        }
    }

    /// Decode and dispatch one client envelope. A decode failure is reported
    /// only to the caller (the transport layer) — per §4.4, a malformed
    /// envelope has no request id to reply to.
    #[tracing::instrument(name = "service::receive_client_buffer", skip(self, bytes))]
    pub async fn receive_client_buffer(&self, peer: P, bytes: &[u8]) -> Status {
        let client_msg = match codec::decode_client(bytes) {
            Ok(msg) => msg,
            Err(status) => {
                log::debug!(target: LOG_TARGET, "dropping malformed client envelope: {}", status);
                return status;
            },
        };
        self.dispatch(peer, client_msg).await
    }

    /// Emit a `BROADCAST` envelope to every peer currently subscribed to
    /// `component_id`. A no-op (returns `OK`) when nobody is subscribed.
    pub async fn broadcast(&self, component_id: u32, payload: &D::Payload) -> Status {
        if self.subscriptions.subscribers(component_id).is_empty() {
            return Status::Ok;
        }
        let mut buf = BytesMut::new();
        if let Err(status) = D::encode_payload(payload, &mut buf) {
            log::warn!(target: LOG_TARGET, "failed to encode broadcast {}: {}", component_id, status);
            return status;
        }
        self.send_server_message(ServerMessage {
            in_reply_to: None,
            body: ServerBody::Broadcast {
                component_id,
                payload: buf.to_vec(),
            },
        })
        .await
    }

    pub async fn refuse_connection(&self, client_msg: &ClientMessage) -> Status {
        self.send_status(client_msg.id, RemoteStatus::ConnectionRefused).await
    }

    pub async fn refuse_request(&self, client_msg: &ClientMessage) -> Status {
        self.send_status(client_msg.id, RemoteStatus::NotConnected).await
    }

    async fn dispatch(&self, peer: P, client_msg: ClientMessage) -> Status {
        match client_msg.request {
            Request::Connect => {
                self.connected.lock().unwrap().insert(peer);
                self.send_server_message(ServerMessage {
                    in_reply_to: Some(client_msg.id),
                    body: ServerBody::Reply(Reply::ConnectionReply {
                        accepted: true,
                        rpc_version: crate::descriptor::RPC_VERSION,
                        interface_version: D::version(),
                    }),
                })
                .await
            },
            Request::Disconnect => {
                self.connected.lock().unwrap().remove(&peer);
                self.subscriptions.remove_peer(&peer);
                self.send_status(client_msg.id, RemoteStatus::Ok).await
            },
            Request::Fire { component_id, payload } => {
                if !self.connected.lock().unwrap().contains(&peer) {
                    return self.send_status(client_msg.id, RemoteStatus::NotConnected).await;
                }
                self.dispatch_fire(peer, client_msg.id, component_id, &payload).await
            },
        }
    }

    async fn dispatch_fire(&self, peer: P, id: u32, component_id: u32, payload: &[u8]) -> Status {
        match D::entry_kind(component_id) {
            EntryKind::None => self.send_status(id, RemoteStatus::NoSuchComponent).await,
            EntryKind::Attribute(caps) => self.dispatch_attribute(peer, id, component_id, caps, payload).await,
            EntryKind::Broadcast => self.dispatch_broadcast_subscription(peer, id, component_id, payload).await,
            EntryKind::Method => self.dispatch_method(id, component_id, payload).await,
        }
    }

    async fn dispatch_attribute(
        &self,
        peer: P,
        id: u32,
        component_id: u32,
        caps: AttributeCapabilities,
        payload: &[u8],
    ) -> Status {
        let op = match attribute_wire::decode(payload) {
            Some(op) => op,
            None => return self.send_status(id, RemoteStatus::InconsistentRequest).await,
        };
        match op {
            attribute_wire::AttributeOp::Get => {
                if !caps.contains(AttributeCapabilities::READABLE) {
                    return self.send_status(id, RemoteStatus::IllegalOperation).await;
                }
                self.invoke_and_reply(id, component_id, None).await
            },
            attribute_wire::AttributeOp::Set(value_bytes) => {
                if !caps.contains(AttributeCapabilities::SETTABLE) {
                    return self.send_status(id, RemoteStatus::IllegalOperation).await;
                }
                match D::decode_payload(component_id, value_bytes) {
                    Ok(value) => self.invoke_and_reply(id, component_id, Some(value)).await,
                    Err(status) => self.send_status(id, as_remote(status)).await,
                }
            },
            attribute_wire::AttributeOp::Subscribe => {
                if !caps.contains(AttributeCapabilities::SUBSCRIBABLE) {
                    return self.send_status(id, RemoteStatus::IllegalOperation).await;
                }
                self.do_subscribe(peer, id, component_id).await
            },
            attribute_wire::AttributeOp::Unsubscribe => {
                if !caps.contains(AttributeCapabilities::SUBSCRIBABLE) {
                    return self.send_status(id, RemoteStatus::IllegalOperation).await;
                }
                self.do_unsubscribe(peer, id, component_id).await
            },
        }
    }

    async fn dispatch_broadcast_subscription(&self, peer: P, id: u32, component_id: u32, payload: &[u8]) -> Status {
        match attribute_wire::decode(payload) {
            Some(attribute_wire::AttributeOp::Subscribe) => self.do_subscribe(peer, id, component_id).await,
            Some(attribute_wire::AttributeOp::Unsubscribe) => self.do_unsubscribe(peer, id, component_id).await,
            _ => self.send_status(id, RemoteStatus::IllegalOperation).await,
        }
    }

    async fn dispatch_method(&self, id: u32, component_id: u32, payload: &[u8]) -> Status {
        match D::decode_payload(component_id, payload) {
            Ok(input) => self.invoke_and_reply(id, component_id, Some(input)).await,
            Err(status) => self.send_status(id, as_remote(status)).await,
        }
    }

    async fn do_subscribe(&self, peer: P, id: u32, component_id: u32) -> Status {
        self.subscriptions.subscribe(component_id, peer);
        self.dispatcher.on_subscribe(component_id).await;
        log::debug!(target: LOG_TARGET, "peer subscribed to component {}", component_id);
        self.send_status(id, RemoteStatus::Ok).await
    }

    async fn do_unsubscribe(&self, peer: P, id: u32, component_id: u32) -> Status {
        self.subscriptions.unsubscribe(component_id, &peer);
        self.dispatcher.on_unsubscribe(component_id).await;
        log::debug!(target: LOG_TARGET, "peer unsubscribed from component {}", component_id);
        self.send_status(id, RemoteStatus::Ok).await
    }

    async fn invoke_and_reply(&self, id: u32, component_id: u32, input: Option<D::Payload>) -> Status {
        match self.dispatcher.invoke(component_id, input).await {
            Ok(result) => {
                let mut buf = BytesMut::new();
                if let Err(status) = D::encode_payload(&result, &mut buf) {
                    return self.send_status(id, as_remote(status)).await;
                }
                self.send_server_message(ServerMessage {
                    in_reply_to: Some(id),
                    body: ServerBody::Reply(Reply::Result {
                        component_id,
                        payload: buf.to_vec(),
                    }),
                })
                .await
            },
            Err(remote_status) => self.send_status(id, remote_status).await,
        }
    }

    async fn send_status(&self, in_reply_to: u32, status: RemoteStatus) -> Status {
        self.send_server_message(ServerMessage {
            in_reply_to: Some(in_reply_to),
            body: ServerBody::Reply(Reply::Status(status)),
        })
        .await
    }

    async fn send_server_message(&self, msg: ServerMessage) -> Status {
        let mut buf = BytesMut::new();
        let status = codec::encode_server(&msg, &mut buf);
        if status.is_error() {
            log::warn!(target: LOG_TARGET, "failed to encode server message: {}", status);
            return status;
        }
        if let Err(err) = self.transport.send(buf.freeze()).await {
            let err = ServiceError::from(err);
            log::warn!(target: LOG_TARGET, "{}", err);
            // The wire protocol has no vocabulary for a transport failure; the
            // closest `Status` is `ENCODING_FAILURE` since, from the caller's
            // perspective, the buffer never left.
            return Status::EncodingFailure;
        }
        Status::Ok
    }
}

fn as_remote(status: Status) -> RemoteStatus {
    RemoteStatus::try_from(status).unwrap_or(RemoteStatus::InconsistentReply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_config_default_capacity() {
        let config = ServiceConfig::default();
        assert_eq!(config.subscription_capacity, DEFAULT_SUBSCRIPTION_CAPACITY);
        let config = config.with_subscription_capacity(32);
        assert_eq!(config.subscription_capacity, 32);
    }
}
