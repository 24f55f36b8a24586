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

//! A strongly-typed request/response RPC core.
//!
//! A [`proxy::Proxy`] and a [`service::Service`] correlate requests and
//! replies across an opaque, ordered, reliable byte transport, exchanging
//! envelopes ([`message`]) that carry one attribute/method/broadcast payload
//! apiece. What those payloads mean is owned entirely by an
//! [`descriptor::InterfaceDescriptor`] implementation; this crate never looks
//! inside one.
//!
//! Code generation from an interface description is out of scope here — see
//! [`demo`] for a hand-written example of what a generator would emit.

pub(crate) mod proto {
    include!(concat!(env!("OUT_DIR"), "/rpc_bridge.envelope.rs"));
}

pub mod codec;
pub mod demo;
pub mod descriptor;
pub mod message;
pub mod proxy;
pub mod service;
pub mod status;
pub mod transport;

pub use descriptor::{AttributeCapabilities, EntryKind, InterfaceDescriptor, InterfaceVersion};
pub use message::{ClientMessage, Reply, Request, ServerBody, ServerMessage};
pub use proxy::{BroadcastHandler, Proxy, ProxyConfig, ProxyError};
pub use service::{Dispatcher, Service, ServiceConfig, ServiceError};
pub use status::{RemoteStatus, Status};
pub use transport::{Transport, TransportError};
