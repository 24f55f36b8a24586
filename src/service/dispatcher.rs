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

use async_trait::async_trait;

use crate::{descriptor::InterfaceDescriptor, status::RemoteStatus};

/// The user-supplied handler a [`crate::service::Service`] dispatches decoded
/// `FIRE` payloads to. One method call per entry kind would be a wider (and
/// less generic) trait; this crate instead routes every entry through a
/// single `invoke`, matching how `descriptor::InterfaceDescriptor` itself
/// stays generic over the payload variant rather than per-entry typed.
///
/// `on_subscribe`/`on_unsubscribe` are notification hooks only — the
/// subscription table itself is owned and mutated by `Service`, not by the
/// dispatcher.
#[async_trait]
pub trait Dispatcher<D: InterfaceDescriptor>: Send + Sync + 'static {
    /// Perform the attribute-get/attribute-set/method call named by
    /// `component_id`. `input` is `None` for an attribute `GET` (nothing to
    /// decode) and `Some` otherwise — the attribute's new value for a `SET`,
    /// the method's `In` for a method call. Returns the value to carry back
    /// in the `RESULT` reply: the current value for a `GET`, an empty `Unit`
    /// payload for a `SET`, the method's `Out` for a method.
    async fn invoke(&self, component_id: u32, input: Option<D::Payload>) -> Result<D::Payload, RemoteStatus>;

    /// Called after a peer's subscription to `component_id` takes effect.
    async fn on_subscribe(&self, _component_id: u32) {}

    /// Called after a peer's subscription to `component_id` is removed.
    async fn on_unsubscribe(&self, _component_id: u32) {}
}
