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

//! The interface descriptor surface.
//!
//! In the reference design a code generator emits, per interface, a type
//! implementing this trait. Without that generator (out of scope, see
//! [crate-level docs](crate)), an interface is declared by hand as a
//! zero-sized type implementing [`InterfaceDescriptor`] — this is exactly
//! what a generator would emit, just typed in by a person instead of a tool.

use bitflags::bitflags;
use bytes::BytesMut;

use crate::status::Status;

bitflags! {
    /// Which operations a declared attribute supports.
    pub struct AttributeCapabilities: u8 {
        const READABLE = 0b001;
        const SETTABLE = 0b010;
        const SUBSCRIBABLE = 0b100;
    }
}

/// What kind of entry a component id names within an interface, or that it
/// names nothing at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Attribute(AttributeCapabilities),
    Method,
    Broadcast,
    None,
}

/// An interface's version triplet. Only `major`/`minor` participate in the
/// compatibility check of §4.5; `patch` is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// This crate's own envelope/handshake protocol version — distinct from any
/// particular interface's `version()`. Carried alongside `interface_version`
/// in every `SERVICE_INFO`/`CONNECTION_REPLY`.
pub const RPC_VERSION: InterfaceVersion = InterfaceVersion::new(1, 0, 0);

impl InterfaceVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// `peer.major == self.major && peer.minor >= self.minor`, per §4.5.
    /// `strict` tightens this to exact `(major, minor)` equality.
    pub fn is_compatible_with(&self, peer: InterfaceVersion, strict: bool) -> bool {
        if peer.major != self.major {
            return false;
        }
        if strict {
            peer.minor == self.minor
        } else {
            peer.minor >= self.minor
        }
    }
}

/// Static data describing one interface's entries and their payload types.
///
/// `Payload` is the tagged union over every attribute/method/broadcast value
/// the interface declares (Design Notes, strategy (a)); `Tag` is the
/// discriminant of that union, used to type-check a pending completion
/// against the result a `RESULT` reply actually carries (§8 property 5).
pub trait InterfaceDescriptor: Send + Sync + 'static {
    type Payload: Send + 'static;
    type Tag: Copy + Eq + Send + Sync + 'static;

    /// What `id` names, or [`EntryKind::None`] if it names nothing.
    fn entry_kind(id: u32) -> EntryKind;

    /// Decode the raw value bytes for `id` into a typed value:  a method's
    /// `In` for a method, or an attribute's `V` for the value half of a `SET`
    /// (the [`attribute_wire`] opcode byte has already been stripped by the
    /// caller — this never sees it). `NO_SUCH_COMPONENT` if `id` is not
    /// declared; `DECODING_FAILURE` if the bytes are malformed.
    fn decode_payload(id: u32, bytes: &[u8]) -> Result<Self::Payload, Status>;

    /// Decode a `BROADCAST` body for `id` — always the entry's raw value type,
    /// never the [`attribute_wire`] opcode convention `decode_payload` uses
    /// for `FIRE`. Kept distinct from `decode_payload` because a broadcast's
    /// component id and a `FIRE`-able subscribable's component id are the
    /// same integer but the two put different bytes on the wire.
    fn decode_broadcast_payload(id: u32, bytes: &[u8]) -> Result<Self::Payload, Status>;

    /// Encode a typed value back into wire bytes (used for method/attribute
    /// results and broadcasts).
    fn encode_payload(payload: &Self::Payload, buf: &mut BytesMut) -> Result<(), Status>;

    /// Decode a `RESULT` body known in advance to carry `tag` — `tag` comes
    /// from the pending entry the `RESULT` completes, not from the wire.
    ///
    /// A `RESULT`'s component id is overloaded: the same attribute id names
    /// both a `GET`'s value and a `SET`'s empty acknowledgement, which are
    /// different payload shapes on the same id. Deciding which shape to
    /// expect from the id alone is ambiguous; deciding it from the tag the
    /// proxy itself chose at request-issuance time (§4.5, strategy (a)) is
    /// not. `decode_payload` is not reused here for that reason.
    fn decode_tagged(tag: Self::Tag, bytes: &[u8]) -> Result<Self::Payload, Status>;

    /// The tag a `RESULT` reply for `method_id` must carry, or `None` if
    /// `method_id` does not name a plain method (attribute/broadcast ids are
    /// ambiguous between operations — see `decode_tagged` — so callers there
    /// decide the expected tag themselves rather than asking the descriptor).
    fn result_tag_of(method_id: u32) -> Option<Self::Tag>;

    /// The tag of a completion that carries no value — `DISCONNECT`,
    /// attribute `SET`, `SUBSCRIBE`/`UNSUBSCRIBE` acknowledgements.
    fn unit_tag() -> Self::Tag;

    /// The payload value completions of `unit_tag()` carry.
    fn unit_payload() -> Self::Payload;

    /// The interface's `(major, minor, patch)`.
    fn version() -> InterfaceVersion;
}

/// Byte-level convention this crate uses so a single opaque `FIRE.payload`
/// can carry get/set/subscribe/unsubscribe against the same attribute or
/// broadcast component id. The envelope codec (§4.2) never looks inside
/// this; [`crate::service::Service`] strips the opcode before handing a
/// `SET`'s value bytes to [`InterfaceDescriptor::decode_payload`].
pub mod attribute_wire {
    const OP_GET: u8 = 0;
    const OP_SET: u8 = 1;
    const OP_SUBSCRIBE: u8 = 2;
    const OP_UNSUBSCRIBE: u8 = 3;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum AttributeOp<'a> {
        Get,
        Set(&'a [u8]),
        Subscribe,
        Unsubscribe,
    }

    pub fn encode_get() -> Vec<u8> {
        vec![OP_GET]
    }

    pub fn encode_set(value: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + value.len());
        buf.push(OP_SET);
        buf.extend_from_slice(value);
        buf
    }

    pub fn encode_subscribe() -> Vec<u8> {
        vec![OP_SUBSCRIBE]
    }

    pub fn encode_unsubscribe() -> Vec<u8> {
        vec![OP_UNSUBSCRIBE]
    }

    /// Parse the opcode-prefixed convention above. `None` if `bytes` is empty
    /// or carries an opcode we don't recognize.
    pub fn decode(bytes: &[u8]) -> Option<AttributeOp<'_>> {
        let (op, rest) = bytes.split_first()?;
        match *op {
            OP_GET => Some(AttributeOp::Get),
            OP_SET => Some(AttributeOp::Set(rest)),
            OP_SUBSCRIBE => Some(AttributeOp::Subscribe),
            OP_UNSUBSCRIBE => Some(AttributeOp::Unsubscribe),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_compatibility() {
        let local = InterfaceVersion::new(1, 2, 0);
        assert!(local.is_compatible_with(InterfaceVersion::new(1, 2, 0), false));
        assert!(local.is_compatible_with(InterfaceVersion::new(1, 5, 0), false));
        assert!(!local.is_compatible_with(InterfaceVersion::new(1, 1, 0), false));
        assert!(!local.is_compatible_with(InterfaceVersion::new(2, 2, 0), false));
        assert!(!local.is_compatible_with(InterfaceVersion::new(1, 5, 0), true));
    }

    #[test]
    fn attribute_wire_round_trips() {
        use attribute_wire::*;
        assert_eq!(decode(&encode_get()), Some(AttributeOp::Get));
        assert_eq!(decode(&encode_subscribe()), Some(AttributeOp::Subscribe));
        assert_eq!(decode(&encode_unsubscribe()), Some(AttributeOp::Unsubscribe));
        let set = encode_set(&[1, 2, 3]);
        assert_eq!(decode(&set), Some(AttributeOp::Set(&[1, 2, 3])));
    }
}
