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

//! Ergonomic, hand-written envelope types layered over the `prost`-generated
//! wire structs in [`crate::proto`]. Nothing here is opaque to us (unlike
//! interface payloads): the envelope shape is owned by this crate.

use crate::{descriptor::InterfaceVersion, proto, status::RemoteStatus};

/// One client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMessage {
    pub id: u32,
    pub request: Request,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Connect,
    Disconnect,
    Fire { component_id: u32, payload: Vec<u8> },
}

/// One server message: either a broadcast (no `in_reply_to`) or a reply to
/// a specific client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerMessage {
    pub in_reply_to: Option<u32>,
    pub body: ServerBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerBody {
    Broadcast { component_id: u32, payload: Vec<u8> },
    Reply(Reply),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Status(RemoteStatus),
    Result { component_id: u32, payload: Vec<u8> },
    ServiceInfo {
        rpc_version: InterfaceVersion,
        interface_version: InterfaceVersion,
    },
    ConnectionReply {
        accepted: bool,
        rpc_version: InterfaceVersion,
        interface_version: InterfaceVersion,
    },
}

impl From<InterfaceVersion> for proto::VersionTriplet {
    fn from(v: InterfaceVersion) -> Self {
        proto::VersionTriplet {
            major: v.major,
            minor: v.minor,
            patch: v.patch,
        }
    }
}

impl From<proto::VersionTriplet> for InterfaceVersion {
    fn from(v: proto::VersionTriplet) -> Self {
        InterfaceVersion::new(v.major, v.minor, v.patch)
    }
}
