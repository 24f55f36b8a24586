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

//! Local and wire status taxonomies.
//!
//! `RemoteStatus` is the subset of `Status` that can travel on the wire inside a
//! `STATUS` reply. `Status` is a strict superset covering local-only observations
//! the proxy makes about correlation (`UNSOLICITED_REPLY`, `UNRECOGNIZED_RESULT`)
//! and handshake compatibility (`RPC_VERSION_MISMATCH`, `INTERFACE_VERSION_MISMATCH`).

use thiserror::Error;

/// The unified local status taxonomy. `OK` is guaranteed to be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Status {
    #[error("ok")]
    Ok = 0,
    #[error("decoding failure")]
    DecodingFailure,
    #[error("encoding failure")]
    EncodingFailure,
    #[error("inconsistent request")]
    InconsistentRequest,
    #[error("inconsistent reply")]
    InconsistentReply,
    #[error("illegal operation")]
    IllegalOperation,
    #[error("no such component")]
    NoSuchComponent,
    #[error("not connected")]
    NotConnected,
    #[error("connection refused")]
    ConnectionRefused,
    #[error("unsolicited reply")]
    UnsolicitedReply,
    #[error("unrecognized result")]
    UnrecognizedResult,
    #[error("rpc version mismatch")]
    RpcVersionMismatch,
    #[error("interface version mismatch")]
    InterfaceVersionMismatch,
}

/// The subset of [`Status`] that is meaningful to put on the wire.
///
/// Unknown integers received from a peer decode to `Unknown`, which is mapped
/// locally to [`Status::InconsistentReply`] — a peer that speaks a status
/// vocabulary we don't recognize is indistinguishable from one sending us a
/// reply we can't make sense of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RemoteStatus {
    #[error("remote ok")]
    Ok = 0,
    #[error("remote decoding failure")]
    DecodingFailure,
    #[error("remote encoding failure")]
    EncodingFailure,
    #[error("remote inconsistent request")]
    InconsistentRequest,
    #[error("remote inconsistent reply")]
    InconsistentReply,
    #[error("remote illegal operation")]
    IllegalOperation,
    #[error("remote no such component")]
    NoSuchComponent,
    #[error("remote not connected")]
    NotConnected,
    #[error("remote connection refused")]
    ConnectionRefused,
    #[error("remote unknown status")]
    Unknown,
}

impl Status {
    /// `true` for anything other than `OK`.
    pub fn is_error(self) -> bool {
        self != Status::Ok
    }
}

impl RemoteStatus {
    /// `true` for anything other than `OK`.
    pub fn is_error(self) -> bool {
        self != RemoteStatus::Ok
    }

    /// Decode a wire integer into a `RemoteStatus`, mapping anything
    /// unrecognized to `Unknown` rather than failing outright.
    pub fn from_wire(value: u32) -> Self {
        match value {
            0 => RemoteStatus::Ok,
            1 => RemoteStatus::DecodingFailure,
            2 => RemoteStatus::EncodingFailure,
            3 => RemoteStatus::InconsistentRequest,
            4 => RemoteStatus::InconsistentReply,
            5 => RemoteStatus::IllegalOperation,
            6 => RemoteStatus::NoSuchComponent,
            7 => RemoteStatus::NotConnected,
            8 => RemoteStatus::ConnectionRefused,
            _ => RemoteStatus::Unknown,
        }
    }

    /// Encode this status as the wire integer used in `StatusBody.value`.
    pub fn to_wire(self) -> u32 {
        match self {
            RemoteStatus::Ok => 0,
            RemoteStatus::DecodingFailure => 1,
            RemoteStatus::EncodingFailure => 2,
            RemoteStatus::InconsistentRequest => 3,
            RemoteStatus::InconsistentReply => 4,
            RemoteStatus::IllegalOperation => 5,
            RemoteStatus::NoSuchComponent => 6,
            RemoteStatus::NotConnected => 7,
            RemoteStatus::ConnectionRefused => 8,
            // Never actually emitted by this crate's `Service`; round-trips as
            // itself if some other peer sends a status we didn't recognize.
            RemoteStatus::Unknown => 9,
        }
    }
}

impl From<RemoteStatus> for Status {
    fn from(remote: RemoteStatus) -> Self {
        match remote {
            RemoteStatus::Ok => Status::Ok,
            RemoteStatus::DecodingFailure => Status::DecodingFailure,
            RemoteStatus::EncodingFailure => Status::EncodingFailure,
            RemoteStatus::InconsistentRequest => Status::InconsistentRequest,
            RemoteStatus::InconsistentReply => Status::InconsistentReply,
            RemoteStatus::IllegalOperation => Status::IllegalOperation,
            RemoteStatus::NoSuchComponent => Status::NoSuchComponent,
            RemoteStatus::NotConnected => Status::NotConnected,
            RemoteStatus::ConnectionRefused => Status::ConnectionRefused,
            RemoteStatus::Unknown => Status::InconsistentReply,
        }
    }
}

/// Not every `Status` has wire meaning — the four local-only variants fail
/// this conversion, which is only ever attempted by [`crate::service::Service`]
/// when turning an internal failure into a `STATUS` reply.
impl TryFrom<Status> for RemoteStatus {
    type Error = ();

    fn try_from(status: Status) -> Result<Self, Self::Error> {
        match status {
            Status::Ok => Ok(RemoteStatus::Ok),
            Status::DecodingFailure => Ok(RemoteStatus::DecodingFailure),
            Status::EncodingFailure => Ok(RemoteStatus::EncodingFailure),
            Status::InconsistentRequest => Ok(RemoteStatus::InconsistentRequest),
            Status::InconsistentReply => Ok(RemoteStatus::InconsistentReply),
            Status::IllegalOperation => Ok(RemoteStatus::IllegalOperation),
            Status::NoSuchComponent => Ok(RemoteStatus::NoSuchComponent),
            Status::NotConnected => Ok(RemoteStatus::NotConnected),
            Status::ConnectionRefused => Ok(RemoteStatus::ConnectionRefused),
            Status::UnsolicitedReply |
            Status::UnrecognizedResult |
            Status::RpcVersionMismatch |
            Status::InterfaceVersionMismatch => Err(()),
        }
    }
}
