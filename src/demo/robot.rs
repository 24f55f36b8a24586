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

//! `robot`: one attribute (`motor_power`), one method (`move_to`), one
//! broadcast (`button_press`) — the worked example from the design notes'
//! method round-trip (S1) and attribute/subscription (S7) scenarios.

use bytes::BytesMut;
use prost::Message;

use crate::{
    descriptor::{AttributeCapabilities, EntryKind, InterfaceDescriptor, InterfaceVersion},
    proxy::{BroadcastHandler, Proxy, ProxyConfig},
    status::Status,
    transport::Transport,
};

pub const MOTOR_POWER_ID: u32 = 0;
pub const MOVE_ID: u32 = 1;
pub const BUTTON_PRESS_ID: u32 = 2;

#[derive(Clone, PartialEq, Message)]
pub struct MotorPower {
    #[prost(float, tag = "1")]
    pub value: f32,
}

#[derive(Clone, PartialEq, Message)]
pub struct MoveInput {
    #[prost(float, tag = "1")]
    pub desired_angle_1: f32,
    #[prost(float, tag = "2")]
    pub desired_angle_2: f32,
    #[prost(float, tag = "3")]
    pub desired_angle_3: f32,
}

#[derive(Clone, PartialEq, Message)]
pub struct MoveResult {
    #[prost(float, tag = "1")]
    pub fun_factor: f32,
}

#[derive(Clone, PartialEq, Message)]
pub struct ButtonPress {
    #[prost(uint32, tag = "1")]
    pub button_id: u32,
}

/// The tagged union over every payload `robot` can carry, discriminated by
/// [`Tag`] at the pending table (Design Notes, strategy (a)).
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Unit,
    MotorPower(MotorPower),
    MoveInput(MoveInput),
    MoveResult(MoveResult),
    ButtonPress(ButtonPress),
}

/// Discriminant of [`Payload`], decided at request-issuance time and carried
/// by the pending entry so a `RESULT` reply can be decoded unambiguously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Unit,
    MotorPower,
    MoveResult,
}

fn encode_message<M: Message>(msg: &M, buf: &mut BytesMut) -> Result<(), Status> {
    msg.encode(buf).map_err(|_| Status::EncodingFailure)
}

fn decode_message<M: Message + Default>(bytes: &[u8]) -> Result<M, Status> {
    M::decode(bytes).map_err(|_| Status::DecodingFailure)
}

/// A hand-written stand-in for what a code generator would emit from an
/// interface declaration (out of scope, see crate-level docs).
#[derive(Debug, Clone, Copy)]
pub struct Robot;

impl InterfaceDescriptor for Robot {
    type Payload = Payload;
    type Tag = Tag;

    fn entry_kind(id: u32) -> EntryKind {
        match id {
            MOTOR_POWER_ID => EntryKind::Attribute(AttributeCapabilities::READABLE | AttributeCapabilities::SETTABLE),
            MOVE_ID => EntryKind::Method,
            BUTTON_PRESS_ID => EntryKind::Broadcast,
            _ => EntryKind::None,
        }
    }

    fn decode_payload(id: u32, bytes: &[u8]) -> Result<Self::Payload, Status> {
        match id {
            MOTOR_POWER_ID => Ok(Payload::MotorPower(decode_message(bytes)?)),
            MOVE_ID => Ok(Payload::MoveInput(decode_message(bytes)?)),
            _ => Err(Status::NoSuchComponent),
        }
    }

    fn decode_broadcast_payload(id: u32, bytes: &[u8]) -> Result<Self::Payload, Status> {
        match id {
            BUTTON_PRESS_ID => Ok(Payload::ButtonPress(decode_message(bytes)?)),
            _ => Err(Status::NoSuchComponent),
        }
    }

    fn encode_payload(payload: &Self::Payload, buf: &mut BytesMut) -> Result<(), Status> {
        match payload {
            Payload::Unit => Ok(()),
            Payload::MotorPower(value) => encode_message(value, buf),
            Payload::MoveInput(value) => encode_message(value, buf),
            Payload::MoveResult(value) => encode_message(value, buf),
            Payload::ButtonPress(value) => encode_message(value, buf),
        }
    }

    fn decode_tagged(tag: Self::Tag, bytes: &[u8]) -> Result<Self::Payload, Status> {
        match tag {
            Tag::Unit => Ok(Payload::Unit),
            Tag::MotorPower => Ok(Payload::MotorPower(decode_message(bytes)?)),
            Tag::MoveResult => Ok(Payload::MoveResult(decode_message(bytes)?)),
        }
    }

    fn result_tag_of(method_id: u32) -> Option<Self::Tag> {
        match method_id {
            MOVE_ID => Some(Tag::MoveResult),
            _ => None,
        }
    }

    fn unit_tag() -> Self::Tag {
        Tag::Unit
    }

    fn unit_payload() -> Self::Payload {
        Payload::Unit
    }

    fn version() -> InterfaceVersion {
        InterfaceVersion::new(1, 0, 0)
    }
}

/// Typed sugar over `Proxy<Robot, T, H>` — what a code generator would emit
/// alongside [`Robot`] so callers never touch raw [`Payload`]/[`Tag`] values
/// (§9, "thin generic core + generated typed module").
pub struct RobotProxy<T: Transport, H: BroadcastHandler<Robot>> {
    inner: Proxy<Robot, T, H>,
}

impl<T: Transport, H: BroadcastHandler<Robot>> RobotProxy<T, H> {
    pub fn new(transport: T, handler: H) -> Self {
        Self {
            inner: Proxy::new(transport, handler),
        }
    }

    pub fn with_config(transport: T, handler: H, config: ProxyConfig) -> Self {
        Self {
            inner: Proxy::with_config(transport, handler, config),
        }
    }

    pub async fn connect(&self) -> Result<(), Status> {
        self.inner.connect().await
    }

    pub async fn disconnect(&self) -> Result<(), Status> {
        self.inner.disconnect().await
    }

    /// Feed one received envelope to the correlation engine — hand this to
    /// whatever task pumps bytes off the underlying transport.
    pub async fn receive_service_buffer(&self, bytes: &[u8]) -> Status {
        self.inner.receive_service_buffer(bytes).await
    }

    /// Fail every outstanding completion with `NOT_CONNECTED` without
    /// consuming `self`; also run implicitly when the last handle is dropped.
    pub fn teardown(&self) {
        self.inner.teardown();
    }

    pub async fn get_motor_power(&self) -> Result<f32, Status> {
        match self.inner.get(MOTOR_POWER_ID, Tag::MotorPower).await? {
            Payload::MotorPower(value) => Ok(value.value),
            _ => Err(Status::UnrecognizedResult),
        }
    }

    pub async fn set_motor_power(&self, value: f32) -> Result<(), Status> {
        let mut buf = BytesMut::new();
        encode_message(&MotorPower { value }, &mut buf)?;
        self.inner.set(MOTOR_POWER_ID, buf.to_vec()).await
    }

    pub async fn subscribe_button_press(&self) -> Result<(), Status> {
        self.inner.subscribe(BUTTON_PRESS_ID).await
    }

    pub async fn unsubscribe_button_press(&self) -> Result<(), Status> {
        self.inner.unsubscribe(BUTTON_PRESS_ID).await
    }

    pub async fn move_to(&self, desired_angle_1: f32, desired_angle_2: f32, desired_angle_3: f32) -> Result<f32, Status> {
        let mut buf = BytesMut::new();
        encode_message(
            &MoveInput {
                desired_angle_1,
                desired_angle_2,
                desired_angle_3,
            },
            &mut buf,
        )?;
        match self.inner.fire(MOVE_ID, buf.to_vec(), Tag::MoveResult).await? {
            Payload::MoveResult(result) => Ok(result.fun_factor),
            _ => Err(Status::UnrecognizedResult),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_kinds_match_declaration() {
        assert_eq!(
            Robot::entry_kind(MOTOR_POWER_ID),
            EntryKind::Attribute(AttributeCapabilities::READABLE | AttributeCapabilities::SETTABLE)
        );
        assert_eq!(Robot::entry_kind(MOVE_ID), EntryKind::Method);
        assert_eq!(Robot::entry_kind(BUTTON_PRESS_ID), EntryKind::Broadcast);
        assert_eq!(Robot::entry_kind(99), EntryKind::None);
    }

    #[test]
    fn move_input_round_trips_through_decode_payload() {
        let mut buf = BytesMut::new();
        let input = MoveInput {
            desired_angle_1: -234.0,
            desired_angle_2: 8.0,
            desired_angle_3: 0.001,
        };
        encode_message(&input, &mut buf).unwrap();
        let decoded = Robot::decode_payload(MOVE_ID, &buf).unwrap();
        assert_eq!(decoded, Payload::MoveInput(input));
    }

    #[test]
    fn move_result_decodes_by_tag_not_by_component_id() {
        let mut buf = BytesMut::new();
        let result = MoveResult { fun_factor: 42.0 };
        encode_message(&result, &mut buf).unwrap();
        let decoded = Robot::decode_tagged(Tag::MoveResult, &buf).unwrap();
        assert_eq!(decoded, Payload::MoveResult(result));
    }

    #[test]
    fn unit_tag_ignores_bytes() {
        assert_eq!(Robot::decode_tagged(Tag::Unit, &[]).unwrap(), Payload::Unit);
    }
}
