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

//! Pure envelope encode/decode. Nothing here touches a socket, a mutex, or a
//! dispatch table — it only ever turns a [`ClientMessage`]/[`ServerMessage`]
//! into bytes and back, per §4.2.

use bytes::BytesMut;
use prost::Message;

use crate::{
    message::{ClientMessage, Reply, Request, ServerBody, ServerMessage},
    proto,
    status::{RemoteStatus, Status},
};

const LOG_TARGET: &str = "rpc_bridge::codec";

pub fn encode_client(msg: &ClientMessage, dst: &mut BytesMut) -> Status {
    let wire = proto::ClientMessage {
        id: msg.id,
        r#type: request_type_tag(&msg.request) as i32,
        fire: match &msg.request {
            Request::Fire { component_id, payload } => Some(proto::FireBody {
                component_id: *component_id,
                payload: payload.clone(),
            }),
            _ => None,
        },
    };
    match wire.encode(dst) {
        Ok(()) => Status::Ok,
        Err(err) => {
            log::warn!(target: LOG_TARGET, "failed to encode ClientMessage: {}", err);
            Status::EncodingFailure
        },
    }
}

pub fn decode_client(src: &[u8]) -> Result<ClientMessage, Status> {
    let wire = proto::ClientMessage::decode(src).map_err(|err| {
        log::debug!(target: LOG_TARGET, "failed to decode ClientMessage: {}", err);
        Status::DecodingFailure
    })?;

    let request = match proto::RequestType::from_i32(wire.r#type) {
        Some(proto::RequestType::Connect) => Request::Connect,
        Some(proto::RequestType::Disconnect) => Request::Disconnect,
        Some(proto::RequestType::Fire) => {
            let fire = wire.fire.ok_or(Status::InconsistentRequest)?;
            Request::Fire {
                component_id: fire.component_id,
                payload: fire.payload,
            }
        },
        None => return Err(Status::InconsistentRequest),
    };

    Ok(ClientMessage { id: wire.id, request })
}

pub fn encode_server(msg: &ServerMessage, dst: &mut BytesMut) -> Status {
    let (body_type, broadcast, reply) = match &msg.body {
        ServerBody::Broadcast { component_id, payload } => (
            proto::BodyType::Broadcast,
            Some(proto::BroadcastBody {
                component_id: *component_id,
                payload: payload.clone(),
            }),
            None,
        ),
        ServerBody::Reply(reply) => (proto::BodyType::Reply, None, Some(encode_reply(reply))),
    };

    let wire = proto::ServerMessage {
        in_reply_to: msg.in_reply_to,
        body_type: body_type as i32,
        broadcast,
        reply,
    };
    match wire.encode(dst) {
        Ok(()) => Status::Ok,
        Err(err) => {
            log::warn!(target: LOG_TARGET, "failed to encode ServerMessage: {}", err);
            Status::EncodingFailure
        },
    }
}

pub fn decode_server(src: &[u8]) -> Result<ServerMessage, Status> {
    let wire = proto::ServerMessage::decode(src).map_err(|err| {
        log::debug!(target: LOG_TARGET, "failed to decode ServerMessage: {}", err);
        Status::DecodingFailure
    })?;

    let body = match proto::BodyType::from_i32(wire.body_type) {
        Some(proto::BodyType::Broadcast) => {
            let broadcast = wire.broadcast.ok_or(Status::InconsistentReply)?;
            if wire.in_reply_to.is_some() {
                return Err(Status::InconsistentReply);
            }
            ServerBody::Broadcast {
                component_id: broadcast.component_id,
                payload: broadcast.payload,
            }
        },
        Some(proto::BodyType::Reply) => {
            let reply = wire.reply.ok_or(Status::InconsistentReply)?;
            if wire.in_reply_to.is_none() {
                return Err(Status::InconsistentReply);
            }
            ServerBody::Reply(decode_reply(reply)?)
        },
        None => return Err(Status::InconsistentReply),
    };

    Ok(ServerMessage {
        in_reply_to: wire.in_reply_to,
        body,
    })
}

fn request_type_tag(request: &Request) -> proto::RequestType {
    match request {
        Request::Connect => proto::RequestType::Connect,
        Request::Disconnect => proto::RequestType::Disconnect,
        Request::Fire { .. } => proto::RequestType::Fire,
    }
}

fn encode_reply(reply: &Reply) -> proto::Reply {
    let mut wire = proto::Reply {
        r#type: 0,
        status: None,
        result: None,
        service_info: None,
        connection_reply: None,
    };
    match reply {
        Reply::Status(value) => {
            wire.r#type = proto::ReplyType::Status as i32;
            wire.status = Some(proto::StatusBody { value: value.to_wire() });
        },
        Reply::Result { component_id, payload } => {
            wire.r#type = proto::ReplyType::Result as i32;
            wire.result = Some(proto::ResultBody {
                component_id: *component_id,
                payload: payload.clone(),
            });
        },
        Reply::ServiceInfo {
            rpc_version,
            interface_version,
        } => {
            wire.r#type = proto::ReplyType::ServiceInfo as i32;
            wire.service_info = Some(proto::ServiceInfoBody {
                rpc_version: Some((*rpc_version).into()),
                interface_version: Some((*interface_version).into()),
            });
        },
        Reply::ConnectionReply {
            accepted,
            rpc_version,
            interface_version,
        } => {
            wire.r#type = proto::ReplyType::ConnectionReply as i32;
            wire.connection_reply = Some(proto::ConnectionReplyBody {
                r#type: if *accepted {
                    proto::ConnectionReplyType::Accept as i32
                } else {
                    proto::ConnectionReplyType::Refusal as i32
                },
                rpc_version: Some((*rpc_version).into()),
                interface_version: Some((*interface_version).into()),
            });
        },
    }
    wire
}

fn decode_reply(wire: proto::Reply) -> Result<Reply, Status> {
    match proto::ReplyType::from_i32(wire.r#type) {
        Some(proto::ReplyType::Status) => {
            let status = wire.status.ok_or(Status::InconsistentReply)?;
            Ok(Reply::Status(RemoteStatus::from_wire(status.value)))
        },
        Some(proto::ReplyType::Result) => {
            let result = wire.result.ok_or(Status::InconsistentReply)?;
            Ok(Reply::Result {
                component_id: result.component_id,
                payload: result.payload,
            })
        },
        Some(proto::ReplyType::ServiceInfo) => {
            let info = wire.service_info.ok_or(Status::InconsistentReply)?;
            Ok(Reply::ServiceInfo {
                rpc_version: info.rpc_version.ok_or(Status::InconsistentReply)?.into(),
                interface_version: info.interface_version.ok_or(Status::InconsistentReply)?.into(),
            })
        },
        Some(proto::ReplyType::ConnectionReply) => {
            let cr = wire.connection_reply.ok_or(Status::InconsistentReply)?;
            let accepted = match proto::ConnectionReplyType::from_i32(cr.r#type) {
                Some(proto::ConnectionReplyType::Accept) => true,
                Some(proto::ConnectionReplyType::Refusal) => false,
                None => return Err(Status::InconsistentReply),
            };
            Ok(Reply::ConnectionReply {
                accepted,
                rpc_version: cr.rpc_version.ok_or(Status::InconsistentReply)?.into(),
                interface_version: cr.interface_version.ok_or(Status::InconsistentReply)?.into(),
            })
        },
        None => Err(Status::InconsistentReply),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::InterfaceVersion;

    #[test]
    fn client_message_round_trips() {
        for msg in [
            ClientMessage {
                id: 1,
                request: Request::Connect,
            },
            ClientMessage {
                id: 2,
                request: Request::Disconnect,
            },
            ClientMessage {
                id: 3,
                request: Request::Fire {
                    component_id: 7,
                    payload: vec![1, 2, 3],
                },
            },
        ] {
            let mut buf = BytesMut::new();
            assert_eq!(encode_client(&msg, &mut buf), Status::Ok);
            let decoded = decode_client(&buf).unwrap();
            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn server_message_round_trips() {
        let iv = InterfaceVersion::new(1, 0, 0);
        for msg in [
            ServerMessage {
                in_reply_to: Some(5),
                body: ServerBody::Reply(Reply::Status(RemoteStatus::Ok)),
            },
            ServerMessage {
                in_reply_to: Some(6),
                body: ServerBody::Reply(Reply::Result {
                    component_id: 1,
                    payload: vec![9, 9],
                }),
            },
            ServerMessage {
                in_reply_to: Some(7),
                body: ServerBody::Reply(Reply::ServiceInfo {
                    rpc_version: iv,
                    interface_version: iv,
                }),
            },
            ServerMessage {
                in_reply_to: Some(8),
                body: ServerBody::Reply(Reply::ConnectionReply {
                    accepted: true,
                    rpc_version: iv,
                    interface_version: iv,
                }),
            },
            ServerMessage {
                in_reply_to: None,
                body: ServerBody::Broadcast {
                    component_id: 2,
                    payload: vec![4, 4],
                },
            },
        ] {
            let mut buf = BytesMut::new();
            assert_eq!(encode_server(&msg, &mut buf), Status::Ok);
            let decoded = decode_server(&buf).unwrap();
            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn garbage_bytes_decode_to_decoding_failure() {
        let err = decode_client(&[0xff, 0xff, 0xff]).unwrap_err();
        assert_eq!(err, Status::DecodingFailure);
    }

    #[test]
    fn reply_without_matching_payload_is_inconsistent() {
        // A REPLY body_type with no `reply` sub-message set.
        let wire = proto::ServerMessage {
            in_reply_to: Some(1),
            body_type: proto::BodyType::Reply as i32,
            broadcast: None,
            reply: None,
        };
        let mut buf = BytesMut::new();
        wire.encode(&mut buf).unwrap();
        let err = decode_server(&buf).unwrap_err();
        assert_eq!(err, Status::InconsistentReply);
    }
}
