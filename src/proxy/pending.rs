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

//! The proxy's pending-request table: `u32 -> PendingEntry`, one entry per
//! in-flight request, each a typed one-shot completion (Design Notes,
//! strategy (a)).

use std::collections::HashMap;

use tokio::sync::oneshot;

use crate::{descriptor::InterfaceDescriptor, status::Status};

pub(crate) struct PendingEntry<D: InterfaceDescriptor> {
    pub tag: D::Tag,
    /// The component id the originating `FIRE` named, `0` for `CONNECT`/
    /// `DISCONNECT`. Checked against an incoming `RESULT`'s own component id
    /// (Invariant 3) before the payload is even decoded.
    pub component_id: u32,
    pub sender: oneshot::Sender<Result<D::Payload, Status>>,
}

pub(crate) struct PendingTable<D: InterfaceDescriptor> {
    entries: HashMap<u32, PendingEntry<D>>,
}

impl<D: InterfaceDescriptor> Default for PendingTable<D> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<D: InterfaceDescriptor> PendingTable<D> {
    /// Register `id`. If `id` collides with an outstanding entry (allocator
    /// wraparound under saturation, §4.5's "break-and-replace" policy), the
    /// older entry is failed with `UNSOLICITED_REPLY` and dropped first —
    /// this is what "displace" means operationally.
    pub fn insert(
        &mut self,
        id: u32,
        tag: D::Tag,
        component_id: u32,
        sender: oneshot::Sender<Result<D::Payload, Status>>,
    ) {
        let entry = PendingEntry {
            tag,
            component_id,
            sender,
        };
        if let Some(displaced) = self.entries.insert(id, entry) {
            let _ = displaced.sender.send(Err(Status::UnsolicitedReply));
        }
    }

    pub fn remove(&mut self, id: u32) -> Option<PendingEntry<D>> {
        self.entries.remove(&id)
    }

    /// Fail and remove every pending entry — used on teardown (§5 "Resource
    /// lifetime") so no awaiter is left hanging.
    pub fn drain_fail(&mut self, status: Status) {
        for (_, entry) in self.entries.drain() {
            let _ = entry.sender.send(Err(status));
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::robot::{Robot, Tag};

    #[test]
    fn displacing_an_id_fails_the_older_future() {
        let mut table: PendingTable<Robot> = PendingTable::default();
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        table.insert(5, Tag::Unit, 0, tx1);
        table.insert(5, Tag::Unit, 0, tx2);
        assert_eq!(table.len(), 1);
        assert_eq!(rx1.blocking_recv().unwrap().unwrap_err(), Status::UnsolicitedReply);
        drop(rx2);
    }

    #[test]
    fn drain_fail_completes_every_entry() {
        let mut table: PendingTable<Robot> = PendingTable::default();
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        table.insert(1, Tag::Unit, 0, tx1);
        table.insert(2, Tag::Unit, 0, tx2);
        table.drain_fail(Status::NotConnected);
        assert_eq!(rx1.blocking_recv().unwrap().unwrap_err(), Status::NotConnected);
        assert_eq!(rx2.blocking_recv().unwrap().unwrap_err(), Status::NotConnected);
        assert_eq!(table.len(), 0);
    }
}
