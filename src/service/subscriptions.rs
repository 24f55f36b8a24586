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

//! Per-component, per-peer subscription set. Guarded by its own lock,
//! independent of whatever the rest of `Service` locks, per §5.

use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
    sync::Mutex,
};

pub struct SubscriptionTable<P> {
    entries: Mutex<HashMap<u32, HashSet<P>>>,
    capacity_hint: usize,
}

impl<P> SubscriptionTable<P>
where
    P: Eq + Hash + Clone,
{
    pub fn with_capacity(capacity_hint: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::with_capacity(capacity_hint)),
            capacity_hint,
        }
    }

    /// Idempotent: subscribing twice is a no-op the second time.
    pub fn subscribe(&self, component_id: u32, peer: P) {
        let mut entries = self.entries.lock().unwrap();
        entries
            .entry(component_id)
            .or_insert_with(|| HashSet::with_capacity(self.capacity_hint))
            .insert(peer);
    }

    /// Succeeds even if `peer` was never subscribed.
    pub fn unsubscribe(&self, component_id: u32, peer: &P) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(peers) = entries.get_mut(&component_id) {
            peers.remove(peer);
        }
    }

    /// Drop `peer` from every component's subscriber set, e.g. on disconnect.
    pub fn remove_peer(&self, peer: &P) {
        let mut entries = self.entries.lock().unwrap();
        for peers in entries.values_mut() {
            peers.remove(peer);
        }
    }

    pub fn subscribers(&self, component_id: u32) -> Vec<P> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(&component_id)
            .map(|peers| peers.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_unsubscribe_is_idempotent() {
        let table: SubscriptionTable<u32> = SubscriptionTable::with_capacity(4);
        table.subscribe(7, 1);
        table.subscribe(7, 1);
        assert_eq!(table.subscribers(7), vec![1]);
        table.unsubscribe(7, &1);
        table.unsubscribe(7, &1);
        assert!(table.subscribers(7).is_empty());
    }

    #[test]
    fn remove_peer_clears_all_components() {
        let table: SubscriptionTable<u32> = SubscriptionTable::with_capacity(4);
        table.subscribe(1, 9);
        table.subscribe(2, 9);
        table.remove_peer(&9);
        assert!(table.subscribers(1).is_empty());
        assert!(table.subscribers(2).is_empty());
    }
}
