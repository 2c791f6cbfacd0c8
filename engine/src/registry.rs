// Copyright (C) 2024 The Failover Engine Authors
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! # SwitchRegistry
//!
//! Tracks which switches currently hold an open OpenFlow session, mirroring
//! the original's `_state_change_handler`: a switch is registered on
//! `MAIN_DISPATCHER` and removed on `DEAD_DISPATCHER`. The registry is
//! consulted, not owned, by [`crate::dispatcher::ReactiveDispatcher`]; it
//! never itself sends anything.

use crate::types::SwitchId;
use std::collections::HashMap;
use std::sync::RwLock;

/// A minimal record of one open switch session. Left deliberately small —
/// the engine does not need per-session metadata beyond the dpid today,
/// but gives future collaborators (health checks, per-switch counters) a
/// place to live without threading a new parameter through the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchSession {
    /// The switch this session belongs to.
    pub dp: SwitchId,
}

/// The set of switches currently connected.
#[derive(Debug, Default)]
pub struct SwitchRegistry {
    sessions: RwLock<HashMap<SwitchId, SwitchSession>>,
}

impl SwitchRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        SwitchRegistry {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Record that `dp`'s session is now open.
    pub fn register(&self, dp: SwitchId) {
        self.sessions
            .write()
            .expect("switch registry lock poisoned")
            .insert(dp, SwitchSession { dp });
    }

    /// Record that `dp`'s session has closed.
    pub fn unregister(&self, dp: SwitchId) {
        self.sessions.write().expect("switch registry lock poisoned").remove(&dp);
    }

    /// True if `dp` currently has an open session.
    pub fn is_connected(&self, dp: SwitchId) -> bool {
        self.sessions.read().expect("switch registry lock poisoned").contains_key(&dp)
    }

    /// All currently connected switches.
    pub fn connected_switches(&self) -> Vec<SwitchId> {
        self.sessions
            .read()
            .expect("switch registry lock poisoned")
            .keys()
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_unregister_round_trips() {
        let reg = SwitchRegistry::new();
        let dp = SwitchId(1);
        assert!(!reg.is_connected(dp));
        reg.register(dp);
        assert!(reg.is_connected(dp));
        assert_eq!(reg.connected_switches(), vec![dp]);
        reg.unregister(dp);
        assert!(!reg.is_connected(dp));
    }
}
