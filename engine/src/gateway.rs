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

//! # MessageGateway
//!
//! The engine only ever *builds* [`crate::openflow::OfMessage`] values; the
//! transport-level act of serialising and writing them to a switch's
//! socket is out of scope (spec §1) and lives behind this trait. A
//! [`ChannelGateway`] is provided for tests and the demo `controller`
//! binary; a real deployment would implement this against whatever OpenFlow
//! wire library it uses.

use crate::openflow::OfMessage;
use crate::types::SwitchId;
use std::sync::mpsc::Sender;
use std::sync::Mutex;
use thiserror::Error;

/// Failure to deliver a message to a switch.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The switch has no open session (per [`crate::registry::SwitchRegistry`]).
    #[error("no open session to switch {0}")]
    NotConnected(SwitchId),
    /// The underlying transport rejected the send.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// The one thing the engine asks of its transport: send this message to
/// this switch.
pub trait MessageGateway {
    /// Send `msg` to `dp`. Errors are logged by the dispatcher and do not
    /// otherwise affect control flow (best-effort, spec §5/§7).
    fn send(&self, dp: SwitchId, msg: OfMessage) -> Result<(), GatewayError>;
}

/// A [`MessageGateway`] that forwards every `(dp, msg)` pair over an
/// `mpsc` channel. Used by the `controller` binary's demo wiring and by
/// engine tests that want to assert on emitted messages without a real
/// socket.
pub struct ChannelGateway {
    tx: Mutex<Sender<(SwitchId, OfMessage)>>,
}

impl ChannelGateway {
    /// Wrap `tx` as a gateway.
    pub fn new(tx: Sender<(SwitchId, OfMessage)>) -> Self {
        ChannelGateway { tx: Mutex::new(tx) }
    }
}

impl MessageGateway for ChannelGateway {
    fn send(&self, dp: SwitchId, msg: OfMessage) -> Result<(), GatewayError> {
        self.tx
            .lock()
            .expect("channel gateway lock poisoned")
            .send((dp, msg))
            .map_err(|e| GatewayError::SendFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openflow::{FlowMod, OfpMatch};
    use crate::types::EthType;
    use std::sync::mpsc::channel;

    #[test]
    fn channel_gateway_forwards_sent_messages() {
        let (tx, rx) = channel();
        let gw = ChannelGateway::new(tx);
        let msg = OfMessage::FlowMod(FlowMod::new(
            SwitchId(1),
            OfpMatch {
                eth_type: EthType::Ipv4,
                ipv4_src: None,
                ipv4_dst: None,
                in_port: None,
            },
            vec![],
        ));
        gw.send(SwitchId(1), msg.clone()).unwrap();
        let (dp, received) = rx.recv().unwrap();
        assert_eq!(dp, SwitchId(1));
        assert_eq!(received, msg);
    }
}
