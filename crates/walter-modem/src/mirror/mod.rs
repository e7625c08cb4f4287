//! Library-owned mirror state (spec §3, §4.5): the driver's best-known view
//! of modem-side resources, updated only by the dispatcher as responses and
//! URCs arrive.

pub mod coap;
pub mod gnss;
pub mod http;
pub mod mqtt;
pub mod network;
pub mod pdp;
pub mod socket;

pub use coap::CoapTable;
pub use gnss::GnssWaiterTable;
pub use http::HttpTable;
pub use mqtt::MqttMirror;
pub use network::{NetworkState, NetworkStateView};
pub use pdp::PdpTable;
pub use socket::SocketTable;

/// Every piece of mirror state the dispatcher owns, bundled so `reset()`
/// zeroes the lot in one call (spec L2: "`reset` followed by reading any
/// mirror table yields the zero-initialised table").
pub struct Mirror {
    pub pdp: PdpTable,
    pub socket: SocketTable,
    pub http: HttpTable,
    pub coap: CoapTable,
    pub mqtt: MqttMirror,
    pub gnss: GnssWaiterTable,
    pub network: NetworkState,
}

impl Mirror {
    pub fn new() -> Self {
        Self {
            pdp: PdpTable::new(),
            socket: SocketTable::new(),
            http: HttpTable::new(),
            coap: CoapTable::new(),
            mqtt: MqttMirror::new(),
            gnss: GnssWaiterTable::new(),
            network: NetworkState::new(),
        }
    }

    pub fn reset(&mut self) {
        self.pdp.reset();
        self.socket.reset();
        self.http.reset();
        self.coap.reset();
        self.mqtt.reset();
        self.gnss.reset();
        self.network.reset();
    }
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_zeroes_every_sub_table() {
        let mut mirror = Mirror::new();
        mirror.pdp.lease_free().unwrap();
        mirror.socket.lease_free().unwrap();
        mirror.gnss.register().unwrap();
        mirror.reset();

        assert!(mirror.gnss.is_empty());
        let id = crate::types::PdpContextId::try_from(1).unwrap();
        assert_eq!(mirror.pdp.get(id).state, pdp::PdpState::Free);
    }
}
