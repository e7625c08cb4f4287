//! Bounds-checked resource identifiers.
//!
//! Each mirror table is indexed by one of these newtypes rather than a bare
//! `u8`, so an out-of-range id fails at construction time instead of being
//! forwarded to the wire (spec boundary behaviour B4).

use crate::error::WalterError;
use core::convert::TryFrom;

use crate::config::{MAX_COAP_CONTEXTS, MAX_HTTP_PROFILES, MAX_PDP_CONTEXTS, MAX_SOCKETS};

/// 1-based PDP context id, valid range `1..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PdpContextId(u8);

impl PdpContextId {
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for PdpContextId {
    type Error = WalterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=MAX_PDP_CONTEXTS as u8).contains(&value) {
            Ok(Self(value))
        } else {
            Err(WalterError::InvalidPdpContext(value))
        }
    }
}

/// 1-based socket id, valid range `1..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SocketId(u8);

impl SocketId {
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for SocketId {
    type Error = WalterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=MAX_SOCKETS as u8).contains(&value) {
            Ok(Self(value))
        } else {
            Err(WalterError::InvalidSocket(value))
        }
    }
}

/// 0-based HTTP profile id, valid range `0..=2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HttpProfileId(u8);

impl HttpProfileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for HttpProfileId {
    type Error = WalterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (value as usize) < MAX_HTTP_PROFILES {
            Ok(Self(value))
        } else {
            Err(WalterError::InvalidHttpProfile(value))
        }
    }
}

/// 0-based CoAP context id, valid range `0..=2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoapContextId(u8);

impl CoapContextId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for CoapContextId {
    type Error = WalterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (value as usize) < MAX_COAP_CONTEXTS {
            Ok(Self(value))
        } else {
            Err(WalterError::InvalidCoapContext(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdp_context_id_rejects_out_of_range() {
        assert!(PdpContextId::try_from(0).is_err());
        assert!(PdpContextId::try_from(9).is_err());
        assert!(PdpContextId::try_from(1).is_ok());
        assert!(PdpContextId::try_from(8).is_ok());
    }

    #[test]
    fn socket_id_indexes_are_zero_based() {
        let id = SocketId::try_from(1).unwrap();
        assert_eq!(id.index(), 0);
        let id = SocketId::try_from(6).unwrap();
        assert_eq!(id.index(), 5);
        assert!(SocketId::try_from(7).is_err());
    }

    #[test]
    fn http_profile_id_accepts_zero() {
        assert!(HttpProfileId::try_from(0).is_ok());
        assert!(HttpProfileId::try_from(2).is_ok());
        assert!(HttpProfileId::try_from(3).is_err());
    }
}
