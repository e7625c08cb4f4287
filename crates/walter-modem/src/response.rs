//! The response object populated by handlers and returned to `run_cmd`
//! callers (spec data model §3). Ground: `structs.py::ModemRsp` and its
//! nested payload structs, ported field-for-field; `ModemRsp` itself is
//! modelled as a tagged union here rather than one struct with every field
//! optional, since only one payload kind is ever live at a time.

use heapless::{String, Vec};

use crate::error::{CmeError, ModemResult};

pub const MAX_NAME_LEN: usize = 32;
pub const MAX_BANDS: usize = 20;
pub const MAX_PDP_ADDRESSES: usize = 2;
pub const MAX_SATELLITES: usize = 32;
pub const HTTP_BODY_CAPACITY: usize = 1536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpState {
    Minimum,
    Full,
    NoRf,
    Manufacturing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegState {
    NotSearching,
    Home,
    Searching,
    Denied,
    Unknown,
    Roaming,
    HomeSmsOnly,
    RoamingSmsOnly,
    EmergencyOnly,
    HomeNoCsfb,
    RoamingNoCsfb,
    EmergencyNoCsfb,
}

impl RegState {
    pub fn from_cereg_code(code: u8) -> Self {
        match code {
            0 => Self::NotSearching,
            1 => Self::Home,
            2 => Self::Searching,
            3 => Self::Denied,
            5 => Self::Roaming,
            6 => Self::HomeSmsOnly,
            7 => Self::RoamingSmsOnly,
            8 => Self::EmergencyOnly,
            9 => Self::HomeNoCsfb,
            10 => Self::RoamingNoCsfb,
            11 => Self::EmergencyNoCsfb,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    Ready,
    PinRequired,
    PukRequired,
    PhoneToSimPinRequired,
    PhoneToFirstSimPinRequired,
    PhoneToFirstSimPukRequired,
    Pin2Required,
    Puk2Required,
    NetworkPinRequired,
    NetworkPukRequired,
    NetworkSubsetPinRequired,
    NetworkSubsetPukRequired,
    ServiceProviderPinRequired,
    ServiceProviderPukRequired,
    CorporateSimRequired,
    CorporatePukRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rat {
    LteM = 0,
    NbIot = 1,
}

#[derive(Debug, Clone, Copy)]
pub struct SignalQuality {
    pub rsrq: i32,
    pub rsrp: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct Operator {
    pub name_len: u8,
    pub name: [u8; MAX_NAME_LEN],
}

#[derive(Debug, Clone, Copy)]
pub struct BandSelection {
    pub rat: Rat,
    pub net_operator: Operator,
    pub bands: [u16; MAX_BANDS],
    pub band_count: u8,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub http_status: u16,
    pub content_length: usize,
    pub content_type: String<MAX_NAME_LEN>,
    pub data: Vec<u8, HTTP_BODY_CAPACITY>,
}

#[derive(Debug, Clone, Copy)]
pub struct MqttResponse {
    pub qos: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct GnssAssistanceDetails {
    pub available: bool,
    pub last_update: i32,
    pub time_to_update: i32,
    pub time_to_expire: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct GnssAssistance {
    pub almanac: GnssAssistanceDetails,
    pub realtime_ephemeris: GnssAssistanceDetails,
    pub predicted_ephemeris: GnssAssistanceDetails,
}

#[derive(Debug, Clone, Copy)]
pub struct GnssSatellite {
    pub sat_no: u16,
    pub signal_strength: i16,
}

#[derive(Debug, Clone, Copy)]
pub struct GnssFix {
    pub fix_id: u8,
    pub timestamp: i64,
    pub time_to_fix: u32,
    pub estimated_confidence: f32,
    pub latitude: f32,
    pub longitude: f32,
    pub height: f32,
    pub north_speed: f32,
    pub east_speed: f32,
    pub down_speed: f32,
    pub sats: [GnssSatellite; MAX_SATELLITES],
    pub sat_count: u8,
}

impl Default for GnssFix {
    fn default() -> Self {
        Self {
            fix_id: 0,
            timestamp: 0,
            time_to_fix: 0,
            estimated_confidence: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            height: 0.0,
            north_speed: 0.0,
            east_speed: 0.0,
            down_speed: 0.0,
            sats: [GnssSatellite {
                sat_no: 0,
                signal_strength: 0,
            }; MAX_SATELLITES],
            sat_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CellInformation {
    pub cc: u16,
    pub nc: u16,
    pub rsrp: f32,
    pub cinr: f32,
    pub rsrq: f32,
    pub tac: u32,
    pub pci: u32,
    pub earfcn: u32,
    pub rssi: f32,
    pub paging: u32,
    pub cid: u32,
    pub band: u32,
    pub bw: u32,
    pub ce_level: u32,
}

impl Default for CellInformation {
    fn default() -> Self {
        Self {
            cc: 0,
            nc: 0,
            rsrp: 0.0,
            cinr: 0.0,
            rsrq: 0.0,
            tac: 0,
            pci: 0,
            earfcn: 0,
            rssi: 0.0,
            paging: 0,
            cid: 0,
            band: 0,
            bw: 0,
            ce_level: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PdpAddresses {
    pub count: u8,
    pub addresses: [[u8; 46]; MAX_PDP_ADDRESSES],
    pub lens: [u8; MAX_PDP_ADDRESSES],
}

/// The response payload, discriminated the same way `ModemRspType` is in
/// the original (spec data model §3's `response kind`).
#[derive(Debug, Clone)]
pub enum ResponsePayload {
    NoData,
    OpState(OpState),
    Rat(Rat),
    Rssi(i32),
    SignalQuality(SignalQuality),
    SimState(SimState),
    CmeError(CmeError),
    BandSetConfig(Vec<BandSelection, 8>),
    PdpAddr(PdpAddresses),
    SocketId(u8),
    GnssAssistanceData(GnssAssistance),
    Clock(i64),
    Mqtt(MqttResponse),
    Http(HttpResponse),
    Coap,
    CellInfo(CellInformation),
    RegState(RegState),
}

/// Sum-typed response container a command populates and `run_cmd` hands
/// back to the caller.
#[derive(Debug, Clone)]
pub struct ModemResponse {
    pub result: ModemResult,
    pub payload: ResponsePayload,
}

impl ModemResponse {
    pub fn new() -> Self {
        Self {
            result: ModemResult::Ok,
            payload: ResponsePayload::NoData,
        }
    }

    /// Mirrors `_run_cmd`'s success rule: `Ok`, or `NoData` carrying an HTTP
    /// response (the `<<<` handler path sets result to `NoData` when the
    /// profile state was wrong, but a successful body fetch still reports
    /// `Ok` with an `Http` payload; HTTP reads that legitimately return no
    /// body also count as success).
    pub fn is_success(&self) -> bool {
        matches!(self.result, ModemResult::Ok)
            || (matches!(self.result, ModemResult::NoData)
                && matches!(self.payload, ResponsePayload::Http(_)))
    }
}

impl Default for ModemResponse {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reg_state_maps_known_cereg_codes() {
        assert_eq!(RegState::from_cereg_code(1), RegState::Home);
        assert_eq!(RegState::from_cereg_code(5), RegState::Roaming);
        assert_eq!(RegState::from_cereg_code(99), RegState::Unknown);
    }

    #[test]
    fn default_response_is_ok_no_data() {
        let rsp = ModemResponse::new();
        assert_eq!(rsp.result, ModemResult::Ok);
        assert!(rsp.is_success());
    }

    #[test]
    fn http_no_data_result_still_counts_as_success() {
        let rsp = ModemResponse {
            result: ModemResult::NoData,
            payload: ResponsePayload::Http(HttpResponse {
                http_status: 200,
                content_length: 0,
                content_type: String::new(),
                data: Vec::new(),
            }),
        };
        assert!(rsp.is_success());
    }

    #[test]
    fn plain_error_is_not_success() {
        let rsp = ModemResponse {
            result: ModemResult::Error,
            payload: ResponsePayload::NoData,
        };
        assert!(!rsp.is_success());
    }
}
