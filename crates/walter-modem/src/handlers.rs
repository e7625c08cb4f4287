//! Core response handlers (spec §4.4): one function per framing-critical
//! prefix, ported semantically from `core.py::_process_queue_rsp`.
//!
//! Every handler has the same shape: inspect the frame, mutate mirror state
//! and/or the response object, and report what the dispatcher should do with
//! the current command. Handlers never panic on malformed input; a frame that
//! doesn't parse the way the handler expects is logged and treated as
//! pass-through, leaving the expected-prefix rule to decide the command's
//! fate.

use heapless::{String, Vec};

use crate::dispatcher::{HandlerFn, HandlerOutcome};
use crate::error::{CmeError, ModemResult};
use crate::log::my_warn;
use crate::mirror::http::HttpCtxState;
use crate::mirror::Mirror;
use crate::response::{
    BandSelection, CellInformation, GnssFix, GnssSatellite, HttpResponse, ModemResponse, OpState,
    Operator, Rat, RegState, ResponsePayload, SignalQuality, MAX_SATELLITES,
};
use crate::types::SocketId;

/// Ordered `(prefix, handler)` table consulted before application-registered
/// handlers (spec §4.4 step 1).
pub const CORE_HANDLERS: &[(&[u8], HandlerFn)] = &[
    (b"+CME ERROR", handle_cme_error),
    (b"ERROR", handle_error),
    (b"OK", handle_ok),
    (b"+CEREG", handle_cereg),
    (b"+CSQ", handle_csq),
    (b"+CESQ", handle_cesq),
    (b"+CCLK", handle_cclk),
    (b"+CFUN", handle_cfun),
    (b"+CPIN", handle_cpin),
    (b"+CGPADDR", handle_cgpaddr),
    (b"+SQNMODEACTIVE", handle_sqnmodeactive),
    (b"+SQNBANDSEL", handle_sqnbandsel),
    (b"+SQNHTTPRING", handle_sqnhttpring),
    (b"+SQNHTTPCONNECT", handle_sqnhttpconnect),
    (b"+SQNHTTPDISCONNECT", handle_sqnhttpdisconnect),
    (b"+SQNHTTPSH", handle_sqnhttpsh),
    (b"+SQNSH", handle_sqnsh),
    (b"+LPGNSSFIXREADY", handle_lpgnssfixready),
    (b"+LPGNSSASSISTANCE", handle_lpgnssassistance),
    (b"+SQNMONI", handle_sqnmoni),
    (b"<<<", handle_http_body),
    (b"+SYSSTART", handle_passthrough),
    (b">", handle_passthrough),
];

fn handle_passthrough(_frame: &[u8], _mirror: &mut Mirror, _response: &mut ModemResponse) -> HandlerOutcome {
    HandlerOutcome::PassThrough
}

fn as_text(frame: &[u8]) -> &str {
    core::str::from_utf8(frame).unwrap_or("")
}

/// Everything after `prefix: ` as a comma-separated field iterator.
fn fields_after<'a>(frame: &'a [u8], prefix: &str) -> impl Iterator<Item = &'a str> {
    let text = as_text(frame);
    let rest = text
        .strip_prefix(prefix)
        .map(|r| r.trim_start_matches(':').trim_start())
        .unwrap_or("");
    rest.split(',').map(str::trim)
}

fn handle_ok(_frame: &[u8], _mirror: &mut Mirror, _response: &mut ModemResponse) -> HandlerOutcome {
    HandlerOutcome::ConsumeOk
}

/// Bare `ERROR`: mark the command for retry rather than completing it
/// immediately (spec §4.4 retry rule).
fn handle_error(_frame: &[u8], _mirror: &mut Mirror, response: &mut ModemResponse) -> HandlerOutcome {
    response.result = ModemResult::Error;
    HandlerOutcome::ConsumeRetry
}

/// `+CME ERROR: <n>`: capture the CME code, mark for retry.
fn handle_cme_error(frame: &[u8], _mirror: &mut Mirror, response: &mut ModemResponse) -> HandlerOutcome {
    let code = fields_after(frame, "+CME ERROR")
        .next()
        .and_then(|f| f.parse::<u16>().ok());
    match code {
        Some(code) => {
            response.result = ModemResult::Error;
            response.payload = ResponsePayload::CmeError(CmeError::from_code(code));
        }
        None => {
            my_warn!("handlers", "unparsable +CME ERROR frame");
            response.result = ModemResult::Error;
        }
    }
    HandlerOutcome::ConsumeRetry
}

/// `+CEREG: <n>[,...]`: update registration-state mirror.
fn handle_cereg(frame: &[u8], mirror: &mut Mirror, response: &mut ModemResponse) -> HandlerOutcome {
    let Some(code) = fields_after(frame, "+CEREG")
        .last()
        .and_then(|f| f.parse::<u8>().ok())
    else {
        my_warn!("handlers", "unparsable +CEREG frame");
        return HandlerOutcome::PassThrough;
    };
    let state = RegState::from_cereg_code(code);
    mirror.network.reg_state = state;
    response.payload = ResponsePayload::RegState(state);
    HandlerOutcome::ConsumeOk
}

/// `+CSQ: <rssi>,<ber>`: convert the raw RSSI index to dBm (3GPP TS 27.007).
fn handle_csq(frame: &[u8], _mirror: &mut Mirror, response: &mut ModemResponse) -> HandlerOutcome {
    let Some(raw) = fields_after(frame, "+CSQ")
        .next()
        .and_then(|f| f.parse::<i32>().ok())
    else {
        my_warn!("handlers", "unparsable +CSQ frame");
        return HandlerOutcome::PassThrough;
    };
    let dbm = -113 + raw * 2;
    response.payload = ResponsePayload::Rssi(dbm);
    HandlerOutcome::ConsumeOk
}

/// `+CESQ: ...,<rsrq>,<rsrp>`: signal quality pair.
fn handle_cesq(frame: &[u8], _mirror: &mut Mirror, response: &mut ModemResponse) -> HandlerOutcome {
    let fields: Vec<&str, 8> = fields_after(frame, "+CESQ").take(8).collect();
    if fields.len() < 6 {
        my_warn!("handlers", "unparsable +CESQ frame");
        return HandlerOutcome::PassThrough;
    }
    let rsrq = fields[4].parse::<i32>().unwrap_or_default();
    let rsrp = fields[5].parse::<i32>().unwrap_or_default();
    response.payload = ResponsePayload::SignalQuality(SignalQuality { rsrq, rsrp });
    HandlerOutcome::ConsumeOk
}

/// `+CCLK: "<date>,<time>"`: reported verbatim as a raw timestamp the caller
/// can reparse; the core does not interpret calendar semantics.
fn handle_cclk(frame: &[u8], _mirror: &mut Mirror, response: &mut ModemResponse) -> HandlerOutcome {
    let text = as_text(frame);
    let digits: i64 = text
        .bytes()
        .filter(u8::is_ascii_digit)
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add((b - b'0') as i64));
    response.payload = ResponsePayload::Clock(digits);
    HandlerOutcome::ConsumeOk
}

/// `+CFUN: <n>`: operational state.
fn handle_cfun(frame: &[u8], mirror: &mut Mirror, response: &mut ModemResponse) -> HandlerOutcome {
    let Some(code) = fields_after(frame, "+CFUN")
        .next()
        .and_then(|f| f.parse::<u8>().ok())
    else {
        return HandlerOutcome::PassThrough;
    };
    let state = match code {
        0 => OpState::Minimum,
        1 => OpState::Full,
        4 => OpState::NoRf,
        5 => OpState::Manufacturing,
        _ => OpState::Minimum,
    };
    mirror.network.op_state = state;
    response.payload = ResponsePayload::OpState(state);
    HandlerOutcome::ConsumeOk
}

/// `+CPIN: <status>`: SIM state text, left for the caller's feature layer to
/// interpret; the core only acknowledges the frame.
fn handle_cpin(_frame: &[u8], _mirror: &mut Mirror, _response: &mut ModemResponse) -> HandlerOutcome {
    HandlerOutcome::ConsumeOk
}

/// `+CGPADDR: <cid>,<addr>[,<addr2>]`.
fn handle_cgpaddr(frame: &[u8], _mirror: &mut Mirror, response: &mut ModemResponse) -> HandlerOutcome {
    use crate::response::PdpAddresses;
    let fields: Vec<&str, 4> = fields_after(frame, "+CGPADDR").take(4).collect();
    let mut addrs = PdpAddresses {
        count: 0,
        addresses: [[0u8; 46]; 2],
        lens: [0u8; 2],
    };
    for (slot, field) in fields.iter().skip(1).take(2).enumerate() {
        let bytes = field.as_bytes();
        let n = bytes.len().min(46);
        addrs.addresses[slot][..n].copy_from_slice(&bytes[..n]);
        addrs.lens[slot] = n as u8;
        addrs.count += 1;
    }
    response.payload = ResponsePayload::PdpAddr(addrs);
    HandlerOutcome::ConsumeOk
}

/// `+SQNMODEACTIVE: <rat>`.
fn handle_sqnmodeactive(frame: &[u8], _mirror: &mut Mirror, response: &mut ModemResponse) -> HandlerOutcome {
    let Some(code) = fields_after(frame, "+SQNMODEACTIVE")
        .next()
        .and_then(|f| f.parse::<u8>().ok())
    else {
        return HandlerOutcome::PassThrough;
    };
    let rat = if code == 2 { Rat::NbIot } else { Rat::LteM };
    response.payload = ResponsePayload::Rat(rat);
    HandlerOutcome::ConsumeOk
}

/// `+SQNBANDSEL: <rat>,"<operator>",<bands...>`.
fn handle_sqnbandsel(frame: &[u8], _mirror: &mut Mirror, response: &mut ModemResponse) -> HandlerOutcome {
    let fields: Vec<&str, 24> = fields_after(frame, "+SQNBANDSEL").take(24).collect();
    if fields.is_empty() {
        return HandlerOutcome::PassThrough;
    }
    let rat = if fields[0].trim() == "1" {
        Rat::NbIot
    } else {
        Rat::LteM
    };
    let mut net_operator = Operator {
        name_len: 0,
        name: [0u8; 32],
    };
    if let Some(name) = fields.get(1) {
        let name = name.trim_matches('"').as_bytes();
        let n = name.len().min(32);
        net_operator.name[..n].copy_from_slice(&name[..n]);
        net_operator.name_len = n as u8;
    }
    let mut bands = [0u16; 20];
    let mut band_count = 0u8;
    for field in fields.iter().skip(2).take(20) {
        if let Ok(band) = field.parse::<u16>() {
            bands[band_count as usize] = band;
            band_count += 1;
        }
    }
    response.payload = ResponsePayload::BandSetConfig(
        Vec::from_slice(&[BandSelection {
            rat,
            net_operator,
            bands,
            band_count,
        }])
        .unwrap_or_default(),
    );
    HandlerOutcome::ConsumeOk
}

/// `+SQNHTTPRING: <profile>,<status>,<content_length>[,<content_type>]`:
/// arms the named HTTP profile so the parser's next `<<<` marker is framed.
fn handle_sqnhttpring(frame: &[u8], mirror: &mut Mirror, _response: &mut ModemResponse) -> HandlerOutcome {
    let fields: Vec<&str, 8> = fields_after(frame, "+SQNHTTPRING").take(8).collect();
    let Some(profile) = fields.first().and_then(|f| f.parse::<u8>().ok()) else {
        my_warn!("handlers", "unparsable +SQNHTTPRING frame");
        return HandlerOutcome::PassThrough;
    };
    let Ok(id) = crate::types::HttpProfileId::try_from(profile) else {
        return HandlerOutcome::PassThrough;
    };
    let status = fields.get(1).and_then(|f| f.parse::<u16>().ok()).unwrap_or(0);
    let content_length = fields.get(2).and_then(|f| f.parse::<usize>().ok()).unwrap_or(0);
    let entry = mirror.http.get_mut(id);
    entry.state = HttpCtxState::GotRing;
    entry.http_status = status;
    entry.content_length = content_length;
    if let Some(ct) = fields.get(3) {
        entry.content_type = String::try_from(*ct).unwrap_or_default();
    }
    mirror.http.current_profile = Some(id);
    HandlerOutcome::PassThrough
}

fn handle_sqnhttpconnect(frame: &[u8], mirror: &mut Mirror, _response: &mut ModemResponse) -> HandlerOutcome {
    set_http_connected(frame, "+SQNHTTPCONNECT", mirror, true)
}

fn handle_sqnhttpdisconnect(frame: &[u8], mirror: &mut Mirror, _response: &mut ModemResponse) -> HandlerOutcome {
    set_http_connected(frame, "+SQNHTTPDISCONNECT", mirror, false)
}

fn handle_sqnhttpsh(frame: &[u8], mirror: &mut Mirror, _response: &mut ModemResponse) -> HandlerOutcome {
    set_http_connected(frame, "+SQNHTTPSH", mirror, false)
}

fn set_http_connected(frame: &[u8], prefix: &str, mirror: &mut Mirror, connected: bool) -> HandlerOutcome {
    let profile = fields_after(frame, prefix)
        .next()
        .and_then(|f| f.parse::<u8>().ok());
    if let Some(profile) = profile {
        if let Ok(id) = crate::types::HttpProfileId::try_from(profile) {
            mirror.http.get_mut(id).connected = connected;
        }
    }
    HandlerOutcome::ConsumeOk
}

/// `+SQNSH: <id>`: the socket URC that releases a socket back to the mirror
/// (spec P4: a socket frees before any later command referencing it is sent).
fn handle_sqnsh(frame: &[u8], mirror: &mut Mirror, _response: &mut ModemResponse) -> HandlerOutcome {
    let Some(id) = fields_after(frame, "+SQNSH")
        .next()
        .and_then(|f| f.parse::<u8>().ok())
    else {
        my_warn!("handlers", "unparsable +SQNSH frame");
        return HandlerOutcome::PassThrough;
    };
    if let Ok(id) = SocketId::try_from(id) {
        mirror.socket.free(id);
    }
    HandlerOutcome::ConsumeOk
}

/// `<<<<body>\r\nOK\r\n`: the HTTP raw-mode body, already framed in full by
/// the parser. The trailing `\r\nOK\r\n` is discarded blindly (spec §9 open
/// question (i), chosen to match observed wire behaviour).
fn handle_http_body(frame: &[u8], mirror: &mut Mirror, response: &mut ModemResponse) -> HandlerOutcome {
    let Some(id) = mirror.http.current_profile else {
        my_warn!("handlers", "<<< body with no current HTTP profile armed");
        return HandlerOutcome::PassThrough;
    };
    let entry = mirror.http.get(id);
    let http_status = entry.http_status;
    let content_length = entry.content_length;
    let content_type = entry.content_type.clone();

    let body_start = b"<<<".len();
    let body_len = content_length.min(frame.len().saturating_sub(body_start));
    let body = frame.get(body_start..body_start + body_len).unwrap_or(&[]);

    let mut data = Vec::new();
    let _ = data.extend_from_slice(body);

    mirror.http.get_mut(id).state = HttpCtxState::Idle;
    mirror.http.current_profile = None;

    response.payload = ResponsePayload::Http(HttpResponse {
        http_status,
        content_length,
        content_type,
        data,
    });
    HandlerOutcome::ConsumeOk
}

/// `+LPGNSSFIXREADY: <fix_id>,<ts>,<ttf>,<conf>,<lat>,<lon>,<h>,<ns>,<es>,<ds>[,<sat_no>,<sig>]*`
fn handle_lpgnssfixready(frame: &[u8], mirror: &mut Mirror, response: &mut ModemResponse) -> HandlerOutcome {
    let fields: Vec<&str, 64> = fields_after(frame, "+LPGNSSFIXREADY").take(64).collect();
    if fields.len() < 10 {
        my_warn!("handlers", "unparsable +LPGNSSFIXREADY frame");
        return HandlerOutcome::PassThrough;
    }
    let mut fix = GnssFix::default();
    fix.fix_id = fields[0].parse().unwrap_or_default();
    fix.timestamp = fields[1].parse().unwrap_or_default();
    fix.time_to_fix = fields[2].parse().unwrap_or_default();
    fix.estimated_confidence = fields[3].parse().unwrap_or_default();
    fix.latitude = fields[4].parse().unwrap_or_default();
    fix.longitude = fields[5].parse().unwrap_or_default();
    fix.height = fields[6].parse().unwrap_or_default();
    fix.north_speed = fields[7].parse().unwrap_or_default();
    fix.east_speed = fields[8].parse().unwrap_or_default();
    fix.down_speed = fields[9].parse().unwrap_or_default();

    let mut sat_count = 0u8;
    let mut sats = [GnssSatellite {
        sat_no: 0,
        signal_strength: 0,
    }; MAX_SATELLITES];
    let mut rest = fields[10..].iter();
    while let (Some(no), Some(sig)) = (rest.next(), rest.next()) {
        if sat_count as usize >= MAX_SATELLITES {
            break;
        }
        sats[sat_count as usize] = GnssSatellite {
            sat_no: no.parse().unwrap_or_default(),
            signal_strength: sig.parse().unwrap_or_default(),
        };
        sat_count += 1;
    }
    fix.sats = sats;
    fix.sat_count = sat_count;

    mirror.gnss.deliver_and_clear(&fix);
    response.result = ModemResult::Ok;
    HandlerOutcome::ConsumeOk
}

/// `+LPGNSSASSISTANCE: <type>,<avail>,<last>,<ttu>,<tte>` repeated per
/// assistance kind (almanac, realtime ephemeris, predicted ephemeris).
fn handle_lpgnssassistance(frame: &[u8], _mirror: &mut Mirror, response: &mut ModemResponse) -> HandlerOutcome {
    use crate::response::{GnssAssistance, GnssAssistanceDetails};
    let fields: Vec<&str, 8> = fields_after(frame, "+LPGNSSASSISTANCE").take(8).collect();
    if fields.len() < 5 {
        return HandlerOutcome::PassThrough;
    }
    let details = GnssAssistanceDetails {
        available: fields[1].trim() == "1",
        last_update: fields[2].parse().unwrap_or_default(),
        time_to_update: fields[3].parse().unwrap_or_default(),
        time_to_expire: fields[4].parse().unwrap_or_default(),
    };
    let empty = GnssAssistanceDetails {
        available: false,
        last_update: 0,
        time_to_update: 0,
        time_to_expire: 0,
    };
    let assistance = match fields[0].trim() {
        "0" => GnssAssistance {
            almanac: details,
            realtime_ephemeris: empty,
            predicted_ephemeris: empty,
        },
        "1" => GnssAssistance {
            almanac: empty,
            realtime_ephemeris: details,
            predicted_ephemeris: empty,
        },
        _ => GnssAssistance {
            almanac: empty,
            realtime_ephemeris: empty,
            predicted_ephemeris: details,
        },
    };
    response.payload = ResponsePayload::GnssAssistanceData(assistance);
    HandlerOutcome::ConsumeOk
}

/// `+SQNMONI: <cc>,<nc>,<rsrp>,<cinr>,<rsrq>,<tac>,<pci>,<earfcn>,<rssi>,<paging>,<cid>,<band>,<bw>,<ce_level>`
fn handle_sqnmoni(frame: &[u8], _mirror: &mut Mirror, response: &mut ModemResponse) -> HandlerOutcome {
    let fields: Vec<&str, 16> = fields_after(frame, "+SQNMONI").take(16).collect();
    if fields.len() < 14 {
        my_warn!("handlers", "unparsable +SQNMONI frame");
        return HandlerOutcome::PassThrough;
    }
    let info = CellInformation {
        cc: fields[0].parse().unwrap_or_default(),
        nc: fields[1].parse().unwrap_or_default(),
        rsrp: fields[2].parse().unwrap_or_default(),
        cinr: fields[3].parse().unwrap_or_default(),
        rsrq: fields[4].parse().unwrap_or_default(),
        tac: fields[5].parse().unwrap_or_default(),
        pci: fields[6].parse().unwrap_or_default(),
        earfcn: fields[7].parse().unwrap_or_default(),
        rssi: fields[8].parse().unwrap_or_default(),
        paging: fields[9].parse().unwrap_or_default(),
        cid: fields[10].parse().unwrap_or_default(),
        band: fields[11].parse().unwrap_or_default(),
        bw: fields[12].parse().unwrap_or_default(),
        ce_level: fields[13].parse().unwrap_or_default(),
    };
    response.payload = ResponsePayload::CellInfo(info);
    HandlerOutcome::ConsumeOk
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csq_converts_raw_index_to_dbm() {
        let mut mirror = Mirror::new();
        let mut response = ModemResponse::new();
        let outcome = handle_csq(b"+CSQ: 15,99", &mut mirror, &mut response);
        assert_eq!(outcome, HandlerOutcome::ConsumeOk);
        assert!(matches!(response.payload, ResponsePayload::Rssi(-83)));
    }

    #[test]
    fn cereg_updates_mirror_registration_state() {
        let mut mirror = Mirror::new();
        let mut response = ModemResponse::new();
        handle_cereg(b"+CEREG: 5", &mut mirror, &mut response);
        assert_eq!(mirror.network.reg_state, RegState::Roaming);
        assert!(matches!(response.payload, ResponsePayload::RegState(RegState::Roaming)));
    }

    #[test]
    fn cme_error_captures_numeric_code_and_requests_retry() {
        let mut mirror = Mirror::new();
        let mut response = ModemResponse::new();
        let outcome = handle_cme_error(b"+CME ERROR: 16", &mut mirror, &mut response);
        assert_eq!(outcome, HandlerOutcome::ConsumeRetry);
        assert!(matches!(
            response.payload,
            ResponsePayload::CmeError(CmeError::IncorrectPassword)
        ));
    }

    #[test]
    fn sqnsh_frees_the_referenced_socket() {
        let mut mirror = Mirror::new();
        let id = mirror.socket.lease_free().unwrap();
        let mut response = ModemResponse::new();
        handle_sqnsh(b"+SQNSH: 1", &mut mirror, &mut response);
        assert_eq!(
            mirror.socket.get(id).state,
            crate::mirror::socket::SocketState::Free
        );
    }

    #[test]
    fn http_body_handler_extracts_exact_content_length() {
        let mut mirror = Mirror::new();
        let id = crate::types::HttpProfileId::try_from(0).unwrap();
        mirror.http.current_profile = Some(id);
        let entry = mirror.http.get_mut(id);
        entry.state = HttpCtxState::GotRing;
        entry.http_status = 200;
        entry.content_length = 5;

        let mut response = ModemResponse::new();
        let outcome = handle_http_body(b"<<<hello\r\nOK\r\n", &mut mirror, &mut response);
        assert_eq!(outcome, HandlerOutcome::ConsumeOk);
        match response.payload {
            ResponsePayload::Http(http) => {
                assert_eq!(&http.data[..], b"hello");
                assert_eq!(http.http_status, 200);
            }
            _ => panic!("expected Http payload"),
        }
        assert_eq!(mirror.http.get(id).state, HttpCtxState::Idle);
        assert!(mirror.http.current_profile.is_none());
    }

    #[test]
    fn gnss_fix_ready_delivers_to_waiters_and_clears_table() {
        let mut mirror = Mirror::new();
        mirror.gnss.register().unwrap();
        mirror.gnss.register().unwrap();
        let mut response = ModemResponse::new();
        let frame = b"+LPGNSSFIXREADY: 1,1700000000,5000,95.5,52.1,4.4,10.0,0.1,0.2,0.0,3,180,7,190";
        handle_lpgnssfixready(frame, &mut mirror, &mut response);
        assert!(mirror.gnss.is_empty());
    }
}
