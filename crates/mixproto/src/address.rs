//! Well-known X-Air OSC addresses.
//!
//! The bridge core treats addresses as opaque keys. These helpers exist for the
//! fixed addresses the bridge itself sends (probe, heartbeat) and for tools that
//! need to build parameter addresses.

/// Generic status query, answered with `/status ,sss`
pub const STATUS: &str = "/status";
/// Console info query
pub const INFO: &str = "/info";
/// Extended info, sent unsolicited by some firmware versions
pub const XINFO: &str = "/xinfo";
/// Keeps the remote session open so the console keeps pushing updates
pub const XREMOTE: &str = "/xremote";
/// Main L/R color slot
pub const MASTER_COLOR: &str = "/lr/config/color";
/// Aux return color slot
pub const AUX_RETURN_COLOR: &str = "/rtn/aux/config/color";

/// Fader the startup probe reads; every X-Air model has channel 1
pub const PROBE_FADER: &str = "/ch/01/mix/fader";

/// Queries sent by the startup probe, in send order
pub const PROBE_QUERIES: [&str; 3] = [STATUS, INFO, PROBE_FADER];

/// Addresses whose arrival proves the console is answering
pub const LIVENESS_INDICATORS: [&str; 4] = [XINFO, INFO, STATUS, PROBE_FADER];

pub fn is_liveness_indicator(address: &str) -> bool {
    LIVENESS_INDICATORS.contains(&address)
}

pub fn channel_color(channel: u8) -> String {
    format!("/ch/{:02}/config/color", channel)
}

pub fn bus_color(bus: u8) -> String {
    format!("/bus/{}/config/color", bus)
}

pub fn fx_send_color(fx: u8) -> String {
    format!("/fxsend/{}/config/color", fx)
}

/// Color slot that belongs to a parameter address.
///
/// Sends to mix buses 07-10 take the color of the FX send they feed, so they are
/// checked before the plain channel rule.
pub fn color_slot_for(address: &str) -> Option<String> {
    let segments: Vec<&str> = address.trim_start_matches('/').split('/').collect();

    if let Some(fx) = fx_send_index(&segments) {
        return Some(fx_send_color(fx));
    }

    match segments.as_slice() {
        ["ch", n, _, ..] if is_digits(n) => n.parse::<u8>().ok().map(channel_color),
        ["bus", n, _, ..] if is_digits(n) => n.parse::<u8>().ok().map(bus_color),
        ["lr", ..] => Some(MASTER_COLOR.to_string()),
        ["rtn", "aux", ..] => Some(AUX_RETURN_COLOR.to_string()),
        _ => None,
    }
}

/// `.../mix/07/level` .. `.../mix/10/level` map to FX sends 1..4
fn fx_send_index(segments: &[&str]) -> Option<u8> {
    segments.windows(3).find_map(|w| match w {
        ["mix", "07", "level"] => Some(1),
        ["mix", "08", "level"] => Some(2),
        ["mix", "09", "level"] => Some(3),
        ["mix", "10", "level"] => Some(4),
        _ => None,
    })
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
