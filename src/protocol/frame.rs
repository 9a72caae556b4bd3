//! Wire-frame decoding for the device's waterfall channel.
//!
//! Frames arrive as discrete binary transport messages. A frame may carry an
//! optional 3-byte channel tag, then either embedded control text or a fixed
//! 8-byte header followed by one magnitude byte per frequency bin. Anything
//! that fails validation is ignored rather than treated as an error: devices
//! are known to emit occasional malformed frames during mode switches.

/// Channel tag some firmware versions prepend to waterfall frames.
pub const CHANNEL_TAG: &[u8; 3] = b"W/F";

/// Tag marking the remainder of a frame as UTF-8 control text.
pub const CONTROL_TAG: &[u8; 3] = b"MSG";

/// Header: 1 flags byte, 2-byte bin-start index, 4-byte sequence, 1 reserved.
const HEADER_LEN: usize = 8;

/// Shortest body we accept as a spectral frame.
const MIN_SPECTRAL_LEN: usize = 10;

/// One time-slice of frequency-domain magnitudes plus its sequence number.
///
/// Magnitudes are a log-power mapping between the configured floor and
/// ceiling, one byte per bin. Immutable after decode; ownership moves from
/// the decoder to the frame buffer to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectralRow {
    pub seq: u32,
    pub bins: Vec<u8>,
}

/// Decode result for one transport message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedFrame {
    /// Embedded control text (the tag itself is stripped).
    ControlText(String),
    /// A spectral waterfall row.
    Spectral(SpectralRow),
    /// Frame carried nothing usable; produces no event.
    Ignored,
}

/// Classify and decode one raw transport message.
pub fn decode(raw: &[u8]) -> DecodedFrame {
    let mut offset = 0;
    if raw.len() >= CHANNEL_TAG.len() && &raw[..CHANNEL_TAG.len()] == CHANNEL_TAG {
        offset = CHANNEL_TAG.len();
    }

    // Some firmware wraps control messages inside otherwise-binary frames.
    if raw.len() >= offset + CONTROL_TAG.len()
        && &raw[offset..offset + CONTROL_TAG.len()] == CONTROL_TAG
    {
        return match std::str::from_utf8(&raw[offset + CONTROL_TAG.len()..]) {
            Ok(text) => DecodedFrame::ControlText(text.to_string()),
            Err(_) => DecodedFrame::Ignored,
        };
    }

    let body = &raw[offset..];
    if body.len() < MIN_SPECTRAL_LEN {
        return DecodedFrame::Ignored;
    }

    // Flags and bin-start are parsed to validate framing but unused here.
    let _flags = body[0];
    let _bin_start = u16::from_be_bytes([body[1], body[2]]);
    let seq = u32::from_be_bytes([body[3], body[4], body[5], body[6]]);

    let bins = body[HEADER_LEN..].to_vec();
    if bins.is_empty() {
        return DecodedFrame::Ignored;
    }
    DecodedFrame::Spectral(SpectralRow { seq, bins })
}
