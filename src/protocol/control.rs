//! Control-message parsing and the device status it accumulates.
//!
//! Control text is ASCII `key=value` tokens separated by spaces. The device
//! sends these incrementally as its session comes up, so the status snapshot
//! fills in sparsely; `audio_init` marks the end of session setup and is the
//! trigger for publishing the snapshot to subscribers.

/// Sparse device status accumulated from control messages.
///
/// Mutated in place as control frames arrive; lives exactly as long as the
/// connection that produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceStatus {
    pub center_freq: Option<f64>,
    pub bandwidth: Option<f64>,
    pub sample_rate: Option<f64>,
    pub fft_size: Option<usize>,
    pub zoom: Option<u32>,
    pub window_start: Option<u32>,
    /// Set once the device reports `audio_init`.
    pub audio_ready: bool,
}

/// Apply one control message to the status snapshot.
///
/// Returns true when the message carried `audio_init`, the signal that the
/// device has completed session setup. Unknown keys, keyless tokens, and
/// unparseable values are skipped without error.
pub fn apply(status: &mut DeviceStatus, text: &str) -> bool {
    let mut audio_init = false;
    for token in text.split_whitespace() {
        let Some(eq) = token.find('=') else { continue };
        if eq == 0 {
            continue;
        }
        let (key, value) = (&token[..eq], &token[eq + 1..]);
        match key {
            "center_freq" => {
                if let Ok(v) = value.parse() {
                    status.center_freq = Some(v);
                }
            }
            "bandwidth" => {
                if let Ok(v) = value.parse() {
                    status.bandwidth = Some(v);
                }
            }
            "sample_rate" => {
                if let Ok(v) = value.parse() {
                    status.sample_rate = Some(v);
                }
            }
            "wf_fft_size" => {
                if let Ok(v) = value.parse() {
                    status.fft_size = Some(v);
                }
            }
            "zoom" => {
                if let Ok(v) = value.parse() {
                    status.zoom = Some(v);
                }
            }
            "start" => {
                if let Ok(v) = value.parse() {
                    status.window_start = Some(v);
                }
            }
            "audio_init" => {
                status.audio_ready = true;
                audio_init = true;
            }
            _ => {}
        }
    }
    audio_init
}
