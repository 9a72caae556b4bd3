//! Command vocabulary sent client → device.
//!
//! Each command is one plain-text transport write. The parameter names and
//! defaults are the device's fixed contract: get them wrong and the device
//! will not stream data.

pub const DEFAULT_ZOOM: u32 = 0;
pub const DEFAULT_WINDOW_START: u32 = 0;
pub const DEFAULT_FLOOR_DB: i32 = -110;
pub const DEFAULT_CEIL_DB: i32 = -10;
pub const DEFAULT_ROW_RATE: u32 = 4;

pub fn auth() -> String {
    "SET auth t=kiwi p=".to_string()
}

pub fn zoom(zoom: u32, start: u32) -> String {
    format!("SET zoom={zoom} start={start}")
}

pub fn magnitude_range(floor_db: i32, ceil_db: i32) -> String {
    format!("SET maxdb={ceil_db} mindb={floor_db}")
}

pub fn row_rate(rows_per_second: u32) -> String {
    format!("SET wf_speed={rows_per_second}")
}

pub fn no_compression() -> String {
    "SET wf_comp=0".to_string()
}

pub fn ident(name: &str) -> String {
    format!("SET ident_user={name}")
}
