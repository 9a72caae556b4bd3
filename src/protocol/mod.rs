pub mod command;
pub mod control;
pub mod frame;

pub use control::DeviceStatus;
pub use frame::{DecodedFrame, SpectralRow, decode};
