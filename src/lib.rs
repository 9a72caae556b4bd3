pub mod buffer;
pub mod client;
pub mod colormap;
pub mod protocol;
pub mod render;
pub mod ui;
