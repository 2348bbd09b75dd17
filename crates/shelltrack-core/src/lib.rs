pub mod config;
pub mod icon;
pub mod log;
pub mod rect;
pub mod result;

pub use icon::{IconAction, InvokeAction, PinStatus};
pub use rect::Rect;
pub use result::ShellResult;
