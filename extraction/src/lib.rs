//! Turns recorded matches into one CSV row per kill.

pub mod convert;
pub mod demo;
pub mod dispatch;
pub mod event;
pub mod row;
pub mod state;
pub mod timeline;
pub mod weapon;

pub use convert::{convert, ConversionOutcome, ConvertError};
pub use event::{DecodeError, Decoder, Event, EventSource, GameState};
pub use state::{Config, WinnerMode};
pub use timeline::Timeline;
