//! Client-side tracking of images on their way through the server.
//!
//! [`state`] holds the pure transition table, [`ticker`] the cosmetic
//! progress task and [`driver`] the async flow that ties them to a
//! [`Backend`].

pub mod driver;
pub mod state;
pub mod ticker;

pub use driver::{Backend, Notice, SessionDriver, SessionSignal, Severity};
pub use state::{ImageStatus, LocalFile, LocalId, Session, SessionEvent, UploadedImage};
pub use ticker::{CancellationToken, ProgressTicker, TickerSettings};
