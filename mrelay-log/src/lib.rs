//! Logging facade for mrelay.
//!
//! The basic use of this crate is through the five logging macros: [`error!`],
//! [`warn!`], [`info!`], [`debug!`] and [`trace!`], where `error!` represents
//! the highest-priority log messages and `trace!` the lowest. Messages are
//! filtered by configuring the log level to exclude lower-priority messages.
//!
//! # Conventions
//!
//! Log messages should start lowercase and end without punctuation. Prefer
//! short and precise log messages over verbose text. Choose the log level
//! according to these rules:
//!
//! - [`error!`] for bugs and invalid behavior.
//! - [`warn!`] for undesirable behavior.
//! - [`info!`] for messages relevant to the average user.
//! - [`debug!`] for messages usually relevant to debugging.
//! - [`trace!`] for full auxiliary information.

#![warn(missing_docs)]

mod setup;
pub use setup::*;

// Expose the minimal log facade.
#[doc(inline)]
pub use tracing::{debug, error, info, trace, warn};
