//! Upstream provider adapters.

mod angelone;

pub use angelone::{AngelOneAdapter, AngelOneCredentials};
