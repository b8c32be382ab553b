#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod activate;
pub mod cache;
pub mod create;
pub mod discovery;
pub mod errors;
pub mod probe;
pub mod process;
pub mod seed;
pub mod session;
#[cfg(test)]
pub(crate) mod testutil;

pub use create::create_environment;
pub use discovery::discover_interpreter;
pub use errors::VenvError;
pub use probe::{clear_probe_cache, probe, probe_resolved};
pub use session::{run_session, SessionRequest};
