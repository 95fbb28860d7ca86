//! Logging facade.
//!
//! Call sites use `crate::logging::{info, warn, debug}` so the rest of the
//! crate never names `defmt` or `log` directly. Exactly one backend feature
//! must be enabled; a board crate picks `defmt`, `fsolink-sim` and the test
//! suite pick `log`.

#[cfg(not(any(feature = "defmt", feature = "log")))]
compile_error!("fsolink-core requires either the \"defmt\" or \"log\" feature");

#[cfg(all(feature = "defmt", not(feature = "log")))]
pub use defmt::{debug, info, warn, error};

#[cfg(feature = "log")]
pub use log::{debug, info, warn, error};
