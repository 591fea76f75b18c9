//! rusty_jni - native side of a JVM ↔ Rust bridge
//!
//! The JVM declares `external` functions on the `RustLibrary` facade; this
//! library implements them. Strings, integer arrays, host objects and
//! success/failure envelopes cross the boundary through a marshalling core
//! that is generic over the host runtime.
//!
//! Architecture:
//! - `marshal` - value model and conversions, independent of JNI
//! - `host` - the [`HostRuntime`] seam, with a live JNI host and an in-memory heap
//! - `entry` - entry point registry, fault boundary, JNI exports
//! - `config` / `logging` - write-once process setup
//! - `harness` - runs every entry point against the in-memory heap

pub mod config;
pub mod entry;
pub mod errors;
pub mod harness;
pub mod host;
pub mod logging;
pub mod marshal;

pub use config::BridgeConfig;
pub use entry::{entry_point, run_guarded, EntryPoint, Fatal, ReturnShape, ENTRY_POINTS};
pub use errors::{BridgeError, BridgeResult};
pub use host::{HostRuntime, JniHost, MemoryHost};
pub use logging::{init_logging, LogConfig, LogFormat, LogOutput};
pub use marshal::{Envelope, NativeValue, Sequence, ValueKind};

use once_cell::sync::OnceCell;
use tracing::{debug, warn};

static BOOTSTRAP: OnceCell<()> = OnceCell::new();

/// Load configuration and install logging, once per process.
///
/// A broken configuration never stops the library from loading: the
/// defaults are used and a warning is logged.
pub fn init() {
    BOOTSTRAP.get_or_init(|| {
        let (config, problem) = match BridgeConfig::load() {
            Ok(config) => (config, None),
            Err(err) => (BridgeConfig::default(), Some(err)),
        };

        let log_config = LogConfig::from_section(&config.logging).unwrap_or_default();
        init_logging(log_config);

        if let Some(err) = problem {
            warn!(error = %err, "Configuration not loaded, using defaults");
        }
        debug!(dir = %config.dir_reader.path.display(), "Configuration installed");
        config::install(config);
    });
}

/// Whether [`init`] has completed in this process
pub fn initialized() -> bool {
    BOOTSTRAP.get().is_some()
}
