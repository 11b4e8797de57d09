//! Coordination layer between `stovelink-api` and consumers (CLI, bridges).
//!
//! This crate owns the refresh cycle and the cached device state:
//!
//! - **[`Coordinator`]** — Central facade: caches the bearer token and the
//!   last good device snapshot, refreshes both on a fixed interval (or on
//!   demand after a command), and exposes typed null-safe accessors over the
//!   cached document. Failures never evict the previous snapshot; they
//!   surface as a single [`CoreError::UpdateFailed`] per cycle and flip the
//!   health channel consumers can watch.
//!
//! - **[`Command`]** — Typed mutation requests serialized to the cloud's
//!   `{name, value, mac_address}` payload and sent out-of-band from the
//!   refresh cycle. Callers re-refresh afterwards if they need the change
//!   reflected in the cache.
//!
//! - **Domain model** ([`model`]) — Validated [`MacAddress`], the
//!   [`OperationalPhase`] code mapping, and the clamped [`Alarm`] log view.

pub mod command;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::Command;
pub use config::StoveConfig;
pub use coordinator::{Coordinator, RefreshHealth};
pub use error::CoreError;
pub use model::{Alarm, InvalidMacAddress, MacAddress, OperationalPhase};
