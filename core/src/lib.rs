//! # Windrose Core
//!
//! Core crate for the Windrose area editor: the object-lifecycle and
//! undo/redo engine everything else builds on.
//!
//! - [`lifecycle`] — handles, holder/trackable capabilities, and the
//!   reference tracker that fans soft-delete / restore / delete events
//!   out to every container referencing an object
//! - [`tracking`] — ordered containers that hide objects in place instead
//!   of unlinking them, so a restore recovers the exact prior order
//! - [`editing`] — reversible operations, nested transactions, and the
//!   undo/redo history
//!
//! The engine is single-threaded and cooperative: everything runs
//! synchronously on the thread owning the edited document.

pub mod editing;
pub mod lifecycle;
pub mod tracking;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Logs the library version at startup.
pub fn init() {
    log::info!("Windrose Core v{} initialized", VERSION);
}
