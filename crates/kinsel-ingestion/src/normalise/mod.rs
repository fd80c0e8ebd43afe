//! Gene-symbol normalisation.
//!
//! - `SymbolResolver`: one term → matching official symbols, with the
//!   single-candidate fallback
//! - `ResolutionScheduler`: a batch of terms → one symbol per term, resolved
//!   concurrently with order preserved

pub mod resolver;
pub mod scheduler;

pub use resolver::SymbolResolver;
pub use scheduler::{choose_symbol, BatchResolution, LookupFailure, ResolutionScheduler};
