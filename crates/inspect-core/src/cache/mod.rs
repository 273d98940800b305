//! Binding cache
//!
//! Creates bindings lazily, hands out validated cached instances, and tears
//! down bindings (with everything nested in them) once their targets die or
//! a caller forces removal. Entries survive a host reload through a
//! snapshot that is revalidated one tick later.

mod binding_cache;
mod disposal;
mod snapshot;
mod stats;
mod sweep;

pub use binding_cache::{BindingCache, BindingRequest, BindingSnapshot};
pub use disposal::{DisposalPlan, DisposalWalk};
pub use snapshot::CacheSnapshot;
pub use stats::CacheStats;
pub use sweep::SwapBuffer;
