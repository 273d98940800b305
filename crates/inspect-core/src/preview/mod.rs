//! Preview cache
//!
//! Produces the ordered preview list for a binding: the binding itself, then
//! one wrapper per provider registered for the first target's type.
//! Providers register explicitly or at link time through `inventory`.

mod cache;
mod registry;
mod wrapper;

pub use cache::{PreviewCache, PreviewSnapshot};
pub use registry::{PreviewProvider, ProviderRegistration, ProviderRegistry};
pub use wrapper::{PreviewContent, PreviewHandle, PreviewState, PreviewWrapper, BINDING_PREVIEW};
