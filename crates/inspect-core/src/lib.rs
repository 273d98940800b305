pub mod binding;
pub mod builder;
pub mod cache;
pub mod config;
pub mod di;
pub mod diagnostics;
pub mod errors;
pub mod identity;
pub mod policy;
pub mod preview;
pub mod scheduler;
pub mod session;
pub mod target;

pub use binding::{Binding, BindingContext, BindingHandle, BindingState, SubResource};
pub use builder::{BindingBuilder, BuilderRegistry, GenericBuilder, GENERIC_KIND};
pub use cache::{BindingCache, BindingRequest, CacheStats};
pub use config::{CacheConfig, CacheOptions};
pub use di::Container;
pub use diagnostics::{
    CollectingDiagnosticHandler, ConsoleDiagnosticHandler, Diagnostic, DiagnosticHandler,
    DiagnosticLevel,
};
pub use errors::{CacheError, Result};
pub use identity::{IdentityKey, KeyHasher, PreviewableKey, IDENTITY_BASE};
pub use policy::{DisposalPolicies, DisposalPolicy};
pub use preview::{
    PreviewCache, PreviewHandle, PreviewProvider, PreviewState, PreviewWrapper,
    ProviderRegistration, ProviderRegistry,
};
pub use session::{Session, SessionSnapshot, TickReport};
pub use target::{Target, TargetRef};
