use crate::builder::BuilderRegistry;
use crate::config::CacheConfig;
use crate::diagnostics::{ConsoleDiagnosticHandler, DiagnosticHandler};
use crate::policy::DisposalPolicies;
use crate::preview::ProviderRegistry;
use crate::session::Session;
use std::sync::Arc;

/// Dependency injection container
/// Holds the shared configuration and diagnostics and wires up sessions
pub struct Container {
    config: Arc<CacheConfig>,
    diagnostic_handler: Arc<dyn DiagnosticHandler>,
}

impl Container {
    /// Create a new container with production dependencies
    pub fn new(config: CacheConfig) -> Self {
        let config = Arc::new(config);

        let diagnostic_handler = Arc::new(ConsoleDiagnosticHandler::new(config.cache_options.pretty));

        Container {
            config,
            diagnostic_handler,
        }
    }

    /// Create a container with custom dependencies (for testing)
    pub fn with_dependencies(
        config: CacheConfig,
        diagnostic_handler: Arc<dyn DiagnosticHandler>,
    ) -> Self {
        Container {
            config: Arc::new(config),
            diagnostic_handler,
        }
    }

    /// Session with the generic builder, no disposal rules and every
    /// link-time preview provider
    pub fn create_session(&self) -> Session {
        self.create_session_with(
            BuilderRegistry::new(),
            DisposalPolicies::new(),
            ProviderRegistry::new(),
        )
    }

    pub fn create_session_with(
        &self,
        builders: BuilderRegistry,
        policies: DisposalPolicies,
        providers: ProviderRegistry,
    ) -> Session {
        Session::new(
            self.config.clone(),
            self.diagnostic_handler.clone(),
            builders,
            policies,
            providers,
        )
    }

    /// Get the configuration
    pub fn config(&self) -> &Arc<CacheConfig> {
        &self.config
    }

    /// Get the diagnostic handler
    pub fn diagnostic_handler(&self) -> &Arc<dyn DiagnosticHandler> {
        &self.diagnostic_handler
    }

    /// Check if any errors have been reported
    pub fn has_errors(&self) -> bool {
        self.diagnostic_handler.has_errors()
    }

    /// Get the error count
    pub fn error_count(&self) -> usize {
        self.diagnostic_handler.error_count()
    }

    /// Get the warning count
    pub fn warning_count(&self) -> usize {
        self.diagnostic_handler.warning_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnosticHandler;

    #[test]
    fn test_container_creation() {
        let container = Container::new(CacheConfig::default());

        assert_eq!(container.error_count(), 0);
        assert!(!container.has_errors());
    }

    #[test]
    fn test_container_with_mock_dependencies() {
        let diagnostics = Arc::new(CollectingDiagnosticHandler::new());
        let container = Container::with_dependencies(CacheConfig::default(), diagnostics.clone());

        container.diagnostic_handler().error(None, "Test error");

        assert!(container.has_errors());
        assert_eq!(diagnostics.error_count(), 1);
    }

    #[test]
    fn test_sessions_share_config() {
        let mut config = CacheConfig::default();
        config.cache_options.cleanup_interval_ticks = 5;
        let container = Container::new(config);

        let session = container.create_session();

        assert_eq!(session.config().cache_options.cleanup_interval_ticks, 5);
        assert!(Arc::ptr_eq(session.config(), container.config()));
    }
}
