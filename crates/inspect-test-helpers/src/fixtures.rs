//! Test fixtures - target lists and pre-wired sessions

use std::rc::Rc;
use std::sync::Arc;

use inspect_core::{
    BindingRequest, BuilderRegistry, CacheConfig, Container, DisposalPolicies, ProviderRegistry,
    Session, TargetRef,
};

use crate::mocks::{MockDiagnosticHandler, MockTarget, Recorder, RecordingBuilder};

/// Kind of the recording builder installed by [`harness`]
pub const RECORDING_KIND: &str = "recording";

pub fn target(object: &Rc<MockTarget>) -> TargetRef {
    TargetRef::object(object.clone())
}

/// Target list with every entry present
pub fn targets(objects: &[&Rc<MockTarget>]) -> Vec<Option<TargetRef>> {
    objects.iter().map(|object| Some(target(object))).collect()
}

/// Request for a single mock target
pub fn request(object: &Rc<MockTarget>) -> BindingRequest {
    BindingRequest::single(target(object))
}

/// A session whose fallback builder records every lifecycle step
pub struct Harness {
    pub session: Session,
    pub recorder: Rc<Recorder>,
    pub builder: Rc<RecordingBuilder>,
    pub diagnostics: Arc<MockDiagnosticHandler>,
}

pub fn harness() -> Harness {
    harness_with(
        CacheConfig::default(),
        DisposalPolicies::new(),
        ProviderRegistry::explicit_only(),
    )
}

pub fn harness_with(
    config: CacheConfig,
    policies: DisposalPolicies,
    providers: ProviderRegistry,
) -> Harness {
    let recorder = Recorder::new();
    let builder = RecordingBuilder::new(RECORDING_KIND, recorder.clone());
    let diagnostics = MockDiagnosticHandler::new();

    let container = Container::with_dependencies(config, diagnostics.clone());
    let session = container.create_session_with(
        BuilderRegistry::with_fallback(builder.clone()),
        policies,
        providers,
    );

    Harness {
        session,
        recorder,
        builder,
        diagnostics,
    }
}
