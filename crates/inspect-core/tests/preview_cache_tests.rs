//! Preview lists: ordering, reuse and teardown of provider wrappers

use std::rc::Rc;

use inspect_core::preview::BINDING_PREVIEW;
use inspect_core::{
    CacheConfig, CacheError, DiagnosticHandler, DisposalPolicies, PreviewHandle, PreviewableKey,
    ProviderRegistry,
};
use inspect_test_helpers::fixtures::{harness_with, request, Harness};
use inspect_test_helpers::mocks::{MockTarget, Recorder, RecordingProvider};

struct PreviewHarness {
    h: Harness,
    previews: Rc<Recorder>,
    material: Rc<RecordingProvider>,
    mesh: Rc<RecordingProvider>,
}

fn preview_harness(config: CacheConfig) -> PreviewHarness {
    let previews = Recorder::new();
    let material = RecordingProvider::new("material", "mock", previews.clone());
    let mesh = RecordingProvider::new("mesh", "mock", previews.clone());
    let unrelated = RecordingProvider::new("texture", "image", previews.clone());

    let mut registry = ProviderRegistry::explicit_only();
    registry.register(material.clone());
    registry.register(mesh.clone());
    registry.register(unrelated);

    PreviewHarness {
        h: harness_with(config, DisposalPolicies::new(), registry),
        previews,
        material,
        mesh,
    }
}

fn provider_types(list: &[PreviewHandle]) -> Vec<&'static str> {
    list.iter().map(|wrapper| wrapper.provider_type()).collect()
}

#[test]
fn test_binding_wrapper_comes_first_then_providers_in_order() {
    let mut p = preview_harness(CacheConfig::default());
    let a = MockTarget::new(5);
    let mut handle = None;
    let binding = p.h.session.request_binding(&mut handle, &request(&a)).unwrap();

    let mut list = Vec::new();
    let appended = p.h.session.previews_for(&binding, &mut list);

    assert_eq!(appended, 3);
    assert_eq!(provider_types(&list), vec![BINDING_PREVIEW, "material", "mesh"]);
    assert!(Rc::ptr_eq(list[0].binding().unwrap(), &binding));
    assert!(list[0].key().is_none());
    assert_eq!(p.h.session.previews().len(), 2);
}

#[test]
fn test_results_are_appended_not_replaced() {
    let mut p = preview_harness(CacheConfig::default());
    let a = MockTarget::new(5);
    let mut handle = None;
    let binding = p.h.session.request_binding(&mut handle, &request(&a)).unwrap();

    let mut list = Vec::new();
    p.h.session.previews_for(&binding, &mut list);
    let appended = p.h.session.previews_for(&binding, &mut list);

    assert_eq!(appended, 3);
    assert_eq!(list.len(), 6);
}

#[test]
fn test_provider_wrappers_are_reused() {
    let mut p = preview_harness(CacheConfig::default());
    let a = MockTarget::new(5);
    let mut handle = None;
    let binding = p.h.session.request_binding(&mut handle, &request(&a)).unwrap();

    let mut first = Vec::new();
    p.h.session.previews_for(&binding, &mut first);
    let mut second = Vec::new();
    p.h.session.previews_for(&binding, &mut second);

    assert!(Rc::ptr_eq(&first[1], &second[1]));
    assert!(Rc::ptr_eq(&first[2], &second[2]));
    assert_eq!(p.previews.builds(), 2);
    assert_eq!(p.previews.activations(), 2);
    assert_eq!(p.h.session.previews().stats().hits, 2);
}

#[test]
fn test_preview_keys_combine_provider_and_targets() {
    let mut p = preview_harness(CacheConfig::default());
    let a = MockTarget::new(5);
    let mut handle = None;
    let binding = p.h.session.request_binding(&mut handle, &request(&a)).unwrap();

    let mut list = Vec::new();
    p.h.session.previews_for(&binding, &mut list);

    let target_key = binding.key().unwrap();
    assert_eq!(list[1].key(), Some(PreviewableKey::new("material", target_key)));
    assert_eq!(list[2].key(), Some(PreviewableKey::new("mesh", target_key)));
}

#[test]
fn test_structurally_invalid_wrapper_is_rebuilt() {
    let mut p = preview_harness(CacheConfig::default());
    let a = MockTarget::new(5);
    let mut handle = None;
    let binding = p.h.session.request_binding(&mut handle, &request(&a)).unwrap();

    let mut first = Vec::new();
    p.h.session.previews_for(&binding, &mut first);
    p.h.session.release_previews(&mut first, false);

    p.mesh.set_structure_valid(false);
    let mut second = Vec::new();
    p.h.session.previews_for(&binding, &mut second);

    assert_eq!(p.previews.builds(), 3, "only the mesh preview is rebuilt");
    assert_eq!(p.previews.teardowns(), 1);
    assert_eq!(p.h.session.previews().stats().stale_evictions, 1);
}

#[test]
fn test_dead_target_preview_swept_by_clean_up() {
    let mut p = preview_harness(CacheConfig::default());
    let a = MockTarget::new(5);
    let mut handle = None;
    let binding = p.h.session.request_binding(&mut handle, &request(&a)).unwrap();
    let mut list = Vec::new();
    p.h.session.previews_for(&binding, &mut list);
    p.h.session.release_previews(&mut list, false);
    p.h.session.release_binding(&mut handle, false);

    a.kill();
    let removed = p.h.session.clean_up();

    assert_eq!(removed, 3, "one binding and two previews");
    assert!(p.h.session.previews().is_empty());
    assert!(p.h.session.bindings().is_empty());
    assert_eq!(p.previews.teardowns(), 2);
}

#[test]
fn test_failing_provider_is_skipped_and_reported() {
    let mut p = preview_harness(CacheConfig::default());
    let a = MockTarget::new(5);
    let mut handle = None;
    let binding = p.h.session.request_binding(&mut handle, &request(&a)).unwrap();

    p.material.fail(true);
    let mut list = Vec::new();
    let appended = p.h.session.previews_for(&binding, &mut list);

    assert_eq!(appended, 2);
    assert_eq!(provider_types(&list), vec![BINDING_PREVIEW, "mesh"]);
    assert_eq!(p.h.diagnostics.error_count(), 1);
    assert!(p.h.diagnostics.messages()[0].contains("material"));
    assert_eq!(p.h.session.previews().stats().construction_failures, 1);
}

#[test]
fn test_target_type_without_providers_yields_binding_only() {
    let mut p = preview_harness(CacheConfig::default());
    let other = MockTarget::typed(9, "audio");
    let mut handle = None;
    let binding = p.h.session.request_binding(&mut handle, &request(&other)).unwrap();

    let mut list = Vec::new();
    assert_eq!(p.h.session.previews_for(&binding, &mut list), 1);
    assert_eq!(provider_types(&list), vec![BINDING_PREVIEW]);
    assert!(p.h.session.previews().is_empty());
}

#[test]
fn test_releasing_binding_wrapper_leaves_binding_alone() {
    let mut p = preview_harness(CacheConfig::default());
    let a = MockTarget::new(5);
    let mut handle = None;
    let binding = p.h.session.request_binding(&mut handle, &request(&a)).unwrap();

    let mut list = Vec::new();
    p.h.session.previews_for(&binding, &mut list);
    let binding_wrapper = list[0].clone();
    p.h.session.release_previews(&mut list, true);

    assert!(list.is_empty());
    assert!(binding_wrapper.is_disposed());
    assert!(!binding.is_disposed());
    assert_eq!(p.h.recorder.teardowns(), 0);
    assert_eq!(p.previews.teardowns(), 2);
    assert!(p.h.session.previews().is_empty());
}

#[test]
fn test_binding_wrapper_release_is_not_counted_as_disposal() {
    let mut p = preview_harness(CacheConfig::default());
    let a = MockTarget::new(5);
    let mut handle = None;
    let binding = p.h.session.request_binding(&mut handle, &request(&a)).unwrap();

    let mut list = Vec::new();
    p.h.session.previews_for(&binding, &mut list);
    p.h.session.release_previews(&mut list, false);

    assert!(!binding.is_disposed());
    assert_eq!(p.previews.teardowns(), 0);
    assert_eq!(p.h.session.previews().stats().disposed, 0);
    assert_eq!(p.h.session.stats().disposed, 0);

    let mut list = Vec::new();
    p.h.session.previews_for(&binding, &mut list);
    p.h.session.release_previews(&mut list, true);

    assert_eq!(p.previews.teardowns(), 2);
    assert_eq!(p.h.session.previews().stats().disposed, 2);
}

#[test]
fn test_soft_release_keeps_previews_cached() {
    let mut p = preview_harness(CacheConfig::default());
    let a = MockTarget::new(5);
    let mut handle = None;
    let binding = p.h.session.request_binding(&mut handle, &request(&a)).unwrap();

    let mut list = Vec::new();
    p.h.session.previews_for(&binding, &mut list);
    p.h.session.release_previews(&mut list, false);

    assert_eq!(p.h.session.previews().len(), 2);
    assert_eq!(p.previews.teardowns(), 0);
}

#[test]
fn test_disabled_provider_is_never_created() {
    let config = CacheConfig {
        disabled_providers: vec!["mesh".to_string()],
        ..CacheConfig::default()
    };
    let mut p = preview_harness(config);
    let a = MockTarget::new(5);
    let mut handle = None;
    let binding = p.h.session.request_binding(&mut handle, &request(&a)).unwrap();

    let mut list = Vec::new();
    p.h.session.previews_for(&binding, &mut list);

    assert_eq!(provider_types(&list), vec![BINDING_PREVIEW, "material"]);
    assert_eq!(p.previews.builds(), 1);
}

#[test]
fn test_provider_failure_error_names_provider() {
    let err = CacheError::ProviderFailed {
        provider: "material",
        source: anyhow::anyhow!("boom"),
    };
    assert!(err.to_string().contains("material"));
}

#[test]
fn test_close_tears_down_everything() {
    let mut p = preview_harness(CacheConfig::default());
    let a = MockTarget::new(5);
    let mut handle = None;
    let binding = p.h.session.request_binding(&mut handle, &request(&a)).unwrap();
    let mut list = Vec::new();
    p.h.session.previews_for(&binding, &mut list);

    p.h.session.close();

    assert!(p.h.session.previews().is_empty());
    assert!(p.h.session.bindings().is_empty());
    assert!(binding.is_disposed());
    assert_eq!(p.previews.teardowns(), 2);
    assert_eq!(p.h.recorder.teardowns(), 1);
}
