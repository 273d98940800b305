//! Mock implementations for testing

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Mutex;

use inspect_core::diagnostics::{Diagnostic, DiagnosticHandler, DiagnosticLevel};
use inspect_core::preview::{PreviewProvider, PreviewState};
use inspect_core::target::{all_alive, Target, TargetRef};
use inspect_core::{BindingBuilder, BindingContext, BindingState, SubResource};

/// A mock diagnostic handler that collects diagnostics
#[derive(Debug, Default)]
pub struct MockDiagnosticHandler {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl MockDiagnosticHandler {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<String> {
        self.diagnostics
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.message.clone())
            .collect()
    }
}

impl DiagnosticHandler for MockDiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().unwrap().push(diagnostic);
    }

    fn error_count(&self) -> usize {
        self.diagnostics
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
            .count()
    }

    fn warning_count(&self) -> usize {
        self.diagnostics
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
            .count()
    }
}

/// An inspectable object that can be destroyed on demand
#[derive(Debug)]
pub struct MockTarget {
    id: i32,
    alive: Cell<bool>,
    type_name: &'static str,
    capabilities: Vec<&'static str>,
}

impl MockTarget {
    pub fn new(id: i32) -> Rc<Self> {
        Self::typed(id, "mock")
    }

    pub fn typed(id: i32, type_name: &'static str) -> Rc<Self> {
        Self::with_capabilities(id, type_name, &[])
    }

    pub fn with_capabilities(
        id: i32,
        type_name: &'static str,
        capabilities: &[&'static str],
    ) -> Rc<Self> {
        Rc::new(Self {
            id,
            alive: Cell::new(true),
            type_name,
            capabilities: capabilities.to_vec(),
        })
    }

    pub fn kill(&self) {
        self.alive.set(false);
    }

    pub fn revive(&self) {
        self.alive.set(true);
    }
}

impl Target for MockTarget {
    fn identity(&self) -> i32 {
        self.id
    }

    fn is_alive(&self) -> bool {
        self.alive.get()
    }

    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn capabilities(&self) -> &[&'static str] {
        &self.capabilities
    }
}

/// Lifecycle event seen by a [`Recorder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Built(u32),
    Activated(u32),
    Teardown(u32),
    Released(u32),
}

/// Shared log of lifecycle events; each built state gets a serial number
#[derive(Debug, Default)]
pub struct Recorder {
    events: RefCell<Vec<Event>>,
    next_serial: Cell<u32>,
}

impl Recorder {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn next_serial(&self) -> u32 {
        let serial = self.next_serial.get() + 1;
        self.next_serial.set(serial);
        self.record(Event::Built(serial));
        serial
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| predicate(e)).count()
    }

    pub fn builds(&self) -> usize {
        self.count(|e| matches!(e, Event::Built(_)))
    }

    pub fn activations(&self) -> usize {
        self.count(|e| matches!(e, Event::Activated(_)))
    }

    pub fn teardowns(&self) -> usize {
        self.count(|e| matches!(e, Event::Teardown(_)))
    }

    pub fn teardowns_of(&self, serial: u32) -> usize {
        self.count(|e| *e == Event::Teardown(serial))
    }

    pub fn releases_of(&self, serial: u32) -> usize {
        self.count(|e| *e == Event::Released(serial))
    }

    /// Serial of the most recently built state
    pub fn last_serial(&self) -> u32 {
        self.next_serial.get()
    }
}

/// Builder that logs every lifecycle step into a [`Recorder`]
pub struct RecordingBuilder {
    kind: &'static str,
    recorder: Rc<Recorder>,
    fail_builds: Cell<bool>,
    fail_teardowns: Rc<Cell<bool>>,
}

impl RecordingBuilder {
    pub fn new(kind: &'static str, recorder: Rc<Recorder>) -> Rc<Self> {
        Rc::new(Self {
            kind,
            recorder,
            fail_builds: Cell::new(false),
            fail_teardowns: Rc::new(Cell::new(false)),
        })
    }

    pub fn fail_builds(&self, fail: bool) {
        self.fail_builds.set(fail);
    }

    pub fn fail_teardowns(&self, fail: bool) {
        self.fail_teardowns.set(fail);
    }
}

impl BindingBuilder for RecordingBuilder {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn build(
        &self,
        targets: &[Option<TargetRef>],
        _context: Option<&BindingContext>,
    ) -> anyhow::Result<Box<dyn BindingState>> {
        if self.fail_builds.get() {
            anyhow::bail!("initializer callback failed");
        }
        if !all_alive(targets) {
            anyhow::bail!("target set contains destroyed objects");
        }

        Ok(Box::new(RecordingState {
            serial: self.recorder.next_serial(),
            recorder: self.recorder.clone(),
            fail_teardown: self.fail_teardowns.clone(),
            sub_resource_taken: false,
        }))
    }
}

struct RecordingState {
    serial: u32,
    recorder: Rc<Recorder>,
    fail_teardown: Rc<Cell<bool>>,
    sub_resource_taken: bool,
}

impl BindingState for RecordingState {
    fn on_activated(&mut self) {
        self.recorder.record(Event::Activated(self.serial));
    }

    fn take_sub_resource(&mut self) -> Option<Box<dyn SubResource>> {
        if self.sub_resource_taken {
            return None;
        }
        self.sub_resource_taken = true;
        Some(Box::new(RecordingSubResource {
            serial: self.serial,
            recorder: self.recorder.clone(),
        }))
    }

    fn teardown(&mut self) -> anyhow::Result<()> {
        self.recorder.record(Event::Teardown(self.serial));
        if self.fail_teardown.get() {
            anyhow::bail!("host teardown threw");
        }
        Ok(())
    }
}

struct RecordingSubResource {
    serial: u32,
    recorder: Rc<Recorder>,
}

impl SubResource for RecordingSubResource {
    fn release(self: Box<Self>) -> anyhow::Result<()> {
        self.recorder.record(Event::Released(self.serial));
        Ok(())
    }
}

/// Preview provider that logs into a [`Recorder`]
///
/// `structure_valid` is shared with every state it creates, so flipping it
/// invalidates all of them at once.
pub struct RecordingProvider {
    provider_type: &'static str,
    target_type: &'static str,
    recorder: Rc<Recorder>,
    fail: Cell<bool>,
    structure_valid: Rc<Cell<bool>>,
}

impl RecordingProvider {
    pub fn new(
        provider_type: &'static str,
        target_type: &'static str,
        recorder: Rc<Recorder>,
    ) -> Rc<Self> {
        Rc::new(Self {
            provider_type,
            target_type,
            recorder,
            fail: Cell::new(false),
            structure_valid: Rc::new(Cell::new(true)),
        })
    }

    pub fn fail(&self, fail: bool) {
        self.fail.set(fail);
    }

    pub fn set_structure_valid(&self, valid: bool) {
        self.structure_valid.set(valid);
    }
}

impl PreviewProvider for RecordingProvider {
    fn provider_type(&self) -> &'static str {
        self.provider_type
    }

    fn target_type(&self) -> &'static str {
        self.target_type
    }

    fn create(&self, _targets: &[Option<TargetRef>]) -> anyhow::Result<Box<dyn PreviewState>> {
        if self.fail.get() {
            anyhow::bail!("provider rejected the targets");
        }
        Ok(Box::new(RecordingPreview {
            serial: self.recorder.next_serial(),
            recorder: self.recorder.clone(),
            structure_valid: self.structure_valid.clone(),
        }))
    }
}

struct RecordingPreview {
    serial: u32,
    recorder: Rc<Recorder>,
    structure_valid: Rc<Cell<bool>>,
}

impl PreviewState for RecordingPreview {
    fn on_activated(&mut self) {
        self.recorder.record(Event::Activated(self.serial));
    }

    fn is_structurally_valid(&self) -> bool {
        self.structure_valid.get()
    }

    fn teardown(&mut self) -> anyhow::Result<()> {
        self.recorder.record(Event::Teardown(self.serial));
        Ok(())
    }
}
