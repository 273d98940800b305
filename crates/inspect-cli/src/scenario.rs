//! JSON scenarios replayed against a session
//!
//! A scenario declares a set of inspectable objects and a list of steps that
//! act on them the way an inspector window would: requesting and releasing
//! bindings, listing previews, destroying objects, crossing a reload
//! boundary and advancing frames.

use anyhow::{bail, Context};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, info};

use inspect_core::preview::PreviewState;
use inspect_core::{
    BindingHandle, BindingRequest, CacheStats, ProviderRegistration, Session, Target, TargetRef,
};

/// Object types a scenario can declare
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectType {
    #[default]
    Mesh,
    Material,
    Texture,
    Light,
}

impl ObjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Mesh => "mesh",
            ObjectType::Material => "material",
            ObjectType::Texture => "texture",
            ObjectType::Light => "light",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDecl {
    pub id: i32,
    #[serde(rename = "type", default)]
    pub object_type: ObjectType,
}

/// One entry of a requested target list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TargetArg {
    /// A declared object by id
    Object(i32),
    /// The binding currently held under a handle name
    Binding { binding: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
    Create {
        id: i32,
        #[serde(rename = "type", default)]
        object_type: ObjectType,
    },
    Request {
        handle: String,
        targets: Vec<Option<TargetArg>>,
        #[serde(default)]
        variant: bool,
        #[serde(default)]
        kind: Option<String>,
        #[serde(default = "default_true")]
        cache: bool,
    },
    Release {
        handle: String,
        #[serde(default)]
        force: bool,
    },
    Previews {
        handle: String,
    },
    Kill {
        target: i32,
    },
    Revive {
        target: i32,
    },
    CleanUp,
    /// Snapshot, destroy the listed objects, then restore
    Reload {
        #[serde(default)]
        destroy: Vec<i32>,
    },
    Tick {
        #[serde(default = "default_one")]
        count: u32,
    },
}

fn default_true() -> bool {
    true
}

fn default_one() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default)]
    pub objects: Vec<ObjectDecl>,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Invalid scenario")
    }
}

/// Object with an identity token that a step can destroy
#[derive(Debug)]
struct ScenarioObject {
    id: i32,
    object_type: ObjectType,
    alive: Cell<bool>,
}

impl Target for ScenarioObject {
    fn identity(&self) -> i32 {
        self.id
    }

    fn is_alive(&self) -> bool {
        self.alive.get()
    }

    fn type_name(&self) -> &'static str {
        self.object_type.as_str()
    }
}

struct StaticPreview;

impl PreviewState for StaticPreview {}

fn create_static_preview(
    _targets: &[Option<TargetRef>],
) -> anyhow::Result<Box<dyn PreviewState>> {
    Ok(Box::new(StaticPreview))
}

inventory::submit! {
    ProviderRegistration {
        provider_type: "wireframe",
        target_type: "mesh",
        create: create_static_preview,
    }
}

inventory::submit! {
    ProviderRegistration {
        provider_type: "swatch",
        target_type: "material",
        create: create_static_preview,
    }
}

/// Outcome of a replay
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub steps: usize,
    pub ticks: u64,
    pub bindings: usize,
    pub previews: usize,
    pub previews_listed: usize,
    pub failed_requests: usize,
    pub stats: CacheStats,
}

pub struct Runner {
    session: Session,
    objects: FxHashMap<i32, Rc<ScenarioObject>>,
    handles: FxHashMap<String, Option<BindingHandle>>,
    steps: usize,
    previews_listed: usize,
    failed_requests: usize,
}

impl Runner {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            objects: FxHashMap::default(),
            handles: FxHashMap::default(),
            steps: 0,
            previews_listed: 0,
            failed_requests: 0,
        }
    }

    pub fn run(&mut self, scenario: &Scenario) -> anyhow::Result<()> {
        for object in &scenario.objects {
            self.create(object.id, object.object_type)?;
        }

        for (index, step) in scenario.steps.iter().enumerate() {
            self.apply(step)
                .with_context(|| format!("Step {} failed", index + 1))?;
            self.steps += 1;
        }

        info!("Replayed {} step(s)", self.steps);
        Ok(())
    }

    fn apply(&mut self, step: &Step) -> anyhow::Result<()> {
        debug!("Applying {:?}", step);
        match step {
            Step::Create { id, object_type } => self.create(*id, *object_type)?,
            Step::Request {
                handle,
                targets,
                variant,
                kind,
                cache,
            } => {
                let mut request = BindingRequest::new(self.resolve_targets(targets)?).variant(*variant);
                if let Some(kind) = kind {
                    request = request.kind(kind.clone());
                }
                if !*cache {
                    request = request.uncached();
                }

                let slot = self.handles.entry(handle.clone()).or_default();
                if self.session.request_binding(slot, &request).is_err() {
                    self.failed_requests += 1;
                }
            }
            Step::Release { handle, force } => {
                if let Some(slot) = self.handles.get_mut(handle) {
                    self.session.release_binding(slot, *force);
                }
            }
            Step::Previews { handle } => {
                let binding = self.held(handle)?;
                let mut previews = Vec::new();
                self.previews_listed += self.session.previews_for(&binding, &mut previews);
                self.session.release_previews(&mut previews, false);
            }
            Step::Kill { target } => self.object(*target)?.alive.set(false),
            Step::Revive { target } => self.object(*target)?.alive.set(true),
            Step::CleanUp => {
                let removed = self.session.clean_up();
                debug!("Cleanup removed {} entries", removed);
            }
            Step::Reload { destroy } => {
                let snapshot = self.session.on_before_snapshot();
                for id in destroy {
                    self.object(*id)?.alive.set(false);
                }
                self.session.on_after_restore(snapshot);
            }
            Step::Tick { count } => {
                for _ in 0..*count {
                    let report = self.session.tick();
                    debug!("Tick {}: {:?}", self.session.ticks(), report);
                }
            }
        }
        Ok(())
    }

    fn create(&mut self, id: i32, object_type: ObjectType) -> anyhow::Result<()> {
        if self.objects.contains_key(&id) {
            bail!("Object {} is declared twice", id);
        }
        self.objects.insert(
            id,
            Rc::new(ScenarioObject {
                id,
                object_type,
                alive: Cell::new(true),
            }),
        );
        Ok(())
    }

    fn object(&self, id: i32) -> anyhow::Result<&Rc<ScenarioObject>> {
        self.objects
            .get(&id)
            .with_context(|| format!("Unknown object {}", id))
    }

    fn held(&self, handle: &str) -> anyhow::Result<BindingHandle> {
        self.handles
            .get(handle)
            .and_then(Option::clone)
            .with_context(|| format!("Handle '{}' holds no binding", handle))
    }

    fn resolve_targets(&self, targets: &[Option<TargetArg>]) -> anyhow::Result<Vec<Option<TargetRef>>> {
        targets
            .iter()
            .map(|target| match target {
                None => Ok(None),
                Some(TargetArg::Object(id)) => {
                    let object: Rc<dyn Target> = self.object(*id)?.clone();
                    Ok(Some(TargetRef::object(object)))
                }
                Some(TargetArg::Binding { binding }) => {
                    Ok(Some(TargetRef::binding(self.held(binding)?)))
                }
            })
            .collect()
    }

    /// Summarise the replay, then close the session
    pub fn finish(mut self) -> Summary {
        let summary = Summary {
            steps: self.steps,
            ticks: self.session.ticks(),
            bindings: self.session.bindings().len(),
            previews: self.session.previews().len(),
            previews_listed: self.previews_listed,
            failed_requests: self.failed_requests,
            stats: self.session.stats(),
        };
        self.session.close();
        summary
    }
}
