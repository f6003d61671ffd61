//! Ordered stage registry.
//!
//! The registry owns the pipeline's stages and drives their lifecycle
//! (resize, prepare, execute, destroy) in frame order.

use crate::context::RenderContext;
use crate::frame::{FrameResourceSet, TargetId};
use crate::traits::{FrameContext, RenderStage, StageKind};

/// Returns true if an enabled stage can run with the given target states.
fn can_execute(stage: &dyn RenderStage, is_complete: impl Fn(TargetId) -> bool) -> bool {
    stage.is_enabled() && stage.required_targets().iter().all(|&id| is_complete(id))
}

/// Registry holding at most one stage per [`StageKind`], sorted by kind.
pub struct StageRegistry {
    stages: Vec<Box<dyn RenderStage>>,
    sorted: bool,
}

impl StageRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            sorted: true,
        }
    }

    /// Registers a stage, replacing any stage of the same kind.
    pub fn register<S: RenderStage + 'static>(&mut self, stage: S) {
        if let Some(pos) = self.stages.iter().position(|s| s.kind() == stage.kind()) {
            tracing::warn!(
                kind = ?stage.kind(),
                old = self.stages[pos].name(),
                new = stage.name(),
                "Replacing registered stage"
            );
            let mut old = std::mem::replace(&mut self.stages[pos], Box::new(stage));
            old.on_destroy();
        } else {
            self.stages.push(Box::new(stage));
            self.sorted = false;
        }
    }

    /// Gets a stage by kind.
    pub fn get(&self, kind: StageKind) -> Option<&dyn RenderStage> {
        self.stages.iter().find(|s| s.kind() == kind).map(|s| s.as_ref())
    }

    /// Gets a mutable reference to a stage by kind.
    pub fn get_mut<'a>(&'a mut self, kind: StageKind) -> Option<&'a mut (dyn RenderStage + 'a)> {
        for stage in &mut self.stages {
            if stage.kind() == kind {
                return Some(stage.as_mut());
            }
        }
        None
    }

    pub fn contains(&self, kind: StageKind) -> bool {
        self.stages.iter().any(|s| s.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns an iterator over all stages in frame order.
    pub fn iter(&mut self) -> impl Iterator<Item = &dyn RenderStage> {
        self.ensure_sorted();
        self.stages.iter().map(|s| s.as_ref())
    }

    fn ensure_sorted(&mut self) {
        if !self.sorted {
            self.stages.sort_by_key(|s| s.kind().order());
            self.sorted = true;
        }
    }

    /// Notifies every stage that frame targets were reallocated.
    pub fn resize_all(&mut self, ctx: &RenderContext, resources: &FrameResourceSet) {
        for stage in &mut self.stages {
            stage.on_resize(ctx, resources);
        }
    }

    /// Prepares every enabled stage.
    pub fn prepare_all(&mut self, frame: &FrameContext<'_>) {
        self.ensure_sorted();
        for stage in &mut self.stages {
            if stage.is_enabled() {
                stage.prepare(frame);
            }
        }
    }

    /// Records every runnable stage in frame order.
    ///
    /// Stages whose required targets are incomplete are skipped; their
    /// outputs are left undefined for this frame.
    pub fn execute_all(&mut self, frame: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder) {
        self.ensure_sorted();
        for stage in &self.stages {
            if can_execute(stage.as_ref(), |id| frame.resources.is_complete(id)) {
                stage.execute(frame, encoder);
            } else if stage.is_enabled() {
                tracing::trace!(stage = stage.name(), "Skipped stage with incomplete targets");
            }
        }
    }

    pub fn memory_bytes(&self) -> u64 {
        self.stages.iter().map(|s| s.memory_bytes()).sum()
    }

    /// Destroys all stages.
    pub fn destroy_all(&mut self) {
        for stage in &mut self.stages {
            stage.on_destroy();
        }
        self.stages.clear();
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestStage {
        name: String,
        kind: StageKind,
        enabled: bool,
        targets: &'static [TargetId],
    }

    impl TestStage {
        fn new(name: &str, kind: StageKind) -> Self {
            Self {
                name: name.to_string(),
                kind,
                enabled: true,
                targets: &[],
            }
        }
    }

    impl RenderStage for TestStage {
        fn name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> StageKind {
            self.kind
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn set_enabled(&mut self, enabled: bool) {
            self.enabled = enabled;
        }

        fn required_targets(&self) -> &'static [TargetId] {
            self.targets
        }

        fn on_resize(&mut self, _ctx: &RenderContext, _resources: &FrameResourceSet) {}
        fn prepare(&mut self, _frame: &FrameContext<'_>) {}
        fn execute(&self, _frame: &FrameContext<'_>, _encoder: &mut wgpu::CommandEncoder) {}
    }

    #[test]
    fn test_registry_ordering() {
        let mut registry = StageRegistry::new();

        registry.register(TestStage::new("lighting", StageKind::Lighting));
        registry.register(TestStage::new("shadow", StageKind::Shadow));
        registry.register(TestStage::new("overlay", StageKind::DebugOverlay));
        registry.register(TestStage::new("geometry", StageKind::Geometry));

        let names: Vec<&str> = registry.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["shadow", "geometry", "lighting", "overlay"]);
    }

    #[test]
    fn test_register_replaces_same_kind() {
        let mut registry = StageRegistry::new();
        registry.register(TestStage::new("first", StageKind::Ssao));
        registry.register(TestStage::new("second", StageKind::Ssao));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(StageKind::Ssao).map(|s| s.name()), Some("second"));
    }

    #[test]
    fn test_enable_toggle() {
        let mut registry = StageRegistry::new();
        registry.register(TestStage::new("blur", StageKind::SsaoBlur));

        if let Some(stage) = registry.get_mut(StageKind::SsaoBlur) {
            stage.set_enabled(false);
        }
        assert!(!registry.get(StageKind::SsaoBlur).is_some_and(|s| s.is_enabled()));
        assert!(!registry.contains(StageKind::Lighting));
    }

    #[test]
    fn test_incomplete_targets_block_execution() {
        let mut stage = TestStage::new("ssao", StageKind::Ssao);
        stage.targets = &[TargetId::GBuffer, TargetId::SsaoRaw];

        assert!(can_execute(&stage, |_| true));
        assert!(!can_execute(&stage, |id| id != TargetId::SsaoRaw));

        stage.enabled = false;
        assert!(!can_execute(&stage, |_| true));
    }

    #[test]
    fn test_destroy_all_empties_registry() {
        let mut registry = StageRegistry::new();
        registry.register(TestStage::new("shadow", StageKind::Shadow));
        registry.destroy_all();
        assert!(registry.is_empty());
    }
}
