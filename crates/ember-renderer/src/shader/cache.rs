//! Named shader program cache.

use std::collections::HashMap;

use super::{
    BindingSlot, BindingTable, ProgramDescription, ShaderSource, ShaderStageKind,
    StageDescription, StageInterface, has_entry_point,
};
use crate::error::ShaderError;

/// Index of a program inside a [`ShaderProgramCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(usize);

impl ProgramHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A compiled and linked program.
pub struct ShaderProgram {
    name: String,
    vertex: wgpu::ShaderModule,
    fragment: Option<wgpu::ShaderModule>,
    bindings: BindingTable,
}

impl ShaderProgram {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_module(&self) -> &wgpu::ShaderModule {
        &self.vertex
    }

    /// `None` for depth-only programs.
    pub fn fragment_module(&self) -> Option<&wgpu::ShaderModule> {
        self.fragment.as_ref()
    }

    /// Slot of a named resource, as declared in the program's sources.
    pub fn binding(&self, name: &str) -> Option<BindingSlot> {
        self.bindings.get(name)
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }
}

/// A stage whose source has been loaded and checked.
#[derive(Debug, Clone)]
pub struct PreparedStage {
    pub kind: ShaderStageKind,
    pub path: String,
    pub source: String,
}

/// A program that passed every check that does not need a device.
#[derive(Debug, Clone)]
pub struct PreparedProgram {
    pub name: String,
    pub stages: Vec<PreparedStage>,
    pub bindings: BindingTable,
}

/// Checks the stage list of a program.
///
/// A program needs exactly one vertex stage and at most one fragment stage.
pub fn validate_stages(program: &str, stages: &[StageDescription]) -> Result<(), ShaderError> {
    let invalid = |reason: String| ShaderError::InvalidStages {
        program: program.to_string(),
        reason,
    };

    if stages.is_empty() {
        return Err(invalid("no stages declared".into()));
    }
    let count = |kind| stages.iter().filter(|s| s.kind == kind).count();
    let vertex = count(ShaderStageKind::Vertex);
    if vertex != 1 {
        return Err(invalid(format!("expected one vertex stage, found {vertex}")));
    }
    let fragment = count(ShaderStageKind::Fragment);
    if fragment > 1 {
        return Err(invalid(format!("expected at most one fragment stage, found {fragment}")));
    }
    Ok(())
}

/// Loads, checks and links a program without touching the GPU.
pub fn prepare_program(
    name: &str,
    stages: &[StageDescription],
    source: &dyn ShaderSource,
) -> Result<PreparedProgram, ShaderError> {
    validate_stages(name, stages)?;

    let mut prepared = Vec::with_capacity(stages.len());
    let mut tables = Vec::with_capacity(stages.len());
    for stage in stages {
        let text = source.load(&stage.path)?;
        if !has_entry_point(&text, stage.kind) {
            return Err(ShaderError::Compile {
                program: name.to_string(),
                path: stage.path.clone(),
                message: format!(
                    "missing `{} fn {}` entry point",
                    stage.kind.attribute(),
                    stage.kind.entry_point()
                ),
            });
        }
        tables.push(BindingTable::parse(&text));
        prepared.push(PreparedStage {
            kind: stage.kind,
            path: stage.path.clone(),
            source: text,
        });
    }

    let bindings = BindingTable::link(name, &tables.iter().collect::<Vec<_>>())?;
    link_interface(name, &prepared)?;
    Ok(PreparedProgram {
        name: name.to_string(),
        stages: prepared,
        bindings,
    })
}

/// Matches the fragment stage's inputs against the vertex stage's outputs.
fn link_interface(name: &str, stages: &[PreparedStage]) -> Result<(), ShaderError> {
    let source_of = |kind: ShaderStageKind| stages.iter().find(|s| s.kind == kind).map(|s| s.source.as_str());
    let (Some(vertex), Some(fragment)) = (
        source_of(ShaderStageKind::Vertex),
        source_of(ShaderStageKind::Fragment),
    ) else {
        return Ok(());
    };

    match (
        StageInterface::vertex_outputs(vertex),
        StageInterface::fragment_inputs(fragment),
    ) {
        (Some(outputs), Some(inputs)) => StageInterface::link(name, &outputs, &inputs),
        _ => {
            tracing::debug!(program = name, "Stage interface not resolved, location check skipped");
            Ok(())
        }
    }
}

/// Owns every compiled program for the lifetime of the renderer.
///
/// Programs that fail to compile are logged and left out; looking one up
/// with [`ShaderProgramCache::get`] afterwards aborts.
pub struct ShaderProgramCache {
    programs: Vec<ShaderProgram>,
    names: HashMap<String, ProgramHandle>,
}

impl ShaderProgramCache {
    pub fn new() -> Self {
        Self {
            programs: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Compiles and links one program, replacing any program with the same name.
    pub fn compile(
        &mut self,
        device: &wgpu::Device,
        source: &dyn ShaderSource,
        name: &str,
        stages: &[StageDescription],
    ) -> Result<ProgramHandle, ShaderError> {
        let prepared = prepare_program(name, stages, source)?;

        let mut vertex = None;
        let mut fragment = None;
        for stage in &prepared.stages {
            let module = compile_module(device, name, stage)?;
            match stage.kind {
                ShaderStageKind::Vertex => vertex = Some(module),
                ShaderStageKind::Fragment => fragment = Some(module),
            }
        }
        let vertex = vertex.ok_or_else(|| ShaderError::InvalidStages {
            program: name.to_string(),
            reason: "no vertex stage".into(),
        })?;

        let program = ShaderProgram {
            name: name.to_string(),
            vertex,
            fragment,
            bindings: prepared.bindings,
        };

        tracing::info!(
            program = name,
            stages = prepared.stages.len(),
            bindings = program.bindings.len(),
            "Compiled shader program"
        );

        let handle = match self.names.get(name) {
            Some(&handle) => {
                self.programs[handle.0] = program;
                handle
            }
            None => {
                let handle = ProgramHandle(self.programs.len());
                self.programs.push(program);
                self.names.insert(name.to_string(), handle);
                handle
            }
        };
        Ok(handle)
    }

    /// Compiles every program, logging and skipping failures.
    ///
    /// Returns the errors of the programs that were left out.
    pub fn compile_all(
        &mut self,
        device: &wgpu::Device,
        source: &dyn ShaderSource,
        programs: &[ProgramDescription],
    ) -> Vec<ShaderError> {
        let mut failures = Vec::new();
        for desc in programs {
            if let Err(err) = self.compile(device, source, &desc.name, &desc.stages) {
                tracing::error!(program = %desc.name, %err, "Shader program omitted");
                failures.push(err);
            }
        }
        failures
    }

    pub fn try_get(&self, name: &str) -> Result<ProgramHandle, ShaderError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| ShaderError::MissingProgram(name.to_string()))
    }

    /// Looks up a program that the caller cannot run without.
    ///
    /// # Panics
    ///
    /// Panics if no program with this name was compiled.
    pub fn get(&self, name: &str) -> ProgramHandle {
        match self.try_get(name) {
            Ok(handle) => handle,
            Err(err) => {
                tracing::error!(%err, "Required shader program is missing");
                panic!("{err}");
            }
        }
    }

    /// The program behind a handle returned by this cache.
    pub fn program(&self, handle: ProgramHandle) -> &ShaderProgram {
        &self.programs[handle.0]
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.programs.iter().map(|p| p.name.as_str())
    }

    /// Releases every program. Consumes the cache so this happens once.
    pub fn release(self) -> usize {
        let count = self.programs.len();
        drop(self.programs);
        tracing::info!(count, "Released shader programs");
        count
    }
}

impl Default for ShaderProgramCache {
    fn default() -> Self {
        Self::new()
    }
}

fn compile_module(
    device: &wgpu::Device,
    program: &str,
    stage: &PreparedStage,
) -> Result<wgpu::ShaderModule, ShaderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&stage.path),
        source: wgpu::ShaderSource::Wgsl(stage.source.as_str().into()),
    });
    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(module),
        Some(err) => Err(ShaderError::Compile {
            program: program.to_string(),
            path: stage.path.clone(),
            message: err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{EmbeddedShaders, InlineShaders, builtin_programs};

    const VS: &str = "@group(0) @binding(0) var<uniform> camera: mat4x4<f32>;\n\
                      @vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }";
    const FS: &str = "@group(0) @binding(0) var<uniform> camera: mat4x4<f32>;\n\
                      @fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
    const FS_CONFLICT: &str = "@group(0) @binding(0) var<uniform> lights: vec4<f32>;\n\
                      @fragment fn fs_main() -> @location(0) vec4<f32> { return lights; }";

    const VS_UV: &str = "struct Out { @builtin(position) p: vec4<f32>, @location(0) uv: vec2<f32>, };\n\
                         @vertex fn vs_main() -> Out { var o: Out; return o; }";
    const FS_UV: &str = "@fragment fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> { return vec4<f32>(uv, 0.0, 1.0); }";
    const FS_COLOR: &str = "@fragment fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> { return color; }";

    fn source() -> InlineShaders {
        InlineShaders::new()
            .with("a.vert", VS)
            .with("a.frag", FS)
            .with("conflict.frag", FS_CONFLICT)
            .with("uv.vert", VS_UV)
            .with("uv.frag", FS_UV)
            .with("color.frag", FS_COLOR)
    }

    #[test]
    fn test_prepare_valid_program() {
        let stages = [StageDescription::vertex("a.vert"), StageDescription::fragment("a.frag")];
        let program = prepare_program("Test", &stages, &source()).unwrap();
        assert_eq!(program.stages.len(), 2);
        assert_eq!(program.bindings.get("camera"), Some(BindingSlot { group: 0, binding: 0 }));
    }

    #[test]
    fn test_vertex_only_program() {
        let program = prepare_program("Depth", &[StageDescription::vertex("a.vert")], &source());
        assert!(program.is_ok());
    }

    #[test]
    fn test_missing_vertex_stage() {
        let result = prepare_program("Test", &[StageDescription::fragment("a.frag")], &source());
        assert!(matches!(result, Err(ShaderError::InvalidStages { .. })));
    }

    #[test]
    fn test_duplicate_vertex_stage() {
        let stages = [StageDescription::vertex("a.vert"), StageDescription::vertex("a.vert")];
        assert!(matches!(
            prepare_program("Test", &stages, &source()),
            Err(ShaderError::InvalidStages { .. })
        ));
    }

    #[test]
    fn test_wrong_stage_kind_is_compile_error() {
        // A fragment module declared as a vertex stage has no vs_main.
        let stages = [StageDescription::vertex("a.frag")];
        assert!(matches!(
            prepare_program("Test", &stages, &source()),
            Err(ShaderError::Compile { .. })
        ));
    }

    #[test]
    fn test_incompatible_stages_fail_to_link() {
        let stages = [
            StageDescription::vertex("a.vert"),
            StageDescription::fragment("conflict.frag"),
        ];
        assert!(matches!(
            prepare_program("Test", &stages, &source()),
            Err(ShaderError::Link { .. })
        ));
    }

    #[test]
    fn test_mismatched_varyings_fail_to_link() {
        let matched = [StageDescription::vertex("uv.vert"), StageDescription::fragment("uv.frag")];
        assert!(prepare_program("Test", &matched, &source()).is_ok());

        let mismatched = [StageDescription::vertex("uv.vert"), StageDescription::fragment("color.frag")];
        assert!(matches!(
            prepare_program("Test", &mismatched, &source()),
            Err(ShaderError::Link { .. })
        ));

        // Nothing is written at location 0 by a builtin-only vertex stage.
        let unwritten = [StageDescription::vertex("a.vert"), StageDescription::fragment("uv.frag")];
        assert!(prepare_program("Test", &unwritten, &source()).is_err());
    }

    #[test]
    fn test_missing_source() {
        let stages = [StageDescription::vertex("missing.vert")];
        assert!(matches!(
            prepare_program("Test", &stages, &source()),
            Err(ShaderError::UnknownStage(_))
        ));
    }

    #[test]
    fn test_builtin_programs_prepare() {
        for desc in builtin_programs() {
            let prepared = prepare_program(&desc.name, &desc.stages, &EmbeddedShaders);
            assert!(prepared.is_ok(), "{}: {:?}", desc.name, prepared.err());
        }
    }

    #[test]
    fn test_lookup_missing_program() {
        let cache = ShaderProgramCache::new();
        assert!(matches!(cache.try_get("SSAO"), Err(ShaderError::MissingProgram(_))));
        assert!(!cache.contains("SSAO"));
    }

    #[test]
    #[should_panic(expected = "shader program not found: SSAO")]
    fn test_get_missing_program_panics() {
        ShaderProgramCache::new().get("SSAO");
    }
}
