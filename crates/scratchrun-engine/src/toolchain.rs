//! Collaborators the orchestrator drives
//!
//! Each stage that needs a compiler service goes through one of these traits.
//! Implementations must be `Send + Sync` so one executor can serve runs on
//! several threads.

use std::path::{Path, PathBuf};

use scratchrun_utils::types::ScratchFile;

use crate::stages::{
    Analysis, AnalyzerFault, BackendError, ExpandedContext, GenerationFilter,
    InstrumentationResult, ModuleContext, SourceUnit, UnitSource,
};

pub use scratchrun_runner::ProcessRunner;

/// Source-to-source rewrite that injects the output markers.
pub trait Instrumenter: Send + Sync {
    fn process(&self, file: &ScratchFile) -> InstrumentationResult;
}

/// Semantic checker. `Err` means the analyzer itself broke, not the code.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, unit: &SourceUnit<'_>) -> Result<Analysis, AnalyzerFault>;
}

/// Expands an analyzed module context into what code generation needs.
pub trait ClosureResolver: Send + Sync {
    fn resolve(
        &self,
        context: ModuleContext,
        unit: &SourceUnit<'_>,
    ) -> Result<ExpandedContext, AnalyzerFault>;
}

/// Code generator. Writes artifacts for filtered units into `out_dir` and
/// returns the files it produced.
pub trait Backend: Send + Sync {
    fn generate(
        &self,
        context: &ExpandedContext,
        filter: &GenerationFilter,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, BackendError>;
}

/// Resolver that takes the analyzer's dependency files as the full closure.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughResolver;

impl ClosureResolver for PassthroughResolver {
    fn resolve(
        &self,
        context: ModuleContext,
        unit: &SourceUnit<'_>,
    ) -> Result<ExpandedContext, AnalyzerFault> {
        Ok(ExpandedContext {
            module: context.module,
            sources: vec![UnitSource {
                name: unit.name().to_string(),
                code: unit.text().to_string(),
            }],
            dependency_files: context.dependency_files,
        })
    }
}

/// The four compiler-side collaborators of one executor.
pub struct Toolchain {
    pub instrumenter: Box<dyn Instrumenter>,
    pub analyzer: Box<dyn Analyzer>,
    pub resolver: Box<dyn ClosureResolver>,
    pub backend: Box<dyn Backend>,
}

impl std::fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolchain").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::InstrumentedUnit;

    #[test]
    fn test_passthrough_keeps_dependencies_and_source() {
        let file = ScratchFile::from_source("s.kts", "1 + 1");
        let unit = InstrumentedUnit::new(&file, "println(1 + 1)".to_string(), "SKt".to_string());
        let context = ModuleContext {
            module: Some("app".to_string()),
            dependency_files: vec![PathBuf::from("lib/a.jar")],
        };

        let expanded = PassthroughResolver
            .resolve(context, &SourceUnit::Instrumented(&unit))
            .unwrap();
        assert_eq!(expanded.module.as_deref(), Some("app"));
        assert_eq!(expanded.dependency_files, vec![PathBuf::from("lib/a.jar")]);
        assert_eq!(
            expanded.sources,
            vec![UnitSource {
                name: "s.kts".to_string(),
                code: "println(1 + 1)".to_string(),
            }]
        );
    }
}
