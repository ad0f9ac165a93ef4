use camino::{Utf8Path, Utf8PathBuf};
use xcpatch_pbx::Project;
use xcpatch_types::context::HookContext;

use crate::patcher::FileSet;
use crate::ports::PlatformView;

mod embed_frameworks;
mod runpath;
mod strip_archs;
mod url_scheme;

pub use strip_archs::STRIP_PHASE_NAME;
pub use url_scheme::PAYMENTS_SCHEME;

/// What a step did. Errors are returned as `Err` and fail the run.
#[derive(Debug)]
pub enum StepAction {
    Applied { message: Option<String> },
    Skipped { message: String },
}

/// Mutable state shared by the steps for the duration of one run.
///
/// The project graph is threaded through explicitly; files other than the
/// pbxproj (Info.plist) are staged in memory and written by the runner.
pub struct StepContext<'a> {
    pub hook: &'a HookContext,
    pub view: &'a dyn PlatformView,
    pub project: &'a mut Project,
    pub project_name: &'a str,
    pub(crate) files: &'a mut FileSet,
}

impl StepContext<'_> {
    /// Current content of a staged file, falling back to disk on first read.
    pub fn read_file(&mut self, rel: &Utf8Path) -> anyhow::Result<String> {
        self.files.read(self.view, rel)
    }

    /// Stage new content for a file; the runner persists it at the end.
    pub fn stage_file(&mut self, rel: Utf8PathBuf, contents: String) {
        self.files.stage(rel, contents);
    }
}

pub trait PatchStep {
    /// Stable identifier used in reports and logs.
    fn id(&self) -> &'static str;

    fn title(&self) -> &'static str;

    /// Apply the step. Must be safe to re-run without duplicating state.
    fn apply(&self, cx: &mut StepContext<'_>) -> anyhow::Result<StepAction>;
}

/// The fixed step sequence, in execution order.
pub fn builtin_steps() -> Vec<Box<dyn PatchStep>> {
    vec![
        Box::new(runpath::RunpathSearchPaths),
        Box::new(embed_frameworks::EmbedFrameworks),
        Box::new(strip_archs::StripArchitectures),
        Box::new(url_scheme::RegisterUrlScheme),
    ]
}
