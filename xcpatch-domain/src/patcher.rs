//! The patch runner: load the project graph, run the step sequence, persist.
//!
//! Load → mutate → write → discard; the graph is exclusively owned for the
//! whole run and every write happens once, at the end. In dry-run mode the
//! same changes are computed but nothing touches disk.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use diffy::PatchFormatter;
use fs_err as fs;
use sha2::{Digest, Sha256};
use tracing::{error, info};
use xcpatch_pbx::Project;
use xcpatch_types::context::HookContext;
use xcpatch_types::report::{
    FileChange, PatchReport, PatchSummary, StepOutcome, StepStatus, ToolInfo,
};

use crate::ports::PlatformView;
use crate::steps::{builtin_steps, StepAction, StepContext};
use crate::PatchError;

#[derive(Debug, Clone, Default)]
pub struct PatchOptions {
    /// Compute everything, write nothing.
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct PatchOutcome {
    pub report: PatchReport,
    /// Content of every touched file before the run.
    pub before: BTreeMap<Utf8PathBuf, String>,
    /// Content after the run (written to disk unless dry-run or failed).
    pub after: BTreeMap<Utf8PathBuf, String>,
}

/// Files other than the pbxproj that steps rewrite, staged in memory.
/// `baseline` records disk content as of first read.
#[derive(Debug, Default)]
pub(crate) struct FileSet {
    pub(crate) baseline: BTreeMap<Utf8PathBuf, String>,
    pub(crate) current: BTreeMap<Utf8PathBuf, String>,
}

impl FileSet {
    pub(crate) fn read(
        &mut self,
        view: &dyn PlatformView,
        rel: &Utf8Path,
    ) -> anyhow::Result<String> {
        if let Some(contents) = self.current.get(rel) {
            return Ok(contents.clone());
        }
        if let Some(contents) = self.baseline.get(rel) {
            return Ok(contents.clone());
        }
        let contents = view.read_to_string(rel)?;
        self.baseline.insert(rel.to_path_buf(), contents.clone());
        Ok(contents)
    }

    pub(crate) fn stage(&mut self, rel: Utf8PathBuf, contents: String) {
        self.current.insert(rel, contents);
    }
}

/// Run the full patch sequence against the project tree under `view`.
///
/// A step error marks the step failed and aborts the remaining steps; nothing
/// is written in that case. `PatchError` is reserved for failures before any
/// step runs (no project file, unparseable pbxproj).
pub fn run_patch(
    hook: &HookContext,
    view: &dyn PlatformView,
    tool: ToolInfo,
    opts: &PatchOptions,
) -> Result<PatchOutcome, PatchError> {
    let pbx_rel = locate_project_file(view)?;
    let original = view
        .read_to_string(&pbx_rel)
        .map_err(|source| PatchError::Read {
            path: pbx_rel.clone(),
            source,
        })?;
    let mut project = Project::parse(&original)?;
    let project_name = project.first_target_name()?;
    info!(project = %project_name, pbxproj = %pbx_rel, "patching Xcode project");

    let mut files = FileSet::default();
    let mut report = PatchReport::new(tool, hook.clone());
    let mut summary = PatchSummary::default();
    let mut current_pbx = original.clone();
    let mut aborted = false;

    for step in builtin_steps() {
        summary.steps_total += 1;
        let snapshot_pbx = current_pbx.clone();
        let snapshot_files = files.current.clone();

        let mut cx = StepContext {
            hook,
            view,
            project: &mut project,
            project_name: &project_name,
            files: &mut files,
        };
        let action = step.apply(&mut cx);
        current_pbx = project.to_pbxproj();

        let mut outcome = StepOutcome {
            step_id: step.id().to_string(),
            title: step.title().to_string(),
            status: StepStatus::Skipped,
            message: None,
            files_changed: vec![],
        };

        match action {
            Ok(StepAction::Applied { message }) => {
                info!(step = step.id(), "applied");
                outcome.status = StepStatus::Applied;
                outcome.message = message;
                summary.applied += 1;
            }
            Ok(StepAction::Skipped { message }) => {
                info!(step = step.id(), message = %message, "skipped");
                outcome.status = StepStatus::Skipped;
                outcome.message = Some(message);
                summary.skipped += 1;
            }
            Err(e) => {
                error!(step = step.id(), "failed: {e:#}");
                outcome.status = StepStatus::Failed;
                outcome.message = Some(format!("{e:#}"));
                summary.failed += 1;
                aborted = true;
            }
        }

        if current_pbx != snapshot_pbx {
            outcome
                .files_changed
                .push(file_change(&pbx_rel, &snapshot_pbx, &current_pbx));
        }
        for (path, after) in &files.current {
            let before = snapshot_files
                .get(path)
                .or_else(|| files.baseline.get(path))
                .cloned()
                .unwrap_or_default();
            if &before != after {
                outcome.files_changed.push(file_change(path, &before, after));
            }
        }

        report.steps.push(outcome);
        if aborted {
            break;
        }
    }

    let mut before = BTreeMap::new();
    before.insert(pbx_rel.clone(), original);
    before.extend(files.baseline.clone());

    let mut after = BTreeMap::new();
    after.insert(pbx_rel, current_pbx);
    after.extend(files.current.clone());

    summary.files_modified = after
        .iter()
        .filter(|(path, contents)| before.get(*path) != Some(*contents))
        .count() as u64;

    let persist = !opts.dry_run && summary.failed == 0;
    if persist {
        for (path, contents) in &after {
            if before.get(path) == Some(contents) {
                continue;
            }
            let abs = view.root().join(path);
            fs::write(&abs, contents).map_err(|source| PatchError::Write {
                path: path.clone(),
                source,
            })?;
        }
    }

    report.applied = persist;
    report.summary = summary;
    report.run.ended_at = Some(Utc::now());

    Ok(PatchOutcome {
        report,
        before,
        after,
    })
}

/// Search the platform directory for the generated Xcode project. A missing
/// project file is fatal to the tool; everything downstream needs the graph.
fn locate_project_file(view: &dyn PlatformView) -> Result<Utf8PathBuf, PatchError> {
    let base = Utf8PathBuf::from("platforms/ios");
    let entries = view
        .read_dir(&base)
        .map_err(|_| PatchError::MissingProjectFile {
            searched: base.clone(),
        })?;
    for entry in entries {
        if entry.extension() == Some("xcodeproj") && view.is_dir(&entry) {
            let pbx = entry.join("project.pbxproj");
            if view.exists(&pbx) {
                return Ok(pbx);
            }
        }
    }
    Err(PatchError::MissingProjectFile { searched: base })
}

fn file_change(path: &Utf8Path, before: &str, after: &str) -> FileChange {
    FileChange {
        path: path.to_string(),
        before_sha256: sha256_hex(before.as_bytes()),
        after_sha256: sha256_hex(after.as_bytes()),
        before_bytes: Some(before.len() as u64),
        after_bytes: Some(after.len() as u64),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Unified diff across every file the run would change.
pub fn render_patch(
    before: &BTreeMap<Utf8PathBuf, String>,
    after: &BTreeMap<Utf8PathBuf, String>,
) -> String {
    let mut out = String::new();
    let formatter = PatchFormatter::new();

    for (path, old) in before {
        let new = after.get(path).unwrap_or(old);
        if old == new {
            continue;
        }

        out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
        out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

        let patch = diffy::create_patch(old, new);
        out.push_str(&format!("{}", formatter.fmt_patch(&patch)));
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}
