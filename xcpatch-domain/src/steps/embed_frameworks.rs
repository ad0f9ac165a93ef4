use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use super::{PatchStep, StepAction, StepContext};
use crate::ports::PlatformView;

const LINK_ISA: &str = "PBXFrameworksBuildPhase";
const EMBED_ISA: &str = "PBXCopyFilesBuildPhase";
const CODESIGN_ATTRIBUTES: [&str; 2] = ["CodeSignOnCopy", "RemoveHeadersOnCopy"];

/// First Cordova major version that embeds plugin frameworks itself.
const NATIVE_EMBED_MAJOR: u32 = 7;

/// Move plugin framework bundles from the link phase into a code-signing
/// copy-files phase so they land signed in the app bundle.
///
/// A build file listed in both the link phase and the copy phase suppresses
/// code-sign-on-copy at build time, so the link entry is removed first and a
/// fresh one added alongside the embed entry.
pub struct EmbedFrameworks;

impl PatchStep for EmbedFrameworks {
    fn id(&self) -> &'static str {
        "embed_frameworks"
    }

    fn title(&self) -> &'static str {
        "Embed and sign plugin frameworks"
    }

    fn apply(&self, cx: &mut StepContext<'_>) -> anyhow::Result<StepAction> {
        if cx.hook.tooling_major >= NATIVE_EMBED_MAJOR {
            return Ok(StepAction::Skipped {
                message: format!(
                    "tooling {}.x embeds plugin frameworks natively",
                    cx.hook.tooling_major
                ),
            });
        }

        let plugin_dir = Utf8PathBuf::from("platforms/ios")
            .join(cx.project_name)
            .join("Plugins")
            .join(&cx.hook.plugin_id);
        if !cx.view.is_dir(&plugin_dir) {
            return Ok(StepAction::Skipped {
                message: format!("plugin directory {plugin_dir} not present"),
            });
        }

        let frameworks = discover_frameworks(cx.view, &plugin_dir)?;
        if frameworks.is_empty() {
            return Ok(StepAction::Skipped {
                message: format!("no framework bundles under {plugin_dir}"),
            });
        }

        let target = cx.project.first_target_id()?;
        let group = format!("Embed Frameworks {}", cx.hook.plugin_id);
        let embed_phase = match cx.project.phase_named(&target, EMBED_ISA, &group) {
            Some(id) => id,
            None => cx.project.add_copy_files_phase(&target, &group)?,
        };
        let link_phase = cx
            .project
            .phase_of_kind(&target, LINK_ISA)
            .context("target has no frameworks (link) build phase")?;

        let mut embedded = 0usize;
        let mut unresolved = 0usize;
        for framework in &frameworks {
            let basename = framework
                .file_name()
                .context("framework path has no final segment")?;

            if cx
                .project
                .phase_file_by_basename(&embed_phase, basename)
                .is_some()
            {
                debug!(framework = basename, "already embedded");
                continue;
            }

            let Some(file_ref) = cx.project.file_reference_id_by_basename(basename) else {
                warn!(framework = basename, "no file reference in project, skipping");
                unresolved += 1;
                continue;
            };

            // The embed entry reuses the link entry's identifier when one
            // exists, mirroring how Xcode itself moves a framework between
            // phases.
            let embed_file_id = match cx.project.phase_file_by_basename(&link_phase, basename) {
                Some(id) => {
                    cx.project.remove_file_from_phase(&link_phase, &id);
                    id
                }
                None => {
                    warn!(framework = basename, "not in link phase, embedding anyway");
                    cx.project.generate_id()
                }
            };

            cx.project.add_build_file(
                &embed_file_id,
                &file_ref,
                basename,
                &group,
                &CODESIGN_ATTRIBUTES,
            );
            cx.project.append_file_to_phase(
                &embed_phase,
                &embed_file_id,
                &format!("{basename} in {group}"),
            )?;

            let link_file_id = cx.project.generate_id();
            cx.project
                .add_build_file(&link_file_id, &file_ref, basename, "Frameworks", &[]);
            cx.project.append_file_to_phase(
                &link_phase,
                &link_file_id,
                &format!("{basename} in Frameworks"),
            )?;

            embedded += 1;
        }

        if embedded > 0 {
            Ok(StepAction::Applied {
                message: Some(format!("embedded {embedded} framework(s)")),
            })
        } else if unresolved > 0 {
            Ok(StepAction::Skipped {
                message: format!(
                    "{} framework(s) already embedded, {unresolved} without a project file reference",
                    frameworks.len() - unresolved
                ),
            })
        } else {
            Ok(StepAction::Skipped {
                message: format!("all {} framework(s) already embedded", frameworks.len()),
            })
        }
    }
}

/// Recursive scan for `*.framework` bundle directories. The predicate is the
/// path segment's extension, so a `.framework` substring elsewhere in a path
/// never matches. Does not descend into bundles.
fn discover_frameworks(
    view: &dyn PlatformView,
    dir: &Utf8Path,
) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in view.read_dir(&current)? {
            if !view.is_dir(&entry) {
                continue;
            }
            if entry.extension() == Some("framework") {
                found.push(entry);
            } else {
                pending.push(entry);
            }
        }
    }
    found.sort();
    Ok(found)
}
