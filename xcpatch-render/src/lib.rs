//! Rendering helpers (markdown) for human-readable artifacts.

use xcpatch_types::report::{PatchReport, StepStatus};

pub fn render_report_md(report: &PatchReport) -> String {
    let mut out = String::new();
    out.push_str("# xcpatch report\n\n");
    out.push_str(&format!(
        "- Plugin: `{}`\n- Platform: `{}`\n- Tooling major: {}\n",
        report.context.plugin_id, report.context.platform, report.context.tooling_major
    ));
    out.push_str(&format!(
        "- Steps: {} (applied {}, skipped {}, failed {})\n",
        report.summary.steps_total,
        report.summary.applied,
        report.summary.skipped,
        report.summary.failed
    ));
    out.push_str(&format!(
        "- Files modified: {}\n",
        report.summary.files_modified
    ));
    out.push_str(&format!(
        "- Written to disk: {}\n\n",
        if report.applied { "yes" } else { "no (preview)" }
    ));

    out.push_str("## Steps\n\n");
    if report.steps.is_empty() {
        out.push_str("_No steps ran._\n");
        return out;
    }

    for (i, step) in report.steps.iter().enumerate() {
        out.push_str(&format!("### {}. {}\n\n", i + 1, step.title));
        out.push_str(&format!("- Id: `{}`\n", step.step_id));
        out.push_str(&format!("- Status: `{}`\n", status_label(step.status)));
        if let Some(msg) = &step.message {
            out.push_str(&format!("- Message: {}\n", msg));
        }
        if !step.files_changed.is_empty() {
            out.push_str("\n**Files changed**\n\n");
            for fc in &step.files_changed {
                out.push_str(&format!(
                    "- `{}` {} → {}\n",
                    fc.path, fc.before_sha256, fc.after_sha256
                ));
            }
        }
        out.push('\n');
    }

    out
}

fn status_label(s: StepStatus) -> &'static str {
    match s {
        StepStatus::Applied => "applied",
        StepStatus::Skipped => "skipped",
        StepStatus::Failed => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use xcpatch_types::context::{HookContext, Platform};
    use xcpatch_types::report::{PatchReport, StepOutcome, ToolInfo};

    fn sample_report() -> PatchReport {
        let mut report = PatchReport::new(
            ToolInfo {
                name: "xcpatch".to_string(),
                version: None,
            },
            HookContext {
                plugin_id: "com.example.pay".to_string(),
                platform: Platform::Ios,
                tooling_major: 6,
                project_root: Utf8PathBuf::from("."),
            },
        );
        report.steps.push(StepOutcome {
            step_id: "runpath_search_paths".to_string(),
            title: "Ensure runtime framework search path".to_string(),
            status: StepStatus::Applied,
            message: Some("updated 2 build configuration(s)".to_string()),
            files_changed: vec![],
        });
        report.summary.steps_total = 1;
        report.summary.applied = 1;
        report
    }

    #[test]
    fn renders_step_sections() {
        let md = render_report_md(&sample_report());
        assert!(md.contains("# xcpatch report"));
        assert!(md.contains("### 1. Ensure runtime framework search path"));
        assert!(md.contains("- Status: `applied`"));
        assert!(md.contains("- Plugin: `com.example.pay`"));
    }
}
