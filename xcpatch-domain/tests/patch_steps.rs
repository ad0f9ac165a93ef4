//! End-to-end tests for the patch step sequence against temporary Cordova
//! project trees.

use camino::{Utf8Path, Utf8PathBuf};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;
use xcpatch_domain::{run_patch, FsPlatformView, PatchError, PatchOptions, PAYMENTS_SCHEME};
use xcpatch_pbx::Project;
use xcpatch_types::context::{HookContext, Platform};
use xcpatch_types::report::{StepStatus, ToolInfo};

const PLUGIN_ID: &str = "com.example.pay";

const PBXPROJ: &str = r#"// !$*UTF8*$!
{
	archiveVersion = 1;
	objectVersion = 46;
	objects = {
		F0000000000000000000FE20 /* Foo.framework in Frameworks */ = {
			isa = PBXBuildFile;
			fileRef = F0000000000000000000FE21 /* Foo.framework */;
		};
		F0000000000000000000FE21 /* Foo.framework */ = {
			isa = PBXFileReference;
			lastKnownFileType = wrapper.framework;
			name = Foo.framework;
			path = "HelloCordova/Plugins/com.example.pay/Foo.framework";
			sourceTree = "<group>";
		};
		1D60588F0D05DD3D006BFB54 /* Frameworks */ = {
			isa = PBXFrameworksBuildPhase;
			buildActionMask = 2147483647;
			files = (
				F0000000000000000000FE20 /* Foo.framework in Frameworks */,
			);
			runOnlyForDeploymentPostprocessing = 0;
		};
		1D6058900D05DD3D006BFB54 /* HelloCordova */ = {
			isa = PBXNativeTarget;
			buildPhases = (
				1D60588F0D05DD3D006BFB54 /* Frameworks */,
			);
			name = HelloCordova;
			productName = HelloCordova;
		};
		29B97313FDCFA39411CA2CEA /* Project object */ = {
			isa = PBXProject;
			targets = (
				1D6058900D05DD3D006BFB54 /* HelloCordova */,
			);
		};
		C0000000000000000000DE00 /* Debug */ = {
			isa = XCBuildConfiguration;
			buildSettings = {
				LD_RUNPATH_SEARCH_PATHS = "$(inherited)";
			};
			name = Debug;
		};
		C0000000000000000000DE01 /* Release */ = {
			isa = XCBuildConfiguration;
			buildSettings = {
			};
			name = Release;
		};
	};
	rootObject = 29B97313FDCFA39411CA2CEA /* Project object */;
}
"#;

const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleIdentifier</key>
	<string>com.example.hello</string>
</dict>
</plist>
"#;

const RUNPATH_EXPECTED: &str = "$(inherited) @executable_path/Frameworks";

fn create_project_tree(with_framework: bool) -> TempDir {
    let td = tempfile::tempdir().expect("tempdir");
    let root = td.path();

    let proj_dir = root.join("platforms/ios/HelloCordova.xcodeproj");
    fs::create_dir_all(&proj_dir).unwrap();
    fs::write(proj_dir.join("project.pbxproj"), PBXPROJ).unwrap();

    let app_dir = root.join("platforms/ios/HelloCordova");
    fs::create_dir_all(&app_dir).unwrap();
    fs::write(app_dir.join("HelloCordova-Info.plist"), INFO_PLIST).unwrap();

    if with_framework {
        fs::create_dir_all(
            app_dir
                .join("Plugins")
                .join(PLUGIN_ID)
                .join("Foo.framework"),
        )
        .unwrap();
    }

    td
}

fn hook(root: &Utf8Path, tooling_major: u32) -> HookContext {
    HookContext {
        plugin_id: PLUGIN_ID.to_string(),
        platform: Platform::Ios,
        tooling_major,
        project_root: root.to_path_buf(),
    }
}

fn tool() -> ToolInfo {
    ToolInfo {
        name: "xcpatch".to_string(),
        version: Some("0.0.0".to_string()),
    }
}

fn utf8_root(td: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(td.path().to_path_buf()).expect("utf-8 tempdir")
}

fn load_project(root: &Utf8Path) -> Project {
    let text =
        fs::read_to_string(root.join("platforms/ios/HelloCordova.xcodeproj/project.pbxproj"))
            .unwrap();
    Project::parse(&text).unwrap()
}

fn run(root: &Utf8Path, tooling_major: u32) -> xcpatch_domain::PatchOutcome {
    let view = FsPlatformView::new(root.to_path_buf());
    run_patch(
        &hook(root, tooling_major),
        &view,
        tool(),
        &PatchOptions::default(),
    )
    .expect("patch run")
}

#[test]
fn runpath_is_set_and_appended() {
    let td = create_project_tree(false);
    let root = utf8_root(&td);
    run(&root, 6);

    let project = load_project(&root);
    for name in ["Debug", "Release"] {
        let ids = project.configuration_ids_named(name);
        assert_eq!(ids.len(), 1, "{name}");
        assert_eq!(
            project
                .build_setting(&ids[0], "LD_RUNPATH_SEARCH_PATHS")
                .as_deref(),
            Some(RUNPATH_EXPECTED),
            "{name}"
        );
    }
}

#[test]
fn runpath_step_is_idempotent() {
    let td = create_project_tree(false);
    let root = utf8_root(&td);
    run(&root, 6);
    let once = fs::read_to_string(
        root.join("platforms/ios/HelloCordova.xcodeproj/project.pbxproj"),
    )
    .unwrap();

    let outcome = run(&root, 6);
    let twice = fs::read_to_string(
        root.join("platforms/ios/HelloCordova.xcodeproj/project.pbxproj"),
    )
    .unwrap();

    assert_eq!(once, twice);
    let runpath = outcome
        .report
        .steps
        .iter()
        .find(|s| s.step_id == "runpath_search_paths")
        .unwrap();
    assert_eq!(runpath.status, StepStatus::Skipped);
}

#[test]
fn embed_moves_framework_between_phases() {
    let td = create_project_tree(true);
    let root = utf8_root(&td);
    run(&root, 6);

    let project = load_project(&root);
    let target = project.first_target_id().unwrap();
    let link = project
        .phase_of_kind(&target, "PBXFrameworksBuildPhase")
        .unwrap();
    let embed = project
        .phase_named(
            &target,
            "PBXCopyFilesBuildPhase",
            &format!("Embed Frameworks {PLUGIN_ID}"),
        )
        .expect("embed phase created");

    // Original link-phase build file id moved into the embed phase.
    let link_files = project.phase_file_ids(&link);
    assert!(!link_files.contains(&"F0000000000000000000FE20".to_string()));
    assert_eq!(
        project.phase_file_ids(&embed),
        vec!["F0000000000000000000FE20".to_string()]
    );

    // The embed entry carries the code-sign attributes.
    let embed_entry = project.object("F0000000000000000000FE20").unwrap();
    let attrs = embed_entry
        .get("settings")
        .and_then(|v| v.as_dict())
        .and_then(|d| d.get("ATTRIBUTES"))
        .and_then(|v| v.as_array())
        .expect("ATTRIBUTES");
    let attrs: Vec<_> = attrs.iter().filter_map(|v| v.as_str()).collect();
    assert_eq!(attrs, vec!["CodeSignOnCopy", "RemoveHeadersOnCopy"]);

    // Exactly one fresh link-phase entry resolving to Foo.framework.
    assert_eq!(link_files.len(), 1);
    let relinked = project.object(&link_files[0]).unwrap();
    assert_eq!(
        relinked.get("fileRef").and_then(|v| v.as_str()),
        Some("F0000000000000000000FE21")
    );
    assert!(relinked.get("settings").is_none());
}

#[test]
fn embed_is_idempotent_across_reruns() {
    let td = create_project_tree(true);
    let root = utf8_root(&td);
    run(&root, 6);
    let once = fs::read_to_string(
        root.join("platforms/ios/HelloCordova.xcodeproj/project.pbxproj"),
    )
    .unwrap();

    let outcome = run(&root, 6);
    let twice = fs::read_to_string(
        root.join("platforms/ios/HelloCordova.xcodeproj/project.pbxproj"),
    )
    .unwrap();

    assert_eq!(once, twice);
    let embed = outcome
        .report
        .steps
        .iter()
        .find(|s| s.step_id == "embed_frameworks")
        .unwrap();
    assert_eq!(embed.status, StepStatus::Skipped);
}

#[test]
fn unresolved_file_reference_is_reported_in_skip_message() {
    let td = create_project_tree(true);
    let root = utf8_root(&td);
    // Bar.framework exists on disk but has no PBXFileReference in the project.
    fs::create_dir_all(
        root.join("platforms/ios/HelloCordova/Plugins")
            .join(PLUGIN_ID)
            .join("Bar.framework"),
    )
    .unwrap();

    run(&root, 6);
    let outcome = run(&root, 6);

    let embed = outcome
        .report
        .steps
        .iter()
        .find(|s| s.step_id == "embed_frameworks")
        .unwrap();
    assert_eq!(embed.status, StepStatus::Skipped);
    let message = embed.message.as_deref().unwrap();
    assert_eq!(
        message,
        "1 framework(s) already embedded, 1 without a project file reference"
    );
}

#[test]
fn tooling_seven_skips_embed_entirely() {
    let td = create_project_tree(true);
    let root = utf8_root(&td);
    let outcome = run(&root, 7);

    let embed = outcome
        .report
        .steps
        .iter()
        .find(|s| s.step_id == "embed_frameworks")
        .unwrap();
    assert_eq!(embed.status, StepStatus::Skipped);

    let project = load_project(&root);
    let target = project.first_target_id().unwrap();
    assert_eq!(
        project.phase_of_kind(&target, "PBXCopyFilesBuildPhase"),
        None
    );
    // Link phase untouched.
    let link = project
        .phase_of_kind(&target, "PBXFrameworksBuildPhase")
        .unwrap();
    assert_eq!(
        project.phase_file_ids(&link),
        vec!["F0000000000000000000FE20".to_string()]
    );
}

#[test]
fn no_frameworks_leaves_build_files_untouched() {
    let td = create_project_tree(false);
    let root = utf8_root(&td);
    let outcome = run(&root, 6);

    let embed = outcome
        .report
        .steps
        .iter()
        .find(|s| s.step_id == "embed_frameworks")
        .unwrap();
    assert_eq!(embed.status, StepStatus::Skipped);
    assert!(embed.files_changed.is_empty());

    let project = load_project(&root);
    let target = project.first_target_id().unwrap();
    assert_eq!(
        project.phase_of_kind(&target, "PBXCopyFilesBuildPhase"),
        None
    );
}

#[test]
fn strip_phase_is_not_duplicated() {
    let td = create_project_tree(false);
    let root = utf8_root(&td);
    run(&root, 6);
    run(&root, 6);

    let project = load_project(&root);
    let target = project.first_target_id().unwrap();
    let text = project.to_pbxproj();
    let occurrences = text.matches("Strip Framework Architectures").count();
    // Phase object name, shellScript annotation on the target's phase list,
    // and the objects-table key annotation; one phase only.
    assert!(
        project
            .phase_named(
                &target,
                "PBXShellScriptBuildPhase",
                "Strip Framework Architectures"
            )
            .is_some()
    );
    assert!(occurrences <= 3, "duplicated phase: {occurrences} mentions");
}

#[test]
fn url_scheme_registered_exactly_once() {
    let td = create_project_tree(false);
    let root = utf8_root(&td);
    run(&root, 6);
    run(&root, 6);
    run(&root, 6);

    let plist_path = root.join("platforms/ios/HelloCordova/HelloCordova-Info.plist");
    let contents = fs::read_to_string(&plist_path).unwrap();
    let value = plist::Value::from_reader_xml(contents.as_bytes()).unwrap();
    let dict = value.as_dictionary().unwrap();
    let url_types = dict
        .get("CFBundleURLTypes")
        .and_then(|v| v.as_array())
        .expect("CFBundleURLTypes");

    let scheme_count: usize = url_types
        .iter()
        .filter_map(|e| e.as_dictionary())
        .filter_map(|d| d.get("CFBundleURLSchemes"))
        .filter_map(|v| v.as_array())
        .map(|schemes| {
            schemes
                .iter()
                .filter(|s| s.as_string() == Some(PAYMENTS_SCHEME))
                .count()
        })
        .sum();
    assert_eq!(scheme_count, 1);

    let entry = url_types[0].as_dictionary().unwrap();
    assert_eq!(
        entry.get("CFBundleTypeRole").and_then(|v| v.as_string()),
        Some("Editor")
    );
}

#[test]
fn missing_project_file_is_fatal() {
    let td = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
    let view = FsPlatformView::new(root.clone());

    let err = run_patch(&hook(&root, 6), &view, tool(), &PatchOptions::default())
        .expect_err("must fail");
    assert!(matches!(err, PatchError::MissingProjectFile { .. }));
}

#[test]
fn dry_run_writes_nothing() {
    let td = create_project_tree(true);
    let root = utf8_root(&td);
    let view = FsPlatformView::new(root.clone());

    let outcome = run_patch(
        &hook(&root, 6),
        &view,
        tool(),
        &PatchOptions { dry_run: true },
    )
    .unwrap();

    assert!(!outcome.report.applied);
    assert!(outcome.report.summary.files_modified > 0);

    let on_disk = fs::read_to_string(
        root.join("platforms/ios/HelloCordova.xcodeproj/project.pbxproj"),
    )
    .unwrap();
    assert_eq!(on_disk, PBXPROJ);
    let plist_on_disk =
        fs::read_to_string(root.join("platforms/ios/HelloCordova/HelloCordova-Info.plist"))
            .unwrap();
    assert_eq!(plist_on_disk, INFO_PLIST);
}

#[test]
fn malformed_info_plist_fails_run_and_writes_nothing() {
    let td = create_project_tree(false);
    let root = utf8_root(&td);
    let plist_path = root.join("platforms/ios/HelloCordova/HelloCordova-Info.plist");
    fs::write(&plist_path, "not a plist").unwrap();

    let outcome = run(&root, 6);
    assert!(!outcome.report.applied);
    assert_eq!(outcome.report.summary.failed, 1);
    let scheme_step = outcome.report.steps.last().unwrap();
    assert_eq!(scheme_step.step_id, "register_url_scheme");
    assert_eq!(scheme_step.status, StepStatus::Failed);

    // Earlier steps mutated the graph in memory only.
    let on_disk = fs::read_to_string(
        root.join("platforms/ios/HelloCordova.xcodeproj/project.pbxproj"),
    )
    .unwrap();
    assert_eq!(on_disk, PBXPROJ);
}
