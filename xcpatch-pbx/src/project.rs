//! Typed accessors over the pbxproj object graph.
//!
//! The graph is a flat `objects` table keyed by 24-hex identifiers, plus a
//! `rootObject` pointer. Everything here resolves through the first native
//! target, which is all a Cordova-generated project has.

use crate::value::{PbxDict, PbxString, PbxValue};
use crate::{parser, writer, PbxError};

/// Copy-files destination for the frameworks directory of the app bundle.
const DST_SUBFOLDER_FRAMEWORKS: &str = "10";

/// An exclusively owned, in-memory pbxproj document.
#[derive(Debug, Clone)]
pub struct Project {
    root: PbxValue,
}

impl Project {
    pub fn parse(text: &str) -> Result<Self, PbxError> {
        let root = parser::parse(text)?;
        let dict = root
            .as_dict()
            .ok_or_else(|| PbxError::structure("root value is not a dictionary"))?;
        if !dict.contains_key("objects") {
            return Err(PbxError::structure("missing objects table"));
        }
        if !dict.contains_key("rootObject") {
            return Err(PbxError::structure("missing rootObject"));
        }
        Ok(Self { root })
    }

    pub fn to_pbxproj(&self) -> String {
        writer::write(&self.root)
    }

    fn objects(&self) -> &PbxDict {
        // Presence checked at parse time.
        self.root
            .as_dict()
            .and_then(|d| d.get("objects"))
            .and_then(|v| v.as_dict())
            .expect("objects table")
    }

    fn objects_mut(&mut self) -> &mut PbxDict {
        self.root
            .as_dict_mut()
            .and_then(|d| d.get_mut("objects"))
            .and_then(|v| v.as_dict_mut())
            .expect("objects table")
    }

    pub fn object(&self, id: &str) -> Option<&PbxDict> {
        self.objects().get(id).and_then(|v| v.as_dict())
    }

    pub fn object_mut(&mut self, id: &str) -> Option<&mut PbxDict> {
        self.objects_mut().get_mut(id).and_then(|v| v.as_dict_mut())
    }

    fn isa(obj: &PbxDict) -> Option<&str> {
        obj.get("isa").and_then(|v| v.as_str())
    }

    pub fn root_object_id(&self) -> Result<String, PbxError> {
        self.root
            .as_dict()
            .and_then(|d| d.get("rootObject"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| PbxError::structure("rootObject is not a string"))
    }

    /// First target listed by the root project object.
    pub fn first_target_id(&self) -> Result<String, PbxError> {
        let project_id = self.root_object_id()?;
        let project = self
            .object(&project_id)
            .ok_or_else(|| PbxError::structure("rootObject not in objects table"))?;
        project
            .get("targets")
            .and_then(|v| v.as_array())
            .and_then(|a| a.first())
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| PbxError::structure("project has no targets"))
    }

    pub fn first_target_name(&self) -> Result<String, PbxError> {
        let target_id = self.first_target_id()?;
        let target = self
            .object(&target_id)
            .ok_or_else(|| PbxError::structure("first target not in objects table"))?;
        target
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| PbxError::structure("first target has no name"))
    }

    /// A fresh 24-hex identifier that does not collide with any object.
    pub fn generate_id(&self) -> String {
        loop {
            let bytes = uuid::Uuid::new_v4().into_bytes();
            let mut id = String::with_capacity(24);
            for b in &bytes[..12] {
                id.push_str(&format!("{:02X}", b));
            }
            if !self.objects().contains_key(&id) {
                return id;
            }
        }
    }

    // ---- Build configurations ----------------------------------------------

    /// Ids of all `XCBuildConfiguration` objects with the given name,
    /// project-level and target-level alike.
    pub fn configuration_ids_named(&self, name: &str) -> Vec<String> {
        self.objects()
            .iter()
            .filter_map(|(id, v)| {
                let obj = v.as_dict()?;
                if Self::isa(obj) != Some("XCBuildConfiguration") {
                    return None;
                }
                if obj.get("name").and_then(|v| v.as_str()) != Some(name) {
                    return None;
                }
                Some(id.value.clone())
            })
            .collect()
    }

    pub fn build_setting(&self, config_id: &str, key: &str) -> Option<String> {
        self.object(config_id)?
            .get("buildSettings")?
            .as_dict()?
            .get(key)?
            .as_str()
            .map(str::to_string)
    }

    pub fn set_build_setting(
        &mut self,
        config_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), PbxError> {
        let obj = self
            .object_mut(config_id)
            .ok_or_else(|| PbxError::structure(format!("no such configuration {config_id}")))?;
        if !obj.contains_key("buildSettings") {
            obj.insert("buildSettings", PbxValue::Dict(PbxDict::new()));
        }
        let settings = obj
            .get_mut("buildSettings")
            .and_then(|v| v.as_dict_mut())
            .ok_or_else(|| PbxError::structure("buildSettings is not a dictionary"))?;
        settings.insert(key, PbxValue::string(value));
        Ok(())
    }

    // ---- Build phases ------------------------------------------------------

    fn target_phase_ids(&self, target_id: &str) -> Vec<String> {
        self.object(target_id)
            .and_then(|t| t.get("buildPhases"))
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First phase of the given `isa` kind on the target.
    pub fn phase_of_kind(&self, target_id: &str, isa: &str) -> Option<String> {
        self.target_phase_ids(target_id)
            .into_iter()
            .find(|id| self.object(id).and_then(Self::isa) == Some(isa))
    }

    /// Phase of the given kind whose `name` matches, on the target.
    pub fn phase_named(&self, target_id: &str, isa: &str, name: &str) -> Option<String> {
        self.target_phase_ids(target_id).into_iter().find(|id| {
            let Some(obj) = self.object(id) else {
                return false;
            };
            Self::isa(obj) == Some(isa) && obj.get("name").and_then(|v| v.as_str()) == Some(name)
        })
    }

    /// Create a copy-files phase with the frameworks destination and attach
    /// it to the target.
    pub fn add_copy_files_phase(&mut self, target_id: &str, name: &str) -> Result<String, PbxError> {
        let id = self.generate_id();

        let mut phase = PbxDict::new();
        phase.insert("isa", PbxValue::string("PBXCopyFilesBuildPhase"));
        phase.insert("buildActionMask", PbxValue::string("2147483647"));
        phase.insert("dstPath", PbxValue::string(""));
        phase.insert("dstSubfolderSpec", PbxValue::string(DST_SUBFOLDER_FRAMEWORKS));
        phase.insert("files", PbxValue::Array(vec![]));
        phase.insert("name", PbxValue::string(name));
        phase.insert("runOnlyForDeploymentPostprocessing", PbxValue::string("0"));

        self.objects_mut()
            .insert_annotated(id.clone(), name, PbxValue::Dict(phase));
        self.attach_phase(target_id, &id, name)?;
        Ok(id)
    }

    /// Create a shell-script phase and attach it to the target.
    pub fn add_shell_script_phase(
        &mut self,
        target_id: &str,
        name: &str,
        shell_path: &str,
        script: &str,
    ) -> Result<String, PbxError> {
        let id = self.generate_id();

        let mut phase = PbxDict::new();
        phase.insert("isa", PbxValue::string("PBXShellScriptBuildPhase"));
        phase.insert("buildActionMask", PbxValue::string("2147483647"));
        phase.insert("files", PbxValue::Array(vec![]));
        phase.insert("inputPaths", PbxValue::Array(vec![]));
        phase.insert("name", PbxValue::string(name));
        phase.insert("outputPaths", PbxValue::Array(vec![]));
        phase.insert("runOnlyForDeploymentPostprocessing", PbxValue::string("0"));
        phase.insert("shellPath", PbxValue::string(shell_path));
        phase.insert("shellScript", PbxValue::string(script));

        self.objects_mut()
            .insert_annotated(id.clone(), name, PbxValue::Dict(phase));
        self.attach_phase(target_id, &id, name)?;
        Ok(id)
    }

    fn attach_phase(&mut self, target_id: &str, phase_id: &str, name: &str) -> Result<(), PbxError> {
        let target = self
            .object_mut(target_id)
            .ok_or_else(|| PbxError::structure(format!("no such target {target_id}")))?;
        let phases = target
            .get_mut("buildPhases")
            .and_then(|v| v.as_array_mut())
            .ok_or_else(|| PbxError::structure("target has no buildPhases array"))?;
        phases.push(PbxValue::annotated(phase_id, name));
        Ok(())
    }

    // ---- Build files and file references -----------------------------------

    /// Resolve a `PBXFileReference` id by the basename of its `name` (or, as
    /// Xcode sometimes omits `name`, its `path`).
    pub fn file_reference_id_by_basename(&self, basename: &str) -> Option<String> {
        self.objects().iter().find_map(|(id, v)| {
            let obj = v.as_dict()?;
            if Self::isa(obj) != Some("PBXFileReference") {
                return None;
            }
            let matches = |field: &str| {
                obj.get(field)
                    .and_then(|v| v.as_str())
                    .is_some_and(|s| s.rsplit('/').next() == Some(basename))
            };
            if matches("name") || matches("path") {
                Some(id.value.clone())
            } else {
                None
            }
        })
    }

    /// Build-file ids listed by a phase.
    pub fn phase_file_ids(&self, phase_id: &str) -> Vec<String> {
        self.object(phase_id)
            .and_then(|p| p.get("files"))
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Find the build file in a phase whose file reference resolves to the
    /// given basename. Resolution goes through the object graph, not through
    /// annotation text.
    pub fn phase_file_by_basename(&self, phase_id: &str, basename: &str) -> Option<String> {
        self.phase_file_ids(phase_id).into_iter().find(|id| {
            let Some(build_file) = self.object(id) else {
                return false;
            };
            let Some(file_ref) = build_file.get("fileRef").and_then(|v| v.as_str()) else {
                return false;
            };
            let Some(reference) = self.object(file_ref) else {
                return false;
            };
            ["name", "path"].iter().any(|field| {
                reference
                    .get(field)
                    .and_then(|v| v.as_str())
                    .is_some_and(|s| s.rsplit('/').next() == Some(basename))
            })
        })
    }

    /// Remove a build-file entry from a phase's file list. Returns true when
    /// an entry was removed.
    pub fn remove_file_from_phase(&mut self, phase_id: &str, build_file_id: &str) -> bool {
        let Some(phase) = self.object_mut(phase_id) else {
            return false;
        };
        let Some(files) = phase.get_mut("files").and_then(|v| v.as_array_mut()) else {
            return false;
        };
        let before = files.len();
        files.retain(|v| v.as_str() != Some(build_file_id));
        files.len() != before
    }

    /// Register a `PBXBuildFile` in the global table. `attributes` become
    /// `settings.ATTRIBUTES` when non-empty.
    pub fn add_build_file(
        &mut self,
        id: &str,
        file_ref: &str,
        basename: &str,
        group: &str,
        attributes: &[&str],
    ) {
        let mut build_file = PbxDict::new();
        build_file.insert("isa", PbxValue::string("PBXBuildFile"));
        build_file.insert("fileRef", PbxValue::annotated(file_ref, basename));
        if !attributes.is_empty() {
            let mut settings = PbxDict::new();
            settings.insert(
                "ATTRIBUTES",
                PbxValue::Array(attributes.iter().map(|a| PbxValue::string(*a)).collect()),
            );
            build_file.insert("settings", PbxValue::Dict(settings));
        }
        self.objects_mut().insert_annotated(
            id,
            format!("{basename} in {group}"),
            PbxValue::Dict(build_file),
        );
    }

    /// Append a build file to a phase's file list.
    pub fn append_file_to_phase(
        &mut self,
        phase_id: &str,
        build_file_id: &str,
        annotation: &str,
    ) -> Result<(), PbxError> {
        let phase = self
            .object_mut(phase_id)
            .ok_or_else(|| PbxError::structure(format!("no such build phase {phase_id}")))?;
        let files = phase
            .get_mut("files")
            .and_then(|v| v.as_array_mut())
            .ok_or_else(|| PbxError::structure("build phase has no files array"))?;
        files.push(PbxValue::annotated(build_file_id, annotation));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"// !$*UTF8*$!
{
	objects = {
		T1 /* HelloCordova */ = {
			isa = PBXNativeTarget;
			buildPhases = (
			);
			name = HelloCordova;
		};
		P1 /* Project object */ = {
			isa = PBXProject;
			targets = (
				T1 /* HelloCordova */,
			);
		};
		C1 /* Debug */ = {
			isa = XCBuildConfiguration;
			buildSettings = {
			};
			name = Debug;
		};
	};
	rootObject = P1 /* Project object */;
}
"#;

    #[test]
    fn resolves_first_target() {
        let project = Project::parse(MINIMAL).unwrap();
        assert_eq!(project.first_target_id().unwrap(), "T1");
        assert_eq!(project.first_target_name().unwrap(), "HelloCordova");
    }

    #[test]
    fn generated_ids_are_24_hex() {
        let project = Project::parse(MINIMAL).unwrap();
        let id = project.generate_id();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn build_setting_round_trips() {
        let mut project = Project::parse(MINIMAL).unwrap();
        let ids = project.configuration_ids_named("Debug");
        assert_eq!(ids.len(), 1);
        assert_eq!(project.build_setting(&ids[0], "LD_RUNPATH_SEARCH_PATHS"), None);

        project
            .set_build_setting(&ids[0], "LD_RUNPATH_SEARCH_PATHS", "$(inherited)")
            .unwrap();
        assert_eq!(
            project.build_setting(&ids[0], "LD_RUNPATH_SEARCH_PATHS").as_deref(),
            Some("$(inherited)")
        );
    }

    #[test]
    fn added_phase_lands_on_target() {
        let mut project = Project::parse(MINIMAL).unwrap();
        let target = project.first_target_id().unwrap();
        let phase = project
            .add_shell_script_phase(&target, "Run Script", "/bin/sh", "true")
            .unwrap();

        assert_eq!(
            project.phase_of_kind(&target, "PBXShellScriptBuildPhase"),
            Some(phase.clone())
        );
        assert_eq!(
            project.phase_named(&target, "PBXShellScriptBuildPhase", "Run Script"),
            Some(phase)
        );
    }
}
