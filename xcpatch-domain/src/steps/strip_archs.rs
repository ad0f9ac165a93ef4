use super::{PatchStep, StepAction, StepContext};

pub const STRIP_PHASE_NAME: &str = "Strip Framework Architectures";

const SHELL_PATH: &str = "/bin/sh";

/// Loops over the frameworks embedded in the built app, extracts only the
/// architectures the build requested, and replaces each framework executable
/// with the thinned merge. Runs inside Xcode, not at patch time.
const STRIP_SCRIPT: &str = r#"APP_PATH="${TARGET_BUILD_DIR}/${WRAPPER_NAME}"

# This script loops through the frameworks embedded in the application and
# removes unused architectures.
find "$APP_PATH" -name '*.framework' -type d | while read -r FRAMEWORK
do
FRAMEWORK_EXECUTABLE_NAME=$(defaults read "$FRAMEWORK/Info.plist" CFBundleExecutable)
FRAMEWORK_EXECUTABLE_PATH="$FRAMEWORK/$FRAMEWORK_EXECUTABLE_NAME"
echo "Executable is $FRAMEWORK_EXECUTABLE_PATH"

EXTRACTED_ARCHS=()

for ARCH in $ARCHS
do
echo "Extracting $ARCH from $FRAMEWORK_EXECUTABLE_NAME"
lipo -extract "$ARCH" "$FRAMEWORK_EXECUTABLE_PATH" -o "$FRAMEWORK_EXECUTABLE_PATH-$ARCH"
EXTRACTED_ARCHS+=("$FRAMEWORK_EXECUTABLE_PATH-$ARCH")
done

echo "Merging extracted architectures: ${ARCHS}"
lipo -o "$FRAMEWORK_EXECUTABLE_PATH-merged" -create "${EXTRACTED_ARCHS[@]}"
rm "${EXTRACTED_ARCHS[@]}"

echo "Replacing original executable with thinned version"
rm "$FRAMEWORK_EXECUTABLE_PATH"
mv "$FRAMEWORK_EXECUTABLE_PATH-merged" "$FRAMEWORK_EXECUTABLE_PATH"

done"#;

/// Add the architecture-stripping shell-script phase.
///
/// Guarded by phase name: without the check every run would append another
/// copy of the phase.
pub struct StripArchitectures;

impl PatchStep for StripArchitectures {
    fn id(&self) -> &'static str {
        "strip_architectures"
    }

    fn title(&self) -> &'static str {
        "Add architecture-stripping build phase"
    }

    fn apply(&self, cx: &mut StepContext<'_>) -> anyhow::Result<StepAction> {
        let target = cx.project.first_target_id()?;
        if cx
            .project
            .phase_named(&target, "PBXShellScriptBuildPhase", STRIP_PHASE_NAME)
            .is_some()
        {
            return Ok(StepAction::Skipped {
                message: format!("shell-script phase \"{STRIP_PHASE_NAME}\" already present"),
            });
        }

        cx.project
            .add_shell_script_phase(&target, STRIP_PHASE_NAME, SHELL_PATH, STRIP_SCRIPT)?;
        Ok(StepAction::Applied {
            message: Some(format!("added shell-script phase \"{STRIP_PHASE_NAME}\"")),
        })
    }
}
