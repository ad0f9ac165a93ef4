use super::{PatchStep, StepAction, StepContext};

const KEY: &str = "LD_RUNPATH_SEARCH_PATHS";
const TOKEN: &str = "@executable_path/Frameworks";
const DEFAULT: &str = "$(inherited) @executable_path/Frameworks";

/// Ensure `LD_RUNPATH_SEARCH_PATHS` contains the embedded-frameworks token in
/// the Debug and Release configurations. Without it the dynamic linker never
/// looks inside the app bundle's Frameworks directory at launch.
pub struct RunpathSearchPaths;

impl PatchStep for RunpathSearchPaths {
    fn id(&self) -> &'static str {
        "runpath_search_paths"
    }

    fn title(&self) -> &'static str {
        "Ensure runtime framework search path"
    }

    fn apply(&self, cx: &mut StepContext<'_>) -> anyhow::Result<StepAction> {
        let mut changed = 0usize;
        for name in ["Debug", "Release"] {
            for config_id in cx.project.configuration_ids_named(name) {
                match cx.project.build_setting(&config_id, KEY) {
                    None => {
                        cx.project.set_build_setting(&config_id, KEY, DEFAULT)?;
                        changed += 1;
                    }
                    Some(value) if !has_token(&value) => {
                        let appended = format!("{value} {TOKEN}");
                        cx.project.set_build_setting(&config_id, KEY, &appended)?;
                        changed += 1;
                    }
                    Some(_) => {}
                }
            }
        }

        if changed > 0 {
            Ok(StepAction::Applied {
                message: Some(format!("updated {changed} build configuration(s)")),
            })
        } else {
            Ok(StepAction::Skipped {
                message: "runtime search paths already configured".to_string(),
            })
        }
    }
}

/// Whole-token match; a substring check would be fooled by values like
/// `@executable_path/Frameworks2`.
fn has_token(value: &str) -> bool {
    value.split_whitespace().any(|t| t == TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_match_is_exact() {
        assert!(has_token("$(inherited) @executable_path/Frameworks"));
        assert!(!has_token("$(inherited)"));
        assert!(!has_token("@executable_path/Frameworks2"));
    }
}
