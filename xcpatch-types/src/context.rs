use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Invocation context handed to the patcher by the build orchestrator.
///
/// Mirrors what the Cordova hook API supplies: which plugin is being
/// installed, which platform the build targets, and the major version of the
/// invoking tooling (Cordova 7+ embeds plugin frameworks itself).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookContext {
    pub plugin_id: String,

    pub platform: Platform,

    /// Major version of the invoking Cordova tooling.
    pub tooling_major: u32,

    /// Root of the Cordova project (the directory containing `platforms/`).
    pub project_root: Utf8PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Browser,
}

impl Platform {
    pub fn is_ios(self) -> bool {
        matches!(self, Platform::Ios)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Browser => "browser",
        };
        f.write_str(s)
    }
}
