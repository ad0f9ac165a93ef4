//! Domain logic: apply a fixed sequence of idempotent mutations to a
//! Cordova-generated Xcode project.
//!
//! This crate owns *what* gets patched and in which order. The pbxproj object
//! graph lives in `xcpatch-pbx`; the CLI surface lives in `xcpatch-cli`.

mod patcher;
mod ports;
mod steps;

pub use patcher::{render_patch, run_patch, PatchOptions, PatchOutcome};
pub use ports::{FsPlatformView, PlatformView};
pub use steps::{builtin_steps, PatchStep, StepAction, StepContext, PAYMENTS_SCHEME, STRIP_PHASE_NAME};

use camino::Utf8PathBuf;

/// Hard failures of the patch procedure. Soft conditions (nothing to embed,
/// phase already present) are step outcomes, not errors.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("no Xcode project found under {searched}")]
    MissingProjectFile { searched: Utf8PathBuf },

    #[error(transparent)]
    Pbx(#[from] xcpatch_pbx::PbxError),

    #[error("failed to read {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}
