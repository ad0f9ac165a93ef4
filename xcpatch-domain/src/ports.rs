use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;

/// Read-only access to the Cordova project tree.
///
/// The steps discover files through this so they can be tested against small
/// temporary trees, and so no step ever changes the process working
/// directory: all lookups compose paths from the root.
pub trait PlatformView {
    fn root(&self) -> &Utf8Path;

    fn exists(&self, rel: &Utf8Path) -> bool;

    fn is_dir(&self, rel: &Utf8Path) -> bool;

    fn read_to_string(&self, rel: &Utf8Path) -> anyhow::Result<String>;

    /// Entries of a directory, as root-relative paths, sorted.
    fn read_dir(&self, rel: &Utf8Path) -> anyhow::Result<Vec<Utf8PathBuf>>;
}

/// File-system backed `PlatformView`.
#[derive(Debug, Clone)]
pub struct FsPlatformView {
    root: Utf8PathBuf,
}

impl FsPlatformView {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    fn abs(&self, rel: &Utf8Path) -> Utf8PathBuf {
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.root.join(rel)
        }
    }
}

impl PlatformView for FsPlatformView {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn exists(&self, rel: &Utf8Path) -> bool {
        self.abs(rel).exists()
    }

    fn is_dir(&self, rel: &Utf8Path) -> bool {
        self.abs(rel).is_dir()
    }

    fn read_to_string(&self, rel: &Utf8Path) -> anyhow::Result<String> {
        let abs = self.abs(rel);
        fs::read_to_string(&abs).with_context(|| format!("read {}", abs))
    }

    fn read_dir(&self, rel: &Utf8Path) -> anyhow::Result<Vec<Utf8PathBuf>> {
        let abs = self.abs(rel);
        let mut out = Vec::new();
        for entry in fs::read_dir(&abs).with_context(|| format!("read dir {}", abs))? {
            let entry = entry.with_context(|| format!("read dir entry in {}", abs))?;
            let name = entry.file_name();
            let name = name
                .to_str()
                .with_context(|| format!("non-UTF-8 file name in {}", abs))?;
            out.push(rel.join(name));
        }
        out.sort();
        Ok(out)
    }
}
