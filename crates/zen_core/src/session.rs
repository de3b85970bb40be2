use std::path::Path;

use zen_errors::Result;

use crate::git::{Committer, GitCommitter};
use crate::pack::{DirectoryPacker, Packer};
use crate::scripts::{PackageScripts, ScriptRunner};
use crate::specifier::SpecifierCache;
use crate::store::{GlobalStore, StoreLock};

/// State shared by every operation within a single invocation.
///
/// A session holds the exclusive lock over the global store for as long as it
/// is alive, so concurrent invocations never interleave their changes.
pub struct Session {
    pub store: GlobalStore,
    pub specifiers: SpecifierCache,

    pub packer: Box<dyn Packer>,
    pub scripts: Box<dyn ScriptRunner>,
    pub committer: Box<dyn Committer>,

    _lock: StoreLock,
}

impl Session {
    /// Opens a session over the store in the given home directory.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the store could not be locked or opened.
    pub fn open(home: &Path) -> Result<Self> {
        let lock = GlobalStore::lock(home)?;
        let store = GlobalStore::open(home)?;

        Ok(Session {
            store,
            specifiers: SpecifierCache::new(),
            packer: Box::new(DirectoryPacker),
            scripts: Box::new(PackageScripts),
            committer: Box::new(GitCommitter),
            _lock: lock,
        })
    }

    /// Opens a session over the store in the zen home directory.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the home directory could not be determined, or if the
    /// store could not be locked or opened.
    pub fn open_default() -> Result<Self> {
        Self::open(&crate::home::zen_home()?)
    }

    #[must_use]
    pub fn with_scripts(mut self, scripts: impl ScriptRunner + 'static) -> Self {
        self.scripts = Box::new(scripts);
        self
    }

    #[must_use]
    pub fn with_committer(mut self, committer: impl Committer + 'static) -> Self {
        self.committer = Box::new(committer);
        self
    }

    #[must_use]
    pub fn with_packer(mut self, packer: impl Packer + 'static) -> Self {
        self.packer = Box::new(packer);
        self
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store.root())
            .field("specifiers", &self.specifiers.len())
            .finish_non_exhaustive()
    }
}
