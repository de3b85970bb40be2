//! Flattening of declared dependencies into the dependency tree.
//!
//! Every declared dependency is resolved against the global store, after which
//! the lock file of the published artifact is read to discover the
//! dependencies it was published with. Those are resolved in turn, so the
//! resulting list holds every package which is reachable from the roots. Each
//! transitive entry carries its lineage: the publishable names of every
//! ancestor, joined by [`LINEAGE_SEPARATOR`].

use std::path::PathBuf;

use zen_errors::Result;

use crate::errors::DependencyCycle;
use crate::lock::LockFile;
use crate::manifest::ZenDependency;
use crate::signature::Signature;
use crate::specifier::SpecifierCache;
use crate::store::GlobalStore;

/// Separator between the publishable names within a lineage.
pub const LINEAGE_SEPARATOR: &str = ">>";

/// A dependency to add to the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,

    /// Declared version or version range.
    pub version: String,

    pub import: bool,
    pub traverse_imports: bool,
}

impl Declaration {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Declaration {
            name: name.into(),
            version: version.into(),
            import: false,
            traverse_imports: false,
        }
    }

    /// Creates a declaration from an entry of the zen configuration block.
    pub fn from_zen(name: &str, dependency: &ZenDependency) -> Self {
        Declaration {
            name: name.to_string(),
            version: dependency.version.clone(),
            import: dependency.imports(),
            traverse_imports: dependency.traverses_imports(),
        }
    }

    #[must_use]
    pub fn imported(mut self, traverse_imports: bool) -> Self {
        self.import = true;
        self.traverse_imports = traverse_imports;
        self
    }
}

/// A resolved dependency within the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,

    /// Declared version or version range.
    pub version: String,

    pub import: bool,
    pub traverse_imports: bool,

    /// Signature of the artifact the entry resolved to.
    pub signature: Signature,

    /// Directory of the artifact the entry resolved to.
    pub publish_resolve: PathBuf,

    /// Exact version the entry resolved to.
    pub version_resolve: String,

    /// Lineage of the entry, if it was reached through another dependency.
    pub lineage: Option<String>,
}

impl TreeEntry {
    /// Determines whether the entry was declared directly by the project.
    pub fn is_root(&self) -> bool {
        self.lineage.is_none()
    }

    /// Gets the publishable name of the resolved version.
    pub fn publish_name(&self) -> String {
        format!("{}@{}", self.name, self.version_resolve)
    }
}

/// Builds the flattened dependency tree of the given root declarations.
///
/// Entries are listed depth-first, where every entry comes right before the
/// entries of its own dependencies.
///
/// # Errors
///
/// Returns `Err` if any dependency is not published in a compatible version,
/// if the lock file of an artifact is malformed, or if the dependencies form a
/// cycle.
#[tracing::instrument(level = "DEBUG", skip_all, fields(roots = roots.len()), err)]
pub fn build_tree(
    store: &GlobalStore,
    specifiers: &mut SpecifierCache,
    roots: &[Declaration],
) -> Result<Vec<TreeEntry>> {
    let mut builder = TreeBuilder {
        store,
        specifiers,
        entries: Vec::new(),
        path: Vec::new(),
    };

    builder.visit(roots, None)?;

    Ok(builder.entries)
}

struct TreeBuilder<'a> {
    store: &'a GlobalStore,
    specifiers: &'a mut SpecifierCache,
    entries: Vec<TreeEntry>,

    /// Publishable names of the entries currently being visited.
    path: Vec<String>,
}

impl TreeBuilder<'_> {
    fn visit(&mut self, declarations: &[Declaration], prefix: Option<&str>) -> Result<()> {
        for declaration in declarations {
            self.visit_one(declaration, prefix)?;
        }

        Ok(())
    }

    fn visit_one(&mut self, declaration: &Declaration, prefix: Option<&str>) -> Result<()> {
        let compatible = self
            .store
            .compatible_versions(&declaration.name, Some(&declaration.version))?;

        let best = compatible.first().unwrap_or(&declaration.version);

        let (publish_name, artifact) =
            self.store
                .resolve_published(self.specifiers, &declaration.name, best, true)?;

        let version_resolve = self.specifiers.parse(&publish_name)?.version.unwrap_or_default();

        if self.path.contains(&publish_name) {
            let mut cycle = self.path.clone();
            cycle.push(publish_name);

            return Err(DependencyCycle {
                cycle: cycle.join(LINEAGE_SEPARATOR),
            }
            .into());
        }

        if declaration.traverse_imports && !declaration.import {
            tracing::warn!(
                "{publish_name} traverses imports without being imported, so its traversed imports are unused"
            );
        }

        let lineage = prefix.map(|prefix| format!("{prefix}{LINEAGE_SEPARATOR}{publish_name}"));
        let resolve = artifact.resolve.clone();

        self.entries.push(TreeEntry {
            name: declaration.name.clone(),
            version: declaration.version.clone(),
            import: declaration.import,
            traverse_imports: declaration.traverse_imports,
            signature: artifact.pack_signature.clone(),
            publish_resolve: resolve.clone(),
            version_resolve,
            lineage: lineage.clone(),
        });

        // Every artifact is traversed, even when it does not import its
        // dependencies, so updates deep within the tree are always noticed.
        let lock = LockFile::read_or_default(&resolve)?;
        if lock.pkgs.is_empty() {
            return Ok(());
        }

        let children = lock
            .pkgs
            .iter()
            .map(|(name, locked)| Declaration {
                name: name.clone(),
                version: locked.version.clone(),
                import: declaration.traverse_imports,
                traverse_imports: declaration.traverse_imports || locked.traverse_imports,
            })
            .collect::<Vec<_>>();

        let child_prefix = lineage.unwrap_or_else(|| publish_name.clone());

        self.path.push(publish_name);
        let result = self.visit(&children, Some(&child_prefix));
        self.path.pop();

        result
    }
}

#[cfg(test)]
mod tests;
