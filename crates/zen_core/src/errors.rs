use std::path::PathBuf;

use error_snippet::Error;
use error_snippet_derive::Diagnostic;

#[derive(Diagnostic, Debug)]
#[diagnostic(message = "missing package.json within {dir:?}", code = "ZEN0101")]
pub struct ManifestMissing {
    pub dir: PathBuf,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(
    message = "package {name} has never been published",
    code = "ZEN0102",
    help = "publish it with `zen publish` from within its project directory"
)]
pub struct PackageNeverPublished {
    pub name: String,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(message = "no published package matches {name}", code = "ZEN0103")]
pub struct PackageNotPublished {
    pub name: String,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(
    message = "no published version of {name} satisfies `{range}`",
    code = "ZEN0104",
    help = "use `zen list` to see which versions are available"
)]
pub struct NoCompatibleVersion {
    pub name: String,
    pub range: String,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(
    message = "missing zen.lock.json within {dir:?}",
    code = "ZEN0105",
    help = "run `zen pull` to create one"
)]
pub struct LockFileMissing {
    pub dir: PathBuf,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(
    message = "could not determine the zen home directory",
    code = "ZEN0106",
    help = "set the `{envkey}` environment variable to choose one"
)]
pub struct HomeDirectoryMissing {
    pub envkey: String,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(
    message = "invalid package specifier `{input}`",
    code = "ZEN0201",
    help = "expected a specifier such as `name`, `name@1.2.0` or `@organization/name@^1.0.0`"
)]
pub struct InvalidSpecifier {
    pub input: String,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(message = "invalid version range `{range}`", code = "ZEN0202")]
pub struct InvalidVersionRange {
    pub range: String,

    #[related(collection)]
    pub inner: Vec<Error>,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(message = "package.json in {dir:?} is missing the `{field}` field", code = "ZEN0203")]
pub struct MissingManifestField {
    pub dir: PathBuf,
    pub field: String,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(message = "malformed JSON in {path:?}", code = "ZEN0204")]
pub struct MalformedJson {
    pub path: PathBuf,

    #[related(collection)]
    pub inner: Vec<Error>,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(
    message = "cannot pack {dir:?} into {out:?}",
    code = "ZEN0205",
    help = "the output directory must not contain the package being packed"
)]
pub struct InvalidPackDestination {
    pub dir: PathBuf,
    pub out: PathBuf,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(
    message = "dependency cycle detected: {cycle}",
    code = "ZEN0301",
    help = "a package may not depend on itself, directly or through other packages"
)]
pub struct DependencyCycle {
    pub cycle: String,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(
    message = "{name} is still installed in {count} project(s)",
    code = "ZEN0302",
    help = "pass `--force` to unpublish it anyway"
)]
pub struct PackageInstalled {
    pub name: String,
    pub count: usize,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(message = "failed to read {path:?}", code = "ZEN0401")]
pub struct FileReadError {
    pub path: PathBuf,

    #[related(collection)]
    pub inner: Vec<Error>,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(message = "failed to write {path:?}", code = "ZEN0402")]
pub struct FileWriteError {
    pub path: PathBuf,

    #[related(collection)]
    pub inner: Vec<Error>,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(
    message = "failed to lock the global store at {path:?}",
    code = "ZEN0403",
    help = "is another zen process stuck?"
)]
pub struct StoreLockError {
    pub path: PathBuf,

    #[related(collection)]
    pub inner: Vec<Error>,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(message = "failed to enumerate files in {dir:?}", code = "ZEN0404")]
pub struct PackGlobError {
    pub dir: PathBuf,

    #[related(collection)]
    pub inner: Vec<Error>,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(message = "script `{script}` failed in {dir:?}", code = "ZEN0501")]
pub struct ScriptFailed {
    pub script: String,
    pub dir: PathBuf,

    #[related(collection)]
    pub inner: Vec<Error>,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(
    message = "`{command}` exited with status code {status}",
    code = "ZEN0502"
)]
pub struct CommandFailed {
    pub command: String,
    pub status: i32,
}
