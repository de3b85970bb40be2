use error_snippet_derive::Diagnostic;

#[derive(Diagnostic, Debug)]
#[diagnostic(
    message = "Could not determine the project directory",
    code = "CLI0001",
    help = "Is the path given to --cwd correct?"
)]
pub struct CouldNotDetermineProjectPath {
    #[related(collection)]
    pub inner: Vec<error_snippet::Error>,
}

#[derive(Diagnostic, Debug)]
#[diagnostic(
    message = "Could not determine the package manager of {path}",
    code = "CLI0002",
    help = "Pass the package manager explicitly, such as `zen install npm`"
)]
pub struct UnknownPackageManager {
    pub path: String,
}
