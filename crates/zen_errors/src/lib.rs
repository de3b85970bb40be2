#![allow(clippy::arc_with_non_send_sync)]

pub extern crate error_snippet_derive;

use std::sync::{Arc, Mutex, MutexGuard};

pub use error_snippet::{Diagnostic, Error, GraphicalRenderer, IntoDiagnostic, Result, SimpleDiagnostic};
use error_snippet::{Renderer, Severity};
pub use error_snippet_derive::Diagnostic;

/// Holding block for every diagnostic reported during a single `zen`
/// invocation.
#[derive(Default)]
struct DiagCtxInner {
    emitted: Vec<Error>,
}

impl DiagCtxInner {
    fn render_buffer(&self, renderer: &mut impl Renderer) -> Option<String> {
        if self.emitted.is_empty() {
            return None;
        }

        let buffer = self
            .emitted
            .iter()
            .filter_map(|diagnostic| renderer.render(diagnostic.as_ref()).ok())
            .collect::<String>();

        Some(buffer)
    }

    fn is_tainted(&self) -> bool {
        self.emitted.iter().any(|diag| diag.severity() == Severity::Error)
    }
}

/// A context to collect diagnostics in, which lives for the entire
/// lifespan of a command.
///
/// Commands report failures through a [`DiagCtxHandle`]; once the command
/// has finished, the entry point renders everything that was collected and
/// decides on the exit code.
#[derive(Clone, Default)]
pub struct DiagCtx {
    inner: Arc<Mutex<DiagCtxInner>>,
}

impl DiagCtx {
    /// Creates a new, empty [`DiagCtx`] instance.
    pub fn new() -> Self {
        DiagCtx::default()
    }

    /// # Panics
    ///
    /// Panics if the inner diagnostics context has been locked by another
    /// thread.
    fn inner(&self) -> MutexGuard<'_, DiagCtxInner> {
        self.inner.lock().unwrap()
    }

    /// Emits the given diagnostic to the context directly.
    ///
    /// # Panics
    ///
    /// Panics if the context has already been locked by another thread.
    pub fn emit(&self, diag: Error) {
        self.inner().emitted.push(diag);
    }

    /// Create a handle for the diagnostic context, which can be
    /// used to emit diagnostics to the inner context.
    pub fn handle(&self) -> DiagCtxHandle {
        DiagCtxHandle {
            inner: Arc::clone(&self.inner),
            emitted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Determines whether the diagnostic context has been tainted with
    /// one-or-more errors.
    pub fn is_tainted(&self) -> bool {
        self.inner().is_tainted()
    }

    /// Renders all the stored diagnostics to the standard error output
    /// (`stderr`).
    pub fn render_stderr(&self, renderer: &mut impl Renderer) {
        if let Some(buffer) = self.render_buffer(renderer) {
            eprint!("{buffer}");
        }
    }

    /// Renders all the stored diagnostics into a [`String`]
    pub fn render_buffer(&self, renderer: &mut impl Renderer) -> Option<String> {
        self.inner().render_buffer(renderer)
    }

    /// Clears all the diagnostics from the context.
    pub fn clear(&self) {
        self.inner().emitted.clear();
    }

    /// Creates a new handle, which is only valid within the given closure,
    /// which is executed immediately. If the closure returns `Err`, the error
    /// is reported to the context and `None` is returned.
    pub fn with_opt<TReturn>(&self, f: impl FnOnce(DiagCtxHandle) -> Result<TReturn>) -> Option<TReturn> {
        let handle = self.handle();

        match f(handle.clone()) {
            Ok(value) => {
                handle.push();
                Some(value)
            }
            Err(err) => {
                handle.emit_and_push(err);
                None
            }
        }
    }
}

/// A handle to a parent [`DiagCtx`].
///
/// Diagnostics emitted through the handle are buffered until they are pushed
/// to the parent context.
#[derive(Clone)]
pub struct DiagCtxHandle {
    inner: Arc<Mutex<DiagCtxInner>>,
    emitted: Arc<Mutex<Vec<Error>>>,
}

impl DiagCtxHandle {
    /// Creates a new [`DiagCtxHandle`] without any surrounding context. Mostly
    /// used for testing.
    pub fn shim() -> Self {
        DiagCtx::new().handle()
    }

    /// Buffers the given diagnostic within the handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle has already been locked by another thread.
    pub fn emit(&self, diag: Error) {
        self.emitted.lock().unwrap().push(diag);
    }

    /// Emits the given diagnostic and pushes every buffered diagnostic
    /// to the parent context.
    pub fn emit_and_push(&self, diag: Error) {
        self.emit(diag);
        self.push();
    }

    /// Drains the buffered diagnostics into the parent context.
    ///
    /// # Panics
    ///
    /// Panics if the handle has already been locked by another thread.
    pub fn push(&self) {
        let mut emitted = self.emitted.lock().unwrap();

        self.inner.lock().unwrap().emitted.append(&mut emitted);
    }

    /// Determines whether any diagnostic has been emitted through this handle,
    /// which has not yet been pushed.
    ///
    /// # Panics
    ///
    /// Panics if the handle has already been locked by another thread.
    pub fn has_pending(&self) -> bool {
        !self.emitted.lock().unwrap().is_empty()
    }
}

pub trait MapDiagnostic<T> {
    /// If the instance is a [`std::result::Result::Err`], maps it into
    /// an instance of [`Diagnostic`] (via
    /// [`IntoDiagnostic::into_diagnostic`]).
    fn map_diagnostic(self) -> Result<T>;

    /// If the instance is a [`std::result::Result::Err`], declares it as a
    /// cause of a new [`Diagnostic`] with the given message.
    fn map_cause(self, message: impl Into<String>) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> MapDiagnostic<T> for std::result::Result<T, E> {
    fn map_diagnostic(self) -> Result<T> {
        self.map_err(IntoDiagnostic::into_diagnostic)
    }

    fn map_cause(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|err| {
            let diag = SimpleDiagnostic::new(message).add_cause(err.into_diagnostic());

            Box::new(diag) as Error
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untainted_by_default() {
        let dcx = DiagCtx::new();

        assert!(!dcx.is_tainted());
        assert!(dcx.render_buffer(&mut GraphicalRenderer::new()).is_none());
    }

    #[test]
    fn with_opt_reports_errors() {
        let dcx = DiagCtx::new();

        let value: Option<()> = dcx.with_opt(|_| Err(SimpleDiagnostic::new("store is locked").into()));

        assert!(value.is_none());
        assert!(dcx.is_tainted());

        dcx.clear();
        assert!(!dcx.is_tainted());
    }

    #[test]
    fn handle_buffers_until_pushed() {
        let dcx = DiagCtx::new();
        let handle = dcx.handle();

        handle.emit(SimpleDiagnostic::new("could not sync installation").into());
        assert!(handle.has_pending());
        assert!(!dcx.is_tainted());

        handle.push();
        assert!(!handle.has_pending());
        assert!(dcx.is_tainted());
    }

    #[test]
    fn map_cause_wraps_io_errors() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::other("disk full"));
        let err = res.map_cause("could not write lock file").unwrap_err();

        assert_eq!(err.message(), "could not write lock file");
    }
}
