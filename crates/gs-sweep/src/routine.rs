//! The seam to the external fitting routine.

use gs_types::JobError;

use crate::job::InvocationArgs;

/// A blocking call into the external fitting routine.
///
/// Implementations receive the job's own argument list and must not rely on
/// any process-wide state; the dispatcher may call `invoke` from several
/// worker threads at once.
pub trait FitRoutine: Send + Sync {
    /// Run the routine once. The returned value is recorded as the job's
    /// success payload.
    fn invoke(&self, args: &InvocationArgs) -> Result<serde_json::Value, JobError>;

    /// Human-readable routine name for logs.
    fn name(&self) -> &str {
        "routine"
    }
}

impl<R: FitRoutine + ?Sized> FitRoutine for Box<R> {
    fn invoke(&self, args: &InvocationArgs) -> Result<serde_json::Value, JobError> {
        (**self).invoke(args)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<R: FitRoutine + ?Sized> FitRoutine for std::sync::Arc<R> {
    fn invoke(&self, args: &InvocationArgs) -> Result<serde_json::Value, JobError> {
        (**self).invoke(args)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A routine backed by a closure.
pub struct FnRoutine<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a [`FitRoutine`].
pub fn routine_fn<F>(name: impl Into<String>, f: F) -> FnRoutine<F>
where
    F: Fn(&InvocationArgs) -> Result<serde_json::Value, JobError> + Send + Sync,
{
    FnRoutine {
        name: name.into(),
        f,
    }
}

impl<F> FitRoutine for FnRoutine<F>
where
    F: Fn(&InvocationArgs) -> Result<serde_json::Value, JobError> + Send + Sync,
{
    fn invoke(&self, args: &InvocationArgs) -> Result<serde_json::Value, JobError> {
        (self.f)(args)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> std::fmt::Debug for FnRoutine<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnRoutine").field("name", &self.name).finish()
    }
}
