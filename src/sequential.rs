use crate::{Outcome, Step};

/// Runs steps in order and stops at the first failure.
///
/// Steps are stored inline in a fixed-size array; nothing is boxed.
///
/// # Example
///
/// ```
/// use fixed_arena::{SequentialRunner, Step};
///
/// let mut init = || true;
/// let mut load = || false;
/// let mut serve = || true;
/// let mut runner = SequentialRunner::new([
///     Step::new(&mut init, "initialization failed"),
///     Step::new(&mut load, "configuration failed"),
///     Step::new(&mut serve, "server failed"),
/// ]);
///
/// assert_eq!(runner.run(), Some(1));
/// assert_eq!(runner.message(1), Some("configuration failed"));
/// ```
pub struct SequentialRunner<'a, R, const N: usize> {
    steps: [Step<'a, R>; N],
    failed: Option<usize>,
    last: Option<R>,
}

impl<'a, R: Outcome, const N: usize> SequentialRunner<'a, R, N> {
    /// Creates a runner over `steps`, executed in array order.
    #[must_use]
    pub const fn new(steps: [Step<'a, R>; N]) -> Self {
        Self {
            steps,
            failed: None,
            last: None,
        }
    }

    /// Invokes the steps in order until one fails.
    ///
    /// Returns the index of the failing step, or `None` if every step
    /// succeeded. Steps after the failing one are not invoked.
    pub fn run(&mut self) -> Option<usize> {
        self.failed = None;
        for (index, step) in self.steps.iter_mut().enumerate() {
            let result = step.invoke();
            let ok = result.is_success();
            self.last = Some(result);
            if !ok {
                tracing::debug!(index, message = step.message(), "step failed");
                self.failed = Some(index);
                break;
            }
        }
        self.failed
    }

    /// Returns the index of the step that failed during the last
    /// [`run`](SequentialRunner::run).
    #[must_use]
    pub const fn failed_index(&self) -> Option<usize> {
        self.failed
    }

    /// Returns the failure message of the step at `index`.
    #[must_use]
    pub fn message(&self, index: usize) -> Option<&'a str> {
        self.steps.get(index).map(Step::message)
    }

    /// Invokes the step at `index` again and reports whether it succeeded.
    ///
    /// Returns `false` if `index` is out of range. The recorded failing
    /// index is left as the last run set it.
    pub fn rerun(&mut self, index: usize) -> bool {
        let Some(step) = self.steps.get_mut(index) else {
            return false;
        };
        let result = step.invoke();
        let ok = result.is_success();
        self.last = Some(result);
        ok
    }

    /// Returns the value returned by the most recently invoked step.
    #[must_use]
    pub const fn last_result(&self) -> Option<&R> {
        self.last.as_ref()
    }

    /// Returns the number of steps.
    #[must_use]
    pub const fn count(&self) -> usize {
        N
    }
}

impl<R, const N: usize> std::fmt::Debug for SequentialRunner<'_, R, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialRunner")
            .field("steps", &self.steps)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}
