use crate::{Outcome, Step};

/// Runs every step regardless of individual failures and keeps each result.
///
/// Steps and results are stored inline in fixed-size arrays.
///
/// # Example
///
/// ```
/// use fixed_arena::{FanOutRunner, Step};
///
/// let mut ping = || 0;
/// let mut probe = || -1;
/// let mut report = || 0;
/// let mut runner = FanOutRunner::new([
///     Step::new(&mut ping, "ping failed"),
///     Step::new(&mut probe, "probe failed"),
///     Step::new(&mut report, "report failed"),
/// ]);
///
/// runner.run();
/// assert_eq!(runner.success_count(), 2);
/// assert_eq!(runner.result(1), Some(&-1));
/// ```
pub struct FanOutRunner<'a, R, const N: usize> {
    steps: [Step<'a, R>; N],
    results: [Option<R>; N],
    executed: bool,
}

impl<'a, R: Outcome, const N: usize> FanOutRunner<'a, R, N> {
    /// Creates a runner over `steps`, executed in array order.
    #[must_use]
    pub fn new(steps: [Step<'a, R>; N]) -> Self {
        Self {
            steps,
            results: std::array::from_fn(|_| None),
            executed: false,
        }
    }

    /// Invokes every step and records each result.
    pub fn run(&mut self) {
        for (index, (step, slot)) in self.steps.iter_mut().zip(&mut self.results).enumerate() {
            let result = step.invoke();
            if !result.is_success() {
                tracing::debug!(index, message = step.message(), "step failed");
            }
            *slot = Some(result);
        }
        self.executed = true;
    }

    /// Returns the recorded result of the step at `index`.
    ///
    /// `None` if the index is out of range or the step has not run yet.
    #[must_use]
    pub fn result(&self, index: usize) -> Option<&R> {
        self.results.get(index).and_then(Option::as_ref)
    }

    /// Returns `true` if the step at `index` ran and succeeded.
    #[must_use]
    pub fn succeeded(&self, index: usize) -> bool {
        self.result(index).is_some_and(Outcome::is_success)
    }

    /// Returns every recorded result in step order.
    #[must_use]
    pub const fn results(&self) -> &[Option<R>; N] {
        &self.results
    }

    /// Returns `true` if [`run`](FanOutRunner::run) was called and every
    /// step succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.executed && (0..N).all(|index| self.succeeded(index))
    }

    /// Returns `true` if at least one step succeeded.
    #[must_use]
    pub fn any_succeeded(&self) -> bool {
        self.executed && (0..N).any(|index| self.succeeded(index))
    }

    /// Returns the number of steps that succeeded.
    #[must_use]
    pub fn success_count(&self) -> usize {
        if !self.executed {
            return 0;
        }
        (0..N).filter(|&index| self.succeeded(index)).count()
    }

    /// Returns the number of steps that failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        if self.executed {
            N - self.success_count()
        } else {
            0
        }
    }

    /// Returns the failure message of the step at `index`.
    #[must_use]
    pub fn message(&self, index: usize) -> Option<&'a str> {
        self.steps.get(index).map(Step::message)
    }

    /// Invokes the step at `index` again, replacing its recorded result.
    ///
    /// Returns whether it succeeded, or `false` if `index` is out of range.
    pub fn rerun(&mut self, index: usize) -> bool {
        let (Some(step), Some(slot)) = (self.steps.get_mut(index), self.results.get_mut(index))
        else {
            return false;
        };
        let result = step.invoke();
        let ok = result.is_success();
        *slot = Some(result);
        ok
    }

    /// Reruns every step whose recorded result is a failure.
    ///
    /// Returns how many of them succeeded this time. Returns 0 before the
    /// first [`run`](FanOutRunner::run).
    pub fn rerun_all_failed(&mut self) -> usize {
        if !self.executed {
            return 0;
        }
        let mut recovered = 0;
        for index in 0..N {
            if !self.succeeded(index) && self.rerun(index) {
                recovered += 1;
            }
        }
        tracing::debug!(recovered, "reran failed steps");
        recovered
    }

    /// Returns the number of steps.
    #[must_use]
    pub const fn count(&self) -> usize {
        N
    }
}

impl<R, const N: usize> std::fmt::Debug for FanOutRunner<'_, R, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOutRunner")
            .field("steps", &self.steps)
            .field("executed", &self.executed)
            .finish_non_exhaustive()
    }
}
