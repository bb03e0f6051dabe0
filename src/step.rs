/// Success test applied to a step's return value.
///
/// `bool` succeeds when `true`, integer status codes succeed when zero, and
/// `Result` succeeds when `Ok`.
pub trait Outcome {
    /// Returns `true` if the value reports success.
    fn is_success(&self) -> bool;
}

impl Outcome for bool {
    fn is_success(&self) -> bool {
        *self
    }
}

macro_rules! status_code_outcome {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Outcome for $ty {
                fn is_success(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

status_code_outcome!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl<T, E> Outcome for Result<T, E> {
    fn is_success(&self) -> bool {
        self.is_ok()
    }
}

/// One entry of a runner: a callable plus the message describing its failure.
///
/// Borrows the callable, so a runner's steps live inline without boxing.
pub struct Step<'a, R> {
    call: &'a mut dyn FnMut() -> R,
    message: &'a str,
}

impl<'a, R> Step<'a, R> {
    /// Creates a step from a callable and its failure message.
    #[must_use]
    pub fn new(call: &'a mut dyn FnMut() -> R, message: &'a str) -> Self {
        Self { call, message }
    }

    /// Returns the failure message.
    #[must_use]
    pub const fn message(&self) -> &'a str {
        self.message
    }

    pub(crate) fn invoke(&mut self) -> R {
        (self.call)()
    }
}

impl<R> std::fmt::Debug for Step<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Step({:?})", self.message)
    }
}
