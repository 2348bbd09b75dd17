/// A boxed error type for shell operations.
///
/// Any error type that implements the `Error` trait can be boxed into
/// this. Only construction-time failures (hook registration, shell
/// callback registration) ever reach a caller; steady-state faults are
/// absorbed and reflected as absence of data instead.
pub type ShellResult<T> = Result<T, Box<dyn std::error::Error>>;
