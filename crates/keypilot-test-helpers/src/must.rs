//! Unwrap helpers with good error messages.
//!
//! These replace `unwrap()` and `expect()` in test code. `#[track_caller]`
//! keeps the panic location at the call site.

use std::fmt::Debug;
use std::future::Future;

/// Unwrap a `Result`, panicking with the error value on `Err`.
///
/// ```rust
/// use keypilot_test_helpers::must;
///
/// let result: Result<i32, &str> = Ok(42);
/// assert_eq!(must(result), 42);
/// ```
///
/// # Panics
///
/// Panics if the result is `Err`.
#[track_caller]
pub fn must<T, E: Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("must: unexpected Err: {e:?}"),
    }
}

/// Unwrap an `Option`, panicking with `msg` on `None`.
///
/// ```rust
/// use keypilot_test_helpers::must_some;
///
/// assert_eq!(must_some(Some(7), "expected a value"), 7);
/// ```
///
/// # Panics
///
/// Panics if the option is `None`.
#[track_caller]
pub fn must_some<T>(option: Option<T>, msg: &str) -> T {
    match option {
        Some(v) => v,
        None => panic!("must_some: {msg}"),
    }
}

/// Await a future yielding a `Result` and unwrap it.
///
/// # Panics
///
/// Panics if the awaited result is `Err`.
#[track_caller]
pub fn must_async<T, E, F>(future: F) -> impl Future<Output = T>
where
    E: Debug,
    F: Future<Output = Result<T, E>>,
{
    let location = std::panic::Location::caller();
    async move {
        match future.await {
            Ok(v) => v,
            Err(e) => panic!("must_async at {location}: unexpected Err: {e:?}"),
        }
    }
}
