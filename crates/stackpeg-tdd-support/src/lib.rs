//! Test helpers for the stackpeg workspace.
//!
//! The workspace lint policy denies `unwrap()`/`expect()`/`panic!` in crate
//! code; these panic-on-failure helpers give tests an equivalent with a
//! caller-side source location. Every message names the type that was
//! expected, which makes a failed extraction readable without opening the
//! test: dynamically-typed [`Val`]s all render as `Val<...>` in debug
//! output, so the type name is usually the only distinguishing detail.

#![deny(unsafe_code)]
#![deny(unreachable_pub)]
#![warn(rust_2018_idioms)]
#![warn(missing_docs)]

use stackpeg::Val;
use std::any::type_name;

/// Extract the value from a `Result`, or panic naming the expected type.
#[track_caller]
pub fn must<T, E: std::fmt::Debug>(r: Result<T, E>) -> T {
    match r {
        Ok(value) => value,
        Err(error) => panic!("expected Ok({}), got Err: {error:?}", type_name::<T>()),
    }
}

/// Extract the value from an `Option`, or panic naming the expected type.
#[track_caller]
pub fn must_some<T>(o: Option<T>) -> T {
    match o {
        Some(value) => value,
        None => panic!("expected Some({}), got None", type_name::<T>()),
    }
}

/// Extract the error from a `Result`, or panic showing the unexpected
/// success value.
#[track_caller]
pub fn must_err<T: std::fmt::Debug, E>(r: Result<T, E>) -> E {
    match r {
        Err(error) => error,
        Ok(value) => panic!("expected Err({}), got Ok({value:?})", type_name::<E>()),
    }
}

/// Downcast a semantic value to a concrete type, or panic naming both the
/// wanted type and the type the value actually holds.
#[track_caller]
pub fn must_val<T: 'static>(v: &Val) -> &T {
    match v.downcast_ref::<T>() {
        Some(value) => value,
        None => panic!("expected Val<{}>, got Val<{}>", type_name::<T>(), v.type_name()),
    }
}
