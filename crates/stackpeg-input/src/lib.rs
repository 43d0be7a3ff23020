//! Input abstraction for the stackpeg engine.
//!
//! Provides a uniform view over a character string or an ordered token
//! sequence, with integer-offset position semantics shared by both.

#![deny(unsafe_code)]
#![deny(unreachable_pub)]
#![warn(rust_2018_idioms)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]

mod token;
mod view;

pub use token::Tok;
pub use view::Input;
