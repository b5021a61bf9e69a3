//! Error handling, definitions, and utilities for the query planner.
//!
//! Errors fall into two groups. *User-facing* errors ([`PlanError::Unsupported`],
//! [`PlanError::SetSizeLimitExceeded`], ...) abort planning of the query that triggered them and
//! are reported back to whoever submitted it. [`PlanError::Internal`] errors indicate that an
//! invariant established by an earlier phase (usually analysis) did not hold; they are bugs, and
//! are generated with the [`internal!`] and [`invariant!`] family of macros rather than
//! constructed by hand.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// General error type used throughout the query planner.
#[derive(Serialize, Deserialize, Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// The query uses a construct the planner cannot handle.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// A set grew beyond the configured limits while being built, and the overflow mode asked
    /// for an error.
    #[error(
        "Limit for set exceeded, max rows: {max_rows}, current rows: {rows}, max bytes: \
         {max_bytes}, current bytes: {bytes}"
    )]
    SetSizeLimitExceeded {
        /// The configured row limit (0 means unlimited).
        max_rows: u64,
        /// The number of rows the set would have held.
        rows: u64,
        /// The configured byte limit (0 means unlimited).
        max_bytes: u64,
        /// The number of bytes the set would have held.
        bytes: u64,
    },

    /// An element of a constant collection could not be used as an element of a set with the
    /// requested element types.
    #[error("Incorrect element of set: {0}")]
    InvalidSetElement(String),

    /// A membership test was attempted against a set whose contents have not been filled in yet.
    #[error("Set {0} is not ready")]
    SetNotReady(String),

    /// A set that had already been filled was filled again.
    #[error("Set {0} has already been filled")]
    SetAlreadyFilled(String),

    /// A set was explicitly registered under a key that already has an entry.
    #[error("Set with key {0} is already registered")]
    DuplicateSetKey(String),

    /// An internal invariant has been violated.
    ///
    /// This is produced by the [`internal!`] and [`invariant!`] macros.
    #[error("Internal invariant violated: {0}")]
    Internal(String),
}

impl PlanError {
    /// Returns `true` if the error is [`PlanError::Unsupported`].
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(..))
    }

    /// Returns `true` if the error is [`PlanError::Internal`].
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(..))
    }

    /// Returns `true` if the error is [`PlanError::SetSizeLimitExceeded`].
    pub fn is_set_size_limit_exceeded(&self) -> bool {
        matches!(self, Self::SetSizeLimitExceeded { .. })
    }
}

/// Standard issue [`Result`] alias.
pub type PlanResult<T> = ::std::result::Result<T, PlanError>;

/// Make a new [`PlanError::Internal`] with the provided string-able argument.
pub fn internal_err<T: Into<String>>(err: T) -> PlanError {
    PlanError::Internal(err.into())
}

/// Make a new [`PlanError::Unsupported`] with the provided string-able argument.
pub fn unsupported_err<T: Into<String>>(err: T) -> PlanError {
    PlanError::Unsupported(err.into())
}

/// Renders information about the current source location *if* building in debug mode, for use in
/// error-generating macros
#[doc(hidden)]
#[macro_export]
macro_rules! __location_info {
    () => {
        $crate::__location_info!(" (in {})")
    };
    ($fstr: literal) => {
        if cfg!(debug_assertions) {
            format!(
                $fstr,
                format!("{}:{}:{}", std::file!(), std::line!(), std::column!(),)
            )
        } else {
            "".to_owned()
        }
    };
}

/// Make a new [`PlanError::Internal`] from a format string and arguments, capturing location
/// information in debug builds.
#[macro_export]
macro_rules! internal_err {
    ($($tt:tt)*) => {
        $crate::internal_err(format!(
            "{}{}",
            $crate::__location_info!("in {}: "),
            format_args!($($tt)*)
        ))
    };
}

/// Return a [`PlanError::Internal`] from the current function.
///
/// Usage is like [`panic!`], in that you can pass a format string and arguments. When building in
/// debug mode, the returned error also captures file, line, and column information for further
/// debugging purposes.
///
/// When called with no arguments, generates an internal error with the text
/// "entered unreachable code".
#[macro_export]
macro_rules! internal {
    () => {
        $crate::internal!("entered unreachable code")
    };
    ($($tt:tt)*) => {
        return Err($crate::internal_err!($($tt)*).into())
    };
}

/// Make a new [`PlanError::Unsupported`] from a format string and arguments.
///
/// Unlike [`internal_err!`] no location information is added: the message is shown to users.
#[macro_export]
macro_rules! unsupported_err {
    ($($tt:tt)*) => {
        $crate::unsupported_err(format!($($tt)*))
    };
}

/// Return a [`PlanError::Unsupported`] from the current function.
///
/// Usage is like [`panic!`], in that you can pass a format string and arguments.
#[macro_export]
macro_rules! unsupported {
    () => {
        $crate::unsupported!("operation not implemented yet")
    };
    ($($tt:tt)*) => {
        return Err($crate::unsupported_err!($($tt)*).into())
    };
}

/// Return a [`PlanError::Internal`] from the current function, if and only if
/// the argument evaluates to false.
///
/// This is intended to be used wherever [`assert!`] would otherwise be used.
#[macro_export]
macro_rules! invariant {
    ($expr:expr, $($tt:tt)*) => {
        if !$expr {
            $crate::internal!($($tt)*);
        }
    };
    ($expr:expr) => {
        if !$expr {
            $crate::internal!("assertion failed: {}", std::stringify!($expr));
        }
    };
}

/// Return a [`PlanError::Internal`] from the current function, if and only if
/// the two arguments aren't equal.
///
/// This is intended to be used wherever [`assert_eq!`] would otherwise be used.
#[macro_export]
macro_rules! invariant_eq {
    ($expr:expr, $expr2:expr, $($tt:tt)*) => {
        if $expr != $expr2 {
            $crate::internal!(
                "assertion failed: {} == {} ({});\nleft = {:?};\nright = {:?}",
                std::stringify!($expr),
                std::stringify!($expr2),
                format_args!($($tt)*),
                $expr,
                $expr2
            )
        }
    };
    ($expr:expr, $expr2:expr) => {
        if $expr != $expr2 {
            $crate::internal!(
                "assertion failed: {} == {};\nleft = {:?};\nright = {:?}",
                std::stringify!($expr),
                std::stringify!($expr2),
                $expr,
                $expr2
            )
        }
    };
}
