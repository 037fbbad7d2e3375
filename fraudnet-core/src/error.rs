//! Error types for the fraudnet core library.
//!
//! Defines the store and generation error enums exposed by the public API,
//! their stable machine-readable codes, and a convenient result alias.

use std::fmt;

use thiserror::Error;

use crate::loader::{LoadPhase, LoadStrategy};

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// An error produced by a [`crate::GraphStore`] bulk operation.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum StoreError {
    /// The store could not be reached or timed out.
    #[error("graph store unavailable: {reason}")]
    Unavailable {
        /// Human-readable description supplied by the store.
        reason: String,
    },
    /// The store refused the operation, for example on a constraint violation.
    #[error("graph store rejected `{operation}`: {reason}")]
    Rejected {
        /// Bulk operation that was refused.
        operation: &'static str,
        /// Human-readable description supplied by the store.
        reason: String,
    },
    /// A synchronisation primitive guarding store state was poisoned.
    #[error("lock for {resource} is poisoned")]
    LockPoisoned {
        /// Name of the poisoned resource.
        resource: &'static str,
    },
}

define_error_codes! {
    /// Stable codes describing [`StoreError`] variants.
    enum StoreErrorCode for StoreError {
        /// The store could not be reached or timed out.
        Unavailable => Unavailable { .. } => "STORE_UNAVAILABLE",
        /// The store refused the operation.
        Rejected => Rejected { .. } => "STORE_REJECTED",
        /// A synchronisation primitive guarding store state was poisoned.
        LockPoisoned => LockPoisoned { .. } => "STORE_LOCK_POISONED",
    }
}

/// Error type produced when configuring or running a [`crate::Generator`].
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum GenerationError {
    /// A builder parameter was outside its valid domain.
    #[error("invalid generator configuration: {parameter} {reason}")]
    InvalidConfiguration {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
    /// Transactions need two distinct users to act as sender and receiver.
    #[error("transactions require at least 2 users (got {users})")]
    InsufficientUsers {
        /// Number of users available to the transaction factory.
        users: usize,
    },
    /// The requested load strategy is not compiled into this build.
    #[error("the requested load strategy {requested:?} is not available in this build")]
    StrategyUnavailable {
        /// Strategy that could not be satisfied.
        requested: LoadStrategy,
    },
    /// A bulk store operation failed and aborted the run.
    #[error("{phase} batch {batch} failed: {error}")]
    Store {
        /// Load phase that was executing.
        phase: LoadPhase,
        /// Zero-based index of the failing batch within the phase.
        batch: usize,
        #[source]
        /// Underlying store failure.
        error: StoreError,
    },
}

define_error_codes! {
    /// Stable codes describing [`GenerationError`] variants.
    enum GenerationErrorCode for GenerationError {
        /// A builder parameter was outside its valid domain.
        InvalidConfiguration => InvalidConfiguration { .. } => "GENERATION_INVALID_CONFIGURATION",
        /// Transactions need two distinct users.
        InsufficientUsers => InsufficientUsers { .. } => "GENERATION_INSUFFICIENT_USERS",
        /// The requested load strategy is not compiled into this build.
        StrategyUnavailable => StrategyUnavailable { .. } => "GENERATION_STRATEGY_UNAVAILABLE",
        /// A bulk store operation failed and aborted the run.
        StoreFailure => Store { .. } => "GENERATION_STORE_FAILURE",
    }
}

impl GenerationError {
    /// Retrieve the inner [`StoreErrorCode`] when the error originated in the store.
    pub const fn store_code(&self) -> Option<StoreErrorCode> {
        match self {
            Self::Store { error, .. } => Some(error.code()),
            _ => None,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, GenerationError>;
