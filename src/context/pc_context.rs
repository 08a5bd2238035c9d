//! Preconditioner context and configuration for Krylov solvers.
//!
//! This module defines the `PcKind` enum, the set of preconditioner kinds the builder in
//! [`crate::preconditioner`] knows how to construct, together with its string spelling.
//!
//! # Supported Preconditioners
//!
//! - `identity` / `id`: no-op baseline, M = I.
//! - `diag`: Jacobi, M = diag(A)⁻¹ with vanishing entries mapped to 0.
//! - `diag_abs`: Jacobi on |diag(A)|.
//!
//! # Example
//!
//! ```rust
//! use krylov_replay::PcKind;
//! let kind: PcKind = "diag".parse().unwrap();
//! assert_eq!(kind, PcKind::Diag);
//! ```

use crate::error::KError;
use std::fmt;
use std::str::FromStr;

/// Unified preconditioner kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcKind {
    /// M = I.
    Identity,
    /// Jacobi (diagonal scaling) preconditioner.
    Diag,
    /// Jacobi scaling by the magnitude of the diagonal.
    DiagAbs,
}

impl FromStr for PcKind {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity" | "id" => Ok(PcKind::Identity),
            "diag" => Ok(PcKind::Diag),
            "diag_abs" => Ok(PcKind::DiagAbs),
            other => Err(KError::UnsupportedPreconditioner(other.to_string())),
        }
    }
}

impl fmt::Display for PcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PcKind::Identity => "identity",
            PcKind::Diag => "diag",
            PcKind::DiagAbs => "diag_abs",
        })
    }
}
