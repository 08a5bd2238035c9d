use thiserror::Error;

// Unified error type for krylov-replay

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KError {
    #[error("shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeError {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("unsupported preconditioner kind: {0:?}")]
    UnsupportedPreconditioner(String),
    #[error("unsupported solver kind: {0:?}")]
    UnsupportedSolver(String),
}

impl KError {
    /// Fails with `ShapeError` unless `found == expected`.
    pub(crate) fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), KError> {
        if expected == found {
            Ok(())
        } else {
            Err(KError::ShapeError { what, expected, found })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let cases = [
            (
                KError::ShapeError { what: "solution x", expected: 4, found: 3 },
                "shape mismatch in solution x: expected 4, found 3",
            ),
            (
                KError::UnsupportedPreconditioner("ilu0".into()),
                "unsupported preconditioner kind: \"ilu0\"",
            ),
            (KError::UnsupportedSolver("minres".into()), "unsupported solver kind: \"minres\""),
        ];
        for (err, msg) in cases {
            assert_eq!(err.to_string(), msg);
        }
    }

    #[test]
    fn check_len_reports_both_sizes() {
        assert_eq!(KError::check_len("right-hand side b", 3, 3), Ok(()));
        assert_eq!(
            KError::check_len("right-hand side b", 3, 2),
            Err(KError::ShapeError { what: "right-hand side b", expected: 3, found: 2 })
        );
    }
}
