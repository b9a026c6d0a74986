//! Domain error taxonomy.
//!
//! Every calculator failure is raised before any arithmetic runs and
//! names the offending argument, so callers never see partial results.

use thiserror::Error;

/// Errors raised by the LMSR calculator and its value types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LmsrError {
    /// An input was out of range, negative, missing or malformed.
    #[error("invalid argument `{argument}` = {value}: {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        argument: String,
        /// The value as supplied (or a placeholder when missing).
        value: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The decimal context cannot represent the requested magnitude.
    #[error("precision of {precision} significant digits is insufficient: {detail}")]
    PrecisionConfiguration {
        /// Configured significant digits.
        precision: u32,
        /// Why the precision is insufficient.
        detail: String,
    },
}

impl LmsrError {
    /// Shorthand for [`LmsrError::InvalidArgument`].
    pub fn invalid(
        argument: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`LmsrError::PrecisionConfiguration`].
    pub fn precision(precision: u32, detail: impl Into<String>) -> Self {
        Self::PrecisionConfiguration {
            precision,
            detail: detail.into(),
        }
    }

    /// Name of the offending argument, if this is an argument error.
    pub fn argument(&self) -> Option<&str> {
        match self {
            Self::InvalidArgument { argument, .. } => Some(argument),
            Self::PrecisionConfiguration { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_message_names_argument_and_value() {
        let err = LmsrError::invalid("outcome_token_index", 5, "must be below 2");
        assert_eq!(
            err.to_string(),
            "invalid argument `outcome_token_index` = 5: must be below 2"
        );
        assert_eq!(err.argument(), Some("outcome_token_index"));
    }

    #[test]
    fn test_precision_error_has_no_argument() {
        let err = LmsrError::precision(16, "too small");
        assert!(err.argument().is_none());
        assert!(err.to_string().contains("16 significant digits"));
    }
}
