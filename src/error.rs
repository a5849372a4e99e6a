use std::fmt;

use thiserror::Error;

pub type OptResult<T> = Result<T, OptError>;

/// Which operand of a binary expression a translation error came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left hand side"),
            Side::Right => write!(f, "right hand side"),
        }
    }
}

#[derive(Debug, Error)]
pub enum OptError {
    #[error("unknown operator {0}")]
    UnsupportedOperator(String),
    #[error("{0} literals are not supported in storage predicates")]
    UnsupportedLiteralKind(&'static str),
    #[error("unsupported semantic expression type {0}")]
    UnsupportedExpression(&'static str),
    #[error("unknown object {0}")]
    UnknownObject(String),
    #[error("invalid regex literal {pattern:?}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("{side}")]
    Operand {
        side: Side,
        #[source]
        source: Box<OptError>,
    },
    #[error("could not find bucket {0:?}")]
    BucketNotFound(String),
    #[error("invalid bucket id {0:?}")]
    InvalidBucketId(String),
    #[error("invalid organization id {0:?}")]
    InvalidOrgId(String),
    #[error("no bucket name or id have been specified")]
    MissingBucket,
    #[error("bucket {0:?} is referenced by name but no organization is set")]
    MissingOrganization(String),
    #[error("invalid time bounds: {0}")]
    InvalidBounds(String),
    #[error("invalid duration literal {0:?}")]
    InvalidDuration(String),
    #[error("unknown feature {0:?}")]
    UnknownFeature(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl OptError {
    pub(crate) fn on_side(self, side: Side) -> Self {
        OptError::Operand {
            side,
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping operand context.
    pub fn root(&self) -> &OptError {
        match self {
            OptError::Operand { source, .. } => source.root(),
            other => other,
        }
    }
}
