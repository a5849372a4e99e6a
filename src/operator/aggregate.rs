use std::fmt;

use itertools::Itertools;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::operator::{OperatorKind, VALUE_COLUMN};

/// An aggregate or selector the storage engine can compute itself.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum AggregateMethod {
    Count,
    Sum,
    Mean,
    Min,
    Max,
    First,
    Last,
}

impl AggregateMethod {
    /// Selectors pick one row of the input and keep every column of it.
    pub fn is_selector(&self) -> bool {
        matches!(
            self,
            AggregateMethod::Min
                | AggregateMethod::Max
                | AggregateMethod::First
                | AggregateMethod::Last
        )
    }

    pub fn kind(&self) -> OperatorKind {
        match self {
            AggregateMethod::Count => OperatorKind::Count,
            AggregateMethod::Sum => OperatorKind::Sum,
            AggregateMethod::Mean => OperatorKind::Mean,
            AggregateMethod::Min => OperatorKind::Min,
            AggregateMethod::Max => OperatorKind::Max,
            AggregateMethod::First => OperatorKind::First,
            AggregateMethod::Last => OperatorKind::Last,
        }
    }
}

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum AggregateConfig {
    /// Selectors read a single column.
    Selector { column: String },
    /// Aggregates may reduce several columns at once.
    Aggregate { columns: Vec<String> },
}

/// An aggregate or selector applied to every table.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Aggregate {
    method: AggregateMethod,
    config: AggregateConfig,
}

impl Aggregate {
    pub fn new(method: AggregateMethod, config: AggregateConfig) -> Self {
        Self { method, config }
    }

    /// The method over `_value`, configured the way the query language defaults it.
    pub fn on_value(method: AggregateMethod) -> Self {
        Self::on_column(method, VALUE_COLUMN)
    }

    pub fn on_column<S: Into<String>>(method: AggregateMethod, column: S) -> Self {
        let column = column.into();
        let config = if method.is_selector() {
            AggregateConfig::Selector { column }
        } else {
            AggregateConfig::Aggregate {
                columns: vec![column],
            }
        };
        Self::new(method, config)
    }

    pub fn method(&self) -> AggregateMethod {
        self.method
    }

    pub fn config(&self) -> &AggregateConfig {
        &self.config
    }

    /// Same configuration, another method.
    pub fn with_method(&self, method: AggregateMethod) -> Self {
        Self::new(method, self.config.clone())
    }

    /// Whether the aggregate reads `_value` and nothing else.
    pub fn reads_value_only(&self) -> bool {
        match &self.config {
            AggregateConfig::Selector { column } => column == VALUE_COLUMN,
            AggregateConfig::Aggregate { columns } => {
                matches!(columns.as_slice(), [column] if column == VALUE_COLUMN)
            }
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.config {
            AggregateConfig::Selector { column } => write!(f, "column: {:?}", column),
            AggregateConfig::Aggregate { columns } => write!(
                f,
                "columns: [{}]",
                columns.iter().map(|c| format!("{:?}", c)).join(", ")
            ),
        }
    }
}
