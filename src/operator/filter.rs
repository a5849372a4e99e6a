use std::fmt;

use crate::semantic::{Expression, FunctionExpression};

/// Keeps the rows for which a predicate function holds.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    function: FunctionExpression,
    /// Tables whose rows are all filtered out are kept, empty, in the output.
    keep_empty_tables: bool,
}

impl Filter {
    pub fn new(function: FunctionExpression) -> Self {
        Self {
            function,
            keep_empty_tables: false,
        }
    }

    pub fn with_keep_empty_tables(mut self, keep_empty_tables: bool) -> Self {
        self.keep_empty_tables = keep_empty_tables;
        self
    }

    pub fn function(&self) -> &FunctionExpression {
        &self.function
    }

    pub fn keep_empty_tables(&self) -> bool {
        self.keep_empty_tables
    }

    /// A filter with the same parameter and settings but a different body.
    pub fn with_body(&self, body: Expression) -> Self {
        Self {
            function: self.function.with_body(body),
            keep_empty_tables: self.keep_empty_tables,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn: {}", self.function)?;
        if self.keep_empty_tables {
            write!(f, ", onEmpty: keep")?;
        }
        Ok(())
    }
}
