use std::fmt;

/// Lists the group key columns of each table.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Keys {
    column: String,
}

impl Keys {
    pub fn new<S: Into<String>>(column: S) -> Self {
        Self {
            column: column.into(),
        }
    }

    /// Column the key names are written to.
    pub fn column(&self) -> &str {
        &self.column
    }
}

impl fmt::Display for Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column: {:?}", self.column)
    }
}
