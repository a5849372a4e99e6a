use std::fmt;

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Distinct {
    column: String,
}

impl Distinct {
    pub fn new<S: Into<String>>(column: S) -> Self {
        Self {
            column: column.into(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }
}

impl fmt::Display for Distinct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column: {:?}", self.column)
    }
}
