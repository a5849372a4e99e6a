use std::fmt;

use itertools::Itertools;

/// One schema change: which columns survive, and under what name.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum Mutation {
    Keep { columns: Vec<String> },
    Drop { columns: Vec<String> },
    Duplicate { column: String, as_: String },
    Rename { columns: Vec<(String, String)> },
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Keep { columns } => write!(f, "keep([{}])", columns.iter().join(", ")),
            Mutation::Drop { columns } => write!(f, "drop([{}])", columns.iter().join(", ")),
            Mutation::Duplicate { column, as_ } => write!(f, "duplicate({} as {})", column, as_),
            Mutation::Rename { columns } => write!(
                f,
                "rename({})",
                columns
                    .iter()
                    .map(|(from, to)| format!("{}: {}", from, to))
                    .join(", ")
            ),
        }
    }
}

/// A chain of schema mutations merged into one operator.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct SchemaMutation {
    mutations: Vec<Mutation>,
}

impl SchemaMutation {
    pub fn new(mutations: Vec<Mutation>) -> Self {
        Self { mutations }
    }

    pub fn keep<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(vec![Mutation::Keep {
            columns: columns.into_iter().map(Into::into).collect(),
        }])
    }

    pub fn duplicate<S: Into<String>>(column: S, as_: S) -> Self {
        Self::new(vec![Mutation::Duplicate {
            column: column.into(),
            as_: as_.into(),
        }])
    }

    pub fn rename<S: Into<String>>(from: S, to: S) -> Self {
        Self::new(vec![Mutation::Rename {
            columns: vec![(from.into(), to.into())],
        }])
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// The mutation, if this operator carries exactly one.
    pub fn single(&self) -> Option<&Mutation> {
        match self.mutations.as_slice() {
            [mutation] => Some(mutation),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mutations.iter().join(" |> "))
    }
}
