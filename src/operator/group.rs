use std::fmt;

use itertools::Itertools;
use strum_macros::Display;

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum GroupMode {
    /// Everything ends up in a single group.
    None,
    /// Group by the listed columns.
    By,
    /// Group by every column except the listed ones.
    Except,
}

/// Regroups tables by a column set.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Group {
    mode: GroupMode,
    keys: Vec<String>,
}

impl Group {
    pub fn new(mode: GroupMode, keys: Vec<String>) -> Self {
        Self { mode, keys }
    }

    pub fn by<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(GroupMode::By, keys.into_iter().map(Into::into).collect())
    }

    pub fn except<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(GroupMode::Except, keys.into_iter().map(Into::into).collect())
    }

    pub fn mode(&self) -> GroupMode {
        self.mode
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode: {}, columns: [{}]", self.mode, self.keys.iter().join(", "))
    }
}
