use enumset::EnumSet;

use crate::operator::{Operator, OperatorKind};

#[derive(Clone, Debug)]
pub enum PatternChildren {
    /// Matches a node whatever its inputs. The inputs are exposed to the rule as handles.
    Any,
    /// Each input must match the pattern at the same position.
    Inputs(Vec<Pattern>),
}

/// Shape of the subgraph a rule rewrites, root first.
#[derive(Clone, Debug)]
pub struct Pattern {
    kinds: EnumSet<OperatorKind>,
    children: PatternChildren,
}

impl Pattern {
    pub fn new(kinds: impl Into<EnumSet<OperatorKind>>, children: Vec<Pattern>) -> Self {
        Self {
            kinds: kinds.into(),
            children: PatternChildren::Inputs(children),
        }
    }

    pub fn leaf(kinds: impl Into<EnumSet<OperatorKind>>) -> Self {
        Self {
            kinds: kinds.into(),
            children: PatternChildren::Any,
        }
    }

    /// A chain of single input patterns, root first, the last one matching any inputs.
    pub fn chain<I, K>(kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        I::IntoIter: DoubleEndedIterator,
        K: Into<EnumSet<OperatorKind>>,
    {
        let mut kinds = kinds.into_iter().rev();
        let leaf = match kinds.next() {
            Some(kinds) => Pattern::leaf(kinds),
            None => Pattern::leaf(EnumSet::all()),
        };
        kinds.fold(leaf, |child, kinds| Pattern::new(kinds, vec![child]))
    }

    pub fn kinds(&self) -> EnumSet<OperatorKind> {
        self.kinds
    }

    pub fn children(&self) -> &PatternChildren {
        &self.children
    }

    pub fn matches(&self, operator: &Operator) -> bool {
        self.kinds.contains(operator.kind())
    }
}
