//! Rewrite rules that push query work down into storage reads.
//!
//! A rule declares the [`Pattern`] of the subgraph it rewrites. The optimizer binds the pattern
//! to the plan and hands the bound [`OptExpression`] to [`Rule::apply`], which either leaves the
//! [`RuleResult`] empty (the subgraph does not qualify) or adds the replacement subgraph.
//! Inputs of the bound subgraph that the pattern does not cover are passed as
//! [`OptExprNode::ExprHandleNode`]s and must be carried over unchanged.

use enum_dispatch::enum_dispatch;
use strum_macros::IntoStaticStr;

use crate::error::OptResult;
use crate::heuristic::HepNodeId;
use crate::operator::{LogicalOperator, Operator, PhysicalOperator};
use crate::optimizer::{Feature, OptimizerContext};

mod pattern;
pub use pattern::*;
mod aggregate;
pub use aggregate::*;
mod filter;
pub use filter::*;
mod group;
pub use group::*;
mod merge_filters;
pub use merge_filters::*;
mod range;
pub use range::*;
mod tag;
pub use tag::*;
mod transpose;
pub use transpose::*;
mod window_aggregate;
pub use window_aggregate::*;

#[cfg(test)]
mod test_util;

#[derive(Clone, Debug)]
pub enum OptExprNode {
    OperatorNode(Operator),
    /// A node already in the plan, left untouched by the rewrite.
    ExprHandleNode(HepNodeId),
}

/// A subgraph handed to, or returned by, a rule.
#[derive(Clone, Debug)]
pub struct OptExpression {
    node: OptExprNode,
    inputs: Vec<OptExpression>,
}

impl OptExpression {
    pub fn with_operator(operator: Operator, inputs: Vec<OptExpression>) -> Self {
        Self {
            node: OptExprNode::OperatorNode(operator),
            inputs,
        }
    }

    pub fn with_expr_handle(handle: HepNodeId) -> Self {
        Self {
            node: OptExprNode::ExprHandleNode(handle),
            inputs: vec![],
        }
    }

    pub fn node(&self) -> &OptExprNode {
        &self.node
    }

    pub fn inputs(&self) -> &[OptExpression] {
        &self.inputs
    }

    pub fn input(&self, idx: usize) -> Option<&OptExpression> {
        self.inputs.get(idx)
    }

    pub fn operator(&self) -> Option<&Operator> {
        match &self.node {
            OptExprNode::OperatorNode(operator) => Some(operator),
            OptExprNode::ExprHandleNode(_) => None,
        }
    }

    pub fn logical(&self) -> Option<&LogicalOperator> {
        self.operator().and_then(Operator::as_logical)
    }

    pub fn physical(&self) -> Option<&PhysicalOperator> {
        self.operator().and_then(Operator::as_physical)
    }
}

#[derive(Default)]
pub struct RuleResult {
    results: Vec<OptExpression>,
}

impl RuleResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, expr: OptExpression) {
        self.results.push(expr);
    }

    pub fn results(self) -> impl Iterator<Item = OptExpression> {
        self.results.into_iter()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[enum_dispatch]
pub trait Rule {
    fn pattern(&self) -> &Pattern;

    /// Adds the replacement of `input` to `result`, or nothing when the rule does not apply.
    ///
    /// Errors abort the whole compilation, so they are reserved for plans that cannot be
    /// executed at all.
    fn apply(
        &self,
        input: OptExpression,
        context: &OptimizerContext,
        result: &mut RuleResult,
    ) -> OptResult<()>;
}

#[enum_dispatch(Rule)]
#[derive(Clone, Debug, IntoStaticStr)]
pub enum RuleImpl {
    PushDownRangeRule,
    PushDownFilterRule,
    PushDownGroupRule,
    PushDownWindowAggregateRule,
    PushDownWindowAggregateByTimeRule,
    GroupWindowAggregateTransposeRule,
    PushDownBareAggregateRule,
    PushDownGroupAggregateRule,
    PushDownReadTagKeysRule,
    PushDownReadTagValuesRule,
    MergeFiltersRule,
}

impl RuleImpl {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// The storage pushdown rules, in the order they are tried.
pub fn default_rules(context: &OptimizerContext) -> Vec<RuleImpl> {
    let mut rules: Vec<RuleImpl> = vec![
        PushDownRangeRule.into(),
        PushDownFilterRule.into(),
        PushDownGroupRule.into(),
        PushDownWindowAggregateRule.into(),
        PushDownWindowAggregateByTimeRule.into(),
        GroupWindowAggregateTransposeRule.into(),
        PushDownBareAggregateRule.into(),
        PushDownGroupAggregateRule.into(),
        PushDownReadTagKeysRule.into(),
        PushDownReadTagValuesRule.into(),
    ];
    if context.has_feature(Feature::MergeFilters) {
        rules.push(MergeFiltersRule.into());
    }
    rules
}
