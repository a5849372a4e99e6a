use anyhow::anyhow;
use log::{debug, trace, warn};

use crate::error::OptResult;
use crate::heuristic::binding::Binding;
use crate::heuristic::graph::PlanGraph;
use crate::heuristic::HepNodeId;
use crate::optimizer::{Optimizer, OptimizerContext};
use crate::plan::Plan;
use crate::rules::{default_rules, Rule, RuleImpl, RuleResult};

/// Iteration ceiling used by [`HepOptimizer::with_default_rules`].
pub const DEFAULT_MAX_ITER_TIMES: usize = 1000;

/// Match order of plan tree.
#[derive(Copy, Clone, Debug)]
pub enum MatchOrder {
    BottomUp,
    TopDown,
}

pub struct HepOptimizer {
    match_order: MatchOrder,
    /// Max number of iteration
    max_iter_times: usize,
    rules: Vec<RuleImpl>,
    graph: PlanGraph,
    context: OptimizerContext,
}

impl Optimizer for HepOptimizer {
    fn context(&self) -> &OptimizerContext {
        &self.context
    }

    fn find_best_plan(mut self) -> OptResult<Plan> {
        let mut fixed_point = false;
        for times in 0..self.max_iter_times {
            // The plan no longer changes after iteration
            fixed_point = true;
            for node_id in self.graph.nodes_iter(self.match_order)? {
                for rule in &*self.rules.clone() {
                    if self.apply_rule(rule, node_id)? {
                        debug!("Applied rule {} in iteration {}", rule.name(), times);
                        trace!(
                            "Plan after applying rule {}:\n{}",
                            rule.name(),
                            self.graph.to_plan()?
                        );
                        fixed_point = false;
                        break;
                    }
                }

                if !fixed_point {
                    break;
                }
            }

            if fixed_point {
                break;
            }
        }

        if !fixed_point {
            warn!(
                "Plan still changing after {} iterations, giving up",
                self.max_iter_times
            );
        }

        self.graph.to_plan()
    }
}

impl HepOptimizer {
    pub fn new(
        match_order: MatchOrder,
        max_iter_times: usize,
        rules: Vec<RuleImpl>,
        plan: Plan,
        context: OptimizerContext,
    ) -> Self {
        Self {
            match_order,
            max_iter_times,
            rules,
            graph: PlanGraph::from(plan),
            context,
        }
    }

    /// The storage pushdown optimizer for `context`.
    pub fn with_default_rules(plan: Plan, context: OptimizerContext) -> Self {
        let rules = default_rules(&context);
        Self::new(
            MatchOrder::TopDown,
            DEFAULT_MAX_ITER_TIMES,
            rules,
            plan,
            context,
        )
    }

    fn apply_rule(&mut self, rule: &RuleImpl, node_id: HepNodeId) -> OptResult<bool> {
        let bound = match Binding::new(&self.graph).bind(node_id, rule.pattern()) {
            Some(bound) => bound,
            None => return Ok(false),
        };

        trace!(
            "Trying to apply rule {} to {}",
            rule.name(),
            self.graph.node(node_id).operator().kind()
        );
        let mut results = RuleResult::new();
        rule.apply(bound.expr, &self.context, &mut results)?;

        let mut results = results.results();
        match results.next() {
            Some(new_expr) => {
                if results.next().is_some() {
                    return Err(anyhow!(
                        "Rewrite rule {} should not return more than 1 result.",
                        rule.name()
                    )
                    .into());
                }
                Ok(self
                    .graph
                    .replace_opt_expression(new_expr, node_id, &bound.matched))
            }
            // No transformation generated.
            None => Ok(false),
        }
    }
}
