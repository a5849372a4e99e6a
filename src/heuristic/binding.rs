use smallvec::SmallVec;

use crate::heuristic::graph::PlanGraph;
use crate::heuristic::HepNodeId;
use crate::rules::{OptExpression, Pattern, PatternChildren};

/// A pattern bound to the plan graph.
pub(super) struct BoundExpression {
    pub(super) expr: OptExpression,
    /// Graph nodes covered by the pattern, root first.
    pub(super) matched: SmallVec<[HepNodeId; 4]>,
}

/// Binds a rule pattern to the subgraph rooted at one node.
///
/// Every matched node below the root must feed nothing but its matched parent, otherwise
/// replacing the subgraph would take its output away from other consumers.
pub(super) struct Binding<'a> {
    graph: &'a PlanGraph,
    matched: SmallVec<[HepNodeId; 4]>,
}

impl<'a> Binding<'a> {
    pub(super) fn new(graph: &'a PlanGraph) -> Self {
        Self {
            graph,
            matched: SmallVec::new(),
        }
    }

    pub(super) fn bind(mut self, node_id: HepNodeId, pattern: &Pattern) -> Option<BoundExpression> {
        let expr = self.bind_node(node_id, pattern)?;
        Some(BoundExpression {
            expr,
            matched: self.matched,
        })
    }

    fn bind_node(&mut self, node_id: HepNodeId, pattern: &Pattern) -> Option<OptExpression> {
        let graph = self.graph;
        let node = graph.node(node_id);
        if !pattern.matches(node.operator()) {
            return None;
        }
        self.matched.push(node_id);

        let inputs = graph.inputs(node_id);
        let input_exprs = match pattern.children() {
            PatternChildren::Any => inputs
                .into_iter()
                .map(OptExpression::with_expr_handle)
                .collect(),
            PatternChildren::Inputs(children) => {
                if inputs.len() != children.len() {
                    return None;
                }
                inputs
                    .into_iter()
                    .zip(children)
                    .map(|(input, child)| {
                        if graph.parent_count(input) != 1 {
                            return None;
                        }
                        self.bind_node(input, child)
                    })
                    .collect::<Option<Vec<_>>>()?
            }
        };

        Some(OptExpression::with_operator(
            node.operator().clone(),
            input_exprs,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{Aggregate, AggregateMethod, Operator, OperatorKind, ReadRange, Window};
    use crate::plan::PlanSpec;
    use crate::rules::OptExprNode;
    use crate::time::{Bounds, Duration};

    fn read() -> Operator {
        Operator::physical(ReadRange::new("b", Bounds::from_nanos(5, 10).unwrap()))
    }

    fn window() -> Operator {
        Operator::logical(Window::new(Duration::from_secs(60)))
    }

    fn min() -> Operator {
        Operator::logical(Aggregate::on_value(AggregateMethod::Min))
    }

    fn pattern() -> Pattern {
        Pattern::chain([
            OperatorKind::Min,
            OperatorKind::Window,
            OperatorKind::ReadRange,
        ])
    }

    fn root_of(graph: &PlanGraph) -> HepNodeId {
        graph.nodes_iter(crate::heuristic::MatchOrder::TopDown).unwrap()[0]
    }

    #[test]
    fn test_bind_chain() {
        let plan = PlanSpec::new(vec![read(), window(), min()], vec![(0, 1), (1, 2)])
            .build()
            .unwrap();
        let graph = PlanGraph::from(plan);
        let bound = Binding::new(&graph)
            .bind(root_of(&graph), &pattern())
            .unwrap();

        assert_eq!(3, bound.matched.len());
        assert_eq!(Some(&min()), bound.expr.operator());
        assert_eq!(Some(&read()), bound.expr.inputs()[0].inputs()[0].operator());
    }

    #[test]
    fn test_bind_exposes_unmatched_inputs_as_handles() {
        let plan = PlanSpec::new(vec![read(), min()], vec![(0, 1)]).build().unwrap();
        let graph = PlanGraph::from(plan);
        let bound = Binding::new(&graph)
            .bind(root_of(&graph), &Pattern::leaf(OperatorKind::Min))
            .unwrap();

        assert_eq!(1, bound.matched.len());
        assert!(matches!(
            bound.expr.inputs()[0].node(),
            OptExprNode::ExprHandleNode(_)
        ));
    }

    #[test]
    fn test_bind_rejects_shared_inputs() {
        let plan = PlanSpec::new(
            vec![read(), window(), min(), min()],
            vec![(0, 1), (1, 2), (1, 3)],
        )
        .build()
        .unwrap();
        let graph = PlanGraph::from(plan);
        for node_id in graph.nodes_iter(crate::heuristic::MatchOrder::TopDown).unwrap() {
            assert!(Binding::new(&graph).bind(node_id, &pattern()).is_none());
        }
    }
}
