use std::collections::HashMap;
use std::rc::Rc;

use anyhow::anyhow;
use petgraph::algo::toposort;
use petgraph::prelude::{NodeIndex, StableGraph};
use petgraph::{Directed, Direction};
use smallvec::SmallVec;

use crate::error::OptResult;
use crate::heuristic::MatchOrder;
use crate::operator::Operator;
use crate::plan::{Plan, PlanNode, PlanNodeBuilder, PlanNodeId, PlanNodeRef};
use crate::rules::OptExprNode::{ExprHandleNode, OperatorNode};
use crate::rules::OptExpression;

type HepGraph = StableGraph<HepOptimizerNode, (), Directed, PlanNodeId>;
pub type HepNodeId = NodeIndex<PlanNodeId>;

#[derive(Debug)]
pub struct HepOptimizerNode {
    id: HepNodeId,
    operator: Operator,
}

impl HepOptimizerNode {
    pub fn id(&self) -> HepNodeId {
        self.id
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }
}

/// Plan dag stored in an arena. Edges point from a node to its inputs.
pub(super) struct PlanGraph {
    graph: HepGraph,
}

impl PlanGraph {
    pub(super) fn node(&self, node_id: HepNodeId) -> &HepOptimizerNode {
        &self.graph[node_id]
    }

    /// Inputs of a node, in plan order.
    pub(super) fn inputs(&self, node_id: HepNodeId) -> SmallVec<[HepNodeId; 2]> {
        // petgraph walks edges newest first
        let mut inputs: SmallVec<[HepNodeId; 2]> = self
            .graph
            .neighbors_directed(node_id, Direction::Outgoing)
            .collect();
        inputs.reverse();
        inputs
    }

    /// Number of nodes consuming the output of `node_id`.
    pub(super) fn parent_count(&self, node_id: HepNodeId) -> usize {
        self.graph
            .neighbors_directed(node_id, Direction::Incoming)
            .count()
    }

    /// Nodes nobody consumes, i.e. the results of the query.
    fn roots(&self) -> impl Iterator<Item = HepNodeId> + '_ {
        self.graph
            .node_indices()
            .filter(move |node_id| self.parent_count(*node_id) == 0)
    }

    /// Node ids ordered so that a node always comes before (top down) or after (bottom up) all of
    /// its inputs.
    pub(super) fn nodes_iter(&self, match_order: MatchOrder) -> OptResult<Vec<HepNodeId>> {
        let mut ids = toposort(&self.graph, None)
            .map_err(|cycle| anyhow!("plan graph has a cycle through {:?}", cycle.node_id()))?;
        if let MatchOrder::BottomUp = match_order {
            ids.reverse();
        }
        Ok(ids)
    }

    /// Replace relational expression with optimizer rule result.
    ///
    /// Consumers of `origin_node_id` are redirected to the new subgraph, then every node in
    /// `matched` is dropped.
    ///
    /// # Return
    ///
    /// The return value indicates whether graph changed.
    pub(super) fn replace_opt_expression(
        &mut self,
        opt_node: OptExpression,
        origin_node_id: HepNodeId,
        matched: &[HepNodeId],
    ) -> bool {
        let new_hep_node_id = self.insert_opt_node(&opt_node);
        if new_hep_node_id != origin_node_id {
            // Redirect parents's input to new node
            let parent_node_ids: SmallVec<[HepNodeId; 2]> = self
                .graph
                .neighbors_directed(origin_node_id, Direction::Incoming)
                .collect();
            for parent in parent_node_ids {
                self.graph.add_edge(parent, new_hep_node_id, ());
            }
            for node_id in matched {
                self.graph.remove_node(*node_id);
            }

            true
        } else {
            false
        }
    }

    fn insert_opt_node(&mut self, opt_expr: &OptExpression) -> HepNodeId {
        match opt_expr.node() {
            ExprHandleNode(expr_handle) => *expr_handle,
            OperatorNode(operator) => {
                let input_hep_node_ids: SmallVec<[HepNodeId; 2]> = opt_expr
                    .inputs()
                    .iter()
                    .map(|input_expr| self.insert_opt_node(input_expr))
                    .collect();

                let new_node_id = self.graph.add_node(HepOptimizerNode {
                    id: HepNodeId::default(),
                    operator: operator.clone(),
                });
                // reset node id
                self.graph[new_node_id].id = new_node_id;
                for input_hep_node_id in input_hep_node_ids {
                    self.graph.add_edge(new_node_id, input_hep_node_id, ());
                }

                new_node_id
            }
        }
    }

    pub(super) fn to_plan(&self) -> OptResult<Plan> {
        let mut hep_node_id_to_plan_node = HashMap::<HepNodeId, PlanNodeRef>::new();
        // Traverse nodes in bottom up order, when visiting a node, its inputs all inserted
        // into map
        for node_id in self.nodes_iter(MatchOrder::BottomUp)? {
            let inputs = self
                .inputs(node_id)
                .into_iter()
                .map(|input| self.plan_node_at(&hep_node_id_to_plan_node, input))
                .collect::<OptResult<Vec<_>>>()?;

            let operator = self.node(node_id).operator();
            let plan_node = PlanNodeBuilder::new(node_id.index() as PlanNodeId, operator)
                .add_inputs(inputs)
                .build();
            hep_node_id_to_plan_node.insert(node_id, Rc::new(plan_node));
        }

        let roots = self
            .roots()
            .map(|root| self.plan_node_at(&hep_node_id_to_plan_node, root))
            .collect::<OptResult<Vec<_>>>()?;
        Ok(Plan::new(roots))
    }

    fn plan_node_at(
        &self,
        plan_nodes: &HashMap<HepNodeId, PlanNodeRef>,
        node_id: HepNodeId,
    ) -> OptResult<PlanNodeRef> {
        plan_nodes
            .get(&node_id)
            .cloned()
            .ok_or_else(|| anyhow!("node {:?} visited before its consumers", node_id).into())
    }
}

/// Converts from raw plan to plan graph.
impl From<Plan> for PlanGraph {
    fn from(plan: Plan) -> Self {
        let mut graph = HepGraph::default();
        let mut inputs = HashMap::<PlanNodeId, Vec<PlanNodeId>>::new();
        let mut node_id_map = HashMap::<PlanNodeId, HepNodeId>::new();

        for plan_node_ref in plan.bfs_iterator() {
            inputs.insert(
                plan_node_ref.id(),
                plan_node_ref.inputs().iter().map(|input| input.id()).collect(),
            );
            let hep_node_id = graph.add_node((&*plan_node_ref).into());
            graph[hep_node_id].id = hep_node_id;
            node_id_map.insert(plan_node_ref.id(), hep_node_id);
        }

        for (node_id, input_ids) in inputs {
            for input_id in input_ids {
                if let (Some(node), Some(input)) =
                    (node_id_map.get(&node_id), node_id_map.get(&input_id))
                {
                    graph.add_edge(*node, *input, ());
                }
            }
        }

        Self { graph }
    }
}

impl<'a> From<&'a PlanNode> for HepOptimizerNode {
    fn from(t: &'a PlanNode) -> Self {
        Self {
            id: HepNodeId::default(),
            operator: t.operator().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{Aggregate, AggregateMethod, ReadRange};
    use crate::plan::PlanSpec;
    use crate::time::Bounds;

    fn shared_read_plan() -> Plan {
        PlanSpec::new(
            vec![
                Operator::physical(ReadRange::new("b", Bounds::from_nanos(5, 10).unwrap())),
                Operator::logical(Aggregate::on_value(AggregateMethod::Count)),
                Operator::logical(Aggregate::on_value(AggregateMethod::Mean)),
            ],
            vec![(0, 1), (0, 2)],
        )
        .build()
        .unwrap()
    }

    #[test]
    fn test_plan_round_trip() {
        let graph = PlanGraph::from(shared_read_plan());
        assert_eq!(shared_read_plan(), graph.to_plan().unwrap());
    }

    #[test]
    fn test_nodes_iter_respects_inputs() {
        let graph = PlanGraph::from(shared_read_plan());
        let top_down = graph.nodes_iter(MatchOrder::TopDown).unwrap();
        let bottom_up = graph.nodes_iter(MatchOrder::BottomUp).unwrap();

        assert_eq!(3, top_down.len());
        let read = *top_down.last().unwrap();
        assert_eq!(2, graph.parent_count(read));
        assert_eq!(read, bottom_up[0]);
    }

    #[test]
    fn test_replace_redirects_parents() {
        let mut graph = PlanGraph::from(shared_read_plan());
        let read = graph.nodes_iter(MatchOrder::BottomUp).unwrap()[0];

        let replacement = OptExpression::with_operator(
            Operator::physical(ReadRange::new("c", Bounds::from_nanos(5, 10).unwrap())),
            vec![],
        );
        assert!(graph.replace_opt_expression(replacement, read, &[read]));

        let plan = graph.to_plan().unwrap();
        assert_eq!(2, plan.roots().len());
        for root in plan.roots() {
            let input = &root.inputs()[0];
            assert_eq!(
                "c",
                input.operator().as_physical().unwrap().read_range().bucket()
            );
        }
    }
}
