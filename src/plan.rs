use std::collections::HashSet;
use std::fmt;
use std::mem::swap;
use std::rc::Rc;

use anyhow::anyhow;
use itertools::Itertools;
use prettytable::Table;

use crate::error::OptResult;
use crate::operator::LogicalOperator::{
    LogicalAggregate, LogicalDistinct, LogicalFilter, LogicalFrom, LogicalGroup, LogicalKeys,
    LogicalRange, LogicalSchemaMutation, LogicalWindow,
};
use crate::operator::Operator::Logical;
use crate::operator::{
    Aggregate, Distinct, Filter, FromBucket, Group, Keys, Operator, PhysicalOperator,
    PhysicalOperatorTrait, Range, SchemaMutation, Window,
};

pub type PlanNodeId = u32;

pub type PlanNodeRef = Rc<PlanNode>;

/// One node in a plan.
///
/// This is used in both input and output of an optimizer: the input is mostly logical, the
/// output has its storage facing part replaced with physical reads.
#[derive(Debug)]
pub struct PlanNode {
    id: PlanNodeId,
    operator: Operator,
    inputs: Vec<PlanNodeRef>,
}

/// The `eq` should ignore `id`.
impl PartialEq for PlanNode {
    fn eq(&self, other: &Self) -> bool {
        self.operator == other.operator && self.inputs == other.inputs
    }
}

/// A query plan.
///
/// A query plan is a dag(directed acyclic graph) with one or more roots, each root producing one
/// result of the query. Nodes may be shared, e.g. one read feeding two aggregates.
#[derive(Clone, Debug)]
pub struct Plan {
    roots: Vec<PlanNodeRef>,
}

/// Roots are compared as a multiset, their order carries no meaning.
impl PartialEq for Plan {
    fn eq(&self, other: &Self) -> bool {
        if self.roots.len() != other.roots.len() {
            return false;
        }
        let mut unmatched: Vec<&PlanNodeRef> = other.roots.iter().collect();
        self.roots.iter().all(|root| {
            match unmatched.iter().position(|candidate| *candidate == root) {
                Some(idx) => {
                    unmatched.swap_remove(idx);
                    true
                }
                None => false,
            }
        })
    }
}

/// Breath first iterator of a dag plan.
struct BFSPlanNodeIter {
    visited: HashSet<PlanNodeId>,
    cur_level: Vec<PlanNodeRef>,
    next_level: Vec<PlanNodeRef>,
}

impl Iterator for BFSPlanNodeIter {
    type Item = PlanNodeRef;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur_level.is_empty() {
            swap(&mut self.cur_level, &mut self.next_level);
        }

        if let Some(p) = self.cur_level.pop() {
            for input in &p.inputs {
                if self.visited.insert(input.id) {
                    self.next_level.push(input.clone());
                }
            }

            Some(p)
        } else {
            None
        }
    }
}

impl Plan {
    pub fn new(roots: Vec<PlanNodeRef>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[PlanNodeRef] {
        &self.roots
    }

    /// The only root of a single result plan.
    pub fn root(&self) -> Option<PlanNodeRef> {
        match self.roots.as_slice() {
            [root] => Some(root.clone()),
            _ => None,
        }
    }

    pub fn bfs_iterator(&self) -> impl Iterator<Item = PlanNodeRef> {
        let visited = self.roots.iter().map(|root| root.id).collect();

        BFSPlanNodeIter {
            cur_level: self.roots.clone(),
            next_level: vec![],
            visited,
        }
    }

    /// Renders the plan as a table, one row per node.
    pub fn explain(&self) -> String {
        let mut table = Table::new();
        table.set_titles(row!["id", "operator", "details", "inputs", "cost"]);
        for node in self.bfs_iterator() {
            let cost = match node.operator() {
                Operator::Physical(op) => op.cost().to_string(),
                Operator::Logical(_) => String::new(),
            };
            table.add_row(row![
                node.id(),
                node.operator().kind(),
                node.operator(),
                node.inputs().iter().map(|input| input.id()).join(", "),
                cost
            ]);
        }
        table.to_string()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.explain())
    }
}

impl PlanNode {
    pub fn new(id: PlanNodeId, operator: Operator, inputs: Vec<PlanNodeRef>) -> Self {
        Self {
            id,
            operator,
            inputs,
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    pub fn inputs(&self) -> &[PlanNodeRef] {
        &self.inputs
    }
}

pub struct PlanNodeBuilder {
    plan_node: PlanNode,
}

impl PlanNodeBuilder {
    pub fn new(id: PlanNodeId, operator: &Operator) -> Self {
        Self {
            plan_node: PlanNode::new(id, operator.clone(), vec![]),
        }
    }

    pub fn add_inputs<I>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = PlanNodeRef>,
    {
        self.plan_node.inputs.extend(inputs);
        self
    }

    pub fn build(self) -> PlanNode {
        self.plan_node
    }
}

/// Builds a single chain plan, source first.
///
/// ```
/// use storage_pushdown::operator::{Aggregate, AggregateMethod, Range};
/// use storage_pushdown::plan::LogicalPlanBuilder;
/// use storage_pushdown::time::Bounds;
///
/// let plan = LogicalPlanBuilder::new()
///     .from_bucket("telegraf")
///     .range(Range::absolute(Bounds::from_nanos(5, 10).unwrap()))
///     .aggregate(Aggregate::on_value(AggregateMethod::Count))
///     .build();
/// assert_eq!(3, plan.bfs_iterator().count());
/// ```
#[derive(Default)]
pub struct LogicalPlanBuilder {
    root: Option<PlanNodeRef>,
    next_plan_node_id: PlanNodeId,
}

impl LogicalPlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `operator` on top of the current chain.
    pub fn push(&mut self, operator: Operator) -> &mut Self {
        let inputs = self.root.take().into_iter().collect();
        let plan_node = Rc::new(PlanNode::new(self.next_plan_node_id, operator, inputs));
        self.root = Some(plan_node);
        self.next_plan_node_id += 1;
        self
    }

    pub fn from_bucket<S: Into<String>>(&mut self, bucket: S) -> &mut Self {
        self.push(Logical(LogicalFrom(FromBucket::with_name(bucket))))
    }

    pub fn from_bucket_id<S: Into<String>>(&mut self, bucket_id: S) -> &mut Self {
        self.push(Logical(LogicalFrom(FromBucket::with_id(bucket_id))))
    }

    /// Starts the chain from an already physical read.
    pub fn read(&mut self, read: impl Into<PhysicalOperator>) -> &mut Self {
        self.push(Operator::physical(read))
    }

    pub fn range(&mut self, range: Range) -> &mut Self {
        self.push(Logical(LogicalRange(range)))
    }

    pub fn filter(&mut self, filter: Filter) -> &mut Self {
        self.push(Logical(LogicalFilter(filter)))
    }

    pub fn group(&mut self, group: Group) -> &mut Self {
        self.push(Logical(LogicalGroup(group)))
    }

    pub fn window(&mut self, window: Window) -> &mut Self {
        self.push(Logical(LogicalWindow(window)))
    }

    pub fn aggregate(&mut self, aggregate: Aggregate) -> &mut Self {
        self.push(Logical(LogicalAggregate(aggregate)))
    }

    pub fn mutate(&mut self, mutation: SchemaMutation) -> &mut Self {
        self.push(Logical(LogicalSchemaMutation(mutation)))
    }

    pub fn keys(&mut self, keys: Keys) -> &mut Self {
        self.push(Logical(LogicalKeys(keys)))
    }

    pub fn distinct(&mut self, distinct: Distinct) -> &mut Self {
        self.push(Logical(LogicalDistinct(distinct)))
    }

    /// Consume current plan, but not rest state, e.g. plan node id.
    pub fn build(&mut self) -> Plan {
        Plan::new(self.root.take().into_iter().collect())
    }
}

/// A plan written as a node list plus `(predecessor, successor)` index pairs.
///
/// Nodes without successors become the roots. Useful for plans that are not a single chain.
#[derive(Clone, Debug, Default)]
pub struct PlanSpec {
    nodes: Vec<Operator>,
    edges: Vec<(usize, usize)>,
}

impl PlanSpec {
    pub fn new(nodes: Vec<Operator>, edges: Vec<(usize, usize)>) -> Self {
        Self { nodes, edges }
    }

    pub fn build(&self) -> OptResult<Plan> {
        let mut inputs = vec![Vec::new(); self.nodes.len()];
        let mut has_successor = vec![false; self.nodes.len()];
        for &(pred, succ) in &self.edges {
            if pred >= self.nodes.len() || succ >= self.nodes.len() {
                return Err(anyhow!("edge ({}, {}) references a missing node", pred, succ).into());
            }
            inputs[succ].push(pred);
            has_successor[pred] = true;
        }

        let mut built = vec![None; self.nodes.len()];
        let mut roots = vec![];
        for idx in 0..self.nodes.len() {
            let node = self.build_node(idx, &inputs, &mut built, &mut HashSet::new())?;
            if !has_successor[idx] {
                roots.push(node);
            }
        }

        Ok(Plan::new(roots))
    }

    fn build_node(
        &self,
        idx: usize,
        inputs: &[Vec<usize>],
        built: &mut Vec<Option<PlanNodeRef>>,
        visiting: &mut HashSet<usize>,
    ) -> OptResult<PlanNodeRef> {
        if let Some(node) = &built[idx] {
            return Ok(node.clone());
        }
        if !visiting.insert(idx) {
            return Err(anyhow!("plan has a cycle through node {}", idx).into());
        }

        let node_inputs = inputs[idx]
            .iter()
            .map(|&input| self.build_node(input, inputs, built, visiting))
            .collect::<OptResult<Vec<_>>>()?;
        let node = Rc::new(PlanNode::new(
            idx as PlanNodeId,
            self.nodes[idx].clone(),
            node_inputs,
        ));
        built[idx] = Some(node.clone());
        Ok(node)
    }
}
