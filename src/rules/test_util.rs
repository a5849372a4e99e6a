//! Shared fixtures for rule tests.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use crate::error::OptResult;
use crate::heuristic::{HepOptimizer, MatchOrder, DEFAULT_MAX_ITER_TIMES};
use crate::operator::ReadRange;
use crate::optimizer::{Optimizer, OptimizerContext};
use crate::plan::Plan;
use crate::rules::RuleImpl;
use crate::semantic::Expression;
use crate::storage::{BucketId, OrgId, StaticBucketLookup};
use crate::time::Bounds;

pub(crate) fn org_id() -> OrgId {
    OrgId::from(0x0a)
}

pub(crate) fn bucket_id() -> BucketId {
    BucketId::from(0xbeef)
}

pub(crate) fn context() -> OptimizerContext {
    let lookup = StaticBucketLookup::default().with_bucket(org_id(), "my-bucket", bucket_id());
    OptimizerContext::default()
        .with_org(org_id())
        .with_now(Utc.timestamp_nanos(3_600_000_000_000))
        .with_bucket_lookup(Arc::new(lookup))
}

pub(crate) fn bounds() -> Bounds {
    Bounds::from_nanos(5, 10).unwrap()
}

/// The read `from(bucket: "my-bucket") |> range(start: 5, stop: 10)` turns into.
pub(crate) fn read_range() -> ReadRange {
    ReadRange::new("my-bucket", bounds()).with_bucket_id(bucket_id())
}

/// `r.<property>`
pub(crate) fn r(property: &str) -> Expression {
    Expression::member("r", property)
}

pub(crate) fn optimize(
    rules: Vec<RuleImpl>,
    context: &OptimizerContext,
    plan: Plan,
) -> OptResult<Plan> {
    HepOptimizer::new(
        MatchOrder::TopDown,
        DEFAULT_MAX_ITER_TIMES,
        rules,
        plan,
        context.clone(),
    )
    .find_best_plan()
}

pub(crate) fn assert_rewrite(rules: Vec<RuleImpl>, before: Plan, after: Plan) {
    let optimized = optimize(rules, &context(), before).unwrap();
    assert_eq!(
        after, optimized,
        "\nexpected:\n{}\nactual:\n{}",
        after, optimized
    );
}

pub(crate) fn assert_unchanged(rules: Vec<RuleImpl>, plan: Plan) {
    assert_rewrite(rules, plan.clone(), plan);
}
