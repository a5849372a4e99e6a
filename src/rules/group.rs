use crate::error::OptResult;
use crate::operator::{
    GroupMode, LogicalOperator, Operator, OperatorKind, PhysicalOperator, ReadGroup, TIME_COLUMN,
    VALUE_COLUMN,
};
use crate::optimizer::OptimizerContext;
use crate::rules::{OptExpression, Pattern, Rule, RuleResult};

lazy_static! {
    static ref PATTERN: Pattern = Pattern::chain([OperatorKind::Group, OperatorKind::ReadRange]);
}

/// Lets storage group series by tag.
#[derive(Clone, Debug)]
pub struct PushDownGroupRule;

impl Rule for PushDownGroupRule {
    fn pattern(&self) -> &Pattern {
        &PATTERN
    }

    fn apply(
        &self,
        input: OptExpression,
        _context: &OptimizerContext,
        result: &mut RuleResult,
    ) -> OptResult<()> {
        let Some(read_expr) = input.input(0) else {
            return Ok(());
        };
        let (Some(group), Some(read)) = (
            input.logical().and_then(LogicalOperator::as_logical_group),
            read_expr
                .physical()
                .and_then(PhysicalOperator::as_physical_read_range),
        ) else {
            return Ok(());
        };

        match group.mode() {
            GroupMode::By | GroupMode::None => {}
            GroupMode::Except => return Ok(()),
        }
        // Storage groups by tags only.
        if group
            .keys()
            .iter()
            .any(|key| key == TIME_COLUMN || key == VALUE_COLUMN)
        {
            return Ok(());
        }

        let read_group = ReadGroup::new(read.clone(), group.mode(), group.keys().to_vec());
        result.add(OptExpression::with_operator(
            Operator::physical(read_group),
            read_expr.inputs().to_vec(),
        ));
        Ok(())
    }
}
