use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::expr;
use crate::flow::nodes::BranchCase;

/// Picks the target of the first case whose expression evaluates to true,
/// in declaration order. Cases with empty expressions are skipped and
/// evaluation errors count as false for that case only. Falls back to the
/// default successor, or `None`.
pub fn resolve(
    cases: &[BranchCase],
    default_node: Option<&str>,
    context: &HashMap<String, Value>,
) -> Option<String> {
    for case in cases {
        if case.expression.trim().is_empty() {
            continue;
        }
        if expr::evaluate(&case.expression, context) {
            debug!(
                target = %case.target_node,
                label = case.label.as_deref().unwrap_or(""),
                "branch case matched"
            );
            return Some(case.target_node.clone());
        }
    }
    default_node.map(str::to_string)
}
