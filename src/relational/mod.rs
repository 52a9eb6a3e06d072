//! Реляционное дерево запроса, происхождение колонок и перезапись проекций

pub mod eval;
pub mod lineage;
pub mod rewriter;
pub mod tree;

#[cfg(test)]
mod tests;

pub use eval::{evaluate, evaluate_projection};
pub use lineage::{ColumnLineage, ColumnLineageResolver, ColumnOrigin};
pub use rewriter::{apply_rule, masked_constant, rewrite, ExpressionRewriter};
pub use tree::{
    Expr, Field, FilterNode, JoinNode, JoinType, Operator, OtherNode, ProjectNode, RelNode,
    RelRef, RowType, ScanNode,
};
