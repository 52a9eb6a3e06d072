//! Сквозные тесты перезаписи дерева запроса

use super::common::{orders_scan, users_scan, RulesFixture, DEMO_RULES};
use rustdb_masking::common::{LineagePolicy, Result, SqlType, Value};
use rustdb_masking::relational::{evaluate_projection, Expr, JoinType, RelNode, RowType};
use std::sync::Arc;

#[test]
fn test_phone_left_mask_end_to_end() -> Result<()> {
    let fixture = RulesFixture::new(DEMO_RULES)?;
    let engine = fixture.engine()?;

    let project = RelNode::project(
        users_scan(),
        vec![Expr::column(2)],
        RowType::of(&[("phone", SqlType::Varchar)]),
    );
    let rewritten = engine.rewrite(&project)?;

    let RelNode::Project(node) = rewritten.as_ref() else {
        panic!("Expected project node");
    };
    let rows = vec![vec![
        Value::Integer(1),
        Value::from("Bob"),
        Value::from("13800001234"),
        Value::Integer(42),
        Value::from("bob@example.com"),
    ]];
    let masked = evaluate_projection(node, &rows)?;
    assert_eq!(masked, vec![vec![Value::from("1380*******")]]);
    Ok(())
}

#[test]
fn test_integer_full_mask_end_to_end() -> Result<()> {
    let fixture = RulesFixture::new(DEMO_RULES)?;
    let engine = fixture.engine()?;

    let project = RelNode::project(
        users_scan(),
        vec![Expr::column(0), Expr::column(3)],
        RowType::of(&[("id", SqlType::Integer), ("ssn", SqlType::Integer)]),
    );
    let rewritten = engine.rewrite_project(&project)?;

    let RelNode::Project(node) = rewritten.as_ref() else {
        panic!("Expected project node");
    };
    assert_eq!(node.row_type, RowType::of(&[("id", SqlType::Integer), ("ssn", SqlType::Integer)]));

    let row = vec![
        Value::Integer(7),
        Value::from("Eve"),
        Value::from("555"),
        Value::Integer(987654321),
        Value::Null,
    ];
    let masked = evaluate_projection(node, &[row])?;
    assert_eq!(masked[0], vec![Value::Integer(7), Value::Integer(0)]);
    Ok(())
}

#[test]
fn test_join_query_masks_both_sides() -> Result<()> {
    let fixture = RulesFixture::new(DEMO_RULES)?;
    let engine = fixture.engine()?;

    let join = RelNode::join(users_scan(), orders_scan(), JoinType::Inner, None);
    let project = RelNode::project(
        RelNode::filter(join, Expr::string("users.id = orders.user_id")),
        vec![Expr::column(1), Expr::column(4), Expr::column(7)],
        RowType::of(&[
            ("name", SqlType::Varchar),
            ("email", SqlType::Varchar),
            ("card", SqlType::Varchar),
        ]),
    );
    let rewritten = engine.rewrite(&project)?;

    let RelNode::Project(node) = rewritten.as_ref() else {
        panic!("Expected project node");
    };
    let row = vec![
        Value::Integer(1),
        Value::from("Alice"),
        Value::from("13800001234"),
        Value::Integer(1),
        Value::from("alice@example.com"),
        Value::Integer(100),
        Value::Integer(1),
        Value::from("4111111111111111"),
    ];
    let masked = evaluate_projection(node, &[row])?;
    assert_eq!(
        masked[0],
        vec![
            Value::from("Alice"),
            Value::from("alic***x***l***om"),
            Value::from("************1111"),
        ]
    );
    Ok(())
}

#[test]
fn test_tree_without_protected_columns_is_untouched() -> Result<()> {
    let fixture = RulesFixture::new(DEMO_RULES)?;
    let engine = fixture.engine()?;

    let root = RelNode::other(
        "Sort",
        vec![RelNode::project(
            orders_scan(),
            vec![Expr::column(0), Expr::column(1)],
            RowType::of(&[("order_id", SqlType::BigInt), ("user_id", SqlType::Integer)]),
        )],
        RowType::of(&[("order_id", SqlType::BigInt), ("user_id", SqlType::Integer)]),
    );

    let rewritten = engine.rewrite(&root)?;
    assert!(Arc::ptr_eq(&rewritten, &root));
    Ok(())
}

#[test]
fn test_fail_closed_engine_masks_unknown_origin() -> Result<()> {
    let fixture = RulesFixture::new(DEMO_RULES)?;
    let mut config = fixture.config();
    config.lineage_policy = LineagePolicy::FailClosed;
    let engine = rustdb_masking::MaskingEngine::open(config)?;

    let values = RelNode::other(
        "Values",
        vec![],
        RowType::of(&[("token", SqlType::Varchar)]),
    );
    let project = RelNode::identity_project(values);
    let rewritten = engine.rewrite(&project)?;

    let RelNode::Project(node) = rewritten.as_ref() else {
        panic!("Expected project node");
    };
    assert_eq!(node.expressions[0], Expr::string("******"));
    Ok(())
}
