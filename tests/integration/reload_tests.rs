//! Сквозные тесты перезагрузки правил

use super::common::{users_scan, RulesFixture, DEMO_RULES};
use rustdb_masking::common::{Result, SqlType, Value};
use rustdb_masking::relational::{evaluate_projection, Expr, RelNode, RelRef, RowType};
use rustdb_masking::rules::RuleType;
use rustdb_masking::MaskingEngine;
use std::time::Duration;

fn phone_project() -> RelRef {
    RelNode::project(
        users_scan(),
        vec![Expr::column(2)],
        RowType::of(&[("phone", SqlType::Varchar)]),
    )
}

fn masked_phone(engine: &MaskingEngine) -> Result<Value> {
    let rewritten = engine.rewrite(&phone_project())?;
    let RelNode::Project(node) = rewritten.as_ref() else {
        panic!("Expected project node");
    };
    let row = vec![
        Value::Integer(1),
        Value::from("Bob"),
        Value::from("13800001234"),
        Value::Integer(42),
        Value::Null,
    ];
    let mut rows = evaluate_projection(node, &[row])?;
    Ok(rows.remove(0).remove(0))
}

#[test]
fn test_malformed_line_next_to_valid_line() -> Result<()> {
    let fixture = RulesFixture::new("demo,users,phone\ndemo,users,ssn,full,true\n")?;
    let engine = fixture.engine()?;

    let snapshot = engine.store().current_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.report().malformed.len(), 1);
    assert_eq!(
        engine
            .store()
            .lookup("demo", "users", "ssn")
            .map(|rule| rule.rule_type()),
        Some(RuleType::Full)
    );
    assert!(engine.store().lookup("demo", "users", "phone").is_none());
    Ok(())
}

#[test]
fn test_manual_reload_changes_rewrite() -> Result<()> {
    let fixture = RulesFixture::new(DEMO_RULES)?;
    let engine = fixture.engine()?;
    assert_eq!(masked_phone(&engine)?, Value::from("1380*******"));

    fixture.write("demo,users,phone,right,true\n")?;
    engine.store().reload()?;
    assert_eq!(masked_phone(&engine)?, Value::from("*******1234"));

    fixture.write("this is not a rules file\n")?;
    assert!(engine.store().reload().is_err());
    assert_eq!(masked_phone(&engine)?, Value::from("*******1234"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_engine_auto_reload() -> Result<()> {
    let fixture = RulesFixture::new(DEMO_RULES)?;
    let mut config = fixture.config();
    config.auto_reload = true;
    config.reload_interval_secs = 1;

    let engine = MaskingEngine::open(config)?;
    engine.start()?;
    assert!(engine.store().is_auto_reloading());

    fixture.write("demo,users,phone,keep,true\n")?;

    let mut updated = false;
    for _ in 0..60 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if masked_phone(&engine)? == Value::from("13800001234") {
            updated = true;
            break;
        }
    }
    assert!(updated, "rules were not reloaded in time");

    engine.shutdown();
    assert!(!engine.store().is_auto_reloading());
    Ok(())
}

#[test]
fn test_missing_rules_file_is_fatal() {
    let fixture = RulesFixture::new(DEMO_RULES).expect("fixture");
    let mut config = fixture.config();
    config.rules_path = fixture.temp_dir.path().join("absent.csv");

    assert!(MaskingEngine::open(config).is_err());
}
