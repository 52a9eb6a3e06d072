//! Бенчмарки для rustdb-masking

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rustdb_masking::common::{LineagePolicy, SqlType, StrategySettings, Value};
use rustdb_masking::executor::{mask_frame, ColumnMetadata, Frame};
use rustdb_masking::masking::mask_text;
use rustdb_masking::relational::{Expr, ExpressionRewriter, RelNode, RowType};
use rustdb_masking::rules::{MaskingRule, RuleSnapshot, RuleType};
use std::hint::black_box;
use std::sync::Arc;

const RULES: &str = "\
demo,users,phone,left,true
demo,users,ssn,full,true
demo,users,email,middle,true
demo,users,token,hash,true
";

fn strategy_benchmark(c: &mut Criterion) {
    let settings = StrategySettings::default();
    let mut group = c.benchmark_group("strategies");

    for rule_type in RuleType::ALL {
        let rule = MaskingRule::new("demo", "users", "value", rule_type, vec![], true).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(rule_type),
            &rule,
            |b, rule| b.iter(|| mask_text(black_box("alice.smith@example.com"), rule, &settings)),
        );
    }
    group.finish();
}

fn rewrite_benchmark(c: &mut Criterion) {
    let settings = StrategySettings::default();
    let snapshot = Arc::new(RuleSnapshot::parse(RULES));
    let scan = RelNode::scan(
        "demo.users",
        RowType::of(&[
            ("id", SqlType::Integer),
            ("phone", SqlType::Varchar),
            ("ssn", SqlType::Integer),
            ("email", SqlType::Varchar),
            ("token", SqlType::Varchar),
        ]),
    );
    let project = RelNode::identity_project(RelNode::filter(scan, Expr::string("cond")));

    c.bench_function("rewrite_project", |b| {
        let rewriter =
            ExpressionRewriter::with_snapshot(Arc::clone(&snapshot), &settings, LineagePolicy::FailOpen);
        b.iter(|| rewriter.rewrite(black_box(&project)).unwrap());
    });
}

fn frame_benchmark(c: &mut Criterion) {
    let settings = StrategySettings::default();
    let snapshot = RuleSnapshot::parse(RULES);
    let columns = vec![
        ColumnMetadata::new("phone", SqlType::Varchar).with_table("demo", "users"),
        ColumnMetadata::new("email", SqlType::Varchar).with_table("demo", "users"),
    ];
    let mut group = c.benchmark_group("mask_frame");

    for size in [64usize, 4096] {
        let rows: Vec<Vec<Value>> = (0..size)
            .map(|i| {
                vec![
                    Value::from(format!("1380000{:04}", i)),
                    Value::from(format!("user{}@example.com", i)),
                ]
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            b.iter(|| {
                mask_frame(
                    Frame::new(0, true, rows.clone()),
                    &columns,
                    &snapshot,
                    &settings,
                    LineagePolicy::FailOpen,
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, strategy_benchmark, rewrite_benchmark, frame_benchmark);
criterion_main!(benches);
