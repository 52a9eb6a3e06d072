//! Сквозные тесты маскирования результатов курсора

use super::common::{RulesFixture, DEMO_RULES};
use rustdb_masking::common::{Result, SqlType, Value};
use rustdb_masking::executor::{ColumnMetadata, Frame, VecCursor};

fn columns() -> Vec<ColumnMetadata> {
    vec![
        ColumnMetadata::new("name", SqlType::Varchar).with_table("demo", "users"),
        ColumnMetadata::new("PHONE", SqlType::Varchar).with_table("demo", "users"),
        ColumnMetadata::new("ssn", SqlType::Integer)
            .with_table("", "users")
            .with_catalog("demo"),
    ]
}

#[test]
fn test_wrapped_cursor_returns_masked_frames() -> Result<()> {
    let fixture = RulesFixture::new(DEMO_RULES)?;
    let engine = fixture.engine()?;

    let rows = (0..3)
        .map(|i| {
            vec![
                Value::from(format!("user{}", i)),
                Value::from("13800001234"),
                Value::Integer(100 + i),
            ]
        })
        .collect();
    let mut adapter = engine.wrap_cursor(VecCursor::new(rows), columns());

    let frame = adapter.fetch(0)?;
    assert!(frame.done);
    assert_eq!(frame.len(), 3);
    assert_eq!(
        frame.rows[2],
        vec![
            Value::from("user2"),
            Value::from("1380*******"),
            Value::from("1*2"),
        ]
    );
    adapter.close()?;
    Ok(())
}

#[test]
fn test_engine_masks_prefetched_frame() -> Result<()> {
    let fixture = RulesFixture::new(DEMO_RULES)?;
    let engine = fixture.engine()?;

    let frame = Frame::new(
        40,
        false,
        vec![vec![Value::from("ann"), Value::Null, Value::Integer(5)]],
    );
    let masked = engine.mask_frame(frame, &columns())?;

    assert_eq!(masked.offset, 40);
    assert!(!masked.done);
    assert_eq!(
        masked.rows[0],
        vec![Value::from("ann"), Value::Null, Value::Integer(5)]
    );
    Ok(())
}
