//! Определение происхождения выходных колонок
//!
//! Чистая функция от дерева: без состояния и ввода-вывода, безопасна для
//! одновременного вызова из многих потоков.

use crate::relational::tree::{Expr, RelNode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Базовая таблица, из которой происходит выходная колонка
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnOrigin {
    pub schema: String,
    pub table: String,
}

impl ColumnOrigin {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Имя `schema.table`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

impl fmt::Display for ColumnOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Происхождение колонки вместе с именем поля в базовой таблице
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnLineage {
    pub origin: ColumnOrigin,
    /// Имя поля в сканировании; `None`, если сканирование не описало свои поля
    pub column: Option<String>,
}

/// Поиск происхождения колонок в реляционном дереве
pub struct ColumnLineageResolver;

impl ColumnLineageResolver {
    /// Возвращает базовую таблицу для выходной колонки `column_index` узла.
    ///
    /// Через вычисляемые выражения и литералы происхождение не прослеживается.
    pub fn resolve(node: &RelNode, column_index: usize) -> Option<ColumnOrigin> {
        Self::resolve_column(node, column_index).map(|lineage| lineage.origin)
    }

    /// Как [`ColumnLineageResolver::resolve`], но дополнительно возвращает имя базового поля
    pub fn resolve_column(node: &RelNode, column_index: usize) -> Option<ColumnLineage> {
        let mut current = node;
        let mut index = column_index;

        loop {
            match current {
                RelNode::Scan(scan) => {
                    if scan.qualified_name.len() < 2 {
                        return None;
                    }
                    // Пустой тип строки означает неизвестную ширину
                    let column = if scan.row_type.is_empty() {
                        None
                    } else {
                        Some(scan.row_type.field(index)?.name.clone())
                    };
                    return Some(ColumnLineage {
                        origin: ColumnOrigin::new(
                            scan.qualified_name[0].clone(),
                            scan.qualified_name[1].clone(),
                        ),
                        column,
                    });
                }
                RelNode::Join(join) => {
                    if index < join.left_field_count {
                        current = join.left.as_ref();
                    } else {
                        index -= join.left_field_count;
                        current = join.right.as_ref();
                    }
                }
                RelNode::Project(project) => match project.expressions.get(index)? {
                    Expr::ColumnRef { index: input_index } => {
                        index = *input_index;
                        current = project.input.as_ref();
                    }
                    _ => return None,
                },
                RelNode::Filter(filter) => current = filter.input.as_ref(),
                RelNode::Other(other) => {
                    let out_of_range = !other.row_type.is_empty() && index >= other.row_type.len();
                    if other.inputs.len() != 1 || out_of_range {
                        return None;
                    }
                    current = other.inputs[0].as_ref();
                }
            }
        }
    }

    /// Происхождение всех выходных колонок узла
    pub fn resolve_all(node: &RelNode) -> Vec<Option<ColumnOrigin>> {
        (0..node.field_count())
            .map(|index| Self::resolve(node, index))
            .collect()
    }
}
