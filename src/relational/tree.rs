//! Реляционное дерево запроса и выражения проекций
//!
//! Узлы разделяются через `Arc`: перезапись никогда не изменяет исходное дерево,
//! а строит новые узлы, переиспользуя неизмененные поддеревья.

use crate::common::{SqlType, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Разделяемая ссылка на узел дерева
pub type RelRef = Arc<RelNode>;

/// Поле типа строки
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Имя поля
    pub name: String,
    /// Объявленный тип
    pub sql_type: SqlType,
}

impl Field {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
        }
    }
}

/// Тип строки узла
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowType {
    pub fields: Vec<Field>,
}

impl RowType {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Строит тип строки из пар (имя, тип)
    pub fn of(fields: &[(&str, SqlType)]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(name, sql_type)| Field::new(*name, sql_type.clone()))
                .collect(),
        }
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Имена полей
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Оператор вызова в выражении
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// SUBSTRING(s, start, length), start с единицы
    Substring,
    /// CONCAT(s1, s2, ...)
    Concat,
    /// CHAR_LENGTH(s)
    CharLength,
    /// REPEAT(s, n)
    Repeat,
    Plus,
    Minus,
    Equals,
    LessOrEqual,
    GreaterThan,
    /// CASE WHEN cond THEN a ELSE b END
    Case,
    /// REGEXP_REPLACE(s, pattern, replacement)
    RegexpReplace,
    /// Односторонний хеш
    Hash,
    /// CAST(x AS type), целевой тип берется из типа вызова
    Cast,
}

impl Operator {
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Substring => "SUBSTRING",
            Operator::Concat => "CONCAT",
            Operator::CharLength => "CHAR_LENGTH",
            Operator::Repeat => "REPEAT",
            Operator::Plus => "PLUS",
            Operator::Minus => "MINUS",
            Operator::Equals => "EQUALS",
            Operator::LessOrEqual => "LESS_OR_EQUAL",
            Operator::GreaterThan => "GREATER_THAN",
            Operator::Case => "CASE",
            Operator::RegexpReplace => "REGEXP_REPLACE",
            Operator::Hash => "HASH",
            Operator::Cast => "CAST",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Выражение проекции
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Ссылка на поле входа по индексу
    ColumnRef { index: usize },
    /// Литерал с объявленным типом
    Literal { value: Value, sql_type: SqlType },
    /// Вызов оператора
    Call {
        operator: Operator,
        operands: Vec<Expr>,
        sql_type: SqlType,
    },
}

impl Expr {
    pub fn column(index: usize) -> Self {
        Expr::ColumnRef { index }
    }

    pub fn literal(value: Value, sql_type: SqlType) -> Self {
        Expr::Literal { value, sql_type }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::literal(Value::Text(value.into()), SqlType::Varchar)
    }

    pub fn integer(value: i64) -> Self {
        Expr::literal(Value::Integer(value), SqlType::Integer)
    }

    pub fn call(operator: Operator, operands: Vec<Expr>, sql_type: SqlType) -> Self {
        Expr::Call {
            operator,
            operands,
            sql_type,
        }
    }

    pub fn is_column_ref(&self) -> bool {
        matches!(self, Expr::ColumnRef { .. })
    }

    /// Тип результата; для ссылки на колонку он определяется входом
    pub fn result_type(&self) -> Option<&SqlType> {
        match self {
            Expr::ColumnRef { .. } => None,
            Expr::Literal { sql_type, .. } | Expr::Call { sql_type, .. } => Some(sql_type),
        }
    }

    /// Тип результата относительно входного узла
    pub fn result_type_in(&self, input: &RelNode) -> Option<SqlType> {
        match self {
            Expr::ColumnRef { index } => input.field(*index).map(|f| f.sql_type.clone()),
            other => other.result_type().cloned(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::ColumnRef { index } => write!(f, "${}", index),
            Expr::Literal { value, .. } => match value {
                Value::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
                other => write!(f, "{}", other),
            },
            Expr::Call {
                operator: Operator::Cast,
                operands,
                sql_type,
            } => match operands.first() {
                Some(operand) => write!(f, "CAST({} AS {})", operand, sql_type),
                None => write!(f, "CAST(NULL AS {})", sql_type),
            },
            Expr::Call {
                operator: Operator::Case,
                operands,
                ..
            } if operands.len() == 3 => write!(
                f,
                "CASE WHEN {} THEN {} ELSE {} END",
                operands[0], operands[1], operands[2]
            ),
            Expr::Call {
                operator, operands, ..
            } => {
                write!(f, "{}(", operator)?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", operand)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Тип соединения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

/// Узел сканирования таблицы
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanNode {
    /// Квалифицированное имя: [schema, table, ...]
    pub qualified_name: Vec<String>,
    pub row_type: RowType,
}

/// Узел проекции
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectNode {
    pub input: RelRef,
    pub expressions: Vec<Expr>,
    pub row_type: RowType,
}

/// Узел соединения
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinNode {
    pub left: RelRef,
    pub right: RelRef,
    /// Число полей левого входа
    pub left_field_count: usize,
    pub join_type: JoinType,
    pub condition: Option<Expr>,
}

/// Узел фильтрации
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterNode {
    pub input: RelRef,
    pub condition: Expr,
}

/// Узел неизвестного вида, сквозной для происхождения колонок
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherNode {
    /// Вид узла у планировщика (Sort, Limit, Aggregate, ...)
    pub kind: String,
    pub inputs: Vec<RelRef>,
    pub row_type: RowType,
}

/// Узел реляционного дерева
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RelNode {
    Scan(ScanNode),
    Project(ProjectNode),
    Join(JoinNode),
    Filter(FilterNode),
    Other(OtherNode),
}

impl RelNode {
    /// Сканирование по имени вида `schema.table`
    pub fn scan(qualified_name: &str, row_type: RowType) -> RelRef {
        Self::scan_qualified(
            qualified_name.split('.').map(str::to_string).collect(),
            row_type,
        )
    }

    pub fn scan_qualified(qualified_name: Vec<String>, row_type: RowType) -> RelRef {
        Arc::new(RelNode::Scan(ScanNode {
            qualified_name,
            row_type,
        }))
    }

    pub fn project(input: RelRef, expressions: Vec<Expr>, row_type: RowType) -> RelRef {
        Arc::new(RelNode::Project(ProjectNode {
            input,
            expressions,
            row_type,
        }))
    }

    /// Проекция всех полей входа без изменений
    pub fn identity_project(input: RelRef) -> RelRef {
        let row_type = input.row_type();
        let expressions = (0..row_type.len()).map(Expr::column).collect();
        Self::project(input, expressions, row_type)
    }

    pub fn join(
        left: RelRef,
        right: RelRef,
        join_type: JoinType,
        condition: Option<Expr>,
    ) -> RelRef {
        let left_field_count = left.field_count();
        Arc::new(RelNode::Join(JoinNode {
            left,
            right,
            left_field_count,
            join_type,
            condition,
        }))
    }

    pub fn filter(input: RelRef, condition: Expr) -> RelRef {
        Arc::new(RelNode::Filter(FilterNode { input, condition }))
    }

    pub fn other(kind: impl Into<String>, inputs: Vec<RelRef>, row_type: RowType) -> RelRef {
        Arc::new(RelNode::Other(OtherNode {
            kind: kind.into(),
            inputs,
            row_type,
        }))
    }

    /// Тег вида узла
    pub fn kind(&self) -> &str {
        match self {
            RelNode::Scan(_) => "Scan",
            RelNode::Project(_) => "Project",
            RelNode::Join(_) => "Join",
            RelNode::Filter(_) => "Filter",
            RelNode::Other(node) => &node.kind,
        }
    }

    /// Входы узла
    pub fn inputs(&self) -> Vec<&RelRef> {
        match self {
            RelNode::Scan(_) => Vec::new(),
            RelNode::Project(node) => vec![&node.input],
            RelNode::Join(node) => vec![&node.left, &node.right],
            RelNode::Filter(node) => vec![&node.input],
            RelNode::Other(node) => node.inputs.iter().collect(),
        }
    }

    /// Копия узла с новыми входами; число входов должно совпадать
    pub fn with_inputs(&self, mut inputs: Vec<RelRef>) -> Option<RelNode> {
        if inputs.len() != self.inputs().len() {
            return None;
        }
        let node = match self {
            RelNode::Scan(node) => RelNode::Scan(node.clone()),
            RelNode::Project(node) => RelNode::Project(ProjectNode {
                input: inputs.remove(0),
                expressions: node.expressions.clone(),
                row_type: node.row_type.clone(),
            }),
            RelNode::Join(node) => {
                let right = inputs.remove(1);
                let left = inputs.remove(0);
                RelNode::Join(JoinNode {
                    left,
                    right,
                    left_field_count: node.left_field_count,
                    join_type: node.join_type,
                    condition: node.condition.clone(),
                })
            }
            RelNode::Filter(node) => RelNode::Filter(FilterNode {
                input: inputs.remove(0),
                condition: node.condition.clone(),
            }),
            RelNode::Other(node) => RelNode::Other(OtherNode {
                kind: node.kind.clone(),
                inputs,
                row_type: node.row_type.clone(),
            }),
        };
        Some(node)
    }

    /// Число выходных полей
    pub fn field_count(&self) -> usize {
        match self {
            RelNode::Scan(node) => node.row_type.len(),
            RelNode::Project(node) => node.row_type.len(),
            RelNode::Join(node) => node.left_field_count + node.right.field_count(),
            RelNode::Filter(node) => node.input.field_count(),
            RelNode::Other(node) => node.row_type.len(),
        }
    }

    /// Выходное поле по индексу
    pub fn field(&self, index: usize) -> Option<&Field> {
        match self {
            RelNode::Scan(node) => node.row_type.field(index),
            RelNode::Project(node) => node.row_type.field(index),
            RelNode::Join(node) => {
                if index < node.left_field_count {
                    node.left.field(index)
                } else {
                    node.right.field(index - node.left_field_count)
                }
            }
            RelNode::Filter(node) => node.input.field(index),
            RelNode::Other(node) => node.row_type.field(index),
        }
    }

    /// Выходной тип строки
    pub fn row_type(&self) -> RowType {
        match self {
            RelNode::Scan(node) => node.row_type.clone(),
            RelNode::Project(node) => node.row_type.clone(),
            RelNode::Join(node) => {
                let mut fields = node.left.row_type().fields;
                fields.extend(node.right.row_type().fields);
                RowType::new(fields)
            }
            RelNode::Filter(node) => node.input.row_type(),
            RelNode::Other(node) => node.row_type.clone(),
        }
    }
}
