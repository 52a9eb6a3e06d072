//! Константы для слоя маскирования

/// Путь к файлу правил по умолчанию
pub const DEFAULT_RULES_PATH: &str = "./conf/masking.csv";

/// Интервал перезагрузки правил по умолчанию (в секундах)
pub const DEFAULT_RELOAD_INTERVAL_SECS: u64 = 5;

/// Символ маскирования по умолчанию
pub const DEFAULT_MASK_CHAR: char = '*';

/// Константа, подставляемая вместо строковой колонки при полном маскировании плана
pub const DEFAULT_FULL_MASK_LITERAL: &str = "******";

/// Префикс комментария в файле правил
pub const RULE_COMMENT_PREFIX: char = '#';

/// Разделитель полей в записи правила
pub const RULE_FIELD_SEPARATOR: char = ',';

/// Минимальное число полей записи: schema, table, column, ruleType, enabled
pub const MIN_RULE_FIELDS: usize = 5;

/// Имя первого поля строки-заголовка
pub const RULE_HEADER_FIRST_FIELD: &str = "schema";

/// Число строк кадра, начиная с которого маскирование идет параллельно
pub const PARALLEL_FRAME_THRESHOLD: usize = 512;

/// Префикс переменных окружения
pub const ENV_PREFIX: &str = "RUSTDB_MASKING_";
