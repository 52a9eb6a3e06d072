//! Выдача результатов: курсоры и маскирование фреймов

pub mod cursor;

#[cfg(test)]
mod tests;

pub use crate::common::Row;
pub use cursor::{
    mask_frame, ColumnMetadata, CursorMaskingAdapter, CursorStatistics, Frame, RowCursor,
    VecCursor,
};
