//! Стратегии маскирования значений

pub mod strategies;

#[cfg(test)]
mod tests;

pub use strategies::{
    hash_value, mask_full, mask_left, mask_middle, mask_right, mask_text, mask_value, regex_mask,
    VisibleSpan,
};
