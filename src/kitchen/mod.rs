//! Kitchen board consumer of the notification channel.

pub mod board;

pub use board::{KitchenBoard, HIGHLIGHT_TTL};
