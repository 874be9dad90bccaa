pub mod settle;

pub use settle::{SettleStatus, SettleWatch};
