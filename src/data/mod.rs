pub mod history;
pub mod power;
