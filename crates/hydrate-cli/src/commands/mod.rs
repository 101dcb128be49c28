pub mod config;
pub mod daemon;
pub mod data;
pub mod drink;
pub mod goal;
pub mod quick_add;
pub mod reminder;
pub mod stats;
