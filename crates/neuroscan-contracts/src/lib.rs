pub mod analysis;
pub mod conversation;
pub mod history;
pub mod report;
pub mod shell;
pub mod views;
