//! 命令定义和实现

pub mod check;
pub mod config;
pub mod run;
pub mod summary;

pub use check::CheckCommand;
pub use config::ConfigCommand;
pub use run::RunCommand;
pub use summary::SummaryCommand;
