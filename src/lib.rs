pub mod browser;
pub mod cli;
pub mod config;
pub mod detect;
pub mod dispatch;
pub mod entry;
pub mod exec;
pub mod fetch;
pub mod pipeline;
pub mod repo_list;
pub mod report;
pub mod stage;
pub mod testrun;
pub mod util;
pub mod validate;
pub mod walk;
