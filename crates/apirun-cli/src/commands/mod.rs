pub mod config;
pub mod history;
pub mod redact;
pub mod run;
