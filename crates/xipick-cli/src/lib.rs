// Command-line front end: configuration and the load, fit, report run.

pub mod config;
pub mod run;
