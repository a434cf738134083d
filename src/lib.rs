pub mod account; // register / login / logout / profile
pub mod cli;
pub mod config;
pub mod error;
pub mod shell;
pub mod storage;
