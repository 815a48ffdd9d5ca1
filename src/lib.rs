#![cfg_attr(not(doctest), doc = include_str!("../README.md"))]
pub mod backend;
pub mod logger;
pub mod optimizer;
pub mod options;
pub mod problem;
pub mod types;
