//! Goaler: a conversational goal-setting coach.

pub mod agent;
pub mod channels;
pub mod coach;
pub mod config;
pub mod error;
pub mod goals;
pub mod llm;
pub mod report;
pub mod state;
pub mod store;
pub mod tools;
