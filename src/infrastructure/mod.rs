pub mod config;
pub mod llm_clients;
