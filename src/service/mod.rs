pub mod assistant;
pub mod openai_service;
pub mod parser;
