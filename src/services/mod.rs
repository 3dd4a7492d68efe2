pub mod chat_service;
pub mod extraction_service;
pub mod llm_service;
