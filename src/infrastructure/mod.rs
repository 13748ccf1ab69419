pub mod config;
pub mod db;
pub mod extract;
pub mod http;
pub mod repositories;
pub mod tts;
