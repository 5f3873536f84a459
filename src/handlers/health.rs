// src/handlers/health.rs

/// Keep-alive probe for the hosting platform.
pub async fn keep_alive() -> &'static str {
    "Trivia bot is online!"
}
