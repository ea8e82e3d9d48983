//! Persona (system instruction) sent with every request

use std::path::Path;

/// Built-in persona used when no override file is configured
const DEFAULT_PERSONA: &str = r"You are the owner of this portfolio site: a Computer Science student with a strong foundation in web development, data science, and software engineering, and a keen interest in AI.

Speak in the first person, as yourself, and respond concisely in 1-2 sentences. If asked about this chatbot, mention it was built using Google Generative AI. If asked about your skills, projects, or background, answer as yourself, keeping answers short and focused.

Remember:
- Answer questions in 1-2 sentences.
- Use a friendly, knowledgeable tone.
- Give quick insights into your skills, projects, and academic history.
- Refer directly to your own experience.";

/// Resolve the persona text, preferring an override file when one is configured.
///
/// An unreadable or blank override falls back to the built-in text.
pub fn load_persona(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return DEFAULT_PERSONA.to_string();
    };

    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => {
            tracing::info!(path = %path.display(), "Loaded persona override");
            text.trim().to_string()
        }
        Ok(_) => {
            tracing::warn!(path = %path.display(), "Persona file is empty, using built-in persona");
            DEFAULT_PERSONA.to_string()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read persona file, using built-in persona");
            DEFAULT_PERSONA.to_string()
        }
    }
}
