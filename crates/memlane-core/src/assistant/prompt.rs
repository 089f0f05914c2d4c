//! Prompt text and local answer composition.

/// Instructions handed to the generator with every question.
pub const SYSTEM_PROMPT: &str = "You are a caring memory assistant helping someone recall their memories and experiences.
Base your answer ONLY on the memories provided and be accurate about specific details.
- Repeat specific details exactly as remembered, such as foods, places, people and activities.
- Treat voice_note memories as the most recent.
- Be warm and personal without adding anything the memories do not say.
- Do not use em dashes.";

/// User turn carrying the question and its memory context.
pub fn user_prompt(question: &str, context: &str) -> String {
    format!(
        "Question: {question}\n\nMemory Context:\n{context}\n\nPlease answer based on the memories provided. Be warm, personal, and helpful."
    )
}

/// Reply when nothing relevant is stored.
pub fn no_memories_answer(question: &str) -> String {
    format!(
        "I don't have any memories about '{question}' yet. Try adding some memories first by recording voice notes or uploading photos!"
    )
}

/// Local answer used when no generator is configured.
pub fn local_answer(context: &str, snippet_chars: usize) -> String {
    format!(
        "Based on your memories, here's what I found: {}",
        snippet(context, snippet_chars)
    )
}

/// Local answer used when the generator failed.
pub fn recovery_answer(context: &str, snippet_chars: usize) -> String {
    format!(
        "I couldn't phrase a full answer right now, but based on your memories, here is some relevant information: {}...",
        snippet(context, snippet_chars)
    )
}

/// First `chars` characters of `text`, never splitting a code point.
fn snippet(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
