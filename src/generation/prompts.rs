//! Prompt templates for style planning and artifact generation.

/// Request for `count` short style labels, answered as a JSON array.
pub fn style_planning_prompt(user_prompt: &str, count: usize) -> String {
    format!(
        "Suggest {count} bold, artistic UI design styles for this request: \"{user_prompt}\". \
         Return a JSON array of exactly {count} short, evocative style names and nothing else."
    )
}

/// Request for one complete HTML/CSS artifact in the given style.
pub fn artifact_prompt(user_prompt: &str, style: &str) -> String {
    format!(
        "You are a senior frontend engineer. Build a beautiful, complete UI component for: \
         \"{user_prompt}\". Style: {style}. The UI must fill the full height of its card with no \
         inner scrollbars. Return ONLY the HTML and CSS (CSS inside a <style> tag). No Markdown."
    )
}
