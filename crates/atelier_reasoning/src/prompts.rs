use atelier_core::{Persona, Turn};

pub const INTENT_CLASSIFIER_PROMPT: &str = "\
You are an intent classifier for a fashion voice assistant.
Given a user message, classify the intent as exactly one of:
- 'wardrobe_analysis': the user wants outfit suggestions from their wardrobe or closet (e.g. 'What should I wear?', 'Suggest an outfit for work').
- 'skin_tone_analysis': the user wants to analyze their skin tone, undertone, color season, or which colors suit them.
- 'take_picture': the user wants to take a photo or use the camera.
- 'update_filter': the user wants to filter or show certain clothes by material, store, or sustainability (e.g. 'Show me cotton clothes', 'Only show sustainable items').
- 'chat': for all other requests.
Respond ONLY with the intent label.";

pub const FILTER_EXTRACTION_PROMPT: &str = r#"You are a filter extraction agent.
Given a user message about filtering clothes, extract the filter type and value.
Supported filter types: 'material', 'store', 'sustainable'.
Return only a JSON object with keys 'type' and 'value'.
Examples:
- User: 'Show me cotton clothes' => {"type": "material", "value": "cotton"}
- User: 'Only show sustainable items' => {"type": "sustainable", "value": "true"}
- User: 'Show me clothes from H&M' => {"type": "store", "value": "H&M"}
If you cannot extract a filter, return {"type": "unknown", "value": ""}."#;

/// System prompt for a model-backed persona turn.
pub fn persona_system_prompt(persona: &Persona, history: &[Turn]) -> String {
    format!(
        "{}\n\nYou are speaking as {} ({}). Earlier turns in this conversation: {}.",
        persona.instruction,
        persona.name,
        persona.description,
        history.len()
    )
}
