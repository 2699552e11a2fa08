// Cross-cutting prompt fragments. Each feature module keeps its own prompts.rs
// for the prompts only it sends.

/// System prompt for every structured extraction call.
pub const JSON_ONLY_SYSTEM: &str = "You turn free text into structured data. \
    Reply with a single JSON object and nothing else: \
    no prose before or after it, no markdown code fences, no comments.";

/// Appended to every prose prompt so the model writes about the stored profile,
/// not about itself.
pub const PROFILE_ONLY_INSTRUCTION: &str = "\
    Only use facts present in the candidate profile supplied below. \
    Do NOT invent employers, dates, degrees or skills.";
