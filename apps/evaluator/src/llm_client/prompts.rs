// Shared prompt fragments. Each service that talks to a provider keeps its
// own prompts.rs alongside it; this file holds the cross-cutting pieces.

/// Wraps the resume text so the model cannot mistake it for instructions.
pub const RESUME_BLOCK: &str = "\
<resume>
{resume}
</resume>";

pub fn resume_block(resume_text: &str) -> String {
    RESUME_BLOCK.replace("{resume}", resume_text.trim())
}
