//! Prompt assembly. The template text and its two placeholders are an
//! external contract: rendering is deterministic, and the fallback
//! sentence below is what the model is instructed to emit when the
//! context cannot answer the question.

use super::chunker::Segment;

/// The sentence the model must produce when the answer is not in the
/// retrieved context.
pub const FALLBACK_ANSWER: &str = "I don't know based on the retrieved documents.";

pub const SUPPORT_TEMPLATE: &str = "\
You are a **Customer Support Chatbot**. Use only the information in CONTEXT to answer.
If the answer is not in CONTEXT, respond with \"I'm not sure from the docs.\"

Rules:
1) Use ONLY the provided <context> to answer.
2) If the answer is not in the context, say: \"I don't know based on the retrieved documents.\"
3) Be concise and accurate. Prefer quoting key phrases from the context.
4) When possible, cite sources as [source: source] using the metadata.

CONTEXT:
{context}

USER:
{question}
";

/// Render retrieved segments into the CONTEXT block, one attributed
/// passage per segment.
pub fn render_context(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| format!("[source: {}]\n{}", segment.source.label(), segment.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Substitute the retrieved context and the current question into the
/// template. Zero segments produce an empty CONTEXT section; the
/// template's rules cover that case.
pub fn render_prompt(segments: &[Segment], question: &str) -> String {
    SUPPORT_TEMPLATE
        .replace("{context}", &render_context(segments))
        .replace("{question}", question)
}
