//! Prompt templates.
//!
//! Templates use `{name}` placeholders and are rendered in a single pass, so
//! braces inside substituted text (PDF content often has them) are left alone.

use pdfchat_rag::SearchResult;

/// Question-answering prompt: retrieved context, then the question.
pub const QA_TEMPLATE: &str = "Use the following retrieved documents to answer the question:\n\n\
{context}\n\nQuestion: {question}\n\n\
If the documents do not provide enough information, say 'I don't know'.";

/// Follow-up rewriting prompt.
pub const CONDENSE_TEMPLATE: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question, in its original language.\n\n\
Chat History:\n{chat_history}\nFollow Up Input: {question}\nStandalone question:";

/// Join retrieved chunk texts, closest first, separated by a blank line.
pub fn format_context(results: &[SearchResult]) -> String {
    results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

/// Render [`QA_TEMPLATE`].
pub fn qa_prompt(question: &str, results: &[SearchResult]) -> String {
    let context = format_context(results);
    render(QA_TEMPLATE, &[("context", context.as_str()), ("question", question)])
}

/// Render [`CONDENSE_TEMPLATE`].
pub fn condense_prompt(chat_history: &str, question: &str) -> String {
    render(CONDENSE_TEMPLATE, &[("chat_history", chat_history), ("question", question)])
}

/// Substitute `{name}` placeholders. Unknown placeholders are kept as written.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after
            .find('}')
            .and_then(|close| vars.iter().find(|(k, _)| *k == &after[..close]).map(|(_, v)| (close, v)));
        match value {
            Some((close, v)) => {
                out.push_str(v);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
