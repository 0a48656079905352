//! Prompt builders for review and summary requests.
//!
//! Keep prompts compact. Every review prompt asks for complete, verbatim
//! quotes, since the excerpt is the only link back to the document.

/// System instruction for review requests.
pub const REVIEW_SYSTEM: &str = "You are an EU legal compliance expert. Provide brief, specific feedback with exact text references. When quoting text, always use complete sentences or phrases - never truncate with \"...\". The quoted text must match exactly what appears in the document.";

/// System instruction for summary requests.
pub const SUMMARY_SYSTEM: &str = "You are a helpful AI assistant that creates clear, concise document summaries. Focus on the main points and key insights.";

const FOCUS: &str = "Focus: GDPR, regulatory gaps, legal risks, unclear terms, missing clauses.\n";

const ISSUE_FORMAT: &str = "\
For each issue provide:
- Type: compliance/legal_risk/data_protection/regulatory/clarity/structure
- Severity: low/medium/high/critical
- EU regulation (if applicable)
- Complete text segment in quotes (use full sentences or complete phrases, do not truncate with \"...\")
- Brief recommendation
";

const QUOTE_RULE: &str = "IMPORTANT: When quoting text, use complete sentences or phrases. Do not use \"...\" or truncate the quoted text. The quoted text must be exactly as it appears in the document.\n";

/// Prompt for reviewing a whole document in one request.
pub fn build_review_prompt(document: &str) -> String {
    let mut s = String::new();
    s.push_str("Analyze this legal document for EU compliance issues. Keep responses brief and focused.\n\n");
    s.push_str(FOCUS);
    s.push('\n');
    s.push_str(ISSUE_FORMAT);
    s.push('\n');
    s.push_str(QUOTE_RULE);
    s.push_str("\nDocument: ");
    s.push_str(document);
    s
}

/// Prompt for reviewing chunk `part` (1-based) of `total`.
pub fn build_chunk_prompt(chunk: &str, part: usize, total: usize) -> String {
    let mut s = String::new();
    s.push_str(&format!(
        "Review part {part}/{total} for EU compliance. Keep responses brief.\n\n"
    ));
    s.push_str(FOCUS);
    s.push('\n');
    s.push_str(ISSUE_FORMAT);
    s.push('\n');
    s.push_str(QUOTE_RULE);
    s.push_str("\nContent: ");
    s.push_str(chunk);
    s
}

/// Prompt for summarizing `content` of the document `name`.
pub fn build_summary_prompt(name: &str, content: &str, truncated: bool) -> String {
    let mut s = String::new();
    s.push_str(&format!(
        "Please provide a concise summary of the following document titled \"{name}\".\n\n"
    ));
    s.push_str("Focus on the main points, key insights, and overall purpose. Keep the summary clear and well-structured.\n\n");
    if truncated {
        s.push_str("Note: This document has been truncated due to length. Focus on summarizing the available content.\n\n");
    }
    s.push_str("Document content:\n");
    s.push_str(content);
    s.push_str("\n\nSummary:");
    s
}
