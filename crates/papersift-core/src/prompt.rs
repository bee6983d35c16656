//! Prompt construction for query generation, verbose queries, and summaries.

use crate::char_prefix;

/// Whether a subject / paper-type selector value means "no preference".
fn is_unset(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => v.trim().is_empty() || v == "all",
    }
}

/// Describe the user's input: topic, optional notes, and (a prefix of) the
/// text extracted from uploaded documents.
pub fn context_block(
    topic: &str,
    notes: Option<&str>,
    extracted_text: Option<&str>,
    text_budget: usize,
    document_label: &str,
) -> String {
    let mut context = format!("User's main topic/question: \"{}\"\n", topic);
    if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
        context.push_str(&format!("Additional notes/context from user: \"{}\"\n", notes));
    }
    if let Some(text) = extracted_text.filter(|t| !t.trim().is_empty()) {
        context.push_str(&format!(
            "{}:\n---\n{}\n---\n",
            document_label,
            char_prefix(text, text_budget)
        ));
    }
    context
}

/// Subject guidance, including arXiv category syntax for math and CS.
pub fn subject_hint(subject: Option<&str>) -> String {
    if is_unset(subject) {
        return String::new();
    }
    let subject = subject.unwrap_or_default();
    let mut hint = format!(
        "The user is particularly interested in the academic subject area of: {}. ",
        subject
    );
    let lower = subject.to_lowercase();
    if lower.contains("math") {
        hint.push_str(
            "For ArXiv, relevant categories might be 'math.XX' (e.g., 'math.NT' for Number Theory, \
             'math.CO' for Combinatorics), 'stat.TH' (Statistics Theory), etc. \
             Queries can use 'cat:math.XX AND (term OR term)'. ",
        );
    } else if lower.contains("computer science")
        || lower.split(|c: char| !c.is_alphanumeric()).any(|w| w == "cs")
    {
        hint.push_str(
            "For ArXiv, relevant categories might be 'cs.XX' (e.g., 'cs.AI' for AI, \
             'cs.LG' for Machine Learning). ",
        );
    }
    hint
}

pub fn paper_type_hint(paper_type: Option<&str>) -> String {
    if is_unset(paper_type) {
        return String::new();
    }
    format!(
        "The user is looking for papers that are primarily of type: {}. ",
        paper_type.unwrap_or_default()
    )
}

/// Prompt asking for a JSON array of 3-5 search queries.
pub fn query_prompt(context: &str, subject_hint: &str, paper_type_hint: &str) -> String {
    format!(
        r#"
You are an expert research assistant. Your task is to generate highly effective search queries for academic databases like ArXiv and Google Scholar, based on the user's input.
The user's input might include a main topic, additional notes, and text extracted from documents (like lecture notes, research papers, or book pages).

User-provided information:
{context}

Specific interests:
{subject_hint}
{paper_type_hint}

Instructions:
1.  Analyze all the provided information to understand the core research area, key concepts, specific problems, relevant formalisms or algorithms, and important authors or seminal works mentioned.
2.  Generate 3-5 DIVERSE and PRECISE search queries, the way an expert researcher would type them into a search bar.
3.  For ArXiv:
    *   Use field codes where appropriate (e.g., 'ti:(title terms)', 'au:(author name)', 'abs:(abstract terms)', 'cat:(category e.g., math.NT or cs.AI)').
    *   Combine terms with boolean operators (AND, OR, NOT). Example: "cat:math.PR AND ti:(stochastic processes) AND (markov chains OR random walks)"
4.  For Google Scholar and general academic search:
    *   Use boolean operators (AND, OR, NOT).
    *   Use exact phrases in double quotes (e.g., "deep learning for theorem proving").
    *   Consider operators like 'author:"J Doe"' or 'source:"Nature"'.
5.  If the input text is technical, extract specific terminology, method names, or distinctive phrases as search terms.
6.  Focus on precision. Avoid overly broad queries.
7.  Optimize the queries for mathematical papers if the context or subject strongly suggests it.

Output Format:
Return ONLY a JSON array of strings, where each string is a distinct search query. Do not include any other text or explanations.
Example: ["ti:(quantum field theory) AND cat:hep-th", "gravitational waves ligo virgo", "author:\"Witten E\" string theory"]
"#
    )
}

/// Prompt asking for one descriptive paragraph, used for BM25 scoring downstream.
pub fn verbose_prompt(context: &str, subject_hint: &str) -> String {
    format!(
        r#"
You are an expert research analyst. Your task is to write a **single, detailed, verbose paragraph** that synthesizes all the provided user input (topic, notes, document excerpts) into a rich description of the ideal research paper or information the user is seeking.

User-provided information:
{context}
{subject_hint}

Instructions:
1.  Read and understand all the provided context.
2.  DO NOT generate search queries.
3.  Write one coherent paragraph (around 100-250 words) covering the key concepts, research questions, methodologies, specific terminology, and desired outcomes.
4.  The paragraph will be compared against paper abstracts by a BM25 relevance scorer, so it should be rich in relevant keywords, phrases, and conceptual descriptions.
5.  Describe any mathematical concepts in words.
6.  It should read like a person describing their precise research interest in detail.

Output:
Return ONLY the paragraph as plain text. No titles, lists, or formatting.
"#
    )
}

/// Subject guidance for the verbose prompt (no arXiv syntax).
pub fn verbose_subject_hint(subject: Option<&str>) -> String {
    if is_unset(subject) {
        return String::new();
    }
    format!(
        "The user's primary subject focus is: {}. ",
        subject.unwrap_or_default()
    )
}

/// Prompt the model server wraps around a bare abstract.
pub fn summary_prompt(abstract_text: &str) -> String {
    format!(
        "Summarize the following research paper abstract concisely. Provide only the summary, \
         no additional text or explanation:\n\nAbstract: \"{}\"\n\nSummary:",
        abstract_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_skips_blank_notes_and_text() {
        let c = context_block("graph neural networks", Some("  "), Some(""), 4000, "Docs");
        assert_eq!(c, "User's main topic/question: \"graph neural networks\"\n");
    }

    #[test]
    fn context_truncates_document_text_to_budget() {
        let text = "x".repeat(5000);
        let c = context_block("t", None, Some(&text), 4000, "Docs");
        assert_eq!(c.matches('x').count(), 4000);
        assert!(c.contains("Docs:\n---\n"));
    }

    #[test]
    fn subject_all_gives_no_hint() {
        assert_eq!(subject_hint(Some("all")), "");
        assert_eq!(subject_hint(None), "");
        assert_eq!(paper_type_hint(Some("all")), "");
    }

    #[test]
    fn math_subject_mentions_arxiv_math_categories() {
        let h = subject_hint(Some("Mathematics"));
        assert!(h.starts_with("The user is particularly interested in the academic subject area of: Mathematics."));
        assert!(h.contains("math.NT"));
        assert!(!h.contains("cs.LG"));
    }

    #[test]
    fn cs_subject_mentions_arxiv_cs_categories() {
        let h = subject_hint(Some("Computer Science"));
        assert!(h.contains("cs.AI"));
        assert!(subject_hint(Some("cs.LG")).contains("cs.AI"));
        assert!(!subject_hint(Some("Physics")).contains("cs.AI"));
    }

    #[test]
    fn query_prompt_embeds_context_and_hints() {
        let p = query_prompt("CONTEXT", "SUBJECT", "TYPE");
        assert!(p.contains("CONTEXT"));
        assert!(p.contains("SUBJECT"));
        assert!(p.contains("TYPE"));
        assert!(p.contains("Return ONLY a JSON array of strings"));
    }

    #[test]
    fn summary_prompt_quotes_abstract() {
        assert!(summary_prompt("We study X.").contains("Abstract: \"We study X.\""));
    }
}
