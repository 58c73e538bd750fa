//! Grounded prompt construction

/// Build the prompt that restricts the model to the numbered sources.
///
/// Sources are labelled `Source 1`, `Source 2`, ... in the order given.
pub fn build_prompt<S: AsRef<str>>(query: &str, sources: &[S]) -> String {
    let context = sources
        .iter()
        .enumerate()
        .map(|(i, source)| format!("Source {}: {}", i + 1, source.as_ref()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are an AI assistant. Use ONLY the following sources to answer the user's question.\n\n\
         {}\n\n\
         User question: {}\n\n\
         Answer (cite sources as Source 1, Source 2, etc. if used):",
        context, query
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_numbered_from_one_in_order() {
        let prompt = build_prompt("Who barked?", &["The cat sat.", "The dog barked."]);

        let first = prompt.find("Source 1: The cat sat.").unwrap();
        let second = prompt.find("Source 2: The dog barked.").unwrap();
        assert!(first < second);
        assert!(prompt.contains("User question: Who barked?"));
        assert!(prompt.starts_with("You are an AI assistant. Use ONLY the following sources"));
        assert!(prompt.ends_with("Answer (cite sources as Source 1, Source 2, etc. if used):"));
    }

    #[test]
    fn test_query_is_verbatim() {
        let query = "  What does \"Source 9\" mean?\n";
        let prompt = build_prompt(query, &["x"]);
        assert!(prompt.contains(&format!("User question: {}\n\n", query)));
    }
}
