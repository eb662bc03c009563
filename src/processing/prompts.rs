//! Instructions sent alongside each remote call.

/// Instruction for summarizing a single chunk.
pub fn chunk_instruction(language: &str) -> String {
    format!(
        "You are an assistant that summarizes documents in {language}. Summarize the following \
         excerpt faithfully. Keep names, figures and dates. Do not add information that is not \
         in the text."
    )
}

/// Instruction for condensing the joined partial summaries.
pub fn reduce_instruction(language: &str) -> String {
    format!(
        "You are an assistant that produces concise summaries in {language}. The following text \
         joins summaries of consecutive parts of one document. Merge them into a single concise \
         summary without repeating points."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_name_target_language() {
        assert!(chunk_instruction("Spanish").contains("in Spanish"));
        assert!(reduce_instruction("English").contains("concise summaries in English"));
        assert_ne!(chunk_instruction("Spanish"), reduce_instruction("Spanish"));
    }
}
