//! Prompt assembly: combines the fixed system/role framing with a
//! (possibly truncated) contract source, retrieved RAG context, and the
//! concrete task for the model to perform, into the single string every
//! [`crate::backend::LlmBackend`] receives.

/// Assembles prompts from a system prompt, a role prompt, contract source,
/// a rendered RAG context block, and a task description.
///
/// Truncation is line-aware: when the source exceeds the configured token
/// budget, whole `function`/`contract`/`library`/`modifier` bodies are
/// dropped from the middle rather than cutting mid-statement, so whatever
/// survives still parses as a sequence of complete declarations.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    /// Rough token budget for the embedded contract source. Approximated
    /// as `chars / 4`, matching the rule of thumb most chat-completion
    /// providers document for English/Solidity-like source text.
    max_source_tokens: usize,
}

impl PromptAssembler {
    #[must_use]
    pub fn new(max_source_tokens: usize) -> Self {
        Self { max_source_tokens }
    }

    #[must_use]
    pub fn assemble(
        &self,
        system_prompt: &str,
        role_prompt: &str,
        contract_source: &str,
        rag_context_block: &str,
        task: &str,
    ) -> String {
        let source = self.truncate_preserving_boundaries(contract_source);
        let mut sections = Vec::with_capacity(5);
        sections.push(system_prompt.trim().to_string());
        sections.push(role_prompt.trim().to_string());
        if !rag_context_block.trim().is_empty() {
            sections.push(format!("## Relevant context\n{}", rag_context_block.trim()));
        }
        sections.push(format!("## Contract source\n```solidity\n{source}\n```"));
        sections.push(format!("## Task\n{}", task.trim()));
        sections.join("\n\n")
    }

    /// Returns `source` unchanged if it already fits the token budget,
    /// otherwise drops whole top-level declarations from the middle,
    /// keeping the boundary markers readable so the model can see where
    /// material was elided.
    fn truncate_preserving_boundaries(&self, source: &str) -> String {
        if Self::approx_tokens(source) <= self.max_source_tokens {
            return source.to_string();
        }

        let blocks = split_into_declaration_blocks(source);
        if blocks.len() <= 1 {
            // No boundary to cut on; fall back to a hard line truncation.
            return Self::hard_truncate(source, self.max_source_tokens);
        }

        let mut kept = Vec::new();
        let mut budget = self.max_source_tokens;
        let mut dropped = 0usize;
        for block in blocks {
            let cost = Self::approx_tokens(&block);
            if cost <= budget {
                budget -= cost;
                kept.push(block);
            } else {
                dropped += 1;
            }
        }

        let mut result = kept.join("\n");
        if dropped > 0 {
            result.push_str(&format!(
                "\n// ... {dropped} declaration(s) elided to fit the context budget\n"
            ));
        }
        result
    }

    fn hard_truncate(source: &str, max_tokens: usize) -> String {
        let max_chars = max_tokens.saturating_mul(4);
        if source.len() <= max_chars {
            return source.to_string();
        }
        let mut truncated: String = source.chars().take(max_chars).collect();
        truncated.push_str("\n// ... truncated to fit the context budget\n");
        truncated
    }

    fn approx_tokens(text: &str) -> usize {
        text.len().div_ceil(4)
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        // ~6000 tokens of source, leaving headroom for system/role/RAG/task
        // text within a typical 8k-16k context window.
        Self::new(6000)
    }
}

const BOUNDARY_KEYWORDS: &[&str] = &["function", "contract", "library", "modifier"];

/// Splits `source` into chunks, each chunk starting at a line that begins
/// (ignoring leading whitespace and visibility/mutability modifiers) with
/// one of [`BOUNDARY_KEYWORDS`]. Lines before the first boundary (pragma,
/// imports, comments) form their own leading chunk.
fn split_into_declaration_blocks(source: &str) -> Vec<String> {
    let mut blocks: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in source.lines() {
        if is_boundary_line(line) && !current.is_empty() {
            blocks.push(std::mem::take(&mut current));
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn is_boundary_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    BOUNDARY_KEYWORDS
        .iter()
        .any(|kw| trimmed.starts_with(kw) && trimmed[kw.len()..].starts_with(|c: char| c == ' ' || c == '('))
}
