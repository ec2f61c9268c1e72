//! Prompt templates.
//!
//! Templates carry `{code}`, `{original}` and `{optimized}` placeholders
//! that are substituted verbatim.

use optiloop_core::{AgentKind, CodeArtifact, StrategyAction};

const RUNTIME_PROMPT: &str = "You are an expert code optimizer specializing in runtime performance improvements.

Given the following Python code, optimize it to improve execution speed through:
- Better algorithms and data structures
- Eliminating redundant operations
- Reducing time complexity
- Using built-in functions efficiently
- Loop optimizations

Focus ONLY on runtime performance. Return ONLY the optimized code, no explanations.

Code to optimize:
{code}";

const MEMORY_PROMPT: &str = "You are an expert code optimizer specializing in memory efficiency.

Given the following Python code, optimize it to reduce memory usage through:
- Using generators instead of lists where possible
- In-place operations
- Memory-efficient data structures
- Reducing object creation
- Avoiding unnecessary copies

Focus ONLY on memory usage. Return ONLY the optimized code, no explanations.

Code to optimize:
{code}";

const READABILITY_PROMPT: &str = "You are an expert code optimizer specializing in code readability and maintainability.

Given the following Python code, refactor it to improve:
- Code structure and modularity
- Variable naming clarity
- Function decomposition
- Documentation and comments
- Overall maintainability

While maintaining the same functionality, make the code more readable and maintainable.
Return ONLY the refactored code, no explanations.

Code to optimize:
{code}";

const SCORING_PROMPT: &str = r#"Evaluate the following code optimization. Score it on:
1. Structural quality (0-1)
2. Safety (0-1) - no dangerous patterns
3. Maintainability (0-1)
4. Overall improvement (0-1)

Return ONLY a JSON object with scores:
{"structural": 0.8, "safety": 0.9, "maintainability": 0.7, "overall": 0.8}

Original code:
{original}

Optimized code:
{optimized}"#;

const REGRESSION_PROMPT: &str = r#"Check if the optimized code introduces regressions:
- Functionality changes
- Performance degradation patterns
- Security issues
- Breaking changes

Return ONLY "SAFE" or "UNSAFE" followed by a brief reason.

Original code:
{original}

Optimized code:
{optimized}"#;

/// Strategy prompts indexed by action; Stop has no prompt of its own.
const STRATEGY_PROMPTS: [&str; 6] = [
    "You are an expert code optimizer specializing in algorithmic improvements.
Given the following Python code, rewrite it to improve runtime performance through better algorithms, data structures, or algorithmic optimizations.
Focus on: reducing time complexity, using more efficient data structures, eliminating redundant operations.
Return ONLY the optimized code, no explanations.

Code to optimize:
{code}",
    "You are an expert code optimizer specializing in memory efficiency.
Given the following Python code, rewrite it to reduce memory usage.
Focus on: reducing object creation, using generators, in-place operations, memory-efficient data structures.
Return ONLY the optimized code, no explanations.

Code to optimize:
{code}",
    "You are an expert code optimizer specializing in in-place mutations.
Given the following Python code, rewrite it using in-place operations where possible to reduce memory allocations.
Focus on: modifying existing objects instead of creating new ones, using slice assignments, list comprehensions with in-place operations.
Return ONLY the optimized code, no explanations.

Code to optimize:
{code}",
    "You are an expert code optimizer specializing in recursion elimination.
Given the following Python code, rewrite it to convert recursion to iteration using stacks or loops.
Focus on: eliminating function call overhead, avoiding stack overflow, improving performance.
Return ONLY the optimized code, no explanations.

Code to optimize:
{code}",
    "You are an expert code optimizer specializing in vectorization.
Given the following Python code, rewrite it to use NumPy vectorization or list comprehensions to eliminate loops where possible.
Focus on: replacing explicit loops with vectorized operations, using NumPy arrays efficiently.
Return ONLY the optimized code, no explanations.

Code to optimize:
{code}",
    "You are an expert code optimizer with full creative freedom.
Given the following Python code, rewrite it using any optimization strategy you think will work best.
Consider all aspects: runtime, memory, readability, maintainability.
Return ONLY the optimized code, no explanations.

Code to optimize:
{code}",
];

/// Prompt for an agent family.
pub fn agent_prompt(kind: AgentKind, code: &CodeArtifact) -> String {
    let template = match kind {
        AgentKind::Runtime => RUNTIME_PROMPT,
        AgentKind::Memory => MEMORY_PROMPT,
        AgentKind::Readability => READABILITY_PROMPT,
    };
    template.replace("{code}", code.text())
}

/// Prompt for a strategy action. Stop uses the alternative-solution prompt.
pub fn strategy_prompt(action: StrategyAction, code: &CodeArtifact) -> String {
    let template = STRATEGY_PROMPTS
        .get(action.index())
        .copied()
        .unwrap_or(STRATEGY_PROMPTS[StrategyAction::AlternativeSolution.index()]);
    template.replace("{code}", code.text())
}

/// The critic's scoring and regression prompts, in that order.
pub fn critic_prompts(original: &CodeArtifact, optimized: &CodeArtifact) -> (String, String) {
    let fill = |template: &str| {
        template
            .replace("{original}", original.text())
            .replace("{optimized}", optimized.text())
    };
    (fill(SCORING_PROMPT), fill(REGRESSION_PROMPT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_prompts_embed_code() {
        let code = CodeArtifact::new("print(1)");
        for kind in AgentKind::ALL {
            let prompt = agent_prompt(kind, &code);
            assert!(prompt.ends_with("Code to optimize:\nprint(1)"));
        }
        assert!(agent_prompt(AgentKind::Memory, &code).contains("memory efficiency"));
    }

    #[test]
    fn test_stop_falls_back_to_alternative() {
        let code = CodeArtifact::new("x = 1");
        assert_eq!(
            strategy_prompt(StrategyAction::Stop, &code),
            strategy_prompt(StrategyAction::AlternativeSolution, &code)
        );
        assert!(strategy_prompt(StrategyAction::RecursionToIteration, &code)
            .contains("recursion elimination"));
    }

    #[test]
    fn test_critic_prompts() {
        let (scoring, regression) =
            critic_prompts(&CodeArtifact::new("a = 1"), &CodeArtifact::new("b = 2"));
        assert!(scoring.contains("\"structural\": 0.8"));
        assert!(scoring.contains("Original code:\na = 1"));
        assert!(regression.ends_with("Optimized code:\nb = 2"));
    }
}
