//! Token counting.

/// Counts tokens attributable to a piece of text.
///
/// The relay consults this when an upstream's usage figures are missing or
/// untrustworthy and completion tokens must be recomputed from the response
/// text. Implementations must be cheap enough to call per request.
pub trait TokenCounter: Send + Sync {
    /// Count the tokens of `text` as `model` would tokenize it.
    fn count(&self, text: &str, model: &str) -> u32;
}

/// Character-based token estimator.
///
/// Rough token estimate: ~4 chars per token. Good enough for billing
/// fallback when no tokenizer for the model is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn count(&self, text: &str, _model: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }
        (text.len() / 4).max(1) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_counts_zero() {
        assert_eq!(HeuristicTokenCounter.count("", "gpt-4"), 0);
    }

    #[test]
    fn test_short_text_counts_at_least_one() {
        assert_eq!(HeuristicTokenCounter.count("hi", "gpt-4"), 1);
    }

    #[test]
    fn test_heuristic_scales_with_length() {
        assert_eq!(HeuristicTokenCounter.count("abcdefgh", "gpt-4"), 2);
        assert_eq!(HeuristicTokenCounter.count(&"x".repeat(400), "gpt-4"), 100);
    }
}
