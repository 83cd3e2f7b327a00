//! Isolate the generated query from the surrounding completion text.
//!
//! The generation contract asks for exactly one fenced block. The extractor
//! counts fence delimiters and refuses anything but an exactly-two count:
//! zero, one, or more than two delimiters is a malformed completion, never a
//! silently degenerate span.

use crate::domain::error::{AppError, Result};

const FENCE: &str = "```";

/// Extract the body of the single fenced code block in `completion`, with
/// the language tag on the opening fence line stripped.
pub fn extract(completion: &str) -> Result<String> {
    let delimiters: Vec<usize> = completion.match_indices(FENCE).map(|(i, _)| i).collect();

    match delimiters.len() {
        0 => Err(AppError::ParseError(
            "Completion contains no fenced code block".to_string(),
        )),
        2 => {
            let inner = &completion[delimiters[0] + FENCE.len()..delimiters[1]];
            let body = strip_language_tag(inner).trim();
            if body.is_empty() {
                return Err(AppError::ParseError(
                    "Fenced code block is empty".to_string(),
                ));
            }
            Ok(body.to_string())
        }
        count => Err(AppError::ParseError(format!(
            "Expected exactly one fenced code block, found {} fence delimiters",
            count
        ))),
    }
}

/// Drop the opening fence's language tag line (e.g. `sql`) when present.
fn strip_language_tag(block: &str) -> &str {
    if let Some(newline) = block.find('\n') {
        let first_line = block[..newline].trim();
        let is_tag = !first_line.is_empty()
            && first_line
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '+' || c == '-');
        if is_tag {
            return &block[newline + 1..];
        }
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY: &str = "SELECT o.order_id\nFROM orders AS o\nWHERE o.order_status = 'canceled'";

    #[test]
    fn test_extracts_span_between_two_delimiters() {
        let completion = format!(
            "Here is the query you asked for:\n\n```sql\n{}\n```\nLet me know if it helps.",
            QUERY
        );
        assert_eq!(extract(&completion).unwrap(), QUERY);
    }

    #[test]
    fn test_strips_language_tag_only() {
        let completion = format!("```\n{}\n```", QUERY);
        assert_eq!(extract(&completion).unwrap(), QUERY);
    }

    #[test]
    fn test_zero_delimiters_is_an_error() {
        let err = extract("Sorry, I cannot generate a query for that request.").unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
    }

    #[test]
    fn test_one_delimiter_is_an_error() {
        let completion = format!("```sql\n{}", QUERY);
        let err = extract(&completion).unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
    }

    #[test]
    fn test_multiple_blocks_are_an_error() {
        let completion = format!("```sql\n{}\n```\nor alternatively\n```sql\nSELECT 1\n```", QUERY);
        let err = extract(&completion).unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
    }

    #[test]
    fn test_empty_block_is_an_error() {
        assert!(extract("```sql\n\n```").is_err());
    }

    #[test]
    fn test_idempotent_on_refenced_output() {
        let completion = format!("```sql\n{}\n```", QUERY);
        let first = extract(&completion).unwrap();
        let refenced = format!("```sql\n{}\n```", first);
        assert_eq!(extract(&refenced).unwrap(), first);
    }
}
