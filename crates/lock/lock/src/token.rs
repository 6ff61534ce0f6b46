use uuid::Uuid;

/// Source of ownership tokens.
///
/// A token only has to be unique across every concurrent acquisition of
/// every key; it identifies the acquisition, not the caller.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random UUID v4 tokens (122 random bits), hyphenated.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidTokens;

impl TokenGenerator for UuidTokens {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn uuid_tokens_are_hyphenated_v4() {
        let token = UuidTokens.generate();
        let parsed = Uuid::parse_str(&token).expect("token should parse as uuid");
        assert_eq!(parsed.get_version_num(), 4);
        assert_eq!(token.len(), 36);
    }

    #[test]
    fn uuid_tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..10_000).map(|_| UuidTokens.generate()).collect();
        assert_eq!(tokens.len(), 10_000);
    }
}
