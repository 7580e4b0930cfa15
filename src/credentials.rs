/// API key held for the generation service
///
/// The key comes from the environment at startup or is pasted into the key
/// prompt. It lives in memory only and is dropped when the service rejects
/// it.
#[derive(Default, Clone)]
pub struct Credentials {
    api_key: Option<String>,
}

impl Credentials {
    pub fn new(api_key: Option<String>) -> Self {
        let mut credentials = Self::default();
        if let Some(key) = api_key {
            credentials.select(&key);
        }
        credentials
    }

    /// Whether a key has been selected
    pub fn has_selected(&self) -> bool {
        self.api_key.is_some()
    }

    /// Use `key` for subsequent requests. Blank input is ignored.
    pub fn select(&mut self, key: &str) -> bool {
        let key = key.trim();
        if key.is_empty() {
            return false;
        }
        self.api_key = Some(key.to_string());
        true
    }

    /// Forget the current key after the service rejected it
    pub fn invalidate(&mut self) {
        self.api_key = None;
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

// Never print the key itself
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("has_selected", &self.has_selected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_and_invalidate() {
        let mut credentials = Credentials::default();
        assert!(!credentials.has_selected());

        assert!(!credentials.select("   "));
        assert!(!credentials.has_selected());

        assert!(credentials.select(" abc "));
        assert_eq!(credentials.api_key(), Some("abc"));

        credentials.invalidate();
        assert!(credentials.api_key().is_none());
    }

    #[test]
    fn test_debug_hides_key() {
        let credentials = Credentials::new(Some("secret-key".into()));
        let printed = format!("{:?}", credentials);
        assert!(!printed.contains("secret-key"));
        assert!(printed.contains("has_selected: true"));
    }
}
