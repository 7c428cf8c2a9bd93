use crate::error::{BuildError, Result};

/// Number of leading hex characters used in pod names, image tags and
/// storage keys.
const SHORT_LEN: usize = 8;

/// A validated full git commit identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSha {
    full: String,
}

impl GitSha {
    /// Accepts exactly 40 lowercase hex characters.
    pub fn new(raw: &str) -> Result<Self> {
        if raw.len() != 40 || !raw.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        {
            return Err(BuildError::ConfigInvalid(format!(
                "'{}' is not a full git sha",
                raw
            )));
        }
        Ok(Self {
            full: raw.to_string(),
        })
    }

    pub fn full(&self) -> &str {
        &self.full
    }

    /// The 8-hex short form used in every external name.
    pub fn short(&self) -> &str {
        &self.full[..SHORT_LEN]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "abc12345def67890abc12345def67890abc12345";

    #[test]
    fn accepts_full_sha_and_derives_short_form() {
        let sha = GitSha::new(SHA).unwrap();
        assert_eq!(sha.full(), SHA);
        assert_eq!(sha.short(), "abc12345");
        assert_eq!(sha.short().len(), 8);
    }

    #[test]
    fn rejects_short_input() {
        assert!(GitSha::new("abc12345").is_err());
        assert!(GitSha::new(&SHA[..39]).is_err());
    }

    #[test]
    fn rejects_non_hex_and_uppercase() {
        assert!(GitSha::new("zbc12345def67890abc12345def67890abc12345").is_err());
        assert!(GitSha::new("ABC12345DEF67890ABC12345DEF67890ABC12345").is_err());
    }
}
