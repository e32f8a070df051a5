/// Compilation options.
///
/// Mirrors the JSON shape accepted on the command line:
/// `{"discriminator": true}`, `{"discriminator": false}` or
/// `{"discriminator": {"strict": false}}`.
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    pub discriminator: DiscriminatorOption,
}

/// Controls the `discriminator` keyword.
///
/// `Enabled(true)` and `Configured { strict: true }` reject an author
/// supplied `mapping`; `Configured { strict: false }` tolerates it (the
/// mapping is still derived from the alternatives). `Enabled(false)` turns
/// the keyword off entirely and leaves `oneOf` with its plain semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DiscriminatorOption {
    Enabled(bool),
    Configured { strict: bool },
}

impl Default for DiscriminatorOption {
    fn default() -> Self {
        DiscriminatorOption::Enabled(true)
    }
}

impl DiscriminatorOption {
    pub fn is_enabled(&self) -> bool {
        match self {
            DiscriminatorOption::Enabled(enabled) => *enabled,
            DiscriminatorOption::Configured { .. } => true,
        }
    }

    /// Whether an author-supplied `mapping` is a compile error.
    pub fn strict_mapping(&self) -> bool {
        match self {
            DiscriminatorOption::Enabled(_) => true,
            DiscriminatorOption::Configured { strict } => *strict,
        }
    }
}

impl CompileOptions {
    pub fn without_discriminator() -> Self {
        Self {
            discriminator: DiscriminatorOption::Enabled(false),
        }
    }

    pub fn lenient_mapping() -> Self {
        Self {
            discriminator: DiscriminatorOption::Configured { strict: false },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_is_strict() {
        let opts = CompileOptions::default();
        assert!(opts.discriminator.is_enabled());
        assert!(opts.discriminator.strict_mapping());
    }

    #[test]
    fn test_parse_bool() {
        let opts: CompileOptions = serde_json::from_value(json!({"discriminator": false})).unwrap();
        assert!(!opts.discriminator.is_enabled());
    }

    #[test]
    fn test_parse_object() {
        let opts: CompileOptions =
            serde_json::from_value(json!({"discriminator": {"strict": false}})).unwrap();
        assert!(opts.discriminator.is_enabled());
        assert!(!opts.discriminator.strict_mapping());
        assert_eq!(opts, CompileOptions::lenient_mapping());
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let opts: CompileOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(opts, CompileOptions::default());
    }
}
