use std::collections::HashMap;
use std::fmt::Display;

use zen_errors::Result;

use crate::errors::InvalidSpecifier;

/// Leading symbol of a version, which loosens an exact version into a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeSymbol {
    /// `*`, matches any version.
    Any,

    /// `^`, matches compatible versions.
    Caret,

    /// `~`, matches patch-level changes.
    Tilde,
}

impl RangeSymbol {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '*' => Some(RangeSymbol::Any),
            '^' => Some(RangeSymbol::Caret),
            '~' => Some(RangeSymbol::Tilde),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            RangeSymbol::Any => '*',
            RangeSymbol::Caret => '^',
            RangeSymbol::Tilde => '~',
        }
    }
}

/// A parsed package reference, such as `@org/abc@^1.3.9`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Specifier {
    /// Organization segment, including its leading `@` when present.
    pub organization: Option<String>,

    /// Package name, without organization.
    pub name: String,

    /// `organization/name`, or just `name`.
    pub full_name: String,

    /// Version without its range symbol.
    pub version: Option<String>,

    pub range_symbol: Option<RangeSymbol>,

    /// Version with its range symbol, defaulting to `^` when the
    /// specifier didn't state one.
    pub version_with_symbol: Option<String>,
}

impl Specifier {
    /// Parses the given package reference.
    ///
    /// The input is split on `/` to find the organization, then on `@` to find
    /// the version. A leading `*`, `^` or `~` of the version is taken as its
    /// range symbol.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the name segment of the reference is empty.
    pub fn parse(input: &str) -> Result<Self> {
        let mut segments = input.split('/');
        let first = segments.next().unwrap_or_default();

        let (organization, package) = match segments.next() {
            Some(second) if !second.is_empty() => (Some(first), second),
            _ => (None, first),
        };

        let mut parts = package.split('@');
        let name = parts.next().unwrap_or_default();

        if name.is_empty() {
            return Err(InvalidSpecifier {
                input: input.to_string(),
            }
            .into());
        }

        let mut version = parts.next().unwrap_or_default();
        let mut range_symbol = None;

        if let Some(symbol) = version.chars().next().and_then(RangeSymbol::from_char) {
            range_symbol = Some(symbol);
            version = &version[1..];
        }

        let version = (!version.is_empty()).then(|| version.to_string());

        let version_with_symbol = version.as_ref().map(|version| {
            let symbol = range_symbol.unwrap_or(RangeSymbol::Caret);

            format!("{}{version}", symbol.as_char())
        });

        let full_name = match organization {
            Some(organization) => format!("{organization}/{name}"),
            None => name.to_string(),
        };

        Ok(Specifier {
            organization: organization.map(String::from),
            name: name.to_string(),
            full_name,
            version,
            range_symbol,
            version_with_symbol,
        })
    }

    /// Gets the name under which this package is published, which is the
    /// full name and bare version, joined by `@`.
    pub fn publishable_name(&self) -> String {
        format!("{}@{}", self.full_name, self.version.as_deref().unwrap_or_default())
    }
}

impl Display for Specifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full_name)?;

        if self.version.is_none() && self.range_symbol.is_none() {
            return Ok(());
        }

        f.write_str("@")?;

        if let Some(symbol) = self.range_symbol {
            write!(f, "{}", symbol.as_char())?;
        }

        f.write_str(self.version.as_deref().unwrap_or_default())
    }
}

/// Memoizes parsed specifiers by their exact input string.
///
/// A cache lives exactly as long as the [`crate::Session`] which owns it.
#[derive(Default, Debug)]
pub struct SpecifierCache {
    parsed: HashMap<String, Specifier>,
}

impl SpecifierCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the given package reference, reusing an earlier result for
    /// the same input.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the name segment of the reference is empty.
    pub fn parse(&mut self, input: &str) -> Result<Specifier> {
        if let Some(specifier) = self.parsed.get(input) {
            return Ok(specifier.clone());
        }

        let specifier = Specifier::parse(input)?;
        self.parsed.insert(input.to_string(), specifier.clone());

        Ok(specifier)
    }

    /// Renders the publishable name of `name` at `version`, stripping any range
    /// symbol from the version.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `name` is not a valid package name.
    pub fn publishable_name(&mut self, name: &str, version: &str) -> Result<String> {
        Ok(self.parse(&format!("{name}@{version}"))?.publishable_name())
    }

    pub fn len(&self) -> usize {
        self.parsed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn parse(input: &str) -> Specifier {
        Specifier::parse(input).unwrap()
    }

    #[test]
    fn parse_plain_name() {
        let spec = parse("left-pad");

        assert_eq!(spec.organization, None);
        assert_eq!(spec.name, "left-pad");
        assert_eq!(spec.full_name, "left-pad");
        assert_eq!(spec.version, None);
        assert_eq!(spec.range_symbol, None);
        assert_eq!(spec.version_with_symbol, None);
    }

    #[test]
    fn parse_organization_and_version() {
        let spec = parse("@org/abc@1.3.9");

        assert_eq!(spec.organization.as_deref(), Some("@org"));
        assert_eq!(spec.name, "abc");
        assert_eq!(spec.full_name, "@org/abc");
        assert_eq!(spec.version.as_deref(), Some("1.3.9"));
        assert_eq!(spec.range_symbol, None);
        assert_eq!(spec.version_with_symbol.as_deref(), Some("^1.3.9"));
    }

    #[test]
    fn parse_range_symbols() {
        let tilde = parse("abc@~2.0.1");
        assert_eq!(tilde.range_symbol, Some(RangeSymbol::Tilde));
        assert_eq!(tilde.version.as_deref(), Some("2.0.1"));
        assert_eq!(tilde.version_with_symbol.as_deref(), Some("~2.0.1"));

        let any = parse("abc@*");
        assert_eq!(any.range_symbol, Some(RangeSymbol::Any));
        assert_eq!(any.version, None);
        assert_eq!(any.version_with_symbol, None);
    }

    #[test]
    fn parse_empty_version() {
        let spec = parse("abc@");

        assert_eq!(spec.version, None);
        assert_eq!(spec.version_with_symbol, None);
    }

    #[test]
    fn parse_rejects_empty_names() {
        assert!(Specifier::parse("").is_err());
        assert!(Specifier::parse("@1.0.0").is_err());
        assert!(Specifier::parse("@org/").is_err());
        assert!(Specifier::parse("@org/@1.0.0").is_err());
    }

    #[test]
    fn display_is_canonical() {
        insta::assert_snapshot!(parse("@org/abc@^1.3.9").to_string(), @"@org/abc@^1.3.9");
        insta::assert_snapshot!(parse("@org/abc@1.3.9").to_string(), @"@org/abc@1.3.9");
        insta::assert_snapshot!(parse("abc@*").to_string(), @"abc@*");
        insta::assert_snapshot!(parse("abc@").to_string(), @"abc");
    }

    #[test]
    fn reparsing_display_is_stable() {
        for input in ["abc", "abc@1.0.0", "@org/abc@~1.2", "abc@*", "abc@", "x/y/z@^3"] {
            let spec = parse(input);

            assert_eq!(parse(&spec.to_string()), spec, "unstable specifier `{input}`");
        }
    }

    #[test]
    fn publishable_name_strips_symbols() {
        let mut cache = SpecifierCache::new();

        assert_eq!(cache.publishable_name("@org/abc", "^1.3.9").unwrap(), "@org/abc@1.3.9");
        assert_eq!(cache.publishable_name("abc", "~0.1.0").unwrap(), "abc@0.1.0");
        assert_eq!(cache.publishable_name("abc", "2.0.0").unwrap(), "abc@2.0.0");
    }

    #[test]
    fn cache_memoizes_inputs() {
        let mut cache = SpecifierCache::new();

        let first = cache.parse("abc@1.0.0").unwrap();
        let second = cache.parse("abc@1.0.0").unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);

        cache.parse("abc@2.0.0").unwrap();
        assert_eq!(cache.len(), 2);
    }
}
