//! Servlet-style URL patterns deciding which requests a filter sees.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Where a filter applies.
///
/// | Pattern      | Matches                                   |
/// |--------------|-------------------------------------------|
/// | `/*`         | every path                                |
/// | `/admin/*`   | `/admin` and anything below it            |
/// | `*.do`       | paths whose last segment ends in `.do`    |
/// | `/login`     | exactly `/login`                          |
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum UrlPattern {
    #[default]
    All,
    Prefix(String),
    Extension(String),
    Exact(String),
}

impl UrlPattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::All => true,
            Self::Prefix(prefix) => {
                path.strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            }
            Self::Extension(ext) => {
                let last = path.rsplit('/').next().unwrap_or(path);
                last.strip_suffix(ext.as_str())
                    .is_some_and(|stem| stem.ends_with('.'))
            }
            Self::Exact(exact) => path == exact,
        }
    }
}

impl FromStr for UrlPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "/*" {
            return Ok(Self::All);
        }
        if let Some(ext) = s.strip_prefix("*.") {
            if !ext.is_empty() && !ext.contains('/') {
                return Ok(Self::Extension(ext.to_owned()));
            }
        } else if let Some(prefix) = s.strip_suffix("/*") {
            if prefix.starts_with('/') && !prefix.contains('*') {
                return Ok(Self::Prefix(prefix.to_owned()));
            }
        } else if s.starts_with('/') && !s.contains('*') {
            return Ok(Self::Exact(s.to_owned()));
        }
        Err(Error::InvalidPattern(s.to_owned()))
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("/*"),
            Self::Prefix(prefix) => write!(f, "{prefix}/*"),
            Self::Extension(ext) => write!(f, "*.{ext}"),
            Self::Exact(exact) => f.write_str(exact),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(s: &str) -> UrlPattern {
        s.parse().unwrap()
    }

    #[test]
    fn parses_each_form() {
        assert_eq!(pattern("/*"), UrlPattern::All);
        assert_eq!(pattern("/admin/*"), UrlPattern::Prefix("/admin".into()));
        assert_eq!(pattern("*.do"), UrlPattern::Extension("do".into()));
        assert_eq!(pattern("/login"), UrlPattern::Exact("/login".into()));
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "admin", "*.", "/a/*/b", "*.a/b"] {
            assert!(bad.parse::<UrlPattern>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn prefix_matches_on_segment_boundary() {
        let admin = pattern("/admin/*");
        assert!(admin.matches("/admin"));
        assert!(admin.matches("/admin/users"));
        assert!(!admin.matches("/administrator"));
    }

    #[test]
    fn extension_matches_last_segment() {
        let action = pattern("*.do");
        assert!(action.matches("/app/save.do"));
        assert!(!action.matches("/app.do/save"));
        assert!(!action.matches("/app/savedo"));
    }

    #[test]
    fn display_round_trips() {
        for s in ["/*", "/admin/*", "*.do", "/login"] {
            assert_eq!(pattern(s).to_string(), s);
        }
    }
}
