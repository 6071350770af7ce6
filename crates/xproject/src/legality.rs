//! Shapes of paths a setter may write to.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ConfigError;

/// `(/element)*` followed by an optional `/@attribute` or `/*`.
fn setter_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^((?:/[A-Za-z_][\w.-]*(?::[A-Za-z_][\w.-]*)?)*)",
            r"(?:/@([A-Za-z_][\w.-]*(?::[A-Za-z_][\w.-]*)?)|(/\*))?$",
        ))
        .unwrap()
    })
}

/// A resolved setter path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetterPath {
    /// `/*`: replace the root element of the document.
    RootElement,
    /// Element path, optionally ending in an attribute.
    Element {
        segments: Vec<String>,
        attribute: Option<String>,
    },
}

impl SetterPath {
    pub fn parse(path: &str) -> Result<Self, ConfigError> {
        let illegal = || ConfigError::IllegalSetterPath {
            path: path.to_string(),
        };
        let captures = setter_path_regex().captures(path).ok_or_else(illegal)?;
        let elements = captures.get(1).map_or("", |m| m.as_str());
        if captures.get(3).is_some() {
            // A wildcard only stands for the root element as a whole.
            return if elements.is_empty() {
                Ok(SetterPath::RootElement)
            } else {
                Err(illegal())
            };
        }
        let attribute = captures.get(2).map(|m| m.as_str().to_string());
        if elements.is_empty() && attribute.is_none() {
            return Err(illegal());
        }
        let segments = elements
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Ok(SetterPath::Element {
            segments,
            attribute,
        })
    }
}

pub fn is_legal_setter_path(path: &str) -> bool {
    SetterPath::parse(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_shapes() {
        assert_eq!(
            SetterPath::parse("/a"),
            Ok(SetterPath::Element {
                segments: vec!["a".to_string()],
                attribute: None
            })
        );
        assert_eq!(
            SetterPath::parse("/a/b/@x"),
            Ok(SetterPath::Element {
                segments: vec!["a".to_string(), "b".to_string()],
                attribute: Some("x".to_string())
            })
        );
        assert_eq!(SetterPath::parse("/*"), Ok(SetterPath::RootElement));
        assert!(is_legal_setter_path("/@id"));
        assert!(is_legal_setter_path("/ns:a/b-c/d.e"));
    }

    #[test]
    fn test_rejected_shapes() {
        for path in [
            "", "/", "/a[1]", "a/b", "//a", "/a/*", "/a/@x/b", "/a/@x/@y", "/a/text()",
            "/child::a", "/a/../b", "/a/@*",
        ] {
            assert_eq!(
                SetterPath::parse(path),
                Err(ConfigError::IllegalSetterPath {
                    path: path.to_string()
                }),
                "{path:?} should be rejected"
            );
        }
    }
}
