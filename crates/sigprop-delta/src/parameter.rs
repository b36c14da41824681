//! Parameter and exception entries of a delta

use serde::{Deserialize, Serialize};

/// One entry of the new parameter list
///
/// `old_index` is the position in the old parameter list this entry
/// corresponds to, or `None` for a brand-new parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDelta {
    name: String,
    type_text: String,
    default_value: Option<String>,
    old_index: Option<usize>,
    use_any_single_variable: bool,
}

impl ParameterDelta {
    /// Parameter mapped to old position `old_index`
    #[inline]
    #[must_use]
    pub fn existing(old_index: usize, name: impl Into<String>, type_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_text: type_text.into(),
            default_value: None,
            old_index: Some(old_index),
            use_any_single_variable: false,
        }
    }

    /// Brand-new parameter
    #[inline]
    #[must_use]
    pub fn added(name: impl Into<String>, type_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_text: type_text.into(),
            default_value: None,
            old_index: None,
            use_any_single_variable: false,
        }
    }

    /// With default value expression used at call sites
    #[inline]
    #[must_use]
    pub fn with_default(mut self, expression: impl Into<String>) -> Self {
        self.default_value = Some(expression.into());
        self
    }

    /// With single-variable substitution at call sites
    #[inline]
    #[must_use]
    pub fn with_any_single_variable(mut self, enabled: bool) -> Self {
        self.use_any_single_variable = enabled;
        self
    }

    /// Parameter name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type text
    #[inline]
    #[must_use]
    pub fn type_text(&self) -> &str {
        &self.type_text
    }

    /// Default value expression
    #[inline]
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Old position, `None` when new
    #[inline]
    #[must_use]
    pub fn old_index(&self) -> Option<usize> {
        self.old_index
    }

    /// Whether this parameter did not exist before
    #[inline]
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.old_index.is_none()
    }

    /// Whether call sites may substitute a unique visible variable
    #[inline]
    #[must_use]
    pub fn use_any_single_variable(&self) -> bool {
        self.use_any_single_variable
    }

    /// Whether the type is variadic (`T...`)
    #[inline]
    #[must_use]
    pub fn is_vararg(&self) -> bool {
        self.type_text.ends_with("...")
    }

    /// Type text with `...` spelled as an array (`T[]`)
    #[must_use]
    pub fn array_type_text(&self) -> String {
        match self.type_text.strip_suffix("...") {
            Some(element) => format!("{element}[]"),
            None => self.type_text.clone(),
        }
    }
}

/// One entry of the new thrown-exception list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionDelta {
    type_text: String,
    old_index: Option<usize>,
}

impl ExceptionDelta {
    /// Exception kept from old position `old_index`
    #[inline]
    #[must_use]
    pub fn existing(old_index: usize, type_text: impl Into<String>) -> Self {
        Self {
            type_text: type_text.into(),
            old_index: Some(old_index),
        }
    }

    /// Newly declared exception
    #[inline]
    #[must_use]
    pub fn added(type_text: impl Into<String>) -> Self {
        Self {
            type_text: type_text.into(),
            old_index: None,
        }
    }

    /// Exception type text
    #[inline]
    #[must_use]
    pub fn type_text(&self) -> &str {
        &self.type_text
    }

    /// Old position, `None` when new
    #[inline]
    #[must_use]
    pub fn old_index(&self) -> Option<usize> {
        self.old_index
    }

    /// Whether this exception was not declared before
    #[inline]
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.old_index.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_type_text() {
        assert_eq!(ParameterDelta::added("xs", "int...").array_type_text(), "int[]");
        assert_eq!(ParameterDelta::added("xs", "int[]").array_type_text(), "int[]");
    }

    #[test]
    fn test_new_and_existing() {
        let p = ParameterDelta::existing(1, "b", "int");
        assert!(!p.is_new());
        assert_eq!(p.old_index(), Some(1));
        let q = ParameterDelta::added("c", "String").with_default("\"x\"");
        assert!(q.is_new());
        assert_eq!(q.default_value(), Some("\"x\""));
    }
}
