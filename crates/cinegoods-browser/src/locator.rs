//! Element locators, translated to WebDriver location strategies.

/// How a text predicate compares against an element's normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    Exact,
    Contains,
}

/// An element query, either a CSS selector or an `XPath` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }

    /// Any element with a direct text node containing `text`.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Locator::XPath(format!(
            "//*[text()[contains(normalize-space(.), {})]]",
            xpath_literal(text)
        ))
    }

    /// A `tag` whose class attribute contains `class_fragment` and whose
    /// normalized text satisfies `matching`.
    ///
    /// Class names on the target sites carry build hashes
    /// (`maintab_tabTitle__77wdq`), so only the stable prefix is matched.
    #[must_use]
    pub fn tag_with_class_and_text(
        tag: &str,
        class_fragment: &str,
        text: &str,
        matching: TextMatch,
    ) -> Self {
        let text_predicate = match matching {
            TextMatch::Exact => format!("normalize-space(.)={}", xpath_literal(text)),
            TextMatch::Contains => {
                format!("contains(normalize-space(.), {})", xpath_literal(text))
            }
        };
        Locator::XPath(format!(
            "//{tag}[contains(@class, {})][{text_predicate}]",
            xpath_literal(class_fragment)
        ))
    }

    /// An `<img>` whose `alt` attribute equals `alt` exactly.
    #[must_use]
    pub fn image_with_alt(alt: &str) -> Self {
        Locator::Css(format!("img[alt=\"{}\"]", css_string_escape(alt)))
    }

    /// WebDriver `using` strategy and its value.
    #[must_use]
    pub fn strategy(&self) -> (&'static str, &str) {
        match self {
            Locator::Css(s) => ("css selector", s),
            Locator::XPath(s) => ("xpath", s),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={s}"),
            Locator::XPath(s) => write!(f, "xpath={s}"),
        }
    }
}

/// Quotes `s` as an `XPath` 1.0 string literal.
///
/// `XPath` 1.0 has no escape sequences, so strings containing both quote
/// kinds are assembled with `concat()`.
#[must_use]
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{s}'");
    }
    if !s.contains('"') {
        return format!("\"{s}\"");
    }
    let parts: Vec<String> = s.split('\'').map(|p| format!("'{p}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Escapes `s` for use inside a double-quoted CSS attribute value.
#[must_use]
pub fn css_string_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\a "),
            _ => out.push(c),
        }
    }
    out
}
