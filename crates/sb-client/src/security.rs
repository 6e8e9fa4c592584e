//! Escaping and encoding helpers shared by every adapter.
//!
//! Any caller-supplied value that ends up inside a query language literal or
//! a URL must pass through one of these functions.
//!
//! ```rust
//! use saasbridge_client::security::{soql, url};
//!
//! let name = soql::escape_string("O'Brien");
//! let query = format!("SELECT Id FROM Account WHERE Name = '{}'", name);
//! let q = url::encode_component(&query);
//! assert!(q.starts_with("SELECT%20Id"));
//! ```

/// SOQL literal escaping and identifier validation.
pub mod soql {
    /// Escape a string value for use inside a quoted SOQL literal.
    ///
    /// Quotes and backslashes are backslash-escaped; newline, carriage
    /// return and tab become their escape sequences.
    ///
    /// ```rust
    /// use saasbridge_client::security::soql;
    ///
    /// assert_eq!(soql::escape_string("O'Brien & Co."), "O\\'Brien & Co.");
    /// ```
    #[must_use]
    pub fn escape_string(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len() + 8);
        for ch in value.chars() {
            match ch {
                '\'' => escaped.push_str("\\'"),
                '\\' => escaped.push_str("\\\\"),
                '\n' => escaped.push_str("\\n"),
                '\r' => escaped.push_str("\\r"),
                '\t' => escaped.push_str("\\t"),
                _ => escaped.push(ch),
            }
        }
        escaped
    }

    /// Returns true if `name` is a plain SOQL identifier: a leading ASCII
    /// letter followed by letters, digits or underscores. Relationship paths
    /// (`Account.Name`) are checked segment by segment.
    #[must_use]
    pub fn is_safe_field_name(name: &str) -> bool {
        !name.is_empty() && name.split('.').all(is_identifier)
    }

    /// Returns true if `name` is a safe SObject name.
    #[must_use]
    pub fn is_safe_sobject_name(name: &str) -> bool {
        is_identifier(name)
    }

    fn is_identifier(segment: &str) -> bool {
        let mut chars = segment.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    }
}

/// URL component encoding.
pub mod url {
    /// Percent-encode a value for use as a path segment or query value.
    ///
    /// Only `A-Z a-z 0-9 - _ . ~` are left as-is.
    ///
    /// ```rust
    /// use saasbridge_client::security::url;
    ///
    /// assert_eq!(url::encode_param("001/../secret"), "001%2F..%2Fsecret");
    /// ```
    #[must_use]
    pub fn encode_param(value: &str) -> String {
        urlencoding::encode(value).into_owned()
    }

    /// Percent-encode with the browser `encodeURIComponent` character set:
    /// like [`encode_param`] but `! ' ( ) *` also pass through unencoded.
    ///
    /// Query endpoints that expect a URI-component encoded query string are
    /// sensitive to this difference.
    ///
    /// ```rust
    /// use saasbridge_client::security::url;
    ///
    /// assert_eq!(url::encode_component("(Type = 'A')"), "(Type%20%3D%20'A')");
    /// ```
    #[must_use]
    pub fn encode_component(value: &str) -> String {
        let mut encoded = String::with_capacity(value.len() * 3 / 2);
        let mut buf = [0u8; 4];
        for ch in value.chars() {
            match ch {
                '!' | '\'' | '(' | ')' | '*' => encoded.push(ch),
                _ => encoded.push_str(&urlencoding::encode(ch.encode_utf8(&mut buf))),
            }
        }
        encoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_string_injection_attempt() {
        assert_eq!(
            soql::escape_string("' OR Name LIKE '%"),
            "\\' OR Name LIKE \\'%"
        );
        assert_eq!(soql::escape_string("a\\b"), "a\\\\b");
        assert_eq!(soql::escape_string("line\nbreak\ttab"), "line\\nbreak\\ttab");
    }

    #[test]
    fn test_is_safe_field_name() {
        assert!(soql::is_safe_field_name("Name"));
        assert!(soql::is_safe_field_name("Custom_Field__c"));
        assert!(soql::is_safe_field_name("Account.Owner.Name"));
        assert!(!soql::is_safe_field_name(""));
        assert!(!soql::is_safe_field_name("1Name"));
        assert!(!soql::is_safe_field_name("Account."));
        assert!(!soql::is_safe_field_name("Bad'; DROP--"));
        assert!(!soql::is_safe_sobject_name("Account.Name"));
    }

    #[test]
    fn test_encode_param() {
        assert_eq!(url::encode_param("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(url::encode_param("it's"), "it%27s");
    }

    #[test]
    fn test_encode_component_matches_uri_component_rules() {
        assert_eq!(
            url::encode_component("SELECT Name, Type FROM Account"),
            "SELECT%20Name%2C%20Type%20FROM%20Account"
        );
        assert_eq!(url::encode_component("it's (ok)!*"), "it's%20(ok)!*");
        assert_eq!(url::encode_component("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(url::encode_component("é"), "%C3%A9");
    }
}
