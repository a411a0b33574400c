//! Symbol-name handling: identifier sanitising and member-chain splitting.

/// Words that cannot be used as identifiers in the target language.
const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "enum", "export", "extends", "false", "finally", "for", "function", "if", "implements",
    "import", "in", "instanceof", "interface", "let", "new", "null", "package", "private",
    "protected", "public", "return", "static", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with", "yield", "await",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Rewrite a source symbol into a valid target identifier.
///
/// `my-var` → `my_var`, `empty?` → `empty_QMARK_`, `class` → `_class`.
pub fn sanitize(name: &str) -> String {
    let mut out = sanitize_property(name);
    if out.chars().next().map_or(false, |c| c.is_ascii_digit()) || is_reserved(&out) {
        out.insert(0, '_');
    }
    out
}

/// Like [`sanitize`], but for property names after a `.`, where reserved
/// words and leading digits are legal.
pub fn sanitize_property(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '-' => out.push('_'),
            '?' => out.push_str("_QMARK_"),
            '!' => out.push_str("_BANG_"),
            '*' => out.push_str("_STAR_"),
            '+' => out.push_str("_PLUS_"),
            '>' => out.push_str("_GT_"),
            '<' => out.push_str("_LT_"),
            '=' => out.push_str("_EQ_"),
            '/' => out.push_str("_SLASH_"),
            '\'' => out.push_str("_QUOTE_"),
            '%' => out.push_str("_PCT_"),
            '&' => out.push_str("_AMP_"),
            c if c == '_' || c == '$' || c.is_alphanumeric() => out.push(c),
            c => out.push_str(&format!("_U{:X}_", c as u32)),
        }
    }
    out
}

/// One segment of a dotted or optional-chained symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub name: &'a str,
    /// True when the segment was preceded by `?.` rather than `.`.
    pub optional: bool,
}

/// True for symbols such as `a.b` or `a?.b` that denote member chains.
pub fn is_chain(symbol: &str) -> bool {
    !symbol.starts_with('.') && symbol.chars().skip(1).any(|c| c == '.')
}

/// Split `a?.b.c` into `[a, ?b, c]`, remembering which separator preceded
/// each segment. Returns `None` if any segment is empty.
pub fn split_chain(symbol: &str) -> Option<Vec<Segment<'_>>> {
    let bytes = symbol.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut optional = false;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'?' && bytes.get(i + 1) == Some(&b'.') {
            segments.push(Segment {
                name: &symbol[start..i],
                optional,
            });
            optional = true;
            i += 2;
            start = i;
        } else if bytes[i] == b'.' {
            segments.push(Segment {
                name: &symbol[start..i],
                optional,
            });
            optional = false;
            i += 1;
            start = i;
        } else {
            i += 1;
        }
    }
    segments.push(Segment {
        name: &symbol[start..],
        optional,
    });

    if segments.iter().any(|s| s.name.is_empty()) {
        None
    } else {
        Some(segments)
    }
}

/// `name:` keyword symbols.
pub fn keyword_name(symbol: &str) -> Option<&str> {
    symbol
        .strip_suffix(':')
        .filter(|name| !name.is_empty() && !name.contains(':'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("my-var"), "my_var");
        assert_eq!(sanitize("empty?"), "empty_QMARK_");
        assert_eq!(sanitize("set!"), "set_BANG_");
        assert_eq!(sanitize("class"), "_class");
        assert_eq!(sanitize("2d"), "_2d");
        assert_eq!(sanitize("$0"), "$0");
        assert_eq!(sanitize("plain"), "plain");
    }

    #[test]
    fn test_sanitize_property_allows_reserved() {
        assert_eq!(sanitize_property("default"), "default");
        assert_eq!(sanitize_property("is-ok?"), "is_ok_QMARK_");
    }

    #[test]
    fn test_split_chain_separators() {
        let segments = split_chain("a?.b.c").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment { name: "a", optional: false },
                Segment { name: "b", optional: true },
                Segment { name: "c", optional: false },
            ]
        );
    }

    #[test]
    fn test_split_chain_rejects_empty_segments() {
        assert!(split_chain("a..b").is_none());
        assert!(split_chain("a.").is_none());
    }

    #[test]
    fn test_is_chain() {
        assert!(is_chain("console.log"));
        assert!(is_chain("a?.b"));
        assert!(!is_chain(".push"));
        assert!(!is_chain("..."));
        assert!(!is_chain("plain"));
    }

    #[test]
    fn test_keyword_name() {
        assert_eq!(keyword_name("name:"), Some("name"));
        assert_eq!(keyword_name(":"), None);
        assert_eq!(keyword_name("x:number"), None);
    }
}
