//! Escaping for every value interpolated into a query.
//!
//! String literals follow SPARQL `STRING_LITERAL2`. IRI local names are
//! emitted as prefixed names only when they form a safe `PN_LOCAL`; anything
//! else becomes a full `<IRI>` with the offending characters percent-encoded.

use crate::intent::Quantity;
use crate::knowledge::LiteralType;

/// Escape the body of a double-quoted string literal.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// A complete double-quoted string literal.
pub fn string_literal(value: &str) -> String {
    format!("\"{}\"", escape_literal(value))
}

/// `PN_LOCAL` check, restricted to the subset without `.`, `:` and escapes.
///
/// The first character is `PN_CHARS_U` or a digit; the rest are `PN_CHARS`.
pub fn is_safe_local(local: &str) -> bool {
    let mut chars = local.chars();
    match chars.next() {
        Some(first) if is_pn_chars_u(first) || first.is_ascii_digit() => {}
        _ => return false,
    }
    chars.all(is_pn_chars)
}

fn is_pn_chars_base(c: char) -> bool {
    matches!(c,
        'A'..='Z'
        | 'a'..='z'
        | '\u{00C0}'..='\u{00D6}'
        | '\u{00D8}'..='\u{00F6}'
        | '\u{00F8}'..='\u{02FF}'
        | '\u{0370}'..='\u{037D}'
        | '\u{037F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

fn is_pn_chars_u(c: char) -> bool {
    c == '_' || is_pn_chars_base(c)
}

fn is_pn_chars(c: char) -> bool {
    is_pn_chars_u(c)
        || matches!(c,
            '-' | '0'..='9' | '\u{00B7}' | '\u{0300}'..='\u{036F}' | '\u{203F}'..='\u{2040}')
}

/// Percent-encode everything outside letters, digits and `-._~`.
pub fn percent_encode(local: &str) -> String {
    let mut out = String::with_capacity(local.len());
    for c in local.chars() {
        if c.is_alphanumeric() || matches!(c, '-' | '.' | '_' | '~') {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

/// `prefix:local` when safe, `<namespace + encoded local>` otherwise.
pub fn term(prefix: &str, namespace: &str, local: &str) -> String {
    if is_safe_local(local) {
        format!("{prefix}:{local}")
    } else {
        format!("<{namespace}{}>", percent_encode(local))
    }
}

/// Bare numeric literal for comparisons (`400`, `7.5`).
pub fn numeric(value: Quantity) -> String {
    value.to_string()
}

/// Typed literal such as `"500"^^xsd:integer`.
pub fn typed_literal(value: Quantity, datatype: LiteralType) -> String {
    let lexical = match (datatype, value) {
        (LiteralType::Integer, Quantity::Integer(n)) => n.to_string(),
        (LiteralType::Integer, Quantity::Decimal(x)) => format!("{:.0}", x.trunc()),
        (LiteralType::Decimal, Quantity::Integer(n)) => format!("{n}.0"),
        (LiteralType::Decimal, Quantity::Decimal(x)) if x.fract() == 0.0 => format!("{x}.0"),
        (LiteralType::Decimal, Quantity::Decimal(x)) => x.to_string(),
    };
    format!("\"{lexical}\"^^xsd:{}", datatype.xsd_local())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_escapes_quotes_and_controls() {
        assert_eq!(escape_literal(r#"a "b" \c"#), r#"a \"b\" \\c"#);
        assert_eq!(escape_literal("l1\nl2\r\tx"), "l1\\nl2\\r\\tx");
        assert_eq!(string_literal("ok"), "\"ok\"");
    }

    #[test]
    fn injection_attempt_stays_inside_literal() {
        let lit = string_literal("\" } ; DROP ALL ; #");
        assert!(lit.starts_with("\"\\\""));
        assert_eq!(lit.matches('"').count() - lit.matches("\\\"").count(), 2);
    }

    #[test]
    fn safe_locals_use_prefixed_names() {
        assert_eq!(term("ont", "http://o#", "ActivitéPhysique"), "ont:ActivitéPhysique");
        assert_eq!(term("ex", "http://e/", "user_42"), "ex:user_42");
    }

    #[test]
    fn unsafe_locals_become_full_iris() {
        assert_eq!(
            term("ex", "http://e/", "user_a b>"),
            "<http://e/user_a%20b%3E>"
        );
        assert_eq!(term("ex", "http://e/", ""), "<http://e/>");
        assert_eq!(term("ex", "http://e/", "-x"), "<http://e/-x>");
    }

    #[test]
    fn letter_like_symbols_are_not_name_characters() {
        // Alphanumeric for Unicode, but outside PN_CHARS.
        for local in ["user_1º", "user_ª", "user_µ", "user_x²", "ª", "²"] {
            assert!(!is_safe_local(local), "{local}");
            assert!(term("ex", "http://e/", local).starts_with("<http://e/"));
        }
        assert_eq!(term("ex", "http://e/", "user_µ"), "<http://e/user_µ>");
    }

    #[test]
    fn name_grammar_edges() {
        assert!(is_safe_local("42"));
        assert!(is_safe_local("_x"));
        assert!(is_safe_local("a-b·c"));
        assert!(is_safe_local("Ωmega"));
        assert!(is_safe_local("e\u{0301}t\u{00E9}"));
        assert!(!is_safe_local("\u{0301}x"));
        assert!(!is_safe_local("·x"));
        assert!(!is_safe_local("a.b"));
        assert!(!is_safe_local("a:b"));
    }

    #[test]
    fn typed_literals_match_datatype() {
        assert_eq!(
            typed_literal(Quantity::Integer(500), LiteralType::Integer),
            "\"500\"^^xsd:integer"
        );
        assert_eq!(
            typed_literal(Quantity::Decimal(8.0), LiteralType::Decimal),
            "\"8.0\"^^xsd:decimal"
        );
        assert_eq!(
            typed_literal(Quantity::Decimal(7.5), LiteralType::Decimal),
            "\"7.5\"^^xsd:decimal"
        );
        assert_eq!(
            typed_literal(Quantity::Decimal(1e20), LiteralType::Integer),
            "\"100000000000000000000\"^^xsd:integer"
        );
    }
}
