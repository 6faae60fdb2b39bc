//! Template scanner: finds `@`-introduced expression sites in
//! surrounding text, evaluates each, and concatenates the results with
//! the literal text in between.

use msgexpr_common::EvalError;
use msgexpr_parse::parse;

use crate::context::Context;
use crate::evaluator::{eval, is_bare_ident, Eval, Strategy};
use crate::registry::{default_registry, Registry};
use crate::utils::urlquote;

/// Evaluates `source` against the default builtin registry under
/// `Strategy::Complete` with URL-encoding off.
pub fn evaluate_template(source: &str, ctx: &Context) -> (String, Vec<String>) {
    evaluate_template_with(source, ctx, default_registry(), false, Strategy::Complete)
}

/// The full template entry point: always returns a rendered
/// string, accumulating per-expression errors in the second return
/// rather than aborting the whole render.
pub fn evaluate_template_with(
    source: &str,
    ctx: &Context,
    registry: &Registry,
    url_encode: bool,
    strategy: Strategy,
) -> (String, Vec<String>) {
    let mut out = String::new();
    let mut errors = Vec::new();
    let mut chars = CharScanner::new(source);

    while let Some((i, c)) = chars.peek() {
        if c != '@' {
            out.push(c);
            chars.advance();
            continue;
        }

        // A literal "@@" collapses to a single "@".
        if chars.peek_at(i + 1) == Some('@') {
            out.push('@');
            chars.advance();
            chars.advance();
            continue;
        }

        match chars.peek_at(i + 1) {
            Some('(') => {
                match find_matching_paren(source, i + 1) {
                    Some(close) => {
                        let expr_src = &source[i + 2..close];
                        render_site(expr_src, ctx, registry, strategy, url_encode, &mut out, &mut errors);
                        chars.jump_to(close + 1);
                    }
                    None => {
                        // Unbalanced: emit the rest of the template verbatim, no error.
                        out.push_str(&source[i..]);
                        chars.jump_to(source.len());
                    }
                }
            }
            Some(next) if next.is_alphabetic() || next == '_' => {
                let end = consume_ident_chain(source, i + 1);
                let expr_src = &source[i + 1..end];
                render_site(expr_src, ctx, registry, strategy, url_encode, &mut out, &mut errors);
                chars.jump_to(end);
            }
            Some(next) => {
                errors.push(format!("Expression error at: {next}"));
                out.push('@');
                chars.advance();
            }
            None => {
                errors.push("Expression error at: end of input".to_string());
                out.push('@');
                chars.advance();
            }
        }
    }

    (out, errors)
}

/// Evaluates one captured expression site and appends its rendering (or
/// nothing, on a blanked error) to `out`, recording any error.
#[allow(clippy::too_many_arguments)]
fn render_site(
    expr_src: &str,
    ctx: &Context,
    registry: &Registry,
    strategy: Strategy,
    url_encode: bool,
    out: &mut String,
    errors: &mut Vec<String>,
) {
    let expr = match parse(expr_src) {
        Ok(e) => e,
        Err(e) => {
            // A syntactically broken expression can't be partially
            // rendered or usefully retried later, so (unlike a
            // semantic evaluation failure) the site is preserved
            // verbatim rather than blanked.
            errors.push(format!("Expression error at: {}", e.message));
            out.push('@');
            if expr_src.chars().next().map(|c| c.is_alphabetic() || c == '_') == Some(true) {
                out.push_str(expr_src);
            } else {
                out.push('(');
                out.push_str(expr_src);
                out.push(')');
            }
            return;
        }
    };

    match eval(&expr, ctx, registry, strategy) {
        Ok(Eval::Value(v)) => match v.to_display_string(ctx) {
            Ok(s) => out.push_str(&if url_encode { urlquote(&s) } else { s }),
            Err(e) => errors.push(e.to_string()),
        },
        Ok(Eval::Pending(text)) => out.push_str(&format_pending_top(&text)),
        Err(e) => errors.push(describe(e)),
    }
}

fn describe(e: EvalError) -> String {
    e.to_string()
}

fn format_pending_top(text: &str) -> String {
    if is_bare_ident(text) {
        format!("@{text}")
    } else {
        format!("@({text})")
    }
}

/// Finds the index of the `)` matching the `(` at `open`, honoring
/// nesting and double-quoted string literals (so a `)` inside a string
/// doesn't end the scan early). Returns `None` if unbalanced.
fn find_matching_paren(source: &str, open: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let bytes = source.as_bytes();
    let mut i = open;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_string {
            if c == '"' {
                // "" escapes an embedded quote; a lone '"' closes the string.
                if bytes.get(i + 1) == Some(&b'"') {
                    i += 2;
                    continue;
                }
                in_string = false;
            }
            i += 1;
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Greedily consumes `letter (letter|digit|_)*` followed by zero or
/// more `.segment` tails, returning the end byte offset.
fn consume_ident_chain(source: &str, start: usize) -> usize {
    let bytes = source.as_bytes();
    let mut i = start;
    if i >= bytes.len() || !(is_ident_start(bytes[i]) ) {
        return i;
    }
    i += 1;
    while i < bytes.len() && is_ident_continue(bytes[i]) {
        i += 1;
    }
    loop {
        if bytes.get(i) == Some(&b'.') {
            let after = i + 1;
            if after < bytes.len() && is_ident_start(bytes[after]) {
                i = after + 1;
                while i < bytes.len() && is_ident_continue(bytes[i]) {
                    i += 1;
                }
                continue;
            }
        }
        break;
    }
    i
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// A tiny char-index cursor over `&str` that lets the scanner jump
/// forward by byte offset (after consuming a whole expression site)
/// without re-walking consumed bytes.
struct CharScanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> CharScanner<'a> {
    fn new(src: &'a str) -> Self {
        CharScanner { src, pos: 0 }
    }

    fn peek(&self) -> Option<(usize, char)> {
        self.src[self.pos..].chars().next().map(|c| (self.pos, c))
    }

    fn peek_at(&self, byte_pos: usize) -> Option<char> {
        self.src.get(byte_pos..)?.chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.src[self.pos..].chars().next() {
            self.pos += c.len_utf8();
        }
    }

    fn jump_to(&mut self, byte_pos: usize) {
        self.pos = byte_pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::DateStyle;
    use chrono::{NaiveDate, TimeZone};
    use msgexpr_common::Value;

    fn ctx() -> Context {
        let now = chrono_tz::Africa::Kigali
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(2015, 8, 14)
                    .unwrap()
                    .and_hms_opt(10, 38, 30)
                    .unwrap(),
            )
            .unwrap();
        Context::new(now, chrono_tz::Africa::Kigali, DateStyle::DayFirst)
    }

    #[test]
    fn simple_paren_expression() {
        let c = ctx();
        let (out, errs) = evaluate_template("Answer is @(2 + 3)", &c);
        assert_eq!(out, "Answer is 5");
        assert!(errs.is_empty());
    }

    #[test]
    fn unbalanced_paren_is_preserved_verbatim_without_error() {
        let c = ctx();
        let (out, errs) = evaluate_template("Answer is @(2 + 3", &c);
        assert_eq!(out, "Answer is @(2 + 3");
        assert!(errs.is_empty());
    }

    #[test]
    fn no_at_sign_round_trips_unchanged() {
        let c = ctx();
        let (out, errs) = evaluate_template("plain text, no expressions", &c);
        assert_eq!(out, "plain text, no expressions");
        assert!(errs.is_empty());
    }

    #[test]
    fn malformed_expression_content_is_preserved_with_error() {
        let c = ctx();
        let (out, errs) = evaluate_template("@('x')", &c);
        assert_eq!(out, "@('x')");
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains('\''));
    }

    #[test]
    fn double_at_collapses_to_one() {
        let c = ctx();
        let (out, errs) = evaluate_template("user@@example.com", &c);
        assert_eq!(out, "user@example.com");
        assert!(errs.is_empty());
    }

    #[test]
    fn bare_identifier_chain_site() {
        let mut c = ctx();
        c.set("contact", {
            let mut m = msgexpr_common::Container::new();
            m.insert("name", Value::Str("Rowan".into()));
            Value::Container(m)
        });
        let (out, errs) = evaluate_template("Hi @contact.name!", &c);
        assert_eq!(out, "Hi Rowan!");
        assert!(errs.is_empty());
    }

    #[test]
    fn resolve_available_preserves_unresolved_variable() {
        let mut c = ctx();
        c.set("foo", Value::Dec(rust_decimal::Decimal::from(5)));
        c.set("bar", Value::Str("x".into()));
        let (out, errs) = evaluate_template_with(
            "@(foo + contact.name + bar)",
            &c,
            default_registry(),
            false,
            Strategy::ResolveAvailable,
        );
        assert_eq!(out, "@(5+contact.name+\"x\")");
        assert!(errs.is_empty());
    }

    #[test]
    fn unresolved_variable_blanks_site_under_complete() {
        let c = ctx();
        let (out, errs) = evaluate_template("Hello @missing!", &c);
        assert_eq!(out, "Hello !");
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn url_encode_flag_quotes_the_rendered_value() {
        let mut c = ctx();
        c.set("name", Value::Str("a b".into()));
        let (out, _) =
            evaluate_template_with("@name", &c, default_registry(), true, Strategy::Complete);
        assert_eq!(out, "a%20b");
    }
}
