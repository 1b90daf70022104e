// ABOUTME: Lexer unit tests covering sigils, strings, money, and tag mode

use super::*;
use crate::token::{StrPart, TokenKind};

fn kinds(src: &str) -> Vec<TokenKind> {
    let mut lexer = Lexer::new(src);
    let mut out = Vec::new();
    loop {
        let token = lexer.next();
        if token.kind == TokenKind::Eof {
            break;
        }
        out.push(token.kind);
        if out.len() > 200 {
            panic!("runaway lexer on {src:?}");
        }
    }
    out
}

fn single(src: &str) -> TokenKind {
    let mut all = kinds(src);
    assert_eq!(all.len(), 1, "expected one token from {src:?}, got {all:?}");
    all.remove(0)
}

#[test]
fn test_positions_track_lines_and_columns() {
    let mut lexer = Lexer::new("let x =\n  42");
    assert_eq!(lexer.next().line, 1);
    let x = lexer.next();
    assert_eq!((x.line, x.column), (1, 5));
    lexer.next(); // =
    let forty_two = lexer.next();
    assert_eq!((forty_two.line, forty_two.column), (2, 3));
    assert_eq!(forty_two.offset, 10);
}

#[test]
fn test_number_literals() {
    assert_eq!(single("42"), TokenKind::Int(42));
    assert_eq!(single("1_000_000"), TokenKind::Int(1_000_000));
    assert_eq!(single("3.25"), TokenKind::Float(3.25));
}

#[test]
fn test_range_is_not_a_float() {
    assert_eq!(
        kinds("1..5"),
        vec![TokenKind::Int(1), TokenKind::DotDot, TokenKind::Int(5)]
    );
}

#[test]
fn test_double_string_escapes_only() {
    assert_eq!(single(r#""a\nb""#), TokenKind::Str("a\nb".to_string()));
    assert!(matches!(single(r#""\q""#), TokenKind::Illegal(_)));
}

#[test]
fn test_template_string_interpolation() {
    let kind = single("`a {x + 1} b`");
    let TokenKind::TemplateStr(parts) = kind else {
        panic!("expected template string");
    };
    assert_eq!(
        parts,
        vec![
            StrPart::Lit("a ".to_string()),
            StrPart::Expr("x + 1".to_string()),
            StrPart::Lit(" b".to_string()),
        ]
    );
}

#[test]
fn test_raw_string_keeps_backslashes() {
    let kind = single(r"'a\nb'");
    let TokenKind::RawStr(parts) = kind else {
        panic!("expected raw string");
    };
    assert_eq!(parts, vec![StrPart::Lit(r"a\nb".to_string())]);
}

#[test]
fn test_raw_string_at_interpolation() {
    let TokenKind::RawStr(parts) = single("'v=@{x}'") else {
        panic!("expected raw string");
    };
    assert_eq!(
        parts,
        vec![
            StrPart::Lit("v=".to_string()),
            StrPart::Expr("x".to_string()),
        ]
    );
}

#[test]
fn test_interpolation_handles_nested_braces() {
    let TokenKind::TemplateStr(parts) = single("`{ {a: 1} }`") else {
        panic!("expected template string");
    };
    assert_eq!(parts, vec![StrPart::Expr(" {a: 1} ".to_string())]);
}

#[test]
fn test_money_symbol_forms() {
    let TokenKind::Money(lit) = single("$10.50") else {
        panic!("expected money");
    };
    assert_eq!((lit.minor, lit.currency.as_str(), lit.scale), (1050, "USD", 2));

    let TokenKind::Money(lit) = single("¥1200") else {
        panic!("expected money");
    };
    assert_eq!((lit.minor, lit.currency.as_str(), lit.scale), (1200, "JPY", 0));
}

#[test]
fn test_money_prefixed_and_code_forms() {
    let TokenKind::Money(lit) = single("CA$5") else {
        panic!("expected money");
    };
    assert_eq!((lit.minor, lit.currency.as_str()), (500, "CAD"));

    let TokenKind::Money(lit) = single("NOK#99.50") else {
        panic!("expected money");
    };
    assert_eq!((lit.minor, lit.currency.as_str()), (9950, "NOK"));

    let TokenKind::Money(lit) = single("BTC#0.00000001") else {
        panic!("expected money");
    };
    assert_eq!((lit.minor, lit.scale), (1, 8));
}

#[test]
fn test_money_scale_is_enforced() {
    assert!(matches!(single("¥10.50"), TokenKind::Illegal(_)));
    assert!(matches!(single("$1.999"), TokenKind::Illegal(_)));
}

#[test]
fn test_datetime_literals() {
    let TokenKind::Datetime(lit) = single("@2024-01-15") else {
        panic!("expected datetime");
    };
    assert!(lit.date.is_some() && lit.time.is_none());

    let TokenKind::Datetime(lit) = single("@2024-01-15T09:30:00Z") else {
        panic!("expected datetime");
    };
    assert!(lit.date.is_some() && lit.time.is_some());
    assert_eq!(lit.offset_minutes, Some(0));

    let TokenKind::Datetime(lit) = single("@2024-01-15T09:30:00+02:00") else {
        panic!("expected datetime");
    };
    assert_eq!(lit.offset_minutes, Some(120));

    let TokenKind::Datetime(lit) = single("@15:30") else {
        panic!("expected time");
    };
    assert!(lit.date.is_none() && lit.time.is_some());
}

#[test]
fn test_duration_literals() {
    let TokenKind::Duration(lit) = single("@1h30m") else {
        panic!("expected duration");
    };
    assert_eq!((lit.months, lit.seconds, lit.negative), (0, 5400, false));

    let TokenKind::Duration(lit) = single("@1y2mo") else {
        panic!("expected duration");
    };
    assert_eq!(lit.months, 14);

    let TokenKind::Duration(lit) = single("@-2d") else {
        panic!("expected duration");
    };
    assert_eq!((lit.seconds, lit.negative), (172_800, true));
}

#[test]
fn test_path_and_url_literals() {
    assert_eq!(
        single("@./pages/index.sl"),
        TokenKind::PathLit("./pages/index.sl".to_string())
    );
    assert_eq!(single("@~/config"), TokenKind::PathLit("~/config".to_string()));
    assert_eq!(
        single("@https://example.com/api?q=1"),
        TokenKind::UrlLit("https://example.com/api?q=1".to_string())
    );
}

#[test]
fn test_sigil_keywords() {
    assert_eq!(single("@now"), TokenKind::ContextRef("now".to_string()));
    assert_eq!(single("@env"), TokenKind::ContextRef("env".to_string()));
    assert_eq!(single("@sqlite"), TokenKind::ConnDriver("sqlite".to_string()));
    assert_eq!(single("@query"), TokenKind::QueryVerb("query".to_string()));
    assert_eq!(single("@std/math"), TokenKind::StdRef("math".to_string()));
    assert_eq!(single("@basil/auth"), TokenKind::BasilRef("auth".to_string()));
    assert!(matches!(single("@bogus"), TokenKind::Illegal(_)));
}

#[test]
fn test_sigil_template() {
    let TokenKind::SigilTemplate(parts) = single("@(./uploads/{name}.png)") else {
        panic!("expected sigil template");
    };
    assert_eq!(
        parts,
        vec![
            StrPart::Lit("./uploads/".to_string()),
            StrPart::Expr("name".to_string()),
            StrPart::Lit(".png".to_string()),
        ]
    );
}

#[test]
fn test_regex_vs_division() {
    // After a value, `/` is division.
    assert_eq!(
        kinds("a / b"),
        vec![
            TokenKind::Ident("a".to_string()),
            TokenKind::Slash,
            TokenKind::Ident("b".to_string()),
        ]
    );
    // After an operator, `/` opens a regex.
    let all = kinds("x ~ /ab+c/i");
    assert_eq!(
        all[2],
        TokenKind::Regex {
            pattern: "ab+c".to_string(),
            flags: "i".to_string()
        }
    );
}

#[test]
fn test_tag_vs_comparison() {
    // After a value, `<` is a comparison.
    assert_eq!(
        kinds("a < b"),
        vec![
            TokenKind::Ident("a".to_string()),
            TokenKind::Lt,
            TokenKind::Ident("b".to_string()),
        ]
    );
    // In expression position it opens a tag.
    let all = kinds("<div class=\"a\"></div>");
    assert_eq!(
        all,
        vec![
            TokenKind::TagStart("div".to_string()),
            TokenKind::Ident("class".to_string()),
            TokenKind::Assign,
            TokenKind::Str("a".to_string()),
            TokenKind::TagEnd,
            TokenKind::TagClose("div".to_string()),
        ]
    );
}

#[test]
fn test_tag_text_and_interpolation() {
    let all = kinds("<p>hi {name}!</p>");
    assert_eq!(
        all,
        vec![
            TokenKind::TagStart("p".to_string()),
            TokenKind::TagEnd,
            TokenKind::Text("hi ".to_string()),
            TokenKind::LBrace,
            TokenKind::Ident("name".to_string()),
            TokenKind::RBrace,
            TokenKind::Text("!".to_string()),
            TokenKind::TagClose("p".to_string()),
        ]
    );
}

#[test]
fn test_self_closing_and_fragment() {
    assert_eq!(
        kinds("<br/>"),
        vec![TokenKind::TagStart("br".to_string()), TokenKind::TagSelfClose]
    );
    assert_eq!(
        kinds("<>x</>"),
        vec![
            TokenKind::FragmentStart,
            TokenKind::Text("x".to_string()),
            TokenKind::FragmentClose,
        ]
    );
}

#[test]
fn test_script_body_is_raw_text() {
    let all = kinds("<script>if (a < b) { go(); }</script>");
    assert_eq!(all[0], TokenKind::TagStart("script".to_string()));
    assert_eq!(all[1], TokenKind::TagEnd);
    assert_eq!(
        all[2],
        TokenKind::Text("if (a < b) { go(); }".to_string())
    );
    assert_eq!(all[3], TokenKind::TagClose("script".to_string()));
}

#[test]
fn test_script_interpolation() {
    let all = kinds("<script>let u = @{user};</script>");
    assert_eq!(all[2], TokenKind::Text("let u = ".to_string()));
    assert_eq!(all[3], TokenKind::LBrace);
    assert_eq!(all[4], TokenKind::Ident("user".to_string()));
    assert_eq!(all[5], TokenKind::RBrace);
    assert_eq!(all[6], TokenKind::Text(";".to_string()));
}

#[test]
fn test_write_and_db_operators() {
    assert_eq!(single("==>"), TokenKind::WriteTo);
    assert_eq!(single("==>>"), TokenKind::AppendTo);
    assert_eq!(single("=/=>"), TokenKind::ForceWriteTo);
    assert_eq!(single("=/=>>"), TokenKind::ForceAppendTo);
    assert_eq!(single("<=?=>"), TokenKind::QueryOne);
    assert_eq!(single("<=??=>"), TokenKind::QueryMany);
    assert_eq!(single("<=!=>"), TokenKind::ExecOn);
    assert_eq!(single("<=#=>"), TokenKind::ShellOn);
    assert_eq!(single("<=="), TokenKind::ReadFrom);
}

#[test]
fn test_hash_comment_is_rejected() {
    assert!(matches!(kinds("# nope")[0], TokenKind::Illegal(_)));
}

#[test]
fn test_slash_comment_is_skipped() {
    assert_eq!(kinds("1 // two\n3"), vec![TokenKind::Int(1), TokenKind::Int(3)]);
}

#[test]
fn test_save_restore_round_trip() {
    let mut lexer = Lexer::new("<div>{a}</div>");
    lexer.next(); // <div
    let state = lexer.save();
    lexer.next(); // >
    lexer.next(); // {
    lexer.next(); // a
    lexer.restore(state);
    assert_eq!(lexer.next().kind, TokenKind::TagEnd);
    assert_eq!(lexer.next().kind, TokenKind::LBrace);
}

#[test]
fn test_compound_tokens() {
    assert_eq!(
        kinds("a ?? b"),
        vec![
            TokenKind::Ident("a".to_string()),
            TokenKind::Coalesce,
            TokenKind::Ident("b".to_string()),
        ]
    );
    assert_eq!(single("++"), TokenKind::PlusPlus);
    assert_eq!(single("..."), TokenKind::Ellipsis);
}
