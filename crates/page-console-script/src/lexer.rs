//! Tokenizer for console script input using logos.

use std::ops::Range;

use logos::Logos;

use crate::error::ParseError;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"([ \t\r\n\f]+|//[^\n]*|/\*([^*]|\*+[^*/])*\*+/)")]
pub enum Token {
    // Keywords
    #[token("var")]
    Var,
    #[token("let")]
    Let,
    #[token("const")]
    Const,
    #[token("function")]
    Function,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("throw")]
    Throw,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("finally")]
    Finally,
    #[token("new")]
    New,
    #[token("typeof")]
    Typeof,
    #[token("this")]
    This,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token(".")]
    Dot,

    // Operators
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("==")]
    EqEq,
    #[token("===")]
    EqEqEq,
    #[token("!=")]
    NotEq,
    #[token("!==")]
    NotEqEq,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("<=")]
    LessEq,
    #[token(">=")]
    GreaterEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,

    // Literals
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r"'([^'\\\n]|\\.)*'", |lex| unescape(lex.slice()))]
    String(String),

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl Token {
    /// How the token reads in a diagnostic.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Number(n) => format!("number {n}"),
            Self::String(s) => format!("string {s:?}"),
            Self::Ident(name) => format!("identifier '{name}'"),
            other => format!("'{}'", other.text()),
        }
    }

    pub(crate) const fn text(&self) -> &'static str {
        match self {
            Self::Var => "var",
            Self::Let => "let",
            Self::Const => "const",
            Self::Function => "function",
            Self::Return => "return",
            Self::If => "if",
            Self::Else => "else",
            Self::While => "while",
            Self::Throw => "throw",
            Self::Try => "try",
            Self::Catch => "catch",
            Self::Finally => "finally",
            Self::New => "new",
            Self::Typeof => "typeof",
            Self::This => "this",
            Self::True => "true",
            Self::False => "false",
            Self::Null => "null",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Colon => ":",
            Self::Question => "?",
            Self::Dot => ".",
            Self::Assign => "=",
            Self::PlusAssign => "+=",
            Self::MinusAssign => "-=",
            Self::StarAssign => "*=",
            Self::SlashAssign => "/=",
            Self::EqEq => "==",
            Self::EqEqEq => "===",
            Self::NotEq => "!=",
            Self::NotEqEq => "!==",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEq => "<=",
            Self::GreaterEq => ">=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Bang => "!",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Number(_) | Self::String(_) | Self::Ident(_) => "",
        }
    }
}

/// Strip quotes and process escape sequences.
fn unescape(quoted: &str) -> String {
    let content = &quoted[1..quoted.len() - 1];
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some(c) => result.push(c),
            None => result.push('\\'),
        }
    }

    result
}

/// Tokenize all of `source`, keeping each token's byte span.
///
/// # Errors
/// Returns [`ParseError::UnexpectedCharacter`] at the first byte no token matches.
pub fn tokenize(source: &str) -> Result<Vec<(Token, Range<usize>)>, ParseError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(ParseError::UnexpectedCharacter {
                    position: span.start,
                    found: lexer.slice().to_string(),
                });
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("let letter = typeof x"),
            vec![
                Token::Let,
                Token::Ident("letter".into()),
                Token::Assign,
                Token::Typeof,
                Token::Ident("x".into()),
            ]
        );
    }

    #[test]
    fn test_literals_and_comments() {
        assert_eq!(
            kinds("1.5 /* skip */ 'a\\'b' // tail\n\"q\""),
            vec![
                Token::Number(1.5),
                Token::String("a'b".into()),
                Token::String("q".into()),
            ]
        );
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(
            kinds("a === b !== c <= d"),
            vec![
                Token::Ident("a".into()),
                Token::EqEqEq,
                Token::Ident("b".into()),
                Token::NotEqEq,
                Token::Ident("c".into()),
                Token::LessEq,
                Token::Ident("d".into()),
            ]
        );
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("  foo(").unwrap();
        assert_eq!(tokens[0].1, 2..5);
        assert_eq!(tokens[1].1, 5..6);
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("1 # 2").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedCharacter { position: 2, .. }));
    }
}
