//! Tokenizer for formula text, built from nom combinators

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{map, opt, recognize, value},
    sequence::{pair, tuple},
    IResult,
};

use super::SyntaxError;

/// Kind of a lexical token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Int(i64),
    Forall,
    Exists,
    Not,
    And,
    Or,
    Dot,
    Comma,
    LParen,
    RParen,
    Arrow,
    DoubleArrow,
    Le,
    Ge,
    Lt,
    Gt,
    Eq,
    Ne,
}

impl TokenKind {
    /// Human readable form used in error messages
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier `{}`", name),
            TokenKind::Int(n) => format!("integer {}", n),
            TokenKind::Forall => "`forall`".to_string(),
            TokenKind::Exists => "`exists`".to_string(),
            TokenKind::Not => "`not`".to_string(),
            TokenKind::And => "`and`".to_string(),
            TokenKind::Or => "`or`".to_string(),
            TokenKind::Dot => "'.'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::Arrow => "'->'".to_string(),
            TokenKind::DoubleArrow => "'<->'".to_string(),
            TokenKind::Le => "'<='".to_string(),
            TokenKind::Ge => "'>='".to_string(),
            TokenKind::Lt => "'<'".to_string(),
            TokenKind::Gt => "'>'".to_string(),
            TokenKind::Eq => "'='".to_string(),
            TokenKind::Ne => "'!='".to_string(),
        }
    }
}

/// A token and the byte offset where it starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

/// Reserved words that can never be identifiers
pub fn is_reserved(word: &str) -> bool {
    matches!(word, "forall" | "exists" | "not" | "and" | "or")
}

fn keyword_or_ident(word: &str) -> TokenKind {
    match word {
        "forall" => TokenKind::Forall,
        "exists" => TokenKind::Exists,
        "not" => TokenKind::Not,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        _ => TokenKind::Ident(word.to_string()),
    }
}

/// Letter or underscore, then letters, digits or underscores
fn word(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

/// Optionally signed decimal integer
fn integer(input: &str) -> IResult<&str, &str> {
    recognize(tuple((opt(char('-')), digit1)))(input)
}

/// Punctuation and operators; longer operators are tried first
fn punct(input: &str) -> IResult<&str, TokenKind> {
    alt((
        value(TokenKind::DoubleArrow, tag("<->")),
        value(TokenKind::Arrow, tag("->")),
        value(TokenKind::Le, tag("<=")),
        value(TokenKind::Ge, tag(">=")),
        value(TokenKind::Ne, tag("!=")),
        value(TokenKind::Lt, char('<')),
        value(TokenKind::Gt, char('>')),
        value(TokenKind::Eq, char('=')),
        value(TokenKind::LParen, char('(')),
        value(TokenKind::RParen, char(')')),
        value(TokenKind::Comma, char(',')),
        value(TokenKind::Dot, char('.')),
    ))(input)
}

enum Lexeme<'a> {
    Word(&'a str),
    Number(&'a str),
    Punct(TokenKind),
}

fn lexeme(input: &str) -> IResult<&str, Lexeme<'_>> {
    alt((
        map(integer, Lexeme::Number),
        map(word, Lexeme::Word),
        map(punct, Lexeme::Punct),
    ))(input)
}

/// Split formula text into tokens.
///
/// Any quote character anywhere in the text is rejected before lexing.
pub fn tokenize(input: &str) -> Result<Vec<Token>, SyntaxError> {
    if let Some(offset) = input.find(['"', '\'']) {
        return Err(SyntaxError::StringLiteral { offset });
    }

    let mut tokens = Vec::new();
    let mut rest = input;
    loop {
        let (after_ws, _) = multispace0::<_, nom::error::Error<&str>>(rest)
            .map_err(|_| SyntaxError::Empty)?;
        rest = after_ws;
        if rest.is_empty() {
            break;
        }
        let offset = input.len() - rest.len();
        match lexeme(rest) {
            Ok((next, lex)) => {
                let kind = match lex {
                    Lexeme::Word(w) => keyword_or_ident(w),
                    Lexeme::Number(n) => {
                        let parsed = n.parse::<i64>().map_err(|_| SyntaxError::InvalidInteger {
                            literal: n.to_string(),
                            offset,
                        })?;
                        TokenKind::Int(parsed)
                    }
                    Lexeme::Punct(kind) => kind,
                };
                tokens.push(Token { kind, offset });
                rest = next;
            }
            Err(_) => {
                let ch = rest.chars().next().unwrap_or(' ');
                return Err(SyntaxError::UnexpectedChar { ch, offset });
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("forall x. not nothing"),
            vec![
                TokenKind::Forall,
                TokenKind::Ident("x".into()),
                TokenKind::Dot,
                TokenKind::Not,
                TokenKind::Ident("nothing".into()),
            ]
        );
        // keyword prefixes stay identifiers
        assert_eq!(kinds("android"), vec![TokenKind::Ident("android".into())]);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("<-> -> <= >= != < > ="),
            vec![
                TokenKind::DoubleArrow,
                TokenKind::Arrow,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Ne,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Eq,
            ]
        );
    }

    #[test]
    fn test_integers() {
        assert_eq!(
            kinds("age(a) >= -18"),
            vec![
                TokenKind::Ident("age".into()),
                TokenKind::LParen,
                TokenKind::Ident("a".into()),
                TokenKind::RParen,
                TokenKind::Ge,
                TokenKind::Int(-18),
            ]
        );
        assert_eq!(kinds("a->b").len(), 3);
    }

    #[test]
    fn test_offsets() {
        let tokens = tokenize("  p(x)").unwrap();
        assert_eq!(tokens[0].offset, 2);
        assert_eq!(tokens[2].offset, 4);
    }

    #[test]
    fn test_quotes_rejected() {
        assert_eq!(
            tokenize("name(a, \"Bob\")"),
            Err(SyntaxError::StringLiteral { offset: 8 })
        );
        assert!(matches!(tokenize("p('a')"), Err(SyntaxError::StringLiteral { .. })));
    }

    #[test]
    fn test_unexpected_char() {
        assert_eq!(
            tokenize("p(a) & q(b)"),
            Err(SyntaxError::UnexpectedChar { ch: '&', offset: 5 })
        );
    }

    #[test]
    fn test_integer_overflow() {
        assert!(matches!(
            tokenize("x = 99999999999999999999999"),
            Err(SyntaxError::InvalidInteger { .. })
        ));
    }
}
