//! Tokenizer for the shader template language.
//!
//! The lexer never fails: every finite input string produces a (possibly
//! empty) token stream. Whitespace, line comments, and bytes outside the
//! recognized alphabet are discarded silently; the bulk of a GLSL shader
//! body is never turned into tokens at all because the directive parser
//! only cares about `{{ ... }}` regions and everything else is replayed
//! from the original source by byte offset (see `crate::rewriter`).

/// A single lexical token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character of this token in the source.
    pub source_offset: usize,
}

/// Closed set of token kinds recognized by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // structural punctuation
    Hash,
    LBrace,
    RBrace,
    DoubleLBrace,
    DoubleRBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    Eq,
    Plus,
    PlusPlus,
    Minus,
    MinusMinus,
    Star,
    Slash,

    // GLSL keywords of interest
    In,
    Out,
    Version,
    Void,
    Uniform,
    Sampler,
    Sampler2D,
    Texture2D,
    Image2D,

    // scalar/vector/matrix types
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,

    // directive keywords
    KwVersion,
    KwLocation,
    KwSetBinding,
    KwPushConstant,
    KwRateVertex,
    KwRateInstance,
    KwBinding,
    KwOffset,
    KwTightlyPacked,
    KwBufferLabel,

    /// Anything else: identifiers, numeric literals (as text).
    Text(String),
}

impl TokenKind {
    fn from_identifier(s: &str) -> TokenKind {
        match s {
            "in" => TokenKind::In,
            "out" => TokenKind::Out,
            "version" => TokenKind::Version,
            "void" => TokenKind::Void,
            "uniform" => TokenKind::Uniform,
            "sampler" => TokenKind::Sampler,
            "sampler2D" => TokenKind::Sampler2D,
            "texture2D" => TokenKind::Texture2D,
            "image2D" => TokenKind::Image2D,
            "float" => TokenKind::Float,
            "vec2" => TokenKind::Vec2,
            "vec3" => TokenKind::Vec3,
            "vec4" => TokenKind::Vec4,
            "mat2" => TokenKind::Mat2,
            "mat3" => TokenKind::Mat3,
            "mat4" => TokenKind::Mat4,
            "VERSION" => TokenKind::KwVersion,
            "LOCATION" => TokenKind::KwLocation,
            "SET_BINDING" => TokenKind::KwSetBinding,
            "PUSH_CONSTANT" => TokenKind::KwPushConstant,
            "RATE_VERTEX" => TokenKind::KwRateVertex,
            "RATE_INSTANCE" => TokenKind::KwRateInstance,
            "BINDING" => TokenKind::KwBinding,
            "OFFSET" => TokenKind::KwOffset,
            "TIGHTLY_PACKED" => TokenKind::KwTightlyPacked,
            "BUFFER_LABEL" => TokenKind::KwBufferLabel,
            _ => TokenKind::Text(s.to_owned()),
        }
    }

    /// The source text this token would be rewritten from, if it carries one.
    pub fn text(&self) -> Option<&str> {
        match self {
            TokenKind::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Tokenize a shader source string. Total: always terminates and never
/// errors, even on malformed input.
pub fn lex(source: &str) -> Vec<Token> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0usize;
    let len = bytes.len();

    while i < len {
        let b = bytes[i];

        // whitespace
        if b == b' ' || b == b'\t' || b == b'\n' || b == b'\r' {
            i += 1;
            continue;
        }

        // line comments
        if b == b'/' && i + 1 < len && bytes[i + 1] == b'/' {
            while i < len && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }

        // two-character punctuation, checked before one-character
        if i + 1 < len {
            let two = (b, bytes[i + 1]);
            let kind = match two {
                (b'{', b'{') => Some(TokenKind::DoubleLBrace),
                (b'}', b'}') => Some(TokenKind::DoubleRBrace),
                (b'+', b'+') => Some(TokenKind::PlusPlus),
                (b'-', b'-') => Some(TokenKind::MinusMinus),
                _ => None,
            };
            if let Some(kind) = kind {
                tokens.push(Token {
                    kind,
                    source_offset: i,
                });
                i += 2;
                continue;
            }
        }

        // one-character punctuation
        let kind = match b {
            b'#' => Some(TokenKind::Hash),
            b'{' => Some(TokenKind::LBrace),
            b'}' => Some(TokenKind::RBrace),
            b'(' => Some(TokenKind::LParen),
            b')' => Some(TokenKind::RParen),
            b'[' => Some(TokenKind::LBracket),
            b']' => Some(TokenKind::RBracket),
            b';' => Some(TokenKind::Semi),
            b',' => Some(TokenKind::Comma),
            b'.' => Some(TokenKind::Dot),
            b'=' => Some(TokenKind::Eq),
            b'+' => Some(TokenKind::Plus),
            b'-' => Some(TokenKind::Minus),
            b'*' => Some(TokenKind::Star),
            b'/' => Some(TokenKind::Slash),
            _ => None,
        };
        if let Some(kind) = kind {
            tokens.push(Token {
                kind,
                source_offset: i,
            });
            i += 1;
            continue;
        }

        // identifier-class run: [A-Za-z0-9_]+ (covers identifiers, keywords
        // and numeric literals, which are just runs of digits)
        if is_ident_char(b) {
            let start = i;
            while i < len && is_ident_char(bytes[i]) {
                i += 1;
            }
            let text = &source[start..i];
            tokens.push(Token {
                kind: TokenKind::from_identifier(text),
                source_offset: start,
            });
            continue;
        }

        // anything else is outside the recognized alphabet: skip silently
        i += 1;
    }

    tokens
}
