//! RTF lexer/tokenizer.
//!
//! Tokens borrow from the input bytes. Text is left undecoded: RTF text and
//! `\'hh` escapes are bytes in the document code page, which is only known
//! once the parser has seen `\ansicpg`.

use super::error::{RtfError, RtfResult};

/// Control word with optional parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlWord<'a> {
    // Document structure
    Rtf(i32),
    AnsiCodePage(i32),
    DefaultFont(i32),

    // Header groups
    FontTable,
    ColorTable,

    // Font properties
    FontNumber(i32),
    FontSize(i32),

    // Colors
    Red(i32),
    Green(i32),
    Blue(i32),
    ColorForeground(i32),

    // Character formatting
    Bold(bool),
    Italic(bool),
    Underline(bool),
    UnderlineNone,
    Plain,

    // Paragraph formatting
    Par,
    Pard,
    LeftAlign,
    RightAlign,
    Center,
    Justify,
    SpaceBetween(i32),
    LineMultiple(bool),
    ListOverride(i32),

    // Tables
    TableRowDefaults,
    TableRow,
    TableCell,
    NestedCell,
    NestedRow,
    CellX(i32),
    CellMergeFirst,
    CellMerged,
    CellBorder,
    InTable,

    // Unicode
    Unicode(i32),
    UnicodeSkip(i32),

    // Special
    Tab,
    Line,

    // Binary data
    Binary(i32),

    // Ignorable destination
    IgnorableDestination,

    // Unknown control word
    Unknown(&'a str, Option<i32>),
}

/// Token types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Opening brace
    OpenBrace,
    /// Closing brace
    CloseBrace,
    /// Control word
    Control(ControlWord<'a>),
    /// Raw text bytes in the document code page
    Text(&'a [u8]),
    /// A `\'hh` escaped byte in the document code page
    Hex(u8),
    /// A control symbol standing for one character, such as `\~`
    Symbol(char),
    /// Payload of `\binN`, skipped by the parser
    Binary(&'a [u8]),
}

/// RTF lexer over raw bytes.
pub struct Lexer<'a> {
    /// Source input
    input: &'a [u8],
    /// Current position in bytes
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer.
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Tokenize the entire input.
    pub fn tokenize(&mut self) -> RtfResult<Vec<Token<'a>>> {
        let mut tokens = Vec::with_capacity(self.input.len() / 4);

        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Get the next token, or `None` at the end of input.
    fn next_token(&mut self) -> RtfResult<Option<Token<'a>>> {
        // Line breaks in the source carry no meaning.
        while let Some(b'\r' | b'\n') = self.peek() {
            self.pos += 1;
        }

        let Some(byte) = self.peek() else {
            return Ok(None);
        };
        let token = match byte {
            b'{' => {
                self.pos += 1;
                Token::OpenBrace
            },
            b'}' => {
                self.pos += 1;
                Token::CloseBrace
            },
            b'\\' => self.parse_control()?,
            _ => self.parse_text(),
        };
        Ok(Some(token))
    }

    /// Parse a control word or control symbol.
    fn parse_control(&mut self) -> RtfResult<Token<'a>> {
        self.pos += 1; // Skip '\'

        let Some(byte) = self.peek() else {
            return Err(RtfError::UnexpectedEof(self.pos));
        };

        // Control symbols
        match byte {
            b'\\' | b'{' | b'}' => {
                let text = &self.input[self.pos..self.pos + 1];
                self.pos += 1;
                return Ok(Token::Text(text));
            },
            b'\'' => return self.parse_hex(),
            b'*' => {
                self.pos += 1;
                return Ok(Token::Control(ControlWord::IgnorableDestination));
            },
            b'\n' | b'\r' => {
                self.pos += 1;
                return Ok(Token::Control(ControlWord::Par));
            },
            b'~' => {
                self.pos += 1;
                return Ok(Token::Symbol('\u{00A0}'));
            },
            b'-' => {
                self.pos += 1;
                return Ok(Token::Symbol('\u{00AD}'));
            },
            b'_' => {
                self.pos += 1;
                return Ok(Token::Symbol('\u{2011}'));
            },
            b'\t' => {
                self.pos += 1;
                return Ok(Token::Control(ControlWord::Tab));
            },
            _ => {},
        }

        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_alphabetic()) {
            self.pos += 1;
        }

        if start == self.pos {
            // Unknown control symbol; skip it
            self.pos += 1;
            return Ok(Token::Control(ControlWord::Unknown("", None)));
        }

        // Alphabetic ASCII is valid UTF-8.
        let word = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| RtfError::InvalidControlWord(start))?;

        let param = self.parse_numeric_parameter()?;

        // A single space delimits the control word and belongs to it.
        if self.peek() == Some(b' ') {
            self.pos += 1;
        }

        let control = match_control_word(word, param);

        if let ControlWord::Binary(size) = control
            && size > 0
        {
            let end = (self.pos + size as usize).min(self.input.len());
            let payload = &self.input[self.pos..end];
            self.pos = end;
            return Ok(Token::Binary(payload));
        }

        Ok(Token::Control(control))
    }

    /// Parse numeric parameter after control word.
    fn parse_numeric_parameter(&mut self) -> RtfResult<Option<i32>> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }

        let digits = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }

        if digits == self.pos {
            self.pos = start;
            return Ok(None);
        }

        let num_str = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| RtfError::InvalidControlWord(start))?;
        // Out-of-range parameters saturate instead of failing the document.
        let num = match num_str.parse::<i64>() {
            Ok(n) => n.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
            Err(_) if num_str.starts_with('-') => i32::MIN,
            Err(_) => i32::MAX,
        };
        Ok(Some(num))
    }

    /// Parse hexadecimal character escape (\').
    fn parse_hex(&mut self) -> RtfResult<Token<'a>> {
        self.pos += 1; // Skip '\''

        let Some(hex) = self.input.get(self.pos..self.pos + 2) else {
            return Err(RtfError::UnexpectedEof(self.pos));
        };
        let byte = std::str::from_utf8(hex)
            .ok()
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .ok_or(RtfError::InvalidHex(self.pos))?;
        self.pos += 2;
        Ok(Token::Hex(byte))
    }

    /// Parse a run of literal text up to the next brace, backslash or line break.
    fn parse_text(&mut self) -> Token<'a> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| !matches!(b, b'\\' | b'{' | b'}' | b'\r' | b'\n'))
        {
            self.pos += 1;
        }
        Token::Text(&self.input[start..self.pos])
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }
}

/// Match control word string to enum variant.
fn match_control_word(word: &str, param: Option<i32>) -> ControlWord<'_> {
    let param_value = param.unwrap_or(1);
    let param_bool = param.unwrap_or(1) != 0;

    match word {
        "rtf" => ControlWord::Rtf(param_value),
        "ansicpg" => ControlWord::AnsiCodePage(param_value),
        "deff" => ControlWord::DefaultFont(param.unwrap_or(0)),

        "fonttbl" => ControlWord::FontTable,
        "colortbl" => ControlWord::ColorTable,

        "f" => ControlWord::FontNumber(param_value),
        "fs" => ControlWord::FontSize(param_value),

        "red" => ControlWord::Red(param_value),
        "green" => ControlWord::Green(param_value),
        "blue" => ControlWord::Blue(param_value),
        "cf" => ControlWord::ColorForeground(param_value),

        "b" => ControlWord::Bold(param_bool),
        "i" => ControlWord::Italic(param_bool),
        "ul" => ControlWord::Underline(param_bool),
        "ulnone" => ControlWord::UnderlineNone,
        "plain" => ControlWord::Plain,

        "par" => ControlWord::Par,
        "pard" => ControlWord::Pard,
        "ql" => ControlWord::LeftAlign,
        "qr" => ControlWord::RightAlign,
        "qc" => ControlWord::Center,
        "qj" => ControlWord::Justify,
        "sl" => ControlWord::SpaceBetween(param.unwrap_or(0)),
        "slmult" => ControlWord::LineMultiple(param_bool),
        "ls" => ControlWord::ListOverride(param_value),

        "trowd" => ControlWord::TableRowDefaults,
        "row" => ControlWord::TableRow,
        "cell" => ControlWord::TableCell,
        "nestcell" => ControlWord::NestedCell,
        "nestrow" => ControlWord::NestedRow,
        "cellx" => ControlWord::CellX(param_value),
        "clmgf" => ControlWord::CellMergeFirst,
        "clmrg" => ControlWord::CellMerged,
        "clbrdrt" | "clbrdrl" | "clbrdrb" | "clbrdrr" => ControlWord::CellBorder,
        "intbl" => ControlWord::InTable,

        "u" => ControlWord::Unicode(param.unwrap_or(0)),
        "uc" => ControlWord::UnicodeSkip(param_value),

        "tab" => ControlWord::Tab,
        "line" => ControlWord::Line,

        "bin" => ControlWord::Binary(param.unwrap_or(0)),

        _ => ControlWord::Unknown(word, param),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        Lexer::new(input.as_bytes()).tokenize().unwrap()
    }

    #[test]
    fn test_simple_tokenization() {
        let tokens = tokens(r"{\rtf1\ansi Hello}");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0], Token::OpenBrace);
        assert_eq!(tokens[1], Token::Control(ControlWord::Rtf(1)));
        assert_eq!(tokens[2], Token::Control(ControlWord::Unknown("ansi", None)));
        assert_eq!(tokens[3], Token::Text(b"Hello"));
        assert_eq!(tokens[4], Token::CloseBrace);
    }

    #[test]
    fn test_parameters_and_delimiter() {
        let tokens = tokens(r"\fs-24 \b0\u8226?x");
        assert_eq!(tokens[0], Token::Control(ControlWord::FontSize(-24)));
        assert_eq!(tokens[1], Token::Control(ControlWord::Bold(false)));
        assert_eq!(tokens[2], Token::Control(ControlWord::Unicode(8226)));
        assert_eq!(tokens[3], Token::Text(b"?x"));
    }

    #[test]
    fn test_symbols_and_hex() {
        let tokens = tokens(r"a\{b\}\\\'e9\~");
        assert_eq!(
            tokens,
            vec![
                Token::Text(b"a"),
                Token::Text(b"{"),
                Token::Text(b"b"),
                Token::Text(b"}"),
                Token::Text(b"\\"),
                Token::Hex(0xE9),
                Token::Symbol('\u{00A0}'),
            ]
        );
    }

    #[test]
    fn test_line_breaks_are_ignored() {
        let tokens = tokens("ab\r\ncd");
        assert_eq!(tokens, vec![Token::Text(b"ab"), Token::Text(b"cd")]);
    }

    #[test]
    fn test_binary_payload_is_skipped() {
        let tokens = tokens("\\bin3 \x00}{z");
        assert_eq!(tokens, vec![Token::Binary(b"\x00}{"), Token::Text(b"z")]);
    }

    #[test]
    fn test_bad_hex_is_an_error() {
        assert_eq!(Lexer::new(br"\'a").tokenize(), Err(RtfError::UnexpectedEof(2)));
        assert_eq!(Lexer::new(br"\'zz").tokenize(), Err(RtfError::InvalidHex(2)));
    }
}
