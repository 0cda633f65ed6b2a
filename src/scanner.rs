use crate::error::{ErrorKind, InterpretError};
use crate::token::{
    BlockEnd, BuiltIn, Clause, DataType, Flow, Operator, Separator, Token, TokenType,
};
use phf::phf_map;
use std::iter::Peekable;
use std::str::CharIndices;

struct Lexer<'a> {
    source: &'a str,
    iter: Peekable<CharIndices<'a>>,
    start: usize,
    line: usize,
    line_start: usize,
}

/// Turns source text into a token buffer terminated by exactly one EOF token.
pub fn scan_tokens(source: &str) -> Result<Vec<Token>, InterpretError> {
    let mut lexer = Lexer {
        source,
        iter: source.char_indices().peekable(),
        start: 0,
        line: 1,
        line_start: 0,
    };
    let mut tokens: Vec<Token> = Vec::new();

    while let Some((idx, _)) = lexer.iter.peek() {
        lexer.start = *idx;
        if let Some(token) = lexer.scan_token()? {
            tokens.push(token);
        }
    }
    lexer.start = source.len();
    tokens.push(Token {
        tokentype: TokenType::EOF,
        lexeme: String::new(),
        line: lexer.line,
        column: lexer.column(),
    });

    // A call to anything that is not a built-in is a user function.
    for i in 0..tokens.len() - 1 {
        if tokens[i].tokentype == TokenType::Identifier
            && tokens[i + 1].is_separator(Separator::LeftParen)
        {
            tokens[i].tokentype = TokenType::UserFunction;
        }
    }
    Ok(tokens)
}

impl<'a> Lexer<'a> {
    fn scan_token(&mut self) -> Result<Option<Token>, InterpretError> {
        let c = match self.iter.next() {
            Some((_, c)) => c,
            None => return Ok(None),
        };
        match c {
            '(' => Ok(Some(self.separator(Separator::LeftParen))),
            ')' => Ok(Some(self.separator(Separator::RightParen))),
            '[' => Ok(Some(self.separator(Separator::LeftBracket))),
            ']' => Ok(Some(self.separator(Separator::RightBracket))),
            ',' => Ok(Some(self.separator(Separator::Comma))),
            ';' => Ok(Some(self.separator(Separator::Semicolon))),
            ':' => Ok(Some(self.separator(Separator::Colon))),
            '+' => Ok(Some(self.operator_or_assign(Operator::Plus, Operator::PlusEqual))),
            '-' => Ok(Some(self.operator_or_assign(Operator::Minus, Operator::MinusEqual))),
            '*' => Ok(Some(self.operator_or_assign(Operator::Star, Operator::StarEqual))),
            '^' => Ok(Some(self.operator_or_assign(Operator::Caret, Operator::CaretEqual))),
            '<' => Ok(Some(self.operator_or_assign(Operator::Less, Operator::LessEqual))),
            '>' => Ok(Some(self.operator_or_assign(Operator::Greater, Operator::GreaterEqual))),
            '=' => Ok(Some(self.operator_or_assign(Operator::Equal, Operator::EqualEqual))),
            '!' => {
                if self.next_if('=') {
                    Ok(Some(self.operator(Operator::BangEqual)))
                } else {
                    Err(self.error("'!' must be followed by '='"))
                }
            }
            '/' => {
                if self.next_if('/') {
                    while let Some((_, c)) = self.iter.peek() {
                        if *c == '\n' {
                            break;
                        }
                        self.iter.next();
                    }
                    Ok(None)
                } else {
                    Ok(Some(self.operator_or_assign(Operator::Slash, Operator::SlashEqual)))
                }
            }
            ' ' | '\r' | '\t' => Ok(None),
            '\n' => {
                self.line += 1;
                self.line_start = self.start + 1;
                Ok(None)
            }
            '"' | '\'' => Ok(Some(self.string(c)?)),
            '0'..='9' => Ok(Some(self.number()?)),
            'a'..='z' | 'A'..='Z' | '_' => Ok(Some(self.identifier())),
            _ => Err(self.error(&format!("unrecognized character '{}'", c))),
        }
    }

    fn current(&mut self) -> usize {
        match self.iter.peek() {
            None => self.source.len(),
            Some((idx, _)) => *idx,
        }
    }

    fn column(&self) -> usize {
        self.source[self.line_start..self.start].chars().count() + 1
    }

    fn token(&mut self, tokentype: TokenType) -> Token {
        let current = self.current();
        Token {
            tokentype,
            lexeme: self.source[self.start..current].to_string(),
            line: self.line,
            column: self.column(),
        }
    }

    fn separator(&mut self, separator: Separator) -> Token {
        self.token(TokenType::Separator(separator))
    }

    fn operator(&mut self, operator: Operator) -> Token {
        self.token(TokenType::Operator(operator))
    }

    fn operator_or_assign(&mut self, single: Operator, with_equal: Operator) -> Token {
        if self.next_if('=') {
            self.operator(with_equal)
        } else {
            self.operator(single)
        }
    }

    fn next_if(&mut self, expected: char) -> bool {
        if let Some((_, c)) = self.iter.peek() {
            if *c == expected {
                self.iter.next();
                return true;
            }
        }
        false
    }

    fn error(&mut self, message: &str) -> InterpretError {
        let current = self.current();
        let column = self.column();
        let text = &self.source[self.start..current];
        InterpretError::new(
            ErrorKind::LexicalError,
            self.line,
            column,
            format!("{} in '{}'", message, text.trim_end()),
        )
    }

    fn string(&mut self, quote: char) -> Result<Token, InterpretError> {
        let mut text = String::new();
        loop {
            match self.iter.next() {
                Some((_, c)) if c == quote => break,
                Some((_, '\\')) => match self.iter.next() {
                    Some((_, 'n')) => text.push('\n'),
                    Some((_, 't')) => text.push('\t'),
                    Some((_, c)) if c == '"' || c == '\'' || c == '\\' => text.push(c),
                    Some((_, c)) if c != '\n' => {
                        return Err(self.error(&format!("unknown escape '\\{}'", c)))
                    }
                    _ => return Err(self.error("unterminated string literal")),
                },
                Some((_, '\n')) | None => return Err(self.error("unterminated string literal")),
                Some((_, c)) => text.push(c),
            }
        }
        let mut token = self.token(TokenType::Str);
        token.lexeme = text;
        Ok(token)
    }

    fn digits(&mut self) {
        while let Some((_, c)) = self.iter.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            self.iter.next();
        }
    }

    fn number(&mut self) -> Result<Token, InterpretError> {
        self.digits();
        let mut tokentype = TokenType::Integer;
        if self.next_if('.') {
            tokentype = TokenType::Float;
            self.digits();
        }
        if let Some((_, c)) = self.iter.peek() {
            if c.is_alphanumeric() || *c == '_' || *c == '.' {
                self.iter.next();
                return Err(self.error("malformed numeric literal"));
            }
        }
        Ok(self.token(tokentype))
    }

    fn identifier(&mut self) -> Token {
        while let Some((_, c)) = self.iter.peek() {
            match c {
                '0'..='9' | 'a'..='z' | 'A'..='Z' | '_' => {
                    self.iter.next();
                }
                _ => break,
            }
        }
        let current = self.current();
        let source = self.source;
        match KEYWORDS.get(&source[self.start..current]) {
            None => self.token(TokenType::Identifier),
            Some(x) => self.token(*x),
        }
    }
}

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "Int" => TokenType::Declare(DataType::Int),
    "Float" => TokenType::Declare(DataType::Float),
    "Bool" => TokenType::Declare(DataType::Bool),
    "String" => TokenType::Declare(DataType::String),
    "if" => TokenType::Flow(Flow::If),
    "while" => TokenType::Flow(Flow::While),
    "for" => TokenType::Flow(Flow::For),
    "else" => TokenType::End(BlockEnd::Else),
    "endif" => TokenType::End(BlockEnd::EndIf),
    "endwhile" => TokenType::End(BlockEnd::EndWhile),
    "endfor" => TokenType::End(BlockEnd::EndFor),
    "to" => TokenType::Clause(Clause::To),
    "by" => TokenType::Clause(Clause::By),
    "in" => TokenType::Clause(Clause::In),
    "from" => TokenType::Clause(Clause::From),
    "T" => TokenType::Boolean,
    "F" => TokenType::Boolean,
    "print" => TokenType::BuiltIn(BuiltIn::Print),
    "LENGTH" => TokenType::BuiltIn(BuiltIn::Length),
    "SPACES" => TokenType::BuiltIn(BuiltIn::Spaces),
    "debug" => TokenType::Debug,
};

/// Position of a lexeme in the scanner's buffer, used to rewind to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

/// Cursor over the materialized token buffer with one token of lookahead.
pub struct Scanner {
    tokens: Vec<Token>,
    // Number of tokens consumed; the current token sits at `position - 1`.
    position: usize,
}

impl Scanner {
    pub fn new(source: &str) -> Result<Scanner, InterpretError> {
        Ok(Scanner {
            tokens: scan_tokens(source)?,
            position: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// The last token returned by `advance`. Before the first advance this is
    /// the first token of the program.
    pub fn current(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub fn next(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    /// Moves onto the next token. Past the end the EOF token stays current.
    pub fn advance(&mut self) -> &Token {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        self.current()
    }

    pub fn mark(&self) -> Mark {
        Mark(self.position)
    }

    /// Makes the token recorded by `mark` current again.
    pub fn rewind(&mut self, to: Mark) {
        self.position = to.0;
    }

    /// Advances until the current token is `target`. The current token is
    /// checked first, so a cursor already on `target` does not move.
    pub fn skip_until(&mut self, target: TokenType) -> Result<(), InterpretError> {
        let from = self.current().clone();
        loop {
            let current = self.current();
            if current.tokentype == target {
                return Ok(());
            }
            if current.is_eof() {
                return Err(InterpretError::at(
                    ErrorKind::UnterminatedConstruct,
                    &from,
                    format!("'{}' has no following '{}'", from.lexeme, describe(target)),
                ));
            }
            self.advance();
        }
    }
}

fn describe(tokentype: TokenType) -> String {
    match tokentype {
        TokenType::Separator(s) => s.to_string(),
        TokenType::Operator(o) => o.to_string(),
        TokenType::End(e) => e.to_string(),
        TokenType::Clause(c) => c.to_string(),
        TokenType::Flow(f) => f.to_string(),
        other => format!("{:?}", other),
    }
}

#[cfg(test)]
mod scanner_tests {
    use crate::error::ErrorKind;
    use crate::scanner::{scan_tokens, Scanner};
    use crate::token::{
        BlockEnd, BuiltIn, Class, DataType, Operator, Separator, SubClass, TokenType,
    };

    fn types(source: &str) -> Vec<TokenType> {
        scan_tokens(source)
            .unwrap()
            .into_iter()
            .map(|t| t.tokentype)
            .collect()
    }

    #[test]
    fn basic_scanner_test() {
        let tokens = scan_tokens("Int x = 2;").unwrap();
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[0].tokentype, TokenType::Declare(DataType::Int));
        assert_eq!(tokens[1].tokentype, TokenType::Identifier);
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[2].tokentype, TokenType::Operator(Operator::Equal));
        assert_eq!(tokens[3].tokentype, TokenType::Integer);
        assert_eq!(tokens[4].tokentype, TokenType::Separator(Separator::Semicolon));
        assert!(tokens[5].is_eof());
    }

    #[test]
    fn multi_character_operators_are_greedy() {
        assert_eq!(
            types("a<=b==c!=d>=e+=1"),
            vec![
                TokenType::Identifier,
                TokenType::Operator(Operator::LessEqual),
                TokenType::Identifier,
                TokenType::Operator(Operator::EqualEqual),
                TokenType::Identifier,
                TokenType::Operator(Operator::BangEqual),
                TokenType::Identifier,
                TokenType::Operator(Operator::GreaterEqual),
                TokenType::Identifier,
                TokenType::Operator(Operator::PlusEqual),
                TokenType::Integer,
                TokenType::EOF,
            ]
        );
    }

    #[test]
    fn number_parsing() {
        let tokens = scan_tokens("12 3.25 7.").unwrap();
        assert_eq!(tokens[0].tokentype, TokenType::Integer);
        assert_eq!(tokens[1].tokentype, TokenType::Float);
        assert_eq!(tokens[1].lexeme, "3.25");
        assert_eq!(tokens[2].tokentype, TokenType::Float);
    }

    #[test]
    fn malformed_number_is_lexical_error() {
        let err = scan_tokens("x = 12ab;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::LexicalError);
        assert_eq!(err.column, 5);
    }

    #[test]
    fn strings_and_escapes() {
        let tokens = scan_tokens(r#"print("a\"b", 'c d', "");"#).unwrap();
        assert_eq!(tokens[2].tokentype, TokenType::Str);
        assert_eq!(tokens[2].lexeme, "a\"b");
        assert_eq!(tokens[4].lexeme, "c d");
        assert_eq!(tokens[6].lexeme, "");
    }

    #[test]
    fn unterminated_string() {
        let err = scan_tokens("String s = \"abc\n;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::LexicalError);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn unrecognized_character() {
        let err = scan_tokens("Int x;\nx = 1 # 2;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::LexicalError);
        assert_eq!((err.line, err.column), (2, 7));
    }

    #[test]
    fn keywords_and_functions() {
        let tokens = scan_tokens("if T: print(LENGTH(s)); foo(1); endif;").unwrap();
        assert_eq!(tokens[0].tokentype.class(), Class::Control);
        assert_eq!(tokens[1].tokentype, TokenType::Boolean);
        assert_eq!(tokens[3].tokentype, TokenType::BuiltIn(BuiltIn::Print));
        assert_eq!(tokens[5].tokentype, TokenType::BuiltIn(BuiltIn::Length));
        assert_eq!(tokens[11].tokentype, TokenType::UserFunction);
        assert_eq!(tokens[11].tokentype.subclass(), Some(SubClass::User));
        assert_eq!(tokens[16].tokentype, TokenType::End(BlockEnd::EndIf));
    }

    #[test]
    fn comments_and_positions() {
        let tokens = scan_tokens("// header\n  Int  count; // trailing\nx").unwrap();
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[0].column, 3);
        assert_eq!(tokens[1].column, 8);
        assert_eq!(tokens[3].line, 3);
        assert_eq!(tokens[3].column, 1);
        assert!(tokens[4].is_eof());
    }

    #[test]
    fn cursor_lookahead_and_rewind() {
        let mut scanner = Scanner::new("a = 1 ; b").unwrap();
        assert_eq!(scanner.next().lexeme, "a");
        scanner.advance();
        let mark = scanner.mark();
        assert_eq!(scanner.current().lexeme, "a");
        assert_eq!(scanner.next().lexeme, "=");
        scanner.advance();
        scanner.advance();
        assert_eq!(scanner.current().lexeme, "1");
        scanner.rewind(mark);
        assert_eq!(scanner.current().lexeme, "a");
        assert_eq!(scanner.next().lexeme, "=");
    }

    #[test]
    fn skip_until_lands_on_target() {
        let mut scanner = Scanner::new("if x > 1 : y = 2;").unwrap();
        scanner.advance();
        scanner
            .skip_until(TokenType::Separator(Separator::Colon))
            .unwrap();
        assert_eq!(scanner.current().lexeme, ":");
        assert_eq!(scanner.next().lexeme, "y");
    }

    #[test]
    fn skip_until_reports_unterminated() {
        let mut scanner = Scanner::new("while x < 3\n  x = 1;").unwrap();
        scanner.advance();
        let err = scanner
            .skip_until(TokenType::Separator(Separator::Colon))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedConstruct);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn advance_stops_at_eof() {
        let mut scanner = Scanner::new("x").unwrap();
        scanner.advance();
        scanner.advance();
        scanner.advance();
        assert!(scanner.current().is_eof());
        assert!(scanner.next().is_eof());
    }
}
