use strum_macros::{Display, EnumString};

/// Declared scalar type of a variable or value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum DataType {
    Int,
    Float,
    Bool,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Flow {
    #[strum(to_string = "if")]
    If,
    #[strum(to_string = "while")]
    While,
    #[strum(to_string = "for")]
    For,
}

/// Keywords that close (or split) a block of statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BlockEnd {
    #[strum(to_string = "else")]
    Else,
    #[strum(to_string = "endif")]
    EndIf,
    #[strum(to_string = "endwhile")]
    EndWhile,
    #[strum(to_string = "endfor")]
    EndFor,
}

/// Words that only appear inside a `for` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Clause {
    #[strum(to_string = "to")]
    To,
    #[strum(to_string = "by")]
    By,
    #[strum(to_string = "in")]
    In,
    #[strum(to_string = "from")]
    From,
}

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Operator {
    #[strum(to_string = "+")] Plus,
    #[strum(to_string = "-")] Minus,
    #[strum(to_string = "*")] Star,
    #[strum(to_string = "/")] Slash,
    #[strum(to_string = "^")] Caret,
    #[strum(to_string = "<")] Less,
    #[strum(to_string = ">")] Greater,
    #[strum(to_string = "<=")] LessEqual,
    #[strum(to_string = ">=")] GreaterEqual,
    #[strum(to_string = "==")] EqualEqual,
    #[strum(to_string = "!=")] BangEqual,
    #[strum(to_string = "=")] Equal,
    #[strum(to_string = "+=")] PlusEqual,
    #[strum(to_string = "-=")] MinusEqual,
    #[strum(to_string = "*=")] StarEqual,
    #[strum(to_string = "/=")] SlashEqual,
    #[strum(to_string = "^=")] CaretEqual,
}

impl Operator {
    pub fn is_compound_assignment(self) -> bool {
        match self {
            Operator::PlusEqual
            | Operator::MinusEqual
            | Operator::StarEqual
            | Operator::SlashEqual
            | Operator::CaretEqual => true,
            _ => false,
        }
    }
}

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Separator {
    #[strum(to_string = "(")] LeftParen,
    #[strum(to_string = ")")] RightParen,
    #[strum(to_string = "[")] LeftBracket,
    #[strum(to_string = "]")] RightBracket,
    #[strum(to_string = ",")] Comma,
    #[strum(to_string = ";")] Semicolon,
    #[strum(to_string = ":")] Colon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BuiltIn {
    #[strum(to_string = "print")]
    Print,
    #[strum(to_string = "LENGTH")]
    Length,
    #[strum(to_string = "SPACES")]
    Spaces,
}

/// Every lexeme kind, resolved once by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // Control.
    Declare(DataType),
    Flow(Flow),
    End(BlockEnd),
    Clause(Clause),

    // Operands.
    Identifier,
    Integer,
    Float,
    Boolean,
    Str,

    Operator(Operator),
    Separator(Separator),

    // Functions.
    BuiltIn(BuiltIn),
    UserFunction,

    Debug,
    EOF,
}

/// Primary classification of a lexeme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Class {
    Control,
    Operand,
    Operator,
    Separator,
    Function,
    EOF,
    Debug,
}

/// Secondary classification, meaningful relative to the primary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SubClass {
    Declare,
    Flow,
    End,
    Identifier,
    Integer,
    Float,
    Boolean,
    String,
    BuiltIn,
    User,
}

impl TokenType {
    pub fn class(self) -> Class {
        match self {
            TokenType::Declare(_)
            | TokenType::Flow(_)
            | TokenType::End(_)
            | TokenType::Clause(_) => Class::Control,
            TokenType::Identifier
            | TokenType::Integer
            | TokenType::Float
            | TokenType::Boolean
            | TokenType::Str => Class::Operand,
            TokenType::Operator(_) => Class::Operator,
            TokenType::Separator(_) => Class::Separator,
            TokenType::BuiltIn(_) | TokenType::UserFunction => Class::Function,
            TokenType::Debug => Class::Debug,
            TokenType::EOF => Class::EOF,
        }
    }

    pub fn subclass(self) -> Option<SubClass> {
        match self {
            TokenType::Declare(_) => Some(SubClass::Declare),
            TokenType::Flow(_) | TokenType::Clause(_) => Some(SubClass::Flow),
            TokenType::End(_) => Some(SubClass::End),
            TokenType::Identifier => Some(SubClass::Identifier),
            TokenType::Integer => Some(SubClass::Integer),
            TokenType::Float => Some(SubClass::Float),
            TokenType::Boolean => Some(SubClass::Boolean),
            TokenType::Str => Some(SubClass::String),
            TokenType::BuiltIn(_) => Some(SubClass::BuiltIn),
            TokenType::UserFunction => Some(SubClass::User),
            TokenType::Operator(_)
            | TokenType::Separator(_)
            | TokenType::Debug
            | TokenType::EOF => None,
        }
    }

    pub fn is_operand(self) -> bool {
        self.class() == Class::Operand
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tokentype: TokenType,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn is(&self, tokentype: TokenType) -> bool {
        self.tokentype == tokentype
    }

    pub fn is_separator(&self, separator: Separator) -> bool {
        self.tokentype == TokenType::Separator(separator)
    }

    pub fn is_eof(&self) -> bool {
        self.tokentype == TokenType::EOF
    }
}
