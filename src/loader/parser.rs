//! nom grammar for `.proto` source files
//!
//! Covers the proto2/proto3 subset the checker needs: packages, messages (nested),
//! enums, fields with labels and options, map fields, oneofs, extend blocks,
//! extension and reserved ranges. Services are skipped as balanced blocks.
//! Groups are not supported.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_until, take_while, take_while1},
    character::complete::{anychar, char, digit1, hex_digit1, multispace1, none_of, one_of, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, value},
    error::{ErrorKind, ParseError, VerboseError},
    multi::{many0, many1, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    Finish, IResult, Parser,
};

use crate::schema::{EnumType, EnumValue, Field, Label, MapField};

pub type NomParseError<'a> = VerboseError<&'a str>;
pub type ParseResult<'a, T> = IResult<&'a str, T, NomParseError<'a>>;

/// A file-level statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Syntax(String),
    Package(String),
    Import(String),
    Option(String, String),
    Message(MessageDecl),
    Enum(EnumType),
    Extend { target: String, fields: Vec<RawField> },
    Service(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageDecl {
    pub name: String,
    pub items: Vec<MessageItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageItem {
    Field(RawField),
    Map(MapField),
    OneOf { name: String, fields: Vec<RawField> },
    Message(MessageDecl),
    Enum(EnumType),
    Extend { target: String, fields: Vec<RawField> },
    Extensions(String),
    Reserved(String),
    Option(String, String),
    Empty,
}

/// A field as written; the label is absent for proto3 singular and oneof fields
#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    pub label: Option<Label>,
    pub type_name: String,
    pub name: String,
    pub tag: u32,
    pub default_value: Option<String>,
}

impl RawField {
    /// Fields without an explicit label load as `Optional`
    pub fn into_field(self) -> Field {
        Field {
            name: self.name,
            tag: self.tag,
            label: self.label.unwrap_or(Label::Optional),
            type_name: self.type_name,
            referenced_type: None,
            default_value: self.default_value,
        }
    }
}

/// Parse a complete `.proto` source
pub fn parse_proto(input: &str) -> Result<Vec<Statement>, NomParseError<'_>> {
    let (_, statements) = all_consuming(terminated(many0(statement), sp))(input).finish()?;
    Ok(statements)
}

// ---------------------------------------------------------------------------
// Lexical helpers
// ---------------------------------------------------------------------------

fn comment(input: &str) -> ParseResult<'_, &str> {
    alt((
        recognize(pair(tag("//"), take_while(|c: char| c != '\n'))),
        recognize(tuple((tag("/*"), take_until("*/"), tag("*/")))),
    ))(input)
}

/// Whitespace and comments
fn sp(input: &str) -> ParseResult<'_, ()> {
    value((), many0(alt((multispace1, comment))))(input)
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> ParseResult<'a, O>
where
    F: Parser<&'a str, O, NomParseError<'a>>,
{
    preceded(sp, inner)
}

fn sym<'a>(c: char) -> impl FnMut(&'a str) -> ParseResult<'a, char> {
    ws(char(c))
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> ParseResult<'a, &'a str> {
    ws(terminated(tag(kw), not(satisfy(is_ident_char))))
}

fn ident_raw(input: &str) -> ParseResult<'_, &str> {
    recognize(pair(satisfy(is_ident_start), take_while(is_ident_char)))(input)
}

fn ident(input: &str) -> ParseResult<'_, String> {
    map(ws(ident_raw), str::to_string)(input)
}

fn full_ident_raw(input: &str) -> ParseResult<'_, &str> {
    recognize(pair(opt(char('.')), separated_list1(char('.'), ident_raw)))(input)
}

/// Dotted identifier, optionally with a leading `.` for absolute type references
fn full_ident(input: &str) -> ParseResult<'_, String> {
    map(ws(full_ident_raw), str::to_string)(input)
}

fn quoted_body<'a>(quote: char, stop: &'static str) -> impl FnMut(&'a str) -> ParseResult<'a, &'a str> {
    delimited(
        char(quote),
        recognize(many0(alt((
            recognize(pair(char('\\'), anychar)),
            recognize(none_of(stop)),
        )))),
        char(quote),
    )
}

fn string_raw(input: &str) -> ParseResult<'_, &str> {
    alt((quoted_body('"', "\"\\\n"), quoted_body('\'', "'\\\n")))(input)
}

/// String literal contents, escapes left as written
fn str_lit(input: &str) -> ParseResult<'_, String> {
    map(ws(string_raw), str::to_string)(input)
}

/// Decimal, hex or octal integer
fn int_lit(input: &str) -> ParseResult<'_, u32> {
    ws(alt((
        map_res(preceded(alt((tag("0x"), tag("0X"))), hex_digit1), |h: &str| {
            u32::from_str_radix(h, 16)
        }),
        map_res(digit1, |d: &str| {
            if d.len() > 1 && d.starts_with('0') {
                u32::from_str_radix(&d[1..], 8)
            } else {
                d.parse::<u32>()
            }
        }),
    )))(input)
}

fn signed_int(input: &str) -> ParseResult<'_, i64> {
    let (input, negative) = map(opt(sym('-')), |sign| sign.is_some())(input)?;
    let (input, number) = int_lit(input)?;
    let number = i64::from(number);
    Ok((input, if negative { -number } else { number }))
}

/// Skip a `{ ... }` block, honoring nesting, strings and comments
fn balanced_block(input: &str) -> ParseResult<'_, &str> {
    let (start, _) = sp(input)?;
    let (mut rest, _) = char('{')(start)?;
    let mut depth = 1usize;
    while depth > 0 {
        if let Ok((remaining, _)) = comment(rest) {
            rest = remaining;
            continue;
        }
        if let Ok((remaining, _)) = string_raw(rest) {
            rest = remaining;
            continue;
        }
        let mut chars = rest.chars();
        match chars.next() {
            Some('{') => depth += 1,
            Some('}') => depth -= 1,
            Some(_) => {}
            None => {
                return Err(nom::Err::Error(VerboseError::from_error_kind(
                    rest,
                    ErrorKind::Eof,
                )))
            }
        }
        rest = chars.as_str();
    }
    Ok((rest, &start[..start.len() - rest.len()]))
}

/// Scalar, identifier, or aggregate option value
fn constant(input: &str) -> ParseResult<'_, String> {
    alt((
        str_lit,
        map(
            ws(recognize(tuple((
                opt(one_of("+-")),
                take_while1(|c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_')),
                opt(pair(one_of("+-"), digit1)),
            )))),
            str::to_string,
        ),
        map(balanced_block, str::to_string),
    ))(input)
}

/// `foo`, `(custom.ext)`, `(custom.ext).field`
fn option_name(input: &str) -> ParseResult<'_, String> {
    map(
        ws(recognize(many1(alt((
            recognize(delimited(char('('), full_ident_raw, char(')'))),
            recognize(char('.')),
            ident_raw,
        ))))),
        str::to_string,
    )(input)
}

fn field_options(input: &str) -> ParseResult<'_, Vec<(String, String)>> {
    map(
        opt(delimited(
            sym('['),
            separated_list1(sym(','), separated_pair(option_name, sym('='), constant)),
            sym(']'),
        )),
        Option::unwrap_or_default,
    )(input)
}

/// Text up to the terminating `;`
fn until_semicolon(input: &str) -> ParseResult<'_, String> {
    map(
        terminated(ws(take_till(|c: char| c == ';')), char(';')),
        |text: &str| text.trim().to_string(),
    )(input)
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

fn label(input: &str) -> ParseResult<'_, Label> {
    alt((
        value(Label::Required, keyword("required")),
        value(Label::Optional, keyword("optional")),
        value(Label::Repeated, keyword("repeated")),
    ))(input)
}

fn field(input: &str) -> ParseResult<'_, RawField> {
    let (input, label) = opt(label)(input)?;
    let (input, type_name) = full_ident(input)?;
    let (input, name) = ident(input)?;
    let (input, _) = sym('=')(input)?;
    let (input, tag) = int_lit(input)?;
    let (input, options) = field_options(input)?;
    let (input, _) = sym(';')(input)?;

    let default_value = options
        .into_iter()
        .find(|(name, _)| name == "default")
        .map(|(_, value)| value);

    Ok((
        input,
        RawField {
            label,
            type_name,
            name,
            tag,
            default_value,
        },
    ))
}

fn map_field(input: &str) -> ParseResult<'_, MapField> {
    let (input, _) = keyword("map")(input)?;
    let (input, _) = sym('<')(input)?;
    let (input, key_type) = ident(input)?;
    let (input, _) = sym(',')(input)?;
    let (input, value_type) = full_ident(input)?;
    let (input, _) = sym('>')(input)?;
    let (input, name) = ident(input)?;
    let (input, _) = sym('=')(input)?;
    let (input, tag) = int_lit(input)?;
    let (input, _) = field_options(input)?;
    let (input, _) = sym(';')(input)?;
    Ok((
        input,
        MapField {
            name,
            tag,
            key_type,
            value_type,
        },
    ))
}

fn option_statement(input: &str) -> ParseResult<'_, (String, String)> {
    let (input, _) = keyword("option")(input)?;
    let (input, name) = option_name(input)?;
    let (input, _) = sym('=')(input)?;
    let (input, value) = constant(input)?;
    let (input, _) = sym(';')(input)?;
    Ok((input, (name, value)))
}

fn oneof(input: &str) -> ParseResult<'_, MessageItem> {
    let (input, _) = keyword("oneof")(input)?;
    let (input, name) = ident(input)?;
    let (input, _) = sym('{')(input)?;
    let (input, fields) = many0(alt((
        map(option_statement, |_| None),
        map(sym(';'), |_| None),
        map(field, Some),
    )))(input)?;
    let (input, _) = sym('}')(input)?;
    Ok((
        input,
        MessageItem::OneOf {
            name,
            fields: fields.into_iter().flatten().collect(),
        },
    ))
}

fn enum_value(input: &str) -> ParseResult<'_, EnumValue> {
    let (input, name) = ident(input)?;
    let (input, _) = sym('=')(input)?;
    let (input, number) = signed_int(input)?;
    let (input, _) = field_options(input)?;
    let (input, _) = sym(';')(input)?;
    Ok((input, EnumValue { name, number }))
}

fn enum_decl(input: &str) -> ParseResult<'_, EnumType> {
    let (input, _) = keyword("enum")(input)?;
    let (input, name) = ident(input)?;
    let (input, _) = sym('{')(input)?;
    let (input, values) = many0(alt((
        map(option_statement, |_| None),
        map(preceded(keyword("reserved"), until_semicolon), |_| None),
        map(sym(';'), |_| None),
        map(enum_value, Some),
    )))(input)?;
    let (input, _) = sym('}')(input)?;
    Ok((
        input,
        EnumType {
            name,
            values: values.into_iter().flatten().collect(),
        },
    ))
}

fn extend(input: &str) -> ParseResult<'_, (String, Vec<RawField>)> {
    let (input, _) = keyword("extend")(input)?;
    let (input, target) = full_ident(input)?;
    let (input, _) = sym('{')(input)?;
    let (input, fields) = many0(alt((map(sym(';'), |_| None), map(field, Some))))(input)?;
    let (input, _) = sym('}')(input)?;
    Ok((input, (target, fields.into_iter().flatten().collect())))
}

fn message_item(input: &str) -> ParseResult<'_, MessageItem> {
    alt((
        value(MessageItem::Empty, sym(';')),
        map(message_decl, MessageItem::Message),
        map(enum_decl, MessageItem::Enum),
        map(extend, |(target, fields)| MessageItem::Extend { target, fields }),
        map(preceded(keyword("extensions"), until_semicolon), MessageItem::Extensions),
        map(preceded(keyword("reserved"), until_semicolon), MessageItem::Reserved),
        map(option_statement, |(name, value)| MessageItem::Option(name, value)),
        oneof,
        map(map_field, MessageItem::Map),
        map(field, MessageItem::Field),
    ))(input)
}

fn message_decl(input: &str) -> ParseResult<'_, MessageDecl> {
    let (input, _) = keyword("message")(input)?;
    let (input, name) = ident(input)?;
    let (input, _) = sym('{')(input)?;
    let (input, items) = many0(message_item)(input)?;
    let (input, _) = sym('}')(input)?;
    Ok((input, MessageDecl { name, items }))
}

fn statement(input: &str) -> ParseResult<'_, Statement> {
    alt((
        value(Statement::Empty, sym(';')),
        map(
            delimited(
                pair(alt((keyword("syntax"), keyword("edition"))), sym('=')),
                str_lit,
                sym(';'),
            ),
            Statement::Syntax,
        ),
        map(delimited(keyword("package"), full_ident, sym(';')), Statement::Package),
        map(
            delimited(
                pair(keyword("import"), opt(alt((keyword("weak"), keyword("public"))))),
                str_lit,
                sym(';'),
            ),
            Statement::Import,
        ),
        map(option_statement, |(name, value)| Statement::Option(name, value)),
        map(message_decl, Statement::Message),
        map(enum_decl, Statement::Enum),
        map(extend, |(target, fields)| Statement::Extend { target, fields }),
        map(preceded(keyword("service"), pair(ident, balanced_block)), |(name, _)| {
            Statement::Service(name)
        }),
    ))(input)
}
