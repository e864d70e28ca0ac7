//! Label maps in the `StringIntLabelMap` protobuf text format.
//!
//! ```text
//! item {
//!   name: "/m/04bcr3"
//!   id: 1
//!   display_name: "Table"
//! }
//! ```
//!
//! Two independent maps are used during evaluation: one for object classes
//! and one for relationship predicates.

use crate::error::{Result, VrdEvalError};
use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{anychar, char, multispace1, not_line_ending, one_of, satisfy},
    combinator::{cut, map, opt, recognize, value},
    error::{context, VerboseError, VerboseErrorKind},
    multi::{fold_many0, many0},
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// One `item { ... }` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMapItem {
    pub name: String,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Bidirectional name ↔ id mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMap {
    items: BTreeMap<u64, LabelMapItem>,
    ids: HashMap<String, u64>,
}

impl LabelMap {
    /// Build a label map, rejecting duplicate names or ids.
    pub fn from_items(items: impl IntoIterator<Item = LabelMapItem>) -> Result<Self> {
        let mut map = Self::default();
        for item in items {
            if map.ids.contains_key(&item.name) {
                return Err(VrdEvalError::LabelMap(format!(
                    "duplicate name '{}'",
                    item.name
                )));
            }
            if map.items.contains_key(&item.id) {
                return Err(VrdEvalError::LabelMap(format!("duplicate id {}", item.id)));
            }
            map.ids.insert(item.name.clone(), item.id);
            map.items.insert(item.id, item);
        }
        Ok(map)
    }

    /// Build a label map from `(name, id)` pairs.
    ///
    /// # Example
    ///
    /// ```
    /// use vrd_eval::label_map::LabelMap;
    ///
    /// let map = LabelMap::from_pairs([("at", 1), ("on", 2)]).unwrap();
    /// assert_eq!(map.id("on").unwrap(), 2);
    /// assert_eq!(map.name(1), Some("at"));
    /// ```
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, u64)>) -> Result<Self> {
        Self::from_items(pairs.into_iter().map(|(name, id)| LabelMapItem {
            name: name.into(),
            id,
            display_name: None,
        }))
    }

    /// Load a label map from a text-format file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        text.parse()
    }

    /// Numeric id of `name`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownLabel` if the name is not in the map.
    pub fn id(&self, name: &str) -> Result<u64> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| VrdEvalError::UnknownLabel(format!("'{}' is not in the label map", name)))
    }

    /// Name registered for `id` (the inverse mapping).
    pub fn name(&self, id: u64) -> Option<&str> {
        self.items.get(&id).map(|item| item.name.as_str())
    }

    /// Human-readable name for `id`, falling back to the plain name.
    pub fn display_name(&self, id: u64) -> Option<&str> {
        self.items
            .get(&id)
            .map(|item| item.display_name.as_deref().unwrap_or(&item.name))
    }

    pub fn items(&self) -> impl Iterator<Item = &LabelMapItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromStr for LabelMap {
    type Err = VrdEvalError;

    fn from_str(text: &str) -> Result<Self> {
        let fields = match fields(text) {
            Ok(("", fields)) => fields,
            Ok((rest, _)) => {
                let found: String = rest.chars().take_while(|c| !c.is_whitespace()).collect();
                return Err(syntax_error(text, rest, format!("unexpected '{}'", found)));
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => return Err(convert_error(text, e)),
            Err(nom::Err::Incomplete(_)) => {
                return Err(VrdEvalError::LabelMap("incomplete input".to_string()))
            }
        };

        let items = fields
            .into_iter()
            .filter(|field| field.name == "item")
            .filter_map(|field| match field.value {
                Value::Message(body) => Some(item_from_fields(text, field.at, body)),
                Value::Scalar(_) => None,
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_items(items)
    }
}

type ParseResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// A `name: value` pair, remembering where it started for error lines.
#[derive(Debug)]
struct Field<'a> {
    name: &'a str,
    at: &'a str,
    value: Value<'a>,
}

#[derive(Debug)]
enum Value<'a> {
    Scalar(String),
    Message(Vec<Field<'a>>),
}

fn line_of(text: &str, rest: &str) -> usize {
    let consumed = text.len().saturating_sub(rest.len());
    text[..consumed].matches('\n').count() + 1
}

fn syntax_error(text: &str, rest: &str, message: impl std::fmt::Display) -> VrdEvalError {
    VrdEvalError::LabelMap(format!("line {}: {}", line_of(text, rest), message))
}

fn convert_error(text: &str, error: VerboseError<&str>) -> VrdEvalError {
    let context = error.errors.iter().find_map(|(rest, kind)| match kind {
        VerboseErrorKind::Context(message) => Some((*rest, *message)),
        _ => None,
    });
    let (rest, message) = context
        .or_else(|| error.errors.first().map(|(rest, _)| (*rest, "syntax error")))
        .unwrap_or((text, "syntax error"));
    syntax_error(text, rest, message)
}

fn comment(input: &str) -> ParseResult<'_, &str> {
    recognize(pair(char('#'), not_line_ending))(input)
}

/// Whitespace and comments.
fn blank(input: &str) -> ParseResult<'_, ()> {
    value((), many0(alt((multispace1, comment))))(input)
}

/// Whitespace, comments and the optional `,`/`;` between fields.
fn filler(input: &str) -> ParseResult<'_, ()> {
    value((), many0(alt((multispace1, comment, recognize(one_of(",;"))))))(input)
}

fn word(input: &str) -> ParseResult<'_, &str> {
    take_while1(|c: char| !c.is_whitespace() && !"{}:,;#\"'".contains(c))(input)
}

fn escape(input: &str) -> ParseResult<'_, char> {
    preceded(
        char('\\'),
        alt((value('\n', char('n')), value('\t', char('t')), anychar)),
    )(input)
}

fn quoted<'a>(quote: char) -> impl FnMut(&'a str) -> ParseResult<'a, String> {
    move |input| {
        let (input, _) = char(quote)(input)?;
        let (input, text) = fold_many0(
            alt((escape, satisfy(move |c| c != quote && c != '\\' && c != '\n'))),
            String::new,
            |mut text, c| {
                text.push(c);
                text
            },
        )(input)?;
        let (input, _) = context("unterminated string", cut(char(quote)))(input)?;
        Ok((input, text))
    }
}

fn scalar(input: &str) -> ParseResult<'_, String> {
    alt((quoted('"'), quoted('\''), map(word, str::to_string)))(input)
}

fn message(input: &str) -> ParseResult<'_, Vec<Field<'_>>> {
    let (input, _) = char('{')(input)?;
    let (input, body) = fields(input)?;
    let (input, _) = context("unterminated message", cut(char('}')))(input)?;
    Ok((input, body))
}

fn field(input: &str) -> ParseResult<'_, Field<'_>> {
    let at = input;
    let (input, name) = word(input)?;
    let (input, _) = tuple((blank, opt(char(':')), blank))(input)?;
    let (input, value) = context(
        "expected a value",
        cut(alt((map(message, Value::Message), map(scalar, Value::Scalar)))),
    )(input)?;
    Ok((input, Field { name, at, value }))
}

fn fields(input: &str) -> ParseResult<'_, Vec<Field<'_>>> {
    terminated(many0(preceded(filler, field)), filler)(input)
}

/// Known scalars of an `item`. Unknown fields and nested messages are ignored.
fn item_from_fields(text: &str, at: &str, body: Vec<Field<'_>>) -> Result<LabelMapItem> {
    let mut name = None;
    let mut id = None;
    let mut display_name = None;

    for field in body {
        let Value::Scalar(value) = field.value else {
            continue;
        };
        match field.name {
            "name" => name = Some(value),
            "display_name" => display_name = Some(value),
            "id" => {
                id = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| syntax_error(text, field.at, format!("invalid id '{}'", value)))?,
                )
            }
            _ => {}
        }
    }

    match (name, id) {
        (Some(name), Some(id)) => Ok(LabelMapItem { name, id, display_name }),
        (None, _) => Err(syntax_error(text, at, "item without name")),
        (_, None) => Err(syntax_error(text, at, "item without id")),
    }
}
