//! The SDNA field-name declarator grammar.
//!
//! Field names carry C declarator syntax: leading `*` for pointers, trailing
//! `[N][M]` array suffixes, and the `(*name)()` function-pointer form. The
//! parser splits a declarator into the bare identifier and its shape.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1},
    combinator::{all_consuming, verify},
    error::{ErrorKind, ParseError},
    multi::{many0, many0_count},
    sequence::delimited,
    Err, IResult,
};

#[derive(Debug)]
pub enum FieldParseError {
    NomError {
        kind: ErrorKind,
        other: Option<Box<FieldParseError>>,
    },
    InvalidArraySize,
}

impl ParseError<&str> for FieldParseError {
    fn from_error_kind(_input: &str, kind: ErrorKind) -> Self {
        FieldParseError::NomError { kind, other: None }
    }

    fn append(_input: &str, kind: ErrorKind, other: Self) -> Self {
        FieldParseError::NomError {
            kind,
            other: Some(Box::new(other)),
        }
    }
}

type Result<'a, T> = IResult<&'a str, T, FieldParseError>;

/// The declarator shape of a field, stripped of its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    /// `(*name)()`, a pointer to a function.
    Function,
    /// `*…*name[K1][K2]…`; plain values have zero pointers and no
    /// dimensions.
    Plain {
        pointers: usize,
        /// Array sizes in the order they appear in the declarator.
        dimensions: Vec<usize>,
    },
}

/// First character must be a letter or `_`, the rest letters, digits or `_`.
/// Shared with the query tokenizer, which validates names the same way.
pub(crate) fn identifier<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    verify(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        |name: &str| !name.starts_with(|c: char| c.is_ascii_digit()),
    )(input)
}

fn dimensions(input: &str) -> Result<Vec<usize>> {
    let (input, groups) = many0(delimited(char('['), digit1, char(']')))(input)?;

    let mut dimensions = Vec::with_capacity(groups.len());
    for group in groups {
        dimensions.push(
            group
                .parse::<usize>()
                .map_err(|_| Err::Failure(FieldParseError::InvalidArraySize))?,
        );
    }

    Ok((input, dimensions))
}

fn fn_pointer(input: &str) -> Result<(&str, FieldShape)> {
    let (input, name) = delimited(tag("(*"), identifier, tag(")"))(input)?;
    let (input, _) = tag("()")(input)?;
    Ok((input, (name, FieldShape::Function)))
}

fn plain(input: &str) -> Result<(&str, FieldShape)> {
    let (input, pointers) = many0_count(char('*'))(input)?;
    let (input, name) = identifier(input)?;
    let (input, dimensions) = dimensions(input)?;
    Ok((input, (name, FieldShape::Plain { pointers, dimensions })))
}

/// Parses a declarator into `(name, shape)`. The whole input must match.
pub fn parse_field_name(input: &str) -> std::result::Result<(&str, FieldShape), FieldParseError> {
    match all_consuming(alt((fn_pointer, plain)))(input) {
        Ok((_, parsed)) => Ok(parsed),
        Err(Err::Error(e)) | Err(Err::Failure(e)) => Err(e),
        Err(Err::Incomplete(_)) => Err(FieldParseError::NomError {
            kind: ErrorKind::Eof,
            other: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_shape(pointers: usize, dimensions: &[usize]) -> FieldShape {
        FieldShape::Plain {
            pointers,
            dimensions: dimensions.to_vec(),
        }
    }

    #[test]
    fn value_declarators() {
        assert_eq!(parse_field_name("totvert").unwrap(), ("totvert", plain_shape(0, &[])));
        assert_eq!(parse_field_name("_pad2").unwrap(), ("_pad2", plain_shape(0, &[])));
    }

    #[test]
    fn pointer_declarators() {
        assert_eq!(parse_field_name("*next").unwrap(), ("next", plain_shape(1, &[])));
        assert_eq!(parse_field_name("**mat").unwrap(), ("mat", plain_shape(2, &[])));
    }

    #[test]
    fn array_declarators() {
        assert_eq!(parse_field_name("size[3]").unwrap(), ("size", plain_shape(0, &[3])));
        assert_eq!(
            parse_field_name("obmat[4][4]").unwrap(),
            ("obmat", plain_shape(0, &[4, 4]))
        );
        assert_eq!(parse_field_name("*ob[3]").unwrap(), ("ob", plain_shape(1, &[3])));
    }

    #[test]
    fn function_pointer_declarators() {
        assert_eq!(parse_field_name("(*free)()").unwrap(), ("free", FieldShape::Function));
        assert_eq!(
            parse_field_name("(*interp)()").unwrap(),
            ("interp", FieldShape::Function)
        );
    }

    #[test]
    fn malformed_declarators_are_rejected() {
        for bad in [
            "",
            "*",
            "9bad",
            "na-me",
            "name[",
            "name[]",
            "name[x]",
            "name[1",
            "name[1]x",
            "name]1[",
            "(*)()",
            "(*name)",
            "(*name)(",
            "(name)()",
        ] {
            assert!(parse_field_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
