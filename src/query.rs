//! Path expressions for navigating typed block data.
//!
//! A query is an alternating sequence of field-name and index steps, written
//! as `"a.b[3].c[0]"`. Tokenization happens once; the resulting [`Query`] can
//! be evaluated any number of times against different blocks.

use crate::error::QueryError;
use crate::parsers::field::identifier;
use nom::{
    branch::alt,
    character::complete::{char, digit1},
    combinator::{all_consuming, map, map_res},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult,
};
use std::fmt;
use std::str::FromStr;

/// One step of a path: either a field name or an array/pointer index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryToken {
    Name(String),
    Index(usize),
}

impl fmt::Display for QueryToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueryToken::Name(name) => write!(f, "{name}"),
            QueryToken::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// A tokenised, validated path expression. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    tokens: Vec<QueryToken>,
}

type Result<'a, T> = IResult<&'a str, T>;

fn name(input: &str) -> Result<QueryToken> {
    map(identifier, |name: &str| QueryToken::Name(name.to_owned()))(input)
}

fn index(input: &str) -> Result<QueryToken> {
    map(
        map_res(delimited(char('['), digit1, char(']')), str::parse::<usize>),
        QueryToken::Index,
    )(input)
}

impl Query {
    /// Tokenises a path expression. The first step may be a bare name or an
    /// index; every later name step is introduced by `.`. Empty or malformed
    /// expressions are rejected.
    pub fn parse(input: &str) -> std::result::Result<Self, QueryError> {
        let steps = pair(
            alt((name, index)),
            many0(alt((preceded(char('.'), name), index))),
        );

        let (_, (first, rest)) =
            all_consuming(steps)(input).map_err(|_| QueryError::InvalidQuery)?;

        let mut tokens = Vec::with_capacity(rest.len() + 1);
        tokens.push(first);
        tokens.extend(rest);

        Ok(Self { tokens })
    }

    /// The synthetic `next[0]` step used to walk intrusive linked lists.
    pub(crate) fn next_element() -> Self {
        Self {
            tokens: vec![QueryToken::Name("next".to_owned()), QueryToken::Index(0)],
        }
    }

    /// Builds a query directly from tokens. An empty sequence is rejected.
    pub fn from_tokens(tokens: Vec<QueryToken>) -> std::result::Result<Self, QueryError> {
        if tokens.is_empty() {
            return Err(QueryError::InvalidQuery);
        }
        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[QueryToken] {
        &self.tokens
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn token(&self, index: usize) -> Option<&QueryToken> {
        self.tokens.get(index)
    }
}

impl FromStr for Query {
    type Err = QueryError;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        Query::parse(input)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (position, token) in self.tokens.iter().enumerate() {
            if position > 0 && matches!(token, QueryToken::Name(_)) {
                write!(f, ".")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Query {
    type Item = &'a QueryToken;
    type IntoIter = std::slice::Iter<'a, QueryToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
