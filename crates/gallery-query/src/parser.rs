//! Query language parser

use crate::engine::{AssetQuery, SortDirection, SortKey};
use gallery_core::TagSet;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct QueryParser;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Invalid operator: {0}")]
    InvalidOperator(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Parse a query string.
///
/// An empty string selects every asset, newest first. An `order by`
/// without a direction sorts ascending.
pub fn parse_query(input: &str) -> Result<AssetQuery, QueryError> {
    let pairs = QueryParser::parse(Rule::query, input)
        .map_err(|e| QueryError::ParseError(e.to_string()))?;

    let mut query = AssetQuery::new();
    let mut tags = TagSet::new();

    for pair in pairs {
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::where_clause => {
                    for condition in inner.into_inner() {
                        if condition.as_rule() == Rule::condition {
                            apply_condition(condition, &mut query, &mut tags)?;
                        }
                    }
                }
                Rule::order_clause => {
                    let (key, direction) = parse_order(inner);
                    query = query.sort_by(key, direction);
                }
                _ => {}
            }
        }
    }

    Ok(query.with_tags(tags))
}

fn apply_condition(
    pair: pest::iterators::Pair<Rule>,
    query: &mut AssetQuery,
    tags: &mut TagSet,
) -> Result<(), QueryError> {
    let mut field = String::new();
    let mut operator = String::new();
    let mut value = String::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::field => field = inner.as_str().to_lowercase(),
            Rule::operator => operator = inner.as_str().to_lowercase(),
            Rule::string => value = parse_string(inner)?,
            _ => {}
        }
    }

    match (field.as_str(), operator.as_str()) {
        ("tag", "==") => {
            if TagSet::normalize(&value).is_none() {
                return Err(QueryError::InvalidValue("empty tag".to_string()));
            }
            tags.insert(&value);
        }
        ("text", "contains") => {
            *query = std::mem::take(query).with_text(&value);
        }
        _ => {
            return Err(QueryError::InvalidOperator(format!(
                "{} {}",
                field, operator
            )))
        }
    }

    Ok(())
}

fn parse_string(pair: pest::iterators::Pair<Rule>) -> Result<String, QueryError> {
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::string_inner | Rule::string_inner_dq => {
                return Ok(inner.as_str().to_string());
            }
            _ => {}
        }
    }

    Err(QueryError::InvalidValue("empty value".to_string()))
}

fn parse_order(pair: pest::iterators::Pair<Rule>) -> (SortKey, SortDirection) {
    let mut key = SortKey::UploadedAt;
    let mut direction = SortDirection::Ascending;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::sort_key => {
                key = match inner.as_str().to_lowercase().as_str() {
                    "name" => SortKey::Name,
                    "tag_count" => SortKey::TagCount,
                    "tags" => SortKey::Tags,
                    _ => SortKey::UploadedAt,
                };
            }
            Rule::direction => {
                if inner.as_str().eq_ignore_ascii_case("desc") {
                    direction = SortDirection::Descending;
                }
            }
            _ => {}
        }
    }

    (key, direction)
}
