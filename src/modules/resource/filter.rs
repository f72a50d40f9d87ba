//! `field.operator=value` list filters.
//!
//! Every operator but `specified` fails on an absent value. List operators
//! (`in`, `notIn`) take comma-separated values.

use std::{collections::HashMap, str::FromStr};

use bookshelf_http::AppError;

/// Operators understood by [`RangeFilter`].
pub const RANGE_OPERATORS: &[&str] = &[
    "equals",
    "notEquals",
    "specified",
    "in",
    "notIn",
    "greaterThan",
    "lessThan",
    "greaterThanOrEqual",
    "lessThanOrEqual",
];

/// Operators understood by [`StringFilter`].
pub const STRING_OPERATORS: &[&str] = &[
    "equals",
    "notEquals",
    "specified",
    "in",
    "notIn",
    "contains",
    "doesNotContain",
];

fn invalid(entity: &'static str, key: &str, raw: &str) -> AppError {
    AppError::bad_request(
        entity,
        "invalidfilter",
        format!("invalid value '{raw}' for {key}"),
    )
}

fn parse_value<T: FromStr>(
    params: &HashMap<String, String>,
    entity: &'static str,
    key: &str,
) -> Result<Option<T>, AppError> {
    params
        .get(key)
        .map(|raw| raw.trim().parse().map_err(|_| invalid(entity, key, raw)))
        .transpose()
}

fn parse_list<T: FromStr>(
    params: &HashMap<String, String>,
    entity: &'static str,
    key: &str,
) -> Result<Option<Vec<T>>, AppError> {
    params
        .get(key)
        .map(|raw| {
            raw.split(',')
                .map(|item| item.trim().parse().map_err(|_| invalid(entity, key, raw)))
                .collect()
        })
        .transpose()
}

/// Reject `field.operator` keys naming an unknown field or operator.
///
/// Keys without a dot (`page`, `sort`, `distinct`, ...) are left alone.
pub fn reject_unknown(
    params: &HashMap<String, String>,
    entity: &'static str,
    fields: &[(&str, &[&str])],
) -> Result<(), AppError> {
    for key in params.keys() {
        let Some((field, operator)) = key.split_once('.') else {
            continue;
        };
        let known = fields
            .iter()
            .any(|(name, operators)| *name == field && operators.contains(&operator));
        if !known {
            return Err(AppError::bad_request(
                entity,
                "invalidfilter",
                format!("unsupported filter '{key}'"),
            ));
        }
    }
    Ok(())
}

/// `specified=true|false` against whether the field holds a value.
fn specified_matches(specified: Option<bool>, present: bool) -> bool {
    specified.map_or(true, |wanted| wanted == present)
}

/// Numeric filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeFilter<T> {
    pub equals: Option<T>,
    pub not_equals: Option<T>,
    pub specified: Option<bool>,
    pub in_values: Option<Vec<T>>,
    pub not_in: Option<Vec<T>>,
    pub greater_than: Option<T>,
    pub less_than: Option<T>,
    pub greater_than_or_equal: Option<T>,
    pub less_than_or_equal: Option<T>,
}

impl<T: FromStr + PartialOrd + Copy> RangeFilter<T> {
    pub fn parse(
        params: &HashMap<String, String>,
        entity: &'static str,
        field: &str,
    ) -> Result<Self, AppError> {
        let key = |op: &str| format!("{field}.{op}");
        Ok(Self {
            equals: parse_value(params, entity, &key("equals"))?,
            not_equals: parse_value(params, entity, &key("notEquals"))?,
            specified: parse_value(params, entity, &key("specified"))?,
            in_values: parse_list(params, entity, &key("in"))?,
            not_in: parse_list(params, entity, &key("notIn"))?,
            greater_than: parse_value(params, entity, &key("greaterThan"))?,
            less_than: parse_value(params, entity, &key("lessThan"))?,
            greater_than_or_equal: parse_value(params, entity, &key("greaterThanOrEqual"))?,
            less_than_or_equal: parse_value(params, entity, &key("lessThanOrEqual"))?,
        })
    }

    fn has_value_operator(&self) -> bool {
        self.equals.is_some()
            || self.not_equals.is_some()
            || self.in_values.is_some()
            || self.not_in.is_some()
            || self.greater_than.is_some()
            || self.less_than.is_some()
            || self.greater_than_or_equal.is_some()
            || self.less_than_or_equal.is_some()
    }

    pub fn matches(&self, value: Option<T>) -> bool {
        if !specified_matches(self.specified, value.is_some()) {
            return false;
        }
        let Some(value) = value else {
            return !self.has_value_operator();
        };

        self.equals.map_or(true, |v| value == v)
            && self.not_equals.map_or(true, |v| value != v)
            && self.in_values.as_ref().map_or(true, |vs| vs.contains(&value))
            && self.not_in.as_ref().map_or(true, |vs| !vs.contains(&value))
            && self.greater_than.map_or(true, |v| value > v)
            && self.less_than.map_or(true, |v| value < v)
            && self.greater_than_or_equal.map_or(true, |v| value >= v)
            && self.less_than_or_equal.map_or(true, |v| value <= v)
    }
}

/// Text filter; `contains` and `doesNotContain` ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringFilter {
    pub equals: Option<String>,
    pub not_equals: Option<String>,
    pub specified: Option<bool>,
    pub in_values: Option<Vec<String>>,
    pub not_in: Option<Vec<String>>,
    pub contains: Option<String>,
    pub does_not_contain: Option<String>,
}

impl StringFilter {
    pub fn parse(
        params: &HashMap<String, String>,
        entity: &'static str,
        field: &str,
    ) -> Result<Self, AppError> {
        let key = |op: &str| format!("{field}.{op}");
        let lowered = |op: &str| params.get(&key(op)).map(|v| v.to_lowercase());
        Ok(Self {
            equals: params.get(&key("equals")).cloned(),
            not_equals: params.get(&key("notEquals")).cloned(),
            specified: parse_value(params, entity, &key("specified"))?,
            in_values: parse_list(params, entity, &key("in"))?,
            not_in: parse_list(params, entity, &key("notIn"))?,
            contains: lowered("contains"),
            does_not_contain: lowered("doesNotContain"),
        })
    }

    fn has_value_operator(&self) -> bool {
        self.equals.is_some()
            || self.not_equals.is_some()
            || self.in_values.is_some()
            || self.not_in.is_some()
            || self.contains.is_some()
            || self.does_not_contain.is_some()
    }

    pub fn matches(&self, value: Option<&str>) -> bool {
        if !specified_matches(self.specified, value.is_some()) {
            return false;
        }
        let Some(value) = value else {
            return !self.has_value_operator();
        };
        let lower = value.to_lowercase();
        let listed = |values: &Vec<String>| values.iter().any(|v| v == value);

        self.equals.as_deref().map_or(true, |v| value == v)
            && self.not_equals.as_deref().map_or(true, |v| value != v)
            && self.in_values.as_ref().map_or(true, |vs| listed(vs))
            && self.not_in.as_ref().map_or(true, |vs| !listed(vs))
            && self.contains.as_deref().map_or(true, |v| lower.contains(v))
            && self
                .does_not_contain
                .as_deref()
                .map_or(true, |v| !lower.contains(v))
    }
}
