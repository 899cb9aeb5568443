// Query Criteria - filter, ordering and pagination vocabulary

use crate::domain::FieldValue;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Comparison operator carried by an operator token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

impl Comparison {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Comparison::GreaterThan => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessThan => "<",
            Comparison::LessOrEqual => "<=",
        }
    }
}

/// Operator token: a comparison plus its operand.
#[derive(Debug, Clone, PartialEq)]
pub struct FindOperator {
    pub comparison: Comparison,
    pub value: FieldValue,
}

impl FindOperator {
    pub fn gt(value: impl Into<FieldValue>) -> Self {
        Self::new(Comparison::GreaterThan, value)
    }

    pub fn gte(value: impl Into<FieldValue>) -> Self {
        Self::new(Comparison::GreaterOrEqual, value)
    }

    pub fn lt(value: impl Into<FieldValue>) -> Self {
        Self::new(Comparison::LessThan, value)
    }

    pub fn lte(value: impl Into<FieldValue>) -> Self {
        Self::new(Comparison::LessOrEqual, value)
    }

    fn new(comparison: Comparison, value: impl Into<FieldValue>) -> Self {
        Self {
            comparison,
            value: value.into(),
        }
    }
}

pub fn gt(value: impl Into<FieldValue>) -> FindOperator {
    FindOperator::gt(value)
}

pub fn gte(value: impl Into<FieldValue>) -> FindOperator {
    FindOperator::gte(value)
}

pub fn lt(value: impl Into<FieldValue>) -> FindOperator {
    FindOperator::lt(value)
}

pub fn lte(value: impl Into<FieldValue>) -> FindOperator {
    FindOperator::lte(value)
}

/// One filter entry. `Equals(FieldValue::Null)` means `IS NULL`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equals(FieldValue),
    Compare(FindOperator),
}

impl From<FindOperator> for Filter {
    fn from(op: FindOperator) -> Self {
        Filter::Compare(op)
    }
}

impl From<FieldValue> for Filter {
    fn from(value: FieldValue) -> Self {
        Filter::Equals(value)
    }
}

macro_rules! filter_from_literal {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Filter {
                fn from(value: $ty) -> Self {
                    Filter::Equals(value.into())
                }
            }
        )*
    };
}

filter_from_literal!(bool, i32, i64, u32, f64, &str, String, DateTime<Utc>);

impl<T: Into<FieldValue>> From<Option<T>> for Filter {
    fn from(value: Option<T>) -> Self {
        Filter::Equals(value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Order::Asc),
            "desc" => Ok(Order::Desc),
            other => Err(format!("unknown order direction: {}", other)),
        }
    }
}

/// Criteria for `find` / `find_one`: AND-ed filters, ordering, pagination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub filters: Vec<(String, Filter)>,
    pub order: Vec<(String, Order)>,
    pub take: Option<u64>,
    pub skip: Option<u64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self::new().filter("id", id)
    }

    pub fn filter(mut self, field: impl Into<String>, filter: impl Into<Filter>) -> Self {
        self.filters.push((field.into(), filter.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: Order) -> Self {
        self.order.push((field.into(), order));
        self
    }

    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }
}
