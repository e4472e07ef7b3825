//! A small structured builder for Jira Query Language expressions.
//!
//! Every value goes through [`quote`], so subject names and labels taken from the command line
//! or from Jira itself can never change the shape of the query.

use std::fmt;

use itertools::Itertools;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Operator {
    Equals,
    In,
    GreaterOrEqual,
    LessThan,
    IsNotEmpty,
}

/// A single `(field, operator, value)` condition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Clause {
    field: String,
    operator: Operator,
    values: Vec<String>,
}

impl Clause {
    fn new(field: &str, operator: Operator, values: Vec<String>) -> Self {
        Self {
            field: field.to_string(),
            operator,
            values,
        }
    }

    pub(crate) fn equals(field: &str, value: impl Into<String>) -> Self {
        Self::new(field, Operator::Equals, vec![value.into()])
    }

    pub(crate) fn in_set<I, V>(field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self::new(
            field,
            Operator::In,
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub(crate) fn at_least(field: &str, value: impl Into<String>) -> Self {
        Self::new(field, Operator::GreaterOrEqual, vec![value.into()])
    }

    pub(crate) fn less_than(field: &str, value: impl Into<String>) -> Self {
        Self::new(field, Operator::LessThan, vec![value.into()])
    }

    pub(crate) fn is_not_empty(field: &str) -> Self {
        Self::new(field, Operator::IsNotEmpty, Vec::new())
    }

    #[cfg(test)]
    pub(crate) fn values(&self) -> &[String] {
        &self.values
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = &self.field;
        let first = self.values.first().map(|value| quote(value));
        let first = first.as_deref().unwrap_or("\"\"");
        match self.operator {
            Operator::Equals => write!(f, "{field} = {first}"),
            Operator::GreaterOrEqual => write!(f, "{field} >= {first}"),
            Operator::LessThan => write!(f, "{field} < {first}"),
            Operator::In => write!(
                f,
                "{field} in ({})",
                self.values.iter().map(|value| quote(value)).join(", ")
            ),
            Operator::IsNotEmpty => write!(f, "{field} is not EMPTY"),
        }
    }
}

/// Wrap `value` in double quotes, escaping anything that would terminate the string early.
pub(crate) fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// The date fields a yearly window can be applied to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum DateField {
    Created,
    Resolved,
}

impl DateField {
    fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Resolved => "resolved",
        }
    }
}

/// The half-open window `[Jan 1 of year, Jan 1 of year + 1)`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct YearRange {
    pub(crate) field: DateField,
    pub(crate) year: i32,
}

impl YearRange {
    pub(crate) fn new(field: DateField, year: i32) -> Self {
        Self { field, year }
    }

    pub(crate) fn start(&self) -> String {
        format!("{}/01/01", self.year)
    }

    pub(crate) fn end(&self) -> String {
        format!("{}/01/01", self.year + 1)
    }

    fn clauses(&self) -> [Clause; 2] {
        let field = self.field.as_str();
        [
            Clause::at_least(field, self.start()),
            Clause::less_than(field, self.end()),
        ]
    }
}

/// The project (and optionally component) every query of a report run is limited to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Scope {
    pub(crate) project: String,
    pub(crate) component: Option<String>,
}

impl Scope {
    pub(crate) fn project(project: &str) -> Self {
        Self {
            project: project.to_string(),
            component: None,
        }
    }

    pub(crate) fn component(project: &str, component: &str) -> Self {
        Self {
            project: project.to_string(),
            component: Some(component.to_string()),
        }
    }

    /// Drop the component, keeping only the project.
    pub(crate) fn project_only(&self) -> Self {
        Self::project(&self.project)
    }
}

/// An immutable conjunction of [`Clause`]s, serialized in insertion order.
///
/// A verbatim query has no clauses, only the JQL someone typed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Query {
    clauses: Vec<Clause>,
    verbatim: Option<String>,
    /// Field to sort ascending by.
    order_by: Option<String>,
}

impl Query {
    pub(crate) fn build<I>(scope: &Scope, extra: I, range: Option<YearRange>) -> Self
    where
        I: IntoIterator<Item = Clause>,
    {
        let mut clauses = vec![Clause::equals("project", scope.project.as_str())];
        if let Some(component) = &scope.component {
            clauses.push(Clause::in_set("component", [component.as_str()]));
        }
        clauses.extend(extra);
        if let Some(range) = range {
            clauses.extend(range.clauses());
        }
        Self {
            clauses,
            verbatim: None,
            order_by: None,
        }
    }

    /// A query made of `jql` exactly as given, for ad-hoc searches.
    pub(crate) fn verbatim(jql: &str) -> Self {
        Self {
            clauses: Vec::new(),
            verbatim: Some(jql.trim().to_string()),
            order_by: None,
        }
    }

    #[must_use]
    pub(crate) fn oldest_first(mut self, field: &str) -> Self {
        self.order_by = Some(field.to_string());
        self
    }

    #[cfg(test)]
    pub(crate) fn clauses(&self) -> &[Clause] {
        &self.clauses
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.verbatim {
            Some(jql) => write!(f, "{jql}")?,
            None => write!(f, "{}", self.clauses.iter().join(" AND "))?,
        }
        if let Some(field) = &self.order_by {
            write!(f, " ORDER BY {field} ASC")?;
        }
        Ok(())
    }
}
