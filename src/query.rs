//! Queries over one or more stored datasets.
//!
//! A query is an ordered list of selectors. Each selector names a dataset and
//! the columns to take from it, in text form `name,col1,col2` or `name,*` for
//! every column in stored order.
//!
//! The URL form accepted by the CLI looks like:
//!
//! ```text
//! fn=avg&grouping=Duration%2C0%2C1m&q=D0%2Cx%2Cy&q=D1%2Cz
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{FitError, FitResult};
use crate::function::Function;
use crate::grouping::Grouping;

/// Column selector meaning "every column of the dataset"
pub const WILDCARD: &str = "*";

/// One `(dataset, columns)` pair of a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub dataset: String,
    pub columns: Vec<String>,
}

impl Selector {
    pub fn new(dataset: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            dataset: dataset.into(),
            columns,
        }
    }

    /// Parse `name,col1,col2`. A bare `name` selects no columns.
    pub fn parse(text: &str) -> FitResult<Self> {
        let mut parts = text.split(',').map(str::trim);
        let dataset = parts.next().unwrap_or_default();
        if dataset.is_empty() {
            return Err(FitError::ParseError(format!(
                "selector '{}' has no dataset name",
                text
            )));
        }
        let columns = parts
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self::new(dataset, columns))
    }

    /// True for the single-entry `*` selector
    pub fn is_wildcard(&self) -> bool {
        self.columns.len() == 1 && self.columns[0] == WILDCARD
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dataset)?;
        for column in &self.columns {
            write!(f, ",{}", column)?;
        }
        Ok(())
    }
}

impl FromStr for Selector {
    type Err = FitError;

    fn from_str(s: &str) -> FitResult<Self> {
        Self::parse(s)
    }
}

/// Ordered selectors plus an optional windowed reduction
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub selectors: Vec<Selector>,
    pub function: Option<Function>,
    pub grouping: Option<Grouping>,
}

impl Query {
    /// Build a query from selector strings and optional function / grouping text
    pub fn new<S: AsRef<str>>(
        args: &[S],
        function: Option<&str>,
        grouping: Option<&str>,
    ) -> FitResult<Self> {
        let selectors = args
            .iter()
            .map(|arg| Selector::parse(arg.as_ref()))
            .collect::<FitResult<Vec<_>>>()?;
        let function = function
            .filter(|f| !f.is_empty())
            .map(Function::from_str)
            .transpose()?;
        let grouping = grouping
            .filter(|g| !g.is_empty())
            .map(Grouping::parse)
            .transpose()?;
        Ok(Self {
            selectors,
            function,
            grouping,
        })
    }

    /// Append a selector
    pub fn select(mut self, dataset: &str, columns: &[&str]) -> Self {
        self.selectors.push(Selector::new(
            dataset,
            columns.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    pub fn with_function(mut self, function: Function) -> Self {
        self.function = Some(function);
        self
    }

    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = Some(grouping);
        self
    }

    /// Number of selectors
    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Requested column names flattened in selector order (wildcards unexpanded)
    pub fn columns(&self) -> Vec<String> {
        self.selectors
            .iter()
            .flat_map(|s| s.columns.iter().cloned())
            .collect()
    }

    /// Encode as a URL query string
    pub fn to_query_string(&self) -> FitResult<String> {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(function) = self.function {
            pairs.push(("fn", function.to_string()));
        }
        if let Some(grouping) = &self.grouping {
            pairs.push(("grouping", grouping.to_string()));
        }
        for selector in &self.selectors {
            pairs.push(("q", selector.to_string()));
        }
        serde_urlencoded::to_string(&pairs).map_err(|e| FitError::EncodingError(e.to_string()))
    }

    /// Decode a URL query string. Unknown keys are ignored.
    pub fn from_query_string(qs: &str) -> FitResult<Self> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(qs.trim_start_matches('?'))
            .map_err(|e| FitError::ParseError(e.to_string()))?;

        let mut args = Vec::new();
        let mut function = None;
        let mut grouping = None;
        for (key, value) in pairs {
            match key.as_str() {
                "q" => args.push(value),
                "fn" => function = Some(value),
                "grouping" => grouping = Some(value),
                _ => {}
            }
        }
        Self::new(&args, function.as_deref(), grouping.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_selectors() {
        let query = Query::new(&["D0,x,y", "D1,x"], None, None).unwrap();
        assert_eq!(query.len(), 2);
        assert_eq!(query.selectors[0].dataset, "D0");
        assert_eq!(query.selectors[0].columns, vec!["x", "y"]);
        assert_eq!(query.selectors[1].dataset, "D1");
        assert_eq!(query.selectors[1].columns, vec!["x"]);
        assert_eq!(query.columns(), vec!["x", "y", "x"]);
    }

    #[test]
    fn test_wildcard_and_bare_selectors() {
        assert!(Selector::parse("mx1,*").unwrap().is_wildcard());
        assert!(!Selector::parse("mx1,*,A").unwrap().is_wildcard());
        let bare = Selector::parse("mx1").unwrap();
        assert!(bare.columns.is_empty());
        assert_eq!(bare.to_string(), "mx1");
        assert!(Selector::parse(",A").is_err());
    }

    #[test]
    fn test_query_string_roundtrip() {
        let query = Query::new(
            &["D0,x,y,z", "D1,z"],
            Some("avg"),
            Some("Duration,0,1m"),
        )
        .unwrap();
        assert_eq!(query.function, Some(Function::Avg));
        let grouping = query.grouping.as_ref().unwrap();
        assert_eq!(grouping.index, 0);
        assert_eq!(grouping.max, Duration::from_secs(60));

        let qs = query.to_query_string().unwrap();
        assert_eq!(
            qs,
            "fn=avg&grouping=Duration%2C0%2C1m&q=D0%2Cx%2Cy%2Cz&q=D1%2Cz"
        );
        assert_eq!(Query::from_query_string(&qs).unwrap(), query);
    }

    #[test]
    fn test_from_query_string() {
        let query = Query::from_query_string("?q=Fuu,x&q=Bar,y,z").unwrap();
        assert_eq!(query.len(), 2);
        assert_eq!(query.columns(), vec!["x", "y", "z"]);
        assert!(query.function.is_none());
        assert!(query.grouping.is_none());
    }

    #[test]
    fn test_bad_function_is_rejected() {
        assert!(Query::new(&["D0,x"], Some("median"), None).is_err());
    }

    #[test]
    fn test_builder() {
        let query = Query::default()
            .select("mx1", &["A", "B"])
            .select("mx2", &["*"])
            .with_function(Function::Max);
        assert_eq!(query.len(), 2);
        assert!(query.selectors[1].is_wildcard());
        assert_eq!(query.function, Some(Function::Max));
    }
}
