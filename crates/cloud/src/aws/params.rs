//! Query-protocol parameter builder.

/// Flattened `Key=Value` parameters for a query-protocol action.
///
/// Lists are 1-indexed: `InstanceId.1`, `Filter.2.Value.1`, ...
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
    filters: usize,
}

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.pairs.push((key.into(), value.to_string()));
        self
    }

    /// Set `key` only when `value` is present.
    #[must_use]
    pub fn set_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    /// `prefix.1`, `prefix.2`, ... for each value.
    #[must_use]
    pub fn list<V: AsRef<str>>(mut self, prefix: &str, values: &[V]) -> Self {
        for (i, v) in values.iter().enumerate() {
            self.pairs
                .push((format!("{prefix}.{}", i + 1), v.as_ref().to_string()));
        }
        self
    }

    /// Append an EC2 `Filter.N` with its values.
    #[must_use]
    pub fn filter<V: AsRef<str>>(mut self, name: &str, values: &[V]) -> Self {
        self.filters += 1;
        let n = self.filters;
        self.pairs.push((format!("Filter.{n}.Name"), name.to_string()));
        for (i, v) in values.iter().enumerate() {
            self.pairs
                .push((format!("Filter.{n}.Value.{}", i + 1), v.as_ref().to_string()));
        }
        self
    }

    #[must_use]
    pub fn as_slice(&self) -> &[(String, String)] {
        &self.pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_are_numbered() {
        let params = QueryParams::new()
            .filter("group-name", &["open-all-ports"])
            .filter("vpc-id", &["vpc-1"])
            .list("InstanceId", &["i-1", "i-2"]);
        let keys: Vec<&str> = params.as_slice().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "Filter.1.Name",
                "Filter.1.Value.1",
                "Filter.2.Name",
                "Filter.2.Value.1",
                "InstanceId.1",
                "InstanceId.2",
            ]
        );
    }

    #[test]
    fn test_optional_values() {
        let params = QueryParams::new()
            .set_opt("NextToken", None::<String>)
            .set_opt("KeyName", Some("ops"));
        assert_eq!(params.as_slice(), &[("KeyName".to_string(), "ops".to_string())]);
    }
}
