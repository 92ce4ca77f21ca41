use crate::common::error::MarketDbResult;
use crate::types::Value;
use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// One result row: column names paired with their values, in select-list order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. A repeated name shadows the earlier one on lookup.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((name.into(), value.into()));
    }

    /// Look up a column by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .rev()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// Look up a column by position
    pub fn get_index(&self, idx: usize) -> Option<&Value> {
        self.columns.get(idx).map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.columns.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Convert to a JSON object keyed by column name
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .columns
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }

    /// Deserialize the row into a typed record, matching fields by column name
    pub fn deserialize<T: DeserializeOwned>(&self) -> MarketDbResult<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }

    /// Read every column of a rusqlite row
    pub(crate) fn from_sqlite(row: &rusqlite::Row<'_>, names: &[String]) -> rusqlite::Result<Self> {
        let mut columns = Vec::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            columns.push((name.clone(), row.get::<_, Value>(idx)?));
        }
        Ok(Row { columns })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (name, value) in iter {
            row.push(name, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, &value.to_json())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct CategoryCount {
        count: i64,
        category: String,
    }

    fn sample() -> Row {
        Row::from_iter([
            ("count", Value::Integer(1193)),
            ("category", Value::from("Store design")),
        ])
    }

    #[test]
    fn test_lookup() {
        let row = sample();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("count"), Some(&Value::Integer(1193)));
        assert_eq!(row.get_index(1), Some(&Value::from("Store design")));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["count", "category"]);
    }

    #[test]
    fn test_json_and_deserialize() -> MarketDbResult<()> {
        let row = sample();
        assert_eq!(row.to_json(), json!({"count": 1193, "category": "Store design"}));
        assert_eq!(serde_json::to_value(&row)?, row.to_json());

        let typed: CategoryCount = row.deserialize()?;
        assert_eq!(
            typed,
            CategoryCount {
                count: 1193,
                category: "Store design".to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn test_column_order_matters_for_equality() {
        let reversed = Row::from_iter([
            ("category", Value::from("Store design")),
            ("count", Value::Integer(1193)),
        ]);
        assert_ne!(sample(), reversed);
    }
}
