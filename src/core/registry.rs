use crate::domain::model::{DataType, ZoneKey};
use crate::domain::ports::ZoneParser;
use crate::utils::error::{CollectorError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Parsers indexed by data type, then zone.
#[derive(Default, Clone)]
pub struct ParserRegistry {
    parsers: HashMap<DataType, BTreeMap<ZoneKey, Arc<dyn ZoneParser>>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `parser`, replacing any previous one for the same key.
    pub fn register(&mut self, data_type: DataType, zone: ZoneKey, parser: Arc<dyn ZoneParser>) {
        self.parsers
            .entry(data_type)
            .or_default()
            .insert(zone, parser);
    }

    pub fn get(&self, data_type: DataType, zone: &ZoneKey) -> Result<Arc<dyn ZoneParser>> {
        self.parsers
            .get(&data_type)
            .and_then(|zones| zones.get(zone))
            .cloned()
            .ok_or_else(|| CollectorError::UnknownParser {
                data_type: data_type.to_string(),
                zone: zone.to_string(),
            })
    }

    pub fn zones(&self, data_type: DataType) -> Vec<&ZoneKey> {
        self.parsers
            .get(&data_type)
            .map(|zones| zones.keys().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.parsers.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<String> = self
            .parsers
            .iter()
            .flat_map(|(data_type, zones)| {
                zones
                    .keys()
                    .map(move |zone| format!("{}/{}", data_type, zone))
            })
            .collect();
        f.debug_struct("ParserRegistry").field("parsers", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Record;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    struct NullParser;

    #[async_trait]
    impl ZoneParser for NullParser {
        async fn fetch(
            &self,
            _args: &[String],
            _data_type: DataType,
            _target_datetime: Option<DateTime<Utc>>,
        ) -> Result<Vec<Record>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_lookup_by_data_type_and_zone() {
        let mut registry = ParserRegistry::new();
        registry.register(DataType::Price, ZoneKey::new("AT"), Arc::new(NullParser));
        registry.register(DataType::Exchange, ZoneKey::new("AT->SI"), Arc::new(NullParser));
        registry.register(DataType::Exchange, ZoneKey::new("AT->CH"), Arc::new(NullParser));

        assert_eq!(registry.len(), 3);
        assert!(registry.get(DataType::Price, &ZoneKey::new("AT")).is_ok());
        assert_eq!(
            registry.zones(DataType::Exchange),
            vec![&ZoneKey::new("AT->CH"), &ZoneKey::new("AT->SI")]
        );
        assert!(registry.zones(DataType::Consumption).is_empty());
    }

    #[test]
    fn test_missing_parser_is_an_error() {
        let registry = ParserRegistry::new();
        let err = registry
            .get(DataType::Production, &ZoneKey::new("FR"))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            CollectorError::UnknownParser { ref zone, .. } if zone == "FR"
        ));
    }
}
