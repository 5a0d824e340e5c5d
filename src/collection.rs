use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::parser::record::TechnologyRecord;

/// Records grouped by category, in configured category order. Within a
/// category, records keep the order they were pushed in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection {
    categories: IndexMap<String, Vec<TechnologyRecord>>,
}

impl Collection {
    /// Empty list per category; names are upper-cased.
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let categories = categories
            .into_iter()
            .map(|c| (c.as_ref().to_uppercase(), Vec::new()))
            .collect();
        Collection { categories }
    }

    /// Append without deduplication.
    pub fn push(&mut self, category: &str, record: TechnologyRecord) -> Result<(), PipelineError> {
        let key = category.to_uppercase();
        match self.categories.get_mut(&key) {
            Some(list) => {
                list.push(record);
                Ok(())
            }
            None => Err(PipelineError::UnknownCategory(key)),
        }
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn get(&self, category: &str) -> Option<&[TechnologyRecord]> {
        self.categories
            .get(&category.to_uppercase())
            .map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[TechnologyRecord])> {
        self.categories
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn records(&self) -> impl Iterator<Item = &TechnologyRecord> {
        self.categories.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, title: &str) -> TechnologyRecord {
        TechnologyRecord {
            id,
            title: title.to_string(),
            slug: format!("tec-{id}"),
            publish_date: "2023-01-01T00:00:00".into(),
            modified_date: "2023-01-02T00:00:00".into(),
            source_link: format!("https://ufcinova.ufc.br/tec-{id}/"),
            status: None,
            trl: None,
            benefits: vec![],
            description: vec![],
            inventors: vec![],
            department: None,
            contacts: vec![],
        }
    }

    #[test]
    fn keys_are_configured_universe_in_order() {
        let c = Collection::new(["tic", "Alimentos", "SOFTWARE"]);
        let names: Vec<&str> = c.category_names().collect();
        assert_eq!(names, vec!["TIC", "ALIMENTOS", "SOFTWARE"]);
        assert!(c.is_empty());
    }

    #[test]
    fn push_keeps_order_and_duplicates() {
        let mut c = Collection::new(["TIC"]);
        c.push("tic", record(1, "a")).unwrap();
        c.push("TIC", record(2, "b")).unwrap();
        c.push("TIC", record(1, "a")).unwrap();
        let ids: Vec<i64> = c.get("TIC").unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 1]);
    }

    #[test]
    fn unknown_category_rejected() {
        let mut c = Collection::new(["TIC"]);
        let err = c.push("QUÍMICO", record(1, "a")).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownCategory(k) if k == "QUÍMICO"));
        assert!(c.is_empty());
    }

    #[test]
    fn serializes_as_category_map_preserving_order() {
        let cats = ["ENGENHARIAS", "ALIMENTOS", "TIC"];
        let mut c = Collection::new(cats);
        for id in 0..7 {
            c.push(cats[(id % 3) as usize], record(id, "t")).unwrap();
        }
        let json = serde_json::to_string(&c).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        let total: usize = v.as_object().unwrap().values().map(|l| l.as_array().unwrap().len()).sum();
        assert_eq!(total, 7);
        assert_eq!(v["ENGENHARIAS"][1]["id"], 3);
        assert_eq!(v["ENGENHARIAS"][2]["id"], 6);

        let back: Collection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
        assert_eq!(back.category_names().collect::<Vec<_>>(), cats);
    }
}
