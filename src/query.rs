use chrono::{Datelike, NaiveDateTime};
use indexmap::IndexMap;

use crate::collection::Collection;
use crate::error::QueryError;
use crate::parser::record::TechnologyRecord;

/// Format of `data_publicacao` / `data_ultima_modificacao`.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn categories(c: &Collection) -> Vec<&str> {
    c.category_names().collect()
}

/// Count per category plus a final "Total" entry.
pub fn totals(c: &Collection) -> IndexMap<String, usize> {
    let mut out: IndexMap<String, usize> = c
        .iter()
        .map(|(name, records)| (name.to_string(), records.len()))
        .collect();
    out.insert("Total".to_string(), c.len());
    out
}

pub fn by_category<'a>(c: &'a Collection, name: &str) -> Result<&'a [TechnologyRecord], QueryError> {
    c.get(name)
        .ok_or_else(|| QueryError::CategoryNotFound(name.to_uppercase()))
}

pub fn by_title<'a>(c: &'a Collection, query: &str) -> Vec<&'a TechnologyRecord> {
    let q = query.to_lowercase();
    c.records()
        .filter(|r| r.title.to_lowercase().contains(&q))
        .collect()
}

pub fn by_department<'a>(c: &'a Collection, query: &str) -> Vec<&'a TechnologyRecord> {
    let q = query.to_lowercase();
    c.records()
        .filter(|r| {
            r.department
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&q))
        })
        .collect()
}

pub fn publication_year(record: &TechnologyRecord) -> Result<i32, QueryError> {
    NaiveDateTime::parse_from_str(&record.publish_date, DATE_FORMAT)
        .map(|dt| dt.year())
        .map_err(|source| QueryError::UnparseableDate {
            id: record.id,
            value: record.publish_date.clone(),
            source,
        })
}

/// Fails on the first record whose publish date does not parse.
pub fn by_publication_year(c: &Collection, year: i32) -> Result<Vec<&TechnologyRecord>, QueryError> {
    let mut out = Vec::new();
    for r in c.records() {
        if publication_year(r)? == year {
            out.push(r);
        }
    }
    Ok(out)
}

/// Exact name match, ignoring case. A record is listed once per matching
/// inventor entry.
pub fn by_inventor<'a>(c: &'a Collection, name: &str) -> Vec<&'a TechnologyRecord> {
    let q = name.to_lowercase();
    c.records()
        .flat_map(|r| {
            r.inventors
                .iter()
                .filter(|p| p.to_lowercase() == q)
                .map(move |_| r)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, title: &str, date: &str, dept: Option<&str>, inventors: &[&str]) -> TechnologyRecord {
        TechnologyRecord {
            id,
            title: title.to_string(),
            slug: format!("tec-{id}"),
            publish_date: date.to_string(),
            modified_date: date.to_string(),
            source_link: format!("https://ufcinova.ufc.br/tec-{id}/"),
            status: Some("Vigente".into()),
            trl: None,
            benefits: vec![],
            description: vec![],
            inventors: inventors.iter().map(|s| s.to_string()).collect(),
            department: dept.map(str::to_string),
            contacts: vec![],
        }
    }

    fn sample() -> Collection {
        let mut c = Collection::new(["ALIMENTOS", "TIC", "SOFTWARE"]);
        c.push(
            "ALIMENTOS",
            record(1, "Farinha de Caju", "2021-04-10T08:00:00", Some("Depto. de Tecnologia de Alimentos"), &["Ana Lima"]),
        )
        .unwrap();
        c.push(
            "TIC",
            record(2, "Sensor óptico", "2023-09-01T10:30:00", Some("Depto. de Física"), &["Bruno Costa", "ana lima"]),
        )
        .unwrap();
        c.push("TIC", record(3, "Antena de CAJU", "2023-01-01T00:00:00", None, &[])).unwrap();
        c
    }

    #[test]
    fn categories_and_totals() {
        let c = sample();
        assert_eq!(categories(&c), vec!["ALIMENTOS", "TIC", "SOFTWARE"]);
        let t = totals(&c);
        assert_eq!(t["ALIMENTOS"], 1);
        assert_eq!(t["TIC"], 2);
        assert_eq!(t["SOFTWARE"], 0);
        assert_eq!(t["Total"], 3);
        assert_eq!(t.keys().last().map(String::as_str), Some("Total"));
    }

    #[test]
    fn category_lookup_is_case_insensitive() {
        let c = sample();
        assert_eq!(by_category(&c, "tic").unwrap().len(), 2);
        assert!(matches!(
            by_category(&c, "química"),
            Err(QueryError::CategoryNotFound(n)) if n == "QUÍMICA"
        ));
    }

    #[test]
    fn title_substring_ignores_case() {
        let c = sample();
        let ids: Vec<i64> = by_title(&c, "caju").iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn department_skips_records_without_one() {
        let c = sample();
        let ids: Vec<i64> = by_department(&c, "depto").iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(by_department(&c, "física").len(), 1);
    }

    #[test]
    fn year_filter() {
        let c = sample();
        let ids: Vec<i64> = by_publication_year(&c, 2023).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(by_publication_year(&c, 1999).unwrap().is_empty());
    }

    #[test]
    fn unparseable_date_is_recoverable() {
        let mut c = sample();
        c.push("SOFTWARE", record(9, "x", "10/05/2022", None, &[])).unwrap();
        let err = by_publication_year(&c, 2022).unwrap_err();
        assert!(matches!(err, QueryError::UnparseableDate { id: 9, ref value, .. } if value == "10/05/2022"));
        // other queries on the same collection still work
        assert_eq!(by_title(&c, "sensor").len(), 1);
    }

    #[test]
    fn date_with_zone_suffix_does_not_parse() {
        let r = record(5, "x", "2022-01-01T00:00:00Z", None, &[]);
        assert!(publication_year(&r).is_err());
    }

    #[test]
    fn inventor_exact_match_ignoring_case() {
        let c = sample();
        let ids: Vec<i64> = by_inventor(&c, "ANA LIMA").iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(by_inventor(&c, "Ana").is_empty());
    }
}
