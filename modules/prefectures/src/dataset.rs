//! Bundled sample data (2010 census populations).

use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

const PREFECTURES: &str = include_str!("../data/prefectures.json");
const CARRIERS: &str = include_str!("../data/carriers.json");
const USERS: &str = include_str!("../data/users.json");

#[derive(Debug, Clone, Deserialize)]
pub struct PrefectureRow {
    pub id: i64,
    pub name: String,
    pub capital: String,
    pub is_od: bool,
    pub population: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CarrierRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRow {
    pub id: i64,
    pub shimei: String,
    pub shimei_kana: String,
    #[serde(default)]
    pub email: String,
    pub sex: String,
    pub birthdate: NaiveDate,
    #[serde(default)]
    pub is_married: bool,
    pub blood_type: String,
    pub prefecture: i64,
    #[serde(default)]
    pub tel: String,
    #[serde(default)]
    pub mobile: String,
    pub carrier: Option<i64>,
}

/// The prefecture list as plain JSON objects, for the in-memory collection.
pub fn prefecture_json() -> anyhow::Result<Value> {
    serde_json::from_str(PREFECTURES).context("bundled prefectures.json is malformed")
}

pub fn prefectures() -> anyhow::Result<Vec<PrefectureRow>> {
    serde_json::from_str(PREFECTURES).context("bundled prefectures.json is malformed")
}

pub fn carriers() -> anyhow::Result<Vec<CarrierRow>> {
    serde_json::from_str(CARRIERS).context("bundled carriers.json is malformed")
}

pub fn users() -> anyhow::Result<Vec<UserRow>> {
    serde_json::from_str(USERS).context("bundled users.json is malformed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_data_parses() {
        let prefectures = prefectures().unwrap();
        assert_eq!(prefectures.len(), 47);
        let osaka = &prefectures[26];
        assert_eq!((osaka.id, osaka.name.as_str()), (27, "大阪府"));
        assert!(osaka.is_od);

        assert_eq!(carriers().unwrap().len(), 3);
        let users = users().unwrap();
        assert!(users.iter().all(|u| prefectures.iter().any(|p| p.id == u.prefecture)));
    }

    #[test]
    fn names_fit_the_schema() {
        for p in prefectures().unwrap() {
            assert!(p.name.chars().count() <= 5, "{}", p.name);
        }
    }
}
