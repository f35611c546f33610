use async_trait::async_trait;
use indexmap::IndexMap;
use lrt_core::{LatRow, LrtRow};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::{LatRepository, Repository, RepositoryResult};

/// An in-process `Repository`, ordered by first-insertion.
#[derive(Default)]
pub struct InMemoryRepository {
    rows: Mutex<IndexMap<String, LrtRow>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get(&self, name: &str) -> RepositoryResult<Option<LrtRow>> {
        Ok(self.rows.lock().await.get(name).cloned())
    }

    async fn put(&self, row: LrtRow) -> RepositoryResult<()> {
        let mut rows = self.rows.lock().await;
        let merged = match rows.get(&row.name) {
            Some(existing) => lrt_core::merge_rows(existing, row),
            None => row,
        };
        rows.insert(merged.name.clone(), merged);
        Ok(())
    }

    async fn all(&self) -> RepositoryResult<Vec<LrtRow>> {
        Ok(self.rows.lock().await.values().cloned().collect())
    }

    async fn delete(&self, name: &str) -> RepositoryResult<()> {
        self.rows.lock().await.shift_remove(name);
        Ok(())
    }
}

/// An in-process `LatRepository` keyed by law name.
#[derive(Default)]
pub struct InMemoryLatRepository {
    rows: Mutex<HashMap<String, Vec<LatRow>>>,
}

impl InMemoryLatRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LatRepository for InMemoryLatRepository {
    async fn replace_rows(&self, law_name: &str, rows: Vec<LatRow>) -> RepositoryResult<()> {
        self.rows.lock().await.insert(law_name.to_string(), rows);
        Ok(())
    }

    async fn rows_for(&self, law_name: &str) -> RepositoryResult<Vec<LatRow>> {
        Ok(self
            .rows
            .lock()
            .await
            .get(law_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_rows(&self, law_name: &str) -> RepositoryResult<()> {
        self.rows.lock().await.remove(law_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrt_core::SectionType;

    fn row(number: &str) -> LrtRow {
        LrtRow::new("uksi", 2024, number)
    }

    fn lat_row(law_name: &str) -> LatRow {
        LatRow {
            section_id: "sec.1".to_string(),
            law_name: law_name.to_string(),
            sort_key: "sec.0001".to_string(),
            position: 0,
            section_type: SectionType::Section,
            hierarchy_path: "sec.1".to_string(),
            depth: 0,
            part: None,
            chapter: None,
            heading_group: None,
            provision: Some("1".to_string()),
            paragraph: None,
            sub_paragraph: None,
            schedule: None,
            text: String::new(),
            extent_code: None,
            commentary: Default::default(),
            commentary_refs: Vec::new(),
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let repo = InMemoryRepository::new();
        repo.put(row("1")).await.unwrap();
        let found = repo.get("UK_uksi_2024_1").await.unwrap();
        assert_eq!(found.unwrap().name, "UK_uksi_2024_1");
    }

    #[tokio::test]
    async fn all_preserves_insertion_order() {
        let repo = InMemoryRepository::new();
        repo.put(row("2")).await.unwrap();
        repo.put(row("1")).await.unwrap();
        let names: Vec<String> = repo.all().await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["UK_uksi_2024_2", "UK_uksi_2024_1"]);
    }

    #[tokio::test]
    async fn put_merges_rather_than_overwrites() {
        let repo = InMemoryRepository::new();
        let mut first = row("1");
        first.title_en = Some("The First Title".to_string());
        first.amending = vec!["UK_ukpga_1974_37".to_string()];
        repo.put(first).await.unwrap();

        let mut second = row("1");
        second.title_en = None;
        second.is_making = true;
        repo.put(second).await.unwrap();

        let found = repo.get("UK_uksi_2024_1").await.unwrap().unwrap();
        assert_eq!(found.title_en, Some("The First Title".to_string()));
        assert_eq!(found.amending, vec!["UK_ukpga_1974_37".to_string()]);
        assert!(found.is_making);
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let repo = InMemoryRepository::new();
        repo.put(row("1")).await.unwrap();
        repo.delete("UK_uksi_2024_1").await.unwrap();
        assert!(repo.get("UK_uksi_2024_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_rows_discards_previous_set() {
        let repo = InMemoryLatRepository::new();
        repo.replace_rows("UK_uksi_2024_1", vec![lat_row("UK_uksi_2024_1")])
            .await
            .unwrap();
        repo.replace_rows("UK_uksi_2024_1", vec![]).await.unwrap();
        assert!(repo.rows_for("UK_uksi_2024_1").await.unwrap().is_empty());
    }
}
