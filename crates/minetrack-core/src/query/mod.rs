//! Read API over the local replica, shaped like the remote list endpoints.

use serde::{Deserialize, Serialize};

use crate::db::{DirectoryFilter, FilterField, Paging};
use crate::models::{Category, StoredRecord, SyncStatus};
use crate::remote::Pagination;
use crate::services::LocalStore;
use crate::util::normalize_text_option;
use crate::Result;

/// Sentinel accepted in place of an empty filter value.
const ALL_SENTINEL: &str = "all";

/// Raw query parameters, as a screen or the CLI would pass them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryQuery {
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default, rename = "type")]
    pub record_type: Option<String>,
}

impl DirectoryQuery {
    /// 1-based page, clamped to at least 1.
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size; `None` (or zero) means the full matching set.
    pub fn limit(&self) -> Option<usize> {
        self.limit.filter(|limit| *limit > 0)
    }

    /// Trimmed filter with empty and `all` values removed.
    pub fn filter(&self) -> DirectoryFilter {
        DirectoryFilter {
            search: normalize_filter_value(self.search.clone()),
            province: normalize_filter_value(self.province.clone()),
            status: normalize_filter_value(self.status.clone()),
            classification: normalize_filter_value(self.classification.clone()),
            record_type: normalize_filter_value(self.record_type.clone()),
        }
    }

    fn paging(&self) -> Paging {
        match self.limit() {
            Some(limit) => Paging {
                offset: (self.page() - 1).saturating_mul(limit),
                limit: Some(limit),
            },
            None => Paging::default(),
        }
    }
}

fn normalize_filter_value(value: Option<String>) -> Option<String> {
    normalize_text_option(value).filter(|value| !value.eq_ignore_ascii_case(ALL_SENTINEL))
}

/// One page of a category listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    pub success: bool,
    pub data: Vec<StoredRecord>,
    pub pagination: Pagination,
}

/// Distinct values available for each filter field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub provinces: Vec<String>,
    pub statuses: Vec<String>,
    pub classifications: Vec<String>,
    pub types: Vec<String>,
}

/// Query service over the local store.
#[derive(Clone)]
pub struct QueryService {
    store: LocalStore,
}

impl QueryService {
    pub const fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// List one category with filters and paging applied.
    pub async fn list(&self, category: Category, query: &DirectoryQuery) -> Result<DirectoryListing> {
        let result = self
            .store
            .query_category(category, &query.filter(), query.paging())
            .await?;

        let pagination = match query.limit() {
            Some(limit) => {
                let total_pages = result.total_count.div_ceil(limit).max(1);
                Pagination {
                    current_page: query.page(),
                    total_pages,
                    total_records: result.total_count,
                    has_next: result.has_next,
                    has_prev: result.has_prev,
                }
            }
            None => Pagination {
                current_page: 1,
                total_pages: 1,
                total_records: result.total_count,
                has_next: false,
                has_prev: false,
            },
        };

        Ok(DirectoryListing {
            success: true,
            data: result.records,
            pagination,
        })
    }

    pub async fn filter_options(&self, category: Category) -> Result<FilterOptions> {
        Ok(FilterOptions {
            provinces: self
                .store
                .distinct_values(category, FilterField::Province)
                .await?,
            statuses: self
                .store
                .distinct_values(category, FilterField::Status)
                .await?,
            classifications: self
                .store
                .distinct_values(category, FilterField::Classification)
                .await?,
            types: self.store.distinct_values(category, FilterField::Type).await?,
        })
    }

    pub async fn sync_status(&self, category: Category) -> Result<SyncStatus> {
        self.store.sync_status(category).await
    }

    pub async fn all_sync_status(&self) -> Result<Vec<SyncStatus>> {
        self.store.all_sync_status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn seeded_service() -> QueryService {
        let store = LocalStore::open_in_memory().await.unwrap();
        let records = (0..45)
            .map(|id| {
                json!({
                    "sourceId": format!("L-{id}"),
                    "permitNumber": format!("SAG-{id:03}"),
                    "permittee": format!("Quarry {id}"),
                    "province": if id < 12 { "Cavite" } else { "Batangas" },
                    "status": if id % 2 == 0 { "Active" } else { "Expired" },
                    "classification": "Non-metallic",
                    "permitType": "Sand and Gravel"
                })
            })
            .collect::<Vec<_>>();
        store
            .replace_category(Category::Local, &records)
            .await
            .unwrap();
        QueryService::new(store)
    }

    #[test]
    fn filter_normalization_drops_blank_and_all() {
        let query = DirectoryQuery {
            search: Some("   ".to_string()),
            province: Some(" Cavite ".to_string()),
            status: Some("ALL".to_string()),
            classification: Some("All".to_string()),
            ..DirectoryQuery::default()
        };

        assert_eq!(
            query.filter(),
            DirectoryFilter {
                province: Some("Cavite".to_string()),
                ..DirectoryFilter::default()
            }
        );
    }

    #[test]
    fn page_is_clamped_to_one() {
        let query = DirectoryQuery {
            page: Some(0),
            limit: Some(20),
            ..DirectoryQuery::default()
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.paging(), Paging { offset: 0, limit: Some(20) });
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pages_of_twenty_over_forty_five_records() {
        let service = seeded_service().await;
        let mut sizes = Vec::new();
        for page in 1..=3 {
            let listing = service
                .list(
                    Category::Local,
                    &DirectoryQuery {
                        page: Some(page),
                        limit: Some(20),
                        ..DirectoryQuery::default()
                    },
                )
                .await
                .unwrap();
            sizes.push(listing.data.len());
            assert_eq!(listing.pagination.total_pages, 3);
            assert_eq!(listing.pagination.total_records, 45);
            assert_eq!(listing.pagination.has_next, page < 3);
            assert_eq!(listing.pagination.has_prev, page > 1);
        }
        assert_eq!(sizes, vec![20, 20, 5]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn page_beyond_the_last_is_empty() {
        let service = seeded_service().await;
        let listing = service
            .list(
                Category::Local,
                &DirectoryQuery {
                    page: Some(usize::MAX),
                    limit: Some(20),
                    ..DirectoryQuery::default()
                },
            )
            .await
            .unwrap();

        assert!(listing.data.is_empty());
        assert_eq!(listing.pagination.current_page, usize::MAX);
        assert_eq!(listing.pagination.total_pages, 3);
        assert_eq!(listing.pagination.total_records, 45);
        assert!(!listing.pagination.has_next);
        assert!(listing.pagination.has_prev);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn province_filter_and_all_sentinel() {
        let service = seeded_service().await;

        let cavite = service
            .list(
                Category::Local,
                &DirectoryQuery {
                    province: Some("Cavite".to_string()),
                    status: Some("all".to_string()),
                    ..DirectoryQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cavite.pagination.total_records, 12);
        assert_eq!(cavite.data.len(), 12);
        assert_eq!(cavite.pagination.total_pages, 1);
        assert!(!cavite.pagination.has_next);

        let everything = service
            .list(
                Category::Local,
                &DirectoryQuery {
                    province: Some("All".to_string()),
                    ..DirectoryQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(everything.pagination.total_records, 45);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn search_is_case_insensitive() {
        let service = seeded_service().await;

        let listing = service
            .list(
                Category::Local,
                &DirectoryQuery {
                    search: Some("sag-04".to_string()),
                    ..DirectoryQuery::default()
                },
            )
            .await
            .unwrap();

        // SAG-040 .. SAG-044
        assert_eq!(listing.pagination.total_records, 5);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn filter_options_list_distinct_values() {
        let service = seeded_service().await;

        let options = service.filter_options(Category::Local).await.unwrap();

        assert_eq!(
            options,
            FilterOptions {
                provinces: vec!["Batangas".to_string(), "Cavite".to_string()],
                statuses: vec!["Active".to_string(), "Expired".to_string()],
                classifications: vec!["Non-metallic".to_string()],
                types: vec!["Sand and Gravel".to_string()],
            }
        );
    }
}
