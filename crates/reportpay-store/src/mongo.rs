//! MongoDB report store implementation.
//!
//! This module provides the `MongoReportStore` implementation of the `ReportStore` trait.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use reportpay_core::{Page, Report, ReportId, UserId};

use crate::error::{Result, StoreError};
use crate::schema::collection;
use crate::timeout::bounded;
use crate::ReportStore;

/// MongoDB duplicate key error code.
const DUPLICATE_KEY: i32 = 11000;

/// Stored shape of a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReportDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    report_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    client_generated_id: String,
    is_purchased: bool,
    created_at: BsonDateTime,
}

impl TryFrom<&Report> for ReportDocument {
    type Error = StoreError;

    fn try_from(report: &Report) -> Result<Self> {
        let id = ObjectId::parse_str(&report.id)
            .map_err(|e| StoreError::Serialization(format!("_id: {e}")))?;

        Ok(Self {
            id,
            report_id: report.report_id.to_string(),
            user_id: report.user_id.map(|u| u.to_string()),
            client_generated_id: report.client_generated_id.clone(),
            is_purchased: report.is_purchased,
            created_at: BsonDateTime::from_millis(report.created_at.timestamp_millis()),
        })
    }
}

impl TryFrom<ReportDocument> for Report {
    type Error = StoreError;

    fn try_from(doc: ReportDocument) -> Result<Self> {
        let report_id = doc
            .report_id
            .parse::<ReportId>()
            .map_err(|e| StoreError::Serialization(format!("report_id: {e}")))?;
        let user_id = doc
            .user_id
            .map(|u| u.parse::<UserId>())
            .transpose()
            .map_err(|e| StoreError::Serialization(format!("user_id: {e}")))?;
        let created_at = chrono::DateTime::from_timestamp_millis(doc.created_at.timestamp_millis())
            .ok_or_else(|| StoreError::Serialization("created_at out of range".into()))?;

        Ok(Self {
            id: doc.id.to_hex(),
            report_id,
            user_id,
            client_generated_id: doc.client_generated_id,
            is_purchased: doc.is_purchased,
            created_at,
        })
    }
}

/// MongoDB-backed report store.
#[derive(Clone)]
pub struct MongoReportStore {
    reports: Collection<ReportDocument>,
    call_timeout: Duration,
}

impl MongoReportStore {
    /// Use the `reports` collection of an existing database handle.
    #[must_use]
    pub fn new(database: &Database, call_timeout: Duration) -> Self {
        Self {
            reports: database.collection(collection::REPORTS),
            call_timeout,
        }
    }

    /// Connect to `uri`, verify the connection, and ensure indexes exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached or index creation fails.
    pub async fn connect(uri: &str, database: &str, call_timeout: Duration) -> Result<Self> {
        let client = bounded("connect", call_timeout, Client::with_uri_str(uri)).await?;
        let db = client.database(database);

        bounded("ping", call_timeout, db.run_command(doc! { "ping": 1 })).await?;
        tracing::info!(database, "MongoDB connected");

        let store = Self::new(&db, call_timeout);
        store.ensure_indexes().await?;
        Ok(store)
    }

    /// Create the report indexes if they don't exist.
    ///
    /// - `report_id` (unique)
    /// - `user_id`
    /// - `client_generated_id`
    /// - `user_id` asc, `created_at` desc (listing)
    ///
    /// # Errors
    ///
    /// Returns an error if index creation fails.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "report_id": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "user_id": 1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "client_generated_id": 1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "created_at": -1 })
                .build(),
        ];

        bounded(
            "ensure_indexes",
            self.call_timeout,
            self.reports.create_indexes(indexes),
        )
        .await?;

        tracing::info!(collection = collection::REPORTS, "Report indexes ensured");
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl ReportStore for MongoReportStore {
    async fn create_report(&self, client_generated_id: &str) -> Result<Report> {
        let report = Report::new_anonymous(ObjectId::new().to_hex(), client_generated_id);
        let document = ReportDocument::try_from(&report)?;

        match tokio::time::timeout(self.call_timeout, self.reports.insert_one(&document)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) if is_duplicate_key(&e) => {
                return Err(StoreError::Duplicate {
                    entity: "report",
                    key: report.report_id.to_string(),
                });
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(StoreError::Timeout {
                    operation: "create_report",
                })
            }
        }

        tracing::debug!(report_id = %report.report_id, "Report created");
        Ok(report)
    }

    async fn get_by_public_id(&self, report_id: &ReportId) -> Result<Report> {
        let document = bounded(
            "get_report",
            self.call_timeout,
            self.reports
                .find_one(doc! { "report_id": report_id.as_str() }),
        )
        .await?
        .ok_or_else(|| StoreError::NotFound {
            entity: "report",
            id: report_id.to_string(),
        })?;

        Report::try_from(document)
    }

    async fn mark_purchased(&self, report_id: &ReportId) -> Result<()> {
        // Matching on the current flag makes this a compare-and-set on the document.
        let result = bounded(
            "mark_purchased",
            self.call_timeout,
            self.reports.update_one(
                doc! { "report_id": report_id.as_str(), "is_purchased": false },
                doc! { "$set": { "is_purchased": true } },
            ),
        )
        .await?;

        if result.modified_count == 0 {
            return Err(StoreError::AlreadyPurchasedOrNotFound);
        }

        tracing::debug!(report_id = %report_id, "Report flagged as purchased");
        Ok(())
    }

    async fn link_anonymous(&self, client_generated_id: &str, user_id: &UserId) -> Result<u64> {
        // `null` matches both a missing and an explicitly null owner.
        let result = bounded(
            "link_anonymous",
            self.call_timeout,
            self.reports.update_many(
                doc! {
                    "client_generated_id": client_generated_id,
                    "user_id": Bson::Null,
                },
                doc! { "$set": { "user_id": user_id.to_string() } },
            ),
        )
        .await?;

        Ok(result.modified_count)
    }

    async fn list_by_owner(&self, user_id: &UserId, page: Page) -> Result<(Vec<Report>, u64)> {
        let filter = doc! { "user_id": user_id.to_string() };

        let total = bounded(
            "count_reports",
            self.call_timeout,
            self.reports.count_documents(filter.clone()),
        )
        .await?;

        let documents: Vec<ReportDocument> = bounded("list_reports", self.call_timeout, async {
            self.reports
                .find(filter)
                .sort(doc! { "created_at": -1 })
                .skip(u64::try_from(page.offset).unwrap_or(0))
                .limit(page.limit)
                .await?
                .try_collect::<Vec<ReportDocument>>()
                .await
        })
        .await?;

        let reports = documents
            .into_iter()
            .map(Report::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok((reports, total))
    }
}

/// These tests need a live MongoDB. Run with
/// `TEST_MONGO_URI=mongodb://... cargo test -p reportpay-store -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> MongoReportStore {
        let uri = std::env::var("TEST_MONGO_URI").expect("TEST_MONGO_URI must be set");
        let database = format!("reportpay_test_{}", uuid::Uuid::new_v4().simple());
        MongoReportStore::connect(&uri, &database, Duration::from_secs(5))
            .await
            .unwrap()
    }

    #[test]
    fn document_roundtrip_preserves_fields() {
        let owner = UserId::generate();
        let mut report = Report::new_anonymous(ObjectId::new().to_hex(), "client-1");
        report.user_id = Some(owner);

        let restored = Report::try_from(ReportDocument::try_from(&report).unwrap()).unwrap();
        assert_eq!(restored.id, report.id);
        assert_eq!(restored.report_id, report.report_id);
        assert_eq!(restored.user_id, Some(owner));
        assert_eq!(
            restored.created_at.timestamp_millis(),
            report.created_at.timestamp_millis()
        );
    }

    #[test]
    fn corrupt_owner_is_a_serialization_error() {
        let report = Report::new_anonymous(ObjectId::new().to_hex(), "client-1");
        let mut document = ReportDocument::try_from(&report).unwrap();
        document.user_id = Some("not-a-uuid".into());

        let result = Report::try_from(document);
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn store_key_must_be_an_object_id() {
        let report = Report::new_anonymous("1", "client-1");
        assert!(matches!(
            ReportDocument::try_from(&report),
            Err(StoreError::Serialization(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires MongoDB"]
    async fn mark_purchased_only_once() {
        let store = test_store().await;
        let report = store.create_report("client-1").await.unwrap();

        store.mark_purchased(&report.report_id).await.unwrap();
        let second = store.mark_purchased(&report.report_id).await;
        assert!(matches!(second, Err(StoreError::AlreadyPurchasedOrNotFound)));
        assert!(store.get_by_public_id(&report.report_id).await.unwrap().is_purchased);
    }

    #[tokio::test]
    #[ignore = "requires MongoDB"]
    async fn link_is_idempotent_and_listing_is_newest_first() {
        let store = test_store().await;
        let user_id = UserId::generate();
        let first = store.create_report("client-1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = store.create_report("client-1").await.unwrap();

        assert_eq!(store.link_anonymous("client-1", &user_id).await.unwrap(), 2);
        assert_eq!(store.link_anonymous("client-1", &user_id).await.unwrap(), 0);

        let (reports, total) = store
            .list_by_owner(&user_id, Page::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(reports[0].report_id, second.report_id);
        assert_eq!(reports[1].report_id, first.report_id);
    }
}
