use std::time::Instant;

use common::{
    error::AppError,
    storage::{selector::Selector, store::DocumentStore, types::post::fields},
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::map_guard_error;
use crate::{
    pipeline::{
        context::PipelineContext,
        report::{Stage, StageOutcome},
        state::{EnrichmentMachine, KeywordsApplied, SentimentApplied},
    },
    utils::keywords::KeywordList,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordSummary {
    /// Documents whose `weapons` field was written.
    pub scanned: usize,
    /// Of those, documents with at least one match.
    pub tagged: usize,
    /// Documents deleted between retrieval and update.
    pub missing: usize,
}

#[derive(Serialize)]
struct WeaponsUpdate<'a> {
    weapons: &'a [String],
}

/// Writes `weapons` onto up to `scan_limit` documents; documents with no match
/// get an empty list.
pub async fn tag_documents(
    store: &dyn DocumentStore,
    index: &str,
    keywords: &KeywordList,
    scan_limit: usize,
) -> Result<KeywordSummary, AppError> {
    let results = store.search(index, &Selector::all(), scan_limit).await?;
    if results.total > results.hits.len() as u64 {
        warn!(
            index,
            total = results.total,
            scanned = results.hits.len(),
            "more documents than the scan limit; the rest stay untagged"
        );
    }

    let mut summary = KeywordSummary::default();
    for hit in &results.hits {
        let text = hit.str_field(fields::TEXT).unwrap_or_default();
        let weapons = keywords.matches(text);
        let partial = serde_json::to_value(WeaponsUpdate { weapons: &weapons })?;

        match store.update(index, &hit.id, partial).await {
            Ok(()) => {
                summary.scanned = summary.scanned.saturating_add(1);
                if !weapons.is_empty() {
                    summary.tagged = summary.tagged.saturating_add(1);
                    debug!(index, id = %hit.id, ?weapons, "weapon mentions found");
                }
            }
            Err(err) if err.is_not_found() => {
                warn!(index, id = %hit.id, "document vanished before keyword update");
                summary.missing = summary.missing.saturating_add(1);
            }
            Err(err) => return Err(err),
        }
    }

    store.refresh(index).await?;
    Ok(summary)
}

#[instrument(level = "trace", skip_all, fields(run_id = %ctx.run_id, index = ctx.index))]
pub async fn tag_keywords(
    machine: EnrichmentMachine<(), SentimentApplied>,
    ctx: &mut PipelineContext<'_>,
) -> Result<EnrichmentMachine<(), KeywordsApplied>, AppError> {
    let started = Instant::now();
    let result = load_and_tag(ctx).await;
    ctx.finish(Stage::Keywords, started, result);

    machine
        .tag_keywords()
        .map_err(|(_, guard)| map_guard_error("tag_keywords", &guard))
}

async fn load_and_tag(ctx: &PipelineContext<'_>) -> Result<StageOutcome, AppError> {
    let keywords = KeywordList::load(&ctx.inputs.keywords_path)?;
    info!(
        run_id = %ctx.run_id,
        keywords = keywords.len(),
        "keyword list loaded"
    );

    let summary = tag_documents(
        ctx.store,
        ctx.index,
        &keywords,
        ctx.config.tuning.keyword_scan_limit,
    )
    .await?;

    Ok(StageOutcome::KeywordsApplied {
        scanned: summary.scanned,
        tagged: summary.tagged,
        missing: summary.missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::storage::{
        indexes::{IndexMapping, IndexStatus},
        memory::MemoryStore,
        pipeline::{InferencePipeline, UpdateByQuery, UpdateByQueryAck},
        store::{BulkDocument, BulkOutcome, ClusterInfo, DeleteOutcome, Hit, SearchResults},
    };
    use serde_json::{json, Value};

    /// Deletes `victim` right after a search returns it, the way a concurrent
    /// retention run would.
    struct DeletesAfterSearch {
        inner: MemoryStore,
        victim: &'static str,
    }

    #[async_trait]
    impl DocumentStore for DeletesAfterSearch {
        async fn ping(&self) -> Result<ClusterInfo, AppError> {
            self.inner.ping().await
        }

        async fn index_exists(&self, index: &str) -> Result<bool, AppError> {
            self.inner.index_exists(index).await
        }

        async fn create_index(
            &self,
            index: &str,
            mapping: &IndexMapping,
        ) -> Result<IndexStatus, AppError> {
            self.inner.create_index(index, mapping).await
        }

        async fn refresh(&self, index: &str) -> Result<(), AppError> {
            self.inner.refresh(index).await
        }

        async fn bulk_index(
            &self,
            index: &str,
            documents: &[BulkDocument],
        ) -> Result<BulkOutcome, AppError> {
            self.inner.bulk_index(index, documents).await
        }

        async fn get(&self, index: &str, id: &str) -> Result<Option<Hit>, AppError> {
            self.inner.get(index, id).await
        }

        async fn update(&self, index: &str, id: &str, partial: Value) -> Result<(), AppError> {
            self.inner.update(index, id, partial).await
        }

        async fn search(
            &self,
            index: &str,
            selector: &Selector,
            size: usize,
        ) -> Result<SearchResults, AppError> {
            let results = self.inner.search(index, selector, size).await?;
            self.inner.remove(index, self.victim);
            Ok(results)
        }

        async fn count(&self, index: &str, selector: &Selector) -> Result<u64, AppError> {
            self.inner.count(index, selector).await
        }

        async fn delete_by_query(
            &self,
            index: &str,
            selector: &Selector,
        ) -> Result<DeleteOutcome, AppError> {
            self.inner.delete_by_query(index, selector).await
        }

        async fn put_pipeline(&self, pipeline: &InferencePipeline) -> Result<(), AppError> {
            self.inner.put_pipeline(pipeline).await
        }

        async fn update_by_query(
            &self,
            index: &str,
            selector: &Selector,
            request: &UpdateByQuery,
        ) -> Result<UpdateByQueryAck, AppError> {
            self.inner.update_by_query(index, selector, request).await
        }
    }

    fn store_with(texts: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for (id, text) in texts.iter().enumerate() {
            store.insert("posts", &id.to_string(), json!({ "text": text, "Antisemitic": 0 }));
        }
        store
    }

    #[tokio::test]
    async fn substring_matches_are_written() {
        let store = store_with(&["I have a SHOTGUN"]);
        let keywords = KeywordList::from_terms(["gun"]);

        let summary = tag_documents(&store, "posts", &keywords, 100)
            .await
            .expect("tag");

        assert_eq!(summary.tagged, 1);
        assert_eq!(
            store.document("posts", "0").expect("doc")["weapons"],
            json!(["gun"])
        );
    }

    #[tokio::test]
    async fn documents_without_matches_get_an_empty_list() {
        let store = store_with(&["a calm day", "knife fight"]);
        let keywords = KeywordList::from_terms(["knife"]);

        let summary = tag_documents(&store, "posts", &keywords, 100)
            .await
            .expect("tag");

        assert_eq!(
            summary,
            KeywordSummary {
                scanned: 2,
                tagged: 1,
                missing: 0
            }
        );
        assert_eq!(
            store.document("posts", "0").expect("doc")["weapons"],
            json!([])
        );
    }

    #[tokio::test]
    async fn scan_limit_caps_updates() {
        let store = store_with(&["gun", "gun", "gun"]);
        let keywords = KeywordList::from_terms(["gun"]);

        let summary = tag_documents(&store, "posts", &keywords, 2)
            .await
            .expect("tag");

        assert_eq!(summary.scanned, 2);
        assert!(store.document("posts", "2").expect("doc").get("weapons").is_none());
    }

    #[tokio::test]
    async fn failed_update_aborts_the_stage() {
        let store = store_with(&["gun"]);
        store.fail_operation("update");

        let err = tag_documents(&store, "posts", &KeywordList::from_terms(["gun"]), 10)
            .await
            .expect_err("update failure");
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn documents_deleted_mid_scan_are_counted_as_missing() {
        let store = DeletesAfterSearch {
            inner: store_with(&["knife", "a calm day", "gun and knife"]),
            victim: "1",
        };
        let keywords = KeywordList::from_terms(["gun", "knife"]);

        let summary = tag_documents(&store, "posts", &keywords, 100)
            .await
            .expect("tag");

        assert_eq!(
            summary,
            KeywordSummary {
                scanned: 2,
                tagged: 2,
                missing: 1
            }
        );
        assert!(store.inner.document("posts", "1").is_none());
        assert_eq!(
            store.inner.document("posts", "0").expect("doc")["weapons"],
            json!(["knife"])
        );
        assert_eq!(
            store.inner.document("posts", "2").expect("doc")["weapons"],
            json!(["gun", "knife"])
        );
    }
}
