// Postgres document store. Post ids are stored as BIGINT; ids above
// i64::MAX are rejected rather than wrapped.

use async_trait::async_trait;
use harvest_common::{LabelSource, ManualAnnotation, PostRecord, SentimentLabel};
use sqlx::PgPool;
use tracing::warn;

use crate::error::{LabelError, Result};
use crate::store::DocumentStore;

pub struct PgDocumentStore {
    pool: PgPool,
}

/// A row from the target_posts table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct TargetPostRow {
    post_id: i64,
    text: String,
    topic: String,
    label: Option<i16>,
    label_source: Option<String>,
}

/// A row from the manual_annotations table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct AnnotationRow {
    post_id: i64,
    label: String,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Record a human label for a post. Replaces an earlier annotation.
    pub async fn upsert_manual_annotation(&self, post_id: u64, label: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO manual_annotations (post_id, label)
            VALUES ($1, $2)
            ON CONFLICT (post_id) DO UPDATE
                SET label = EXCLUDED.label, annotated_at = now()
            "#,
        )
        .bind(to_db_id(post_id)?)
        .bind(label)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn to_db_id(id: u64) -> Result<i64> {
    i64::try_from(id).map_err(|_| LabelError::IdRange(id))
}

/// Rows with a negative id were written outside this store; they are
/// logged and dropped.
fn from_db_id(id: i64, table: &str) -> Option<u64> {
    match u64::try_from(id) {
        Ok(id) => Some(id),
        Err(_) => {
            warn!(post_id = id, table, "Ignoring row with negative post id");
            None
        }
    }
}

impl TargetPostRow {
    fn into_post(self) -> Option<PostRecord> {
        let id = from_db_id(self.post_id, "target_posts")?;
        let mut post = PostRecord::new(id, self.text, self.topic);

        let label = self.label.map(|code| SentimentLabel::from_code(i64::from(code)));
        let source = self.label_source.as_deref().and_then(LabelSource::from_str_opt);
        match (label, source) {
            (Some(Ok(label)), Some(source)) => post.set_label(label, source),
            (None, _) => {}
            (label, source) => warn!(
                post_id = post.id,
                ?label,
                ?source,
                "Ignoring unreadable stored label"
            ),
        }
        Some(post)
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn manual_annotations(&self) -> Result<Vec<ManualAnnotation>> {
        let rows = sqlx::query_as::<_, AnnotationRow>(
            r#"
            SELECT post_id, label FROM manual_annotations
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                Some(ManualAnnotation {
                    post_id: from_db_id(row.post_id, "manual_annotations")?,
                    label: row.label,
                })
            })
            .collect())
    }

    async fn target_posts(&self) -> Result<Vec<PostRecord>> {
        let rows = sqlx::query_as::<_, TargetPostRow>(
            r#"
            SELECT post_id, text, topic, label, label_source
            FROM target_posts
            ORDER BY post_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(TargetPostRow::into_post).collect())
    }

    async fn update_label(
        &self,
        post_id: u64,
        label: SentimentLabel,
        source: LabelSource,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE target_posts
            SET label = $2, label_source = $3, labeled_at = now()
            WHERE post_id = $1
            "#,
        )
        .bind(to_db_id(post_id)?)
        .bind(i16::from(label.code()))
        .bind(source.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_target_post(&self, post: &PostRecord) -> Result<bool> {
        let inserted = sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO target_posts (post_id, text, topic)
            VALUES ($1, $2, $3)
            ON CONFLICT (post_id) DO UPDATE
                SET text = EXCLUDED.text, topic = EXCLUDED.topic
            RETURNING (xmax = 0)
            "#,
        )
        .bind(to_db_id(post.id)?)
        .bind(&post.text)
        .bind(&post.topic)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }
}
