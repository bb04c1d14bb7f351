use sqlx::AnyConnection;

/// Longest comment the database accepts, in characters.
pub const MAX_COMMENT_LEN: usize = 2048;

/// A comment left by a visitor on a single play. We only keep the play id from the upstream API,
/// since the play itself is fetched again on every page view anyway.
#[derive(Debug, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub play_id: i64,
    #[sqlx(rename = "content")]
    pub text: String,
}

impl Comment {
    pub async fn insert(conn: &mut AnyConnection, play_id: i64, text: &str) -> anyhow::Result<i64> {
        let (id,) = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO comments (play_id, content) VALUES ($1, $2) RETURNING id
        "#,
        )
        .bind(play_id)
        .bind(text)
        .fetch_one(conn)
        .await?;
        Ok(id)
    }

    pub async fn update_text(conn: &mut AnyConnection, id: i64, text: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE comments SET content = $1 WHERE id = $2
        "#,
        )
        .bind(text)
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn by_play_id(
        conn: &mut AnyConnection,
        play_id: i64,
    ) -> anyhow::Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, play_id, content FROM comments WHERE play_id = $1;
        "#,
        )
        .bind(play_id)
        .fetch_optional(conn)
        .await?;
        Ok(comment)
    }

    /// Retrieves the comments of all the given plays, in a single query.
    pub async fn by_play_ids(
        conn: &mut AnyConnection,
        play_ids: &[i64],
    ) -> anyhow::Result<Vec<Comment>> {
        if play_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (1..=play_ids.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql =
            format!("SELECT id, play_id, content FROM comments WHERE play_id IN ({placeholders});");

        let mut query = sqlx::query_as::<_, Comment>(&sql);
        for play_id in play_ids {
            query = query.bind(*play_id);
        }

        Ok(query.fetch_all(conn).await?)
    }

    /// Sets the comment of a play, creating it if the play had none yet.
    ///
    /// Two concurrent submissions for the same play race: the last write wins.
    pub async fn submit(conn: &mut AnyConnection, play_id: i64, text: &str) -> anyhow::Result<()> {
        match Self::by_play_id(&mut *conn, play_id).await? {
            Some(existing) => Self::update_text(conn, existing.id, text).await,
            None => Self::insert(conn, play_id, text).await.map(|_| ()),
        }
    }
}
