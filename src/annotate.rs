use std::collections::HashMap;

use sqlx::AnyConnection;

use crate::{db::models::comments::Comment, plays::Play};

/// Fills in the comment of every play from the database, with a single query.
///
/// Plays without a stored comment get their comment cleared. Comments left on a play id that was
/// dropped as a duplicate of an earlier one are not carried over to the surviving play.
pub async fn attach_comments(
    conn: &mut AnyConnection,
    mut plays: Vec<Play>,
) -> anyhow::Result<Vec<Play>> {
    let play_ids = plays.iter().map(|play| play.play_id).collect::<Vec<_>>();

    let mut comments: HashMap<i64, String> = Comment::by_play_ids(conn, &play_ids)
        .await?
        .into_iter()
        .map(|comment| (comment.play_id, comment.text))
        .collect();

    for play in &mut plays {
        play.comment = comments.remove(&play.play_id);
    }

    Ok(plays)
}
