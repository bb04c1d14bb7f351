use std::sync::Arc;

use axum::{
    extract::Path,
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Extension,
};
use axum_extra::extract::Form;
use serde::{Deserialize, Serialize};
use tracing as log;

use crate::{
    annotate::attach_comments,
    db::models::comments::Comment,
    plays::Play,
    AppContext,
};

macro_rules! try500 {
    ($val:expr, $ctx:literal) => {
        match $val {
            Ok(r) => r,
            Err(err) => {
                log::error!("error {}: {err:#}", $ctx);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html("Ohnoes, something went wrong!"),
                )
                    .into_response();
            }
        }
    };
}

#[derive(Serialize)]
struct PlayCtx {
    play_id: i64,
    title: String,
    artist: String,
    album: Option<String>,
    air_date: String,
    comment: Option<String>,
}

impl From<Play> for PlayCtx {
    fn from(play: Play) -> Self {
        Self {
            play_id: play.play_id,
            title: play.title,
            artist: play.artist,
            album: play.album,
            air_date: play.air_date.format("%Y-%m-%d %H:%M UTC").to_string(),
            comment: play.comment,
        }
    }
}

#[derive(Serialize)]
struct NowPlayingCtx {
    window_minutes: i64,
    plays: Vec<PlayCtx>,
}

fn render_now_playing(ctx: &AppContext, plays: Vec<Play>) -> anyhow::Result<String> {
    let page_ctx = NowPlayingCtx {
        window_minutes: ctx.config.play_window_secs / 60,
        plays: plays.into_iter().map(PlayCtx::from).collect(),
    };
    let page_ctx = tera::Context::from_serialize(page_ctx)?;

    let templates = ctx
        .templates
        .read()
        .map_err(|_| anyhow::anyhow!("templates lock is poisoned"))?;
    Ok(templates.render("now_playing.html", &page_ctx)?)
}

/// Lists the songs recently played on the station, with their comments.
pub(crate) async fn now_playing(Extension(ctx): Extension<Arc<AppContext>>) -> Response {
    let plays = match ctx
        .plays_client
        .fetch_plays(ctx.config.play_window_secs, None)
        .await
    {
        Ok(plays) => plays,
        Err(err) => {
            log::error!("unable to fetch recently played songs: {err}");
            return (
                StatusCode::BAD_REQUEST,
                "Recently played songs could not be fetched",
            )
                .into_response();
        }
    };

    let plays = {
        let mut conn = ctx.db_connection.lock().await;
        try500!(
            attach_comments(&mut conn, plays).await,
            "retrieving comments for recent plays"
        )
    };

    let page = try500!(
        render_now_playing(&ctx, plays),
        "rendering the list of recent plays"
    );

    (StatusCode::OK, Html(page)).into_response()
}

#[derive(Deserialize)]
pub struct AddComment {
    comment: String,
}

pub(crate) async fn add_comment(
    Path(play_id): Path<i64>,
    Extension(ctx): Extension<Arc<AppContext>>,
    Form(payload): Form<AddComment>,
) -> Response {
    {
        let mut conn = ctx.db_connection.lock().await;
        try500!(
            Comment::submit(&mut conn, play_id, &payload.comment).await,
            "saving a comment"
        );
    }

    log::debug!("comment saved for play {play_id}");

    let location = HeaderValue::from_static("/");
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
