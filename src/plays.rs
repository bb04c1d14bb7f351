//! Recently played songs, as reported by the station's playlist API.

use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing as log;

use crate::config::{AppConfig, MAX_WINDOW_SECS};

/// Playtype identifier of an actual song being aired; everything else is an air break, a station
/// id, etc.
const SONG_PLAYTYPE_ID: i64 = 1;

/// Above this many candidates, the duplicate scan starts to be noticeable.
const DEDUP_WARN_THRESHOLD: usize = 500;

const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A single song aired on the station.
#[derive(Clone, Debug, PartialEq)]
pub struct Play {
    pub play_id: i64,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub air_date: DateTime<Utc>,
    /// Filled in from the database, see [`crate::annotate::attach_comments`].
    pub comment: Option<String>,
}

impl Play {
    pub fn new(
        play_id: i64,
        title: impl Into<String>,
        artist: impl Into<String>,
        album: Option<&str>,
        air_date: DateTime<Utc>,
    ) -> Self {
        Self {
            play_id,
            title: title.into(),
            artist: artist.into(),
            album: album.map(ToOwned::to_owned),
            air_date,
            comment: None,
        }
    }

    /// Two plays are the same song being aired when title, artist and album match, whatever their
    /// ids: the API sometimes reports a single airing twice, under two ids.
    pub fn is_duplicate_of(&self, other: &Play) -> bool {
        self.title == other.title && self.artist == other.artist && self.album == other.album
    }
}

#[derive(Deserialize)]
struct Named {
    name: Option<String>,
}

#[derive(Deserialize)]
struct PlayType {
    playtypeid: Option<i64>,
}

#[derive(Deserialize)]
struct PlayRecord {
    // Only songs need these, air breaks sometimes come without them.
    #[serde(default)]
    playid: Option<i64>,
    #[serde(default)]
    airdate: Option<String>,
    #[serde(default)]
    playtype: Option<PlayType>,
    #[serde(default)]
    track: Option<Named>,
    #[serde(default)]
    artist: Option<Named>,
    #[serde(default)]
    release: Option<Named>,
}

impl PlayRecord {
    fn is_song(&self) -> bool {
        self.playtype
            .as_ref()
            .and_then(|playtype| playtype.playtypeid)
            == Some(SONG_PLAYTYPE_ID)
    }

    fn into_play(self) -> Result<Play, FetchError> {
        fn name_of(field: Option<Named>) -> Option<String> {
            field.and_then(|named| named.name)
        }

        let play_id = self
            .playid
            .ok_or_else(|| FetchError::MalformedResponse("song play without a playid".to_owned()))?;

        let air_date = self.airdate.as_deref().ok_or_else(|| {
            FetchError::MalformedResponse(format!("song play {play_id} has no airdate"))
        })?;
        let air_date = DateTime::parse_from_rfc3339(air_date)
            .map_err(|err| {
                FetchError::MalformedResponse(format!(
                    "song play {play_id} has an invalid airdate {air_date:?}: {err}"
                ))
            })?
            .with_timezone(&Utc);

        let title = name_of(self.track).unwrap_or_else(|| {
            log::debug!("song play {play_id} has no track name");
            String::new()
        });
        let artist = name_of(self.artist).unwrap_or_default();

        Ok(Play {
            play_id,
            title,
            artist,
            album: name_of(self.release),
            air_date,
            comment: None,
        })
    }
}

#[derive(Deserialize)]
struct PlaysPage {
    #[serde(default)]
    next: Option<String>,
    /// A missing or null list of results is an empty page.
    #[serde(default)]
    results: Option<Vec<Option<PlayRecord>>>,
}

impl PlaysPage {
    /// Maps the songs of the page into plays, skipping everything else.
    fn into_plays(self) -> Result<Vec<Play>, FetchError> {
        self.results
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter(PlayRecord::is_song)
            .map(PlayRecord::into_play)
            .collect()
    }
}

#[derive(Debug)]
pub enum FetchError {
    /// Connecting, reading or decoding an upstream response failed.
    Transport(reqwest::Error),
    /// The upstream answered something we can't follow.
    MalformedResponse(String),
    /// Pagination went on for longer than the configured limit.
    TooManyPages(usize),
    /// The requested time window is empty, reversed or too long, in seconds.
    InvalidWindow(i64),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(err) => write!(f, "request to the plays API failed: {err}"),
            FetchError::MalformedResponse(reason) => {
                write!(f, "malformed response from the plays API: {reason}")
            }
            FetchError::TooManyPages(max) => {
                write!(f, "plays API returned more than {max} pages")
            }
            FetchError::InvalidWindow(secs) => write!(
                f,
                "invalid time window of {secs} seconds, must be between 1 and {MAX_WINDOW_SECS}"
            ),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err)
    }
}

/// Client of the upstream recent plays feed.
#[derive(Clone, Debug)]
pub struct PlaysClient {
    http: Client,
    api_url: Url,
    max_pages: usize,
}

impl PlaysClient {
    pub fn new(api_url: &str, timeout: Duration, max_pages: usize) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("playnotes/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_url: Url::parse(api_url)?,
            max_pages,
        })
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Self::new(&config.plays_api_url, config.api_timeout, config.max_pages)
    }

    async fn get_page(&self, url: Url) -> Result<PlaysPage, FetchError> {
        log::debug!("fetching plays page {url}");
        let page = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<PlaysPage>()
            .await?;
        Ok(page)
    }

    /// Fetches every song played between `begin_time` and `end_time`, following pagination, as
    /// reported by the API: duplicates included, in no particular order.
    pub async fn fetch_plays_from_api(
        &self,
        begin_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Vec<Play>, FetchError> {
        let window_secs = (end_time - begin_time).num_seconds();
        if !(1..=MAX_WINDOW_SECS).contains(&window_secs) {
            return Err(FetchError::InvalidWindow(window_secs));
        }

        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("begin_time", &begin_time.format(QUERY_TIME_FORMAT).to_string())
            .append_pair("end_time", &end_time.format(QUERY_TIME_FORMAT).to_string());

        let mut plays = Vec::new();
        let mut page = self.get_page(url).await?;
        let mut num_pages = 1;

        while page.results.as_ref().map_or(false, |results| !results.is_empty()) {
            let next = page.next.take();
            plays.extend(page.into_plays()?);

            let next = next.ok_or_else(|| {
                FetchError::MalformedResponse("non-empty page without a next page".to_owned())
            })?;
            let next = Url::parse(&next).map_err(|err| {
                FetchError::MalformedResponse(format!("invalid next page url {next:?}: {err}"))
            })?;

            if num_pages >= self.max_pages {
                return Err(FetchError::TooManyPages(self.max_pages));
            }
            page = self.get_page(next).await?;
            num_pages += 1;
        }

        Ok(plays)
    }

    /// Fetches the songs played in the `window_secs` seconds before `end_time` (defaulting to
    /// now), without duplicates, most recent first.
    pub async fn fetch_plays(
        &self,
        window_secs: i64,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<Play>, FetchError> {
        if !(1..=MAX_WINDOW_SECS).contains(&window_secs) {
            return Err(FetchError::InvalidWindow(window_secs));
        }

        let end_time = end_time.unwrap_or_else(Utc::now);
        let begin_time = chrono::Duration::try_seconds(window_secs)
            .and_then(|window| end_time.checked_sub_signed(window))
            .ok_or(FetchError::InvalidWindow(window_secs))?;

        let plays = self.fetch_plays_from_api(begin_time, end_time).await?;
        Ok(dedup_plays(plays))
    }
}

/// Removes plays that duplicate another one, keeping the lowest id of every group of duplicates,
/// and returns the survivors sorted by decreasing id, i.e. the most recently played first.
///
/// Quadratic in the number of plays: an hour of airtime is about twenty songs, and the fetch window
/// is capped by [`crate::config::MAX_WINDOW_SECS`].
pub fn dedup_plays(mut plays: Vec<Play>) -> Vec<Play> {
    if plays.len() > DEDUP_WARN_THRESHOLD {
        log::warn!(
            "deduplicating {} plays, consider a smaller window",
            plays.len()
        );
    }

    plays.sort_by_key(|play| play.play_id);

    let mut unique: Vec<Play> = Vec::with_capacity(plays.len());
    for play in plays {
        if !unique.iter().any(|kept| play.is_duplicate_of(kept)) {
            unique.push(play);
        }
    }

    unique.reverse();
    unique
}
