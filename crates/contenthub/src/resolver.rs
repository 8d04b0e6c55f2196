//! Maps source URLs to the external video identifier used for downloads.
//!
//! Supported forms, checked in order:
//!
//! - `https://youtu.be/{id}`
//! - `https://{www,m,music}.youtube.com/...?list={playlist}` (playlist wins
//!   even when a `v` parameter is also present)
//! - `https://www.youtube.com/watch?v={id}`
//! - `https://www.youtube.com/{watch,embed,v,shorts,live}/{id}`
//!
//! Anything else resolves to `None`; the resolver never fails.

use url::Url;

const SHORT_HOST: &str = "youtu.be";

const CANONICAL_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

/// Path prefixes whose second segment is the video id.
const ID_PATH_PREFIXES: &[&str] = &["watch", "embed", "v", "shorts", "live"];

/// Resolves `url` into a video (or playlist) identifier.
pub fn resolve_video_id(url: &str) -> Option<String> {
    let parsed = parse_lenient(url.trim())?;
    let host = parsed.host_str()?.to_ascii_lowercase();

    if host == SHORT_HOST {
        return segment(&parsed, 0);
    }

    if !CANONICAL_HOSTS.contains(&host.as_str()) {
        return None;
    }

    if let Some(playlist) = query_param(&parsed, "list") {
        return Some(playlist);
    }

    if parsed.path() == "/watch" {
        return query_param(&parsed, "v");
    }

    let first = segment(&parsed, 0)?;
    if ID_PATH_PREFIXES.contains(&first.as_str()) {
        return segment(&parsed, 1);
    }

    None
}

/// Builds the canonical watch URL for a resolved id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Parses `input`, accepting scheme-less forms such as `youtu.be/abc`.
fn parse_lenient(input: &str) -> Option<Url> {
    match Url::parse(input) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{}", input)).ok()
        }
        Err(_) => None,
    }
}

fn segment(url: &Url, index: usize) -> Option<String> {
    url.path_segments()?
        .nth(index)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
