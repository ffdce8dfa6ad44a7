use url::Url;

use crate::JobError;

const LONG_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];

const SHORT_HOST: &str = "youtu.be";

const ID_PATH_PREFIXES: &[&str] = &["shorts", "live", "embed", "v"];

/// Checks that `raw` is an http(s) link to a YouTube video, without touching
/// the network. Surrounding whitespace is ignored.
pub fn validate_youtube_url(raw: &str) -> Result<Url, JobError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(JobError::invalid_input("URL is empty"));
    }

    let url = Url::parse(trimmed)
        .map_err(|err| JobError::invalid_input(format!("not a URL: {err}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(JobError::invalid_input(format!(
            "unsupported scheme {:?}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| JobError::invalid_input("URL has no host"))?;

    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let has_video = if host == SHORT_HOST {
        segments.len() == 1
    } else if LONG_HOSTS.contains(&host.as_str()) {
        match segments.as_slice() {
            ["watch"] => url
                .query_pairs()
                .any(|(key, value)| key == "v" && !value.is_empty()),
            [prefix, _id] => ID_PATH_PREFIXES.contains(prefix),
            _ => false,
        }
    } else {
        return Err(JobError::invalid_input(format!(
            "{host} is not a YouTube host"
        )));
    };

    if has_video {
        Ok(url)
    } else {
        Err(JobError::invalid_input(format!(
            "URL does not point at a video: {trimmed}"
        )))
    }
}
