use url::Url;

/// Extract the video id from a YouTube watch or short link.
///
/// `youtube.com/watch?v=ID` (with or without `www.`/`m.`) and
/// `youtu.be/ID` are recognised; anything else yields `None`.
pub fn video_id_from_url(address: &str) -> Option<String> {
    let url = Url::parse(address.trim()).ok()?;

    let id = match url.host_str()? {
        "www.youtube.com" | "youtube.com" | "m.youtube.com" => url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())?,
        "youtu.be" => url.path_segments()?.next()?.to_string(),
        _ => return None,
    };

    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
