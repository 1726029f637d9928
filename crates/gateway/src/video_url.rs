use reqwest::Url;

/// Extract a video id from a pasted video URL, accepting the short-link,
/// watch, embed, shorts, and live forms. The scheme is optional and a
/// leading `www.` is ignored. Returns `None` for anything else, including
/// plain search text.
pub fn extract_video_id(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let url = Url::parse(trimmed)
        .ok()
        .or_else(|| Url::parse(&format!("https://{trimmed}")).ok())?;
    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    if host == "youtu.be" {
        let candidate = url.path_segments()?.next()?;
        return is_video_id(candidate).then(|| candidate.to_string());
    }

    if host == "youtube.com" || host.ends_with(".youtube.com") {
        if let Some((_, v)) = url.query_pairs().find(|(key, _)| key == "v")
            && is_video_id(&v)
        {
            return Some(v.into_owned());
        }

        let mut segments = url.path_segments()?.filter(|segment| !segment.is_empty());
        let (kind, candidate) = (segments.next()?, segments.next()?);
        if matches!(kind, "embed" | "shorts" | "live") && is_video_id(candidate) {
            return Some(candidate.to_string());
        }
    }

    None
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn accepts_all_known_url_forms() {
        for input in [
            format!("https://youtu.be/{ID}"),
            format!("https://www.youtube.com/watch?v={ID}"),
            format!("https://youtube.com/watch?v={ID}&t=42"),
            format!("https://www.youtube.com/embed/{ID}"),
            format!("https://m.youtube.com/shorts/{ID}"),
            format!("https://www.youtube.com/live/{ID}"),
        ] {
            assert_eq!(extract_video_id(&input).as_deref(), Some(ID), "{input}");
        }
    }

    #[test]
    fn scheme_is_optional() {
        assert_eq!(
            extract_video_id(&format!("youtube.com/watch?v={ID}")).as_deref(),
            Some(ID)
        );
        assert_eq!(
            extract_video_id(&format!("  www.youtube.com/shorts/{ID}  ")).as_deref(),
            Some(ID)
        );
    }

    #[test]
    fn rejects_other_hosts_and_malformed_ids() {
        assert_eq!(extract_video_id("https://vimeo.com/12345"), None);
        assert_eq!(
            extract_video_id(&format!("https://notyoutube.com/watch?v={ID}")),
            None
        );
        assert_eq!(extract_video_id("https://youtu.be/short"), None);
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=has spaces!"),
            None
        );
    }

    #[test]
    fn rejects_plain_search_text() {
        assert_eq!(extract_video_id("lofi beats"), None);
        assert_eq!(extract_video_id(""), None);
        assert_eq!(extract_video_id("   "), None);
    }
}
