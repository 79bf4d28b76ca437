//! URL helpers for the page-opening intents.

use std::fmt::Write as _;

use url::Url;

use crate::encoding::encode_uri;

const REDDIT_SEARCH_URL: &str = "https://www.reddit.com/r/anime/search?q=";

/// Suffixes stripped from a title before searching discussions.
const TITLE_SUFFIXES: [&str; 3] = [" (TV)", " (Sub)", " (Dub)"];

/// Extracts the anime id from a watch URL.
///
/// `https://9anime.to/watch/one-piece.ov8/ep-1` yields `ov8`: the id is the
/// part after the last dot of the segment following `watch`.
#[must_use]
pub fn extract_anime_id(anime_url: &str) -> Option<String> {
    let url = Url::parse(anime_url).ok()?;
    let mut segments = url.path_segments()?;
    segments.find(|segment| *segment == "watch")?;
    let slug = segments.next()?;
    let (_, id) = slug.rsplit_once('.')?;
    (!id.is_empty()).then(|| id.to_string())
}

/// Removes the first occurrence of each `(TV)`, `(Sub)`, `(Dub)` marker and trims.
#[must_use]
pub fn clean_title(name: &str) -> String {
    TITLE_SUFFIXES
        .iter()
        .fold(name.to_string(), |title, suffix| title.replacen(suffix, "", 1))
        .trim()
        .to_string()
}

/// Builds the reddit search URL for an anime's discussion threads.
///
/// With an episode, every title term becomes `title:"<name> Episode <n>"`.
/// Alternate names are OR-ed in verbatim (not cleaned).
#[must_use]
pub fn reddit_discussion_url(name: &str, episode: Option<&str>, alternate_names: &[String]) -> String {
    let term = |title: &str| match episode {
        Some(episode) => format!("title:\"{title} Episode {episode}\""),
        None => format!("title:\"{title}\""),
    };

    let mut title_text = term(&clean_title(name));
    for alternate in alternate_names {
        let _ = write!(title_text, " OR {}", term(alternate));
    }

    let params =
        format!("subreddit:anime self:yes title:\"[Spoilers]\" title:\"[Discussion]\" ({title_text})");
    encode_uri(&format!("{REDDIT_SEARCH_URL}{params}&sort=new"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_anime_id() {
        assert_eq!(
            extract_anime_id("https://9anime.to/watch/one-piece.ov8/ep-1").as_deref(),
            Some("ov8")
        );
        assert_eq!(
            extract_anime_id("https://9anime.to/watch/re-zero.v3.k2p").as_deref(),
            Some("k2p")
        );
        assert_eq!(extract_anime_id("https://9anime.to/watch/no-id"), None);
        assert_eq!(extract_anime_id("https://9anime.to/genre/action"), None);
        assert_eq!(extract_anime_id("not a url"), None);
    }

    #[test]
    fn test_clean_title_strips_markers() {
        assert_eq!(clean_title("Naruto (TV) (Dub) "), "Naruto");
        assert_eq!(clean_title("Bleach (Sub)"), "Bleach");
        assert_eq!(clean_title("Plain"), "Plain");
    }

    #[test]
    fn test_reddit_url_without_episode() {
        let url = reddit_discussion_url("Naruto (TV)", None, &[]);
        assert_eq!(
            url,
            "https://www.reddit.com/r/anime/search?q=subreddit:anime%20self:yes%20\
             title:%22%5BSpoilers%5D%22%20title:%22%5BDiscussion%5D%22%20\
             (title:%22Naruto%22)&sort=new"
        );
    }

    #[test]
    fn test_reddit_url_with_episode_and_alternates() {
        let url = reddit_discussion_url("Shingeki no Kyojin", Some("5"), &["Attack on Titan".to_string()]);
        assert!(url.contains("(title:%22Shingeki%20no%20Kyojin%20Episode%205%22%20OR%20title:%22Attack%20on%20Titan%20Episode%205%22)"));
        assert!(url.ends_with("&sort=new"));
    }
}
