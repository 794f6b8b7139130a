//! Deterministic weather source citations derived from a city name.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;

use super::make_id;
use crate::types::SourceCitation;

static WHITESPACE: OnceLock<Regex> = OnceLock::new();

/// Lower-cased city name with every whitespace run replaced by `-`.
pub fn city_slug(city: &str) -> String {
    let ws = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
    ws.replace_all(city, "-").to_lowercase()
}

/// Citations for the weather card. Built from the city alone, so this never
/// touches the network and never fails. A missing city yields the `unknown`
/// slug.
pub fn build_source_urls(city: Option<&str>) -> Vec<SourceCitation> {
    let slug = city.map_or_else(|| "unknown".to_string(), city_slug);
    let label = city.unwrap_or("weather");

    vec![
        SourceCitation {
            source_id: make_id("source"),
            url: with_path_segment("https://wttr.in/", &slug),
            title: Some(format!("wttr.in — {label}")),
        },
        SourceCitation {
            source_id: make_id("source"),
            url: with_path_segment("https://weather.com/weather/today/l/", &slug),
            title: Some(format!("Weather.com — {label}")),
        },
        SourceCitation {
            source_id: make_id("source"),
            url: with_query("https://openweathermap.org/find", "q", &slug),
            title: Some(format!("OpenWeatherMap — {label}")),
        },
    ]
}

fn with_path_segment(base: &str, segment: &str) -> String {
    match Url::parse(base) {
        Ok(mut url) => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty().push(segment);
            }
            url.to_string()
        }
        Err(_) => format!("{base}{segment}"),
    }
}

fn with_query(base: &str, key: &str, value: &str) -> String {
    match Url::parse(base) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair(key, value);
            url.to_string()
        }
        Err(_) => format!("{base}?{key}={value}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn slug_lowercases_and_hyphenates() {
        assert_eq!(city_slug("Laval"), "laval");
        assert_eq!(city_slug("San  Francisco"), "san-francisco");
        assert_eq!(city_slug("New\tYork City"), "new-york-city");
    }

    #[test]
    fn three_citations_embed_the_slug() {
        let sources = build_source_urls(Some("San Francisco"));
        let urls: Vec<&str> = sources.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://wttr.in/san-francisco",
                "https://weather.com/weather/today/l/san-francisco",
                "https://openweathermap.org/find?q=san-francisco",
            ]
        );
        assert_eq!(sources[0].title.as_deref(), Some("wttr.in — San Francisco"));
    }

    #[test]
    fn source_ids_are_unique() {
        let sources = build_source_urls(Some("Laval"));
        assert_ne!(sources[0].source_id, sources[1].source_id);
        assert_ne!(sources[1].source_id, sources[2].source_id);
        assert!(sources.iter().all(|s| s.source_id.starts_with("source-")));
    }

    #[test]
    fn missing_city_uses_unknown_slug() {
        let sources = build_source_urls(None);
        assert_eq!(sources[0].url, "https://wttr.in/unknown");
        assert_eq!(sources[2].title.as_deref(), Some("OpenWeatherMap — weather"));
    }

    #[test]
    fn non_ascii_slug_is_percent_encoded() {
        let sources = build_source_urls(Some("Montréal"));
        assert_eq!(sources[0].url, "https://wttr.in/montr%C3%A9al");
    }
}
