//! Core data models for oEmbed lookups
//!
//! This module contains the provider table, the request parameters accepted
//! from the host, and the metadata handed back to it.

pub mod fetcher;
pub mod oembed;

pub use fetcher::{FetchError, FetchResponse, Fetcher, HttpFetcher};
pub use oembed::{OembedClient, ResolveError};

use serde::Serialize;
use tracing::debug;
use url::form_urlencoded;

/// Video hosts with a known oEmbed endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    YouTube,
    Vimeo,
}

impl Provider {
    /// Recognizes the provider from a marker anywhere in the video URL
    ///
    /// Returns `None` for URLs from any other host.
    pub fn detect(video_url: &str) -> Option<Self> {
        if video_url.contains("youtube.com/") {
            Some(Provider::YouTube)
        } else if video_url.contains("vimeo.com/") {
            Some(Provider::Vimeo)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::YouTube => "youtube",
            Provider::Vimeo => "vimeo",
        }
    }

    /// oEmbed endpoint, without query string
    fn endpoint(&self) -> &'static str {
        match self {
            Provider::YouTube => "https://www.youtube.com/oembed",
            Provider::Vimeo => "https://vimeo.com/api/oembed.json",
        }
    }

    /// Query pairs the endpoint always needs, ahead of `url`
    fn fixed_pairs(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Provider::YouTube => &[("format", "json")],
            Provider::Vimeo => &[],
        }
    }

    /// Builds the canonical provider request URL
    ///
    /// Parameters are always appended in the same order, so equal requests
    /// produce equal URLs and therefore the same cache key.
    pub fn request_url(&self, video_url: &str, params: &EmbedParams) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (name, value) in self.fixed_pairs() {
            query.append_pair(name, value);
        }
        query.append_pair("url", video_url);
        params.append_to(&mut query);
        format!("{}?{}", self.endpoint(), query.finish())
    }
}

/// Sizing and display options for an embed request
///
/// The Vimeo flags are sent to both providers; YouTube ignores them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedParams {
    /// Maximum embed width in pixels
    pub max_width: Option<u32>,
    /// Maximum embed height in pixels
    pub max_height: Option<u32>,
    /// Show the author byline (Vimeo)
    pub vimeo_byline: bool,
    /// Show the video title (Vimeo)
    pub vimeo_title: bool,
    /// Start playing on load (Vimeo)
    pub vimeo_autoplay: bool,
}

impl Default for EmbedParams {
    fn default() -> Self {
        Self {
            max_width: None,
            max_height: None,
            vimeo_byline: true,
            vimeo_title: true,
            vimeo_autoplay: false,
        }
    }
}

impl EmbedParams {
    /// Builds params from the host's unordered `(name, value)` parameter bag
    ///
    /// Recognized names are `max_width`, `max_height`, `vimeo_byline`,
    /// `vimeo_title` and `vimeo_autoplay`. Byline and title are only turned off
    /// by the literal `"false"`, autoplay is only turned on by `"true"`, and
    /// sizes that are not positive integers are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::default();
        for (name, value) in pairs {
            let value = value.as_ref();
            match name.as_ref() {
                "max_width" => params.max_width = parse_dimension(value),
                "max_height" => params.max_height = parse_dimension(value),
                "vimeo_byline" => params.vimeo_byline = value != "false",
                "vimeo_title" => params.vimeo_title = value != "false",
                "vimeo_autoplay" => params.vimeo_autoplay = value == "true",
                other => debug!(param = other, "ignoring unknown embed parameter"),
            }
        }
        params
    }

    fn append_to(&self, query: &mut form_urlencoded::Serializer<'_, String>) {
        if let Some(width) = self.max_width {
            query.append_pair("maxwidth", &width.to_string());
        }
        if let Some(height) = self.max_height {
            query.append_pair("maxheight", &height.to_string());
        }
        if !self.vimeo_byline {
            query.append_pair("byline", "false");
        }
        if !self.vimeo_title {
            query.append_pair("title", "false");
        }
        if self.vimeo_autoplay {
            query.append_pair("autoplay", "true");
        }
    }
}

fn parse_dimension(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|v| *v > 0)
}

/// Embed code and metadata for a single video
///
/// Every field is optional since providers may omit any of them. The empty
/// result (nothing resolved) is `VideoMetadata::default()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoMetadata {
    /// Embed HTML (`html`)
    pub embed_html: Option<String>,
    /// Video title (`title`)
    pub title: Option<String>,
    /// Uploader name (`author_name`)
    pub author_name: Option<String>,
    /// Uploader page (`author_url`)
    pub author_url: Option<String>,
    /// Thumbnail image (`thumbnail_url`)
    pub thumbnail_url: Option<String>,
}

impl VideoMetadata {
    /// True if no field was resolved
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The result set under the names a host template refers to
    pub fn template_vars(&self) -> TemplateVars<'_> {
        TemplateVars {
            video_title: self.title.as_deref(),
            embed_code: self.embed_html.as_deref(),
            video_author: self.author_name.as_deref(),
            video_author_url: self.author_url.as_deref(),
            video_thumbnail: self.thumbnail_url.as_deref(),
        }
    }
}

/// Template variable view of `VideoMetadata`
///
/// Serializes to a JSON object with one key per variable, `null` when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemplateVars<'a> {
    pub video_title: Option<&'a str>,
    pub embed_code: Option<&'a str>,
    pub video_author: Option<&'a str>,
    pub video_author_url: Option<&'a str>,
    pub video_thumbnail: Option<&'a str>,
}

impl<'a> TemplateVars<'a> {
    /// `(name, value)` pairs in a fixed order
    pub fn pairs(&self) -> [(&'static str, Option<&'a str>); 5] {
        [
            ("video_title", self.video_title),
            ("embed_code", self.embed_code),
            ("video_author", self.video_author),
            ("video_author_url", self.video_author_url),
            ("video_thumbnail", self.video_thumbnail),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_youtube_and_vimeo() {
        assert_eq!(
            Provider::detect("https://www.youtube.com/watch?v=abc123"),
            Some(Provider::YouTube)
        );
        assert_eq!(Provider::detect("https://vimeo.com/76979871"), Some(Provider::Vimeo));
        assert_eq!(Provider::detect("http://player.vimeo.com/video/1"), Some(Provider::Vimeo));
    }

    #[test]
    fn test_detect_rejects_other_hosts() {
        assert_eq!(Provider::detect("https://example.com/video"), None);
        assert_eq!(Provider::detect("https://youtu.be/abc123"), None);
        assert_eq!(Provider::detect("youtube.com"), None, "Marker needs the trailing slash");
        assert_eq!(Provider::detect(""), None);
    }

    #[test]
    fn test_youtube_request_url() {
        let params = EmbedParams {
            max_width: Some(232),
            ..Default::default()
        };

        let url = Provider::YouTube.request_url("https://www.youtube.com/watch?v=abc123", &params);

        assert_eq!(
            url,
            "https://www.youtube.com/oembed?format=json&url=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3Dabc123&maxwidth=232"
        );
    }

    #[test]
    fn test_vimeo_request_url_with_all_flags() {
        let params = EmbedParams {
            max_width: Some(640),
            max_height: Some(360),
            vimeo_byline: false,
            vimeo_title: false,
            vimeo_autoplay: true,
        };

        let url = Provider::Vimeo.request_url("https://vimeo.com/1", &params);

        assert_eq!(
            url,
            "https://vimeo.com/api/oembed.json?url=https%3A%2F%2Fvimeo.com%2F1&maxwidth=640&maxheight=360&byline=false&title=false&autoplay=true"
        );
    }

    #[test]
    fn test_default_params_add_nothing() {
        let url = Provider::Vimeo.request_url("https://vimeo.com/1", &EmbedParams::default());
        assert_eq!(url, "https://vimeo.com/api/oembed.json?url=https%3A%2F%2Fvimeo.com%2F1");
    }

    #[test]
    fn test_from_pairs_is_order_independent() {
        let forward = EmbedParams::from_pairs([
            ("max_width", "232"),
            ("max_height", "323"),
            ("vimeo_byline", "false"),
            ("vimeo_autoplay", "true"),
        ]);
        let reversed = EmbedParams::from_pairs([
            ("vimeo_autoplay", "true"),
            ("vimeo_byline", "false"),
            ("max_height", "323"),
            ("max_width", "232"),
        ]);

        assert_eq!(forward, reversed);
        let video = "https://vimeo.com/1";
        assert_eq!(
            Provider::Vimeo.request_url(video, &forward),
            Provider::Vimeo.request_url(video, &reversed)
        );
    }

    #[test]
    fn test_from_pairs_flag_literals() {
        let params = EmbedParams::from_pairs([
            ("vimeo_byline", "no"),
            ("vimeo_title", "FALSE"),
            ("vimeo_autoplay", "yes"),
        ]);

        assert!(params.vimeo_byline, "Only the literal \"false\" disables the byline");
        assert!(params.vimeo_title);
        assert!(!params.vimeo_autoplay, "Only the literal \"true\" enables autoplay");
    }

    #[test]
    fn test_from_pairs_ignores_bad_dimensions_and_unknown_names() {
        let params = EmbedParams::from_pairs([
            ("max_width", "wide"),
            ("max_height", "0"),
            ("colour", "red"),
        ]);

        assert_eq!(params, EmbedParams::default());
    }

    #[test]
    fn test_video_metadata_default_is_empty() {
        let metadata = VideoMetadata::default();
        assert!(metadata.is_empty());
        assert!(metadata.template_vars().pairs().iter().all(|(_, value)| value.is_none()));
    }

    #[test]
    fn test_template_vars_names_and_values() {
        let metadata = VideoMetadata {
            embed_html: Some("<iframe/>".to_string()),
            title: Some("T".to_string()),
            author_name: None,
            author_url: Some("http://a".to_string()),
            thumbnail_url: None,
        };

        let vars = metadata.template_vars().pairs();

        assert!(!metadata.is_empty());
        assert_eq!(
            vars,
            [
                ("video_title", Some("T")),
                ("embed_code", Some("<iframe/>")),
                ("video_author", None),
                ("video_author_url", Some("http://a")),
                ("video_thumbnail", None),
            ]
        );
    }

    #[test]
    fn test_template_vars_serialize_with_variable_names() {
        let metadata = VideoMetadata {
            embed_html: Some("<iframe/>".to_string()),
            title: Some("T".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_value(metadata.template_vars()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "video_title": "T",
                "embed_code": "<iframe/>",
                "video_author": null,
                "video_author_url": null,
                "video_thumbnail": null,
            })
        );
    }
}
