//! Search endpoint URL construction

use crate::config::EndpointConfig;
use crate::query::SearchCriteria;
use crate::state::PaginationCursor;
use crate::ConfigError;
use url::Url;

/// Fixed parameters the timeline endpoint expects before the query
const TIMELINE_PARAMS: [(&str, &str); 3] = [
    ("vertical", "default"),
    ("include_available_features", "1"),
    ("include_entities", "1"),
];

/// The provider URLs a crawl talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Base for permalinks and author pages
    pub site: Url,

    /// Landing search page (first page)
    pub search: Url,

    /// Timeline pagination endpoint (next pages)
    pub timeline: Url,
}

impl Endpoints {
    /// Parses the endpoint URLs from configuration
    pub fn from_config(config: &EndpointConfig) -> Result<Self, ConfigError> {
        let parse = |name: &str, raw: &str| {
            Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(format!("{} '{}': {}", name, raw, e)))
        };

        // Links are joined onto the site URL, so its path must end in '/'
        let mut site = parse("site-url", &config.site_url)?;
        if !site.path().ends_with('/') {
            let path = format!("{}/", site.path());
            site.set_path(&path);
        }

        Ok(Self {
            site,
            search: parse("search-url", &config.search_url)?,
            timeline: parse("timeline-url", &config.timeline_url)?,
        })
    }
}

impl SearchCriteria {
    /// Builds the request URL for the next fetch
    ///
    /// Without a cursor this is the landing search page carrying only the
    /// query. With a cursor it is the timeline endpoint with the fixed
    /// timeline parameters and `max_position`. A language, when set, is
    /// appended as `l`.
    ///
    /// # Example
    ///
    /// ```
    /// use post_sweep::config::EndpointConfig;
    /// use post_sweep::query::{Endpoints, SearchCriteria};
    /// use post_sweep::state::PaginationCursor;
    ///
    /// let endpoints = Endpoints::from_config(&EndpointConfig::default()).unwrap();
    /// let criteria = SearchCriteria::builder().any_of("ios").build();
    ///
    /// let first = criteria.build_url(&endpoints, None);
    /// assert_eq!(first.as_str(), "https://twitter.com/search?q=ios");
    ///
    /// let cursor = PaginationCursor::new("TWEET-1-2");
    /// let next = criteria.build_url(&endpoints, Some(&cursor));
    /// assert!(next.as_str().ends_with("&q=ios&max_position=TWEET-1-2"));
    /// ```
    pub fn build_url(&self, endpoints: &Endpoints, cursor: Option<&PaginationCursor>) -> Url {
        let query = self.render_query();

        let mut url = match cursor {
            None => endpoints.search.clone(),
            Some(_) => endpoints.timeline.clone(),
        };

        {
            let mut pairs = url.query_pairs_mut();
            match cursor {
                None => {
                    pairs.append_pair("q", &query);
                }
                Some(cursor) => {
                    pairs.extend_pairs(TIMELINE_PARAMS.iter());
                    pairs.append_pair("q", &query);
                    pairs.append_pair("max_position", cursor.as_str());
                }
            }

            if let Some(language) = self.language().filter(|l| !l.is_empty()) {
                pairs.append_pair("l", language);
            }
        }

        url
    }
}
