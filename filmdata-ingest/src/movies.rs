//! Movie catalog fetcher (TMDB v3)
//!
//! The ranked `discover` listing gives ids, titles and dates but no money
//! figures, so a full catalog pass is: top earners + bottom earners, dedupe
//! by id, then one detail lookup per movie for budget, revenue, genres and
//! billed cast.

use filmdata_core::config::MoviesConfig;
use filmdata_core::models::MovieRecord;
use filmdata_core::{FetchError, HttpClient, MalformedRecord};
use serde_json::Value;
use std::collections::HashSet;

use crate::normalize::{non_blank, reported_amount};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RevenueOrder {
    Descending,
    Ascending,
}

impl RevenueOrder {
    fn sort_key(&self) -> &'static str {
        match self {
            RevenueOrder::Descending => "revenue.desc",
            RevenueOrder::Ascending => "revenue.asc",
        }
    }
}

pub struct MovieFetcher {
    client: HttpClient,
    base_url: String,
    api_key: String,
    config: MoviesConfig,
}

impl MovieFetcher {
    pub fn new(
        client: HttpClient,
        base_url: impl Into<String>,
        api_key: Option<String>,
        config: MoviesConfig,
    ) -> Result<Self, FetchError> {
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .ok_or(FetchError::MissingApiKey)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            config,
        })
    }

    /// Highest-grossing movies, `pages` listing pages deep.
    pub async fn fetch_top(&self, pages: u32) -> Vec<MovieRecord> {
        self.fetch_listing(RevenueOrder::Descending, pages, None).await
    }

    /// Lowest-grossing movies with at least `min_votes` votes.
    pub async fn fetch_bottom(&self, pages: u32, min_votes: u32) -> Vec<MovieRecord> {
        self.fetch_listing(RevenueOrder::Ascending, pages, Some(min_votes))
            .await
    }

    async fn fetch_listing(
        &self,
        order: RevenueOrder,
        pages: u32,
        min_votes: Option<u32>,
    ) -> Vec<MovieRecord> {
        let mut movies = Vec::new();

        for page in 1..=pages {
            let mut url = format!(
                "{}/discover/movie?api_key={}&sort_by={}&page={}",
                self.base_url,
                self.api_key,
                order.sort_key(),
                page
            );
            if let Some(min_votes) = min_votes {
                url.push_str(&format!("&vote_count.gte={}", min_votes));
            }

            match self.client.get_json(&url).await {
                Ok(payload) => {
                    let results = payload
                        .get("results")
                        .and_then(Value::as_array)
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    let before = movies.len();
                    for entry in results {
                        match parse_listing_entry(entry) {
                            Ok(movie) => movies.push(movie),
                            Err(e) => tracing::warn!(page, error = %e, "Skipping malformed listing entry"),
                        }
                    }
                    tracing::info!(
                        order = order.sort_key(),
                        page,
                        movies = movies.len() - before,
                        "Fetched listing page"
                    );
                }
                Err(e) => {
                    tracing::warn!(order = order.sort_key(), page, error = %e, "Skipping listing page");
                }
            }
        }

        movies
    }

    /// Full record for one movie, `None` if the lookup fails.
    pub async fn fetch_detail(&self, id: i64) -> Option<MovieRecord> {
        let url = format!(
            "{}/movie/{}?api_key={}&append_to_response=credits",
            self.base_url, id, self.api_key
        );

        match self.client.get_json(&url).await {
            Ok(payload) => match parse_detail(&payload, self.config.cast_limit) {
                Ok(movie) => Some(movie),
                Err(e) => {
                    tracing::warn!(id, error = %e, "Malformed movie detail");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(id, error = %e, "Movie detail lookup failed");
                None
            }
        }
    }

    /// Top and bottom listings, deduplicated by id and enriched with
    /// details. A movie whose detail lookup fails keeps its listing record.
    pub async fn fetch_catalog(&self) -> Vec<MovieRecord> {
        let mut listing = self.fetch_top(self.config.top_pages).await;
        listing.extend(
            self.fetch_bottom(self.config.bottom_pages, self.config.min_votes)
                .await,
        );

        let mut seen = HashSet::new();
        listing.retain(|m| seen.insert(m.id));

        let mut catalog = Vec::with_capacity(listing.len());
        let mut enriched = 0usize;
        for movie in listing {
            match self.fetch_detail(movie.id).await {
                Some(detail) => {
                    enriched += 1;
                    catalog.push(detail);
                }
                None => catalog.push(movie),
            }
        }

        tracing::info!(movies = catalog.len(), enriched, "Movie catalog fetched");
        catalog
    }
}

fn required_id(entry: &Value) -> Result<i64, MalformedRecord> {
    entry
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| MalformedRecord::new("movie without numeric id"))
}

fn required_title(entry: &Value) -> Result<String, MalformedRecord> {
    non_blank(entry.get("title"))
        .or_else(|| non_blank(entry.get("original_title")))
        .ok_or_else(|| MalformedRecord::new("movie without title"))
}

pub fn parse_listing_entry(entry: &Value) -> Result<MovieRecord, MalformedRecord> {
    Ok(MovieRecord {
        id: required_id(entry)?,
        title: required_title(entry)?,
        budget: None,
        revenue: None,
        release_date: non_blank(entry.get("release_date")),
        language: non_blank(entry.get("original_language")),
        genres: Vec::new(),
        cast: Vec::new(),
    })
}

fn names(list: Option<&Value>) -> impl Iterator<Item = String> + '_ {
    list.and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| non_blank(item.get("name")))
}

pub fn parse_detail(entry: &Value, cast_limit: usize) -> Result<MovieRecord, MalformedRecord> {
    let cast_list = entry.get("credits").and_then(|c| c.get("cast"));

    Ok(MovieRecord {
        id: required_id(entry)?,
        title: required_title(entry)?,
        budget: reported_amount(entry.get("budget")),
        revenue: reported_amount(entry.get("revenue")),
        release_date: non_blank(entry.get("release_date")),
        language: non_blank(entry.get("original_language")),
        genres: names(entry.get("genres")).collect(),
        cast: names(cast_list).take(cast_limit).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmdata_core::config::HttpConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_fetcher(server: &MockServer) -> MovieFetcher {
        let client = HttpClient::new(&HttpConfig {
            max_attempts: 2,
            retry_delay_ms: 10,
            ..HttpConfig::default()
        })
        .unwrap();

        MovieFetcher::new(
            client,
            server.uri(),
            Some("test-key".to_string()),
            MoviesConfig {
                top_pages: 1,
                bottom_pages: 1,
                min_votes: 10,
                cast_limit: 2,
            },
        )
        .unwrap()
    }

    fn page(ids: &[i64]) -> serde_json::Value {
        let results: Vec<serde_json::Value> = ids
            .iter()
            .map(|id| {
                json!({
                    "id": id,
                    "title": format!("Movie {}", id),
                    "release_date": "2019-04-24",
                    "original_language": "en",
                    "genre_ids": [28, 12]
                })
            })
            .collect();
        json!({ "page": 1, "results": results })
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let client = HttpClient::new(&HttpConfig::default()).unwrap();
        for key in [None, Some(String::new())] {
            let result = MovieFetcher::new(
                client.clone(),
                "http://localhost",
                key,
                MoviesConfig::default(),
            );
            assert!(matches!(result, Err(FetchError::MissingApiKey)));
        }
    }

    #[test]
    fn test_parse_detail_fills_money_genres_and_cast() {
        let detail = json!({
            "id": 299534,
            "title": "Avengers: Endgame",
            "budget": 356000000,
            "revenue": 2799439100u64,
            "release_date": "2019-04-24",
            "original_language": "en",
            "genres": [{ "id": 12, "name": "Adventure" }, { "id": 878, "name": "Science Fiction" }],
            "credits": { "cast": [
                { "name": "Robert Downey Jr." },
                { "name": "Chris Evans" },
                { "name": "Mark Ruffalo" }
            ]}
        });

        let movie = parse_detail(&detail, 2).unwrap();
        assert_eq!(movie.budget, Some(356_000_000.0));
        assert_eq!(movie.revenue, Some(2_799_439_100.0));
        assert_eq!(movie.genres, vec!["Adventure", "Science Fiction"]);
        assert_eq!(movie.cast, vec!["Robert Downey Jr.", "Chris Evans"]);
    }

    #[test]
    fn test_parse_detail_zero_budget_is_missing() {
        let detail = json!({ "id": 1, "title": "Tiny", "budget": 0, "revenue": 0, "release_date": "" });
        let movie = parse_detail(&detail, 5).unwrap();
        assert_eq!(movie.budget, None);
        assert_eq!(movie.revenue, None);
        assert_eq!(movie.release_date, None);
    }

    #[test]
    fn test_listing_entry_without_id_is_malformed() {
        assert!(parse_listing_entry(&json!({ "title": "No id" })).is_err());
        assert!(parse_listing_entry(&json!({ "id": 3 })).is_err());
    }

    #[tokio::test]
    async fn test_failed_page_is_skipped_and_later_pages_still_run() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/discover/movie"))
            .and(query_param("sort_by", "revenue.desc"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/discover/movie"))
            .and(query_param("sort_by", "revenue.desc"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&[10, 11])))
            .mount(&mock_server)
            .await;

        let fetcher = test_fetcher(&mock_server);
        let movies = fetcher.fetch_top(2).await;

        let ids: Vec<i64> = movies.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![10, 11]);
    }

    #[tokio::test]
    async fn test_bottom_listing_filters_by_vote_count() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/discover/movie"))
            .and(query_param("sort_by", "revenue.asc"))
            .and(query_param("vote_count.gte", "25"))
            .and(query_param("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&[1])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = test_fetcher(&mock_server);
        let movies = fetcher.fetch_bottom(1, 25).await;

        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].budget, None);
    }

    #[tokio::test]
    async fn test_catalog_dedupes_and_falls_back_to_listing() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/discover/movie"))
            .and(query_param("sort_by", "revenue.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&[1, 2])))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/discover/movie"))
            .and(query_param("sort_by", "revenue.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&[2, 3])))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/movie/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "title": "Movie 1", "budget": 10, "revenue": 40,
                "release_date": "2019-04-24", "genres": [{ "name": "Drama" }]
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/movie/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 2, "title": "Movie 2", "budget": 20, "revenue": 5
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/movie/3"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let fetcher = test_fetcher(&mock_server);
        let catalog = fetcher.fetch_catalog().await;

        let ids: Vec<i64> = catalog.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(catalog[0].genres, vec!["Drama"]);
        assert_eq!(catalog[1].revenue, Some(5.0));
        assert_eq!(catalog[2].budget, None, "Detail failed, listing record kept");
        assert_eq!(catalog[2].title, "Movie 3");
    }
}
