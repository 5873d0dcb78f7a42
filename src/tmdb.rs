use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::BotError;
use crate::media::{Genre, Movie, MoviePage, MovieId, TmdbMovieResult, TmdbPageResponse};

const REQUEST_TIMEOUT_SECONDS: u64 = 20;

fn url_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len() * 3);
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenreListResponse {
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    #[serde(default)]
    pub site: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    results: Vec<Video>,
}

/// Providers offered in one region, grouped by monetization kind.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegionProviders {
    pub link: Option<String>,
    #[serde(default)]
    pub flatrate: Vec<Provider>,
    #[serde(default)]
    pub rent: Vec<Provider>,
    #[serde(default)]
    pub buy: Vec<Provider>,
    #[serde(default)]
    pub ads: Vec<Provider>,
    #[serde(default)]
    pub free: Vec<Provider>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Provider {
    #[serde(default)]
    pub provider_name: String,
}

#[derive(Debug, Deserialize)]
struct ProvidersResponse {
    #[serde(default)]
    results: HashMap<String, RegionProviders>,
}

/// First YouTube trailer or teaser in a video list, if any.
pub fn first_trailer(videos: &[Video]) -> Option<&Video> {
    videos
        .iter()
        .find(|v| v.site == "YouTube" && (v.kind == "Trailer" || v.kind == "Teaser"))
}

#[derive(Clone)]
pub struct CatalogClient {
    api_key: String,
    base_url: String,
    image_base_url: String,
    language: String,
    http_client: reqwest::Client,
}

impl CatalogClient {
    pub fn new(api_key: String, language: String) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .unwrap_or_default();
        Self {
            api_key,
            base_url: String::from("https://api.themoviedb.org/3"),
            image_base_url: String::from("https://image.tmdb.org/t/p/w500"),
            language,
            http_client,
        }
    }

    pub fn poster_url(&self, path: &str) -> String {
        format!("{}{}", self.image_base_url, path)
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!(
            "{}{}?api_key={}&language={}",
            self.base_url, endpoint, self.api_key, self.language
        )
    }

    fn build_url_with_params(&self, endpoint: &str, params: &str) -> String {
        format!("{}&{}", self.build_url(endpoint), params)
    }

    async fn fetch_response(&self, url: &str) -> Result<reqwest::Response, BotError> {
        let response = self.http_client.get(url).send().await?;
        match response.status().as_u16() {
            401 => Err(BotError::RemoteUnavailable(String::from(
                "catalog rejected the API key",
            ))),
            429 => Err(BotError::RemoteUnavailable(String::from(
                "catalog rate limit hit",
            ))),
            s if s >= 400 => Err(BotError::RemoteUnavailable(format!("HTTP error: {s}"))),
            _ => Ok(response),
        }
    }

    async fn fetch_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, BotError> {
        self.fetch_response(url)
            .await?
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))
    }

    async fn fetch_page(&self, url: &str) -> Result<MoviePage, BotError> {
        let response: TmdbPageResponse = self.fetch_json(url).await?;
        Ok(MoviePage::from(response))
    }

    pub async fn search(&self, query: &str, page: u32) -> Result<MoviePage, BotError> {
        let url = self.build_url_with_params(
            "/search/movie",
            &format!("query={}&page={page}&include_adult=false", url_encode(query)),
        );
        self.fetch_page(&url).await
    }

    pub async fn discover_by_genre(&self, genre_id: u64, page: u32) -> Result<MoviePage, BotError> {
        let url = self.build_url_with_params(
            "/discover/movie",
            &format!(
                "with_genres={genre_id}&sort_by=popularity.desc&page={page}&include_adult=false"
            ),
        );
        self.fetch_page(&url).await
    }

    pub async fn discover_by_country(
        &self,
        country_code: &str,
        page: u32,
    ) -> Result<MoviePage, BotError> {
        let url = self.build_url_with_params(
            "/discover/movie",
            &format!(
                "with_origin_country={}&sort_by=popularity.desc&page={page}&include_adult=false",
                url_encode(country_code)
            ),
        );
        self.fetch_page(&url).await
    }

    /// Fetch a single movie's details. A missing or deleted id is `None`,
    /// not an error.
    pub async fn details(&self, movie_id: MovieId) -> Result<Option<Movie>, BotError> {
        let url = self.build_url(&format!("/movie/{movie_id}"));
        match self
            .fetch_json_for::<TmdbMovieResult>(&url, "movie", movie_id)
            .await
        {
            Ok(result) => Ok(Some(Movie::from(result))),
            Err(BotError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn watch_providers(
        &self,
        movie_id: MovieId,
    ) -> Result<HashMap<String, RegionProviders>, BotError> {
        // Provider listings are region-keyed and not localized; no language param.
        let url = format!(
            "{}/movie/{movie_id}/watch/providers?api_key={}",
            self.base_url, self.api_key
        );
        let response: ProvidersResponse = self.fetch_json_for(&url, "movie", movie_id).await?;
        Ok(response.results)
    }

    pub async fn videos(&self, movie_id: MovieId) -> Result<Vec<Video>, BotError> {
        let url = self.build_url(&format!("/movie/{movie_id}/videos"));
        let response: VideosResponse = self.fetch_json_for(&url, "movie", movie_id).await?;
        Ok(response.results)
    }

    /// Like `fetch_json`, but a 404 for the addressed entity is reported
    /// as `NotFound` instead of a transport failure.
    async fn fetch_json_for<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        entity: &'static str,
        id: MovieId,
    ) -> Result<T, BotError> {
        let response = self.http_client.get(url).send().await?;
        if response.status().as_u16() == 404 {
            return Err(BotError::NotFound { entity, id });
        }
        match response.status().as_u16() {
            s if s >= 400 => Err(BotError::RemoteUnavailable(format!("HTTP error: {s}"))),
            _ => response
                .json()
                .await
                .map_err(|e| BotError::Parse(e.to_string())),
        }
    }

    pub async fn genre_list(&self) -> Result<Vec<Genre>, BotError> {
        let url = self.build_url("/genre/movie/list");
        let response: GenreListResponse = self.fetch_json(&url).await?;
        Ok(response.genres)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(site: &str, kind: &str, key: &str) -> Video {
        Video {
            site: site.to_string(),
            kind: kind.to_string(),
            key: key.to_string(),
            name: String::new(),
        }
    }

    #[test]
    fn first_trailer_prefers_earliest_youtube_trailer_or_teaser() {
        let videos = [
            video("Vimeo", "Trailer", "v1"),
            video("YouTube", "Clip", "v2"),
            video("YouTube", "Teaser", "v3"),
            video("YouTube", "Trailer", "v4"),
        ];
        assert_eq!(first_trailer(&videos).unwrap().key, "v3");
        assert!(first_trailer(&[]).is_none());
    }

    #[test]
    fn url_encode_escapes_reserved_bytes() {
        assert_eq!(url_encode("abc-123_.~"), "abc-123_.~");
        assert_eq!(url_encode("war & peace"), "war%20%26%20peace");
        assert_eq!(url_encode("кино"), "%D0%BA%D0%B8%D0%BD%D0%BE");
    }
}
