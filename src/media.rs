use serde::Deserialize;

pub type MovieId = u64;

/// How many entries a full TMDB result page holds.
pub const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

/// One catalog entry, normalized from the TMDB wire shape.
#[derive(Debug, Clone)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub vote_average: f32,
    pub release_date: Option<String>,
    pub genres: Vec<Genre>,
}

impl Movie {
    /// Four-digit release year, or the "—" placeholder when unknown.
    pub fn year(&self) -> String {
        self.release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .filter(|y| !y.is_empty())
            .map(String::from)
            .unwrap_or_else(|| String::from("—"))
    }

    pub fn rating(&self) -> String {
        if self.vote_average > 0.0 {
            format!("{:.1}", self.vote_average)
        } else {
            String::from("—")
        }
    }
}

/// One page of results plus the remote's page count.
///
/// Ephemeral: rebuilt on every navigation step, never stored.
#[derive(Debug, Clone)]
pub struct MoviePage {
    pub results: Vec<Movie>,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieResult {
    pub id: u64,
    pub title: Option<String>,
    pub original_title: Option<String>,
    #[serde(default)]
    pub overview: String,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: f32,
    pub release_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
}

impl From<TmdbMovieResult> for Movie {
    fn from(result: TmdbMovieResult) -> Self {
        let title = result
            .title
            .filter(|t| !t.is_empty())
            .or(result.original_title)
            .unwrap_or_else(|| String::from("Untitled"));
        Self {
            id: result.id,
            title,
            overview: result.overview,
            poster_path: result.poster_path,
            vote_average: result.vote_average,
            release_date: result.release_date,
            genres: result.genres,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TmdbPageResponse {
    #[serde(default)]
    pub results: Vec<TmdbMovieResult>,
    #[serde(default)]
    pub total_pages: u32,
}

impl From<TmdbPageResponse> for MoviePage {
    fn from(response: TmdbPageResponse) -> Self {
        Self {
            results: response.results.into_iter().map(Movie::from).collect(),
            total_pages: response.total_pages.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(title: Option<&str>, original: Option<&str>) -> TmdbMovieResult {
        TmdbMovieResult {
            id: 1,
            title: title.map(String::from),
            original_title: original.map(String::from),
            overview: String::new(),
            poster_path: None,
            vote_average: 0.0,
            release_date: None,
            genres: Vec::new(),
        }
    }

    #[test]
    fn title_falls_back_to_original_then_placeholder() {
        assert_eq!(
            Movie::from(wire(Some("Начало"), Some("Inception"))).title,
            "Начало"
        );
        assert_eq!(Movie::from(wire(None, Some("Inception"))).title, "Inception");
        assert_eq!(
            Movie::from(wire(Some(""), Some("Inception"))).title,
            "Inception"
        );
        assert_eq!(Movie::from(wire(None, None)).title, "Untitled");
    }

    #[test]
    fn year_is_first_four_chars_or_placeholder() {
        let mut movie = Movie::from(wire(Some("x"), None));
        movie.release_date = Some(String::from("2010-07-16"));
        assert_eq!(movie.year(), "2010");
        movie.release_date = None;
        assert_eq!(movie.year(), "—");
    }

    #[test]
    fn total_pages_clamped_to_at_least_one() {
        let page = MoviePage::from(TmdbPageResponse {
            results: Vec::new(),
            total_pages: 0,
        });
        assert_eq!(page.total_pages, 1);
    }
}
