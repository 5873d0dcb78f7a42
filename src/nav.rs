//! Callback-data codec.
//!
//! Every inline button carries a short flat identifier. Internally the
//! identifiers are a tagged [`Callback`] enum; the string form exists only
//! at the transport edge, where Telegram limits callback data to 64 bytes.

use crate::error::BotError;
use crate::media::MovieId;

/// Payload length cap applied before a navigation token is encoded.
/// Longer search strings are cut silently; the tail is not recoverable.
pub const MAX_PAYLOAD_CHARS: usize = 40;

const NAV_PREFIX: &str = "pg";

/// What a paginated view is browsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseKind {
    Search,
    GenreBrowse,
    CountryBrowse,
}

impl BrowseKind {
    fn tag(self) -> &'static str {
        match self {
            BrowseKind::Search => "s",
            BrowseKind::GenreBrowse => "g",
            BrowseKind::CountryBrowse => "c",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "s" => Some(BrowseKind::Search),
            "g" => Some(BrowseKind::GenreBrowse),
            "c" => Some(BrowseKind::CountryBrowse),
            _ => None,
        }
    }
}

/// A resumable position in a paginated query: no server-side session
/// state backs this, the token alone reconstructs the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavTarget {
    pub kind: BrowseKind,
    pub page: u32,
    pub payload: String,
}

impl NavTarget {
    pub fn new(kind: BrowseKind, page: u32, payload: impl Into<String>) -> Self {
        Self {
            kind,
            page,
            payload: truncate_payload(payload.into()),
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "{NAV_PREFIX}:{}:{}:{}",
            self.kind.tag(),
            self.page,
            truncate_payload(self.payload.clone())
        )
    }

    pub fn decode(data: &str) -> Result<Self, BotError> {
        let malformed = || BotError::MalformedToken(data.to_string());

        let mut fields = data.splitn(4, ':');
        if fields.next() != Some(NAV_PREFIX) {
            return Err(malformed());
        }
        let kind = fields
            .next()
            .and_then(BrowseKind::from_tag)
            .ok_or_else(malformed)?;
        let page: u32 = fields
            .next()
            .and_then(|p| p.parse().ok())
            .filter(|&p| p >= 1)
            .ok_or_else(malformed)?;
        let payload = fields.next().ok_or_else(malformed)?;

        Ok(Self {
            kind,
            page,
            payload: payload.to_string(),
        })
    }

    /// Token for the same query one page over.
    pub fn turned_to(&self, page: u32) -> Self {
        Self {
            kind: self.kind,
            page,
            payload: self.payload.clone(),
        }
    }
}

fn truncate_payload(payload: String) -> String {
    match payload.char_indices().nth(MAX_PAYLOAD_CHARS) {
        Some((byte_index, _)) => payload[..byte_index].to_string(),
        None => payload,
    }
}

/// Every button identifier the bot emits, parsed at the transport edge.
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    Details(MovieId),
    GenreMenu { genre_id: u64, page: u32 },
    CountryMenu { code: String, page: u32 },
    Navigate(NavTarget),
    Providers(MovieId),
    Trailer(MovieId),
    FavoriteAdd(MovieId),
    FavoriteList,
    FavoriteRemove(MovieId),
}

impl Callback {
    pub fn encode(&self) -> String {
        match self {
            Callback::Details(id) => format!("det:{id}"),
            Callback::GenreMenu { genre_id, page } => format!("genre:{genre_id}:{page}"),
            Callback::CountryMenu { code, page } => format!("country:{code}:{page}"),
            Callback::Navigate(target) => target.encode(),
            Callback::Providers(id) => format!("watch:{id}"),
            Callback::Trailer(id) => format!("trailer:{id}"),
            Callback::FavoriteAdd(id) => format!("fav_add:{id}"),
            Callback::FavoriteList => String::from("fav_list"),
            Callback::FavoriteRemove(id) => format!("fav_del:{id}"),
        }
    }

    pub fn parse(data: &str) -> Result<Self, BotError> {
        let malformed = || BotError::MalformedToken(data.to_string());

        if data == "fav_list" {
            return Ok(Callback::FavoriteList);
        }
        if data.starts_with("pg:") {
            return NavTarget::decode(data).map(Callback::Navigate);
        }
        if let Some(rest) = data.strip_prefix("det:") {
            return parse_id(rest).map(Callback::Details).ok_or_else(malformed);
        }
        if let Some(rest) = data.strip_prefix("genre:") {
            let (genre_id, page) = parse_id_page(rest).ok_or_else(malformed)?;
            return Ok(Callback::GenreMenu { genre_id, page });
        }
        if let Some(rest) = data.strip_prefix("country:") {
            let (code, page) = rest.split_once(':').ok_or_else(malformed)?;
            let page: u32 = page.parse().ok().filter(|&p| p >= 1).ok_or_else(malformed)?;
            return Ok(Callback::CountryMenu {
                code: code.to_string(),
                page,
            });
        }
        if let Some(rest) = data.strip_prefix("watch:") {
            return parse_id(rest).map(Callback::Providers).ok_or_else(malformed);
        }
        if let Some(rest) = data.strip_prefix("trailer:") {
            return parse_id(rest).map(Callback::Trailer).ok_or_else(malformed);
        }
        if let Some(rest) = data.strip_prefix("fav_add:") {
            return parse_id(rest)
                .map(Callback::FavoriteAdd)
                .ok_or_else(malformed);
        }
        if let Some(rest) = data.strip_prefix("fav_del:") {
            return parse_id(rest)
                .map(Callback::FavoriteRemove)
                .ok_or_else(malformed);
        }
        Err(malformed())
    }
}

fn parse_id(s: &str) -> Option<u64> {
    s.parse().ok()
}

fn parse_id_page(s: &str) -> Option<(u64, u32)> {
    let (id, page) = s.split_once(':')?;
    let page: u32 = page.parse().ok().filter(|&p| p >= 1)?;
    Some((id.parse().ok()?, page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_for_every_kind() {
        let cases = [
            (BrowseKind::Search, 1, "Inception"),
            (BrowseKind::Search, 7, "The Good, the Bad and the Ugly"),
            (BrowseKind::GenreBrowse, 2, "28"),
            (BrowseKind::CountryBrowse, 99, "US"),
        ];
        for (kind, page, payload) in cases {
            let target = NavTarget::new(kind, page, payload);
            let decoded = NavTarget::decode(&target.encode()).unwrap();
            assert_eq!(decoded, target);
        }
    }

    #[test]
    fn payload_with_delimiter_round_trips() {
        let target = NavTarget::new(BrowseKind::Search, 3, "Mission: Impossible");
        let decoded = NavTarget::decode(&target.encode()).unwrap();
        assert_eq!(decoded.payload, "Mission: Impossible");
        assert_eq!(decoded.page, 3);
    }

    #[test]
    fn truncation_is_a_fixed_point() {
        let long: String = "я".repeat(120);
        let target = NavTarget::new(BrowseKind::Search, 1, long);
        assert_eq!(target.payload.chars().count(), MAX_PAYLOAD_CHARS);

        let decoded = NavTarget::decode(&target.encode()).unwrap();
        let reencoded = NavTarget::new(decoded.kind, decoded.page, decoded.payload.clone());
        assert_eq!(reencoded.encode(), target.encode());
        assert_eq!(reencoded.payload, decoded.payload);
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let bad = [
            "pg:s:1",          // missing payload field
            "pg:s:abc:query",  // non-numeric page
            "pg:s:0:query",    // page below one
            "pg:x:1:query",    // unknown browse kind
            "zz:s:1:query",    // wrong prefix
            "",
        ];
        for data in bad {
            assert!(
                matches!(NavTarget::decode(data), Err(BotError::MalformedToken(_))),
                "expected {data:?} to be rejected"
            );
        }
    }

    #[test]
    fn callback_encode_parse_matches() {
        let cases = [
            Callback::Details(603),
            Callback::GenreMenu {
                genre_id: 28,
                page: 1,
            },
            Callback::CountryMenu {
                code: String::from("KR"),
                page: 2,
            },
            Callback::Navigate(NavTarget::new(BrowseKind::GenreBrowse, 2, "28")),
            Callback::Providers(603),
            Callback::Trailer(603),
            Callback::FavoriteAdd(603),
            Callback::FavoriteList,
            Callback::FavoriteRemove(603),
        ];
        for callback in cases {
            assert_eq!(Callback::parse(&callback.encode()).unwrap(), callback);
        }
    }

    #[test]
    fn unknown_callback_prefix_is_malformed() {
        for data in ["play:1", "det:abc", "genre:28", "fav_list:extra"] {
            assert!(matches!(
                Callback::parse(data),
                Err(BotError::MalformedToken(_))
            ));
        }
    }
}
