use tracing::warn;

use crate::error::BotError;
use crate::media::{Movie, MovieId};
use crate::nav::Callback;
use crate::telegram::{InlineKeyboardButton, InlineKeyboardMarkup};
use crate::tmdb::{first_trailer, RegionProviders};
use crate::App;

/// Edit the triggering message into a detail card, with the poster as
/// media when one exists and a plain text card otherwise.
pub async fn show_details(
    app: &App,
    chat_id: i64,
    message_id: i64,
    movie_id: MovieId,
) -> Result<(), BotError> {
    let Some(movie) = app.catalog.details(movie_id).await? else {
        app.bot
            .edit_message_text(chat_id, message_id, "Не удалось получить детали.", None, false)
            .await?;
        return Ok(());
    };

    let caption = detail_caption(&movie);
    let keyboard = detail_keyboard(movie_id);

    if let Some(poster_path) = &movie.poster_path {
        let poster_url = app.catalog.poster_url(poster_path);
        match app
            .bot
            .edit_message_media(chat_id, message_id, &poster_url, &caption)
            .await
        {
            Ok(()) => {
                app.bot
                    .edit_message_reply_markup(chat_id, message_id, keyboard)
                    .await?;
                return Ok(());
            }
            Err(err) => {
                // Media edits fail for text-only messages; the text card
                // below still carries everything but the poster.
                warn!(error = %err, movie_id, "poster edit failed, falling back to text");
            }
        }
    }

    app.bot
        .edit_message_text(chat_id, message_id, &caption, Some(keyboard), true)
        .await
}

fn detail_caption(movie: &Movie) -> String {
    let genres = if movie.genres.is_empty() {
        String::from("—")
    } else {
        movie
            .genres
            .iter()
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let overview = if movie.overview.is_empty() {
        "—"
    } else {
        movie.overview.as_str()
    };

    format!(
        "*{}* ({})\n⭐ TMDb: *{}*\n🎭 Genres: _{}_\n\n{}",
        movie.title,
        movie.year(),
        movie.rating(),
        genres,
        overview
    )
}

fn detail_keyboard(movie_id: MovieId) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![InlineKeyboardButton::new(
                "⭐ В избранное",
                Callback::FavoriteAdd(movie_id).encode(),
            )],
            vec![InlineKeyboardButton::new(
                "🟢 Где смотреть?",
                Callback::Providers(movie_id).encode(),
            )],
            vec![InlineKeyboardButton::new(
                "▶ Трейлер",
                Callback::Trailer(movie_id).encode(),
            )],
            vec![InlineKeyboardButton::new(
                "🗂 Мои избранные",
                Callback::FavoriteList.encode(),
            )],
        ],
    }
}

pub async fn send_providers(app: &App, chat_id: i64, movie_id: MovieId) -> Result<(), BotError> {
    let regions = app.catalog.watch_providers(movie_id).await?;

    let region = app.region.as_str();
    let entry = regions
        .get(region)
        .or_else(|| regions.get("US"))
        .or_else(|| regions.get("GB"));

    let Some(entry) = entry else {
        app.bot
            .send_message(
                chat_id,
                "Для твоего региона провайдеры не найдены.",
                None,
                false,
            )
            .await?;
        return Ok(());
    };

    let text = format_providers(region, entry);
    app.bot.send_message(chat_id, &text, None, false).await?;
    Ok(())
}

/// Provider listing grouped per monetization kind, in a fixed order.
fn format_providers(region: &str, entry: &RegionProviders) -> String {
    let mut lines = vec![format!("Где смотреть ({region}):")];

    let groups: [(&str, &[crate::tmdb::Provider]); 5] = [
        ("Подписка", &entry.flatrate),
        ("Аренда", &entry.rent),
        ("Покупка", &entry.buy),
        ("С рекламой", &entry.ads),
        ("Бесплатно", &entry.free),
    ];
    for (label, providers) in groups {
        if providers.is_empty() {
            continue;
        }
        let names = providers
            .iter()
            .map(|p| p.provider_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("• {label}: {names}"));
    }

    if let Some(link) = &entry.link {
        lines.push(format!("\nСписок провайдеров: {link}"));
    }

    lines.join("\n")
}

pub async fn send_trailer(app: &App, chat_id: i64, movie_id: MovieId) -> Result<(), BotError> {
    let videos = app.catalog.videos(movie_id).await?;

    let text = match first_trailer(&videos) {
        Some(video) => {
            let name = if video.name.is_empty() {
                "Trailer"
            } else {
                video.name.as_str()
            };
            format!("▶ {name}\nhttps://www.youtube.com/watch?v={}", video.key)
        }
        None => String::from("Трейлер не найден."),
    };
    app.bot.send_message(chat_id, &text, None, false).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Genre;
    use crate::tmdb::Provider;

    fn provider(name: &str) -> Provider {
        Provider {
            provider_name: name.to_string(),
        }
    }

    #[test]
    fn caption_includes_year_rating_and_genres() {
        let movie = Movie {
            id: 27205,
            title: String::from("Начало"),
            overview: String::from("Кобб — талантливый вор."),
            poster_path: None,
            vote_average: 8.37,
            release_date: Some(String::from("2010-07-15")),
            genres: vec![
                Genre {
                    id: 28,
                    name: String::from("Боевик"),
                },
                Genre {
                    id: 878,
                    name: String::from("Фантастика"),
                },
            ],
        };
        let caption = detail_caption(&movie);
        assert!(caption.starts_with("*Начало* (2010)"));
        assert!(caption.contains("⭐ TMDb: *8.4*"));
        assert!(caption.contains("_Боевик, Фантастика_"));
        assert!(caption.ends_with("Кобб — талантливый вор."));
    }

    #[test]
    fn caption_uses_placeholders_when_fields_missing() {
        let movie = Movie {
            id: 1,
            title: String::from("Untitled"),
            overview: String::new(),
            poster_path: None,
            vote_average: 0.0,
            release_date: None,
            genres: Vec::new(),
        };
        let caption = detail_caption(&movie);
        assert!(caption.contains("(—)"));
        assert!(caption.contains("*—*"));
        assert!(caption.contains("_—_"));
        assert!(caption.ends_with("—"));
    }

    #[test]
    fn providers_grouped_with_link() {
        let entry = RegionProviders {
            link: Some(String::from("https://www.themoviedb.org/movie/27205/watch")),
            flatrate: vec![provider("Netflix")],
            rent: vec![provider("Apple TV"), provider("Google Play")],
            buy: Vec::new(),
            ads: Vec::new(),
            free: Vec::new(),
        };
        let text = format_providers("RU", &entry);
        assert!(text.starts_with("Где смотреть (RU):"));
        assert!(text.contains("• Подписка: Netflix"));
        assert!(text.contains("• Аренда: Apple TV, Google Play"));
        assert!(!text.contains("• Покупка"));
        assert!(text.ends_with("https://www.themoviedb.org/movie/27205/watch"));
    }

    #[test]
    fn detail_keyboard_routes_every_button() {
        let keyboard = detail_keyboard(27205);
        let data: Vec<&str> = keyboard
            .inline_keyboard
            .iter()
            .map(|row| row[0].callback_data.as_str())
            .collect();
        assert_eq!(
            data,
            ["fav_add:27205", "watch:27205", "trailer:27205", "fav_list"]
        );
        for callback_data in data {
            assert!(Callback::parse(callback_data).is_ok());
        }
    }
}
