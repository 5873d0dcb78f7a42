use tracing::{debug, warn};

use crate::detail_handlers;
use crate::error::BotError;
use crate::favorites::AddOutcome;
use crate::media::{Movie, MoviePage, PAGE_SIZE};
use crate::nav::{BrowseKind, Callback, NavTarget};
use crate::telegram::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, Message, ReplyKeyboardMarkup,
    ReplyMarkup, Update,
};
use crate::App;

const SEARCH_CAPTION: &str = "🔎 Поиск";
const GENRE_CAPTION: &str = "🎭 Жанр";
const COUNTRY_CAPTION: &str = "🌍 Страна";

/// How many entry buttons a rendered page carries at most.
const MAX_ENTRY_BUTTONS: usize = 10;

/// How many favorites the list view shows.
const MAX_FAVORITES_SHOWN: usize = 20;

const GENRE_MENU_COLUMNS: usize = 3;
const GENRE_MENU_LIMIT: usize = 30;
const COUNTRY_MENU_COLUMNS: usize = 2;

const COUNTRIES: [(&str, &str); 13] = [
    ("US", "USA"),
    ("GB", "United Kingdom"),
    ("RU", "Russia"),
    ("UZ", "Uzbekistan"),
    ("FR", "France"),
    ("DE", "Germany"),
    ("ES", "Spain"),
    ("IT", "Italy"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
    ("IN", "India"),
    ("CN", "China"),
    ("CA", "Canada"),
];

pub fn main_keyboard() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup {
        keyboard: vec![vec![
            KeyboardButton {
                text: String::from(SEARCH_CAPTION),
            },
            KeyboardButton {
                text: String::from(GENRE_CAPTION),
            },
            KeyboardButton {
                text: String::from(COUNTRY_CAPTION),
            },
        ]],
        resize_keyboard: true,
    }
}

/// Top-level entry for one inbound update. Every failure is converted to a
/// reply; nothing here may take the poll loop down.
pub async fn handle_update(app: &App, update: Update) {
    let reply_chat = update
        .message
        .as_ref()
        .map(|m| m.chat.id)
        .or_else(|| {
            update
                .callback_query
                .as_ref()
                .and_then(|q| q.message.as_ref())
                .map(|m| m.chat.id)
        });

    if let Err(err) = dispatch(app, update).await {
        warn!(error = %err, "handler failed");
        let user_text = match err {
            BotError::MalformedToken(_) => "Неизвестный запрос.",
            BotError::NotFound { .. } => "Ничего не найдено.",
            _ => "Что-то пошло не так. Попробуй ещё раз.",
        };
        if let Some(chat_id) = reply_chat {
            if let Err(err) = app.bot.send_message(chat_id, user_text, None, false).await {
                warn!(error = %err, "failed to deliver error reply");
            }
        }
    }
}

async fn dispatch(app: &App, update: Update) -> Result<(), BotError> {
    if let Some(message) = update.message {
        if let Some(text) = message.text.clone() {
            debug!(chat = message.chat.id, "text message");
            return handle_text(app, &message, text.trim()).await;
        }
        return Ok(());
    }

    if let Some(query) = update.callback_query {
        // Answer first so the client spinner never hangs on a slow handler.
        if let Err(err) = app.bot.answer_callback_query(&query.id, None).await {
            warn!(error = %err, "answerCallbackQuery failed");
        }

        let data = query.data.as_deref().unwrap_or_default();
        debug!(data, "callback pressed");
        let callback = Callback::parse(data)?;
        let Some(message) = query.message else {
            return Ok(());
        };
        return handle_callback(app, callback, &message, query.from.id).await;
    }

    Ok(())
}

async fn handle_text(app: &App, message: &Message, text: &str) -> Result<(), BotError> {
    let chat_id = message.chat.id;
    let user_id = message.from.as_ref().map(|u| u.id).unwrap_or(chat_id);

    match text {
        "/start" => {
            if let Err(err) = app.genres.warm(&app.catalog).await {
                warn!(error = %err, "genre cache warm failed");
            }
            app.bot
                .send_message(
                    chat_id,
                    "Привет! Я бот-поисковик фильмов TMDb. Пиши название или выбери кнопку.",
                    Some(ReplyMarkup::Keyboard(main_keyboard())),
                    false,
                )
                .await?;
            Ok(())
        }
        "/favorites" => send_favorites(app, user_id, chat_id).await,
        SEARCH_CAPTION => {
            app.bot
                .send_message(
                    chat_id,
                    "Введи название фильма:",
                    Some(ReplyMarkup::Keyboard(main_keyboard())),
                    false,
                )
                .await?;
            Ok(())
        }
        GENRE_CAPTION => send_genre_menu(app, chat_id).await,
        COUNTRY_CAPTION => send_country_menu(app, chat_id).await,
        query => run_search(app, chat_id, query).await,
    }
}

async fn handle_callback(
    app: &App,
    callback: Callback,
    message: &Message,
    user_id: i64,
) -> Result<(), BotError> {
    let chat_id = message.chat.id;
    let message_id = message.message_id;

    match callback {
        Callback::Details(movie_id) => {
            detail_handlers::show_details(app, chat_id, message_id, movie_id).await
        }
        Callback::GenreMenu { genre_id, page } => {
            let target = NavTarget::new(BrowseKind::GenreBrowse, page, genre_id.to_string());
            show_page(app, chat_id, message_id, &target).await
        }
        Callback::CountryMenu { code, page } => {
            let target = NavTarget::new(BrowseKind::CountryBrowse, page, code);
            show_page(app, chat_id, message_id, &target).await
        }
        Callback::Navigate(target) => show_page(app, chat_id, message_id, &target).await,
        Callback::Providers(movie_id) => {
            detail_handlers::send_providers(app, chat_id, movie_id).await
        }
        Callback::Trailer(movie_id) => detail_handlers::send_trailer(app, chat_id, movie_id).await,
        Callback::FavoriteAdd(movie_id) => add_favorite(app, user_id, chat_id, movie_id).await,
        Callback::FavoriteList => send_favorites(app, user_id, chat_id).await,
        Callback::FavoriteRemove(movie_id) => {
            remove_favorite(app, user_id, chat_id, message_id, movie_id).await
        }
    }
}

// ===== Paginated result rendering =====

/// Build the text and keyboard for one result page. Pure; `None` means the
/// page came back empty and the caller should reply "nothing found".
pub fn render_page_view(
    target: &NavTarget,
    title_line: &str,
    page_data: &MoviePage,
) -> Option<(String, InlineKeyboardMarkup)> {
    if page_data.results.is_empty() {
        return None;
    }

    let mut rows = entry_rows(&page_data.results);
    let nav = nav_row(target, page_data);
    if !nav.is_empty() {
        rows.push(nav);
    }

    let header = format!(
        "{title_line}\n_(страница {} из {})_",
        target.page, page_data.total_pages
    );
    Some((header, InlineKeyboardMarkup {
        inline_keyboard: rows,
    }))
}

fn entry_rows(movies: &[Movie]) -> Vec<Vec<InlineKeyboardButton>> {
    movies
        .iter()
        .take(MAX_ENTRY_BUTTONS)
        .map(|movie| {
            vec![InlineKeyboardButton::new(
                format!("Подробнее: {}", movie.title),
                Callback::Details(movie.id).encode(),
            )]
        })
        .collect()
}

fn nav_row(target: &NavTarget, page_data: &MoviePage) -> Vec<InlineKeyboardButton> {
    let mut row = Vec::new();
    if target.page > 1 {
        row.push(InlineKeyboardButton::new(
            "◀ Пред",
            Callback::Navigate(target.turned_to(target.page - 1)).encode(),
        ));
    }
    // The remote's total_pages undercounts on large result sets; a full
    // page is treated as evidence of a next page regardless.
    if target.page < page_data.total_pages || page_data.results.len() == PAGE_SIZE {
        row.push(InlineKeyboardButton::new(
            "▶ След",
            Callback::Navigate(target.turned_to(target.page + 1)).encode(),
        ));
    }
    row
}

fn title_line(app: &App, target: &NavTarget) -> String {
    match target.kind {
        BrowseKind::Search => format!("🔎 Поиск: *{}*", target.payload),
        BrowseKind::GenreBrowse => {
            let name = match target.payload.parse::<u64>() {
                Ok(genre_id) => app.genres.lookup(genre_id),
                Err(_) => target.payload.clone(),
            };
            format!("🎭 Жанр: *{name}*")
        }
        BrowseKind::CountryBrowse => format!("🌍 Страна: *{}*", target.payload),
    }
}

async fn fetch_page(app: &App, target: &NavTarget) -> Result<MoviePage, BotError> {
    match target.kind {
        BrowseKind::Search => app.catalog.search(&target.payload, target.page).await,
        BrowseKind::GenreBrowse => {
            let genre_id = target
                .payload
                .parse::<u64>()
                .map_err(|_| BotError::MalformedToken(target.encode()))?;
            app.catalog.discover_by_genre(genre_id, target.page).await
        }
        BrowseKind::CountryBrowse => {
            app.catalog
                .discover_by_country(&target.payload, target.page)
                .await
        }
    }
}

/// Fetch one page and edit the triggering message into the rendered view.
async fn show_page(
    app: &App,
    chat_id: i64,
    message_id: i64,
    target: &NavTarget,
) -> Result<(), BotError> {
    let page_data = fetch_page(app, target).await?;
    let title = title_line(app, target);

    match render_page_view(target, &title, &page_data) {
        Some((text, keyboard)) => {
            app.bot
                .edit_message_text(chat_id, message_id, &text, Some(keyboard), true)
                .await
        }
        None => {
            app.bot
                .edit_message_text(chat_id, message_id, "Ничего не найдено.", None, false)
                .await
        }
    }
}

/// A fresh text search: placeholder message first, then edited in place
/// with page 1 of the results.
async fn run_search(app: &App, chat_id: i64, query: &str) -> Result<(), BotError> {
    let placeholder = app.bot.send_message(chat_id, "🔎 Ищу…", None, false).await?;

    let target = NavTarget::new(BrowseKind::Search, 1, query);
    let page_data = fetch_page(app, &target).await?;
    let title = format!("Результаты по: *{query}*");

    match render_page_view(&target, &title, &page_data) {
        Some((text, keyboard)) => {
            app.bot
                .edit_message_text(chat_id, placeholder.message_id, &text, Some(keyboard), true)
                .await
        }
        None => {
            app.bot
                .edit_message_text(
                    chat_id,
                    placeholder.message_id,
                    "Ничего не нашёл. Попробуй другое название.",
                    None,
                    false,
                )
                .await
        }
    }
}

// ===== Menus =====

async fn send_genre_menu(app: &App, chat_id: i64) -> Result<(), BotError> {
    app.genres.warm(&app.catalog).await?;

    let buttons: Vec<InlineKeyboardButton> = app
        .genres
        .entries()
        .into_iter()
        .take(GENRE_MENU_LIMIT)
        .map(|(genre_id, name)| {
            InlineKeyboardButton::new(name, Callback::GenreMenu { genre_id, page: 1 }.encode())
        })
        .collect();

    let markup = InlineKeyboardMarkup {
        inline_keyboard: into_rows(buttons, GENRE_MENU_COLUMNS),
    };
    app.bot
        .send_message(
            chat_id,
            "Выбери жанр:",
            Some(ReplyMarkup::Inline(markup)),
            false,
        )
        .await?;
    Ok(())
}

async fn send_country_menu(app: &App, chat_id: i64) -> Result<(), BotError> {
    let buttons: Vec<InlineKeyboardButton> = COUNTRIES
        .iter()
        .map(|&(code, label)| {
            InlineKeyboardButton::new(
                label,
                Callback::CountryMenu {
                    code: code.to_string(),
                    page: 1,
                }
                .encode(),
            )
        })
        .collect();

    let markup = InlineKeyboardMarkup {
        inline_keyboard: into_rows(buttons, COUNTRY_MENU_COLUMNS),
    };
    app.bot
        .send_message(
            chat_id,
            "Выбери страну:",
            Some(ReplyMarkup::Inline(markup)),
            false,
        )
        .await?;
    Ok(())
}

fn into_rows(buttons: Vec<InlineKeyboardButton>, columns: usize) -> Vec<Vec<InlineKeyboardButton>> {
    let mut rows = Vec::new();
    let mut row = Vec::with_capacity(columns);
    for button in buttons {
        row.push(button);
        if row.len() == columns {
            rows.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }
    rows
}

// ===== Favorites =====

async fn add_favorite(app: &App, user_id: i64, chat_id: i64, movie_id: u64) -> Result<(), BotError> {
    let Some(movie) = app.catalog.details(movie_id).await? else {
        app.bot
            .send_message(chat_id, "Не удалось получить данные фильма.", None, false)
            .await?;
        return Ok(());
    };

    let outcome = app
        .favorites
        .add(user_id, movie_id, &movie.title, &movie.year())
        .await?;
    let reply = match outcome {
        AddOutcome::Inserted => format!("✔ Добавлено в избранное: {}", movie.title),
        AddOutcome::AlreadyExists => String::from("Уже в избранном."),
    };
    app.bot.send_message(chat_id, &reply, None, false).await?;
    Ok(())
}

async fn send_favorites(app: &App, user_id: i64, chat_id: i64) -> Result<(), BotError> {
    let favorites = app.favorites.list(user_id).await?;
    if favorites.is_empty() {
        app.bot
            .send_message(
                chat_id,
                "Пока пусто. Нажимай ⭐ под фильмом, чтобы добавить.",
                None,
                false,
            )
            .await?;
        return Ok(());
    }

    let rows: Vec<Vec<InlineKeyboardButton>> = favorites
        .into_iter()
        .take(MAX_FAVORITES_SHOWN)
        .map(|(movie_id, title)| {
            vec![
                InlineKeyboardButton::new(
                    format!("ℹ {title}"),
                    Callback::Details(movie_id).encode(),
                ),
                InlineKeyboardButton::new("✖", Callback::FavoriteRemove(movie_id).encode()),
            ]
        })
        .collect();

    app.bot
        .send_message(
            chat_id,
            "🗂 Твои избранные:",
            Some(ReplyMarkup::Inline(InlineKeyboardMarkup {
                inline_keyboard: rows,
            })),
            false,
        )
        .await?;
    Ok(())
}

async fn remove_favorite(
    app: &App,
    user_id: i64,
    chat_id: i64,
    message_id: i64,
    movie_id: u64,
) -> Result<(), BotError> {
    let removed = app.favorites.remove(user_id, movie_id).await?;
    if removed > 0 {
        app.bot
            .edit_message_text(
                chat_id,
                message_id,
                "Удалено. Открой /favorites снова, чтобы обновить список.",
                None,
                false,
            )
            .await?;
    } else {
        app.bot
            .send_message(chat_id, "Не найдено в избранном.", None, false)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Genre;

    fn movie(id: u64, title: &str) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            overview: String::new(),
            poster_path: None,
            vote_average: 0.0,
            release_date: None,
            genres: Vec::<Genre>::new(),
        }
    }

    fn page_of(count: usize, total_pages: u32) -> MoviePage {
        MoviePage {
            results: (0..count as u64)
                .map(|i| movie(i + 1, &format!("Movie {}", i + 1)))
                .collect(),
            total_pages,
        }
    }

    fn decode_nav(button: &InlineKeyboardButton) -> NavTarget {
        NavTarget::decode(&button.callback_data).unwrap()
    }

    #[test]
    fn empty_page_renders_nothing() {
        let target = NavTarget::new(BrowseKind::Search, 1, "nothing");
        assert!(render_page_view(&target, "x", &page_of(0, 1)).is_none());
    }

    #[test]
    fn search_page_one_of_one_has_no_nav_row() {
        let target = NavTarget::new(BrowseKind::Search, 1, "Inception");
        let (text, keyboard) =
            render_page_view(&target, "Результаты по: *Inception*", &page_of(3, 1)).unwrap();

        assert!(text.starts_with("Результаты по: *Inception*"));
        assert!(text.contains("страница 1 из 1"));
        assert_eq!(keyboard.inline_keyboard.len(), 3);
        for row in &keyboard.inline_keyboard {
            assert_eq!(row.len(), 1);
            assert!(row[0].callback_data.starts_with("det:"));
        }
    }

    #[test]
    fn genre_browse_next_token_advances_page() {
        let target = NavTarget::new(BrowseKind::GenreBrowse, 1, "28");
        let (_, keyboard) = render_page_view(&target, "🎭 Жанр: *Боевик*", &page_of(20, 5)).unwrap();

        let nav = keyboard.inline_keyboard.last().unwrap();
        assert_eq!(nav.len(), 1); // page 1: no prev
        let next = decode_nav(&nav[0]);
        assert_eq!(
            next,
            NavTarget::new(BrowseKind::GenreBrowse, 2, "28")
        );
    }

    #[test]
    fn next_shown_for_full_page_despite_total_pages() {
        // The remote claims one page but returned a full batch; the full
        // batch wins and a next button is still offered.
        let target = NavTarget::new(BrowseKind::Search, 1, "popular");
        let (_, keyboard) = render_page_view(&target, "x", &page_of(20, 1)).unwrap();

        let nav = keyboard.inline_keyboard.last().unwrap();
        assert_eq!(decode_nav(&nav[0]).page, 2);
    }

    #[test]
    fn no_next_on_final_partial_page() {
        let target = NavTarget::new(BrowseKind::Search, 3, "q");
        let (_, keyboard) = render_page_view(&target, "x", &page_of(5, 3)).unwrap();

        let nav = keyboard.inline_keyboard.last().unwrap();
        assert_eq!(nav.len(), 1); // prev only
        assert_eq!(decode_nav(&nav[0]).page, 2);
    }

    #[test]
    fn prev_and_next_on_middle_page() {
        let target = NavTarget::new(BrowseKind::CountryBrowse, 2, "KR");
        let (text, keyboard) = render_page_view(&target, "🌍 Страна: *KR*", &page_of(20, 4)).unwrap();

        assert!(text.contains("страница 2 из 4"));
        let nav = keyboard.inline_keyboard.last().unwrap();
        assert_eq!(nav.len(), 2);
        assert_eq!(decode_nav(&nav[0]).page, 1);
        assert_eq!(decode_nav(&nav[1]).page, 3);
        assert_eq!(decode_nav(&nav[1]).payload, "KR");
    }

    #[test]
    fn entry_buttons_capped_at_ten() {
        let target = NavTarget::new(BrowseKind::Search, 1, "q");
        let (_, keyboard) = render_page_view(&target, "x", &page_of(20, 2)).unwrap();

        // 10 entry rows plus the nav row appended last.
        assert_eq!(keyboard.inline_keyboard.len(), 11);
        assert!(keyboard.inline_keyboard[9][0].callback_data.starts_with("det:"));
        assert!(keyboard.inline_keyboard[10][0]
            .callback_data
            .starts_with("pg:"));
    }

    #[test]
    fn menu_rows_are_chunked() {
        let buttons: Vec<InlineKeyboardButton> = (0..7)
            .map(|i| InlineKeyboardButton::new(i.to_string(), "fav_list"))
            .collect();
        let rows = into_rows(buttons, 3);
        let widths: Vec<usize> = rows.iter().map(|r| r.len()).collect();
        assert_eq!(widths, [3, 3, 1]);
    }
}
