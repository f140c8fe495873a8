use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use media_client::{
    AuthResponse, MediaClient, MediaClientError, MediaItem, MediaKind, MediaPage, NewPost, Post,
    Uuid,
};

const TOKEN_FILE: &str = ".media_token";
const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

#[derive(Debug, Parser)]
#[command(name = "media-cli", version, about = "CLI клиент для media-server")]
struct Cli {
    /// Адрес сервера (по умолчанию берётся из MEDIA_SERVER или 127.0.0.1:8080).
    #[arg(long, global = true, env = "MEDIA_SERVER")]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Image,
    Video,
}

impl From<KindArg> for MediaKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Image => MediaKind::Image,
            KindArg::Video => MediaKind::Video,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Регистрация зрителя.
    Signup {
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Вход пользователя.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Показать личность из сохранённого токена.
    Me,
    /// Загрузить файл и опубликовать пост (требует токен автора).
    Upload {
        /// Путь к файлу.
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long, value_enum, default_value_t = KindArg::Image)]
        kind: KindArg,
        /// MIME-тип; если не указан, определяется по расширению.
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long, default_value = "")]
        caption: String,
        #[arg(long, default_value = "")]
        location: String,
        /// Люди в кадре, через запятую.
        #[arg(long, value_delimiter = ',')]
        people: Vec<String>,
        /// Теги, через запятую.
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Список постов.
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Получение поста по id.
    Get {
        #[arg(long)]
        id: Uuid,
    },
    /// Добавить комментарий (требует токен).
    Comment {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        text: String,
    },
    /// Комментарии к посту.
    Comments {
        #[arg(long)]
        id: Uuid,
    },
    /// Поставить или заменить оценку 1..=5 (требует токен).
    Rate {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        value: i64,
    },
    /// Оценки поста.
    Ratings {
        #[arg(long)]
        id: Uuid,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    if let Err(err) = run().await {
        eprintln!("Ошибка: {err}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let server = normalize_server(cli.server.unwrap_or_else(|| DEFAULT_SERVER.to_string()));
    let mut client = MediaClient::new(server).map_err(map_client_error)?;

    if let Some(token) = load_token().context("не удалось прочитать .media_token")? {
        client.set_token(token);
    }

    match cli.command {
        Command::Signup {
            display_name,
            email,
            password,
        } => {
            let auth = client
                .signup(&display_name, &email, &password)
                .await
                .map_err(map_client_error)?;
            persist_token(&client).context("не удалось сохранить токен")?;
            print_auth("Регистрация успешна", &auth);
        }
        Command::Login { email, password } => {
            let auth = client
                .login(&email, &password)
                .await
                .map_err(map_client_error)?;
            persist_token(&client).context("не удалось сохранить токен")?;
            print_auth("Вход выполнен", &auth);
        }
        Command::Me => {
            let me = client.me().await.map_err(map_client_error)?;
            println!("id: {}", me.id);
            println!("display_name: {}", me.display_name);
            println!("email: {}", me.email.as_deref().unwrap_or("-"));
            println!("role: {:?}", me.role);
        }
        Command::Upload {
            file,
            title,
            kind,
            content_type,
            caption,
            location,
            people,
            tags,
        } => {
            let bytes = fs::read(&file)
                .with_context(|| format!("не удалось прочитать файл {}", file.display()))?;
            let file_name = file
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("некорректное имя файла: {}", file.display()))?
                .to_string();
            let content_type = content_type.or_else(|| guess_content_type(&file_name));

            let post = client
                .upload_media(
                    &file_name,
                    content_type.as_deref(),
                    bytes,
                    NewPost {
                        media_type: kind.into(),
                        title,
                        caption,
                        location,
                        people_present: people,
                        tags,
                        ..Default::default()
                    },
                )
                .await
                .map_err(map_client_error)?;
            print_post("Пост опубликован", &post);
        }
        Command::List { page, limit } => {
            let list = client
                .list_media(page, limit)
                .await
                .map_err(map_client_error)?;
            print_list(&list);
        }
        Command::Get { id } => {
            let item = client.get_media(id).await.map_err(map_client_error)?;
            print_item(&item);
        }
        Command::Comment { id, text } => {
            let comment = client
                .add_comment(id, &text)
                .await
                .map_err(map_client_error)?;
            println!("Комментарий добавлен: id={}", comment.id);
        }
        Command::Comments { id } => {
            let comments = client.list_comments(id).await.map_err(map_client_error)?;
            println!("Комментариев: {}", comments.len());
            for comment in &comments {
                println!(
                    "- [{}] {}: {}",
                    comment.created_at, comment.user_display_name, comment.text
                );
            }
        }
        Command::Rate { id, value } => {
            let summary = client.rate(id, value).await.map_err(map_client_error)?;
            println!(
                "Оценка принята: avg_rating={:.2}, rating_count={}",
                summary.avg_rating, summary.rating_count
            );
        }
        Command::Ratings { id } => {
            let ratings = client.list_ratings(id).await.map_err(map_client_error)?;
            println!("Оценок: {}", ratings.len());
            for rating in &ratings {
                println!("- {} ({}): {}", rating.user_display_name, rating.user_id, rating.value);
            }
        }
    }

    Ok(())
}

fn normalize_server(server: String) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        return server;
    }

    format!("http://{server}")
}

fn guess_content_type(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let content_type = match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => return None,
    };
    Some(content_type.to_string())
}

fn parse_token_content(raw: &str) -> Option<String> {
    let token = raw.trim().to_string();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn load_token() -> io::Result<Option<String>> {
    if !Path::new(TOKEN_FILE).exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(TOKEN_FILE)?;
    Ok(parse_token_content(&raw))
}

fn persist_token(client: &MediaClient) -> io::Result<()> {
    if let Some(token) = client.get_token() {
        fs::write(TOKEN_FILE, token)?;
    }
    Ok(())
}

fn map_client_error(err: MediaClientError) -> anyhow::Error {
    let message = match err {
        MediaClientError::Unauthorized => {
            "требуется авторизация: выполните `media-cli login ...` или `media-cli signup ...`"
                .to_string()
        }
        MediaClientError::Forbidden => "недостаточно прав для операции".to_string(),
        MediaClientError::NotFound => "ресурс не найден".to_string(),
        MediaClientError::Conflict(message) => format!("конфликт: {message}"),
        MediaClientError::InvalidRequest(message) => format!("некорректный запрос: {message}"),
        MediaClientError::Server { status, message } => {
            format!("ошибка сервера ({status}): {message}")
        }
        MediaClientError::Storage { status, message } => {
            format!("хранилище отклонило загрузку ({status}): {message}")
        }
        MediaClientError::Http(err) => format!("ошибка HTTP: {err}"),
    };
    anyhow!(message)
}

fn print_auth(title: &str, auth: &AuthResponse) {
    println!("{title}");
    println!("token: {}", auth.token);
    println!("user:");
    println!("  id: {}", auth.user.id);
    println!("  display_name: {}", auth.user.display_name);
    println!("  email: {}", auth.user.email);
    println!("  role: {:?}", auth.user.role);
}

fn print_post(title: &str, post: &Post) {
    println!("{title}");
    println!("id: {}", post.id);
    println!("title: {}", post.title);
    println!("media_type: {:?}", post.media_type);
    println!("media_url: {}", post.media_url);
    println!("creator_id: {}", post.creator_id);
    println!(
        "stats: views={}, avg_rating={:.2}, ratings={}, comments={}",
        post.stats.views, post.stats.avg_rating, post.stats.rating_count, post.stats.comment_count
    );
    println!("created_at: {}", post.created_at);
}

fn print_item(item: &MediaItem) {
    print_post("Пост", &item.post);
    println!("view_url: {}", item.media_view_url);
    if !item.thumbnail_view_url.is_empty() {
        println!("thumbnail_view_url: {}", item.thumbnail_view_url);
    }
}

fn print_list(list: &MediaPage) {
    println!(
        "Постов: {} (page={}, limit={})",
        list.items.len(),
        list.page,
        list.limit
    );

    for item in &list.items {
        println!(
            "- [{}] {} (rating={:.2} x{})",
            item.post.id, item.post.title, item.post.stats.avg_rating, item.post.stats.rating_count
        );
    }
}
