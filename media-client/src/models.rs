use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Роль пользователя. Иерархии нет: `admin` не включает права `creator`.
pub enum Role {
    /// Зритель: смотрит, комментирует, оценивает.
    Consumer,
    /// Автор: загружает медиа и публикует посты.
    Creator,
    /// Администратор.
    Admin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Тип медиа в посте.
pub enum MediaKind {
    /// Изображение.
    #[default]
    Image,
    /// Видео.
    Video,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Публичная модель пользователя.
pub struct User {
    /// Идентификатор пользователя.
    pub id: Uuid,
    /// Отображаемое имя.
    pub display_name: String,
    /// Email.
    pub email: String,
    /// Роль.
    pub role: Role,
    /// Дата и время создания пользователя (UTC).
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Ответ после успешной регистрации или входа.
pub struct AuthResponse {
    /// JWT access token.
    pub token: String,
    /// Данные пользователя.
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Личность, извлечённая сервером из токена (`/api/auth/me`).
pub struct Identity {
    /// Идентификатор пользователя.
    pub id: Uuid,
    /// Email, если он есть в токене.
    #[serde(default)]
    pub email: Option<String>,
    /// Отображаемое имя.
    pub display_name: String,
    /// Роль.
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Разрешение на прямую загрузку одного blob в хранилище.
pub struct UploadGrant {
    /// Путь blob внутри контейнера.
    pub blob_name: String,
    /// Канонический URL blob без подписи; его передают в `create_post`.
    pub blob_url: String,
    /// URL с подписью для `PUT`, действует 10 минут.
    pub upload_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Метаданные нового поста.
pub struct NewPost {
    /// Тип медиа.
    pub media_type: MediaKind,
    /// Канонический URL медиа.
    pub media_url: String,
    /// Канонический URL превью; пустая строка, если превью нет.
    pub thumbnail_url: String,
    /// Заголовок.
    pub title: String,
    /// Подпись.
    pub caption: String,
    /// Место съёмки.
    pub location: String,
    /// Люди в кадре.
    pub people_present: Vec<String>,
    /// Теги.
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Счётчики поста.
pub struct PostStats {
    /// Просмотры.
    pub views: i64,
    /// Средняя оценка.
    pub avg_rating: f64,
    /// Число оценок.
    pub rating_count: i64,
    /// Число комментариев.
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Публичная модель поста.
pub struct Post {
    /// Идентификатор поста.
    pub id: Uuid,
    /// Идентификатор автора.
    pub creator_id: Uuid,
    /// Тип медиа.
    pub media_type: MediaKind,
    /// Канонический URL медиа (без подписи).
    pub media_url: String,
    /// Канонический URL превью.
    pub thumbnail_url: String,
    /// Заголовок.
    pub title: String,
    /// Подпись.
    pub caption: String,
    /// Место съёмки.
    pub location: String,
    /// Люди в кадре.
    pub people_present: Vec<String>,
    /// Теги.
    pub tags: Vec<String>,
    /// Счётчики.
    pub stats: PostStats,
    /// Дата и время создания (UTC).
    pub created_at: DateTime<Utc>,
    /// Дата и время последнего обновления (UTC).
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Пост в выдаче каталога вместе с временными ссылками на просмотр.
pub struct MediaItem {
    /// Сохранённые поля поста.
    #[serde(flatten)]
    pub post: Post,
    /// Ссылка на медиа с подписью на чтение (60 минут).
    pub media_view_url: String,
    /// Ссылка на превью с подписью на чтение; пустая, если превью нет.
    pub thumbnail_view_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Страница каталога.
pub struct MediaPage {
    /// Номер страницы, начиная с 1.
    pub page: u32,
    /// Размер страницы.
    pub limit: u32,
    /// Посты, новые первыми.
    pub items: Vec<MediaItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Комментарий к посту.
pub struct Comment {
    /// Идентификатор комментария.
    pub id: Uuid,
    /// Идентификатор поста.
    pub post_id: Uuid,
    /// Автор комментария.
    pub user_id: Uuid,
    /// Имя автора на момент комментария.
    pub user_display_name: String,
    /// Текст.
    pub text: String,
    /// Дата и время создания (UTC).
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Текущая оценка одного пользователя.
pub struct Rating {
    /// Автор оценки.
    pub user_id: Uuid,
    /// Имя автора на момент оценки.
    pub user_display_name: String,
    /// Значение от 1 до 5.
    pub value: u8,
    /// Дата и время первой оценки (UTC).
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Агрегат оценок поста после пересчёта.
pub struct RatingSummary {
    /// Средняя оценка.
    pub avg_rating: f64,
    /// Число оценок.
    pub rating_count: i64,
}
