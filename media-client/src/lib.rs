//! Клиентская библиотека для работы с media-server по HTTP.
//!
//! `MediaClient` хранит JWT-токен после `signup`/`login` и автоматически
//! использует его в защищённых операциях. Загрузка медиа идёт в три шага:
//! сервер выдаёт подписанный URL, байты уходят напрямую в хранилище,
//! затем сервер регистрирует метаданные поста (см. [`MediaClient::upload_media`]).
#![warn(missing_docs)]

mod error;
mod http_client;
mod models;

pub use error::{MediaClientError, MediaClientResult};
pub use models::{
    AuthResponse, Comment, Identity, MediaItem, MediaKind, MediaPage, NewPost, Post, PostStats,
    Rating, RatingSummary, Role, UploadGrant, User,
};
pub use uuid::Uuid;

use http_client::HttpClient;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
/// Клиент REST API медиа-сервиса.
pub struct MediaClient {
    http: HttpClient,
    token: Option<String>,
}

impl MediaClient {
    /// Создаёт клиент для сервера с базовым URL, например `http://127.0.0.1:8080`.
    pub fn new(base_url: impl Into<String>) -> MediaClientResult<Self> {
        Ok(Self {
            http: HttpClient::new(base_url)?,
            token: None,
        })
    }

    /// Устанавливает JWT-токен вручную.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Возвращает текущий JWT-токен, если он установлен.
    pub fn get_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Очищает сохранённый JWT-токен.
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Регистрирует зрителя (`consumer`) и сохраняет полученный токен.
    pub async fn signup(
        &mut self,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> MediaClientResult<AuthResponse> {
        let result = self.http.signup(display_name, email, password).await?;
        self.token = Some(result.token.clone());
        Ok(result)
    }

    /// Выполняет вход и сохраняет полученный токен.
    pub async fn login(&mut self, email: &str, password: &str) -> MediaClientResult<AuthResponse> {
        let result = self.http.login(email, password).await?;
        self.token = Some(result.token.clone());
        Ok(result)
    }

    /// Возвращает личность, которую сервер видит в текущем токене.
    pub async fn me(&self) -> MediaClientResult<Identity> {
        self.http.me(self.require_token()?).await
    }

    /// Запрашивает подписанный URL для загрузки одного файла.
    ///
    /// Требует токен автора (`creator`).
    pub async fn init_upload(
        &self,
        file_name: &str,
        content_type: Option<&str>,
    ) -> MediaClientResult<UploadGrant> {
        self.http
            .init_upload(self.require_token()?, file_name, content_type)
            .await
    }

    /// Загружает байты напрямую в хранилище по `upload_url` из [`UploadGrant`].
    ///
    /// `content_type` должен совпадать с тем, что был передан в `init_upload`.
    pub async fn upload_bytes(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> MediaClientResult<()> {
        self.http.put_blob(upload_url, content_type, bytes).await
    }

    /// Регистрирует пост с уже загруженным медиа.
    ///
    /// Требует токен автора (`creator`).
    pub async fn create_post(&self, post: &NewPost) -> MediaClientResult<Post> {
        self.http.create_post(self.require_token()?, post).await
    }

    /// Полный сценарий публикации: подписанный URL, прямая загрузка, регистрация поста.
    ///
    /// Поле `media_url` в `post` заполняется каноническим URL загруженного blob.
    pub async fn upload_media(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
        mut post: NewPost,
    ) -> MediaClientResult<Post> {
        let content_type = effective_content_type(content_type);
        let grant = self.init_upload(file_name, Some(content_type)).await?;
        self.upload_bytes(&grant.upload_url, content_type, bytes).await?;

        post.media_url = grant.blob_url;
        self.create_post(&post).await
    }

    /// Возвращает страницу каталога, новые посты первыми.
    pub async fn list_media(&self, page: u32, limit: u32) -> MediaClientResult<MediaPage> {
        self.http.list_media(page, limit).await
    }

    /// Возвращает пост с временными ссылками на просмотр.
    pub async fn get_media(&self, id: Uuid) -> MediaClientResult<MediaItem> {
        self.http.get_media(id).await
    }

    /// Возвращает комментарии к посту, новые первыми.
    pub async fn list_comments(&self, id: Uuid) -> MediaClientResult<Vec<Comment>> {
        self.http.list_comments(id).await
    }

    /// Добавляет комментарий.
    ///
    /// Требует установленный токен.
    pub async fn add_comment(&self, id: Uuid, text: &str) -> MediaClientResult<Comment> {
        self.http.add_comment(self.require_token()?, id, text).await
    }

    /// Возвращает текущие оценки поста.
    pub async fn list_ratings(&self, id: Uuid) -> MediaClientResult<Vec<Rating>> {
        self.http.list_ratings(id).await
    }

    /// Ставит или заменяет свою оценку (1..=5) и возвращает пересчитанный агрегат.
    ///
    /// Требует установленный токен.
    pub async fn rate(&self, id: Uuid, value: i64) -> MediaClientResult<RatingSummary> {
        self.http.rate(self.require_token()?, id, value).await
    }

    fn require_token(&self) -> MediaClientResult<&str> {
        self.token.as_deref().ok_or(MediaClientError::Unauthorized)
    }
}

/// Тип содержимого, под который сервер подписывает загрузку: обрезанный,
/// пустой заменяется на `application/octet-stream`.
fn effective_content_type(content_type: Option<&str>) -> &str {
    content_type
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}
