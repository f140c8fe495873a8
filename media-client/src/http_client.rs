use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, header};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::error::{MediaClientError, MediaClientResult};
use crate::models::{
    AuthResponse, Comment, Identity, MediaItem, MediaPage, NewPost, Post, Rating, RatingSummary,
    UploadGrant,
};

const BLOB_TYPE_HEADER: &str = "x-ms-blob-type";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignupRequestDto<'a> {
    display_name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct LoginRequestDto<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitUploadRequestDto<'a> {
    file_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CommentRequestDto<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct RatingRequestDto {
    value: i64,
}

#[derive(Serialize)]
struct ListMediaQuery {
    page: u32,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorResponseDto {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MeResponseDto {
    user: Identity,
}

#[derive(Debug, Deserialize)]
struct ItemsDto<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatingResponseDto {
    avg_rating: f64,
    rating_count: i64,
}

impl From<RatingResponseDto> for RatingSummary {
    fn from(value: RatingResponseDto) -> Self {
        Self {
            avg_rating: value.avg_rating,
            rating_count: value.rating_count,
        }
    }
}

#[derive(Debug, Clone)]
/// HTTP-клиент для REST API `media-server` и прямых загрузок в хранилище.
pub(crate) struct HttpClient {
    base_url: String,
    client: Client,
}

impl HttpClient {
    /// Создаёт HTTP-клиент с базовым URL сервера.
    pub(crate) fn new(base_url: impl Into<String>) -> MediaClientResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn decode_error(response: reqwest::Response) -> MediaClientError {
        let status = response.status();

        let message = match response.json::<ErrorResponseDto>().await {
            Ok(body) => body.error.unwrap_or_else(|| format!("http status {status}")),
            Err(_) => format!("http status {status}"),
        };
        MediaClientError::from_http_status(status, Some(message))
    }

    /// Отправляет запрос и декодирует JSON-ответ; ошибки сервера превращаются
    /// в [`MediaClientError`].
    async fn execute<TRes>(&self, request: RequestBuilder) -> MediaClientResult<TRes>
    where
        TRes: DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .map_err(MediaClientError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        response
            .json::<TRes>()
            .await
            .map_err(MediaClientError::from_reqwest)
    }

    async fn send_json<TReq, TRes>(
        &self,
        method: Method,
        path: &str,
        body: &TReq,
        token: Option<&str>,
    ) -> MediaClientResult<TRes>
    where
        TReq: Serialize,
        TRes: DeserializeOwned,
    {
        let mut request = self.client.request(method, self.endpoint(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        self.execute(request).await
    }

    async fn get_json<TRes>(&self, path: &str, token: Option<&str>) -> MediaClientResult<TRes>
    where
        TRes: DeserializeOwned,
    {
        let mut request = self.client.get(self.endpoint(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        self.execute(request).await
    }

    pub(crate) async fn signup(
        &self,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> MediaClientResult<AuthResponse> {
        let payload = SignupRequestDto {
            display_name,
            email,
            password,
        };
        self.send_json(Method::POST, "/api/auth/signup", &payload, None)
            .await
    }

    pub(crate) async fn login(&self, email: &str, password: &str) -> MediaClientResult<AuthResponse> {
        let payload = LoginRequestDto { email, password };
        self.send_json(Method::POST, "/api/auth/login", &payload, None)
            .await
    }

    pub(crate) async fn me(&self, token: &str) -> MediaClientResult<Identity> {
        let dto: MeResponseDto = self.get_json("/api/auth/me", Some(token)).await?;
        Ok(dto.user)
    }

    pub(crate) async fn init_upload(
        &self,
        token: &str,
        file_name: &str,
        content_type: Option<&str>,
    ) -> MediaClientResult<UploadGrant> {
        let payload = InitUploadRequestDto {
            file_name,
            content_type,
        };
        self.send_json(
            Method::POST,
            "/api/creator/uploads/init",
            &payload,
            Some(token),
        )
        .await
    }

    /// Загружает байты напрямую в хранилище по `upload_url`, минуя сервер.
    /// Токен сервиса не передаётся: доступ даёт подпись в самом URL.
    pub(crate) async fn put_blob(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> MediaClientResult<()> {
        let response = self
            .client
            .put(upload_url)
            .header(header::CONTENT_TYPE, content_type)
            .header(BLOB_TYPE_HEADER, "BlockBlob")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MediaClientError::Storage {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    pub(crate) async fn create_post(&self, token: &str, post: &NewPost) -> MediaClientResult<Post> {
        self.send_json(Method::POST, "/api/creator/posts", post, Some(token))
            .await
    }

    pub(crate) async fn list_media(&self, page: u32, limit: u32) -> MediaClientResult<MediaPage> {
        let request = self
            .client
            .get(self.endpoint("/api/media"))
            .query(&ListMediaQuery { page, limit });
        self.execute(request).await
    }

    pub(crate) async fn get_media(&self, id: Uuid) -> MediaClientResult<MediaItem> {
        self.get_json(&format!("/api/media/{id}"), None).await
    }

    pub(crate) async fn list_comments(&self, id: Uuid) -> MediaClientResult<Vec<Comment>> {
        let dto: ItemsDto<Comment> = self
            .get_json(&format!("/api/media/{id}/comments"), None)
            .await?;
        Ok(dto.items)
    }

    pub(crate) async fn add_comment(
        &self,
        token: &str,
        id: Uuid,
        text: &str,
    ) -> MediaClientResult<Comment> {
        self.send_json(
            Method::POST,
            &format!("/api/media/{id}/comments"),
            &CommentRequestDto { text },
            Some(token),
        )
        .await
    }

    pub(crate) async fn list_ratings(&self, id: Uuid) -> MediaClientResult<Vec<Rating>> {
        let dto: ItemsDto<Rating> = self
            .get_json(&format!("/api/media/{id}/ratings"), None)
            .await?;
        Ok(dto.items)
    }

    pub(crate) async fn rate(
        &self,
        token: &str,
        id: Uuid,
        value: i64,
    ) -> MediaClientResult<RatingSummary> {
        let dto: RatingResponseDto = self
            .send_json(
                Method::POST,
                &format!("/api/media/{id}/rating"),
                &RatingRequestDto { value },
                Some(token),
            )
            .await?;
        Ok(dto.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_normalizes_slashes() {
        let client = HttpClient::new("http://localhost:8080/").expect("client must build");
        let full = client.endpoint("/api/media");
        assert_eq!(full, "http://localhost:8080/api/media");
    }

    #[test]
    fn signup_payload_uses_camel_case() {
        let payload = SignupRequestDto {
            display_name: "Ana",
            email: "ana@example.com",
            password: "secret1",
        };
        let json = serde_json::to_value(&payload).expect("payload must serialize");
        assert_eq!(json["displayName"], "Ana");
        assert!(json.get("display_name").is_none());
    }

    #[test]
    fn init_upload_payload_omits_missing_content_type() {
        let payload = InitUploadRequestDto {
            file_name: "a.png",
            content_type: None,
        };
        let json = serde_json::to_value(&payload).expect("payload must serialize");
        assert_eq!(json["fileName"], "a.png");
        assert!(json.get("contentType").is_none());
    }

    #[test]
    fn media_item_reads_flattened_post_and_view_urls() {
        let raw = r#"{
            "id": "6f1c1d2e-5b8a-4c1e-9a51-3a2f0a0b1c2d",
            "creatorId": "0d9a8f7e-6c5b-4a39-8271-605f4e3d2c1b",
            "mediaType": "video",
            "mediaUrl": "https://acct.blob.core.windows.net/media/c1/a.mp4",
            "thumbnailUrl": "",
            "title": "Harbour",
            "caption": "",
            "location": "",
            "peoplePresent": [],
            "tags": ["sea"],
            "stats": {"views": 0, "avgRating": 4.5, "ratingCount": 2, "commentCount": 1},
            "createdAt": "2026-03-14T15:09:26Z",
            "updatedAt": "2026-03-14T15:09:26Z",
            "mediaViewUrl": "https://acct.blob.core.windows.net/media/c1/a.mp4?sv=2021-08-06&sig=x",
            "thumbnailViewUrl": ""
        }"#;

        let item: MediaItem = serde_json::from_str(raw).expect("item must deserialize");
        assert_eq!(item.post.title, "Harbour");
        assert_eq!(item.post.stats.rating_count, 2);
        assert!(item.media_view_url.starts_with(&item.post.media_url));
        assert_eq!(item.thumbnail_view_url, "");
    }

    #[test]
    fn rating_response_maps_to_summary() {
        let dto: RatingResponseDto =
            serde_json::from_str(r#"{"ok":true,"avgRating":3.5,"ratingCount":2}"#)
                .expect("response must deserialize");
        let summary = RatingSummary::from(dto);
        assert_eq!(summary.avg_rating, 3.5);
        assert_eq!(summary.rating_count, 2);
    }
}
