use thiserror::Error;

#[derive(Debug, Error)]
/// Ошибки клиентской библиотеки `media-client`.
pub enum MediaClientError {
    /// Ошибка HTTP-транспорта (`reqwest`).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Требуется авторизация (отсутствует/некорректен токен или неверные учётные данные).
    #[error("unauthorized")]
    Unauthorized,

    /// Роль пользователя не разрешает операцию.
    #[error("forbidden")]
    Forbidden,

    /// Запрошенный ресурс не найден.
    #[error("not found")]
    NotFound,

    /// Ресурс уже существует (например, email занят).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Некорректный запрос или ошибка валидации.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Сервер не смог выполнить запрос (5xx).
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP-статус ответа.
        status: u16,
        /// Сообщение сервера.
        message: String,
    },

    /// Хранилище отклонило прямую загрузку.
    #[error("storage upload failed ({status}): {message}")]
    Storage {
        /// HTTP-статус ответа хранилища.
        status: u16,
        /// Тело ответа хранилища.
        message: String,
    },
}

/// Результат операций `media-client`.
pub type MediaClientResult<T> = Result<T, MediaClientError>;

impl MediaClientError {
    pub(crate) fn from_http_status(status: reqwest::StatusCode, message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| format!("http status {status}"));
        match status {
            reqwest::StatusCode::UNAUTHORIZED => Self::Unauthorized,
            reqwest::StatusCode::FORBIDDEN => Self::Forbidden,
            reqwest::StatusCode::NOT_FOUND => Self::NotFound,
            reqwest::StatusCode::CONFLICT => Self::Conflict(message),
            status if status.is_server_error() => Self::Server {
                status: status.as_u16(),
                message,
            },
            _ => Self::InvalidRequest(message),
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_http_status(status, None);
        }
        Self::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::MediaClientError;

    #[test]
    fn statuses_map_to_variants() {
        assert!(matches!(
            MediaClientError::from_http_status(StatusCode::UNAUTHORIZED, None),
            MediaClientError::Unauthorized
        ));
        assert!(matches!(
            MediaClientError::from_http_status(StatusCode::FORBIDDEN, None),
            MediaClientError::Forbidden
        ));
        assert!(matches!(
            MediaClientError::from_http_status(StatusCode::NOT_FOUND, None),
            MediaClientError::NotFound
        ));
        assert!(matches!(
            MediaClientError::from_http_status(StatusCode::CONFLICT, Some("email".into())),
            MediaClientError::Conflict(message) if message == "email"
        ));
        assert!(matches!(
            MediaClientError::from_http_status(StatusCode::SERVICE_UNAVAILABLE, None),
            MediaClientError::Server { status: 503, .. }
        ));
        assert!(matches!(
            MediaClientError::from_http_status(StatusCode::BAD_REQUEST, None),
            MediaClientError::InvalidRequest(_)
        ));
    }
}
