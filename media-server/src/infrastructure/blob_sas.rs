use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;
use url::form_urlencoded;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const SAS_VERSION: &str = "2021-08-06";
const CLOCK_SKEW_SECONDS: i64 = 60;
const UPLOAD_TTL_MINUTES: i64 = 10;
const READ_TTL_MINUTES: i64 = 60;
const MAX_FILE_NAME_CHARS: usize = 80;
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const NAME_NONCE_CHARS: usize = 8;

#[derive(Debug, Error)]
pub(crate) enum DelegationError {
    #[error("blob storage credentials are not configured")]
    NotConfigured,

    #[error("storage account key is not valid base64")]
    InvalidAccountKey(#[source] base64::DecodeError),

    #[error("invalid storage endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("content type contains control characters")]
    InvalidContentType,

    #[error("capability signing failed: {0}")]
    Signing(String),
}

/// Shared-key credentials of one storage account and container.
pub(crate) struct StorageCredentials {
    account: String,
    key: Vec<u8>,
    container: String,
    endpoint: Url,
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("account", &self.account)
            .field("key", &"<redacted>")
            .field("container", &self.container)
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

impl StorageCredentials {
    /// `endpoint` defaults to `https://<account>.blob.core.windows.net`; pass
    /// an explicit one for emulators such as Azurite.
    pub(crate) fn new(
        account: &str,
        account_key: &str,
        container: &str,
        endpoint: Option<&str>,
    ) -> Result<Self, DelegationError> {
        let account = account.trim();
        let container = container.trim();
        if account.is_empty() || account_key.trim().is_empty() || container.is_empty() {
            return Err(DelegationError::NotConfigured);
        }

        let key = BASE64
            .decode(account_key.trim())
            .map_err(DelegationError::InvalidAccountKey)?;

        let endpoint = match endpoint.map(str::trim).filter(|e| !e.is_empty()) {
            Some(raw) => raw.to_string(),
            None => format!("https://{account}.blob.core.windows.net"),
        };
        let endpoint = Url::parse(&endpoint)
            .map_err(|err| DelegationError::InvalidEndpoint(format!("{endpoint}: {err}")))?;
        if endpoint.host_str().is_none() {
            return Err(DelegationError::InvalidEndpoint(endpoint.to_string()));
        }

        Ok(Self {
            account: account.to_string(),
            key,
            container: container.to_string(),
            endpoint,
        })
    }

    pub(crate) fn container_url(&self) -> String {
        format!(
            "{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            self.container
        )
    }

    fn blob_url(&self, blob_name: &str) -> String {
        format!("{}/{}", self.container_url(), blob_name)
    }

    /// Blob name of `location` when it points into this account's container.
    fn owned_blob_name(&self, location: &Url) -> Option<String> {
        if location.host_str() != self.endpoint.host_str()
            || location.port_or_known_default() != self.endpoint.port_or_known_default()
            || location.query().is_some()
        {
            return None;
        }

        let prefix = format!(
            "{}/{}/",
            self.endpoint.path().trim_end_matches('/'),
            self.container
        );
        let encoded = location.path().strip_prefix(&prefix)?;
        if encoded.is_empty() {
            return None;
        }
        urlencoding::decode(encoded).ok().map(|name| name.into_owned())
    }

    fn sign(&self, blob_name: &str, grant: &SasGrant<'_>) -> Result<String, DelegationError> {
        let start = format_sas_time(grant.starts_on);
        let expiry = format_sas_time(grant.expires_on);
        let canonical_resource = format!("/blob/{}/{}/{}", self.account, self.container, blob_name);
        let content_type = grant.content_type.unwrap_or_default();

        let string_to_sign = [
            grant.permissions,
            start.as_str(),
            expiry.as_str(),
            canonical_resource.as_str(),
            "", // signed identifier
            "", // signed ip
            "", // signed protocol
            SAS_VERSION,
            "b", // signed resource
            "", // snapshot time
            "", // encryption scope
            "", // cache-control
            "", // content-disposition
            "", // content-encoding
            "", // content-language
            content_type,
        ]
        .join("\n");

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|err| DelegationError::Signing(err.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("sv", SAS_VERSION)
            .append_pair("st", &start)
            .append_pair("se", &expiry)
            .append_pair("sr", "b")
            .append_pair("sp", grant.permissions);
        if let Some(content_type) = grant.content_type {
            query.append_pair("rsct", content_type);
        }
        query.append_pair("sig", &signature);

        Ok(query.finish())
    }
}

struct SasGrant<'a> {
    permissions: &'a str,
    starts_on: DateTime<Utc>,
    expires_on: DateTime<Utc>,
    content_type: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UploadGrant {
    pub(crate) blob_name: String,
    pub(crate) blob_url: String,
    /// `blob_url` plus a create+write capability.
    pub(crate) upload_url: String,
}

/// Mints resource-scoped, time-boxed storage capabilities so media bytes go
/// straight from the client to storage.
#[derive(Debug)]
pub(crate) struct BlobDelegator {
    credentials: Option<StorageCredentials>,
}

impl BlobDelegator {
    pub(crate) fn new(credentials: Option<StorageCredentials>) -> Self {
        Self { credentials }
    }

    fn credentials(&self) -> Result<&StorageCredentials, DelegationError> {
        self.credentials
            .as_ref()
            .ok_or(DelegationError::NotConfigured)
    }

    pub(crate) fn delegate_upload(
        &self,
        owner_id: &str,
        file_name: &str,
        content_type: Option<&str>,
    ) -> Result<UploadGrant, DelegationError> {
        self.delegate_upload_at(owner_id, file_name, content_type, Utc::now())
    }

    fn delegate_upload_at(
        &self,
        owner_id: &str,
        file_name: &str,
        content_type: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<UploadGrant, DelegationError> {
        let credentials = self.credentials()?;

        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);
        if content_type.chars().any(char::is_control) {
            return Err(DelegationError::InvalidContentType);
        }

        let nonce = Uuid::new_v4().simple().to_string();
        let blob_name = blob_name_for(owner_id, file_name, now, &nonce[..NAME_NONCE_CHARS]);
        let grant = SasGrant {
            permissions: "cw",
            starts_on: now - Duration::seconds(CLOCK_SKEW_SECONDS),
            expires_on: now + Duration::minutes(UPLOAD_TTL_MINUTES),
            content_type: Some(content_type),
        };
        let sas = credentials.sign(&blob_name, &grant)?;
        let blob_url = credentials.blob_url(&blob_name);

        debug!(blob_name = %blob_name, expires_on = %grant.expires_on, "upload capability minted");

        Ok(UploadGrant {
            upload_url: format!("{blob_url}?{sas}"),
            blob_url,
            blob_name,
        })
    }

    /// False only when `location` points into the container but outside the
    /// `<owner_id>/` prefix.
    pub(crate) fn is_owned_by(&self, location: &str, owner_id: &str) -> Result<bool, DelegationError> {
        let credentials = self.credentials()?;
        let Ok(location) = Url::parse(location) else {
            return Ok(true);
        };
        let Some(blob_name) = credentials.owned_blob_name(&location) else {
            return Ok(true);
        };

        let prefix = format!("{}/", sanitize_segment(owner_id));
        Ok(blob_name.starts_with(&prefix)
            && !blob_name.split('/').any(|segment| segment == ".." || segment == "."))
    }

    /// Rewrites a stored canonical location into a short-lived read URL.
    ///
    /// Locations outside the configured account/container come back
    /// unchanged, and so does anything that cannot be parsed or signed.
    /// Only missing configuration is reported as an error.
    pub(crate) fn delegate_read(&self, stored_location: &str) -> Result<String, DelegationError> {
        self.delegate_read_at(stored_location, Utc::now())
    }

    fn delegate_read_at(
        &self,
        stored_location: &str,
        now: DateTime<Utc>,
    ) -> Result<String, DelegationError> {
        if stored_location.is_empty() {
            return Ok(String::new());
        }
        let credentials = self.credentials()?;

        let location = match Url::parse(stored_location) {
            Ok(location) => location,
            Err(err) => {
                warn!(error = %err, "stored media location is not a URL; returning it unsigned");
                return Ok(stored_location.to_string());
            }
        };

        let Some(blob_name) = credentials.owned_blob_name(&location) else {
            return Ok(stored_location.to_string());
        };

        let grant = SasGrant {
            permissions: "r",
            starts_on: now - Duration::seconds(CLOCK_SKEW_SECONDS),
            expires_on: now + Duration::minutes(READ_TTL_MINUTES),
            content_type: None,
        };
        match credentials.sign(&blob_name, &grant) {
            Ok(sas) => Ok(match stored_location.split_once('#') {
                Some((base, fragment)) => format!("{base}?{sas}#{fragment}"),
                None => format!("{stored_location}?{sas}"),
            }),
            Err(err) => {
                warn!(error = %err, blob_name = %blob_name, "read capability not minted; returning location unsigned");
                Ok(stored_location.to_string())
            }
        }
    }
}

/// `<owner>/<timestamp>-<nonce>_<stem>.<ext>`, every segment restricted to
/// `[A-Za-z0-9_.-]` so the path stays inside the owner's prefix.
pub(crate) fn blob_name_for(
    owner_id: &str,
    file_name: &str,
    now: DateTime<Utc>,
    nonce: &str,
) -> String {
    let file_name = if file_name.trim().is_empty() {
        "upload"
    } else {
        file_name.trim()
    };
    let mut safe = sanitize_segment(file_name);
    safe.truncate(MAX_FILE_NAME_CHARS);

    let (stem, ext) = match safe.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => (stem, ext.to_ascii_lowercase()),
        _ => (safe.as_str(), "bin".to_string()),
    };
    let stem = stem.trim_matches('.');

    let owner = sanitize_segment(owner_id);
    let stamp = format!(
        "{}-{}",
        now.format("%Y-%m-%dT%H-%M-%S-%3fZ"),
        sanitize_segment(nonce)
    );

    if stem.is_empty() {
        format!("{owner}/{stamp}.{ext}")
    } else {
        format!("{owner}/{stamp}_{stem}.{ext}")
    }
}

/// Replaces each run of characters outside `[A-Za-z0-9_.-]` with one `_`.
fn sanitize_segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_run = false;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-') {
            out.push(ch);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}

fn format_sas_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use url::Url;

    use super::{BlobDelegator, DelegationError, StorageCredentials, blob_name_for, sanitize_segment};

    const ACCOUNT_KEY: &str = "c2VjcmV0LXN0b3JhZ2Uta2V5LWZvci10ZXN0cw==";

    fn delegator() -> BlobDelegator {
        let credentials = StorageCredentials::new("acct", ACCOUNT_KEY, "media", None)
            .expect("credentials must be valid");
        BlobDelegator::new(Some(credentials))
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26)
            .single()
            .expect("valid timestamp")
    }

    fn query_of(url: &str) -> HashMap<String, String> {
        Url::parse(url)
            .expect("must be a URL")
            .query_pairs()
            .into_owned()
            .collect()
    }

    fn expected_signature(string_to_sign: &str) -> String {
        let key = BASE64.decode(ACCOUNT_KEY).expect("valid base64");
        let mut mac = Hmac::<Sha256>::new_from_slice(&key).expect("any key length");
        mac.update(string_to_sign.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn sanitize_collapses_runs_of_unsafe_characters() {
        assert_eq!(sanitize_segment("My Photo.JPG"), "My_Photo.JPG");
        assert_eq!(sanitize_segment("a  /../ b"), "a_.._b");
        assert_eq!(sanitize_segment("ok-name_1.png"), "ok-name_1.png");
    }

    #[test]
    fn blob_name_is_partitioned_by_owner_and_sanitized() {
        let name = blob_name_for("c1", "My Photo.JPG", fixed_now(), "0a1b2c3d");

        assert!(name.starts_with("c1/"));
        assert!(!name.contains(' '));
        assert!(name.ends_with(".jpg"));
        assert_ne!(name, "My Photo.JPG");
        assert_eq!(name, "c1/2026-03-14T15-09-26-000Z-0a1b2c3d_My_Photo.jpg");
    }

    #[test]
    fn blob_name_defaults_extension_to_bin() {
        let name = blob_name_for("c1", "README", fixed_now(), "0a1b2c3d");
        assert_eq!(name, "c1/2026-03-14T15-09-26-000Z-0a1b2c3d_README.bin");

        let empty = blob_name_for("c1", "   ", fixed_now(), "0a1b2c3d");
        assert_eq!(empty, "c1/2026-03-14T15-09-26-000Z-0a1b2c3d_upload.bin");
    }

    #[test]
    fn blob_name_cannot_escape_owner_prefix() {
        let name = blob_name_for("../c2", "../../etc/passwd", fixed_now(), "../x");
        let mut segments = name.split('/');
        assert_eq!(segments.next(), Some(".._c2"));
        assert!(segments.next().is_some());
        assert!(segments.next().is_none());
    }

    #[test]
    fn blob_name_truncates_long_file_names() {
        let long = format!("{}.png", "a".repeat(200));
        let name = blob_name_for("c1", &long, fixed_now(), "0a1b2c3d");
        let file_part = name.rsplit('/').next().expect("has file part");
        assert!(file_part.len() <= "2026-03-14T15-09-26-000Z-0a1b2c3d_".len() + 80 + ".bin".len());
    }

    #[test]
    fn upload_grant_is_create_write_for_ten_minutes() {
        let now = fixed_now();
        let grant = delegator()
            .delegate_upload_at("c1", "My Photo.JPG", Some("image/jpeg"), now)
            .expect("upload must be delegated");

        assert_eq!(
            grant.blob_url,
            format!("https://acct.blob.core.windows.net/media/{}", grant.blob_name)
        );
        assert!(grant.upload_url.starts_with(&format!("{}?", grant.blob_url)));

        let query = query_of(&grant.upload_url);
        assert_eq!(query["sp"], "cw");
        assert_eq!(query["sr"], "b");
        assert_eq!(query["st"], "2026-03-14T15:08:26Z");
        assert_eq!(query["se"], "2026-03-14T15:19:26Z");
        assert_eq!(query["rsct"], "image/jpeg");

        let string_to_sign = format!(
            "cw\n2026-03-14T15:08:26Z\n2026-03-14T15:19:26Z\n/blob/acct/media/{}\n\n\n\n2021-08-06\nb\n\n\n\n\n\n\nimage/jpeg",
            grant.blob_name
        );
        assert_eq!(query["sig"], expected_signature(&string_to_sign));
    }

    #[test]
    fn same_file_in_the_same_millisecond_gets_distinct_blobs() {
        let delegator = delegator();
        let first = delegator
            .delegate_upload_at("c1", "a.png", Some("image/png"), fixed_now())
            .expect("upload must be delegated");
        let second = delegator
            .delegate_upload_at("c1", "a.png", Some("image/png"), fixed_now())
            .expect("upload must be delegated");

        assert_ne!(first.blob_name, second.blob_name);
        assert!(first.blob_name.starts_with("c1/2026-03-14T15-09-26-000Z-"));
        assert!(first.blob_name.ends_with("_a.png"));
    }

    #[test]
    fn upload_without_content_type_declares_octet_stream() {
        let grant = delegator()
            .delegate_upload_at("c1", "clip.mp4", None, fixed_now())
            .expect("upload must be delegated");
        assert_eq!(query_of(&grant.upload_url)["rsct"], "application/octet-stream");
    }

    #[test]
    fn upload_rejects_content_type_with_control_characters() {
        let err = delegator()
            .delegate_upload_at("c1", "a.png", Some("image/png\nx"), fixed_now())
            .expect_err("must be rejected");
        assert!(matches!(err, DelegationError::InvalidContentType));
    }

    #[test]
    fn delegation_fails_closed_without_credentials() {
        let delegator = BlobDelegator::new(None);
        assert!(matches!(
            delegator.delegate_upload("c1", "a.png", None),
            Err(DelegationError::NotConfigured)
        ));
        assert!(matches!(
            delegator.delegate_read("https://acct.blob.core.windows.net/media/c1/a.png"),
            Err(DelegationError::NotConfigured)
        ));
    }

    #[test]
    fn read_url_for_foreign_location_is_unchanged() {
        let delegator = delegator();
        for location in [
            "https://cdn.example.com/media/c1/a.png",
            "https://other.blob.core.windows.net/media/c1/a.png",
            "https://acct.blob.core.windows.net/private/c1/a.png",
            "https://acct.blob.core.windows.net/media/",
            "not a url at all",
        ] {
            let read = delegator.delegate_read(location).expect("must not fail");
            assert_eq!(read, location);
        }
    }

    #[test]
    fn read_url_for_empty_location_is_empty() {
        assert_eq!(delegator().delegate_read("").expect("must not fail"), "");
    }

    #[test]
    fn read_url_for_owned_location_carries_read_capability() {
        let now = fixed_now();
        let stored = "https://acct.blob.core.windows.net/media/c1/2026-03-14T15-09-26-000Z_a.png";

        let read = delegator()
            .delegate_read_at(stored, now)
            .expect("must not fail");

        assert_ne!(read, stored);
        assert!(read.starts_with(&format!("{stored}?")));

        let query = query_of(&read);
        assert_eq!(query["sp"], "r");
        assert_eq!(query["st"], "2026-03-14T15:08:26Z");
        assert_eq!(query["se"], "2026-03-14T16:09:26Z");
        assert!(!query.contains_key("rsct"));

        let string_to_sign = "r\n2026-03-14T15:08:26Z\n2026-03-14T16:09:26Z\n/blob/acct/media/c1/2026-03-14T15-09-26-000Z_a.png\n\n\n\n2021-08-06\nb\n\n\n\n\n\n\n";
        assert_eq!(query["sig"], expected_signature(string_to_sign));
    }

    #[test]
    fn read_capability_goes_before_the_fragment() {
        let stored = "https://acct.blob.core.windows.net/media/c1/a.png#t=10";
        let read = delegator()
            .delegate_read_at(stored, fixed_now())
            .expect("must not fail");

        assert!(read.starts_with("https://acct.blob.core.windows.net/media/c1/a.png?"));
        assert!(read.ends_with("#t=10"));
        let parsed = Url::parse(&read).expect("must be a URL");
        assert_eq!(parsed.fragment(), Some("t=10"));
        assert_eq!(query_of(&read)["sp"], "r");
    }

    #[test]
    fn read_urls_minted_at_different_times_differ() {
        let delegator = delegator();
        let stored = "https://acct.blob.core.windows.net/media/c1/a.png";

        let first = delegator
            .delegate_read_at(stored, fixed_now())
            .expect("must not fail");
        let later = delegator
            .delegate_read_at(stored, fixed_now() + Duration::minutes(61))
            .expect("must not fail");
        assert_ne!(first, later);
    }

    #[test]
    fn custom_endpoint_is_honoured() {
        let credentials = StorageCredentials::new(
            "devstoreaccount1",
            ACCOUNT_KEY,
            "media",
            Some("http://127.0.0.1:10000/devstoreaccount1"),
        )
        .expect("credentials must be valid");
        let delegator = BlobDelegator::new(Some(credentials));

        let grant = delegator
            .delegate_upload("c1", "a.png", Some("image/png"))
            .expect("upload must be delegated");
        assert!(
            grant
                .blob_url
                .starts_with("http://127.0.0.1:10000/devstoreaccount1/media/c1/")
        );

        let read = delegator.delegate_read(&grant.blob_url).expect("must not fail");
        assert_ne!(read, grant.blob_url);
        assert_eq!(query_of(&read)["sp"], "r");
    }

    #[test]
    fn ownership_is_checked_only_inside_the_container() {
        let delegator = delegator();
        let own = "https://acct.blob.core.windows.net/media/c1/a.png";
        let other = "https://acct.blob.core.windows.net/media/c2/a.png";
        let sneaky = "https://acct.blob.core.windows.net/media/c1%2F..%2Fc2/a.png";
        let foreign = "https://cdn.example.com/c2/a.png";

        assert!(delegator.is_owned_by(own, "c1").expect("configured"));
        assert!(!delegator.is_owned_by(other, "c1").expect("configured"));
        assert!(!delegator.is_owned_by(sneaky, "c1").expect("configured"));
        assert!(delegator.is_owned_by(foreign, "c1").expect("configured"));
    }

    #[test]
    fn credentials_reject_invalid_key() {
        let err = StorageCredentials::new("acct", "not base64!!", "media", None)
            .expect_err("key must be base64");
        assert!(matches!(err, DelegationError::InvalidAccountKey(_)));
    }
}
