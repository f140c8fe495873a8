use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::data::comment_repository::{CommentRepository, NewComment};
use crate::data::post_repository::{NewPost, Pagination, PostRepository};
use crate::domain::comment::{Comment, normalize_comment_text};
use crate::domain::error::DomainError;
use crate::domain::identity::Identity;
use crate::domain::post::{CreatePostRequest, Post};
use crate::domain::user::Role;
use crate::infrastructure::blob_sas::{BlobDelegator, DelegationError, UploadGrant};

/// Roles allowed to publish media.
const PUBLISHERS: &[Role] = &[Role::Creator];
const MAX_COMMENTS: i64 = 200;

/// A post as handed to readers: stored locations stay canonical, the view
/// URLs carry freshly minted read capabilities.
#[derive(Debug, Clone)]
pub(crate) struct PostView {
    pub(crate) post: Post,
    pub(crate) media_view_url: String,
    pub(crate) thumbnail_view_url: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ListPostsResult {
    pub(crate) items: Vec<PostView>,
    pub(crate) page: u32,
    pub(crate) limit: u32,
}

pub(crate) struct CatalogService<P: PostRepository, C: CommentRepository> {
    posts: P,
    comments: C,
    delegator: Arc<BlobDelegator>,
}

impl<P: PostRepository, C: CommentRepository> CatalogService<P, C> {
    pub(crate) fn new(posts: P, comments: C, delegator: Arc<BlobDelegator>) -> Self {
        Self {
            posts,
            comments,
            delegator,
        }
    }

    pub(crate) fn init_upload(
        &self,
        actor: &Identity,
        file_name: &str,
        content_type: Option<&str>,
    ) -> Result<UploadGrant, DomainError> {
        actor.authorize(PUBLISHERS)?;
        if file_name.trim().is_empty() {
            return Err(DomainError::Validation {
                field: "file_name",
                message: "must not be empty",
            });
        }

        let grant = self
            .delegator
            .delegate_upload(&actor.user_id.to_string(), file_name, content_type)
            .map_err(map_delegation_error)?;
        info!(user_id = %actor.user_id, blob_name = %grant.blob_name, "upload delegated");
        Ok(grant)
    }

    pub(crate) async fn create_post(
        &self,
        actor: &Identity,
        req: CreatePostRequest,
    ) -> Result<Post, DomainError> {
        actor.authorize(PUBLISHERS)?;
        let draft = req.validate()?;

        let owner = actor.user_id.to_string();
        for location in [&draft.media_url, &draft.thumbnail_url] {
            if !location.is_empty()
                && !self
                    .delegator
                    .is_owned_by(location, &owner)
                    .map_err(map_delegation_error)?
            {
                return Err(DomainError::Forbidden);
            }
        }

        let new_post = NewPost {
            creator_id: actor.user_id,
            media_type: draft.media_type,
            media_url: draft.media_url,
            thumbnail_url: draft.thumbnail_url,
            title: draft.title,
            caption: draft.caption,
            location: draft.location,
            people_present: draft.people_present,
            tags: draft.tags,
        };
        let post = self.posts.create_post(new_post).await?;
        info!(post_id = %post.id, creator_id = %post.creator_id, "post created");
        Ok(post)
    }

    pub(crate) async fn get_post(&self, id: Uuid) -> Result<PostView, DomainError> {
        let post = self
            .posts
            .get_post(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("post id: {id}")))?;
        self.with_view_urls(post)
    }

    pub(crate) async fn list_posts(&self, page: u32, limit: u32) -> Result<ListPostsResult, DomainError> {
        let pagination = Pagination { page, limit };
        let items = self
            .posts
            .list_posts(pagination)
            .await?
            .into_iter()
            .map(|post| self.with_view_urls(post))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ListPostsResult { items, page, limit })
    }

    pub(crate) async fn add_comment(
        &self,
        actor: &Identity,
        post_id: Uuid,
        text: &str,
    ) -> Result<Comment, DomainError> {
        let text = normalize_comment_text(text)?;
        if !self.posts.post_exists(post_id).await? {
            return Err(DomainError::NotFound(format!("post id: {post_id}")));
        }

        let comment = self
            .comments
            .create_comment(NewComment {
                post_id,
                user_id: actor.user_id,
                user_display_name: actor.display_name.clone(),
                text,
            })
            .await?;

        // the comment row is committed at this point; a failed counter bump
        // is reported but leaves the comment in place
        if let Err(err) = self.posts.increment_comment_count(post_id).await {
            warn!(post_id = %post_id, error = %err, "comment stored but counter not incremented");
            return Err(err);
        }
        Ok(comment)
    }

    pub(crate) async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, DomainError> {
        self.comments.list_comments(post_id, MAX_COMMENTS).await
    }

    fn with_view_urls(&self, post: Post) -> Result<PostView, DomainError> {
        let media_view_url = self
            .delegator
            .delegate_read(&post.media_url)
            .map_err(map_delegation_error)?;
        let thumbnail_view_url = self
            .delegator
            .delegate_read(&post.thumbnail_url)
            .map_err(map_delegation_error)?;

        Ok(PostView {
            post,
            media_view_url,
            thumbnail_view_url,
        })
    }
}

pub(crate) fn map_delegation_error(err: DelegationError) -> DomainError {
    match err {
        DelegationError::InvalidContentType => DomainError::Validation {
            field: "content_type",
            message: "must not contain control characters",
        },
        DelegationError::Signing(message) => DomainError::Unexpected(message),
        other => DomainError::Config(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    use super::CatalogService;
    use crate::data::comment_repository::{CommentRepository, NewComment};
    use crate::data::post_repository::{NewPost, Pagination, PostRepository};
    use crate::domain::comment::Comment;
    use crate::domain::error::DomainError;
    use crate::domain::identity::Identity;
    use crate::domain::post::{CreatePostRequest, Post, PostStats};
    use crate::domain::user::Role;
    use crate::infrastructure::blob_sas::{BlobDelegator, StorageCredentials};

    const ACCOUNT_KEY: &str = "c2VjcmV0LXN0b3JhZ2Uta2V5LWZvci10ZXN0cw==";

    #[derive(Clone, Default)]
    struct FakeCatalog {
        posts: Arc<Mutex<HashMap<Uuid, Post>>>,
        comments: Arc<Mutex<Vec<Comment>>>,
        pagination_seen: Arc<Mutex<Option<Pagination>>>,
    }

    impl FakeCatalog {
        fn insert_post(&self, post: Post) {
            self.posts
                .lock()
                .expect("posts mutex poisoned")
                .insert(post.id, post);
        }

        fn comment_count(&self, id: Uuid) -> i64 {
            self.posts.lock().expect("posts mutex poisoned")[&id]
                .stats
                .comment_count
        }
    }

    #[async_trait]
    impl PostRepository for FakeCatalog {
        async fn create_post(&self, input: NewPost) -> Result<Post, DomainError> {
            let now = Utc::now();
            let post = Post {
                id: Uuid::new_v4(),
                creator_id: input.creator_id,
                media_type: input.media_type,
                media_url: input.media_url,
                thumbnail_url: input.thumbnail_url,
                title: input.title,
                caption: input.caption,
                location: input.location,
                people_present: input.people_present,
                tags: input.tags,
                stats: PostStats::default(),
                created_at: now,
                updated_at: now,
            };
            self.insert_post(post.clone());
            Ok(post)
        }

        async fn get_post(&self, id: Uuid) -> Result<Option<Post>, DomainError> {
            Ok(self
                .posts
                .lock()
                .expect("posts mutex poisoned")
                .get(&id)
                .cloned())
        }

        async fn post_exists(&self, id: Uuid) -> Result<bool, DomainError> {
            Ok(self
                .posts
                .lock()
                .expect("posts mutex poisoned")
                .contains_key(&id))
        }

        async fn list_posts(&self, pagination: Pagination) -> Result<Vec<Post>, DomainError> {
            *self
                .pagination_seen
                .lock()
                .expect("pagination mutex poisoned") = Some(pagination);
            Ok(self
                .posts
                .lock()
                .expect("posts mutex poisoned")
                .values()
                .cloned()
                .collect())
        }

        async fn increment_comment_count(&self, id: Uuid) -> Result<(), DomainError> {
            let mut posts = self.posts.lock().expect("posts mutex poisoned");
            let post = posts
                .get_mut(&id)
                .ok_or_else(|| DomainError::NotFound(id.to_string()))?;
            post.stats.comment_count += 1;
            Ok(())
        }
    }

    #[async_trait]
    impl CommentRepository for FakeCatalog {
        async fn create_comment(&self, input: NewComment) -> Result<Comment, DomainError> {
            let comment = Comment {
                id: Uuid::new_v4(),
                post_id: input.post_id,
                user_id: input.user_id,
                user_display_name: input.user_display_name,
                text: input.text,
                created_at: Utc::now(),
            };
            self.comments
                .lock()
                .expect("comments mutex poisoned")
                .push(comment.clone());
            Ok(comment)
        }

        async fn list_comments(&self, post_id: Uuid, limit: i64) -> Result<Vec<Comment>, DomainError> {
            Ok(self
                .comments
                .lock()
                .expect("comments mutex poisoned")
                .iter()
                .filter(|c| c.post_id == post_id)
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    fn service(catalog: &FakeCatalog) -> CatalogService<FakeCatalog, FakeCatalog> {
        let credentials = StorageCredentials::new("acct", ACCOUNT_KEY, "media", None)
            .expect("credentials must be valid");
        CatalogService::new(
            catalog.clone(),
            catalog.clone(),
            Arc::new(BlobDelegator::new(Some(credentials))),
        )
    }

    fn identity(role: Role) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            email: None,
            display_name: "Someone".to_string(),
            role,
        }
    }

    fn blob_url(owner: Uuid, name: &str) -> String {
        format!("https://acct.blob.core.windows.net/media/{owner}/{name}")
    }

    fn create_request(media_url: String) -> CreatePostRequest {
        CreatePostRequest {
            media_type: "image".to_string(),
            media_url,
            thumbnail_url: String::new(),
            title: " Harbour ".to_string(),
            caption: String::new(),
            location: String::new(),
            people_present: vec![],
            tags: vec!["sea".to_string()],
        }
    }

    #[test]
    fn init_upload_is_creator_only() {
        let catalog = FakeCatalog::default();
        let service = service(&catalog);

        for role in [Role::Consumer, Role::Admin] {
            let err = service
                .init_upload(&identity(role), "a.png", Some("image/png"))
                .expect_err("only creators may upload");
            assert!(matches!(err, DomainError::Forbidden));
        }
    }

    #[test]
    fn init_upload_places_blob_under_creator_prefix() {
        let catalog = FakeCatalog::default();
        let service = service(&catalog);
        let creator = identity(Role::Creator);

        let grant = service
            .init_upload(&creator, "My Photo.JPG", Some("image/jpeg"))
            .expect("creator may upload");
        assert!(grant.blob_name.starts_with(&format!("{}/", creator.user_id)));
        assert!(grant.upload_url.contains("sp=cw"));
    }

    #[test]
    fn init_upload_requires_file_name() {
        let catalog = FakeCatalog::default();
        let err = service(&catalog)
            .init_upload(&identity(Role::Creator), "  ", None)
            .expect_err("file name is required");
        assert!(matches!(err, DomainError::Validation { field: "file_name", .. }));
    }

    #[test]
    fn init_upload_without_storage_is_config_error() {
        let catalog = FakeCatalog::default();
        let service = CatalogService::new(
            catalog.clone(),
            catalog.clone(),
            Arc::new(BlobDelegator::new(None)),
        );
        let err = service
            .init_upload(&identity(Role::Creator), "a.png", None)
            .expect_err("must fail closed");
        assert!(matches!(err, DomainError::Config(_)));
    }

    #[tokio::test]
    async fn create_post_stores_canonical_location() {
        let catalog = FakeCatalog::default();
        let service = service(&catalog);
        let creator = identity(Role::Creator);
        let media_url = blob_url(creator.user_id, "a.png");

        let post = service
            .create_post(&creator, create_request(media_url.clone()))
            .await
            .expect("create_post must succeed");

        assert_eq!(post.creator_id, creator.user_id);
        assert_eq!(post.media_url, media_url);
        assert_eq!(post.title, "Harbour");
        assert_eq!(post.stats, PostStats::default());
    }

    #[tokio::test]
    async fn create_post_rejects_other_creators_blob() {
        let catalog = FakeCatalog::default();
        let service = service(&catalog);
        let creator = identity(Role::Creator);

        let err = service
            .create_post(&creator, create_request(blob_url(Uuid::new_v4(), "a.png")))
            .await
            .expect_err("foreign blob must be rejected");
        assert!(matches!(err, DomainError::Forbidden));
        assert!(catalog.posts.lock().expect("posts mutex poisoned").is_empty());
    }

    #[tokio::test]
    async fn create_post_rejects_consumer() {
        let catalog = FakeCatalog::default();
        let consumer = identity(Role::Consumer);
        let err = service(&catalog)
            .create_post(&consumer, create_request(blob_url(consumer.user_id, "a.png")))
            .await
            .expect_err("consumers cannot publish");
        assert!(matches!(err, DomainError::Forbidden));
    }

    #[tokio::test]
    async fn get_post_returns_signed_view_urls_and_keeps_stored_location() {
        let catalog = FakeCatalog::default();
        let service = service(&catalog);
        let creator = identity(Role::Creator);
        let media_url = blob_url(creator.user_id, "a.png");
        let created = service
            .create_post(&creator, create_request(media_url.clone()))
            .await
            .expect("create_post must succeed");

        let view = service.get_post(created.id).await.expect("post must exist");

        assert_eq!(view.post.media_url, media_url);
        assert_ne!(view.media_view_url, media_url);
        assert!(view.media_view_url.starts_with(&format!("{media_url}?")));
        assert!(view.media_view_url.contains("sp=r"));
        assert_eq!(view.thumbnail_view_url, "");
    }

    #[tokio::test]
    async fn get_post_returns_not_found_when_missing() {
        let catalog = FakeCatalog::default();
        let err = service(&catalog)
            .get_post(Uuid::new_v4())
            .await
            .expect_err("post must be missing");
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_posts_passes_pagination_and_signs_items() {
        let catalog = FakeCatalog::default();
        let service = service(&catalog);
        let creator = identity(Role::Creator);
        service
            .create_post(&creator, create_request(blob_url(creator.user_id, "a.png")))
            .await
            .expect("create_post must succeed");

        let result = service.list_posts(2, 10).await.expect("list must succeed");

        assert_eq!(result.page, 2);
        assert_eq!(result.limit, 10);
        assert_eq!(result.items.len(), 1);
        assert!(result.items[0].media_view_url.contains("sig="));

        let seen = catalog
            .pagination_seen
            .lock()
            .expect("pagination mutex poisoned")
            .expect("pagination must be passed");
        assert_eq!(seen.offset(), 10);
    }

    #[tokio::test]
    async fn add_comment_increments_counter_by_one() {
        let catalog = FakeCatalog::default();
        let service = service(&catalog);
        let creator = identity(Role::Creator);
        let post = service
            .create_post(&creator, create_request(blob_url(creator.user_id, "a.png")))
            .await
            .expect("create_post must succeed");
        let reader = identity(Role::Consumer);

        let comment = service
            .add_comment(&reader, post.id, "  lovely  ")
            .await
            .expect("comment must be accepted");
        service
            .add_comment(&reader, post.id, "again")
            .await
            .expect("comment must be accepted");

        assert_eq!(comment.text, "lovely");
        assert_eq!(comment.user_display_name, "Someone");
        assert_eq!(catalog.comment_count(post.id), 2);
        assert_eq!(
            service
                .list_comments(post.id)
                .await
                .expect("list must succeed")
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn add_comment_to_missing_post_stores_nothing() {
        let catalog = FakeCatalog::default();
        let err = service(&catalog)
            .add_comment(&identity(Role::Consumer), Uuid::new_v4(), "hello")
            .await
            .expect_err("post must be missing");
        assert!(matches!(err, DomainError::NotFound(_)));
        assert!(catalog.comments.lock().expect("comments mutex poisoned").is_empty());
    }

    #[tokio::test]
    async fn add_comment_rejects_blank_text() {
        let catalog = FakeCatalog::default();
        let err = service(&catalog)
            .add_comment(&identity(Role::Consumer), Uuid::new_v4(), "   ")
            .await
            .expect_err("blank text is invalid");
        assert!(matches!(err, DomainError::Validation { field: "text", .. }));
    }
}
