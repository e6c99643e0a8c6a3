use actix_web::{http::header::ContentType, web, HttpResponse};
use error_stack::Report;
use std::future::Future;
use tracing::{debug, info};

use crate::http::error::{Error, ErrorKind, HandlerError, Result};
use crate::model::{Post, PostId};
use crate::{repo, App};

/// Largest request body accepted when creating a post.
pub const MAX_PAYLOAD_SIZE: usize = 8 * 1024 * 1024;

#[tracing::instrument(skip_all, name = "http.posts.create")]
pub async fn create(app: &App, payload: web::Payload) -> Result<HttpResponse> {
    let body = read_body(payload).await?;
    let post = serde_json::from_slice::<Post>(&body)
        .map_err(|e| Error::internal(Report::new(e), HandlerError::DecodeBody))?;

    with_deadline(app, app.posts.save(&post)).await?;
    info!(post.id = %post.id, comments = post.comments.len(), "Post created");

    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(app), name = "http.posts.read")]
pub async fn read(app: &App, id: Option<PostId>) -> Result<HttpResponse> {
    let Some(id) = id else {
        debug!("path does not contain a valid post id");
        return Err(Error::not_found());
    };

    let Some(post) = with_deadline(app, app.posts.get(id.as_str())).await? else {
        return Err(Error::not_found());
    };

    let body = serde_json::to_vec(&post)
        .map_err(|e| Error::internal(Report::new(e), HandlerError::EncodeBody))?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(body))
}

#[tracing::instrument(skip(app), name = "http.posts.delete")]
pub async fn delete(app: &App, id: Option<PostId>) -> Result<HttpResponse> {
    let Some(id) = id else {
        debug!("path does not contain a valid post id");
        return Err(Error::not_found());
    };

    if !with_deadline(app, app.posts.delete(id.as_str())).await? {
        return Err(Error::not_found());
    }
    info!(post.id = %id, "Post deleted");

    Ok(HttpResponse::Ok().finish())
}

// Failing to read the body is treated like failing to decode it.
async fn read_body(payload: web::Payload) -> Result<web::Bytes> {
    let report = match payload.to_bytes_limited(MAX_PAYLOAD_SIZE).await {
        Ok(Ok(body)) => return Ok(body),
        Ok(Err(error)) => Report::new(HandlerError::DecodeBody)
            .attach_printable(format!("could not read request body: {error}")),
        Err(..) => Report::new(HandlerError::DecodeBody)
            .attach_printable(format!("request body is larger than {MAX_PAYLOAD_SIZE} bytes")),
    };
    Err(Error::from_report(ErrorKind::Internal, report))
}

/// Runs a repository operation under the configured request timeout.
/// The operation is dropped, and with it aborted, once time runs out.
async fn with_deadline<T>(
    app: &App,
    operation: impl Future<Output = repo::Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(app.config.request_timeout(), operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(report)) => Err(Error::internal(report, HandlerError::Repository)),
        Err(elapsed) => Err(Error::internal(Report::new(elapsed), HandlerError::TimedOut)),
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::MAX_PAYLOAD_SIZE;
    use crate::http::controllers::configure;
    use crate::model::{Comment, Post};
    use crate::repo::{MemoryPostsRepo, PostsRepo, RepoError, Result as RepoResult};
    use crate::{config, App};

    use actix_web::{
        body::{BoxBody, MessageBody},
        dev::{ServiceFactory, ServiceRequest, ServiceResponse},
        http::{header, Method, StatusCode},
        test, web,
    };
    use async_trait::async_trait;
    use error_stack::Report;
    use serde_json::json;
    use std::collections::HashSet;
    use std::num::NonZeroU64;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn sample_post() -> Post {
        Post {
            id: "abcd1234".into(),
            title: "t".into(),
            likes: 5,
            comments: vec![
                Comment {
                    id: "comment1".into(),
                    body: "b1".into(),
                    likes: 1,
                },
                Comment {
                    id: "comment2".into(),
                    body: "b2".into(),
                    likes: 2,
                },
            ],
        }
    }

    fn build_app(
        repo: Arc<dyn PostsRepo>,
        config: config::Server,
    ) -> actix_web::App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<BoxBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        crate::logging::init_for_tests();
        actix_web::App::new()
            .app_data(web::Data::new(App::with_repo(config, repo)))
            .configure(configure)
    }

    fn memory_app(
        repo: &Arc<MemoryPostsRepo>,
    ) -> actix_web::App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<BoxBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        build_app(repo.clone(), config::Server::for_tests())
    }

    #[actix_web::test]
    async fn create_read_delete_scenario() {
        let repo = Arc::new(MemoryPostsRepo::new());
        let service = test::init_service(memory_app(&repo)).await;
        let post = sample_post();

        let request = test::TestRequest::post()
            .uri("/post")
            .set_json(&post)
            .to_request();
        let response = test::call_service(&service, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(test::read_body(response).await.is_empty());

        let request = test::TestRequest::get().uri("/post/abcd1234").to_request();
        let response = test::call_service(&service, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let found: Post = test::read_body_json(response).await;
        assert_eq!(found.id, post.id);
        assert_eq!(found.title, post.title);
        assert_eq!(found.likes, post.likes);
        assert_eq!(
            found.comments.into_iter().collect::<HashSet<_>>(),
            post.comments.into_iter().collect::<HashSet<_>>()
        );

        let request = test::TestRequest::delete().uri("/post/abcd1234").to_request();
        let response = test::call_service(&service, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let request = test::TestRequest::get().uri("/post/abcd1234").to_request();
        let response = test::call_service(&service, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn read_uses_the_wire_names() {
        let repo = Arc::new(MemoryPostsRepo::new());
        repo.save(&sample_post()).await.unwrap();
        let service = test::init_service(memory_app(&repo)).await;

        let request = test::TestRequest::get().uri("/post/abcd1234").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&service, request).await;
        assert_eq!(body["UUID"], "abcd1234");
        assert_eq!(body["Title"], "t");
        assert_eq!(body["Likes"], 5);
        assert_eq!(body["Comments"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn unknown_posts_are_not_found() {
        let repo = Arc::new(MemoryPostsRepo::new());
        let service = test::init_service(memory_app(&repo)).await;

        for method in [Method::GET, Method::DELETE] {
            let request = test::TestRequest::default()
                .method(method)
                .uri("/post/zzzz9999")
                .to_request();
            let response = test::call_service(&service, request).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
        assert_eq!(repo.calls(), 2);
    }

    #[actix_web::test]
    async fn malformed_ids_never_reach_the_repository() {
        let repo = Arc::new(MemoryPostsRepo::new());
        let service = test::init_service(memory_app(&repo)).await;

        for uri in ["/post/ABCD1234", "/post/short", "/post/abcd12345", "/post/"] {
            let request = test::TestRequest::get().uri(uri).to_request();
            let response = test::call_service(&service, request).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
        assert_eq!(repo.calls(), 0);
    }

    #[actix_web::test]
    async fn disallowed_methods_are_rejected_without_repository_calls() {
        let repo = Arc::new(MemoryPostsRepo::new());
        let service = test::init_service(memory_app(&repo)).await;

        let cases = [
            (Method::GET, "/post", "POST"),
            (Method::DELETE, "/post", "POST"),
            (Method::PUT, "/post", "POST"),
            (Method::POST, "/post/abcd1234", "GET, DELETE"),
            (Method::PATCH, "/post/abcd1234", "GET, DELETE"),
            (Method::POST, "/post/", "GET, DELETE"),
        ];

        for (method, uri, allow) in cases {
            let request = test::TestRequest::default()
                .method(method.clone())
                .uri(uri)
                .to_request();
            let response = test::call_service(&service, request).await;
            assert_eq!(
                response.status(),
                StatusCode::METHOD_NOT_ALLOWED,
                "{method} {uri}"
            );
            assert_eq!(response.headers().get(header::ALLOW).unwrap(), allow);
        }
        assert_eq!(repo.calls(), 0);
    }

    #[actix_web::test]
    async fn undecodable_body_is_an_internal_error() {
        let repo = Arc::new(MemoryPostsRepo::new());
        let service = test::init_service(memory_app(&repo)).await;

        let bodies = [
            &b"{not json"[..],
            br#"{"Title":"no id"}"#,
            br#"{"UUID":"p1","Likes":-3}"#,
        ];
        for body in bodies {
            let request = test::TestRequest::post()
                .uri("/post")
                .insert_header(header::ContentType::json())
                .set_payload(body)
                .to_request();
            let response = test::call_service(&service, request).await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let body: serde_json::Value = test::read_body_json(response).await;
            assert_eq!(
                body,
                json!({ "code": "internal", "message": "Something went wrong" })
            );
        }
        assert_eq!(repo.calls(), 0);
    }

    #[actix_web::test]
    async fn oversized_bodies_follow_the_method_rules() {
        let repo = Arc::new(MemoryPostsRepo::new());
        let service = test::init_service(memory_app(&repo)).await;
        let oversized = vec![b' '; MAX_PAYLOAD_SIZE + 1024 * 1024];

        let request = test::TestRequest::put()
            .uri("/post")
            .set_payload(oversized.clone())
            .to_request();
        let response = test::call_service(&service, request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let request = test::TestRequest::post()
            .uri("/post")
            .insert_header(header::ContentType::json())
            .set_payload(oversized)
            .to_request();
        let response = test::call_service(&service, request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(
            body,
            json!({ "code": "internal", "message": "Something went wrong" })
        );
        assert_eq!(repo.calls(), 0);
    }

    #[actix_web::test]
    async fn duplicate_create_is_an_internal_error() {
        let repo = Arc::new(MemoryPostsRepo::new());
        let service = test::init_service(memory_app(&repo)).await;

        for expected in [StatusCode::OK, StatusCode::INTERNAL_SERVER_ERROR] {
            let request = test::TestRequest::post()
                .uri("/post")
                .set_json(sample_post())
                .to_request();
            let response = test::call_service(&service, request).await;
            assert_eq!(response.status(), expected);
        }
    }

    /// Fails every operation the way a broken database would.
    #[derive(Debug, Default)]
    struct FailingRepo {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PostsRepo for FailingRepo {
        async fn save(&self, _post: &Post) -> RepoResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Report::new(RepoError::InsertPost).attach_printable("password=hunter2"))
        }

        async fn get(&self, _id: &str) -> RepoResult<Option<Post>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Report::new(RepoError::QueryPost).attach_printable("password=hunter2"))
        }

        async fn delete(&self, _id: &str) -> RepoResult<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Report::new(RepoError::DeletePost).attach_printable("password=hunter2"))
        }
    }

    #[actix_web::test]
    async fn repository_failures_are_internal_errors() {
        let repo = Arc::new(FailingRepo::default());
        let service =
            test::init_service(build_app(repo.clone(), config::Server::for_tests())).await;

        let requests = [
            test::TestRequest::post()
                .uri("/post")
                .set_json(sample_post())
                .to_request(),
            test::TestRequest::get().uri("/post/abcd1234").to_request(),
            test::TestRequest::delete().uri("/post/abcd1234").to_request(),
        ];

        for request in requests {
            let response = test::call_service(&service, request).await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let body = response.into_body().try_into_bytes().unwrap();
            let body = String::from_utf8(body.to_vec()).unwrap();
            assert!(!body.contains("hunter2"), "{body}");
        }
        assert_eq!(repo.calls.load(Ordering::SeqCst), 3);
    }

    /// Never finishes in time.
    #[derive(Debug, Default)]
    struct SlowRepo;

    #[async_trait]
    impl PostsRepo for SlowRepo {
        async fn save(&self, _post: &Post) -> RepoResult<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }

        async fn get(&self, _id: &str) -> RepoResult<Option<Post>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }

        async fn delete(&self, _id: &str) -> RepoResult<bool> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(true)
        }
    }

    #[actix_web::test]
    async fn timed_out_operations_are_internal_errors() {
        let mut config = config::Server::for_tests();
        config.request_timeout_secs = NonZeroU64::MIN;
        let service = test::init_service(build_app(Arc::new(SlowRepo), config)).await;

        let requests = [
            test::TestRequest::post()
                .uri("/post")
                .set_json(sample_post())
                .to_request(),
            test::TestRequest::get().uri("/post/abcd1234").to_request(),
            test::TestRequest::delete().uri("/post/abcd1234").to_request(),
        ];

        for request in requests {
            let response = test::call_service(&service, request).await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
