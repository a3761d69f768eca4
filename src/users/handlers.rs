use axum::{
    extract::{rejection::FormRejection, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::SignedCookieJar;
use tracing::{error, info, instrument, warn};

use crate::{
    error::SubmitError,
    flash::{self, Flash},
    state::AppState,
    users::{dto::SubmitForm, model::Submission},
    views,
};

pub fn form_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/submit", post(submit))
        .route("/result", get(result))
}

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, String)> {
    state.views.form_page().map(Html).map_err(render_failed)
}

#[instrument(skip_all)]
pub async fn result(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Html<String>), (StatusCode, String)> {
    let (jar, flash) = flash::take(jar);
    let page = state
        .views
        .result_page(flash.as_ref())
        .map_err(render_failed)?;
    Ok((jar, Html(page)))
}

fn render_failed(e: views::Error) -> (StatusCode, String) {
    error!(error = %e, "page rendering failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    form: Result<Form<SubmitForm>, FormRejection>,
) -> impl IntoResponse {
    let form = match form {
        Ok(Form(form)) => form,
        Err(e) => {
            warn!(error = %e, "unreadable form body; treating every field as empty");
            SubmitForm::default()
        }
    };

    let flash = match create_user(&state, &form).await {
        Ok(id) => {
            info!(user_id = id, "user created");
            Flash::success(format!("Form submitted successfully! User id: {id}"))
        }
        Err(e) => {
            match &e {
                SubmitError::Validation(errors) => {
                    warn!(violations = errors.errors().len(), %errors, "submission rejected");
                }
                SubmitError::Server(cause) => {
                    let cause = format!("{cause:#}");
                    error!(error = %cause, "insert_user failed");
                }
            }
            Flash::error(e.to_string())
        }
    };

    (
        StatusCode::FOUND,
        flash::set(jar, &flash),
        [(header::LOCATION, "/result")],
    )
}

async fn create_user(state: &AppState, form: &SubmitForm) -> Result<i64, SubmitError> {
    let submission = Submission::parse(
        &form.first_name,
        &form.last_name,
        &form.email,
        &form.favourite_colour,
    )?;
    let id = state
        .users
        .insert_user(
            &submission.first_name,
            &submission.last_name,
            &submission.email,
            submission.favourite_colour.as_str(),
        )
        .await?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex,
    };

    use axum::{
        async_trait,
        body::{to_bytes, Body},
        http::{Request, Response, StatusCode},
    };
    use rstest::rstest;
    use tower::ServiceExt;

    use crate::{
        app::build_app,
        config::{AppConfig, DatabaseConfig, DbAddress},
        db::UserStore,
        state::AppState,
    };

    type Call = (String, String, String, String);

    /// Records every insert and hands out increasing ids, or fails on demand.
    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<Call>>,
        last_id: AtomicI64,
        failure: Option<&'static str>,
    }

    impl RecordingStore {
        fn failing(message: &'static str) -> Self {
            Self {
                failure: Some(message),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UserStore for RecordingStore {
        async fn insert_user(
            &self,
            first_name: &str,
            last_name: &str,
            email: &str,
            favourite_colour: &str,
        ) -> anyhow::Result<i64> {
            self.calls.lock().unwrap().push((
                first_name.into(),
                last_name.into(),
                email.into(),
                favourite_colour.into(),
            ));
            if let Some(message) = self.failure {
                anyhow::bail!(message);
            }
            Ok(self.last_id.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            database: DatabaseConfig {
                name: "formapp".into(),
                user: "postgres".into(),
                password: "postgres".into(),
                address: DbAddress::Tcp {
                    host: "localhost".into(),
                    port: 5432,
                },
            },
            secret_key: "test-secret-key".into(),
            host: "127.0.0.1".into(),
            port: 0,
        }
    }

    fn app_with(store: Arc<RecordingStore>) -> axum::Router {
        build_app(AppState::from_parts(Arc::new(test_config()), store).unwrap())
    }

    async fn post_form(app: &axum::Router, body: &str) -> Response<Body> {
        let req = Request::post("/submit")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();
        app.clone().oneshot(req).await.unwrap()
    }

    async fn get_page(app: &axum::Router, uri: &str, cookie: Option<&str>) -> (StatusCode, String) {
        let mut req = Request::get(uri);
        if let Some(cookie) = cookie {
            req = req.header("cookie", cookie);
        }
        let res = app.clone().oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn flash_cookie(res: &Response<Body>) -> String {
        let set_cookie = res
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("flash="))
            .expect("flash cookie set");
        set_cookie.split(';').next().unwrap().to_string()
    }

    /// POSTs the form, follows the redirect with the flash cookie and returns the result page.
    async fn submit_and_follow(app: &axum::Router, body: &str) -> String {
        let res = post_form(app, body).await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.headers()["location"], "/result");
        let cookie = flash_cookie(&res);
        let (status, html) = get_page(app, "/result", Some(&cookie)).await;
        assert_eq!(status, StatusCode::OK);
        html
    }

    const JOHN: &str =
        "first_name=John&last_name=Doe&email=john%40example.com&favourite_colour=red";

    #[tokio::test]
    async fn index_renders_the_form() {
        let app = app_with(Arc::default());
        let (status, html) = get_page(&app, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Submission Form"));
        for field in ["first_name", "last_name", "email", "favourite_colour"] {
            assert!(html.contains(field));
        }
    }

    #[tokio::test]
    async fn result_without_flash_renders_cleanly() {
        let app = app_with(Arc::default());
        let (status, html) = get_page(&app, "/result", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Submission Result"));
        assert!(html.contains("Back to form"));
        assert!(!html.contains("error"));
        assert!(!html.contains("User id"));
    }

    #[tokio::test]
    async fn valid_submission_is_stored_and_reported() {
        let store = Arc::new(RecordingStore::default());
        let app = app_with(store.clone());

        let html = submit_and_follow(&app, JOHN).await;

        assert_eq!(
            store.calls(),
            vec![(
                "John".to_string(),
                "Doe".to_string(),
                "john@example.com".to_string(),
                "red".to_string()
            )]
        );
        assert!(html.contains("Form submitted successfully! User id: 1"));
        assert!(html.contains(r#"class="success""#));
    }

    #[rstest]
    #[case(
        "first_name=Mary+Jane&last_name=Van+Der+Berg&email=mary%40example.com&favourite_colour=blue",
        ("Mary Jane", "Van Der Berg", "mary@example.com", "blue")
    )]
    #[case(
        "first_name=++John++&last_name=++Doe++&email=john%40example.com&favourite_colour=green",
        ("John", "Doe", "john@example.com", "green")
    )]
    #[tokio::test]
    async fn names_reach_the_store_trimmed(
        #[case] body: &str,
        #[case] expected: (&str, &str, &str, &str),
    ) {
        let store = Arc::new(RecordingStore::default());
        let app = app_with(store.clone());

        let res = post_form(&app, body).await;

        assert_eq!(res.status(), StatusCode::FOUND);
        let (first, last, email, colour) = expected;
        assert_eq!(
            store.calls(),
            vec![(
                first.to_string(),
                last.to_string(),
                email.to_string(),
                colour.to_string()
            )]
        );
    }

    #[rstest]
    #[case("first_name=&last_name=Doe&email=john%40example.com&favourite_colour=red")]
    #[case("first_name=John&last_name=&email=john%40example.com&favourite_colour=red")]
    #[case("first_name=John&last_name=Doe&email=not-an-email&favourite_colour=red")]
    #[case("first_name=John123&last_name=Doe&email=john%40example.com&favourite_colour=red")]
    #[case("first_name=John&last_name=Doe&email=john%40example.com&favourite_colour=yellow")]
    #[case("last_name=Doe&email=john%40example.com&favourite_colour=red")]
    #[case("")]
    #[tokio::test]
    async fn invalid_submission_never_reaches_the_store(#[case] body: &str) {
        let store = Arc::new(RecordingStore::default());
        let app = app_with(store.clone());

        let html = submit_and_follow(&app, body).await;

        assert!(store.calls().is_empty());
        assert!(html.contains("Validation error"));
        assert!(html.contains(r#"class="error""#));
    }

    #[tokio::test]
    async fn validation_message_names_each_failing_field() {
        let app = app_with(Arc::default());
        let html = submit_and_follow(
            &app,
            "first_name=&last_name=Doe&email=john%40example.com&favourite_colour=RED",
        )
        .await;
        assert!(html.contains("first_name: This field cannot be empty; favourite_colour:"));
    }

    #[tokio::test]
    async fn non_form_body_is_a_validation_error() {
        let store = Arc::new(RecordingStore::default());
        let app = app_with(store.clone());

        let req = Request::post("/submit")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"first_name":"John"}"#))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::FOUND);
        let (_, html) = get_page(&app, "/result", Some(&flash_cookie(&res))).await;
        assert!(html.contains("Validation error"));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_a_server_error_without_retry() {
        let store = Arc::new(RecordingStore::failing("Database connection failed"));
        let app = app_with(store.clone());

        let html = submit_and_follow(&app, JOHN).await;

        assert_eq!(store.calls().len(), 1);
        assert!(html.contains("Server error: Database connection failed"));
    }

    #[tokio::test]
    async fn same_payload_twice_yields_two_ids() {
        let store = Arc::new(RecordingStore::default());
        let app = app_with(store.clone());

        let first = submit_and_follow(&app, JOHN).await;
        let second = submit_and_follow(&app, JOHN).await;

        assert_eq!(store.calls().len(), 2);
        assert!(first.contains("User id: 1"));
        assert!(second.contains("User id: 2"));
    }

    #[tokio::test]
    async fn flash_is_shown_only_once() {
        let app = app_with(Arc::default());
        let res = post_form(&app, JOHN).await;
        let cookie = flash_cookie(&res);

        let req = Request::get("/result")
            .header("cookie", &cookie)
            .body(Body::empty())
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let cleared = res
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.starts_with("flash=") && v.contains("Max-Age=0"));
        assert!(cleared);
    }

    #[tokio::test]
    async fn tampered_flash_cookie_is_ignored() {
        let app = app_with(Arc::default());
        let (status, html) =
            get_page(&app, "/result", Some("flash=forged-value")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!html.contains("<p class="));
    }
}
