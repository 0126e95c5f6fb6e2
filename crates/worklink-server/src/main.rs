use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use worklink_api::mail::{LogMailer, Mailer, SmtpMailer};
use worklink_api::middleware::require_auth;
use worklink_api::state::{AppState, AppStateInner};
use worklink_api::{applications, auth, follows, jobs, media, posts, profile};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worklink=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("WORKLINK_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("WORKLINK_DB_PATH").unwrap_or_else(|_| "worklink.db".into());
    let host = std::env::var("WORKLINK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("WORKLINK_PORT")
        .unwrap_or_else(|_| "8000".into())
        .parse()?;
    let media_dir =
        PathBuf::from(std::env::var("WORKLINK_MEDIA_DIR").unwrap_or_else(|_| "media".into()));

    // Init database
    let db = worklink_db::Database::open(&PathBuf::from(&db_path))?;

    // SMTP is optional; without it OTP mails are logged instead of sent.
    let mailer: Arc<dyn Mailer> = match smtp_config() {
        Some((server, user, pass, from)) => Arc::new(SmtpMailer::new(&server, &user, &pass, &from)?),
        None => {
            warn!("SMTP not configured, OTP emails will be logged only");
            Arc::new(LogMailer)
        }
    };

    let app_state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        mailer,
        media_dir,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/verify-email", post(auth::verify_email))
        .route("/auth/resend-otp", post(auth::resend_otp))
        .route("/auth/login", post(auth::login))
        .route("/auth/token/refresh", post(auth::refresh_token))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route(
            "/auth/verify-forgot-password",
            post(auth::verify_forgot_password),
        )
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/media/{file_id}", get(media::serve))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/auth/change-password", post(auth::change_password))
        .route(
            "/auth/profile",
            get(profile::get_profile)
                .put(profile::update_profile)
                .patch(profile::update_profile),
        )
        // Job catalog
        .route("/jobs/create", post(jobs::create_job))
        .route("/jobs/list", get(jobs::list_jobs))
        .route("/jobs/available", get(jobs::available_jobs))
        .route("/jobs/filters", get(jobs::filter_options))
        .route("/jobs/detail/{job_id}", get(jobs::job_detail))
        .route(
            "/jobs/update/{job_id}",
            put(jobs::update_job).patch(jobs::update_job),
        )
        .route("/jobs/delete/{job_id}", delete(jobs::delete_job))
        .route("/jobs/my-jobs", get(jobs::my_jobs))
        // Applications
        .route("/jobs/apply/{job_id}", post(applications::apply))
        .route("/jobs/my-applications", get(applications::my_applications))
        .route(
            "/jobs/applications-received",
            get(applications::applications_received),
        )
        .route(
            "/jobs/applications-received/{job_id}",
            get(applications::applications_for_job),
        )
        .route(
            "/jobs/application/{application_id}",
            get(applications::application_detail),
        )
        .route(
            "/jobs/application/{application_id}/update-status",
            patch(applications::update_status),
        )
        // Follow graph
        .route("/relationships/follow", post(follows::follow))
        .route("/relationships/unfollow/{user_id}", delete(follows::unfollow))
        .route("/relationships/followers", get(follows::my_followers))
        .route("/relationships/followers/{user_id}", get(follows::followers))
        .route("/relationships/following", get(follows::my_following))
        .route("/relationships/following/{user_id}", get(follows::following))
        .route("/relationships/stats/{user_id}", get(follows::stats))
        // Social feed
        .route("/feeds/create", post(posts::create_post))
        .route("/feeds/feed", get(posts::feed))
        .route(
            "/feeds/post/{post_id}",
            get(posts::post_detail)
                .put(posts::update_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/feeds/my-posts", get(posts::my_posts))
        .route("/feeds/user-posts/{user_id}", get(posts::user_posts))
        .route("/feeds/post/{post_id}/like", post(posts::toggle_like))
        .route(
            "/feeds/post/{post_id}/comments",
            get(posts::list_comments).post(posts::create_comment),
        )
        .route("/feeds/post/{post_id}/images", get(posts::post_images))
        .route("/feeds/image/{image_id}", delete(posts::delete_image))
        // Media upload. Axum's default 2 MB body limit would cut uploads off
        // before the handler's own size check; give the route headroom so the
        // handler decides and answers with the JSON envelope.
        .route(
            "/media",
            post(media::upload).layer(DefaultBodyLimit::max(media::MAX_MEDIA_SIZE + 1024)),
        )
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("WorkLink server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn smtp_config() -> Option<(String, String, String, String)> {
    let server = std::env::var("WORKLINK_SMTP_SERVER").ok()?;
    let user = std::env::var("WORKLINK_SMTP_USER").ok()?;
    let pass = std::env::var("WORKLINK_SMTP_PASSWORD").ok()?;
    let from = std::env::var("WORKLINK_SMTP_FROM").ok()?;
    Some((server, user, pass, from))
}
