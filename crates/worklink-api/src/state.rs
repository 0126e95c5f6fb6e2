use std::path::PathBuf;
use std::sync::Arc;

use worklink_db::Database;

use crate::mail::Mailer;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub mailer: Arc<dyn Mailer>,
    /// Directory backing the media upload/serve endpoints.
    pub media_dir: PathBuf,
}
