use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::error::ApiError;
use super::queue::{QueuePolicy, RequestQueue};
use super::transport::{ApiRequest, HttpTransport};
use crate::config::ApiConfig;
use crate::db::{
    self,
    repository::{ApiCacheRepo, MetaRepo, KEY_AUTH_TOKEN, KEY_AUTH_USER},
    SharedConn,
};
use crate::models::{
    Ack, AiDua, AuthResponse, Category, ContactMessage, Dua, Favorite, Subcategory, User,
};

const CACHE_CATEGORIES: &str = "categories";
const CACHE_SUBCATEGORIES: &str = "subcategories";

/// Where a list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Live,
    /// The backend was unreachable; this is the last copy that was fetched.
    Cached,
}

#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub data: T,
    pub freshness: Freshness,
}

/// The backend sends lists either bare or wrapped in `{ "data": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

/// `GET /api/duas/:id` answers with one dua or with all duas of a subcategory.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(ListBody<T>),
    One(T),
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn decode_list<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, ApiError> {
    Ok(match decode::<ListBody<T>>(body)? {
        ListBody::Bare(v) | ListBody::Wrapped { data: v } => v,
    })
}

/// Acknowledgements may come back as 204 or with an empty body.
fn decode_ack(body: &str) -> Result<Ack, ApiError> {
    if body.trim().is_empty() {
        return Ok(Ack::default());
    }
    decode(body)
}

fn storage(e: anyhow::Error) -> ApiError {
    ApiError::Storage(format!("{:#}", e))
}

/// Typed access to the dua backend. Every call goes through the request queue.
#[derive(Clone)]
pub struct ApiClient {
    queue: RequestQueue,
    conn: SharedConn,
}

impl ApiClient {
    pub fn new(queue: RequestQueue, conn: SharedConn) -> Self {
        Self { queue, conn }
    }

    pub fn from_config(api: &ApiConfig, conn: SharedConn) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(&api.base_url, Duration::from_secs(api.timeout_secs))?;
        let queue = RequestQueue::new(Arc::new(transport), QueuePolicy::from(api));
        Ok(Self::new(queue, conn))
    }

    // ─── Library ────────────────────────────────────────────────────────────

    pub async fn categories(&self) -> Result<Fetched<Vec<Category>>, ApiError> {
        self.cached_list(CACHE_CATEGORIES, "/api/categories").await
    }

    /// All subcategories, or only those of `category_id`.
    pub async fn subcategories(
        &self,
        category_id: Option<&str>,
    ) -> Result<Fetched<Vec<Subcategory>>, ApiError> {
        let mut fetched: Fetched<Vec<Subcategory>> = self
            .cached_list(CACHE_SUBCATEGORIES, "/api/subcategories")
            .await?;
        if let Some(id) = category_id {
            fetched
                .data
                .retain(|s| s.category_id.as_deref() == Some(id));
        }
        Ok(fetched)
    }

    pub async fn duas(&self, id: &str) -> Result<Vec<Dua>, ApiError> {
        let res = self
            .queue
            .enqueue(ApiRequest::get(format!("/api/duas/{}", id)))
            .await?;
        Ok(match decode::<OneOrMany<Dua>>(&res.body)? {
            OneOrMany::Many(ListBody::Bare(v)) | OneOrMany::Many(ListBody::Wrapped { data: v }) => v,
            OneOrMany::One(d) => vec![d],
        })
    }

    pub async fn ask(&self, query: &str) -> Result<AiDua, ApiError> {
        let res = self
            .queue
            .enqueue(ApiRequest::post("/api/gemini/dua", json!({ "prompt": query })))
            .await?;
        decode(&res.body)
    }

    pub async fn contact(&self, message: &ContactMessage) -> Result<Ack, ApiError> {
        let body = serde_json::to_value(message).map_err(|e| ApiError::Decode(e.to_string()))?;
        let res = self
            .queue
            .enqueue(ApiRequest::post("/api/contact", body))
            .await?;
        decode_ack(&res.body)
    }

    // ─── Favorites (signed in) ──────────────────────────────────────────────

    pub async fn favorites(&self) -> Result<Vec<Favorite>, ApiError> {
        let token = self.require_token()?;
        let res = self
            .queue
            .enqueue(ApiRequest::get("/api/favorites").with_bearer(Some(token)))
            .await?;
        decode_list(&res.body)
    }

    pub async fn add_favorite(&self, dua_id: &str) -> Result<Ack, ApiError> {
        let token = self.require_token()?;
        let res = self
            .queue
            .enqueue(
                ApiRequest::post("/api/favorites", json!({ "duaId": dua_id }))
                    .with_bearer(Some(token)),
            )
            .await?;
        decode_ack(&res.body)
    }

    pub async fn remove_favorite(&self, dua_id: &str) -> Result<Ack, ApiError> {
        let token = self.require_token()?;
        let res = self
            .queue
            .enqueue(
                ApiRequest::delete("/api/favorites", json!({ "duaId": dua_id }))
                    .with_bearer(Some(token)),
            )
            .await?;
        decode_ack(&res.body)
    }

    // ─── Auth ───────────────────────────────────────────────────────────────

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = json!({ "name": name, "email": email, "password": password });
        self.authenticate("/api/auth/signup", body).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = json!({ "email": email, "password": password });
        self.authenticate("/api/auth/login", body).await
    }

    /// Forget the stored session. Purely local.
    pub fn logout(&self) -> Result<(), ApiError> {
        let conn = db::lock(&self.conn).map_err(storage)?;
        MetaRepo::delete(&conn, KEY_AUTH_TOKEN).map_err(storage)?;
        MetaRepo::delete(&conn, KEY_AUTH_USER).map_err(storage)?;
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> Result<Ack, ApiError> {
        self.post_ack("/api/auth/forgot-password", json!({ "email": email }))
            .await
    }

    pub async fn verify_reset_code(&self, email: &str, code: &str) -> Result<Ack, ApiError> {
        self.post_ack(
            "/api/auth/verify-reset-code",
            json!({ "email": email, "code": code }),
        )
        .await
    }

    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<Ack, ApiError> {
        self.post_ack(
            "/api/auth/reset-password",
            json!({ "email": email, "code": code, "newPassword": new_password }),
        )
        .await
    }

    pub fn current_user(&self) -> Result<Option<User>, ApiError> {
        let conn = db::lock(&self.conn).map_err(storage)?;
        match MetaRepo::get(&conn, KEY_AUTH_USER).map_err(storage)? {
            Some(raw) => Ok(Some(decode(&raw)?)),
            None => Ok(None),
        }
    }

    // ─── Internals ──────────────────────────────────────────────────────────

    async fn authenticate(&self, path: &str, body: serde_json::Value) -> Result<AuthResponse, ApiError> {
        let res = self.queue.enqueue(ApiRequest::post(path, body)).await?;
        let auth: AuthResponse = decode(&res.body)?;

        let conn = db::lock(&self.conn).map_err(storage)?;
        MetaRepo::set(&conn, KEY_AUTH_TOKEN, &auth.token).map_err(storage)?;
        if let Some(user) = &auth.user {
            let raw = serde_json::to_string(user).map_err(|e| ApiError::Decode(e.to_string()))?;
            MetaRepo::set(&conn, KEY_AUTH_USER, &raw).map_err(storage)?;
        }
        Ok(auth)
    }

    async fn post_ack(&self, path: &str, body: serde_json::Value) -> Result<Ack, ApiError> {
        let res = self.queue.enqueue(ApiRequest::post(path, body)).await?;
        decode_ack(&res.body)
    }

    fn require_token(&self) -> Result<String, ApiError> {
        let conn = db::lock(&self.conn).map_err(storage)?;
        MetaRepo::get(&conn, KEY_AUTH_TOKEN)
            .map_err(storage)?
            .ok_or(ApiError::Unauthorized)
    }

    /// Fetch a list, refreshing its cached copy. When the backend cannot be
    /// reached or answers with something unusable, the cached copy is
    /// returned instead.
    async fn cached_list<T: DeserializeOwned>(
        &self,
        cache_key: &str,
        path: &str,
    ) -> Result<Fetched<Vec<T>>, ApiError> {
        let live = async {
            let res = self.queue.enqueue(ApiRequest::get(path)).await?;
            let data = decode_list::<T>(&res.body)?;
            Ok::<_, ApiError>((data, res.body))
        }
        .await;

        match live {
            Ok((data, body)) => {
                let conn = db::lock(&self.conn).map_err(storage)?;
                if let Err(e) = ApiCacheRepo::put(&conn, cache_key, &body) {
                    warn!("could not cache {}: {:#}", cache_key, e);
                }
                Ok(Fetched {
                    data,
                    freshness: Freshness::Live,
                })
            }
            Err(e) if e.allows_cached_fallback() => {
                let cached = {
                    let conn = db::lock(&self.conn).map_err(storage)?;
                    ApiCacheRepo::get(&conn, cache_key).map_err(storage)?
                };
                match cached {
                    Some(body) => {
                        debug!("{} failed ({}), serving cached {}", path, e, cache_key);
                        Ok(Fetched {
                            data: decode_list(&body)?,
                            freshness: Freshness::Cached,
                        })
                    }
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::{ApiResponse, Transport};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns canned bodies by path, or a transport failure when offline.
    /// `forced` replaces every answer while set.
    struct CannedTransport {
        online: Mutex<bool>,
        forced: Mutex<Option<(u16, String)>>,
        seen: Mutex<Vec<ApiRequest>>,
    }

    impl CannedTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                online: Mutex::new(true),
                forced: Mutex::new(None),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn force(&self, status: u16, body: &str) {
            *self.forced.lock().unwrap() = Some((status, body.to_string()));
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
            self.seen.lock().unwrap().push(request.clone());
            if !*self.online.lock().unwrap() {
                return Err(ApiError::Transport("connection refused".to_string()));
            }
            if let Some((status, body)) = self.forced.lock().unwrap().clone() {
                return Ok(ApiResponse { status, body });
            }
            let (status, body) = match request.path.as_str() {
                "/api/categories" => (200, r#"[{"_id":"c1","name":"Morning"}]"#),
                "/api/subcategories" => (
                    200,
                    r#"{"data":[{"_id":"s1","name":"Waking","categoryId":"c1"},
                               {"_id":"s2","name":"Travel","categoryId":"c2"}]}"#,
                ),
                "/api/duas/s1" => (200, r#"[{"_id":"d1","arabic":"الحمد لله"}]"#),
                "/api/auth/login" => (
                    200,
                    r#"{"token":"t0k3n","user":{"_id":"u1","email":"a@b.c"}}"#,
                ),
                "/api/favorites" => (200, r#"[{"_id":"f1","duaId":"d1"}]"#),
                "/api/gemini/dua" => (200, r#"{"translation":"O Allah, ease it"}"#),
                _ => (404, r#"{"message":"not found"}"#),
            };
            Ok(ApiResponse {
                status,
                body: body.to_string(),
            })
        }
    }

    fn client(transport: Arc<CannedTransport>) -> ApiClient {
        let policy = QueuePolicy {
            min_interval: Duration::ZERO,
            cooldown: Duration::ZERO,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            max_retries: 1,
        };
        ApiClient::new(RequestQueue::new(transport, policy), db::test_conn())
    }

    #[tokio::test]
    async fn falls_back_to_cached_categories_when_offline() {
        let transport = CannedTransport::new();
        let api = client(transport.clone());

        let live = api.categories().await.unwrap();
        assert_eq!(live.freshness, Freshness::Live);
        assert_eq!(live.data[0].name, "Morning");

        *transport.online.lock().unwrap() = false;
        let cached = api.categories().await.unwrap();
        assert_eq!(cached.freshness, Freshness::Cached);
        assert_eq!(cached.data, live.data);
    }

    #[tokio::test]
    async fn server_errors_and_garbage_fall_back_to_cache() {
        let transport = CannedTransport::new();
        let api = client(transport.clone());
        let live = api.subcategories(None).await.unwrap();
        assert_eq!(live.freshness, Freshness::Live);

        transport.force(503, "Service Unavailable");
        let cached = api.subcategories(Some("c1")).await.unwrap();
        assert_eq!(cached.freshness, Freshness::Cached);
        assert_eq!(cached.data.len(), 1);

        transport.force(200, "<html>bad gateway</html>");
        let cached = api.subcategories(None).await.unwrap();
        assert_eq!(cached.freshness, Freshness::Cached);
        assert_eq!(cached.data, live.data);
    }

    #[tokio::test]
    async fn garbage_without_cache_is_a_decode_error() {
        let transport = CannedTransport::new();
        transport.force(200, "<html>bad gateway</html>");
        let api = client(transport);
        assert!(matches!(api.categories().await, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn empty_acknowledgements_are_success() {
        let transport = CannedTransport::new();
        let api = client(transport.clone());
        api.login("a@b.c", "secret").await.unwrap();

        transport.force(204, "");
        let ack = api.remove_favorite("d1").await.unwrap();
        assert_eq!(ack.message, None);
        assert!(api.forgot_password("a@b.c").await.is_ok());

        transport.force(200, "  ");
        let msg = ContactMessage {
            name: "Amina".to_string(),
            email: "a@b.c".to_string(),
            message: "Jazakallah khair".to_string(),
        };
        assert!(api.contact(&msg).await.is_ok());
    }

    #[tokio::test]
    async fn offline_without_cache_is_an_error() {
        let transport = CannedTransport::new();
        *transport.online.lock().unwrap() = false;
        let api = client(transport);
        assert!(matches!(api.categories().await, Err(ApiError::Transport(_))));
    }

    #[tokio::test]
    async fn filters_subcategories_by_category() {
        let api = client(CannedTransport::new());
        let subs = api.subcategories(Some("c1")).await.unwrap();
        assert_eq!(subs.data.len(), 1);
        assert_eq!(subs.data[0].id, "s1");
    }

    #[tokio::test]
    async fn favorites_need_a_session_and_send_the_token() {
        let transport = CannedTransport::new();
        let api = client(transport.clone());

        assert_eq!(api.favorites().await.unwrap_err(), ApiError::Unauthorized);

        let auth = api.login("a@b.c", "secret").await.unwrap();
        assert_eq!(auth.token, "t0k3n");
        assert_eq!(api.current_user().unwrap().unwrap().email, "a@b.c");

        let favs = api.favorites().await.unwrap();
        assert_eq!(favs[0].dua_id, "d1");
        let last = transport.seen.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.bearer.as_deref(), Some("t0k3n"));

        api.logout().unwrap();
        assert_eq!(api.favorites().await.unwrap_err(), ApiError::Unauthorized);
    }

    #[tokio::test]
    async fn decodes_duas_and_ai_answers() {
        let api = client(CannedTransport::new());
        let duas = api.duas("s1").await.unwrap();
        assert_eq!(duas[0].arabic.as_deref(), Some("الحمد لله"));

        let answer = api.ask("exam stress").await.unwrap();
        assert_eq!(answer.translation.as_deref(), Some("O Allah, ease it"));
    }

    #[tokio::test]
    async fn unknown_paths_surface_http_errors() {
        let api = client(CannedTransport::new());
        assert!(matches!(
            api.duas("nope").await,
            Err(ApiError::Http { status: 404, .. })
        ));
    }
}
