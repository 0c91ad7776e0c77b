use http::{Method, StatusCode};
use serde_json::{json, Value};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::router::{RouteMatch, Router, WaxRoute};
use crate::server::{JsonObject, ProtocolError, RequestBody, RequestHead, ShutdownSignal};
use crate::store::{Item, Repository, SessionData, ID_FIELD};

pub const NEW_SESSION_KIND: &str = "wax#waxNewSession";
pub const REMOVE_SESSION_KIND: &str = "wax#waxRemoveSession";
pub const LIST_KIND: &str = "wax#waxList";

/// Pause after a successful insert, before the response is written.
///
/// Gives client libraries a slow endpoint to exercise their request timeouts
/// against.
pub const INSERT_DELAY: Duration = Duration::from_millis(3);

/// Body of a [`HandlerResponse`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

/// Status and body produced by the dispatcher for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, etc.)
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl HandlerResponse {
    /// Create a JSON response
    #[must_use]
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: ResponseBody::Json(body),
        }
    }

    /// Create an error response: `{"message": .., "code": ..}`
    #[must_use]
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::json(
            status,
            json!({ "message": message, "code": status.as_u16() }),
        )
    }

    /// Create a plain-text response
    #[must_use]
    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        Self {
            status,
            body: ResponseBody::Text(text.into()),
        }
    }

    /// `204 No Content`
    #[must_use]
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: ResponseBody::Empty,
        }
    }

    /// JSON body, if this is a JSON response.
    #[must_use]
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Routes a parsed request to the repository operation it names.
///
/// The dispatcher is shared by every connection coroutine; all mutable state
/// lives behind the [`Repository`] locks and the [`ShutdownSignal`] atomics.
pub struct Dispatcher {
    router: Router,
    repository: Arc<Repository>,
    shutdown: Arc<ShutdownSignal>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(repository: Arc<Repository>) -> Self {
        Self {
            router: Router::new(),
            repository,
            shutdown: Arc::new(ShutdownSignal::new()),
        }
    }

    #[must_use]
    pub fn repository(&self) -> &Arc<Repository> {
        &self.repository
    }

    #[must_use]
    pub fn shutdown_signal(&self) -> &Arc<ShutdownSignal> {
        &self.shutdown
    }

    #[must_use]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.is_requested()
    }

    /// Handle one request.
    ///
    /// Client mistakes become error responses. `Err` is returned only when the
    /// request body cannot be framed, in which case no response is owed.
    pub fn dispatch<R: BufRead>(
        &self,
        head: &RequestHead,
        body: &mut RequestBody<'_, R>,
    ) -> Result<HandlerResponse, ProtocolError> {
        let Some(route) = self.router.route(&head.path) else {
            debug!(method = %head.method, path = %head.path, "No route matched");
            return Ok(HandlerResponse::error(
                StatusCode::NOT_FOUND,
                "URL Not Available",
            ));
        };
        if !route.allows(&head.method) {
            debug!(
                method = %head.method,
                route = %route.route,
                "Method not supported on route"
            );
            return Ok(HandlerResponse::error(
                StatusCode::METHOD_NOT_ALLOWED,
                "Unhandled method",
            ));
        }

        match route.route {
            WaxRoute::Quit => Ok(self.quit()),
            WaxRoute::NewSession => self.new_session(body),
            WaxRoute::RemoveSession => self.remove_session(body),
            WaxRoute::SessionItems => self.session_items(&head.method, &route, body),
            WaxRoute::Item => self.item(&head.method, &route, body),
        }
    }

    fn quit(&self) -> HandlerResponse {
        if self.shutdown.request() {
            info!("Shutdown requested");
        }
        HandlerResponse::text(StatusCode::OK, "BYE")
    }

    fn new_session<R: BufRead>(
        &self,
        body: &mut RequestBody<'_, R>,
    ) -> Result<HandlerResponse, ProtocolError> {
        let Some(payload) = body.json()? else {
            return Ok(invalid_json());
        };
        let Some(name) = payload.get("sessionName").and_then(Value::as_str) else {
            return Ok(HandlerResponse::error(
                StatusCode::BAD_REQUEST,
                "JSON missing sessionName",
            ));
        };
        let session_id = self.repository.new_identifier(name);
        info!(session_id = %session_id, "Session created");
        Ok(HandlerResponse::json(
            StatusCode::OK,
            json!({ "kind": NEW_SESSION_KIND, "newSessionId": session_id }),
        ))
    }

    fn remove_session<R: BufRead>(
        &self,
        body: &mut RequestBody<'_, R>,
    ) -> Result<HandlerResponse, ProtocolError> {
        let Some(payload) = body.json()? else {
            return Ok(invalid_json());
        };
        let Some(session_id) = payload.get("sessionId").and_then(Value::as_str) else {
            return Ok(HandlerResponse::error(
                StatusCode::BAD_REQUEST,
                "JSON missing sessionId",
            ));
        };
        if self.repository.remove_identifier(session_id).is_none() {
            return Ok(HandlerResponse::error(
                StatusCode::NOT_FOUND,
                "Unknown sessionId",
            ));
        }
        info!(session_id = %session_id, "Session removed");
        Ok(HandlerResponse::json(
            StatusCode::OK,
            json!({ "kind": REMOVE_SESSION_KIND, "removeSessionId": session_id }),
        ))
    }

    fn session(&self, route: &RouteMatch) -> Option<Arc<SessionData>> {
        route
            .get_path_param("sessionId")
            .and_then(|id| self.repository.get_session_data(id))
    }

    fn session_items<R: BufRead>(
        &self,
        method: &Method,
        route: &RouteMatch,
        body: &mut RequestBody<'_, R>,
    ) -> Result<HandlerResponse, ProtocolError> {
        let Some(session) = self.session(route) else {
            return Ok(unknown_session());
        };

        if *method == Method::GET {
            let items = session.get_all_items_copy();
            return Ok(HandlerResponse::json(
                StatusCode::OK,
                json!({ "kind": LIST_KIND, "items": items }),
            ));
        }

        let Some(payload) = body.json()? else {
            return Ok(invalid_json());
        };
        let Some(item_id) = payload_id(&payload) else {
            return Ok(HandlerResponse::error(
                StatusCode::BAD_REQUEST,
                "JSON missing id",
            ));
        };
        let item_id = item_id.to_string();
        match session.add_new_item(&item_id, Item::from(payload)) {
            Some(stored) => {
                may::coroutine::sleep(INSERT_DELAY);
                debug!(item_id = %item_id, "Item inserted");
                Ok(HandlerResponse::json(StatusCode::OK, stored.into_value()))
            }
            None => Ok(HandlerResponse::error(
                StatusCode::FORBIDDEN,
                "Item already exists",
            )),
        }
    }

    fn item<R: BufRead>(
        &self,
        method: &Method,
        route: &RouteMatch,
        body: &mut RequestBody<'_, R>,
    ) -> Result<HandlerResponse, ProtocolError> {
        let Some(session) = self.session(route) else {
            return Ok(unknown_session());
        };
        let item_id = route.get_path_param("itemId").unwrap_or_default();

        if *method == Method::GET {
            return Ok(match session.get_item_copy(item_id) {
                Some(item) => HandlerResponse::json(StatusCode::OK, item.into_value()),
                None => HandlerResponse::error(StatusCode::NOT_FOUND, "Unknown item"),
            });
        }
        if *method == Method::DELETE {
            return Ok(match session.delete_item(item_id) {
                Some(_) => HandlerResponse::no_content(),
                None => unknown_item_in_session(),
            });
        }

        let Some(payload) = body.json()? else {
            return Ok(invalid_json());
        };
        if *method == Method::PATCH {
            return Ok(match session.patch_item(item_id, &Item::from(payload)) {
                Some(item) => HandlerResponse::json(StatusCode::OK, item.into_value()),
                None => unknown_item_in_session(),
            });
        }

        // PUT
        if let Some(body_id) = payload.get(ID_FIELD) {
            if body_id.as_str() != Some(item_id) {
                return Ok(HandlerResponse::error(
                    StatusCode::BAD_REQUEST,
                    "Mismatched item ids",
                ));
            }
        }
        let stored = session.replace_item(item_id, Item::from(payload));
        Ok(HandlerResponse::json(StatusCode::OK, stored.into_value()))
    }
}

fn payload_id(payload: &JsonObject) -> Option<&str> {
    payload
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

fn invalid_json() -> HandlerResponse {
    HandlerResponse::error(StatusCode::BAD_REQUEST, "Invalid JSON")
}

fn unknown_session() -> HandlerResponse {
    HandlerResponse::error(StatusCode::NOT_FOUND, "Unknown sessionId")
}

fn unknown_item_in_session() -> HandlerResponse {
    HandlerResponse::error(StatusCode::NOT_FOUND, "Unknown item in session")
}
