/// HTTP middleware utilities for the video catalog service
///
/// Caller identity arrives pre-verified from the API gateway as an
/// `X-User-Id` header; the extractor parses it into a typed id so
/// handlers never touch raw headers. Requests without a parseable
/// header are rejected before the handler runs.
use actix_web::{error::ErrorUnauthorized, Error, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

/// Caller identity taken from the `X-User-Id` request header.
#[derive(Debug, Clone, Copy)]
pub struct UserId(pub Uuid);

impl FromRequest for UserId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let parsed = req
            .headers()
            .get("X-User-Id")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ErrorUnauthorized("Missing X-User-Id header"))
            .and_then(|value| {
                Uuid::parse_str(value).map_err(|_| ErrorUnauthorized("Invalid X-User-Id header"))
            })
            .map(UserId);
        ready(parsed)
    }
}
