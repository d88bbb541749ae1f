use std::convert::Infallible;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePool;
use tracing::{error, info, warn};
use warp::reply::Reply;
use warp::{http, Filter};

use crate::db::{self, USERS_KEY};

/// Bodies larger than this are refused before they are parsed.
const MAX_BODY: u64 = 1024 * 1024 * 4;

/// What the gateway stores: an opaque array of users plus its version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    pub version: u64,
    pub users: Value,
}

fn json_body_blob() -> impl Filter<Extract = (Blob,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY).and(warp::body::json())
}

fn with_pool(pool: SqlitePool) -> impl Filter<Extract = (SqlitePool,), Error = Infallible> + Clone {
    warp::any().map(move || pool.clone())
}

// Filters
pub fn get_users(pool: SqlitePool) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "users")
        .and(warp::get())
        .and(with_pool(pool))
        .and_then(read_users)
}

pub fn post_users(pool: SqlitePool) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "users")
        .and(warp::post())
        .and(json_body_blob())
        .and(with_pool(pool))
        .and_then(write_users)
}

pub fn routes(pool: SqlitePool) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    get_users(pool.clone())
        .or(post_users(pool))
        .with(warp::log("timeclock::api"))
}

// Handlers
async fn read_users(pool: SqlitePool) -> Result<warp::reply::Response, Infallible> {
    let empty = || warp::reply::json(&Vec::<Value>::new()).into_response();

    let record = match db::read_value(&pool, USERS_KEY).await {
        Ok(Some(record)) => record,
        Ok(None) => return Ok(empty()),
        Err(e) => {
            error!(error = ?e, "KV GET error");
            return Ok(empty());
        }
    };

    match serde_json::from_str::<Value>(&record.value) {
        Ok(users) => Ok(warp::reply::json(&Blob {
            version: record.version,
            users,
        })
        .into_response()),
        Err(e) => {
            error!(error = %e, "stored users are not valid json");
            Ok(empty())
        }
    }
}

async fn write_users(blob: Blob, pool: SqlitePool) -> Result<warp::reply::Response, Infallible> {
    if !blob.users.is_array() {
        return Ok(warp::reply::with_status(
            warp::reply::json(&json!({ "ok": false, "error": "users must be an array" })),
            http::StatusCode::BAD_REQUEST,
        )
        .into_response());
    }

    match db::write_value(&pool, USERS_KEY, &blob.users.to_string(), blob.version).await {
        Ok(true) => {
            info!(version = blob.version, "users stored");
            Ok(warp::reply::json(&json!({ "ok": true })).into_response())
        }
        Ok(false) => {
            warn!(version = blob.version, "stale users snapshot rejected");
            Ok(warp::reply::with_status(
                warp::reply::json(&json!({ "ok": false, "error": "stale version" })),
                http::StatusCode::CONFLICT,
            )
            .into_response())
        }
        Err(e) => {
            error!(error = ?e, "KV SET error");
            Ok(warp::reply::with_status(
                warp::reply::json(&json!({ "ok": false })),
                http::StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response())
        }
    }
}
