use std::convert::Infallible;

use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use super::{VIEWER_PAGE, handle_viewer_connection};
use crate::state::AppState;

/// `GET /` viewer page, `/ws` live connection, everything else rejected.
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let viewer = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::html(VIEWER_PAGE));

    let live = warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_state(state))
        .map(|ws: warp::ws::Ws, state: AppState| {
            ws.on_upgrade(move |socket| handle_viewer_connection(socket, state))
        });

    viewer.or(live).recover(handle_rejection)
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (message, status) = if err.is_not_found() {
        ("Not Found", StatusCode::NOT_FOUND)
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ("Method Not Allowed", StatusCode::METHOD_NOT_ALLOWED)
    } else {
        tracing::debug!("rejected request: {:?}", err);
        ("Bad Request", StatusCode::BAD_REQUEST)
    };
    Ok(warp::reply::with_status(message, status))
}
