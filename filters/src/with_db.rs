use db::Db;
use std::convert::Infallible;
use warp::Filter;

/// Hands every request its own handle on the shared database
pub fn with_db(db: Db) -> impl Filter<Extract = (Db,), Error = Infallible> + Clone {
    warp::any().map(move || db.clone())
}
