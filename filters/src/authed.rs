use crate::with_db;
use db::models::UserKind;
use db::Database;
use db::Db;

use warp::{Filter, Rejection};

/// Filter that checks if the user is authenticated or not, and rejects the request if they aren't
pub fn authed(db: &Db) -> impl Filter<Extract = (Caller,), Error = Rejection> + Clone {
    with_db(db.clone())
        .and(warp::header::optional::<String>("Authorization"))
        .and_then(guard)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Administrator,
    Lecturer,
    Student,
}

impl From<&UserKind> for Role {
    fn from(kind: &UserKind) -> Self {
        match kind {
            UserKind::Administrator => Role::Administrator,
            UserKind::Lecturer(_) => Role::Lecturer,
            UserKind::Student(_) => Role::Student,
        }
    }
}

/// The authenticated user behind a request
#[derive(Clone, Copy, Debug)]
pub struct Caller {
    pub id: u32,
    pub role: Role,
}

impl Caller {
    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}

/// Filters that checks if the user is of one of the requested roles, and rejects the request if
/// they don't have the authorization ; also checks if the user is authenticated.
pub fn authed_is_of_kind(
    db: &Db,
    roles: &'static [Role],
) -> impl Filter<Extract = (Caller,), Error = Rejection> + Clone {
    authed(db).and_then(move |caller: Caller| async move {
        if roles.contains(&caller.role) {
            Ok(caller)
        } else {
            Err(warp::reject::custom(Unauthorized))
        }
    })
}

#[derive(Debug)]
pub struct Forbidden;

impl warp::reject::Reject for Forbidden {}

#[derive(Debug)]
pub struct Unauthorized;

impl warp::reject::Reject for Unauthorized {}

async fn guard(db: Db, authorization: Option<String>) -> Result<Caller, Rejection> {
    let authorization = match authorization {
        Some(authorization) => authorization,
        None => return Err(warp::reject::custom(Forbidden)),
    };

    let (auth_type, token) = {
        let mut parts = authorization.splitn(2, ' ');
        (parts.next().unwrap_or(""), parts.next().unwrap_or(""))
    };

    if !auth_type.eq_ignore_ascii_case("bearer") {
        return Err(warp::reject::custom(Forbidden));
    }

    let db = db.lock().await;

    match db.auth_get_user(token) {
        Some(user) => Ok(Caller {
            id: user.id,
            role: Role::from(&user.kind),
        }),
        None => Err(warp::reject::custom(Forbidden)),
    }
}
