use std::{collections::HashMap, convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use gradebook_auth::{
    build_login_route, handle_auth_errors, with_auth, Auth, AuthConfig, Claims, CredentialStore,
    SecretKey,
};
use serde::Serialize;
use warp::{path, Filter, Rejection, Reply};

#[derive(Clone, Serialize)]
struct Student {
    sid: String,
    name: String,
    credits: u32,
    gpa: f64,
}

type StudentDb = Arc<HashMap<String, Student>>;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let students: StudentDb = Arc::new(
        [
            ("1234", "Mikko", 80, 4.2),
            ("5432", "Matti", 120, 3.5),
            ("8576", "Jack", 125, 2.9),
        ]
        .into_iter()
        .map(|(sid, name, credits, gpa)| {
            (
                sid.to_owned(),
                Student {
                    sid: sid.to_owned(),
                    name: name.to_owned(),
                    credits,
                    gpa,
                },
            )
        })
        .collect(),
    );

    let config = AuthConfig {
        credentials: CredentialStore::new().with_user(
            "admin",
            "banana-monkey",
            &["1234", "5432", "8576"],
        ),
        secret: SecretKey::generate(),
        token_lifetime: Some(Duration::from_secs(60 * 60)),
    };

    let auth = Auth::new(config);

    let login = build_login_route(&auth);

    let index = warp::path::end().and(warp::get()).then(|| async {
        warp::reply::html(
            "<h1>student records</h1>\
             <p>POST /login with <code>user</code> and <code>password</code>, \
             then GET /students with the returned bearer token.</p>",
        )
    });

    let list_students = path!("students")
        .and(warp::get())
        .and(with_auth(&auth))
        .then(|claims: Claims| async move { warp::reply::json(&claims.students) });

    let student_detail = path!("students" / String)
        .and(warp::get())
        .and(with_auth(&auth))
        .and(with_db(students.clone()))
        .and_then(student_detail);

    let all_routes = index
        .or(login)
        .or(list_students)
        .or(student_detail)
        .recover(handle_auth_errors);

    warp::serve(all_routes)
        .run("127.0.0.1:8888".parse::<SocketAddr>().unwrap())
        .await;
}

async fn student_detail(
    sid: String,
    claims: Claims,
    db: StudentDb,
) -> Result<impl Reply, Rejection> {
    // records outside the session's scope read as absent
    if !claims.students.contains(&sid) {
        return Err(warp::reject::not_found());
    }

    match db.get(&sid) {
        Some(student) => Ok(warp::reply::json(student)),
        None => Err(warp::reject::not_found()),
    }
}

fn with_db(db: StudentDb) -> impl Filter<Extract = (StudentDb,), Error = Infallible> + Clone {
    warp::any().map(move || db.clone())
}
