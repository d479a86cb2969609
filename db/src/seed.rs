use super::{
    models::{GeoPoint, LecturerInformations, StudentInformations, UserKind},
    username_from_name, Database, DbError, NewRoom, NewUser,
};
use rand::{self, Rng};

/// Every seeded account uses its username as password.
pub fn seed_db<D: Database>(db: &mut D) -> Result<(), DbError> {
    let users = test_users();
    let lecturers = test_lecturers();
    let students = test_students();

    db.seed(
        users
            .into_iter()
            .chain(lecturers.into_iter())
            .chain(students.into_iter()),
        test_rooms().into_iter(),
    )
}

fn test_users() -> Vec<NewUser> {
    vec![
        NewUser {
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            password: "user.admin".to_string(),
            kind: UserKind::Administrator,
        },
        NewUser {
            first_name: "Lecturer".to_string(),
            last_name: "User".to_string(),
            password: "user.lecturer".to_string(),
            kind: UserKind::Lecturer(LecturerInformations {
                phone_number: Some(random_phone_number(rand::thread_rng())),
                email: Some("lecturer@university.edu".to_string()),
            }),
        },
    ]
}

fn test_lecturers() -> Vec<NewUser> {
    let names = [("Ada", "Lovelace"), ("Alan", "Turing"), ("Grace", "Hopper")];
    let mut rng = rand::thread_rng();

    names
        .iter()
        .map(|(first_name, last_name)| {
            let username = username_from_name(first_name, last_name);

            NewUser {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                kind: UserKind::Lecturer(LecturerInformations {
                    phone_number: Some(random_phone_number(&mut rng)),
                    email: Some(format!("{}@university.edu", username)),
                }),
                password: username,
            }
        })
        .collect()
}

fn test_students() -> Vec<NewUser> {
    let names = [("Student", "User"), ("Linus", "Torvalds")];

    names
        .iter()
        .enumerate()
        .map(|(i, (first_name, last_name))| NewUser {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password: username_from_name(first_name, last_name),
            kind: UserKind::Student(StudentInformations {
                student_number: format!("2100{:04}", i + 1),
            }),
        })
        .collect()
}

fn test_rooms() -> Vec<NewRoom> {
    vec![
        NewRoom {
            name: "Seminar Room A".to_string(),
            capacity: 40,
            location: Some(GeoPoint {
                latitude: -7.2756,
                longitude: 112.7938,
            }),
            radius_meters: None,
        },
        NewRoom {
            name: "Seminar Room B".to_string(),
            capacity: 25,
            location: Some(GeoPoint {
                latitude: -7.2793,
                longitude: 112.7970,
            }),
            radius_meters: None,
        },
        NewRoom {
            name: "Auditorium".to_string(),
            capacity: 200,
            location: None,
            radius_meters: None,
        },
    ]
}

/// Generates a random mobile phone number, with a prefix of 0[6-7]
fn random_phone_number(mut rng: impl Rng) -> String {
    (0..10)
        .map(|i| {
            format!(
                "{}",
                if i == 0 {
                    0
                } else if i == 1 {
                    rng.gen_range(6..8)
                } else {
                    rng.gen_range(0..10)
                }
            )
        })
        .collect()
}
