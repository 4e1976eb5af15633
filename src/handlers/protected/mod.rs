// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route prefix /api/*. Every handler receives the ValidatedUser injected by
// the middleware and asks the access policy before touching a record.
pub mod auth;
pub mod classes;
pub mod dashboard;
pub mod grades;
pub mod students;
pub mod subjects;
pub mod teachers;
pub mod users;
pub mod utils;
