// handlers/public/auth/mod.rs - Public authentication handlers
//
// Token acquisition endpoints that do not require authentication.

pub mod login; // POST /auth/login - authenticate and get JWT

pub use login::login_post as login;
