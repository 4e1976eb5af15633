// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth, /auth/*) → Protected (JWT auth + validated user, /api/*)
pub mod extract;
pub mod protected;
pub mod public;
