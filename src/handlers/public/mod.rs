// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition. No user context; every input is validated here.
pub mod auth;
