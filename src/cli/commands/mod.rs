pub mod init;
pub mod policy;
pub mod user;
