pub mod class_room;
pub mod grade;
pub mod student;
pub mod subject;
pub mod teacher;
pub mod user;

pub use class_room::ClassRoom;
pub use grade::{Grade, GradeView};
pub use student::{Student, StudentView};
pub use subject::Subject;
pub use teacher::TeacherProfile;
pub use user::{User, UserView};

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::database::Table;

/// A typed row stored in one of the EduTrack tables
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const TABLE: Table;

    fn id(&self) -> Uuid;
}
