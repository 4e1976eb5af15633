use std::sync::Arc;
use uuid::Uuid;

use crate::database::models::{Student, User};
use crate::database::{DatabaseError, Link, Repository, Store, Table};
use crate::filter::Filter;
use crate::policy::{Actor, Field, Predicate, Scope};
use crate::types::Role;

/// Loads the relationships the access policy consults for a user
pub struct ActorService {
    store: Arc<dyn Store>,
}

impl ActorService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, user: &User) -> Result<Actor, DatabaseError> {
        let actor = Actor::new(user.id, user.name.clone(), user.role);
        Ok(match user.role {
            Role::Admin => actor,
            Role::Teacher => {
                let subjects = self.store.linked_records(Link::SubjectTeachers, user.id).await?;
                actor.with_assigned_subjects(subjects)
            }
            Role::Parent => {
                let children = self.store.linked_records(Link::Guardians, user.id).await?;
                actor.with_children(children)
            }
            Role::Student => actor.with_student(self.matching_student(&user.name).await?),
        })
    }

    /// Student records carry no user link; a student user is the first
    /// record (oldest first) whose name equals the user's display name.
    async fn matching_student(&self, name: &str) -> Result<Option<Uuid>, DatabaseError> {
        let filter = Filter::new(Table::Students)
            .with_scope(Scope::only(Predicate::eq_text(Field::Name, name)))
            .limit(1);
        let students = Repository::<Student>::new(self.store.clone()).select_any(&filter).await?;
        Ok(students.first().map(|s| s.id))
    }
}
