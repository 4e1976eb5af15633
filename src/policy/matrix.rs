//! Tabulates the policy for inspection (`edutrack policy matrix`).
//!
//! Targeted actions are evaluated twice: against records tied to the actor
//! ("own": created by, graded by, assigned to, child of, member = self) and
//! against records tied to somebody else ("other").

use serde::Serialize;
use uuid::Uuid;

use super::{AccessPolicy, Actor, Decision, Scope, Target};
use crate::database::models::{ClassRoom, Grade, Student, Subject, TeacherProfile, User};
use crate::types::{Action, EntityKind, Role};

#[derive(Debug, Clone, Serialize)]
pub struct MatrixRow {
    pub role: Role,
    pub entity: EntityKind,
    pub action: Action,
    pub own: String,
    pub other: String,
}

struct Fixtures {
    student: Student,
    class: ClassRoom,
    profile: TeacherProfile,
    subject: Subject,
    grade: Grade,
    user: User,
}

impl Fixtures {
    fn owned_by(owner: Uuid) -> Self {
        let student = Student::new("Student".into(), Some(owner));
        let subject = Subject::new("Subject".into(), "SUB".into(), Some(owner));
        Self {
            grade: Grade::new(student.id, subject.id, Some(owner), 0.0),
            class: ClassRoom::new("Class".into(), Some(owner), Some(owner)),
            profile: TeacherProfile::new("Teacher".into(), Some(owner)),
            user: User::new("User".into(), "user@example.com".into(), String::new(), Role::Teacher),
            student,
            subject,
        }
    }

    fn target(&self, kind: EntityKind, member: Uuid) -> Target<'_> {
        match kind {
            EntityKind::Student => Target::from(&self.student),
            EntityKind::ClassRoom => Target::from(&self.class),
            EntityKind::Teacher => Target::from(&self.profile),
            EntityKind::Subject => Target::from(&self.subject),
            EntityKind::Grade => Target::from(&self.grade),
            EntityKind::User => Target::from(&self.user),
        }
        .with_member(member)
    }
}

/// Short human-readable form of a decision
pub fn describe(decision: &Decision) -> String {
    match decision {
        Decision::Allow(grant) => {
            let scope = match grant.scope {
                Scope::All => "allow",
                Scope::Nothing => "allow (no rows)",
                Scope::Where { .. } => "allow (scoped)",
            };
            if grant.reassign_owner {
                format!("{}, may reassign", scope)
            } else {
                scope.to_string()
            }
        }
        Decision::Deny { reason } => format!("deny: {}", reason),
    }
}

pub fn matrix(roles: &[Role]) -> Vec<MatrixRow> {
    let mut rows = Vec::new();
    for &role in roles {
        let me = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let own = Fixtures::owned_by(me);
        let other = Fixtures::owned_by(stranger);

        let actor = Actor::new(me, role.to_string(), role)
            .with_assigned_subjects([own.subject.id])
            .with_children([own.student.id])
            .with_student(Some(own.student.id));

        for entity in EntityKind::ALL {
            let own_target = own.target(entity, me);
            let other_target = other.target(entity, stranger);
            for action in Action::ALL {
                let (own_decision, other_decision) = if action.needs_target() {
                    (
                        AccessPolicy::decide(&actor, action, entity, Some(&own_target)),
                        AccessPolicy::decide(&actor, action, entity, Some(&other_target)),
                    )
                } else {
                    let d = AccessPolicy::decide(&actor, action, entity, None);
                    (d.clone(), d)
                };
                rows.push(MatrixRow {
                    role,
                    entity,
                    action,
                    own: describe(&own_decision),
                    other: describe(&other_decision),
                });
            }
        }
    }
    rows
}
