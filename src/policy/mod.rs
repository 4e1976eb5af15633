//! Role-scoped access policy.
//!
//! [`AccessPolicy::decide`] is the single place where EduTrack decides whether
//! an actor may perform an action on an entity type. It is a total, pure
//! function over closed enums: every role × action × entity combination has an
//! answer, and anything not explicitly allowed below is denied.
//!
//! An ALLOW carries a [`Grant`] whose [`Scope`] tells list queries which rows
//! the actor may see. Handlers pass that scope down to the store; the policy
//! itself never reads storage. Targets (the row being read or written) are
//! fetched by the caller first, so a missing row is a 404 before the policy is
//! ever asked.

pub mod matrix;
pub mod scope;

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::database::models::{ClassRoom, Grade, Student, Subject, TeacherProfile, User};
use crate::types::{Action, EntityKind, Role};

pub use scope::{Field, Key, Predicate, Scope};

/// The authenticated caller plus the relationships the policy consults
#[derive(Debug, Clone, Serialize)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    /// Subjects this user is assigned to teach
    pub assigned_subjects: BTreeSet<Uuid>,
    /// Students this user is a guardian of
    pub children: BTreeSet<Uuid>,
    /// Student record matched to this user by display name
    pub student_id: Option<Uuid>,
}

impl Actor {
    pub fn new(id: Uuid, name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            assigned_subjects: BTreeSet::new(),
            children: BTreeSet::new(),
            student_id: None,
        }
    }

    pub fn with_assigned_subjects(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.assigned_subjects.extend(ids);
        self
    }

    pub fn with_children(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.children.extend(ids);
        self
    }

    pub fn with_student(mut self, student_id: Option<Uuid>) -> Self {
        self.student_id = student_id;
        self
    }
}

/// A fetched row the action applies to
#[derive(Debug, Clone, Copy)]
pub enum Record<'a> {
    Student(&'a Student),
    ClassRoom(&'a ClassRoom),
    Teacher(&'a TeacherProfile),
    Subject(&'a Subject),
    Grade(&'a Grade),
    User(&'a User),
}

impl Record<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Student(_) => EntityKind::Student,
            Record::ClassRoom(_) => EntityKind::ClassRoom,
            Record::Teacher(_) => EntityKind::Teacher,
            Record::Subject(_) => EntityKind::Subject,
            Record::Grade(_) => EntityKind::Grade,
            Record::User(_) => EntityKind::User,
        }
    }
}

/// Target of a read/update/delete/assign/unassign.
///
/// For assign and unassign, `member` is the user being linked to the record
/// (a teacher for a subject, a guardian for a student, a class teacher).
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub record: Record<'a>,
    pub member: Option<Uuid>,
}

impl<'a> Target<'a> {
    pub fn new(record: Record<'a>) -> Self {
        Self { record, member: None }
    }

    pub fn with_member(mut self, member: Uuid) -> Self {
        self.member = Some(member);
        self
    }
}

macro_rules! target_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl<'a> From<&'a $ty> for Target<'a> {
                fn from(value: &'a $ty) -> Self {
                    Target::new(Record::$variant(value))
                }
            }
        )*
    };
}

target_from! {
    Student => Student,
    ClassRoom => ClassRoom,
    TeacherProfile => Teacher,
    Subject => Subject,
    Grade => Grade,
    User => User,
}

/// What an ALLOW permits beyond the action itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grant {
    /// Rows visible to list queries
    pub scope: Scope,
    /// May change ownership columns (`teacher_id` on grades and classes)
    pub reassign_owner: bool,
}

impl Grant {
    fn all() -> Self {
        Self { scope: Scope::All, reassign_owner: false }
    }

    fn scoped(scope: Scope) -> Self {
        Self { scope, reassign_owner: false }
    }
}

/// Why a request was denied. Logged, never shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Denial {
    /// The role has no access to this entity/action at all
    Role,
    /// Not the creator or an assigned owner of the row
    NotOwner,
    /// Only the creator may do this
    NotCreator,
    /// Teachers may only assign or unassign themselves
    NotSelf,
    /// Row lies outside the actor's visibility scope
    OutOfScope,
    MissingTarget,
    MissingMember,
    TargetMismatch,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Denial::Role => "role not permitted",
            Denial::NotOwner => "not the owner of the record",
            Denial::NotCreator => "not the creator of the record",
            Denial::NotSelf => "may only assign self",
            Denial::OutOfScope => "record outside visibility scope",
            Denial::MissingTarget => "no target record supplied",
            Denial::MissingMember => "no member supplied",
            Denial::TargetMismatch => "target does not match entity type",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow(Grant),
    Deny { reason: Denial },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn into_result(self) -> Result<Grant, Denial> {
        match self {
            Decision::Allow(grant) => Ok(grant),
            Decision::Deny { reason } => Err(reason),
        }
    }
}

fn allow(grant: Grant) -> Decision {
    Decision::Allow(grant)
}

fn deny(reason: Denial) -> Decision {
    Decision::Deny { reason }
}

pub struct AccessPolicy;

impl AccessPolicy {
    /// Decide whether `actor` may perform `action` on `kind`.
    ///
    /// `target` is required for every action except list and create, and must
    /// be a record of `kind`. Assign and unassign also need `target.member`.
    pub fn decide(actor: &Actor, action: Action, kind: EntityKind, target: Option<&Target<'_>>) -> Decision {
        let target = if action.needs_target() {
            match target {
                None => return deny(Denial::MissingTarget),
                Some(t) if t.record.kind() != kind => return deny(Denial::TargetMismatch),
                Some(t) if matches!(action, Action::Assign | Action::Unassign) && t.member.is_none() => {
                    return deny(Denial::MissingMember)
                }
                Some(t) => Some(t),
            }
        } else {
            None
        };

        match actor.role {
            Role::Admin => allow(Grant { scope: Scope::All, reassign_owner: true }),
            Role::Teacher => Self::teacher(actor, action, kind, target),
            Role::Student | Role::Parent => Self::grade_viewer(actor, action, kind, target),
        }
    }

    /// Shorthand for the list decision, i.e. the actor's visibility over `kind`
    pub fn visibility(actor: &Actor, kind: EntityKind) -> Decision {
        Self::decide(actor, Action::List, kind, None)
    }

    /// Grades an actor may see, independent of the action
    pub fn grade_scope(actor: &Actor) -> Scope {
        match actor.role {
            Role::Admin => Scope::All,
            Role::Teacher => Scope::only(Predicate::eq_id(Field::TeacherId, actor.id)),
            Role::Student => match actor.student_id {
                Some(id) => Scope::only(Predicate::eq_id(Field::StudentId, id)),
                None => Scope::Nothing,
            },
            Role::Parent => Scope::any_of(Field::StudentId, actor.children.iter().copied().collect()),
        }
    }

    fn teacher(actor: &Actor, action: Action, kind: EntityKind, target: Option<&Target<'_>>) -> Decision {
        use Action::*;
        use EntityKind as E;

        match (kind, action) {
            (E::User, _) => deny(Denial::Role),

            (E::Grade, List) => allow(Grant::scoped(Self::grade_scope(actor))),
            (E::Grade, Create) => allow(Grant::all()),
            (E::Grade, Read | Update | Delete) => match target.map(|t| t.record) {
                Some(Record::Grade(g)) if g.teacher_id == Some(actor.id) => allow(Grant::all()),
                _ => deny(Denial::NotOwner),
            },
            (E::Grade, Assign | Unassign) => deny(Denial::Role),

            (_, List | Read | Create) => allow(Grant::all()),

            (E::Subject, Update) => match target.map(|t| t.record) {
                Some(Record::Subject(s))
                    if s.created_by == Some(actor.id) || actor.assigned_subjects.contains(&s.id) =>
                {
                    allow(Grant::all())
                }
                _ => deny(Denial::NotOwner),
            },
            (E::Subject, Delete) => match target.map(|t| t.record) {
                Some(Record::Subject(s)) if s.created_by == Some(actor.id) => allow(Grant::all()),
                _ => deny(Denial::NotCreator),
            },
            (E::Subject, Assign | Unassign) => match target.and_then(|t| t.member) {
                Some(member) if member == actor.id => allow(Grant::all()),
                _ => deny(Denial::NotSelf),
            },

            (E::Student | E::ClassRoom | E::Teacher, Update | Delete) => match target {
                Some(t) if Self::owns(actor, &t.record) => allow(Grant::all()),
                _ => deny(Denial::NotOwner),
            },
            (E::Student | E::ClassRoom | E::Teacher, Assign | Unassign) => deny(Denial::Role),
        }
    }

    /// Students and parents: grade list and single-grade read within scope
    fn grade_viewer(actor: &Actor, action: Action, kind: EntityKind, target: Option<&Target<'_>>) -> Decision {
        if kind != EntityKind::Grade {
            return deny(Denial::Role);
        }
        let scope = Self::grade_scope(actor);
        match action {
            Action::List => allow(Grant::scoped(scope)),
            Action::Read => match target.map(|t| t.record) {
                Some(Record::Grade(g)) if scope.admits(g) => allow(Grant::scoped(scope)),
                _ => deny(Denial::OutOfScope),
            },
            _ => deny(Denial::Role),
        }
    }

    fn owns(actor: &Actor, record: &Record<'_>) -> bool {
        let me = Some(actor.id);
        match record {
            Record::Student(s) => s.created_by == me,
            Record::ClassRoom(c) => c.created_by == me || c.teacher_id == me,
            Record::Teacher(t) => t.created_by == me,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor::new(Uuid::new_v4(), format!("{} user", role), role)
    }

    fn records(owner: Uuid) -> (Student, ClassRoom, TeacherProfile, Subject, Grade, User) {
        let student = Student::new("Ada".to_string(), Some(owner));
        let class = ClassRoom::new("Form 1".to_string(), None, Some(owner));
        let profile = TeacherProfile::new("Mr Bello".to_string(), Some(owner));
        let subject = Subject::new("Physics".to_string(), "PHY".to_string(), Some(owner));
        let grade = Grade::new(student.id, subject.id, Some(owner), 70.0);
        let user = User::new("u".to_string(), "u@example.com".to_string(), "x".to_string(), Role::Teacher);
        (student, class, profile, subject, grade, user)
    }

    fn decide_all(actor: &Actor, owner: Uuid) -> Vec<(EntityKind, Action, Decision)> {
        let (student, class, profile, subject, grade, user) = records(owner);
        let mut out = Vec::new();
        for kind in EntityKind::ALL {
            let target = match kind {
                EntityKind::Student => Target::from(&student),
                EntityKind::ClassRoom => Target::from(&class),
                EntityKind::Teacher => Target::from(&profile),
                EntityKind::Subject => Target::from(&subject),
                EntityKind::Grade => Target::from(&grade),
                EntityKind::User => Target::from(&user),
            }
            .with_member(actor.id);
            for action in Action::ALL {
                let target = action.needs_target().then_some(&target);
                out.push((kind, action, AccessPolicy::decide(actor, action, kind, target)));
            }
        }
        out
    }

    #[test]
    fn every_combination_has_a_decision() {
        for role in Role::ALL {
            let a = actor(role);
            let decisions = decide_all(&a, Uuid::new_v4());
            assert_eq!(decisions.len(), EntityKind::ALL.len() * Action::ALL.len());
        }
    }

    #[test]
    fn missing_target_is_denied_for_every_role() {
        for role in Role::ALL {
            let a = actor(role);
            for kind in EntityKind::ALL {
                for action in Action::ALL.into_iter().filter(|a| a.needs_target()) {
                    assert_eq!(
                        AccessPolicy::decide(&a, action, kind, None),
                        Decision::Deny { reason: Denial::MissingTarget },
                        "{role} {action} {kind}"
                    );
                }
            }
        }
    }

    #[test]
    fn admin_is_allowed_everything_with_full_scope() {
        let admin = actor(Role::Admin);
        for (kind, action, decision) in decide_all(&admin, Uuid::new_v4()) {
            match decision {
                Decision::Allow(grant) => {
                    assert_eq!(grant.scope, Scope::All, "{action} {kind}");
                    assert!(grant.reassign_owner);
                }
                other => panic!("admin denied {action} {kind}: {other:?}"),
            }
        }
    }

    #[test]
    fn students_and_parents_never_manage_records() {
        for role in [Role::Student, Role::Parent] {
            let a = actor(role).with_children([Uuid::new_v4()]);
            // even rows they "own" stay out of reach
            for (kind, action, decision) in decide_all(&a, a.id) {
                if kind == EntityKind::Grade {
                    continue;
                }
                assert_eq!(decision, Decision::Deny { reason: Denial::Role }, "{role} {action} {kind}");
            }
        }
    }

    #[test]
    fn students_and_parents_cannot_write_grades() {
        for role in [Role::Student, Role::Parent] {
            let a = actor(role);
            for (kind, action, decision) in decide_all(&a, a.id) {
                if kind == EntityKind::Grade && !matches!(action, Action::List | Action::Read) {
                    assert!(!decision.is_allowed(), "{role} {action}");
                }
            }
        }
    }

    #[test]
    fn only_admin_manages_users() {
        for role in [Role::Teacher, Role::Student, Role::Parent] {
            let a = actor(role);
            for (kind, action, decision) in decide_all(&a, a.id) {
                if kind == EntityKind::User {
                    assert!(!decision.is_allowed(), "{role} {action}");
                }
            }
        }
    }

    #[test]
    fn teacher_subject_edit_requires_creator_or_assignment() {
        let teacher = actor(Role::Teacher);
        let other = Subject::new("Chemistry".into(), "CHM".into(), Some(Uuid::new_v4()));
        let own = Subject::new("Biology".into(), "BIO".into(), Some(teacher.id));

        let decide = |a: &Actor, action, s: &Subject| {
            AccessPolicy::decide(a, action, EntityKind::Subject, Some(&Target::from(s))).is_allowed()
        };

        assert!(decide(&teacher, Action::Update, &own));
        assert!(decide(&teacher, Action::Delete, &own));
        assert!(!decide(&teacher, Action::Update, &other));
        assert!(!decide(&teacher, Action::Delete, &other));

        let assigned = teacher.clone().with_assigned_subjects([other.id]);
        assert!(decide(&assigned, Action::Update, &other));
        assert!(!decide(&assigned, Action::Delete, &other));
    }

    #[test]
    fn subject_delete_permission_implies_edit_permission() {
        let teacher = actor(Role::Teacher);
        let subjects = [
            Subject::new("A".into(), "A".into(), Some(teacher.id)),
            Subject::new("B".into(), "B".into(), None),
            Subject::new("C".into(), "C".into(), Some(Uuid::new_v4())),
        ];
        let variants = [teacher.clone(), teacher.clone().with_assigned_subjects(subjects.iter().map(|s| s.id))];
        for a in &variants {
            for s in &subjects {
                let t = Target::from(s);
                let edit = AccessPolicy::decide(a, Action::Update, EntityKind::Subject, Some(&t)).is_allowed();
                let delete = AccessPolicy::decide(a, Action::Delete, EntityKind::Subject, Some(&t)).is_allowed();
                assert!(!delete || edit);
            }
        }
    }

    #[test]
    fn physics_scenario_edit_after_assignment_but_never_delete() {
        let teacher_a = actor(Role::Teacher);
        let teacher_b = actor(Role::Teacher);
        let physics = Subject::new("Physics".into(), "PHY".into(), Some(teacher_a.id));
        let target = Target::from(&physics);

        let edit = |a: &Actor| AccessPolicy::decide(a, Action::Update, EntityKind::Subject, Some(&target));
        let delete = |a: &Actor| AccessPolicy::decide(a, Action::Delete, EntityKind::Subject, Some(&target));

        assert_eq!(edit(&teacher_b), Decision::Deny { reason: Denial::NotOwner });

        let teacher_b = teacher_b.with_assigned_subjects([physics.id]);
        assert!(edit(&teacher_b).is_allowed());
        assert_eq!(delete(&teacher_b), Decision::Deny { reason: Denial::NotCreator });
        assert!(delete(&teacher_a).is_allowed());
    }

    #[test]
    fn teacher_assigns_only_self() {
        let teacher = actor(Role::Teacher);
        let subject = Subject::new("Physics".into(), "PHY".into(), None);

        for action in [Action::Assign, Action::Unassign] {
            let me = Target::from(&subject).with_member(teacher.id);
            let someone = Target::from(&subject).with_member(Uuid::new_v4());
            let nobody = Target::from(&subject);

            assert!(AccessPolicy::decide(&teacher, action, EntityKind::Subject, Some(&me)).is_allowed());
            assert_eq!(
                AccessPolicy::decide(&teacher, action, EntityKind::Subject, Some(&someone)),
                Decision::Deny { reason: Denial::NotSelf }
            );
            assert_eq!(
                AccessPolicy::decide(&teacher, action, EntityKind::Subject, Some(&nobody)),
                Decision::Deny { reason: Denial::MissingMember }
            );
        }
    }

    #[test]
    fn teacher_grade_access_follows_grading_teacher() {
        let teacher = actor(Role::Teacher);
        let mine = Grade::new(Uuid::new_v4(), Uuid::new_v4(), Some(teacher.id), 50.0);
        let theirs = Grade::new(Uuid::new_v4(), Uuid::new_v4(), Some(Uuid::new_v4()), 50.0);
        let orphan = Grade::new(Uuid::new_v4(), Uuid::new_v4(), None, 50.0);

        for action in [Action::Read, Action::Update, Action::Delete] {
            let d = |g: &Grade| AccessPolicy::decide(&teacher, action, EntityKind::Grade, Some(&Target::from(g)));
            match d(&mine) {
                Decision::Allow(grant) => assert!(!grant.reassign_owner),
                other => panic!("{action} denied: {other:?}"),
            }
            assert!(!d(&theirs).is_allowed());
            assert!(!d(&orphan).is_allowed());
        }

        let admin = actor(Role::Admin);
        let grant = AccessPolicy::decide(&admin, Action::Update, EntityKind::Grade, Some(&Target::from(&theirs)))
            .into_result()
            .unwrap();
        assert!(grant.reassign_owner);
    }

    #[test]
    fn teacher_grade_list_is_scoped_to_own_grades() {
        let teacher = actor(Role::Teacher);
        let grant = AccessPolicy::visibility(&teacher, EntityKind::Grade).into_result().unwrap();
        assert_eq!(grant.scope, Scope::only(Predicate::eq_id(Field::TeacherId, teacher.id)));
    }

    #[test]
    fn teacher_reads_all_records_but_writes_only_own() {
        let teacher = actor(Role::Teacher);
        let (mine_s, mine_c, mine_t, ..) = records(teacher.id);
        let (other_s, other_c, other_t, ..) = records(Uuid::new_v4());

        for kind in [EntityKind::Student, EntityKind::ClassRoom, EntityKind::Teacher, EntityKind::Subject] {
            let grant = AccessPolicy::visibility(&teacher, kind).into_result().unwrap();
            assert_eq!(grant.scope, Scope::All);
            assert!(AccessPolicy::decide(&teacher, Action::Create, kind, None).is_allowed());
        }

        let cases = [
            (EntityKind::Student, Target::from(&mine_s), Target::from(&other_s)),
            (EntityKind::ClassRoom, Target::from(&mine_c), Target::from(&other_c)),
            (EntityKind::Teacher, Target::from(&mine_t), Target::from(&other_t)),
        ];
        for (kind, mine, other) in cases {
            assert!(AccessPolicy::decide(&teacher, Action::Read, kind, Some(&other)).is_allowed());
            for action in [Action::Update, Action::Delete] {
                assert!(AccessPolicy::decide(&teacher, action, kind, Some(&mine)).is_allowed());
                assert!(!AccessPolicy::decide(&teacher, action, kind, Some(&other)).is_allowed());
            }
            for action in [Action::Assign, Action::Unassign] {
                let me = mine.with_member(teacher.id);
                assert!(!AccessPolicy::decide(&teacher, action, kind, Some(&me)).is_allowed());
            }
        }
    }

    #[test]
    fn class_teacher_may_edit_class() {
        let teacher = actor(Role::Teacher);
        let class = ClassRoom::new("Form 2".into(), Some(teacher.id), Some(Uuid::new_v4()));
        let target = Target::from(&class);
        assert!(AccessPolicy::decide(&teacher, Action::Update, EntityKind::ClassRoom, Some(&target)).is_allowed());
    }

    #[test]
    fn parent_sees_union_of_children_grades() {
        let (s1, s2) = (Uuid::new_v4(), Uuid::new_v4());
        let parent = actor(Role::Parent).with_children([s1, s2]);

        let grant = AccessPolicy::visibility(&parent, EntityKind::Grade).into_result().unwrap();
        let mut expected = vec![s1, s2];
        expected.sort();
        assert_eq!(grant.scope, Scope::any_of(Field::StudentId, expected));

        let child_grade = Grade::new(s2, Uuid::new_v4(), None, 10.0);
        let stranger_grade = Grade::new(Uuid::new_v4(), Uuid::new_v4(), None, 10.0);
        assert!(grant.scope.admits(&child_grade));
        assert!(!grant.scope.admits(&stranger_grade));

        let read = |g: &Grade| AccessPolicy::decide(&parent, Action::Read, EntityKind::Grade, Some(&Target::from(g)));
        assert!(read(&child_grade).is_allowed());
        assert_eq!(read(&stranger_grade), Decision::Deny { reason: Denial::OutOfScope });
    }

    #[test]
    fn parent_without_children_gets_empty_scope_not_denial() {
        let parent = actor(Role::Parent);
        let decision = AccessPolicy::visibility(&parent, EntityKind::Grade);
        assert_eq!(decision, Decision::Allow(Grant { scope: Scope::Nothing, reassign_owner: false }));
    }

    #[test]
    fn student_sees_grades_of_matched_record_only() {
        let record = Uuid::new_v4();
        let student = actor(Role::Student).with_student(Some(record));
        let grant = AccessPolicy::visibility(&student, EntityKind::Grade).into_result().unwrap();
        assert_eq!(grant.scope, Scope::only(Predicate::eq_id(Field::StudentId, record)));

        let unmatched = actor(Role::Student);
        let grant = AccessPolicy::visibility(&unmatched, EntityKind::Grade).into_result().unwrap();
        assert_eq!(grant.scope, Scope::Nothing);
    }

    #[test]
    fn target_of_wrong_kind_is_denied() {
        let admin = actor(Role::Admin);
        let subject = Subject::new("Physics".into(), "PHY".into(), None);
        assert_eq!(
            AccessPolicy::decide(&admin, Action::Update, EntityKind::Grade, Some(&Target::from(&subject))),
            Decision::Deny { reason: Denial::TargetMismatch }
        );
    }
}
