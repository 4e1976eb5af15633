mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{assert_denied, TestApp};
use edutrack::types::Role;

/// Two children of one parent plus an unrelated student, all graded in Maths
/// by teacher A.
struct School {
    app: TestApp,
    admin: String,
    teacher_a: String,
    teacher_a_id: String,
    teacher_b: String,
    parent: String,
    subject: String,
    kid_one: String,
    stranger: String,
}

impl School {
    async fn new() -> Result<Self> {
        let app = TestApp::new();
        let (_, admin) = app.login_as("Admin", Role::Admin).await?;
        let (a, teacher_a) = app.login_as("Teacher A", Role::Teacher).await?;
        let (_, teacher_b) = app.login_as("Teacher B", Role::Teacher).await?;
        let (mum, parent) = app.login_as("Mum", Role::Parent).await?;

        let kid_one = app.create("/api/students", &admin, json!({ "name": "Kid One" })).await?;
        let kid_two = app.create("/api/students", &admin, json!({ "name": "Kid Two" })).await?;
        let stranger = app.create("/api/students", &admin, json!({ "name": "Stranger" })).await?;
        for kid in [&kid_one, &kid_two] {
            let res = app.put(&format!("/api/students/{}/guardians/{}", kid, mum.id), &admin, json!({})).await?;
            assert_eq!(res.status, StatusCode::OK, "body: {}", res.body);
        }

        let subject = app
            .create("/api/subjects", &teacher_a, json!({ "name": "Maths", "code": "MAT" }))
            .await?;
        for (student, score) in [(&kid_one, 70.0), (&kid_two, 55.0), (&stranger, 90.0)] {
            app.create(
                "/api/grades",
                &teacher_a,
                json!({ "student_id": student, "subject_id": subject, "score": score }),
            )
            .await?;
        }

        Ok(Self {
            app,
            admin,
            teacher_a,
            teacher_a_id: a.id.to_string(),
            teacher_b,
            parent,
            subject,
            kid_one,
            stranger,
        })
    }

    async fn grades(&self, token: &str) -> Result<Vec<Value>> {
        let res = self.app.get("/api/grades", token).await?;
        assert_eq!(res.status, StatusCode::OK, "body: {}", res.body);
        Ok(res.data().as_array().cloned().unwrap_or_default())
    }

    async fn post_grade(&self, body: Value) -> Result<common::Response> {
        self.app.post("/api/grades", &self.teacher_a, body).await
    }

    async fn grade_of(&self, student: &str) -> Result<String> {
        let all = self.grades(&self.admin).await?;
        let grade = all
            .iter()
            .find(|g| g["student_id"] == student)
            .and_then(|g| g["id"].as_str())
            .map(str::to_string);
        grade.ok_or_else(|| anyhow::anyhow!("no grade for {}", student))
    }
}

#[tokio::test]
async fn parent_sees_grades_of_all_their_children_only() -> Result<()> {
    let school = School::new().await?;

    let grades = school.grades(&school.parent).await?;
    assert_eq!(grades.len(), 2);
    assert!(grades.iter().all(|g| g["student_id"] != school.stranger.as_str()));

    let strangers = school.grade_of(&school.stranger).await?;
    assert_denied(&school.app.get(&format!("/api/grades/{}", strangers), &school.parent).await?);

    let own = school.grade_of(&school.kid_one).await?;
    let res = school.app.get(&format!("/api/grades/{}", own), &school.parent).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["score"], 70.0);
    Ok(())
}

#[tokio::test]
async fn student_sees_the_record_matching_their_name() -> Result<()> {
    let school = School::new().await?;
    let (_, kid) = school.app.login_as("Kid One", Role::Student).await?;
    let (_, nobody) = school.app.login_as("Unenrolled", Role::Student).await?;

    let grades = school.grades(&kid).await?;
    assert_eq!(grades.len(), 1);
    assert_eq!(grades[0]["student_id"], school.kid_one.as_str());

    assert!(school.grades(&nobody).await?.is_empty());

    // read-only
    let grade = school.grade_of(&school.kid_one).await?;
    assert_denied(&school.app.put(&format!("/api/grades/{}", grade), &kid, json!({ "score": 100 })).await?);
    assert_denied(
        &school
            .app
            .post(
                "/api/grades",
                &kid,
                json!({ "student_id": school.kid_one, "subject_id": school.subject, "score": 100 }),
            )
            .await?,
    );
    Ok(())
}

#[tokio::test]
async fn teachers_manage_only_the_grades_they_gave() -> Result<()> {
    let school = School::new().await?;

    assert_eq!(school.grades(&school.teacher_a).await?.len(), 3);
    assert!(school.grades(&school.teacher_b).await?.is_empty());

    let grade = school.grade_of(&school.kid_one).await?;
    let uri = format!("/api/grades/{}", grade);
    assert_denied(&school.app.get(&uri, &school.teacher_b).await?);
    assert_denied(&school.app.put(&uri, &school.teacher_b, json!({ "score": 1 })).await?);
    assert_denied(&school.app.delete(&uri, &school.teacher_b).await?);

    let updated = school.app.put(&uri, &school.teacher_a, json!({ "score": 75, "max_score": 80 })).await?;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.data()["percentage"], 93.75);

    assert_eq!(school.app.delete(&uri, &school.teacher_a).await?.status, StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn only_admin_may_hand_a_grade_to_another_teacher() -> Result<()> {
    let school = School::new().await?;
    let body = json!({
        "student_id": school.kid_one,
        "subject_id": school.subject,
        "score": 10,
        "teacher_id": school.teacher_a_id,
    });

    assert_denied(&school.app.post("/api/grades", &school.teacher_b, body.clone()).await?);

    let created = school.app.post("/api/grades", &school.admin, body).await?;
    assert_eq!(created.status, StatusCode::CREATED, "body: {}", created.body);
    assert_eq!(created.data()["teacher_id"], school.teacher_a_id.as_str());

    // teacher A now owns it, but still may not give it away
    let uri = format!("/api/grades/{}", created.data()["id"].as_str().unwrap_or_default());
    let c = school.app.user("Teacher C", Role::Teacher).await?;
    assert_denied(&school.app.put(&uri, &school.teacher_a, json!({ "teacher_id": c.id })).await?);
    Ok(())
}

#[tokio::test]
async fn grade_input_is_validated() -> Result<()> {
    let school = School::new().await?;

    let quiz = school.post_grade(json!({
        "student_id": school.kid_one,
        "subject_id": school.subject,
        "score": 5,
        "max_score": 20,
        "grade_type": "quiz",
        "date_given": "2024-02-29",
    }))
    .await?;
    assert_eq!(quiz.status, StatusCode::CREATED);
    assert_eq!(quiz.data()["percentage"], 25.0);
    assert_eq!(quiz.data()["grade_type"], "quiz");
    assert_eq!(quiz.data()["date_given"], "2024-02-29");

    let zero_max = school.post_grade(json!({
        "student_id": school.kid_one,
        "subject_id": school.subject,
        "score": 5,
        "max_score": 0,
    }))
    .await?;
    assert_eq!(zero_max.status, StatusCode::BAD_REQUEST);
    assert!(zero_max.body["field_errors"]["max_score"].is_string());

    let bad_date = school.post_grade(json!({
        "student_id": school.kid_one,
        "subject_id": school.subject,
        "score": 5,
        "date_given": "29/02/2024",
    }))
    .await?;
    assert_eq!(bad_date.status, StatusCode::BAD_REQUEST);
    assert!(bad_date.body["field_errors"]["date_given"].is_string());

    let no_score = school.post_grade(json!({ "student_id": school.kid_one, "subject_id": school.subject })).await?;
    assert_eq!(no_score.status, StatusCode::BAD_REQUEST);

    let unknown_student = school.post_grade(json!({
        "student_id": uuid::Uuid::new_v4(),
        "subject_id": school.subject,
        "score": 5,
    }))
    .await?;
    assert_eq!(unknown_student.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn deleting_a_student_removes_their_grades() -> Result<()> {
    let school = School::new().await?;
    let res = school.app.delete(&format!("/api/students/{}", school.stranger), &school.admin).await?;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(school.grades(&school.admin).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn dashboard_counts_follow_visibility() -> Result<()> {
    let school = School::new().await?;

    let parent = school.app.get("/api/dashboard", &school.parent).await?;
    assert_eq!(parent.status, StatusCode::OK);
    assert_eq!(parent.data(), &json!({ "grades": 2 }));

    let teacher = school.app.get("/api/dashboard", &school.teacher_b).await?;
    assert_eq!(
        teacher.data(),
        &json!({ "classes": 0, "grades": 0, "students": 3, "subjects": 1 })
    );

    let admin = school.app.get("/api/dashboard", &school.admin).await?;
    assert_eq!(admin.data()["grades"], 3);
    Ok(())
}
