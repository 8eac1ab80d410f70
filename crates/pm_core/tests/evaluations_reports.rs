use pm_core::db::open_db_in_memory;
use pm_core::model::evaluation::{
    EvaluationFilter, EvaluationPatch, EvaluationStatus, NewEvaluation,
};
use pm_core::model::organisation_unit::NewOrganisationUnit;
use pm_core::model::project::NewProject;
use pm_core::model::report::{NewReport, ReportFilter, ReportPatch};
use pm_core::model::user::NewUser;
use pm_core::model::validation::Amount;
use pm_core::{
    ErrorKind, EvaluationService, ListParams, OrganisationUnitService, ProjectService,
    ReportService, SqliteEvaluationRepository, SqliteOrganisationUnitRepository,
    SqliteProjectRepository, SqliteRecordGuard, SqliteReportRepository, SqliteUserRepository,
    UserService,
};
use rusqlite::Connection;
use uuid::Uuid;

type Evaluations<'conn> =
    EvaluationService<SqliteEvaluationRepository<'conn>, SqliteRecordGuard<'conn>>;
type Reports<'conn> = ReportService<SqliteReportRepository<'conn>, SqliteRecordGuard<'conn>>;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn evaluations(conn: &Connection) -> Evaluations<'_> {
    EvaluationService::new(
        SqliteEvaluationRepository::try_new(conn).unwrap(),
        SqliteRecordGuard::try_new(conn).unwrap(),
    )
}

fn reports(conn: &Connection) -> Reports<'_> {
    ReportService::new(
        SqliteReportRepository::try_new(conn).unwrap(),
        SqliteRecordGuard::try_new(conn).unwrap(),
    )
}

fn project(conn: &Connection, title: &str) -> Uuid {
    let unit = OrganisationUnitService::new(
        SqliteOrganisationUnitRepository::try_new(conn).unwrap(),
        SqliteRecordGuard::try_new(conn).unwrap(),
    )
    .create(NewOrganisationUnit::new(format!("Unit for {title}")))
    .unwrap();
    ProjectService::new(
        SqliteProjectRepository::try_new(conn).unwrap(),
        SqliteRecordGuard::try_new(conn).unwrap(),
    )
    .create(NewProject::new(title, 2024, unit.id))
    .unwrap()
    .id
}

fn user(conn: &Connection, username: &str) -> Uuid {
    UserService::new(
        SqliteUserRepository::try_new(conn).unwrap(),
        SqliteRecordGuard::try_new(conn).unwrap(),
    )
    .create(NewUser {
        first_name: "Eric".to_string(),
        last_name: "Habimana".to_string(),
        email: format!("{username}@ur.ac.rw"),
        username: username.to_string(),
    })
    .unwrap()
    .id
}

#[test]
fn evaluation_scores_are_bounded_and_references_checked() {
    let conn = setup();
    let service = evaluations(&conn);
    let malaria = project(&conn, "Malaria Mapping");
    let eric = user(&conn, "ehabimana");

    for score in [-1, 101] {
        let err = service
            .create(NewEvaluation::new(malaria, eric, score))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest, "score {score}");
    }
    let err = service
        .create(NewEvaluation::new(Uuid::new_v4(), eric, 50))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = service
        .create(NewEvaluation::new(malaria, Uuid::new_v4(), 50))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let evaluation = service
        .create(NewEvaluation {
            comments: Some("  Solid field work  ".to_string()),
            ..NewEvaluation::new(malaria, eric, 100)
        })
        .unwrap();
    assert_eq!(evaluation.score, 100);
    assert_eq!(evaluation.status, EvaluationStatus::Pending);
    assert_eq!(evaluation.comments.as_deref(), Some("Solid field work"));

    let err = service
        .update(
            evaluation.id,
            EvaluationPatch {
                score: Some(150),
                ..EvaluationPatch::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let completed = service
        .update(
            evaluation.id,
            EvaluationPatch {
                score: Some(85),
                status: Some(EvaluationStatus::Completed),
                comments: Some(None),
                ..EvaluationPatch::default()
            },
        )
        .unwrap();
    assert_eq!(completed.score, 85);
    assert_eq!(completed.status, EvaluationStatus::Completed);
    assert_eq!(completed.comments, None);
    assert_eq!(service.get(evaluation.id).unwrap(), completed);

    service.delete(evaluation.id).unwrap();
    let err = service.delete(evaluation.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn evaluation_summary_averages_scores_and_counts_pending() {
    let conn = setup();
    let service = evaluations(&conn);
    let malaria = project(&conn, "Malaria Mapping");
    let water = project(&conn, "Clean Water");
    let eric = user(&conn, "ehabimana");
    let diane = user(&conn, "duwase");

    let empty = service.summary(malaria).unwrap();
    assert_eq!(empty.total, 0);
    assert_eq!(empty.average_score, None);

    service
        .create(NewEvaluation::new(malaria, eric, 80))
        .unwrap();
    service
        .create(NewEvaluation {
            status: EvaluationStatus::Completed,
            ..NewEvaluation::new(malaria, diane, 90)
        })
        .unwrap();
    service
        .create(NewEvaluation::new(malaria, diane, 70))
        .unwrap();
    service.create(NewEvaluation::new(water, eric, 10)).unwrap();

    let summary = service.summary(malaria).unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.pending, 2);
    assert_eq!(summary.average_score, Some(80.0));

    let pending_for_diane = service
        .list(
            &ListParams::default(),
            EvaluationFilter {
                evaluator_id: Some(diane),
                status: Some(EvaluationStatus::Pending),
                ..EvaluationFilter::default()
            },
        )
        .unwrap();
    assert_eq!(pending_for_diane.total, 1);
    assert_eq!(pending_for_diane.items[0].score, 70);

    let all_pending = service.pending(&ListParams::default()).unwrap();
    assert_eq!(all_pending.total, 3);

    let by_score = service
        .list(
            &ListParams::default().with_sort("score", "desc"),
            EvaluationFilter {
                project_id: Some(malaria),
                ..EvaluationFilter::default()
            },
        )
        .unwrap();
    let scores: Vec<u8> = by_score.items.iter().map(|item| item.score).collect();
    assert_eq!(scores, [90, 80, 70]);

    let err = service.summary(Uuid::new_v4()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn report_fields_are_validated() {
    let conn = setup();
    let service = reports(&conn);
    let malaria = project(&conn, "Malaria Mapping");
    let eric = user(&conn, "ehabimana");

    let short = service
        .create(NewReport::new(malaria, eric, "Q"))
        .unwrap_err();
    assert_eq!(short.kind(), ErrorKind::BadRequest);

    let long_title = "R".repeat(101);
    let long = service
        .create(NewReport::new(malaria, eric, long_title))
        .unwrap_err();
    assert_eq!(long.kind(), ErrorKind::BadRequest);

    let period = service
        .create(NewReport::new(malaria, eric, "Quarterly").with_period("P".repeat(51)))
        .unwrap_err();
    assert_eq!(period.kind(), ErrorKind::BadRequest);

    let negative = service
        .create(NewReport::new(malaria, eric, "Quarterly").with_fund_usage(-5.0))
        .unwrap_err();
    assert_eq!(negative.kind(), ErrorKind::BadRequest);

    let orphan = service
        .create(NewReport::new(Uuid::new_v4(), eric, "Quarterly"))
        .unwrap_err();
    assert_eq!(orphan.kind(), ErrorKind::NotFound);

    let report = service
        .create(
            NewReport::new(malaria, eric, "  Quarterly progress  ")
                .with_period("Q1 2024")
                .with_fund_usage(1500.25),
        )
        .unwrap();
    assert_eq!(report.title, "Quarterly progress");
    assert_eq!(report.fund_usage, Some(Amount::from_cents(150_025)));

    let updated = service
        .update(
            report.id,
            ReportPatch {
                fund_usage: Some(None),
                content: Some(Some("Field visits completed".to_string())),
                ..ReportPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.fund_usage, None);
    assert_eq!(updated.content.as_deref(), Some("Field visits completed"));
    assert_eq!(updated.title, "Quarterly progress");
}

#[test]
fn latest_report_and_summary_follow_submissions() {
    let conn = setup();
    let service = reports(&conn);
    let malaria = project(&conn, "Malaria Mapping");
    let eric = user(&conn, "ehabimana");

    let err = service.latest(malaria).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let empty = service.summary(malaria).unwrap();
    assert_eq!(empty.total_reports, 0);
    assert_eq!(empty.total_fund_usage, Amount::ZERO);

    service
        .create(
            NewReport::new(malaria, eric, "First quarter")
                .with_period("Q1 2024")
                .with_fund_usage(100.5),
        )
        .unwrap();
    service
        .create(NewReport::new(malaria, eric, "Interim note").with_period("Q1 2024"))
        .unwrap();
    let second = service
        .create(
            NewReport::new(malaria, eric, "Second quarter")
                .with_period("Q2 2024")
                .with_fund_usage(49.5),
        )
        .unwrap();

    assert_eq!(service.latest(malaria).unwrap().id, second.id);

    let summary = service.summary(malaria).unwrap();
    assert_eq!(summary.total_reports, 3);
    assert_eq!(summary.total_fund_usage, Amount::from_cents(15_000));

    let first_quarter = service
        .list(
            &ListParams::default(),
            &ReportFilter {
                project_id: Some(malaria),
                reporting_period: Some("Q1 2024".to_string()),
                ..ReportFilter::default()
            },
        )
        .unwrap();
    assert_eq!(first_quarter.total, 2);

    let searched = service
        .list(
            &ListParams::default().with_search("interim"),
            &ReportFilter::default(),
        )
        .unwrap();
    assert_eq!(searched.total, 1);

    service.delete(second.id).unwrap();
    assert_ne!(service.latest(malaria).unwrap().id, second.id);
}

#[test]
fn users_with_reports_or_evaluations_cannot_be_deleted() {
    let conn = setup();
    let users = UserService::new(
        SqliteUserRepository::try_new(&conn).unwrap(),
        SqliteRecordGuard::try_new(&conn).unwrap(),
    );
    let malaria = project(&conn, "Malaria Mapping");
    let eric = user(&conn, "ehabimana");

    let report = reports(&conn)
        .create(NewReport::new(malaria, eric, "Quarterly"))
        .unwrap();
    let evaluation = evaluations(&conn)
        .create(NewEvaluation::new(malaria, eric, 60))
        .unwrap();

    let err = users.delete(eric).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.to_string().contains("1 evaluation(s) and 1 report(s)"));

    reports(&conn).delete(report.id).unwrap();
    evaluations(&conn).delete(evaluation.id).unwrap();
    users.delete(eric).unwrap();
}
