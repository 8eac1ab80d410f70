use pm_core::db::open_db_in_memory;
use pm_core::model::funder::NewFunder;
use pm_core::model::organisation_unit::NewOrganisationUnit;
use pm_core::model::project::NewProject;
use pm_core::model::project_link::{FundingFilter, StakeholderRole};
use pm_core::model::stakeholder::NewStakeholder;
use pm_core::model::validation::Amount;
use pm_core::{
    ErrorKind, FunderService, ListParams, OrganisationUnitService, ProjectLinkService,
    ProjectService, SqliteFunderRepository, SqliteOrganisationUnitRepository,
    SqliteProjectLinkRepository, SqliteProjectRepository, SqliteRecordGuard,
    SqliteStakeholderRepository, StakeholderService,
};
use rusqlite::Connection;
use uuid::Uuid;

type Links<'conn> =
    ProjectLinkService<SqliteProjectLinkRepository<'conn>, SqliteRecordGuard<'conn>>;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn links(conn: &Connection) -> Links<'_> {
    ProjectLinkService::new(
        SqliteProjectLinkRepository::try_new(conn).unwrap(),
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

fn funder(conn: &Connection, name: &str) -> Uuid {
    FunderService::new(
        SqliteFunderRepository::try_new(conn).unwrap(),
        SqliteRecordGuard::try_new(conn).unwrap(),
    )
    .create(NewFunder::new(name, "International"))
    .unwrap()
    .id
}

fn stakeholder(conn: &Connection, name: &str) -> Uuid {
    StakeholderService::new(
        SqliteStakeholderRepository::try_new(conn).unwrap(),
        SqliteRecordGuard::try_new(conn).unwrap(),
    )
    .create(NewStakeholder::new(name, "Community"))
    .unwrap()
    .id
}

#[test]
fn funder_links_carry_an_amount_in_cents() {
    let conn = setup();
    let service = links(&conn);
    let malaria = project(&conn, "Malaria Mapping");
    let global = funder(&conn, "Global Fund");

    let link = service.add_funder(malaria, global, Some(1250.5)).unwrap();
    assert_eq!(link.amount, Some(Amount::from_cents(125_050)));
    assert_eq!(service.funding(malaria, global).unwrap(), link);

    let err = service.add_funder(malaria, global, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let updated = service.update_funding(malaria, global, None).unwrap();
    assert_eq!(updated.amount, None);
    let updated = service
        .update_funding(malaria, global, Some(99.99))
        .unwrap();
    assert_eq!(updated.amount.map(Amount::cents), Some(9_999));
}

#[test]
fn funder_links_reject_bad_amounts_and_missing_sides() {
    let conn = setup();
    let service = links(&conn);
    let malaria = project(&conn, "Malaria Mapping");
    let global = funder(&conn, "Global Fund");

    for amount in [-1.0, 10.005, f64::NAN] {
        let err = service
            .add_funder(malaria, global, Some(amount))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest, "amount {amount}");
    }

    let err = service.add_funder(Uuid::new_v4(), global, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = service.add_funder(malaria, Uuid::new_v4(), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = service.funding(malaria, global).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = service.remove_funder(malaria, global).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn funding_list_filters_by_either_side_and_sorts_by_amount() {
    let conn = setup();
    let service = links(&conn);
    let malaria = project(&conn, "Malaria Mapping");
    let water = project(&conn, "Clean Water");
    let global = funder(&conn, "Global Fund");
    let council = funder(&conn, "National Research Council");

    service.add_funder(malaria, global, Some(500.0)).unwrap();
    service.add_funder(malaria, council, Some(75.0)).unwrap();
    service.add_funder(water, global, Some(20.0)).unwrap();

    let by_project = service
        .list_funding(
            &ListParams::default().with_sort("amount", "asc"),
            FundingFilter {
                project_id: Some(malaria),
                ..FundingFilter::default()
            },
        )
        .unwrap();
    assert_eq!(by_project.total, 2);
    assert_eq!(by_project.items[0].funder_id, council);
    assert_eq!(by_project.items[1].funder_id, global);

    let by_funder = service
        .list_funding(
            &ListParams::default(),
            FundingFilter {
                funder_id: Some(global),
                ..FundingFilter::default()
            },
        )
        .unwrap();
    assert_eq!(by_funder.total, 2);

    service.remove_funder(malaria, global).unwrap();
    let err = service.remove_funder(malaria, global).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn deleting_a_funder_drops_its_links() {
    let conn = setup();
    let service = links(&conn);
    let malaria = project(&conn, "Malaria Mapping");
    let global = funder(&conn, "Global Fund");
    service.add_funder(malaria, global, Some(10.0)).unwrap();

    FunderService::new(
        SqliteFunderRepository::try_new(&conn).unwrap(),
        SqliteRecordGuard::try_new(&conn).unwrap(),
    )
    .delete(global)
    .unwrap();

    let remaining = service
        .list_funding(&ListParams::default(), FundingFilter::default())
        .unwrap();
    assert_eq!(remaining.total, 0);
}

#[test]
fn stakeholder_links_default_to_beneficiary_and_list_by_name() {
    let conn = setup();
    let service = links(&conn);
    let malaria = project(&conn, "Malaria Mapping");
    let ministry = stakeholder(&conn, "Ministry of Health");
    let clinic = stakeholder(&conn, "Butare Clinic");

    let link = service.add_stakeholder(malaria, ministry, None).unwrap();
    assert_eq!(link.role, StakeholderRole::Beneficiary);
    service
        .add_stakeholder(malaria, clinic, Some(StakeholderRole::Partner))
        .unwrap();

    let err = service
        .add_stakeholder(malaria, clinic, Some(StakeholderRole::Sponsor))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let err = service
        .add_stakeholder(malaria, Uuid::new_v4(), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let names: Vec<String> = service
        .project_stakeholders(malaria)
        .unwrap()
        .into_iter()
        .map(|stakeholder| stakeholder.name)
        .collect();
    assert_eq!(names, ["Butare Clinic", "Ministry of Health"]);

    let updated = service
        .update_stakeholder_role(malaria, ministry, StakeholderRole::Regulator)
        .unwrap();
    assert_eq!(updated.role, StakeholderRole::Regulator);

    let memberships = service
        .list_memberships(&ListParams::default(), None, Some(ministry))
        .unwrap();
    assert_eq!(memberships.total, 1);
    assert_eq!(memberships.items[0].role, StakeholderRole::Regulator);

    service.remove_stakeholder(malaria, ministry).unwrap();
    let err = service.remove_stakeholder(malaria, ministry).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = service
        .update_stakeholder_role(malaria, ministry, StakeholderRole::Owner)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(service.project_stakeholders(malaria).unwrap().len(), 1);
}
