use pm_core::db::open_db_in_memory;
use pm_core::model::funder::{FunderPatch, NewFunder};
use pm_core::model::organisation_unit::NewOrganisationUnit;
use pm_core::model::stakeholder::NewStakeholder;
use pm_core::{
    ErrorKind, FunderService, ListParams, OrganisationUnitService, PageRequest,
    SqliteFunderRepository, SqliteOrganisationUnitRepository, SqliteRecordGuard,
    SqliteStakeholderRepository, StakeholderService,
};
use rusqlite::Connection;
use uuid::Uuid;

type Funders<'conn> = FunderService<SqliteFunderRepository<'conn>, SqliteRecordGuard<'conn>>;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn funders(conn: &Connection) -> Funders<'_> {
    FunderService::new(
        SqliteFunderRepository::try_new(conn).unwrap(),
        SqliteRecordGuard::try_new(conn).unwrap(),
    )
}

#[test]
fn duplicate_funder_name_is_a_conflict() {
    let conn = setup();
    let service = funders(&conn);
    service
        .create(NewFunder::new("Global Fund", "International"))
        .unwrap();

    let err = service
        .create(NewFunder::new("Global Fund", "Private"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.to_string(), "funder with the same name already exists");
}

#[test]
fn funder_input_is_validated_and_normalized() {
    let conn = setup();
    let service = funders(&conn);

    let short = service.create(NewFunder::new("G", "Private")).unwrap_err();
    assert_eq!(short.kind(), ErrorKind::BadRequest);

    let symbols = service
        .create(NewFunder::new("Fund@Home", "Private"))
        .unwrap_err();
    assert_eq!(symbols.kind(), ErrorKind::BadRequest);

    let bad_email = service
        .create(NewFunder {
            contact_email: Some("not-an-email".to_string()),
            ..NewFunder::new("Wellcome Trust", "Charity")
        })
        .unwrap_err();
    assert_eq!(bad_email.kind(), ErrorKind::BadRequest);

    let funder = service
        .create(NewFunder {
            contact_email: Some("Grants@Wellcome.org".to_string()),
            contact_phone: Some("   ".to_string()),
            ..NewFunder::new("  Wellcome Trust  ", "Charity")
        })
        .unwrap();
    assert_eq!(funder.name, "Wellcome Trust");
    assert_eq!(funder.contact_email.as_deref(), Some("grants@wellcome.org"));
    assert_eq!(funder.contact_phone, None);
}

#[test]
fn renaming_a_funder_checks_other_rows_only() {
    let conn = setup();
    let service = funders(&conn);
    let gates = service
        .create(NewFunder::new("Gates Foundation", "Private"))
        .unwrap();
    service
        .create(NewFunder::new("Global Fund", "International"))
        .unwrap();

    let same = service
        .update(
            gates.id,
            FunderPatch {
                name: Some("Gates Foundation".to_string()),
                ..FunderPatch::default()
            },
        )
        .unwrap();
    assert_eq!(same.name, "Gates Foundation");

    let err = service
        .update(
            gates.id,
            FunderPatch {
                name: Some("Global Fund".to_string()),
                ..FunderPatch::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn funder_list_searches_sorts_and_paginates() {
    let conn = setup();
    let service = funders(&conn);
    for (name, kind) in [
        ("Global Fund", "International"),
        ("Gates Foundation", "Private"),
        ("National Research Council", "Government"),
        ("World Bank", "International"),
    ] {
        service.create(NewFunder::new(name, kind)).unwrap();
    }

    let international = service
        .list(&ListParams::default().with_search("INTERNATIONAL"))
        .unwrap();
    assert_eq!(international.total, 2);
    assert_eq!(international.items[0].name, "Global Fund");

    let page_two = service
        .list(
            &ListParams::default()
                .with_sort("name", "desc")
                .with_page(PageRequest::new(Some(2), Some(3))),
        )
        .unwrap();
    assert_eq!(page_two.total, 4);
    assert_eq!(page_two.items.len(), 1);
    assert_eq!(page_two.items[0].name, "Gates Foundation");

    let unknown_sort = service
        .list(&ListParams::default().with_sort("budget; DROP TABLE funders", "sideways"))
        .unwrap();
    assert_eq!(unknown_sort.items[0].name, "Gates Foundation");
}

#[test]
fn delete_unknown_funder_is_not_found() {
    let conn = setup();
    let service = funders(&conn);
    let funder = service
        .create(NewFunder::new("Global Fund", "International"))
        .unwrap();

    service.delete(funder.id).unwrap();
    assert_eq!(
        service.delete(funder.id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn stakeholders_filter_by_organisation_unit() {
    let conn = setup();
    let units = OrganisationUnitService::new(
        SqliteOrganisationUnitRepository::try_new(&conn).unwrap(),
        SqliteRecordGuard::try_new(&conn).unwrap(),
    );
    let service = StakeholderService::new(
        SqliteStakeholderRepository::try_new(&conn).unwrap(),
        SqliteRecordGuard::try_new(&conn).unwrap(),
    );
    let college = units
        .create(NewOrganisationUnit::new("College of Science"))
        .unwrap();

    service
        .create(NewStakeholder {
            organisation_unit_id: Some(college.id),
            ..NewStakeholder::new("Ministry of Health", "Government")
        })
        .unwrap();
    service
        .create(NewStakeholder::new("Rwanda Red Cross", "NGO"))
        .unwrap();

    let attached = service
        .by_organisation_unit(college.id, &ListParams::default())
        .unwrap();
    assert_eq!(attached.total, 1);
    assert_eq!(attached.items[0].name, "Ministry of Health");

    let all = service.list(&ListParams::default(), None).unwrap();
    assert_eq!(all.total, 2);

    let err = service
        .by_organisation_unit(Uuid::new_v4(), &ListParams::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = service
        .create(NewStakeholder {
            organisation_unit_id: Some(Uuid::new_v4()),
            ..NewStakeholder::new("Detached Partner", "NGO")
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = service
        .create(NewStakeholder::new("Rwanda Red Cross", "Charity"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}
