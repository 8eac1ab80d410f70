use chrono::{DateTime, TimeZone, Utc};
use pm_core::db::open_db_in_memory;
use pm_core::model::organisation_unit::NewOrganisationUnit;
use pm_core::model::position::{NewPosition, OccupancyChange};
use pm_core::model::user::NewUser;
use pm_core::{
    AssignmentFilter, AssignmentService, BoundaryPolicy, ErrorKind, ListParams,
    OrganisationUnitService, PositionService, SqliteAssignmentRepository,
    SqliteOrganisationUnitRepository, SqlitePositionRepository, SqliteRecordGuard,
    SqliteUserRepository, UserService,
};
use rusqlite::Connection;
use uuid::Uuid;

type Assignments<'conn> =
    AssignmentService<SqliteAssignmentRepository<'conn>, SqliteRecordGuard<'conn>>;

struct Fixture {
    position_id: Uuid,
    user_id: Uuid,
}

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn seed(conn: &Connection) -> Fixture {
    let units = OrganisationUnitService::new(
        SqliteOrganisationUnitRepository::try_new(conn).unwrap(),
        SqliteRecordGuard::try_new(conn).unwrap(),
    );
    let positions = PositionService::new(
        SqlitePositionRepository::try_new(conn).unwrap(),
        SqliteRecordGuard::try_new(conn).unwrap(),
    );
    let users = UserService::new(
        SqliteUserRepository::try_new(conn).unwrap(),
        SqliteRecordGuard::try_new(conn).unwrap(),
    );

    let college = units
        .create(NewOrganisationUnit::new("College of Medicine").with_code("CMHS"))
        .unwrap();
    let position = positions
        .create(NewPosition::new("Principal CMHS", college.id))
        .unwrap();
    let user = users
        .create(NewUser {
            first_name: "Eric".to_string(),
            last_name: "Habimana".to_string(),
            email: "Eric.Habimana@ur.ac.rw".to_string(),
            username: "ehabimana".to_string(),
        })
        .unwrap();
    Fixture {
        position_id: position.id,
        user_id: user.id,
    }
}

fn service(conn: &Connection, policy: BoundaryPolicy) -> Assignments<'_> {
    AssignmentService::new(
        SqliteAssignmentRepository::try_new(conn).unwrap(),
        SqliteRecordGuard::try_new(conn).unwrap(),
        policy,
    )
}

fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

#[test]
fn touching_periods_conflict_under_inclusive_policy() {
    let conn = setup();
    let fixture = seed(&conn);
    let service = service(&conn, BoundaryPolicy::Inclusive);

    service
        .assign(
            fixture.position_id,
            fixture.user_id,
            Some(day(2020, 1, 1)),
            Some(day(2021, 1, 1)),
        )
        .unwrap();

    let err = service
        .assign(
            fixture.position_id,
            fixture.user_id,
            Some(day(2021, 1, 1)),
            None,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn touching_periods_are_allowed_under_half_open_policy() {
    let conn = setup();
    let fixture = seed(&conn);
    let service = service(&conn, BoundaryPolicy::HalfOpen);

    service
        .assign(
            fixture.position_id,
            fixture.user_id,
            Some(day(2020, 1, 1)),
            Some(day(2021, 1, 1)),
        )
        .unwrap();
    service
        .assign(
            fixture.position_id,
            fixture.user_id,
            Some(day(2021, 1, 1)),
            None,
        )
        .unwrap();

    let err = service
        .assign(
            fixture.position_id,
            fixture.user_id,
            Some(day(2020, 6, 1)),
            Some(day(2020, 7, 1)),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn open_period_blocks_any_later_start() {
    let conn = setup();
    let fixture = seed(&conn);
    let service = service(&conn, BoundaryPolicy::HalfOpen);

    service
        .assign(fixture.position_id, fixture.user_id, Some(day(2022, 1, 1)), None)
        .unwrap();
    let err = service
        .assign(fixture.position_id, fixture.user_id, Some(day(2030, 1, 1)), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn end_before_start_is_a_bad_request() {
    let conn = setup();
    let fixture = seed(&conn);
    let service = service(&conn, BoundaryPolicy::Inclusive);

    let err = service
        .assign(
            fixture.position_id,
            fixture.user_id,
            Some(day(2021, 1, 1)),
            Some(day(2020, 1, 1)),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[test]
fn unknown_position_or_user_is_not_found() {
    let conn = setup();
    let fixture = seed(&conn);
    let service = service(&conn, BoundaryPolicy::Inclusive);

    let err = service
        .assign(Uuid::new_v4(), fixture.user_id, None, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = service
        .assign(fixture.position_id, Uuid::new_v4(), None, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn ending_twice_reports_no_active_period() {
    let conn = setup();
    let fixture = seed(&conn);
    let service = service(&conn, BoundaryPolicy::Inclusive);

    service
        .assign(fixture.position_id, fixture.user_id, Some(day(2022, 1, 1)), None)
        .unwrap();

    let closed = service
        .end_occupancy(fixture.position_id, fixture.user_id)
        .unwrap();
    assert!(closed.end_date.is_some());
    assert_eq!(closed.start_date, day(2022, 1, 1));

    let err = service
        .end_occupancy(fixture.position_id, fixture.user_id)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn ending_at_an_instant_closes_the_period_active_then() {
    let conn = setup();
    let fixture = seed(&conn);
    let service = service(&conn, BoundaryPolicy::HalfOpen);

    service
        .assign(
            fixture.position_id,
            fixture.user_id,
            Some(day(2018, 1, 1)),
            Some(day(2019, 1, 1)),
        )
        .unwrap();
    service
        .assign(fixture.position_id, fixture.user_id, Some(day(2020, 1, 1)), None)
        .unwrap();

    let closed = service
        .end_occupancy_at(fixture.position_id, fixture.user_id, day(2021, 3, 1))
        .unwrap();
    assert_eq!(closed.start_date, day(2020, 1, 1));
    assert_eq!(closed.end_date, Some(day(2021, 3, 1)));

    let err = service
        .end_occupancy_at(fixture.position_id, fixture.user_id, day(2021, 6, 1))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn ending_a_scheduled_period_closes_it_at_its_start() {
    let conn = setup();
    let fixture = seed(&conn);
    let service = service(&conn, BoundaryPolicy::Inclusive);

    service
        .assign(fixture.position_id, fixture.user_id, Some(day(2099, 1, 1)), None)
        .unwrap();

    let closed = service
        .end_occupancy(fixture.position_id, fixture.user_id)
        .unwrap();
    assert_eq!(closed.start_date, day(2099, 1, 1));
    assert_eq!(closed.end_date, Some(day(2099, 1, 1)));

    let err = service
        .end_occupancy(fixture.position_id, fixture.user_id)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn updating_a_period_rechecks_overlap_against_the_others() {
    let conn = setup();
    let fixture = seed(&conn);
    let service = service(&conn, BoundaryPolicy::Inclusive);

    service
        .assign(
            fixture.position_id,
            fixture.user_id,
            Some(day(2019, 1, 1)),
            Some(day(2019, 6, 1)),
        )
        .unwrap();
    service
        .assign(fixture.position_id, fixture.user_id, Some(day(2020, 1, 1)), None)
        .unwrap();

    let err = service
        .update_occupancy(
            fixture.position_id,
            fixture.user_id,
            Some(day(2019, 1, 1)),
            OccupancyChange {
                end_date: Some(Some(day(2020, 2, 1))),
                ..OccupancyChange::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let updated = service
        .update_occupancy(
            fixture.position_id,
            fixture.user_id,
            Some(day(2019, 1, 1)),
            OccupancyChange {
                end_date: Some(Some(day(2019, 12, 31))),
                ..OccupancyChange::default()
            },
        )
        .unwrap();
    assert_eq!(updated.end_date, Some(day(2019, 12, 31)));

    let open = service
        .update_occupancy(
            fixture.position_id,
            fixture.user_id,
            None,
            OccupancyChange {
                start_date: Some(day(2020, 2, 1)),
                ..OccupancyChange::default()
            },
        )
        .unwrap();
    assert_eq!(open.start_date, day(2020, 2, 1));
    assert_eq!(open.end_date, None);
}

#[test]
fn delete_removes_exactly_one_period() {
    let conn = setup();
    let fixture = seed(&conn);
    let service = service(&conn, BoundaryPolicy::Inclusive);

    service
        .assign(
            fixture.position_id,
            fixture.user_id,
            Some(day(2019, 1, 1)),
            Some(day(2019, 6, 1)),
        )
        .unwrap();

    service
        .delete_assignment(fixture.user_id, fixture.position_id, day(2019, 1, 1))
        .unwrap();
    let err = service
        .delete_assignment(fixture.user_id, fixture.position_id, day(2019, 1, 1))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn listings_carry_position_context_and_filter_current() {
    let conn = setup();
    let fixture = seed(&conn);
    let service = service(&conn, BoundaryPolicy::Inclusive);

    service
        .assign(
            fixture.position_id,
            fixture.user_id,
            Some(day(2015, 1, 1)),
            Some(day(2016, 1, 1)),
        )
        .unwrap();
    service
        .assign(fixture.position_id, fixture.user_id, Some(day(2020, 1, 1)), None)
        .unwrap();

    let history = service
        .occupants(fixture.position_id, &ListParams::default(), false)
        .unwrap();
    assert_eq!(history.total, 2);
    assert_eq!(history.items[0].assignment.start_date, day(2020, 1, 1));
    assert_eq!(history.items[0].position_title, "Principal CMHS");
    assert_eq!(history.items[0].organisation_unit_name, "College of Medicine");

    let current = service
        .user_positions(fixture.user_id, &ListParams::default(), true)
        .unwrap();
    assert_eq!(current.total, 1);
    assert_eq!(current.items[0].assignment.end_date, None);

    let searched = service
        .list_assignments(
            &ListParams::default().with_search("medicine"),
            AssignmentFilter::default(),
        )
        .unwrap();
    assert_eq!(searched.total, 2);

    let ascending = service
        .list_assignments(
            &ListParams::default().with_sort("startDate", "asc"),
            AssignmentFilter {
                user_id: Some(fixture.user_id),
                ..AssignmentFilter::default()
            },
        )
        .unwrap();
    assert_eq!(ascending.items[0].assignment.start_date, day(2015, 1, 1));
}
