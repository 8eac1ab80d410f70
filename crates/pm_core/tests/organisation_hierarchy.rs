use pm_core::db::open_db_in_memory;
use pm_core::model::organisation_unit::{NewOrganisationUnit, OrganisationUnitPatch};
use pm_core::model::position::NewPosition;
use pm_core::{
    ErrorKind, ListParams, OrganisationUnitService, PageRequest, PositionService, ServiceError,
    SqliteOrganisationUnitRepository, SqlitePositionRepository, SqliteRecordGuard,
};
use rusqlite::Connection;
use uuid::Uuid;

type Units<'conn> =
    OrganisationUnitService<SqliteOrganisationUnitRepository<'conn>, SqliteRecordGuard<'conn>>;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn units(conn: &Connection) -> Units<'_> {
    OrganisationUnitService::new(
        SqliteOrganisationUnitRepository::try_new(conn).unwrap(),
        SqliteRecordGuard::try_new(conn).unwrap(),
    )
}

#[test]
fn child_unit_appears_in_tree_and_ancestry() {
    let conn = setup();
    let service = units(&conn);

    let university = service
        .create(NewOrganisationUnit::new("University").with_code("UR"))
        .unwrap();
    let college = service
        .add_child(university.id, NewOrganisationUnit::new("College A"))
        .unwrap();
    assert_eq!(college.parent_id, Some(university.id));

    let forest = service.tree().unwrap();
    assert!(forest.orphaned.is_empty());
    assert_eq!(forest.roots.len(), 1);
    assert_eq!(forest.roots[0].node.id, university.id);
    assert_eq!(forest.roots[0].children.len(), 1);
    assert_eq!(forest.roots[0].children[0].node.id, college.id);

    let chain = service.hierarchy(college.id).unwrap();
    let names: Vec<&str> = chain.iter().map(|unit| unit.name.as_str()).collect();
    assert_eq!(names, vec!["University", "College A"]);

    assert_eq!(service.parent(college.id).unwrap().unwrap().id, university.id);
    assert!(service.parent(university.id).unwrap().is_none());
}

#[test]
fn siblings_are_ordered_by_name() {
    let conn = setup();
    let service = units(&conn);
    let root = service.create(NewOrganisationUnit::new("Root")).unwrap();
    service
        .add_child(root.id, NewOrganisationUnit::new("Zeta School"))
        .unwrap();
    service
        .add_child(root.id, NewOrganisationUnit::new("Alpha School"))
        .unwrap();

    let children = service.children(root.id).unwrap();
    assert_eq!(children[0].name, "Alpha School");
    assert_eq!(children[1].name, "Zeta School");
}

#[test]
fn missing_parent_is_not_found() {
    let conn = setup();
    let service = units(&conn);

    let err = service
        .add_child(Uuid::new_v4(), NewOrganisationUnit::new("Orphan"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn hierarchy_of_unknown_unit_is_not_found() {
    let conn = setup();
    let service = units(&conn);

    let err = service.hierarchy(Uuid::new_v4()).unwrap_err();
    match err {
        ServiceError::NotFound { entity, .. } => assert_eq!(entity, "organisation unit"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn duplicate_code_is_a_conflict() {
    let conn = setup();
    let service = units(&conn);
    service
        .create(NewOrganisationUnit::new("College of Science").with_code("CST"))
        .unwrap();

    let err = service
        .create(NewOrganisationUnit::new("Another").with_code("CST"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn moving_a_unit_under_its_descendant_is_rejected() {
    let conn = setup();
    let service = units(&conn);
    let root = service.create(NewOrganisationUnit::new("Root")).unwrap();
    let child = service
        .add_child(root.id, NewOrganisationUnit::new("Child"))
        .unwrap();
    let grandchild = service
        .add_child(child.id, NewOrganisationUnit::new("Grandchild"))
        .unwrap();

    let err = service
        .update(
            root.id,
            OrganisationUnitPatch {
                parent_id: Some(Some(grandchild.id)),
                ..OrganisationUnitPatch::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let err = service
        .update(
            root.id,
            OrganisationUnitPatch {
                parent_id: Some(Some(root.id)),
                ..OrganisationUnitPatch::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let moved = service
        .update(
            grandchild.id,
            OrganisationUnitPatch {
                parent_id: Some(None),
                ..OrganisationUnitPatch::default()
            },
        )
        .unwrap();
    assert_eq!(moved.parent_id, None);
    assert_eq!(service.tree().unwrap().roots.len(), 2);
}

#[test]
fn delete_is_blocked_by_children_and_positions() {
    let conn = setup();
    let service = units(&conn);
    let positions = PositionService::new(
        SqlitePositionRepository::try_new(&conn).unwrap(),
        SqliteRecordGuard::try_new(&conn).unwrap(),
    );

    let root = service.create(NewOrganisationUnit::new("Root")).unwrap();
    let leaf = service
        .add_child(root.id, NewOrganisationUnit::new("Leaf"))
        .unwrap();
    positions
        .create(NewPosition::new("Dean of Leaf", leaf.id))
        .unwrap();

    assert_eq!(
        service.delete(root.id).unwrap_err().kind(),
        ErrorKind::BadRequest
    );
    assert_eq!(
        service.delete(leaf.id).unwrap_err().kind(),
        ErrorKind::BadRequest
    );
    assert_eq!(service.positions(leaf.id).unwrap().len(), 1);
}

#[test]
fn delete_removes_an_empty_leaf() {
    let conn = setup();
    let service = units(&conn);
    let root = service.create(NewOrganisationUnit::new("Root")).unwrap();
    let leaf = service
        .add_child(root.id, NewOrganisationUnit::new("Leaf"))
        .unwrap();

    service.delete(leaf.id).unwrap();
    assert_eq!(service.get(leaf.id).unwrap_err().kind(), ErrorKind::NotFound);
    assert!(service.children(root.id).unwrap().is_empty());
}

#[test]
fn list_searches_name_and_code_and_paginates() {
    let conn = setup();
    let service = units(&conn);
    let root = service
        .create(NewOrganisationUnit::new("University of Rwanda").with_code("UR"))
        .unwrap();
    for (name, code) in [
        ("College of Arts and Social Sciences", "CASS"),
        ("College of Science and Technology", "CST"),
        ("College of Medicine", "CMHS"),
    ] {
        service
            .add_child(root.id, NewOrganisationUnit::new(name).with_code(code))
            .unwrap();
    }

    let by_code = service
        .list(&ListParams::default().with_search("cass"), None)
        .unwrap();
    assert_eq!(by_code.total, 1);
    assert_eq!(by_code.items[0].code.as_deref(), Some("CASS"));

    let children = service
        .list(
            &ListParams::default()
                .with_sort("name", "desc")
                .with_page(PageRequest::new(Some(1), Some(2))),
            Some(root.id),
        )
        .unwrap();
    assert_eq!(children.total, 3);
    assert_eq!(children.items.len(), 2);
    assert_eq!(children.items[0].name, "College of Science and Technology");

    let meta = children.meta("/organisation-units");
    assert_eq!(meta.total_pages, 2);
    assert_eq!(
        meta.links.next.as_deref(),
        Some("/organisation-units?page=2&limit=2")
    );
}

#[test]
fn search_folds_accented_names_in_either_case() {
    let conn = setup();
    let service = units(&conn);
    let school = service
        .create(NewOrganisationUnit::new("École Normale").with_code("ÉN"))
        .unwrap();
    service.create(NewOrganisationUnit::new("Ecole Technique")).unwrap();

    for term in ["École", "école", "ÉCOLE NORMALE", "én"] {
        let found = service
            .list(&ListParams::default().with_search(term), None)
            .unwrap();
        assert_eq!(found.total, 1, "search term {term}");
        assert_eq!(found.items[0].id, school.id);
    }
}
