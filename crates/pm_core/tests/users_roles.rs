use pm_core::db::open_db_in_memory;
use pm_core::model::user::{NewPermission, NewRole, NewUser, PermissionPatch, RolePatch, UserPatch};
use pm_core::{
    ErrorKind, ListParams, PermissionService, RoleService, SqlitePermissionRepository,
    SqliteRecordGuard, SqliteRoleRepository, SqliteUserRepository, UserService,
};
use rusqlite::Connection;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

type Users<'conn> = UserService<SqliteUserRepository<'conn>, SqliteRecordGuard<'conn>>;
type Roles<'conn> = RoleService<SqliteRoleRepository<'conn>, SqliteRecordGuard<'conn>>;
type Permissions<'conn> =
    PermissionService<SqlitePermissionRepository<'conn>, SqliteRecordGuard<'conn>>;

fn users(conn: &Connection) -> Users<'_> {
    UserService::new(
        SqliteUserRepository::try_new(conn).unwrap(),
        SqliteRecordGuard::try_new(conn).unwrap(),
    )
}

fn roles(conn: &Connection) -> Roles<'_> {
    RoleService::new(
        SqliteRoleRepository::try_new(conn).unwrap(),
        SqliteRecordGuard::try_new(conn).unwrap(),
    )
}

fn permissions(conn: &Connection) -> Permissions<'_> {
    PermissionService::new(
        SqlitePermissionRepository::try_new(conn).unwrap(),
        SqliteRecordGuard::try_new(conn).unwrap(),
    )
}

fn new_role(name: &str) -> NewRole {
    NewRole {
        name: name.to_string(),
        organisation_unit_id: None,
    }
}

fn new_user(username: &str, email: &str) -> NewUser {
    NewUser {
        first_name: "Grace".to_string(),
        last_name: "Ingabire".to_string(),
        email: email.to_string(),
        username: username.to_string(),
    }
}

#[test]
fn user_email_and_username_must_be_unique() {
    let conn = setup();
    let users = UserService::new(
        SqliteUserRepository::try_new(&conn).unwrap(),
        SqliteRecordGuard::try_new(&conn).unwrap(),
    );

    let user = users
        .create(new_user("gingabire", "Grace@UR.ac.rw"))
        .unwrap();
    assert_eq!(user.email, "grace@ur.ac.rw");

    let err = users
        .create(new_user("grace2", "grace@ur.ac.rw"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = users
        .create(new_user("gingabire", "other@ur.ac.rw"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = users.create(new_user("nomail", "nomail")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let found = users
        .list(&ListParams::default().with_search("INGABIRE"))
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(users.get(user.id).unwrap().username, "gingabire");
}

#[test]
fn role_links_are_unique_per_pair() {
    let conn = setup();
    let users = UserService::new(
        SqliteUserRepository::try_new(&conn).unwrap(),
        SqliteRecordGuard::try_new(&conn).unwrap(),
    );
    let roles = RoleService::new(
        SqliteRoleRepository::try_new(&conn).unwrap(),
        SqliteRecordGuard::try_new(&conn).unwrap(),
    );

    let user = users
        .create(new_user("gingabire", "grace@ur.ac.rw"))
        .unwrap();
    let reviewer = roles
        .create(NewRole {
            name: "Reviewer".to_string(),
            organisation_unit_id: None,
        })
        .unwrap();

    let err = roles
        .create(NewRole {
            name: "Reviewer".to_string(),
            organisation_unit_id: None,
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    roles.assign_role(user.id, reviewer.id).unwrap();
    let err = roles.assign_role(user.id, reviewer.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = roles.assign_role(Uuid::new_v4(), reviewer.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let links = roles
        .list_user_roles(&ListParams::default(), Some(user.id), None)
        .unwrap();
    assert_eq!(links.total, 1);
    assert_eq!(links.items[0].role_id, reviewer.id);

    roles.remove_role(user.id, reviewer.id).unwrap();
    let err = roles.remove_role(user.id, reviewer.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn user_update_keeps_email_and_username_unique() {
    let conn = setup();
    let users = users(&conn);
    let grace = users
        .create(new_user("gingabire", "grace@ur.ac.rw"))
        .unwrap();
    users.create(new_user("jmugisha", "jean@ur.ac.rw")).unwrap();

    let err = users
        .update(
            grace.id,
            UserPatch {
                email: Some("JEAN@ur.ac.rw".to_string()),
                ..UserPatch::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = users
        .update(
            grace.id,
            UserPatch {
                first_name: Some("   ".to_string()),
                ..UserPatch::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let updated = users
        .update(
            grace.id,
            UserPatch {
                email: Some("Grace.Ingabire@UR.ac.rw".to_string()),
                username: Some("gingabire".to_string()),
                ..UserPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.email, "grace.ingabire@ur.ac.rw");
    assert_eq!(users.get(grace.id).unwrap(), updated);

    let err = users
        .update(Uuid::new_v4(), UserPatch::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn deleting_a_user_drops_their_role_links() {
    let conn = setup();
    let users = users(&conn);
    let roles = roles(&conn);
    let grace = users
        .create(new_user("gingabire", "grace@ur.ac.rw"))
        .unwrap();
    let reviewer = roles.create(new_role("Reviewer")).unwrap();
    roles.assign_role(grace.id, reviewer.id).unwrap();

    users.delete(grace.id).unwrap();
    assert_eq!(users.get(grace.id).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(users.delete(grace.id).unwrap_err().kind(), ErrorKind::NotFound);

    let links = roles
        .list_user_roles(&ListParams::default(), None, Some(reviewer.id))
        .unwrap();
    assert_eq!(links.total, 0);
    roles.delete(reviewer.id).unwrap();
}

#[test]
fn roles_can_be_renamed_but_not_deleted_while_held() {
    let conn = setup();
    let users = users(&conn);
    let roles = roles(&conn);
    let grace = users
        .create(new_user("gingabire", "grace@ur.ac.rw"))
        .unwrap();
    let reviewer = roles.create(new_role("Reviewer")).unwrap();
    roles.create(new_role("Administrator")).unwrap();

    let err = roles
        .update(
            reviewer.id,
            RolePatch {
                name: Some("Administrator".to_string()),
                ..RolePatch::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = roles
        .update(
            reviewer.id,
            RolePatch {
                organisation_unit_id: Some(Some(Uuid::new_v4())),
                ..RolePatch::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let renamed = roles
        .update(
            reviewer.id,
            RolePatch {
                name: Some("Senior Reviewer".to_string()),
                ..RolePatch::default()
            },
        )
        .unwrap();
    assert_eq!(renamed.name, "Senior Reviewer");

    roles.assign_role(grace.id, reviewer.id).unwrap();
    let err = roles.delete(reviewer.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.to_string().contains("1 user(s)"));

    roles.remove_role(grace.id, reviewer.id).unwrap();
    roles.delete(reviewer.id).unwrap();
    assert_eq!(roles.get(reviewer.id).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn permission_codes_are_unique_and_editable() {
    let conn = setup();
    let permissions = permissions(&conn);
    let read = permissions
        .create(NewPermission::new("projects.read").with_description("View projects"))
        .unwrap();
    let write = permissions.create(NewPermission::new("projects.write")).unwrap();

    let err = permissions
        .create(NewPermission::new("projects.read"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let err = permissions.create(NewPermission::new("  ")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let err = permissions
        .update(
            write.id,
            PermissionPatch {
                code: Some("projects.read".to_string()),
                ..PermissionPatch::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let updated = permissions
        .update(
            read.id,
            PermissionPatch {
                description: Some(None),
                ..PermissionPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.description, None);

    let found = permissions
        .list(&ListParams::default().with_search("WRITE"))
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].id, write.id);

    permissions.delete(write.id).unwrap();
    let err = permissions.delete(write.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn granted_permissions_are_listed_and_protected() {
    let conn = setup();
    let roles = roles(&conn);
    let permissions = permissions(&conn);
    let reviewer = roles.create(new_role("Reviewer")).unwrap();
    let write = permissions.create(NewPermission::new("reports.write")).unwrap();
    let read = permissions.create(NewPermission::new("reports.read")).unwrap();

    roles.grant_permission(reviewer.id, write.id).unwrap();
    let grant = roles.grant_permission(reviewer.id, read.id).unwrap();
    assert_eq!(grant.role_id, reviewer.id);
    assert_eq!(grant.permission_id, read.id);

    let err = roles.grant_permission(reviewer.id, read.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let err = roles
        .grant_permission(reviewer.id, Uuid::new_v4())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let codes: Vec<String> = roles
        .permissions(reviewer.id)
        .unwrap()
        .into_iter()
        .map(|permission| permission.code)
        .collect();
    assert_eq!(codes, ["reports.read", "reports.write"]);

    let err = permissions.delete(read.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    roles.revoke_permission(reviewer.id, read.id).unwrap();
    let err = roles.revoke_permission(reviewer.id, read.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    permissions.delete(read.id).unwrap();

    roles.delete(reviewer.id).unwrap();
    permissions.delete(write.id).unwrap();
}
