//! Command-line entry point over `pm_core`.
//!
//! # Responsibility
//! - Wire configuration, logging and the database for one invocation.
//! - Print every result as a JSON response envelope on stdout.

use clap::{Args, Parser, Subcommand};
use log::{error, info};
use pm_core::model::category::NewCategory;
use pm_core::model::funder::NewFunder;
use pm_core::model::organisation_unit::NewOrganisationUnit;
use pm_core::model::position::NewPosition;
use pm_core::model::project::{NewProject, ProjectFilter, ProjectStatus};
use pm_core::model::user::NewUser;
use pm_core::{
    init_logging, open_from_config, AssignmentService, CategoryService, ConfigError, CoreConfig,
    DbError, Envelope, FunderService, ListParams, OrganisationUnitService, PageRequest,
    PositionService, ProjectLinkService, ProjectService, ServiceError, SqliteAssignmentRepository,
    SqliteCategoryRepository, SqliteFunderRepository, SqliteOrganisationUnitRepository,
    SqlitePositionRepository, SqliteProjectLinkRepository, SqliteProjectRepository,
    SqliteRecordGuard, SqliteUserRepository, RepoError, UserService,
};
use rusqlite::Connection;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "pm", about = "Inspect and seed the project-management store", version)]
struct Cli {
    /// SQLite file to use instead of `PM_DATABASE_PATH`
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert a small university hierarchy with positions, categories, funders and a project
    SeedDemo,
    /// Print the organisation unit forest
    OrgTree,
    /// Print the category forest
    CategoryTree,
    /// Print the ancestry of one organisation unit, root first
    OrgHierarchy { id: Uuid },
    /// List funders
    Funders(ListArgs),
    /// List projects
    Projects(ProjectArgs),
}

#[derive(Args, Debug, Default)]
struct ListArgs {
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    sort_by: Option<String>,
    #[arg(long)]
    sort_order: Option<String>,
}

impl ListArgs {
    fn params(&self) -> ListParams {
        ListParams {
            page: PageRequest::new(self.page, self.limit),
            search: self.search.clone(),
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order.clone(),
        }
    }
}

#[derive(Args, Debug, Default)]
struct ProjectArgs {
    #[command(flatten)]
    list: ListArgs,
    #[arg(long)]
    organisation_unit: Option<Uuid>,
    /// Repeatable status filter, e.g. `--status funded`
    #[arg(long = "status")]
    statuses: Vec<ProjectStatus>,
    #[arg(long)]
    year_from: Option<i32>,
    #[arg(long)]
    year_to: Option<i32>,
}

#[derive(Debug)]
enum CliError {
    Config(ConfigError),
    Logging(String),
    Db(DbError),
    Service(ServiceError),
    Output(serde_json::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Logging(err) => write!(f, "logging error: {err}"),
            Self::Db(err) => write!(f, "database error: {err}"),
            Self::Service(err) => write!(f, "{err}"),
            Self::Output(err) => write!(f, "output error: {err}"),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ServiceError> for CliError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Service(value.into())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = CoreConfig::load()?;
    if let Some(path) = cli.database {
        config.database_path = Some(path);
    }
    init_logging(config.log_level, config.log_dir.as_deref()).map_err(CliError::Logging)?;
    let conn = open_from_config(&config)?;

    match cli.command {
        Command::SeedDemo => seed_demo(&conn, &config),
        Command::OrgTree => {
            let forest = org_units(&conn)?.tree()?;
            print(&Envelope::ok("Organisation unit tree retrieved", forest.roots))
        }
        Command::CategoryTree => {
            let forest = categories(&conn)?.tree()?;
            print(&Envelope::ok("Category tree retrieved", forest.roots))
        }
        Command::OrgHierarchy { id } => {
            let chain = org_units(&conn)?.hierarchy(id)?;
            print(&Envelope::ok("Organisation unit hierarchy retrieved", chain))
        }
        Command::Funders(args) => {
            let service = FunderService::new(
                SqliteFunderRepository::try_new(&conn)?,
                SqliteRecordGuard::try_new(&conn)?,
            );
            let page = service.list(&args.params())?;
            print(&Envelope::page("Funders retrieved", page, "/funders"))
        }
        Command::Projects(args) => {
            let service = ProjectService::new(
                SqliteProjectRepository::try_new(&conn)?,
                SqliteRecordGuard::try_new(&conn)?,
            );
            let filter = ProjectFilter {
                organisation_unit_id: args.organisation_unit,
                statuses: args.statuses,
                year_from: args.year_from,
                year_to: args.year_to,
            };
            let page = service.list(&args.list.params(), &filter)?;
            print(&Envelope::page("Projects retrieved", page, "/projects"))
        }
    }
}

type OrgUnitService<'conn> =
    OrganisationUnitService<SqliteOrganisationUnitRepository<'conn>, SqliteRecordGuard<'conn>>;

fn org_units(conn: &Connection) -> Result<OrgUnitService<'_>, CliError> {
    Ok(OrganisationUnitService::new(
        SqliteOrganisationUnitRepository::try_new(conn)?,
        SqliteRecordGuard::try_new(conn)?,
    ))
}

fn categories(
    conn: &Connection,
) -> Result<CategoryService<SqliteCategoryRepository<'_>, SqliteRecordGuard<'_>>, CliError> {
    Ok(CategoryService::new(
        SqliteCategoryRepository::try_new(conn)?,
        SqliteRecordGuard::try_new(conn)?,
    ))
}

/// Seeds one university with its colleges, schools, principal positions and a funded project.
fn seed_demo(conn: &Connection, config: &CoreConfig) -> Result<(), CliError> {
    let units = org_units(conn)?;
    let positions = PositionService::new(
        SqlitePositionRepository::try_new(conn)?,
        SqliteRecordGuard::try_new(conn)?,
    );

    let university = units.create(NewOrganisationUnit::new("University of Rwanda").with_code("UR"))?;
    let colleges = [
        ("College of Arts and Social Sciences", "CASS", "School of Law"),
        (
            "College of Agriculture, Animal Sciences and Veterinary Medicine",
            "CAVM",
            "School of Veterinary Medicine",
        ),
        ("College of Science and Technology", "CST", "School of Engineering"),
    ];
    let mut principal_positions = Vec::with_capacity(colleges.len());
    for (name, code, school) in colleges {
        let college = units.add_child(university.id, NewOrganisationUnit::new(name).with_code(code))?;
        let position = positions.create(NewPosition::new(format!("Principal {code}"), college.id))?;
        principal_positions.push(position.id);
        units.add_child(college.id, NewOrganisationUnit::new(school))?;
    }
    let first_principal = principal_positions[0];

    let categories = categories(conn)?;
    let health = categories.create(NewCategory::new("Health"))?;
    categories.create_child(
        health.id,
        NewCategory::new("Public Health").with_description("Population-level research"),
    )?;
    categories.create(NewCategory::new("Agriculture"))?;

    let funders = FunderService::new(
        SqliteFunderRepository::try_new(conn)?,
        SqliteRecordGuard::try_new(conn)?,
    );
    let global_fund = funders.create(NewFunder::new("Global Fund", "International"))?;
    funders.create(NewFunder::new("National Research Council", "Government"))?;

    let projects = ProjectService::new(
        SqliteProjectRepository::try_new(conn)?,
        SqliteRecordGuard::try_new(conn)?,
    );
    let malaria = projects.create(NewProject {
        category_id: Some(health.id),
        ..NewProject::new("Malaria Mapping", 2024, university.id)
    })?;
    ProjectLinkService::new(
        SqliteProjectLinkRepository::try_new(conn)?,
        SqliteRecordGuard::try_new(conn)?,
    )
    .add_funder(malaria.id, global_fund.id, Some(250_000.0))?;

    let users = UserService::new(
        SqliteUserRepository::try_new(conn)?,
        SqliteRecordGuard::try_new(conn)?,
    );
    let principal = users.create(NewUser {
        first_name: "Aline".to_string(),
        last_name: "Mukamana".to_string(),
        email: "aline.mukamana@ur.ac.rw".to_string(),
        username: "amukamana".to_string(),
    })?;
    let assignments = AssignmentService::new(
        SqliteAssignmentRepository::try_new(conn)?,
        SqliteRecordGuard::try_new(conn)?,
        config.overlap_policy,
    );
    assignments.assign(first_principal, principal.id, None, None)?;
    info!(
        "event=seed_demo module=cli status=ok overlap_policy={:?}",
        assignments.policy()
    );

    let forest = units.tree()?;
    print(&Envelope::ok("Demo data seeded", forest.roots))
}

fn print<T: Serialize>(envelope: &Envelope<T>) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}
