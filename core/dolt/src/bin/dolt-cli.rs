//! A thin `clap` wrapper exercising the `dolt-core` facade end to end (SPEC_FULL.md §0/§6):
//! `init`, `branch`, `checkout`, `commit`, `log`, `diff`, `merge`, `gc` against a toy,
//! single-column-per-flag row model. SQL parsing stays out of scope (spec.md §1); this is
//! the plumbing layer a SQL engine would sit on top of, made directly drivable.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand};
use dolt_core::{
    collect_garbage, decode_schema, encode_schema, row_key, row_value, ChildRef, ColumnDescriptor, ColumnType, Commit,
    CommitIterator, CommitMeta, Hash, JsonRefStore, NbsConfig, NbsStore, Number, ReachableSet, RefKind, RefName, RefStore, Repo,
    Schema, Table, Tree, Value,
};

/// Exit codes for the CLI boundary (spec.md §6): 0 success, 1 user error, 2 data/conflict,
/// 3 I/O or store error.
const EXIT_USER_ERROR: i32 = 1;
const EXIT_CONFLICT: i32 = 2;
const EXIT_STORE_ERROR: i32 = 3;

#[derive(Parser)]
#[command(name = "dolt-cli", about = "Plumbing CLI over the dolt-core facade")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a fresh repository directory.
    Init(InitArgs),
    /// Create a new branch pointing at another branch's current commit.
    Branch(BranchArgs),
    /// Switch the repository's current branch.
    Checkout(CheckoutArgs),
    /// Upsert one row into a table on the current branch and commit.
    Commit(CommitArgs),
    /// Print the current branch's commit history (first-parent order).
    Log(LogArgs),
    /// Diff one table's rows between two commits.
    Diff(DiffArgs),
    /// Three-way merge another branch into the current branch.
    Merge(MergeArgs),
    /// Run mark-and-sweep garbage collection.
    Gc(GcArgs),
}

#[derive(Args)]
struct InitArgs {
    repo: PathBuf,
}

#[derive(Args)]
struct BranchArgs {
    repo: PathBuf,
    name: String,
    #[arg(long)]
    from: Option<String>,
}

#[derive(Args)]
struct CheckoutArgs {
    repo: PathBuf,
    branch: String,
}

#[derive(Args)]
struct CommitArgs {
    repo: PathBuf,
    #[arg(long)]
    table: String,
    /// `name:type`, e.g. `a:int`, repeatable; only consulted when the table doesn't exist
    /// yet. The first such flag is the primary key.
    #[arg(long = "col")]
    columns: Vec<String>,
    /// `name=value`, repeatable; must cover every column declared (or already stored) for
    /// this table.
    #[arg(long = "set")]
    values: Vec<String>,
    #[arg(long, default_value = "commit")]
    message: String,
    #[arg(long, default_value = "dolt-cli")]
    author_name: String,
    #[arg(long, default_value = "dolt-cli@example.com")]
    author_email: String,
}

#[derive(Args)]
struct LogArgs {
    repo: PathBuf,
}

#[derive(Args)]
struct DiffArgs {
    repo: PathBuf,
    #[arg(long)]
    table: String,
    before: String,
    after: String,
}

#[derive(Args)]
struct MergeArgs {
    repo: PathBuf,
    #[arg(long)]
    table: String,
    theirs_branch: String,
    #[arg(long, default_value = "merge")]
    message: String,
}

#[derive(Args)]
struct GcArgs {
    repo: PathBuf,
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let code = match run(cli.command) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err:#}");
            err.chain().find_map(|cause| cause.downcast_ref::<CliExit>()).map(|e| e.0).unwrap_or(EXIT_STORE_ERROR)
        }
    };
    std::process::exit(code);
}

/// Carries a specific exit code through `anyhow::Error`, per spec.md §6's CLI exit codes.
#[derive(Debug)]
struct CliExit(i32, String);

impl std::fmt::Display for CliExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.1)
    }
}

impl std::error::Error for CliExit {}

fn user_error(msg: impl Into<String>) -> anyhow::Error {
    CliExit(EXIT_USER_ERROR, msg.into()).into()
}

fn conflict_error(msg: impl Into<String>) -> anyhow::Error {
    CliExit(EXIT_CONFLICT, msg.into()).into()
}

fn dolt_dir(repo: &Path) -> PathBuf {
    repo.join(".dolt")
}

fn head_path(repo: &Path) -> PathBuf {
    dolt_dir(repo).join("HEAD")
}

fn read_head(repo: &Path) -> anyhow::Result<RefName> {
    let text = fs::read_to_string(head_path(repo)).map_err(|_| user_error(format!("{} is not a dolt repository", repo.display())))?;
    text.trim().parse().map_err(|e| user_error(format!("corrupt HEAD: {e}")))
}

fn write_head(repo: &Path, branch: &RefName) -> anyhow::Result<()> {
    fs::write(head_path(repo), branch.to_string())?;
    Ok(())
}

fn open_repo(repo: &Path) -> anyhow::Result<Repo> {
    let store = NbsStore::open(dolt_dir(repo).join("noms"), NbsConfig::default())?;
    let refs = JsonRefStore::open(dolt_dir(repo).join("repo_state.json"))?;
    Ok(Repo::new(Arc::new(store), Arc::new(refs)))
}

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Init(args) => init(args),
        Command::Branch(args) => branch(args),
        Command::Checkout(args) => checkout(args),
        Command::Commit(args) => commit(args),
        Command::Log(args) => log(args),
        Command::Diff(args) => diff(args),
        Command::Merge(args) => merge(args),
        Command::Gc(args) => gc(args),
    }
}

fn init(args: InitArgs) -> anyhow::Result<()> {
    let dolt = dolt_dir(&args.repo);
    if dolt.exists() {
        return Err(user_error(format!("{} is already a dolt repository", args.repo.display())));
    }
    NbsStore::open(dolt.join("noms"), NbsConfig::default())?;
    JsonRefStore::open(dolt.join("repo_state.json"))?;
    let main = RefName::branch("main").map_err(|e| user_error(e.to_string()))?;
    write_head(&args.repo, &main)?;
    println!("Initialized empty dolt repository in {}", dolt.display());
    Ok(())
}

fn branch(args: BranchArgs) -> anyhow::Result<()> {
    let repo = open_repo(&args.repo)?;
    let new_name = RefName::branch(&args.name).map_err(|e| user_error(e.to_string()))?;
    if repo.resolve_ref(&new_name)?.is_some() {
        return Err(user_error(format!("branch {} already exists", args.name)));
    }
    let source = match &args.from {
        Some(name) => RefName::branch(name).map_err(|e| user_error(e.to_string()))?,
        None => read_head(&args.repo)?,
    };
    let head = repo
        .resolve_ref(&source)?
        .ok_or_else(|| user_error(format!("branch {source} has no commits yet")))?;
    if !repo.update_ref(&new_name, None, head)? {
        return Err(conflict_error(format!("branch {} was created concurrently", args.name)));
    }
    println!("Created branch {} at {head}", args.name);
    Ok(())
}

fn checkout(args: CheckoutArgs) -> anyhow::Result<()> {
    let repo = open_repo(&args.repo)?;
    let branch = RefName::branch(&args.branch).map_err(|e| user_error(e.to_string()))?;
    if repo.resolve_ref(&branch)?.is_none() {
        return Err(user_error(format!("no such branch: {}", args.branch)));
    }
    write_head(&args.repo, &branch)?;
    println!("Switched to branch {}", args.branch);
    Ok(())
}

fn parse_column(spec: &str) -> anyhow::Result<(String, ColumnType)> {
    let (name, ty) = spec.split_once(':').ok_or_else(|| user_error(format!("bad --col {spec:?}, expected name:type")))?;
    let col_type = match ty {
        "int" => ColumnType::Int64,
        "text" => ColumnType::Varchar(255),
        "bool" => ColumnType::Bool,
        other => return Err(user_error(format!("unknown column type {other:?}"))),
    };
    Ok((name.to_string(), col_type))
}

fn parse_value(col_type: &ColumnType, text: &str) -> anyhow::Result<Value> {
    Ok(match col_type {
        ColumnType::Int64 | ColumnType::Int32 | ColumnType::Int16 | ColumnType::Int8 => {
            Value::Number(Number::from_i64(text.parse().map_err(|_| user_error(format!("{text:?} is not an integer")))?))
        }
        ColumnType::Bool => Value::Bool(text.parse().map_err(|_| user_error(format!("{text:?} is not a bool")))?),
        _ => Value::String(text.to_string()),
    })
}

fn build_schema(columns: &[String]) -> anyhow::Result<Schema> {
    if columns.is_empty() {
        return Err(user_error("a new table needs at least one --col"));
    }
    let mut descriptors = Vec::new();
    for (i, spec) in columns.iter().enumerate() {
        let (name, col_type) = parse_column(spec)?;
        descriptors.push(ColumnDescriptor {
            name,
            col_type,
            pk_position: if i == 0 { Some(0) } else { None },
            nullable: i != 0,
            default: None,
            auto_increment: false,
        });
    }
    Ok(Schema { columns: descriptors, ..Schema::default() })
}

fn parse_assignments(values: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    values
        .iter()
        .map(|kv| {
            kv.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| user_error(format!("bad --set {kv:?}, expected name=value")))
        })
        .collect()
}

fn commit(args: CommitArgs) -> anyhow::Result<()> {
    let repo = open_repo(&args.repo)?;
    let branch = read_head(&args.repo)?;
    let parent = repo.resolve_ref(&branch)?;
    let root = match parent {
        Some(hash) => {
            let commit = repo.load_commit(hash)?;
            repo.open_root(commit.value)?
        }
        None => repo.open_root(Hash::EMPTY)?,
    };

    let existing = repo.get_table(&root, &args.table)?;
    let schema = match &existing {
        Some(table) => decode_schema(&repo.store().get(&table.schema)?)?,
        None => build_schema(&args.columns)?,
    };
    let schema_hash = match &existing {
        Some(table) => table.schema,
        None => repo.store().put(encode_schema(&schema))?,
    };

    let assignments = parse_assignments(&args.values)?;
    let mut row = vec![Value::Bool(false); schema.columns.len()];
    for (name, text) in &assignments {
        let pos = schema.columns.iter().position(|c| &c.name == name).ok_or_else(|| user_error(format!("unknown column {name}")))?;
        row[pos] = parse_value(&schema.columns[pos].col_type, text)?;
    }
    let pk_col = schema.pk_columns().first().copied().ok_or_else(|| user_error("schema has no primary key"))?.name.clone();
    if !assignments.iter().any(|(k, _)| k == &pk_col) {
        return Err(user_error(format!("--set must include the primary key column {pk_col}")));
    }

    let key = row_key(&schema, &row);
    let value = row_value(&schema, &row);

    let table = existing.unwrap_or_else(|| Table {
        schema: schema_hash,
        rows: None,
        indexes: vec![],
        autoinc: Number::from_i64(0),
        constraint_violations: None,
        conflicts: None,
    });

    let tree = Tree::from_root(repo.store().as_ref(), table.rows.clone());
    let edited = tree.edit(vec![(key, Some(value))])?;
    let new_table = Table { rows: edited.root_ref().cloned(), ..table };

    let (new_root, _) = repo.put_table(&root, &args.table, &new_table)?;
    let root_hash = repo.store().put(dolt_core::encode_root_value(&new_root))?;
    let meta = CommitMeta {
        name: args.author_name,
        email: args.author_email,
        timestamp: now_unix(),
        description: args.message,
        extra: vec![],
    };
    let commit_hash = repo.commit_working_set(&branch, root_hash, meta)?;
    println!("{commit_hash}");
    Ok(())
}

fn log(args: LogArgs) -> anyhow::Result<()> {
    let repo = open_repo(&args.repo)?;
    let branch = read_head(&args.repo)?;
    let Some(head) = repo.resolve_ref(&branch)? else {
        println!("(no commits on {branch})");
        return Ok(());
    };
    for entry in CommitIterator::new(repo.store().as_ref(), head) {
        let (hash, commit) = entry?;
        print_commit(hash, &commit);
    }
    Ok(())
}

fn print_commit(hash: Hash, commit: &Commit) {
    println!("commit {hash}");
    println!("Author: {} <{}>", commit.meta.name, commit.meta.email);
    println!("Date:   {}", commit.meta.timestamp);
    println!();
    println!("    {}", commit.meta.description);
    println!();
}

fn resolve_rev(repo: &Repo, text: &str) -> anyhow::Result<Hash> {
    if let Ok(hash) = text.parse::<Hash>() {
        return Ok(hash);
    }
    let branch = RefName::branch(text).map_err(|e| user_error(e.to_string()))?;
    repo.resolve_ref(&branch)?.ok_or_else(|| user_error(format!("unknown revision {text}")))
}

fn table_rows_at(repo: &Repo, commit_hash: Hash, table: &str) -> anyhow::Result<Option<ChildRef>> {
    let commit = repo.load_commit(commit_hash)?;
    let root = repo.open_root(commit.value)?;
    Ok(repo.get_table(&root, table)?.and_then(|t| t.rows))
}

fn diff(args: DiffArgs) -> anyhow::Result<()> {
    let repo = open_repo(&args.repo)?;
    let before_hash = resolve_rev(&repo, &args.before)?;
    let after_hash = resolve_rev(&repo, &args.after)?;
    let before_root = repo.open_root(repo.load_commit(before_hash)?.value)?;
    let after_root = repo.open_root(repo.load_commit(after_hash)?.value)?;
    let before_table = repo.get_table(&before_root, &args.table)?;
    let after_table = repo.get_table(&after_root, &args.table)?;
    let diff = repo.diff_table(before_table.as_ref(), after_table.as_ref())?;

    for (key, value) in &diff.added {
        println!("+ {key:?} => {value:?}");
    }
    for (key, value) in &diff.removed {
        println!("- {key:?} => {value:?}");
    }
    for (key, old, new) in &diff.modified {
        println!("~ {key:?}: {old:?} -> {new:?}");
    }
    Ok(())
}

fn merge(args: MergeArgs) -> anyhow::Result<()> {
    let repo = open_repo(&args.repo)?;
    let ours_branch = read_head(&args.repo)?;
    let theirs_branch = RefName::branch(&args.theirs_branch).map_err(|e| user_error(e.to_string()))?;

    let ours_head = repo.resolve_ref(&ours_branch)?.ok_or_else(|| user_error(format!("{ours_branch} has no commits")))?;
    let theirs_head =
        repo.resolve_ref(&theirs_branch)?.ok_or_else(|| user_error(format!("branch {} has no commits", args.theirs_branch)))?;
    let base_hash = dolt_core::merge_base(repo.store().as_ref(), ours_head, theirs_head)?
        .ok_or_else(|| user_error("branches share no history"))?;

    let base_rows = table_rows_at(&repo, base_hash, &args.table)?;
    let ours_rows = table_rows_at(&repo, ours_head, &args.table)?;
    let theirs_rows = table_rows_at(&repo, theirs_head, &args.table)?;

    let result = repo.merge_rows(base_rows.as_ref(), ours_rows.as_ref(), theirs_rows.as_ref())?;
    if !result.conflicts.is_empty() {
        for conflict in &result.conflicts {
            println!("conflict: {conflict:?}");
        }
        return Err(conflict_error(format!("{} row conflict(s); resolve before committing", result.conflicts.len())));
    }

    let ours_commit = repo.load_commit(ours_head)?;
    let ours_root = repo.open_root(ours_commit.value)?;
    let ours_table = repo.get_table(&ours_root, &args.table)?.ok_or_else(|| user_error("table missing on current branch"))?;
    let merged_table = Table { rows: result.rows, ..ours_table };
    let (new_root, _) = repo.put_table(&ours_root, &args.table, &merged_table)?;
    let root_hash = repo.store().put(dolt_core::encode_root_value(&new_root))?;

    let meta = CommitMeta {
        name: "dolt-cli".to_string(),
        email: "dolt-cli@example.com".to_string(),
        timestamp: now_unix(),
        description: args.message,
        extra: vec![],
    };
    let commit_hash = repo.commit_working_set(&ours_branch, root_hash, meta)?;
    println!("{commit_hash}");
    Ok(())
}

fn gc(args: GcArgs) -> anyhow::Result<()> {
    let dolt = dolt_dir(&args.repo);
    let store = NbsStore::open(dolt.join("noms"), NbsConfig::default())?;
    let refs = JsonRefStore::open(dolt.join("repo_state.json"))?;

    let mut roots = Vec::new();
    for kind in [RefKind::Branch, RefKind::Tag, RefKind::Remote, RefKind::WorkingSet] {
        for name in refs.list(kind)? {
            if let Some(hash) = refs.get(&name)? {
                roots.push(hash);
            }
        }
    }

    let reachable = collect_garbage(&store, roots)?;
    println!("GC complete: {} chunks reachable", reachable.len());
    Ok(())
}
