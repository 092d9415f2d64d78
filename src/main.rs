use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use my_budget_client::models::{
    CategoryDraft, CategoryKind, Credentials, DepositDraft, ExpenseDraft, PasswordUpdate, Period,
    ProfileUpdate, Registration, StatisticsQuery,
};
use my_budget_client::resources::Resource;
use my_budget_client::router::{Navigation, resolve};
use my_budget_client::statistics::parse_date;
use my_budget_client::{App, Config, ResourceStore, cookies};

const DEFAULT_SESSION_FILE: &str = ".my-budget.cookies";

#[derive(Parser, Debug)]
#[command(name = "my-budget", about = "Personal finance tracker client")]
struct Cli {
    /// Overrides API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Where session cookies are kept between runs (overrides SESSION_FILE)
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "MY_BUDGET_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        remember: bool,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "MY_BUDGET_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Show the signed-in user
    Me,
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
    },
    /// Change the password; both values may come from the environment
    /// instead of the command line
    Password {
        #[arg(long, env = "MY_BUDGET_PASSWORD", hide_env_values = true)]
        current: String,
        #[arg(long, env = "MY_BUDGET_NEW_PASSWORD", hide_env_values = true)]
        new: String,
    },
    /// Print the Google sign-in URL
    GoogleUrl,
    #[command(subcommand)]
    Categories(CategoryCommand),
    #[command(subcommand)]
    Deposits(EntryCommand),
    #[command(subcommand)]
    Expenses(EntryCommand),
    Stats {
        #[arg(long, default_value = "month")]
        period: Period,
        /// YYYY-MM-DD, custom period only
        #[arg(long)]
        start: Option<String>,
        /// YYYY-MM-DD, custom period only
        #[arg(long)]
        end: Option<String>,
    },
    /// Check where navigating to PATH would lead
    Route { path: String },
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    List {
        #[arg(long)]
        kind: Option<CategoryKind>,
        /// Only top-level categories
        #[arg(long)]
        main: bool,
        #[arg(long)]
        parent: Option<String>,
    },
    Show { id: String },
    Create(CategoryFields),
    Update {
        id: String,
        #[command(flatten)]
        fields: CategoryFields,
    },
    Delete { id: String },
}

#[derive(Args, Debug)]
struct CategoryFields {
    #[arg(long)]
    name: String,
    #[arg(long)]
    income: bool,
    #[arg(long)]
    parent: Option<i64>,
}

impl From<CategoryFields> for CategoryDraft {
    fn from(f: CategoryFields) -> Self {
        CategoryDraft {
            name: f.name,
            is_income: f.income,
            parent_id: f.parent,
        }
    }
}

#[derive(Subcommand, Debug)]
enum EntryCommand {
    List,
    Show { id: String },
    Create(EntryFields),
    Update {
        id: String,
        #[command(flatten)]
        fields: EntryFields,
    },
    Delete { id: String },
}

#[derive(Args, Debug)]
struct EntryFields {
    #[arg(long)]
    amount: f64,
    /// YYYY-MM-DD
    #[arg(long)]
    date: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    category: Option<i64>,
}

impl From<EntryFields> for DepositDraft {
    fn from(f: EntryFields) -> Self {
        DepositDraft {
            amount: f.amount,
            description: f.description,
            date: f.date,
            category_id: f.category,
        }
    }
}

impl From<EntryFields> for ExpenseDraft {
    fn from(f: EntryFields) -> Self {
        ExpenseDraft {
            amount: f.amount,
            description: f.description,
            date: f.date,
            category_id: f.category,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.api_url {
        Some(url) => Config::new(url),
        None => Config::from_env(),
    }
    .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(path) = cli.session_file.clone() {
        config = config.with_session_file(path);
    }
    let session_file = config
        .session_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE));

    let jar = cookies::load_jar(&config.api_url, &session_file)
        .with_context(|| format!("failed to read session file {}", session_file.display()))?;
    let app = App::bootstrap(&config, jar.clone())
        .await
        .context("failed to build API client")?;

    let outcome = run(&app, cli.command).await;

    cookies::persist_jar(&jar, &config.api_url, &session_file)
        .with_context(|| format!("failed to write session file {}", session_file.display()))?;

    outcome
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Login {
            email,
            password,
            remember,
        } => {
            let credentials = Credentials {
                email,
                password,
                remember: remember.then_some(true),
            };
            match app.session.login(&credentials).await {
                Some(user) => print_json(&user),
                None => bail!(session_error(app).await),
            }
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            let registration = Registration {
                name,
                email,
                password_confirmation: password.clone(),
                password,
            };
            match app.session.register(&registration).await {
                Some(user) => print_json(&user),
                None => bail!(session_error(app).await),
            }
        }
        Command::Logout => {
            if !app.logout().await {
                bail!(session_error(app).await);
            }
            println!("Logged out");
            Ok(())
        }
        Command::Me => match app.session.fetch_user().await {
            Some(user) => print_json(&user),
            None => bail!(session_error(app).await),
        },
        Command::Profile {
            name,
            email,
            avatar,
        } => {
            let update = ProfileUpdate {
                name,
                email,
                avatar,
            };
            match app.session.update_profile(&update).await {
                Some(user) => print_json(&user),
                None => bail!(session_error(app).await),
            }
        }
        Command::Password { current, new } => {
            let update = PasswordUpdate {
                current_password: current,
                password_confirmation: new.clone(),
                password: new,
            };
            if !app.session.update_password(&update).await {
                bail!(session_error(app).await);
            }
            println!("Password updated");
            Ok(())
        }
        Command::GoogleUrl => {
            println!("{}", app.session.google_auth_url()?);
            Ok(())
        }
        Command::Categories(command) => run_categories(app, command).await,
        Command::Deposits(command) => run_entries(&app.deposits, command).await,
        Command::Expenses(command) => run_entries(&app.expenses, command).await,
        Command::Stats { period, start, end } => {
            let query = match period {
                Period::Custom => {
                    let start = start.context("--start is required for a custom period")?;
                    let end = end.context("--end is required for a custom period")?;
                    let start = parse_date(&start).map_err(anyhow::Error::msg)?;
                    let end = parse_date(&end).map_err(anyhow::Error::msg)?;
                    StatisticsQuery::custom(start, end)
                }
                other => StatisticsQuery::period(other),
            };
            let stats = app
                .statistics
                .get(&query)
                .await
                .context("failed to fetch statistics")?;
            print_json(&stats)
        }
        Command::Route { path } => {
            let Some(to) = resolve(&path) else {
                bail!("No route matches {}", path);
            };
            match app.guard.before_each(&to).await {
                Navigation::Proceed => println!("{} ({})", to.full_path, to.name),
                redirect => println!(
                    "redirect -> {}",
                    redirect.redirect_location().unwrap_or_default()
                ),
            }
            Ok(())
        }
    }
}

async fn run_categories(app: &App, command: CategoryCommand) -> Result<()> {
    let store = &app.categories;
    match command {
        CategoryCommand::List { kind, main, parent } => {
            store.fetch_all_of_kind(kind).await;
            fail_on_store_error(store).await?;
            let items = match (main, parent) {
                (_, Some(parent)) => store.sub_categories(parent).await,
                (true, None) => match kind {
                    Some(CategoryKind::Income) => store.main_income_categories().await,
                    Some(CategoryKind::Expense) => store.main_expense_categories().await,
                    None => store.main_categories().await,
                },
                (false, None) => store.items().await,
            };
            print_json(&items)
        }
        CategoryCommand::Show { id } => show_one(store, id).await,
        CategoryCommand::Create(fields) => {
            let created = store.create(&fields.into()).await?;
            print_json(&created)
        }
        CategoryCommand::Update { id, fields } => {
            let updated = store.update(id, &fields.into()).await?;
            print_json(&updated)
        }
        CategoryCommand::Delete { id } => {
            store.delete(id).await?;
            println!("Deleted");
            Ok(())
        }
    }
}

async fn run_entries<T>(store: &ResourceStore<T>, command: EntryCommand) -> Result<()>
where
    T: Resource,
    T::Draft: From<EntryFields>,
{
    match command {
        EntryCommand::List => {
            store.fetch_all().await;
            fail_on_store_error(store).await?;
            print_json(&store.items().await)
        }
        EntryCommand::Show { id } => show_one(store, id).await,
        EntryCommand::Create(fields) => {
            let created = store.create(&fields.into()).await?;
            print_json(&created)
        }
        EntryCommand::Update { id, fields } => {
            let updated = store.update(id, &fields.into()).await?;
            print_json(&updated)
        }
        EntryCommand::Delete { id } => {
            store.delete(id).await?;
            println!("Deleted");
            Ok(())
        }
    }
}

async fn show_one<T: Resource>(store: &ResourceStore<T>, id: String) -> Result<()> {
    store.fetch_one(id).await;
    fail_on_store_error(store).await?;
    match store.current().await {
        Some(item) => print_json(&item),
        None => bail!("Not found"),
    }
}

async fn fail_on_store_error<T: Resource>(store: &ResourceStore<T>) -> Result<()> {
    match store.error().await {
        Some(message) => bail!(message),
        None => Ok(()),
    }
}

async fn session_error(app: &App) -> String {
    app.session
        .error()
        .await
        .unwrap_or_else(|| "Request failed".to_string())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
