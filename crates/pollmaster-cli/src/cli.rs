use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "pollmaster")]
#[command(about = "Vote on community polls and manage PollMaster content from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// CLI profile name (backend, routes, and stored session)
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Vote on and create polls
    Poll {
        #[command(subcommand)]
        command: PollCommands,
    },
    /// Sign in, register, and manage the stored session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// News column articles
    Articles {
        #[command(subcommand)]
        command: ArticleCommands,
    },
    /// Pet food catalog
    #[command(name = "pet-foods")]
    PetFoods {
        #[command(subcommand)]
        command: PetFoodCommands,
    },
    /// Pets listed by the shop
    Pets {
        #[command(subcommand)]
        command: PetCommands,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum RouteStyleArg {
    /// `/user/signup`, `/user/signin`, `/user/profile`
    Nested,
    /// `/signup`, `/login`, `/users/profile`
    Flat,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum WritePolicyArg {
    /// Only admins may create, edit, or delete
    Admin,
    /// Admins, plus authors on their own items
    Owner,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum BackendArg {
    Remote,
    Local,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum RoundingArg {
    Independent,
    LargestRemainder,
}

#[derive(Subcommand)]
pub enum PollCommands {
    /// List polls with their current results
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one poll's results
    Show {
        /// Poll id
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Cast one vote
    Vote {
        /// Poll id
        id: String,
        /// Option label, exactly as listed
        option: String,
    },
    /// Create a new poll
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Option label (repeat 2-10 times)
        #[arg(long = "option", value_name = "LABEL", required = true)]
        options: Vec<String>,
        /// Opening time (RFC 3339)
        #[arg(long, value_name = "TIME")]
        starts_at: String,
        /// Closing time (RFC 3339)
        #[arg(long, value_name = "TIME")]
        ends_at: String,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email and password
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Register a new account
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
        /// Register as admin with this enrollment key
        #[arg(long, value_name = "KEY")]
        admin_key: Option<String>,
    },
    /// Confirm the 6-digit code sent after registration
    Verify {
        #[arg(long)]
        code: String,
    },
    /// Show the signed-in user
    Status,
    /// Sign out and clear the stored session
    Logout,
    /// Request a password reset email
    ForgotPassword {
        #[arg(long, value_name = "EMAIL")]
        email: String,
    },
    /// Set a new password with a reset token
    ResetPassword {
        #[arg(long, value_name = "TOKEN")]
        token: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
}

#[derive(Subcommand)]
pub enum ArticleCommands {
    /// List articles
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Publish an article
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        summary: String,
        #[arg(long)]
        body: String,
        /// Publication date (defaults to now)
        #[arg(long)]
        date: Option<String>,
    },
    /// Edit an article
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete an article
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum PetFoodCommands {
    /// List pet foods
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a pet food
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_name = "PATH")]
        image_path: Option<String>,
    },
    /// Edit a pet food
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_name = "PATH")]
        image_path: Option<String>,
    },
    /// Delete a pet food
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum PetCommands {
    /// List pets
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a pet
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        species: String,
        #[arg(long)]
        price: f64,
    },
    /// Edit a pet
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        species: Option<String>,
        #[arg(long)]
        price: Option<f64>,
    },
    /// Delete a pet
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Backend base URL (e.g. <http://localhost:5000>)
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Auth route layout used by the backend
        #[arg(long, value_enum)]
        routes: Option<RouteStyleArg>,
        /// Per-request timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout_secs: Option<u64>,
        /// Who may modify collections
        #[arg(long, value_enum)]
        write_policy: Option<WritePolicyArg>,
        /// Where collections live
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
        /// Poll percentage rounding
        #[arg(long, value_enum)]
        rounding: Option<RoundingArg>,
        /// Admin enrollment key checked before admin sign-ups
        #[arg(long, value_name = "KEY")]
        admin_key: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Show the resolved profile
    Show,
}
