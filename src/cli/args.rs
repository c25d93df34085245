use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "hisn", version, author, about = "Duas and prayer times from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configure location, calculation method, madhab and timetable source
    Setup {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lng: Option<f64>,
        /// Display name for the location
        #[arg(long)]
        name: Option<String>,
        /// Calculation method (MuslimWorldLeague, Karachi, UmmAlQura, NorthAmerica, ...)
        #[arg(long)]
        method: Option<String>,
        /// Madhab for Asr (Shafi or Hanafi)
        #[arg(long)]
        madhab: Option<String>,
        /// Timetable source: offline or aladhan
        #[arg(long)]
        source: Option<String>,
        /// Reconfigure even if setup was already done
        #[arg(long)]
        reset: bool,
    },
    /// Show today's prayer times and the countdown to the next prayer
    Times {
        /// Show times on a 12-hour clock
        #[arg(long)]
        twelve_hour: bool,
    },
    /// Live countdown to the next prayer (ctrl-c to quit)
    Watch,
    /// Prayer notifications
    Notify {
        #[command(subcommand)]
        action: NotifyCommands,
    },
    /// List dua categories
    Categories,
    /// List subcategories, optionally of one category
    Subcategories {
        #[arg(long)]
        category: Option<String>,
    },
    /// Show the duas of a subcategory
    Duas {
        id: String,
    },
    /// Saved duas (requires sign-in)
    Favorites {
        #[command(subcommand)]
        action: FavoriteCommands,
    },
    /// Send a message to the maintainers
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        message: String,
    },
    /// Ask for a dua fitting a situation
    Ask {
        query: Vec<String>,
    },
    /// Account management
    Auth {
        #[command(subcommand)]
        action: AuthCommands,
    },
    /// Show or change stored preferences
    Prefs {
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        theme: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum NotifyCommands {
    /// Show toggles and the pending notification
    Status,
    /// Turn all prayer notifications on
    On,
    /// Turn all prayer notifications off
    Off,
    /// Enable notifications for one prayer
    Enable { prayer: String },
    /// Disable notifications for one prayer
    Disable { prayer: String },
    /// Run a single scheduling pass now
    Sync,
    /// Keep scheduling and delivering notifications until ctrl-c
    Daemon,
}

#[derive(Subcommand, Debug)]
pub enum FavoriteCommands {
    List,
    Add { dua_id: String },
    Remove { dua_id: String },
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    Login {
        #[arg(long)]
        email: String,
    },
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Request a password reset code by email
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    VerifyCode {
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: String,
    },
    ResetPassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: String,
    },
}
